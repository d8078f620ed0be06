//! Canonical records produced by an import.
//!
//! Nothing here is persisted: every value is created per invocation and
//! handed to the caller, which owns storage and deduplication.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Trade direction (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
        }
    }

    /// SELL when the action text mentions SELL anywhere, BUY otherwise.
    ///
    /// The BUY default on ambiguous text is a lossy approximation kept for
    /// compatibility with existing imports.
    pub fn from_action(action: &str) -> Self {
        if action.to_ascii_uppercase().contains("SELL") {
            TradeType::Sell
        } else {
            TradeType::Buy
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            TradeType::Buy => TradeType::Sell,
            TradeType::Sell => TradeType::Buy,
        }
    }
}

impl FromStr for TradeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" | "BOUGHT" | "PURCHASE" => Ok(TradeType::Buy),
            "SELL" | "S" | "SOLD" | "SALE" => Ok(TradeType::Sell),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical trade shared by every adapter and the generic path.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub date: NaiveDate,
    pub ticker: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub qty: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub fees: Decimal,
    pub source: String,
    pub raw_hash: String,
}

/// Counters reported with every parse, including partial successes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParseMeta {
    /// Data rows scanned (header and blank lines excluded)
    pub rows: usize,
    /// Rows rejected with a warning
    pub invalid: usize,
    /// Rows intentionally excluded (dividends, deposits, ...)
    pub skipped: usize,
    pub duration_ms: u64,
    /// Schema version of the adapter that produced the trades
    pub version: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParseResult {
    pub broker: String,
    pub trades: Vec<Trade>,
    pub warnings: Vec<String>,
    pub meta: ParseMeta,
}

impl ParseResult {
    /// One-line import summary: rows scanned vs trades vs warnings.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows scanned, {} trades, {} skipped, {} warnings",
            self.broker,
            self.meta.rows,
            self.trades.len(),
            self.meta.skipped,
            self.warnings.len()
        )
    }
}

/// One tokenized data row: header text to cell text, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Exact (case-sensitive) header lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First alias, in priority order, whose cell is present and non-blank.
    /// Header comparison ignores case and surrounding whitespace.
    pub fn first_of(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.fields
                .iter()
                .find(|(k, v)| k.trim().eq_ignore_ascii_case(alias) && !v.trim().is_empty())
                .map(|(_, v)| v.trim())
        })
    }

    /// Cell of the column immediately to the right of `key`. Used for exports
    /// that leave a unit column (currency, fee currency) unnamed.
    pub fn value_after(&self, key: &str) -> Option<&str> {
        let idx = self
            .fields
            .iter()
            .position(|(k, _)| k.trim().eq_ignore_ascii_case(key))?;
        self.fields.get(idx + 1).map(|(_, v)| v.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.trim().is_empty())
    }

    /// Compact JSON rendering, cut to `max_chars` characters, for warnings.
    pub fn describe(&self, max_chars: usize) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        crate::utils::truncate_chars(&json, max_chars)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Canonical roles a source column can play in a trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Date,
    Ticker,
    Action,
    Quantity,
    Price,
    Currency,
    Fees,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Date,
        Role::Ticker,
        Role::Action,
        Role::Quantity,
        Role::Price,
        Role::Currency,
        Role::Fees,
    ];

    /// Roles that must be mapped before a generic parse can run.
    pub const REQUIRED: [Role; 4] = [Role::Date, Role::Ticker, Role::Quantity, Role::Price];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Ticker => "ticker",
            Role::Action => "action",
            Role::Quantity => "quantity",
            Role::Price => "price",
            Role::Currency => "currency",
            Role::Fees => "fees",
        }
    }

    pub fn is_required(&self) -> bool {
        Role::REQUIRED.contains(self)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Role::Date),
            "ticker" | "symbol" => Ok(Role::Ticker),
            "action" | "type" => Ok(Role::Action),
            "quantity" | "qty" => Ok(Role::Quantity),
            "price" => Ok(Role::Price),
            "currency" => Ok(Role::Currency),
            "fees" | "fee" => Ok(Role::Fees),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source column chosen for a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleAssignment {
    pub column: String,
    pub confidence: f64,
}

/// Role → source column, as inferred or as confirmed by a reviewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ColumnMapping {
    roles: BTreeMap<Role, RoleAssignment>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping confirmed by a person: every assignment gets full confidence.
    pub fn confirmed<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Role, S)>,
        S: Into<String>,
    {
        let mut mapping = Self::new();
        for (role, column) in pairs {
            mapping.assign(role, column, 1.0);
        }
        mapping
    }

    pub fn assign(&mut self, role: Role, column: impl Into<String>, confidence: f64) {
        self.roles.insert(
            role,
            RoleAssignment {
                column: column.into(),
                confidence,
            },
        );
    }

    pub fn column(&self, role: Role) -> Option<&str> {
        self.roles.get(&role).map(|a| a.column.as_str())
    }

    pub fn confidence(&self, role: Role) -> f64 {
        self.roles.get(&role).map(|a| a.confidence).unwrap_or(0.0)
    }

    pub fn get(&self, role: Role) -> Option<&RoleAssignment> {
        self.roles.get(&role)
    }

    pub fn missing_required(&self) -> Vec<Role> {
        Role::REQUIRED
            .iter()
            .copied()
            .filter(|r| !self.roles.contains_key(r))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &RoleAssignment)> {
        self.roles.iter().map(|(r, a)| (*r, a))
    }
}

/// A scored source column for one role.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCandidate {
    pub column: String,
    pub index: usize,
    pub name_score: f64,
    pub shape_score: f64,
    pub confidence: f64,
}

/// Returned instead of trades when the inferred mapping is not trustworthy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiresMappingResult {
    pub raw_csv_text: String,
    pub headers: Vec<String>,
    pub inferred_mapping: ColumnMapping,
    /// Ranked candidates per role, best first
    pub candidates: BTreeMap<Role, Vec<ColumnCandidate>>,
    pub sample_rows: Vec<Row>,
    pub reason: String,
}

/// Result of [`crate::importers::parse_universal`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Parsed(ParseResult),
    RequiresMapping(RequiresMappingResult),
}

impl ImportOutcome {
    pub fn parsed(&self) -> Option<&ParseResult> {
        match self {
            ImportOutcome::Parsed(result) => Some(result),
            ImportOutcome::RequiresMapping(_) => None,
        }
    }

    pub fn requires_mapping(&self) -> Option<&RequiresMappingResult> {
        match self {
            ImportOutcome::RequiresMapping(result) => Some(result),
            ImportOutcome::Parsed(_) => None,
        }
    }
}
