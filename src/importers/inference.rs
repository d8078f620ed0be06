//! Column-mapping inference for exports no adapter recognizes.
//!
//! Every (role, column) pair gets two scores: how much the header looks like
//! a known name for the role, and how many sample values have the role's
//! shape. Columns are then handed out greedily, best pair first, one role
//! per column.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::adapters::NON_TRADE_WORDS;
use super::locale::{DateOrder, Locale};
use super::normalize::{to_iso, to_number};
use crate::models::{ColumnCandidate, ColumnMapping, Role, Row};
use crate::utils::fold_name;

const PRIMARY_SCORE: f64 = 1.0;
const SECONDARY_SCORE: f64 = 0.85;
const PRIMARY_TOKENS_SCORE: f64 = 0.7;
const SECONDARY_TOKENS_SCORE: f64 = 0.55;

/// Upper bound for a column whose header means nothing but whose values fit.
const SHAPE_ONLY_WEIGHT: f64 = 0.3;

const EPSILON: f64 = 1e-9;

struct RoleAliases {
    role: Role,
    primary: &'static [&'static str],
    secondary: &'static [&'static str],
}

/// Header names seen across broker exports, compared after [`fold_name`].
const ALIASES: &[RoleAliases] = &[
    RoleAliases {
        role: Role::Date,
        primary: &["date", "trade date", "transaction date", "activity date", "execution time", "timestamp", "time"],
        secondary: &[
            "date utc", "open date", "fill date", "order date", "created at", "settlement date",
            "process date", "value date", "execution date", "datetime",
        ],
    },
    RoleAliases {
        role: Role::Ticker,
        primary: &["ticker", "symbol", "stock", "instrument"],
        secondary: &[
            "security", "asset", "product", "market", "isin", "instrument symbol", "pair", "epic",
            "sym", "ric", "sedol", "asset name", "product name", "base asset",
        ],
    },
    RoleAliases {
        role: Role::Action,
        primary: &["action", "type", "side", "buy sell", "direction", "transaction type", "trans code"],
        secondary: &["activity", "operation", "order action", "record type", "details", "label"],
    },
    RoleAliases {
        role: Role::Quantity,
        primary: &["quantity", "qty", "shares", "units", "no of shares"],
        secondary: &[
            "size", "filled", "filled qty", "filled quantity", "volume", "vol", "executed",
            "quantity transacted", "amount qty", "asset amount", "crypto amount", "amount",
        ],
    },
    RoleAliases {
        role: Role::Price,
        primary: &["price", "price per share", "unit price", "trade price", "execution price", "fill price"],
        secondary: &[
            "rate", "open rate", "average price", "avg price", "spot price", "spot price at transaction",
            "price share", "price native", "t price", "tradeprice", "price average",
        ],
    },
    RoleAliases {
        role: Role::Currency,
        primary: &["currency", "ccy", "currency code"],
        secondary: &[
            "settlement currency", "cash currency", "spot price currency", "quote currency",
            "instrument currency", "currency native",
        ],
    },
    RoleAliases {
        role: Role::Fees,
        primary: &["fees", "fee", "commission", "comm"],
        secondary: &[
            "fees comm", "fees and or spread", "charges", "ibcommission", "transaction costs",
            "fee amount", "brokerage",
        ],
    },
];

const TRADE_WORDS: &[&str] = &["BUY", "SELL", "BOUGHT", "SOLD", "PURCHASE", "SALE", "TRADE", "BTO", "STC", "STO", "BTC"];

static SYMBOL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.\-/:]{0,14}$").expect("valid regex"));
static CURRENCY_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{3}$").expect("valid regex"));

/// Outcome of [`infer_mapping`].
#[derive(Debug, Clone)]
pub struct MappingInference {
    /// Best guess; required roles are always filled when any candidate exists
    pub mapping: ColumnMapping,
    pub candidates: BTreeMap<Role, Vec<ColumnCandidate>>,
    /// Required roles without a candidate at or above the threshold
    pub unresolved: Vec<Role>,
    /// Required roles whose chosen column is tied with another free column
    pub ties: Vec<(Role, Vec<String>)>,
    /// Date orders under which every sampled value of the mapped date column
    /// parses, month-first before day-first. Empty when nothing was sampled.
    pub date_orders: Vec<DateOrder>,
}

impl MappingInference {
    pub fn is_confident(&self) -> bool {
        self.unresolved.is_empty() && self.ties.is_empty()
    }

    pub fn reason(&self) -> String {
        let mut parts = Vec::new();
        if !self.unresolved.is_empty() {
            let roles: Vec<&str> = self.unresolved.iter().map(|r| r.as_str()).collect();
            parts.push(format!("no confident column for {}", roles.join(", ")));
        }
        for (role, columns) in &self.ties {
            parts.push(format!("ambiguous {} column: {}", role, columns.join(" / ")));
        }
        if parts.is_empty() {
            "mapping resolved".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Score how much a header names `role`, in `[0, 1]`.
pub fn name_score(role: Role, header: &str) -> f64 {
    let Some(aliases) = ALIASES.iter().find(|a| a.role == role) else {
        return 0.0;
    };
    let folded = fold_name(header);
    if folded.is_empty() {
        return 0.0;
    }
    let tokens: HashSet<&str> = folded.split(' ').collect();
    let covers = |alias: &&str| alias.split(' ').all(|t| tokens.contains(t));

    if aliases.primary.contains(&folded.as_str()) {
        PRIMARY_SCORE
    } else if aliases.secondary.contains(&folded.as_str()) {
        SECONDARY_SCORE
    } else if aliases.primary.iter().any(covers) {
        PRIMARY_TOKENS_SCORE
    } else if aliases.secondary.iter().any(covers) {
        SECONDARY_TOKENS_SCORE
    } else {
        0.0
    }
}

fn value_fits(role: Role, value: &str) -> bool {
    match role {
        Role::Date => {
            to_iso(value, &Locale::en_us()).is_ok() || to_iso(value, &Locale::en_gb()).is_ok()
        }
        Role::Quantity | Role::Price | Role::Fees => to_number(value, &Locale::en_us()).is_ok(),
        Role::Ticker => {
            SYMBOL_SHAPE.is_match(value) && value.chars().any(|c| c.is_ascii_alphabetic())
        }
        Role::Action => {
            let upper = value.to_uppercase();
            TRADE_WORDS.iter().chain(NON_TRADE_WORDS).any(|w| upper.contains(w))
        }
        Role::Currency => CURRENCY_SHAPE.is_match(value),
    }
}

/// Share of non-blank sample values that fit `role`; 0 when all are blank.
pub fn shape_score(role: Role, values: &[&str]) -> f64 {
    let present: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    if present.is_empty() {
        return 0.0;
    }
    let fitting = present.iter().filter(|v| value_fits(role, v)).count();
    fitting as f64 / present.len() as f64
}

fn combine(name: f64, shape: f64) -> f64 {
    (name * (0.5 + 0.5 * shape)).max(SHAPE_ONLY_WEIGHT * shape)
}

/// Propose a role → column mapping from headers and a few sample rows.
///
/// Pure: the same input always yields the same mapping. Optional roles
/// (action, currency, fees) are only mapped at or above `threshold`, so a
/// weak guess never changes how a row is read.
pub fn infer_mapping(headers: &[String], sample_rows: &[Row], threshold: f64) -> MappingInference {
    let mut candidates: BTreeMap<Role, Vec<ColumnCandidate>> = BTreeMap::new();

    for (index, header) in headers.iter().enumerate() {
        let values: Vec<&str> = sample_rows
            .iter()
            .map(|row| row.get(header).unwrap_or(""))
            .collect();
        for role in Role::ALL {
            let name = name_score(role, header);
            let shape = shape_score(role, &values);
            let confidence = combine(name, shape);
            if confidence > 0.0 {
                candidates.entry(role).or_default().push(ColumnCandidate {
                    column: header.clone(),
                    index,
                    name_score: name,
                    shape_score: shape,
                    confidence,
                });
            }
        }
    }

    for list in candidates.values_mut() {
        list.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then(a.index.cmp(&b.index)));
    }

    // Greedy: best (role, column) pair first; required roles win exact ties
    let mut pairs: Vec<(Role, &ColumnCandidate)> = candidates
        .iter()
        .flat_map(|(role, list)| list.iter().map(move |c| (*role, c)))
        .collect();
    pairs.sort_by(|(ra, a), (rb, b)| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(rb.is_required().cmp(&ra.is_required()))
            .then(ra.cmp(rb))
            .then(a.index.cmp(&b.index))
    });

    let mut mapping = ColumnMapping::new();
    let mut used: HashSet<usize> = HashSet::new();
    for (role, candidate) in pairs {
        if mapping.get(role).is_some() || used.contains(&candidate.index) {
            continue;
        }
        if !role.is_required() && candidate.confidence < threshold {
            continue;
        }
        debug!(
            "Mapping {} -> {:?} (confidence {:.2})",
            role, candidate.column, candidate.confidence
        );
        mapping.assign(role, candidate.column.clone(), candidate.confidence);
        used.insert(candidate.index);
    }

    let unresolved: Vec<Role> = Role::REQUIRED
        .iter()
        .copied()
        .filter(|role| mapping.confidence(*role) < threshold)
        .collect();

    let mut ties = Vec::new();
    for role in Role::REQUIRED {
        let Some(chosen) = mapping.get(role) else {
            continue;
        };
        if chosen.confidence < threshold {
            continue;
        }
        let rivals: Vec<String> = candidates
            .get(&role)
            .into_iter()
            .flatten()
            .filter(|c| c.column != chosen.column && !used.contains(&c.index))
            .filter(|c| (c.confidence - chosen.confidence).abs() < EPSILON)
            .map(|c| c.column.clone())
            .collect();
        if !rivals.is_empty() {
            let mut columns = vec![chosen.column.clone()];
            columns.extend(rivals);
            ties.push((role, columns));
        }
    }

    let date_orders = readable_date_orders(&mapping, sample_rows);

    MappingInference {
        mapping,
        candidates,
        unresolved,
        ties,
        date_orders,
    }
}

fn readable_date_orders(mapping: &ColumnMapping, sample_rows: &[Row]) -> Vec<DateOrder> {
    let Some(column) = mapping.column(Role::Date) else {
        return Vec::new();
    };
    let values: Vec<&str> = sample_rows
        .iter()
        .filter_map(|row| row.get(column))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Vec::new();
    }
    [Locale::en_us(), Locale::en_gb()]
        .into_iter()
        .filter(|locale| values.iter().all(|v| to_iso(v, locale).is_ok()))
        .map(|locale| locale.date_order)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn rows(names: &[&str], data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|values| Row::from_pairs(names.iter().copied().zip(values.iter().copied())))
            .collect()
    }

    #[test]
    fn test_name_scores() {
        assert_eq!(name_score(Role::Price, "Price"), PRIMARY_SCORE);
        assert_eq!(name_score(Role::Price, "Price / share"), SECONDARY_SCORE);
        assert_eq!(name_score(Role::Date, "Txn Date"), PRIMARY_TOKENS_SCORE);
        assert_eq!(name_score(Role::Quantity, "No. of shares"), PRIMARY_SCORE);
        assert_eq!(name_score(Role::Fees, "Fees & Comm"), SECONDARY_SCORE);
        assert_eq!(name_score(Role::Ticker, "Notes"), 0.0);
        assert_eq!(name_score(Role::Ticker, "Ação"), 0.0);
    }

    #[test]
    fn test_shape_scores() {
        assert_eq!(shape_score(Role::Date, &["2024-01-15", "15/01/2024", ""]), 1.0);
        assert_eq!(shape_score(Role::Price, &["185.50", "n/a"]), 0.5);
        assert_eq!(shape_score(Role::Ticker, &["AAPL", "BRK.B", "Apple Inc"]), 2.0 / 3.0);
        assert_eq!(shape_score(Role::Action, &["Buy", "DIVIDEND", "hello"]), 2.0 / 3.0);
        assert_eq!(shape_score(Role::Currency, &["", ""]), 0.0);
    }

    #[test]
    fn test_plain_headers_resolve() {
        let names = ["Date", "Action", "Stock", "Quantity", "Price"];
        let sample = rows(
            &names,
            &[
                &["2024-01-15", "BUY", "AAPL", "10", "185.50"],
                &["2024-01-16", "SELL", "MSFT", "5", "390.00"],
            ],
        );
        let inference = infer_mapping(&headers(&names), &sample, 0.6);
        assert!(inference.is_confident(), "{}", inference.reason());
        assert_eq!(inference.mapping.column(Role::Ticker), Some("Stock"));
        assert_eq!(inference.mapping.column(Role::Action), Some("Action"));
        assert_eq!(inference.mapping.column(Role::Quantity), Some("Quantity"));
        assert!(inference.mapping.column(Role::Currency).is_none());
    }

    #[test]
    fn test_date_orders_follow_sampled_values() {
        let names = ["Date", "Stock", "Quantity", "Price"];
        let day_first = rows(
            &names,
            &[&["15/01/2024", "AAPL", "10", "185.50"], &["03/02/2024", "MSFT", "5", "390.00"]],
        );
        let inference = infer_mapping(&headers(&names), &day_first, 0.6);
        assert_eq!(inference.date_orders, vec![DateOrder::DayFirst]);

        let month_first = rows(&names, &[&["01/15/2024", "AAPL", "10", "185.50"]]);
        let inference = infer_mapping(&headers(&names), &month_first, 0.6);
        assert_eq!(inference.date_orders, vec![DateOrder::MonthFirst]);

        let iso = rows(&names, &[&["2024-01-15", "AAPL", "10", "185.50"]]);
        let inference = infer_mapping(&headers(&names), &iso, 0.6);
        assert_eq!(inference.date_orders, vec![DateOrder::MonthFirst, DateOrder::DayFirst]);
    }

    #[test]
    fn test_missing_price_is_unresolved() {
        let names = ["Txn Date", "Sym", "Shares"];
        let sample = rows(&names, &[&["2024-01-15", "AAPL", "10"]]);
        let inference = infer_mapping(&headers(&names), &sample, 0.6);
        assert!(!inference.is_confident());
        assert!(inference.unresolved.contains(&Role::Price));
        assert!(inference.reason().contains("price"));
    }

    #[test]
    fn test_one_role_per_column() {
        let names = ["Date", "Ticker", "Qty", "Price"];
        let sample = rows(&names, &[&["2024-01-15", "AAPL", "10", "185.50"]]);
        let inference = infer_mapping(&headers(&names), &sample, 0.6);
        let mut columns: Vec<&str> = inference.mapping.iter().map(|(_, a)| a.column.as_str()).collect();
        let total = columns.len();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), total);
    }

    #[test]
    fn test_tied_required_columns() {
        let names = ["Date", "Ticker", "Quantity", "Qty", "Price"];
        let sample = rows(&names, &[&["2024-01-15", "AAPL", "10", "10", "185.50"]]);
        let inference = infer_mapping(&headers(&names), &sample, 0.6);
        assert!(!inference.is_confident());
        assert_eq!(inference.ties.len(), 1);
        assert_eq!(inference.ties[0].0, Role::Quantity);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let names = ["When", "What", "How many", "Cost"];
        let sample = rows(&names, &[&["2024-01-15", "AAPL", "10", "185.50"]]);
        let first = infer_mapping(&headers(&names), &sample, 0.6);
        for _ in 0..3 {
            let again = infer_mapping(&headers(&names), &sample, 0.6);
            assert_eq!(again.mapping, first.mapping);
        }
    }
}
