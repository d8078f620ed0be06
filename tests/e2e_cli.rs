
use assert_cmd::prelude::*;
use cli_helpers::{base_cmd, fixture_path, run_json};
use predicates::prelude::*;
use tempfile::TempDir;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("failed to write file");
    path.display().to_string()
}

#[test]
fn brokers_lists_adapters_in_detection_order() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("brokers")
        .assert()
        .success()
        .stdout(predicate::str::contains("turbotax"))
        .stdout(predicate::str::contains("Interactive Brokers Flex"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    let brokers = run_json(&home, &["brokers"]).unwrap();
    let ids: Vec<&str> = brokers
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 15);
    assert_eq!(ids[0], "turbotax");
    assert_eq!(ids[14], "ig");
}

#[test]
fn detect_prints_adapter_id() {
    let home = setup_temp_home();
    let file = fixture_path("degiro");

    base_cmd(&home)
        .arg("detect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("degiro"));

    let json = run_json(&home, &["detect", file.to_str().unwrap()]).unwrap();
    assert_eq!(json["broker"], "degiro");
}

#[test]
fn parse_json_round_trips_trades() {
    let home = setup_temp_home();
    let file = fixture_path("schwab");

    let json = run_json(&home, &["parse", file.to_str().unwrap()]).unwrap();
    assert_eq!(json["status"], "parsed");
    assert_eq!(json["broker"], "schwab");
    let trades = json["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0]["ticker"], "AAPL");
    assert_eq!(trades[0]["type"], "BUY");
    assert_eq!(trades[0]["date"], "2024-01-15");
    assert_eq!(trades[0]["rawHash"].as_str().unwrap().len(), 64);
    assert_eq!(json["meta"]["skipped"], 1);
}

#[test]
fn parse_table_has_no_ansi_with_no_color() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("parse")
        .arg(fixture_path("kraken"))
        .assert()
        .success()
        .stdout(predicate::str::contains("kraken"))
        .stdout(predicate::str::contains("2 trades"))
        .stdout(predicate::str::contains("BUY"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn unknown_format_asks_for_mapping_and_exits_zero() {
    let home = setup_temp_home();
    let file = write_file(&home, "partial.csv", "Txn Date,Sym,Shares\n2024-01-15,AAPL,10\n");

    base_cmd(&home)
        .arg("parse")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("mapping needs confirmation"))
        .stdout(predicate::str::contains("broker-import map"));

    let json = run_json(&home, &["parse", &file]).unwrap();
    assert_eq!(json["status"], "requires_mapping");
    assert_eq!(json["headers"].as_array().unwrap().len(), 3);
}

#[test]
fn map_parses_with_confirmed_columns() {
    let home = setup_temp_home();
    let file = write_file(
        &home,
        "custom.csv",
        "Txn Date,Sym,Shares,Cost\n2024-01-15,AAPL,10,185.50\n2024-01-16,MSFT,5,390.00\n",
    );

    let json = run_json(
        &home,
        &[
            "map",
            &file,
            "--map",
            "date=Txn Date",
            "--map",
            "ticker=Sym",
            "--map",
            "quantity=Shares",
            "--map",
            "price=Cost",
        ],
    )
    .unwrap();
    assert_eq!(json["status"], "parsed");
    assert_eq!(json["broker"], "generic");
    assert_eq!(json["trades"].as_array().unwrap().len(), 2);
    assert_eq!(json["trades"][1]["ticker"], "MSFT");
}

#[test]
fn map_without_required_roles_fails() {
    let home = setup_temp_home();
    let file = write_file(&home, "custom.csv", "Txn Date,Sym\n2024-01-15,AAPL\n");

    base_cmd(&home)
        .args(["map", &file, "--map", "date=Txn Date", "--map", "ticker=Sym"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quantity, price"));
}

#[test]
fn map_rejects_malformed_assignment() {
    let home = setup_temp_home();
    let file = write_file(&home, "custom.csv", "A,B\n1,2\n");

    base_cmd(&home)
        .args(["map", &file, "--map", "colour=A"])
        .assert()
        .failure();
}

#[test]
fn forcing_unknown_broker_fails() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("parse")
        .arg(fixture_path("schwab"))
        .args(["--broker", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown broker adapter: acme"));
}

#[test]
fn missing_file_fails_with_context() {
    let home = setup_temp_home();
    let missing = home.path().join("nope.csv");

    base_cmd(&home)
        .arg("parse")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn invalid_config_file_fails() {
    let home = setup_temp_home();
    let config = write_file(&home, "config.toml", "confidence_threshold = \"high\"\n");

    base_cmd(&home)
        .args(["--config", &config, "brokers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn locale_from_environment_applies_to_generic_parse() {
    let home = setup_temp_home();
    let file = write_file(
        &home,
        "eu.csv",
        "Date;Action;Stock;Quantity;Price\n15/01/2024;BUY;SAP;10;180,50\n",
    );

    let output = base_cmd(&home)
        .env("BROKER_IMPORT_LOCALE", "de-DE")
        .args(["--json", "parse", &file])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "parsed");
    assert_eq!(json["trades"][0]["price"], "180.50");
    assert_eq!(json["trades"][0]["date"], "2024-01-15");
}
