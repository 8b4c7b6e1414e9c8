use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

mod common;
use common::TestWorkspace;

const ORDERS_CSV: &str = "id,customer,total\n1,Alice,10.50\n2,Bob,20.00\n3,Cara,7.25\n";

fn tablecast() -> Command {
    Command::cargo_bin("tablecast").expect("binary present")
}

fn load_args(input: &Path, warehouse: &Path, mode: &str) -> Vec<String> {
    [
        "load",
        "-i",
        input.to_str().unwrap(),
        "-w",
        warehouse.to_str().unwrap(),
        "-d",
        "sales",
        "-t",
        "orders",
        "-m",
        mode,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn table_rows(warehouse: &Path) -> Vec<Value> {
    let data = fs::read_to_string(warehouse.join("sales").join("orders.jsonl"))
        .expect("read table data");
    data.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("parse row"))
        .collect()
}

#[test]
fn load_create_materializes_dataset_table_and_rows() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");

    tablecast()
        .args(load_args(&input, &warehouse, "create"))
        .assert()
        .success();

    let schema: Value = serde_json::from_str(
        &fs::read_to_string(warehouse.join("sales").join("orders.schema.json"))
            .expect("read schema"),
    )
    .expect("parse schema");
    let fields = schema.get("fields").and_then(Value::as_array).expect("fields");
    assert_eq!(fields.len(), 3);
    assert_eq!(
        fields[2].get("type").and_then(Value::as_str),
        Some("FLOAT")
    );

    let rows = table_rows(&warehouse);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("customer"), Some(&Value::from("Alice")));
    assert_eq!(rows[2].get("total"), Some(&Value::from(7.25)));
}

#[test]
fn load_create_conflicts_with_existing_table() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");

    tablecast()
        .args(load_args(&input, &warehouse, "create"))
        .assert()
        .success();

    tablecast()
        .args(load_args(&input, &warehouse, "create"))
        .assert()
        .failure()
        .stderr(contains("already exists"));

    // The conflicting run must not have inserted anything.
    assert_eq!(table_rows(&warehouse).len(), 3);
}

#[test]
fn load_append_adds_rows_to_existing_table() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");

    tablecast()
        .args(load_args(&input, &warehouse, "create"))
        .assert()
        .success();
    tablecast()
        .args(load_args(&input, &warehouse, "append"))
        .assert()
        .success();

    assert_eq!(table_rows(&warehouse).len(), 6);
}

#[test]
fn load_replace_discards_previous_contents() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");

    tablecast()
        .args(load_args(&input, &warehouse, "create"))
        .assert()
        .success();

    let smaller = workspace.write("fewer.csv", "id,customer,total\n9,Zoe,1.00\n");
    tablecast()
        .args(load_args(&smaller, &warehouse, "replace"))
        .assert()
        .success();

    let rows = table_rows(&warehouse);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::from(9)));
}

#[test]
fn load_append_and_replace_require_an_existing_table() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");

    for mode in ["append", "replace"] {
        tablecast()
            .args(load_args(&input, &warehouse, mode))
            .assert()
            .failure()
            .stderr(contains("does not exist"));
    }
}

#[test]
fn load_honors_a_hand_edited_schema() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");
    let schema_path = workspace.path().join("orders.schema.json");

    tablecast()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            schema_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    // Operator edit: force the id column to STRING and describe it.
    let mut schema: Value =
        serde_json::from_str(&workspace.read("orders.schema.json")).expect("parse schema");
    let id = &mut schema["fields"][0];
    id["type"] = Value::from("STRING");
    id["description"] = Value::from("external order key");
    workspace.write(
        "orders.schema.json",
        &serde_json::to_string_pretty(&schema).expect("serialize schema"),
    );

    let mut args = load_args(&input, &warehouse, "create");
    args.push("-s".to_string());
    args.push(schema_path.to_str().unwrap().to_string());
    tablecast().args(args).assert().success();

    let stored: Value = serde_json::from_str(
        &fs::read_to_string(warehouse.join("sales").join("orders.schema.json"))
            .expect("read stored schema"),
    )
    .expect("parse stored schema");
    assert_eq!(
        stored["fields"][0].get("type").and_then(Value::as_str),
        Some("STRING")
    );
    assert_eq!(
        stored["fields"][0]
            .get("description")
            .and_then(Value::as_str),
        Some("external order key")
    );
}

#[test]
fn load_rejects_a_schema_with_invalid_names() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", ORDERS_CSV);
    let warehouse = workspace.path().join("warehouse");
    let schema_path = workspace.write(
        "bad.schema.json",
        r#"{"fields": [{"name": "Not Valid", "type": "STRING", "mode": "NULLABLE"}]}"#,
    );

    let mut args = load_args(&input, &warehouse, "create");
    args.push("-s".to_string());
    args.push(schema_path.to_str().unwrap().to_string());

    tablecast()
        .args(args)
        .assert()
        .failure()
        .stderr(contains("not a valid column identifier"));
}
