use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}

fn write(path: &PathBuf, content: &str) {
    std::fs::write(path, content)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

fn read(path: &PathBuf) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

#[test]
fn cli_writes_lineage_artifacts() {
    let temp = unique_temp_dir("sqlspan_cli_lineage");
    let input = temp.join("queries.sql");
    let schema = temp.join("schema.sql");
    let output_dir = temp.join("out");
    write(&schema, "CREATE TABLE orders (id INT, total NUMERIC);");
    write(
        &input,
        "SELECT id FROM orders WHERE total > 10;\nSELECT total * 2 AS doubled FROM orders;",
    );

    let status = Command::new(env!("CARGO_BIN_EXE_sqlspan"))
        .arg(&input)
        .arg("--schema-sql")
        .arg(&schema)
        .arg("--database")
        .arg("shop")
        .arg("--output-dir")
        .arg(&output_dir)
        .status()
        .expect("should run sqlspan binary");
    assert_eq!(status.code(), Some(0), "unexpected status {status:?}");

    let json: serde_json::Value =
        serde_json::from_str(&read(&output_dir.join("queries_span.json"))).expect("valid json");
    let statements = json.as_array().expect("one entry per statement");
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0]["mode"], "lineage");
    assert_eq!(statements[1]["results"][0]["name"], "doubled");

    let report = read(&output_dir.join("queries_report.md"));
    assert!(report.contains("## Statement 2"));
    assert!(report.contains("`shop.public.orders.total`"));
}

#[test]
fn cli_masking_mode_and_missing_table_exit_codes() {
    let temp = unique_temp_dir("sqlspan_cli_masking");
    let input = temp.join("masked.sql");
    let schema = temp.join("schema.sql");
    let policy = temp.join("policy.json");
    let output_dir = temp.join("out");
    write(&schema, "CREATE TABLE T1 (A INT, B INT);");
    write(&input, "SELECT A, B FROM T1");
    write(
        &policy,
        r#"{"rules": [{"table": "T1", "column": "A", "level": "FULL"}]}"#,
    );

    let status = Command::new(env!("CARGO_BIN_EXE_sqlspan"))
        .arg(&input)
        .args(["--dialect", "snowflake", "--mode", "masking"])
        .arg("--schema-sql")
        .arg(&schema)
        .arg("--masking-policy")
        .arg(&policy)
        .arg("--output-dir")
        .arg(&output_dir)
        .status()
        .expect("should run sqlspan binary");
    assert_eq!(status.code(), Some(0), "unexpected status {status:?}");
    let report = read(&output_dir.join("masked_report.md"));
    assert!(report.contains("| A | FULL |"));
    assert!(report.contains("| B | NONE |"));

    let missing = temp.join("missing.sql");
    write(&missing, "SELECT * FROM nowhere");
    let status = Command::new(env!("CARGO_BIN_EXE_sqlspan"))
        .arg(&missing)
        .arg("--schema-sql")
        .arg(&schema)
        .arg("--output-dir")
        .arg(&output_dir)
        .status()
        .expect("should run sqlspan binary");
    assert_eq!(status.code(), Some(1), "not-found should exit 1, got {status:?}");
}

#[test]
fn cli_rejects_unparseable_input() {
    let temp = unique_temp_dir("sqlspan_cli_parse");
    let input = temp.join("broken.sql");
    write(&input, "SELEC nothing FROM");

    let output = Command::new(env!("CARGO_BIN_EXE_sqlspan"))
        .arg(&input)
        .arg("--output-dir")
        .arg(temp.join("out"))
        .output()
        .expect("should run sqlspan binary");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SQL parse error"));
}
