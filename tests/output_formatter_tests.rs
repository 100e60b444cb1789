mod support;

use sqlspan::output::{formatter, report, Analysis, AnalyzedStatement};
use support::shop_lineage;

fn unique_temp_dir(prefix: &str) -> std::path::PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}

fn analyzed(sql: &str) -> AnalyzedStatement {
    AnalyzedStatement {
        sql: sql.to_string(),
        analysis: Analysis::Lineage(shop_lineage(sql)),
    }
}

#[test]
fn formatter_writes_the_same_report_as_the_report_builder() {
    let statements = [
        analyzed("SELECT name FROM big_customers"),
        analyzed("SELECT * FROM nowhere"),
    ];
    let expected = report::build_report("shop", &statements);

    let out_dir = unique_temp_dir("sqlspan_formatter");
    formatter::write_output(&out_dir, "shop", &statements).unwrap();
    let written = std::fs::read_to_string(out_dir.join("shop_report.md")).unwrap();

    assert_eq!(
        written, expected,
        "output formatter should match report::build_report exactly"
    );
    assert!(written.contains("**Incomplete:** table \"shop.public.nowhere\" not found"));
}

#[test]
fn span_json_round_trips_through_serde() {
    let statements = [analyzed("SELECT c.name FROM customers c WHERE c.region = 'EU'")];
    let out_dir = unique_temp_dir("sqlspan_formatter_json");
    formatter::write_output(&out_dir, "eu", &statements).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("eu_span.json")).unwrap())
            .unwrap();
    let entry = &json[0];
    assert_eq!(entry["query_type"], "select");
    assert_eq!(entry["results"][0]["name"], "name");
    assert_eq!(entry["results"][0]["is_plain_field"], true);
    assert_eq!(
        entry["predicate_columns"][0],
        serde_json::json!({
            "database": "shop",
            "schema": "public",
            "table": "customers",
            "column": "region"
        })
    );
    assert!(entry.get("not_found").is_none());
}
