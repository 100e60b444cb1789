use std::fs;

fn read(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

#[test]
fn propagation_engine_has_single_source_of_truth() {
    let engine = [
        "src/span/extractor.rs",
        "src/span/resolver.rs",
        "src/span/expression.rs",
        "src/span/select_list.rs",
        "src/span/fixpoint.rs",
    ];
    let domains = ["src/lineage/mod.rs", "src/masking/mod.rs", "src/masking/policy.rs"];

    for marker in ["fn bind_recursive_cte(", "fn resolve_table(", "fn expand_select_list("] {
        let definitions = engine
            .iter()
            .chain(domains.iter())
            .map(|path| read(path).matches(marker).count())
            .sum::<usize>();
        assert_eq!(
            definitions, 1,
            "expected a single `{marker}` implementation, found {definitions}"
        );
    }

    for path in domains {
        assert!(
            !read(path).contains("SpanExtractor"),
            "{path} should reach the engine only through span::analyze"
        );
    }
}

#[test]
fn sqlparser_stays_behind_the_front_end() {
    for path in [
        "src/span/extractor.rs",
        "src/span/resolver.rs",
        "src/span/expression.rs",
        "src/span/composer.rs",
        "src/lineage/mod.rs",
        "src/masking/mod.rs",
    ] {
        assert!(
            !read(path).contains("sqlparser::"),
            "{path} should work on the relational tree, not the sqlparser AST"
        );
    }
}
