use std::fmt::{self, Display, Formatter, Write};

use crate::lineage::{QuerySpan, SourceColumnSet};
use crate::masking::MaskedField;
use crate::output::{AnalyzedStatement, Analysis};

/// Build a Markdown report covering every analysed statement.
pub fn build_report(name: &str, statements: &[AnalyzedStatement]) -> String {
    Report { name, statements }.to_string()
}

struct Report<'a> {
    name: &'a str,
    statements: &'a [AnalyzedStatement],
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "# sqlspan report: {}", self.name)?;

        for (index, statement) in self.statements.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "## Statement {}", index + 1)?;
            writeln!(f)?;
            writeln!(f, "```sql")?;
            writeln!(f, "{}", statement.sql.trim())?;
            writeln!(f, "```")?;
            writeln!(f)?;
            match &statement.analysis {
                Analysis::Lineage(span) => write_lineage(f, span)?,
                Analysis::Masking { fields } => write_masking(f, fields)?,
                Analysis::Failed { error } => writeln!(f, "**Error:** {error}")?,
            }
        }
        Ok(())
    }
}

fn write_lineage(f: &mut Formatter<'_>, span: &QuerySpan) -> fmt::Result {
    writeln!(f, "Query type: `{}`", span.query_type)?;
    if let Some(missing) = &span.not_found {
        writeln!(f)?;
        writeln!(f, "**Incomplete:** {missing}")?;
    }
    if !span.results.is_empty() {
        writeln!(f)?;
        writeln!(f, "| Column | Sources |")?;
        writeln!(f, "|--------|---------|")?;
        for result in &span.results {
            writeln!(f, "| {} | {} |", result.name, format_columns(&result.value))?;
        }
    }
    writeln!(f)?;
    writeln!(f, "Source columns: {}", format_columns(&span.source_columns))?;
    writeln!(f, "Predicate columns: {}", format_columns(&span.predicate_columns))
}

fn write_masking(f: &mut Formatter<'_>, fields: &[MaskedField]) -> fmt::Result {
    writeln!(f, "| Column | Masking |")?;
    writeln!(f, "|--------|---------|")?;
    for field in fields {
        writeln!(f, "| {} | {} |", field.name, field.masking_level)?;
    }
    Ok(())
}

fn format_columns(columns: &SourceColumnSet) -> String {
    if columns.is_empty() {
        return "-".to_string();
    }
    let mut text = String::new();
    for (index, column) in columns.iter().enumerate() {
        if index > 0 {
            text.push_str(", ");
        }
        let _ = write!(text, "`{column}`");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::MaskingLevel;
    use crate::span::{ColumnResource, QueryType, QuerySpanResult, ResourceNotFound};

    #[test]
    fn lineage_report_lists_sources_per_column() {
        let id = ColumnResource::new("shop", "public", "orders", "id");
        let total = ColumnResource::new("shop", "public", "orders", "total");
        let span = QuerySpan {
            query_type: QueryType::Select,
            results: vec![QuerySpanResult {
                name: "id".to_string(),
                value: SourceColumnSet::from([id.clone()]),
                is_plain_field: true,
                is_wildcard: false,
            }],
            source_columns: SourceColumnSet::from([id, total.clone()]),
            predicate_columns: SourceColumnSet::from([total]),
            not_found: None,
        };
        let statements = [AnalyzedStatement {
            sql: "SELECT id FROM orders WHERE total > 10".to_string(),
            analysis: Analysis::Lineage(span),
        }];

        insta::assert_snapshot!(build_report("orders", &statements), @r"
        # sqlspan report: orders

        ## Statement 1

        ```sql
        SELECT id FROM orders WHERE total > 10
        ```

        Query type: `SELECT`

        | Column | Sources |
        |--------|---------|
        | id | `shop.public.orders.id` |

        Source columns: `shop.public.orders.id`, `shop.public.orders.total`
        Predicate columns: `shop.public.orders.total`
        ");
    }

    #[test]
    fn masking_and_failures_render_inline() {
        let statements = [
            AnalyzedStatement {
                sql: "SELECT a FROM t1".to_string(),
                analysis: Analysis::Masking {
                    fields: vec![MaskedField {
                        name: "A".to_string(),
                        masking_level: MaskingLevel::Full,
                    }],
                },
            },
            AnalyzedStatement {
                sql: "SELECT x FROM nowhere".to_string(),
                analysis: Analysis::Failed {
                    error: ResourceNotFound::table("db", "public", "nowhere").to_string(),
                },
            },
        ];
        let report = build_report("mixed", &statements);
        assert!(report.contains("| A | FULL |"));
        assert!(report.contains("## Statement 2"));
        assert!(report.contains("**Error:** table \"db.public.nowhere\" not found"));
    }
}
