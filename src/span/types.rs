use std::fmt;

use serde::{Deserialize, Serialize};

use super::lattice::{Domain, Lattice};
use crate::catalog::ColumnMetadata;

/// Identity of one physical column.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnResource {
    /// Database name.
    pub database: String,
    /// Schema name; empty for schema-less engines.
    pub schema: String,
    /// Table or view name.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl ColumnResource {
    /// Build a resource from its four parts.
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [&self.database, &self.schema, &self.table, &self.column];
        let mut first = true;
        for part in parts.into_iter().filter(|part| !part.is_empty()) {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

/// Kind of statement a span was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Query over user tables.
    Select,
    /// Query touching only system catalog objects.
    SelectInfoSchema,
    /// EXPLAIN statement.
    Explain,
    /// INSERT / UPDATE / DELETE.
    Dml,
    /// Schema change.
    Ddl,
    /// Anything else.
    Unknown,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QueryType::Select => "SELECT",
            QueryType::SelectInfoSchema => "SELECT (system catalog)",
            QueryType::Explain => "EXPLAIN",
            QueryType::Dml => "DML",
            QueryType::Ddl => "DDL",
            QueryType::Unknown => "UNKNOWN",
        };
        f.write_str(text)
    }
}

/// One output column of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpanResult<V> {
    /// Output name.
    pub name: String,
    /// Propagated value.
    pub value: V,
    /// True when the column is a direct column reference.
    pub is_plain_field: bool,
    /// True when the column came from `*` or `t.*`.
    pub is_wildcard: bool,
}

impl<V> QuerySpanResult<V> {
    /// A computed (non-plain, non-wildcard) result.
    pub fn computed(name: impl Into<String>, value: V) -> Self {
        Self {
            name: name.into(),
            value,
            is_plain_field: false,
            is_wildcard: false,
        }
    }
}

/// A source the FROM clause can read.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource<V> {
    /// Catalog table.
    PhysicalTable {
        /// Database name.
        database: String,
        /// Schema name.
        schema: String,
        /// Table name.
        name: String,
        /// Catalog columns in declaration order.
        columns: Vec<ColumnMetadata>,
    },
    /// Catalog view, expanded through the engine.
    PhysicalView {
        /// Database name.
        database: String,
        /// Schema name.
        schema: String,
        /// View name.
        name: String,
        /// Output columns of the view definition.
        columns: Vec<QuerySpanResult<V>>,
    },
    /// CTE, subquery, pivot result or table function.
    PseudoTable {
        /// Binding name; empty for anonymous sources.
        name: String,
        /// Output columns.
        columns: Vec<QuerySpanResult<V>>,
    },
}

impl<V: Lattice> TableSource<V> {
    /// Name of the source.
    pub fn name(&self) -> &str {
        match self {
            TableSource::PhysicalTable { name, .. }
            | TableSource::PhysicalView { name, .. }
            | TableSource::PseudoTable { name, .. } => name,
        }
    }

    /// Number of columns the source exposes.
    pub fn width(&self) -> usize {
        match self {
            TableSource::PhysicalTable { columns, .. } => columns.len(),
            TableSource::PhysicalView { columns, .. } | TableSource::PseudoTable { columns, .. } => {
                columns.len()
            }
        }
    }

    /// Flatten into qualified fields, seeding physical columns from `domain`.
    pub fn into_relation<D>(self, domain: &D) -> Relation<V>
    where
        D: Domain<Value = V> + ?Sized,
    {
        let fields = match self {
            TableSource::PhysicalTable {
                database,
                schema,
                name,
                columns,
            } => columns
                .into_iter()
                .map(|column| {
                    let resource =
                        ColumnResource::new(&database, &schema, &name, &column.name);
                    Field {
                        database: database.clone(),
                        schema: schema.clone(),
                        table: name.clone(),
                        value: domain.column_value(&resource),
                        name: column.name,
                        is_plain_field: true,
                        hidden: false,
                    }
                })
                .collect(),
            TableSource::PhysicalView {
                database,
                schema,
                name,
                columns,
            } => columns
                .into_iter()
                .map(|result| Field {
                    database: database.clone(),
                    schema: schema.clone(),
                    table: name.clone(),
                    name: result.name,
                    value: result.value,
                    is_plain_field: result.is_plain_field,
                    hidden: false,
                })
                .collect(),
            TableSource::PseudoTable { name, columns } => columns
                .into_iter()
                .map(|result| Field {
                    database: String::new(),
                    schema: String::new(),
                    table: name.clone(),
                    name: result.name,
                    value: result.value,
                    is_plain_field: result.is_plain_field,
                    hidden: false,
                })
                .collect(),
        };
        Relation { fields }
    }
}

/// One qualified column contributed to a FROM frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<V> {
    /// Database qualification; empty for pseudo sources.
    pub database: String,
    /// Schema qualification; empty for pseudo sources.
    pub schema: String,
    /// Table (or alias) qualification.
    pub table: String,
    /// Column name.
    pub name: String,
    /// Propagated value.
    pub value: V,
    /// True when the column is a direct column of its source.
    pub is_plain_field: bool,
    /// Merged away by NATURAL/USING: reachable only by qualified reference.
    pub hidden: bool,
}

impl<V: Clone> Field<V> {
    /// Convert into an output column.
    pub fn to_result(&self, is_wildcard: bool) -> QuerySpanResult<V> {
        QuerySpanResult {
            name: self.name.clone(),
            value: self.value.clone(),
            is_plain_field: self.is_plain_field,
            is_wildcard,
        }
    }
}

/// The ordered, qualified column list of one FROM source.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation<V> {
    /// Fields in source order, hidden ones included.
    pub fields: Vec<Field<V>>,
}

impl<V> Default for Relation<V> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<V: Clone> Relation<V> {
    /// Build an anonymous relation from output columns.
    pub fn from_results(table: &str, results: Vec<QuerySpanResult<V>>) -> Self {
        let fields = results
            .into_iter()
            .map(|result| Field {
                database: String::new(),
                schema: String::new(),
                table: table.to_string(),
                name: result.name,
                value: result.value,
                is_plain_field: result.is_plain_field,
                hidden: false,
            })
            .collect();
        Self { fields }
    }

    /// Fields visible to `*` and positional references.
    pub fn visible(&self) -> impl Iterator<Item = &Field<V>> {
        self.fields.iter().filter(|field| !field.hidden)
    }

    /// Number of visible fields.
    pub fn width(&self) -> usize {
        self.visible().count()
    }

    /// Visible fields as output columns.
    pub fn into_results(self) -> Vec<QuerySpanResult<V>> {
        self.fields
            .into_iter()
            .filter(|field| !field.hidden)
            .map(|field| QuerySpanResult {
                name: field.name,
                value: field.value,
                is_plain_field: field.is_plain_field,
                is_wildcard: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::{LineageDomain, SourceColumnSet};

    #[test]
    fn column_resource_display_skips_empty_parts() {
        assert_eq!(
            ColumnResource::new("db", "public", "t", "a").to_string(),
            "db.public.t.a"
        );
        assert_eq!(ColumnResource::new("db", "", "t", "a").to_string(), "db.t.a");
    }

    #[test]
    fn physical_table_fields_are_seeded_from_domain() {
        let source: TableSource<SourceColumnSet> = TableSource::PhysicalTable {
            database: "db".to_string(),
            schema: "public".to_string(),
            name: "t".to_string(),
            columns: vec![ColumnMetadata::new("a", "int"), ColumnMetadata::new("b", "text")],
        };
        assert_eq!(source.width(), 2);
        let relation = source.into_relation(&LineageDomain);
        assert_eq!(relation.width(), 2);
        let first = &relation.fields[0];
        assert_eq!(first.table, "t");
        assert!(first.is_plain_field);
        assert!(first
            .value
            .contains(&ColumnResource::new("db", "public", "t", "a")));
    }

    #[test]
    fn hidden_fields_are_skipped_by_width_and_results() {
        let mut relation = Relation::from_results(
            "x",
            vec![
                QuerySpanResult::computed("a", SourceColumnSet::default()),
                QuerySpanResult::computed("b", SourceColumnSet::default()),
            ],
        );
        relation.fields[1].hidden = true;
        assert_eq!(relation.width(), 1);
        let results = relation.into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "a");
    }
}
