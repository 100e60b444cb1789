use sqlparser::ast::{CreateTable, Statement};
use tracing::debug;

use super::{
    CatalogLoadError, ColumnMetadata, DatabaseMetadata, InMemoryCatalog, TableMetadata,
    ViewMetadata,
};
use crate::parser::dialect::Dialect;
use crate::parser::names::normalize_object_name;
use crate::parser::sql_parser::parse_statements;

/// Build a database description from CREATE TABLE / CREATE VIEW statements.
///
/// Other statements are ignored. Unqualified names land in the dialect's
/// default schema (or the unnamed schema for schema-less engines).
pub fn database_from_ddl(
    dialect: Dialect,
    database: &str,
    sql: &str,
) -> Result<DatabaseMetadata, CatalogLoadError> {
    let statements =
        parse_statements(dialect, sql).map_err(|err| CatalogLoadError::Ddl(err.to_string()))?;
    let case = dialect.identifier_case();
    let mut metadata = DatabaseMetadata {
        name: database.to_string(),
        schemas: Vec::new(),
    };

    for statement in &statements {
        match statement {
            Statement::CreateTable(CreateTable { name, columns, .. }) => {
                let parts = normalize_object_name(name, case);
                let (schema, table) = split_parts(dialect, &parts);
                let columns = columns
                    .iter()
                    .map(|column| {
                        ColumnMetadata::new(
                            crate::parser::names::normalize_ident(&column.name, case),
                            column.data_type.to_string(),
                        )
                    })
                    .collect();
                debug!(schema = %schema, table = %table, "catalog table from DDL");
                let target = metadata.schema_mut(&schema);
                target.tables.retain(|existing| existing.name != table);
                target.tables.push(TableMetadata {
                    name: table,
                    columns,
                });
            }
            Statement::CreateView { name, query, .. } => {
                let parts = normalize_object_name(name, case);
                let (schema, view) = split_parts(dialect, &parts);
                debug!(schema = %schema, view = %view, "catalog view from DDL");
                let target = metadata.schema_mut(&schema);
                target.views.retain(|existing| existing.name != view);
                target.views.push(ViewMetadata {
                    name: view,
                    definition: query.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(metadata)
}

/// Build an in-memory catalog holding one database described by DDL.
pub fn catalog_from_ddl(
    dialect: Dialect,
    database: &str,
    sql: &str,
) -> Result<InMemoryCatalog, CatalogLoadError> {
    Ok(InMemoryCatalog::new().with_database(database_from_ddl(dialect, database, sql)?))
}

fn split_parts(dialect: Dialect, parts: &[String]) -> (String, String) {
    let table = parts.last().cloned().unwrap_or_default();
    let schema = if dialect.has_schemas() && parts.len() >= 2 {
        parts[parts.len() - 2].clone()
    } else if dialect.has_schemas() {
        dialect.default_schema().unwrap_or_default().to_string()
    } else {
        String::new()
    };
    (schema, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::names::NameCmp;

    #[test]
    fn tables_and_views_land_in_their_schemas() {
        let sql = r#"
            CREATE TABLE Orders (Id INT, "Note" TEXT);
            CREATE TABLE audit.log (id INT);
            CREATE VIEW recent AS SELECT id FROM orders;
            CREATE INDEX idx ON orders (id);
        "#;
        let db = database_from_ddl(Dialect::Postgres, "shop", sql).unwrap();
        let public = db.schema("public", NameCmp::Exact).unwrap();
        let orders = public.table("orders", NameCmp::Exact).unwrap();
        assert_eq!(
            orders.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "Note"]
        );
        assert_eq!(orders.columns[0].column_type, "INT");
        assert!(public.view("recent", NameCmp::Exact).is_some());
        assert!(db.schema("audit", NameCmp::Exact).unwrap().table("log", NameCmp::Exact).is_some());
    }

    #[test]
    fn schema_less_dialects_use_unnamed_schema() {
        let db = database_from_ddl(Dialect::MySql, "shop", "CREATE TABLE t (a INT)").unwrap();
        assert_eq!(db.schema_names().collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(
            database_from_ddl(Dialect::Postgres, "shop", "CREATE TABLE ("),
            Err(CatalogLoadError::Ddl(_))
        ));
    }
}
