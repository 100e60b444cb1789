use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{
    BigQueryDialect, ClickHouseDialect, DuckDbDialect, GenericDialect, MsSqlDialect,
    MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
};

use super::names::{IdentifierCase, NameCmp};
use crate::relational::TableName;

/// SQL dialects the front end can lower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ANSI-ish catch-all.
    Generic,
    /// PostgreSQL.
    #[default]
    Postgres,
    /// Amazon Redshift.
    Redshift,
    /// MySQL / MariaDB / TiDB.
    MySql,
    /// Snowflake.
    Snowflake,
    /// Microsoft SQL Server.
    MsSql,
    /// Google BigQuery.
    BigQuery,
    /// ClickHouse.
    ClickHouse,
    /// SQLite.
    Sqlite,
    /// DuckDB.
    DuckDb,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Dialect; 10] = [
        Dialect::Generic,
        Dialect::Postgres,
        Dialect::Redshift,
        Dialect::MySql,
        Dialect::Snowflake,
        Dialect::MsSql,
        Dialect::BigQuery,
        Dialect::ClickHouse,
        Dialect::Sqlite,
        Dialect::DuckDb,
    ];

    /// The `sqlparser` dialect used to parse statements.
    pub fn parser_dialect(self) -> Box<dyn sqlparser::dialect::Dialect> {
        match self {
            Dialect::Generic => Box::new(GenericDialect {}),
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
            Dialect::MySql => Box::new(MySqlDialect {}),
            Dialect::Snowflake => Box::new(SnowflakeDialect {}),
            Dialect::MsSql => Box::new(MsSqlDialect {}),
            Dialect::BigQuery => Box::new(BigQueryDialect {}),
            Dialect::ClickHouse => Box::new(ClickHouseDialect {}),
            Dialect::Sqlite => Box::new(SQLiteDialect {}),
            Dialect::DuckDb => Box::new(DuckDbDialect {}),
        }
    }

    /// Folding rule for unquoted identifiers.
    pub fn identifier_case(self) -> IdentifierCase {
        match self {
            Dialect::Postgres | Dialect::Redshift | Dialect::DuckDb => IdentifierCase::Lower,
            Dialect::Snowflake => IdentifierCase::Upper,
            _ => IdentifierCase::Preserve,
        }
    }

    /// Comparison policy for normalized names.
    pub fn name_cmp(self) -> NameCmp {
        self.identifier_case().comparison()
    }

    /// Schema assumed for unqualified relation names.
    pub fn default_schema(self) -> Option<&'static str> {
        match self {
            Dialect::Postgres | Dialect::Redshift => Some("public"),
            Dialect::DuckDb => Some("main"),
            Dialect::Snowflake => Some("PUBLIC"),
            Dialect::MsSql => Some("dbo"),
            _ => None,
        }
    }

    /// False for engines where databases hold tables directly.
    pub fn has_schemas(self) -> bool {
        !matches!(self, Dialect::MySql | Dialect::ClickHouse | Dialect::Sqlite)
    }

    /// True when `$N` refers to the N-th column of the current sources.
    pub fn supports_positional_columns(self) -> bool {
        matches!(self, Dialect::Snowflake)
    }

    /// True when a CTE may read itself without `WITH RECURSIVE`.
    pub fn implicit_recursive_ctes(self) -> bool {
        matches!(self, Dialect::Snowflake | Dialect::MsSql)
    }

    /// Schemas (or databases, for schema-less engines) holding catalog views.
    pub fn system_schemas(self) -> &'static [&'static str] {
        match self {
            Dialect::Postgres => &["pg_catalog", "information_schema", "pg_toast"],
            Dialect::Redshift => &["pg_catalog", "information_schema", "pg_internal"],
            Dialect::MySql => &["information_schema", "mysql", "performance_schema", "sys"],
            Dialect::Snowflake => &["INFORMATION_SCHEMA"],
            Dialect::MsSql => &["sys", "INFORMATION_SCHEMA"],
            Dialect::ClickHouse => &["system", "information_schema", "INFORMATION_SCHEMA"],
            Dialect::DuckDb => &["information_schema", "pg_catalog"],
            Dialect::BigQuery => &["INFORMATION_SCHEMA"],
            Dialect::Generic | Dialect::Sqlite => &["information_schema"],
        }
    }

    /// True when `name` addresses a system catalog object.
    pub fn is_system_table(self, name: &TableName) -> bool {
        let container = if self.has_schemas() {
            name.schema.as_deref()
        } else {
            name.database.as_deref()
        };
        if let Some(container) = container {
            return self
                .system_schemas()
                .iter()
                .any(|system| system.eq_ignore_ascii_case(container));
        }
        match self {
            Dialect::Postgres | Dialect::Redshift => name.table.starts_with("pg_"),
            Dialect::Sqlite => name.table.starts_with("sqlite_"),
            _ => false,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Postgres => "postgres",
            Dialect::Redshift => "redshift",
            Dialect::MySql => "mysql",
            Dialect::Snowflake => "snowflake",
            Dialect::MsSql => "mssql",
            Dialect::BigQuery => "bigquery",
            Dialect::ClickHouse => "clickhouse",
            Dialect::Sqlite => "sqlite",
            Dialect::DuckDb => "duckdb",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Ok(Dialect::Generic),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "redshift" => Ok(Dialect::Redshift),
            "mysql" | "mariadb" | "tidb" => Ok(Dialect::MySql),
            "snowflake" => Ok(Dialect::Snowflake),
            "mssql" | "sqlserver" | "tsql" => Ok(Dialect::MsSql),
            "bigquery" => Ok(Dialect::BigQuery),
            "clickhouse" => Ok(Dialect::ClickHouse),
            "sqlite" => Ok(Dialect::Sqlite),
            "duckdb" => Ok(Dialect::DuckDb),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.as_str().parse::<Dialect>(), Ok(dialect));
        }
        assert_eq!("PostgreSQL".parse::<Dialect>(), Ok(Dialect::Postgres));
        assert!("cobol".parse::<Dialect>().is_err());
    }

    #[test]
    fn default_schemas_follow_engine_conventions() {
        assert_eq!(Dialect::Postgres.default_schema(), Some("public"));
        assert_eq!(Dialect::Snowflake.default_schema(), Some("PUBLIC"));
        assert_eq!(Dialect::MsSql.default_schema(), Some("dbo"));
        assert_eq!(Dialect::MySql.default_schema(), None);
    }

    #[test]
    fn system_tables_are_detected_per_dialect() {
        let info = TableName {
            database: None,
            schema: Some("information_schema".to_string()),
            table: "tables".to_string(),
        };
        assert!(Dialect::Postgres.is_system_table(&info));
        assert!(Dialect::Postgres.is_system_table(&TableName::bare("pg_class")));
        assert!(!Dialect::Postgres.is_system_table(&TableName::bare("orders")));

        let mysql = TableName {
            database: Some("performance_schema".to_string()),
            schema: None,
            table: "threads".to_string(),
        };
        assert!(Dialect::MySql.is_system_table(&mysql));
        assert!(!Dialect::MySql.is_system_table(&TableName::bare("pg_class")));
    }

    #[test]
    fn case_folding_matches_engine() {
        assert_eq!(Dialect::Postgres.identifier_case(), IdentifierCase::Lower);
        assert_eq!(Dialect::Snowflake.identifier_case(), IdentifierCase::Upper);
        assert_eq!(Dialect::MySql.name_cmp(), NameCmp::IgnoreAsciiCase);
    }
}
