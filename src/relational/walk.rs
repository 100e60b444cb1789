use crate::parser::names::NameCmp;

use super::{
    CteBody, Dml, Expr, FromItem, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
    TableName,
};

/// Collect every relation name a statement reads, skipping names that
/// resolve to a CTE binding in scope at the reference.
pub fn referenced_tables(statement: &Statement, cmp: NameCmp) -> Vec<TableName> {
    let mut walker = TableWalker {
        cmp,
        ctes: Vec::new(),
        tables: Vec::new(),
    };
    match statement {
        Statement::Query(query) => walker.query(query),
        Statement::Dml(dml) => walker.dml(dml),
        Statement::Explain | Statement::Ddl | Statement::Other => {}
    }
    walker.tables
}

/// True when `body` reads an unqualified relation called `name`.
pub fn references_table(body: &SetExpr, name: &str, cmp: NameCmp) -> bool {
    let mut walker = TableWalker {
        cmp,
        ctes: Vec::new(),
        tables: Vec::new(),
    };
    walker.set_expr(body);
    walker
        .tables
        .iter()
        .any(|table| table.is_unqualified() && cmp.eq(&table.table, name))
}

struct TableWalker {
    cmp: NameCmp,
    ctes: Vec<String>,
    tables: Vec<TableName>,
}

impl TableWalker {
    fn query(&mut self, query: &Query) {
        let mark = self.ctes.len();
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                // A recursive arm sees its own binding; a plain body does not.
                match &cte.body {
                    CteBody::Plain(body) => {
                        self.query(body);
                        self.ctes.push(cte.name.clone());
                    }
                    CteBody::Recursive { anchor, recursive } => {
                        self.set_expr(anchor);
                        self.ctes.push(cte.name.clone());
                        self.set_expr(recursive);
                    }
                }
            }
        }
        self.set_expr(&query.body);
        self.ctes.truncate(mark);
    }

    fn dml(&mut self, dml: &Dml) {
        for item in &dml.sources {
            self.from_item(item);
        }
        if let Some(query) = &dml.source_query {
            self.query(query);
        }
        for expr in dml.assignments.iter().chain(dml.selection.as_ref()) {
            self.expr(expr);
        }
        self.select_items(&dml.returning);
    }

    fn set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => self.select(select),
            SetExpr::Query(query) => self.query(query),
            SetExpr::SetOperation { branches, .. } => {
                for branch in branches {
                    self.set_expr(branch);
                }
            }
            SetExpr::Values { rows, .. } => {
                for expr in rows.iter().flatten() {
                    self.expr(expr);
                }
            }
            SetExpr::Table(name) => self.table(name),
            SetExpr::Opaque => {}
        }
    }

    fn select(&mut self, select: &Select) {
        for item in &select.from {
            self.from_item(item);
        }
        self.select_items(&select.projection);
        for expr in [&select.selection, &select.having, &select.qualify]
            .into_iter()
            .flatten()
        {
            self.expr(expr);
        }
    }

    fn select_items(&mut self, items: &[SelectItem]) {
        for item in items {
            if let SelectItem::Expr { expr, .. } = item {
                self.expr(expr);
            }
        }
    }

    fn from_item(&mut self, item: &FromItem) {
        self.table_factor(&item.relation);
        for join in &item.joins {
            self.table_factor(&join.relation);
            if let super::JoinConstraint::On(expr) = &join.constraint {
                self.expr(expr);
            }
        }
    }

    fn table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table { name, .. } => self.table(name),
            TableFactor::Derived { subquery, .. } => self.query(subquery),
            TableFactor::NestedJoin { item, .. } => self.from_item(item),
            TableFactor::Pivot { source, .. } | TableFactor::Unpivot { source, .. } => {
                self.table_factor(source)
            }
            TableFactor::Function { args, .. } => {
                for arg in args {
                    self.expr(arg);
                }
            }
        }
    }

    fn table(&mut self, name: &TableName) {
        let is_cte = name.is_unqualified()
            && self.ctes.iter().any(|cte| self.cmp.eq(cte, &name.table));
        if !is_cte {
            self.tables.push(name.clone());
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Subquery(query) => self.query(query),
            other => {
                for operand in other.operands() {
                    self.expr(operand);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::{Cte, Position, With};

    fn scan(name: &str) -> SetExpr {
        SetExpr::Select(Box::new(Select {
            projection: vec![SelectItem::Wildcard],
            from: vec![FromItem::single(TableFactor::Table {
                name: TableName::bare(name),
                alias: None,
                position: Position::default(),
            })],
            ..Select::default()
        }))
    }

    #[test]
    fn cte_names_are_not_reported_as_tables() {
        let query = Query {
            with: Some(With {
                recursive: false,
                ctes: vec![Cte {
                    name: "recent".to_string(),
                    columns: Vec::new(),
                    body: CteBody::Plain(Box::new(Query::new(scan("orders")))),
                    position: Position::default(),
                }],
            }),
            body: scan("recent"),
            position: Position::default(),
        };
        let tables = referenced_tables(&Statement::Query(Box::new(query)), NameCmp::Exact);
        assert_eq!(tables, vec![TableName::bare("orders")]);
    }

    #[test]
    fn plain_cte_body_does_not_see_its_own_name() {
        let query = Query {
            with: Some(With {
                recursive: false,
                ctes: vec![Cte {
                    name: "t".to_string(),
                    columns: Vec::new(),
                    body: CteBody::Plain(Box::new(Query::new(scan("t")))),
                    position: Position::default(),
                }],
            }),
            body: scan("t"),
            position: Position::default(),
        };
        let tables = referenced_tables(&Statement::Query(Box::new(query)), NameCmp::Exact);
        assert_eq!(tables, vec![TableName::bare("t")]);
    }

    #[test]
    fn references_table_respects_case_policy() {
        assert!(references_table(&scan("CTE"), "cte", NameCmp::IgnoreAsciiCase));
        assert!(!references_table(&scan("CTE"), "cte", NameCmp::Exact));
    }
}
