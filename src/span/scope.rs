use super::types::{Field, QuerySpanResult, Relation};
use crate::parser::names::NameCmp;
use crate::relational::{ColumnRef, TableName};

/// A CTE bound by a WITH list.
#[derive(Debug, Clone, PartialEq)]
pub struct CteBinding<V> {
    /// Binding name.
    pub name: String,
    /// Output columns.
    pub columns: Vec<QuerySpanResult<V>>,
}

/// Scope state to roll back to; see [`Scope::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    ctes: usize,
    frames: usize,
    top_len: usize,
}

/// CTE bindings plus the stack of FROM frames of the query being analysed.
///
/// Frames are innermost-last; inside a frame, relations keep FROM order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope<V> {
    ctes: Vec<CteBinding<V>>,
    frames: Vec<Vec<Relation<V>>>,
}

impl<V> Default for Scope<V> {
    fn default() -> Self {
        Self {
            ctes: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl<V: Clone> Scope<V> {
    /// An empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current depth of every stack.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            ctes: self.ctes.len(),
            frames: self.frames.len(),
            top_len: self.frames.last().map_or(0, Vec::len),
        }
    }

    /// Drop everything pushed since `checkpoint`.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.ctes.truncate(checkpoint.ctes);
        self.frames.truncate(checkpoint.frames);
        if let Some(top) = self.frames.last_mut() {
            top.truncate(checkpoint.top_len);
        }
    }

    /// Bind a CTE; later bindings shadow earlier ones.
    pub fn bind_cte(&mut self, name: impl Into<String>, columns: Vec<QuerySpanResult<V>>) {
        self.ctes.push(CteBinding {
            name: name.into(),
            columns,
        });
    }

    /// Replace the columns of the innermost binding.
    pub fn rebind_innermost_cte(&mut self, columns: Vec<QuerySpanResult<V>>) {
        if let Some(binding) = self.ctes.last_mut() {
            binding.columns = columns;
        }
    }

    /// Find a CTE by name, innermost first.
    pub fn find_cte(&self, name: &str, cmp: NameCmp) -> Option<&CteBinding<V>> {
        self.ctes.iter().rev().find(|binding| cmp.eq(&binding.name, name))
    }

    /// Open a new FROM frame.
    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Append a relation to the current frame.
    pub fn add_relation(&mut self, relation: Relation<V>) {
        match self.frames.last_mut() {
            Some(top) => top.push(relation),
            None => self.frames.push(vec![relation]),
        }
    }

    /// Relations of the current frame.
    pub fn current_frame(&self) -> &[Relation<V>] {
        self.frames.last().map_or(&[], Vec::as_slice)
    }

    /// Visible fields of the current frame, in FROM order.
    pub fn visible_fields(&self) -> impl Iterator<Item = &Field<V>> {
        self.current_frame().iter().flat_map(Relation::visible)
    }

    /// Fields of the current frame belonging to `table` (hidden ones included).
    pub fn fields_of(&self, table: &TableName, cmp: NameCmp) -> Vec<&Field<V>> {
        self.current_frame()
            .iter()
            .flat_map(|relation| relation.fields.iter())
            .filter(|field| {
                qualifier_matches(field, table.database.as_deref(), table.schema.as_deref(), cmp)
                    && cmp.eq(&field.table, &table.table)
            })
            .collect()
    }

    /// Resolve a column: current frame first, then outer frames innermost
    /// first; within a frame the first match in FROM order wins.
    pub fn resolve_column(&self, column: &ColumnRef, cmp: NameCmp) -> Option<&Field<V>> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .iter()
                .flat_map(|relation| relation.fields.iter())
                .find(|field| column_matches(field, column, cmp))
        })
    }
}

fn qualifier_matches<V>(
    field: &Field<V>,
    database: Option<&str>,
    schema: Option<&str>,
    cmp: NameCmp,
) -> bool {
    database.is_none_or(|database| cmp.eq(&field.database, database))
        && schema.is_none_or(|schema| cmp.eq(&field.schema, schema))
}

fn column_matches<V>(field: &Field<V>, column: &ColumnRef, cmp: NameCmp) -> bool {
    if !cmp.eq(&field.name, &column.column) {
        return false;
    }
    match column.table.as_deref() {
        // Merged-away join columns are reachable only through their table.
        None => !field.hidden,
        Some(table) => {
            cmp.eq(&field.table, table)
                && qualifier_matches(
                    field,
                    column.database.as_deref(),
                    column.schema.as_deref(),
                    cmp,
                )
        }
    }
}
