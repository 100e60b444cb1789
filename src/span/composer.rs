//! Shape rules for joins, set operations, VALUES, PIVOT/UNPIVOT and aliases.
//!
//! Every function here is pure: it takes evaluated relations or result
//! lists and returns the combined shape.

use super::error::SpanError;
use super::lattice::Lattice;
use super::types::{Field, QuerySpanResult, Relation};
use crate::parser::names::NameCmp;
use crate::relational::{Alias, Position, SetOperator};

/// A join result plus the values of the columns it merged.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedJoin<V> {
    /// Combined relation.
    pub relation: Relation<V>,
    /// Values of merged columns; these act as join predicates.
    pub merged: Vec<V>,
}

/// Left columns then right columns.
pub fn concat<V>(mut left: Relation<V>, right: Relation<V>) -> Relation<V> {
    left.fields.extend(right.fields);
    left
}

/// Collapse every right column whose name also appears on the left.
pub fn natural_join<V: Lattice>(left: Relation<V>, right: Relation<V>, cmp: NameCmp) -> MergedJoin<V> {
    let names: Vec<String> = right.visible().map(|field| field.name.clone()).collect();
    let shared: Vec<String> = names
        .into_iter()
        .filter(|name| left.visible().any(|field| cmp.eq(&field.name, name)))
        .collect();
    merge_columns(left, right, &shared, cmp)
}

/// Merge the listed columns; each must exist on both sides.
pub fn using_join<V: Lattice>(
    left: Relation<V>,
    right: Relation<V>,
    columns: &[String],
    cmp: NameCmp,
    position: Position,
) -> Result<MergedJoin<V>, SpanError> {
    for column in columns {
        for (side, relation) in [("left", &left), ("right", &right)] {
            if !relation.visible().any(|field| cmp.eq(&field.name, column)) {
                return Err(SpanError::mismatch(
                    format!("column \"{column}\" named in USING is missing on the {side} side"),
                    position,
                ));
            }
        }
    }
    Ok(merge_columns(left, right, columns, cmp))
}

fn merge_columns<V: Lattice>(
    mut left: Relation<V>,
    mut right: Relation<V>,
    columns: &[String],
    cmp: NameCmp,
) -> MergedJoin<V> {
    let mut merged = Vec::with_capacity(columns.len());
    for column in columns {
        let Some(right_field) = right
            .fields
            .iter_mut()
            .find(|field| !field.hidden && cmp.eq(&field.name, column))
        else {
            continue;
        };
        let Some(left_field) = left
            .fields
            .iter_mut()
            .find(|field| !field.hidden && cmp.eq(&field.name, column))
        else {
            continue;
        };
        left_field.value.join_assign(&right_field.value);
        left_field.is_plain_field &= right_field.is_plain_field;
        right_field.hidden = true;
        merged.push(left_field.value.clone());
    }
    MergedJoin {
        relation: concat(left, right),
        merged,
    }
}

/// Align N branches of a set operation column by column.
pub fn set_operation<V: Lattice>(
    op: SetOperator,
    branches: Vec<Vec<QuerySpanResult<V>>>,
    position: Position,
) -> Result<Vec<QuerySpanResult<V>>, SpanError> {
    let mut branches = branches.into_iter();
    let Some(mut combined) = branches.next() else {
        return Ok(Vec::new());
    };
    for branch in branches {
        if branch.len() != combined.len() {
            return Err(SpanError::mismatch(
                format!(
                    "each {op} query must have the same number of columns: {} vs {}",
                    combined.len(),
                    branch.len()
                ),
                position,
            ));
        }
        merge_results(&mut combined, &branch);
    }
    Ok(combined)
}

/// Join `next` into `current` position by position; true when a value grew.
///
/// Callers check that both sides have the same width.
pub fn merge_results<V: Lattice>(
    current: &mut [QuerySpanResult<V>],
    next: &[QuerySpanResult<V>],
) -> bool {
    let mut changed = false;
    for (target, incoming) in current.iter_mut().zip(next) {
        changed |= target.value.join_assign(&incoming.value);
        target.is_plain_field &= incoming.is_plain_field;
    }
    changed
}

/// Columns `column1..columnN` of a VALUES list.
pub fn values<V: Lattice>(
    rows: Vec<Vec<V>>,
    position: Position,
) -> Result<Vec<QuerySpanResult<V>>, SpanError> {
    let width = rows.first().map_or(0, Vec::len);
    let mut columns: Vec<QuerySpanResult<V>> = (1..=width)
        .map(|index| QuerySpanResult::computed(format!("column{index}"), V::bottom()))
        .collect();
    for row in rows {
        if row.len() != width {
            return Err(SpanError::mismatch(
                format!("VALUES lists must all be the same length: {width} vs {}", row.len()),
                position,
            ));
        }
        for (column, value) in columns.iter_mut().zip(&row) {
            column.value.join_assign(value);
        }
    }
    Ok(columns)
}

fn take_visible<V>(
    relation: &mut Relation<V>,
    name: &str,
    cmp: NameCmp,
) -> Option<Field<V>> {
    let index = relation
        .fields
        .iter()
        .position(|field| !field.hidden && cmp.eq(&field.name, name))?;
    Some(relation.fields.remove(index))
}

fn new_column<V>(name: &str, value: V) -> Field<V> {
    Field {
        database: String::new(),
        schema: String::new(),
        table: String::new(),
        name: name.to_string(),
        value,
        is_plain_field: false,
        hidden: false,
    }
}

/// Remove the pivot and value columns, then append one column per value.
pub fn pivot<V: Lattice>(
    mut relation: Relation<V>,
    pivot_column: Option<&str>,
    value_column: &str,
    values: &[String],
    cmp: NameCmp,
    position: Position,
) -> Result<Relation<V>, SpanError> {
    let Some(pivot_column) = pivot_column else {
        return Err(SpanError::mismatch(
            "PIVOT aggregate does not read any column",
            position,
        ));
    };
    let pivoted = take_visible(&mut relation, pivot_column, cmp).ok_or_else(|| {
        SpanError::mismatch(
            format!("pivot column \"{pivot_column}\" not found"),
            position,
        )
    })?;
    take_visible(&mut relation, value_column, cmp).ok_or_else(|| {
        SpanError::mismatch(
            format!("pivot value column \"{value_column}\" not found"),
            position,
        )
    })?;
    relation.fields.extend(
        values
            .iter()
            .map(|name| new_column(name, pivoted.value.clone())),
    );
    Ok(relation)
}

/// Fold the listed columns into a name column and a value column.
pub fn unpivot<V: Lattice>(
    mut relation: Relation<V>,
    value_column: &str,
    name_column: &str,
    columns: &[String],
    cmp: NameCmp,
    position: Position,
) -> Result<Relation<V>, SpanError> {
    let mut folded = V::bottom();
    for column in columns {
        let field = take_visible(&mut relation, column, cmp).ok_or_else(|| {
            SpanError::mismatch(format!("unpivot column \"{column}\" not found"), position)
        })?;
        folded.join_assign(&field.value);
    }
    relation.fields.push(new_column(name_column, V::bottom()));
    relation.fields.push(new_column(value_column, folded));
    Ok(relation)
}

/// Requalify every field with the alias and apply its column list.
pub fn apply_alias<V>(
    mut relation: Relation<V>,
    alias: &Alias,
    position: Position,
) -> Result<Relation<V>, SpanError> {
    if !alias.columns.is_empty() {
        let width = relation.fields.iter().filter(|field| !field.hidden).count();
        if width != alias.columns.len() {
            return Err(SpanError::mismatch(
                format!(
                    "alias \"{}\" names {} columns but the source has {width}",
                    alias.name,
                    alias.columns.len()
                ),
                position,
            ));
        }
        let visible = relation.fields.iter_mut().filter(|field| !field.hidden);
        for (field, name) in visible.zip(&alias.columns) {
            field.name = name.clone();
        }
    }
    for field in &mut relation.fields {
        field.database.clear();
        field.schema.clear();
        field.table = alias.name.clone();
    }
    Ok(relation)
}

/// Rename results positionally; an empty list keeps the names.
pub fn rename_results<V>(
    results: &mut [QuerySpanResult<V>],
    names: &[String],
    owner: &str,
    position: Position,
) -> Result<(), SpanError> {
    if names.is_empty() {
        return Ok(());
    }
    if names.len() != results.len() {
        return Err(SpanError::mismatch(
            format!(
                "\"{owner}\" declares {} columns but its query yields {}",
                names.len(),
                results.len()
            ),
            position,
        ));
    }
    for (result, name) in results.iter_mut().zip(names) {
        result.name = name.clone();
    }
    Ok(())
}
