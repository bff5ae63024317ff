//! Constraint grouping
//!
//! Catalog queries return one row per constraint column. This module folds
//! those rows into named groups, ordered by the first row seen for each name,
//! with the columns of a group kept in row order.

use indexmap::IndexMap;

use crate::schema::types::{ConstraintRow, ForeignKeyColumn, IndexColumn};

/// The rows that together define one named key, foreign key or index
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGroup<'a, T> {
    pub name: &'a str,
    pub columns: Vec<&'a T>,
}

/// Group rows by constraint name, preserving first-seen order
pub fn group_constraints<'a, T, I>(rows: I) -> Vec<ConstraintGroup<'a, T>>
where
    T: ConstraintRow + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut groups: IndexMap<&'a str, Vec<&'a T>> = IndexMap::new();

    for row in rows {
        groups.entry(row.constraint_name()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(name, columns)| ConstraintGroup { name, columns })
        .collect()
}

impl<'a> ConstraintGroup<'a, ForeignKeyColumn> {
    /// Referencing and referenced column names, index-aligned
    pub fn column_pairs(&self) -> (Vec<&'a str>, Vec<&'a str>) {
        self.columns
            .iter()
            .map(|row| (row.column.as_str(), row.referenced_column.as_str()))
            .unzip()
    }
}

impl<'a> ConstraintGroup<'a, IndexColumn> {
    /// Key columns, in row order
    pub fn key_columns(&self) -> Vec<&'a IndexColumn> {
        self.columns
            .iter()
            .copied()
            .filter(|row| !row.is_included_column)
            .collect()
    }

    /// Included (non-key) columns, in row order
    pub fn included_columns(&self) -> Vec<&'a IndexColumn> {
        self.columns
            .iter()
            .copied()
            .filter(|row| row.is_included_column)
            .collect()
    }

    pub fn is_unique(&self) -> bool {
        self.columns.first().map_or(false, |row| row.is_unique)
    }
}
