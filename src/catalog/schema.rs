use std::fmt::Display;
use std::mem::size_of;

use crate::common::TEXT_LEN;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeId {
    Integer,
    Text,
}

impl TypeId {
    /// Returns how many bytes a serialized field of this type occupies.
    /// Fields are fixed-width: text carries a length prefix plus a padded
    /// payload of `TEXT_LEN` bytes.
    pub fn size(&self) -> usize {
        match self {
            TypeId::Integer => size_of::<i32>(),
            TypeId::Text => size_of::<u32>() + TEXT_LEN,
        }
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDefinition {
    type_id: TypeId,
    column_name: String,
}

impl ColumnDefinition {
    pub fn new(type_id: TypeId, column_name: impl Into<String>) -> Self {
        Self {
            type_id,
            column_name: column_name.into(),
        }
    }

    /// Creates an anonymous column where only the type is known.
    pub fn with_type_id(type_id: TypeId) -> Self {
        Self {
            type_id,
            column_name: String::new(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

/// An ordered column list describing the layout of a tuple. Two schemas are
/// considered equal when their column types match positionally; column names
/// carry no weight.
#[derive(Clone, Debug, Eq)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> &ColumnDefinition {
        &self.columns[idx]
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.column_name().eq(name))
    }

    /// The size in bytes of a serialized tuple with this schema.
    pub fn size(&self) -> usize {
        self.columns.iter().map(|col| col.type_id().size()).sum()
    }

    /// Concatenates two schemas, the columns of `self` first.
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Schema::new(columns)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.type_id() == b.type_id())
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDefinition, Schema, TypeId};
    use crate::common::TEXT_LEN;

    #[test]
    fn schema_size_is_sum_of_field_sizes() {
        let schema = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "id"),
            ColumnDefinition::new(TypeId::Text, "name"),
            ColumnDefinition::new(TypeId::Integer, "count"),
        ]);
        assert_eq!(schema.size(), 4 + (4 + TEXT_LEN) + 4);
    }

    #[test]
    fn schema_equality_ignores_column_names() {
        let left = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "a"),
            ColumnDefinition::new(TypeId::Text, "b"),
        ]);
        let right = Schema::new(vec![
            ColumnDefinition::with_type_id(TypeId::Integer),
            ColumnDefinition::with_type_id(TypeId::Text),
        ]);
        assert_eq!(left, right);

        let different = Schema::new(vec![
            ColumnDefinition::new(TypeId::Text, "a"),
            ColumnDefinition::new(TypeId::Integer, "b"),
        ]);
        assert_ne!(left, different);
    }

    #[test]
    fn merge_concatenates_columns() {
        let left = Schema::new(vec![ColumnDefinition::new(TypeId::Integer, "id")]);
        let right = Schema::new(vec![
            ColumnDefinition::new(TypeId::Text, "name"),
            ColumnDefinition::new(TypeId::Integer, "age"),
        ]);

        let merged = left.merge(&right);
        assert_eq!(merged.column_count(), 3);
        assert_eq!(merged.column(0).column_name(), "id");
        assert_eq!(merged.column(2).column_name(), "age");
        assert_eq!(merged.size(), left.size() + right.size());
    }

    #[test]
    fn find_column_returns_first_match() {
        let schema = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "id"),
            ColumnDefinition::new(TypeId::Text, "name"),
        ]);
        assert_eq!(schema.find_column("name"), Some(1));
        assert_eq!(schema.find_column("missing"), None);
    }
}
