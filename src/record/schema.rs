use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::MAX_VARCHAR_BYTES;

use super::Value;

/// Column types supported by records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 4-byte signed integer
    Integer,
    /// Variable-length text with a declared maximum length
    VarChar(u16),
}

impl ColumnType {
    /// Returns the largest number of bytes a value of this type occupies.
    /// The declared VARCHAR length is not enforced on storage; values are
    /// only cut at `MAX_VARCHAR_BYTES`.
    pub fn max_size(&self) -> usize {
        match self {
            ColumnType::Integer => 4,
            ColumnType::VarChar(_) => 1 + MAX_VARCHAR_BYTES,
        }
    }

    /// Value used for columns left out of an insert.
    pub fn default_value(&self) -> Value {
        match self {
            ColumnType::Integer => Value::Int(0),
            ColumnType::VarChar(_) => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::VarChar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }
}

/// Ordered column list of a table. Column order is the physical field
/// order of serialized records. Name lookups ignore ASCII case.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,
    /// Lowercased column name to column index
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    pub fn new(columns: Vec<Column>) -> Self {
        let name_to_index = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name.to_ascii_lowercase(), i))
            .collect();

        Self {
            columns,
            name_to_index,
        }
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the number of columns in the schema.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column at the given index.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the column with the given name.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).and_then(|i| self.columns.get(i))
    }

    /// Returns the index of the column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns an iterator over all columns.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Returns the largest serialized record size under this schema.
    pub fn max_record_size(&self) -> usize {
        self.columns.iter().map(|c| c.column_type.max_size()).sum()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Builder for constructing schemas fluently.
#[derive(Default)]
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column of any type.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    /// Adds an INTEGER column.
    pub fn integer(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Integer)
    }

    /// Adds a VARCHAR column with the given maximum length.
    pub fn varchar(self, name: impl Into<String>, max_len: u16) -> Self {
        self.column(name, ColumnType::VarChar(max_len))
    }

    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }

    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}
