//! Plain data describing the requests a front end hands to the catalog.

use crate::common::{Result, StorageError};
use crate::record::{ColumnType, Record, Schema, Value};
use crate::scan::Predicate;

/// Request to create a table.
#[derive(Debug, Clone)]
pub struct CreateTableData {
    pub table_name: String,
    pub schema: Schema,
}

impl CreateTableData {
    pub fn new(table_name: impl Into<String>, schema: Schema) -> Self {
        Self {
            table_name: table_name.into(),
            schema,
        }
    }
}

/// Request to insert one row. `fields[i]` receives `values[i]`.
#[derive(Debug, Clone)]
pub struct InsertData {
    pub table_name: String,
    pub fields: Vec<String>,
    pub values: Vec<Value>,
}

impl InsertData {
    pub fn new(table_name: impl Into<String>, fields: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            table_name: table_name.into(),
            fields,
            values,
        }
    }

    /// Builds a record laid out by `schema`.
    ///
    /// Values are coerced to the column types where possible: text that
    /// parses as an integer fills an INTEGER column, and integers are
    /// written out as text in a VARCHAR column. Columns not named keep
    /// their type's default. With no field names the values are taken
    /// positionally.
    pub fn to_record(&self, schema: &Schema) -> Result<Record> {
        let fields: Vec<&str> = if self.fields.is_empty() {
            schema.column_names()
        } else {
            self.fields.iter().map(String::as_str).collect()
        };
        if fields.len() != self.values.len() {
            return Err(StorageError::TypeMismatch {
                column: self.table_name.clone(),
                expected: format!("{} values, got {}", fields.len(), self.values.len()),
            });
        }

        let mut values: Vec<Value> = schema
            .columns()
            .map(|c| c.column_type().default_value())
            .collect();

        for (field, value) in fields.into_iter().zip(&self.values) {
            let position = schema
                .column_index(field)
                .ok_or_else(|| StorageError::ColumnNotFound(field.to_string()))?;
            let column_type = schema
                .column(position)
                .map(|c| c.column_type())
                .ok_or_else(|| StorageError::ColumnNotFound(field.to_string()))?;
            values[position] = coerce(field, value, column_type)?;
        }

        Ok(Record::new(values))
    }
}

fn coerce(field: &str, value: &Value, column_type: ColumnType) -> Result<Value> {
    match (column_type, value) {
        (ColumnType::Integer, Value::Int(v)) => Ok(Value::Int(*v)),
        (ColumnType::Integer, Value::Text(s)) => {
            s.trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| StorageError::TypeMismatch {
                    column: field.to_string(),
                    expected: column_type.to_string(),
                })
        }
        (ColumnType::VarChar(_), Value::Text(s)) => Ok(Value::Text(s.clone())),
        (ColumnType::VarChar(_), Value::Int(v)) => Ok(Value::Text(v.to_string())),
    }
}

/// Request to read rows, optionally filtered and projected.
#[derive(Debug, Clone)]
pub struct QueryData {
    pub table_name: String,
    pub fields: Vec<String>,
    pub predicate: Predicate,
}

impl QueryData {
    pub fn new(table_name: impl Into<String>, fields: Vec<String>, predicate: Predicate) -> Self {
        Self {
            table_name: table_name.into(),
            fields,
            predicate,
        }
    }

    /// True for `SELECT *` or an empty field list.
    pub fn projects_all(&self) -> bool {
        self.fields.is_empty() || (self.fields.len() == 1 && self.fields[0] == "*")
    }
}

/// Request to build an index on one column.
#[derive(Debug, Clone)]
pub struct CreateIndexData {
    pub index_name: String,
    pub table_name: String,
    pub field_name: String,
}

impl CreateIndexData {
    pub fn new(
        index_name: impl Into<String>,
        table_name: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            table_name: table_name.into(),
            field_name: field_name.into(),
        }
    }
}
