use crate::common::{Result, StorageError};
use crate::record::{Record, Schema, Value};

/// Field access over the current row of a scan.
pub trait RecordScan {
    fn get_int(&self, field: &str) -> Result<i32>;

    fn get_string(&self, field: &str) -> Result<String>;

    fn has_field(&self, field: &str) -> bool;
}

/// Exposes one record, read through its schema, as a `RecordScan`.
pub struct RecordScanAdapter<'a> {
    record: &'a Record,
    schema: &'a Schema,
}

impl<'a> RecordScanAdapter<'a> {
    pub fn new(record: &'a Record, schema: &'a Schema) -> Self {
        Self { record, schema }
    }

    fn value(&self, field: &str) -> Result<&'a Value> {
        self.record
            .value_by_name(self.schema, field)
            .ok_or_else(|| StorageError::ColumnNotFound(field.to_string()))
    }
}

impl RecordScan for RecordScanAdapter<'_> {
    fn get_int(&self, field: &str) -> Result<i32> {
        self.value(field)?
            .as_int()
            .ok_or_else(|| StorageError::TypeMismatch {
                column: field.to_string(),
                expected: "INTEGER".to_string(),
            })
    }

    fn get_string(&self, field: &str) -> Result<String> {
        self.value(field)?
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| StorageError::TypeMismatch {
                column: field.to_string(),
                expected: "VARCHAR".to_string(),
            })
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.has_column(field)
    }
}
