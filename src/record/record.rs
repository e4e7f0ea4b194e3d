use bytes::{Buf, BufMut};

use crate::common::{Result, StorageError, MAX_VARCHAR_BYTES};
use crate::storage::page::decode_latin1;

use super::value::stored_text;
use super::{ColumnType, Schema, Value};

/// A row of typed values, positionally aligned with a schema.
///
/// Serialized layout, fields in column order with no padding:
///   INTEGER -> 4 bytes little-endian
///   VARCHAR -> 1-byte length + ISO-8859-1 bytes (cut at 255 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the value at the given column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of the named column under `schema`.
    pub fn value_by_name(&self, schema: &Schema, name: &str) -> Option<&Value> {
        schema.column_index(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks that the record has one value of the right type per column.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if self.values.len() != schema.column_count() {
            return Err(StorageError::TypeMismatch {
                column: "*".to_string(),
                expected: format!("{} values", schema.column_count()),
            });
        }
        for (value, column) in self.values.iter().zip(schema.columns()) {
            if !value.matches(&column.column_type()) {
                return Err(StorageError::TypeMismatch {
                    column: column.name().to_string(),
                    expected: column.column_type().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Returns the number of bytes `to_bytes` produces.
    pub fn serialized_size(&self, schema: &Schema) -> Result<usize> {
        self.validate(schema)?;
        Ok(self
            .values
            .iter()
            .map(|value| match value {
                Value::Int(_) => 4,
                Value::Text(s) => 1 + s.chars().count().min(MAX_VARCHAR_BYTES),
            })
            .sum())
    }

    /// Serializes the record according to `schema`.
    pub fn to_bytes(&self, schema: &Schema) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.serialized_size(schema)?);
        for value in &self.values {
            match value {
                Value::Int(v) => buf.put_i32_le(*v),
                Value::Text(s) => {
                    let encoded = stored_text(s);
                    buf.put_u8(encoded.len() as u8);
                    buf.put_slice(&encoded);
                }
            }
        }
        Ok(buf)
    }

    /// Deserializes a record by walking the schema's columns in order.
    pub fn from_bytes(schema: &Schema, data: &[u8]) -> Result<Record> {
        let total = data.len();
        let mut buf = data;
        let mut values = Vec::with_capacity(schema.column_count());

        for column in schema.columns() {
            let offset = total - buf.remaining();
            match column.column_type() {
                ColumnType::Integer => {
                    if buf.remaining() < 4 {
                        return Err(truncated(offset, 4, total));
                    }
                    values.push(Value::Int(buf.get_i32_le()));
                }
                ColumnType::VarChar(_) => {
                    if buf.remaining() < 1 {
                        return Err(truncated(offset, 1, total));
                    }
                    let len = buf.get_u8() as usize;
                    if buf.remaining() < len {
                        return Err(truncated(offset + 1, len, total));
                    }
                    values.push(Value::Text(decode_latin1(&buf[..len])));
                    buf.advance(len);
                }
            }
        }

        Ok(Record::new(values))
    }
}

fn truncated(offset: usize, len: usize, capacity: usize) -> StorageError {
    StorageError::PageBoundary {
        offset,
        len,
        capacity,
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::new(values)
    }
}

/// Builder for constructing records fluently.
#[derive(Default)]
pub struct RecordBuilder {
    values: Vec<Value>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn build(self) -> Record {
        Record::new(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::builder().integer("id").varchar("name", 20).build()
    }

    #[test]
    fn test_record_roundtrip() {
        let schema = schema();
        let record = RecordBuilder::new().value(7).value("alice").build();

        let bytes = record.to_bytes(&schema).unwrap();
        assert_eq!(bytes.len(), 4 + 1 + 5);
        assert_eq!(record.serialized_size(&schema).unwrap(), bytes.len());
        assert_eq!(Record::from_bytes(&schema, &bytes).unwrap(), record);
    }

    #[test]
    fn test_long_varchar_is_truncated() {
        let schema = schema();
        let long = "x".repeat(300);
        let record = RecordBuilder::new().value(1).value(long.as_str()).build();

        let bytes = record.to_bytes(&schema).unwrap();
        assert_eq!(bytes.len(), 4 + 1 + 255);

        let decoded = Record::from_bytes(&schema, &bytes).unwrap();
        assert_eq!(decoded.value(1), Some(&Value::Text("x".repeat(255))));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let schema = schema();
        let record = RecordBuilder::new().value("oops").value("alice").build();
        assert!(matches!(
            record.to_bytes(&schema),
            Err(StorageError::TypeMismatch { .. })
        ));

        let short = RecordBuilder::new().value(1).build();
        assert!(short.validate(&schema).is_err());
    }

    #[test]
    fn test_truncated_bytes_rejected() {
        let schema = schema();
        assert!(Record::from_bytes(&schema, &[1, 0]).is_err());
        assert!(Record::from_bytes(&schema, &[1, 0, 0, 0, 9, b'a']).is_err());
    }
}
