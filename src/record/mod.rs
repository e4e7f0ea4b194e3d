mod record;
mod schema;
mod value;

pub use record::{Record, RecordBuilder};
pub use schema::{Column, ColumnType, Schema, SchemaBuilder};
pub use value::Value;
