mod catalog;
mod commands;

pub use catalog::Catalog;
pub use commands::{CreateIndexData, CreateTableData, InsertData, QueryData};
