mod table;
mod table_iterator;

pub use table::Table;
pub use table_iterator::TableIterator;
