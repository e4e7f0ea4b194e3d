mod page;
mod record_page;

pub use page::{decode_latin1, encode_latin1, Page, PageType};
pub use record_page::{RecordPage, RecordPageRef};
