mod buffer_pool;
mod frame;
mod lru_k_cache;
mod pinned_block;

pub use buffer_pool::*;
pub use frame::*;
pub use lru_k_cache::*;
pub use pinned_block::*;
