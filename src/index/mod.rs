mod bplus_tree;
mod bplus_tree_iterator;
mod index;

pub use bplus_tree::{BplusTree, NodeId};
pub use bplus_tree_iterator::BplusTreeIter;
pub use index::Index;
