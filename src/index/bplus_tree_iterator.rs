use super::bplus_tree::{BplusTree, Node, NodeId};

/// Walks a tree's leaf chain from the leftmost leaf, yielding pairs in key order.
pub struct BplusTreeIter<'a, K, V> {
    tree: &'a BplusTree<K, V>,
    current_leaf: Option<NodeId>,
    current_index: usize,
}

impl<'a, K, V> BplusTreeIter<'a, K, V> {
    pub(crate) fn new(tree: &'a BplusTree<K, V>, start_leaf: NodeId) -> Self {
        Self {
            tree,
            current_leaf: Some(start_leaf),
            current_index: 0,
        }
    }
}

impl<'a, K: Ord + Clone, V: Clone> Iterator for BplusTreeIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(leaf) = self.current_leaf {
            match self.tree.node(leaf) {
                Node::Leaf {
                    keys,
                    values,
                    next_leaf,
                } => {
                    if self.current_index < keys.len() {
                        let i = self.current_index;
                        self.current_index += 1;
                        return Some((&keys[i], &values[i]));
                    }
                    // empty or exhausted leaf, move on
                    self.current_leaf = *next_leaf;
                    self.current_index = 0;
                }
                Node::Internal { .. } => {
                    self.current_leaf = None;
                }
            }
        }
        None
    }
}
