use std::fmt;
use std::ops::RangeInclusive;

use crate::common::{Result, StorageError, MIN_BTREE_DEGREE};

use super::BplusTreeIter;

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A tree node.
///
/// Internal nodes: child[i] holds keys < keys[i], child[i+1] holds keys >= keys[i],
/// so `children.len() == keys.len() + 1`.
/// Leaves: `keys.len() == values.len()`, linked left to right through `next_leaf`.
#[derive(Debug, Clone)]
pub(crate) enum Node<K, V> {
    Leaf {
        keys: Vec<K>,
        values: Vec<V>,
        next_leaf: Option<NodeId>,
    },
    Internal {
        keys: Vec<K>,
        children: Vec<NodeId>,
    },
}

/// In-memory B+ tree mapping keys to values, with duplicate keys allowed.
///
/// Nodes live in an arena and refer to each other by `NodeId`, so the leaf
/// chain holds plain indices rather than owning pointers. A node splits once
/// it holds `max_degree` keys.
#[derive(Debug, Clone)]
pub struct BplusTree<K, V> {
    nodes: Vec<Node<K, V>>,
    root: NodeId,
    max_degree: usize,
    len: usize,
}

impl<K: Ord + Clone, V: Clone> BplusTree<K, V> {
    /// Creates an empty tree. `max_degree` must be at least 3.
    pub fn new(max_degree: usize) -> Result<Self> {
        if max_degree < MIN_BTREE_DEGREE {
            return Err(StorageError::InvalidDegree(max_degree));
        }
        Ok(Self {
            nodes: vec![Node::Leaf {
                keys: Vec::new(),
                values: Vec::new(),
                next_leaf: None,
            }],
            root: NodeId(0),
            max_degree,
            len: 0,
        })
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the leaf level.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal { children, .. } = &self.nodes[current.0] {
            current = children[0];
            height += 1;
        }
        height
    }

    /// Returns the value bound to `key`. With duplicates, returns the
    /// copy found by the insertion descent.
    pub fn search(&self, key: &K) -> Option<V> {
        let (leaf, _) = self.find_leaf(key);
        match &self.nodes[leaf.0] {
            Node::Leaf { keys, values, .. } => keys
                .binary_search(key)
                .ok()
                .map(|pos| values[pos].clone()),
            Node::Internal { .. } => None,
        }
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        !self.search_all(key).is_empty()
    }

    /// Returns every value bound to `key`, in insertion order.
    pub fn search_all(&self, key: &K) -> Vec<V> {
        self.range_scan(key, key)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Returns all pairs with `start <= key <= end`, in key order.
    pub fn range_scan(&self, start: &K, end: &K) -> Vec<(K, V)> {
        let mut results = Vec::new();
        let mut current = Some(self.find_first_leaf(start));

        while let Some(leaf) = current {
            let Node::Leaf {
                keys,
                values,
                next_leaf,
            } = &self.nodes[leaf.0]
            else {
                break;
            };
            for (key, value) in keys.iter().zip(values) {
                if key > end {
                    return results;
                }
                if key >= start {
                    results.push((key.clone(), value.clone()));
                }
            }
            current = *next_leaf;
        }

        results
    }

    /// Same as `range_scan` over an inclusive range.
    pub fn range(&self, bounds: RangeInclusive<K>) -> Vec<(K, V)> {
        self.range_scan(bounds.start(), bounds.end())
    }

    /// Inserts a key/value pair. Equal keys are kept, the newest last.
    pub fn insert(&mut self, key: K, value: V) {
        let max_degree = self.max_degree;
        let (leaf, path) = self.find_leaf(&key);

        let overflow = match &mut self.nodes[leaf.0] {
            Node::Leaf { keys, values, .. } => {
                let pos = keys.partition_point(|k| k <= &key);
                keys.insert(pos, key);
                values.insert(pos, value);
                keys.len() >= max_degree
            }
            Node::Internal { .. } => unreachable!("descent always ends at a leaf"),
        };
        self.len += 1;

        if overflow {
            let (separator, right) = self.split_leaf(leaf);
            self.insert_into_parent(path, leaf, separator, right);
        }
    }

    /// Removes the first pair bound to `key` whose value satisfies `matches`.
    ///
    /// Removal does not rebalance: leaves may underflow or become empty,
    /// and separators in internal nodes stay as they are. Both keep
    /// descents correct.
    pub fn remove_where<F>(&mut self, key: &K, mut matches: F) -> Option<V>
    where
        F: FnMut(&V) -> bool,
    {
        let mut current = Some(self.find_first_leaf(key));

        while let Some(leaf) = current {
            let Node::Leaf {
                keys,
                values,
                next_leaf,
            } = &mut self.nodes[leaf.0]
            else {
                return None;
            };

            let start = keys.partition_point(|k| k < key);
            let mut pos = start;
            while pos < keys.len() && &keys[pos] == key {
                if matches(&values[pos]) {
                    keys.remove(pos);
                    let value = values.remove(pos);
                    self.len -= 1;
                    return Some(value);
                }
                pos += 1;
            }
            if pos < keys.len() {
                // reached a larger key
                return None;
            }
            current = *next_leaf;
        }

        None
    }

    /// Removes the first pair bound to `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_where(key, |_| true)
    }

    /// Iterates over all pairs in key order by walking the leaf chain.
    pub fn iter(&self) -> BplusTreeIter<'_, K, V> {
        BplusTreeIter::new(self, self.leftmost_leaf())
    }

    /// Returns every key in leaf-chain order.
    pub fn leaf_keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key.clone()).collect()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.0]
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Descends to the leaf where `key` would be inserted.
    ///
    /// On an exact key match at an internal node the descent continues into
    /// the child to the right of that key. Returns the leaf and the path of
    /// (internal node, child index) pairs taken.
    fn find_leaf(&self, key: &K) -> (NodeId, Vec<(NodeId, usize)>) {
        let mut path = Vec::new();
        let mut current = self.root;

        loop {
            match &self.nodes[current.0] {
                Node::Leaf { .. } => return (current, path),
                Node::Internal { keys, children } => {
                    let child_index = keys.partition_point(|k| k <= key);
                    path.push((current, child_index));
                    current = children[child_index];
                }
            }
        }
    }

    /// Descends to the leftmost leaf that can hold `key`, stepping left on
    /// exact matches so earlier duplicates are not skipped.
    fn find_first_leaf(&self, key: &K) -> NodeId {
        let mut current = self.root;
        loop {
            match &self.nodes[current.0] {
                Node::Leaf { .. } => return current,
                Node::Internal { keys, children } => {
                    current = children[keys.partition_point(|k| k < key)];
                }
            }
        }
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while let Node::Internal { children, .. } = &self.nodes[current.0] {
            current = children[0];
        }
        current
    }

    /// Splits an overfull leaf. The upper half, starting at the promoted
    /// key, moves to a new leaf linked in after the old one.
    fn split_leaf(&mut self, leaf: NodeId) -> (K, NodeId) {
        let mid = (self.max_degree - 1) / 2;

        let (right_keys, right_values, old_next) = match &mut self.nodes[leaf.0] {
            Node::Leaf {
                keys,
                values,
                next_leaf,
            } => (keys.split_off(mid), values.split_off(mid), next_leaf.take()),
            Node::Internal { .. } => unreachable!("split_leaf called on an internal node"),
        };

        let separator = right_keys[0].clone();
        let right = self.alloc(Node::Leaf {
            keys: right_keys,
            values: right_values,
            next_leaf: old_next,
        });

        if let Node::Leaf { next_leaf, .. } = &mut self.nodes[leaf.0] {
            *next_leaf = Some(right);
        }

        (separator, right)
    }

    /// Splits an overfull internal node. The key at the midpoint moves up;
    /// the keys and children after it move to a new node.
    fn split_internal(&mut self, node: NodeId) -> (K, NodeId) {
        let mid = (self.max_degree - 1) / 2;

        let (separator, right_keys, right_children) = match &mut self.nodes[node.0] {
            Node::Internal { keys, children } => {
                let right_keys = keys.split_off(mid + 1);
                let right_children = children.split_off(mid + 1);
                let separator = keys.remove(mid);
                (separator, right_keys, right_children)
            }
            Node::Leaf { .. } => unreachable!("split_internal called on a leaf"),
        };

        let right = self.alloc(Node::Internal {
            keys: right_keys,
            children: right_children,
        });
        (separator, right)
    }

    /// Inserts a promoted key and its right child into the parents on
    /// `path`, splitting upward as needed and growing a new root when the
    /// old root splits.
    fn insert_into_parent(
        &mut self,
        mut path: Vec<(NodeId, usize)>,
        mut left: NodeId,
        mut separator: K,
        mut right: NodeId,
    ) {
        let max_degree = self.max_degree;

        loop {
            let Some((parent, child_index)) = path.pop() else {
                self.root = self.alloc(Node::Internal {
                    keys: vec![separator],
                    children: vec![left, right],
                });
                return;
            };

            let overflow = match &mut self.nodes[parent.0] {
                Node::Internal { keys, children } => {
                    keys.insert(child_index, separator);
                    children.insert(child_index + 1, right);
                    keys.len() >= max_degree
                }
                Node::Leaf { .. } => unreachable!("path holds internal nodes only"),
            };
            if !overflow {
                return;
            }

            let (promoted, new_right) = self.split_internal(parent);
            left = parent;
            separator = promoted;
            right = new_right;
        }
    }

    /// Checks the structural invariants, returning a description of the
    /// first violation.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        self.check_node(self.root, None, None)?;
        let keys = self.leaf_keys();
        if keys.windows(2).any(|w| w[0] > w[1]) {
            return Err("leaf chain out of order".to_string());
        }
        if keys.len() != self.len {
            return Err(format!("len {} but {} keys in leaves", self.len, keys.len()));
        }
        Ok(())
    }

    #[cfg(test)]
    fn check_node(
        &self,
        id: NodeId,
        lower: Option<&K>,
        upper: Option<&K>,
    ) -> std::result::Result<(), String> {
        let in_bounds = |k: &K| lower.map_or(true, |lo| k >= lo) && upper.map_or(true, |hi| k <= hi);
        match &self.nodes[id.0] {
            Node::Leaf { keys, values, .. } => {
                if keys.len() != values.len() {
                    return Err(format!("{} has {} keys, {} values", id, keys.len(), values.len()));
                }
                if !keys.iter().all(in_bounds) {
                    return Err(format!("{} holds a key outside its separators", id));
                }
                Ok(())
            }
            Node::Internal { keys, children } => {
                if children.len() != keys.len() + 1 {
                    return Err(format!("{} has {} keys, {} children", id, keys.len(), children.len()));
                }
                if keys.len() >= self.max_degree {
                    return Err(format!("{} is overfull", id));
                }
                for (i, child) in children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { Some(&keys[i - 1]) };
                    let hi = if i == keys.len() { upper } else { Some(&keys[i]) };
                    self.check_node(*child, lo, hi)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bplus_tree_rejects_small_degree() {
        assert!(matches!(
            BplusTree::<i32, i32>::new(2),
            Err(StorageError::InvalidDegree(2))
        ));
        assert!(BplusTree::<i32, i32>::new(3).is_ok());
    }

    #[test]
    fn test_bplus_tree_insert_search() {
        let mut tree = BplusTree::new(4).unwrap();
        for k in [50, 10, 30, 20, 40] {
            tree.insert(k, k * 10);
        }
        assert_eq!(tree.len(), 5);
        for k in [10, 20, 30, 40, 50] {
            assert_eq!(tree.search(&k), Some(k * 10));
        }
        assert_eq!(tree.search(&35), None);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_bplus_tree_leaf_split_layout() {
        // degree 3: a leaf splits at 3 keys, mid = 1
        let mut tree = BplusTree::new(3).unwrap();
        tree.insert(1, 'a');
        tree.insert(2, 'b');
        assert_eq!(tree.height(), 1);
        tree.insert(3, 'c');
        assert_eq!(tree.height(), 2);

        match tree.node(tree.root) {
            Node::Internal { keys, children } => {
                assert_eq!(keys, &vec![2]);
                match tree.node(children[0]) {
                    Node::Leaf { keys, next_leaf, .. } => {
                        assert_eq!(keys, &vec![1]);
                        assert_eq!(*next_leaf, Some(children[1]));
                    }
                    _ => panic!("expected leaf"),
                }
                match tree.node(children[1]) {
                    Node::Leaf { keys, next_leaf, .. } => {
                        assert_eq!(keys, &vec![2, 3]);
                        assert_eq!(*next_leaf, None);
                    }
                    _ => panic!("expected leaf"),
                }
            }
            _ => panic!("expected internal root"),
        }
    }

    #[test]
    fn test_bplus_tree_exact_match_descends_right() {
        let mut tree = BplusTree::new(3).unwrap();
        for k in 1..=3 {
            tree.insert(k, k);
        }
        // root separator is 2; a second 2 goes right of it, after the first,
        // and the resulting split promotes 2 again
        tree.insert(2, 200);
        let (leaf, path) = tree.find_leaf(&2);
        assert_eq!(path, vec![(tree.root, 2)]);
        match tree.node(leaf) {
            Node::Leaf { keys, values, .. } => {
                assert_eq!(keys, &vec![2, 3]);
                assert_eq!(values, &vec![200, 3]);
            }
            _ => panic!("expected leaf"),
        }
        assert_eq!(tree.search_all(&2), vec![2, 200]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_bplus_tree_grows_multiple_levels() {
        let mut tree = BplusTree::new(3).unwrap();
        for k in 0..200 {
            tree.insert(k, k);
        }
        assert!(tree.height() >= 4);
        tree.check_invariants().unwrap();
        assert_eq!(tree.leaf_keys(), (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_bplus_tree_duplicates() {
        let mut tree = BplusTree::new(3).unwrap();
        for v in 0..10 {
            tree.insert(7, v);
            tree.insert(v * 2, 100 + v);
        }
        tree.check_invariants().unwrap();

        let mut sevens = tree.search_all(&7);
        sevens.sort();
        assert_eq!(sevens, (0..10).collect::<Vec<_>>());
        assert!(tree.search(&7).is_some());
        assert!(tree.contains_key(&7));
    }

    #[test]
    fn test_bplus_tree_range_scan() {
        let mut tree = BplusTree::new(4).unwrap();
        for k in (0..100).rev() {
            tree.insert(k, k.to_string());
        }
        let range = tree.range_scan(&25, &30);
        let keys: Vec<i32> = range.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![25, 26, 27, 28, 29, 30]);
        assert_eq!(range[0].1, "25");

        assert!(tree.range_scan(&200, &300).is_empty());
        assert_eq!(tree.range(98..=150).len(), 2);
        assert_eq!(tree.range_scan(&-5, &2).len(), 3);
    }

    #[test]
    fn test_bplus_tree_remove() {
        let mut tree = BplusTree::new(3).unwrap();
        for k in 0..50 {
            tree.insert(k, k);
        }
        for k in (0..50).step_by(2) {
            assert_eq!(tree.remove(&k), Some(k));
        }
        assert_eq!(tree.remove(&0), None);
        assert_eq!(tree.len(), 25);
        tree.check_invariants().unwrap();

        for k in 0..50 {
            assert_eq!(tree.search(&k).is_some(), k % 2 == 1, "key {}", k);
        }
    }

    #[test]
    fn test_bplus_tree_remove_where_picks_value() {
        let mut tree = BplusTree::new(3).unwrap();
        for v in 0..6 {
            tree.insert(1, v);
        }
        assert_eq!(tree.remove_where(&1, |v| *v == 4), Some(4));
        assert_eq!(tree.remove_where(&1, |v| *v == 4), None);

        let mut rest = tree.search_all(&1);
        rest.sort();
        assert_eq!(rest, vec![0, 1, 2, 3, 5]);
    }
}
