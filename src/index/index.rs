use crate::common::{RecordId, Result, StorageError};
use crate::record::Value;

use super::BplusTree;

/// Secondary index on one column of a table, mapping column values to
/// record ids.
#[derive(Debug, Clone)]
pub struct Index {
    name: String,
    table_name: String,
    column_name: String,
    unique: bool,
    tree: BplusTree<Value, RecordId>,
}

impl Index {
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        unique: bool,
        max_degree: usize,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            unique,
            tree: BplusTree::new(max_degree)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Adds an entry. A unique index rejects a key it already holds.
    pub fn insert(&mut self, key: Value, rid: RecordId) -> Result<()> {
        self.check_unique(&key)?;
        self.tree.insert(key, rid);
        Ok(())
    }

    /// Fails with `DuplicateKey` if this index is unique and holds `key`.
    pub fn check_unique(&self, key: &Value) -> Result<()> {
        if self.unique && self.tree.contains_key(key) {
            return Err(StorageError::DuplicateKey {
                index: self.name.clone(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Returns one record id bound to `key`.
    pub fn search(&self, key: &Value) -> Option<RecordId> {
        self.tree
            .search(key)
            .or_else(|| self.tree.search_all(key).into_iter().next())
    }

    /// Returns every record id bound to `key`.
    pub fn search_all(&self, key: &Value) -> Vec<RecordId> {
        self.tree.search_all(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.tree.contains_key(key)
    }

    /// Removes the entry for `key` pointing at `rid`. Returns false if
    /// there was none.
    pub fn remove(&mut self, key: &Value, rid: &RecordId) -> bool {
        self.tree.remove_where(key, |v| v == rid).is_some()
    }

    /// Returns all entries with keys in `[start, end]`, in key order.
    pub fn range_scan(&self, start: &Value, end: &Value) -> Vec<(Value, RecordId)> {
        self.tree.range_scan(start, end)
    }

    pub fn tree(&self) -> &BplusTree<Value, RecordId> {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Block;

    fn rid(slot: u32) -> RecordId {
        RecordId::new(Block::new("users.tbl", 0), slot)
    }

    #[test]
    fn test_index_unique_rejects_duplicate() {
        let mut index = Index::new("idx_id", "users", "id", true, 4).unwrap();
        index.insert(Value::Int(1), rid(0)).unwrap();
        index.insert(Value::Int(2), rid(1)).unwrap();

        let err = index.insert(Value::Int(1), rid(2)).unwrap_err();
        match err {
            StorageError::DuplicateKey { index, key } => {
                assert_eq!(index, "idx_id");
                assert_eq!(key, "1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(index.len(), 2);
        assert_eq!(index.search(&Value::Int(1)), Some(rid(0)));
    }

    #[test]
    fn test_index_non_unique_search_all() {
        let mut index = Index::new("idx_city", "users", "city", false, 3).unwrap();
        for slot in 0..5 {
            index.insert(Value::from("paris"), rid(slot)).unwrap();
        }
        index.insert(Value::from("oslo"), rid(9)).unwrap();

        let mut rids = index.search_all(&Value::from("paris"));
        rids.sort();
        assert_eq!(rids, (0..5).map(rid).collect::<Vec<_>>());
        assert_eq!(index.search(&Value::from("oslo")), Some(rid(9)));
        assert_eq!(index.search(&Value::from("rome")), None);
    }

    #[test]
    fn test_index_remove_by_rid() {
        let mut index = Index::new("idx_city", "users", "city", false, 3).unwrap();
        index.insert(Value::from("paris"), rid(0)).unwrap();
        index.insert(Value::from("paris"), rid(1)).unwrap();

        assert!(index.remove(&Value::from("paris"), &rid(1)));
        assert!(!index.remove(&Value::from("paris"), &rid(1)));
        assert_eq!(index.search_all(&Value::from("paris")), vec![rid(0)]);
    }

    #[test]
    fn test_index_rejects_small_degree() {
        assert!(matches!(
            Index::new("i", "t", "c", false, 1),
            Err(StorageError::InvalidDegree(1))
        ));
    }
}
