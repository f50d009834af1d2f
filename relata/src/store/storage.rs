use crate::collection::Document;
use crate::common::{ItemCursor, Key};
use crate::errors::RelataResult;
use crate::filter::Predicate;
use std::ops::Deref;
use std::sync::Arc;

/// Contract every storage backend implements.
///
/// # Ordering
/// `iter` yields items in ascending key order. `find` yields a subset of
/// `iter` in the same order.
///
/// # Restartability
/// Every call to `find` or `iter` returns a fresh, independent cursor.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; there is no locking above this layer.
pub trait StorageProvider: Send + Sync {
    fn name(&self) -> String;

    /// Point lookup. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &Key) -> RelataResult<Option<Document>>;

    /// Writes `item` under `key`, replacing any previous item.
    ///
    /// `Ok(false)` means the backend refused the write without failing.
    fn set(&self, key: Key, item: Document) -> RelataResult<bool>;

    /// Applies every pair independently and reports each outcome.
    ///
    /// A failing pair does not stop the batch and earlier writes are not
    /// rolled back.
    fn set_all(&self, items: Vec<(Key, Document)>) -> RelataResult<Vec<(Key, RelataResult<bool>)>> {
        let mut results = Vec::with_capacity(items.len());
        for (key, item) in items {
            let result = self.set(key.clone(), item);
            results.push((key, result));
        }
        Ok(results)
    }

    /// Lazily scans for items satisfying `predicate`.
    fn find(&self, predicate: &Predicate) -> RelataResult<ItemCursor>;

    /// Lazily iterates every item in ascending key order.
    fn iter(&self) -> RelataResult<ItemCursor>;
}

/// Cloneable handle over any [`StorageProvider`].
///
/// Cloning is cheap; every clone shares the same backend.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<dyn StorageProvider>,
}

impl Storage {
    pub fn new<T: StorageProvider + 'static>(inner: T) -> Self {
        Storage {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for Storage {
    type Target = Arc<dyn StorageProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
