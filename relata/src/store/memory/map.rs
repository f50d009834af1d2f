use crate::collection::Document;
use crate::common::stream::filtered_stream::FilteredStream;
use crate::common::{derive_index_key, derive_index_name, ItemCursor, Key};
use crate::errors::{ErrorKind, RelataError, RelataResult};
use crate::filter::Predicate;
use crate::store::memory::InMemoryStorageConfig;
use crate::store::StorageProvider;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use std::collections::Bound::{Excluded, Unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reference storage adapter backed by a concurrent skip list.
///
/// # Characteristics
/// - **Ordered**: items are kept in ascending key order
/// - **Thread-Safe**: clones share the same map and can be used across threads
/// - **Lazy**: cursors walk the map key by key and never copy it
/// - **Indexed**: optional secondary indexes, one sub-adapter per field tuple
///
/// `find` is a linear scan plus a predicate test. Secondary indexes are kept
/// current on every write but are not consulted by `find`; inspect them with
/// [`InMemoryStorage::index`].
///
/// ```rust
/// use relata::doc;
/// use relata::common::Value;
/// use relata::store::StorageProvider;
/// use relata::store::memory::InMemoryStorage;
///
/// let storage = InMemoryStorage::new("users");
/// storage.set(Value::from("b"), doc! { id: "b" }).unwrap();
/// storage.set(Value::from("a"), doc! { id: "a" }).unwrap();
///
/// let ids: Vec<Value> = storage
///     .iter()
///     .unwrap()
///     .map(|item| item.unwrap().get("id"))
///     .collect();
/// assert_eq!(ids, vec![Value::from("a"), Value::from("b")]);
/// ```
#[derive(Clone)]
pub struct InMemoryStorage {
    inner: Arc<InMemoryStorageInner>,
}

impl InMemoryStorage {
    pub fn new(name: &str) -> Self {
        InMemoryStorage::with_config(name, InMemoryStorageConfig::new())
    }

    pub fn with_config(name: &str, config: InMemoryStorageConfig) -> Self {
        InMemoryStorage {
            inner: Arc::new(InMemoryStorageInner::new(name, config)),
        }
    }

    /// The secondary index over `fields`, keyed by the comma-joined values of
    /// those fields, if one was configured.
    pub fn index(&self, fields: &[&str]) -> Option<InMemoryStorage> {
        self.inner
            .indexes
            .get(&derive_index_name(fields))
            .map(|entry| entry.storage.clone())
    }

    pub fn contains_key(&self, key: &Key) -> RelataResult<bool> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.contains_key(key))
    }

    pub fn size(&self) -> RelataResult<usize> {
        self.inner.check_opened()?;
        Ok(self.inner.backing_map.len())
    }

    /// Closes the storage. Every later operation, including pulls on open
    /// cursors, fails with [`ErrorKind::StorageError`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Relaxed);
        for entry in self.inner.indexes.iter() {
            entry.storage.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

impl StorageProvider for InMemoryStorage {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn get(&self, key: &Key) -> RelataResult<Option<Document>> {
        self.inner.get(key)
    }

    fn set(&self, key: Key, item: Document) -> RelataResult<bool> {
        self.inner.set(key, item)
    }

    fn find(&self, predicate: &Predicate) -> RelataResult<ItemCursor> {
        let items = self.iter()?;
        if predicate.is_all() {
            return Ok(items);
        }
        Ok(ItemCursor::new(Box::new(FilteredStream::new(
            items,
            predicate.clone(),
        ))))
    }

    fn iter(&self) -> RelataResult<ItemCursor> {
        self.inner.check_opened()?;
        Ok(ItemCursor::new(Box::new(MapCursor {
            inner: self.inner.clone(),
            last: None,
            done: false,
        })))
    }
}

struct IndexEntry {
    fields: Vec<String>,
    storage: InMemoryStorage,
}

struct InMemoryStorageInner {
    backing_map: SkipMap<Key, Document>,
    indexes: DashMap<String, IndexEntry>,
    closed: AtomicBool,
    name: String,
}

impl InMemoryStorageInner {
    fn new(name: &str, config: InMemoryStorageConfig) -> Self {
        let indexes = DashMap::new();
        for fields in config.indexes() {
            let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
            let index_name = derive_index_name(&field_refs);
            let storage = InMemoryStorage::new(&format!("{}[{}]", name, index_name));
            indexes.insert(
                index_name,
                IndexEntry {
                    fields: fields.clone(),
                    storage,
                },
            );
        }

        InMemoryStorageInner {
            backing_map: SkipMap::new(),
            indexes,
            closed: AtomicBool::new(false),
            name: name.to_string(),
        }
    }

    fn check_opened(&self) -> RelataResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Storage {} is closed", self.name);
            return Err(RelataError::new(
                &format!("Storage {} is closed", self.name),
                ErrorKind::StorageError,
            ));
        }
        Ok(())
    }

    fn get(&self, key: &Key) -> RelataResult<Option<Document>> {
        self.check_opened()?;
        Ok(self.backing_map.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: Key, item: Document) -> RelataResult<bool> {
        self.check_opened()?;
        if key.is_null() {
            log::warn!("Storage {} refused an item without a key", self.name);
            return Ok(false);
        }

        let previous = self.backing_map.get(&key).map(|e| e.value().clone());
        for entry in self.indexes.iter() {
            let index_key = derive_index_key(&item, &entry.fields);
            if let Some(previous) = &previous {
                let previous_key = derive_index_key(previous, &entry.fields);
                // only drop the entry while it still points at the replaced item
                if previous_key != index_key
                    && entry.storage.get(&previous_key)?.as_ref() == Some(previous)
                {
                    entry.storage.inner.remove(&previous_key);
                }
            }
            entry.storage.set(index_key, item.clone())?;
        }

        self.backing_map.insert(key, item);
        Ok(true)
    }

    fn remove(&self, key: &Key) {
        self.backing_map.remove(key);
    }

    fn higher_entry(&self, key: Option<&Key>) -> Option<(Key, Document)> {
        let entry = match key {
            Some(key) => self.backing_map.range((Excluded(key), Unbounded)).next(),
            None => self.backing_map.front(),
        };
        entry.map(|e| (e.key().clone(), e.value().clone()))
    }
}

/// Walks the skip list one key at a time, resuming after the last key seen.
struct MapCursor {
    inner: Arc<InMemoryStorageInner>,
    last: Option<Key>,
    done: bool,
}

impl Iterator for MapCursor {
    type Item = RelataResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Err(e) = self.inner.check_opened() {
            self.done = true;
            return Some(Err(e));
        }

        match self.inner.higher_entry(self.last.as_ref()) {
            Some((key, item)) => {
                self.last = Some(key);
                Some(Ok(item))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
