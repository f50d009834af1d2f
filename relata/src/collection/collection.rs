use crate::collection::{
    CollectionOptions, Document, JoinDescriptor, JoinOptions, KeyGenerator, DEFAULT_ALIAS,
};
use crate::common::stream::filtered_stream::FilteredStream;
use crate::common::stream::joined_cursor::JoinedCursor;
use crate::common::{ItemCursor, Key};
use crate::errors::{ErrorKind, RelataError, RelataResult};
use crate::filter::{Predicate, QueryBuilder};
use crate::store::{Storage, StorageProvider};
use log::{debug, error, trace};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A named set of items over a [`Storage`], with an optional join and
/// standing conditions.
///
/// `Collection` is a cheap handle: clones share the same storage and
/// configuration. [`Collection::join`] and [`Collection::filter`] return
/// views, new collections backed by this one.
///
/// # Examples
///
/// ```rust
/// use relata::collection::{CollectionOptions, JoinOptions};
/// use relata::common::Value;
/// use relata::doc;
///
/// let customers = CollectionOptions::new().name("customer").build().unwrap();
/// let orders = CollectionOptions::new().name("order").build().unwrap();
/// customers.put(doc! { id: 1, name: "Bob Jones" }).unwrap();
/// orders.put_all(vec![doc! { id: 10, customer: 1 }, doc! { id: 11, customer: 1 }], false).unwrap();
///
/// let with_orders = customers
///     .join(&orders, JoinOptions::new().from("id").to("customer").alias("orders"))
///     .unwrap();
/// let bob = with_orders.get(&Value::from(1)).unwrap().unwrap();
/// assert_eq!(bob.get("orders.id"), Value::Array(vec![Value::from(10), Value::from(11)]));
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

pub(crate) struct CollectionInner {
    pub(crate) name: String,
    pub(crate) pk: String,
    pub(crate) keygen: Arc<dyn KeyGenerator>,
    pub(crate) storage: Storage,
    pub(crate) join: Option<JoinDescriptor>,
    pub(crate) conditions: Option<Predicate>,
    pub(crate) scope: Option<Predicate>,
    pub(crate) unsatisfiable: bool,
    pub(crate) strict_keys: bool,
    pub(crate) max_join_depth: usize,
}

impl Collection {
    pub(crate) fn create(inner: CollectionInner) -> Self {
        Collection {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn pk(&self) -> &str {
        &self.inner.pk
    }

    pub fn join_descriptor(&self) -> Option<&JoinDescriptor> {
        self.inner.join.as_ref()
    }

    /// Conditions this collection checks on top of whatever its backing
    /// storage already enforces. A filter view holds only the predicate it
    /// was created with.
    pub fn conditions(&self) -> Option<&Predicate> {
        self.inner.conditions.as_ref()
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    pub(crate) fn max_join_depth(&self) -> usize {
        self.inner.max_join_depth
    }

    /// Fetches and hydrates the item stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent or the item does not satisfy
    /// the standing conditions.
    pub fn get(&self, key: &Key) -> RelataResult<Option<Document>> {
        if self.inner.unsatisfiable {
            return Ok(None);
        }

        let Some(item) = self.inner.storage.get(key)? else {
            return Ok(None);
        };
        let item = self.hydrate(item, 0)?;

        match &self.inner.conditions {
            Some(conditions) if !conditions.matches(&item)? => {
                trace!("Item {} of {} filtered out by conditions", key, self.name());
                Ok(None)
            }
            _ => Ok(Some(item)),
        }
    }

    /// Writes `item` under `key` through the backing storage.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::MissingKey`] when strict keys are enabled and `item` lacks
    /// the primary key field; storage errors otherwise.
    pub fn set(&self, key: Key, item: Document) -> RelataResult<bool> {
        self.check_key(&item)?;
        self.inner.storage.set(key, item)
    }

    /// Writes every pair independently; each outcome is reported in order.
    pub fn set_all(
        &self,
        items: Vec<(Key, Document)>,
    ) -> RelataResult<Vec<(Key, RelataResult<bool>)>> {
        if !self.inner.strict_keys {
            return self.inner.storage.set_all(items);
        }

        let mut results = Vec::with_capacity(items.len());
        for (key, item) in items {
            let result = self.set(key.clone(), item);
            results.push((key, result));
        }
        Ok(results)
    }

    /// Assigns a primary key if the item lacks one, then stores it.
    ///
    /// Returns the stored item, primary key included.
    pub fn put(&self, item: Document) -> RelataResult<Document> {
        let mut saved = self.put_all(vec![item], true)?;
        saved.pop().ok_or_else(|| {
            error!("Put on {} returned no item", self.name());
            RelataError::new("Put returned no item", ErrorKind::InternalError)
        })
    }

    /// Stores every item, assigning missing primary keys.
    ///
    /// A write that fails or that the storage refuses counts as failed. With
    /// `fail_early` the first failure stops the batch; otherwise every item is
    /// attempted. Either way a failure is reported as one
    /// [`ErrorKind::SaveFailed`] error whose partition lists the saved and
    /// failed items. Saved items stay saved.
    pub fn put_all(&self, items: Vec<Document>, fail_early: bool) -> RelataResult<Vec<Document>> {
        let mut saved = Vec::with_capacity(items.len());
        let mut failed = Vec::new();
        let mut last_error = None;

        for mut item in items {
            if !item.get(self.pk()).is_truthy() {
                item.put(self.pk(), self.inner.keygen.generate())?;
            }

            match self.save(item.clone()) {
                Ok(_) => saved.push(item),
                Err(e) => {
                    failed.push(item);
                    if fail_early {
                        error!("Error saving items to {}: {}", self.name(), e);
                        return Err(RelataError::save_failed(saved, failed, Some(e)));
                    }
                    last_error = Some(e);
                }
            }
        }

        if !failed.is_empty() {
            error!(
                "Error saving items to {}: {} saved, {} failed",
                self.name(),
                saved.len(),
                failed.len()
            );
            return Err(RelataError::save_failed(saved, failed, last_error));
        }
        Ok(saved)
    }

    fn save(&self, item: Document) -> RelataResult<()> {
        let key = item.get(self.pk());
        if self.set(key.clone(), item)? {
            Ok(())
        } else {
            error!("Storage {} refused item {}", self.inner.storage.name(), key);
            Err(RelataError::new(
                &format!("Storage refused item {}", key),
                ErrorKind::StorageError,
            ))
        }
    }

    /// Lazily yields the hydrated items satisfying `predicate` and the
    /// standing conditions.
    ///
    /// Conditions on the join alias are checked after hydration; the rest of
    /// the predicate is handed to the backing storage first. The predicate
    /// and the standing conditions are checked one after the other, never
    /// folded into one tree, so each keeps its own array semantics.
    pub fn find(&self, predicate: &Predicate) -> RelataResult<ItemCursor> {
        self.find_at_depth(predicate, 0)
    }

    pub(crate) fn find_at_depth(
        &self,
        predicate: &Predicate,
        depth: usize,
    ) -> RelataResult<ItemCursor> {
        if self.inner.unsatisfiable {
            debug!("Conditions of {} never match, nothing to find", self.name());
            return Ok(ItemCursor::empty());
        }
        predicate.validate()?;

        let cursor = match &self.inner.join {
            None => self.inner.storage.find(predicate)?,
            Some(join) => {
                let own = predicate.split(Some(join.alias()));
                trace!("Scanning {} with {} at depth {}", self.name(), own, depth);
                let candidates = self.inner.storage.find(&own)?;
                let hydrated = ItemCursor::new(Box::new(JoinedCursor::new(
                    candidates,
                    self.clone(),
                    depth,
                )));

                if own == *predicate {
                    hydrated
                } else {
                    ItemCursor::new(Box::new(FilteredStream::new(hydrated, predicate.clone())))
                }
            }
        };

        match &self.inner.conditions {
            Some(conditions) if !conditions.is_all() => Ok(ItemCursor::new(Box::new(
                FilteredStream::new(cursor, conditions.clone()),
            ))),
            _ => Ok(cursor),
        }
    }

    /// Every item of this collection, in key order.
    pub fn iter(&self) -> RelataResult<ItemCursor> {
        self.find(&Predicate::all())
    }

    /// Collects at most `max` items (all items if `None`).
    pub fn to_vec(&self, max: Option<usize>) -> RelataResult<Vec<Document>> {
        self.iter()?.to_vec(max)
    }

    /// A view of this collection restricted by the query built in `f`.
    ///
    /// ```rust
    /// use relata::collection::CollectionOptions;
    /// use relata::doc;
    ///
    /// let people = CollectionOptions::new().build().unwrap();
    /// people.put_all(vec![doc! { id: 1, age: 30 }, doc! { id: 2, age: 12 }], false).unwrap();
    ///
    /// let adults = people.filter(|q| q.field("age").ge(18)).unwrap();
    /// assert_eq!(adults.to_vec(None).unwrap(), vec![doc! { id: 1, age: 30 }]);
    /// ```
    pub fn filter<F>(&self, f: F) -> RelataResult<Collection>
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let predicate = f(QueryBuilder::new()).build_predicate()?;
        self.filter_by(predicate)
    }

    /// A view of this collection restricted by `predicate`.
    ///
    /// When `predicate` contradicts the standing conditions on some field
    /// the view is empty; this is not an error.
    pub fn filter_by(&self, predicate: Predicate) -> RelataResult<Collection> {
        predicate.validate()?;

        // the view checks only its own predicate, the backing collection
        // keeps enforcing the rest of the chain
        let (scope, conflict) = match &self.inner.scope {
            None => (predicate.clone(), false),
            Some(current) => match current.merge(&predicate) {
                Some(merged) => (merged, false),
                None => {
                    debug!("{} conflicts with conditions of {}", predicate, self.name());
                    (current.clone(), true)
                }
            },
        };

        let view = CollectionOptions::new()
            .name(&format!("{}_filtered", self.name()))
            .pk(self.pk())
            .shared_keygen(self.inner.keygen.clone())
            .storage(Storage::new(self.clone()))
            .conditions(predicate)
            .scope(scope)
            .unsatisfiable(conflict || self.inner.unsatisfiable)
            .strict_keys(self.inner.strict_keys)
            .max_join_depth(self.inner.max_join_depth)
            .build()?;
        Ok(view)
    }

    /// A view of this collection whose items are hydrated with matches from
    /// `target`.
    ///
    /// Unset options default to `from` = this primary key, `to` = the target
    /// primary key, `alias` = `"join"` and name `"{this}_to_{target}"`.
    pub fn join(&self, target: &Collection, options: JoinOptions) -> RelataResult<Collection> {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("{}_to_{}", self.name(), target.name()));
        self.join_view(&name, CollectionOptions::new().join(target), options)
    }

    /// A view of this collection joined to itself, e.g. items to their
    /// parent items.
    pub fn join_self(&self, options: JoinOptions) -> RelataResult<Collection> {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("{}_to_{}", self.name(), self.name()));
        self.join_view(&name, CollectionOptions::new().recurse(true), options)
    }

    fn join_view(
        &self,
        name: &str,
        builder: CollectionOptions,
        options: JoinOptions,
    ) -> RelataResult<Collection> {
        let mut builder = builder
            .name(name)
            .pk(self.pk())
            .shared_keygen(self.inner.keygen.clone())
            .storage(Storage::new(self.clone()))
            .strict_keys(self.inner.strict_keys)
            .max_join_depth(options.max_depth.unwrap_or(self.inner.max_join_depth))
            .pick(options.pick.unwrap_or_default())
            .from(options.from.as_deref().unwrap_or(self.pk()))
            .alias(options.alias.as_deref().unwrap_or(DEFAULT_ALIAS));
        if let Some(to) = &options.to {
            builder = builder.to(to);
        }

        let view = builder.build()?;
        debug!("Created join view {} over {}", view.name(), self.name());
        Ok(view)
    }

    fn check_key(&self, item: &Document) -> RelataResult<()> {
        if self.inner.strict_keys && item.get(self.pk()).is_null() {
            error!("Item has no primary key field {} in {}", self.pk(), self.name());
            return Err(RelataError::new(
                &format!("Item is missing primary key field {}", self.pk()),
                ErrorKind::MissingKey,
            ));
        }
        Ok(())
    }
}

impl StorageProvider for Collection {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn get(&self, key: &Key) -> RelataResult<Option<Document>> {
        Collection::get(self, key)
    }

    fn set(&self, key: Key, item: Document) -> RelataResult<bool> {
        Collection::set(self, key, item)
    }

    fn set_all(&self, items: Vec<(Key, Document)>) -> RelataResult<Vec<(Key, RelataResult<bool>)>> {
        Collection::set_all(self, items)
    }

    fn find(&self, predicate: &Predicate) -> RelataResult<ItemCursor> {
        Collection::find(self, predicate)
    }

    fn iter(&self) -> RelataResult<ItemCursor> {
        Collection::iter(self)
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("pk", &self.inner.pk)
            .field("join", &self.inner.join.as_ref().map(|j| j.to_string()))
            .field("conditions", &self.inner.conditions)
            .finish()
    }
}
