use crate::collection::{
    Collection, CollectionInner, JoinDescriptor, JoinTarget, KeyGenerator, Multiplicity,
    SnowflakeKeyGenerator,
};
use crate::errors::{ErrorKind, RelataError, RelataResult};
use crate::filter::Predicate;
use crate::store::memory::InMemoryStorage;
use crate::store::{Storage, StorageProvider};
use std::sync::Arc;

/// Primary key field used when none is configured.
pub const DEFAULT_PK: &str = "id";
/// Join alias used when none is configured.
pub const DEFAULT_ALIAS: &str = "join";
/// Nesting bound for join hydration.
pub const DEFAULT_MAX_JOIN_DEPTH: usize = 16;

/// Which match a single-valued join attaches when several target items
/// share the join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pick {
    First,
    #[default]
    Last,
}

/// Builder for creating and configuring a [`Collection`].
///
/// `CollectionOptions` follows the builder pattern and captures the first
/// configuration error; the error is returned by [`CollectionOptions::build`].
///
/// # Examples
///
/// ```rust
/// use relata::collection::CollectionOptions;
/// use relata::doc;
///
/// let customers = CollectionOptions::new().name("customer").build().unwrap();
/// customers.put(doc! { name: "Bob Jones" }).unwrap();
///
/// let orders = CollectionOptions::new()
///     .name("order")
///     .join(&customers)
///     .from("customer")
///     .alias("customer")
///     .build()
///     .unwrap();
/// assert_eq!(orders.name(), "order");
///
/// let err = CollectionOptions::new().pk("").build().err().unwrap();
/// assert_eq!(err.message(), "Primary key field name cannot be empty");
/// ```
pub struct CollectionOptions {
    error: Option<RelataError>,
    name: Option<String>,
    pk: String,
    keygen: Option<Arc<dyn KeyGenerator>>,
    storage: Option<Storage>,
    join: Option<Collection>,
    from: Option<String>,
    to: Option<String>,
    alias: Option<String>,
    recurse: bool,
    conditions: Option<Predicate>,
    scope: Option<Predicate>,
    unsatisfiable: bool,
    strict_keys: bool,
    max_join_depth: usize,
    pick: Pick,
}

impl CollectionOptions {
    /// Creates options with the defaults: generated name, `"id"` primary key,
    /// a snowflake key generator, in-memory storage and no join.
    pub fn new() -> Self {
        CollectionOptions {
            error: None,
            name: None,
            pk: DEFAULT_PK.to_string(),
            keygen: None,
            storage: None,
            join: None,
            from: None,
            to: None,
            alias: None,
            recurse: false,
            conditions: None,
            scope: None,
            unsatisfiable: false,
            strict_keys: false,
            max_join_depth: DEFAULT_MAX_JOIN_DEPTH,
            pick: Pick::Last,
        }
    }

    /// Sets the collection name.
    ///
    /// # Arguments
    ///
    /// * `name` - A non-empty name
    ///
    /// An empty name is captured as an error and returned by `build()`.
    pub fn name(mut self, name: &str) -> Self {
        if self.error.is_none() {
            match non_empty(name, "Collection name cannot be empty") {
                Ok(name) => self.name = Some(name),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Sets the primary key field name.
    pub fn pk(mut self, pk: &str) -> Self {
        if self.error.is_none() {
            match non_empty(pk, "Primary key field name cannot be empty") {
                Ok(pk) => self.pk = pk,
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Sets the strategy used by `put` to assign missing primary keys.
    pub fn keygen<T: KeyGenerator + 'static>(mut self, keygen: T) -> Self {
        if self.error.is_none() {
            self.keygen = Some(Arc::new(keygen));
        }
        self
    }

    pub(crate) fn shared_keygen(mut self, keygen: Arc<dyn KeyGenerator>) -> Self {
        if self.error.is_none() {
            self.keygen = Some(keygen);
        }
        self
    }

    /// Sets the backing storage.
    pub fn storage(mut self, storage: Storage) -> Self {
        if self.error.is_none() {
            self.storage = Some(storage);
        }
        self
    }

    /// Wraps `provider` and sets it as the backing storage.
    pub fn storage_provider<T: StorageProvider + 'static>(self, provider: T) -> Self {
        self.storage(Storage::new(provider))
    }

    /// Sets the join target.
    pub fn join(mut self, target: &Collection) -> Self {
        if self.error.is_none() {
            self.join = Some(target.clone());
        }
        self
    }

    /// Sets the field of this collection holding the join key.
    pub fn from(mut self, from: &str) -> Self {
        if self.error.is_none() {
            match non_empty(from, "Join source field cannot be empty") {
                Ok(from) => self.from = Some(from),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Sets the field of the join target matched against the join key.
    pub fn to(mut self, to: &str) -> Self {
        if self.error.is_none() {
            match non_empty(to, "Join target field cannot be empty") {
                Ok(to) => self.to = Some(to),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Sets the field under which joined items are attached.
    pub fn alias(mut self, alias: &str) -> Self {
        if self.error.is_none() {
            match non_empty(alias, "Join alias cannot be empty") {
                Ok(alias) => self.alias = Some(alias),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Joins the collection to itself, ignoring any target set by `join`.
    pub fn recurse(mut self, recurse: bool) -> Self {
        if self.error.is_none() {
            self.recurse = recurse;
        }
        self
    }

    /// Sets the standing conditions applied to every read.
    pub fn conditions(mut self, conditions: Predicate) -> Self {
        if self.error.is_none() {
            match conditions.validate() {
                Ok(_) => self.conditions = Some(conditions),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    // conditions accumulated down a chain of filter views, for conflict checks
    pub(crate) fn scope(mut self, scope: Predicate) -> Self {
        if self.error.is_none() {
            self.scope = Some(scope);
        }
        self
    }

    pub(crate) fn unsatisfiable(mut self, unsatisfiable: bool) -> Self {
        if self.error.is_none() {
            self.unsatisfiable = unsatisfiable;
        }
        self
    }

    /// Requires every item written through `set` to carry its primary key
    /// field.
    pub fn strict_keys(mut self, strict_keys: bool) -> Self {
        if self.error.is_none() {
            self.strict_keys = strict_keys;
        }
        self
    }

    /// Sets the nesting bound for join hydration. Must be at least 1.
    pub fn max_join_depth(mut self, max_join_depth: usize) -> Self {
        if self.error.is_none() {
            if max_join_depth == 0 {
                log::error!("Max join depth must be at least 1");
                self.error = Some(RelataError::new(
                    "Max join depth must be at least 1",
                    ErrorKind::InvalidArgument,
                ));
            } else {
                self.max_join_depth = max_join_depth;
            }
        }
        self
    }

    pub fn pick(mut self, pick: Pick) -> Self {
        if self.error.is_none() {
            self.pick = pick;
        }
        self
    }

    /// Creates the collection, or returns the first error captured while
    /// configuring it.
    pub fn build(self) -> RelataResult<Collection> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let name = self
            .name
            .unwrap_or_else(|| format!("unknown_{}", uuid::Uuid::new_v4().simple()));
        let keygen = self
            .keygen
            .unwrap_or_else(|| Arc::new(SnowflakeKeyGenerator::new()));
        let storage = self
            .storage
            .unwrap_or_else(|| Storage::new(InMemoryStorage::new(&name)));

        let wants_join = self.recurse
            || self.join.is_some()
            || self.from.is_some()
            || self.to.is_some()
            || self.alias.is_some();

        let join = if wants_join {
            let target = match self.join {
                Some(target) if !self.recurse => JoinTarget::Other(target),
                _ => JoinTarget::Itself,
            };
            let target_pk = match &target {
                JoinTarget::Itself => self.pk.clone(),
                JoinTarget::Other(collection) => collection.pk().to_string(),
            };
            let to = self.to.unwrap_or_else(|| target_pk.clone());
            let multiplicity = if target_pk == to {
                Multiplicity::One
            } else {
                Multiplicity::Many
            };

            let descriptor = JoinDescriptor::new(
                target,
                self.from.unwrap_or_else(|| self.pk.clone()),
                to,
                self.alias.unwrap_or_else(|| DEFAULT_ALIAS.to_string()),
                multiplicity,
                self.pick,
            );
            log::debug!("Collection {} joins {}", name, descriptor);
            Some(descriptor)
        } else {
            None
        };

        Ok(Collection::create(CollectionInner {
            name,
            pk: self.pk,
            keygen,
            storage,
            join,
            scope: self.scope.or_else(|| self.conditions.clone()),
            conditions: self.conditions,
            unsatisfiable: self.unsatisfiable,
            strict_keys: self.strict_keys,
            max_join_depth: self.max_join_depth,
        }))
    }
}

impl Default for CollectionOptions {
    fn default() -> Self {
        CollectionOptions::new()
    }
}

/// Options for [`Collection::join`] and [`Collection::join_self`].
///
/// Unset fields fall back to: `from` = this collection's primary key,
/// `to` = the target's primary key, `alias` = `"join"`,
/// `name` = `"{this}_to_{target}"`.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
    pub(crate) alias: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) pick: Option<Pick>,
    pub(crate) max_depth: Option<usize>,
}

impl JoinOptions {
    pub fn new() -> Self {
        JoinOptions::default()
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn to(mut self, to: &str) -> Self {
        self.to = Some(to.to_string());
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn pick(mut self, pick: Pick) -> Self {
        self.pick = Some(pick);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

fn non_empty(value: &str, message: &str) -> RelataResult<String> {
    if value.is_empty() {
        log::error!("{}", message);
        return Err(RelataError::new(message, ErrorKind::InvalidArgument));
    }
    Ok(value.to_string())
}
