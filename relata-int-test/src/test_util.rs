use relata::collection::{Collection, CollectionOptions, Document};
use relata::common::{ItemCursor, Key, Value};
use relata::doc;
use relata::errors::{ErrorKind, RelataError, RelataResult};
use relata::filter::Predicate;
use relata::store::memory::{InMemoryStorage, InMemoryStorageConfig};
use relata::store::StorageProvider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs `test` between `before` and `after`, panicking with the first
/// error. `after` runs even when the test fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> RelataResult<()>,
    B: Fn() -> RelataResult<TestContext>,
    A: Fn(TestContext) -> RelataResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let test_result = test(ctx.clone());
    let after_result = after(ctx);

    if let Err(e) = test_result {
        panic!("Test failed: {:?}", e);
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

#[derive(Clone)]
pub struct TestContext {
    customer_store: InMemoryStorage,
    order_store: InMemoryStorage,
    customers: Collection,
    orders: Collection,
}

impl TestContext {
    pub fn customers(&self) -> Collection {
        self.customers.clone()
    }

    pub fn orders(&self) -> Collection {
        self.orders.clone()
    }

    pub fn customer_store(&self) -> InMemoryStorage {
        self.customer_store.clone()
    }

    pub fn order_store(&self) -> InMemoryStorage {
        self.order_store.clone()
    }
}

/// Empty `customer` and `order` collections. Orders are indexed by customer.
pub fn create_test_context() -> RelataResult<TestContext> {
    let customer_store = InMemoryStorage::new("customer");
    let order_store = InMemoryStorage::with_config(
        "order",
        InMemoryStorageConfig::new().with_index(&["customer"]),
    );

    let customers = CollectionOptions::new()
        .name("customer")
        .storage_provider(customer_store.clone())
        .build()?;
    let orders = CollectionOptions::new()
        .name("order")
        .storage_provider(order_store.clone())
        .build()?;

    Ok(TestContext {
        customer_store,
        order_store,
        customers,
        orders,
    })
}

/// A context populated with [`customer_documents`] and [`order_documents`].
pub fn create_populated_context() -> RelataResult<TestContext> {
    let ctx = create_test_context()?;
    ctx.customers().put_all(customer_documents(), true)?;
    ctx.orders().put_all(order_documents(), true)?;
    Ok(ctx)
}

pub fn cleanup(ctx: TestContext) -> RelataResult<()> {
    ctx.customer_store.close();
    ctx.order_store.close();
    Ok(())
}

pub fn customer_documents() -> Vec<Document> {
    vec![
        doc! { id: 1, name: "Bob Jones", city: "Austin" },
        doc! { id: 2, name: "Ann Lee", city: "Boston" },
        doc! { id: 3, name: "Cy Young", city: "Austin" },
    ]
}

pub fn order_documents() -> Vec<Document> {
    vec![
        doc! { id: "o1", customer: 1, total: 25, tags: ["gift"] },
        doc! { id: "o2", customer: 1, total: 40, tags: ["rush", "gift"] },
        doc! { id: "o3", customer: 2, total: 15, tags: [] },
    ]
}

pub fn ids(items: &[Document]) -> Vec<Value> {
    items.iter().map(|item| item.get("id")).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// `set` returns `Ok(false)`
    Refuse,
    /// `set` returns a storage error
    Error,
}

/// In-memory storage that fails every write to one chosen key.
pub struct FailingStorage {
    inner: InMemoryStorage,
    failing_key: Key,
    mode: FailureMode,
}

impl FailingStorage {
    pub fn new(failing_key: Key, mode: FailureMode) -> Self {
        FailingStorage {
            inner: InMemoryStorage::new("failing"),
            failing_key,
            mode,
        }
    }
}

impl StorageProvider for FailingStorage {
    fn name(&self) -> String {
        "failing".to_string()
    }

    fn get(&self, key: &Key) -> RelataResult<Option<Document>> {
        self.inner.get(key)
    }

    fn set(&self, key: Key, item: Document) -> RelataResult<bool> {
        if key == self.failing_key {
            return match self.mode {
                FailureMode::Refuse => Ok(false),
                FailureMode::Error => Err(RelataError::new(
                    &format!("Write of {} rejected", key),
                    ErrorKind::StorageError,
                )),
            };
        }
        self.inner.set(key, item)
    }

    fn find(&self, predicate: &Predicate) -> RelataResult<ItemCursor> {
        self.inner.find(predicate)
    }

    fn iter(&self) -> RelataResult<ItemCursor> {
        self.inner.iter()
    }
}

/// Storage wrapper counting the scans and items pulled from it.
#[derive(Clone)]
pub struct CountingStorage {
    inner: InMemoryStorage,
    finds: Arc<AtomicUsize>,
    pulled: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn new(name: &str) -> Self {
        CountingStorage {
            inner: InMemoryStorage::new(name),
            finds: Arc::new(AtomicUsize::new(0)),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

impl StorageProvider for CountingStorage {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn get(&self, key: &Key) -> RelataResult<Option<Document>> {
        self.inner.get(key)
    }

    fn set(&self, key: Key, item: Document) -> RelataResult<bool> {
        self.inner.set(key, item)
    }

    fn find(&self, predicate: &Predicate) -> RelataResult<ItemCursor> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        let pulled = self.pulled.clone();
        let cursor = self.inner.find(predicate)?;
        Ok(ItemCursor::new(Box::new(cursor.inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        }))))
    }

    fn iter(&self) -> RelataResult<ItemCursor> {
        self.find(&Predicate::all())
    }
}
