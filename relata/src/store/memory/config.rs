/// Configuration for an [`InMemoryStorage`](super::InMemoryStorage).
///
/// Each registered field tuple gets a secondary index that is populated on
/// every write.
///
/// ```rust
/// use relata::store::memory::InMemoryStorageConfig;
///
/// let config = InMemoryStorageConfig::new()
///     .with_index(&["customer"])
///     .with_index(&["last_name", "first_name"]);
/// assert_eq!(config.indexes().len(), 2);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStorageConfig {
    indexes: Vec<Vec<String>>,
}

impl InMemoryStorageConfig {
    pub fn new() -> Self {
        InMemoryStorageConfig::default()
    }

    /// Registers a secondary index over `fields`. Registering the same tuple
    /// twice is a no-op.
    pub fn with_index(mut self, fields: &[&str]) -> Self {
        let exists = self
            .indexes
            .iter()
            .any(|idx| idx.iter().map(String::as_str).eq(fields.iter().copied()));
        if !fields.is_empty() && !exists {
            self.indexes
                .push(fields.iter().map(|f| f.to_string()).collect());
        }
        self
    }

    pub fn indexes(&self) -> &[Vec<String>] {
        &self.indexes
    }
}
