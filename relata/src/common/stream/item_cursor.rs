use crate::collection::Document;
use crate::errors::RelataResult;

type ItemStream = Box<dyn Iterator<Item = RelataResult<Document>> + Send>;

/// A lazy, finite sequence of items produced by `find` or `iter`.
///
/// Nothing is scanned until the cursor is pulled, and dropping it stops the
/// work. A cursor is single-pass: call `find` again for a fresh sequence.
pub struct ItemCursor {
    underlying: Option<ItemStream>,
    yielded: usize,
}

impl ItemCursor {
    pub fn new(iter: ItemStream) -> Self {
        ItemCursor {
            underlying: Some(iter),
            yielded: 0,
        }
    }

    /// A cursor that yields nothing.
    pub fn empty() -> Self {
        ItemCursor {
            underlying: None,
            yielded: 0,
        }
    }

    pub fn from_items(items: Vec<Document>) -> Self {
        ItemCursor::new(Box::new(items.into_iter().map(Ok)))
    }

    /// Number of items handed out so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn first(&mut self) -> Option<RelataResult<Document>> {
        self.next()
    }

    /// Drains the cursor into a vector, pulling at most `max` items.
    ///
    /// The first error stops the drain and is returned.
    pub fn to_vec(mut self, max: Option<usize>) -> RelataResult<Vec<Document>> {
        let limit = max.unwrap_or(usize::MAX);
        let mut items = Vec::new();
        while items.len() < limit {
            match self.next() {
                Some(item) => items.push(item?),
                None => break,
            }
        }
        Ok(items)
    }
}

impl std::fmt::Debug for ItemCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemCursor")
            .field("exhausted", &self.underlying.is_none())
            .field("yielded", &self.yielded)
            .finish()
    }
}

impl Iterator for ItemCursor {
    type Item = RelataResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.underlying.as_mut()?;
        match iter.next() {
            Some(item) => {
                self.yielded += 1;
                Some(item)
            }
            None => {
                // once exhausted, drop the underlying iterator
                self.underlying = None;
                None
            }
        }
    }
}
