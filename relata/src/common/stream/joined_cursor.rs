use crate::collection::{Collection, Document};
use crate::common::ItemCursor;
use crate::errors::RelataResult;

/// Hydrates every item pulled from `items` through the join of `collection`.
///
/// The join lookup for an item runs only when that item is pulled.
pub(crate) struct JoinedCursor {
    items: ItemCursor,
    collection: Collection,
    depth: usize,
}

impl JoinedCursor {
    pub fn new(items: ItemCursor, collection: Collection, depth: usize) -> Self {
        JoinedCursor {
            items,
            collection,
            depth,
        }
    }
}

impl Iterator for JoinedCursor {
    type Item = RelataResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.items.next()? {
            Ok(item) => Some(self.collection.hydrate(item, self.depth)),
            Err(e) => {
                log::error!("Error in joined cursor iteration: {}", e);
                Some(Err(e))
            }
        }
    }
}
