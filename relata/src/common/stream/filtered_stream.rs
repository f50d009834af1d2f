use crate::collection::Document;
use crate::common::ItemCursor;
use crate::errors::RelataResult;
use crate::filter::Predicate;

/// Yields only the items of `raw_stream` that satisfy `predicate`.
pub(crate) struct FilteredStream {
    raw_stream: ItemCursor,
    predicate: Predicate,
}

impl FilteredStream {
    pub fn new(raw_stream: ItemCursor, predicate: Predicate) -> Self {
        FilteredStream {
            raw_stream,
            predicate,
        }
    }
}

impl Iterator for FilteredStream {
    type Item = RelataResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.raw_stream.next()? {
                Ok(item) => match self.predicate.matches(&item) {
                    Ok(true) => return Some(Ok(item)),
                    Ok(false) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
