use crate::collection::{Collection, Document, Pick};
use crate::common::Value;
use crate::errors::RelataResult;
use crate::filter::Predicate;
use log::{trace, warn};
use std::fmt::{Display, Formatter};

/// The collection a join reads from.
#[derive(Clone, Debug)]
pub enum JoinTarget {
    /// The joining collection itself (hierarchies, graphs).
    Itself,
    Other(Collection),
}

/// Whether a join attaches one item or a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    One,
    Many,
}

impl Display for Multiplicity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Multiplicity::One => write!(f, "one"),
            Multiplicity::Many => write!(f, "many"),
        }
    }
}

/// How items of a collection are linked to items of its join target.
///
/// An item is linked to every target item whose `to` field equals the
/// item's `from` field. The links are attached under `alias`: as a list when
/// the join is [`Multiplicity::Many`], as the single item chosen by `pick`
/// otherwise. A join keyed on the target's primary key is one-valued.
#[derive(Clone, Debug)]
pub struct JoinDescriptor {
    target: JoinTarget,
    from: String,
    to: String,
    alias: String,
    multiplicity: Multiplicity,
    pick: Pick,
}

impl JoinDescriptor {
    pub(crate) fn new(
        target: JoinTarget,
        from: String,
        to: String,
        alias: String,
        multiplicity: Multiplicity,
        pick: Pick,
    ) -> Self {
        JoinDescriptor {
            target,
            from,
            to,
            alias,
            multiplicity,
            pick,
        }
    }

    pub fn target(&self) -> &JoinTarget {
        &self.target
    }

    pub fn is_self_join(&self) -> bool {
        matches!(self.target, JoinTarget::Itself)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn pick(&self) -> Pick {
        self.pick
    }
}

impl Display for JoinDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let target = match &self.target {
            JoinTarget::Itself => "self",
            JoinTarget::Other(collection) => collection.name(),
        };
        write!(
            f,
            "{} -> {}.{} as {} ({})",
            self.from, target, self.to, self.alias, self.multiplicity
        )
    }
}

impl Collection {
    /// Attaches the join matches of `item` under the join alias.
    ///
    /// `depth` counts the joins already followed to reach `item`; nothing is
    /// attached once it reaches the collection's join depth bound.
    pub(crate) fn hydrate(&self, item: Document, depth: usize) -> RelataResult<Document> {
        let Some(join) = self.join_descriptor() else {
            return Ok(item);
        };

        let key = item.get(join.from());
        if !key.is_truthy() {
            trace!("No {} on item of {}, skipping join", join.from(), self.name());
            return Ok(item);
        }

        if depth >= self.max_join_depth() {
            warn!(
                "Join depth {} reached on {}, leaving {} unresolved",
                depth,
                self.name(),
                join.alias()
            );
            return Ok(item);
        }

        let target = match join.target() {
            JoinTarget::Itself => self,
            JoinTarget::Other(collection) => collection,
        };

        let mut query = Document::new();
        query.put(join.to(), key)?;
        trace!("Hydrating {} of {} with {}", join.alias(), self.name(), query);
        let mut matches = target.find_at_depth(&Predicate::from(query), depth + 1)?;

        let attached = match (join.multiplicity(), join.pick()) {
            (Multiplicity::Many, _) => {
                let items = matches
                    .map(|m| m.map(Value::Document))
                    .collect::<RelataResult<Vec<_>>>()?;
                (!items.is_empty()).then_some(Value::Array(items))
            }
            (Multiplicity::One, Pick::First) => matches.next().transpose()?.map(Value::Document),
            (Multiplicity::One, Pick::Last) => {
                let mut last = None;
                for m in matches {
                    last = Some(m?);
                }
                last.map(Value::Document)
            }
        };

        let mut hydrated = item;
        if let Some(value) = attached {
            hydrated.put(join.alias(), value)?;
        }
        Ok(hydrated)
    }
}
