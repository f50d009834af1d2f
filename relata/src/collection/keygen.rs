use crate::common::{get_current_time_or_zero, Value};
use crate::errors::{ErrorKind, RelataError, RelataResult};
use log::{info, warn};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const NODE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_NODE_ID: u64 = (1 << NODE_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_LEFT_SHIFT: u64 = SEQUENCE_BITS + NODE_ID_BITS;
const EPOCH: u64 = 1288834974657;

/// Primary key strategy of a collection.
///
/// Every collection owns its own generator. Closures returning a [`Value`]
/// are generators too.
///
/// ```rust
/// use relata::collection::KeyGenerator;
/// use relata::common::Value;
///
/// let fixed = || Value::from("k");
/// assert_eq!(fixed.generate(), Value::from("k"));
/// ```
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Value;
}

impl<F> KeyGenerator for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn generate(&self) -> Value {
        self()
    }
}

/// Time-ordered 64-bit ids rendered as zero-padded 20-digit strings.
///
/// The id packs milliseconds since a fixed epoch, a node id and a per
/// millisecond sequence, so keys from one generator sort in creation order.
pub struct SnowflakeKeyGenerator {
    node_id: u64,
    state: Mutex<SnowflakeState>,
}

struct SnowflakeState {
    // timestamp of the last id, possibly ahead of the clock after a borrow
    last_timestamp: u64,
    // wall clock as last read
    last_clock: u64,
    sequence: u64,
    clock_skews: u64,
}

impl SnowflakeKeyGenerator {
    pub fn new() -> Self {
        let node_id = random_node_id();
        info!("Initialized key generator with node id: {}", node_id);
        SnowflakeKeyGenerator::create(node_id)
    }

    /// A generator with an explicit node id, for deployments that assign
    /// node ids themselves.
    pub fn with_node_id(node_id: u64) -> RelataResult<Self> {
        if node_id > MAX_NODE_ID {
            log::error!("Node id can't be greater than {}", MAX_NODE_ID);
            return Err(RelataError::new(
                &format!("Node id can't be greater than {}", MAX_NODE_ID),
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(SnowflakeKeyGenerator::create(node_id))
    }

    fn create(node_id: u64) -> Self {
        SnowflakeKeyGenerator {
            node_id,
            state: Mutex::new(SnowflakeState {
                last_timestamp: 0,
                last_clock: 0,
                sequence: 0,
                clock_skews: 0,
            }),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Backward clock jumps seen so far.
    pub fn clock_skews(&self) -> u64 {
        self.state.lock().clock_skews
    }

    pub fn next_id(&self) -> u64 {
        let mut state = self.state.lock();

        let clock = get_current_time_or_zero() as u64;
        if clock < state.last_clock {
            warn!(
                "Clock moved backwards by {}ms, reusing last timestamp",
                state.last_clock - clock
            );
            state.clock_skews += 1;
        }
        state.last_clock = clock;

        // a borrowed millisecond keeps the timestamp ahead of the clock
        let mut timestamp = clock.max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // sequence exhausted for this millisecond, borrow the next one
                timestamp = state.last_timestamp + 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        (timestamp.saturating_sub(EPOCH) << TIMESTAMP_LEFT_SHIFT)
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence
    }
}

impl Default for SnowflakeKeyGenerator {
    fn default() -> Self {
        SnowflakeKeyGenerator::new()
    }
}

impl KeyGenerator for SnowflakeKeyGenerator {
    fn generate(&self) -> Value {
        Value::String(format!("{:020}", self.next_id()))
    }
}

fn random_node_id() -> u64 {
    let uuid = uuid::Uuid::new_v4();
    let uid = uuid.as_bytes();
    let rnd_byte = OsRng.gen::<u64>() & 0x000000FF;

    (((0x000000FF & uid[uid.len() - 1] as u64) | (0x0000FF00 & (rnd_byte << 8))) >> 6)
        & MAX_NODE_ID
}

/// Deterministic keys: `prefix` followed by a zero-padded counter.
///
/// ```rust
/// use relata::collection::{KeyGenerator, SequenceKeyGenerator};
/// use relata::common::Value;
///
/// let keygen = SequenceKeyGenerator::new("order-");
/// assert_eq!(keygen.generate(), Value::from("order-0000000001"));
/// assert_eq!(keygen.generate(), Value::from("order-0000000002"));
/// ```
pub struct SequenceKeyGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequenceKeyGenerator {
    pub fn new(prefix: &str) -> Self {
        SequenceKeyGenerator {
            prefix: prefix.to_string(),
            counter: AtomicU64::new(0),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn generate(&self) -> Value {
        let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Value::String(format!("{}{:010}", self.prefix, next))
    }
}
