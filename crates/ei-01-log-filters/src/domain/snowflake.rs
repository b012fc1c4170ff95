//! Snowflake row identifiers for ingested records
//!
//! Layout (most significant first):
//!
//! ```text
//! | 41 bits: ms since EPOCH_MS | 10 bits: machine id | 12 bits: sequence |
//! ```
//!
//! Ids are strictly increasing within one generator. When 4096 ids have been
//! issued in the current millisecond, the generator waits for the clock to
//! move on. A clock that steps backwards is treated as stuck at the last
//! observed millisecond.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IdError;

/// 2020-01-01T00:00:00Z in Unix milliseconds.
pub const EPOCH_MS: u64 = 1_577_836_800_000;

const MACHINE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;

pub const MAX_MACHINE_ID: u16 = (1 << MACHINE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Millisecond clock.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Default)]
struct State {
    last_ms: u64,
    sequence: u64,
}

/// Mutex-guarded id allocator.
pub struct SnowflakeGenerator {
    machine_id: u64,
    state: Mutex<State>,
    clock: Clock,
}

impl SnowflakeGenerator {
    pub fn new(machine_id: u16) -> Result<Self, IdError> {
        Self::with_clock(machine_id, Arc::new(system_millis))
    }

    pub fn with_clock(machine_id: u16, clock: Clock) -> Result<Self, IdError> {
        if machine_id > MAX_MACHINE_ID {
            return Err(IdError::InvalidMachineId(machine_id));
        }
        Ok(Self {
            machine_id: u64::from(machine_id),
            state: Mutex::new(State::default()),
            clock,
        })
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> u64 {
        let mut state = self.state.lock();

        let mut now = (self.clock)().max(state.last_ms);
        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                now = self.wait_next_millis(state.last_ms);
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;

        (now.saturating_sub(EPOCH_MS) << (MACHINE_BITS + SEQUENCE_BITS))
            | (self.machine_id << SEQUENCE_BITS)
            | state.sequence
    }

    fn wait_next_millis(&self, last_ms: u64) -> u64 {
        loop {
            let now = (self.clock)();
            if now > last_ms {
                return now;
            }
            std::hint::spin_loop();
        }
    }
}

/// Split an id into (unix millis, machine id, sequence).
pub fn decompose(id: u64) -> (u64, u16, u16) {
    let millis = (id >> (MACHINE_BITS + SEQUENCE_BITS)) + EPOCH_MS;
    let machine = ((id >> SEQUENCE_BITS) & u64::from(MAX_MACHINE_ID)) as u16;
    let sequence = (id & SEQUENCE_MASK) as u16;
    (millis, machine, sequence)
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
