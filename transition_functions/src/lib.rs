//! The state transition as seen by the fork choice core.
//!
//! Full block processing is performed by an executor outside the core.
//! The core only needs to advance states through empty slots and to replay block headers
//! on top of stored states, so that is all [`StateTransition`] exposes.

use anyhow::Result;
use types::phase0::{beacon_state::BeaconState, containers::BeaconBlockHeader, primitives::Slot};

pub use crate::unphased::{Error, SlotProcessor};

pub mod unphased {
    pub use crate::unphased::{
        block_processing::process_block_header,
        error::Error,
        slot_processing::{process_slots, SlotProcessor},
    };

    mod block_processing;
    mod error;
    mod slot_processing;
}

/// Deterministic state advancement supplied to the fork choice core.
///
/// Implementations must be pure given their inputs.
pub trait StateTransition: Send + Sync {
    /// Advances `state` to exactly `slot` without applying any block.
    fn process_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<()>;

    /// Applies `header` to a state already advanced to the header's slot.
    fn process_block(&self, state: &mut BeaconState, header: &BeaconBlockHeader) -> Result<()>;

    fn state_transition(&self, state: &mut BeaconState, header: &BeaconBlockHeader) -> Result<()> {
        if state.slot < header.slot {
            self.process_slots(state, header.slot)?;
        }

        self.process_block(state, header)
    }
}
