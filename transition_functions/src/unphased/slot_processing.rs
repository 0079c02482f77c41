use std::sync::Arc;

use anyhow::{ensure, Result};
use helper_functions::{accessors, misc};
use types::{
    config::Config,
    phase0::{beacon_state::BeaconState, containers::BeaconBlockHeader, primitives::Slot},
};

use crate::{
    unphased::{block_processing, error::Error},
    StateTransition,
};

/// Reference [`StateTransition`] that advances slots and applies bare headers.
///
/// Epoch processing is limited to carrying the RANDAO mix over to the next epoch.
/// Clients plug in their full state transition instead.
#[derive(Clone)]
pub struct SlotProcessor {
    config: Arc<Config>,
}

impl SlotProcessor {
    #[must_use]
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl StateTransition for SlotProcessor {
    fn process_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<()> {
        process_slots(&self.config, state, slot)
    }

    fn process_block(&self, state: &mut BeaconState, header: &BeaconBlockHeader) -> Result<()> {
        block_processing::process_block_header(state, header)
    }
}

pub fn process_slots(config: &Config, state: &mut BeaconState, slot: Slot) -> Result<()> {
    ensure!(
        state.slot < slot,
        Error::SlotNotLater {
            current: state.slot,
            target: slot,
        },
    );

    while state.slot < slot {
        // > Process epoch on the start slot of the next epoch
        if misc::is_epoch_start(config, state.slot + 1) {
            process_epoch(config, state);
        }

        state.slot += 1;
    }

    Ok(())
}

fn process_epoch(config: &Config, state: &mut BeaconState) {
    process_randao_mixes_reset(config, state);
}

// > Set randao mix
fn process_randao_mixes_reset(config: &Config, state: &mut BeaconState) {
    let length = config
        .epochs_per_historical_vector
        .get()
        .min(state.randao_mixes.len() as u64);

    if length == 0 {
        return;
    }

    let current_epoch = accessors::get_current_epoch(config, state);
    let current_mix = accessors::get_randao_mix(config, state, current_epoch);

    if let Ok(next_index) = usize::try_from((current_epoch + 1) % length) {
        state.randao_mixes.set(next_index, current_mix);
    }
}
