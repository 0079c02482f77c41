//! Chains built for tests.
//!
//! Blocks produced here carry no operations. Forks at the same slot are told apart by `graffiti`,
//! which ends up in the body root.

use core::iter;
use std::sync::Arc;

use anyhow::Result;
use im::Vector;
use transition_functions::unphased;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        containers::{BeaconBlockHeader, Checkpoint, Validator},
        primitives::{Gwei, Slot, H256},
    },
};

pub const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;

const MIN_GENESIS_ACTIVE_VALIDATOR_COUNT: usize = 64;

pub fn min_genesis_state(config: &Config) -> (BeaconBlockHeader, Arc<BeaconState>) {
    genesis_state(
        config,
        iter::repeat_n(MAX_EFFECTIVE_BALANCE, MIN_GENESIS_ACTIVE_VALIDATOR_COUNT),
    )
}

pub fn genesis_state(
    config: &Config,
    balances: impl IntoIterator<Item = Gwei>,
) -> (BeaconBlockHeader, Arc<BeaconState>) {
    let validators = balances
        .into_iter()
        .map(|effective_balance| Validator {
            effective_balance,
            activation_eligibility_epoch: GENESIS_EPOCH,
            activation_epoch: GENESIS_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        })
        .collect::<Vector<_>>();

    let randao_mixes = iter::repeat_n(H256::zero(), randao_mixes_length(config)).collect();

    let header = BeaconBlockHeader {
        slot: config.genesis_slot,
        state_root: state_root_at(config.genesis_slot),
        ..BeaconBlockHeader::default()
    };

    let state = BeaconState {
        slot: config.genesis_slot,
        latest_block_header: header,
        validators,
        randao_mixes,
        ..BeaconState::default()
    };

    (header, Arc::new(state))
}

pub fn empty_block(
    config: &Config,
    pre_state: &BeaconState,
    slot: Slot,
    graffiti: u8,
) -> Result<(BeaconBlockHeader, Arc<BeaconState>)> {
    let mut state = pre_state.clone();

    if state.slot < slot {
        unphased::process_slots(config, &mut state, slot)?;
    }

    let header = BeaconBlockHeader {
        slot,
        parent_root: state.latest_block_header.hash_tree_root(),
        state_root: state_root_at(slot),
        body_root: H256::repeat_byte(graffiti),
    };

    unphased::process_block_header(&mut state, &header)?;

    Ok((header, Arc::new(state)))
}

#[must_use]
pub fn with_checkpoints(
    state: &BeaconState,
    justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
) -> Arc<BeaconState> {
    Arc::new(BeaconState {
        current_justified_checkpoint: justified_checkpoint,
        finalized_checkpoint,
        ..state.clone()
    })
}

// States are never hashed by the fork choice core. Any value unique per slot will do.
fn state_root_at(slot: Slot) -> H256 {
    H256::from_low_u64_be(slot.wrapping_add(1))
}

fn randao_mixes_length(config: &Config) -> usize {
    usize::try_from(config.epochs_per_historical_vector.get()).unwrap_or(usize::MAX)
}
