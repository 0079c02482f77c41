use std::sync::Arc;

use anyhow::{Context as _, Result};
use helper_functions::{accessors, misc};
use im::Vector;
use log::debug;
use transition_functions::StateTransition;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{Checkpoint, Fork, Validator},
        primitives::{Epoch, Gwei, Slot, H256},
    },
};

use crate::error::Error;

/// The parts of a state at the start of a checkpoint epoch needed to process attestations
/// targeting that checkpoint.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CheckpointState {
    pub checkpoint: Checkpoint,
    pub epoch: Epoch,
    pub slot: Slot,
    pub genesis_validators_root: H256,
    pub fork: Fork,
    pub validators: Vector<Validator>,
    pub randao_mixes: Vector<H256>,
    pub total_active_balance: Gwei,
    // Effective balances of active unslashed validators, zero for all others.
    pub active_balances: Arc<[Gwei]>,
}

impl CheckpointState {
    /// Advances `base_state` (the post-state of `checkpoint.root`) to the start of
    /// `checkpoint.epoch` if it is older and takes a snapshot of the result.
    ///
    /// `base_state` is left untouched. The advance works on a copy.
    pub fn compute(
        config: &Config,
        transition: &dyn StateTransition,
        checkpoint: Checkpoint,
        base_state: &BeaconState,
    ) -> Result<Self> {
        let epoch_start = misc::compute_start_slot_at_epoch(config, checkpoint.epoch);

        if base_state.slot >= epoch_start {
            return Ok(Self::snapshot(config, checkpoint, base_state));
        }

        debug!(
            "advancing state of long checkpoint {checkpoint} from slot {} to slot {epoch_start}",
            base_state.slot,
        );

        let mut state = base_state.clone();

        transition
            .process_slots(&mut state, epoch_start)
            .context(Error::CheckpointComputationFailed { checkpoint })?;

        Ok(Self::snapshot(config, checkpoint, &state))
    }

    #[must_use]
    pub fn snapshot(config: &Config, checkpoint: Checkpoint, state: &BeaconState) -> Self {
        Self {
            checkpoint,
            epoch: checkpoint.epoch,
            slot: state.slot,
            genesis_validators_root: state.genesis_validators_root,
            fork: state.fork,
            validators: state.validators.clone(),
            randao_mixes: state.randao_mixes.clone(),
            total_active_balance: accessors::get_total_active_balance(config, state),
            active_balances: accessors::get_active_balances(config, state).into(),
        }
    }

    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::bail;
    use transition_functions::SlotProcessor;
    use types::phase0::containers::BeaconBlockHeader;

    use super::*;

    struct FailingTransition;

    impl StateTransition for FailingTransition {
        fn process_slots(&self, _state: &mut BeaconState, _slot: Slot) -> Result<()> {
            bail!("slot processing is not available")
        }

        fn process_block(&self, _state: &mut BeaconState, _: &BeaconBlockHeader) -> Result<()> {
            bail!("block processing is not available")
        }
    }

    #[derive(Default)]
    struct CountingTransition {
        process_slots_calls: AtomicUsize,
    }

    impl StateTransition for CountingTransition {
        fn process_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<()> {
            self.process_slots_calls.fetch_add(1, Ordering::Relaxed);
            state.slot = slot;
            Ok(())
        }

        fn process_block(&self, _state: &mut BeaconState, _: &BeaconBlockHeader) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn long_checkpoint_is_advanced_to_exactly_epoch_start() -> Result<()> {
        let config = Arc::new(Config::minimal());
        let (_, genesis_state) = factory::min_genesis_state(&config);
        let (header, state) = factory::empty_block(&config, &genesis_state, 5, 0)?;

        let checkpoint = Checkpoint {
            epoch: 3,
            root: header.hash_tree_root(),
        };

        let transition = SlotProcessor::new(Arc::clone(&config));
        let checkpoint_state = CheckpointState::compute(&config, &transition, checkpoint, &state)?;

        assert_eq!(checkpoint_state.slot, 24);
        assert_eq!(checkpoint_state.epoch, 3);
        assert_eq!(checkpoint_state.checkpoint, checkpoint);
        assert_eq!(state.slot, 5);

        Ok(())
    }

    #[test]
    fn state_already_in_checkpoint_epoch_is_not_advanced() -> Result<()> {
        let config = Config::minimal();
        let (_, state) = factory::min_genesis_state(&config);
        let transition = CountingTransition::default();

        let checkpoint = Checkpoint {
            epoch: 0,
            root: H256::repeat_byte(1),
        };

        let checkpoint_state = CheckpointState::compute(&config, &transition, checkpoint, &state)?;

        assert_eq!(checkpoint_state.slot, 0);
        assert_eq!(transition.process_slots_calls.load(Ordering::Relaxed), 0);
        assert_eq!(
            checkpoint_state.total_active_balance,
            64 * factory::MAX_EFFECTIVE_BALANCE,
        );

        Ok(())
    }

    #[test]
    fn failed_advance_is_reported_as_checkpoint_computation_failure() {
        let config = Config::minimal();
        let (_, state) = factory::min_genesis_state(&config);

        let checkpoint = Checkpoint {
            epoch: 2,
            root: H256::repeat_byte(1),
        };

        let error = CheckpointState::compute(&config, &FailingTransition, checkpoint, &state)
            .expect_err("slot processing fails");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::CheckpointComputationFailed { checkpoint: failed }) if *failed == checkpoint,
        ));
    }
}
