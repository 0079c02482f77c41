use std::sync::Arc;

use anyhow::Result;
use fork_choice_store::{
    AttestationOrigin, ChainLink, CheckpointState, CheckpointUpdate, Store, StoreConfig,
};
use itertools::Itertools as _;
use log::debug;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tap::Pipe as _;
use transition_functions::StateTransition;
use types::{
    config::Config as ChainConfig,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlockHeader, Checkpoint, IndexedAttestation},
        primitives::{UnixSeconds, ValidatorIndex},
    },
};

pub struct Controller {
    store: RwLock<Store>,
}

impl Controller {
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        transition: Arc<dyn StateTransition>,
        anchor_header: BeaconBlockHeader,
        anchor_state: Arc<BeaconState>,
        time: UnixSeconds,
    ) -> Result<Self> {
        let mut store = Store::new(
            chain_config,
            store_config,
            transition,
            anchor_header,
            anchor_state,
        );

        store.on_tick(time)?;

        Ok(Self {
            store: RwLock::new(store),
        })
    }

    pub fn on_tick(&self, time: UnixSeconds) -> Result<()> {
        let candidate = self.store().unrealized_justified_checkpoint();

        self.prepare_justified_states([candidate])?;
        self.store_mut().on_tick(time)
    }

    pub fn on_block(&self, chain_link: ChainLink) -> Result<()> {
        let candidates = {
            let store = self.store();
            let block_epoch = chain_link.epoch(store.chain_config());

            let unrealized = (block_epoch < store.current_epoch())
                .then_some(chain_link.unrealized_justified_checkpoint);

            core::iter::once(chain_link.state.current_justified_checkpoint)
                .chain(unrealized)
                .collect_vec()
        };

        self.prepare_justified_states(candidates)?;
        self.store_mut().on_block(chain_link)
    }

    pub fn on_attestation(
        &self,
        attestation: IndexedAttestation,
        origin: AttestationOrigin,
    ) -> Result<()> {
        let target = attestation.data.target;

        // Prepare the target state without holding the exclusive lock.
        // Validation of the attestation itself happens under the lock.
        if self.store().contains_block(target.root) {
            self.checkpoint_state(target)?;
        }

        self.store_mut().on_attestation(attestation, origin)
    }

    pub fn on_attester_slashing(
        &self,
        slashable_indices: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Result<()> {
        self.store_mut().on_attester_slashing(slashable_indices)
    }

    pub fn update_checkpoints(
        &self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> Result<CheckpointUpdate> {
        self.store_mut()
            .update_checkpoints(justified_checkpoint, finalized_checkpoint)
    }

    pub fn update_unrealized_checkpoints(
        &self,
        unrealized_justified_checkpoint: Checkpoint,
        unrealized_finalized_checkpoint: Checkpoint,
    ) -> CheckpointUpdate {
        self.store_mut().update_unrealized_checkpoints(
            unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint,
        )
    }

    /// Returns the state of `checkpoint`, computing it if it is not cached.
    ///
    /// Concurrent callers may compute the same state more than once.
    /// All of them receive whichever state was cached first.
    pub fn checkpoint_state(&self, checkpoint: Checkpoint) -> Result<Arc<CheckpointState>> {
        let (base_state, chain_config, transition) = {
            let store = self.store();

            if let Some(state) = store.cached_checkpoint_state(checkpoint) {
                return Ok(state);
            }

            (
                store.checkpoint_base_state(checkpoint)?,
                Arc::clone(store.chain_config()),
                Arc::clone(store.transition()),
            )
        };

        debug!("computing state of checkpoint {checkpoint} outside of store lock");

        let checkpoint_state = CheckpointState::compute(
            &chain_config,
            transition.as_ref(),
            checkpoint,
            &base_state,
        )?
        .pipe(Arc::new);

        self.store_mut()
            .insert_checkpoint_state(checkpoint_state)
            .pipe(Ok)
    }

    // A new justified checkpoint reweights votes with the balances in its state.
    // Computing the state here keeps the slot advance out of the exclusive lock.
    fn prepare_justified_states(
        &self,
        candidates: impl IntoIterator<Item = Checkpoint>,
    ) -> Result<()> {
        let checkpoints = {
            let store = self.store();
            let justified_epoch = store.justified_checkpoint().epoch;

            candidates
                .into_iter()
                .filter(|checkpoint| checkpoint.epoch > justified_epoch)
                .filter(|checkpoint| store.contains_block(checkpoint.root))
                .dedup()
                .collect_vec()
        };

        for checkpoint in checkpoints {
            self.checkpoint_state(checkpoint)?;
        }

        Ok(())
    }

    pub(crate) fn store(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read()
    }

    fn store_mut(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write()
    }
}
