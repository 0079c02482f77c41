use core::mem;
use std::{collections::HashMap, sync::Arc};

use anyhow::{bail, ensure, Context as _, Result};
use block_graph::BlockGraph;
use hash_hasher::{HashedMap, HashedSet};
use helper_functions::misc;
use itertools::Itertools as _;
use log::{debug, error, info, warn};
use transition_functions::StateTransition;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{AttestationData, BeaconBlockHeader, Checkpoint, IndexedAttestation},
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    },
};

use crate::{
    checkpoint_state::CheckpointState,
    error::Error,
    misc::{
        AttestationOrigin, ChainLink, CheckpointPair, CheckpointUpdate, Difference, ForkNode,
    },
    store_config::StoreConfig,
    votes::{self, VoteAccumulator},
};

/// [`Store`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#store)
///
/// Owns the [`BlockGraph`], the fork node tree, the checkpoint state cache and the votes.
/// All of them are pruned together when the finalized checkpoint advances.
pub struct Store {
    chain_config: Arc<Config>,
    store_config: StoreConfig,
    transition: Arc<dyn StateTransition>,
    time: UnixSeconds,
    genesis_time: UnixSeconds,
    realized: CheckpointPair,
    unrealized: CheckpointPair,
    checkpoint_states: HashMap<Checkpoint, Arc<CheckpointState>>,
    fork_nodes: HashedMap<H256, ForkNode>,
    head_set: HashedSet<H256>,
    votes: VoteAccumulator,
    // Attestations from the current slot. They may only affect the fork choice of later slots.
    delayed_attestations: Vec<IndexedAttestation>,
    block_graph: BlockGraph,
}

impl Store {
    /// [`get_forkchoice_store`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_forkchoice_store)
    ///
    /// The anchor block becomes the justified and finalized checkpoint.
    /// Genesis time is taken from the anchor state.
    #[must_use]
    pub fn new(
        chain_config: Arc<Config>,
        store_config: StoreConfig,
        transition: Arc<dyn StateTransition>,
        anchor_header: BeaconBlockHeader,
        anchor_state: Arc<BeaconState>,
    ) -> Self {
        let anchor_root = anchor_header.hash_tree_root();
        let anchor_epoch = misc::compute_epoch_at_slot(&chain_config, anchor_state.slot);

        let anchor_checkpoint = Checkpoint {
            epoch: anchor_epoch,
            root: anchor_root,
        };

        let anchor_checkpoint_state =
            CheckpointState::snapshot(&chain_config, anchor_checkpoint, &anchor_state);

        let genesis_time = anchor_state.genesis_time;

        let time = anchor_state
            .slot
            .saturating_sub(chain_config.genesis_slot)
            .saturating_mul(chain_config.seconds_per_slot.get())
            .saturating_add(genesis_time);

        let anchor_node = ForkNode {
            block_root: anchor_root,
            parent_root: anchor_header.parent_root,
            slot: anchor_header.slot,
            weight: 0,
            children: vec![],
            justified_epoch: anchor_epoch,
            finalized_epoch: anchor_epoch,
        };

        let block_graph = BlockGraph::new(
            Arc::clone(&chain_config),
            Arc::clone(&transition),
            anchor_header,
            anchor_state,
        );

        Self {
            chain_config,
            store_config,
            transition,
            time,
            genesis_time,
            realized: CheckpointPair::new(anchor_checkpoint, anchor_checkpoint),
            unrealized: CheckpointPair::new(anchor_checkpoint, anchor_checkpoint),
            checkpoint_states: HashMap::new(),
            fork_nodes: core::iter::once((anchor_root, anchor_node)).collect(),
            head_set: core::iter::once(anchor_root).collect(),
            votes: VoteAccumulator::new(anchor_checkpoint_state.active_balances),
            delayed_attestations: vec![],
            block_graph,
        }
    }

    #[must_use]
    pub fn chain_config(&self) -> &Arc<Config> {
        &self.chain_config
    }

    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        self.store_config
    }

    #[must_use]
    pub fn transition(&self) -> &Arc<dyn StateTransition> {
        &self.transition
    }

    #[must_use]
    pub const fn time(&self) -> UnixSeconds {
        self.time
    }

    #[must_use]
    pub const fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    /// [`get_current_slot`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_current_slot)
    #[must_use]
    pub fn slot(&self) -> Slot {
        let seconds_since_genesis = self.time.saturating_sub(self.genesis_time);
        let slots_since_genesis = seconds_since_genesis / self.chain_config.seconds_per_slot.get();
        self.chain_config.genesis_slot.saturating_add(slots_since_genesis)
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot(&self.chain_config, self.slot())
    }

    #[must_use]
    pub fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1)
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.realized.justified
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.realized.finalized
    }

    #[must_use]
    pub const fn unrealized_justified_checkpoint(&self) -> Checkpoint {
        self.unrealized.justified
    }

    #[must_use]
    pub const fn unrealized_finalized_checkpoint(&self) -> Checkpoint {
        self.unrealized.finalized
    }

    #[must_use]
    pub fn finalized_slot(&self) -> Slot {
        misc::compute_start_slot_at_epoch(&self.chain_config, self.realized.finalized.epoch)
    }

    #[must_use]
    pub const fn block_graph(&self) -> &BlockGraph {
        &self.block_graph
    }

    #[must_use]
    pub const fn fork_nodes(&self) -> &HashedMap<H256, ForkNode> {
        &self.fork_nodes
    }

    /// Roots of blocks with no known children.
    #[must_use]
    pub const fn head_set(&self) -> &HashedSet<H256> {
        &self.head_set
    }

    #[must_use]
    pub fn weight(&self, block_root: H256) -> Option<Gwei> {
        self.fork_nodes.get(&block_root).map(|node| node.weight)
    }

    #[must_use]
    pub const fn votes(&self) -> &VoteAccumulator {
        &self.votes
    }

    #[must_use]
    pub fn delayed_attestations(&self) -> &[IndexedAttestation] {
        &self.delayed_attestations
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.block_graph.contains(block_root)
    }

    #[must_use]
    pub fn cached_checkpoint_state(&self, checkpoint: Checkpoint) -> Option<Arc<CheckpointState>> {
        self.checkpoint_states.get(&checkpoint).map(Arc::clone)
    }

    pub fn cached_checkpoints(&self) -> impl Iterator<Item = Checkpoint> + '_ {
        self.checkpoint_states.keys().copied()
    }

    /// Returns the root of the latest block at or before `slot` in the chain ending with `root`.
    ///
    /// A `slot` at or after the slot of `root` itself returns `root`.
    /// Returns [`H256::zero`] if `root` is unknown or the chain is broken by pruning.
    #[must_use]
    pub fn ancestor(&self, root: H256, slot: Slot) -> H256 {
        self.block_graph
            .ancestor(root, slot)
            .unwrap_or_else(H256::zero)
    }

    /// [`get_head`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_head)
    ///
    /// Ties between children are broken by root, with the greater root winning.
    pub fn head(&self) -> Result<(H256, Slot)> {
        let justified_root = self.realized.justified.root;

        let justified_slot = match self.fork_nodes.get(&justified_root) {
            Some(node) => node.slot,
            None => match self.block_graph.header(justified_root) {
                Some(header) => header.slot,
                None => bail!(Error::JustifiedBlockNotFound {
                    root: justified_root,
                }),
            },
        };

        let mut head = (justified_root, justified_slot);

        while let Some(best_child) = self
            .children(head.0)
            .into_iter()
            .max_by_key(|node| (node.weight, node.block_root))
        {
            head = (best_child.block_root, best_child.slot);
        }

        Ok(head)
    }

    // The node of the justified block may have been pruned by finalization.
    // Its children are then found by scanning the remaining nodes.
    fn children(&self, block_root: H256) -> Vec<&ForkNode> {
        match self.fork_nodes.get(&block_root) {
            Some(node) => node
                .children
                .iter()
                .filter_map(|child_root| self.fork_nodes.get(child_root))
                .collect_vec(),
            None => self
                .fork_nodes
                .values()
                .filter(|node| node.parent_root == block_root)
                .collect_vec(),
        }
    }

    /// [`on_tick`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_tick)
    pub fn on_tick(&mut self, time: UnixSeconds) -> Result<()> {
        // Ticks may arrive out of order.
        if time <= self.time {
            return Ok(());
        }

        let old_slot = self.slot();

        // > update store time
        self.time = time;

        let new_slot = self.slot();

        if new_slot <= old_slot {
            return Ok(());
        }

        // > If a new epoch, pull-up justification and finalization from previous epoch
        if misc::compute_epoch_at_slot(&self.chain_config, new_slot)
            > misc::compute_epoch_at_slot(&self.chain_config, old_slot)
        {
            let mut realized = self.realized;
            let update = realized.update(self.unrealized.justified, self.unrealized.finalized);

            self.commit_realized(realized, update)?;
        }

        let delayed_attestations = mem::take(&mut self.delayed_attestations);

        self.apply_attestations(delayed_attestations)
    }

    /// [`on_block`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_block)
    ///
    /// The block must already have been processed by the executor that produced `chain_link.state`.
    pub fn on_block(&mut self, chain_link: ChainLink) -> Result<()> {
        self.validate_block(&chain_link)?;

        let block_epoch = chain_link.epoch(&self.chain_config);

        let ChainLink {
            header,
            state,
            unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint,
            ..
        } = chain_link;

        let justified_checkpoint = state.current_justified_checkpoint;
        let finalized_checkpoint = state.finalized_checkpoint;

        let block_root = self.block_graph.insert_block(header, state)?;

        self.fork_nodes.insert(
            block_root,
            ForkNode {
                block_root,
                parent_root: header.parent_root,
                slot: header.slot,
                weight: 0,
                children: vec![],
                justified_epoch: justified_checkpoint.epoch,
                finalized_epoch: finalized_checkpoint.epoch,
            },
        );

        if let Some(parent) = self.fork_nodes.get_mut(&header.parent_root) {
            parent.children.push(block_root);
        }

        self.head_set.remove(&header.parent_root);
        self.head_set.insert(block_root);

        // > Update checkpoints in store if necessary
        let mut realized = self.realized;
        let mut update = realized.update(justified_checkpoint, finalized_checkpoint);

        self.update_unrealized_checkpoints(
            unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint,
        );

        // > If the block is from a prior epoch, apply the realized values
        if block_epoch < self.current_epoch() {
            update = update
                | realized.update(
                    unrealized_justified_checkpoint,
                    unrealized_finalized_checkpoint,
                );
        }

        self.commit_realized(realized, update)?;

        self.block_graph
            .unload_old_states(self.store_config.unfinalized_states_in_memory);

        Ok(())
    }

    fn validate_block(&self, chain_link: &ChainLink) -> Result<()> {
        let ChainLink {
            block_root, header, ..
        } = chain_link;

        let current_slot = self.slot();

        // > Blocks cannot be in the future.
        // > If they are, their consideration must be delayed until they are in the past.
        ensure!(
            header.slot <= current_slot,
            Error::BlockFromFuture {
                slot: header.slot,
                current_slot,
            },
        );

        // > Parent block must be known
        let Some(parent_header) = self.block_graph.header(header.parent_root) else {
            bail!(block_graph::Error::UnknownParent {
                root: *block_root,
                parent_root: header.parent_root,
            });
        };

        ensure!(
            parent_header.slot < header.slot,
            Error::BlockSlotNotLaterThanParent {
                slot: header.slot,
                parent_slot: parent_header.slot,
            },
        );

        // > Check block is a descendant of the finalized block at the checkpoint finalized slot
        let finalized_checkpoint = self.realized.finalized;

        let finalized_block_slot = self
            .block_graph
            .header(finalized_checkpoint.root)
            .map_or_else(|| self.finalized_slot(), |header| header.slot);

        ensure!(
            self.block_graph
                .ancestor(header.parent_root, finalized_block_slot)
                == Some(finalized_checkpoint.root),
            Error::BlockNotDescendantOfFinalized {
                block_root: *block_root,
                finalized_checkpoint,
            },
        );

        Ok(())
    }

    /// [`update_checkpoints`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#update_checkpoints)
    ///
    /// Advancing the justified checkpoint reweights votes with the new justified balances.
    /// Advancing the finalized checkpoint prunes everything that can no longer become canonical.
    pub fn update_checkpoints(
        &mut self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> Result<CheckpointUpdate> {
        let mut realized = self.realized;
        let update = realized.update(justified_checkpoint, finalized_checkpoint);

        self.commit_realized(realized, update)?;

        Ok(update)
    }

    /// [`update_unrealized_checkpoints`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#update_unrealized_checkpoints)
    pub fn update_unrealized_checkpoints(
        &mut self,
        unrealized_justified_checkpoint: Checkpoint,
        unrealized_finalized_checkpoint: Checkpoint,
    ) -> CheckpointUpdate {
        self.unrealized.update(
            unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint,
        )
    }

    // States needed by the update are computed before `realized` is replaced.
    // A failed update leaves the checkpoints, the tree and the graph untouched.
    fn commit_realized(
        &mut self,
        realized: CheckpointPair,
        update: CheckpointUpdate,
    ) -> Result<()> {
        let justified_state = if update.justified_updated {
            Some(self.checkpoint_state(realized.justified)?)
        } else {
            None
        };

        let finalized_block_state = if update.finalized_updated {
            Some(self.checkpoint_base_state(realized.finalized)?)
        } else {
            None
        };

        self.realized = realized;

        // Pruning comes first so that differences for pruned blocks are dropped
        // instead of being applied to nodes that are about to be removed.
        if let Some(anchor_state) = finalized_block_state {
            self.prune_finalized(realized.finalized, anchor_state);
        }

        if let Some(justified_state) = justified_state {
            self.update_balances_after_justification(&justified_state)?;
        }

        Ok(())
    }

    /// Prunes the checkpoint state cache, the fork node tree and the [`BlockGraph`], in that order.
    ///
    /// The state of the finalized block is regenerated first if it has been unloaded.
    /// It becomes the state every later state is regenerated from.
    pub fn on_new_finalized(&mut self, finalized_checkpoint: Checkpoint) -> Result<()> {
        let anchor_state = self.checkpoint_base_state(finalized_checkpoint)?;
        self.prune_finalized(finalized_checkpoint, anchor_state);
        Ok(())
    }

    fn prune_finalized(
        &mut self,
        finalized_checkpoint: Checkpoint,
        anchor_state: Arc<BeaconState>,
    ) {
        let finalized_slot =
            misc::compute_start_slot_at_epoch(&self.chain_config, finalized_checkpoint.epoch);

        let finalized_block_slot = self
            .block_graph
            .header(finalized_checkpoint.root)
            .map_or(finalized_slot, |header| header.slot);

        self.checkpoint_states
            .retain(|checkpoint, _| checkpoint.epoch > finalized_checkpoint.epoch);

        let nodes_before = self.fork_nodes.len();

        let block_graph = &self.block_graph;

        self.fork_nodes.retain(|block_root, node| {
            node.slot > finalized_slot
                && block_graph.ancestor(*block_root, finalized_block_slot)
                    == Some(finalized_checkpoint.root)
        });

        let surviving_roots = self.fork_nodes.keys().copied().collect::<HashedSet<_>>();

        for node in self.fork_nodes.values_mut() {
            node.children
                .retain(|child_root| surviving_roots.contains(child_root));
        }

        self.head_set
            .retain(|block_root| self.fork_nodes.contains_key(block_root));

        if self.head_set.is_empty() {
            self.head_set.insert(finalized_checkpoint.root);
        }

        let pruned_nodes = nodes_before - self.fork_nodes.len();

        let pruned_blocks = self.block_graph.prune(
            finalized_slot,
            finalized_checkpoint.root,
            anchor_state,
        );

        info!(
            "finalized checkpoint {finalized_checkpoint} \
             (pruned fork nodes: {pruned_nodes}, pruned blocks: {pruned_blocks})",
        );
    }

    /// [`on_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_attestation)
    ///
    /// Attestations from the current slot are delayed until the next slot.
    pub fn on_attestation(
        &mut self,
        attestation: IndexedAttestation,
        origin: AttestationOrigin,
    ) -> Result<()> {
        self.validate_on_attestation(attestation.data, origin)?;

        let target_state = self.checkpoint_state(attestation.data.target)?;
        let validator_count = target_state.validator_count();

        for validator_index in attestation.attesting_indices.iter().copied() {
            ensure!(
                usize::try_from(validator_index).is_ok_and(|index| index < validator_count),
                Error::ValidatorIndexOutOfBounds {
                    validator_index,
                    validator_count,
                },
            );
        }

        self.apply_attestations(core::iter::once(attestation))
    }

    /// [`validate_on_attestation`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#validate_on_attestation)
    fn validate_on_attestation(
        &self,
        data: AttestationData,
        origin: AttestationOrigin,
    ) -> Result<()> {
        let AttestationData {
            slot,
            beacon_block_root,
            target,
            ..
        } = data;

        // > If the given attestation is not from a beacon block message,
        // > we have to check the target epoch scope.
        if !origin.is_from_block() {
            let current_slot = self.slot();
            let previous_epoch = self.previous_epoch();

            // > Attestations must be from the current or previous epoch
            ensure!(
                target.epoch >= previous_epoch,
                Error::AttestationTargetsStaleEpoch {
                    data,
                    previous_epoch,
                },
            );

            ensure!(
                slot <= current_slot && target.epoch <= self.current_epoch(),
                Error::AttestationFromFuture { data, current_slot },
            );
        }

        // > Check that the epoch number and slot number are matching
        ensure!(
            target.epoch == misc::compute_epoch_at_slot(&self.chain_config, slot),
            Error::AttestationTargetsWrongEpoch { data },
        );

        // > Attestation target must be for a known block
        ensure!(
            self.contains_block(target.root),
            Error::UnknownAttestationTarget { data },
        );

        // > Attestations must be for a known block
        let Some(block_header) = self.block_graph.header(beacon_block_root) else {
            bail!(Error::UnknownAttestationBlock { data });
        };

        // > Attestations must not be for blocks in the future
        ensure!(
            block_header.slot <= slot,
            Error::AttestationForFutureBlock {
                data,
                block_slot: block_header.slot,
            },
        );

        // > LMD vote must be consistent with FFG vote target
        let target_slot = misc::compute_start_slot_at_epoch(&self.chain_config, target.epoch);

        ensure!(
            self.ancestor(beacon_block_root, target_slot) == target.root,
            Error::LmdGhostInconsistentWithFfgTarget { data },
        );

        Ok(())
    }

    /// [`on_attester_slashing`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_attester_slashing)
    ///
    /// Takes the intersection of attesting indices of a slashing that has already been verified.
    pub fn on_attester_slashing(
        &mut self,
        slashable_indices: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Result<()> {
        let differences = self.votes.equivocate(slashable_indices)?;
        self.apply_balance_differences(differences);
        Ok(())
    }

    fn apply_attestations(
        &mut self,
        attestations: impl IntoIterator<Item = IndexedAttestation>,
    ) -> Result<()> {
        let current_slot = self.slot();
        let mut differences = votes::difference_map();

        for attestation in attestations {
            let AttestationData {
                slot,
                beacon_block_root,
                target,
                ..
            } = attestation.data;

            // > Attestations can only affect the fork choice of subsequent slots.
            // > Delay consideration in the fork choice until their slot is in the past.
            if current_slot <= slot {
                self.delayed_attestations.push(attestation);
                continue;
            }

            self.votes.update_latest_messages(
                target.epoch,
                beacon_block_root,
                attestation.attesting_indices,
                &mut differences,
            )?;
        }

        self.apply_balance_differences(differences);

        Ok(())
    }

    fn update_balances_after_justification(
        &mut self,
        justified_state: &CheckpointState,
    ) -> Result<()> {
        let differences = self
            .votes
            .update_balances(Arc::clone(&justified_state.active_balances))?;

        self.apply_balance_differences(differences);

        Ok(())
    }

    // Each difference is added to the block it was recorded for and to all of its ancestors that
    // still have nodes. Differences for pruned blocks are dropped.
    fn apply_balance_differences(
        &mut self,
        differences: impl IntoIterator<Item = (H256, Difference)>,
    ) {
        for (block_root, difference) in differences {
            if difference == 0 {
                continue;
            }

            let mut current = block_root;

            while let Some(node) = self.fork_nodes.get_mut(&current) {
                node.weight = match node.weight.checked_add_signed(difference) {
                    Some(weight) => weight,
                    None => {
                        error!(
                            "weight of block {:?} should never go below zero \
                             (weight: {}, difference: {difference})",
                            node.block_root, node.weight,
                        );

                        0
                    }
                };

                current = node.parent_root;
            }
        }
    }

    /// Returns the state of `checkpoint`, computing and caching it if needed.
    ///
    /// States of checkpoints at or before the finalized epoch are computed but not cached.
    pub fn checkpoint_state(&mut self, checkpoint: Checkpoint) -> Result<Arc<CheckpointState>> {
        if let Some(state) = self.cached_checkpoint_state(checkpoint) {
            return Ok(state);
        }

        let base_state = self.checkpoint_base_state(checkpoint)?;

        let checkpoint_state = CheckpointState::compute(
            &self.chain_config,
            self.transition.as_ref(),
            checkpoint,
            &base_state,
        )?;

        Ok(self.insert_checkpoint_state(Arc::new(checkpoint_state)))
    }

    /// Returns the post-state of `checkpoint.root`, regenerating it if it has been unloaded.
    pub fn checkpoint_base_state(&self, checkpoint: Checkpoint) -> Result<Arc<BeaconState>> {
        let base_state = self
            .block_graph
            .state(checkpoint.root, true)
            .context(Error::CheckpointComputationFailed { checkpoint })?;

        let Some(base_state) = base_state else {
            error!(
                "state of checkpoint {checkpoint} cannot be computed \
                 because its history was pruned",
            );
            bail!(Error::OrphanCheckpoint { checkpoint });
        };

        Ok(base_state)
    }

    /// Caches `checkpoint_state` unless it is already cached or its epoch is finalized.
    ///
    /// Returns the cached value, which is the one inserted first.
    pub fn insert_checkpoint_state(
        &mut self,
        checkpoint_state: Arc<CheckpointState>,
    ) -> Arc<CheckpointState> {
        let checkpoint = checkpoint_state.checkpoint;

        if checkpoint.epoch <= self.realized.finalized.epoch {
            return checkpoint_state;
        }

        if let Some(cached) = self.cached_checkpoint_state(checkpoint) {
            return cached;
        }

        if self.checkpoint_states.len() >= self.store_config.max_checkpoint_states {
            self.evict_checkpoint_state();
        }

        self.checkpoint_states
            .insert(checkpoint, Arc::clone(&checkpoint_state));

        debug!("cached state of checkpoint {checkpoint}");

        checkpoint_state
    }

    fn evict_checkpoint_state(&mut self) {
        let justified_checkpoint = self.realized.justified;

        let evicted = self
            .checkpoint_states
            .keys()
            .copied()
            .filter(|checkpoint| *checkpoint != justified_checkpoint)
            .min_by_key(|checkpoint| (checkpoint.epoch, checkpoint.root));

        if let Some(checkpoint) = evicted {
            self.checkpoint_states.remove(&checkpoint);

            warn!(
                "checkpoint state cache is full (limit: {}); evicted state of checkpoint {checkpoint}",
                self.store_config.max_checkpoint_states,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use itertools::Itertools as _;
    use test_case::test_case;
    use transition_functions::SlotProcessor;

    use super::*;

    const GWEI_A: Gwei = 10;
    const GWEI_B: Gwei = 20;

    struct CountingTransition {
        inner: SlotProcessor,
        process_slots_calls: AtomicUsize,
    }

    impl StateTransition for CountingTransition {
        fn process_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<()> {
            self.process_slots_calls.fetch_add(1, Ordering::Relaxed);
            self.inner.process_slots(state, slot)
        }

        fn process_block(&self, state: &mut BeaconState, header: &BeaconBlockHeader) -> Result<()> {
            self.inner.process_block(state, header)
        }
    }

    struct Harness {
        store: Store,
        genesis_root: H256,
    }

    impl Harness {
        fn new(chain_config: Config, balances: impl IntoIterator<Item = Gwei>) -> Self {
            Self::with_store_config(chain_config, StoreConfig::default(), balances)
        }

        fn with_store_config(
            chain_config: Config,
            store_config: StoreConfig,
            balances: impl IntoIterator<Item = Gwei>,
        ) -> Self {
            let chain_config = Arc::new(chain_config);
            let transition = Arc::new(SlotProcessor::new(Arc::clone(&chain_config)));
            Self::build(chain_config, store_config, transition, balances)
        }

        fn build(
            chain_config: Arc<Config>,
            store_config: StoreConfig,
            transition: Arc<dyn StateTransition>,
            balances: impl IntoIterator<Item = Gwei>,
        ) -> Self {
            let (header, state) = factory::genesis_state(&chain_config, balances);
            let store = Store::new(chain_config, store_config, transition, header, state);

            Self {
                genesis_root: header.hash_tree_root(),
                store,
            }
        }

        fn tick_to_slot(&mut self, slot: Slot) -> Result<()> {
            let seconds_per_slot = self.store.chain_config().seconds_per_slot.get();
            let time = self.store.genesis_time() + slot * seconds_per_slot;
            self.store.on_tick(time)
        }

        fn block(&mut self, parent_root: H256, slot: Slot, graffiti: u8) -> Result<H256> {
            let chain_link = self.chain_link(parent_root, slot, graffiti)?;
            let block_root = chain_link.block_root;
            self.store.on_block(chain_link)?;
            Ok(block_root)
        }

        fn chain_link(&self, parent_root: H256, slot: Slot, graffiti: u8) -> Result<ChainLink> {
            let parent_state = self
                .store
                .block_graph()
                .state(parent_root, true)?
                .expect("parent state should be available in tests");

            let (header, state) = factory::empty_block(
                self.store.chain_config(),
                &parent_state,
                slot,
                graffiti,
            )?;

            Ok(ChainLink::new(header, state))
        }

        fn attest(
            &mut self,
            validator_indices: &[ValidatorIndex],
            slot: Slot,
            beacon_block_root: H256,
            target: Checkpoint,
        ) -> Result<()> {
            let attestation = IndexedAttestation {
                attesting_indices: validator_indices.to_vec(),
                data: AttestationData {
                    slot,
                    beacon_block_root,
                    target,
                    ..AttestationData::default()
                },
            };

            self.store.on_attestation(attestation, AttestationOrigin::Gossip)
        }

        fn genesis_checkpoint(&self) -> Checkpoint {
            Checkpoint {
                epoch: 0,
                root: self.genesis_root,
            }
        }
    }

    #[test]
    fn head_of_fresh_store_is_anchor() -> Result<()> {
        let harness = Harness::new(Config::minimal(), [32; 4]);

        assert_eq!(harness.store.head()?, (harness.genesis_root, 0));
        assert_eq!(harness.store.justified_checkpoint(), harness.genesis_checkpoint());
        assert_eq!(harness.store.finalized_checkpoint(), harness.genesis_checkpoint());
        assert_eq!(harness.store.slot(), 0);

        Ok(())
    }

    #[test]
    fn heavier_fork_becomes_head() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [GWEI_A, GWEI_B]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(1)?;

        let block_a = harness.block(genesis, 1, 0xa)?;
        let block_b = harness.block(genesis, 1, 0xb)?;

        harness.tick_to_slot(2)?;

        let target = harness.genesis_checkpoint();

        harness.attest(&[0], 1, block_a, target)?;
        harness.attest(&[1], 1, block_b, target)?;

        assert_eq!(harness.store.weight(block_a), Some(GWEI_A));
        assert_eq!(harness.store.weight(block_b), Some(GWEI_B));
        assert_eq!(harness.store.weight(genesis), Some(GWEI_A + GWEI_B));
        assert_eq!(harness.store.head()?, (block_b, 1));

        // Votes from later epochs replace earlier ones.
        harness.tick_to_slot(9)?;

        let target = Checkpoint {
            epoch: 1,
            root: block_a,
        };

        harness.attest(&[1], 8, block_a, target)?;

        assert_eq!(harness.store.weight(block_a), Some(GWEI_A + GWEI_B));
        assert_eq!(harness.store.weight(block_b), Some(0));
        assert_eq!(harness.store.head()?, (block_a, 1));

        Ok(())
    }

    #[test]
    fn equal_weights_are_broken_by_greater_root() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(1)?;

        let block_a = harness.block(genesis, 1, 1)?;
        let block_b = harness.block(genesis, 1, 2)?;

        let expected = block_a.max(block_b);

        assert_eq!(harness.store.head()?, (expected, 1));
        assert_eq!(harness.store.head()?, harness.store.head()?);

        Ok(())
    }

    #[test]
    fn head_descends_to_leaf() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(5)?;

        let block_1 = harness.block(genesis, 1, 0)?;
        let block_2 = harness.block(block_1, 2, 0)?;
        let block_4 = harness.block(block_2, 4, 0)?;

        assert_eq!(harness.store.head()?, (block_4, 4));
        assert_eq!(
            harness.store.head_set().iter().copied().collect_vec(),
            [block_4],
        );

        Ok(())
    }

    #[test]
    fn attestations_from_current_slot_are_delayed_until_next_slot() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [GWEI_A, GWEI_B]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(1)?;

        let block_a = harness.block(genesis, 1, 0xa)?;

        harness.attest(&[0, 1], 1, block_a, harness.genesis_checkpoint())?;

        assert_eq!(harness.store.weight(block_a), Some(0));
        assert_eq!(harness.store.delayed_attestations().len(), 1);

        harness.tick_to_slot(2)?;

        assert_eq!(harness.store.weight(block_a), Some(GWEI_A + GWEI_B));
        assert!(harness.store.delayed_attestations().is_empty());

        Ok(())
    }

    #[test]
    fn attester_slashing_removes_votes() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [GWEI_A, GWEI_B]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(1)?;

        let block_a = harness.block(genesis, 1, 0xa)?;
        let block_b = harness.block(genesis, 1, 0xb)?;

        harness.tick_to_slot(2)?;

        let target = harness.genesis_checkpoint();

        harness.attest(&[0], 1, block_a, target)?;
        harness.attest(&[1], 1, block_b, target)?;

        harness.store.on_attester_slashing([1])?;

        assert_eq!(harness.store.weight(block_b), Some(0));
        assert_eq!(harness.store.head()?, (block_a, 1));

        Ok(())
    }

    #[test]
    fn ancestor_handles_own_slot_later_slots_and_unknown_roots() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(6)?;

        let block_3 = harness.block(genesis, 3, 0)?;
        let block_6 = harness.block(block_3, 6, 0)?;

        let store = &harness.store;

        assert_eq!(store.ancestor(block_6, 6), block_6);
        assert_eq!(store.ancestor(block_6, 1000), block_6);
        assert_eq!(store.ancestor(block_6, 5), block_3);
        assert_eq!(store.ancestor(block_6, 0), genesis);
        assert_eq!(store.ancestor(H256::repeat_byte(0xee), 3), H256::zero());

        Ok(())
    }

    #[test]
    fn block_validation_errors() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        let chain_link = harness.chain_link(genesis, 3, 0)?;

        let error = harness
            .store
            .on_block(chain_link.clone())
            .expect_err("block is from a future slot");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::BlockFromFuture {
                slot: 3,
                current_slot: 0,
            }),
        ));

        harness.tick_to_slot(3)?;
        harness.store.on_block(chain_link.clone())?;

        let error = harness
            .store
            .on_block(chain_link)
            .expect_err("block is already known");

        assert!(matches!(
            error.downcast_ref(),
            Some(block_graph::Error::DuplicateBlock { .. }),
        ));

        let mut orphan = harness.chain_link(genesis, 2, 1)?;
        orphan.header.parent_root = H256::repeat_byte(0xee);
        orphan.block_root = orphan.header.hash_tree_root();

        let error = harness
            .store
            .on_block(orphan)
            .expect_err("parent is unknown");

        assert!(matches!(
            error.downcast_ref(),
            Some(block_graph::Error::UnknownParent { .. }),
        ));

        Ok(())
    }

    #[test_case(9, 2, 0 => matches Error::AttestationTargetsWrongEpoch { .. }; "target epoch does not match slot")]
    #[test_case(18, 2, 1 => matches Error::AttestationFromFuture { .. }; "slot after current slot")]
    #[test_case(1, 0, 1 => matches Error::AttestationTargetsStaleEpoch { .. }; "target before previous epoch")]
    #[test_case(9, 1, 2 => matches Error::UnknownAttestationBlock { .. }; "unknown block")]
    fn attestation_validation_errors(slot: Slot, target_epoch: Epoch, block: u8) -> Error {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(17).expect("tick succeeds");

        let block_root = match block {
            0 => genesis,
            1 => harness.block(genesis, 1, 0).expect("block is valid"),
            _ => H256::repeat_byte(block),
        };

        let target = Checkpoint {
            epoch: target_epoch,
            root: genesis,
        };

        harness
            .attest(&[0], slot, block_root, target)
            .expect_err("attestation should be rejected")
            .downcast()
            .expect("error should come from fork_choice_store")
    }

    #[test]
    fn attestation_with_out_of_bounds_index_is_rejected() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(2)?;

        let error = harness
            .attest(&[4], 1, genesis, harness.genesis_checkpoint())
            .expect_err("validator 4 does not exist");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ValidatorIndexOutOfBounds {
                validator_index: 4,
                validator_count: 4,
            }),
        ));

        Ok(())
    }

    #[test]
    fn attestation_inconsistent_with_target_is_rejected() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(9)?;

        let block_1 = harness.block(genesis, 1, 1)?;
        let block_2 = harness.block(genesis, 2, 2)?;

        let target = Checkpoint {
            epoch: 1,
            root: block_2,
        };

        let error = harness
            .attest(&[0], 8, block_1, target)
            .expect_err("block 2 is not an ancestor of block 1");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::LmdGhostInconsistentWithFfgTarget { .. }),
        ));

        Ok(())
    }

    #[test]
    fn checkpoints_never_move_backwards() -> Result<()> {
        let candidates = [0, 1, 2, 3]
            .into_iter()
            .cartesian_product([0, 1, 2])
            .collect_vec();

        for order in candidates.iter().permutations(3) {
            let mut harness = Harness::new(Config::minimal(), [32; 4]);
            let genesis = harness.genesis_root;

            let mut previous = (0, 0);

            for (justified_epoch, finalized_epoch) in order {
                harness.store.update_checkpoints(
                    Checkpoint {
                        epoch: *justified_epoch,
                        root: genesis,
                    },
                    Checkpoint {
                        epoch: *finalized_epoch,
                        root: genesis,
                    },
                )?;

                let current = (
                    harness.store.justified_checkpoint().epoch,
                    harness.store.finalized_checkpoint().epoch,
                );

                assert!(current.0 >= previous.0);
                assert!(current.1 >= previous.1);

                previous = current;
            }
        }

        Ok(())
    }

    #[test]
    fn checkpoint_with_same_epoch_and_different_root_is_ignored() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(1)?;

        let block_1 = harness.block(genesis, 1, 0)?;

        let update = harness.store.update_checkpoints(
            Checkpoint {
                epoch: 0,
                root: block_1,
            },
            Checkpoint {
                epoch: 0,
                root: block_1,
            },
        )?;

        assert!(!update.any());
        assert_eq!(harness.store.justified_checkpoint().root, genesis);
        assert_eq!(harness.store.finalized_checkpoint().root, genesis);

        let update = harness.store.update_unrealized_checkpoints(
            Checkpoint {
                epoch: 2,
                root: block_1,
            },
            Checkpoint {
                epoch: 0,
                root: block_1,
            },
        );

        assert!(update.justified_updated);
        assert!(!update.finalized_updated);
        assert_eq!(harness.store.unrealized_finalized_checkpoint().root, genesis);

        Ok(())
    }

    #[test]
    fn finalization_prunes_nodes_blocks_and_cached_states() -> Result<()> {
        let mut harness = Harness::new(Config::mainnet(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(170)?;

        let block_150 = harness.block(genesis, 150, 1)?;
        let block_160 = harness.block(genesis, 160, 2)?;
        let block_165 = harness.block(block_160, 165, 2)?;

        for (epoch, root) in [(1, genesis), (4, block_150), (5, block_160), (6, block_165)] {
            harness.store.checkpoint_state(Checkpoint { epoch, root })?;
        }

        assert_eq!(harness.store.cached_checkpoints().count(), 4);

        let finalized = Checkpoint {
            epoch: 5,
            root: block_160,
        };

        let update = harness.store.update_checkpoints(finalized, finalized)?;

        assert!(update.justified_updated);
        assert!(update.finalized_updated);

        let store = &harness.store;

        assert!(store.cached_checkpoints().all(|checkpoint| checkpoint.epoch > 5));
        assert_eq!(store.cached_checkpoints().count(), 1);

        assert!(store.fork_nodes().values().all(|node| node.slot > 160));
        assert!(store.weight(block_150).is_none());
        assert!(store.weight(block_160).is_none());
        assert_eq!(store.weight(block_165), Some(0));

        assert!(!store.contains_block(genesis));
        assert!(!store.contains_block(block_150));
        assert!(store.contains_block(block_160));
        assert!(store.contains_block(block_165));

        assert_eq!(store.head()?, (block_165, 165));
        assert_eq!(
            store.head_set().iter().copied().collect_vec(),
            [block_165],
        );

        Ok(())
    }

    #[test]
    fn justified_block_pruned_as_node_still_leads_to_head() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 0)?;
        let block_12 = harness.block(block_8, 12, 0)?;

        let checkpoint = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        harness.store.update_checkpoints(checkpoint, checkpoint)?;

        assert!(harness.store.weight(block_8).is_none());
        assert_eq!(harness.store.head()?, (block_12, 12));

        Ok(())
    }

    #[test]
    fn finalization_with_no_descendants_leaves_finalized_block_as_head() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 0)?;

        let checkpoint = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        harness.store.update_checkpoints(checkpoint, checkpoint)?;

        assert!(harness.store.fork_nodes().is_empty());
        assert_eq!(harness.store.head()?, (block_8, 8));
        assert!(harness.store.head_set().contains(&block_8));

        Ok(())
    }

    #[test]
    fn blocks_not_descending_from_finalized_are_rejected() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 1)?;
        let block_9 = harness.block(genesis, 9, 2)?;

        let checkpoint = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        harness.store.update_checkpoints(checkpoint, checkpoint)?;

        let error = harness
            .block(block_9, 10, 0)
            .expect_err("block 9 does not descend from block 8");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::BlockNotDescendantOfFinalized { .. }),
        ));

        Ok(())
    }

    #[test]
    fn realized_checkpoints_are_taken_from_post_state() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 0)?;

        let mut chain_link = harness.chain_link(block_8, 17, 0)?;

        let justified = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        chain_link.state = factory::with_checkpoints(
            &chain_link.state,
            justified,
            harness.genesis_checkpoint(),
        );

        let unrealized_justified = Checkpoint {
            epoch: 2,
            root: chain_link.block_root,
        };

        let chain_link = chain_link
            .with_unrealized_checkpoints(unrealized_justified, harness.genesis_checkpoint());

        harness.store.on_block(chain_link)?;

        // The block is from the current epoch, so unrealized checkpoints stay unrealized.
        assert_eq!(harness.store.justified_checkpoint(), justified);
        assert_eq!(
            harness.store.unrealized_justified_checkpoint(),
            unrealized_justified,
        );

        // They are pulled up at the start of the next epoch.
        harness.tick_to_slot(24)?;

        assert_eq!(harness.store.justified_checkpoint(), unrealized_justified);

        Ok(())
    }

    #[test]
    fn block_from_prior_epoch_applies_unrealized_checkpoints_immediately() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 0)?;

        let unrealized_justified = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        let chain_link = harness
            .chain_link(block_8, 9, 0)?
            .with_unrealized_checkpoints(unrealized_justified, harness.genesis_checkpoint());

        harness.store.on_block(chain_link)?;

        assert_eq!(harness.store.justified_checkpoint(), unrealized_justified);
        assert_eq!(harness.store.finalized_checkpoint(), harness.genesis_checkpoint());

        Ok(())
    }

    #[test]
    fn checkpoint_state_is_computed_once() -> Result<()> {
        let chain_config = Arc::new(Config::minimal());

        let transition = Arc::new(CountingTransition {
            inner: SlotProcessor::new(Arc::clone(&chain_config)),
            process_slots_calls: AtomicUsize::new(0),
        });

        let mut harness = Harness::build(
            chain_config,
            StoreConfig::default(),
            Arc::<CountingTransition>::clone(&transition),
            [32; 4],
        );
        let genesis = harness.genesis_root;

        let checkpoint = Checkpoint {
            epoch: 2,
            root: genesis,
        };

        let first = harness.store.checkpoint_state(checkpoint)?;
        let second = harness.store.checkpoint_state(checkpoint)?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.slot, 16);
        assert_eq!(transition.process_slots_calls.load(Ordering::Relaxed), 1);

        Ok(())
    }

    #[test]
    fn finalized_checkpoint_states_are_not_cached() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);

        harness.store.checkpoint_state(harness.genesis_checkpoint())?;

        assert_eq!(harness.store.cached_checkpoints().count(), 0);

        Ok(())
    }

    #[test]
    fn checkpoint_state_cache_evicts_lowest_epoch_but_never_justified() -> Result<()> {
        let chain_config = Arc::new(Config::minimal());
        let transition = Arc::new(SlotProcessor::new(Arc::clone(&chain_config)));
        let (header, state) = factory::genesis_state(&chain_config, [32; 4]);
        let genesis = header.hash_tree_root();

        let store_config = StoreConfig {
            max_checkpoint_states: 2,
            ..StoreConfig::default()
        };

        let mut store = Store::new(chain_config, store_config, transition, header, state);

        let justified = Checkpoint {
            epoch: 1,
            root: genesis,
        };

        store.update_checkpoints(justified, store.finalized_checkpoint())?;

        for epoch in [2, 3] {
            store.checkpoint_state(Checkpoint {
                epoch,
                root: genesis,
            })?;
        }

        let cached = store
            .cached_checkpoints()
            .map(|checkpoint| checkpoint.epoch)
            .sorted()
            .collect_vec();

        assert_eq!(cached, [1, 3]);

        Ok(())
    }

    #[test]
    fn orphaned_checkpoint_is_reported() -> Result<()> {
        let store_config = StoreConfig {
            unfinalized_states_in_memory: 1,
            ..StoreConfig::default()
        };

        let mut harness = Harness::with_store_config(Config::minimal(), store_config, [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 1)?;
        let block_10 = harness.block(genesis, 10, 2)?;

        // Inserting a child of block 10 unloads the state of block 10.
        harness.block(block_10, 12, 2)?;

        assert!(!harness.store.block_graph().has_state(block_10));

        let finalized = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        harness.store.update_checkpoints(finalized, finalized)?;

        // Block 10 survives in the graph because it is later than the finalized slot,
        // but its parent does not.
        assert!(harness.store.contains_block(block_10));
        assert!(!harness.store.contains_block(genesis));

        let orphan = Checkpoint {
            epoch: 2,
            root: block_10,
        };

        let error = harness
            .store
            .checkpoint_state(orphan)
            .expect_err("state of block 10 cannot be regenerated");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::OrphanCheckpoint { checkpoint }) if *checkpoint == orphan,
        ));

        Ok(())
    }

    #[test]
    fn finalized_block_with_unloaded_state_keeps_descendants_regenerable() -> Result<()> {
        let store_config = StoreConfig {
            unfinalized_states_in_memory: 4,
            ..StoreConfig::default()
        };

        let mut harness = Harness::with_store_config(Config::minimal(), store_config, [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        // Slot 8 is empty, so block 7 is the block of the epoch 1 checkpoint.
        let block_7 = harness.block(genesis, 7, 0)?;
        let block_9 = harness.block(block_7, 9, 0)?;
        let block_20 = harness.block(block_9, 20, 0)?;

        assert!(!harness.store.block_graph().has_state(block_7));
        assert!(!harness.store.block_graph().has_state(block_9));

        let justified = Checkpoint {
            epoch: 2,
            root: block_9,
        };

        let finalized = Checkpoint {
            epoch: 1,
            root: block_7,
        };

        harness.store.update_checkpoints(justified, finalized)?;

        assert!(!harness.store.contains_block(genesis));
        assert!(harness.store.block_graph().has_state(block_7));

        assert_eq!(harness.store.checkpoint_state(finalized)?.slot, 8);
        assert_eq!(harness.store.checkpoint_state(justified)?.slot, 16);
        assert!(harness.store.block_graph().state(block_9, true)?.is_some());
        assert_eq!(harness.store.head()?, (block_20, 20));

        Ok(())
    }

    #[test]
    fn failed_checkpoint_update_leaves_store_unchanged() -> Result<()> {
        let mut harness = Harness::new(Config::minimal(), [32; 4]);
        let genesis = harness.genesis_root;

        harness.tick_to_slot(20)?;

        let block_8 = harness.block(genesis, 8, 0)?;

        let unknown = Checkpoint {
            epoch: 2,
            root: H256::repeat_byte(0xee),
        };

        let finalized = Checkpoint {
            epoch: 1,
            root: block_8,
        };

        let error = harness
            .store
            .update_checkpoints(unknown, finalized)
            .expect_err("state of an unknown block cannot be computed");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::CheckpointComputationFailed { checkpoint }) if *checkpoint == unknown,
        ));

        assert_eq!(harness.store.justified_checkpoint(), harness.genesis_checkpoint());
        assert_eq!(harness.store.finalized_checkpoint(), harness.genesis_checkpoint());
        assert!(harness.store.contains_block(genesis));
        assert_eq!(harness.store.weight(block_8), Some(0));
        assert_eq!(harness.store.head()?, (block_8, 8));

        Ok(())
    }
}
