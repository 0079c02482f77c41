use core::mem;
use std::{collections::BTreeMap, sync::Arc};

use anyhow::{bail, ensure, Result};
use hash_hasher::HashedMap;
use helper_functions::misc;
use log::debug;
use transition_functions::StateTransition;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::BeaconBlockHeader,
        primitives::{Slot, H256},
    },
};

use crate::error::Error;

struct Entry {
    header: BeaconBlockHeader,
    state: Option<Arc<BeaconState>>,
}

/// Headers of known blocks and their post-states, keyed by block root.
///
/// States may be unloaded to save memory. Unloaded states are regenerated from the nearest
/// ancestor that still has one by replaying headers through the supplied [`StateTransition`].
/// The anchor block (the finalized block once the graph has been pruned) always keeps its state.
pub struct BlockGraph {
    config: Arc<Config>,
    transition: Arc<dyn StateTransition>,
    entries: HashedMap<H256, Entry>,
    roots_by_slot: BTreeMap<Slot, Vec<H256>>,
    anchor_root: H256,
}

impl BlockGraph {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        transition: Arc<dyn StateTransition>,
        anchor_header: BeaconBlockHeader,
        anchor_state: Arc<BeaconState>,
    ) -> Self {
        let anchor_root = anchor_header.hash_tree_root();

        let mut graph = Self {
            config,
            transition,
            entries: HashedMap::default(),
            roots_by_slot: BTreeMap::new(),
            anchor_root,
        };

        graph.insert_unchecked(anchor_root, anchor_header, Some(anchor_state));
        graph
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn anchor_root(&self) -> H256 {
        self.anchor_root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn contains(&self, root: H256) -> bool {
        self.entries.contains_key(&root)
    }

    #[must_use]
    pub fn header(&self, root: H256) -> Option<&BeaconBlockHeader> {
        self.entries.get(&root).map(|entry| &entry.header)
    }

    #[must_use]
    pub fn has_state(&self, root: H256) -> bool {
        self.entries
            .get(&root)
            .is_some_and(|entry| entry.state.is_some())
    }

    pub fn insert_block(
        &mut self,
        header: BeaconBlockHeader,
        post_state: Arc<BeaconState>,
    ) -> Result<H256> {
        let root = header.hash_tree_root();

        ensure!(!self.contains(root), Error::DuplicateBlock { root });

        ensure!(
            self.contains(header.parent_root),
            Error::UnknownParent {
                root,
                parent_root: header.parent_root,
            },
        );

        self.insert_unchecked(root, header, Some(post_state));

        Ok(root)
    }

    /// Returns the post-state of the block with root `root`.
    ///
    /// `Ok(None)` means the state had to be regenerated but the walk back through parents left
    /// the graph before reaching a stored state.
    pub fn state(&self, root: H256, compute_if_missing: bool) -> Result<Option<Arc<BeaconState>>> {
        let Some(entry) = self.entries.get(&root) else {
            bail!(Error::NotFound { root });
        };

        if let Some(state) = &entry.state {
            return Ok(Some(Arc::clone(state)));
        }

        if !compute_if_missing {
            bail!(Error::NotFound { root });
        }

        let mut headers_to_replay = vec![];
        let mut current = root;

        let base_state = loop {
            let Some(entry) = self.entries.get(&current) else {
                return Ok(None);
            };

            if let Some(state) = &entry.state {
                break state;
            }

            headers_to_replay.push(entry.header);
            current = entry.header.parent_root;
        };

        debug!(
            "regenerating state of block {root:?} by replaying {} blocks on top of {current:?}",
            headers_to_replay.len(),
        );

        let mut state = base_state.as_ref().clone();

        for header in headers_to_replay.iter().rev() {
            self.transition.state_transition(&mut state, header)?;
        }

        Ok(Some(Arc::new(state)))
    }

    /// Returns the root of the latest block at or before `slot` in the chain ending with `root`.
    #[must_use]
    pub fn ancestor(&self, root: H256, slot: Slot) -> Option<H256> {
        let mut root = root;
        let mut header = self.header(root)?;

        while header.slot > slot {
            root = header.parent_root;
            header = self.header(root)?;
        }

        Some(root)
    }

    /// Removes all blocks with slots before `before_slot` except the one with root `anchor_root`.
    ///
    /// `anchor_state` becomes the stored state of the new anchor. The state of the anchor may have
    /// been unloaded, and its ancestors are removed here, so it must be supplied by the caller.
    ///
    /// Returns the number of blocks removed.
    pub fn prune(
        &mut self,
        before_slot: Slot,
        anchor_root: H256,
        anchor_state: Arc<BeaconState>,
    ) -> usize {
        if let Some(entry) = self.entries.get_mut(&anchor_root) {
            entry.state = Some(anchor_state);
        }

        let kept = self.roots_by_slot.split_off(&before_slot);
        let removed = mem::replace(&mut self.roots_by_slot, kept);

        let mut removed_count = 0;

        for (slot, roots) in removed {
            for root in roots {
                if root == anchor_root {
                    self.roots_by_slot.entry(slot).or_default().push(root);
                } else if self.entries.remove(&root).is_some() {
                    removed_count += 1;
                }
            }
        }

        self.anchor_root = anchor_root;

        debug!("pruned {removed_count} blocks before slot {before_slot}");

        removed_count
    }

    /// Unloads states of blocks at least `states_in_memory` slots older than the newest block.
    ///
    /// States of epoch-start blocks and of the anchor are kept to bound regeneration.
    pub fn unload_old_states(&mut self, states_in_memory: u64) {
        let Some(newest_slot) = self.roots_by_slot.keys().next_back().copied() else {
            return;
        };

        let Some(cutoff) = newest_slot.checked_sub(states_in_memory) else {
            return;
        };

        for (slot, roots) in self.roots_by_slot.range(..=cutoff) {
            if misc::is_epoch_start(&self.config, *slot) {
                continue;
            }

            for root in roots {
                if *root == self.anchor_root {
                    continue;
                }

                if let Some(entry) = self.entries.get_mut(root) {
                    entry.state.take();
                }
            }
        }
    }

    /// Drops the stored state of a single block. The anchor state cannot be unloaded.
    pub fn unload_state(&mut self, root: H256) -> bool {
        if root == self.anchor_root {
            return false;
        }

        self.entries
            .get_mut(&root)
            .and_then(|entry| entry.state.take())
            .is_some()
    }

    fn insert_unchecked(
        &mut self,
        root: H256,
        header: BeaconBlockHeader,
        state: Option<Arc<BeaconState>>,
    ) {
        self.entries.insert(root, Entry { header, state });
        self.roots_by_slot.entry(header.slot).or_default().push(root);
    }
}
