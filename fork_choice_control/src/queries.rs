use anyhow::Result;
use fork_choice_store::ForkNode;
use itertools::Itertools as _;
use static_assertions::assert_impl_all;
use types::phase0::{
    containers::Checkpoint,
    primitives::{Epoch, Gwei, Slot, H256},
};

use crate::{controller::Controller, misc::ForkChoiceDump};

impl Controller {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.store().slot()
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        self.store().current_epoch()
    }

    pub fn head(&self) -> Result<(H256, Slot)> {
        self.store().head()
    }

    #[must_use]
    pub fn ancestor(&self, root: H256, slot: Slot) -> H256 {
        self.store().ancestor(root, slot)
    }

    #[must_use]
    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.store().justified_checkpoint()
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store().finalized_checkpoint()
    }

    #[must_use]
    pub fn unrealized_justified_checkpoint(&self) -> Checkpoint {
        self.store().unrealized_justified_checkpoint()
    }

    #[must_use]
    pub fn unrealized_finalized_checkpoint(&self) -> Checkpoint {
        self.store().unrealized_finalized_checkpoint()
    }

    #[must_use]
    pub fn weight(&self, block_root: H256) -> Option<Gwei> {
        self.store().weight(block_root)
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.store().contains_block(block_root)
    }

    /// Returns copies of all fork nodes ordered by slot and root.
    #[must_use]
    pub fn fork_nodes(&self) -> Vec<ForkNode> {
        self.store()
            .fork_nodes()
            .values()
            .cloned()
            .sorted_by_key(|node| (node.slot, node.block_root))
            .collect()
    }

    #[must_use]
    pub fn head_set(&self) -> Vec<H256> {
        self.store().head_set().iter().copied().sorted().collect()
    }

    #[must_use]
    pub fn fork_choice_dump(&self) -> ForkChoiceDump {
        let store = self.store();

        let fork_choice_nodes = store
            .fork_nodes()
            .values()
            .cloned()
            .sorted_by_key(|node| (node.slot, node.block_root))
            .collect();

        ForkChoiceDump {
            justified_checkpoint: store.justified_checkpoint(),
            finalized_checkpoint: store.finalized_checkpoint(),
            fork_choice_nodes,
        }
    }

    #[must_use]
    pub fn cached_checkpoints(&self) -> Vec<Checkpoint> {
        self.store()
            .cached_checkpoints()
            .sorted_by_key(|checkpoint| (checkpoint.epoch, checkpoint.root))
            .collect()
    }
}

assert_impl_all!(Controller: Send, Sync);
