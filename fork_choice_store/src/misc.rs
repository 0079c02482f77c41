use core::fmt::{Formatter, Result as FmtResult};
use std::sync::Arc;

use derivative::Derivative;
use helper_functions::misc;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use static_assertions::assert_eq_size;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlockHeader, Checkpoint},
        primitives::{Epoch, Gwei, Slot, H256},
    },
};

/// A block accepted by the executor together with its post-state.
///
/// The unrealized checkpoints are the ones the post-state would have if epoch processing were
/// run on it immediately. They are computed by the executor.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ChainLink {
    pub block_root: H256,
    pub header: BeaconBlockHeader,
    #[derivative(Debug(format_with = "fmt_as_wildcard"))]
    pub state: Arc<BeaconState>,
    pub unrealized_justified_checkpoint: Checkpoint,
    pub unrealized_finalized_checkpoint: Checkpoint,
}

impl ChainLink {
    /// Creates a `ChainLink` whose unrealized checkpoints equal the realized ones in `state`.
    #[must_use]
    pub fn new(header: BeaconBlockHeader, state: Arc<BeaconState>) -> Self {
        Self {
            block_root: header.hash_tree_root(),
            header,
            unrealized_justified_checkpoint: state.current_justified_checkpoint,
            unrealized_finalized_checkpoint: state.finalized_checkpoint,
            state,
        }
    }

    #[must_use]
    pub const fn with_unrealized_checkpoints(
        mut self,
        unrealized_justified_checkpoint: Checkpoint,
        unrealized_finalized_checkpoint: Checkpoint,
    ) -> Self {
        self.unrealized_justified_checkpoint = unrealized_justified_checkpoint;
        self.unrealized_finalized_checkpoint = unrealized_finalized_checkpoint;
        self
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.header.slot
    }

    #[must_use]
    pub const fn epoch(&self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, self.slot())
    }
}

/// A block in the tree LMD GHOST descends through.
///
/// `weight` is the attesting balance of the block and all of its descendants.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ForkNode {
    pub block_root: H256,
    pub parent_root: H256,
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub weight: Gwei,
    pub children: Vec<H256>,
    #[serde_as(as = "DisplayFromStr")]
    pub justified_epoch: Epoch,
    #[serde_as(as = "DisplayFromStr")]
    pub finalized_epoch: Epoch,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CheckpointPair {
    pub justified: Checkpoint,
    pub finalized: Checkpoint,
}

impl CheckpointPair {
    #[must_use]
    pub const fn new(justified: Checkpoint, finalized: Checkpoint) -> Self {
        Self {
            justified,
            finalized,
        }
    }

    /// Replaces each checkpoint with its candidate if the candidate has a later epoch.
    ///
    /// Candidates with equal or earlier epochs are ignored even if their roots differ.
    pub const fn update(
        &mut self,
        justified_candidate: Checkpoint,
        finalized_candidate: Checkpoint,
    ) -> CheckpointUpdate {
        let justified_updated = justified_candidate.epoch > self.justified.epoch;
        let finalized_updated = finalized_candidate.epoch > self.finalized.epoch;

        if justified_updated {
            self.justified = justified_candidate;
        }

        if finalized_updated {
            self.finalized = finalized_candidate;
        }

        CheckpointUpdate {
            justified_updated,
            finalized_updated,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CheckpointUpdate {
    pub justified_updated: bool,
    pub finalized_updated: bool,
}

impl CheckpointUpdate {
    #[must_use]
    pub const fn any(self) -> bool {
        self.justified_updated || self.finalized_updated
    }
}

impl core::ops::BitOr for CheckpointUpdate {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self {
            justified_updated: self.justified_updated || other.justified_updated,
            finalized_updated: self.finalized_updated || other.finalized_updated,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttestationOrigin {
    Gossip,
    Block,
}

impl AttestationOrigin {
    #[must_use]
    pub const fn is_from_block(self) -> bool {
        matches!(self, Self::Block)
    }
}

/// [`LatestMessage`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#latestmessage)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    // This is the LMD GHOST vote root. It corresponds to `AttestationData.beacon_block_root`.
    pub beacon_block_root: H256,
}

// Signed change in attesting balance. Balances of all validators combined fit in `i64`.
pub type Difference = i64;

assert_eq_size!(Difference, Gwei);

fn fmt_as_wildcard<T>(_: &T, formatter: &mut Formatter) -> FmtResult {
    formatter.write_str("_")
}
