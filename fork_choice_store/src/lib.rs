//! Implementation of [Beacon Chain Fork Choice].
//!
//! The [`Store`] tracks every unfinalized block in a tree of [`ForkNode`]s rooted at the
//! finalized block. Each node stores the attesting balance of its whole subtree, so LMD GHOST
//! only has to compare siblings on the way down from the justified block.
//!
//! Votes are kept in a [`VoteAccumulator`] as one latest message per validator.
//! Whenever a message or the justified balances change, the accumulator produces signed
//! differences per block root, which the store then adds to the affected node and all of its
//! ancestors.
//!
//! Headers and post-states live in a [`BlockGraph`]. States of checkpoints are derived from them
//! on demand and cached until finalization makes them irrelevant.
//!
//! Finalization prunes the checkpoint state cache first, then the fork node tree, then the block
//! graph. After that no fork node is at or before the first slot of the finalized epoch and no
//! cached checkpoint state is from the finalized epoch or earlier.
//!
//! Signatures are not verified here. Blocks must be processed by an executor before they are
//! passed to [`Store::on_block`].
//!
//! Notes on nomenclature:
//! - Pruning means removing blocks that can no longer become canonical.
//! - Unloading means removing states that can be recreated through state transitions.
//!
//! [`BlockGraph`]: block_graph::BlockGraph
//!
//! [Beacon Chain Fork Choice]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md

pub use crate::{
    checkpoint_state::CheckpointState,
    error::Error,
    misc::{
        AttestationOrigin, ChainLink, CheckpointPair, CheckpointUpdate, Difference, ForkNode,
        LatestMessage,
    },
    store::Store,
    store_config::StoreConfig,
    votes::VoteAccumulator,
};

mod checkpoint_state;
mod error;
mod misc;
mod store;
mod store_config;
mod votes;
