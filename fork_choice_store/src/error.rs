use thiserror::Error;
use types::phase0::{
    containers::{AttestationData, Checkpoint},
    primitives::{Epoch, Slot, ValidatorIndex, H256},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "attestation is from a future slot \
         (attestation data: {data:?}, current slot: {current_slot})"
    )]
    AttestationFromFuture {
        data: AttestationData,
        current_slot: Slot,
    },
    #[error(
        "attestation votes for a block from the future \
         (attestation data: {data:?}, block slot: {block_slot})"
    )]
    AttestationForFutureBlock {
        data: AttestationData,
        block_slot: Slot,
    },
    #[error(
        "attestation targets an epoch older than the previous one \
         (attestation data: {data:?}, previous epoch: {previous_epoch})"
    )]
    AttestationTargetsStaleEpoch {
        data: AttestationData,
        previous_epoch: Epoch,
    },
    #[error("attestation votes for a checkpoint in the wrong epoch: {data:?}")]
    AttestationTargetsWrongEpoch { data: AttestationData },
    #[error("block is from a future slot (slot: {slot}, current slot: {current_slot})")]
    BlockFromFuture { slot: Slot, current_slot: Slot },
    #[error(
        "block is not a descendant of the finalized block \
         (block root: {block_root:?}, finalized checkpoint: {finalized_checkpoint})"
    )]
    BlockNotDescendantOfFinalized {
        block_root: H256,
        finalized_checkpoint: Checkpoint,
    },
    #[error("block slot {slot} is not later than parent slot {parent_slot}")]
    BlockSlotNotLaterThanParent { slot: Slot, parent_slot: Slot },
    #[error("failed to compute state for checkpoint {checkpoint}")]
    CheckpointComputationFailed { checkpoint: Checkpoint },
    #[error("justified block is not in the store: {root:?}")]
    JustifiedBlockNotFound { root: H256 },
    #[error("LMD GHOST vote is inconsistent with FFG vote target: {data:?}")]
    LmdGhostInconsistentWithFfgTarget { data: AttestationData },
    #[error("checkpoint block has no stored ancestor to compute its state from: {checkpoint}")]
    OrphanCheckpoint { checkpoint: Checkpoint },
    #[error("attestation votes for an unknown block: {data:?}")]
    UnknownAttestationBlock { data: AttestationData },
    #[error("attestation targets an unknown block: {data:?}")]
    UnknownAttestationTarget { data: AttestationData },
    #[error(
        "attesting validator index is out of bounds \
         (validator index: {validator_index}, validator count: {validator_count})"
    )]
    ValidatorIndexOutOfBounds {
        validator_index: ValidatorIndex,
        validator_count: usize,
    },
}
