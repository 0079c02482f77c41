use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::phase0::primitives::{Epoch, Gwei, Slot, ValidatorIndex, Version, H256};

// Numbers are serialized as strings to match the Eth Beacon Node API.
// Deserialization accepts both strings and native integers.

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttestationData {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub slot: Slot,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub index: u64,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlockHeader {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub slot: Slot,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

/// Checkpoints are equal only if both fields are equal.
/// Whether one checkpoint is newer than another is decided by `epoch` alone.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Display, Deserialize, Serialize)]
#[display("{epoch}/{root:?}")]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub epoch: Epoch,
    pub root: H256,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub epoch: Epoch,
}

// Signatures are not verified by the fork choice store, so the signature field is left out.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexedAttestation {
    #[serde_as(as = "Vec<PickFirst<(DisplayFromStr, _)>>")]
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Validator {
    pub withdrawal_credentials: H256,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub effective_balance: Gwei,
    pub slashed: bool,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub activation_eligibility_epoch: Epoch,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub activation_epoch: Epoch,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub exit_epoch: Epoch,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub withdrawable_epoch: Epoch,
}
