use im::Vector;

use crate::phase0::{
    containers::{BeaconBlockHeader, Checkpoint, Fork, Validator},
    primitives::{Slot, UnixSeconds, H256},
};

/// The parts of a beacon state the fork choice store and the slot processor read or write.
///
/// Collections are persistent so that regenerating and advancing states only copies what changes.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct BeaconState {
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
    pub slot: Slot,
    pub fork: Fork,
    pub latest_block_header: BeaconBlockHeader,
    pub validators: Vector<Validator>,
    pub randao_mixes: Vector<H256>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}
