use anyhow::{ensure, Result};
use log::trace;
use types::phase0::{beacon_state::BeaconState, containers::BeaconBlockHeader};

use crate::unphased::error::Error;

// Only the header is applied here. Operations in the block body are applied by the executor
// that produced the post-state in the first place.
pub fn process_block_header(state: &mut BeaconState, header: &BeaconBlockHeader) -> Result<()> {
    // > Verify that the slots match
    ensure!(
        header.slot == state.slot,
        Error::BlockSlotMismatch {
            state_slot: state.slot,
            block_slot: header.slot,
        },
    );

    // > Verify that the parent matches
    let latest_block_root = state.latest_block_header.hash_tree_root();

    ensure!(
        header.parent_root == latest_block_root,
        Error::ParentRootMismatch {
            in_state: latest_block_root,
            in_block: header.parent_root,
        },
    );

    trace!("replaying block header at slot {}", header.slot);

    state.latest_block_header = *header;

    Ok(())
}
