use thiserror::Error;
use types::phase0::primitives::{Slot, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error("block slot {block_slot} does not match state slot {state_slot}")]
    BlockSlotMismatch { state_slot: Slot, block_slot: Slot },
    #[error("block parent root {in_block:?} does not match latest block root {in_state:?}")]
    ParentRootMismatch { in_state: H256, in_block: H256 },
    #[error("target slot {target} is not later than state slot {current}")]
    SlotNotLater { current: Slot, target: Slot },
}
