use thiserror::Error;
use types::phase0::primitives::H256;

#[derive(Debug, Error)]
pub enum Error {
    #[error("block is already in the graph: {root:?}")]
    DuplicateBlock { root: H256 },
    #[error("block or state not found: {root:?}")]
    NotFound { root: H256 },
    #[error("parent of block {root:?} is not in the graph: {parent_root:?}")]
    UnknownParent { root: H256, parent_root: H256 },
}
