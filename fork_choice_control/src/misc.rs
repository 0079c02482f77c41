use fork_choice_store::ForkNode;
use serde::Serialize;
use types::phase0::containers::Checkpoint;

/// Snapshot of the fork choice store in the shape served by the debug fork choice API.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ForkChoiceDump {
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub fork_choice_nodes: Vec<ForkNode>,
}
