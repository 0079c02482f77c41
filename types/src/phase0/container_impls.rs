use sha2::{Digest as _, Sha256};

use crate::phase0::{containers::BeaconBlockHeader, primitives::H256};

impl BeaconBlockHeader {
    /// Merkleizes the four fields as 32 byte chunks the way SSZ does for a fixed-size container.
    #[must_use]
    pub fn hash_tree_root(&self) -> H256 {
        let mut slot_chunk = H256::zero();
        slot_chunk.as_bytes_mut()[..8].copy_from_slice(&self.slot.to_le_bytes());

        let left = hash_pair(slot_chunk, self.parent_root);
        let right = hash_pair(self.state_root, self.body_root);

        hash_pair(left, right)
    }
}

fn hash_pair(left: H256, right: H256) -> H256 {
    let digest = Sha256::new()
        .chain_update(left.as_bytes())
        .chain_update(right.as_bytes())
        .finalize();

    H256::from_slice(&digest)
}
