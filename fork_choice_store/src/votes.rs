use core::ops::{AddAssign as _, SubAssign as _};
use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use hash_hasher::HashedMap;
use types::phase0::primitives::{Epoch, Gwei, ValidatorIndex, H256};

use crate::misc::{Difference, LatestMessage};

/// Latest LMD GHOST messages of all validators and the balances they are weighted with.
///
/// Mutating methods do not touch block weights directly.
/// They return the changes in attesting balance per block root instead.
#[derive(Default)]
pub struct VoteAccumulator {
    latest_messages: Vec<Option<LatestMessage>>,
    justified_active_balances: Arc<[Gwei]>,
    equivocating_indices: HashSet<ValidatorIndex>,
}

impl VoteAccumulator {
    #[must_use]
    pub fn new(justified_active_balances: Arc<[Gwei]>) -> Self {
        Self {
            justified_active_balances,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        let index = usize::try_from(validator_index).ok()?;
        self.latest_messages.get(index).copied().flatten()
    }

    #[must_use]
    pub fn justified_active_balances(&self) -> &[Gwei] {
        &self.justified_active_balances
    }

    #[must_use]
    pub fn is_equivocating(&self, validator_index: ValidatorIndex) -> bool {
        self.equivocating_indices.contains(&validator_index)
    }

    /// Records `{epoch, beacon_block_root}` as the latest message of each attesting validator
    /// whose previous message (if any) is from an earlier epoch.
    ///
    /// Roughly corresponds to [`update_latest_messages`] in `consensus-specs`.
    ///
    /// [`update_latest_messages`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#update_latest_messages
    pub fn update_latest_messages(
        &mut self,
        epoch: Epoch,
        beacon_block_root: H256,
        attesting_indices: impl IntoIterator<Item = ValidatorIndex>,
        differences: &mut HashedMap<H256, Difference>,
    ) -> Result<()> {
        let new_message = LatestMessage {
            epoch,
            beacon_block_root,
        };

        for validator_index in attesting_indices {
            if self.is_equivocating(validator_index) {
                continue;
            }

            let index = usize::try_from(validator_index)?;
            let balance = self.justified_active_balance(index)?;

            if self.latest_messages.len() <= index {
                self.latest_messages.resize(index + 1, None);
            }

            let Some(message) = self.latest_messages.get_mut(index) else {
                continue;
            };

            if let Some(old_message) = *message {
                if epoch <= old_message.epoch {
                    continue;
                }

                *message = Some(new_message);

                if old_message.beacon_block_root == beacon_block_root {
                    continue;
                }

                differences
                    .entry(old_message.beacon_block_root)
                    .or_default()
                    .sub_assign(balance);
            } else {
                *message = Some(new_message);
            }

            // Mutating `latest_messages` as we go along prevents duplicate indices from being
            // counted more than once.
            differences
                .entry(beacon_block_root)
                .or_default()
                .add_assign(balance);
        }

        Ok(())
    }

    /// Replaces the balances votes are weighted with.
    ///
    /// Called when the justified checkpoint changes.
    pub fn update_balances(
        &mut self,
        new_balances: Arc<[Gwei]>,
    ) -> Result<HashedMap<H256, Difference>> {
        let old_balances = core::mem::replace(&mut self.justified_active_balances, new_balances);

        let mut differences = difference_map();

        for (index, latest_message) in self.latest_messages.iter().enumerate() {
            let Some(latest_message) = latest_message else {
                continue;
            };

            let old_balance = old_balances.get(index).copied().unwrap_or_default();
            let new_balance = self.justified_active_balance(index)?;

            // Skipping unchanged balances does not affect the result but is faster.
            if i64::try_from(old_balance)? == new_balance {
                continue;
            }

            if self.equivocating_indices.contains(&u64::try_from(index)?) {
                continue;
            }

            let difference = differences
                .entry(latest_message.beacon_block_root)
                .or_default();

            *difference -= i64::try_from(old_balance)?;
            *difference += new_balance;
        }

        Ok(differences)
    }

    /// Marks validators as equivocating and withdraws their current votes.
    ///
    /// Votes of equivocating validators are ignored from then on.
    ///
    /// Roughly corresponds to [`on_attester_slashing`] in `consensus-specs`.
    ///
    /// [`on_attester_slashing`]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#on_attester_slashing
    pub fn equivocate(
        &mut self,
        validator_indices: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Result<HashedMap<H256, Difference>> {
        let mut differences = difference_map();

        for validator_index in validator_indices {
            if !self.equivocating_indices.insert(validator_index) {
                continue;
            }

            let Some(latest_message) = self.latest_message(validator_index) else {
                continue;
            };

            let balance = self.justified_active_balance(usize::try_from(validator_index)?)?;

            differences
                .entry(latest_message.beacon_block_root)
                .or_default()
                .sub_assign(balance);
        }

        Ok(differences)
    }

    // Validators missing from the justified state have no weight.
    fn justified_active_balance(&self, index: usize) -> Result<Difference> {
        let balance = self
            .justified_active_balances
            .get(index)
            .copied()
            .unwrap_or_default();

        Ok(balance.try_into()?)
    }
}

// `hash_hasher::HashedMap` is safe to use because block roots are already hashed.
#[must_use]
pub fn difference_map() -> HashedMap<H256, Difference> {
    HashedMap::default()
}
