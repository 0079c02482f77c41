use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        primitives::{Epoch, Gwei, H256},
    },
};

use crate::{misc, predicates};

#[must_use]
pub const fn get_current_epoch(config: &Config, state: &BeaconState) -> Epoch {
    misc::compute_epoch_at_slot(config, state.slot)
}

// `BeaconState.randao_mixes` may be shorter than `EPOCHS_PER_HISTORICAL_VECTOR` in test states.
#[must_use]
pub fn get_randao_mix(config: &Config, state: &BeaconState, epoch: Epoch) -> H256 {
    let length = config
        .epochs_per_historical_vector
        .get()
        .min(state.randao_mixes.len() as u64);

    if length == 0 {
        return H256::zero();
    }

    usize::try_from(epoch % length)
        .ok()
        .and_then(|index| state.randao_mixes.get(index))
        .copied()
        .unwrap_or_default()
}

/// Effective balances of validators that are active and unslashed in the state's current epoch.
/// Inactive or slashed validators get a balance of 0 so that indices stay aligned.
#[must_use]
pub fn get_active_balances(config: &Config, state: &BeaconState) -> Vec<Gwei> {
    let epoch = get_current_epoch(config, state);

    state
        .validators
        .iter()
        .map(|validator| {
            if predicates::is_active_validator(validator, epoch) && !validator.slashed {
                validator.effective_balance
            } else {
                0
            }
        })
        .collect()
}

#[must_use]
pub fn get_total_active_balance(config: &Config, state: &BeaconState) -> Gwei {
    let epoch = get_current_epoch(config, state);

    state
        .validators
        .iter()
        .filter(|validator| predicates::is_active_validator(validator, epoch))
        .map(|validator| validator.effective_balance)
        .fold(0, Gwei::saturating_add)
}

#[cfg(test)]
mod tests {
    use im::vector;
    use types::phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator};

    use super::*;

    fn validator(effective_balance: Gwei, activation_epoch: Epoch, exit_epoch: Epoch) -> Validator {
        Validator {
            effective_balance,
            activation_epoch,
            exit_epoch,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        }
    }

    #[test]
    fn active_balances_zero_out_inactive_and_slashed_validators() {
        let config = Config::minimal();

        let state = BeaconState {
            slot: 16,
            validators: vector![
                validator(10, 0, FAR_FUTURE_EPOCH),
                validator(20, 3, FAR_FUTURE_EPOCH),
                validator(30, 0, 2),
                Validator {
                    slashed: true,
                    ..validator(40, 0, FAR_FUTURE_EPOCH)
                },
            ],
            ..BeaconState::default()
        };

        assert_eq!(get_active_balances(&config, &state), [10, 0, 0, 0]);
        assert_eq!(get_total_active_balance(&config, &state), 50);
    }

    #[test]
    fn randao_mix_wraps_around_available_mixes() {
        let config = Config::minimal();

        let state = BeaconState {
            randao_mixes: vector![H256::repeat_byte(1), H256::repeat_byte(2)],
            ..BeaconState::default()
        };

        assert_eq!(get_randao_mix(&config, &state, 3), H256::repeat_byte(2));
        assert_eq!(get_randao_mix(&config, &BeaconState::default(), 3), H256::zero());
    }
}
