use types::phase0::{containers::Validator, primitives::Epoch};

// > Check if ``validator`` is active.
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}
