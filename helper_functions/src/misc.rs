use core::ops::Range;

use types::{
    config::Config,
    phase0::primitives::{Epoch, Slot},
};

#[must_use]
pub const fn compute_epoch_at_slot(config: &Config, slot: Slot) -> Epoch {
    slot / config.slots_per_epoch.get()
}

#[must_use]
pub const fn compute_start_slot_at_epoch(config: &Config, epoch: Epoch) -> Slot {
    epoch.saturating_mul(config.slots_per_epoch.get())
}

#[must_use]
pub const fn is_epoch_start(config: &Config, slot: Slot) -> bool {
    slots_since_epoch_start(config, slot) == 0
}

// <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#compute_slots_since_epoch_start>
#[must_use]
pub const fn slots_since_epoch_start(config: &Config, slot: Slot) -> u64 {
    slot % config.slots_per_epoch.get()
}

#[must_use]
pub const fn slots_in_epoch(config: &Config, epoch: Epoch) -> Range<Slot> {
    compute_start_slot_at_epoch(config, epoch)..compute_start_slot_at_epoch(config, epoch + 1)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0 => 0)]
    #[test_case(7 => 0)]
    #[test_case(8 => 1)]
    #[test_case(9 => 1)]
    fn epoch_at_slot_with_minimal_config(slot: Slot) -> Epoch {
        compute_epoch_at_slot(&Config::minimal(), slot)
    }

    #[test]
    fn start_slot_at_epoch() {
        assert_eq!(compute_start_slot_at_epoch(&Config::minimal(), 1), 8);
        assert_eq!(compute_start_slot_at_epoch(&Config::mainnet(), 5), 160);
    }

    #[test]
    fn start_slot_at_epoch_saturates() {
        assert_eq!(
            compute_start_slot_at_epoch(&Config::mainnet(), Epoch::MAX),
            Slot::MAX,
        );
    }

    #[test]
    fn epoch_start_detection() {
        let config = Config::mainnet();

        assert!(is_epoch_start(&config, 0));
        assert!(is_epoch_start(&config, 160));
        assert!(!is_epoch_start(&config, 150));
        assert_eq!(slots_since_epoch_start(&config, 150), 22);
        assert_eq!(slots_in_epoch(&config, 4), 128..160);
    }
}
