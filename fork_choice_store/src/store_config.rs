use derivative::Derivative;
use types::config::Config as ChainConfig;

#[derive(Clone, Copy, Debug, Derivative)]
#[derivative(Default)]
pub struct StoreConfig {
    /// Cached checkpoint states beyond this are evicted starting from the lowest epoch.
    #[derivative(Default(value = "256"))]
    pub max_checkpoint_states: usize,
    #[derivative(Default(value = "128"))]
    pub unfinalized_states_in_memory: u64,
}

impl StoreConfig {
    #[must_use]
    pub const fn minimal(chain_config: &ChainConfig) -> Self {
        let minimum = Self::min_unfinalized_states_in_memory(chain_config);

        Self {
            max_checkpoint_states: 8,
            unfinalized_states_in_memory: minimum,
        }
    }

    #[must_use]
    pub const fn min_unfinalized_states_in_memory(chain_config: &ChainConfig) -> u64 {
        // Blocks older than 2 epochs should rarely be needed in well-behaved networks.
        chain_config.slots_per_epoch.get().saturating_mul(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_keeps_two_epochs_of_states() {
        let store_config = StoreConfig::minimal(&ChainConfig::minimal());

        assert_eq!(store_config.unfinalized_states_in_memory, 16);
        assert_eq!(StoreConfig::default().max_checkpoint_states, 256);
    }
}
