use core::num::NonZeroU64;
use std::borrow::Cow;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::phase0::{consts::GENESIS_SLOT, primitives::Slot};

/// Chain parameters the fork choice core depends on.
///
/// Field names follow the configuration files in `consensus-specs`.
/// Genesis time is not part of the configuration. It is taken from the anchor state.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub config_name: Cow<'static, str>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub genesis_slot: Slot,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub seconds_per_slot: NonZeroU64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub slots_per_epoch: NonZeroU64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub epochs_per_historical_vector: NonZeroU64,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            genesis_slot: GENESIS_SLOT,
            seconds_per_slot: nonzero!(12_u64),
            slots_per_epoch: nonzero!(32_u64),
            epochs_per_historical_vector: nonzero!(65536_u64),
        }
    }

    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            genesis_slot: GENESIS_SLOT,
            seconds_per_slot: nonzero!(6_u64),
            slots_per_epoch: nonzero!(8_u64),
            epochs_per_historical_vector: nonzero!(64_u64),
        }
    }
}
