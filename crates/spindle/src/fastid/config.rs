use crate::{CUSTOM_EPOCH, Layout, Result};
use core::time::Duration;

/// Construction parameters for a [`FastId`] generator.
///
/// The defaults give 45 time bits (over a thousand years of ~1 ms ticks), 12
/// sequence bits (4096 ids per tick) and 6 node bits (64 nodes), counted from
/// [`CUSTOM_EPOCH`], with the node id derived from the host's private IPv4
/// address.
///
/// ```
/// use spindle::{FastIdConfig, UNIX_EPOCH_START};
///
/// let config = FastIdConfig::default()
///     .with_bits(41, 12, 10)
///     .with_epoch(UNIX_EPOCH_START)
///     .with_node_id(513);
/// assert_eq!(config.layout().unwrap().node_mask(), 1023);
/// ```
///
/// [`FastId`]: crate::FastId
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct FastIdConfig {
    /// Width of the timestamp field.
    pub time_bits: u8,
    /// Width of the per-tick sequence field.
    pub step_bits: u8,
    /// Width of the node field.
    pub node_bits: u8,
    /// Origin of the timestamp field, as a duration since the UNIX epoch.
    pub epoch: Duration,
    /// Node id embedded in every id. `None` derives it from the local network
    /// configuration. Values wider than `node_bits` are truncated.
    pub node_id: Option<i64>,
}

impl Default for FastIdConfig {
    fn default() -> Self {
        Self {
            time_bits: 45,
            step_bits: 12,
            node_bits: 6,
            epoch: CUSTOM_EPOCH,
            node_id: None,
        }
    }
}

impl FastIdConfig {
    #[must_use]
    pub const fn with_bits(mut self, time_bits: u8, step_bits: u8, node_bits: u8) -> Self {
        self.time_bits = time_bits;
        self.step_bits = step_bits;
        self.node_bits = node_bits;
        self
    }

    #[must_use]
    pub const fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    #[must_use]
    pub const fn with_node_id(mut self, node_id: i64) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// Validates the bit widths.
    ///
    /// # Errors
    ///
    /// See [`Layout::new`].
    pub fn layout(&self) -> Result<Layout> {
        Layout::new(self.time_bits, self.step_bits, self.node_bits)
    }
}
