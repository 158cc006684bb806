use crate::{Error, Result};

/// Number of low-order nanosecond bits dropped to form one tick
/// (`2^20 ns`, roughly one millisecond).
pub const TICK_SHIFT: u32 = 20;

/// Mask selecting the sub-tick nanoseconds of a timestamp.
pub const TICK_NANOS_MASK: i64 = (1 << TICK_SHIFT) - 1;

/// The bit layout of a [`FastId`] identifier.
///
/// From most to least significant bit, an id is made of:
///
/// ```text
/// [ sign: 1 (always 0) | time: time_bits | sequence: step_bits | node: node_bits ]
/// ```
///
/// Two generators with the same layout produce ids that decode identically,
/// so a [`Layout`] can decode ids without access to the generator that issued
/// them.
///
/// [`FastId`]: crate::FastId
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    time_bits: u8,
    step_bits: u8,
    node_bits: u8,
}

impl Layout {
    /// Number of value bits in an `i64`; the sign bit is never used.
    pub const MAX_BITS: u8 = 63;

    /// Validates and builds a layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `time_bits` is zero or the three
    /// fields need more than [`Layout::MAX_BITS`] bits.
    pub fn new(time_bits: u8, step_bits: u8, node_bits: u8) -> Result<Self> {
        let total = u16::from(time_bits) + u16::from(step_bits) + u16::from(node_bits);
        if time_bits == 0 || total > u16::from(Self::MAX_BITS) {
            return Err(Error::InvalidLayout {
                time_bits,
                step_bits,
                node_bits,
            });
        }
        Ok(Self {
            time_bits,
            step_bits,
            node_bits,
        })
    }

    pub const fn time_bits(&self) -> u8 {
        self.time_bits
    }

    pub const fn step_bits(&self) -> u8 {
        self.step_bits
    }

    pub const fn node_bits(&self) -> u8 {
        self.node_bits
    }

    pub const fn time_mask(&self) -> i64 {
        mask(self.time_bits)
    }

    /// Largest sequence value within one tick.
    pub const fn step_mask(&self) -> i64 {
        mask(self.step_bits)
    }

    /// Largest node id.
    pub const fn node_mask(&self) -> i64 {
        mask(self.node_bits)
    }

    const fn time_shift(&self) -> u32 {
        self.step_bits as u32 + self.node_bits as u32
    }

    /// Packs the three fields into an id. Each field is truncated to its
    /// width.
    pub const fn compose(&self, tick: i64, sequence: i64, node: i64) -> i64 {
        ((tick & self.time_mask()) << self.time_shift())
            | ((sequence & self.step_mask()) << self.node_bits)
            | (node & self.node_mask())
    }

    /// Returns whether `tick` lies after `last` on the wrapping time field.
    ///
    /// The time field counts modulo `2^time_bits`, so "after" means a
    /// forward distance of at most half the field range (at least one tick).
    /// Larger distances are read as the clock having moved backwards.
    pub const fn tick_after(&self, tick: i64, last: i64) -> bool {
        let mask = self.time_mask();
        let ahead = tick.wrapping_sub(last) & mask;
        let horizon = if mask >> 1 == 0 { 1 } else { mask >> 1 };
        ahead != 0 && ahead <= horizon
    }

    /// Extracts the tick an id was issued in.
    pub const fn time(&self, id: i64) -> i64 {
        (id >> self.time_shift()) & self.time_mask()
    }

    /// Extracts the per-tick sequence of an id.
    pub const fn sequence(&self, id: i64) -> i64 {
        (id >> self.node_bits) & self.step_mask()
    }

    /// Extracts the node id of an id.
    pub const fn node(&self, id: i64) -> i64 {
        id & self.node_mask()
    }
}

const fn mask(bits: u8) -> i64 {
    if bits == 0 {
        0
    } else {
        (u64::MAX >> (64 - bits as u32)) as i64
    }
}
