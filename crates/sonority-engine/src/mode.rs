//! Mode and initialization flags.

use bitflags::bitflags;

bitflags! {
    /// Sound and voice mode bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u32 {
        /// Play once
        const LOOP_OFF = 0x0000_0001;
        /// Loop forward
        const LOOP_NORMAL = 0x0000_0002;
        /// Loop back and forth
        const LOOP_BIDI = 0x0000_0004;
        /// Not spatialized
        const MODE_2D = 0x0000_0008;
        /// Spatialized
        const MODE_3D = 0x0000_0010;
        /// Open asynchronously; poll the open state
        const NONBLOCKING = 0x0001_0000;
        /// 3D position is relative to the listener
        const HEAD_RELATIVE_3D = 0x0004_0000;
        /// 3D position is in world space
        const WORLD_RELATIVE_3D = 0x0008_0000;

        /// Defaults applied when no bits of a group are given
        const DEFAULT = Self::LOOP_OFF.bits() | Self::MODE_2D.bits();
    }
}

impl Mode {
    /// Bits of the loop group.
    pub const LOOP_BITS: Self = Self::LOOP_OFF.union(Self::LOOP_NORMAL).union(Self::LOOP_BIDI);
    /// Bits of the dimension group.
    pub const DIMENSION_BITS: Self = Self::MODE_2D.union(Self::MODE_3D);
    /// Bits of the 3D reference frame group.
    pub const RELATIVE_BITS: Self = Self::HEAD_RELATIVE_3D.union(Self::WORLD_RELATIVE_3D);

    /// Whether the mode loops.
    #[must_use]
    pub fn is_looping(self) -> bool {
        self.intersects(Self::LOOP_NORMAL | Self::LOOP_BIDI)
    }

    /// Whether the mode is spatialized.
    #[must_use]
    pub fn is_3d(self) -> bool {
        self.contains(Self::MODE_3D)
    }

    /// Replaces the loop bits with looping on or off.
    #[must_use]
    pub fn with_looping(self, looping: bool) -> Self {
        let bits = if looping {
            Self::LOOP_NORMAL
        } else {
            Self::LOOP_OFF
        };
        self.difference(Self::LOOP_BITS) | bits
    }

    /// Merges `update` into `self` group by group.
    ///
    /// Groups not mentioned in `update` keep their current bits.
    #[must_use]
    pub fn merged(self, update: Self) -> Self {
        let mut out = self;
        for group in [Self::LOOP_BITS, Self::DIMENSION_BITS, Self::RELATIVE_BITS] {
            if update.intersects(group) {
                out = out.difference(group) | (update & group);
            }
        }
        out | (update & Self::NONBLOCKING)
    }
}

bitflags! {
    /// Engine initialization flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InitFlags: u32 {
        /// 3D calculations use a right-handed coordinate system
        const RIGHT_HANDED_3D = 0x0000_0004;
        /// Voices at zero volume stop mixing and become virtual
        const VOL0_BECOMES_VIRTUAL = 0x0000_0080;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_looping_replaces_group() {
        let mode = Mode::DEFAULT.with_looping(true);
        assert!(mode.is_looping());
        assert!(!mode.contains(Mode::LOOP_OFF));
        assert!(mode.contains(Mode::MODE_2D));

        let mode = mode.with_looping(false);
        assert!(!mode.is_looping());
        assert!(mode.contains(Mode::LOOP_OFF));
    }

    #[test]
    fn test_merge_keeps_untouched_groups() {
        let current = Mode::LOOP_NORMAL | Mode::MODE_2D;
        let merged = current.merged(Mode::MODE_3D | Mode::HEAD_RELATIVE_3D);
        assert!(merged.is_3d());
        assert!(merged.is_looping());
        assert!(!merged.contains(Mode::MODE_2D));
        assert!(merged.contains(Mode::HEAD_RELATIVE_3D));
    }
}
