//! Generation-checked handles.
//!
//! A handle names a slot and the generation the slot had when the handle
//! was issued. Reusing a slot bumps its generation, so old handles are
//! detected instead of silently aliasing a new resource.

macro_rules! engine_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $name {
            /// Create a handle for a slot index and generation.
            #[must_use]
            pub const fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            /// Slot index.
            #[must_use]
            pub const fn index(&self) -> u32 {
                self.index
            }

            /// Slot generation at issue time.
            #[must_use]
            pub const fn generation(&self) -> u32 {
                self.generation
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}.{}", stringify!($name), self.index, self.generation)
            }
        }
    };
}

engine_handle!(
    /// A loaded or loading sound.
    SoundId
);
engine_handle!(
    /// A playing voice.
    VoiceId
);
engine_handle!(
    /// A DSP unit.
    DspId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_identity() {
        let a = VoiceId::new(3, 1);
        let b = VoiceId::new(3, 2);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
        assert_eq!(a.to_string(), "VoiceId#3.1");
    }
}
