//! Voice handles that may be revoked by the engine.
//!
//! The engine owns voices and can reclaim them between any two calls. A
//! [`StaleHandle`] is checked on every use: the call goes through, and if
//! the engine reports the voice gone the handle unbinds itself. Callers
//! get an [`Access`] and have to say what happens in each case.

use sonority_engine::{EngineError, EngineResult};
use std::cell::Cell;

/// Why a handle lost its voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    /// Voice ended or was released
    Invalid,
    /// Voice taken over by a more important sound
    Stolen,
}

/// Outcome of using a possibly stale handle.
#[derive(Debug)]
#[must_use]
pub enum Access<T> {
    /// The call reached a live voice.
    Live(T),
    /// The voice was gone. The handle is now unbound.
    Revoked(Revocation),
    /// No voice is bound.
    Unbound,
    /// The voice is live but the call failed.
    Failed(EngineError),
}

/// A handle that unbinds itself when the engine revokes it.
#[derive(Debug)]
pub struct StaleHandle<H: Copy> {
    handle: Cell<Option<H>>,
    revoked: Cell<Option<Revocation>>,
}

impl<H: Copy> Default for StaleHandle<H> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<H: Copy> StaleHandle<H> {
    /// A handle with no voice.
    pub fn unbound() -> Self {
        Self {
            handle: Cell::new(None),
            revoked: Cell::new(None),
        }
    }

    /// Binds a freshly acquired voice.
    pub fn bind(&self, handle: H) {
        self.handle.set(Some(handle));
        self.revoked.set(None);
    }

    /// Drops the voice without marking it revoked.
    pub fn clear(&self) -> Option<H> {
        self.handle.take()
    }

    /// The bound handle, unverified.
    pub fn get(&self) -> Option<H> {
        self.handle.get()
    }

    /// Whether a voice is bound. It may still turn out to be stale.
    pub fn is_bound(&self) -> bool {
        self.handle.get().is_some()
    }

    /// How the last voice was lost, if it was revoked.
    pub fn revocation(&self) -> Option<Revocation> {
        self.revoked.get()
    }

    /// Forces the revoked state, as if the engine had reclaimed the voice.
    pub fn revoke(&self, reason: Revocation) {
        if self.handle.take().is_some() {
            self.revoked.set(Some(reason));
        }
    }

    /// Runs an engine call against the bound voice.
    pub fn access<T>(&self, call: impl FnOnce(H) -> EngineResult<T>) -> Access<T> {
        let Some(handle) = self.handle.get() else {
            return Access::Unbound;
        };
        match call(handle) {
            Ok(value) => Access::Live(value),
            Err(e) if e.is_handle_revoked() => {
                let reason = if matches!(e, EngineError::ChannelStolen) {
                    Revocation::Stolen
                } else {
                    Revocation::Invalid
                };
                self.revoke(reason);
                Access::Revoked(reason)
            },
            Err(e) => Access::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_skips_call() {
        let handle: StaleHandle<u32> = StaleHandle::unbound();
        let mut called = false;
        let access = handle.access(|_| {
            called = true;
            Ok(())
        });
        assert!(matches!(access, Access::Unbound));
        assert!(!called);
    }

    #[test]
    fn test_revocation_unbinds() {
        let handle = StaleHandle::unbound();
        handle.bind(7u32);

        let access: Access<()> = handle.access(|_| Err(EngineError::ChannelStolen));
        assert!(matches!(access, Access::Revoked(Revocation::Stolen)));
        assert!(!handle.is_bound());
        assert_eq!(handle.revocation(), Some(Revocation::Stolen));

        handle.bind(8);
        assert_eq!(handle.revocation(), None);
    }

    #[test]
    fn test_invalid_handle_is_not_stolen() {
        let handle = StaleHandle::unbound();
        handle.bind(3u32);
        let access: Access<()> = handle.access(|_| Err(EngineError::InvalidHandle));
        assert!(matches!(access, Access::Revoked(Revocation::Invalid)));
        assert_eq!(handle.revocation(), Some(Revocation::Invalid));
    }

    #[test]
    fn test_other_errors_keep_binding() {
        let handle = StaleHandle::unbound();
        handle.bind(1u32);
        let access: Access<()> = handle.access(|_| Err(EngineError::Needs3D));
        assert!(matches!(access, Access::Failed(EngineError::Needs3D)));
        assert!(handle.is_bound());
    }

    #[test]
    fn test_clear_is_not_revocation() {
        let handle = StaleHandle::unbound();
        handle.bind(1u32);
        assert_eq!(handle.clear(), Some(1));
        assert_eq!(handle.revocation(), None);
    }
}
