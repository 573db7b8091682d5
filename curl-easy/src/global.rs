//! Process-wide libcurl state, bracketed by a scoped guard.

use std::sync::atomic::{AtomicBool, Ordering};

use enumflags2::{bitflags, BitFlags};
use libc::c_long;

use crate::error::{cvt, Error, Result};

/// Latch preventing two live guards from racing
/// `curl_global_init`/`curl_global_cleanup`, which are not thread-safe.
static GLOBAL_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// A rust flavored equivalent of the `CURL_GLOBAL_*` init bits.
#[bitflags]
#[repr(u8)]
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GlobalFlag {
    /// `CURL_GLOBAL_SSL`. No effect since curl 7.57.0, kept for parity.
    Ssl = curl_sys::CURL_GLOBAL_SSL as _,
    /// `CURL_GLOBAL_WIN32`.
    Win32 = curl_sys::CURL_GLOBAL_WIN32 as _,
    /// `CURL_GLOBAL_ACK_EINTR`. Not exported by `curl-sys`.
    AckEintr = 1 << 2,
}

/// Scoped guard for `curl_global_init`/`curl_global_cleanup`.
///
/// Construction performs the one-time global setup and `Drop` tears it
/// down again. Only one guard may be live at a time; constructing a
/// second returns [`Error::AlreadyInitialized`]. Every [`Easy`] handle
/// must be created and dropped while a guard is live.
///
/// [`Easy`]: crate::Easy
pub struct GlobalInit {
    flags: BitFlags<GlobalFlag>,
}

impl GlobalInit {
    /// Initializes libcurl with `CURL_GLOBAL_ALL` (SSL and Win32 state).
    pub fn new() -> Result<Self> {
        Self::with_flags(GlobalFlag::Ssl | GlobalFlag::Win32)
    }

    /// Initializes libcurl with `CURL_GLOBAL_NOTHING`.
    pub fn nothing() -> Result<Self> {
        Self::with_flags(BitFlags::empty())
    }

    /// Initializes libcurl with an explicit set of init bits.
    pub fn with_flags(flags: impl Into<BitFlags<GlobalFlag>>) -> Result<Self> {
        let flags = flags.into();
        GLOBAL_INITIALIZED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::AlreadyInitialized)?;

        if let Err(err) = cvt!(curl_sys::curl_global_init(c_long::from(flags.bits()))) {
            GLOBAL_INITIALIZED.store(false, Ordering::SeqCst);
            return Err(err);
        }

        tracing::debug!(?flags, "curl global state initialized");
        Ok(Self { flags })
    }

    /// The init bits this guard was constructed with.
    #[must_use]
    pub fn flags(&self) -> BitFlags<GlobalFlag> {
        self.flags
    }
}

impl Drop for GlobalInit {
    fn drop(&mut self) {
        unsafe { curl_sys::curl_global_cleanup() };
        GLOBAL_INITIALIZED.store(false, Ordering::SeqCst);
        tracing::debug!("curl global state released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn guard_brackets_global_state() {
        let guard = GlobalInit::new().unwrap();
        assert_eq!(guard.flags(), GlobalFlag::Ssl | GlobalFlag::Win32);
        drop(guard);

        // a fresh guard is fine once the previous one is gone
        let guard = GlobalInit::nothing().unwrap();
        assert!(guard.flags().is_empty());
    }

    #[test]
    #[serial]
    fn overlapping_guards_are_rejected() {
        let _guard = GlobalInit::new().unwrap();
        assert!(matches!(
            GlobalInit::new(),
            Err(Error::AlreadyInitialized)
        ));
    }
}
