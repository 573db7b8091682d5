//! Error reporting for the wrapper.
//!
//! Every `CURLcode`-returning libcurl call goes through [`cvt!`], which
//! turns a non-`CURLE_OK` result into an [`Error::Code`] carrying the
//! failing call expression, the source location of the check and the
//! library's own description of the code.

use std::ffi::CStr;
use std::panic::Location;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the wrapper types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A libcurl call returned a non-`CURLE_OK` status code.
    #[error("{expr} failed at {location}: {detail} (curl code {code})")]
    Code {
        /// The native status code.
        code: curl_sys::CURLcode,
        /// The failing call, as written at the check site.
        expr: &'static str,
        /// Source location of the check.
        location: &'static Location<'static>,
        /// `curl_easy_strerror` text for the code.
        detail: String,
    },

    /// A libcurl constructor or allocator handed back a null pointer.
    #[error("{what} at {location}")]
    NullHandle {
        what: &'static str,
        location: &'static Location<'static>,
    },

    /// A [`GlobalInit`](crate::GlobalInit) guard is already live.
    #[error("curl global state is already initialized")]
    AlreadyInitialized,

    /// The receive sink failed while a transfer was writing into it.
    #[error("write sink failed: {0}")]
    Sink(#[from] std::io::Error),

    /// A string destined for libcurl contains an interior NUL byte.
    #[error("string contains an interior NUL byte: {0}")]
    InvalidString(#[from] std::ffi::NulError),
}

impl Error {
    #[track_caller]
    pub(crate) fn from_code(code: curl_sys::CURLcode, expr: &'static str) -> Self {
        let detail = unsafe {
            let ptr = curl_sys::curl_easy_strerror(code);
            if ptr.is_null() {
                String::from("unknown error")
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        };
        Error::Code {
            code,
            expr,
            location: Location::caller(),
            detail,
        }
    }

    #[track_caller]
    pub(crate) fn null_handle(what: &'static str) -> Self {
        Error::NullHandle {
            what,
            location: Location::caller(),
        }
    }

    /// The native status code, when this error came out of libcurl.
    #[must_use]
    pub fn code(&self) -> Option<curl_sys::CURLcode> {
        match self {
            Error::Code { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Checks a `CURLcode`-returning libcurl call, capturing the call
/// expression text alongside the failure.
macro_rules! cvt {
    ($call:expr) => {{
        let code = unsafe { $call };
        if code == curl_sys::CURLE_OK {
            Ok(())
        } else {
            Err($crate::error::Error::from_code(code, stringify!($call)))
        }
    }};
}

pub(crate) use cvt;
