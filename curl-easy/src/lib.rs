//! Safe RAII wrappers for libcurl's easy interface.
//!
//! This crate adds no protocol logic of its own: connection handling,
//! TLS and the transfers themselves all live inside libcurl, reached
//! through the [`curl-sys`](curl_sys) bindings. What it adds is
//! lifecycle safety. Each wrapper owns exactly one native resource,
//! construction and destruction are paired through `Drop`, failed
//! calls become [`Error`] values carrying the native code and
//! libcurl's description, and received bytes stream into a buffer,
//! any [`std::io::Write`] sink, or a file without any pointer to the
//! caller's frame outliving the call.
//!
//! ```no_run
//! use curl_easy::{Easy, GlobalInit, List};
//!
//! # fn main() -> curl_easy::Result<()> {
//! let _global = GlobalInit::new()?;
//!
//! let mut headers = List::new();
//! headers.append("Accept: text/html")?;
//!
//! let mut easy = Easy::new()?;
//! easy.url("https://example.com/")?;
//! easy.useragent(curl_easy::FIREFOX27)?;
//! easy.set_headers(headers)?;
//!
//! let body = easy.recv()?;
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod easy;
mod error;
mod global;
mod list;

pub use easy::{Easy, PauseFlag};
pub use error::{Error, Result};
pub use global::{GlobalFlag, GlobalInit};
pub use list::{Iter, List};

// flag sets in the public API are enumflags2 types
pub use enumflags2::BitFlags;

/// A browser User-Agent string for servers that dislike the default.
pub const FIREFOX27: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:27.0) Gecko/20100101 Firefox/27.0";
