//! The easy-handle wrapper: one configurable, executable transfer
//! session, owned exclusively for the lifetime of the wrapper.

use std::any::Any;
use std::cmp::Ordering;
use std::ffi::{CStr, CString};
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};

use enumflags2::{bitflags, BitFlags};
use libc::{c_char, c_int, c_long, c_void, size_t};

use crate::error::{cvt, Error, Result};
use crate::list::List;

/// A rust flavored equivalent of the `CURLPAUSE_*` bits.
#[bitflags]
#[repr(u8)]
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PauseFlag {
    /// `CURLPAUSE_RECV`.
    Recv = curl_sys::CURLPAUSE_RECV as _,
    /// `CURLPAUSE_SEND`.
    Send = curl_sys::CURLPAUSE_SEND as _,
}

/// A single transfer session wrapping a `CURL` easy handle.
///
/// The handle is non-null after construction, owned exclusively and
/// released exactly once on drop. There is no `Clone`: an exact copy of
/// an easy handle is impossible, so the only way to get a second
/// session with the same configuration is [`Easy::duplicate`], which
/// asks libcurl for an independent copy via `curl_easy_duphandle`.
///
/// Comparison, ordering and hashing all reflect the identity of the
/// underlying handle, not the configured transfer.
pub struct Easy {
    handle: NonNull<curl_sys::CURL>,
    // keeps CURLOPT_HTTPHEADER storage alive; libcurl does not copy
    // slists passed through setopt
    headers: Option<List>,
}

// Easy handles may move between threads as long as they are not used
// concurrently.
unsafe impl Send for Easy {}

impl Easy {
    /// Acquires a fresh easy handle via `curl_easy_init`.
    ///
    /// A [`GlobalInit`](crate::GlobalInit) guard must be live for the
    /// whole lifetime of the handle.
    pub fn new() -> Result<Self> {
        let raw = unsafe { curl_sys::curl_easy_init() };
        NonNull::new(raw)
            .map(Self::from_handle)
            .ok_or_else(|| Error::null_handle("failed to acquire a curl easy handle"))
    }

    fn from_handle(handle: NonNull<curl_sys::CURL>) -> Self {
        Self {
            handle,
            headers: None,
        }
    }

    /// Asks libcurl for an independent copy of this session.
    pub fn duplicate(&self) -> Result<Self> {
        let raw = unsafe { curl_sys::curl_easy_duphandle(self.handle.as_ptr()) };
        NonNull::new(raw)
            .map(Self::from_handle)
            .ok_or_else(|| Error::null_handle("failed to duplicate a curl easy handle"))
    }

    /// Forwards a long-valued option to `curl_easy_setopt`.
    pub fn set_long(&mut self, option: curl_sys::CURLoption, value: c_long) -> Result<()> {
        cvt!(curl_sys::curl_easy_setopt(
            self.handle.as_ptr(),
            option,
            value
        ))
    }

    /// Forwards a string-valued option to `curl_easy_setopt`.
    ///
    /// libcurl copies string option values, so `value` need not outlive
    /// the call.
    pub fn set_str(&mut self, option: curl_sys::CURLoption, value: &str) -> Result<()> {
        let value = CString::new(value)?;
        cvt!(curl_sys::curl_easy_setopt(
            self.handle.as_ptr(),
            option,
            value.as_ptr()
        ))
    }

    /// Installs a custom header set (`CURLOPT_HTTPHEADER`).
    ///
    /// The list is moved into the session: libcurl keeps a reference to
    /// the native chain rather than copying it, so the session owns the
    /// storage until [`Easy::reset`], a replacement set, or drop.
    pub fn set_headers(&mut self, headers: List) -> Result<()> {
        cvt!(curl_sys::curl_easy_setopt(
            self.handle.as_ptr(),
            curl_sys::CURLOPT_HTTPHEADER,
            headers.as_ptr()
        ))?;
        self.headers = Some(headers);
        Ok(())
    }

    /// Sets the transfer URL (`CURLOPT_URL`).
    pub fn url(&mut self, url: &str) -> Result<()> {
        self.set_str(curl_sys::CURLOPT_URL, url)
    }

    /// Sets the User-Agent header value (`CURLOPT_USERAGENT`).
    pub fn useragent(&mut self, agent: &str) -> Result<()> {
        self.set_str(curl_sys::CURLOPT_USERAGENT, agent)
    }

    /// Enables or disables following redirects (`CURLOPT_FOLLOWLOCATION`).
    pub fn follow_location(&mut self, enable: bool) -> Result<()> {
        self.set_long(curl_sys::CURLOPT_FOLLOWLOCATION, c_long::from(enable))
    }

    /// Injects one cookie line into the session's cookie engine
    /// (`CURLOPT_COOKIELIST`): either a `Set-Cookie:` header line or a
    /// line in Netscape cookie-file format.
    pub fn add_cookie(&mut self, cookie: &str) -> Result<()> {
        self.set_str(curl_sys::CURLOPT_COOKIELIST, cookie)
    }

    /// Injects a batch of name/value cookies, formatted as
    /// `Set-Cookie: name=value;` lines.
    pub fn add_cookies<I, K, V>(&mut self, cookies: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in cookies {
            let line = format!("Set-Cookie: {}={};", name.as_ref(), value.as_ref());
            self.add_cookie(&line)?;
        }
        Ok(())
    }

    /// Pauses the named directions of an active transfer
    /// (`curl_easy_pause`).
    pub fn pause(&mut self, flags: impl Into<BitFlags<PauseFlag>>) -> Result<()> {
        let flags = flags.into();
        tracing::trace!(?flags, "pausing transfer");
        cvt!(curl_sys::curl_easy_pause(
            self.handle.as_ptr(),
            c_int::from(flags.bits())
        ))
    }

    /// Unpauses both directions (`CURLPAUSE_CONT`).
    pub fn unpause(&mut self) -> Result<()> {
        self.pause(BitFlags::empty())
    }

    /// Executes the configured transfer, blocking until libcurl
    /// returns.
    pub fn perform(&mut self) -> Result<()> {
        tracing::debug!("performing transfer");
        cvt!(curl_sys::curl_easy_perform(self.handle.as_ptr()))
    }

    /// Re-initializes all options to their defaults
    /// (`curl_easy_reset`). Live connections, the session id cache and
    /// cookies are kept; the installed header set is released.
    pub fn reset(&mut self) {
        unsafe { curl_sys::curl_easy_reset(self.handle.as_ptr()) };
        self.headers = None;
        tracing::trace!("handle reset");
    }

    /// Performs the transfer and returns the received body.
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.recv_into_buffer(&mut buffer)?;
        Ok(buffer)
    }

    /// Performs the transfer, appending received bytes to `buffer`.
    pub fn recv_into_buffer(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        self.recv_into_writer(buffer)
    }

    /// Performs the transfer, writing received bytes to `file`.
    pub fn recv_into_file(&mut self, file: &mut File) -> Result<()> {
        self.recv_into_writer(file)
    }

    /// Performs the transfer, streaming received bytes into any
    /// [`io::Write`] sink.
    ///
    /// A sink error aborts the transfer and is returned as
    /// [`Error::Sink`], taking precedence over the `CURLE_WRITE_ERROR`
    /// it provokes. The write callback and its data pointer are cleared
    /// again before this method returns, whatever the outcome.
    pub fn recv_into_writer<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        let mut sink = Sink {
            writer,
            error: None,
            panic: None,
        };

        if let Err(err) = self.install_sink(&mut sink) {
            self.clear_sink();
            return Err(err);
        }
        let outcome = self.perform();
        self.clear_sink();

        if let Some(payload) = sink.panic {
            panic::resume_unwind(payload);
        }
        if let Some(err) = sink.error {
            return Err(Error::Sink(err));
        }
        outcome
    }

    fn install_sink<W: Write>(&mut self, sink: *mut Sink<'_, W>) -> Result<()> {
        cvt!(curl_sys::curl_easy_setopt(
            self.handle.as_ptr(),
            curl_sys::CURLOPT_WRITEFUNCTION,
            write_trampoline::<W> as curl_sys::curl_write_callback
        ))?;
        cvt!(curl_sys::curl_easy_setopt(
            self.handle.as_ptr(),
            curl_sys::CURLOPT_WRITEDATA,
            sink.cast::<c_void>()
        ))
    }

    fn clear_sink(&mut self) {
        // restore a self-contained callback so no pointer into the
        // caller's frame survives the recv call
        unsafe {
            curl_sys::curl_easy_setopt(
                self.handle.as_ptr(),
                curl_sys::CURLOPT_WRITEFUNCTION,
                discard_trampoline as curl_sys::curl_write_callback,
            );
            curl_sys::curl_easy_setopt(
                self.handle.as_ptr(),
                curl_sys::CURLOPT_WRITEDATA,
                ptr::null_mut::<c_void>(),
            );
        }
    }

    /// URL-encodes `input` (`curl_easy_escape`).
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn escape(&self, input: &str) -> Result<String> {
        if input.is_empty() {
            // a zero length makes libcurl strlen() the pointer, and
            // &str data is not NUL-terminated
            return Ok(String::new());
        }
        let raw = unsafe {
            curl_sys::curl_easy_escape(
                self.handle.as_ptr(),
                input.as_ptr().cast::<c_char>(),
                input.len() as c_int,
            )
        };
        if raw.is_null() {
            return Err(Error::null_handle("curl_easy_escape returned no buffer"));
        }
        let escaped = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { curl_sys::curl_free(raw.cast::<c_void>()) };
        Ok(escaped)
    }

    /// URL-decodes `input` (`curl_easy_unescape`).
    ///
    /// Returns bytes rather than a string: percent-decoding can produce
    /// arbitrary octets.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    pub fn unescape(&self, input: &str) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let mut out_len: c_int = 0;
        let raw = unsafe {
            curl_sys::curl_easy_unescape(
                self.handle.as_ptr(),
                input.as_ptr().cast::<c_char>(),
                input.len() as c_int,
                &mut out_len,
            )
        };
        if raw.is_null() {
            return Err(Error::null_handle("curl_easy_unescape returned no buffer"));
        }
        let bytes =
            unsafe { std::slice::from_raw_parts(raw.cast::<u8>(), out_len as usize) }.to_vec();
        unsafe { curl_sys::curl_free(raw.cast::<c_void>()) };
        Ok(bytes)
    }

    /// The raw handle, for options this wrapper does not forward.
    ///
    /// The pointer is only valid while `self` is alive; anything done
    /// with it must uphold libcurl's own contracts.
    #[must_use]
    pub fn as_raw(&self) -> *mut curl_sys::CURL {
        self.handle.as_ptr()
    }
}

impl Drop for Easy {
    fn drop(&mut self) {
        // runs before the stored header list is freed
        unsafe { curl_sys::curl_easy_cleanup(self.handle.as_ptr()) };
    }
}

impl PartialEq for Easy {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Easy {}

impl PartialOrd for Easy {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Easy {
    fn cmp(&self, other: &Self) -> Ordering {
        self.handle.cmp(&other.handle)
    }
}

impl Hash for Easy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Debug for Easy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Easy")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Per-call state shared with the write trampoline.
struct Sink<'a, W: Write> {
    writer: &'a mut W,
    error: Option<io::Error>,
    panic: Option<Box<dyn Any + Send>>,
}

extern "C" fn write_trampoline<W: Write>(
    ptr: *mut c_char,
    size: size_t,
    nmemb: size_t,
    data: *mut c_void,
) -> size_t {
    let Some(count) = size.checked_mul(nmemb) else {
        return 0;
    };
    if count == 0 {
        return 0;
    }
    if data.is_null() {
        return 0;
    }
    let sink = unsafe { &mut *data.cast::<Sink<'_, W>>() };
    let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), count) };

    // a panic must not cross the FFI boundary; park it and abort the
    // transfer instead
    match panic::catch_unwind(AssertUnwindSafe(|| sink.writer.write_all(bytes))) {
        Ok(Ok(())) => count,
        Ok(Err(err)) => {
            sink.error = Some(err);
            0
        }
        Err(payload) => {
            sink.panic = Some(payload);
            0
        }
    }
}

extern "C" fn discard_trampoline(
    _ptr: *mut c_char,
    size: size_t,
    nmemb: size_t,
    _data: *mut c_void,
) -> size_t {
    size.saturating_mul(nmemb)
}
