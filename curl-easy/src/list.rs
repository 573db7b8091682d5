//! Owned wrapper around `curl_slist`, libcurl's singly-linked string
//! list used for custom header sets and similar option payloads.

use std::ffi::{CStr, CString};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use crate::error::{Error, Result};

/// An owned, appendable list of C strings backed by a `curl_slist`.
///
/// The empty list is a null head pointer, which is what libcurl expects
/// for "no entries". Entries are copied by `curl_slist_append`, so the
/// source strings need not outlive the call. The whole chain is freed
/// with `curl_slist_free_all` on drop.
pub struct List {
    head: *mut curl_sys::curl_slist,
}

// An easy handle may move between threads together with its list as
// long as neither is used concurrently.
unsafe impl Send for List {}

impl List {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: ptr::null_mut(),
        }
    }

    /// Appends one entry to the end of the list.
    pub fn append(&mut self, entry: &str) -> Result<()> {
        let entry = CString::new(entry)?;
        let head = unsafe { curl_sys::curl_slist_append(self.head, entry.as_ptr()) };
        if head.is_null() {
            return Err(Error::null_handle("curl_slist_append returned no list"));
        }
        self.head = head;
        Ok(())
    }

    /// Appends every entry of an iterator, stopping at the first failure.
    pub fn append_all<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for entry in entries {
            self.append(entry.as_ref())?;
        }
        Ok(())
    }

    /// Walks the native links, yielding each entry as a `&CStr`.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            cursor: self.head,
            _list: PhantomData,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// The raw head pointer, for forwarding into `curl_easy_setopt`.
    ///
    /// Null for an empty list. The pointer is only valid while `self`
    /// is alive and unmodified.
    #[must_use]
    pub fn as_ptr(&self) -> *mut curl_sys::curl_slist {
        self.head
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for List {
    fn drop(&mut self) {
        // null-safe in libcurl
        unsafe { curl_sys::curl_slist_free_all(self.head) };
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a CStr;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`List`].
pub struct Iter<'a> {
    cursor: *const curl_sys::curl_slist,
    _list: PhantomData<&'a List>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CStr;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.cursor.is_null() {
            let node = unsafe { &*self.cursor };
            self.cursor = node.next;
            if !node.data.is_null() {
                return Some(unsafe { CStr::from_ptr(node.data) });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_a_null_head() {
        let list = List::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.as_ptr().is_null());
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn append_preserves_order() {
        let mut list = List::new();
        list.append("Accept: */*").unwrap();
        list.append("X-Request-Id: 7").unwrap();

        let entries: Vec<_> = list
            .iter()
            .map(|entry| entry.to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, ["Accept: */*", "X-Request-Id: 7"]);
        assert_eq!(list.len(), 2);
        assert!(!list.as_ptr().is_null());
    }

    #[test]
    fn append_all_chains_entries() {
        let mut list = List::new();
        list.append_all(["a: 1", "b: 2", "c: 3"]).unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn interior_nul_entries_are_rejected() {
        let mut list = List::new();
        let err = list.append("bad\0header").unwrap_err();
        assert!(matches!(err, Error::InvalidString(_)));
        assert!(list.is_empty());
    }
}
