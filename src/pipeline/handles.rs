//! Ephemeral handles for in-memory binary data.
//!
//! Every payload the embedder may display (the source preview, the current
//! result) is registered here and referenced through an [`ObjectHandle`]. A
//! handle is not `Clone` and [`HandleRegistry::release`] consumes it, so a
//! handle can be released at most once; forgetting to release one shows up in
//! [`HandleRegistry::live_count`].

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// Opaque reference to a registered payload, shaped like a blob URL.
#[derive(PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    id: u64,
}

impl ObjectHandle {
    /// URL form handed to presentation code, e.g. `blob:compresso/3`.
    pub fn url(&self) -> String {
        format!("blob:compresso/{}", self.id)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

struct Entry {
    data: Bytes,
    mime: &'static str,
}

/// Registry of live handles.
#[derive(Default)]
pub struct HandleRegistry {
    next_id: u64,
    live: HashMap<u64, Entry>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payload and return its handle.
    pub fn create(&mut self, data: Bytes, mime: &'static str) -> ObjectHandle {
        self.next_id += 1;
        let id = self.next_id;
        log::debug!("handle blob:compresso/{} created ({} bytes, {})", id, data.len(), mime);
        self.live.insert(id, Entry { data, mime });
        ObjectHandle { id }
    }

    /// Release a handle. Returns `false` if the handle was not issued by this
    /// registry.
    pub fn release(&mut self, handle: ObjectHandle) -> bool {
        match self.live.remove(&handle.id) {
            Some(entry) => {
                log::debug!(
                    "handle {} released ({} bytes, {})",
                    handle.url(),
                    entry.data.len(),
                    entry.mime
                );
                true
            }
            None => {
                log::warn!("release of unknown handle {}", handle.url());
                false
            }
        }
    }

    /// Bytes behind a live handle.
    pub fn resolve(&self, handle: &ObjectHandle) -> Option<&Bytes> {
        self.live.get(&handle.id).map(|entry| &entry.data)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            log::warn!("{} handles still live at teardown", self.live.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_release() {
        let mut registry = HandleRegistry::new();
        let handle = registry.create(Bytes::from_static(b"abc"), "image/png");

        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&handle).unwrap().as_ref(), b"abc");
        assert!(registry.release(handle));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn handles_are_unique() {
        let mut registry = HandleRegistry::new();
        let a = registry.create(Bytes::from_static(b"a"), "image/png");
        let b = registry.create(Bytes::from_static(b"b"), "image/png");
        assert_ne!(a.url(), b.url());
        assert_eq!(registry.live_count(), 2);
        registry.release(a);
        registry.release(b);
    }

    #[test]
    fn foreign_handle_release_is_reported() {
        let mut ours = HandleRegistry::new();
        let mut theirs = HandleRegistry::new();
        let foreign = theirs.create(Bytes::from_static(b"x"), "image/jpeg");
        // Same id space, but `ours` never issued anything.
        assert!(!ours.release(foreign));
        assert_eq!(theirs.live_count(), 1);
    }

    #[test]
    fn url_shape() {
        let mut registry = HandleRegistry::new();
        let handle = registry.create(Bytes::new(), "image/avif");
        assert_eq!(handle.url(), "blob:compresso/1");
        registry.release(handle);
    }
}
