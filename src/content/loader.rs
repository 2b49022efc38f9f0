//! # Content loader abstraction.
//!
//! A [`ContentLoader`] turns a [`ContentDescriptor`] into a resident
//! [`ContentHandle`] and later releases it. Both calls are treated as slow and
//! fallible; the streamer imposes no retry policy of its own.
//!
//! ## Handle ownership
//! ```text
//! load(descriptor) ──► Ok(handle) ──► kept by the location while Loaded/Unloading
//!                                         │
//!                          unload(&handle) ──► Ok   → handle dropped by the location
//!                                          └─► Err  → handle stays, location back to Loaded
//! ```
//! `unload` borrows the handle so a failed release never loses it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ContentError;
use crate::world::ContentDescriptor;

/// Opaque token for resident content, minted by the loader.
///
/// The loader decides what the raw value means (slot number, instance id...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentHandle(u64);

impl ContentHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to a loader.
pub type LoaderRef = Arc<dyn ContentLoader>;

/// # Loads and releases location content.
///
/// Each call runs inside its own transition task; at most one call is
/// outstanding per location, but calls for different locations overlap.
/// Panics are caught by the streamer and reported as failures.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use worldstream::{ContentDescriptor, ContentError, ContentHandle, ContentLoader};
///
/// struct Instantiator;
///
/// #[async_trait]
/// impl ContentLoader for Instantiator {
///     async fn load(&self, content: &ContentDescriptor) -> Result<ContentHandle, ContentError> {
///         if content.as_str().is_empty() {
///             return Err(ContentError::load("no prefab"));
///         }
///         Ok(ContentHandle::new(1))
///     }
///
///     async fn unload(&self, _handle: &ContentHandle) -> Result<(), ContentError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ContentLoader: Send + Sync + 'static {
    /// Brings the described content into memory.
    async fn load(&self, content: &ContentDescriptor) -> Result<ContentHandle, ContentError>;

    /// Releases content previously returned by [`load`](Self::load).
    async fn unload(&self, handle: &ContentHandle) -> Result<(), ContentError>;
}
