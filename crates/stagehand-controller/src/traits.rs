//! Narrow collaborator interfaces.
//!
//! The controller depends on these traits only; real implementations live
//! in the runtime, fakes live in tests.

use std::future::Future;
use std::sync::Arc;

use stagehand_core::types::PlayableItem;

use crate::error::{ContentError, TransportError};

/// Supplies a playable item ahead of a join. The provider owns its own
/// retry/fallback chain; the controller only sees the final outcome plus a
/// fallback item it can always proceed with.
pub trait ContentProvider: Send + Sync {
    fn request_next(&self) -> impl Future<Output = Result<PlayableItem, ContentError>> + Send;

    /// Last-resort item used when `request_next` fails; seat admission must
    /// never block indefinitely on missing content.
    fn fallback_item(&self) -> PlayableItem;
}

/// Performs the actual seat join/leave network operation.
pub trait SeatTransport: Send + Sync {
    fn join(&self, item: &PlayableItem) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn leave(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<P: ContentProvider> ContentProvider for Arc<P> {
    fn request_next(&self) -> impl Future<Output = Result<PlayableItem, ContentError>> + Send {
        (**self).request_next()
    }

    fn fallback_item(&self) -> PlayableItem {
        (**self).fallback_item()
    }
}

impl<T: SeatTransport> SeatTransport for Arc<T> {
    fn join(&self, item: &PlayableItem) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).join(item)
    }

    fn leave(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).leave()
    }
}
