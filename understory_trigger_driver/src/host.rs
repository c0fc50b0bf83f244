// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host side of the driver: callbacks, presentation, and the document pointer-down wiring.
//!
//! Every callback except the two pointer-down methods has a default, so a host only implements
//! what it cares about. The defaults match an unconfigured trigger: the gate always passes,
//! notifications are ignored, and presentation completes immediately.

use core::fmt;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::time::Instant;
use understory_trigger::error::Veto;
use understory_trigger::types::{EventKind, InteractionEvent, Presentation};

use crate::driver::{Input, elapsed_ms};
use crate::error::DriverError;

/// Environment a [`Driver`](crate::Driver) runs against.
///
/// `K` is the node reference type shared with the controller.
pub trait Host<K> {
    /// Root that document-wide pointer-down listeners attach to.
    type Document;
    /// Opaque alignment payload forwarded from the positioning engine.
    type Alignment;

    /// Current document, e.g. the frame the anchor lives in.
    fn document(&mut self) -> Self::Document;

    /// Listen for pointer-down anywhere in `document`, forwarding targets to `sink`.
    ///
    /// Dropping the returned [`Subscription`] must stop delivery.
    fn subscribe_pointer_down(
        &mut self,
        document: &Self::Document,
        sink: PointerDownSink<K, Self::Alignment>,
    ) -> Subscription;

    /// Gate run before every committed transition. Resolve to allow, reject to veto.
    ///
    /// The future may take arbitrarily long or never finish; the driver keeps running meanwhile.
    fn before_visible_change(&mut self, target: bool) -> LocalBoxFuture<'static, Result<(), Veto>> {
        let _ = target;
        future::ready(Ok(())).boxed_local()
    }

    /// Visibility committed.
    fn on_visible_change(&mut self, visible: bool) {
        let _ = visible;
    }

    /// Presentation of a committed change finished.
    fn after_visible_change(&mut self, visible: bool) {
        let _ = visible;
    }

    /// The gate vetoed a transition.
    fn on_veto(&mut self, veto: &Veto) {
        tracing::debug!(%veto, "visibility change rejected");
    }

    /// The positioning engine aligned the overlay.
    fn on_align(&mut self, overlay: &K, alignment: &Self::Alignment) {
        let _ = (overlay, alignment);
    }

    /// Show or hide the overlay. The returned future completes once the host has finished.
    ///
    /// A show names the class for the overlay's container. Presentations may overlap; only the
    /// latest one produces [`after_visible_change`](Host::after_visible_change).
    fn present(&mut self, presentation: Presentation) -> LocalBoxFuture<'static, ()> {
        let _ = presentation;
        future::ready(()).boxed_local()
    }

    /// Tear down the overlay container.
    fn remove_container(&mut self) {}

    /// An input could not be processed. Nothing changed.
    fn on_error(&mut self, error: &(dyn core::error::Error + 'static)) {
        tracing::warn!(%error, "trigger input dropped");
    }
}

/// Handle for delivering document pointer-down events to a running driver.
///
/// Holds only a weak reference; it never keeps a driver alive.
pub struct PointerDownSink<K, A> {
    pub(crate) inputs: WeakUnboundedSender<Input<K, A>>,
    pub(crate) epoch: Instant,
}

impl<K, A> Clone for PointerDownSink<K, A> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            epoch: self.epoch,
        }
    }
}

impl<K, A> fmt::Debug for PointerDownSink<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerDownSink").finish_non_exhaustive()
    }
}

impl<K, A> PointerDownSink<K, A> {
    /// A pointer went down on `target`.
    pub fn pointer_down(&self, target: K) -> Result<(), DriverError> {
        let event = InteractionEvent::new(
            EventKind::DocumentPointerDown,
            target,
            elapsed_ms(self.epoch),
        );
        self.inputs
            .upgrade()
            .ok_or(DriverError::Closed)?
            .send(Input::Event(event))
            .map_err(|_| DriverError::Closed)
    }
}

/// Guard for a host event subscription. Unsubscribes on drop.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Run `unsubscribe` when the subscription is dropped.
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { unsubscribe: None }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}
