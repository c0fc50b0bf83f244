// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! None of these are fatal: each one degrades to "no visibility change this cycle".
//! Stale commits are not errors at all and are dropped silently.

use alloc::string::String;

/// A `beforeVisibleChange` gate rejected a transition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("visibility change vetoed: {reason}")]
pub struct Veto {
    /// Host-provided reason.
    pub reason: String,
}

impl Veto {
    /// Create a veto with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by [`Controller`](crate::controller::Controller) operations.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError<E> {
    /// The host containment capability failed. The controller does not guess: no dismissal happens.
    #[error("containment query failed")]
    Containment(#[source] E),
}
