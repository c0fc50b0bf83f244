// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Driver errors.

/// Errors returned by [`DriverHandle`](crate::DriverHandle) and
/// [`PointerDownSink`](crate::PointerDownSink).
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The driver has stopped; the input was dropped.
    #[error("trigger driver is no longer running")]
    Closed,
}
