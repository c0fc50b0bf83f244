// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Trigger Driver: a single-task tokio host loop for `understory_trigger`.
//!
//! ## Overview
//!
//! The [`Controller`](understory_trigger::controller::Controller) only returns commands. This
//! crate executes them: it keeps the one delay timer, runs `beforeVisibleChange` gates as
//! futures, awaits presentations, and wires the document pointer-down subscription while the
//! overlay is visible. Every decision still comes from the controller.
//!
//! ## Usage
//!
//! 1) Implement [`Host`] for your environment. Only [`Host::document`] and
//!    [`Host::subscribe_pointer_down`] are required.
//! 2) Create a [`Driver`] with [`Driver::new`] and keep the returned [`DriverHandle`] in your event
//!    sources.
//! 3) Await [`Driver::run`] on a current-thread runtime or inside a `LocalSet`. The driver is not
//!    `Send`: host futures are polled on the driver's own task.
//!
//! ```no_run
//! use understory_trigger::action::Triggers;
//! use understory_trigger::config::TriggerConfig;
//! use understory_trigger::containment::{ParentLookup, TreeContainment};
//! use understory_trigger::controller::Controller;
//! use understory_trigger::types::EventKind;
//! use understory_trigger_driver::{Driver, Host, PointerDownSink, Subscription};
//!
//! struct Flat;
//! impl ParentLookup<u32> for Flat {
//!     fn parent_of(&self, _: &u32) -> Option<u32> { None }
//! }
//!
//! struct Log;
//! impl Host<u32> for Log {
//!     type Document = ();
//!     type Alignment = ();
//!     fn document(&mut self) {}
//!     fn subscribe_pointer_down(&mut self, _: &(), _: PointerDownSink<u32, ()>) -> Subscription {
//!         Subscription::detached()
//!     }
//!     fn on_visible_change(&mut self, visible: bool) {
//!         println!("visible: {visible}");
//!     }
//! }
//!
//! # async fn demo() {
//! let config = TriggerConfig::with_triggers(Triggers::for_action("click"));
//! let controller = Controller::new(config, TreeContainment::new(Flat, 1));
//! let (driver, handle) = Driver::new(controller, Log);
//! handle.dispatch(EventKind::Click, 1).unwrap();
//! handle.shutdown();
//! driver.run().await;
//! # }
//! ```
//!
//! ## Logging
//!
//! The driver loop runs inside a `trigger_driver` [`tracing`] span. Executed commands are logged
//! at `trace`; containment failures at `warn`.

mod driver;
mod error;
mod host;

pub use driver::{Driver, DriverHandle};
pub use error::DriverError;
pub use host::{Host, PointerDownSink, Subscription};
