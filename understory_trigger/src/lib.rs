// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Trigger: a deterministic, `no_std` visibility controller for anchored overlays.
//!
//! ## Overview
//!
//! Popups, tooltips, dropdowns and menus all need the same decision: given pointer, focus and
//! click events on an anchor and its floating overlay, should the overlay be shown or hidden?
//! This crate makes that decision and nothing else. It does not position the overlay, subscribe
//! to host events, or render anything.
//!
//! ## Layering
//!
//! The [`Controller`](crate::controller::Controller) is sans-IO. Each operation returns the
//! [`Command`](crate::types::Command)s the host must execute: arm or cancel the delay timer, run
//! the `beforeVisibleChange` gate, notify visibility changes, present the overlay, and manage the
//! outside pointer-down subscription. The host reports back with
//! [`timer_fired`](crate::controller::Controller::timer_fired),
//! [`resolve_gate`](crate::controller::Controller::resolve_gate) and
//! [`overlay_settled`](crate::controller::Controller::overlay_settled).
//! `understory_trigger_driver` provides a tokio host loop that does this for you.
//!
//! ## Components
//!
//! - [`action`]: which interactions may show or hide, from the `action`/`showAction`/`hideAction`
//!   lists.
//! - [`delay`]: the single pending timer; the latest intent wins.
//! - [`containment`]: whether a pointer target is inside the anchor, the overlay, or a nested overlay.
//! - [`controller`]: the state machine, including the gated commit protocol and outside dismissal.
//! - [`config`]: the option surface and its resolved form.
//!
//! ## Workflow
//!
//! 1) Build a [`TriggerConfig`](crate::config::TriggerConfig), usually from
//!    [`TriggerOptions`](crate::config::TriggerOptions).
//! 2) Provide a [`ContainmentQuery`](crate::containment::ContainmentQuery), for example
//!    [`TreeContainment`](crate::containment::TreeContainment) over your tree's
//!    [`ParentLookup`](crate::containment::ParentLookup).
//! 3) Feed [`InteractionEvent`](crate::types::InteractionEvent)s to
//!    [`handle_interaction`](crate::controller::Controller::handle_interaction) and execute the
//!    returned commands in order.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod action;
pub mod config;
pub mod containment;
pub mod controller;
pub mod delay;
pub mod error;
pub mod types;
