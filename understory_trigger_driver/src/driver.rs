// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The driver loop.
//!
//! ## Overview
//!
//! [`Driver`] owns one [`Controller`] and one [`Host`]. It runs as a single future: inputs,
//! the one delay timer, gate futures and presentation futures are all polled from the same task,
//! so controller state is only ever touched from one place. Nothing is spawned.
//!
//! ## Shutdown
//!
//! The loop ends when [`DriverHandle::shutdown`] is called or every handle is dropped. It then
//! destroys the controller, releasing the timer, the outside subscription and the container.
//! Gate futures still in flight are dropped; the controller would ignore their outcome anyway.

use core::fmt;
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use understory_trigger::containment::ContainmentQuery;
use understory_trigger::controller::Controller;
use understory_trigger::error::Veto;
use understory_trigger::types::{
    Command, EventKind, GateTicket, InteractionEvent, Millis, PresentToken, TimerToken,
};

use crate::error::DriverError;
use crate::host::{Host, PointerDownSink, Subscription};

pub(crate) enum Input<K, A> {
    Event(InteractionEvent<K>),
    Request { target: bool, delay_ms: Millis },
    SetVisible(bool),
    Align { overlay: K, alignment: A },
    IsVisible(oneshot::Sender<bool>),
}

enum Wake<K, A> {
    Input(Input<K, A>),
    Timer,
    Gate(GateTicket, Result<(), Veto>),
    Presented(PresentToken),
    Shutdown,
}

#[derive(Copy, Clone, Debug)]
struct ArmedTimer {
    token: TimerToken,
    deadline: Instant,
}

pub(crate) fn elapsed_ms(epoch: Instant) -> Millis {
    Millis::try_from(epoch.elapsed().as_millis()).unwrap_or(Millis::MAX)
}

/// Runs a [`Controller`] against a [`Host`].
pub struct Driver<K, C, H: Host<K>> {
    controller: Controller<K, C>,
    host: H,
    inputs: UnboundedReceiver<Input<K, H::Alignment>>,
    weak_inputs: WeakUnboundedSender<Input<K, H::Alignment>>,
    lifetime: CancellationToken,
    epoch: Instant,
    timer: Option<ArmedTimer>,
    gates: FuturesUnordered<LocalBoxFuture<'static, (GateTicket, Result<(), Veto>)>>,
    presentations: FuturesUnordered<LocalBoxFuture<'static, PresentToken>>,
    outside: Option<Subscription>,
}

impl<K, C, H: Host<K>> fmt::Debug for Driver<K, C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("controller", &self.controller)
            .field("timer", &self.timer)
            .field("gates", &self.gates.len())
            .field("outside", &self.outside.is_some())
            .finish_non_exhaustive()
    }
}

impl<K, C, H> Driver<K, C, H>
where
    C: ContainmentQuery<K>,
    H: Host<K>,
{
    /// Create a driver and the handle used to feed it.
    ///
    /// Timestamps are measured from this call.
    pub fn new(controller: Controller<K, C>, host: H) -> (Self, DriverHandle<K, H::Alignment>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let lifetime = CancellationToken::new();
        let epoch = Instant::now();
        let driver = Self {
            controller,
            host,
            inputs: rx,
            weak_inputs: tx.downgrade(),
            lifetime: lifetime.clone(),
            epoch,
            timer: None,
            gates: FuturesUnordered::new(),
            presentations: FuturesUnordered::new(),
            outside: None,
        };
        let handle = DriverHandle {
            inputs: tx,
            lifetime,
            epoch,
        };
        (driver, handle)
    }

    /// The controller being driven.
    pub fn controller(&self) -> &Controller<K, C> {
        &self.controller
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run until shutdown, then tear down and return the host.
    #[tracing::instrument(level = "debug", name = "trigger_driver", skip_all)]
    pub async fn run(mut self) -> H {
        let initial = self.controller.attach();
        self.execute(initial);
        loop {
            match self.next_wake().await {
                Wake::Shutdown => break,
                Wake::Input(input) => self.on_input(input),
                Wake::Timer => {
                    if let Some(timer) = self.timer.take() {
                        let cmds = self.controller.timer_fired(timer.token);
                        self.execute(cmds);
                    }
                }
                Wake::Gate(ticket, outcome) => {
                    let cmds = self.controller.resolve_gate(ticket, outcome);
                    self.execute(cmds);
                }
                Wake::Presented(token) => {
                    let cmds = self.controller.overlay_settled(token);
                    self.execute(cmds);
                }
            }
        }
        tracing::debug!("trigger driver shutting down");
        let cmds = self.controller.destroy();
        self.execute(cmds);
        self.gates.clear();
        self.presentations.clear();
        self.host
    }

    async fn next_wake(&mut self) -> Wake<K, H::Alignment> {
        let deadline = self.timer.map(|t| t.deadline);
        tokio::select! {
            biased;
            () = self.lifetime.cancelled() => Wake::Shutdown,
            input = self.inputs.recv() => input.map_or(Wake::Shutdown, Wake::Input),
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                Wake::Timer
            }
            Some((ticket, outcome)) = self.gates.next(), if !self.gates.is_empty() => {
                Wake::Gate(ticket, outcome)
            }
            Some(token) = self.presentations.next(), if !self.presentations.is_empty() => {
                Wake::Presented(token)
            }
        }
    }

    fn on_input(&mut self, input: Input<K, H::Alignment>) {
        match input {
            Input::Event(event) => match self.controller.handle_interaction(&event) {
                Ok(cmds) => self.execute(cmds),
                Err(err) => {
                    tracing::warn!(kind = ?event.kind, error = %err, "interaction not handled");
                    self.host.on_error(&err);
                }
            },
            Input::Request { target, delay_ms } => {
                let cmds = self.controller.request_visibility(target, delay_ms);
                self.execute(cmds);
            }
            Input::SetVisible(visible) => {
                let cmds = self.controller.set_visible(visible);
                self.execute(cmds);
            }
            Input::Align { overlay, alignment } => self.host.on_align(&overlay, &alignment),
            Input::IsVisible(reply) => {
                let _ = reply.send(self.controller.is_visible());
            }
        }
    }

    fn execute(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            tracing::trace!(?cmd, "executing");
            match cmd {
                Command::ArmTimer { token, delay_ms } => {
                    self.timer = Some(ArmedTimer {
                        token,
                        deadline: Instant::now() + Duration::from_millis(delay_ms),
                    });
                }
                Command::CancelTimer { token } => {
                    if self.timer.is_some_and(|t| t.token == token) {
                        self.timer = None;
                    }
                }
                Command::RequestGate { ticket, target } => {
                    let gate = self.host.before_visible_change(target);
                    self.gates
                        .push(gate.map(move |outcome| (ticket, outcome)).boxed_local());
                }
                Command::Vetoed(veto) => self.host.on_veto(&veto),
                Command::VisibleChanged(visible) => self.host.on_visible_change(visible),
                Command::Present {
                    token,
                    presentation,
                } => {
                    // Presentations may finish in any order; the controller keeps the latest.
                    let done = self.host.present(presentation);
                    self.presentations
                        .push(done.map(move |()| token).boxed_local());
                }
                Command::AfterVisibleChange(visible) => self.host.after_visible_change(visible),
                Command::SubscribeOutside => {
                    let document = self.host.document();
                    let sink = PointerDownSink {
                        inputs: self.weak_inputs.clone(),
                        epoch: self.epoch,
                    };
                    self.outside = Some(self.host.subscribe_pointer_down(&document, sink));
                }
                Command::UnsubscribeOutside => self.outside = None,
                Command::RemoveContainer => self.host.remove_container(),
            }
        }
    }
}

/// Cloneable input side of a [`Driver`]. This is what an Event Source holds.
pub struct DriverHandle<K, A = ()> {
    inputs: UnboundedSender<Input<K, A>>,
    lifetime: CancellationToken,
    epoch: Instant,
}

impl<K, A> Clone for DriverHandle<K, A> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            lifetime: self.lifetime.clone(),
            epoch: self.epoch,
        }
    }
}

impl<K, A> fmt::Debug for DriverHandle<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHandle")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<K, A> DriverHandle<K, A> {
    /// Milliseconds since the driver was created; the timestamp [`DriverHandle::dispatch`] uses.
    pub fn now(&self) -> Millis {
        elapsed_ms(self.epoch)
    }

    /// Deliver an interaction on `target`, stamped with the current time.
    pub fn dispatch(&self, kind: EventKind, target: K) -> Result<(), DriverError> {
        self.dispatch_event(InteractionEvent::new(kind, target, self.now()))
    }

    /// Deliver a fully formed interaction.
    pub fn dispatch_event(&self, event: InteractionEvent<K>) -> Result<(), DriverError> {
        self.send(Input::Event(event))
    }

    /// Request a visibility change after `delay`.
    pub fn request_visibility(&self, target: bool, delay: Duration) -> Result<(), DriverError> {
        let delay_ms = Millis::try_from(delay.as_millis()).unwrap_or(Millis::MAX);
        self.send(Input::Request { target, delay_ms })
    }

    /// Controlled mode: set the committed visibility.
    pub fn set_visible(&self, visible: bool) -> Result<(), DriverError> {
        self.send(Input::SetVisible(visible))
    }

    /// Forward an alignment report to the host's `on_align`.
    pub fn aligned(&self, overlay: K, alignment: A) -> Result<(), DriverError> {
        self.send(Input::Align { overlay, alignment })
    }

    /// Current committed visibility.
    pub async fn is_visible(&self) -> Result<bool, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send(Input::IsVisible(tx))?;
        rx.await.map_err(|_| DriverError::Closed)
    }

    /// Stop the driver. Pending work is abandoned.
    pub fn shutdown(&self) {
        self.lifetime.cancel();
    }

    /// Whether the driver has stopped or been asked to.
    pub fn is_closed(&self) -> bool {
        self.lifetime.is_cancelled() || self.inputs.is_closed()
    }

    fn send(&self, input: Input<K, A>) -> Result<(), DriverError> {
        if self.lifetime.is_cancelled() {
            return Err(DriverError::Closed);
        }
        self.inputs.send(input).map_err(|_| DriverError::Closed)
    }
}
