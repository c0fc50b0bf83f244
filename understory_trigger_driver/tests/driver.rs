// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end driver behavior on a paused clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tokio::time::sleep;
use understory_trigger::action::Triggers;
use understory_trigger::config::{TriggerConfig, TriggerOptions};
use understory_trigger::containment::{ContainmentQuery, ParentLookup, TreeContainment};
use understory_trigger::controller::Controller;
use understory_trigger::error::Veto;
use understory_trigger::types::{EventKind, InteractionEvent, Presentation};
use understory_trigger_driver::{
    Driver, DriverError, DriverHandle, Host, PointerDownSink, Subscription,
};

// body(1) ─ anchor(2)
//         ─ overlay(10) ─ child anchor(11)
//         ─ nested overlay(20), attached to 11 ─ item(21)
//         ─ elsewhere(40)
struct Parents;
impl ParentLookup<u32> for Parents {
    fn parent_of(&self, node: &u32) -> Option<u32> {
        match node {
            2 | 10 | 40 => Some(1),
            11 => Some(10),
            20 => Some(11),
            21 => Some(20),
            _ => None,
        }
    }
}

type Tree = TreeContainment<u32, Parents>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Placement {
    Above,
    Below,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Call {
    Gate(bool),
    Visible(bool),
    After(bool),
    Vetoed(String),
    Present(Presentation),
    Subscribe,
    Unsubscribe,
    Remove,
    Align(u32, Placement),
    Error(String),
}

#[derive(Copy, Clone, Debug, Default)]
enum GateMode {
    #[default]
    Approve,
    Never,
    Veto(&'static str),
    Delay(Duration),
}

#[derive(Default)]
struct Shared {
    log: Vec<Call>,
    gate: GateMode,
    show_delay: Option<Duration>,
    hide_delay: Option<Duration>,
    sink: Option<PointerDownSink<u32, Placement>>,
}

#[derive(Clone, Default)]
struct TestHost(Rc<RefCell<Shared>>);

impl TestHost {
    fn with_gate(gate: GateMode) -> Self {
        let host = Self::default();
        host.0.borrow_mut().gate = gate;
        host
    }

    fn log(&self) -> Vec<Call> {
        self.0.borrow().log.clone()
    }

    fn take_log(&self) -> Vec<Call> {
        core::mem::take(&mut self.0.borrow_mut().log)
    }

    fn push(&self, call: Call) {
        self.0.borrow_mut().log.push(call);
    }

    fn visible_changes(&self) -> Vec<bool> {
        self.log()
            .into_iter()
            .filter_map(|c| match c {
                Call::Visible(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn pointer_down(&self, target: u32) -> Result<(), DriverError> {
        let sink = self.0.borrow().sink.clone();
        sink.map_or(Ok(()), |s| s.pointer_down(target))
    }

    fn subscribed(&self) -> bool {
        self.0.borrow().sink.is_some()
    }
}

impl Host<u32> for TestHost {
    type Document = ();
    type Alignment = Placement;

    fn document(&mut self) {}

    fn subscribe_pointer_down(
        &mut self,
        _document: &(),
        sink: PointerDownSink<u32, Placement>,
    ) -> Subscription {
        self.push(Call::Subscribe);
        self.0.borrow_mut().sink = Some(sink);
        let shared = self.0.clone();
        Subscription::new(move || {
            let mut shared = shared.borrow_mut();
            shared.sink = None;
            shared.log.push(Call::Unsubscribe);
        })
    }

    fn before_visible_change(&mut self, target: bool) -> LocalBoxFuture<'static, Result<(), Veto>> {
        self.push(Call::Gate(target));
        match self.0.borrow().gate {
            GateMode::Approve => future::ready(Ok(())).boxed_local(),
            GateMode::Never => future::pending().boxed_local(),
            GateMode::Veto(reason) => future::ready(Err(Veto::new(reason))).boxed_local(),
            GateMode::Delay(d) => sleep(d).map(|()| Ok(())).boxed_local(),
        }
    }

    fn on_visible_change(&mut self, visible: bool) {
        self.push(Call::Visible(visible));
    }

    fn after_visible_change(&mut self, visible: bool) {
        self.push(Call::After(visible));
    }

    fn on_veto(&mut self, veto: &Veto) {
        self.push(Call::Vetoed(veto.reason.clone()));
    }

    fn on_align(&mut self, overlay: &u32, alignment: &Placement) {
        self.push(Call::Align(*overlay, *alignment));
    }

    fn present(&mut self, presentation: Presentation) -> LocalBoxFuture<'static, ()> {
        let delay = {
            let shared = self.0.borrow();
            if presentation.is_visible() {
                shared.show_delay
            } else {
                shared.hide_delay
            }
        };
        self.push(Call::Present(presentation));
        match delay {
            Some(d) => sleep(d).boxed_local(),
            None => future::ready(()).boxed_local(),
        }
    }

    fn remove_container(&mut self) {
        self.push(Call::Remove);
    }

    fn on_error(&mut self, error: &(dyn core::error::Error + 'static)) {
        self.push(Call::Error(error.to_string()));
    }
}

fn start<C: ContainmentQuery<u32>>(
    controller: Controller<u32, C>,
    host: &TestHost,
) -> (Driver<u32, C, TestHost>, DriverHandle<u32, Placement>) {
    let _ = tracing_subscriber::fmt::try_init();
    Driver::new(controller, host.clone())
}

fn tree_controller(config: TriggerConfig) -> Controller<u32, Tree> {
    Controller::new(config, TreeContainment::new(Parents, 2).with_overlay(10))
}

fn hover_config() -> TriggerConfig {
    let mut config = TriggerConfig::with_triggers(Triggers::for_action("hover"));
    config.delays.enter = 100;
    config.delays.leave = 150;
    config
}

fn click_config() -> TriggerConfig {
    TriggerConfig::with_triggers(Triggers::for_action("click"))
}

/// Let the driver drain its inputs and any ready futures without moving the clock.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn shown() -> Presentation {
    Presentation::Show {
        z_index: None,
        container_class: "understory-popup-container".into(),
    }
}

const HIDE: Presentation = Presentation::Hide { destroy: false };

#[tokio::test(start_paused = true)]
async fn hover_shows_after_enter_delay_and_stays_open_over_overlay() {
    let host = TestHost::default();
    let (driver, handle) = start(tree_controller(hover_config()), &host);

    let script = async {
        handle.dispatch(EventKind::MouseEnter, 2).unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(host.log().is_empty(), "nothing before the enter delay");

        sleep(Duration::from_millis(60)).await;
        assert_eq!(
            host.take_log(),
            vec![
                Call::Gate(true),
                Call::Visible(true),
                Call::Present(shown()),
                Call::Subscribe,
                Call::After(true),
            ]
        );

        // Leave the anchor, reach the overlay before the leave delay runs out.
        handle.dispatch(EventKind::MouseLeave, 2).unwrap();
        sleep(Duration::from_millis(50)).await;
        handle
            .dispatch_event(
                InteractionEvent::new(EventKind::OverlayMouseEnter, 10, handle.now())
                    .with_related(2),
            )
            .unwrap();
        sleep(Duration::from_millis(300)).await;
        assert!(handle.is_visible().await.unwrap());
        assert!(host.log().is_empty());

        handle
            .dispatch_event(
                InteractionEvent::new(EventKind::OverlayMouseLeave, 10, handle.now())
                    .with_related(40),
            )
            .unwrap();
        sleep(Duration::from_millis(140)).await;
        assert!(handle.is_visible().await.unwrap());
        sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_visible().await.unwrap());
        assert_eq!(
            host.take_log(),
            vec![
                Call::Gate(false),
                Call::Visible(false),
                Call::Present(HIDE),
                Call::Unsubscribe,
                Call::After(false),
            ]
        );
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn quick_enter_then_leave_never_shows() {
    let host = TestHost::default();
    let (driver, handle) = start(tree_controller(hover_config()), &host);

    let script = async {
        handle.dispatch(EventKind::MouseEnter, 2).unwrap();
        sleep(Duration::from_millis(40)).await;
        handle.dispatch(EventKind::MouseLeave, 2).unwrap();
        sleep(Duration::from_millis(500)).await;
        assert!(host.log().is_empty());
        assert!(!handle.is_visible().await.unwrap());
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn outside_pointer_down_dismisses_but_nested_overlay_does_not() {
    let host = TestHost::default();
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        settle().await;
        assert!(handle.is_visible().await.unwrap());
        assert!(host.subscribed());

        // Inside a popup nested two levels down.
        host.pointer_down(21).unwrap();
        settle().await;
        assert!(handle.is_visible().await.unwrap());

        host.pointer_down(40).unwrap();
        settle().await;
        assert!(!handle.is_visible().await.unwrap());
        assert!(!host.subscribed());
        assert_eq!(host.visible_changes(), vec![true, false]);
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn never_resolving_gate_leaves_driver_responsive() {
    let host = TestHost::with_gate(GateMode::Never);
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        sleep(Duration::from_secs(60)).await;
        assert!(!handle.is_visible().await.unwrap());
        handle.aligned(10, Placement::Below).unwrap();
        handle.aligned(10, Placement::Above).unwrap();
        settle().await;
        assert_eq!(
            host.log(),
            vec![
                Call::Gate(true),
                Call::Align(10, Placement::Below),
                Call::Align(10, Placement::Above),
            ]
        );
        handle.shutdown();
    };

    let (host_back, ()) = tokio::join!(driver.run(), script);
    assert_eq!(host_back.visible_changes(), Vec::<bool>::new());
}

#[tokio::test(start_paused = true)]
async fn vetoed_transition_is_reported_and_state_unchanged() {
    let host = TestHost::with_gate(GateMode::Veto("form has unsaved changes"));
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        settle().await;
        assert!(!handle.is_visible().await.unwrap());
        assert_eq!(
            host.log(),
            vec![
                Call::Gate(true),
                Call::Vetoed("form has unsaved changes".into()),
            ]
        );
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn superseded_gate_outcome_is_discarded() {
    let mut config = TriggerConfig::with_triggers(Triggers::for_action("hover"));
    config.delays.enter = 0;
    config.delays.leave = 0;
    let host = TestHost::with_gate(GateMode::Delay(Duration::from_millis(50)));
    let (driver, handle) = start(tree_controller(config), &host);

    let script = async {
        handle.dispatch(EventKind::MouseEnter, 2).unwrap();
        sleep(Duration::from_millis(10)).await;
        // Back to hidden before the show gate resolves.
        handle.dispatch(EventKind::MouseLeave, 2).unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_visible().await.unwrap());
        assert_eq!(host.log(), vec![Call::Gate(true)]);
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn after_change_waits_for_presentation() {
    let host = TestHost::default();
    host.0.borrow_mut().show_delay = Some(Duration::from_millis(30));
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(!host.log().contains(&Call::After(true)));
        sleep(Duration::from_millis(30)).await;
        assert_eq!(host.log().last(), Some(&Call::After(true)));
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn slow_show_finishing_after_fast_hide_is_not_reported() {
    let host = TestHost::default();
    {
        let mut shared = host.0.borrow_mut();
        shared.show_delay = Some(Duration::from_millis(100));
        shared.hide_delay = Some(Duration::from_millis(5));
    }
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        sleep(Duration::from_millis(10)).await;
        // The show is still presenting when the hide starts.
        handle.dispatch(EventKind::Click, 2).unwrap();
        sleep(Duration::from_millis(200)).await;

        assert!(!handle.is_visible().await.unwrap());
        let log = host.log();
        let after: Vec<_> = log
            .iter()
            .filter(|c| matches!(c, Call::After(_)))
            .cloned()
            .collect();
        assert_eq!(after, vec![Call::After(false)]);
        assert_eq!(log.last(), Some(&Call::After(false)));
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn class_prefix_reaches_the_presented_container() {
    let host = TestHost::default();
    let options = TriggerOptions {
        action: vec!["click".into()],
        class_prefix: "menu".into(),
        ..TriggerOptions::default()
    };
    let (driver, handle) = start(tree_controller(options.resolve()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        settle().await;
        assert!(host.log().contains(&Call::Present(Presentation::Show {
            z_index: None,
            container_class: "menu-popup-container".into(),
        })));
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_subscription_and_container() {
    let host = TestHost::default();
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        settle().await;
        assert!(host.subscribed());
        host.take_log();
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
    assert_eq!(host.log(), vec![Call::Unsubscribe, Call::Remove]);
    assert!(handle.is_closed());
    assert_eq!(handle.dispatch(EventKind::Click, 2), Err(DriverError::Closed));
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_driver() {
    let host = TestHost::default();
    let mut config = click_config();
    config.initial_visible = true;
    let (driver, handle) = start(tree_controller(config), &host);
    drop(handle);

    driver.run().await;
    assert_eq!(
        host.log(),
        vec![
            Call::Present(shown()),
            Call::Subscribe,
            Call::Unsubscribe,
            Call::Remove,
        ]
    );
    assert!(!host.subscribed());
}

#[derive(Debug, thiserror::Error)]
#[error("node was detached mid-query")]
struct Detached;

struct Flaky;
impl ContainmentQuery<u32> for Flaky {
    type Error = Detached;

    fn anchor_contains(&self, node: &u32) -> Result<bool, Detached> {
        Ok(*node == 2)
    }

    fn overlay_contains(&self, _node: &u32) -> Result<bool, Detached> {
        Err(Detached)
    }
}

#[tokio::test(start_paused = true)]
async fn containment_failure_reaches_on_error_and_changes_nothing() {
    let host = TestHost::default();
    let controller = Controller::new(click_config(), Flaky);
    let (driver, handle) = start(controller, &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        settle().await;
        host.take_log();
        host.pointer_down(40).unwrap();
        settle().await;
        assert!(handle.is_visible().await.unwrap());
        assert_eq!(
            host.log(),
            vec![Call::Error("containment query failed".into())]
        );
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn controlled_mode_waits_for_set_visible() {
    let host = TestHost::default();
    let mut config = click_config();
    config.controlled = true;
    let (driver, handle) = start(tree_controller(config), &host);

    let script = async {
        handle.dispatch(EventKind::Click, 2).unwrap();
        settle().await;
        assert_eq!(host.take_log(), vec![Call::Gate(true), Call::Visible(true)]);
        assert!(!handle.is_visible().await.unwrap());

        handle.set_visible(true).unwrap();
        settle().await;
        assert!(handle.is_visible().await.unwrap());
        assert_eq!(
            host.take_log(),
            vec![Call::Present(shown()), Call::Subscribe, Call::After(true)]
        );
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}

#[tokio::test(start_paused = true)]
async fn programmatic_request_honors_delay() {
    let host = TestHost::default();
    let (driver, handle) = start(tree_controller(click_config()), &host);

    let script = async {
        handle
            .request_visibility(true, Duration::from_millis(200))
            .unwrap();
        sleep(Duration::from_millis(199)).await;
        assert!(!handle.is_visible().await.unwrap());
        sleep(Duration::from_millis(2)).await;
        assert!(handle.is_visible().await.unwrap());
        handle.shutdown();
    };

    let (_, ()) = tokio::join!(driver.run(), script);
}
