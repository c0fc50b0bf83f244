// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover menu, driven by hand.
//!
//! Hit-tests pointer positions against a few rectangles, turns the transitions into
//! interactions, and executes the controller's commands with a simulated clock.
//! No runtime is involved: timers are kept in a local slot and fired when the clock passes them.
//!
//! Run:
//! - `cargo run -p understory_trigger_demos --example trigger_hover_menu`

use kurbo::{Point, Rect};
use understory_trigger::config::TriggerOptions;
use understory_trigger::containment::{ParentLookup, TreeContainment};
use understory_trigger::controller::Controller;
use understory_trigger::types::{Command, EventKind, InteractionEvent, Millis, TimerToken};

const BODY: u32 = 0;
const BUTTON: u32 = 1;
const MENU: u32 = 2;
const ITEM: u32 = 3;

struct Scene {
    nodes: Vec<(u32, Option<u32>, Rect)>,
}

impl Scene {
    fn new() -> Self {
        Self {
            nodes: vec![
                (BODY, None, Rect::new(0.0, 0.0, 400.0, 300.0)),
                (BUTTON, Some(BODY), Rect::new(20.0, 20.0, 100.0, 44.0)),
                (MENU, Some(BODY), Rect::new(20.0, 48.0, 160.0, 140.0)),
                (ITEM, Some(MENU), Rect::new(24.0, 52.0, 156.0, 76.0)),
            ],
        }
    }

    /// Topmost node under `pt`; later nodes paint above earlier ones.
    fn hit(&self, pt: Point, menu_shown: bool) -> u32 {
        self.nodes
            .iter()
            .rev()
            .filter(|(id, _, _)| menu_shown || !matches!(*id, MENU | ITEM))
            .find(|(_, _, r)| r.contains(pt))
            .map_or(BODY, |(id, _, _)| *id)
    }
}

impl ParentLookup<u32> for &Scene {
    fn parent_of(&self, node: &u32) -> Option<u32> {
        self.nodes
            .iter()
            .find(|(id, _, _)| id == node)
            .and_then(|(_, parent, _)| *parent)
    }
}

/// Which subtree the pointer is over: the anchor, the overlay, or neither.
fn region(parents: &TreeContainment<u32, &Scene>, node: u32) -> Option<u32> {
    if parents.is_within(BUTTON, node) {
        Some(BUTTON)
    } else if parents.is_within(MENU, node) {
        Some(MENU)
    } else {
        None
    }
}

fn main() {
    let scene = Scene::new();
    let options = TriggerOptions {
        action: vec!["hover".into()],
        ..TriggerOptions::default()
    };
    let mut controller = Controller::new(
        options.resolve(),
        TreeContainment::new(&scene, BUTTON).with_overlay(MENU),
    );

    let mut timer: Option<(TimerToken, Millis)> = None;
    let mut previous: Option<u32> = None;
    let mut shown = Vec::new();

    // (time, position)
    let path = [
        (0, Point::new(200.0, 200.0)),
        (10, Point::new(50.0, 30.0)), // onto the button
        (30, Point::new(50.0, 46.0)), // gap between button and menu
        (60, Point::new(60.0, 60.0)), // onto the first item
        (400, Point::new(300.0, 250.0)), // away
        (700, Point::new(300.0, 250.0)),
    ];

    for (now, pt) in path {
        // Fire the timer if the clock passed it.
        if let Some((token, due)) = timer
            && due <= now
        {
            timer = None;
            let cmds = controller.timer_fired(token);
            execute(&mut controller, cmds, due, &mut timer, &mut shown);
        }

        let hit = scene.hit(pt, controller.is_visible());
        let here = region(controller.containment(), hit);
        if here == previous {
            continue;
        }
        let mut events = Vec::new();
        match previous {
            Some(BUTTON) => events.push(InteractionEvent::new(EventKind::MouseLeave, BUTTON, now)),
            Some(MENU) => events.push(
                InteractionEvent::new(EventKind::OverlayMouseLeave, MENU, now).with_related(hit),
            ),
            _ => {}
        }
        let enter = match here {
            Some(BUTTON) => Some(EventKind::MouseEnter),
            Some(MENU) => Some(EventKind::OverlayMouseEnter),
            _ => None,
        };
        if let (Some(kind), Some(node)) = (enter, here) {
            events.push(InteractionEvent::new(kind, node, now));
        }
        previous = here;
        for event in events {
            println!("t={now:>3} {:?} on {}", event.kind, event.target);
            let cmds = controller
                .handle_interaction(&event)
                .expect("tree containment cannot fail");
            execute(&mut controller, cmds, now, &mut timer, &mut shown);
        }
    }

    println!("visibility changes: {shown:?}");
    assert_eq!(shown, vec![true, false]);
    assert!(!controller.is_visible());
}

/// A host that always passes the gate and presents instantly.
fn execute(
    controller: &mut Controller<u32, TreeContainment<u32, &Scene>>,
    cmds: Vec<Command>,
    now: Millis,
    timer: &mut Option<(TimerToken, Millis)>,
    shown: &mut Vec<bool>,
) {
    let mut queue = std::collections::VecDeque::from(cmds);
    while let Some(cmd) = queue.pop_front() {
        println!("      -> {cmd:?}");
        match cmd {
            Command::ArmTimer { token, delay_ms } => *timer = Some((token, now + delay_ms)),
            Command::CancelTimer { .. } => *timer = None,
            Command::RequestGate { ticket, .. } => {
                queue.extend(controller.resolve_gate(ticket, Ok(())));
            }
            Command::VisibleChanged(visible) => shown.push(visible),
            Command::Present { token, .. } => queue.extend(controller.overlay_settled(token)),
            _ => {}
        }
    }
}
