// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested click menus on the tokio driver.
//!
//! A menu holds the anchor of a submenu. The submenu's overlay is mounted at the document root,
//! but its parent lookup reports the submenu anchor, so pressing inside the submenu counts as
//! inside the menu too. Pressing on empty space closes both.
//!
//! Set `RUST_LOG=understory_trigger=debug` to watch the controllers decide.
//!
//! Run:
//! - `cargo run -p understory_trigger_demos --example trigger_nested_click`

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use kurbo::{Point, Rect};
use tracing_subscriber::EnvFilter;
use understory_trigger::config::TriggerOptions;
use understory_trigger::containment::{ParentLookup, TreeContainment};
use understory_trigger::controller::Controller;
use understory_trigger::types::EventKind;
use understory_trigger_driver::{Driver, Host, PointerDownSink, Subscription};

const BODY: u32 = 0;
const MENU_BUTTON: u32 = 1;
const MENU: u32 = 10;
const SUBMENU_ROW: u32 = 11;
const SUBMENU: u32 = 20;
const SUBMENU_ITEM: u32 = 21;

#[derive(Copy, Clone)]
struct Scene;

impl Scene {
    // Painted in order; the last hit wins.
    const NODES: [(u32, Rect); 6] = [
        (BODY, Rect::new(0.0, 0.0, 640.0, 480.0)),
        (MENU_BUTTON, Rect::new(10.0, 10.0, 90.0, 34.0)),
        (MENU, Rect::new(10.0, 36.0, 170.0, 200.0)),
        (SUBMENU_ROW, Rect::new(14.0, 40.0, 166.0, 64.0)),
        (SUBMENU, Rect::new(172.0, 40.0, 332.0, 160.0)),
        (SUBMENU_ITEM, Rect::new(176.0, 44.0, 328.0, 68.0)),
    ];

    fn hit(self, pt: Point) -> u32 {
        Self::NODES
            .iter()
            .rev()
            .find(|(_, r)| r.contains(pt))
            .map_or(BODY, |(id, _)| *id)
    }
}

impl ParentLookup<u32> for Scene {
    fn parent_of(&self, node: &u32) -> Option<u32> {
        match *node {
            MENU_BUTTON | MENU => Some(BODY),
            SUBMENU_ROW => Some(MENU),
            // Mounted at the root, attached to the row that opened it.
            SUBMENU => Some(SUBMENU_ROW),
            SUBMENU_ITEM => Some(SUBMENU),
            _ => None,
        }
    }
}

/// The document: routes pointer-down to whoever is listening.
struct Document {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, PointerDownSink<u32, ()>)>>,
}

impl Document {
    fn listen(self: &Rc<Self>, sink: PointerDownSink<u32, ()>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, sink));
        let doc = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(doc) = doc.upgrade() {
                doc.listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    fn pointer_down(&self, pt: Point) -> u32 {
        let target = Scene.hit(pt);
        let sinks: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for sink in sinks {
            // A stopped driver just misses the event.
            let _ = sink.pointer_down(target);
        }
        target
    }
}

struct PrintHost {
    name: &'static str,
    document: Rc<Document>,
    changes: Rc<RefCell<Vec<(&'static str, bool)>>>,
}

impl Host<u32> for PrintHost {
    type Document = Rc<Document>;
    type Alignment = ();

    fn document(&mut self) -> Rc<Document> {
        self.document.clone()
    }

    fn subscribe_pointer_down(
        &mut self,
        document: &Rc<Document>,
        sink: PointerDownSink<u32, ()>,
    ) -> Subscription {
        document.listen(sink)
    }

    fn on_visible_change(&mut self, visible: bool) {
        println!("{:>8}: visible = {visible}", self.name);
        self.changes.borrow_mut().push((self.name, visible));
    }
}

fn click_menu(anchor: u32, overlay: u32) -> Controller<u32, TreeContainment<u32, Scene>> {
    let options = TriggerOptions {
        action: vec!["click".into()],
        ..TriggerOptions::default()
    };
    Controller::new(
        options.resolve(),
        TreeContainment::new(Scene, anchor).with_overlay(overlay),
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let document = Rc::new(Document {
        next_id: Cell::new(0),
        listeners: RefCell::new(Vec::new()),
    });
    let changes = Rc::new(RefCell::new(Vec::new()));
    let host = |name| PrintHost {
        name,
        document: document.clone(),
        changes: changes.clone(),
    };

    let (menu, menu_handle) = Driver::new(click_menu(MENU_BUTTON, MENU), host("menu"));
    let (submenu, submenu_handle) =
        Driver::new(click_menu(SUBMENU_ROW, SUBMENU), host("submenu"));

    let script = async {
        let step = || tokio::time::sleep(Duration::from_millis(5));
        let click = |pt: Point| {
            let target = document.pointer_down(pt);
            println!("pressed node {target} at {pt:?}");
            let anchor = match target {
                MENU_BUTTON => &menu_handle,
                SUBMENU_ROW => &submenu_handle,
                _ => return,
            };
            let _ = anchor.dispatch(EventKind::MouseDown, target);
            let _ = anchor.dispatch(EventKind::Click, target);
        };

        click(Point::new(40.0, 20.0));
        step().await;
        click(Point::new(60.0, 50.0));
        step().await;
        click(Point::new(200.0, 50.0));
        step().await;
        click(Point::new(500.0, 400.0));
        step().await;

        menu_handle.shutdown();
        submenu_handle.shutdown();
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime");
    runtime.block_on(async {
        tokio::join!(menu.run(), submenu.run(), script);
    });

    // The two drivers close concurrently; compare each menu's own history.
    let changes = changes.borrow();
    let of = |name| {
        changes
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .collect::<Vec<_>>()
    };
    assert_eq!(of("menu"), vec![true, false]);
    assert_eq!(of("submenu"), vec![true, false]);
}
