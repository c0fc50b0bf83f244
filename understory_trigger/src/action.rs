// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Action model: which interactions may show or hide the overlay.
//!
//! ## Overview
//!
//! Three option lists feed the model:
//!
//! - `action`: `click`, `hover`, or `focus`; each enables both directions of its primitive.
//! - `showAction`: `click`, `mouseEnter`, or `focus`.
//! - `hideAction`: `click`, `mouseLeave`, or `blur`.
//!
//! Membership is purely additive. A capability is active if any list enables it, and no
//! combination disables another. Unknown names (and the empty string) are inert.
//!
//! ```
//! use understory_trigger::action::Triggers;
//! use understory_trigger::types::EventKind;
//!
//! let t = Triggers::from_lists(&["hover"], &["click"], &[] as &[&str]);
//! assert!(t.should_show_on(EventKind::MouseEnter));
//! assert!(t.should_show_on(EventKind::Click));
//! // `showAction: click` alone never hides on click.
//! assert!(!t.should_hide_on(EventKind::Click));
//! ```

use bitflags::bitflags;

use crate::types::EventKind;

bitflags! {
    /// Resolved trigger capabilities.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Triggers: u8 {
        /// Click on the anchor shows the overlay.
        const CLICK_TO_SHOW = 1 << 0;
        /// Click on the anchor hides the overlay.
        const CLICK_TO_HIDE = 1 << 1;
        /// Pointer entering the anchor shows the overlay.
        const MOUSE_ENTER_TO_SHOW = 1 << 2;
        /// Pointer leaving the anchor hides the overlay.
        const MOUSE_LEAVE_TO_HIDE = 1 << 3;
        /// Anchor focus shows the overlay.
        const FOCUS_TO_SHOW = 1 << 4;
        /// Anchor blur hides the overlay.
        const BLUR_TO_HIDE = 1 << 5;
    }
}

impl Triggers {
    /// Capabilities enabled by one `action` entry.
    pub fn for_action(name: &str) -> Self {
        match name {
            "click" => Self::CLICK_TO_SHOW | Self::CLICK_TO_HIDE,
            "hover" => Self::MOUSE_ENTER_TO_SHOW | Self::MOUSE_LEAVE_TO_HIDE,
            "focus" => Self::FOCUS_TO_SHOW | Self::BLUR_TO_HIDE,
            _ => Self::inert("action", name),
        }
    }

    /// Capabilities enabled by one `showAction` entry.
    pub fn for_show_action(name: &str) -> Self {
        match name {
            "click" => Self::CLICK_TO_SHOW,
            "mouseEnter" => Self::MOUSE_ENTER_TO_SHOW,
            "focus" => Self::FOCUS_TO_SHOW,
            _ => Self::inert("showAction", name),
        }
    }

    /// Capabilities enabled by one `hideAction` entry.
    pub fn for_hide_action(name: &str) -> Self {
        match name {
            "click" => Self::CLICK_TO_HIDE,
            "mouseLeave" => Self::MOUSE_LEAVE_TO_HIDE,
            "blur" => Self::BLUR_TO_HIDE,
            _ => Self::inert("hideAction", name),
        }
    }

    fn inert(list: &str, name: &str) -> Self {
        if !name.is_empty() {
            tracing::debug!(list, name, "ignoring unrecognized trigger action");
        }
        Self::empty()
    }

    /// Union of the capabilities named by all three lists.
    pub fn from_lists<A, S, H>(action: &[A], show: &[S], hide: &[H]) -> Self
    where
        A: AsRef<str>,
        S: AsRef<str>,
        H: AsRef<str>,
    {
        let mut out = Self::empty();
        for a in action {
            out |= Self::for_action(a.as_ref());
        }
        for s in show {
            out |= Self::for_show_action(s.as_ref());
        }
        for h in hide {
            out |= Self::for_hide_action(h.as_ref());
        }
        out
    }

    /// Whether an interaction of `kind` may show the overlay.
    pub fn should_show_on(self, kind: EventKind) -> bool {
        match kind {
            EventKind::Click => self.contains(Self::CLICK_TO_SHOW),
            EventKind::MouseEnter | EventKind::OverlayMouseEnter => {
                self.contains(Self::MOUSE_ENTER_TO_SHOW)
            }
            EventKind::Focus => self.contains(Self::FOCUS_TO_SHOW),
            _ => false,
        }
    }

    /// Whether an interaction of `kind` may hide the overlay.
    ///
    /// Document pointer-down is not covered here; outside dismissal is governed by the mask options.
    pub fn should_hide_on(self, kind: EventKind) -> bool {
        match kind {
            EventKind::Click => self.contains(Self::CLICK_TO_HIDE),
            EventKind::MouseLeave | EventKind::OverlayMouseLeave => {
                self.contains(Self::MOUSE_LEAVE_TO_HIDE)
            }
            EventKind::Blur => self.contains(Self::BLUR_TO_HIDE),
            _ => false,
        }
    }

    /// Whether clicks on the anchor are handled at all.
    pub fn handles_click(self) -> bool {
        self.intersects(Self::CLICK_TO_SHOW | Self::CLICK_TO_HIDE)
    }
}
