// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trigger configuration.
//!
//! [`TriggerOptions`] mirrors the option surface hosts already speak (camelCase names, delays in
//! seconds) and can be deserialized with `serde`. [`TriggerOptions::resolve`] turns it into the
//! immutable [`TriggerConfig`] the controller uses, with capabilities resolved and delays in
//! milliseconds.
//!
//! ```
//! use understory_trigger::config::TriggerOptions;
//!
//! let config = TriggerOptions {
//!     action: vec!["hover".into()],
//!     mouse_leave_delay_in_sec: 0.25,
//!     ..TriggerOptions::default()
//! }
//! .resolve();
//! assert_eq!(config.delays.leave, 250);
//! ```

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Deserializer};

use crate::action::Triggers;
use crate::types::{EventKind, Millis};

/// Option surface accepted from the host.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerOptions {
    /// Prefix for generated class names.
    pub class_prefix: String,
    /// `click`, `hover`, and/or `focus`.
    #[serde(deserialize_with = "one_or_many")]
    pub action: Vec<String>,
    /// `click`, `mouseEnter`, and/or `focus`.
    #[serde(deserialize_with = "one_or_many")]
    pub show_action: Vec<String>,
    /// `click`, `mouseLeave`, and/or `blur`.
    #[serde(deserialize_with = "one_or_many")]
    pub hide_action: Vec<String>,
    /// Drop overlay content when hidden.
    pub destroy_popup_on_hide: bool,
    /// Delay before a mouse-enter shows the overlay.
    pub mouse_enter_delay_in_sec: f64,
    /// Delay before a mouse-leave hides the overlay.
    pub mouse_leave_delay_in_sec: f64,
    /// Delay before a focus shows the overlay.
    pub focus_delay_in_sec: f64,
    /// Delay before a blur hides the overlay.
    pub blur_delay_in_sec: f64,
    /// Stacking override for the overlay container.
    pub z_index: Option<i32>,
    /// Render a mask behind the overlay.
    pub has_mask: bool,
    /// Whether pressing on the mask dismisses the overlay.
    pub mask_closable: bool,
    /// Initial visibility when uncontrolled.
    pub default_visible: bool,
    /// Controlled visibility. When set, the host owns the committed state.
    pub visible: Option<bool>,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self {
            class_prefix: String::from("understory"),
            action: Vec::new(),
            show_action: Vec::new(),
            hide_action: Vec::new(),
            destroy_popup_on_hide: false,
            mouse_enter_delay_in_sec: 0.0,
            mouse_leave_delay_in_sec: 0.1,
            focus_delay_in_sec: 0.0,
            blur_delay_in_sec: 0.15,
            z_index: None,
            has_mask: false,
            mask_closable: true,
            default_visible: false,
            visible: None,
        }
    }
}

impl TriggerOptions {
    /// Resolve options into an immutable configuration.
    pub fn resolve(&self) -> TriggerConfig {
        TriggerConfig {
            triggers: Triggers::from_lists(&self.action, &self.show_action, &self.hide_action),
            delays: Delays {
                enter: secs_to_ms(self.mouse_enter_delay_in_sec),
                leave: secs_to_ms(self.mouse_leave_delay_in_sec),
                focus: secs_to_ms(self.focus_delay_in_sec),
                blur: secs_to_ms(self.blur_delay_in_sec),
            },
            destroy_on_hide: self.destroy_popup_on_hide,
            has_mask: self.has_mask,
            mask_closable: self.mask_closable,
            z_index: self.z_index,
            container_class: format!("{}-popup-container", self.class_prefix),
            initial_visible: self.visible.unwrap_or(self.default_visible),
            controlled: self.visible.is_some(),
        }
    }
}

/// Per-event delays in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Delays {
    /// Mouse-enter to show.
    pub enter: Millis,
    /// Mouse-leave to hide.
    pub leave: Millis,
    /// Focus to show.
    pub focus: Millis,
    /// Blur to hide.
    pub blur: Millis,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            enter: 0,
            leave: 100,
            focus: 0,
            blur: 150,
        }
    }
}

/// Immutable configuration for one anchor/overlay pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Resolved show/hide capabilities.
    pub triggers: Triggers,
    /// Transition delays.
    pub delays: Delays,
    /// Drop overlay content when hidden.
    pub destroy_on_hide: bool,
    /// A mask is rendered behind the overlay.
    pub has_mask: bool,
    /// Pressing on the mask dismisses the overlay.
    pub mask_closable: bool,
    /// Stacking override carried to [`Presentation::Show`](crate::types::Presentation::Show).
    pub z_index: Option<i32>,
    /// Class name for the overlay container.
    pub container_class: String,
    /// Committed visibility at construction.
    pub initial_visible: bool,
    /// The host owns the committed state.
    pub controlled: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerOptions::default().resolve()
    }
}

impl TriggerConfig {
    /// Configuration with the given capabilities and default everything else.
    pub fn with_triggers(triggers: Triggers) -> Self {
        Self {
            triggers,
            ..Self::default()
        }
    }

    /// Delay to apply to the intent produced by `kind`.
    ///
    /// Clicks and outside dismissal are never delayed.
    pub fn delay_for(&self, kind: EventKind) -> Millis {
        match kind {
            EventKind::MouseEnter | EventKind::OverlayMouseEnter => self.delays.enter,
            EventKind::MouseLeave | EventKind::OverlayMouseLeave => self.delays.leave,
            EventKind::Focus => self.delays.focus,
            EventKind::Blur => self.delays.blur,
            _ => 0,
        }
    }

    /// Whether a document pointer-down may dismiss the overlay.
    pub fn outside_dismissable(&self) -> bool {
        !(self.has_mask && !self.mask_closable)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the value is finite, non-negative, and saturates on overflow"
)]
fn secs_to_ms(secs: f64) -> Millis {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0 + 0.5) as Millis
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => alloc::vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_delays() {
        let config = TriggerConfig::default();
        assert_eq!(config.delays, Delays::default());
        assert!(config.triggers.is_empty());
        assert!(config.mask_closable);
        assert!(!config.controlled);
        assert_eq!(config.container_class, "understory-popup-container");
    }

    #[test]
    fn seconds_convert_to_milliseconds() {
        assert_eq!(secs_to_ms(0.1), 100);
        assert_eq!(secs_to_ms(0.15), 150);
        assert_eq!(secs_to_ms(1.0), 1000);
        assert_eq!(secs_to_ms(0.0004), 0);
    }

    #[test]
    fn invalid_delays_resolve_to_zero() {
        assert_eq!(secs_to_ms(-1.0), 0);
        assert_eq!(secs_to_ms(f64::NAN), 0);
        assert_eq!(secs_to_ms(f64::INFINITY), 0);
    }

    #[test]
    fn deserializes_single_string_and_lists() {
        let opts: TriggerOptions = serde_json::from_str(
            r#"{
                "action": "hover",
                "showAction": ["focus"],
                "hideAction": "blur",
                "mouseLeaveDelayInSec": 0.3,
                "hasMask": true,
                "maskClosable": false,
                "zIndex": 20,
                "classPrefix": "erp"
            }"#,
        )
        .unwrap();
        assert_eq!(opts.action, ["hover"]);
        assert_eq!(opts.show_action, ["focus"]);
        assert_eq!(opts.hide_action, ["blur"]);

        let config = opts.resolve();
        assert!(config.triggers.contains(Triggers::MOUSE_ENTER_TO_SHOW | Triggers::FOCUS_TO_SHOW));
        assert_eq!(config.delays.leave, 300);
        // Unspecified delays keep their defaults.
        assert_eq!(config.delays.blur, 150);
        assert!(!config.outside_dismissable());
        assert_eq!(config.z_index, Some(20));
        assert_eq!(config.container_class, "erp-popup-container");
    }

    #[test]
    fn controlled_visible_overrides_default() {
        let opts: TriggerOptions =
            serde_json::from_str(r#"{ "visible": true, "defaultVisible": false }"#).unwrap();
        let config = opts.resolve();
        assert!(config.controlled);
        assert!(config.initial_visible);
    }

    #[test]
    fn delay_for_event_kinds() {
        let config = TriggerConfig::default();
        assert_eq!(config.delay_for(EventKind::MouseEnter), 0);
        assert_eq!(config.delay_for(EventKind::MouseLeave), 100);
        assert_eq!(config.delay_for(EventKind::OverlayMouseLeave), 100);
        assert_eq!(config.delay_for(EventKind::Blur), 150);
        assert_eq!(config.delay_for(EventKind::Click), 0);
        assert_eq!(config.delay_for(EventKind::DocumentPointerDown), 0);
    }
}
