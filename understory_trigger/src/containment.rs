// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Containment: is a pointer target inside the anchor, the overlay, or an overlay nested in it?
//!
//! ## Overview
//!
//! The controller never inspects a tree. It asks a host-supplied [`ContainmentQuery`].
//! Hosts with a parent-pointer tree can use [`TreeContainment`], which walks ancestors with a
//! [`ParentLookup`].
//!
//! ## Nested overlays
//!
//! A child overlay is "inside" its parent when walking up from the child's nodes reaches the
//! parent overlay's root. That holds when the child overlay is mounted under the parent's overlay,
//! or when the [`ParentLookup`] reports, for every overlay root mounted elsewhere, the node it is
//! logically attached to (its anchor). Either way the walk crosses any number of nesting levels, so
//! pressing inside a grandchild popup does not dismiss its ancestors.
//!
//! ```
//! use understory_trigger::containment::{ParentLookup, TreeContainment, is_outside};
//!
//! struct Parents;
//! impl ParentLookup<u32> for Parents {
//!     fn parent_of(&self, node: &u32) -> Option<u32> {
//!         match node {
//!             2 => Some(1),       // anchor 2 lives under body 1
//!             11 => Some(10),     // overlay 10 holds child anchor 11
//!             20 => Some(11),     // nested overlay 20 is attached to anchor 11
//!             21 => Some(20),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let tree = TreeContainment::new(Parents, 2).with_overlay(10);
//! assert!(!is_outside(&tree, &21).unwrap());
//! assert!(is_outside(&tree, &1).unwrap());
//! ```

use core::convert::Infallible;

/// Look up the parent of a node.
pub trait ParentLookup<K> {
    /// Returns the parent of `node`, or `None` if `node` is a root.
    fn parent_of(&self, node: &K) -> Option<K>;
}

/// Host capability that classifies nodes against the anchor and overlay subtrees.
pub trait ContainmentQuery<K> {
    /// Failure reported by the host.
    type Error: core::error::Error + 'static;

    /// Whether `node` lies within the anchor subtree.
    fn anchor_contains(&self, node: &K) -> Result<bool, Self::Error>;

    /// Whether `node` lies within the overlay subtree, nested overlays included.
    fn overlay_contains(&self, node: &K) -> Result<bool, Self::Error>;
}

/// Returns true only when `node` is in neither the anchor nor the overlay.
///
/// Errors propagate unchanged; failing to classify is never treated as "outside".
pub fn is_outside<K, C>(query: &C, node: &K) -> Result<bool, C::Error>
where
    C: ContainmentQuery<K> + ?Sized,
{
    if query.anchor_contains(node)? {
        return Ok(false);
    }
    Ok(!query.overlay_contains(node)?)
}

/// Ancestor-walk containment over a host tree.
#[derive(Clone, Debug)]
pub struct TreeContainment<K, P> {
    parents: P,
    anchor: K,
    overlay: Option<K>,
}

impl<K: Copy + Eq, P: ParentLookup<K>> TreeContainment<K, P> {
    /// Containment for `anchor`, with no overlay mounted yet.
    pub fn new(parents: P, anchor: K) -> Self {
        Self {
            parents,
            anchor,
            overlay: None,
        }
    }

    /// Set the overlay root.
    #[must_use]
    pub fn with_overlay(mut self, overlay: K) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Update the overlay root, e.g. after the host mounts or destroys it.
    pub fn set_overlay(&mut self, overlay: Option<K>) {
        self.overlay = overlay;
    }

    /// The overlay root, if mounted.
    pub fn overlay(&self) -> Option<K> {
        self.overlay
    }

    /// The anchor root.
    pub fn anchor(&self) -> K {
        self.anchor
    }

    /// Access the parent lookup.
    pub fn parents(&self) -> &P {
        &self.parents
    }

    /// Whether `node` is `root` or one of its descendants.
    pub fn is_within(&self, root: K, node: K) -> bool {
        // Caller ensures acyclic ancestry.
        let mut cur = node;
        loop {
            if cur == root {
                return true;
            }
            match self.parents.parent_of(&cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }
}

impl<K: Copy + Eq, P: ParentLookup<K>> ContainmentQuery<K> for TreeContainment<K, P> {
    type Error = Infallible;

    fn anchor_contains(&self, node: &K) -> Result<bool, Infallible> {
        Ok(self.is_within(self.anchor, *node))
    }

    fn overlay_contains(&self, node: &K) -> Result<bool, Infallible> {
        Ok(self.overlay.is_some_and(|root| self.is_within(root, *node)))
    }
}
