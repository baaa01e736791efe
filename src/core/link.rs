//! Serial chains of planar rotational links.
//!
//! A chain is stored as a linear arena: the link at index `d` has depth `d`, its
//! parent is `d - 1` and its child is `d + 1`. Relations are index arithmetic, so a
//! chain can never branch or form a cycle.
//!
//! ```text
//!   root (depth 0) ── child (depth 1) ── ... ── end (depth n-1) ──▶ end effector (1, 0)
//! ```
//!
//! Each link carries a fixed local offset relative to its parent frame and a free
//! angle. The end effector sits one unit along the local x axis of the deepest link
//! taking part in an evaluation.

use crate::core::{CoreError, CoreResult};
use crate::kinematics;
use nalgebra::{DVector, Vector2};
use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// One rotational joint of a serial chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Joint angle in radians
    angle: f64,
    /// Offset of this joint in the parent frame
    position: Vector2<f64>,
    /// Distance from the root (root = 0)
    depth: usize,
}

impl Link {
    fn new(position: Vector2<f64>, depth: usize) -> Self {
        Self {
            angle: 0.0,
            position,
            depth,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn position(&self) -> Vector2<f64> {
        self.position
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Link(depth: {}, angle: {:.4}, position: [{:.4}, {:.4}])",
            self.depth, self.angle, self.position.x, self.position.y
        )
    }
}

/// A serial chain of links ordered from the root to the deepest link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkChain {
    links: Vec<Link>,
}

impl LinkChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    /// Build a straight chain of `count` links at rest.
    ///
    /// The root sits at the origin and every further link is offset by
    /// `(spacing, 0)` from its parent, matching a chain of unit bars when
    /// `spacing` is 1.
    pub fn serial(count: usize, spacing: f64) -> Self {
        let mut chain = Self::new();
        for i in 0..count {
            let offset = if i == 0 { 0.0 } else { spacing };
            chain.push(Vector2::new(offset, 0.0));
        }
        chain
    }

    /// Append a link below the current end and return its depth.
    pub fn push(&mut self, position: Vector2<f64>) -> usize {
        let depth = self.links.len();
        self.links.push(Link::new(position, depth));
        depth
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, depth: usize) -> CoreResult<&Link> {
        self.links.get(depth).ok_or(CoreError::LinkOutOfRange {
            depth,
            len: self.links.len(),
        })
    }

    fn link_mut(&mut self, depth: usize) -> CoreResult<&mut Link> {
        let len = self.links.len();
        self.links
            .get_mut(depth)
            .ok_or(CoreError::LinkOutOfRange { depth, len })
    }

    pub fn angle(&self, depth: usize) -> CoreResult<f64> {
        Ok(self.link(depth)?.angle)
    }

    pub fn set_angle(&mut self, depth: usize, angle: f64) -> CoreResult<()> {
        self.link_mut(depth)?.angle = angle;
        Ok(())
    }

    pub fn position(&self, depth: usize) -> CoreResult<Vector2<f64>> {
        Ok(self.link(depth)?.position)
    }

    pub fn set_position(&mut self, depth: usize, position: Vector2<f64>) -> CoreResult<()> {
        self.link_mut(depth)?.position = position;
        Ok(())
    }

    /// Depth of the parent link, `None` for the root.
    pub fn parent(&self, depth: usize) -> CoreResult<Option<usize>> {
        self.link(depth)?;
        Ok(depth.checked_sub(1))
    }

    /// Depth of the child link, `None` for the deepest link.
    pub fn child(&self, depth: usize) -> CoreResult<Option<usize>> {
        self.link(depth)?;
        Ok(Some(depth + 1).filter(|&child| child < self.links.len()))
    }

    pub fn root(&self) -> Option<&Link> {
        self.links.first()
    }

    pub fn end(&self) -> Option<&Link> {
        self.links.last()
    }

    /// All joint angles ordered from the root to the deepest link.
    pub fn angles(&self) -> DVector<f64> {
        DVector::from_iterator(self.links.len(), self.links.iter().map(|l| l.angle))
    }

    /// Write `angles` onto links `0..angles.len()`.
    ///
    /// Angles are assigned back to front: the last entry goes to the deepest
    /// affected link, then each parent in turn.
    pub fn set_angles(&mut self, angles: &DVector<f64>) -> CoreResult<()> {
        if angles.len() > self.links.len() {
            return Err(CoreError::DimensionMismatch(format!(
                "{} angles for a chain of {} links",
                angles.len(),
                self.links.len()
            )));
        }
        for (depth, &angle) in angles.iter().enumerate().rev() {
            self.links[depth].angle = angle;
        }
        Ok(())
    }

    /// Put every joint back to its rest angle.
    pub fn reset_angles(&mut self) {
        for link in &mut self.links {
            link.angle = 0.0;
        }
    }

    /// Rotate every joint by `delta` radians.
    pub fn increment_angles(&mut self, delta: f64) {
        for link in &mut self.links {
            link.angle += delta;
        }
    }

    /// World position of the end effector attached to the link at `depth`.
    pub fn end_effector(&self, depth: usize) -> CoreResult<Vector2<f64>> {
        kinematics::forward_kinematics(self, depth)
    }
}

impl Display for LinkChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "LinkChain({} links)", self.links.len())?;
        for link in &self.links {
            writeln!(f, "  {link}")?;
        }
        Ok(())
    }
}
