//! Per-frame rotation parameters owned by the application shell.

use cgmath::{InnerSpace, Rad, Vector3};

use crate::error::RenderError;

/// Below this length an axis cannot be normalized reliably.
const AXIS_EPSILON: f32 = 1e-6;

/// A non-zero rotation axis, stored normalized.
///
/// The axis may be given with any length; rotation speed only depends on the
/// angle increment, never on the axis length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationAxis(Vector3<f32>);

impl RotationAxis {
    pub fn new(axis: Vector3<f32>) -> Result<Self, RenderError> {
        let len = axis.magnitude();
        if !len.is_finite() || len < AXIS_EPSILON {
            return Err(RenderError::ZeroAxis);
        }
        Ok(Self(axis / len))
    }

    pub fn unit(&self) -> Vector3<f32> {
        self.0
    }
}

/// Constant rotation increment plus the externally togglable freeze flag.
///
/// The increment is applied once per frame regardless of elapsed time, so the
/// animation speed follows the display refresh rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    increment: Rad<f32>,
    axis: RotationAxis,
    frozen: bool,
}

impl AnimationState {
    pub fn new(increment: impl Into<Rad<f32>>, axis: RotationAxis) -> Self {
        Self {
            increment: increment.into(),
            axis,
            frozen: false,
        }
    }

    pub fn increment(&self) -> Rad<f32> {
        self.increment
    }

    pub fn axis(&self) -> RotationAxis {
        self.axis
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Flip the freeze flag and return the new value.
    pub fn toggle_freeze(&mut self) -> bool {
        self.frozen = !self.frozen;
        log::info!("rotation {}", if self.frozen { "frozen" } else { "resumed" });
        self.frozen
    }
}
