//! The pose (ie, position and orientation) of a camera.

use crate::coordinate_systems::View;
use crate::math::Rotation;
use crate::{Coordinate, Vector};
use std::fmt;
use std::fmt::{Display, Formatter};
use uom::si::f64::Length;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Defines the pose of a camera in the coordinate system `In`.
///
/// The orientation is the rotation whose columns are the camera's right, up, and back axes
/// expressed in `In`. The camera looks along its negative back axis, which [`Pose::forward`]
/// returns.
///
/// <div class="warning">
///
/// When deserializing, the coordinate system of the deserialized value is _not_ checked, so this
/// is a foot-gun to be mindful of.
///
/// </div>
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
// don't require In: Serialize/Deserialize since we skip it anyway
#[cfg_attr(feature = "serde", serde(bound = ""))]
pub struct Pose<In> {
    position: Coordinate<In>,
    orientation: Rotation<In, View>,
}

// manual impls of Clone and Copy to avoid requiring In: Copy + Clone
impl<In> Clone for Pose<In> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<In> Copy for Pose<In> {}

impl<In> PartialEq<Self> for Pose<In> {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.orientation == other.orientation
    }
}

impl<In> Default for Pose<In> {
    fn default() -> Self {
        Self::new(Coordinate::default(), Rotation::default())
    }
}

impl<In> Display for Pose<In> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {} looking {} (up {})",
            self.position,
            self.forward(),
            self.up()
        )
    }
}

impl<In> Pose<In> {
    /// Constructs a pose from a position and orientation.
    #[must_use]
    pub fn new(position: Coordinate<In>, orientation: Rotation<In, View>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    #[must_use]
    pub fn position(&self) -> Coordinate<In> {
        self.position
    }

    #[must_use]
    pub fn orientation(&self) -> Rotation<In, View> {
        self.orientation
    }

    /// Returns the distance from the origin to the camera.
    #[must_use]
    pub fn distance_from_origin(&self) -> Length {
        self.position.distance_from_origin()
    }

    /// The unit vector the camera looks along.
    #[must_use]
    pub fn forward(&self) -> Vector<In> {
        -self.back()
    }

    /// The unit vector pointing to the right on screen.
    #[must_use]
    pub fn right(&self) -> Vector<In> {
        self.orientation.basis().0
    }

    /// The unit vector pointing up on screen.
    #[must_use]
    pub fn up(&self) -> Vector<In> {
        self.orientation.basis().1
    }

    /// The unit vector pointing out of the screen, towards the viewer.
    #[must_use]
    pub fn back(&self) -> Vector<In> {
        self.orientation.basis().2
    }

    /// Expresses a point given relative to the camera in `In`.
    #[must_use]
    pub fn to_world(&self, in_view: Coordinate<View>) -> Coordinate<In> {
        self.position + Vector::from(self.orientation * in_view)
    }

    /// Expresses a point in `In` relative to the camera.
    #[must_use]
    pub fn to_view(&self, in_world: Coordinate<In>) -> Coordinate<View> {
        Coordinate::origin() + (in_world - self.position) * self.orientation
    }

    /// The camera's world matrix: its orientation with the position as translation.
    #[must_use]
    pub fn world_matrix(&self) -> nalgebra::Matrix4<f64> {
        let mut m = self.orientation.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.position.point.coords);
        m
    }

    /// Moves the camera by `offset` without changing where it looks.
    #[must_use]
    pub fn translated(&self, offset: Vector<In>) -> Self {
        Self {
            position: self.position + offset,
            orientation: self.orientation,
        }
    }

    /// Applies `rotation` to the camera around `pivot`.
    ///
    /// Both the position (relative to `pivot`) and the orientation are premultiplied by the same
    /// rotation, so the camera's pose relative to the pivot is unchanged.
    #[must_use]
    pub fn rotated_about(&self, pivot: Coordinate<In>, rotation: Rotation<In, In>) -> Self {
        Self {
            position: pivot + rotation * (self.position - pivot),
            orientation: rotation * self.orientation,
        }
    }

    /// Returns the same pose with a re-orthonormalized orientation.
    #[must_use]
    pub fn renormalized(&self) -> Self {
        Self {
            position: self.position,
            orientation: self.orientation.renormalized(),
        }
    }

    /// Returns `true` if the position and orientation are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

#[cfg(any(test, feature = "approx"))]
impl<In> AbsDiffEq<Self> for Pose<In> {
    type Epsilon = (<Coordinate<In> as AbsDiffEq>::Epsilon, f64);

    fn default_epsilon() -> Self::Epsilon {
        (
            Coordinate::<In>::default_epsilon(),
            Rotation::<In, View>::default_epsilon(),
        )
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.position.abs_diff_eq(&other.position, epsilon.0)
            && self.orientation.abs_diff_eq(&other.orientation, epsilon.1)
    }
}

#[cfg(any(test, feature = "approx"))]
impl<In> RelativeEq for Pose<In> {
    fn default_max_relative() -> Self::Epsilon {
        (
            Coordinate::<In>::default_max_relative(),
            Rotation::<In, View>::default_max_relative(),
        )
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.position
            .relative_eq(&other.position, epsilon.0, max_relative.0)
            && self
                .orientation
                .relative_eq(&other.orientation, epsilon.1, max_relative.1)
    }
}
