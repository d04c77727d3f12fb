use crate::{Coordinate, Vector};
use uom::si::f64::Length;

/// A half-line starting at `origin` and extending along a unit-length `direction`.
///
/// Because the direction always has unit length, distances along a ray (eg, as reported by
/// [`Ellipsoid::intersect`](crate::Ellipsoid::intersect)) are in meters.
#[derive(Debug)]
pub struct Ray<In> {
    origin: Coordinate<In>,
    direction: Vector<In>,
}

// manual impls of Clone and Copy to avoid requiring In: Copy + Clone
impl<In> Clone for Ray<In> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<In> Copy for Ray<In> {}

impl<In> PartialEq for Ray<In> {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.direction == other.direction
    }
}

impl<In> Ray<In> {
    /// Constructs a ray from an origin and a direction of any (non-zero) length.
    ///
    /// Returns `None` if `direction` has no usable direction (zero length or non-finite).
    #[must_use]
    pub fn new(origin: Coordinate<In>, direction: Vector<In>) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.try_normalized()?,
        })
    }

    /// Constructs the ray from `origin` that passes through `through`.
    #[must_use]
    pub fn between(origin: Coordinate<In>, through: Coordinate<In>) -> Option<Self> {
        Self::new(origin, through - origin)
    }

    #[must_use]
    pub fn origin(&self) -> Coordinate<In> {
        self.origin
    }

    /// The unit-length direction of the ray.
    #[must_use]
    pub fn direction(&self) -> Vector<In> {
        self.direction
    }

    /// Returns the point at the given distance along the ray.
    #[must_use]
    pub fn at(&self, distance: impl Into<Length>) -> Coordinate<In> {
        self.origin + self.direction * distance.into()
    }
}
