use crate::coordinate_systems::{
    CoordinateSystem, HasComponents, NedLike, RightHandedXyzLike, ViewLike,
};
use crate::{Coordinate, Vector3};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Defines a vector (ie, direction with magnitude) in the coordinate system specified by `In`.
///
/// Directions (eg, of a [`Ray`](crate::ray::Ray)) are represented as vectors of unit length, so
/// scaling a direction by a [`Length`] yields the displacement covering that distance.
///
/// Depending on the convention of the coordinate system (eg, [`NedLike`], [`ViewLike`], or
/// [`RightHandedXyzLike`]), you'll have different appropriately-named accessors for the vector's
/// cartesian components like [`Vector::ned_north`] or [`Vector::view_back`].
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
// don't require In: Serialize/Deserialize since we skip it anyway
#[cfg_attr(feature = "serde", serde(bound = ""))]
// no need for the "inner": indirection
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Vector<In> {
    /// X, Y, Z in meters
    pub(crate) inner: Vector3,
    #[cfg_attr(feature = "serde", serde(skip))]
    system: PhantomData<In>,
}

// manual impls of Clone and Copy to avoid requiring In: Copy + Clone
impl<In> Clone for Vector<In> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<In> Copy for Vector<In> {}

impl<In> Vector<In> {
    pub(crate) fn from_nalgebra_vector(value: Vector3) -> Self {
        Self {
            inner: value,
            system: PhantomData::<In>,
        }
    }

    /// Constructs a vector with the given (x, y, z) cartesian components in the
    /// [`CoordinateSystem`] `In`.
    ///
    /// The meaning of `x`, `y`, and `z` is dictated by the "convention" of `In`. For example, in
    /// [`ViewLike`], `x` is right, `y` is up, and `z` points out of the screen.
    pub fn from_cartesian(
        x: impl Into<Length>,
        y: impl Into<Length>,
        z: impl Into<Length>,
    ) -> Self {
        Self::from_nalgebra_vector(Vector3::new(
            x.into().get::<meter>(),
            y.into().get::<meter>(),
            z.into().get::<meter>(),
        ))
    }

    /// Constructs a vector from its named cartesian components.
    pub fn build(components: <In::Convention as HasComponents>::Components) -> Self
    where
        In: CoordinateSystem,
        In::Convention: HasComponents,
    {
        let [x, y, z] = components.into();
        Self::from_cartesian(x, y, z)
    }

    /// Constructs a zero-length vector.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_nalgebra_vector(Vector3::zeros())
    }

    /// Returns a unit vector with the same direction as this vector.
    ///
    /// A zero-length vector normalizes to NaN components; use [`Vector::try_normalized`] when
    /// that can happen.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self::from_nalgebra_vector(self.inner.normalize())
    }

    /// Returns a unit vector with the same direction as this vector, or `None` if this vector is
    /// too short (or non-finite) to have a meaningful direction.
    #[must_use]
    pub fn try_normalized(&self) -> Option<Self> {
        self.inner
            .try_normalize(f64::EPSILON)
            .filter(|v| v.iter().all(|c| c.is_finite()))
            .map(Self::from_nalgebra_vector)
    }

    /// Computes the dot (scalar) product between this vector and another.
    ///
    /// Note that this method's return value is unitless since the unit of the dot product is not
    /// meaningful in terms of the units of the underlying components.
    #[must_use]
    pub fn dot(&self, rhs: &Self) -> f64 {
        self.inner.dot(&rhs.inner)
    }

    /// Computes the cross product between this vector and another.
    ///
    /// The result follows the right-hand rule of `In`.
    #[must_use]
    pub fn cross(&self, rhs: &Self) -> Self {
        Self::from_nalgebra_vector(self.inner.cross(&rhs.inner))
    }

    /// Computes the (unsigned) angle between this vector and another.
    ///
    /// Uses `atan2(|a × b|, a · b)`, which stays accurate for nearly-parallel vectors.
    #[must_use]
    pub fn angle_to(&self, rhs: &Self) -> Angle {
        let sin = self.inner.cross(&rhs.inner).norm();
        let cos = self.inner.dot(&rhs.inner);
        Angle::new::<radian>(sin.atan2(cos))
    }

    /// Returns the cartesian components of this vector in XYZ order.
    #[must_use]
    pub fn to_cartesian(&self) -> [Length; 3] {
        [
            Length::new::<meter>(self.inner.x),
            Length::new::<meter>(self.inner.y),
            Length::new::<meter>(self.inner.z),
        ]
    }

    /// Returns the length of this vector.
    #[doc(alias = "norm")]
    #[must_use]
    pub fn magnitude(&self) -> Length {
        Length::new::<meter>(self.inner.norm())
    }

    /// Returns `true` if all three components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|c| c.is_finite())
    }
}

impl<In> From<Coordinate<In>> for Vector<In> {
    fn from(value: Coordinate<In>) -> Self {
        Self::from_nalgebra_vector(value.point.coords)
    }
}

impl<In> Default for Vector<In> {
    fn default() -> Self {
        Self::zero()
    }
}

macro_rules! accessors {
    {
        $convention:ident
        using $x:ident, $y:ident, $z:ident
        + $x_ax:ident, $y_ax:ident, $z_ax:ident
    } => {
        impl<In> Vector<In> where In: CoordinateSystem<Convention = $convention> {
            #[must_use]
            pub fn $x(&self) -> Length { Length::new::<meter>(self.inner.x) }
            #[must_use]
            pub fn $y(&self) -> Length { Length::new::<meter>(self.inner.y) }
            #[must_use]
            pub fn $z(&self) -> Length { Length::new::<meter>(self.inner.z) }

            #[must_use]
            pub fn $x_ax() -> Self { Self::from_nalgebra_vector(Vector3::x()) }
            #[must_use]
            pub fn $y_ax() -> Self { Self::from_nalgebra_vector(Vector3::y()) }
            #[must_use]
            pub fn $z_ax() -> Self { Self::from_nalgebra_vector(Vector3::z()) }
        }
    };
}

accessors!(RightHandedXyzLike using x, y, z + x_axis, y_axis, z_axis);
accessors!(NedLike using ned_north, ned_east, ned_down + ned_north_axis, ned_east_axis, ned_down_axis);
accessors!(ViewLike using view_right, view_up, view_back + view_right_axis, view_up_axis, view_back_axis);

impl<In> Neg for Vector<In> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from_nalgebra_vector(-self.inner)
    }
}

impl<In> Add<Self> for Vector<In> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_nalgebra_vector(self.inner + rhs.inner)
    }
}

impl<In> AddAssign<Self> for Vector<In> {
    fn add_assign(&mut self, rhs: Self) {
        self.inner += rhs.inner;
    }
}

impl<In> Sub<Self> for Vector<In> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_nalgebra_vector(self.inner - rhs.inner)
    }
}

impl<In> SubAssign<Self> for Vector<In> {
    fn sub_assign(&mut self, rhs: Self) {
        self.inner -= rhs.inner;
    }
}

impl<In> Mul<f64> for Vector<In> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::from_nalgebra_vector(self.inner * scalar)
    }
}

impl<In> Div<f64> for Vector<In> {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self::from_nalgebra_vector(self.inner / scalar)
    }
}

/// Scales a (unit) direction to cover the given distance.
impl<In> Mul<Length> for Vector<In> {
    type Output = Self;

    fn mul(self, rhs: Length) -> Self::Output {
        self * rhs.get::<meter>()
    }
}

impl<In> PartialEq<Self> for Vector<In> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq(&other.inner)
    }
}

impl<In> Display for Vector<In> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}]",
            self.inner.x, self.inner.y, self.inner.z
        )
    }
}

#[cfg(any(test, feature = "approx"))]
impl<In> AbsDiffEq<Self> for Vector<In> {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        // NOTE: most vectors in this crate are directions, so this is tight on purpose
        1e-9
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.inner.abs_diff_eq(&other.inner, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl<In> RelativeEq for Vector<In> {
    fn default_max_relative() -> Self::Epsilon {
        Vector3::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.inner.relative_eq(&other.inner, epsilon, max_relative)
    }
}
