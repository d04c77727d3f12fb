//! Rotations between coordinate systems.
//!
//! The main type provided by this module is [`Rotation`], a type-safe wrapper around a rotation
//! matrix that describes how the axes of one [`CoordinateSystem`](crate::CoordinateSystem) lie in
//! another. A camera's orientation, for example, is a `Rotation<Ecef, View>`: the rotation whose
//! columns are the camera's right, up, and back axes expressed in [`Ecef`](crate::systems::Ecef).
//!
//! Rotations are kept as matrices (rather than quaternions) since the navigator premultiplies
//! them many times per gesture and periodically renormalizes them with Gram-Schmidt, which
//! operates on the basis vectors directly.

use crate::coordinates::Coordinate;
use crate::frames;
use crate::vectors::Vector;
use crate::{Matrix3, Rotation3};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::ops::{Mul, Neg};
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Defines a [rotation transform] between two [`CoordinateSystem`](crate::CoordinateSystem)s.
///
/// <div class="warning">
///
/// Rotations can be chained with other transformations using `*` (ie, the [`Mul`] trait). The
/// operand order follows the "eliminate the middle" rule of matrix dimensions rather than the
/// mathematical convention of putting the transform on the left:
///
/// ```rust,ignore
/// let _: Vector<To> = Vector<From> * Rotation<From, To>;
/// let _: Vector<From> = Rotation<From, To> * Vector<To>;
/// let _: Rotation<From, To> = Rotation<From, Over> * Rotation<Over, To>;
/// ```
///
/// </div>
///
/// [rotation transform]: https://en.wikipedia.org/wiki/Rotation_matrix
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
// don't require From/To: Serialize/Deserialize since we skip it anyway
#[cfg_attr(feature = "serde", serde(bound = ""))]
// no need for the "inner": indirection
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Rotation<From, To> {
    /// This is _actually_ the rotation that takes components in `To` into `From`: its columns are
    /// the axes of `To` expressed in `From`. Going `From` -> `To` therefore applies the inverse
    /// (transpose), and going `To` -> `From` applies the matrix as-is. You'll see this across the
    /// `impl Mul`s further down.
    pub(crate) inner: Rotation3,
    #[cfg_attr(feature = "serde", serde(skip))]
    from: PhantomData<From>,
    #[cfg_attr(feature = "serde", serde(skip))]
    to: PhantomData<To>,
}

// manual impls of Clone and Copy to avoid requiring From/To: Copy + Clone
impl<From, To> Clone for Rotation<From, To> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<From, To> Copy for Rotation<From, To> {}

impl<From, To> PartialEq<Self> for Rotation<From, To> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq(&other.inner)
    }
}

impl<From, To> Display for Rotation<From, To> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.basis();
        write!(f, "x: {x}, y: {y}, z: {z}")
    }
}

impl<From, To> Default for Rotation<From, To> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<From, To> Rotation<From, To> {
    pub(crate) fn from_nalgebra_rotation(inner: Rotation3) -> Self {
        Self {
            inner,
            from: PhantomData,
            to: PhantomData,
        }
    }

    /// Constructs the rotation whose columns are the given axes of `To`, expressed in `From`.
    ///
    /// The axes are taken as-is; callers are responsible for passing an orthonormal,
    /// right-handed triple.
    pub(crate) fn from_basis_unchecked(x: Vector<From>, y: Vector<From>, z: Vector<From>) -> Self {
        Self::from_nalgebra_rotation(Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[
            x.inner, y.inner, z.inner,
        ])))
    }

    /// The rotation that maps every axis onto itself.
    #[must_use]
    pub fn identity() -> Self {
        Self::from_nalgebra_rotation(Rotation3::identity())
    }

    /// Constructs a rotation from yaw, pitch, and roll as built by
    /// [`frames::euler_rotation`](crate::frames::euler_rotation).
    #[must_use]
    pub fn from_euler_angles(
        yaw: impl Into<Angle>,
        pitch: impl Into<Angle>,
        roll: impl Into<Angle>,
    ) -> Self {
        let m = frames::euler_rotation(yaw, pitch, roll);
        Self::from_nalgebra_rotation(Rotation3::from_matrix_unchecked(
            m.fixed_view::<3, 3>(0, 0).into_owned(),
        ))
    }

    /// Returns the yaw, pitch, and roll that [`Rotation::from_euler_angles`] would need to
    /// produce this rotation.
    ///
    /// Only well-defined for pitch strictly within (-90°, 90°); see
    /// [`frames::decompose_euler`](crate::frames::decompose_euler).
    #[must_use]
    pub fn to_euler_angles(&self) -> (Angle, Angle, Angle) {
        frames::decompose_euler(&self.to_homogeneous())
    }

    /// Returns the axes of `To` expressed in `From` (ie, the columns of the rotation matrix).
    #[must_use]
    pub fn basis(&self) -> (Vector<From>, Vector<From>, Vector<From>) {
        let m = self.inner.matrix();
        (
            Vector::from_nalgebra_vector(m.column(0).into_owned()),
            Vector::from_nalgebra_vector(m.column(1).into_owned()),
            Vector::from_nalgebra_vector(m.column(2).into_owned()),
        )
    }

    /// Returns the 4x4 homogeneous matrix with this rotation in its upper-left corner.
    #[must_use]
    pub fn to_homogeneous(&self) -> nalgebra::Matrix4<f64> {
        self.inner.to_homogeneous()
    }

    /// Returns the closest orthonormal rotation, undoing drift accumulated by repeated
    /// multiplication.
    #[must_use]
    pub fn renormalized(&self) -> Self {
        Self::from_nalgebra_rotation(Rotation3::from_matrix_unchecked(frames::orthonormalize(
            self.inner.matrix(),
        )))
    }

    /// Returns `true` if all matrix elements are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.inner.matrix().iter().all(|v| v.is_finite())
    }

    /// Returns the equal-but-opposite transform to this one.
    ///
    /// That is, a rotation _from_ the coordinate system `To` _into_ the coordinate system
    /// `From`.
    #[must_use]
    pub fn inverse(&self) -> Rotation<To, From> {
        Rotation::from_nalgebra_rotation(self.inner.inverse())
    }

    /// Transforms an element in coordinate system `From` into `To`.
    #[doc(alias = "apply")]
    pub fn transform<T>(&self, in_from: T) -> <T as Mul<Self>>::Output
    where
        T: Mul<Self>,
    {
        in_from * *self
    }

    /// Transforms an element in coordinate system `To` into `From`.
    #[doc(alias = "undo")]
    pub fn inverse_transform<T>(&self, in_to: T) -> <Self as Mul<T>>::Output
    where
        Self: Mul<T>,
    {
        *self * in_to
    }
}

#[cfg(any(test, feature = "approx"))]
impl<From, To> AbsDiffEq<Self> for Rotation<From, To> {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        1e-9
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.inner.abs_diff_eq(&other.inner, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl<From, To> RelativeEq for Rotation<From, To> {
    fn default_max_relative() -> Self::Epsilon {
        Rotation3::default_max_relative()
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

impl<From, To> Neg for Rotation<From, To> {
    type Output = Rotation<To, From>;

    fn neg(self) -> Self::Output {
        self.inverse()
    }
}

// Rotation<From, Over> * Rotation<Over, To> -> Rotation<From, To>
//
// self.inner has the axes of `Over` as columns in `From`, and rhs.inner has the axes of `To` as
// columns in `Over`. the axes of `To` in `From` are then self.inner * rhs.inner.
impl<From, Over, To> Mul<Rotation<Over, To>> for Rotation<From, Over> {
    type Output = Rotation<From, To>;

    fn mul(self, rhs: Rotation<Over, To>) -> Self::Output {
        Rotation::from_nalgebra_rotation(self.inner * rhs.inner)
    }
}

// recall from the docs on `Rotation.inner` that conversions of `From` -> `To` use _inverse_
// transforms, and conversions from `To` -> `From` use regular `transform`.

// Coordinate<From> * Rotation<From, To> -> Coordinate<To>
impl<From, To> Mul<Rotation<From, To>> for Coordinate<From> {
    type Output = Coordinate<To>;

    fn mul(self, rhs: Rotation<From, To>) -> Self::Output {
        Coordinate::from_nalgebra_point(rhs.inner.inverse_transform_point(&self.point))
    }
}

// Rotation<From, To> * Coordinate<To> -> Coordinate<From>
impl<From, To> Mul<Coordinate<To>> for Rotation<From, To> {
    type Output = Coordinate<From>;

    fn mul(self, rhs: Coordinate<To>) -> Self::Output {
        Coordinate::from_nalgebra_point(self.inner.transform_point(&rhs.point))
    }
}

impl<From, To> Mul<Rotation<From, To>> for Vector<From> {
    type Output = Vector<To>;

    fn mul(self, rhs: Rotation<From, To>) -> Self::Output {
        Vector::from_nalgebra_vector(rhs.inner.inverse_transform_vector(&self.inner))
    }
}

impl<From, To> Mul<Vector<To>> for Rotation<From, To> {
    type Output = Vector<From>;

    fn mul(self, rhs: Vector<To>) -> Self::Output {
        Vector::from_nalgebra_vector(self.inner.transform_vector(&rhs.inner))
    }
}
