use crate::coordinate_systems::{
    CoordinateSystem, HasComponents, NedLike, RightHandedXyzLike, ViewLike,
};
use crate::vectors::Vector;
use crate::Point3;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use uom::si::f64::Length;
use uom::si::length::meter;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Defines a point (ie, position) in the coordinate system specified by `In`.
///
/// Depending on the convention of the coordinate system (eg, [`NedLike`], [`ViewLike`], or
/// [`RightHandedXyzLike`]), you'll have different appropriately-named accessors for the
/// coordinate's cartesian components like [`Coordinate::ned_north`] or [`Coordinate::view_up`].
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
// no need for the "point": indirection
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Coordinate<In> {
    /// X, Y, Z in meters
    pub(crate) point: Point3,
    #[cfg_attr(feature = "serde", serde(skip))]
    system: PhantomData<In>,
}

// manual impls of Clone and Copy to avoid requiring In: Copy + Clone
impl<In> Clone for Coordinate<In> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<In> Copy for Coordinate<In> {}

impl<In> Coordinate<In> {
    pub(crate) fn from_nalgebra_point(p: Point3) -> Self {
        Self {
            point: p,
            system: PhantomData,
        }
    }

    /// Constructs a coordinate at the given (x, y, z) cartesian point in the [`CoordinateSystem`]
    /// `In`.
    ///
    /// The meaning of `x`, `y`, and `z` is dictated by the [`CoordinateSystem::Convention`] of
    /// `In`. For example, in [`NedLike`], `x` is North, `y` is East, and `z` is "down" (ie,
    /// orthogonal to the earth's surface).
    pub fn from_cartesian(
        x: impl Into<Length>,
        y: impl Into<Length>,
        z: impl Into<Length>,
    ) -> Self {
        Self::from_nalgebra_point(Point3::new(
            x.into().get::<meter>(),
            y.into().get::<meter>(),
            z.into().get::<meter>(),
        ))
    }

    /// Constructs a coordinate from its cartesian components.
    pub fn build(components: <In::Convention as HasComponents>::Components) -> Self
    where
        In: CoordinateSystem,
        In::Convention: HasComponents,
    {
        let [x, y, z] = components.into();
        Self::from_cartesian(x, y, z)
    }

    /// Constructs a coordinate at the origin of the coordinate system `In`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geonav::{Coordinate, systems::Ecef};
    /// use uom::si::f64::Length;
    /// use uom::si::length::meter;
    ///
    /// let zero = Length::new::<meter>(0.);
    /// assert_eq!(
    ///     Coordinate::<Ecef>::origin(),
    ///     Coordinate::<Ecef>::from_cartesian(zero, zero, zero),
    /// );
    /// ```
    #[must_use]
    pub fn origin() -> Self {
        Self {
            point: Point3::origin(),
            system: PhantomData,
        }
    }

    /// Returns `true` if all three components are finite.
    ///
    /// The navigator uses this to reject updates that went through a degenerate computation.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.point.coords.iter().all(|c| c.is_finite())
    }
}

impl<In> Default for Coordinate<In> {
    fn default() -> Self {
        Self::origin()
    }
}

macro_rules! accessors {
    {
        $convention:ident
        using $x:ident, $y:ident, $z:ident
    } => {
        impl<In> Coordinate<In> where In: CoordinateSystem<Convention = $convention> {
            #[must_use]
            pub fn $x(&self) -> Length { Length::new::<meter>(self.point.x) }
            #[must_use]
            pub fn $y(&self) -> Length { Length::new::<meter>(self.point.y) }
            #[must_use]
            pub fn $z(&self) -> Length { Length::new::<meter>(self.point.z) }
        }
    };
}

accessors!(RightHandedXyzLike using x, y, z);
// NOTE: the ned_ and view_ prefixes keep the accessor names unambiguous for generic callers, since
// Rust can't tell that a coordinate system never implements two conventions at once.
accessors!(NedLike using ned_north, ned_east, ned_down);
accessors!(ViewLike using view_right, view_up, view_back);

impl<In> Coordinate<In> {
    /// Returns the cartesian components of this coordinate in XYZ order.
    #[doc(alias = "components")]
    #[must_use]
    pub fn to_cartesian(&self) -> [Length; 3] {
        [
            Length::new::<meter>(self.point.x),
            Length::new::<meter>(self.point.y),
            Length::new::<meter>(self.point.z),
        ]
    }

    /// Computes the distance of this point from the coordinate system's origin.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geonav::{Coordinate, systems::Ecef};
    /// use uom::si::f64::Length;
    /// use uom::si::length::meter;
    ///
    /// let zero = Length::new::<meter>(0.);
    /// let unit = Length::new::<meter>(1.);
    /// let p = Coordinate::<Ecef>::from_cartesian(unit, unit, zero);
    /// assert_eq!(
    ///     p.distance_from_origin(),
    ///     (p - Coordinate::<Ecef>::origin()).magnitude(),
    /// );
    /// ```
    #[doc(alias = "norm")]
    #[must_use]
    pub fn distance_from_origin(&self) -> Length {
        Length::new::<meter>(self.point.coords.norm())
    }

    /// Computes the distance between this point and the given point.
    #[must_use]
    pub fn distance_from(&self, other: &Coordinate<In>) -> Length {
        (*other - *self).magnitude()
    }
}

impl<In> PartialEq<Self> for Coordinate<In> {
    fn eq(&self, other: &Self) -> bool {
        self.point.eq(&other.point)
    }
}

#[cfg(any(test, feature = "approx"))]
impl<In> AbsDiffEq<Self> for Coordinate<In> {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        // NOTE: this value is in meters; a centimeter is well below a pixel at any useful zoom
        Length::new::<meter>(0.01)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        // NOTE: this measures whether the absolute difference in any _one_ coordinate is off by
        // more than epsilon, not whether the distance between the coordinates is below epsilon.
        self.point.abs_diff_eq(&other.point, epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl<In> RelativeEq for Coordinate<In> {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(Point3::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.point.relative_eq(
            &other.point,
            epsilon.get::<meter>(),
            max_relative.get::<meter>(),
        )
    }
}

impl<In> Display for Coordinate<In> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}m, {:.3}m, {:.3}m)",
            self.point.x, self.point.y, self.point.z
        )
    }
}

impl<In> Sub<Self> for Coordinate<In> {
    type Output = Vector<In>;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector::from_nalgebra_vector(self.point - rhs.point)
    }
}

impl<In> Add<Vector<In>> for Coordinate<In> {
    type Output = Coordinate<In>;

    fn add(self, rhs: Vector<In>) -> Self::Output {
        Coordinate {
            point: self.point + rhs.inner,
            system: self.system,
        }
    }
}

impl<In> AddAssign<Vector<In>> for Coordinate<In> {
    fn add_assign(&mut self, rhs: Vector<In>) {
        self.point += rhs.inner;
    }
}

impl<In> Sub<Vector<In>> for Coordinate<In> {
    type Output = Coordinate<In>;

    fn sub(self, rhs: Vector<In>) -> Self::Output {
        Coordinate {
            point: self.point - rhs.inner,
            system: self.system,
        }
    }
}

impl<In> SubAssign<Vector<In>> for Coordinate<In> {
    fn sub_assign(&mut self, rhs: Vector<In>) {
        self.point -= rhs.inner;
    }
}

#[cfg(test)]
mod tests {
    use super::Length;
    use crate::coordinate_systems::{Ecef, Ned, NedComponents, View};
    use crate::coordinates::Coordinate;
    use crate::{Point3, Vector};
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn m(meters: f64) -> Length {
        Length::new::<uom::si::length::meter>(meters)
    }

    #[rstest]
    #[case(Point3::new(500., 0., 0.), m(500.))]
    #[case(Point3::new(0., 300., 0.), m(300.))]
    #[case(Point3::new(0., 0., 200.), m(200.))]
    #[case(Point3::new(-500., 0., 0.), m(500.))]
    #[case(Point3::new(0., -300., 0.), m(300.))]
    #[case(Point3::new(0., 0., -200.), m(200.))]
    fn view_coordinate_distance_to_origin(#[case] point: Point3, #[case] expected: Length) {
        let coordinate = Coordinate::<View>::from_nalgebra_point(point);
        assert_eq!(coordinate.distance_from_origin(), expected);
    }

    #[test]
    fn named_accessors() {
        let ned = Coordinate::<Ned>::build(NedComponents {
            north: m(1.),
            east: m(2.),
            down: m(3.),
        });
        assert_eq!(ned.ned_north(), m(1.));
        assert_eq!(ned.ned_east(), m(2.));
        assert_eq!(ned.ned_down(), m(3.));

        let view = Coordinate::<View>::from_cartesian(m(4.), m(5.), m(6.));
        assert_eq!(view.view_right(), m(4.));
        assert_eq!(view.view_up(), m(5.));
        assert_eq!(view.view_back(), m(6.));
    }

    #[test]
    fn coordinate_vector_arithmetic() {
        let a = Coordinate::<Ecef>::from_cartesian(m(10.), m(-5.), m(3.5));
        let b = Coordinate::<Ecef>::from_cartesian(m(1.), m(1.), m(1.));
        let v: Vector<Ecef> = a - b;
        assert_relative_eq!(b + v, a);
        assert_relative_eq!(a - v, b);
        assert_eq!(a.distance_from(&a), m(0.));

        let mut c = b;
        c += v;
        assert_relative_eq!(c, a);
        c -= v;
        assert_relative_eq!(c, b);
    }

    #[test]
    fn non_finite_components_are_detected() {
        assert!(Coordinate::<Ecef>::from_cartesian(m(1.), m(2.), m(3.)).is_finite());
        assert!(!Coordinate::<Ecef>::from_cartesian(m(f64::NAN), m(2.), m(3.)).is_finite());
        assert!(!Coordinate::<Ecef>::from_cartesian(m(1.), m(f64::INFINITY), m(3.)).is_finite());
    }

    #[test]
    fn display() {
        let c = Coordinate::<Ecef>::from_cartesian(m(6378137.), m(-0.5), m(12.25));
        insta::assert_snapshot!(c.to_string(), @"(6378137.000m, -0.500m, 12.250m)");
    }
}
