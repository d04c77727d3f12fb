//! The reference ellipsoid and the geometry the navigator needs on it.

use crate::ray::Ray;
use crate::systems::Ecef;
use crate::{Coordinate, Vector, Vector3};
use uom::si::f64::Length;
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Discriminants whose magnitude falls within this fraction of the quadratic's scale are treated
/// as a tangent (double) root.
const TANGENT_EPSILON: f64 = 1e-12;

/// An oblate ellipsoid of revolution around the Z axis of [`Ecef`].
///
/// The ellipsoid is fully described by its semi-major (equatorial) axis and its inverse
/// flattening; the semi-minor (polar) axis and the eccentricity are derived from those.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipsoid {
    semi_major_axis: f64,
    inverse_flattening: f64,
}

impl Ellipsoid {
    /// The [WGS84](https://en.wikipedia.org/wiki/World_Geodetic_System#WGS_84) reference
    /// ellipsoid.
    // https://nsgreg.nga.mil/doc/view?i=4085 table 3.1
    pub const WGS84: Self = Self {
        semi_major_axis: 6_378_137.0,
        inverse_flattening: 298.257_223_563,
    };

    /// Constructs an ellipsoid from its equatorial radius and inverse flattening.
    ///
    /// Returns `None` unless the semi-major axis is positive and the inverse flattening is
    /// greater than one (ie, the ellipsoid is oblate with `b < a`).
    #[must_use]
    pub fn new(semi_major_axis: impl Into<Length>, inverse_flattening: f64) -> Option<Self> {
        let semi_major_axis = semi_major_axis.into().get::<meter>();
        if semi_major_axis > 0. && semi_major_axis.is_finite() && inverse_flattening > 1. {
            Some(Self {
                semi_major_axis,
                inverse_flattening,
            })
        } else {
            None
        }
    }

    #[doc(alias = "equatorial radius")]
    #[doc(alias = "a")]
    #[must_use]
    pub fn semi_major_axis(&self) -> Length {
        Length::new::<meter>(self.a())
    }

    #[doc(alias = "polar radius")]
    #[doc(alias = "b")]
    #[must_use]
    pub fn semi_minor_axis(&self) -> Length {
        Length::new::<meter>(self.b())
    }

    #[doc(alias = "f")]
    #[must_use]
    pub fn flattening(&self) -> f64 {
        1.0 / self.inverse_flattening
    }

    pub(crate) fn a(&self) -> f64 {
        self.semi_major_axis
    }

    // b/a = 1 - f
    pub(crate) fn b(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.flattening())
    }

    // e^2 = 1 - b^2/a^2 = 2f - f^2
    pub(crate) fn eccentricity_sq(&self) -> f64 {
        let f = self.flattening();
        2.0 * f - f * f
    }

    // n = (a - b) / (a + b) = f / (2 - f)
    pub(crate) fn third_flattening(&self) -> f64 {
        let f = self.flattening();
        f / (2.0 - f)
    }

    /// Maps ECEF into the space where this ellipsoid is the unit sphere.
    fn to_unit_sphere(&self, v: &Vector3) -> Vector3 {
        let (a, b) = (self.a(), self.b());
        Vector3::new(v.x / a, v.y / a, v.z / b)
    }

    /// Computes the distance along `ray` to the nearest point where it enters or exits the
    /// surface.
    ///
    /// Space is first scaled so the ellipsoid becomes the unit sphere, after which the
    /// intersection is the classic ray/sphere quadratic. Only forward hits are reported: if the
    /// ray starts inside the ellipsoid, the exit point is returned.
    ///
    /// Grazing rays whose discriminant is within a small relative tolerance of zero count as
    /// tangent, and report the single touching point if it lies ahead of the ray.
    #[must_use]
    pub fn intersect(&self, ray: &Ray<Ecef>) -> Option<Length> {
        let origin = self.to_unit_sphere(&ray.origin().point.coords);
        let direction = self.to_unit_sphere(&ray.direction().inner);

        let direction_norm_sq = direction.norm_squared();
        if direction_norm_sq == 0. || !direction_norm_sq.is_finite() {
            return None;
        }

        // t^2 + 2 * half_b * t + c = 0, normalized by |d|^2 so t is in the ray's own units
        let half_b = origin.dot(&direction) / direction_norm_sq;
        let c = (origin.norm_squared() - 1.) / direction_norm_sq;
        let discriminant = half_b * half_b - c;
        // |o|^2 - 1 cancels badly near the surface, so the tolerance scales with |o|^2 too
        let scale = (half_b * half_b)
            .max(c.abs())
            .max(origin.norm_squared() / direction_norm_sq);
        let tolerance = TANGENT_EPSILON * scale;

        let distance = if discriminant.abs() <= tolerance {
            -half_b
        } else if discriminant < 0. {
            return None;
        } else {
            let root = discriminant.sqrt();
            let near = -half_b - root;
            if near >= 0. {
                near
            } else {
                -half_b + root
            }
        };

        (distance >= 0.).then(|| Length::new::<meter>(distance))
    }

    /// Projects `position` radially (towards the ellipsoid's center) onto the surface.
    ///
    /// The ellipsoid's center has no such projection and yields NaN components.
    #[must_use]
    pub fn surface_position(&self, position: &Coordinate<Ecef>) -> Coordinate<Ecef> {
        let scale = self.to_unit_sphere(&position.point.coords).norm();
        Coordinate::from_nalgebra_point(position.point / scale)
    }

    /// Computes the outward unit normal of the surface at the radial projection of `position`.
    ///
    /// This is the direction of "up" in the geodetic sense (ie, the negation of local down in
    /// [`Ned`](crate::systems::Ned)) when `position` is on the surface.
    #[must_use]
    pub fn surface_normal(&self, position: &Coordinate<Ecef>) -> Vector<Ecef> {
        let p = self.surface_position(position).point;
        let (a2, b2) = (self.a().powi(2), self.b().powi(2));
        Vector::from_nalgebra_vector(Vector3::new(p.x / a2, p.y / a2, p.z / b2).normalize())
    }

    /// Computes the signed distance between `position` and its radial projection onto the
    /// surface.
    ///
    /// The result is positive outside the ellipsoid and negative inside. The navigator uses it to
    /// scale interaction speed with the camera's distance to the ground.
    #[must_use]
    pub fn height_above(&self, position: &Coordinate<Ecef>) -> Length {
        let surface = self.surface_position(position);
        let offset = *position - surface;
        let height = offset.magnitude();
        if offset.dot(&Vector::from(*position)) < 0. {
            -height
        } else {
            height
        }
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use super::Ellipsoid;
    use crate::ray::Ray;
    use crate::systems::Ecef;
    use crate::{Coordinate, Vector};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;
    use uom::si::f64::Length;
    use uom::si::length::meter;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    fn ecef(x: f64, y: f64, z: f64) -> Coordinate<Ecef> {
        Coordinate::from_cartesian(m(x), m(y), m(z))
    }

    fn ray(origin: Coordinate<Ecef>, x: f64, y: f64, z: f64) -> Ray<Ecef> {
        Ray::new(origin, Vector::from_cartesian(m(x), m(y), m(z))).expect("non-zero direction")
    }

    const A: f64 = 6_378_137.0;

    #[test]
    fn wgs84_axes() {
        let wgs84 = Ellipsoid::WGS84;
        assert_eq!(wgs84.semi_major_axis(), m(A));
        assert_relative_eq!(
            wgs84.semi_minor_axis().get::<meter>(),
            6_356_752.314_245,
            epsilon = 1e-6
        );
        assert!(wgs84.semi_minor_axis() < wgs84.semi_major_axis());
    }

    #[test]
    fn rejects_invalid_shapes() {
        assert!(Ellipsoid::new(m(-1.), 298.).is_none());
        assert!(Ellipsoid::new(m(A), 0.5).is_none());
        assert!(Ellipsoid::new(m(f64::NAN), 298.).is_none());
        assert!(Ellipsoid::new(m(A), 298.257_223_563).is_some());
    }

    #[rstest]
    #[case(ecef(A + 1000., 0., 0.), (-1., 0., 0.))]
    #[case(ecef(0., A + 1000., 0.), (0., -1., 0.))]
    #[case(ecef(-(A + 1000.), 0., 0.), (1., 0., 0.))]
    #[case(ecef(0., 0., 6_356_752.314_245_179 + 1000.), (0., 0., -1.))]
    fn intersect_straight_down(#[case] origin: Coordinate<Ecef>, #[case] dir: (f64, f64, f64)) {
        let hit = Ellipsoid::WGS84
            .intersect(&ray(origin, dir.0, dir.1, dir.2))
            .expect("ray towards the center hits");
        assert_abs_diff_eq!(hit.get::<meter>(), 1000., epsilon = 1e-4);
    }

    #[test]
    fn intersect_misses_when_pointing_away() {
        let origin = ecef(A + 1000., 0., 0.);
        assert_eq!(Ellipsoid::WGS84.intersect(&ray(origin, 1., 0., 0.)), None);
        assert_eq!(Ellipsoid::WGS84.intersect(&ray(origin, 0., 1., 0.)), None);
    }

    #[test]
    fn intersect_from_inside_reports_exit() {
        let hit = Ellipsoid::WGS84
            .intersect(&ray(ecef(A - 1000., 0., 0.), 1., 0., 0.))
            .expect("ray from inside always exits");
        assert_abs_diff_eq!(hit.get::<meter>(), 1000., epsilon = 1e-4);
    }

    #[test]
    fn intersect_tangent_ray() {
        // grazes the equator at (A, 0, 0) after traveling 5 km
        let origin = ecef(A, -5000., 0.);
        let hit = Ellipsoid::WGS84
            .intersect(&ray(origin, 0., 1., 0.))
            .expect("tangent ray touches the surface");
        assert_abs_diff_eq!(hit.get::<meter>(), 5000., epsilon = 1e-3);

        // and the same ray, but already past the touching point
        let origin = ecef(A, 5000., 0.);
        assert_eq!(Ellipsoid::WGS84.intersect(&ray(origin, 0., 1., 0.)), None);
    }

    #[test]
    fn intersect_oblique() {
        // a ray aimed at the center from an arbitrary direction lands on the radial projection
        let origin = ecef(4e6, 5e6, 3e6);
        let r = Ray::between(origin, Coordinate::origin()).expect("distinct points");
        let hit = Ellipsoid::WGS84.intersect(&r).expect("hits");
        assert_relative_eq!(
            r.at(hit),
            Ellipsoid::WGS84.surface_position(&origin),
            epsilon = m(1e-6)
        );
    }

    #[rstest]
    #[case(ecef(A + 1000., 0., 0.), 1000.)]
    #[case(ecef(0., A + 1000., 0.), 1000.)]
    #[case(ecef(0., 0., 6_356_752.314_245_179 + 1000.), 1000.)]
    #[case(ecef(0., 0., -(6_356_752.314_245_179 + 1000.)), 1000.)]
    #[case(ecef(A - 250., 0., 0.), -250.)]
    #[case(ecef(0., 0., 6_356_752.314_245_179 - 250.), -250.)]
    fn height_above_principal_axes(#[case] position: Coordinate<Ecef>, #[case] expected: f64) {
        assert_abs_diff_eq!(
            Ellipsoid::WGS84.height_above(&position).get::<meter>(),
            expected,
            epsilon = 1e-4
        );
    }

    #[test]
    fn surface_position_is_on_surface() {
        let wgs84 = Ellipsoid::WGS84;
        let p = wgs84.surface_position(&ecef(1e7, -3e6, 8e6));
        let (a, b) = (A, wgs84.semi_minor_axis().get::<meter>());
        let [x, y, z] = p.to_cartesian().map(|c| c.get::<meter>());
        assert_relative_eq!(
            (x / a).powi(2) + (y / a).powi(2) + (z / b).powi(2),
            1.,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(wgs84.height_above(&p).get::<meter>(), 0., epsilon = 1e-6);
    }

    #[test]
    fn surface_normal_on_axes() {
        let wgs84 = Ellipsoid::WGS84;
        assert_relative_eq!(
            wgs84.surface_normal(&ecef(A + 10., 0., 0.)),
            Vector::x_axis()
        );
        assert_relative_eq!(
            wgs84.surface_normal(&ecef(0., 0., -7e6)),
            -Vector::<Ecef>::z_axis()
        );
    }
}
