//! Reference frames: Euler rotations, fixed changes of basis between ECEF, NED, and view space,
//! and the local NED frame at a point on the ellipsoid.
//!
//! The matrix-valued functions here return 4x4 homogeneous matrices so they compose directly
//! with the projection and world matrices of a [`PerspectiveCamera`](crate::camera::PerspectiveCamera).
//! Where a typed equivalent exists (eg, [`local_ned_rotation`]), prefer it.

use crate::convert::GeoConverter;
use crate::coordinate_systems::{NedLike, View, ViewLike};
use crate::math::Rotation;
use crate::systems::Ecef;
use crate::{Coordinate, CoordinateSystem, Matrix3, Rotation3, Vector, Vector3};
use nalgebra::{Matrix4, Unit};
use uom::si::angle::radian;
use uom::si::f64::Angle;

/// Nudge applied to the view direction when the up vector is parallel to it.
const LOOK_AT_PERTURBATION: f64 = 0.0001;

/// Builds a rotation from yaw, pitch, and roll (in that order of application).
///
/// For the identity orientation, yaw turns about +Z, pitch about +Y, and roll about +X. As
/// examples of the resulting conventions:
///
/// - `yaw = 90°` maps +X to -Y;
/// - `pitch = 90°` maps +X to +Z;
/// - `roll = 90°` maps +Z to +Y.
///
/// The result is a proper rotation, so its transpose is its inverse.
#[must_use]
pub fn euler_rotation(
    yaw: impl Into<Angle>,
    pitch: impl Into<Angle>,
    roll: impl Into<Angle>,
) -> Matrix4<f64> {
    let (sy, cy) = yaw.into().get::<radian>().sin_cos();
    let (sp, cp) = pitch.into().get::<radian>().sin_cos();
    let (sr, cr) = roll.into().get::<radian>().sin_cos();

    #[rustfmt::skip]
    let m = Matrix4::new(
        cy * cp,                sy * cp,                -sp,     0.,
        cy * sp * sr - sy * cr, sy * sp * sr + cy * cr, cp * sr, 0.,
        cy * sp * cr + sy * sr, sy * sp * cr - cy * sr, cp * cr, 0.,
        0.,                     0.,                     0.,      1.,
    );
    m
}

/// Recovers the yaw, pitch, and roll passed to [`euler_rotation`].
///
/// This is only an inverse for pitch strictly within (-90°, 90°). At ±90° (gimbal lock) yaw and
/// roll rotate about the same axis and cannot be told apart; the returned split between them is
/// unspecified.
#[must_use]
pub fn decompose_euler(m: &Matrix4<f64>) -> (Angle, Angle, Angle) {
    let yaw = m[(0, 1)].atan2(m[(0, 0)]);
    // clamp so rounding just past ±1 doesn't turn into NaN
    let pitch = -m[(0, 2)].clamp(-1., 1.).asin();
    let roll = m[(1, 2)].atan2(m[(2, 2)]);
    (
        Angle::new::<radian>(yaw),
        Angle::new::<radian>(pitch),
        Angle::new::<radian>(roll),
    )
}

/// The fixed change of basis that flips ECEF X and Z (a half turn about Y).
#[must_use]
pub fn ecef_to_ned() -> Matrix4<f64> {
    Matrix4::from_diagonal(&nalgebra::Vector4::new(-1., 1., -1., 1.))
}

/// The fixed change of basis from NED into the view convention.
///
/// The columns are the view axes expressed in NED: view right is east, view up is up (-down),
/// and view back is south (-north). A camera with this orientation looks north.
#[must_use]
pub fn ned_to_view() -> Matrix4<f64> {
    #[rustfmt::skip]
    let m = Matrix4::new(
        0., 0., -1., 0.,
        1., 0., 0.,  0.,
        0., -1., 0., 0.,
        0., 0., 0.,  1.,
    );
    m
}

/// The fixed change of basis from ECEF into the view convention.
///
/// Equal to `ecef_to_ned() * ned_to_view()`.
#[must_use]
pub fn ecef_to_view() -> Matrix4<f64> {
    #[rustfmt::skip]
    let m = Matrix4::new(
        0., 0., 1., 0.,
        1., 0., 0., 0.,
        0., 1., 0., 0.,
        0., 0., 0., 1.,
    );
    m
}

/// Returns the local north, east, and down unit vectors at `position`.
///
/// The frame is the tangent plane at the geodetic latitude and longitude of `position`, so
/// `north × east == down` and down is the (negated) ellipsoid normal.
#[must_use]
pub fn local_ned_basis(
    position: &Coordinate<Ecef>,
    converter: &GeoConverter,
) -> (Vector<Ecef>, Vector<Ecef>, Vector<Ecef>) {
    let geodetic = converter.to_geodetic(position);
    let (sin_phi, cos_phi) = geodetic.latitude.get::<radian>().sin_cos();
    let (sin_lambda, cos_lambda) = geodetic.longitude.get::<radian>().sin_cos();

    let north = Vector3::new(-sin_phi * cos_lambda, -sin_phi * sin_lambda, cos_phi);
    let east = Vector3::new(-sin_lambda, cos_lambda, 0.);
    let down = Vector3::new(-cos_phi * cos_lambda, -cos_phi * sin_lambda, -sin_phi);

    (
        Vector::from_nalgebra_vector(north),
        Vector::from_nalgebra_vector(east),
        Vector::from_nalgebra_vector(down),
    )
}

/// [`local_ned_basis`] as the columns of a homogeneous matrix.
#[must_use]
pub fn local_ned_matrix(position: &Coordinate<Ecef>, converter: &GeoConverter) -> Matrix4<f64> {
    let (north, east, down) = local_ned_basis(position, converter);
    make_basis(&north, &east, &down)
}

/// [`local_ned_basis`] as the rotation between [`Ecef`] and an NED-like system at `position`.
#[must_use]
pub fn local_ned_rotation<To>(
    position: &Coordinate<Ecef>,
    converter: &GeoConverter,
) -> Rotation<Ecef, To>
where
    To: CoordinateSystem<Convention = NedLike>,
{
    let (north, east, down) = local_ned_basis(position, converter);
    Rotation::from_basis_unchecked(north, east, down)
}

/// [`ned_to_view`] as the rotation between an NED-like and a view-like system.
#[must_use]
pub fn ned_to_view_rotation<From, To>() -> Rotation<From, To>
where
    From: CoordinateSystem<Convention = NedLike>,
    To: CoordinateSystem<Convention = ViewLike>,
{
    Rotation::from_nalgebra_rotation(Rotation3::from_matrix_unchecked(
        ned_to_view().fixed_view::<3, 3>(0, 0).into_owned(),
    ))
}

/// Builds a homogeneous matrix whose first three columns are `x`, `y`, and `z`.
#[must_use]
pub fn make_basis<In>(x: &Vector<In>, y: &Vector<In>, z: &Vector<In>) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 1>(0, 0).copy_from(&x.inner);
    m.fixed_view_mut::<3, 1>(0, 1).copy_from(&y.inner);
    m.fixed_view_mut::<3, 1>(0, 2).copy_from(&z.inner);
    m
}

/// Returns the first three columns of `m`; the exact inverse of [`make_basis`].
#[must_use]
pub fn extract_basis<In>(m: &Matrix4<f64>) -> (Vector<In>, Vector<In>, Vector<In>) {
    (
        Vector::from_nalgebra_vector(m.fixed_view::<3, 1>(0, 0).into_owned()),
        Vector::from_nalgebra_vector(m.fixed_view::<3, 1>(0, 1).into_owned()),
        Vector::from_nalgebra_vector(m.fixed_view::<3, 1>(0, 2).into_owned()),
    )
}

/// Gram-Schmidt orthonormalization of the columns of `m`.
///
/// X keeps its direction, Y is made orthogonal to X, and Z is rebuilt as `X × Y` so the result
/// is always right-handed. Degenerate input (parallel or zero columns) yields NaN.
#[must_use]
pub fn orthonormalize(m: &Matrix3) -> Matrix3 {
    let x = m.column(0).normalize();
    let y = m.column(1).into_owned();
    let y = (y - x * x.dot(&y)).normalize();
    let z = x.cross(&y);
    Matrix3::from_columns(&[x, y, z])
}

/// Builds the orientation of a camera at `eye` looking towards `target`, with `up` hinting at
/// which way is up on screen.
///
/// This is the classic look-at construction: back = `eye - target`, right = `up × back`, and
/// up = `back × right`. If `up` is parallel to the view direction, the view direction is nudged
/// slightly so a basis can still be formed. If `eye == target`, the camera looks along -Z.
#[must_use]
pub fn look_at<In>(
    eye: Coordinate<In>,
    target: Coordinate<In>,
    up: Vector<In>,
) -> Rotation<In, View> {
    let up = up.inner;
    let mut back = eye.point - target.point;
    if back.norm_squared() == 0. {
        back.z = 1.;
    }
    back.normalize_mut();

    let mut right = up.cross(&back);
    if right.norm_squared() == 0. {
        if (up.z.abs() - 1.).abs() < f64::EPSILON {
            back.x += LOOK_AT_PERTURBATION;
        } else {
            back.z += LOOK_AT_PERTURBATION;
        }
        back.normalize_mut();
        right = up.cross(&back);
    }
    right.normalize_mut();
    let up = back.cross(&right);

    Rotation::from_nalgebra_rotation(Rotation3::from_matrix_unchecked(Matrix3::from_columns(
        &[right, up, back],
    )))
}

/// Builds the orientation of a camera at `position` that looks towards local north, pitched
/// down so that the view direction is `tilt` away from nadir.
///
/// A tilt of 0° looks straight down with north at the top of the screen; 90° looks level
/// along local north.
#[must_use]
pub fn tilted_orientation(
    position: &Coordinate<Ecef>,
    converter: &GeoConverter,
    tilt: impl Into<Angle>,
) -> Rotation<Ecef, View> {
    let (north, east, down) = local_ned_basis(position, converter);
    let (sin_t, cos_t) = tilt.into().get::<radian>().sin_cos();

    let back = -(down * cos_t + north * sin_t);
    let right = east;
    let up = back.cross(&right);
    Rotation::from_basis_unchecked(right, up, back)
}

/// Constructs the rotation by `angle` about `axis` (right-hand rule).
///
/// Returns `None` if `axis` has no usable direction (zero length or non-finite).
#[must_use]
pub fn rotation_about_axis<In>(
    axis: &Vector<In>,
    angle: impl Into<Angle>,
) -> Option<Rotation<In, In>> {
    if !axis.is_finite() {
        return None;
    }
    let axis = Unit::try_new(axis.inner, f64::EPSILON)?;
    let angle = angle.into().get::<radian>();
    angle
        .is_finite()
        .then(|| Rotation::from_nalgebra_rotation(Rotation3::from_axis_angle(&axis, angle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate_systems::Ned;
    use crate::geodetic::{Components, Wgs84};
    use approx::{assert_relative_eq, RelativeEq};
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;
    use uom::si::angle::degree;
    use uom::si::f64::Length;
    use uom::si::length::meter;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }
    fn ecef_at(lat: f64, lon: f64, h: f64) -> Coordinate<Ecef> {
        Coordinate::from_wgs84(
            &Wgs84::build(Components {
                latitude: d(lat),
                longitude: d(lon),
                height: m(h),
            })
            .expect("latitude is in [-90, 90]"),
        )
    }

    #[rstest]
    #[case(d(90.), d(0.), d(0.), Vector3::x(), -Vector3::y())]
    #[case(d(0.), d(90.), d(0.), Vector3::x(), Vector3::z())]
    #[case(d(0.), d(0.), d(90.), Vector3::z(), Vector3::y())]
    #[case(d(0.), d(0.), d(0.), Vector3::y(), Vector3::y())]
    fn euler_axis_conventions(
        #[case] yaw: Angle,
        #[case] pitch: Angle,
        #[case] roll: Angle,
        #[case] input: Vector3,
        #[case] expected: Vector3,
    ) {
        let r = euler_rotation(yaw, pitch, roll);
        assert_relative_eq!(r.transform_vector(&input), expected, epsilon = 1e-12);
    }

    #[test]
    fn euler_decomposition_roundtrip() {
        let (yaw, pitch, roll) = (0.15, -1.3, 0.42);
        let r = euler_rotation(
            Angle::new::<radian>(yaw),
            Angle::new::<radian>(pitch),
            Angle::new::<radian>(roll),
        );
        let (y, p, r) = decompose_euler(&r);
        assert_relative_eq!(y.get::<radian>(), yaw, epsilon = 1e-12);
        assert_relative_eq!(p.get::<radian>(), pitch, epsilon = 1e-12);
        assert_relative_eq!(r.get::<radian>(), roll, epsilon = 1e-12);
    }

    #[test]
    fn fixed_bases_compose() {
        assert_relative_eq!(ecef_to_view(), ecef_to_ned() * ned_to_view());
        for b in [ecef_to_ned(), ned_to_view(), ecef_to_view()] {
            assert_relative_eq!(b.determinant(), 1.);
            assert_relative_eq!(b * b.transpose(), Matrix4::identity());
        }
    }

    fn is_orthonormal(m: &Matrix4<f64>) -> bool {
        (m.determinant() - 1.).abs() < 1e-9
            && (m * m.transpose()).relative_eq(&Matrix4::identity(), 1e-9, 1e-9)
    }

    quickcheck! {
        fn compositions_stay_orthonormal(yaw: f64, pitch: f64, roll: f64) -> TestResult {
            if !(yaw.is_finite() && pitch.is_finite() && roll.is_finite()) {
                return TestResult::discard();
            }
            // keep the angles in a few turns so sin/cos stay accurate
            let [yaw, pitch, roll] = [yaw, pitch, roll].map(|a| Angle::new::<radian>(a % 20.));
            let r = euler_rotation(yaw, pitch, roll);
            TestResult::from_bool(
                is_orthonormal(&r)
                    && is_orthonormal(&(ecef_to_ned() * r * ned_to_view()))
                    && is_orthonormal(&(r * ecef_to_view()))
            )
        }
    }

    #[test]
    fn local_ned_on_the_equator() {
        let converter = GeoConverter::default();

        let (north, east, down) = local_ned_basis(&ecef_at(0., 0., 0.), &converter);
        assert_relative_eq!(north.inner, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(east.inner, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(down.inner, -Vector3::x(), epsilon = 1e-12);

        let (north, east, down) = local_ned_basis(&ecef_at(0., 90., 0.), &converter);
        assert_relative_eq!(north.inner, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(east.inner, -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(down.inner, -Vector3::y(), epsilon = 1e-12);
    }

    #[rstest]
    #[case(52.5, 13.4, 100.)]
    #[case(-33.9, 18.4, 0.)]
    #[case(89., -179., 10_000.)]
    #[case(-12., -77., 2_000_000.)]
    fn local_ned_is_right_handed(#[case] lat: f64, #[case] lon: f64, #[case] h: f64) {
        let converter = GeoConverter::default();
        let p = ecef_at(lat, lon, h);
        let (north, east, down) = local_ned_basis(&p, &converter);
        assert_relative_eq!(north.cross(&east), down, epsilon = 1e-12);
        assert_relative_eq!(north.dot(&east), 0., epsilon = 1e-12);
        assert_relative_eq!(down.magnitude().get::<meter>(), 1., epsilon = 1e-12);
        assert!(is_orthonormal(&local_ned_matrix(&p, &converter)));

        // down is the (negated) ellipsoid normal at the foot point
        assert_relative_eq!(
            down,
            -converter.ellipsoid().surface_normal(&ecef_at(lat, lon, 0.)),
            epsilon = 1e-9
        );

        let rotation = local_ned_rotation::<Ned>(&p, &converter);
        assert_relative_eq!(rotation * Vector::<Ned>::ned_east_axis(), east, epsilon = 1e-12);
    }

    #[test]
    fn view_basis_looks_north() {
        let r = ned_to_view_rotation::<Ned, View>();
        assert_relative_eq!(
            -(r * Vector::<View>::view_back_axis()),
            Vector::<Ned>::ned_north_axis()
        );
        assert_relative_eq!(
            r * Vector::<View>::view_right_axis(),
            Vector::<Ned>::ned_east_axis()
        );
        assert_relative_eq!(
            r * Vector::<View>::view_up_axis(),
            -Vector::<Ned>::ned_down_axis()
        );
    }

    #[test]
    fn basis_roundtrip() {
        let r = euler_rotation(d(10.), d(20.), d(30.));
        let (x, y, z) = extract_basis::<Ecef>(&r);
        assert_eq!(make_basis(&x, &y, &z), r);
    }

    #[test]
    fn orthonormalize_fixes_skew() {
        let skewed = Matrix3::new(1.01, 0.02, 0., 0., 0.98, 0.01, 0.001, 0., 1.03);
        let fixed = orthonormalize(&skewed);
        assert_relative_eq!(fixed * fixed.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(fixed.determinant(), 1., epsilon = 1e-12);
        // the first column keeps its direction
        assert_relative_eq!(
            fixed.column(0).into_owned(),
            skewed.column(0).normalize(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn look_at_builds_view_basis() {
        let eye = Coordinate::<Ecef>::from_cartesian(m(5.), m(0.), m(0.));
        let r = look_at(eye, Coordinate::origin(), Vector::<Ecef>::z_axis());
        let (right, up, back) = r.basis();
        assert_relative_eq!(right, Vector::<Ecef>::y_axis());
        assert_relative_eq!(up, Vector::<Ecef>::z_axis());
        assert_relative_eq!(back, Vector::<Ecef>::x_axis());
    }

    #[test]
    fn look_at_with_parallel_up_still_forms_a_basis() {
        let eye = Coordinate::<Ecef>::from_cartesian(m(0.), m(0.), m(10.));
        let r = look_at(eye, Coordinate::origin(), Vector::<Ecef>::z_axis());
        assert!(r.is_finite());
        assert!(is_orthonormal(&r.to_homogeneous()));
        let (_, _, back) = r.basis();
        assert_relative_eq!(back, Vector::<Ecef>::z_axis(), epsilon = 1e-3);
    }

    #[rstest]
    #[case(0.)]
    #[case(45.)]
    #[case(90.)]
    fn tilted_orientation_tilts_from_nadir(#[case] tilt: f64) {
        let converter = GeoConverter::default();
        let p = ecef_at(48.1, 11.6, 1500.);
        let (north, east, down) = local_ned_basis(&p, &converter);
        let r = tilted_orientation(&p, &converter, d(tilt));
        let (right, _, back) = r.basis();

        assert!(is_orthonormal(&r.to_homogeneous()));
        assert_relative_eq!(right, east);
        assert_relative_eq!((-back).angle_to(&down).get::<degree>(), tilt, epsilon = 1e-9);
        if tilt > 0. {
            assert!((-back).dot(&north) > 0.);
        }
    }

    #[test]
    fn rotation_about_axis_follows_right_hand_rule() {
        let r = rotation_about_axis(&Vector::<Ecef>::z_axis(), d(90.)).expect("axis is non-zero");
        assert_relative_eq!(
            r * Vector::<Ecef>::x_axis(),
            Vector::<Ecef>::y_axis(),
            epsilon = 1e-12
        );
        assert!(rotation_about_axis(&Vector::<Ecef>::zero(), d(90.)).is_none());
        assert!(rotation_about_axis(&Vector::<Ecef>::x_axis(), d(f64::NAN)).is_none());
    }
}
