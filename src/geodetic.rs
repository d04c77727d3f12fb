use crate::ellipsoid::Ellipsoid;
use crate::{systems::Ecef, util::BoundedAngle, Coordinate, Point3};
use std::fmt;
use std::fmt::Display;
use std::marker::PhantomData;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::meter,
};
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound on Newton steps in [`ecef_to_geodetic`]; it converges in two or three.
const MAX_ITERATIONS: usize = 16;

/// Representing an Earth-bound location using the [World Geodetic System
/// '84](https://en.wikipedia.org/wiki/World_Geodetic_System#WGS_84).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Wgs84 {
    // NOTE: uom does not guarantee how these angles are normalized -- they might be [-180,180) or
    // [0,360), or something else altogether. the accessors normalize on the way out.
    pub(crate) latitude: Angle,
    pub(crate) longitude: Angle,
    pub(crate) height: Length,
}

impl Wgs84 {
    /// Constructs a world location from latitude, longitude, and height.
    ///
    /// The latitude must be in [-90°,90°] % 360°. If it is not, this function returns `None`.
    ///
    /// The height is measured as distance above the WGS84 reference ellipsoid.
    #[must_use]
    pub fn build(
        Components {
            latitude,
            longitude,
            height,
        }: Components,
    ) -> Option<Self> {
        Some(
            Self::builder()
                .latitude(latitude)?
                .longitude(longitude)
                .height(height)
                .build(),
        )
    }

    /// Provides a constructor for a [`Wgs84`] coordinate.
    pub fn builder() -> Builder<MissingLatitude, MissingLongitude, MissingHeight> {
        Builder {
            under_construction: Wgs84 {
                latitude: Angle::ZERO,
                longitude: Angle::ZERO,
                height: Length::ZERO,
            },
            has: (PhantomData, PhantomData, PhantomData),
        }
    }

    /// Computes the [great-circle distance] between the two locations on the surface of
    /// the earth.
    ///
    /// Note that this is an approximation as the earth is not a perfect sphere.
    ///
    /// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
    #[doc(alias = "great_circle_distance")]
    #[must_use]
    pub fn haversine_distance_on_surface(&self, other: &Wgs84) -> Length {
        let haversine = central_angle_by_inverse_haversine(
            self.latitude,
            other.latitude,
            self.longitude,
            other.longitude,
        );

        haversine * Ellipsoid::WGS84.semi_major_axis()
    }

    /// Returns the angle north of the equator, in [-90°, 90°].
    #[must_use]
    pub fn latitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.latitude).to_signed_range())
    }

    /// Returns the angle east of the [IERS Reference Meridian], in [-180°, 180°).
    ///
    /// [IERS Reference Meridian]: https://en.wikipedia.org/wiki/IERS_Reference_Meridian
    #[must_use]
    pub fn longitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.longitude).to_signed_range())
    }

    /// Returns the distance above the reference ellipsoid, along its normal.
    ///
    /// Note that the ellipsoid does not perfectly align with ground level. Thus, while this is
    /// similar to altitude above sea/ground level, it is not equal to either of those measures.
    #[must_use]
    pub fn height(&self) -> Length {
        self.height
    }
}

impl Display for Wgs84 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.latitude();
        let lat_is_positive = lat.is_sign_positive();
        let lat = lat.abs().get::<degree>();
        let lon = self.longitude();
        let lon_is_positive = lon.is_sign_positive();
        let lon = lon.abs().get::<degree>();
        let h = self.height.get::<meter>();
        let ns = if lat_is_positive { 'N' } else { 'S' };
        let ew = if lon_is_positive { 'E' } else { 'W' };
        write!(f, "{lat:.7}°{ns}, {lon:.7}°{ew}, {h:.3}m")
    }
}

/// Converts geodetic latitude, longitude (radians) and height (meters) on `ellipsoid` into ECEF.
///
/// See:
/// <https://en.wikipedia.org/wiki/Geographic_coordinate_conversion#From_geodetic_to_ECEF_coordinates>
pub(crate) fn geodetic_to_ecef(
    ellipsoid: &Ellipsoid,
    lat_phi: f64,
    lon_lambda: f64,
    h: f64,
) -> Point3 {
    let e2 = ellipsoid.eccentricity_sq();
    // https://en.wikipedia.org/wiki/Earth_radius#Prime_vertical
    let (sin_phi, cos_phi) = lat_phi.sin_cos();
    let n_phi = ellipsoid.a() / (1. - e2 * sin_phi * sin_phi).sqrt();

    let x = (n_phi + h) * cos_phi * lon_lambda.cos();
    let y = (n_phi + h) * cos_phi * lon_lambda.sin();
    let z = ((1. - e2) * n_phi + h) * sin_phi;

    Point3::new(x, y, z)
}

/// Converts an ECEF point into geodetic (latitude, longitude, height) on `ellipsoid`, with the
/// angles in radians and the height in meters.
///
/// Non-finite input yields NaN output rather than a panic.
pub(crate) fn ecef_to_geodetic(ellipsoid: &Ellipsoid, point: &Point3) -> (f64, f64, f64) {
    let lon = point.y.atan2(point.x);

    // there is no single way to convert from ECEF to geodetic coordinates, but the closed-form
    // solutions tend to have worse boundary conditions _and_ be slower than iterating. we use
    //
    //   An iterative algorithm to compute geodetic coordinates
    //   Chanfang Shu, Fei Li
    //   https://www.sciencedirect.com/science/article/pii/S0098300410001238
    //
    // which parameterizes the foot point on the ellipse by k (roughly height over the local
    // radius of curvature) and finds the root of
    //
    //   G(k) = p^2 q^2 - r^2 q^2 - z^2 p^2,  with p = a + b k, q = b + a k
    //
    // using Newton's method from a very good initial guess.
    let a = ellipsoid.a();
    let b = ellipsoid.b();
    let a2 = a.powi(2);
    let b2 = b.powi(2);
    let ab = a * b;
    let z2 = point.z.powi(2);
    let r2 = point.x.powi(2) + point.y.powi(2);
    let r = r2.sqrt();
    let bigr2 = r2 + z2;

    let mut k = (((a2 * z2 + b2 * r2).sqrt() - ab) * bigr2) / (a2 * z2 + b2 * r2);
    for _ in 0..MAX_ITERATIONS {
        let p = a + b * k;
        let q = b + a * k;
        let g = p * p * q * q - r2 * q * q - z2 * p * p;
        let dg = 2. * (b * p * q.powi(2) + a * p.powi(2) * q - a * r2 * q - b * z2 * p);
        let dk = -g / dg;

        if !dk.is_finite() || dk.abs() <= f64::EPSILON * k.abs().max(1.) {
            // don't propagate inf into k and stop once there's no further refinement
            break;
        }

        k += dk;
    }

    let p = a + b * k;
    let q = b + a * k;
    let lat = (a * p * point.z).atan2(b * q * r);
    let height = k * ((b2 * r2 / p.powi(2)) + (a2 * z2 / q.powi(2))).sqrt();

    (lat, lon, height)
}

impl Coordinate<Ecef> {
    /// Converts latitude, longitude, and height to the Earth-Centered, Earth-Fixed coordinate
    /// system.
    #[must_use]
    pub fn from_wgs84(wgs84: &Wgs84) -> Self {
        Self::from_nalgebra_point(geodetic_to_ecef(
            &Ellipsoid::WGS84,
            wgs84.latitude.get::<radian>(),
            wgs84.longitude.get::<radian>(),
            wgs84.height.get::<meter>(),
        ))
    }

    /// Converts an Earth-Centered, Earth-Fixed coordinate into latitude, longitude, and height.
    ///
    /// This conversion has no closed form that behaves well everywhere, so it is computed
    /// iteratively (see `ecef_to_geodetic`). The ellipsoid's center has no defined latitude and
    /// yields NaN components.
    #[must_use]
    pub fn to_wgs84(&self) -> Wgs84 {
        let (lat, lon, height) = ecef_to_geodetic(&Ellipsoid::WGS84, &self.point);

        // NOTE: not going through the builder; atan2 always lands in [-pi/2, pi/2] here since
        // its second argument is non-negative, and NaN must propagate instead of panicking.
        Wgs84 {
            latitude: Angle::new::<radian>(lat),
            longitude: Angle::new::<radian>(lon),
            height: Length::new::<meter>(height),
        }
    }
}

impl From<Coordinate<Ecef>> for Wgs84 {
    fn from(ecef: Coordinate<Ecef>) -> Self {
        ecef.to_wgs84()
    }
}

impl From<Wgs84> for Coordinate<Ecef> {
    fn from(wgs84: Wgs84) -> Self {
        Self::from_wgs84(&wgs84)
    }
}

/// Computes the central angle between the given lat/lon points.
///
/// The current implementation computes this [using the archaversine] (inverse haversine).
///
/// [using the archaversine]: https://en.wikipedia.org/wiki/Haversine_formula#Formulation
pub(crate) fn central_angle_by_inverse_haversine(
    lat_a: Angle,
    lat_b: Angle,
    lon_a: Angle,
    lon_b: Angle,
) -> Angle {
    let lat_a = lat_a.get::<radian>(); // φ1
    let lat_b = lat_b.get::<radian>(); // φ2
    let lon_a = lon_a.get::<radian>(); // λ1
    let lon_b = lon_b.get::<radian>(); // λ2
    let delta_lat = lat_b - lat_a;
    let delta_lon = lon_b - lon_a;

    let inner = 1. - delta_lat.cos() + lat_a.cos() * lat_b.cos() * (1. - delta_lon.cos());
    Angle::new::<radian>(2. * (inner / 2.).sqrt().asin())
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Wgs84 {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        // NOTE: millimeter precision on the surface; the iterative inverse comfortably meets it
        Length::new::<meter>(0.001)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.haversine_distance_on_surface(other) < epsilon
            && self
                .height
                .get::<meter>()
                .abs_diff_eq(&other.height.get::<meter>(), epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Wgs84 {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(f64::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.haversine_distance_on_surface(other)
            .get::<meter>()
            .abs_diff_eq(&0., epsilon.get::<meter>())
            && self.height.get::<meter>().relative_eq(
                &other.height.get::<meter>(),
                epsilon.get::<meter>(),
                max_relative.get::<meter>(),
            )
    }
}

/// Argument type for [`Wgs84::build`].
#[derive(Debug, Default)]
#[must_use]
pub struct Components {
    /// The latitude angle of the proposed [`Wgs84`] coordinate.
    ///
    /// The latitude must be in [-90°,90°] % 360°. If it is not, [`Wgs84::build`] returns `None`.
    pub latitude: Angle,

    /// The longitude angle of the proposed [`Wgs84`] coordinate.
    pub longitude: Angle,

    /// The height above the reference ellipsoid of the proposed [`Wgs84`] coordinate.
    pub height: Length,
}

/// Used to indicate that a partially-constructed [`Wgs84`] is missing the latitude component.
pub struct MissingLatitude;
/// Used to indicate that a partially-constructed [`Wgs84`] has the latitude component set.
pub struct HasLatitude;
/// Used to indicate that a partially-constructed [`Wgs84`] is missing the longitude component.
pub struct MissingLongitude;
/// Used to indicate that a partially-constructed [`Wgs84`] has the longitude component set.
pub struct HasLongitude;
/// Used to indicate that a partially-constructed [`Wgs84`] is missing the height component.
pub struct MissingHeight;
/// Used to indicate that a partially-constructed [`Wgs84`] has the height component set.
pub struct HasHeight;

/// [Builder] for a [`Wgs84`] coordinate.
///
/// Construct one through [`Wgs84::builder`], and finalize with [`Builder::build`].
///
/// [Builder]: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
#[derive(Debug)]
#[must_use]
pub struct Builder<Latitude, Longitude, Height> {
    under_construction: Wgs84,
    has: (
        PhantomData<Latitude>,
        PhantomData<Longitude>,
        PhantomData<Height>,
    ),
}

// manual impls of Clone and Copy to avoid requiring the markers to be Copy + Clone
impl<L1, L2, H> Clone for Builder<L1, L2, H> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<L1, L2, H> Copy for Builder<L1, L2, H> {}

impl<L1, L2, H> Builder<L1, L2, H> {
    /// Sets the latitudal angle of the [`Wgs84`]-to-be.
    ///
    /// The latitude must be in [-90°,90°] % 360°. If it is not, this function returns `None`.
    pub fn latitude(mut self, latitude: impl Into<Angle>) -> Option<Builder<HasLatitude, L2, H>> {
        let latitude = latitude.into();
        let latitude_in_signed_radians = BoundedAngle::new(latitude).to_signed_range();
        if !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2)
            .contains(&latitude_in_signed_radians)
        {
            None
        } else {
            self.under_construction.latitude = latitude;
            Some(Builder {
                under_construction: self.under_construction,
                has: (PhantomData::<HasLatitude>, self.has.1, self.has.2),
            })
        }
    }

    /// Sets the longitudal angle of the [`Wgs84`]-to-be.
    pub fn longitude(mut self, longitude: impl Into<Angle>) -> Builder<L1, HasLongitude, H> {
        self.under_construction.longitude = longitude.into();
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, PhantomData::<HasLongitude>, self.has.2),
        }
    }

    /// Sets the height of the [`Wgs84`]-to-be.
    ///
    /// The height is measured as distance above the WGS84 reference ellipsoid.
    pub fn height(mut self, height: impl Into<Length>) -> Builder<L1, L2, HasHeight> {
        self.under_construction.height = height.into();
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, self.has.1, PhantomData::<HasHeight>),
        }
    }
}

impl Builder<HasLatitude, HasLongitude, HasHeight> {
    #[must_use]
    pub fn build(self) -> Wgs84 {
        self.under_construction
    }
}
