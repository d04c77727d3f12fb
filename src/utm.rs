//! Universal Transverse Mercator grid coordinates.
//!
//! The projection is the Krüger series to sixth order in the third flattening, using the
//! coefficients from Karney, "Transverse Mercator with an accuracy of a few nanometers" (2011).
//! That is accurate to well below a millimeter within a zone and degrades gracefully a few
//! degrees outside of it.

use crate::ellipsoid::Ellipsoid;
use std::fmt;
use std::fmt::Display;
use uom::si::f64::{Angle, Length};
use uom::si::{angle::radian, length::meter};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale factor on the central meridian.
const K0: f64 = 0.9996;
/// Easting of the central meridian.
const FALSE_EASTING: f64 = 500_000.;
/// Northing of the equator in the southern hemisphere.
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.;
const ZONE_WIDTH_DEGREES: f64 = 6.;
const MAX_NEWTON_STEPS: usize = 20;

/// Which side of the equator a [`UtmZone`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hemisphere {
    North,
    South,
}

/// One of the sixty 6°-wide UTM longitude bands, together with its hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    /// Returns `None` unless `number` is in `1..=60`.
    #[must_use]
    pub fn new(number: u8, hemisphere: Hemisphere) -> Option<Self> {
        (1..=60)
            .contains(&number)
            .then_some(Self { number, hemisphere })
    }

    /// The zone whose band contains the given latitude and longitude.
    ///
    /// The Norway and Svalbard exceptions are not applied; zones are strictly 6° wide.
    #[must_use]
    pub fn containing(latitude: Angle, longitude: Angle) -> Self {
        let lon = crate::util::BoundedAngle::new(longitude)
            .to_signed_range()
            .to_degrees();
        // lon is in [-180, 180), so this is in 0..60
        let number = ((lon + 180.) / ZONE_WIDTH_DEGREES).floor() as u8 + 1;
        let hemisphere = if latitude.get::<radian>() < 0. {
            Hemisphere::South
        } else {
            Hemisphere::North
        };
        Self {
            number: number.clamp(1, 60),
            hemisphere,
        }
    }

    #[must_use]
    pub fn number(&self) -> u8 {
        self.number
    }

    #[must_use]
    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// The longitude of the zone's central meridian.
    #[must_use]
    pub fn central_meridian(&self) -> Angle {
        Angle::new::<radian>(
            (f64::from(self.number - 1) * ZONE_WIDTH_DEGREES - 180. + ZONE_WIDTH_DEGREES / 2.)
                .to_radians(),
        )
    }

    fn false_northing(&self) -> f64 {
        match self.hemisphere {
            Hemisphere::North => 0.,
            Hemisphere::South => FALSE_NORTHING_SOUTH,
        }
    }
}

impl Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        };
        write!(f, "{}{h}", self.number)
    }
}

/// A position in UTM grid coordinates, with height above the reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Utm {
    pub easting: Length,
    pub northing: Length,
    pub height: Length,
    pub zone: UtmZone,
}

impl Display for Utm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.3}mE {:.3}mN {:.3}m",
            self.zone,
            self.easting.get::<meter>(),
            self.northing.get::<meter>(),
            self.height.get::<meter>()
        )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Utm {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        Length::new::<meter>(0.001)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        let epsilon = epsilon.get::<meter>();
        self.zone == other.zone
            && [
                (self.easting, other.easting),
                (self.northing, other.northing),
                (self.height, other.height),
            ]
            .iter()
            .all(|(a, b)| a.get::<meter>().abs_diff_eq(&b.get::<meter>(), epsilon))
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Utm {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(f64::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let (epsilon, max_relative) = (epsilon.get::<meter>(), max_relative.get::<meter>());
        self.zone == other.zone
            && [
                (self.easting, other.easting),
                (self.northing, other.northing),
                (self.height, other.height),
            ]
            .iter()
            .all(|(a, b)| {
                a.get::<meter>()
                    .relative_eq(&b.get::<meter>(), epsilon, max_relative)
            })
    }
}

/// The series constants of the transverse Mercator projection for one ellipsoid.
struct Krueger {
    /// Rectifying radius.
    big_a: f64,
    e: f64,
    e2: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl Krueger {
    fn new(ellipsoid: &Ellipsoid) -> Self {
        let n = ellipsoid.third_flattening();
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let big_a = ellipsoid.a() / (1. + n) * (1. + n2 / 4. + n4 / 64. + n6 / 256.);

        let alpha = [
            n / 2. - 2. * n2 / 3. + 5. * n3 / 16. + 41. * n4 / 180. - 127. * n5 / 288.
                + 7891. * n6 / 37800.,
            13. * n2 / 48. - 3. * n3 / 5. + 557. * n4 / 1440. + 281. * n5 / 630.
                - 1_983_433. * n6 / 1_935_360.,
            61. * n3 / 240. - 103. * n4 / 140. + 15061. * n5 / 26880. + 167_603. * n6 / 181_440.,
            49561. * n4 / 161_280. - 179. * n5 / 168. + 6_601_661. * n6 / 7_257_600.,
            34729. * n5 / 80640. - 3_418_889. * n6 / 1_995_840.,
            212_378_941. * n6 / 319_334_400.,
        ];
        let beta = [
            n / 2. - 2. * n2 / 3. + 37. * n3 / 96. - n4 / 360. - 81. * n5 / 512.
                + 96199. * n6 / 604_800.,
            n2 / 48. + n3 / 15. - 437. * n4 / 1440. + 46. * n5 / 105.
                - 1_118_711. * n6 / 3_870_720.,
            17. * n3 / 480. - 37. * n4 / 840. - 209. * n5 / 4480. + 5569. * n6 / 90720.,
            4397. * n4 / 161_280. - 11. * n5 / 504. - 830_251. * n6 / 7_257_600.,
            4583. * n5 / 161_280. - 108_847. * n6 / 3_991_680.,
            20_648_693. * n6 / 638_668_800.,
        ];

        let e2 = ellipsoid.eccentricity_sq();
        Self {
            big_a,
            e: e2.sqrt(),
            e2,
            alpha,
            beta,
        }
    }

    /// Conformal latitude, expressed as tan(χ) given tan(φ).
    fn tau_prime(&self, tau: f64) -> f64 {
        let sigma = (self.e * (self.e * tau / (1. + tau * tau).sqrt()).atanh()).sinh();
        tau * (1. + sigma * sigma).sqrt() - sigma * (1. + tau * tau).sqrt()
    }
}

/// Projects a geodetic latitude/longitude (radians) into `zone`, returning (easting, northing)
/// in meters.
pub(crate) fn geodetic_to_utm(
    ellipsoid: &Ellipsoid,
    lat: f64,
    lon: f64,
    zone: UtmZone,
) -> (f64, f64) {
    let k = Krueger::new(ellipsoid);
    let lambda = lon - zone.central_meridian().get::<radian>();

    let tau_p = k.tau_prime(lat.tan());
    let (sin_l, cos_l) = lambda.sin_cos();
    let xi_p = tau_p.atan2(cos_l);
    let eta_p = (sin_l / (tau_p * tau_p + cos_l * cos_l).sqrt()).asinh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, alpha) in (1_u32..).zip(k.alpha) {
        let two_j = 2. * f64::from(j);
        xi += alpha * (two_j * xi_p).sin() * (two_j * eta_p).cosh();
        eta += alpha * (two_j * xi_p).cos() * (two_j * eta_p).sinh();
    }

    let easting = FALSE_EASTING + K0 * k.big_a * eta;
    let northing = zone.false_northing() + K0 * k.big_a * xi;
    (easting, northing)
}

/// Inverts [`geodetic_to_utm`], returning (latitude, longitude) in radians.
pub(crate) fn utm_to_geodetic(
    ellipsoid: &Ellipsoid,
    easting: f64,
    northing: f64,
    zone: UtmZone,
) -> (f64, f64) {
    let k = Krueger::new(ellipsoid);
    let xi = (northing - zone.false_northing()) / (K0 * k.big_a);
    let eta = (easting - FALSE_EASTING) / (K0 * k.big_a);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in (1_u32..).zip(k.beta) {
        let two_j = 2. * f64::from(j);
        xi_p -= beta * (two_j * xi).sin() * (two_j * eta).cosh();
        eta_p -= beta * (two_j * xi).cos() * (two_j * eta).sinh();
    }

    let sinh_eta_p = eta_p.sinh();
    let cos_xi_p = xi_p.cos();
    let tau_p = xi_p.sin() / (sinh_eta_p * sinh_eta_p + cos_xi_p * cos_xi_p).sqrt();

    // solve tau_prime(tau) = tau_p for tau, starting from the spherical answer
    let mut tau = tau_p;
    for _ in 0..MAX_NEWTON_STEPS {
        let tau_i = k.tau_prime(tau);
        let dtau = (tau_p - tau_i) / (1. + tau_i * tau_i).sqrt()
            * (1. + (1. - k.e2) * tau * tau)
            / ((1. - k.e2) * (1. + tau * tau).sqrt());
        tau += dtau;
        if dtau.is_nan() || dtau.abs() < 1e-12 {
            break;
        }
    }

    let lat = tau.atan();
    let lon = zone.central_meridian().get::<radian>() + sinh_eta_p.atan2(cos_xi_p);
    (lat, lon)
}
