//! Conversions between ECEF, geodetic, and UTM positions on a configurable ellipsoid.

use crate::ellipsoid::Ellipsoid;
use crate::geodetic::{ecef_to_geodetic, geodetic_to_ecef, Wgs84};
use crate::systems::Ecef;
use crate::utm::{geodetic_to_utm, utm_to_geodetic, Utm, UtmZone};
use crate::Coordinate;
use uom::si::f64::{Angle, Length};
use uom::si::{angle::radian, length::meter};
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Converts positions between ECEF and geodetic or UTM coordinates.
///
/// The converter carries an optional constant height offset for correcting datum height
/// discrepancies: it is added to the height when going from geodetic (or UTM) to ECEF, and
/// subtracted when going the other way, so conversions still round-trip.
///
/// Non-finite input never panics; NaN simply propagates into the output.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeoConverter {
    ellipsoid: Ellipsoid,
    height_offset: Length,
}

impl Default for GeoConverter {
    fn default() -> Self {
        Self::new(Ellipsoid::WGS84)
    }
}

impl GeoConverter {
    #[must_use]
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            height_offset: Length::ZERO,
        }
    }

    /// Returns a converter that applies the given height offset.
    #[must_use]
    pub fn with_height_offset(self, height_offset: impl Into<Length>) -> Self {
        Self {
            height_offset: height_offset.into(),
            ..self
        }
    }

    #[must_use]
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    #[must_use]
    pub fn height_offset(&self) -> Length {
        self.height_offset
    }

    /// Converts a geodetic position into ECEF.
    #[must_use]
    pub fn to_ecef(&self, position: &Wgs84) -> Coordinate<Ecef> {
        Coordinate::from_nalgebra_point(geodetic_to_ecef(
            &self.ellipsoid,
            position.latitude.get::<radian>(),
            position.longitude.get::<radian>(),
            (position.height + self.height_offset).get::<meter>(),
        ))
    }

    /// Converts an ECEF position into geodetic latitude, longitude, and height.
    #[must_use]
    pub fn to_geodetic(&self, position: &Coordinate<Ecef>) -> Wgs84 {
        let (lat, lon, height) = ecef_to_geodetic(&self.ellipsoid, &position.point);
        Wgs84 {
            latitude: Angle::new::<radian>(lat),
            longitude: Angle::new::<radian>(lon),
            height: Length::new::<meter>(height) - self.height_offset,
        }
    }

    /// Projects an ECEF position into the given UTM zone.
    ///
    /// The zone does not have to contain the position, though accuracy degrades the further
    /// the position is from the zone's central meridian.
    #[must_use]
    pub fn to_utm(&self, position: &Coordinate<Ecef>, zone: UtmZone) -> Utm {
        let geodetic = self.to_geodetic(position);
        let (easting, northing) = geodetic_to_utm(
            &self.ellipsoid,
            geodetic.latitude.get::<radian>(),
            geodetic.longitude.get::<radian>(),
            zone,
        );
        Utm {
            easting: Length::new::<meter>(easting),
            northing: Length::new::<meter>(northing),
            height: geodetic.height,
            zone,
        }
    }

    /// Projects an ECEF position into the UTM zone that contains it.
    #[must_use]
    pub fn to_utm_in_containing_zone(&self, position: &Coordinate<Ecef>) -> Utm {
        let geodetic = self.to_geodetic(position);
        self.to_utm(
            position,
            UtmZone::containing(geodetic.latitude, geodetic.longitude),
        )
    }

    /// Converts a UTM position back into ECEF.
    #[must_use]
    pub fn utm_to_ecef(&self, utm: &Utm) -> Coordinate<Ecef> {
        let (lat, lon) = utm_to_geodetic(
            &self.ellipsoid,
            utm.easting.get::<meter>(),
            utm.northing.get::<meter>(),
            utm.zone,
        );
        self.to_ecef(&Wgs84 {
            latitude: Angle::new::<radian>(lat),
            longitude: Angle::new::<radian>(lon),
            height: utm.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::GeoConverter;
    use crate::coordinate_systems::Ecef;
    use crate::ellipsoid::Ellipsoid;
    use crate::geodetic::{Components, Wgs84};
    use crate::utm::{Hemisphere, Utm, UtmZone};
    use crate::Coordinate;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;
    use uom::si::f64::{Angle, Length};
    use uom::si::{angle::degree, length::meter};

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }
    fn wgs84(lat: f64, lon: f64, h: f64) -> Wgs84 {
        Wgs84::build(Components {
            latitude: d(lat),
            longitude: d(lon),
            height: m(h),
        })
        .expect("latitude is in [-90, 90]")
    }

    #[test]
    fn default_matches_wgs84_conversions() {
        let converter = GeoConverter::default();
        let p = wgs84(52.5, 13.4, 34.);
        assert_relative_eq!(converter.to_ecef(&p), Coordinate::<Ecef>::from_wgs84(&p));
        assert_relative_eq!(converter.to_geodetic(&converter.to_ecef(&p)), p);
    }

    #[test]
    fn height_offset_is_applied_in_both_directions() {
        let plain = GeoConverter::default();
        let offset = GeoConverter::default().with_height_offset(m(42.));
        let p = wgs84(-33.9, 18.4, 100.);

        // the offset lifts the point on the way into ECEF
        assert_abs_diff_eq!(
            offset.to_ecef(&p).distance_from_origin().get::<meter>()
                - plain.to_ecef(&p).distance_from_origin().get::<meter>(),
            42.,
            epsilon = 1e-6
        );

        // and is removed again on the way back
        let back = offset.to_geodetic(&offset.to_ecef(&p));
        assert_abs_diff_eq!(back.height().get::<meter>(), 100., epsilon = 1e-3);
        assert_relative_eq!(back, p);
    }

    #[rstest]
    #[case(45., 3., 0.)]
    #[case(-45., 3., 250.)]
    #[case(37.7749, -122.4194, 16.)]
    #[case(35.3619, 138.7280, 3776.)]
    #[case(-0.0001, 179.9, -20.)]
    fn utm_roundtrip(#[case] lat: f64, #[case] lon: f64, #[case] h: f64) {
        let converter = GeoConverter::default().with_height_offset(m(-3.));
        let ecef = converter.to_ecef(&wgs84(lat, lon, h));
        let utm = converter.to_utm_in_containing_zone(&ecef);
        assert_abs_diff_eq!(utm.height.get::<meter>(), h, epsilon = 1e-3);
        assert_relative_eq!(converter.utm_to_ecef(&utm), ecef, epsilon = m(1e-3));
    }

    #[test]
    fn known_utm() {
        let converter = GeoConverter::default();
        let ecef = converter.to_ecef(&wgs84(45., 3., 10.));
        let utm = converter.to_utm_in_containing_zone(&ecef);
        assert_relative_eq!(
            utm,
            Utm {
                easting: m(500_000.),
                northing: m(4_982_950.400_226_552),
                height: m(10.),
                zone: UtmZone::new(31, Hemisphere::North).expect("valid zone"),
            }
        );
        insta::assert_snapshot!(utm, @"31N 500000.000mE 4982950.400mN 10.000m");
    }

    #[test]
    fn non_finite_propagates() {
        let converter = GeoConverter::new(Ellipsoid::WGS84);
        let nan = converter.to_geodetic(&Coordinate::from_cartesian(
            m(f64::NAN),
            m(1.),
            m(1.),
        ));
        assert!(nan.latitude().get::<degree>().is_nan());
        let back = converter.to_ecef(&nan);
        assert!(!back.is_finite());
    }
}
