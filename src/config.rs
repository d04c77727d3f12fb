//! Tunables for the navigators.

use crate::ellipsoid::Ellipsoid;
use crate::error::ConfigError;
use uom::si::angle::degree;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings shared by the navigators.
///
/// Angles are in degrees and distances in meters so the configuration reads naturally when
/// written by hand. Missing fields take their [`Default`] values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct NavigatorConfig {
    /// Vertical field of view of the orbiting camera.
    pub vertical_fov_degrees: f64,
    pub near_meters: f64,
    pub far_meters: f64,

    /// Smallest tilt (away from nadir) an orbit gesture may produce.
    pub min_tilt_degrees: f64,
    /// Largest tilt (away from nadir) an orbit gesture may produce.
    pub max_tilt_degrees: f64,
    /// Tilt used by [`OrbitingNavigator::tilted_at`](crate::navigator::OrbitingNavigator::tilted_at).
    pub tilted_at_degrees: f64,

    /// The wheel moves the camera by its height above the ellipsoid divided by this (but never
    /// less than a meter).
    pub wheel_stride_divisor: f64,
    /// How far ahead of the camera a pan extrapolates the point it moves towards.
    pub pan_extrapolation_meters: f64,
    /// Number of [`update_camera`](crate::navigator::OrbitingNavigator::update_camera) calls
    /// between re-orthonormalizations of the camera orientation.
    pub renormalize_interval: u32,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            vertical_fov_degrees: 50.,
            near_meters: 1.,
            far_meters: Ellipsoid::WGS84.semi_major_axis().get::<meter>() * 10.,
            min_tilt_degrees: 10.,
            max_tilt_degrees: 90.,
            tilted_at_degrees: 45.,
            wheel_stride_divisor: 10.,
            pan_extrapolation_meters: 1000.,
            renormalize_interval: 64,
        }
    }
}

impl NavigatorConfig {
    /// Checks that the configuration describes a usable camera and gesture policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fov = self.vertical_fov_degrees;
        if !(fov > 0. && fov < 180.) {
            return Err(ConfigError::FieldOfView(fov));
        }
        if !(self.near_meters > 0. && self.near_meters < self.far_meters)
            || !self.far_meters.is_finite()
        {
            return Err(ConfigError::ClipPlanes {
                near: self.near_meters,
                far: self.far_meters,
            });
        }
        let (min, max) = (self.min_tilt_degrees, self.max_tilt_degrees);
        if !(0. <= min && min <= max && max <= 180.) {
            return Err(ConfigError::TiltRange { min, max });
        }
        if !(self.wheel_stride_divisor > 0.) {
            return Err(ConfigError::WheelStrideDivisor(self.wheel_stride_divisor));
        }
        if self.renormalize_interval == 0 {
            return Err(ConfigError::RenormalizeInterval);
        }
        Ok(())
    }

    #[must_use]
    pub fn vertical_fov(&self) -> Angle {
        Angle::new::<degree>(self.vertical_fov_degrees)
    }

    #[must_use]
    pub fn near(&self) -> Length {
        Length::new::<meter>(self.near_meters)
    }

    #[must_use]
    pub fn far(&self) -> Length {
        Length::new::<meter>(self.far_meters)
    }

    #[must_use]
    pub fn min_tilt(&self) -> Angle {
        Angle::new::<degree>(self.min_tilt_degrees)
    }

    #[must_use]
    pub fn max_tilt(&self) -> Angle {
        Angle::new::<degree>(self.max_tilt_degrees)
    }

    #[must_use]
    pub fn tilted_at(&self) -> Angle {
        Angle::new::<degree>(self.tilted_at_degrees)
    }

    #[must_use]
    pub fn pan_extrapolation(&self) -> Length {
        Length::new::<meter>(self.pan_extrapolation_meters)
    }
}
