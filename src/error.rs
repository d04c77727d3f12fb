//! Errors reported by navigators and their configuration.

/// Why a navigator rejected a request.
///
/// These are never fatal: the navigator is left untouched and the caller may carry on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigatorError {
    #[error("{operation} is not supported by the {navigator} navigator")]
    Unsupported {
        operation: &'static str,
        navigator: &'static str,
    },

    #[error("latitude {0}° is outside [-90°, 90°]")]
    InvalidLatitude(f64),

    #[error("field of view {0}° is outside (0°, 180°)")]
    InvalidFieldOfView(f64),

    #[error("{0} is not finite")]
    NonFinite(&'static str),

    #[error("view would leave the camera with a degenerate pose")]
    DegenerateView,
}

/// A [`NavigatorConfig`](crate::config::NavigatorConfig) that cannot drive a camera.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("field of view must be in (0, 180) degrees, got {0}")]
    FieldOfView(f64),

    #[error("clip planes must satisfy 0 < near < far, got near {near} m and far {far} m")]
    ClipPlanes { near: f64, far: f64 },

    #[error("tilt range must satisfy 0 <= min <= max <= 180 degrees, got [{min}, {max}]")]
    TiltRange { min: f64, max: f64 },

    #[error("wheel stride divisor must be positive, got {0}")]
    WheelStrideDivisor(f64),

    #[error("renormalize interval must be at least one frame")]
    RenormalizeInterval,
}
