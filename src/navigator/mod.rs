//! Navigators turn input into camera poses.
//!
//! Two kinds exist, and a host picks one per viewport through [`Navigator`]:
//!
//! - [`OrbitingNavigator`] is driven by the user: drags pan over the ellipsoid or orbit around
//!   the grabbed point, and the wheel moves along the view direction.
//! - [`TrackingNavigator`] is driven by commanded views, eg from the metadata of a tracked video,
//!   and ignores pointer input.
//!
//! ```
//! use geonav::config::NavigatorConfig;
//! use geonav::navigator::{InputEvent, Navigator, OrbitingNavigator, PointerButton};
//! use geonav::projection::{Pixel, Size};
//!
//! let mut navigator = Navigator::from(
//!     OrbitingNavigator::new(NavigatorConfig::default(), Size::new(800, 600))
//!         .expect("default config is valid"),
//! );
//!
//! navigator.handle(InputEvent::PointerDown {
//!     button: PointerButton::Primary,
//!     pixel: Pixel::new(400., 300.),
//! });
//! navigator.handle(InputEvent::PointerMove { pixel: Pixel::new(420., 300.) });
//! navigator.update_camera();
//!
//! // the renderer reads a snapshot of the camera
//! let camera = *navigator.camera();
//! # let _ = camera;
//! ```

mod input;
mod orbiting;
mod tracking;

pub use input::{InputEvent, PointerButton, WheelDirection};
pub use orbiting::{Gesture, OrbitingNavigator};
pub use tracking::{
    EulerAngles, MetadataFieldOfView, MetadataOrientation, MetadataPosition, PlatformBody,
    SensorBody, TrackingCameraMetadata, TrackingNavigator, TrackingView,
};

use crate::camera::PerspectiveCamera;
use crate::error::NavigatorError;
use crate::projection::{DrawingArea, Pixel, Size};
use crate::ray::Ray;
use crate::systems::Ecef;
use crate::{Coordinate, Vector};

/// One of the available navigators.
///
/// Operations only one kind supports fail with [`NavigatorError::Unsupported`] on the other,
/// leaving it untouched.
#[derive(Debug, Clone)]
pub enum Navigator {
    Orbiting(OrbitingNavigator),
    Tracking(TrackingNavigator),
}

impl From<OrbitingNavigator> for Navigator {
    fn from(navigator: OrbitingNavigator) -> Self {
        Self::Orbiting(navigator)
    }
}

impl From<TrackingNavigator> for Navigator {
    fn from(navigator: TrackingNavigator) -> Self {
        Self::Tracking(navigator)
    }
}

impl Navigator {
    /// A short name for log and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Orbiting(_) => "orbiting",
            Self::Tracking(_) => "tracking",
        }
    }

    pub fn set_size(&mut self, size: Size) {
        match self {
            Self::Orbiting(navigator) => navigator.set_size(size),
            Self::Tracking(navigator) => navigator.set_size(size),
        }
    }

    #[must_use]
    pub fn size(&self) -> Size {
        match self {
            Self::Orbiting(navigator) => navigator.size(),
            Self::Tracking(navigator) => navigator.size(),
        }
    }

    /// The part of the canvas the camera's image covers.
    #[must_use]
    pub fn drawing_area(&self) -> DrawingArea {
        match self {
            Self::Orbiting(navigator) => navigator.drawing_area(),
            Self::Tracking(navigator) => navigator.drawing_area(),
        }
    }

    /// Brings the camera up to date. Call once per frame before rendering.
    pub fn update_camera(&mut self) {
        match self {
            Self::Orbiting(navigator) => navigator.update_camera(),
            Self::Tracking(navigator) => navigator.update_camera(),
        }
    }

    #[must_use]
    pub fn camera(&self) -> &PerspectiveCamera {
        match self {
            Self::Orbiting(navigator) => navigator.camera(),
            Self::Tracking(navigator) => navigator.camera(),
        }
    }

    #[must_use]
    pub fn world_ray(&self, pixel: Pixel) -> Option<Ray<Ecef>> {
        match self {
            Self::Orbiting(navigator) => navigator.world_ray(pixel),
            Self::Tracking(navigator) => navigator.world_ray(pixel),
        }
    }

    pub fn handle(&mut self, event: InputEvent) {
        match self {
            Self::Orbiting(navigator) => navigator.handle(event),
            Self::Tracking(navigator) => navigator.handle(event),
        }
    }

    /// Places an orbiting camera at `eye` looking towards `target`.
    pub fn look_at(
        &mut self,
        eye: Coordinate<Ecef>,
        target: Coordinate<Ecef>,
        up: Vector<Ecef>,
    ) -> Result<(), NavigatorError> {
        match self {
            Self::Orbiting(navigator) => {
                navigator.look_at(eye, target, up);
                Ok(())
            }
            Self::Tracking(_) => Err(self.unsupported("look_at")),
        }
    }

    /// Moves a tracking camera to a commanded view.
    ///
    /// Degenerate views are rejected as by [`TrackingNavigator::set_view`].
    pub fn set_view(&mut self, view: &TrackingView) -> Result<(), NavigatorError> {
        match self {
            Self::Tracking(navigator) => navigator.set_view(view),
            Self::Orbiting(_) => Err(self.unsupported("set_view")),
        }
    }

    fn unsupported(&self, operation: &'static str) -> NavigatorError {
        let navigator = self.name();
        tracing::warn!(operation, navigator, "unsupported navigator operation ignored");
        NavigatorError::Unsupported {
            operation,
            navigator,
        }
    }
}
