//! This library moves a camera around the earth in response to pointer input, with hard-to-misuse
//! geodetic math underneath.
//!
//! Points and directions are [`Coordinate`]s and [`Vector`]s tagged with the
//! [`CoordinateSystem`] they are expressed in, so a camera-space point cannot (easily) be mistaken
//! for a world one. The world is [`Ecef`](systems::Ecef), the earth is an [`Ellipsoid`]
//! (WGS84 unless told otherwise), and a [`GeoConverter`] moves positions between ECEF,
//! [geodetic](systems::Wgs84) coordinates, and [UTM](Utm). The [`system!`] macro defines further
//! coordinate systems, like the body axes of a platform carrying a camera.
//!
//! On top of that sit:
//!
//! - [`frames`]: local North-East-Down frames, Euler angles, look-at, and other rotations.
//! - [`projection`] and [`camera`]: the mapping between pixels and rays into the scene.
//! - [`raycast`]: picking the surface (ellipsoid or triangle meshes) under a ray.
//! - [`navigator`]: turning input into camera poses, either freely (orbiting) or by following
//!   commanded views (tracking).
//!
//! # Examples
//!
//! Find the ECEF position and local directions of a point on the ground:
//!
//! ```
//! use geonav::{frames, systems::Wgs84, GeoConverter};
//! use uom::si::f64::{Angle, Length};
//! use uom::si::{angle::degree, length::meter};
//!
//! let converter = GeoConverter::default();
//! let oslo = Wgs84::builder()
//!     .latitude(Angle::new::<degree>(59.91))
//!     .expect("latitude is in [-90, 90]")
//!     .longitude(Angle::new::<degree>(10.75))
//!     .height(Length::new::<meter>(20.))
//!     .build();
//!
//! let position = converter.to_ecef(&oslo);
//! let (north, east, down) = frames::local_ned_basis(&position, &converter);
//! assert!((north.cross(&east).dot(&down) - 1.).abs() < 1e-12);
//!
//! let back = converter.to_geodetic(&position);
//! assert!((back.latitude() - oslo.latitude()).get::<degree>().abs() < 1e-9);
//! ```
//!
//! Grab the point in the middle of the screen and orbit around it:
//!
//! ```
//! use geonav::config::NavigatorConfig;
//! use geonav::navigator::{Gesture, InputEvent, OrbitingNavigator, PointerButton};
//! use geonav::projection::{Pixel, Size};
//!
//! let mut navigator = OrbitingNavigator::new(NavigatorConfig::default(), Size::new(800, 600))
//!     .expect("default config is valid");
//!
//! navigator.handle(InputEvent::PointerDown {
//!     button: PointerButton::Secondary,
//!     pixel: Pixel::new(399.5, 299.5),
//! });
//! assert!(matches!(navigator.gesture(), Gesture::Orbiting { .. }));
//!
//! navigator.handle(InputEvent::PointerMove { pixel: Pixel::new(450., 299.5) });
//! navigator.handle(InputEvent::PointerUp {
//!     button: PointerButton::Secondary,
//!     pixel: Pixel::new(450., 299.5),
//! });
//! navigator.update_camera();
//! ```

#[macro_use]
mod coordinate_systems;

mod coordinates;
mod geodetic;
mod ray;
mod util;
mod utm;
mod vectors;

pub mod camera;
pub mod config;
pub mod convert;
pub mod ellipsoid;
pub mod error;
pub mod frames;
pub mod math;
pub mod navigator;
pub mod pose;
pub mod projection;
pub mod raycast;

pub(crate) type Point3 = nalgebra::Point3<f64>;
pub(crate) type Vector3 = nalgebra::Vector3<f64>;
pub(crate) type Matrix3 = nalgebra::Matrix3<f64>;
pub(crate) type Rotation3 = nalgebra::Rotation3<f64>;

// re-structure our imports slightly to better match user expectation
/// Well-known coordinate systems and conventions.
pub mod systems {
    pub use super::coordinate_systems::{
        Ecef, Ned, NedComponents, NedLike, RightHandedXyzLike, View, ViewComponents, ViewLike,
        XyzComponents,
    };
    pub use super::geodetic::Wgs84;
}
pub use convert::GeoConverter;
pub use coordinate_systems::{CoordinateSystem, HasComponents};
pub use coordinates::Coordinate;
pub use ellipsoid::Ellipsoid;
pub use geodetic::{
    Builder, Components, HasHeight, HasLatitude, HasLongitude, MissingHeight, MissingLatitude,
    MissingLongitude,
};
pub use math::Rotation;
pub use pose::Pose;
pub use ray::Ray;
pub use utm::{Hemisphere, Utm, UtmZone};
pub use vectors::Vector;
