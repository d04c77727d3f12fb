use uom::si::f64::Length;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::{Coordinate, Vector};

/// Defines how a coordinate system behaves.
///
/// For example, two coordinate systems that implement `CoordinateSystem<Convention = NedLike>`
/// both behave [`NedLike`], and get appropriately-named accessors on types like [`Coordinate`]
/// and [`Vector`] (ie, `ned_north`, `ned_east`, and `ned_down`).
///
/// While you _can_ implement this trait directly, prefer using [`system!`](crate::system).
pub trait CoordinateSystem {
    /// What standard coordinate system convention this coordinate system conforms to.
    type Convention;
}

/// Links a coordinate system convention to the type holding the constituent parts under proper
/// names.
pub trait HasComponents {
    type Components: Into<[Length; 3]>;
}

/// Marks an NED-like coordinate system where the axes are North, East, and Down.
///
/// NEDs are always right-handed coordinate systems, and have earth bounded axes:
///
/// - Positive X is North.
/// - Positive Y is East.
/// - Positive Z is towards the center of the earth ("Down").
///
/// Two NED-like coordinate systems may have different "absolute" Earth-bound coordinates for
/// their origin. The local NED frame at a camera position is the tangent plane at the geodetic
/// latitude and longitude of that position; see [`frames::local_ned_basis`](crate::frames::local_ned_basis).
///
/// <https://en.wikipedia.org/wiki/Local_tangent_plane_coordinates#Local_north,_east,_down_(NED)_coordinates>
pub struct NedLike;

/// Components for Cartesian points in an [`NedLike`] coordinate system.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct NedComponents {
    pub north: Length,
    pub east: Length,
    pub down: Length,
}

impl From<NedComponents> for [Length; 3] {
    fn from(c: NedComponents) -> [Length; 3] {
        [c.north, c.east, c.down]
    }
}

impl HasComponents for NedLike {
    type Components = NedComponents;
}

/// Marks a camera-space coordinate system in the usual OpenGL convention.
///
/// View-like systems are right-handed and bound to the camera:
///
/// - Positive X is to the right on screen.
/// - Positive Y is up on screen.
/// - Positive Z points _backwards_, out of the screen towards the viewer.
///
/// The camera therefore looks along negative Z. A camera's orientation in the world is the
/// rotation whose columns are these three axes expressed in world coordinates.
pub struct ViewLike;

/// Components for Cartesian points in a [`ViewLike`] coordinate system.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct ViewComponents {
    pub right: Length,
    pub up: Length,
    pub back: Length,
}

impl From<ViewComponents> for [Length; 3] {
    fn from(c: ViewComponents) -> [Length; 3] {
        [c.right, c.up, c.back]
    }
}

impl HasComponents for ViewLike {
    type Components = ViewComponents;
}

/// Marks a coordinate system whose axes are simply named X, Y, and Z.
///
/// Unlike [`NedLike`] and [`ViewLike`], there is no intrinsic relationship between XYZ-like
/// coordinate systems. While two XYZ-like coordinate systems _may_ share definitions of X, Y, and
/// Z, that shared meaning is not communicated through this type.
pub struct RightHandedXyzLike;

/// Components for Cartesian points in an coordinate system without specific names for X, Y, and Z,
/// like [`RightHandedXyzLike`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct XyzComponents {
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

impl From<XyzComponents> for [Length; 3] {
    fn from(c: XyzComponents) -> [Length; 3] {
        [c.x, c.y, c.z]
    }
}

impl HasComponents for RightHandedXyzLike {
    type Components = XyzComponents;
}

/// Defines a new coordinate system and its conventions.
///
/// Note that the coordinate system is a zero-sized type used only to mark things like
/// [`Coordinate`] and [`Vector`] with what coordinate system they are in. A coordinate system does
/// not know its relation to any other coordinate system (or global positions like WGS84).
///
/// At present, this macro allows you to define the following kinds of coordinate systems:
///
/// [`NedLike`]
///
/// ```rust
/// # use geonav::system;
/// system!(pub struct AnchorNed using NED);
/// ```
///
/// [`ViewLike`]
///
/// ```rust
/// # use geonav::system;
/// system!(pub struct OverviewCamera using view);
/// ```
///
/// [`RightHandedXyzLike`]
///
/// ```rust
/// # use geonav::system;
/// system!(pub struct MeshLocal using right-handed XYZ);
/// ```
///
/// You can include doc comments and attributes directly in the invocation of `system!` to add docs
/// and derived traits to your type:
///
/// ```rust
/// geonav::system! {
///     #[derive(Hash)]
///     pub(crate) struct AnchorNed using NED
/// }
/// ```
#[macro_export]
macro_rules! system {
    ($(#[$attr:meta])* $vis:vis struct $name:ident using right-handed XYZ) => {
        $crate::system!($(#[$attr])* $vis struct $name as RightHandedXyzLike);
    };
    ($(#[$attr:meta])* $vis:vis struct $name:ident using NED) => {
        $crate::system!($(#[$attr])* $vis struct $name as NedLike);
    };
    ($(#[$attr:meta])* $vis:vis struct $name:ident using view) => {
        $crate::system!($(#[$attr])* $vis struct $name as ViewLike);
    };
    {
        $(#[$attr:meta])*
        $vis:vis struct $name:ident
        as $convention:ident
    } => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::CoordinateSystem for $name {
            type Convention = $crate::systems::$convention;
        }
    };
}

system! {
    /// The [Earth-centered, Earth-fixed (ECEF)][ecef] coordinate system.
    ///
    /// This is a right-handed [`RightHandedXyzLike`] coordinate system whose origin is the center of the
    /// earth. It has earth bounded axes:
    ///
    /// - Positive Z is towards the North pole (the international reference pole (IRP)).
    /// - Positive X is towards the prime meridian on the equator (0° lon; the IERS Reference Meridian).
    /// - Positive Y is towards 90°E on the equator.
    ///
    /// Camera poses, ray/surface intersections, and scene geometry handed to the
    /// [`SurfaceRaycaster`](crate::raycast::SurfaceRaycaster) all live in this system.
    ///
    /// [ecef]: https://en.wikipedia.org/wiki/Earth-centered,_Earth-fixed_coordinate_system
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[allow(clippy::upper_case_acronyms)]
    pub struct Ecef using right-handed XYZ
}

system! {
    /// The local North-East-Down frame at the camera position.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Ned using NED
}

system! {
    /// Camera space of the navigated camera (X right, Y up, looking along negative Z).
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct View using view
}
