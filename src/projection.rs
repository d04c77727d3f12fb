//! Conversions between pixels, UV, normalized device coordinates, camera space, and world space.
//!
//! Everything in here is a pure function of its inputs. The screen-space conventions are:
//!
//! - [`Pixel`]: origin at the top-left corner of the canvas, y grows downwards;
//! - [`Uv`]: origin at the bottom-left corner of the [`DrawingArea`], v grows upwards, and the
//!   drawing area spans [0, 1] on both axes;
//! - [`Ndc`]: the same area spanning [-1, 1] on both axes.

use crate::coordinate_systems::View;
use crate::pose::Pose;
use crate::ray::Ray;
use crate::systems::Ecef;
use crate::{Coordinate, Point3, Vector};
use nalgebra::Matrix4;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A position on the canvas, in pixels from its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A position within a [`DrawingArea`], in [0, 1] from its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}

impl Uv {
    #[must_use]
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    /// Returns `true` if this position lies within the drawing area (edges included).
    #[must_use]
    pub fn is_inside(&self) -> bool {
        (0. ..=1.).contains(&self.u) && (0. ..=1.).contains(&self.v)
    }
}

/// Normalized device coordinates, in [-1, 1] on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ndc {
    pub x: f64,
    pub y: f64,
}

/// The size of a canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, or `None` for an empty canvas.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.width > 0 && self.height > 0).then(|| f64::from(self.width) / f64::from(self.height))
    }
}

/// The sub-rectangle of a canvas that the camera projects into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DrawingArea {
    pub x_offset: f64,
    pub y_offset: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawingArea {
    /// The drawing area that covers the whole canvas.
    #[must_use]
    pub fn full(size: Size) -> Self {
        Self {
            x_offset: 0.,
            y_offset: 0.,
            width: f64::from(size.width),
            height: f64::from(size.height),
        }
    }

    /// The largest area of the given aspect ratio (width over height) that fits centered in the
    /// canvas, leaving bars either above and below or to the left and right.
    #[must_use]
    pub fn fit(size: Size, aspect_ratio: f64) -> Self {
        let (width, height) = (f64::from(size.width), f64::from(size.height));
        if aspect_ratio > width / height {
            let fitted_height = width / aspect_ratio;
            Self {
                x_offset: 0.,
                y_offset: (height - fitted_height) / 2.,
                width,
                height: fitted_height,
            }
        } else {
            let fitted_width = height * aspect_ratio;
            Self {
                x_offset: (width - fitted_width) / 2.,
                y_offset: 0.,
                width: fitted_width,
                height,
            }
        }
    }

    /// The pixel in the middle of the area.
    #[must_use]
    pub fn center(&self) -> Pixel {
        uv_to_pixel(self, Uv::new(0.5, 0.5))
    }
}

/// Radial lens distortion coefficients.
///
/// A point at planar radius `r` from the optical axis (at unit distance in front of the camera)
/// is moved to radius `r * (1 + k2 r² + k3 r³ + k4 r⁴)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Distortion {
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
}

impl Distortion {
    fn scale(&self, r: f64) -> f64 {
        1. + self.k2 * r.powi(2) + self.k3 * r.powi(3) + self.k4 * r.powi(4)
    }
}

/// Maps a pixel into the drawing area's UV space.
///
/// The drawing area must be wider and taller than one pixel.
#[must_use]
pub fn pixel_to_uv(area: &DrawingArea, pixel: Pixel) -> Uv {
    Uv {
        u: (pixel.x - area.x_offset) / (area.width - 1.),
        v: 1. - (pixel.y - area.y_offset) / (area.height - 1.),
    }
}

/// Inverse of [`pixel_to_uv`].
#[must_use]
pub fn uv_to_pixel(area: &DrawingArea, uv: Uv) -> Pixel {
    Pixel {
        x: area.x_offset + uv.u * (area.width - 1.),
        y: area.y_offset + (1. - uv.v) * (area.height - 1.),
    }
}

#[must_use]
pub fn uv_to_ndc(uv: Uv) -> Ndc {
    Ndc {
        x: uv.u * 2. - 1.,
        y: uv.v * 2. - 1.,
    }
}

#[must_use]
pub fn ndc_to_uv(ndc: Ndc) -> Uv {
    Uv {
        u: (ndc.x + 1.) / 2.,
        v: (ndc.y + 1.) / 2.,
    }
}

/// Width over height of a view with the given horizontal and vertical fields of view.
#[must_use]
pub fn aspect_ratio_from_fov(hfov: impl Into<Angle>, vfov: impl Into<Angle>) -> f64 {
    let half_tan = |fov: Angle| (fov.get::<radian>() / 2.).tan();
    half_tan(hfov.into()) / half_tan(vfov.into())
}

/// Builds an OpenGL-style perspective projection (looking along -Z, depth mapped to [-1, 1]).
///
/// Invalid parameters (eg, `near == far`) do not panic; they produce non-finite entries.
#[must_use]
pub fn perspective(
    vfov: impl Into<Angle>,
    aspect_ratio: f64,
    near: Length,
    far: Length,
) -> Matrix4<f64> {
    let f = 1. / (vfov.into().get::<radian>() / 2.).tan();
    let (near, far) = (near.get::<meter>(), far.get::<meter>());
    let depth = near - far;

    #[rustfmt::skip]
    let m = Matrix4::new(
        f / aspect_ratio, 0., 0.,                  0.,
        0.,               f,  0.,                  0.,
        0.,               0., (far + near) / depth, 2. * far * near / depth,
        0.,               0., -1.,                 0.,
    );
    m
}

/// The closed-form inverse of [`perspective`].
#[must_use]
pub fn inverse_perspective(
    vfov: impl Into<Angle>,
    aspect_ratio: f64,
    near: Length,
    far: Length,
) -> Matrix4<f64> {
    let f = 1. / (vfov.into().get::<radian>() / 2.).tan();
    let (near, far) = (near.get::<meter>(), far.get::<meter>());
    let two_far_near = 2. * far * near;

    #[rustfmt::skip]
    let m = Matrix4::new(
        aspect_ratio / f, 0.,     0.,                          0.,
        0.,               1. / f, 0.,                          0.,
        0.,               0.,     0.,                          -1.,
        0.,               0.,     (near - far) / two_far_near, (far + near) / two_far_near,
    );
    m
}

/// Builds the projection of a camera with the given horizontal and vertical fields of view.
#[must_use]
pub fn projection_from_fov(
    hfov: impl Into<Angle>,
    vfov: impl Into<Angle>,
    near: Length,
    far: Length,
) -> Matrix4<f64> {
    let vfov = vfov.into();
    perspective(vfov, aspect_ratio_from_fov(hfov, vfov), near, far)
}

/// Unprojects a point of the drawing area into a ray from the camera's origin in camera space.
///
/// Returns `None` if the inverse projection yields no usable direction.
#[must_use]
pub fn uv_to_camera_ray(inverse_projection: &Matrix4<f64>, uv: Uv) -> Option<Ray<View>> {
    let ndc = uv_to_ndc(uv);
    let on_far_plane = inverse_projection.transform_point(&Point3::new(ndc.x, ndc.y, 1.));
    Ray::new(
        Coordinate::origin(),
        Vector::from(Coordinate::<View>::from_nalgebra_point(on_far_plane)),
    )
}

/// Expresses a camera-space ray in the world, given the camera's pose.
#[must_use]
pub fn camera_ray_to_world_ray(ray: &Ray<View>, pose: &Pose<Ecef>) -> Option<Ray<Ecef>> {
    Ray::new(
        pose.to_world(ray.origin()),
        pose.orientation() * ray.direction(),
    )
}

/// Casts a ray from the camera through a point of the drawing area.
#[must_use]
pub fn uv_to_world_ray(
    pose: &Pose<Ecef>,
    inverse_projection: &Matrix4<f64>,
    uv: Uv,
) -> Option<Ray<Ecef>> {
    camera_ray_to_world_ray(&uv_to_camera_ray(inverse_projection, uv)?, pose)
}

/// Casts a ray from the camera through a pixel of the canvas.
#[must_use]
pub fn pixel_to_world_ray(
    pose: &Pose<Ecef>,
    inverse_projection: &Matrix4<f64>,
    area: &DrawingArea,
    pixel: Pixel,
) -> Option<Ray<Ecef>> {
    uv_to_world_ray(pose, inverse_projection, pixel_to_uv(area, pixel))
}

/// Expresses a world position relative to the camera.
#[must_use]
pub fn world_to_camera(pose: &Pose<Ecef>, position: Coordinate<Ecef>) -> Coordinate<View> {
    pose.to_view(position)
}

/// Projects a camera-space point onto the drawing area.
///
/// Points behind the camera also project somewhere; check the sign of
/// [`Coordinate::view_back`] first if that matters.
#[must_use]
pub fn camera_to_uv(projection: &Matrix4<f64>, position: Coordinate<View>) -> Uv {
    let projected = projection.transform_point(&position.point);
    ndc_to_uv(Ndc {
        x: projected.x,
        y: projected.y,
    })
}

/// Rebuilds the world position seen at `uv` that lies `depth` in front of the camera (measured
/// along the view axis, not along the ray).
#[must_use]
pub fn uv_to_world_position(
    pose: &Pose<Ecef>,
    inverse_projection: &Matrix4<f64>,
    uv: Uv,
    depth: Length,
) -> Option<Coordinate<Ecef>> {
    let ray = uv_to_camera_ray(inverse_projection, uv)?;
    let along_view = -ray.direction().view_back().get::<meter>();
    if along_view <= 0. {
        return None;
    }
    Some(pose.to_world(ray.at(depth / along_view)))
}

/// Moves a point of the drawing area as a physical lens with the given radial `distortion`
/// would.
///
/// The image center is a fixed point for any coefficients, and zero coefficients leave every
/// point where it is.
#[must_use]
pub fn undistort(
    projection: &Matrix4<f64>,
    inverse_projection: &Matrix4<f64>,
    uv: Uv,
    distortion: &Distortion,
) -> Uv {
    let ndc = uv_to_ndc(uv);
    let p = inverse_projection.transform_point(&Point3::new(ndc.x, ndc.y, 1.));

    // onto the plane at unit distance in front of the camera
    let (qx, qy) = (p.x / -p.z, p.y / -p.z);
    let scale = distortion.scale(qx.hypot(qy));

    let projected = projection.transform_point(&Point3::new(qx * scale, qy * scale, -1.));
    ndc_to_uv(Ndc {
        x: projected.x,
        y: projected.y,
    })
}

/// Decodes a logarithmic depth buffer value into the (positive) distance along the view axis.
#[must_use]
pub fn log_depth_to_view_z(log_depth: f64, far: Length) -> Length {
    let far = far.get::<meter>();
    Length::new::<meter>((log_depth * (far + 1.).log2()).exp2() - 1.)
}

/// Encodes a view-space z (of either sign) as a logarithmic depth buffer value in [0, 1].
#[must_use]
pub fn view_z_to_log_depth(view_z: Length, far: Length) -> f64 {
    (view_z.get::<meter>().abs() + 1.).log2() / (far.get::<meter>() + 1.).log2()
}
