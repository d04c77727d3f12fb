//! The perspective camera handed to the renderer.

use crate::pose::Pose;
use crate::projection::{self, Uv};
use crate::ray::Ray;
use crate::systems::Ecef;
use nalgebra::Matrix4;
use uom::si::f64::{Angle, Length};

/// A perspective camera posed in [`Ecef`].
///
/// The projection matrices are derived from the field of view, aspect ratio, and clip planes,
/// and are only refreshed by [`PerspectiveCamera::update_projection_matrix`]; setters leave them
/// stale until then, like a renderer's camera would.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    vertical_fov: Angle,
    aspect_ratio: f64,
    near: Length,
    far: Length,
    pose: Pose<Ecef>,
    projection: Matrix4<f64>,
    inverse_projection: Matrix4<f64>,
}

impl PerspectiveCamera {
    #[must_use]
    pub fn new(
        vertical_fov: impl Into<Angle>,
        aspect_ratio: f64,
        near: impl Into<Length>,
        far: impl Into<Length>,
    ) -> Self {
        let mut camera = Self {
            vertical_fov: vertical_fov.into(),
            aspect_ratio,
            near: near.into(),
            far: far.into(),
            pose: Pose::default(),
            projection: Matrix4::identity(),
            inverse_projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recomputes the projection and its inverse from the current parameters.
    pub fn update_projection_matrix(&mut self) {
        self.projection = projection::perspective(
            self.vertical_fov,
            self.aspect_ratio,
            self.near,
            self.far,
        );
        self.inverse_projection = projection::inverse_perspective(
            self.vertical_fov,
            self.aspect_ratio,
            self.near,
            self.far,
        );
    }

    #[must_use]
    pub fn vertical_fov(&self) -> Angle {
        self.vertical_fov
    }

    pub fn set_vertical_fov(&mut self, vertical_fov: impl Into<Angle>) {
        self.vertical_fov = vertical_fov.into();
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) {
        self.aspect_ratio = aspect_ratio;
    }

    #[must_use]
    pub fn near(&self) -> Length {
        self.near
    }

    #[must_use]
    pub fn far(&self) -> Length {
        self.far
    }

    #[must_use]
    pub fn pose(&self) -> Pose<Ecef> {
        self.pose
    }

    pub fn set_pose(&mut self, pose: Pose<Ecef>) {
        self.pose = pose;
    }

    /// The camera-to-world matrix.
    #[must_use]
    pub fn world_matrix(&self) -> Matrix4<f64> {
        self.pose.world_matrix()
    }

    #[must_use]
    pub fn projection_matrix(&self) -> &Matrix4<f64> {
        &self.projection
    }

    #[must_use]
    pub fn inverse_projection_matrix(&self) -> &Matrix4<f64> {
        &self.inverse_projection
    }

    /// Casts a ray from the camera through a point of its image.
    #[must_use]
    pub fn world_ray(&self, uv: Uv) -> Option<Ray<Ecef>> {
        projection::uv_to_world_ray(&self.pose, &self.inverse_projection, uv)
    }
}

#[cfg(test)]
mod tests {
    use super::PerspectiveCamera;
    use crate::frames;
    use crate::pose::Pose;
    use crate::projection::Uv;
    use crate::systems::Ecef;
    use crate::{Coordinate, Vector};
    use approx::assert_relative_eq;
    use nalgebra::Matrix4;
    use uom::si::f64::{Angle, Length};
    use uom::si::{angle::degree, length::meter};

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    #[test]
    fn projection_follows_parameters() {
        let mut camera = PerspectiveCamera::new(Angle::new::<degree>(50.), 1.5, m(1.), m(1e6));
        assert_relative_eq!(
            camera.projection_matrix() * camera.inverse_projection_matrix(),
            Matrix4::identity(),
            epsilon = 1e-9
        );

        let before = *camera.projection_matrix();
        camera.set_aspect_ratio(2.);
        // stale until explicitly refreshed
        assert_eq!(*camera.projection_matrix(), before);
        camera.update_projection_matrix();
        assert_relative_eq!(camera.projection_matrix()[(0, 0)], before[(0, 0)] * 0.75);
    }

    #[test]
    fn center_ray_follows_pose() {
        let mut camera = PerspectiveCamera::new(Angle::new::<degree>(50.), 1., m(1.), m(1e6));
        let eye = Coordinate::<Ecef>::from_cartesian(m(0.), m(0.), m(1e7));
        camera.set_pose(Pose::new(
            eye,
            frames::look_at(eye, Coordinate::origin(), Vector::<Ecef>::x_axis()),
        ));

        let ray = camera.world_ray(Uv::new(0.5, 0.5)).expect("valid ray");
        assert_relative_eq!(ray.origin(), eye);
        assert_relative_eq!(ray.direction(), -Vector::<Ecef>::z_axis(), epsilon = 1e-12);
        assert_relative_eq!(
            camera.world_matrix().transform_point(&nalgebra::Point3::origin()),
            eye.point
        );
    }
}
