use super::input::{InputEvent, PointerButton, WheelDirection};
use crate::camera::PerspectiveCamera;
use crate::config::NavigatorConfig;
use crate::convert::GeoConverter;
use crate::error::ConfigError;
use crate::frames;
use crate::pose::Pose;
use crate::projection::{self, DrawingArea, Pixel, Size};
use crate::ray::Ray;
use crate::raycast::SurfacePicker;
use crate::systems::Ecef;
use crate::{Coordinate, Vector};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

/// The gesture an [`OrbitingNavigator`] is in the middle of.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// A primary-button drag, last seen at `anchor`.
    Panning { anchor: Pixel },
    /// A secondary-button drag, last seen at `anchor`, orbiting around the surface `point` that
    /// was under the pointer when the drag started.
    Orbiting {
        anchor: Pixel,
        point: Coordinate<Ecef>,
    },
}

/// A free camera that walks over the ellipsoid.
///
/// - Primary drags pan: the camera moves over the curved surface while keeping its pose
///   relative to the ground.
/// - Secondary drags orbit around the surface point that was grabbed: vertical motion tilts
///   the camera (within the configured tilt range) and horizontal motion rotates it around the
///   local vertical of that point.
/// - The wheel moves the camera along its view direction, faster the higher it is.
///
/// Gestures never fail; an update that would produce a degenerate pose is skipped.
#[derive(Debug, Clone)]
pub struct OrbitingNavigator {
    config: NavigatorConfig,
    converter: GeoConverter,
    size: Size,
    camera: PerspectiveCamera,
    pose: Pose<Ecef>,
    gesture: Gesture,
    frames_since_renormalize: u32,
}

impl OrbitingNavigator {
    /// Constructs a navigator looking at the earth from three earth radii out along ECEF +X.
    pub fn new(config: NavigatorConfig, size: Size) -> Result<Self, ConfigError> {
        Self::with_converter(config, GeoConverter::default(), size)
    }

    /// Like [`OrbitingNavigator::new`], but with a different ellipsoid (or height offset) for
    /// the local frames and surface anchoring.
    pub fn with_converter(
        config: NavigatorConfig,
        converter: GeoConverter,
        size: Size,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let camera = PerspectiveCamera::new(
            config.vertical_fov(),
            size.aspect_ratio().unwrap_or(1.),
            config.near(),
            config.far(),
        );
        let mut navigator = Self {
            config,
            converter,
            size,
            camera,
            pose: Pose::default(),
            gesture: Gesture::Idle,
            frames_since_renormalize: 0,
        };

        let a = converter.ellipsoid().semi_major_axis();
        navigator.look_at(
            Coordinate::from_cartesian(a * 3., Length::new::<meter>(0.), Length::new::<meter>(0.)),
            Coordinate::origin(),
            Vector::z_axis(),
        );
        navigator.update_camera();
        Ok(navigator)
    }

    /// Places the camera at `eye` looking towards `target`.
    pub fn look_at(&mut self, eye: Coordinate<Ecef>, target: Coordinate<Ecef>, up: Vector<Ecef>) {
        self.pose = Pose::new(eye, frames::look_at(eye, target, up));
    }

    /// Places the camera at `position` looking north, tilted down by the configured angle.
    pub fn tilted_at(&mut self, position: Coordinate<Ecef>) {
        let tilt = self.config.tilted_at();
        self.pose = Pose::new(
            position,
            frames::tilted_orientation(&position, &self.converter, tilt),
        );
    }

    /// Places the camera at `position` looking north along the horizon.
    pub fn neutral_at(&mut self, position: Coordinate<Ecef>) {
        self.pose = Pose::new(
            position,
            frames::tilted_orientation(&position, &self.converter, Angle::new::<degree>(90.)),
        );
    }

    /// Adapts the camera to a resized canvas. The pose is left alone.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        if let Some(aspect_ratio) = size.aspect_ratio() {
            self.camera.set_aspect_ratio(aspect_ratio);
            self.camera.update_projection_matrix();
        }
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// The whole canvas; the aspect ratio always follows the canvas.
    #[must_use]
    pub fn drawing_area(&self) -> DrawingArea {
        DrawingArea::full(self.size)
    }

    /// Hands the current pose to the camera. Call once per frame before rendering.
    ///
    /// Every so often this also re-orthonormalizes the orientation, which otherwise drifts under
    /// the many small rotations gestures apply.
    pub fn update_camera(&mut self) {
        self.frames_since_renormalize += 1;
        if self.frames_since_renormalize >= self.config.renormalize_interval {
            self.pose = self.pose.renormalized();
            self.frames_since_renormalize = 0;
        }
        self.camera.set_pose(self.pose);
        self.camera.update_projection_matrix();
    }

    #[must_use]
    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// The current pose, which may be ahead of [`OrbitingNavigator::camera`] until the next
    /// [`OrbitingNavigator::update_camera`].
    #[must_use]
    pub fn pose(&self) -> Pose<Ecef> {
        self.pose
    }

    #[must_use]
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    #[must_use]
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Casts a ray from the current pose through a pixel of the canvas.
    #[must_use]
    pub fn world_ray(&self, pixel: Pixel) -> Option<Ray<Ecef>> {
        projection::pixel_to_world_ray(
            &self.pose,
            self.camera.inverse_projection_matrix(),
            &self.drawing_area(),
            pixel,
        )
    }

    /// Feeds an input event to the navigator, anchoring orbits on the ellipsoid.
    pub fn handle(&mut self, event: InputEvent) {
        let ellipsoid = *self.converter.ellipsoid();
        self.handle_with(event, &ellipsoid);
    }

    /// Feeds an input event to the navigator, anchoring orbits on whatever `picker` hits.
    pub fn handle_with<P>(&mut self, event: InputEvent, picker: &P)
    where
        P: SurfacePicker + ?Sized,
    {
        match event {
            InputEvent::PointerDown { button, pixel } => self.pointer_down_on(button, pixel, picker),
            InputEvent::PointerUp { button, pixel } => self.pointer_up(button, pixel),
            InputEvent::PointerMove { pixel } => self.pointer_move(pixel),
            InputEvent::PointerLeave => self.pointer_leave(),
            InputEvent::Wheel(direction) => self.wheel(direction),
            InputEvent::Resize(size) => self.set_size(size),
        }
    }

    /// Starts a gesture, anchoring orbits on the ellipsoid.
    pub fn pointer_down(&mut self, button: PointerButton, pixel: Pixel) {
        let ellipsoid = *self.converter.ellipsoid();
        self.pointer_down_on(button, pixel, &ellipsoid);
    }

    /// Starts a gesture, anchoring orbits on whatever `picker` hits.
    ///
    /// A secondary press that hits nothing does not start an orbit.
    pub fn pointer_down_on<P>(&mut self, button: PointerButton, pixel: Pixel, picker: &P)
    where
        P: SurfacePicker + ?Sized,
    {
        match button {
            PointerButton::Primary => {
                tracing::debug!(?pixel, "pan started");
                self.gesture = Gesture::Panning { anchor: pixel };
            }
            PointerButton::Secondary => {
                let hit = self.world_ray(pixel).and_then(|ray| picker.pick(&ray));
                match hit {
                    Some(hit) => {
                        tracing::debug!(?pixel, anchor = %hit.point, "orbit started");
                        self.gesture = Gesture::Orbiting {
                            anchor: pixel,
                            point: hit.point,
                        };
                    }
                    None => tracing::debug!(?pixel, "no surface under pointer; not orbiting"),
                }
            }
            PointerButton::Other(_) => {}
        }
    }

    /// Continues the current gesture, if any.
    pub fn pointer_move(&mut self, pixel: Pixel) {
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Panning { anchor } => {
                self.pan(anchor, pixel);
                self.gesture = Gesture::Panning { anchor: pixel };
            }
            Gesture::Orbiting { anchor, point } => {
                self.tilt(pixel.y - anchor.y, point);
                self.rotate(pixel.x - anchor.x, point);
                self.gesture = Gesture::Orbiting {
                    anchor: pixel,
                    point,
                };
            }
        }
    }

    /// Ends any gesture, whichever button was released.
    pub fn pointer_up(&mut self, button: PointerButton, pixel: Pixel) {
        if self.gesture != Gesture::Idle {
            tracing::debug!(?button, ?pixel, "gesture ended");
        }
        self.gesture = Gesture::Idle;
    }

    /// Ends any gesture.
    pub fn pointer_leave(&mut self) {
        if self.gesture != Gesture::Idle {
            tracing::debug!("pointer left; gesture cancelled");
        }
        self.gesture = Gesture::Idle;
    }

    /// Moves the camera along its view axis by a tenth (by default) of its height above the
    /// ellipsoid, but at least a meter.
    pub fn wheel(&mut self, direction: WheelDirection) {
        let height = self
            .converter
            .ellipsoid()
            .height_above(&self.pose.position())
            .get::<meter>();
        let stride = (height / self.config.wheel_stride_divisor).max(1.);
        let stride = match direction {
            WheelDirection::Forward => stride,
            WheelDirection::Backward => -stride,
        };
        let candidate = self.pose.translated(self.pose.forward() * stride);
        self.accept(candidate, "wheel");
    }

    fn pan(&mut self, from: Pixel, to: Pixel) {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let distance = dx.hypot(dy);
        if distance == 0. {
            return;
        }

        let position = Vector::from(self.pose.position());
        let Some(down) = (-position).try_normalized() else {
            tracing::trace!("camera at the origin; cannot pan");
            return;
        };

        // whichever of forward and up is less aligned with down points "ahead" on the ground
        let (forward, up) = (self.pose.forward(), self.pose.up());
        let ahead = if down.dot(&forward).abs() < down.dot(&up).abs() {
            forward
        } else {
            up
        };
        let Some(right) = down.cross(&ahead).try_normalized() else {
            tracing::trace!("no horizontal heading; skipping pan");
            return;
        };
        let ahead = right.cross(&down);

        let Some(heading) =
            frames::rotation_about_axis(&down, Angle::new::<radian>(dy.atan2(dx) + FRAC_PI_2))
        else {
            return;
        };
        let ahead = heading * ahead;
        let target = position + ahead * self.config.pan_extrapolation();
        let axis = target.cross(&position);

        let Some(meters_per_pixel) = self.meters_per_pixel() else {
            tracing::trace!("no meters-per-pixel estimate; skipping pan");
            return;
        };
        let angle = (distance * meters_per_pixel).atan2(position.magnitude().get::<meter>());

        let Some(rotation) = frames::rotation_about_axis(&axis, Angle::new::<radian>(angle))
        else {
            tracing::trace!("degenerate pan axis; skipping pan");
            return;
        };
        let candidate = self.pose.rotated_about(Coordinate::origin(), rotation);
        if self.accept(candidate, "pan") {
            tracing::trace!(dx, dy, meters_per_pixel, "panned");
        }
    }

    /// The ground distance covered by one pixel at the center of the canvas.
    fn meters_per_pixel(&self) -> Option<f64> {
        let (width, height) = (f64::from(self.size.width), f64::from(self.size.height));
        let center = Pixel::new((width - 1.) / 2., (height - 1.) / 2.);
        let at_center = self.world_ray(center)?.direction();
        let plus_x = self
            .world_ray(Pixel::new(center.x + 1., center.y))?
            .direction();
        let plus_y = self
            .world_ray(Pixel::new(center.x, center.y + 1.))?
            .direction();

        let above = self
            .converter
            .ellipsoid()
            .height_above(&self.pose.position())
            .get::<meter>()
            .max(1.);
        let meters_x = above * at_center.angle_to(&plus_x).get::<radian>().tan();
        let meters_y = above * at_center.angle_to(&plus_y).get::<radian>().tan();
        let meters = meters_x.hypot(meters_y);
        meters.is_finite().then_some(meters)
    }

    /// Rotates the camera about its right axis through the orbit anchor.
    fn tilt(&mut self, dy: f64, anchor: Coordinate<Ecef>) {
        if dy == 0. {
            return;
        }
        let angle = -dy / self.drawing_area().height * PI;

        let right = self.pose.right();
        let pivot = anchor + right * (self.pose.position() - anchor).dot(&right);
        let Some(rotation) = frames::rotation_about_axis(&right, Angle::new::<radian>(angle))
        else {
            return;
        };
        let candidate = self.pose.rotated_about(pivot, rotation);

        let (min, max) = (self.config.min_tilt(), self.config.max_tilt());
        let outside = |tilt: Angle| {
            if tilt < min {
                (min - tilt).get::<radian>()
            } else if tilt > max {
                (tilt - max).get::<radian>()
            } else {
                0.
            }
        };
        let current = self.effective_tilt(&self.pose);
        let next = self.effective_tilt(&candidate);
        // out-of-range poses may still move back towards the range
        if outside(next) > 0. && outside(next) >= outside(current) {
            tracing::trace!(
                current = current.get::<degree>(),
                rejected = next.get::<degree>(),
                "tilt out of range"
            );
            return;
        }
        self.accept(candidate, "tilt");
    }

    /// Rotates the camera around the vertical through the orbit anchor.
    fn rotate(&mut self, dx: f64, anchor: Coordinate<Ecef>) {
        if dx == 0. {
            return;
        }
        let angle = -dx / self.drawing_area().width * TAU;
        let Some(rotation) =
            frames::rotation_about_axis(&Vector::from(anchor), Angle::new::<radian>(angle))
        else {
            tracing::trace!("orbit anchor at the origin; skipping rotate");
            return;
        };
        let candidate = self.pose.rotated_about(anchor, rotation);
        self.accept(candidate, "rotate");
    }

    /// The angle between where a pose looks and straight down.
    fn effective_tilt(&self, pose: &Pose<Ecef>) -> Angle {
        let down = -self.converter.ellipsoid().surface_normal(&pose.position());
        pose.forward().angle_to(&down)
    }

    fn accept(&mut self, candidate: Pose<Ecef>, update: &'static str) -> bool {
        if candidate.is_finite() {
            self.pose = candidate;
            true
        } else {
            tracing::trace!(update, "skipping non-finite pose");
            false
        }
    }
}
