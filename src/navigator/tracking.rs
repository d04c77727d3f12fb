use super::input::InputEvent;
use crate::camera::PerspectiveCamera;
use crate::config::NavigatorConfig;
use crate::convert::GeoConverter;
use crate::coordinate_systems::{Ned, View};
use crate::error::{ConfigError, NavigatorError};
use crate::frames;
use crate::geodetic::{Components, Wgs84};
use crate::math::Rotation;
use crate::pose::Pose;
use crate::projection::{self, DrawingArea, Distortion, Pixel, Size};
use crate::ray::Ray;
use crate::systems::Ecef;
use crate::{Coordinate, Vector};
use uom::si::angle::degree;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

system! {
    /// Body axes of the platform carrying the camera: forward, right, and down.
    pub struct PlatformBody using NED
}

system! {
    /// Body axes of the camera at the end of its lever arm: forward, right, and down.
    pub struct SensorBody using NED
}

/// Yaw, pitch, and roll as applied by [`frames::euler_rotation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub yaw: Angle,
    pub pitch: Angle,
    pub roll: Angle,
}

impl EulerAngles {
    #[must_use]
    pub fn new(yaw: impl Into<Angle>, pitch: impl Into<Angle>, roll: impl Into<Angle>) -> Self {
        Self {
            yaw: yaw.into(),
            pitch: pitch.into(),
            roll: roll.into(),
        }
    }

    /// No rotation at all.
    #[must_use]
    pub fn zero() -> Self {
        let zero = Angle::new::<degree>(0.);
        Self::new(zero, zero, zero)
    }

    fn rotation<From, To>(&self) -> Rotation<From, To> {
        Rotation::from_euler_angles(self.yaw, self.pitch, self.roll)
    }
}

/// A commanded view for a [`TrackingNavigator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingView {
    pub position: Wgs84,
    /// Orientation of the platform relative to the local NED frame at `position`.
    pub platform: EulerAngles,
    /// Orientation of the camera relative to the platform.
    pub lever: EulerAngles,
    pub hfov: Angle,
    pub vfov: Angle,
}

/// Camera metadata as delivered alongside tracked video frames.
///
/// All angles are in degrees. The position is geodetic, with `x` the latitude, `y` the
/// longitude, and `z` the height in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct TrackingCameraMetadata {
    pub frame_id: u64,
    pub position: MetadataPosition,
    pub platform: MetadataOrientation,
    pub lever: MetadataOrientation,
    pub fov: MetadataFieldOfView,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lens: Distortion,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetadataPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetadataOrientation {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl From<MetadataOrientation> for EulerAngles {
    fn from(o: MetadataOrientation) -> Self {
        Self::new(
            Angle::new::<degree>(o.yaw),
            Angle::new::<degree>(o.pitch),
            Angle::new::<degree>(o.roll),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetadataFieldOfView {
    pub hfov: f64,
    pub vfov: f64,
}

impl TryFrom<&TrackingCameraMetadata> for TrackingView {
    type Error = NavigatorError;

    fn try_from(metadata: &TrackingCameraMetadata) -> Result<Self, Self::Error> {
        let MetadataPosition { x, y, z } = metadata.position;
        let (platform, lever) = (metadata.platform, metadata.lever);
        for (what, value) in [
            ("latitude", x),
            ("longitude", y),
            ("height", z),
            ("platform yaw", platform.yaw),
            ("platform pitch", platform.pitch),
            ("platform roll", platform.roll),
            ("lever yaw", lever.yaw),
            ("lever pitch", lever.pitch),
            ("lever roll", lever.roll),
        ] {
            if !value.is_finite() {
                return Err(NavigatorError::NonFinite(what));
            }
        }

        let position = Wgs84::build(Components {
            latitude: Angle::new::<degree>(x),
            longitude: Angle::new::<degree>(y),
            height: Length::new::<meter>(z),
        })
        .ok_or(NavigatorError::InvalidLatitude(x))?;
        let hfov = Angle::new::<degree>(metadata.fov.hfov);
        let vfov = Angle::new::<degree>(metadata.fov.vfov);
        check_field_of_view(hfov)?;
        check_field_of_view(vfov)?;
        Ok(Self {
            position,
            platform: platform.into(),
            lever: lever.into(),
            hfov,
            vfov,
        })
    }
}

fn check_field_of_view(fov: Angle) -> Result<(), NavigatorError> {
    let degrees = fov.get::<degree>();
    if degrees > 0. && degrees < 180. {
        Ok(())
    } else {
        Err(NavigatorError::InvalidFieldOfView(degrees))
    }
}

/// A camera that strictly follows commanded views, such as the poses of a tracked video.
///
/// The camera's aspect ratio follows its fields of view rather than the canvas, so the image is
/// letterboxed into a fitted [`DrawingArea`].
#[derive(Debug, Clone)]
pub struct TrackingNavigator {
    converter: GeoConverter,
    size: Size,
    camera: PerspectiveCamera,
    view: TrackingView,
    lens: Distortion,
}

impl TrackingNavigator {
    /// Constructs a navigator looking straight down from 100 km above 0°N 0°E.
    ///
    /// Both fields of view must lie in (0°, 180°).
    pub fn new(
        config: NavigatorConfig,
        hfov: impl Into<Angle>,
        vfov: impl Into<Angle>,
        size: Size,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (hfov, vfov) = (hfov.into(), vfov.into());
        for fov in [hfov, vfov] {
            check_field_of_view(fov)
                .map_err(|_| ConfigError::FieldOfView(fov.get::<degree>()))?;
        }
        let view = TrackingView {
            position: Wgs84 {
                latitude: Angle::new::<degree>(0.),
                longitude: Angle::new::<degree>(0.),
                height: Length::new::<meter>(100_000.),
            },
            platform: EulerAngles::new(
                Angle::new::<degree>(0.),
                Angle::new::<degree>(90.),
                Angle::new::<degree>(0.),
            ),
            lever: EulerAngles::zero(),
            hfov,
            vfov,
        };
        let mut navigator = Self {
            converter: GeoConverter::default(),
            size,
            camera: PerspectiveCamera::new(
                vfov,
                projection::aspect_ratio_from_fov(hfov, vfov),
                config.near(),
                config.far(),
            ),
            view,
            lens: Distortion::default(),
        };
        let pose = navigator.view_pose(&view);
        navigator.camera.set_pose(pose);
        navigator.update_camera();
        Ok(navigator)
    }

    /// Moves the camera to the commanded view.
    ///
    /// The orientation is the local NED frame at the position, rotated by the platform's
    /// orientation and then by the lever arm's.
    ///
    /// A view with a field of view outside (0°, 180°), or one that would leave the camera with a
    /// non-finite pose, is skipped and the navigator keeps its current view.
    pub fn set_view(&mut self, view: &TrackingView) -> Result<(), NavigatorError> {
        let (pose, aspect_ratio) = match self.candidate(view) {
            Ok(candidate) => candidate,
            Err(error) => {
                tracing::trace!(%error, position = %view.position, "skipping tracking view");
                return Err(error);
            }
        };

        tracing::trace!(position = %view.position, "tracking view set");
        self.view = *view;
        self.camera.set_pose(pose);
        self.camera.set_vertical_fov(view.vfov);
        self.camera.set_aspect_ratio(aspect_ratio);
        self.update_camera();
        Ok(())
    }

    fn candidate(&self, view: &TrackingView) -> Result<(Pose<Ecef>, f64), NavigatorError> {
        check_field_of_view(view.hfov)?;
        check_field_of_view(view.vfov)?;
        let pose = self.view_pose(view);
        let aspect_ratio = projection::aspect_ratio_from_fov(view.hfov, view.vfov);
        if pose.is_finite() && aspect_ratio.is_finite() && aspect_ratio > 0. {
            Ok((pose, aspect_ratio))
        } else {
            Err(NavigatorError::DegenerateView)
        }
    }

    fn view_pose(&self, view: &TrackingView) -> Pose<Ecef> {
        let position = self.converter.to_ecef(&view.position);
        let orientation: Rotation<Ecef, View> =
            frames::local_ned_rotation::<Ned>(&position, &self.converter)
                * view.platform.rotation::<Ned, PlatformBody>()
                * view.lever.rotation::<PlatformBody, SensorBody>()
                * frames::ned_to_view_rotation::<SensorBody, View>();
        Pose::new(position, orientation)
    }

    /// Moves the camera to the view described by tracking metadata, and keeps its lens
    /// distortion around for [`TrackingNavigator::lens`].
    ///
    /// Fails (leaving the navigator untouched) if any value is not finite, the latitude is out
    /// of range, or a field of view is outside (0°, 180°).
    pub fn set_view_from_metadata(
        &mut self,
        metadata: &TrackingCameraMetadata,
    ) -> Result<(), NavigatorError> {
        let view = TrackingView::try_from(metadata)?;
        self.set_view(&view)?;
        self.lens = metadata.lens;
        tracing::trace!(frame_id = metadata.frame_id, "tracking metadata applied");
        Ok(())
    }

    /// The most recently commanded view.
    #[must_use]
    pub fn view(&self) -> &TrackingView {
        &self.view
    }

    /// Radial distortion of the lens of the most recent metadata.
    #[must_use]
    pub fn lens(&self) -> &Distortion {
        &self.lens
    }

    /// Returns `(eye, target, up)` for an equivalent look-at: the target is a meter ahead of the
    /// camera along its body forward axis and up is its body up (ie, negated down) axis.
    #[must_use]
    pub fn look_at_parameters(&self) -> (Coordinate<Ecef>, Coordinate<Ecef>, Vector<Ecef>) {
        let pose = self.camera.pose();
        let body: Rotation<Ecef, SensorBody> =
            pose.orientation() * frames::ned_to_view_rotation::<SensorBody, View>().inverse();
        let (forward, _right, down) = body.basis();
        let eye = pose.position();
        (eye, eye + forward, -down)
    }

    /// Only the canvas size matters here; everything else comes from commanded views.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn drawing_area(&self) -> DrawingArea {
        DrawingArea::fit(self.size, self.camera.aspect_ratio())
    }

    pub fn update_camera(&mut self) {
        self.camera.update_projection_matrix();
    }

    #[must_use]
    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// Casts a ray through a pixel, or returns `None` if the pixel lies outside the drawing
    /// area.
    #[must_use]
    pub fn world_ray(&self, pixel: Pixel) -> Option<Ray<Ecef>> {
        let uv = projection::pixel_to_uv(&self.drawing_area(), pixel);
        if !uv.is_inside() {
            return None;
        }
        self.camera.world_ray(uv)
    }

    /// Pointer and wheel input is ignored.
    pub fn handle(&mut self, event: InputEvent) {
        if let InputEvent::Resize(size) = event {
            self.set_size(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EulerAngles, MetadataFieldOfView, MetadataOrientation, MetadataPosition,
        TrackingCameraMetadata, TrackingNavigator, TrackingView,
    };
    use crate::config::NavigatorConfig;
    use crate::error::{ConfigError, NavigatorError};
    use crate::geodetic::{Components, Wgs84};
    use crate::navigator::input::InputEvent;
    use crate::projection::{Pixel, Size};
    use crate::systems::Ecef;
    use crate::{Coordinate, Vector};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::f64::{Angle, Length};
    use uom::si::{angle::degree, length::meter};

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }
    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    fn navigator(size: Size) -> TrackingNavigator {
        TrackingNavigator::new(NavigatorConfig::default(), d(60.), d(30.), size)
            .expect("default config is valid")
    }

    fn equator_view(platform: EulerAngles, lever: EulerAngles) -> TrackingView {
        TrackingView {
            position: Wgs84::build(Components {
                latitude: d(0.),
                longitude: d(0.),
                height: m(1000.),
            })
            .expect("latitude is in [-90, 90]"),
            platform,
            lever,
            hfov: d(60.),
            vfov: d(30.),
        }
    }

    #[test]
    fn starts_looking_straight_down() {
        let nav = navigator(Size::new(800, 600));
        let (eye, target, up) = nav.look_at_parameters();
        assert_relative_eq!(
            eye,
            Coordinate::<Ecef>::from_cartesian(m(6_378_137. + 100_000.), m(0.), m(0.)),
            epsilon = m(1e-6)
        );
        assert_relative_eq!(target - eye, -Vector::<Ecef>::x_axis(), epsilon = 1e-12);
        // the top of the image is north
        assert_relative_eq!(up, Vector::<Ecef>::z_axis(), epsilon = 1e-12);
        assert_relative_eq!(
            nav.camera().pose().forward(),
            -Vector::<Ecef>::x_axis(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn yaw_turns_the_platform() {
        let mut nav = navigator(Size::new(800, 600));
        nav.set_view(&equator_view(
            EulerAngles::new(d(90.), d(0.), d(0.)),
            EulerAngles::zero(),
        ))
        .expect("view is valid");
        let (eye, target, up) = nav.look_at_parameters();
        assert_relative_eq!(target - eye, -Vector::<Ecef>::y_axis(), epsilon = 1e-12);
        assert_relative_eq!(up, Vector::<Ecef>::x_axis(), epsilon = 1e-12);
        assert_relative_eq!(
            nav.camera().pose().forward(),
            -Vector::<Ecef>::y_axis(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn lever_composes_with_platform() {
        let mut split = navigator(Size::new(800, 600));
        split.set_view(&equator_view(
            EulerAngles::new(d(0.), d(45.), d(0.)),
            EulerAngles::new(d(0.), d(45.), d(0.)),
        ))
        .expect("view is valid");
        let mut whole = navigator(Size::new(800, 600));
        whole.set_view(&equator_view(
            EulerAngles::new(d(0.), d(90.), d(0.)),
            EulerAngles::zero(),
        ))
        .expect("view is valid");
        assert_relative_eq!(
            split.camera().pose(),
            whole.camera().pose(),
            epsilon = (m(1e-6), 1e-12)
        );
    }

    #[test]
    fn metadata_drives_the_view() {
        let metadata: TrackingCameraMetadata = serde_yaml::from_str(
            "
            frame-id: 42
            position: { x: 59.3293, y: 18.0686, z: 250 }
            platform: { yaw: 10, pitch: 80, roll: -3 }
            lever: { yaw: 0, pitch: 5, roll: 0 }
            fov: { hfov: 40, vfov: 30 }
            lens: { k2: 0.01, k3: 0, k4: 0 }
            ",
        )
        .expect("valid metadata");
        assert_eq!(metadata.frame_id, 42);

        let mut from_metadata = navigator(Size::new(800, 600));
        from_metadata
            .set_view_from_metadata(&metadata)
            .expect("latitude is valid");
        assert_relative_eq!(from_metadata.lens().k2, 0.01);

        let mut direct = navigator(Size::new(800, 600));
        direct.set_view(&TrackingView {
            position: Wgs84::build(Components {
                latitude: d(59.3293),
                longitude: d(18.0686),
                height: m(250.),
            })
            .expect("latitude is in [-90, 90]"),
            platform: EulerAngles::new(d(10.), d(80.), d(-3.)),
            lever: EulerAngles::new(d(0.), d(5.), d(0.)),
            hfov: d(40.),
            vfov: d(30.),
        })
        .expect("view is valid");
        assert_relative_eq!(
            from_metadata.camera().pose(),
            direct.camera().pose(),
            epsilon = (m(1e-6), 1e-12)
        );
        assert_relative_eq!(
            from_metadata.camera().vertical_fov().get::<degree>(),
            30.,
            epsilon = 1e-12
        );
    }

    #[test]
    fn bad_metadata_leaves_the_view_alone() {
        let mut nav = navigator(Size::new(800, 600));
        let before = nav.camera().pose();
        let mut metadata = TrackingCameraMetadata::default();
        metadata.position.x = 95.;
        assert_eq!(
            nav.set_view_from_metadata(&metadata),
            Err(NavigatorError::InvalidLatitude(95.))
        );
        assert_eq!(nav.camera().pose(), before);
    }

    #[test]
    fn rays_only_inside_the_drawing_area() {
        // the 60°x30° image is letterboxed into the square canvas
        let mut nav = navigator(Size::new(100, 100));
        nav.handle(InputEvent::Resize(Size::new(800, 800)));
        assert_eq!(nav.size(), Size::new(800, 800));

        let area = nav.drawing_area();
        assert_relative_eq!(area.width, 800.);
        assert!(area.y_offset > 200.);

        assert!(nav.world_ray(Pixel::new(400., 100.)).is_none());
        assert!(nav.world_ray(Pixel::new(400., 700.)).is_none());
        let ray = nav
            .world_ray(Pixel::new(399.5, 399.5))
            .expect("center is inside");
        assert_relative_eq!(
            ray.direction(),
            nav.camera().pose().forward(),
            epsilon = 1e-9
        );
    }

    fn metadata() -> TrackingCameraMetadata {
        TrackingCameraMetadata {
            frame_id: 7,
            position: MetadataPosition {
                x: 59.3293,
                y: 18.0686,
                z: 250.,
            },
            platform: MetadataOrientation {
                yaw: 10.,
                pitch: 80.,
                roll: -3.,
            },
            lever: MetadataOrientation::default(),
            fov: MetadataFieldOfView {
                hfov: 40.,
                vfov: 30.,
            },
            lens: Default::default(),
        }
    }

    fn assert_untouched(nav: &TrackingNavigator, before: &TrackingNavigator) {
        assert_eq!(nav.camera().pose(), before.camera().pose());
        assert_eq!(nav.view(), before.view());
        assert_eq!(nav.camera().aspect_ratio(), before.camera().aspect_ratio());
        assert_eq!(nav.drawing_area(), before.drawing_area());
        assert!(nav.world_ray(Pixel::new(399.5, 299.5)).is_some());
    }

    #[rstest]
    #[case::all_defaults(
        TrackingCameraMetadata::default(),
        NavigatorError::InvalidFieldOfView(0.)
    )]
    #[case::nan_pitch_and_no_fov(
        TrackingCameraMetadata {
            platform: MetadataOrientation { pitch: f64::NAN, ..Default::default() },
            ..Default::default()
        },
        NavigatorError::NonFinite("platform pitch")
    )]
    #[case::infinite_height(
        TrackingCameraMetadata {
            position: MetadataPosition { z: f64::INFINITY, ..metadata().position },
            ..metadata()
        },
        NavigatorError::NonFinite("height")
    )]
    #[case::infinite_lever_roll(
        TrackingCameraMetadata {
            lever: MetadataOrientation { roll: f64::NEG_INFINITY, ..Default::default() },
            ..metadata()
        },
        NavigatorError::NonFinite("lever roll")
    )]
    #[case::nan_longitude(
        TrackingCameraMetadata {
            position: MetadataPosition { y: f64::NAN, ..metadata().position },
            ..metadata()
        },
        NavigatorError::NonFinite("longitude")
    )]
    #[case::half_turn_fov(
        TrackingCameraMetadata {
            fov: MetadataFieldOfView { hfov: 40., vfov: 180. },
            ..metadata()
        },
        NavigatorError::InvalidFieldOfView(180.)
    )]
    #[case::negative_fov(
        TrackingCameraMetadata {
            fov: MetadataFieldOfView { hfov: -40., vfov: 30. },
            ..metadata()
        },
        NavigatorError::InvalidFieldOfView(-40.)
    )]
    fn degenerate_metadata_is_rejected(
        #[case] metadata: TrackingCameraMetadata,
        #[case] expected: NavigatorError,
    ) {
        let before = navigator(Size::new(800, 600));
        let mut nav = before.clone();
        assert_eq!(nav.set_view_from_metadata(&metadata), Err(expected));
        assert_untouched(&nav, &before);
        assert_eq!(nav.lens(), before.lens());
    }

    #[test]
    fn degenerate_views_are_skipped() {
        let before = navigator(Size::new(800, 600));
        let mut nav = before.clone();

        let mut zero_fov = equator_view(
            EulerAngles::new(d(0.), d(90.), d(0.)),
            EulerAngles::zero(),
        );
        zero_fov.vfov = d(0.);
        assert_eq!(
            nav.set_view(&zero_fov),
            Err(NavigatorError::InvalidFieldOfView(0.))
        );
        assert_untouched(&nav, &before);

        let nan_pitch = equator_view(
            EulerAngles::new(d(0.), d(f64::NAN), d(0.)),
            EulerAngles::zero(),
        );
        assert_eq!(nav.set_view(&nan_pitch), Err(NavigatorError::DegenerateView));
        assert_untouched(&nav, &before);

        let mut nowhere = equator_view(EulerAngles::zero(), EulerAngles::zero());
        nowhere.position = Wgs84::build(Components {
            latitude: d(0.),
            longitude: d(f64::NAN),
            height: m(1000.),
        })
        .expect("latitude is in [-90, 90]");
        assert_eq!(nav.set_view(&nowhere), Err(NavigatorError::DegenerateView));
        assert_untouched(&nav, &before);
    }

    #[test]
    fn fields_of_view_must_be_usable() {
        let result = TrackingNavigator::new(
            NavigatorConfig::default(),
            d(60.),
            d(0.),
            Size::new(800, 600),
        );
        assert_eq!(result.err(), Some(ConfigError::FieldOfView(0.)));
    }
}
