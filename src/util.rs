use uom::si::angle::radian;
use uom::si::f64::Angle;

/// An angle normalized into a single turn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BoundedAngle {
    angle: Angle,
}

impl BoundedAngle {
    pub(crate) fn new(angle: impl Into<Angle>) -> Self {
        Self {
            // NOTE: even though we put the value into bounds here, uom may choose to store the
            // value differently-normalized, so we must normalize on output as well.
            angle: Angle::new::<radian>(Self::into_bounds(angle.into())),
        }
    }

    /// Returns the angle in [0°, 360°) in radians.
    pub(crate) fn get_bounded(self) -> f64 {
        Self::into_bounds(self.angle)
    }

    fn into_bounds(angle: Angle) -> f64 {
        let out_of_bounds: f64 = angle.get::<radian>();
        out_of_bounds.rem_euclid(Angle::FULL_TURN.get::<radian>())
    }

    /// Returns the angle in [-180°, 180°) in radians.
    pub(crate) fn to_signed_range(self) -> f64 {
        let angle = self.get_bounded();
        if angle < Angle::HALF_TURN.get::<radian>() {
            angle
        } else {
            angle - Angle::FULL_TURN.get::<radian>()
        }
    }

    /// Returns the smallest signed difference `self - other`, in [-180°, 180°) in radians.
    pub(crate) fn signed_difference(self, other: impl Into<Angle>) -> f64 {
        Self::new(self.angle - other.into()).to_signed_range()
    }
}

#[cfg(test)]
mod tests {
    use crate::util::BoundedAngle;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::angle::{degree, radian};
    use uom::si::f64::Angle;

    fn r(radians: f64) -> Angle {
        Angle::new::<radian>(radians)
    }
    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    #[test]
    fn bounded_angle_negative_radians() {
        let out_of_bounds = -(0.5 * Angle::HALF_TURN);
        let sut = BoundedAngle::new(out_of_bounds);
        assert_eq!(sut.get_bounded(), 1.5 * Angle::HALF_TURN.get::<radian>());
    }

    #[test]
    fn bounded_angle_positive_outside_bounds() {
        let out_of_bounds = Angle::FULL_TURN + r(0.9);
        let sut = BoundedAngle::new(out_of_bounds);
        assert_relative_eq!(sut.get_bounded(), 0.9, epsilon = 0.000_000_001);
    }

    #[rstest]
    #[case(d(0.), 0.)]
    #[case(d(180.), -180.)]
    #[case(d(359.), -1.)]
    #[case(d(270.), -90.)]
    #[case(d(-90.), -90.)]
    #[case(d(360.+120.), 120.)]
    #[case(d(360.+340.), -20.)]
    fn bounded_angle_to_signed_range_converts_correctly(
        #[case] input: Angle,
        #[case] expected_result_in_degrees: f64,
    ) {
        assert_relative_eq!(
            BoundedAngle::new(input).to_signed_range(),
            expected_result_in_degrees.to_radians(),
            epsilon = f64::EPSILON * 1000.
        );
    }

    #[rstest]
    #[case(d(179.), d(-179.), -2.)]
    #[case(d(-179.), d(179.), 2.)]
    #[case(d(10.), d(370.), 0.)]
    #[case(d(45.), d(30.), 15.)]
    fn signed_difference_wraps(#[case] a: Angle, #[case] b: Angle, #[case] expected: f64) {
        assert_relative_eq!(
            BoundedAngle::new(a).signed_difference(b),
            expected.to_radians(),
            epsilon = 1e-12
        );
    }
}
