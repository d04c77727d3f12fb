//! Input events consumed by the navigators.

use crate::projection::{Pixel, Size};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which pointer button changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointerButton {
    /// Usually the left mouse button; drags pan the camera.
    Primary,
    /// Usually the right mouse button; drags orbit the camera around the point under it.
    Secondary,
    Other(u16),
}

impl PointerButton {
    /// Maps a DOM-style button index (0 = main, 1 = auxiliary, 2 = secondary).
    #[must_use]
    pub fn from_index(index: u16) -> Self {
        match index {
            0 => Self::Primary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }
}

/// Which way the wheel turned. Its magnitude is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WheelDirection {
    /// Moves the camera along its view direction.
    Forward,
    Backward,
}

impl WheelDirection {
    /// Scrolling up (negative delta) moves forward.
    #[must_use]
    pub fn from_delta_y(delta_y: f64) -> Self {
        if delta_y < 0. {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InputEvent {
    PointerDown { button: PointerButton, pixel: Pixel },
    PointerUp { button: PointerButton, pixel: Pixel },
    PointerMove { pixel: Pixel },
    /// The pointer left the canvas; ends any gesture.
    PointerLeave,
    Wheel(WheelDirection),
    /// The canvas changed size.
    Resize(Size),
}
