// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Zoom factor applied after every lens switch
pub const DEFAULT_ZOOM_FACTOR: f64 = 1.0;

/// Lower bound of the UI zoom envelope for every lens
pub const UI_MIN_ZOOM: f64 = 1.0;

/// UI zoom ceilings keyed by lens display name
pub mod lens_envelope {
    /// Ultra-wide ("0.5x") ceiling
    pub const ULTRA_WIDE_MAX: f64 = 2.0;
    /// Wide ("1x") ceiling
    pub const WIDE_MAX: f64 = 2.96;
    /// Telephoto ("3x") ceiling
    pub const TELEPHOTO_MAX: f64 = 15.0;
    /// Any other lens
    pub const DEFAULT_MAX: f64 = 15.0;
}

/// Lens display names
pub mod lens_names {
    pub const ULTRA_WIDE: &str = "0.5x";
    pub const WIDE: &str = "1x";
    pub const TELEPHOTO: &str = "3x";
    pub const FRONT: &str = "Front";
}

/// Focus settle delays
pub mod focus {
    use super::Duration;

    /// Continuous autofocus settles after half a second
    pub const CONTINUOUS_SETTLE: Duration = Duration::from_millis(500);
    /// Single-shot autofocus settles after one second
    pub const SINGLE_SHOT_SETTLE: Duration = Duration::from_millis(1000);
}

/// Exposure control constants
pub mod exposure {
    /// UI exposure-bias range lower bound (stops)
    pub const UI_BIAS_MIN: f32 = -2.0;
    /// UI exposure-bias range upper bound (stops)
    pub const UI_BIAS_MAX: f32 = 2.0;
    /// White balance gains never go below unity
    pub const MIN_WHITE_BALANCE_GAIN: f32 = 1.0;
}

/// Device-orientation classification
pub mod orientation {
    use super::Duration;

    /// Motion sensor sampling interval
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
    /// |z| above this means the device lies face up or face down
    pub const FLAT_THRESHOLD: f64 = 0.75;
    /// |y| below this means landscape, otherwise portrait
    pub const LANDSCAPE_THRESHOLD: f64 = 0.45;
}

/// Post-capture transform constants
pub mod photo {
    /// Long edge of the corrected output image (pixels)
    pub const LONG_EDGE_BUDGET: u32 = 1920;
    /// Resolution used when neither the request nor the device gives one
    pub const FALLBACK_WIDTH: u32 = 4032;
    pub const FALLBACK_HEIGHT: u32 = 3024;
}

/// Capacity of the change-notification channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes_are_ordered() {
        assert!(lens_envelope::ULTRA_WIDE_MAX < lens_envelope::WIDE_MAX);
        assert!(lens_envelope::WIDE_MAX < lens_envelope::TELEPHOTO_MAX);
        assert!(UI_MIN_ZOOM <= DEFAULT_ZOOM_FACTOR);
    }

    #[test]
    fn test_settle_delays() {
        assert!(focus::CONTINUOUS_SETTLE < focus::SINGLE_SHOT_SETTLE);
    }
}
