//! RGB to LIFX HSBK conversion

use std::time::Duration;

/// Colour temperature paired with every command
pub const DEFAULT_KELVIN: u16 = 2500;

/// An RGB colour with each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// Convert RGB in `[0, 1]³` to hue, saturation, value in `[0, 1]`.
///
/// Hue is a fraction of a full turn and always lands in `[0, 1)`; greys have
/// hue and saturation 0.
pub fn rgb_to_hsv(rgb: Rgb) -> (f64, f64, f64) {
    let Rgb { r, g, b } = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if max == min {
        return (0.0, 0.0, v);
    }

    let delta = max - min;
    let s = delta / max;
    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;

    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    ((h / 6.0).rem_euclid(1.0), s, v)
}

/// Hue, saturation, brightness scaled to `0..=65535`, plus kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Hsbk {
    pub fn from_rgb(rgb: Rgb, kelvin: u16) -> Self {
        let (h, s, v) = rgb_to_hsv(rgb);
        Self {
            hue: scale(h),
            saturation: scale(s),
            brightness: scale(v),
            kelvin,
        }
    }
}

/// Truncating `[0, 1] -> [0, 65535]`; out-of-range input saturates.
fn scale(x: f64) -> u16 {
    (x * f64::from(u16::MAX)) as u16
}

/// One instruction for the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCommand {
    pub color: Hsbk,
    /// Fade time; `None` applies the colour instantly
    pub duration: Option<Duration>,
}

impl LightCommand {
    pub fn new(rgb: Rgb, kelvin: u16, duration: Option<Duration>) -> Self {
        Self {
            color: Hsbk::from_rgb(rgb, kelvin),
            duration,
        }
    }

    /// Duration in whole milliseconds, 0 for instant.
    pub fn duration_millis(&self) -> u32 {
        self.duration
            .map(|d| u32::try_from(d.as_millis()).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}
