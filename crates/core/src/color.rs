//! Color types, colorimetric conversions, and perceptual distance.
//!
//! Provides `Srgb`, `Srgba`, `LinearRgb`, `Xyz`, and `Lab` plus pure conversion
//! functions between them. CIELAB is computed relative to the D65 white point.
//! The optimizer's objective uses [`delta_e94_squared`], which skips the final
//! square root because only comparisons are needed on the hot path.

use crate::error::MixError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// sRGB color with components in [0, 1].
///
/// Serializes as a hex string `"#rrggbb"`. The hex round-trip has 8-bit
/// quantization (1/255 precision loss).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// sRGB color with a straight (non-premultiplied) alpha channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srgba {
    pub rgb: Srgb,
    pub alpha: f64,
}

/// Linear RGB color (gamma-decoded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// CIE 1931 XYZ tristimulus values, Y normalized to 1 for reference white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// CIELAB color (D65).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// D65 reference white.
const WHITE_X: f64 = 0.95047;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.08883;

/// CIELAB linear-segment threshold, (6/29)^3.
const LAB_EPSILON: f64 = 0.008856;
/// CIELAB linear-segment slope.
const LAB_SLOPE: f64 = 7.787;
const LAB_OFFSET: f64 = 16.0 / 116.0;

impl Srgb {
    pub const BLACK: Srgb = Srgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Srgb = Srgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Builds a color from 8-bit channel values.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Srgb {
        Srgb {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Builds a color from a packed `0xRRGGBB` value.
    pub fn from_u32(rgb: u32) -> Srgb {
        Srgb::from_rgb8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Quantizes to 8-bit channels with rounding, clamping out-of-range input.
    pub fn to_rgb8(self) -> [u8; 3] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    /// Parses a hex color string like "#ff00aa" or "ff00aa" (case insensitive).
    pub fn from_hex(hex: &str) -> Result<Srgb, MixError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(MixError::InvalidColor(format!(
                "expected 6 hex digits, got '{hex}'"
            )));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| MixError::InvalidColor(format!("invalid {name} component: {e}")))
        };
        Ok(Srgb::from_rgb8(
            channel(0..2, "red")?,
            channel(2..4, "green")?,
            channel(4..6, "blue")?,
        ))
    }

    /// Converts the color to a hex string like `"#rrggbb"`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl Serialize for Srgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Srgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Srgb::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Srgba {
    /// Wraps an opaque color.
    pub fn opaque(rgb: Srgb) -> Srgba {
        Srgba { rgb, alpha: 1.0 }
    }
}

/// Applies inverse sRGB gamma to a single component.
pub(crate) fn srgb_component_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Applies sRGB gamma to a single linear component.
pub(crate) fn linear_component_to_srgb(c: f64) -> f64 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Converts sRGB to linear RGB by applying inverse sRGB gamma.
pub fn srgb_to_linear(c: Srgb) -> LinearRgb {
    LinearRgb {
        r: srgb_component_to_linear(c.r),
        g: srgb_component_to_linear(c.g),
        b: srgb_component_to_linear(c.b),
    }
}

/// Converts linear RGB to sRGB by applying sRGB gamma. Does not clamp.
pub fn linear_to_srgb(c: LinearRgb) -> Srgb {
    Srgb {
        r: linear_component_to_srgb(c.r),
        g: linear_component_to_srgb(c.g),
        b: linear_component_to_srgb(c.b),
    }
}

/// Converts linear RGB to XYZ (sRGB primaries, D65).
pub fn linear_to_xyz(c: LinearRgb) -> Xyz {
    Xyz {
        x: 0.4124564 * c.r + 0.3575761 * c.g + 0.1804375 * c.b,
        y: 0.2126729 * c.r + 0.7151522 * c.g + 0.0721750 * c.b,
        z: 0.0193339 * c.r + 0.1191920 * c.g + 0.9503041 * c.b,
    }
}

/// Converts XYZ to linear RGB (sRGB primaries, D65). Does not clamp.
pub fn xyz_to_linear(c: Xyz) -> LinearRgb {
    LinearRgb {
        r: 3.2404542 * c.x - 1.5371385 * c.y - 0.4985314 * c.z,
        g: -0.9692660 * c.x + 1.8760108 * c.y + 0.0415560 * c.z,
        b: 0.0556434 * c.x - 0.2040259 * c.y + 1.0572252 * c.z,
    }
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_SLOPE * t + LAB_OFFSET
    }
}

fn lab_f_inv(t: f64) -> f64 {
    let cubed = t * t * t;
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (t - LAB_OFFSET) / LAB_SLOPE
    }
}

/// Converts XYZ to CIELAB relative to D65.
pub fn xyz_to_lab(c: Xyz) -> Lab {
    let fx = lab_f(c.x / WHITE_X);
    let fy = lab_f(c.y / WHITE_Y);
    let fz = lab_f(c.z / WHITE_Z);
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Converts CIELAB (D65) to XYZ.
pub fn lab_to_xyz(c: Lab) -> Xyz {
    let fy = (c.l + 16.0) / 116.0;
    let fx = c.a / 500.0 + fy;
    let fz = fy - c.b / 200.0;
    Xyz {
        x: WHITE_X * lab_f_inv(fx),
        y: WHITE_Y * lab_f_inv(fy),
        z: WHITE_Z * lab_f_inv(fz),
    }
}

/// sRGB to CIELAB via the chain sRGB -> linear -> XYZ -> Lab.
pub fn srgb_to_lab(c: Srgb) -> Lab {
    xyz_to_lab(linear_to_xyz(srgb_to_linear(c)))
}

/// CIELAB to sRGB via the chain Lab -> XYZ -> linear -> sRGB, clamped to [0, 1].
pub fn lab_to_srgb(c: Lab) -> Srgb {
    let srgb = linear_to_srgb(xyz_to_linear(lab_to_xyz(c)));
    Srgb {
        r: srgb.r.clamp(0.0, 1.0),
        g: srgb.g.clamp(0.0, 1.0),
        b: srgb.b.clamp(0.0, 1.0),
    }
}

/// Squared CIE94 color difference (graphic-arts weights, kL = kC = kH = 1).
///
/// Asymmetric: the chroma weighting uses the chroma of `a` as the reference,
/// so callers pass the candidate first and the target second.
pub fn delta_e94_squared(a: Lab, b: Lab) -> f64 {
    let delta_l = a.l - b.l;
    let delta_a = a.a - b.a;
    let delta_b = a.b - b.b;
    let c1 = (a.a * a.a + a.b * a.b).sqrt();
    let c2 = (b.a * b.a + b.b * b.b).sqrt();
    let delta_c = c1 - c2;
    // Floating error can push dH^2 slightly negative for near-identical hues.
    let delta_h_sq = delta_a * delta_a + delta_b * delta_b - delta_c * delta_c;
    let delta_h = if delta_h_sq < 0.0 {
        0.0
    } else {
        delta_h_sq.sqrt()
    };
    let weighted_c = delta_c / (1.0 + 0.045 * c1);
    let weighted_h = delta_h / (1.0 + 0.015 * c1);
    delta_l * delta_l + weighted_c * weighted_c + weighted_h * weighted_h
}

/// CIE94 color difference.
pub fn delta_e94(a: Lab, b: Lab) -> f64 {
    delta_e94_squared(a, b).sqrt()
}

/// "Redmean" weighted RGB distance on 8-bit channels.
///
/// A cheap approximation of perceptual distance that needs no colorimetric
/// conversion; useful for coarse nearest-color lookups.
pub fn redmean_distance(a: Srgb, b: Srgb) -> f64 {
    let [r1, g1, b1] = a.to_rgb8().map(i64::from);
    let [r2, g2, b2] = b.to_rgb8().map(i64::from);
    let r_mean = (r1 + r2) / 2;
    let dr = r1 - r2;
    let dg = g1 - g2;
    let db = b1 - b2;
    let sum = (((512 + r_mean) * dr * dr) >> 8) + 4 * dg * dg + (((767 - r_mean) * db * db) >> 8);
    (sum as f64).sqrt()
}
