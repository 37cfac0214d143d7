//! Subtractive pigment mixing with the Kubelka-Munk model.
//!
//! RGB interpolation mixes light, not paint: blue and yellow average to gray.
//! Here each color is upsampled to a 38-sample reflectance spectrum
//! (380-750 nm in 10 nm steps) built from seven basis curves, the spectra are
//! blended as absorption/scattering ratios, and the result is integrated back
//! through the CIE 1931 observer. Blue and yellow then mix to green.
//!
//! The basis spectra and the XYZ-to-RGB matrix are the published spectral.js
//! tables (MIT, Ronald van Wijnen).

use crate::color::{linear_component_to_srgb, srgb_to_linear, LinearRgb, Srgb, Srgba, Xyz};

/// Number of spectral samples per reflectance curve.
pub const SAMPLES: usize = 38;

/// Every reflectance sample is floored here so `(1-R)^2 / 2R` never divides by zero.
const REFLECTANCE_FLOOR: f64 = 1e-8;

/// XYZ to linear sRGB, matched to the CMF tables below.
const XYZ_TO_LINEAR: [[f64; 3]; 3] = [
    [3.24306333, -1.53837619, -0.49893282],
    [-0.96896309, 1.87542451, 0.04154303],
    [0.05568392, -0.20417438, 1.05799454],
];

/// A sampled reflectance curve with its cached luminance.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflectance {
    samples: [f64; SAMPLES],
    luminance: f64,
}

impl Reflectance {
    /// Upsamples an sRGB color to a reflectance curve.
    pub fn from_srgb(c: Srgb) -> Self {
        Self::from_linear(srgb_to_linear(c))
    }

    /// Upsamples a linear RGB color by decomposing it into white plus
    /// cyan/magenta/yellow (two-channel) and red/green/blue (one-channel)
    /// components and summing the matching basis spectra.
    pub fn from_linear(c: LinearRgb) -> Self {
        let w = c.r.min(c.g).min(c.b);
        let r = c.r - w;
        let g = c.g - w;
        let b = c.b - w;

        let cyan = g.min(b);
        let magenta = r.min(b);
        let yellow = r.min(g);
        let red = (r - b).min(r - g).max(0.0);
        let green = (g - b).min(g - r).max(0.0);
        let blue = (b - g).min(b - r).max(0.0);

        let mut samples = [0.0; SAMPLES];
        for (i, s) in samples.iter_mut().enumerate() {
            let value = w
                + cyan * SPD_C[i]
                + magenta * SPD_M[i]
                + yellow * SPD_Y[i]
                + red * SPD_R[i]
                + green * SPD_G[i]
                + blue * SPD_B[i];
            *s = value.max(REFLECTANCE_FLOOR);
        }
        Self::from_samples(samples)
    }

    fn from_samples(samples: [f64; SAMPLES]) -> Self {
        let luminance = dot(&samples, &CIE_CMF_Y);
        Self { samples, luminance }
    }

    /// The raw reflectance samples, each in (0, 1].
    pub fn samples(&self) -> &[f64; SAMPLES] {
        &self.samples
    }

    /// Integral of the curve against the CIE Y color-matching function.
    pub fn luminance(&self) -> f64 {
        self.luminance
    }

    /// Integrates the curve against the CIE X/Y/Z color-matching functions.
    pub fn to_xyz(&self) -> Xyz {
        Xyz {
            x: dot(&self.samples, &CIE_CMF_X),
            y: self.luminance,
            z: dot(&self.samples, &CIE_CMF_Z),
        }
    }

    /// Converts back to sRGB, clamped to [0, 1].
    pub fn to_srgb(&self) -> Srgb {
        let xyz = self.to_xyz();
        let channel = |row: &[f64; 3]| {
            let linear = row[0] * xyz.x + row[1] * xyz.y + row[2] * xyz.z;
            linear_component_to_srgb(linear).clamp(0.0, 1.0)
        };
        Srgb {
            r: channel(&XYZ_TO_LINEAR[0]),
            g: channel(&XYZ_TO_LINEAR[1]),
            b: channel(&XYZ_TO_LINEAR[2]),
        }
    }

    /// Kubelka-Munk blend of `self` with `other`, where `t` is the share of `other`.
    ///
    /// `t` is first remapped to a pigment concentration (see [`concentration`]),
    /// then each sample's K/S ratios are blended linearly and inverted back to
    /// a reflectance. `t` is clamped to [0, 1]; NaN is treated as 0.
    pub fn mix(&self, other: &Reflectance, t: f64) -> Reflectance {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let c = concentration(self.luminance, other.luminance, t);

        let mut samples = [0.0; SAMPLES];
        for (i, s) in samples.iter_mut().enumerate() {
            let ks = (1.0 - c) * absorption_ratio(self.samples[i])
                + c * absorption_ratio(other.samples[i]);
            *s = reflectance_from_ratio(ks);
        }
        Self::from_samples(samples)
    }
}

/// K/S ratio of a reflectance sample, `(1-R)^2 / 2R`.
fn absorption_ratio(r: f64) -> f64 {
    (1.0 - r) * (1.0 - r) / (2.0 * r)
}

/// Inverse of [`absorption_ratio`]: `1 + KS - sqrt(KS^2 + 2KS)`.
fn reflectance_from_ratio(ks: f64) -> f64 {
    1.0 + ks - (ks * ks + 2.0 * ks).sqrt()
}

/// Remaps a nominal mix ratio to a pigment concentration ratio.
///
/// `t' = l2 t^2 / (l1 (1-t)^2 + l2 t^2)`. Equal RGB-space ratios are not equal
/// amounts of paint: a dark pigment dominates a light one.
pub fn concentration(l1: f64, l2: f64, t: f64) -> f64 {
    let t1 = l1 * (1.0 - t) * (1.0 - t);
    let t2 = l2 * t * t;
    if t1 + t2 <= 0.0 {
        return t;
    }
    t2 / (t1 + t2)
}

/// Mixes two sRGB colors as paint, `t` being the share of `c2`.
///
/// Not symmetric in argument order: `mix(a, b, t)` equals `mix(b, a, 1 - t)`
/// only up to floating error, and callers must keep `t` as the weight of `c2`.
pub fn mix(c1: Srgb, c2: Srgb, t: f64) -> Srgb {
    Reflectance::from_srgb(c1)
        .mix(&Reflectance::from_srgb(c2), t)
        .to_srgb()
}

/// Like [`mix`], with alpha interpolated linearly at the nominal `t`.
pub fn mix_rgba(c1: Srgba, c2: Srgba, t: f64) -> Srgba {
    Srgba {
        rgb: mix(c1.rgb, c2.rgb, t),
        alpha: c1.alpha + t * (c2.alpha - c1.alpha),
    }
}

/// Returns `steps` colors evenly spaced from `c1` to `c2` (both ends included).
///
/// A single step yields `c1`; zero steps yield an empty ramp.
pub fn gradient(c1: Srgb, c2: Srgb, steps: usize) -> Vec<Srgb> {
    if steps <= 1 {
        return (0..steps).map(|_| c1).collect();
    }
    let r1 = Reflectance::from_srgb(c1);
    let r2 = Reflectance::from_srgb(c2);
    (0..steps)
        .map(|i| r1.mix(&r2, i as f64 / (steps - 1) as f64).to_srgb())
        .collect()
}

fn dot(a: &[f64; SAMPLES], b: &[f64; SAMPLES]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// -- Basis spectra --

const SPD_C: [f64; SAMPLES] = [
    0.96853629, 0.96855103, 0.96859338, 0.96877345, 0.96942204, 0.97143709,
    0.97541862, 0.98074186, 0.98580992, 0.98971194, 0.99238027, 0.99409844,
    0.995172, 0.99576545, 0.99593552, 0.99564041, 0.99464769, 0.99229579,
    0.98638762, 0.96829712, 0.89228016, 0.53740239, 0.15360445, 0.05705719,
    0.03126539, 0.02205445, 0.01802271, 0.0161346, 0.01520947, 0.01475977,
    0.01454263, 0.01444459, 0.01439897, 0.0143762, 0.01436343, 0.01435687,
    0.0143537, 0.01435408,
];

const SPD_M: [f64; SAMPLES] = [
    0.51567122, 0.5401552, 0.62645502, 0.75595012, 0.92826996, 0.97223624,
    0.98616174, 0.98955255, 0.98676237, 0.97312575, 0.91944277, 0.32564851,
    0.13820628, 0.05015143, 0.02912336, 0.02421691, 0.02660696, 0.03407586,
    0.04835936, 0.0001172, 8.554e-05, 0.85267882, 0.93188793, 0.94810268,
    0.94200977, 0.91478045, 0.87065445, 0.78827548, 0.65738359, 0.59909403,
    0.56817268, 0.54031997, 0.52110241, 0.51041094, 0.50526577, 0.5025508,
    0.50126452, 0.50083021,
];

const SPD_Y: [f64; SAMPLES] = [
    0.02055257, 0.02059936, 0.02062723, 0.02073387, 0.02114202, 0.02233154,
    0.02556857, 0.03330189, 0.05185294, 0.10087639, 0.24000413, 0.53589066,
    0.79874659, 0.91186529, 0.95399623, 0.97137099, 0.97939505, 0.98345207,
    0.98553736, 0.98648905, 0.98674535, 0.98657555, 0.98611877, 0.98559942,
    0.98507063, 0.98460039, 0.98425301, 0.98403909, 0.98388535, 0.98376116,
    0.98368246, 0.98365023, 0.98361309, 0.98357259, 0.98353856, 0.98351247,
    0.98350101, 0.98350852,
];

const SPD_R: [f64; SAMPLES] = [
    0.03147571, 0.03146636, 0.03140624, 0.03119611, 0.03053888, 0.02856855,
    0.02459485, 0.0192952, 0.01423112, 0.01033111, 0.00765876, 0.00593693,
    0.00485616, 0.00426186, 0.00409039, 0.00438375, 0.00537525, 0.00772962,
    0.0136612, 0.03181352, 0.10791525, 0.46249516, 0.84604333, 0.94275572,
    0.96860996, 0.97783966, 0.98187757, 0.98377315, 0.98470202, 0.98515481,
    0.98537114, 0.98546685, 0.98550011, 0.98551031, 0.98550741, 0.98551323,
    0.98551563, 0.98551547,
];

const SPD_G: [f64; SAMPLES] = [
    0.49108579, 0.46944057, 0.4016578, 0.2449042, 0.0682688, 0.02732883,
    0.013606, 0.01000187, 0.01284127, 0.02636635, 0.07058713, 0.70421692,
    0.85473994, 0.95081565, 0.9717037, 0.97651888, 0.97429245, 0.97012917,
    0.9425863, 0.99989207, 0.99989891, 0.13823139, 0.06968113, 0.05628787,
    0.06111561, 0.08987709, 0.13656016, 0.22169624, 0.32176956, 0.36157329,
    0.4836192, 0.46488579, 0.47440306, 0.4857699, 0.49267971, 0.49625685,
    0.49807754, 0.49889859,
];

const SPD_B: [f64; SAMPLES] = [
    0.97901834, 0.97901649, 0.97901118, 0.97892146, 0.97858555, 0.97743705,
    0.97428075, 0.96663223, 0.94822893, 0.89937713, 0.76070164, 0.4642044,
    0.20123039, 0.08808402, 0.04592894, 0.02860373, 0.02060067, 0.01656701,
    0.01451549, 0.01357964, 0.01331243, 0.01347661, 0.01387181, 0.01435472,
    0.01479836, 0.0151525, 0.01540513, 0.01557233, 0.0156571, 0.01571025,
    0.01571916, 0.01572133, 0.01572502, 0.01571717, 0.01571905, 0.01571059,
    0.01569728, 0.0157002,
];

const CIE_CMF_X: [f64; SAMPLES] = [
    6.469e-05, 0.00021941, 0.00112057, 0.00376661, 0.01188055, 0.02328644,
    0.03455942, 0.03722379, 0.03241838, 0.02123321, 0.01049099, 0.00329584,
    0.00050704, 0.00094867, 0.00627372, 0.01686462, 0.02868965, 0.04267481,
    0.05625475, 0.0694704, 0.08305315, 0.0861261, 0.09046614, 0.08500387,
    0.07090667, 0.05062889, 0.03547396, 0.02146821, 0.01251646, 0.00680458,
    0.00346457, 0.00149761, 0.0007697, 0.00040737, 0.00016901, 9.522e-05,
    4.903e-05, 2e-05,
];

const CIE_CMF_Y: [f64; SAMPLES] = [
    1.84e-06, 6.21e-06, 3.101e-05, 0.00010475, 0.00035364, 0.00095147,
    0.00228226, 0.00420733, 0.0066888, 0.0098884, 0.01524945, 0.02141831,
    0.03342293, 0.05131001, 0.07040208, 0.08783871, 0.09424905, 0.09795667,
    0.09415219, 0.08678102, 0.07885653, 0.0635267, 0.05374142, 0.04264606,
    0.03161735, 0.02088521, 0.01386011, 0.00810264, 0.0046301, 0.00249138,
    0.0012593, 0.00054165, 0.00027795, 0.00014711, 6.103e-05, 3.439e-05,
    1.771e-05, 7.22e-06,
];

const CIE_CMF_Z: [f64; SAMPLES] = [
    0.00030502, 0.00103681, 0.00531314, 0.01795439, 0.05707758, 0.11365162,
    0.17335873, 0.19620658, 0.18608237, 0.13995048, 0.08917453, 0.04789621,
    0.02814563, 0.01613766, 0.0077591, 0.00429615, 0.00200551, 0.00086147,
    0.00036904, 0.00019143, 0.00014956, 9.231e-05, 6.813e-05, 2.883e-05,
    1.577e-05, 3.94e-06, 1.58e-06, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0,
];

#[cfg(test)]
mod tests {
    use super::*;

    /// Tolerance for "the same color" after a spectral round trip.
    const ROUND_TRIP: f64 = 1e-3;

    fn close(a: Srgb, b: Srgb, tol: f64) -> bool {
        (a.r - b.r).abs() < tol && (a.g - b.g).abs() < tol && (a.b - b.b).abs() < tol
    }

    #[test]
    fn blue_and_yellow_mix_to_green() {
        let blue = Srgb::from_u32(0x0000ff);
        let yellow = Srgb::from_u32(0xffff00);
        let mixed = mix(blue, yellow, 0.5);
        // Reference value from spectral.js: #388f54.
        let expected = Srgb::from_u32(0x388f54);
        assert!(close(mixed, expected, 1.5 / 255.0), "got {}", mixed.to_hex());
        assert!(mixed.g > mixed.r && mixed.g > mixed.b, "not green: {mixed:?}");
    }

    #[test]
    fn gradient_matches_reference_ramp() {
        let ramp = gradient(Srgb::from_u32(0xffff00), Srgb::from_u32(0x0000ff), 10);
        let expected = [
            0xffff00, 0xdbeb2b, 0xb1d23e, 0x84b849, 0x539c51, 0x128256, 0x006a5b, 0x005766,
            0x004987, 0x0000ff,
        ];
        assert_eq!(ramp.len(), expected.len());
        for (i, (got, &want)) in ramp.iter().zip(expected.iter()).enumerate() {
            assert!(
                close(*got, Srgb::from_u32(want), 1.5 / 255.0),
                "step {i}: got {} want #{want:06x}",
                got.to_hex()
            );
        }
    }

    #[test]
    fn gradient_degenerate_lengths() {
        let a = Srgb::from_u32(0x123456);
        let b = Srgb::from_u32(0xabcdef);
        assert!(gradient(a, b, 0).is_empty());
        assert_eq!(gradient(a, b, 1), vec![a]);
    }

    #[test]
    fn mix_at_endpoints_returns_inputs() {
        let red = Srgb::from_u32(0xdb0e08);
        let white = Srgb::from_u32(0xf8f7f6);
        assert!(close(mix(red, white, 0.0), red, ROUND_TRIP));
        assert!(close(mix(red, white, 1.0), white, ROUND_TRIP));
    }

    #[test]
    fn mix_is_idempotent_on_primaries_and_neutrals() {
        let colors = [0xff0000, 0x00ff00, 0x0000ff, 0xffffff, 0x000000, 0x808080, 0x4f5863];
        for &hex in &colors {
            let c = Srgb::from_u32(hex);
            for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
                let m = mix(c, c, t);
                assert!(close(m, c, ROUND_TRIP), "#{hex:06x} at t={t}: {}", m.to_hex());
            }
        }
    }

    #[test]
    fn mix_is_not_plain_rgb_interpolation() {
        let blue = Srgb::from_u32(0x0000ff);
        let yellow = Srgb::from_u32(0xffff00);
        let mixed = mix(blue, yellow, 0.5);
        // Additive averaging would give a desaturated gray (0.5, 0.5, 0.5).
        assert!(!close(mixed, Srgb { r: 0.5, g: 0.5, b: 0.5 }, 0.1));
    }

    #[test]
    fn black_reflectance_is_floored_not_zero() {
        let r = Reflectance::from_srgb(Srgb::BLACK);
        assert!(r.samples().iter().all(|&s| s >= REFLECTANCE_FLOOR));
        assert!(r.luminance() > 0.0);
    }

    #[test]
    fn mixing_with_black_is_finite() {
        let mixed = mix(Srgb::BLACK, Srgb::BLACK, 0.5);
        for v in [mixed.r, mixed.g, mixed.b] {
            assert!(v.is_finite() && (0.0..=1.0).contains(&v), "bad channel {v}");
        }
    }

    #[test]
    fn absorption_ratio_inverts() {
        for r in [1e-8, 0.01, 0.2, 0.5, 0.9, 1.0] {
            let back = reflectance_from_ratio(absorption_ratio(r));
            assert!((back - r).abs() < 1e-6, "R={r} came back as {back}");
        }
    }

    #[test]
    fn concentration_endpoints_and_equal_luminance() {
        assert_eq!(concentration(0.3, 0.7, 0.0), 0.0);
        assert_eq!(concentration(0.3, 0.7, 1.0), 1.0);
        assert!((concentration(0.5, 0.5, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn concentration_favours_the_darker_pigment() {
        // A light color needs more than its nominal share to hold its own
        // against a dark one.
        let c = concentration(0.05, 0.9, 0.5);
        assert!(c > 0.5, "expected light color 2 to get a larger share, got t'={c}");
    }

    #[test]
    fn mix_rgba_lerps_alpha_at_nominal_ratio() {
        let a = Srgba {
            rgb: Srgb::from_u32(0xff0000),
            alpha: 0.2,
        };
        let b = Srgba::opaque(Srgb::from_u32(0x0000ff));
        let m = mix_rgba(a, b, 0.25);
        assert!((m.alpha - 0.4).abs() < 1e-12);
    }

    #[test]
    fn nan_ratio_is_treated_as_zero() {
        let a = Srgb::from_u32(0x2c4271);
        let b = Srgb::from_u32(0xedd22d);
        assert_eq!(mix(a, b, f64::NAN), mix(a, b, 0.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn mix_of_a_color_with_itself_is_that_color(
                r in 0.0_f64..=1.0,
                g in 0.0_f64..=1.0,
                b in 0.0_f64..=1.0,
                t in 0.0_f64..=1.0,
            ) {
                let c = Srgb { r, g, b };
                let m = mix(c, c, t);
                prop_assert!(close(m, c, 5e-3), "{c:?} at t={t} -> {m:?}");
            }

            #[test]
            fn mix_always_in_gamut(
                r1 in 0.0_f64..=1.0, g1 in 0.0_f64..=1.0, b1 in 0.0_f64..=1.0,
                r2 in 0.0_f64..=1.0, g2 in 0.0_f64..=1.0, b2 in 0.0_f64..=1.0,
                t in 0.0_f64..=1.0,
            ) {
                let m = mix(Srgb { r: r1, g: g1, b: b1 }, Srgb { r: r2, g: g2, b: b2 }, t);
                for v in [m.r, m.g, m.b] {
                    prop_assert!(v.is_finite() && (0.0..=1.0).contains(&v), "channel {v}");
                }
            }
        }
    }
}
