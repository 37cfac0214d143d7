//! Pigments, the ordered palettes they form, and match targets.
//!
//! A [`Palette`] is fixed for the lifetime of an optimization run. A pigment's
//! index in the palette is its identity: proportion vectors are keyed by it,
//! and the chained mix folds pigments in index order.

use crate::color::{srgb_to_lab, Lab, Srgb};
use crate::error::MixError;
use crate::spectral::Reflectance;
use serde::{Deserialize, Serialize};

/// Wire form shared by pigments and targets: `{"name": ..., "color": "#rrggbb"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub color: Srgb,
}

/// An immutable base paint: name, sRGB color, and derived CIELAB and spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NamedColor", into = "NamedColor")]
pub struct Pigment {
    name: String,
    color: Srgb,
    lab: Lab,
    reflectance: Reflectance,
}

impl Pigment {
    pub fn new(name: impl Into<String>, color: Srgb) -> Self {
        Self {
            name: name.into(),
            color,
            lab: srgb_to_lab(color),
            reflectance: Reflectance::from_srgb(color),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Srgb {
        self.color
    }

    pub fn lab(&self) -> Lab {
        self.lab
    }

    /// Upsampled reflectance, cached so the chained mix only re-derives the
    /// running color's spectrum.
    pub fn reflectance(&self) -> &Reflectance {
        &self.reflectance
    }
}

impl From<NamedColor> for Pigment {
    fn from(c: NamedColor) -> Self {
        Pigment::new(c.name, c.color)
    }
}

impl From<Pigment> for NamedColor {
    fn from(p: Pigment) -> Self {
        NamedColor {
            name: p.name,
            color: p.color,
        }
    }
}

/// The color a run tries to reproduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NamedColor", into = "NamedColor")]
pub struct Target {
    name: String,
    color: Srgb,
    lab: Lab,
}

impl Target {
    pub fn new(name: impl Into<String>, color: Srgb) -> Self {
        Self {
            name: name.into(),
            color,
            lab: srgb_to_lab(color),
        }
    }

    /// Parses a hex color, naming the target after the hex string itself.
    pub fn from_hex(hex: &str) -> Result<Self, MixError> {
        let color = Srgb::from_hex(hex)?;
        Ok(Self::new(color.to_hex(), color))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Srgb {
        self.color
    }

    pub fn lab(&self) -> Lab {
        self.lab
    }
}

impl From<NamedColor> for Target {
    fn from(c: NamedColor) -> Self {
        Target::new(c.name, c.color)
    }
}

impl From<Target> for NamedColor {
    fn from(t: Target) -> Self {
        NamedColor {
            name: t.name,
            color: t.color,
        }
    }
}

/// All built-in palette names, in listing order.
const PALETTE_NAMES: &[&str] = &[
    "primaries",
    "student-5",
    "student-10",
    "artists",
    "school",
    "heavy-body",
    "acrylic-24",
];

/// An ordered, non-empty set of pigments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Pigment>", into = "Vec<Pigment>")]
pub struct Palette {
    pigments: Vec<Pigment>,
}

impl Palette {
    /// Creates a palette from pigments in index order. Requires at least one pigment.
    pub fn new(pigments: Vec<Pigment>) -> Result<Self, MixError> {
        if pigments.is_empty() {
            return Err(MixError::InvalidPalette(
                "palette requires at least 1 pigment".to_string(),
            ));
        }
        Ok(Self { pigments })
    }

    /// Creates a palette from `(name, hex)` pairs.
    pub fn from_hex(entries: &[(&str, &str)]) -> Result<Self, MixError> {
        let pigments: Result<Vec<Pigment>, MixError> = entries
            .iter()
            .map(|(name, hex)| {
                Srgb::from_hex(hex)
                    .map(|c| Pigment::new(*name, c))
                    .map_err(|e| MixError::InvalidPalette(format!("pigment '{name}': {e}")))
            })
            .collect();
        Self::new(pigments?)
    }

    fn builtin(entries: &[(&str, u32)]) -> Self {
        Self {
            pigments: entries
                .iter()
                .map(|&(name, rgb)| Pigment::new(name, Srgb::from_u32(rgb)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pigments.len()
    }

    /// Always false for a constructed palette.
    pub fn is_empty(&self) -> bool {
        self.pigments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pigment> {
        self.pigments.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pigment> {
        self.pigments.iter()
    }

    /// Index of the first pigment with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.pigments.iter().position(|p| p.name == name)
    }

    /// Returns a copy of this palette with `pigment` appended at the end.
    ///
    /// Existing indices are unchanged, so proportion vectors built for the
    /// old palette stay meaningful as prefixes.
    pub fn with_pigment(&self, pigment: Pigment) -> Self {
        let mut pigments = self.pigments.clone();
        pigments.push(pigment);
        Self { pigments }
    }

    // -- Built-in palettes --

    /// Pure red, green, blue, white, and black.
    pub fn primaries() -> Self {
        Self::builtin(&[
            ("Red", 0xff0000),
            ("Green", 0x00ff00),
            ("Blue", 0x0000ff),
            ("White", 0xffffff),
            ("Black", 0x000000),
        ])
    }

    /// Student acrylic five-pack.
    pub fn student_five() -> Self {
        Self::builtin(&[
            ("White", 0xf5f5f5),
            ("Cool Yellow", 0xedd22d),
            ("Cool Red", 0x5a201f),
            ("Cool Blue", 0x2c233e),
            ("Black", 0x261b2b),
        ])
    }

    /// Student acrylic ten-pack.
    pub fn student_ten() -> Self {
        Self::builtin(&[
            ("White", 0xf5f5f5),
            ("Cool Yellow", 0xedd22d),
            ("Warm Yellow", 0xcf9e41),
            ("Warm Red", 0x87262d),
            ("Cool Red", 0x5a201f),
            ("Red Oxide", 0x601917),
            ("Warm Blue", 0x252355),
            ("Cool Blue", 0x2c233e),
            ("Yellow Oxide", 0x9f7f42),
            ("Black", 0x261b2b),
        ])
    }

    /// Artist-grade acrylic primaries plus black and white.
    pub fn artists() -> Self {
        Self::builtin(&[
            ("Cool Red", 0xb11d13),
            ("Cool Yellow", 0xe9e60f),
            ("Cool Blue", 0x154f99),
            ("Black", 0x46423f),
            ("White", 0xe9e8e6),
        ])
    }

    /// School poster-paint primaries plus black and white.
    pub fn school() -> Self {
        Self::builtin(&[
            ("Cool Red", 0x950026),
            ("Cool Yellow", 0xffe902),
            ("Cool Blue", 0x000062),
            ("Black", 0x040404),
            ("White", 0xeeebeb),
        ])
    }

    /// Heavy-body artist acrylics.
    pub fn heavy_body() -> Self {
        Self::builtin(&[
            ("Yellow Light Hansa", 0xfcee13),
            ("Naphthol Red Light", 0xd11700),
            ("Ivory Black", 0x1d1d1d),
            ("Phthalocyanine Green Blue Shade", 0x002a2b),
            ("Phthalocyanine Blue Green Shade", 0x211940),
            ("Dioxazine Purple", 0x231919),
            ("Titanium White", 0xf9faf7),
        ])
    }

    /// Full 24-color student acrylic range.
    pub fn acrylic_24() -> Self {
        Self::builtin(&[
            ("Warm Blue", 0x252355),
            ("Cobalt Blue", 0x2c4271),
            ("Cool Blue", 0x2c233e),
            ("Violet", 0x1c103e),
            ("White", 0xf5f5f5),
            ("Silver", 0x5f6269),
            ("Black", 0x261b2b),
            ("Cool Yellow", 0xedd22d),
            ("Warm Yellow", 0xcf9e41),
            ("Yellow Oxide", 0x9f7f42),
            ("Gold", 0x705b2e),
            ("Raw Sienna", 0x6f522a),
            ("Burnt Sienna", 0x412220),
            ("Burnt Umber", 0x291a1d),
            ("Raw Umber", 0x21190c),
            ("Warm Red", 0x87262d),
            ("Cool Red", 0x5a201f),
            ("Red Oxide", 0x601917),
            ("Vermillion", 0xa13b24),
            ("Skin Tone", 0xdbba9b),
            ("Magenta", 0x6a2250),
            ("Deep Green", 0x334338),
            ("Light Green", 0x2c7236),
            ("Forest Green", 0x252620),
        ])
    }

    /// Names accepted by [`Palette::from_name`].
    pub fn list_names() -> &'static [&'static str] {
        PALETTE_NAMES
    }

    /// Looks up a built-in palette by name.
    pub fn from_name(name: &str) -> Result<Self, MixError> {
        match name {
            "primaries" => Ok(Self::primaries()),
            "student-5" => Ok(Self::student_five()),
            "student-10" => Ok(Self::student_ten()),
            "artists" => Ok(Self::artists()),
            "school" => Ok(Self::school()),
            "heavy-body" => Ok(Self::heavy_body()),
            "acrylic-24" => Ok(Self::acrylic_24()),
            _ => Err(MixError::InvalidPalette(format!(
                "unknown palette '{name}' (expected one of: {})",
                PALETTE_NAMES.join(", ")
            ))),
        }
    }
}

impl TryFrom<Vec<Pigment>> for Palette {
    type Error = MixError;

    fn try_from(pigments: Vec<Pigment>) -> Result<Self, Self::Error> {
        Palette::new(pigments)
    }
}

impl From<Palette> for Vec<Pigment> {
    fn from(p: Palette) -> Self {
        p.pigments
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a Pigment;
    type IntoIter = std::slice::Iter<'a, Pigment>;

    fn into_iter(self) -> Self::IntoIter {
        self.pigments.iter()
    }
}
