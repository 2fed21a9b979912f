//! Color types

use serde::{Deserialize, Serialize};

/// Linear RGB color, components nominally in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
        }
    }

    /// Parses `"#rrggbb"`, `"0xrrggbb"` or bare `"rrggbb"`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_hex)
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A fixed, non-empty set of colors an emitter samples from at spawn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Rgb>")]
pub struct Palette(Vec<Rgb>);

impl From<Vec<Rgb>> for Palette {
    fn from(colors: Vec<Rgb>) -> Self {
        Self::from_colors(colors)
    }
}

impl Palette {
    /// Builds a palette from hex values. An empty list yields a white palette.
    pub fn from_hex(values: &[u32]) -> Self {
        Self::from_colors(values.iter().copied().map(Rgb::from_hex).collect())
    }

    pub fn from_colors(colors: Vec<Rgb>) -> Self {
        if colors.is_empty() {
            Self(vec![Rgb::WHITE])
        } else {
            Self(colors)
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.0
    }

    /// Color at `index`, wrapping around the palette length
    pub fn get(&self, index: usize) -> Rgb {
        self.0[index % self.0.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(vec![Rgb::WHITE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct PaletteDoc {
        colors: Palette,
    }

    #[test]
    fn test_deserialized_palette_is_never_empty() {
        let doc: PaletteDoc = toml::from_str("colors = []").unwrap();
        assert_eq!(doc.colors.colors(), &[Rgb::WHITE]);
        assert_eq!(doc.colors.get(3), Rgb::WHITE);

        let doc: PaletteDoc =
            toml::from_str("colors = [{ r = 0.0, g = 0.5, b = 1.0 }]").unwrap();
        assert_eq!(doc.colors.len(), 1);
        assert_eq!(doc.colors.get(1), Rgb::new(0.0, 0.5, 1.0));
    }

    #[test]
    fn test_rgb_from_hex() {
        let c = Rgb::from_hex(0xFF8844);
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert!((c.b - 0.267).abs() < 0.01);
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Rgb::parse_hex("#00ff88"), Some(Rgb::from_hex(0x00ff88)));
        assert_eq!(Rgb::parse_hex("0x8800FF"), Some(Rgb::from_hex(0x8800ff)));
        assert_eq!(Rgb::parse_hex("ff0088"), Some(Rgb::from_hex(0xff0088)));
        assert_eq!(Rgb::parse_hex("#fff"), None);
        assert_eq!(Rgb::parse_hex("zzzzzz"), None);
    }

    #[test]
    fn test_lerp_midpoint() {
        let mid = Rgb::WHITE.lerp(Rgb::BLACK, 0.5);
        for c in mid.to_array() {
            assert!((c - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_palette_falls_back_to_white() {
        let p = Palette::from_hex(&[]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get(7), Rgb::WHITE);
    }

    #[test]
    fn test_palette_wraps_index() {
        let p = Palette::from_hex(&[0xFF0000, 0x00FF00]);
        assert_eq!(p.get(3), Rgb::from_hex(0x00FF00));
    }
}
