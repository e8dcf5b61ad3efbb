use std::fmt;
use std::str::FromStr;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// ColorToken – one fill color
// ---------------------------------------------------------------------------

/// An sRGB fill color, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorToken {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ColorToken {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl From<Srgb<u8>> for ColorToken {
    fn from(c: Srgb<u8>) -> Self {
        Self::rgb(c.red, c.green, c.blue)
    }
}

impl FromStr for ColorToken {
    type Err = palette::rgb::FromHexError;

    /// Parse `#RRGGBB` / `#RGB` (leading `#` optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rgb: Srgb<u8> = s.trim().parse()?;
        Ok(rgb.into())
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl Serialize for ColorToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// ColorScale – ordered colors indexed by bucket
// ---------------------------------------------------------------------------

/// Ordered fill colors; bucket `i` is drawn with color `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    name: String,
    colors: Vec<ColorToken>,
}

impl ColorScale {
    pub fn new(name: impl Into<String>, colors: Vec<ColorToken>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Parse a named scale from hex tokens.
    pub fn from_hex<S: AsRef<str>>(
        name: &str,
        tokens: &[S],
    ) -> Result<Self, palette::rgb::FromHexError> {
        let colors = tokens
            .iter()
            .map(|t| t.as_ref().parse())
            .collect::<Result<Vec<ColorToken>, _>>()?;
        Ok(Self::new(name, colors))
    }

    /// Sequential light-to-dark blue ramp with `n` steps.
    pub fn ramp(n: usize) -> Self {
        Self::new(format!("ramp{n}"), generate_ramp(n, 210.0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn colors(&self) -> &[ColorToken] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Ramp generator
// ---------------------------------------------------------------------------

/// Generates `n` colours of one hue going from pale to dark.
pub fn generate_ramp(n: usize, hue: f32) -> Vec<ColorToken> {
    if n == 0 {
        return Vec::new();
    }
    let step = if n > 1 { 0.65 / (n - 1) as f32 } else { 0.0 };
    (0..n)
        .map(|i| {
            let lightness = 0.92 - step * i as f32;
            let hsl = Hsl::new(hue, 0.75, lightness);
            let rgb: Srgb = hsl.into_color();
            ColorToken::rgb(
                (rgb.red * 255.0).round() as u8,
                (rgb.green * 255.0).round() as u8,
                (rgb.blue * 255.0).round() as u8,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_hex_tokens() {
        let token: ColorToken = "#4682B4".parse().unwrap();
        assert_eq!(token, ColorToken::rgb(0x46, 0x82, 0xB4));
        assert_eq!(token.to_string(), "#4682B4");
        assert_eq!("#fee391".parse::<ColorToken>().unwrap().to_string(), "#FEE391");
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("#12345".parse::<ColorToken>().is_err());
        assert!("blue".parse::<ColorToken>().is_err());
    }

    #[test]
    fn from_hex_builds_named_scale() {
        let scale = ColorScale::from_hex("blueScale", &["#F0F8FF", "#00008B"]).unwrap();
        assert_eq!(scale.name(), "blueScale");
        assert_eq!(scale.len(), 2);
        assert_eq!(scale.colors()[1], ColorToken::rgb(0, 0, 0x8B));
    }

    #[test]
    fn ramp_darkens_step_by_step() {
        let ramp = generate_ramp(5, 210.0);
        assert_eq!(ramp.len(), 5);
        let luminance = |c: &ColorToken| c.red as u32 + c.green as u32 + c.blue as u32;
        assert!(ramp.windows(2).all(|w| luminance(&w[0]) > luminance(&w[1])));
        assert!(generate_ramp(0, 210.0).is_empty());
        assert_eq!(generate_ramp(1, 210.0).len(), 1);
    }

    #[test]
    fn token_serializes_as_hex_string() {
        let json = serde_json::to_string(&ColorToken::rgb(255, 0, 102)).unwrap();
        assert_eq!(json, r##""#FF0066""##);
    }
}
