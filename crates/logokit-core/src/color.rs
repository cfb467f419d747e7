//! Color parsing, color-space conversion and WCAG contrast helpers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque sRGB color. Always written as uppercase `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Strict hex parsing: 3 or 6 hex digits, leading `#` optional.
    ///
    /// Shorthand is expanded (`#03F` is `#0033FF`). Anything else is rejected.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
                Some(Self { r, g, b })
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self { r, g, b })
            }
            _ => None,
        }
    }

    /// Parse a paint color as found in SVG attributes: `#RGB`, `#RRGGBB`,
    /// `rgb(r, g, b)` and a handful of named colors.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if s.starts_with('#') {
            return Self::from_hex(s);
        }

        if let Some(inner) = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
            if parts.len() == 3 {
                let channel = |p: &str| p.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
                return Some(Self {
                    r: channel(parts[0])?,
                    g: channel(parts[1])?,
                    b: channel(parts[2])?,
                });
            }
            return None;
        }

        match s.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::new(255, 0, 0)),
            "green" => Some(Self::new(0, 128, 0)),
            "blue" => Some(Self::new(0, 0, 255)),
            "yellow" => Some(Self::new(255, 255, 0)),
            "gray" | "grey" => Some(Self::new(128, 128, 128)),
            "orange" => Some(Self::new(255, 165, 0)),
            "purple" => Some(Self::new(128, 0, 128)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// WCAG 2.0 relative luminance.
    pub fn relative_luminance(&self) -> f64 {
        fn linear(channel: u8) -> f64 {
            let c = channel as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    /// YIQ perceived brightness in `0..=255`.
    pub fn brightness(&self) -> f64 {
        (self.r as f64 * 299.0 + self.g as f64 * 587.0 + self.b as f64 * 114.0) / 1000.0
    }

    pub fn to_hsl(&self) -> Hsl {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        Hsl { h: h / 6.0, s, l }
    }

    pub fn from_hsl(hsl: Hsl) -> Self {
        let Hsl { h, s, l } = hsl;
        let (r, g, b) = if s == 0.0 {
            (l, l, l)
        } else {
            let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let p = 2.0 * l - q;
            (
                hue_to_channel(p, q, h + 1.0 / 3.0),
                hue_to_channel(p, q, h),
                hue_to_channel(p, q, h - 1.0 / 3.0),
            )
        };
        Self {
            r: unit_to_byte(r),
            g: unit_to_byte(g),
            b: unit_to_byte(b),
        }
    }
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn unit_to_byte(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color: {}", s)))
    }
}

/// Hue, saturation and lightness, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

// ============================================================================
// Contrast
// ============================================================================

/// WCAG conformance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WcagLevel {
    #[default]
    Aa,
    Aaa,
}

pub fn hex_to_rgb(hex: &str) -> Option<Color> {
    Color::from_hex(hex)
}

pub fn rgb_to_hex(color: Color) -> String {
    color.to_hex()
}

/// `(L_max + 0.05) / (L_min + 0.05)`, rounded to two decimals.
pub fn contrast_ratio(a: Color, b: Color) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let ratio = (la.max(lb) + 0.05) / (la.min(lb) + 0.05);
    (ratio * 100.0).round() / 100.0
}

/// Black or white text for the given background, by YIQ brightness.
///
/// This is a brightness threshold, not a contrast-ratio search.
pub fn pick_text_color(background: Color) -> Color {
    if background.brightness() > 125.0 {
        Color::BLACK
    } else {
        Color::WHITE
    }
}

pub fn meets_accessibility(foreground: Color, background: Color, level: WcagLevel, large_text: bool) -> bool {
    let ratio = contrast_ratio(foreground, background);
    let required = match (level, large_text) {
        (WcagLevel::Aa, false) => 4.5,
        (WcagLevel::Aa, true) => 3.0,
        (WcagLevel::Aaa, false) => 7.0,
        (WcagLevel::Aaa, true) => 4.5,
    };
    ratio >= required
}

/// Shift every channel by `factor * 255`; negative factors darken.
pub fn adjust_brightness(color: Color, factor: f64) -> Color {
    let shift = |c: u8| (c as f64 + factor * 255.0).round().clamp(0.0, 255.0) as u8;
    Color::new(shift(color.r), shift(color.g), shift(color.b))
}

// ============================================================================
// Generated schemes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeColor {
    pub name: String,
    pub color: Color,
}

impl SchemeColor {
    fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// `count` shades of `base`, lightness spread evenly from 20% to 80%.
///
/// The middle entry is named `Primary`. A single shade uses 50% lightness.
pub fn monochromatic_scheme(base: Color, count: usize) -> Vec<SchemeColor> {
    let hsl = base.to_hsl();
    (0..count)
        .map(|i| {
            let l = if count == 1 {
                0.5
            } else {
                0.2 + 0.6 * i as f64 / (count - 1) as f64
            };
            let name = if i == count / 2 {
                "Primary".to_string()
            } else {
                format!("Variation {}", i + 1)
            };
            SchemeColor::new(name, Color::from_hsl(Hsl { l, ..hsl }))
        })
        .collect()
}

/// Base color, its complement, an accent a quarter turn round the wheel, and
/// fixed dark/light neutrals.
pub fn complementary_scheme(base: Color) -> Vec<SchemeColor> {
    let hsl = base.to_hsl();
    let complement = Color::from_hsl(Hsl {
        h: (hsl.h + 0.5) % 1.0,
        ..hsl
    });
    let accent = Color::from_hsl(Hsl {
        h: (hsl.h + 0.25) % 1.0,
        s: 0.7,
        l: 0.6,
    });
    vec![
        SchemeColor::new("Primary", base),
        SchemeColor::new("Secondary", complement),
        SchemeColor::new("Accent", accent),
        SchemeColor::new("Dark", Color::new(30, 30, 30)),
        SchemeColor::new("Light", Color::new(245, 245, 245)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(hex_to_rgb("#0B3C5D"), Some(Color::new(11, 60, 93)));
        assert_eq!(rgb_to_hex(Color::new(11, 60, 93)), "#0B3C5D");
        assert_eq!(hex_to_rgb("#0b3c5d").unwrap().to_hex(), "#0B3C5D");
        assert_eq!(hex_to_rgb("03F"), Some(Color::new(0, 0x33, 0xFF)));
    }

    #[test]
    fn test_invalid_hex_is_rejected() {
        assert_eq!(hex_to_rgb("#12345"), None);
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb(""), None);
        assert_eq!(hex_to_rgb("#1234567"), None);
    }

    #[test]
    fn test_parse_paint_colors() {
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::new(255, 0, 0)));
        assert_eq!(Color::parse("White"), Some(Color::WHITE));
        assert_eq!(Color::parse("url(#grad)"), None);
    }

    #[test]
    fn test_contrast_ratio() {
        assert_eq!(contrast_ratio(Color::BLACK, Color::WHITE), 21.0);
        assert_eq!(contrast_ratio(Color::WHITE, Color::BLACK), 21.0);
        assert_eq!(contrast_ratio(Color::WHITE, Color::WHITE), 1.0);
    }

    #[test]
    fn test_pick_text_color() {
        assert_eq!(pick_text_color(Color::new(11, 60, 93)), Color::WHITE);
        assert_eq!(pick_text_color(Color::new(0xFF, 0xC1, 0x07)), Color::BLACK);
        assert_eq!(pick_text_color(Color::WHITE), Color::BLACK);
    }

    #[test]
    fn test_accessibility_levels() {
        let grey = Color::new(0x77, 0x77, 0x77);
        let ratio = contrast_ratio(grey, Color::WHITE);
        assert!(ratio > 4.0 && ratio < 4.5);
        assert!(!meets_accessibility(grey, Color::WHITE, WcagLevel::Aa, false));
        assert!(meets_accessibility(grey, Color::WHITE, WcagLevel::Aa, true));
        assert!(!meets_accessibility(grey, Color::WHITE, WcagLevel::Aaa, true));
        assert!(meets_accessibility(Color::BLACK, Color::WHITE, WcagLevel::Aaa, false));
    }

    #[test]
    fn test_hsl_conversion() {
        let red = Color::new(255, 0, 0).to_hsl();
        assert_eq!(red, Hsl { h: 0.0, s: 1.0, l: 0.5 });
        assert_eq!(Color::from_hsl(red), Color::new(255, 0, 0));
        let teal = Color::new(11, 60, 93);
        assert_eq!(Color::from_hsl(teal.to_hsl()), teal);
    }

    #[test]
    fn test_adjust_brightness_clamps() {
        assert_eq!(adjust_brightness(Color::new(250, 10, 128), 0.1), Color::new(255, 36, 154));
        assert_eq!(adjust_brightness(Color::new(10, 10, 10), -0.5), Color::BLACK);
    }

    #[test]
    fn test_schemes() {
        let scheme = complementary_scheme(Color::new(255, 0, 0));
        let hex: Vec<String> = scheme.iter().map(|c| c.color.to_hex()).collect();
        assert_eq!(hex, ["#FF0000", "#00FFFF", "#99E052", "#1E1E1E", "#F5F5F5"]);

        let mono = monochromatic_scheme(Color::new(255, 0, 0), 5);
        assert_eq!(mono.len(), 5);
        assert_eq!(mono[2].name, "Primary");
        assert!((mono[0].color.to_hsl().l - 0.2).abs() < 1e-9);
        assert!(monochromatic_scheme(Color::BLACK, 0).is_empty());
    }
}
