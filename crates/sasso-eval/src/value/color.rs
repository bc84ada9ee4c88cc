//! RGBA colors, HSL conversion and the CSS named-color table.

use super::number::format_number;

/// An sRGB color. Channels are 0-255, alpha 0-1. `original` keeps the
/// source spelling (`#FFF`, `red`) until the color is modified.
#[derive(Debug, Clone)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
    pub original: Option<String>,
}

impl Color {
    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red: red.clamp(0.0, 255.0),
            green: green.clamp(0.0, 255.0),
            blue: blue.clamp(0.0, 255.0),
            alpha: alpha.clamp(0.0, 1.0),
            original: None,
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        let expand = |c: char| format!("{c}{c}");
        let full = match digits.len() {
            3 | 4 => digits.chars().map(expand).collect::<String>(),
            6 | 8 => digits.to_string(),
            _ => return None,
        };
        let red = channel(&full[0..2])?;
        let green = channel(&full[2..4])?;
        let blue = channel(&full[4..6])?;
        let alpha = if full.len() == 8 {
            channel(&full[6..8])? / 255.0
        } else {
            1.0
        };
        let mut color = Self::rgba(red, green, blue, alpha);
        color.original = Some(text.to_string());
        Some(color)
    }

    /// Look up a CSS color keyword (case-insensitive), including `transparent`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower == "transparent" {
            let mut color = Self::rgba(0.0, 0.0, 0.0, 0.0);
            color.original = Some(name.to_string());
            return Some(color);
        }
        let rgb = NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, rgb)| *rgb)?;
        let mut color = Self::rgba(
            f64::from((rgb >> 16) & 0xff),
            f64::from((rgb >> 8) & 0xff),
            f64::from(rgb & 0xff),
            1.0,
        );
        color.original = Some(name.to_string());
        Some(color)
    }

    /// Build from hue (degrees), saturation and lightness (percent).
    pub fn from_hsla(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let l = (lightness / 100.0).clamp(0.0, 1.0);
        let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
        let m1 = l * 2.0 - m2;
        let channel = |mut t: f64| {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            let v = if t * 6.0 < 1.0 {
                m1 + (m2 - m1) * t * 6.0
            } else if t * 2.0 < 1.0 {
                m2
            } else if t * 3.0 < 2.0 {
                m1 + (m2 - m1) * (2.0 / 3.0 - t) * 6.0
            } else {
                m1
            };
            v * 255.0
        };
        Self::rgba(
            channel(h + 1.0 / 3.0),
            channel(h),
            channel(h - 1.0 / 3.0),
            alpha,
        )
    }

    /// `(hue, saturation, lightness)` with hue in degrees, the rest in percent.
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.red / 255.0;
        let g = self.green / 255.0;
        let b = self.blue / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let lightness = (max + min) / 2.0;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta)
        } else if max == g {
            60.0 * ((b - r) / delta) + 120.0
        } else {
            60.0 * ((r - g) / delta) + 240.0
        };
        let saturation = if delta == 0.0 {
            0.0
        } else if lightness < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        (hue.rem_euclid(360.0), saturation * 100.0, lightness * 100.0)
    }

    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self::rgba(self.red, self.green, self.blue, alpha)
    }

    /// CSS text: the original spelling if untouched, else `#rrggbb` or
    /// `rgba(r, g, b, a)`.
    pub fn to_css(&self) -> String {
        if let Some(original) = &self.original {
            return original.clone();
        }
        let r = self.red.round() as u8;
        let g = self.green.round() as u8;
        let b = self.blue.round() as u8;
        if self.alpha >= 1.0 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("rgba({r}, {g}, {b}, {})", format_number(self.alpha))
        }
    }

    /// `#AARRGGBB`, as produced by `ie-hex-str()`.
    pub fn to_ie_hex(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            (self.alpha * 255.0).round() as u8,
            self.red.round() as u8,
            self.green.round() as u8,
            self.blue.round() as u8
        )
    }

    /// Channel-wise equality after rounding.
    pub fn same_as(&self, other: &Color) -> bool {
        self.red.round() == other.red.round()
            && self.green.round() == other.green.round()
            && self.blue.round() == other.blue.round()
            && (self.alpha - other.alpha).abs() < 1e-10
    }
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        let short = Color::from_hex("#f00").unwrap_or_else(|| panic!("parse"));
        assert_eq!(short.red, 255.0);
        assert_eq!(short.to_css(), "#f00");
        let with_alpha = Color::from_hex("#ff000080").unwrap_or_else(|| panic!("parse"));
        assert!((with_alpha.alpha - 128.0 / 255.0).abs() < 1e-9);
        assert!(Color::from_hex("#ggg").is_none());
    }

    #[test]
    fn test_modified_color_prints_hex() {
        let color = Color::rgba(255.0, 128.0, 0.0, 1.0);
        assert_eq!(color.to_css(), "#ff8000");
        assert_eq!(color.with_alpha(0.5).to_css(), "rgba(255, 128, 0, 0.5)");
    }

    #[test]
    fn test_hsl_roundtrip_of_red() {
        let red = Color::from_name("red").unwrap_or_else(|| panic!("named"));
        assert_eq!(red.to_hsl(), (0.0, 100.0, 50.0));
        assert!(Color::from_hsla(0.0, 100.0, 50.0, 1.0).same_as(&red));
    }

    #[test]
    fn test_ie_hex() {
        assert_eq!(Color::rgba(255.0, 0.0, 0.0, 1.0).to_ie_hex(), "#FFFF0000");
    }
}
