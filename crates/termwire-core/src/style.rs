#![forbid(unsafe_code)]

//! Colors and SGR attributes.

use crate::error::{Error, Result};

/// A terminal color.
///
/// The sixteen named colors are emitted through the 256-color palette
/// selector, so they render identically on every terminal that supports
/// `38;5;n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// The terminal's default color for the channel.
    Reset,
    Black,
    DarkGrey,
    Red,
    DarkRed,
    Green,
    DarkGreen,
    Yellow,
    DarkYellow,
    Blue,
    DarkBlue,
    Magenta,
    DarkMagenta,
    Cyan,
    DarkCyan,
    White,
    Grey,
    /// 24-bit color.
    Rgb { r: u8, g: u8, b: u8 },
    /// Index into the 256-color palette.
    AnsiValue(u8),
}

impl Color {
    /// Build an RGB color from wide integers, rejecting channels above 255.
    pub fn try_rgb(r: u32, g: u32, b: u32) -> Result<Self> {
        let channel = |name: &str, value: u32| {
            u8::try_from(value)
                .map_err(|_| Error::invalid(format!("Rgb {name} channel {value} exceeds 255")))
        };
        Ok(Self::Rgb {
            r: channel("red", r)?,
            g: channel("green", g)?,
            b: channel("blue", b)?,
        })
    }

    /// Build a palette color from a wide integer, rejecting values above 255.
    pub fn try_ansi(value: u32) -> Result<Self> {
        u8::try_from(value)
            .map(Self::AnsiValue)
            .map_err(|_| Error::invalid(format!("AnsiValue {value} exceeds 255")))
    }

    /// Palette index for named colors and `AnsiValue`; `None` for `Reset`
    /// and `Rgb`.
    #[must_use]
    pub const fn palette_index(self) -> Option<u8> {
        Some(match self {
            Self::Black => 0,
            Self::DarkRed => 1,
            Self::DarkGreen => 2,
            Self::DarkYellow => 3,
            Self::DarkBlue => 4,
            Self::DarkMagenta => 5,
            Self::DarkCyan => 6,
            Self::Grey => 7,
            Self::DarkGrey => 8,
            Self::Red => 9,
            Self::Green => 10,
            Self::Yellow => 11,
            Self::Blue => 12,
            Self::Magenta => 13,
            Self::Cyan => 14,
            Self::White => 15,
            Self::AnsiValue(index) => index,
            Self::Reset | Self::Rgb { .. } => return None,
        })
    }
}

/// Optional foreground/background pair for `SetColors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Colors {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

impl Colors {
    #[must_use]
    pub const fn new(foreground: Color, background: Color) -> Self {
        Self {
            foreground: Some(foreground),
            background: Some(background),
        }
    }
}

/// SGR attribute tokens.
///
/// Declaration order is part of the public contract; [`Attribute::ALL`]
/// lists them in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Reset,
    Bold,
    Dim,
    Italic,
    Underlined,
    DoubleUnderlined,
    Undercurled,
    Underdotted,
    Underdashed,
    SlowBlink,
    RapidBlink,
    Reverse,
    Hidden,
    CrossedOut,
    Fraktur,
    NoBold,
    NormalIntensity,
    NoItalic,
    NoUnderline,
    NoBlink,
    NoReverse,
    NoHidden,
    NotCrossedOut,
    Framed,
    Encircled,
    OverLined,
    NotFramedOrEncircled,
    NotOverLined,
}

impl Attribute {
    /// Every attribute, in declaration order.
    pub const ALL: [Self; 28] = [
        Self::Reset,
        Self::Bold,
        Self::Dim,
        Self::Italic,
        Self::Underlined,
        Self::DoubleUnderlined,
        Self::Undercurled,
        Self::Underdotted,
        Self::Underdashed,
        Self::SlowBlink,
        Self::RapidBlink,
        Self::Reverse,
        Self::Hidden,
        Self::CrossedOut,
        Self::Fraktur,
        Self::NoBold,
        Self::NormalIntensity,
        Self::NoItalic,
        Self::NoUnderline,
        Self::NoBlink,
        Self::NoReverse,
        Self::NoHidden,
        Self::NotCrossedOut,
        Self::Framed,
        Self::Encircled,
        Self::OverLined,
        Self::NotFramedOrEncircled,
        Self::NotOverLined,
    ];

    /// The SGR parameter text for this attribute.
    ///
    /// Extended underline styles use the colon sub-parameter form (`4:3`).
    #[must_use]
    pub const fn sgr(self) -> &'static str {
        match self {
            Self::Reset => "0",
            Self::Bold => "1",
            Self::Dim => "2",
            Self::Italic => "3",
            Self::Underlined => "4",
            Self::DoubleUnderlined => "4:2",
            Self::Undercurled => "4:3",
            Self::Underdotted => "4:4",
            Self::Underdashed => "4:5",
            Self::SlowBlink => "5",
            Self::RapidBlink => "6",
            Self::Reverse => "7",
            Self::Hidden => "8",
            Self::CrossedOut => "9",
            Self::Fraktur => "20",
            Self::NoBold => "21",
            Self::NormalIntensity => "22",
            Self::NoItalic => "23",
            Self::NoUnderline => "24",
            Self::NoBlink => "25",
            Self::NoReverse => "27",
            Self::NoHidden => "28",
            Self::NotCrossedOut => "29",
            Self::Framed => "51",
            Self::Encircled => "52",
            Self::OverLined => "53",
            Self::NotFramedOrEncircled => "54",
            Self::NotOverLined => "55",
        }
    }
}

/// Colors plus attributes, applied together by `SetStyle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ContentStyle {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub underline: Option<Color>,
    pub attributes: Vec<Attribute>,
}

impl ContentStyle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    #[must_use]
    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    #[must_use]
    pub fn underline(mut self, color: Color) -> Self {
        self.underline = Some(color);
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_rgb_rejects_wide_channels() {
        assert_eq!(
            Color::try_rgb(255, 128, 0).unwrap(),
            Color::Rgb { r: 255, g: 128, b: 0 }
        );
        assert!(matches!(
            Color::try_rgb(0, 256, 0),
            Err(Error::InvalidArgument(msg)) if msg.contains("green")
        ));
    }

    #[test]
    fn try_ansi_bounds() {
        assert_eq!(Color::try_ansi(255).unwrap(), Color::AnsiValue(255));
        assert!(Color::try_ansi(300).is_err());
    }

    #[test]
    fn named_palette_indices_cover_sixteen() {
        let named = [
            Color::Black,
            Color::DarkGrey,
            Color::Red,
            Color::DarkRed,
            Color::Green,
            Color::DarkGreen,
            Color::Yellow,
            Color::DarkYellow,
            Color::Blue,
            Color::DarkBlue,
            Color::Magenta,
            Color::DarkMagenta,
            Color::Cyan,
            Color::DarkCyan,
            Color::White,
            Color::Grey,
        ];
        let mut seen: Vec<u8> = named.iter().filter_map(|c| c.palette_index()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<u8>>());
        assert_eq!(Color::Reset.palette_index(), None);
        assert_eq!(Color::AnsiValue(200).palette_index(), Some(200));
    }

    #[test]
    fn attribute_table() {
        assert_eq!(Attribute::ALL.len(), 28);
        assert_eq!(Attribute::Bold.sgr(), "1");
        assert_eq!(Attribute::Undercurled.sgr(), "4:3");
        assert_eq!(Attribute::NoReverse.sgr(), "27");
        assert_eq!(Attribute::NotOverLined.sgr(), "55");
    }

    #[test]
    fn content_style_builder() {
        let style = ContentStyle::new()
            .foreground(Color::Red)
            .attribute(Attribute::Bold)
            .attribute(Attribute::Italic);
        assert_eq!(style.foreground, Some(Color::Red));
        assert_eq!(style.background, None);
        assert_eq!(style.attributes, vec![Attribute::Bold, Attribute::Italic]);
    }
}
