//! Fill colours and the status-colour classification
//!
//! Status colours are a derived signal: green marks a value touched in the
//! current cycle, blue one touched in the previous cycle (or an expired
//! rating). Classification always goes through [`classify_fill`] so the rest
//! of the crate never compares raw colour definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Theme slot used for the "just updated" green (accent 3 in the default theme)
pub const THEME_GREEN: u32 = 6;
/// Theme slot used for the "previous cycle" blue (light 2 in the default theme)
pub const THEME_BLUE: u32 = 3;
/// Tint applied to both status theme colours
pub const STATUS_TINT: f64 = 0.7999816888943144;

pub const GREEN_HEX: &str = "#E2EFDA";
pub const BLUE_HEX: &str = "#DDEBF7";
pub const WHITE_HEX: &str = "#FFFFFF";

/// A colour reference as stored in `styles.xml`
#[derive(Debug, Clone, PartialEq)]
pub enum ColorRef {
    Theme { index: u32, tint: Option<f64> },
    Rgb(String),
    Indexed(u32),
    Auto,
}

impl ColorRef {
    pub fn theme(index: u32, tint: f64) -> Self {
        ColorRef::Theme {
            index,
            tint: Some(tint),
        }
    }

    pub fn rgb(argb: impl Into<String>) -> Self {
        ColorRef::Rgb(argb.into())
    }

    /// Attributes for the `<fgColor>`/`<color>` element
    pub fn xml_attributes(&self) -> Vec<(&'static str, String)> {
        match self {
            ColorRef::Theme { index, tint } => {
                let mut attrs = vec![("theme", index.to_string())];
                if let Some(t) = tint {
                    attrs.push(("tint", t.to_string()));
                }
                attrs
            }
            ColorRef::Rgb(argb) => vec![("rgb", argb.clone())],
            ColorRef::Indexed(idx) => vec![("indexed", idx.to_string())],
            ColorRef::Auto => vec![("auto", "1".to_string())],
        }
    }
}

/// Pattern fill of a cell format
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fill {
    /// `patternType` attribute; `None` when absent
    pub pattern: Option<String>,
    pub fg: Option<ColorRef>,
    pub bg: Option<ColorRef>,
}

impl Fill {
    /// A fill with no pattern at all
    pub fn none() -> Self {
        Fill {
            pattern: Some("none".to_string()),
            fg: None,
            bg: None,
        }
    }

    pub fn solid(fg: ColorRef) -> Self {
        Fill {
            pattern: Some("solid".to_string()),
            fg: Some(fg),
            bg: None,
        }
    }

    /// The "just updated" green
    pub fn status_green() -> Self {
        Fill::solid(ColorRef::theme(THEME_GREEN, STATUS_TINT))
    }

    /// The "updated last cycle" / "expired" blue
    pub fn status_blue() -> Self {
        Fill::solid(ColorRef::theme(THEME_BLUE, STATUS_TINT))
    }

    /// Whether the fill paints anything
    pub fn is_painted(&self) -> bool {
        match self.pattern.as_deref() {
            None | Some("none") => false,
            Some(_) => true,
        }
    }

    /// Serialize as a `<fill>` element
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<fill>");
        match &self.pattern {
            Some(p) => xml.push_str(&format!("<patternFill patternType=\"{}\"", p)),
            None => xml.push_str("<patternFill"),
        }
        if self.fg.is_none() && self.bg.is_none() {
            xml.push_str("/></fill>");
            return xml;
        }
        xml.push('>');
        if let Some(fg) = &self.fg {
            xml.push_str(&color_element("fgColor", fg));
        }
        if let Some(bg) = &self.bg {
            xml.push_str(&color_element("bgColor", bg));
        }
        xml.push_str("</patternFill></fill>");
        xml
    }
}

pub(crate) fn color_element(tag: &str, color: &ColorRef) -> String {
    let attrs: String = color
        .xml_attributes()
        .into_iter()
        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
        .collect();
    format!("<{}{}/>", tag, attrs)
}

/// Closed classification of a cell's background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusColor {
    None,
    Green,
    Blue,
    Other(String),
}

impl StatusColor {
    /// Display hex for the operator-facing snapshot
    pub fn hex(&self) -> &str {
        match self {
            StatusColor::None => WHITE_HEX,
            StatusColor::Green => GREEN_HEX,
            StatusColor::Blue => BLUE_HEX,
            StatusColor::Other(hex) => hex,
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusColor::None => write!(f, "none"),
            StatusColor::Green => write!(f, "green"),
            StatusColor::Blue => write!(f, "blue"),
            StatusColor::Other(hex) => write!(f, "{}", hex),
        }
    }
}

/// Classify a fill into the status palette.
///
/// Theme 6 is green and theme 3 is blue regardless of tint. Direct RGB values
/// drop a leading opaque `FF` alpha; transparent black (`00000000`) counts as
/// no colour. Indexed, automatic and unpainted fills are `None`.
pub fn classify_fill(fill: Option<&Fill>) -> StatusColor {
    let Some(fill) = fill else {
        return StatusColor::None;
    };
    if !fill.is_painted() {
        return StatusColor::None;
    }
    match &fill.fg {
        Some(ColorRef::Theme { index, .. }) if *index == THEME_GREEN => StatusColor::Green,
        Some(ColorRef::Theme { index, .. }) if *index == THEME_BLUE => StatusColor::Blue,
        Some(ColorRef::Rgb(argb)) => {
            let argb = argb.to_ascii_uppercase();
            let hex = if argb.len() == 8 && argb.starts_with("FF") {
                format!("#{}", &argb[2..])
            } else {
                format!("#{}", argb)
            };
            if hex == "#00000000" {
                StatusColor::None
            } else {
                StatusColor::Other(hex)
            }
        }
        _ => StatusColor::None,
    }
}
