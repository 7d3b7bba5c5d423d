//! `xl/styles.xml` model: fonts, fills, number formats and cell formats (xfs)
//!
//! Existing entries are never rewritten. Derived formats are appended, so the
//! writer only has to splice new children into the collections and bump their
//! `count` attributes.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Cursor};
use zip::ZipArchive;

use super::parser_utils::{attr_value, owned_attributes};
use crate::color::{ColorRef, Fill, color_element};

/// Number format code written for ratio fields
pub const PERCENT_FORMAT: &str = "0.00%";

/// Built-in number formats; ids below 164 are reserved by ECMA-376
const BUILTIN_NUM_FMTS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// A font definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub size: Option<f64>,
    pub color: Option<ColorRef>,
    pub name: Option<String>,
    pub family: Option<u32>,
    pub charset: Option<u32>,
    pub scheme: Option<String>,
}

impl Font {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<font>");
        if self.bold {
            xml.push_str("<b/>");
        }
        if self.italic {
            xml.push_str("<i/>");
        }
        if let Some(sz) = self.size {
            xml.push_str(&format!("<sz val=\"{}\"/>", sz));
        }
        if let Some(color) = &self.color {
            xml.push_str(&color_element("color", color));
        }
        if let Some(name) = &self.name {
            xml.push_str(&format!("<name val=\"{}\"/>", escape(name.as_str())));
        }
        if let Some(family) = self.family {
            xml.push_str(&format!("<family val=\"{}\"/>", family));
        }
        if let Some(charset) = self.charset {
            xml.push_str(&format!("<charset val=\"{}\"/>", charset));
        }
        if let Some(scheme) = &self.scheme {
            xml.push_str(&format!("<scheme val=\"{}\"/>", escape(scheme.as_str())));
        }
        xml.push_str("</font>");
        xml
    }
}

/// Font adjustment applied on top of a cell's current font.
///
/// The face name, family and charset of the current font are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FontPatch {
    pub bold: bool,
    pub size: f64,
    /// ARGB colour, e.g. `FFFF0000`
    pub color: String,
}

impl FontPatch {
    /// Black, regular, 9pt
    pub fn regular() -> Self {
        Self {
            bold: false,
            size: 9.0,
            color: "FF000000".to_string(),
        }
    }

    /// Red, bold, 9pt
    pub fn highlight() -> Self {
        Self {
            bold: true,
            size: 9.0,
            color: "FFFF0000".to_string(),
        }
    }

    fn apply(&self, base: &Font) -> Font {
        Font {
            bold: self.bold,
            italic: false,
            size: Some(self.size),
            color: Some(ColorRef::Rgb(self.color.clone())),
            name: base.name.clone(),
            family: base.family,
            charset: base.charset,
            scheme: base.scheme.clone(),
        }
    }
}

/// A requested change to a cell format
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleChange {
    pub fill: Option<Fill>,
    pub font: Option<FontPatch>,
    pub number_format: Option<String>,
}

impl StyleChange {
    pub fn fill(fill: Fill) -> Self {
        Self {
            fill: Some(fill),
            ..Default::default()
        }
    }

    pub fn font(font: FontPatch) -> Self {
        Self {
            font: Some(font),
            ..Default::default()
        }
    }

    pub fn number_format(code: impl Into<String>) -> Self {
        Self {
            number_format: Some(code.into()),
            ..Default::default()
        }
    }
}

/// A `<xf>` entry of `cellXfs`: its attributes plus the raw child markup
/// (alignment, protection) which is carried over verbatim
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellXf {
    pub attrs: Vec<(String, String)>,
    pub inner: String,
}

impl CellXf {
    pub fn get(&self, key: &str) -> Option<u32> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.parse().ok())
    }

    pub fn set(&mut self, key: &str, value: u32) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn to_xml(&self) -> String {
        let attrs: String = self
            .attrs
            .iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, escape(v.as_str())))
            .collect();
        if self.inner.is_empty() {
            format!("<xf{}/>", attrs)
        } else {
            format!("<xf{}>{}</xf>", attrs, self.inner)
        }
    }
}

/// Parsed style sheet plus the entries appended since it was read
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// Whether the package has a `xl/styles.xml` part at all
    pub present: bool,
    pub custom_num_fmts: BTreeMap<u32, String>,
    pub fonts: Vec<Font>,
    pub fills: Vec<Fill>,
    pub cell_xfs: Vec<CellXf>,
    original_fonts: usize,
    original_fills: usize,
    original_xfs: usize,
    appended_num_fmts: Vec<u32>,
    derived: HashMap<(u32, String), u32>,
}

impl StyleSheet {
    /// Parse `xl/styles.xml`; a package without one yields an empty sheet
    pub fn parse(archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>) -> Result<Self> {
        let styles_xml = match archive.by_name("xl/styles.xml") {
            Ok(file) => file,
            Err(_) => return Ok(StyleSheet::default()),
        };

        let mut reader = Reader::from_reader(BufReader::new(styles_xml));
        reader.config_mut().trim_text(true);

        let mut sheet = StyleSheet {
            present: true,
            ..Default::default()
        };
        let mut buf = Vec::new();
        let mut in_fonts = false;
        let mut in_fills = false;
        let mut in_cell_xfs = false;
        let mut current_font: Option<Font> = None;
        let mut current_fill: Option<Fill> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .context("Failed to parse xl/styles.xml")?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"numFmt" => {
                            let id = attr_value(e, b"numFmtId")?.and_then(|v| v.parse().ok());
                            let code = attr_value(e, b"formatCode")?;
                            if let (Some(id), Some(code)) = (id, code) {
                                sheet.custom_num_fmts.insert(id, code);
                            }
                        }
                        b"fonts" => in_fonts = !is_empty,
                        b"fills" => in_fills = !is_empty,
                        b"cellXfs" => in_cell_xfs = !is_empty,
                        b"font" if in_fonts => {
                            if is_empty {
                                sheet.fonts.push(Font::default());
                            } else {
                                current_font = Some(Font::default());
                            }
                        }
                        b"fill" if in_fills => {
                            if is_empty {
                                sheet.fills.push(Fill::default());
                            } else {
                                current_fill = Some(Fill::default());
                            }
                        }
                        b"xf" if in_cell_xfs => {
                            let attrs = owned_attributes(e)?;
                            let inner = if is_empty {
                                String::new()
                            } else {
                                capture_inner(&mut reader, b"xf")?
                            };
                            sheet.cell_xfs.push(CellXf { attrs, inner });
                        }
                        tag => {
                            if let Some(font) = current_font.as_mut() {
                                apply_font_child(font, tag, e)?;
                            } else if let Some(fill) = current_fill.as_mut() {
                                apply_fill_child(fill, tag, e)?;
                            }
                        }
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"font" => {
                        if let Some(font) = current_font.take() {
                            sheet.fonts.push(font);
                        }
                    }
                    b"fill" => {
                        if let Some(fill) = current_fill.take() {
                            sheet.fills.push(fill);
                        }
                    }
                    b"fonts" => in_fonts = false,
                    b"fills" => in_fills = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        sheet.original_fonts = sheet.fonts.len();
        sheet.original_fills = sheet.fills.len();
        sheet.original_xfs = sheet.cell_xfs.len();
        Ok(sheet)
    }

    fn xf(&self, index: u32) -> Option<&CellXf> {
        self.cell_xfs.get(index as usize)
    }

    /// Fill of a cell format
    pub fn fill_of(&self, xf: u32) -> Option<&Fill> {
        let fill_id = self.xf(xf)?.get("fillId")?;
        self.fills.get(fill_id as usize)
    }

    /// Font of a cell format
    pub fn font_of(&self, xf: u32) -> Option<&Font> {
        let font_id = self.xf(xf)?.get("fontId")?;
        self.fonts.get(font_id as usize)
    }

    /// Number format code of a cell format
    pub fn number_format_of(&self, xf: u32) -> String {
        let id = self.xf(xf).and_then(|x| x.get("numFmtId")).unwrap_or(0);
        self.format_code(id)
            .unwrap_or_else(|| "General".to_string())
    }

    fn format_code(&self, id: u32) -> Option<String> {
        if let Some(code) = self.custom_num_fmts.get(&id) {
            return Some(code.clone());
        }
        BUILTIN_NUM_FMTS
            .iter()
            .find(|(builtin, _)| *builtin == id)
            .map(|(_, code)| code.to_string())
    }

    /// Whether formats were appended since parsing
    pub fn is_modified(&self) -> bool {
        self.fonts.len() != self.original_fonts
            || self.fills.len() != self.original_fills
            || self.cell_xfs.len() != self.original_xfs
            || !self.appended_num_fmts.is_empty()
    }

    pub fn appended_fonts(&self) -> &[Font] {
        &self.fonts[self.original_fonts..]
    }

    pub fn appended_fills(&self) -> &[Fill] {
        &self.fills[self.original_fills..]
    }

    pub fn appended_xfs(&self) -> &[CellXf] {
        &self.cell_xfs[self.original_xfs..]
    }

    /// Custom number formats added since parsing, as (id, code)
    pub fn appended_num_fmts(&self) -> Vec<(u32, &str)> {
        self.appended_num_fmts
            .iter()
            .filter_map(|id| self.custom_num_fmts.get(id).map(|c| (*id, c.as_str())))
            .collect()
    }

    /// Return the index of a cell format equal to `base` with `change` applied,
    /// appending fonts, fills, number formats and the xf itself as needed
    pub fn derive(&mut self, base: u32, change: &StyleChange) -> u32 {
        self.ensure_defaults();
        let key = (base, format!("{:?}", change));
        if let Some(&idx) = self.derived.get(&key) {
            return idx;
        }

        let mut xf = self.xf(base).cloned().unwrap_or_else(default_xf);

        if let Some(fill) = &change.fill {
            let fill_id = self.intern_fill(fill);
            xf.set("fillId", fill_id);
            xf.set("applyFill", 1);
        }
        if let Some(patch) = &change.font {
            let base_font = xf
                .get("fontId")
                .and_then(|id| self.fonts.get(id as usize))
                .cloned()
                .unwrap_or_default();
            let font_id = self.intern_font(patch.apply(&base_font));
            xf.set("fontId", font_id);
            xf.set("applyFont", 1);
        }
        if let Some(code) = &change.number_format {
            let fmt_id = self.intern_num_fmt(code);
            xf.set("numFmtId", fmt_id);
            xf.set("applyNumberFormat", 1);
        }

        let idx = match self.cell_xfs.iter().position(|existing| *existing == xf) {
            Some(pos) => pos as u32,
            None => {
                self.cell_xfs.push(xf);
                (self.cell_xfs.len() - 1) as u32
            }
        };
        self.derived.insert(key, idx);
        idx
    }

    /// Slot 0 of fonts, fills and cellXfs must stay the workbook default
    fn ensure_defaults(&mut self) {
        if self.fonts.is_empty() {
            self.fonts.push(Font::default());
        }
        if self.fills.is_empty() {
            self.fills.push(Fill::none());
            self.fills.push(Fill {
                pattern: Some("gray125".to_string()),
                fg: None,
                bg: None,
            });
        }
        if self.cell_xfs.is_empty() {
            self.cell_xfs.push(default_xf());
        }
    }

    fn intern_fill(&mut self, fill: &Fill) -> u32 {
        if let Some(pos) = self.fills.iter().position(|f| f == fill) {
            return pos as u32;
        }
        self.fills.push(fill.clone());
        (self.fills.len() - 1) as u32
    }

    fn intern_font(&mut self, font: Font) -> u32 {
        if let Some(pos) = self.fonts.iter().position(|f| *f == font) {
            return pos as u32;
        }
        self.fonts.push(font);
        (self.fonts.len() - 1) as u32
    }

    fn intern_num_fmt(&mut self, code: &str) -> u32 {
        if let Some((id, _)) = self.custom_num_fmts.iter().find(|(_, c)| c.as_str() == code) {
            return *id;
        }
        if let Some((id, _)) = BUILTIN_NUM_FMTS.iter().find(|(_, c)| *c == code) {
            return *id;
        }
        let id = self
            .custom_num_fmts
            .keys()
            .next_back()
            .map(|max| (*max + 1).max(FIRST_CUSTOM_NUM_FMT))
            .unwrap_or(FIRST_CUSTOM_NUM_FMT);
        self.custom_num_fmts.insert(id, code.to_string());
        self.appended_num_fmts.push(id);
        id
    }
}

fn default_xf() -> CellXf {
    CellXf {
        attrs: vec![
            ("numFmtId".to_string(), "0".to_string()),
            ("fontId".to_string(), "0".to_string()),
            ("fillId".to_string(), "0".to_string()),
            ("borderId".to_string(), "0".to_string()),
            ("xfId".to_string(), "0".to_string()),
        ],
        inner: String::new(),
    }
}

/// Re-serialize everything up to the matching end tag
fn capture_inner<R: std::io::BufRead>(reader: &mut Reader<R>, tag: &[u8]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if e.name().as_ref() == tag {
                    depth += 1;
                }
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                if e.name().as_ref() == tag {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn parse_color(e: &BytesStart) -> Result<Option<ColorRef>> {
    let mut theme = None;
    let mut tint = None;
    let mut rgb = None;
    let mut indexed = None;
    let mut auto = false;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"theme" => theme = value.parse::<u32>().ok(),
            b"tint" => tint = value.parse::<f64>().ok(),
            b"rgb" => rgb = Some(value.to_string()),
            b"indexed" => indexed = value.parse::<u32>().ok(),
            b"auto" => auto = value == "1" || value == "true",
            _ => {}
        }
    }
    Ok(if let Some(index) = theme {
        Some(ColorRef::Theme { index, tint })
    } else if let Some(rgb) = rgb {
        Some(ColorRef::Rgb(rgb))
    } else if let Some(idx) = indexed {
        Some(ColorRef::Indexed(idx))
    } else if auto {
        Some(ColorRef::Auto)
    } else {
        None
    })
}

fn flag_value(e: &BytesStart) -> Result<bool> {
    Ok(match attr_value(e, b"val")? {
        Some(v) => v != "0" && v != "false",
        None => true,
    })
}

fn apply_font_child(font: &mut Font, tag: &[u8], e: &BytesStart) -> Result<()> {
    match tag {
        b"b" => font.bold = flag_value(e)?,
        b"i" => font.italic = flag_value(e)?,
        b"sz" => font.size = attr_value(e, b"val")?.and_then(|v| v.parse().ok()),
        b"color" => font.color = parse_color(e)?,
        b"name" | b"rFont" => font.name = attr_value(e, b"val")?,
        b"family" => font.family = attr_value(e, b"val")?.and_then(|v| v.parse().ok()),
        b"charset" => font.charset = attr_value(e, b"val")?.and_then(|v| v.parse().ok()),
        b"scheme" => font.scheme = attr_value(e, b"val")?,
        _ => {}
    }
    Ok(())
}

fn apply_fill_child(fill: &mut Fill, tag: &[u8], e: &BytesStart) -> Result<()> {
    match tag {
        b"patternFill" => fill.pattern = attr_value(e, b"patternType")?,
        b"fgColor" => fill.fg = parse_color(e)?,
        b"bgColor" => fill.bg = parse_color(e)?,
        _ => {}
    }
    Ok(())
}
