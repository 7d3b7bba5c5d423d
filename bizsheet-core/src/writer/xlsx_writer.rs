//! XLSX writer: streams the original package through, patching edited
//! worksheets and appending new formats to `xl/styles.xml`

use anyhow::{Context, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::reader::parser_utils::{attr_value, cell_ref, owned_attributes, parse_cell_ref};
use crate::reader::workbook::format_number;
use crate::reader::{CellEdit, CellValue, Sheet, StyleSheet, Workbook};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize the workbook into a complete package
pub fn render_package(workbook: &Workbook) -> Result<Vec<u8>> {
    if workbook.styles.is_modified() && !workbook.styles.present {
        return Err(anyhow::anyhow!(
            "Workbook has no xl/styles.xml to extend: {}",
            workbook.path.display()
        ));
    }

    let mut archive = ZipArchive::new(Cursor::new(workbook.package.as_slice()))
        .context("Failed to open zip archive")?;
    let edited: HashMap<&str, &Sheet> = workbook
        .sheets
        .iter()
        .filter(|s| !s.edits().is_empty())
        .map(|s| (s.sheet_path.as_str(), s))
        .collect();

    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        let patched = if let Some(sheet) = edited.get(name.as_str()) {
            Some(patch_sheet_xml(&read_entry(&mut file)?, sheet)?)
        } else if name == "xl/styles.xml" && workbook.styles.is_modified() {
            Some(patch_styles_xml(&read_entry(&mut file)?, &workbook.styles)?)
        } else {
            None
        };

        match patched {
            Some(content) => {
                let options = SimpleFileOptions::default().compression_method(file.compression());
                zip_writer.start_file(name.as_str(), options)?;
                zip_writer.write_all(content.as_bytes())?;
            }
            None => zip_writer.raw_copy_file(file)?,
        }
    }

    Ok(zip_writer.finish()?.into_inner())
}

/// Save the workbook over the file it was read from
pub fn save_workbook(workbook: &Workbook) -> Result<()> {
    save_workbook_as(workbook, &workbook.path)
}

/// Save the workbook to `path`, replacing it atomically.
///
/// The package is written to a temporary file next to the target and then
/// renamed over it, so a failure leaves the previous file intact.
pub fn save_workbook_as(workbook: &Workbook, path: &Path) -> Result<()> {
    let bytes = render_package(workbook)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "workbook saved");
    Ok(())
}

fn read_entry(file: &mut impl Read) -> Result<String> {
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Pending cell edits of one sheet, consumed in document order
struct SheetPatch<'a> {
    sheet: &'a Sheet,
    remaining: BTreeMap<(u32, u32), CellEdit>,
}

impl<'a> SheetPatch<'a> {
    fn new(sheet: &'a Sheet) -> Self {
        Self {
            sheet,
            remaining: sheet.edits().clone(),
        }
    }

    fn has_row(&self, row: u32) -> bool {
        self.remaining
            .range((row, 0)..=(row, u32::MAX))
            .next()
            .is_some()
    }

    fn take(&mut self, row: u32, col: u32) -> Option<CellEdit> {
        self.remaining.remove(&(row, col))
    }

    /// Emit whole rows for edits above `row`
    fn flush_rows_before(&mut self, row: u32, writer: &mut XmlWriter) -> Result<()> {
        while let Some((&(next_row, _), _)) = self.remaining.iter().next() {
            if next_row >= row {
                break;
            }
            write_raw(writer, &format!("<row r=\"{}\">", next_row))?;
            self.flush_row(next_row, writer)?;
            write_raw(writer, "</row>")?;
        }
        Ok(())
    }

    /// Emit new cells of `row` left of `col`
    fn flush_cells_before(&mut self, row: u32, col: u32, writer: &mut XmlWriter) -> Result<()> {
        let keys: Vec<(u32, u32)> = self
            .remaining
            .range((row, 0)..(row, col))
            .map(|(k, _)| *k)
            .collect();
        for (r, c) in keys {
            self.remaining.remove(&(r, c));
            self.write_cell(r, c, writer)?;
        }
        Ok(())
    }

    fn flush_row(&mut self, row: u32, writer: &mut XmlWriter) -> Result<()> {
        self.flush_cells_before(row, u32::MAX, writer)
    }

    fn flush_all(&mut self, writer: &mut XmlWriter) -> Result<()> {
        self.flush_rows_before(u32::MAX, writer)
    }

    fn write_cell(&self, row: u32, col: u32, writer: &mut XmlWriter) -> Result<()> {
        let (value, style) = match self.sheet.get_cell(row, col) {
            Some(cell) => (&cell.value, cell.style),
            None => (&CellValue::Empty, 0),
        };
        write_raw(writer, &cell_xml(row, col, value, style))
    }

    /// Start tag of an existing row; `spans` is dropped once new cells go in
    fn row_start(&self, e: &BytesStart, row: u32) -> Result<BytesStart<'static>> {
        if self.has_row(row) {
            rebuild_start(e, "spans", None)
        } else {
            Ok(e.clone().into_owned())
        }
    }

    fn restyled(&self, e: &BytesStart, row: u32, col: u32) -> Result<BytesStart<'static>> {
        let style = self.sheet.get_cell(row, col).map(|c| c.style).unwrap_or(0);
        let value = (style != 0).then(|| style.to_string());
        rebuild_start(e, "s", value)
    }

    /// Used range after the edits, e.g. `A1:J40`
    fn dimension(&self) -> Option<String> {
        let (&(first_row, _), _) = self.sheet.cells.iter().next()?;
        let first_col = self.sheet.cells.keys().map(|(_, c)| *c).min()?;
        Some(format!(
            "{}:{}",
            cell_ref(first_row, first_col),
            cell_ref(self.sheet.max_row(), self.sheet.max_column())
        ))
    }
}

/// Copy a start tag with one attribute replaced, added or (`None`) removed
fn rebuild_start(e: &BytesStart, key: &str, value: Option<String>) -> Result<BytesStart<'static>> {
    let name = String::from_utf8(e.name().as_ref().to_vec())?;
    let mut elem = BytesStart::new(name);
    let mut replaced = false;
    for (k, v) in owned_attributes(e)? {
        if k == key {
            replaced = true;
            if let Some(value) = &value {
                elem.push_attribute((k.as_str(), value.as_str()));
            }
        } else {
            elem.push_attribute((k.as_str(), v.as_str()));
        }
    }
    if !replaced && let Some(value) = &value {
        elem.push_attribute((key, value.as_str()));
    }
    Ok(elem)
}

fn write_raw(writer: &mut XmlWriter, xml: &str) -> Result<()> {
    writer.get_mut().write_all(xml.as_bytes())?;
    Ok(())
}

/// Markup for a cell written from the model
fn cell_xml(row: u32, col: u32, value: &CellValue, style: u32) -> String {
    let mut open = format!("<c r=\"{}\"", cell_ref(row, col));
    if style != 0 {
        open.push_str(&format!(" s=\"{}\"", style));
    }
    match value {
        CellValue::Empty => format!("{}/>", open),
        CellValue::Number(n) => format!("{}><v>{}</v></c>", open, format_number(*n)),
        CellValue::Text(t) => format!(
            "{} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            open,
            escape(t.as_str())
        ),
        CellValue::Boolean(b) => format!("{} t=\"b\"><v>{}</v></c>", open, u8::from(*b)),
        CellValue::Formula { formula, .. } => {
            format!("{}><f>{}</f></c>", open, escape(formula.as_str()))
        }
    }
}

fn row_number(e: &BytesStart, previous: u32) -> Result<u32> {
    Ok(match attr_value(e, b"r")? {
        Some(r) => r.parse::<u32>()?,
        None => previous + 1,
    })
}

fn cell_position(e: &BytesStart, row: u32, next_col: u32) -> Result<(u32, u32)> {
    Ok(attr_value(e, b"r")?
        .as_deref()
        .and_then(parse_cell_ref)
        .unwrap_or((row, next_col)))
}

/// Rewrite a worksheet so edited cells reflect the model.
///
/// Cells whose value changed are written fresh; cells with only a new format
/// keep their children (formulas, shared-string indices) and get a new `s`
/// attribute. Missing cells and rows are inserted in order.
pub fn patch_sheet_xml(xml: &str, sheet: &Sheet) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut patch = SheetPatch::new(sheet);
    let mut current_row = 0u32;
    let mut next_col = 1u32;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"row" => {
                current_row = row_number(&e, current_row)?;
                next_col = 1;
                patch.flush_rows_before(current_row, &mut writer)?;
                writer.write_event(Event::Start(patch.row_start(&e, current_row)?))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"row" => {
                current_row = row_number(&e, current_row)?;
                next_col = 1;
                patch.flush_rows_before(current_row, &mut writer)?;
                if patch.has_row(current_row) {
                    writer.write_event(Event::Start(patch.row_start(&e, current_row)?))?;
                    patch.flush_row(current_row, &mut writer)?;
                    writer.write_event(Event::End(BytesEnd::new("row")))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"row" => {
                patch.flush_row(current_row, &mut writer)?;
                writer.write_event(Event::End(e))?;
            }
            Event::Start(e) if e.name().as_ref() == b"c" => {
                let (row, col) = cell_position(&e, current_row, next_col)?;
                next_col = col + 1;
                patch.flush_cells_before(row, col, &mut writer)?;
                match patch.take(row, col) {
                    Some(edit) if edit.value => {
                        reader.read_to_end(e.name())?;
                        patch.write_cell(row, col, &mut writer)?;
                    }
                    Some(_) => {
                        writer.write_event(Event::Start(patch.restyled(&e, row, col)?))?;
                    }
                    None => writer.write_event(Event::Start(e))?,
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                let (row, col) = cell_position(&e, current_row, next_col)?;
                next_col = col + 1;
                patch.flush_cells_before(row, col, &mut writer)?;
                match patch.take(row, col) {
                    Some(edit) if edit.value => patch.write_cell(row, col, &mut writer)?,
                    Some(_) => {
                        writer.write_event(Event::Empty(patch.restyled(&e, row, col)?))?;
                    }
                    None => writer.write_event(Event::Empty(e))?,
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"sheetData" => {
                if patch.remaining.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    writer.write_event(Event::Start(e.clone()))?;
                    patch.flush_all(&mut writer)?;
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"sheetData" => {
                patch.flush_all(&mut writer)?;
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"dimension" => match patch.dimension() {
                Some(range) => {
                    writer.write_event(Event::Empty(rebuild_start(&e, "ref", Some(range))?))?
                }
                None => writer.write_event(Event::Empty(e))?,
            },
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Which style collection an element opens, with its appended children
fn appended_children(tag: &[u8], styles: &StyleSheet) -> Option<(usize, String)> {
    match tag {
        b"numFmts" => Some((styles.custom_num_fmts.len(), num_fmts_xml(styles))),
        b"fonts" => Some((
            styles.fonts.len(),
            styles.appended_fonts().iter().map(|f| f.to_xml()).collect(),
        )),
        b"fills" => Some((
            styles.fills.len(),
            styles.appended_fills().iter().map(|f| f.to_xml()).collect(),
        )),
        b"cellXfs" => Some((
            styles.cell_xfs.len(),
            styles.appended_xfs().iter().map(|x| x.to_xml()).collect(),
        )),
        _ => None,
    }
}

fn num_fmts_xml(styles: &StyleSheet) -> String {
    styles
        .appended_num_fmts()
        .into_iter()
        .map(|(id, code)| {
            format!(
                "<numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                id,
                escape(code)
            )
        })
        .collect()
}

/// Splice appended fonts, fills, number formats and xfs into `styles.xml`
pub fn patch_styles_xml(xml: &str, styles: &StyleSheet) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut seen_num_fmts = false;
    let has_new_num_fmts = !styles.appended_num_fmts().is_empty();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = e.name().as_ref().to_vec();
                if tag == b"numFmts" {
                    seen_num_fmts = true;
                }
                if tag == b"fonts" && !seen_num_fmts && has_new_num_fmts {
                    write_new_num_fmts(&mut writer, styles)?;
                    seen_num_fmts = true;
                }
                match appended_children(&tag, styles) {
                    Some((count, _)) => {
                        let counted = rebuild_start(&e, "count", Some(count.to_string()))?;
                        writer.write_event(Event::Start(counted))?;
                    }
                    None => writer.write_event(Event::Start(e))?,
                }
            }
            Event::Empty(e) => {
                let tag = e.name().as_ref().to_vec();
                if tag == b"numFmts" {
                    seen_num_fmts = true;
                }
                if tag == b"fonts" && !seen_num_fmts && has_new_num_fmts {
                    write_new_num_fmts(&mut writer, styles)?;
                    seen_num_fmts = true;
                }
                match appended_children(&tag, styles) {
                    Some((count, children)) if !children.is_empty() => {
                        let counted = rebuild_start(&e, "count", Some(count.to_string()))?;
                        let end = BytesEnd::new(String::from_utf8(tag)?);
                        writer.write_event(Event::Start(counted))?;
                        write_raw(&mut writer, &children)?;
                        writer.write_event(Event::End(end))?;
                    }
                    _ => writer.write_event(Event::Empty(e))?,
                }
            }
            Event::End(e) => {
                if let Some((_, children)) = appended_children(e.name().as_ref(), styles) {
                    write_raw(&mut writer, &children)?;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn write_new_num_fmts(writer: &mut XmlWriter, styles: &StyleSheet) -> Result<()> {
    write_raw(
        writer,
        &format!(
            "<numFmts count=\"{}\">{}</numFmts>",
            styles.custom_num_fmts.len(),
            num_fmts_xml(styles)
        ),
    )
}
