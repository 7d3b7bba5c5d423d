//! XML parsing for the parts of an XLSX package the record engine reads:
//! sheet list, shared strings and worksheet cells

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufReader;
use zip::ZipArchive;

use super::parser_utils::{attr_value, parse_cell_ref, read_text_node};
use super::{Cell, CellValue, Sheet, WorkbookReader};

/// Sheet names paired with their relationship ids, in workbook order
fn read_sheet_entries(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<(String, String)>> {
    let workbook_xml = archive
        .by_name("xl/workbook.xml")
        .context("Failed to find xl/workbook.xml")?;
    let mut reader = Reader::from_reader(BufReader::new(workbook_xml));
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.name().as_ref() == b"sheet" {
                    let mut name = String::new();
                    let mut r_id = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = attr.unescape_value()?.to_string(),
                            b"r:id" => r_id = attr.unescape_value()?.to_string(),
                            _ => {}
                        }
                    }
                    entries.push((name, r_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

/// Relationship id to part path from `xl/_rels/workbook.xml.rels`
fn read_workbook_rels(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<HashMap<String, String>> {
    let rels_xml = archive
        .by_name("xl/_rels/workbook.xml.rels")
        .context("Failed to find xl/_rels/workbook.xml.rels")?;
    let mut reader = Reader::from_reader(BufReader::new(rels_xml));
    reader.config_mut().trim_text(true);

    let mut rels = HashMap::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.name().as_ref() == b"Relationship" {
                    let id = attr_value(&e, b"Id")?.unwrap_or_default();
                    let target = attr_value(&e, b"Target")?.unwrap_or_default();
                    rels.insert(id, resolve_part_path(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Targets are relative to `xl/` unless they start at the package root
fn resolve_part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

pub struct XlsxReader<'a, R: std::io::Read + std::io::Seek> {
    archive: &'a mut ZipArchive<R>,
    shared_strings: Vec<String>,
}

impl<'a, R: std::io::Read + std::io::Seek> XlsxReader<'a, R> {
    pub fn new(archive: &'a mut ZipArchive<R>) -> Result<Self> {
        let shared_strings = extract_shared_strings(archive)?;
        Ok(Self {
            archive,
            shared_strings,
        })
    }
}

impl<'a, R: std::io::Read + std::io::Seek> WorkbookReader for XlsxReader<'a, R> {
    fn read_sheets(&mut self) -> Result<Vec<Sheet>> {
        let entries = read_sheet_entries(self.archive)?;
        let rels = read_workbook_rels(self.archive)?;

        let mut sheets = Vec::with_capacity(entries.len());
        for (name, rid) in entries {
            let path = rels.get(&rid).cloned().ok_or_else(|| {
                anyhow::anyhow!("Relationship '{}' not found for sheet '{}'", rid, name)
            })?;
            let mut sheet = Sheet::new(name, path.clone());
            for cell in self.parse_sheet_xml(&path)? {
                sheet.insert(cell);
            }
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

impl<'a, R: std::io::Read + std::io::Seek> XlsxReader<'a, R> {
    fn parse_sheet_xml(&mut self, path: &str) -> Result<Vec<Cell>> {
        let sheet_xml = self
            .archive
            .by_name(path)
            .with_context(|| format!("Failed to find {}", path))?;
        let mut reader = Reader::from_reader(BufReader::new(sheet_xml));
        reader.config_mut().trim_text(true);

        let mut cells = Vec::new();
        let mut buf = Vec::new();
        let mut current_row = 0u32;
        let mut next_col = 1u32;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .with_context(|| format!("Failed to parse {}", path))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"row" => {
                            current_row = match attr_value(e, b"r")? {
                                Some(r) => r.parse::<u32>()?,
                                None => current_row + 1,
                            };
                            next_col = 1;
                        }
                        b"c" => {
                            let r_attr = attr_value(e, b"r")?;
                            let style = match attr_value(e, b"s")? {
                                Some(s) => s.parse::<u32>()?,
                                None => 0,
                            };
                            let t_attr = attr_value(e, b"t")?.unwrap_or_default();

                            let (row, col) = r_attr
                                .as_deref()
                                .and_then(parse_cell_ref)
                                .unwrap_or((current_row, next_col));
                            next_col = col + 1;

                            let value = if is_empty {
                                CellValue::Empty
                            } else {
                                parse_cell_contents(&mut reader, &t_attr, &self.shared_strings)?
                            };
                            cells.push(Cell {
                                row,
                                col,
                                value,
                                style,
                            });
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) if e.name().as_ref() == b"sheetData" => break,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(cells)
    }
}

fn parse_cell_contents<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    t_attr: &str,
    shared_strings: &[String],
) -> Result<CellValue> {
    let mut value = CellValue::Empty;
    let mut formula: Option<String> = None;
    let mut error = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) => match e.name().as_ref() {
                b"v" => {
                    let v_text = read_text_node(reader)?;
                    value = match t_attr {
                        "s" => {
                            let idx = v_text.parse::<usize>().unwrap_or(0);
                            CellValue::Text(shared_strings.get(idx).cloned().unwrap_or_default())
                        }
                        "b" => CellValue::Boolean(v_text == "1"),
                        "str" | "inlineStr" => CellValue::Text(v_text),
                        "e" => {
                            error = Some(v_text);
                            CellValue::Empty
                        }
                        _ => match v_text.parse::<f64>() {
                            Ok(n) => CellValue::Number(n),
                            Err(_) => CellValue::Text(v_text),
                        },
                    };
                }
                b"f" => {
                    let f_text = read_text_node(reader)?;
                    if !f_text.is_empty() {
                        formula = Some(f_text);
                    }
                }
                b"is" => value = CellValue::Text(read_rich_text(reader, b"is")?),
                _ => {}
            },
            Event::End(ref e) if e.name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Shared-formula children carry no text and keep their cached value
    Ok(match formula {
        Some(f) => {
            let f = f.strip_prefix('=').map(str::to_string).unwrap_or(f);
            match error {
                Some(err) => CellValue::formula_with_error(f, err),
                None => CellValue::formula(f),
            }
        }
        None => value,
    })
}

/// Concatenate the `<t>` runs under `end_tag`, skipping phonetic `<rPh>` runs
fn read_rich_text<R: std::io::BufRead>(reader: &mut Reader<R>, end_tag: &[u8]) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"rPh" => in_phonetic = true,
                b"t" => {
                    let run = read_text_node(reader)?;
                    if !in_phonetic {
                        text.push_str(&run);
                    }
                }
                _ => {}
            },
            Event::End(ref e) => {
                let name = e.name();
                if name.as_ref() == b"rPh" {
                    in_phonetic = false;
                } else if name.as_ref() == end_tag {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

pub fn extract_shared_strings(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let ss_xml = match archive.by_name("xl/sharedStrings.xml") {
        Ok(file) => file,
        Err(_) => return Ok(strings),
    };

    let mut reader = Reader::from_reader(BufReader::new(ss_xml));
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Failed to parse xl/sharedStrings.xml")?
        {
            Event::Start(e) if e.name().as_ref() == b"si" => {
                strings.push(read_rich_text(&mut reader, b"si")?);
            }
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}
