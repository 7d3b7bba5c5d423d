#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// `cellXfs` index of a green ("just updated") cell in the mock styles
pub const STYLE_GREEN: u32 = 1;
/// `cellXfs` index of a blue ("previous cycle") cell
pub const STYLE_BLUE: u32 = 2;
/// `cellXfs` index of an orange RGB cell
pub const STYLE_ORANGE: u32 = 3;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><color theme="1"/><name val="맑은 고딕"/><family val="2"/><charset val="129"/><scheme val="minor"/></font></fonts>
<fills count="5"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor theme="6" tint="0.7999816888943144"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor theme="3" tint="0.7999816888943144"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFC000"/><bgColor indexed="64"/></patternFill></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/><xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/><xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

#[derive(Debug, Clone)]
enum MockValue {
    Text(String),
    Number(f64),
    Formula(String, f64),
}

/// A worksheet to put in a mock package
#[derive(Debug, Clone)]
pub struct MockSheet {
    name: String,
    cells: BTreeMap<(u32, u32), (MockValue, u32)>,
}

impl MockSheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
        }
    }

    pub fn text(self, row: u32, col: u32, text: &str) -> Self {
        self.text_styled(row, col, text, 0)
    }

    pub fn text_styled(mut self, row: u32, col: u32, text: &str, style: u32) -> Self {
        self.cells
            .insert((row, col), (MockValue::Text(text.to_string()), style));
        self
    }

    pub fn number(self, row: u32, col: u32, value: f64) -> Self {
        self.number_styled(row, col, value, 0)
    }

    pub fn number_styled(mut self, row: u32, col: u32, value: f64, style: u32) -> Self {
        self.cells
            .insert((row, col), (MockValue::Number(value), style));
        self
    }

    pub fn formula(mut self, row: u32, col: u32, formula: &str, cached: f64) -> Self {
        self.cells.insert(
            (row, col),
            (MockValue::Formula(formula.to_string(), cached), 0),
        );
        self
    }

    fn to_xml(&self, shared: &mut Vec<String>) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        let mut current_row = None;
        for ((row, col), (value, style)) in &self.cells {
            if current_row != Some(*row) {
                if current_row.is_some() {
                    xml.push_str("</row>");
                }
                xml.push_str(&format!(r#"<row r="{}">"#, row));
                current_row = Some(*row);
            }
            let reference = format!("{}{}", col_letters(*col), row);
            let style_attr = if *style == 0 {
                String::new()
            } else {
                format!(r#" s="{}""#, style)
            };
            match value {
                MockValue::Text(t) => {
                    let idx = shared.iter().position(|s| s == t).unwrap_or_else(|| {
                        shared.push(t.clone());
                        shared.len() - 1
                    });
                    xml.push_str(&format!(
                        r#"<c r="{}"{} t="s"><v>{}</v></c>"#,
                        reference, style_attr, idx
                    ));
                }
                MockValue::Number(n) => xml.push_str(&format!(
                    r#"<c r="{}"{}><v>{}</v></c>"#,
                    reference, style_attr, n
                )),
                MockValue::Formula(f, cached) => xml.push_str(&format!(
                    r#"<c r="{}"{}><f>{}</f><v>{}</v></c>"#,
                    reference, style_attr, f, cached
                )),
            }
        }
        if current_row.is_some() {
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }
}

fn col_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Write a minimal xlsx package with shared strings and status-colour styles
pub fn create_mock_xlsx(path: &Path, sheets: &[MockSheet]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
"#,
    );
    for i in 0..sheets.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }
    content_types.push_str("</Types>");
    zip.write_all(content_types.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            sheet.name,
            i + 1,
            i + 1
        ));
    }
    workbook_xml.push_str("</sheets></workbook>");
    zip.write_all(workbook_xml.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 0..sheets.len() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }
    let styles_id = sheets.len() + 1;
    rels_xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        styles_id
    ));
    rels_xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        styles_id + 1
    ));
    rels_xml.push_str("</Relationships>");
    zip.write_all(rels_xml.as_bytes())?;

    let mut shared = Vec::new();
    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet.to_xml(&mut shared).as_bytes())?;
    }

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    zip.start_file("xl/sharedStrings.xml", options)?;
    let mut sst = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        shared.len()
    );
    for s in &shared {
        sst.push_str(&format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s)));
    }
    sst.push_str("</sst>");
    zip.write_all(sst.as_bytes())?;

    zip.finish()?;
    Ok(())
}

/// One record column: labels in column A, values in `col`, anchored at `anchor_row`
pub fn seoul_record(anchor_row: u32, col: u32) -> MockSheet {
    MockSheet::new("Seoul")
        .text(1, 1, "구분")
        .text(anchor_row - 1, 1, "상호")
        .text_styled(anchor_row - 1, col, "㈜한빛전기", STYLE_GREEN)
        .text(anchor_row, 1, "사업자등록번호")
        .text_styled(anchor_row, col, "123-45-67890", STYLE_BLUE)
        .text(anchor_row + 1, 1, "지역")
        .text(anchor_row + 1, col, "서울 중구")
        .text(anchor_row + 2, 1, "시평액")
        .number_styled(anchor_row + 2, col, 5100000000.0, STYLE_GREEN)
        .text(anchor_row + 3, 1, "3년실적")
        .number(anchor_row + 3, col, 1200000000.0)
        .text(anchor_row + 4, 1, "5년실적")
        .number(anchor_row + 4, col, 2500000000.0)
        .text(anchor_row + 5, 1, "부채비율")
        .number_styled(anchor_row + 5, col, 0.4512, STYLE_ORANGE)
        .text(anchor_row + 6, 1, "유동비율")
        .number(anchor_row + 6, col, 1.5)
        .text(anchor_row + 7, 1, "영업기간")
        .text(anchor_row + 7, col, "10년")
        .text(anchor_row + 8, 1, "신용평가")
        .text_styled(anchor_row + 8, col, "A~23.06.30", STYLE_GREEN)
}
