//! Reading a record's fields and colours

use std::path::Path;

use super::{FieldRecord, FieldValue};
use crate::error::{BizsheetError, Result};
use crate::locator::{Anchor, locate};
use crate::reader::{Workbook, read_workbook};
use crate::schema::Schema;

/// Read every located field of the record at `anchor`
pub fn read_record(workbook: &Workbook, schema: &Schema, anchor: &Anchor) -> FieldRecord {
    let sheet = workbook.get_sheet(&anchor.sheet);
    let fields = schema
        .located_fields()
        .map(|(spec, offset)| {
            let value = match (sheet, anchor.row_at(offset)) {
                (Some(sheet), Some(row)) if sheet.in_bounds(row.into(), anchor.col.into()) => {
                    FieldValue {
                        value: Some(
                            sheet
                                .get_cell(row, anchor.col)
                                .map(|c| c.value.clone())
                                .unwrap_or_default(),
                        ),
                        color: workbook.color_at(&anchor.sheet, row, anchor.col),
                    }
                }
                _ => {
                    tracing::debug!(field = %spec.key, offset, "field outside sheet");
                    FieldValue::not_available()
                }
            };
            (spec.key.clone(), value)
        })
        .collect();

    FieldRecord {
        anchor: anchor.clone(),
        fields,
    }
}

/// Open a workbook and read the record for `identifier`, if present
pub fn lookup<P: AsRef<Path>>(
    path: P,
    schema: &Schema,
    identifier: &str,
) -> Result<Option<FieldRecord>> {
    let path = path.as_ref();
    let workbook = read_workbook(path).map_err(|e| BizsheetError::open(path, e))?;
    let record =
        locate(&workbook, identifier).map(|anchor| read_record(&workbook, schema, &anchor));
    tracing::info!(
        path = %path.display(),
        identifier,
        found = record.is_some(),
        "lookup finished"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::StatusColor;
    use crate::reader::{Cell, CellValue, Sheet};
    use crate::schema::{FieldKind, FieldSpec};

    fn schema() -> Schema {
        Schema {
            rating_field: None,
            name_field: None,
            region_field: None,
            fields: vec![
                FieldSpec::new("name", "상호", -1, FieldKind::Plain),
                FieldSpec::new("id", "사업자번호", 0, FieldKind::Plain),
                FieldSpec::new("rate", "비율", 2, FieldKind::Ratio),
                FieldSpec::new("far", "먼곳", 20, FieldKind::Plain),
            ],
            ..Schema::default()
        }
    }

    #[test]
    fn test_out_of_bounds_fields_are_not_available() {
        let mut sheet = Sheet::new("Seoul", "xl/worksheets/sheet1.xml");
        for (row, value) in [
            (9, CellValue::Text("Acme".into())),
            (10, CellValue::Text("123-45-67890".into())),
            (12, CellValue::Number(0.125)),
        ] {
            sheet.insert(Cell {
                row,
                col: 3,
                value,
                style: 0,
            });
        }
        let workbook = Workbook {
            sheets: vec![sheet],
            ..Default::default()
        };
        let anchor = locate(&workbook, "1234567890").unwrap();
        let record = read_record(&workbook, &schema(), &anchor);

        assert_eq!(record.text_of("name").as_deref(), Some("Acme"));
        assert_eq!(
            record.get("rate").unwrap().value,
            Some(CellValue::Number(0.125))
        );
        let far = record.get("far").unwrap();
        assert!(!far.is_available());
        assert_eq!(far.color, StatusColor::None);
        assert_eq!(far.color.hex(), "#FFFFFF");
    }
}
