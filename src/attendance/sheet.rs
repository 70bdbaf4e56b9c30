//! Minimal XLSX reader: resolves one worksheet and returns its cells as a
//! dense row/column grid. Styles, formulas and everything else in the
//! package are ignored; only cached cell values are read.

use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::attendance::error::ProcessError;
use crate::attendance::values::CellValue;

pub type Row = Vec<CellValue>;

/// Worksheet bounds of the xlsx format.
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLS: usize = 16_384;

#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Row>,
}

/// Read the named worksheet, or the first one when `sheet_name` is `None`.
pub fn read_sheet(bytes: &[u8], sheet_name: Option<&str>) -> Result<SheetGrid, ProcessError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(ProcessError::malformed)?;

    if archive.by_name("[Content_Types].xml").is_err() {
        return Err(ProcessError::malformed("missing [Content_Types].xml"));
    }

    let shared_strings = read_shared_strings(&mut archive)?;
    let sheets = read_workbook_xml(&mut archive)?;
    let rels = read_workbook_rels(&mut archive)?;

    let (name, r_id) = match sheet_name {
        Some(wanted) => sheets
            .into_iter()
            .find(|(name, _)| name == wanted)
            .ok_or_else(|| ProcessError::SheetNotFound {
                sheet: wanted.to_string(),
            })?,
        None => sheets
            .into_iter()
            .next()
            .ok_or_else(|| ProcessError::malformed("workbook has no worksheets"))?,
    };

    let path = rels
        .get(&r_id)
        .ok_or_else(|| ProcessError::malformed(format!("no part for worksheet '{}'", name)))?;

    let rows = read_worksheet(&mut archive, path, &shared_strings)?;

    tracing::debug!(sheet = %name, rows = rows.len(), "Worksheet loaded");

    Ok(SheetGrid { name, rows })
}

fn read_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<String>, ProcessError> {
    let mut strings = Vec::new();

    let file = match archive.by_name("xl/sharedStrings.xml") {
        Ok(f) => f,
        Err(_) => return Ok(strings),
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_t => {
                let text = e.unescape().map_err(ProcessError::malformed)?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProcessError::malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Sheet names and relationship ids, in workbook order.
fn read_workbook_xml<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<(String, String)>, ProcessError> {
    let file = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| ProcessError::malformed("missing xl/workbook.xml"))?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut r_id = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"r:id" => r_id = attr.unescape_value().ok().map(|s| s.to_string()),
                        _ => {}
                    }
                }

                if let (Some(name), Some(r_id)) = (name, r_id) {
                    sheets.push((name, r_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProcessError::malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Relationship id -> worksheet part path inside the package.
fn read_workbook_rels<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, String>, ProcessError> {
    let file = archive
        .by_name("xl/_rels/workbook.xml.rels")
        .map_err(|_| ProcessError::malformed("missing xl/_rels/workbook.xml.rels"))?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                let mut rel_type = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Target" => target = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Type" => rel_type = attr.unescape_value().ok().map(|s| s.to_string()),
                        _ => {}
                    }
                }

                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    if rel_type.ends_with("/worksheet") {
                        let path = match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("xl/{}", target),
                        };
                        rels.insert(id, path);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProcessError::malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn read_worksheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    shared_strings: &[String],
) -> Result<Vec<Row>, ProcessError> {
    let file = archive
        .by_name(path)
        .map_err(|_| ProcessError::malformed(format!("missing {}", path)))?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut rows: Vec<Row> = Vec::new();

    let mut current_row: usize = 0;
    let mut next_col: usize = 0;
    let mut cell_ref: Option<String> = None;
    let mut cell_type: Option<String> = None;
    let mut raw: Option<String> = None;
    let mut in_cell = false;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"row" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"r" {
                            if let Some(r) = attr
                                .unescape_value()
                                .ok()
                                .and_then(|v| v.parse::<usize>().ok())
                            {
                                if r > MAX_ROWS {
                                    return Err(ProcessError::malformed(format!(
                                        "row {} is beyond the worksheet limit",
                                        r
                                    )));
                                }
                                current_row = r.saturating_sub(1);
                            }
                        }
                    }
                    next_col = 0;
                }
                b"c" => {
                    in_cell = true;
                    cell_ref = None;
                    cell_type = None;
                    raw = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => cell_ref = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"t" => cell_type = attr.unescape_value().ok().map(|s| s.to_string()),
                            _ => {}
                        }
                    }
                }
                b"v" if in_cell => in_value = true,
                b"t" if in_cell => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                // valueless (styled) cell: only advances the column cursor
                next_col += 1;
            }
            Ok(Event::Text(e)) if in_value || in_inline_text => {
                let text = e.unescape().map_err(ProcessError::malformed)?;
                raw.get_or_insert_with(String::new).push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"row" => current_row += 1,
                b"c" => {
                    in_cell = false;
                    let (row, col) = match cell_ref.as_deref() {
                        Some(reference) => parse_cell_ref(reference).ok_or_else(|| {
                            ProcessError::malformed(format!("invalid cell reference '{}'", reference))
                        })?,
                        None => (current_row, next_col),
                    };
                    if row >= MAX_ROWS || col >= MAX_COLS {
                        return Err(ProcessError::malformed(format!(
                            "cell at row {}, column {} is beyond the worksheet limit",
                            row + 1,
                            col + 1
                        )));
                    }
                    next_col = col + 1;

                    let value = decode_cell(cell_type.as_deref(), raw.take(), shared_strings);
                    if value != CellValue::Empty {
                        place(&mut rows, row, col, value);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProcessError::malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

fn decode_cell(cell_type: Option<&str>, raw: Option<String>, shared_strings: &[String]) -> CellValue {
    let Some(raw) = raw else {
        return CellValue::Empty;
    };

    match cell_type {
        Some("s") => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .map(|s| CellValue::Text(s.clone()))
            .unwrap_or(CellValue::Empty),
        Some("inlineStr") | Some("str") => CellValue::Text(raw),
        Some("b") => CellValue::Bool(raw.trim() == "1"),
        Some("e") => CellValue::Empty,
        _ => match raw.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(raw),
        },
    }
}

fn place(rows: &mut Vec<Row>, row: usize, col: usize, value: CellValue) {
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, CellValue::Empty);
    }
    cells[col] = value;
}

/// "C12" -> (11, 2), zero-based. `None` for anything outside `XFD1048576`.
fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLS {
            return None;
        }
    }

    let row: usize = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS {
        return None;
    }

    Some((row - 1, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let first = workbook.add_worksheet();
        first.set_name("Raw").unwrap();
        first
            .write_string(0, 0, "Employee ID: 102, First Name: Ali, Department: Drivers")
            .unwrap();
        first.write_string(1, 0, "Date").unwrap();
        first.write_string(2, 0, "2024-01-02").unwrap();
        first.write_number(2, 2, 0.375).unwrap();
        first.write_boolean(3, 1, true).unwrap();

        let second = workbook.add_worksheet();
        second.set_name("Other").unwrap();
        second.write_string(4, 3, "far away").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn cell_references_are_zero_based() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("C12"), Some((11, 2)));
        assert_eq!(parse_cell_ref("AA3"), Some((2, 26)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("B0"), None);
        assert_eq!(parse_cell_ref("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(parse_cell_ref("XFE1"), None);
        assert_eq!(parse_cell_ref("A1048577"), None);
        assert_eq!(parse_cell_ref("A4000000000"), None);
        assert_eq!(parse_cell_ref("ZZZZZZZZZZZZZZ1"), None);
        assert_eq!(parse_cell_ref("A99999999999999999999999"), None);
    }

    /// Smallest package the reader accepts, around one worksheet body.
    fn raw_workbook(sheet_data: &str) -> Vec<u8> {
        let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let sheet = format!("<worksheet><sheetData>{}</sheetData></worksheet>", sheet_data);

        crate::attendance::package::zip_files(&[
            ("[Content_Types].xml", b"<Types/>".to_vec()),
            ("xl/workbook.xml", workbook.as_bytes().to_vec()),
            ("xl/_rels/workbook.xml.rels", rels.as_bytes().to_vec()),
            ("xl/worksheets/sheet1.xml", sheet.into_bytes()),
        ])
        .unwrap()
    }

    #[test]
    fn hand_written_package_is_read() {
        let grid = read_sheet(&raw_workbook(r#"<row r="2"><c r="B2"><v>7</v></c></row>"#), None).unwrap();
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1][1], CellValue::Number(7.0));
    }

    #[test]
    fn out_of_range_cells_are_rejected() {
        for data in [
            r#"<row r="1"><c r="A4000000000"><v>1</v></c></row>"#,
            r#"<row r="1"><c r="XFE1"><v>1</v></c></row>"#,
            r#"<row r="1"><c r="ZZZZZZZZZZZZZZ1"><v>1</v></c></row>"#,
            r#"<row r="4000000000"><c><v>1</v></c></row>"#,
        ] {
            let err = read_sheet(&raw_workbook(data), None).unwrap_err();
            assert!(matches!(err, ProcessError::MalformedWorkbook { .. }), "{}", data);
        }
    }

    #[test]
    fn reads_first_sheet_by_default() {
        let grid = read_sheet(&workbook_bytes(), None).unwrap();

        assert_eq!(grid.name, "Raw");
        assert_eq!(
            grid.rows[0][0],
            CellValue::Text("Employee ID: 102, First Name: Ali, Department: Drivers".into())
        );
        assert_eq!(grid.rows[2][0], CellValue::Text("2024-01-02".into()));
        assert_eq!(grid.rows[2][1], CellValue::Empty);
        assert_eq!(grid.rows[2][2], CellValue::Number(0.375));
        assert_eq!(grid.rows[3][1], CellValue::Bool(true));
    }

    #[test]
    fn reads_named_sheet_and_keeps_gaps() {
        let grid = read_sheet(&workbook_bytes(), Some("Other")).unwrap();

        assert_eq!(grid.rows.len(), 5);
        assert!(grid.rows[0].is_empty());
        assert_eq!(grid.rows[4][3], CellValue::Text("far away".into()));
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let err = read_sheet(&workbook_bytes(), Some("Missing")).unwrap_err();
        assert!(matches!(err, ProcessError::SheetNotFound { sheet } if sheet == "Missing"));
    }

    #[test]
    fn non_zip_input_is_malformed() {
        let err = read_sheet(b"definitely not a workbook", None).unwrap_err();
        assert!(matches!(err, ProcessError::MalformedWorkbook { .. }));
    }
}
