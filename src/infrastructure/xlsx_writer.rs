//! Minimal xlsx package writer.
//!
//! Produces a workbook with one worksheet part per sheet. Text is stored as
//! inline strings, so no shared-string table is needed. The style part only
//! carries the number formats that keep dates and durations typed.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::workbook::{Cell, Sheet};
use crate::domain::{StoreError, StoreResult};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

/// Built-in number formats, in `cellXfs` order: general, `m/d/yyyy`,
/// `m/d/yyyy h:mm`, `[h]:mm:ss`.
const CELL_FORMATS: [&str; 4] = ["0", "14", "22", "46"];
const STYLE_DATE: &str = "1";
const STYLE_DATE_TIME: &str = "2";
const STYLE_DURATION: &str = "3";

/// Writes `sheets` to `path` as an xlsx file, replacing any existing file.
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> StoreResult<()> {
    let fail = |message: String| StoreError::Write {
        path: path.to_path_buf(),
        message,
    };
    let xml_failure = |e: io::Error| fail(format!("cannot render xml: {e}"));

    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".to_string(), content_types(sheets.len()).map_err(xml_failure)?),
        ("_rels/.rels".to_string(), root_relationships().map_err(xml_failure)?),
        ("xl/workbook.xml".to_string(), workbook_part(sheets).map_err(xml_failure)?),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            workbook_relationships(sheets.len()).map_err(xml_failure)?,
        ),
        ("xl/styles.xml".to_string(), styles_part().map_err(xml_failure)?),
    ];
    for (index, sheet) in sheets.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", index + 1),
            worksheet_part(sheet).map_err(xml_failure)?,
        ));
    }

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options).map_err(|e| fail(e.to_string()))?;
        zip.write_all(&bytes)?;
    }
    zip.finish()
        .map_err(|e| fail(e.to_string()))?
        .flush()?;
    Ok(())
}

/// Spreadsheet column letters for a 1-based index: 1 → A, 27 → AA.
pub fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

type XmlWriter = Writer<Vec<u8>>;

fn document() -> io::Result<XmlWriter> {
    let mut writer = Writer::new(Vec::new());
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn write(writer: &mut XmlWriter, event: Event<'_>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

fn start(writer: &mut XmlWriter, tag: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
    write(writer, Event::Start(BytesStart::new(tag).with_attributes(attributes.iter().copied())))
}

fn empty(writer: &mut XmlWriter, tag: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
    write(writer, Event::Empty(BytesStart::new(tag).with_attributes(attributes.iter().copied())))
}

fn end(writer: &mut XmlWriter, tag: &str) -> io::Result<()> {
    write(writer, Event::End(BytesEnd::new(tag)))
}

fn text(writer: &mut XmlWriter, content: &str) -> io::Result<()> {
    write(writer, Event::Text(BytesText::new(content)))
}

fn content_types(sheet_count: usize) -> io::Result<Vec<u8>> {
    let mut w = document()?;
    start(
        &mut w,
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    empty(
        &mut w,
        "Default",
        &[("Extension", "rels"), ("ContentType", "application/vnd.openxmlformats-package.relationships+xml")],
    )?;
    empty(&mut w, "Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    empty(&mut w, "Override", &[("PartName", "/xl/workbook.xml"), ("ContentType", CT_WORKBOOK)])?;
    empty(&mut w, "Override", &[("PartName", "/xl/styles.xml"), ("ContentType", CT_STYLES)])?;
    for index in 1..=sheet_count {
        let part = format!("/xl/worksheets/sheet{index}.xml");
        empty(&mut w, "Override", &[("PartName", part.as_str()), ("ContentType", CT_WORKSHEET)])?;
    }
    end(&mut w, "Types")?;
    Ok(w.into_inner())
}

fn root_relationships() -> io::Result<Vec<u8>> {
    let mut w = document()?;
    start(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    empty(
        &mut w,
        "Relationship",
        &[("Id", "rId1"), ("Type", REL_OFFICE_DOCUMENT), ("Target", "xl/workbook.xml")],
    )?;
    end(&mut w, "Relationships")?;
    Ok(w.into_inner())
}

fn workbook_part(sheets: &[Sheet]) -> io::Result<Vec<u8>> {
    let mut w = document()?;
    start(&mut w, "workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
    start(&mut w, "sheets", &[])?;
    for (index, sheet) in sheets.iter().enumerate() {
        let id = (index + 1).to_string();
        let rel = format!("rId{id}");
        empty(
            &mut w,
            "sheet",
            &[("name", sheet.name.as_str()), ("sheetId", id.as_str()), ("r:id", rel.as_str())],
        )?;
    }
    end(&mut w, "sheets")?;
    end(&mut w, "workbook")?;
    Ok(w.into_inner())
}

/// Worksheets take `rId1..=rIdN`; the style part follows them.
fn workbook_relationships(sheet_count: usize) -> io::Result<Vec<u8>> {
    let mut w = document()?;
    start(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    for index in 1..=sheet_count {
        let id = format!("rId{index}");
        let target = format!("worksheets/sheet{index}.xml");
        empty(
            &mut w,
            "Relationship",
            &[("Id", id.as_str()), ("Type", REL_WORKSHEET), ("Target", target.as_str())],
        )?;
    }
    let styles_id = format!("rId{}", sheet_count + 1);
    empty(
        &mut w,
        "Relationship",
        &[("Id", styles_id.as_str()), ("Type", REL_STYLES), ("Target", "styles.xml")],
    )?;
    end(&mut w, "Relationships")?;
    Ok(w.into_inner())
}

fn styles_part() -> io::Result<Vec<u8>> {
    let mut w = document()?;
    start(&mut w, "styleSheet", &[("xmlns", NS_MAIN)])?;

    start(&mut w, "fonts", &[("count", "1")])?;
    start(&mut w, "font", &[])?;
    empty(&mut w, "sz", &[("val", "11")])?;
    empty(&mut w, "name", &[("val", "Calibri")])?;
    end(&mut w, "font")?;
    end(&mut w, "fonts")?;

    start(&mut w, "fills", &[("count", "2")])?;
    for pattern in ["none", "gray125"] {
        start(&mut w, "fill", &[])?;
        empty(&mut w, "patternFill", &[("patternType", pattern)])?;
        end(&mut w, "fill")?;
    }
    end(&mut w, "fills")?;

    start(&mut w, "borders", &[("count", "1")])?;
    start(&mut w, "border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        empty(&mut w, side, &[])?;
    }
    end(&mut w, "border")?;
    end(&mut w, "borders")?;

    let plain = [("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")];
    start(&mut w, "cellStyleXfs", &[("count", "1")])?;
    empty(&mut w, "xf", &plain)?;
    end(&mut w, "cellStyleXfs")?;

    let count = CELL_FORMATS.len().to_string();
    start(&mut w, "cellXfs", &[("count", count.as_str())])?;
    for format in CELL_FORMATS {
        empty(
            &mut w,
            "xf",
            &[
                ("numFmtId", format),
                ("fontId", "0"),
                ("fillId", "0"),
                ("borderId", "0"),
                ("xfId", "0"),
                ("applyNumberFormat", if format == "0" { "0" } else { "1" }),
            ],
        )?;
    }
    end(&mut w, "cellXfs")?;

    end(&mut w, "styleSheet")?;
    Ok(w.into_inner())
}

fn worksheet_part(sheet: &Sheet) -> io::Result<Vec<u8>> {
    let mut w = document()?;
    start(&mut w, "worksheet", &[("xmlns", NS_MAIN)])?;
    start(&mut w, "sheetData", &[])?;

    for (row_index, cells) in sheet.rows.iter().enumerate() {
        if cells.iter().all(Option::is_none) {
            continue;
        }
        let row_number = (row_index + 1).to_string();
        start(&mut w, "row", &[("r", row_number.as_str())])?;
        for (col_index, cell) in cells.iter().enumerate() {
            if let Some(cell) = cell {
                let reference = format!("{}{}", column_letters(col_index + 1), row_number);
                write_cell(&mut w, &reference, cell)?;
            }
        }
        end(&mut w, "row")?;
    }

    end(&mut w, "sheetData")?;
    end(&mut w, "worksheet")?;
    Ok(w.into_inner())
}

fn write_cell(w: &mut XmlWriter, reference: &str, cell: &Cell) -> io::Result<()> {
    match cell {
        Cell::Text(value) => {
            start(w, "c", &[("r", reference), ("t", "inlineStr")])?;
            start(w, "is", &[])?;
            if value.trim() == value {
                start(w, "t", &[])?;
            } else {
                start(w, "t", &[("xml:space", "preserve")])?;
            }
            text(w, value)?;
            end(w, "t")?;
            end(w, "is")?;
        }
        Cell::Number(number) => numeric(w, &[("r", reference)], *number)?,
        Cell::Bool(flag) => {
            start(w, "c", &[("r", reference), ("t", "b")])?;
            start(w, "v", &[])?;
            text(w, if *flag { "1" } else { "0" })?;
            end(w, "v")?;
        }
        Cell::Date(serial) => {
            let style = if serial.fract() == 0.0 { STYLE_DATE } else { STYLE_DATE_TIME };
            numeric(w, &[("r", reference), ("s", style)], *serial)?;
        }
        Cell::Duration(days) => numeric(w, &[("r", reference), ("s", STYLE_DURATION)], *days)?,
    }
    end(w, "c")
}

/// Opens a `<c>` with `attributes` and writes its numeric `<v>`; the caller closes the cell.
fn numeric(w: &mut XmlWriter, attributes: &[(&str, &str)], value: f64) -> io::Result<()> {
    start(w, "c", attributes)?;
    start(w, "v", &[])?;
    text(w, &value.to_string())?;
    end(w, "v")
}
