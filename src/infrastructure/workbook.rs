//! In-memory workbook implementing [`TabularStore`].
//!
//! Any format calamine reads (xlsx, xlsm, xlsb, xls, ods) can be opened; the
//! result is always saved as xlsx. Only cell values survive the round trip:
//! formulas are replaced by their cached results, dates and durations keep
//! their type with a default number format.

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::xlsx_writer;
use crate::domain::{StoreError, StoreResult, TabularStore};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

static ISO_DURATION: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .ok()
});

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date serial: days since 1899-12-30, the fraction is the time of day
    Date(f64),
    /// Elapsed time in days
    Duration(f64),
}

impl Cell {
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Date(serial) => date_text(*serial).unwrap_or_else(|| serial.to_string()),
            Self::Duration(days) => duration_text(*days),
        }
    }

    fn from_data(data: &Data) -> Option<Self> {
        match data {
            Data::Empty => None,
            Data::String(text) if text.is_empty() => None,
            Data::String(text) => Some(Self::Text(text.clone())),
            Data::Int(number) => Some(Self::Number(*number as f64)),
            Data::Float(number) => Some(Self::Number(*number)),
            Data::Bool(flag) => Some(Self::Bool(*flag)),
            Data::DateTime(value) if value.is_duration() => Some(Self::Duration(value.as_f64())),
            Data::DateTime(value) => Some(Self::Date(value.as_f64())),
            Data::DateTimeIso(text) => {
                Some(iso_date_serial(text).map_or_else(|| Self::Text(text.clone()), Self::Date))
            }
            Data::DurationIso(text) => {
                Some(iso_duration_days(text).map_or_else(|| Self::Text(text.clone()), Self::Duration))
            }
            other => Some(Self::Text(other.to_string())),
        }
    }
}

fn serial_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

fn date_text(serial: f64) -> Option<String> {
    let millis = TimeDelta::try_milliseconds((serial * MILLIS_PER_DAY).round() as i64)?;
    let moment = serial_epoch()?.checked_add_signed(millis)?;
    let format = if serial.fract() == 0.0 {
        "%Y-%m-%d"
    } else if serial < 1.0 {
        "%H:%M:%S"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    Some(moment.format(format).to_string())
}

fn duration_text(days: f64) -> String {
    let seconds = (days * 86_400.0).round() as i64;
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.abs();
    format!("{sign}{}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)
}

/// Serial for an ISO 8601 date, date-time or time of day
fn iso_date_serial(text: &str) -> Option<f64> {
    let text = text.trim();
    let moment = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
        .or_else(|| {
            let time = NaiveTime::parse_from_str(text, "%H:%M:%S%.f").ok()?;
            serial_epoch().map(|epoch| epoch.date().and_time(time))
        })?;
    let elapsed = moment.signed_duration_since(serial_epoch()?);
    Some(elapsed.num_milliseconds() as f64 / MILLIS_PER_DAY)
}

/// Days in an ISO 8601 duration such as `PT12H30M` or `P1DT2H`
fn iso_duration_days(text: &str) -> Option<f64> {
    let captures = ISO_DURATION.as_ref()?.captures(text.trim())?;
    let part = |index: usize| -> f64 {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    Some(part(1) + part(2) / 24.0 + part(3) / 1_440.0 + part(4) / 86_400.0)
}

/// One sheet as a ragged grid of 0-based rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Widest populated column across all rows (1-based count)
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|row| row.iter().rposition(Option::is_some))
            .map(|last| last + 1)
            .max()
            .unwrap_or(0)
    }

    /// Last row holding any value (1-based count)
    pub fn height(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(Option::is_some))
            .map_or(0, |last| last + 1)
    }

    fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row - 1)?.get(column - 1)?.as_ref()
    }

    fn put(&mut self, row: usize, column: usize, cell: Option<Cell>) {
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < column {
            cells.resize(column, None);
        }
        cells[column - 1] = cell;
    }

    fn header_map(&self) -> HashMap<String, usize> {
        let mut headers = HashMap::new();
        if let Some(header_row) = self.rows.first() {
            for (index, cell) in header_row.iter().enumerate() {
                if let Some(cell) = cell {
                    let name = cell.text().trim().to_string();
                    if !name.is_empty() {
                        headers.entry(name).or_insert(index + 1);
                    }
                }
            }
        }
        headers
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    output: Option<PathBuf>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self {
            sheets,
            output: None,
        }
    }

    /// Appends a sheet built from text rows; empty strings become empty cells.
    #[must_use]
    pub fn with_sheet<R, C, S>(mut self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| {
                        let value = value.as_ref();
                        (!value.is_empty()).then(|| Cell::Text(value.to_string()))
                    })
                    .collect()
            })
            .collect();
        self.sheets.push(Sheet {
            name: name.to_string(),
            rows,
        });
        self
    }

    /// Where [`TabularStore::save`] writes; unset means saving is a no-op.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn open(path: &Path) -> StoreResult<Self> {
        let read_error = |message: String| StoreError::Read {
            path: path.to_path_buf(),
            message,
        };
        let mut source = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in source.sheet_names().to_vec() {
            let range = source
                .worksheet_range(&name)
                .map_err(|e| read_error(format!("sheet '{name}': {e}")))?;

            let mut sheet = Sheet::new(name);
            if let Some((first_row, first_col)) = range.start() {
                for (row_offset, row) in range.rows().enumerate() {
                    for (col_offset, data) in row.iter().enumerate() {
                        if let Some(cell) = Cell::from_data(data) {
                            sheet.put(
                                first_row as usize + row_offset + 1,
                                first_col as usize + col_offset + 1,
                                Some(cell),
                            );
                        }
                    }
                }
            }
            debug!("Read sheet '{}' ({} rows)", sheet.name, sheet.height());
            sheets.push(sheet);
        }

        info!("Opened workbook {:?} with {} sheet(s)", path, sheets.len());
        Ok(Self {
            sheets,
            output: None,
        })
    }

    pub fn sheet(&self, name: &str) -> StoreResult<&Sheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| StoreError::UnknownSheet(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> StoreResult<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| StoreError::UnknownSheet(name.to_string()))
    }
}

fn check_address(row: usize, column: usize) -> StoreResult<()> {
    if row == 0 || column == 0 {
        return Err(StoreError::InvalidAddress { row, column });
    }
    Ok(())
}

impl TabularStore for Workbook {
    fn sheets(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    fn ensure_headers(&mut self, sheet: &str, names: &[&str]) -> StoreResult<HashMap<String, usize>> {
        let sheet = self.sheet_mut(sheet)?;
        let mut headers = sheet.header_map();
        let mut next_column = sheet.width() + 1;

        for name in names {
            let name = name.trim();
            if name.is_empty() || headers.contains_key(name) {
                continue;
            }
            sheet.put(1, next_column, Some(Cell::Text(name.to_string())));
            info!("Sheet '{}': added header '{}' in column {}", sheet.name, name, next_column);
            headers.insert(name.to_string(), next_column);
            next_column += 1;
        }

        Ok(headers)
    }

    fn row_count(&self, sheet: &str) -> StoreResult<usize> {
        Ok(self.sheet(sheet)?.height())
    }

    fn get_cell(&self, sheet: &str, row: usize, column: usize) -> StoreResult<Option<String>> {
        check_address(row, column)?;
        Ok(self.sheet(sheet)?.cell(row, column).map(Cell::text))
    }

    fn set_cell(&mut self, sheet: &str, row: usize, column: usize, value: &str) -> StoreResult<()> {
        check_address(row, column)?;
        let cell = (!value.is_empty()).then(|| Cell::Text(value.to_string()));
        self.sheet_mut(sheet)?.put(row, column, cell);
        Ok(())
    }

    fn save(&mut self) -> StoreResult<Option<PathBuf>> {
        let Some(path) = self.output.clone() else {
            return Ok(None);
        };
        xlsx_writer::write_workbook(&path, &self.sheets)?;
        info!("Saved workbook to {:?}", path);
        Ok(Some(path))
    }
}
