use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use crate::dataset::{Cell, Dataset};

pub const EXPORT_FILE_NAME: &str = "filtered_player_stats.xlsx";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Player Stats";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed building workbook: {0}")]
    Workbook(#[from] XlsxError),
    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub bytes: usize,
    pub exported_at: DateTime<Local>,
}

/// Serializes `dataset` as a single-sheet xlsx workbook. Header row first;
/// numbers stay numeric, missing cells stay empty.
pub fn workbook_bytes(dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;
        write_dataset(sheet, dataset)?;
    }
    Ok(workbook.save_to_buffer()?)
}

/// Writes the workbook to `path` through a temp file, so a failed write never
/// leaves a half-written export behind.
pub fn export_to_path(dataset: &Dataset, path: &Path) -> Result<ExportReport, ExportError> {
    let bytes = workbook_bytes(dataset)?;
    let tmp = path.with_extension("xlsx.tmp");
    fs::write(&tmp, &bytes).map_err(|source| ExportError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;

    info!(
        "exported {} rows x {} columns to {}",
        dataset.len(),
        dataset.columns().len(),
        path.display()
    );
    Ok(ExportReport {
        path: path.to_path_buf(),
        rows: dataset.len(),
        columns: dataset.columns().len(),
        bytes: bytes.len(),
        exported_at: Local::now(),
    })
}

pub fn export_to_dir(dataset: &Dataset, dir: &Path) -> Result<ExportReport, ExportError> {
    export_to_path(dataset, &dir.join(EXPORT_FILE_NAME))
}

fn write_dataset(sheet: &mut Worksheet, dataset: &Dataset) -> Result<(), XlsxError> {
    let header = Format::new().set_bold();
    for (col_idx, name) in dataset.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col_idx as u16, name, &header)?;
    }
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let xl_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let xl_col = col_idx as u16;
            match cell {
                Cell::Missing => {}
                Cell::Number(v) => {
                    sheet.write_number(xl_row, xl_col, *v)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(xl_row, xl_col, s)?;
                }
            }
        }
    }
    Ok(())
}
