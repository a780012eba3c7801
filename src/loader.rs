use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Xls, Xlsx};
use log::{debug, warn};
use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use thiserror::Error;

use crate::dataset::{Cell, Dataset};
use crate::http_cache;
use crate::schema;

/// Where a dataset comes from. Loads are memoized per distinct source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// A file the user supplied.
    Upload(PathBuf),
    /// A remote dataset, downloaded into the cache directory first.
    Remote(String),
}

impl Source {
    pub fn label(&self) -> String {
        match self {
            Source::Upload(path) => path.display().to_string(),
            Source::Remote(url) => url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Parquet,
    /// Office Open XML workbook (zip container).
    Xlsx,
    /// Legacy binary workbook (OLE container).
    Xls,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http {status} from {url}")]
    HttpStatus { url: String, status: StatusCode },
    #[error("failed building http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed parquet: {0}")]
    Parquet(#[from] ParquetError),
    #[error("malformed workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("dataset is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Downloads (or revalidates) a remote dataset into `cache_dir`, then loads it.
pub fn load_remote(client: &Client, url: &str, cache_dir: &Path) -> Result<Dataset, LoadError> {
    let path = http_cache::download_cached(client, url, cache_dir)?;
    load_file(&path)
}

/// Reads a local csv, parquet or workbook file and conforms it to the player
/// schema.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let format = detect_format(path)?;
    debug!("reading {} as {format:?}", path.display());
    let mut dataset = match format {
        Format::Csv => read_csv(open(path)?)?,
        Format::Parquet => read_parquet(path)?,
        Format::Xlsx => read_workbook(
            Xlsx::new(BufReader::new(open(path)?)).map_err(calamine::Error::from)?,
        )?,
        Format::Xls => read_workbook(
            Xls::new(BufReader::new(open(path)?)).map_err(calamine::Error::from)?,
        )?,
    };
    prepare(&mut dataset)?;
    Ok(dataset)
}

/// Header aliases, required-column check and type coercion.
pub fn prepare(dataset: &mut Dataset) -> Result<(), LoadError> {
    schema::normalize_headers(dataset);
    let missing = schema::missing_required(dataset);
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }
    schema::conform(dataset);
    let report = schema::report(dataset);
    if !report.optional_absent.is_empty() {
        warn!(
            "optional column(s) absent: {}",
            report.optional_absent.join(", ")
        );
    }
    Ok(())
}

/// Picks a reader by extension, falling back to the file's leading bytes.
pub fn detect_format(path: &Path) -> Result<Format, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" | "txt" => return Ok(Format::Csv),
        "parquet" | "pq" => return Ok(Format::Parquet),
        "xlsx" | "xlsm" => return Ok(Format::Xlsx),
        "xls" => return Ok(Format::Xls),
        _ => {}
    }

    let mut head = [0u8; 8];
    let n = open(path)?
        .read(&mut head)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    sniff_format(&head[..n]).ok_or_else(|| {
        LoadError::UnsupportedFormat(format!(
            "{} is binary but not csv, parquet or a workbook",
            path.display()
        ))
    })
}

const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Format from a file's leading bytes. Unrecognized binary content (a NUL
/// byte without a known magic) is `None`; anything else reads as csv.
pub fn sniff_format(head: &[u8]) -> Option<Format> {
    if head.starts_with(b"PAR1") {
        Some(Format::Parquet)
    } else if head.starts_with(b"PK\x03\x04") {
        Some(Format::Xlsx)
    } else if head.starts_with(OLE_MAGIC) {
        Some(Format::Xls)
    } else if head.contains(&0) {
        None
    } else {
        Some(Format::Csv)
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Header row plus records. Every value starts as text; the schema decides
/// what becomes numeric.
pub fn read_csv(reader: impl io::Read) -> Result<Dataset, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if idx == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect::<Vec<_>>();

    let mut dataset = Dataset::new(headers);
    for record in rdr.records() {
        let record = record?;
        dataset.push_row(record.iter().map(Cell::text).collect());
    }
    Ok(dataset)
}

/// First worksheet of a workbook; its first row is the header.
pub fn read_workbook<RS, R>(mut workbook: R) -> Result<Dataset, LoadError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    calamine::Error: From<R::Error>,
{
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(calamine::Error::from)?,
        None => Range::empty(),
    };
    Ok(range_to_dataset(&range))
}

fn range_to_dataset(range: &Range<Data>) -> Dataset {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Dataset::default();
    };
    let headers = header
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        })
        .collect::<Vec<_>>();
    let mut dataset = Dataset::new(headers);
    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        dataset.push_row(row.iter().map(data_to_cell).collect());
    }
    dataset
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(v) => Cell::number(*v as f64),
        Data::Float(v) => Cell::number(*v),
        Data::String(s) => Cell::text(s.clone()),
        Data::Bool(b) => Cell::text(b.to_string()),
        Data::DateTime(dt) => Cell::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
    }
}

pub fn read_parquet(path: &Path) -> Result<Dataset, LoadError> {
    let reader = SerializedFileReader::new(open(path)?)?;
    let headers = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();

    let mut dataset = Dataset::new(headers.clone());
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let mut cells = vec![Cell::Missing; headers.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(idx) = headers.iter().position(|h| h == name) {
                cells[idx] = field_to_cell(field);
            }
        }
        dataset.push_row(cells);
    }
    Ok(dataset)
}

fn field_to_cell(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Missing,
        Field::Byte(v) => Cell::number(f64::from(*v)),
        Field::Short(v) => Cell::number(f64::from(*v)),
        Field::Int(v) => Cell::number(f64::from(*v)),
        Field::Long(v) => Cell::number(*v as f64),
        Field::UByte(v) => Cell::number(f64::from(*v)),
        Field::UShort(v) => Cell::number(f64::from(*v)),
        Field::UInt(v) => Cell::number(f64::from(*v)),
        Field::ULong(v) => Cell::number(*v as f64),
        Field::Float(v) => Cell::number(f64::from(*v)),
        Field::Double(v) => Cell::number(*v),
        Field::Str(s) => Cell::text(s.clone()),
        other => Cell::text(other.to_string()),
    }
}
