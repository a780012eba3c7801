use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

use obv_terminal::dataset::{Cell, Dataset};
use obv_terminal::export::workbook_bytes;
use obv_terminal::loader::{Format, LoadError, load_file, read_csv, sniff_format};
use obv_terminal::schema::{AGE, COMPETITION, MINUTES_PLAYED, NAME, OBV, PRIMARY_POSITION, TEAM};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int32Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("obv_loader_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

#[test]
fn loads_fixture_and_normalizes_position_header() {
    let ds = load_file(&fixture_path("player_stats.csv")).expect("fixture should load");
    assert_eq!(ds.len(), 6);
    assert!(ds.has_column(PRIMARY_POSITION));
    assert!(!ds.has_column("Position"));

    let first = ds.record(0).unwrap();
    assert_eq!(first.text(NAME), Some("Lukas Brenner"));
    assert_eq!(first.text(TEAM), Some("Bayern Munich"));
    assert_eq!(first.number(AGE), Some(24.0));
    assert_eq!(first.number(MINUTES_PLAYED), Some(1350.4));

    // empty cell
    assert!(ds.record(3).unwrap().get(MINUTES_PLAYED).is_missing());
}

#[test]
fn missing_required_columns_fail_the_load() {
    let dir = scratch_dir("missing_required");
    let path = dir.join("no_age.csv");
    fs::write(&path, "Name,Team,Competition\nA,B,1. HNL\n").unwrap();

    match load_file(&path) {
        Err(LoadError::MissingColumns(cols)) => assert_eq!(cols, vec![AGE.to_string()]),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn unparseable_numbers_become_missing() {
    let raw = "Name,Team,Age,Competition\nA,B,unknown,1. HNL\n";
    let mut ds = read_csv(raw.as_bytes()).unwrap();
    obv_terminal::loader::prepare(&mut ds).unwrap();
    assert!(ds.record(0).unwrap().get(AGE).is_missing());
}

#[test]
fn bom_is_stripped_from_first_header() {
    let raw = "\u{feff}Name,Team,Age,Competition\nA,B,20,1. HNL\n";
    let ds = read_csv(raw.as_bytes()).unwrap();
    assert_eq!(ds.columns()[0], NAME);
}

#[test]
fn ragged_rows_are_padded() {
    let raw = "Name,Team,Age,Competition\nA,B\n";
    let ds = read_csv(raw.as_bytes()).unwrap();
    assert_eq!(ds.len(), 1);
    assert!(ds.record(0).unwrap().get(AGE).is_missing());
}

fn workbook_players() -> Dataset {
    let mut ds = Dataset::new([NAME, TEAM, AGE, COMPETITION, "Position", MINUTES_PLAYED]);
    ds.push_row(vec![
        Cell::text("Lukas Brenner"),
        Cell::text("Bayern Munich"),
        Cell::number(24.0),
        Cell::text("1. Bundesliga"),
        Cell::text("MID"),
        Cell::number(1350.4),
    ]);
    ds.push_row(vec![
        Cell::text("Marko Kovac"),
        Cell::text("Hajduk Split"),
        Cell::number(35.0),
        Cell::text("1. HNL"),
        Cell::text("GK"),
        Cell::Missing,
    ]);
    ds
}

fn assert_workbook_players(ds: &Dataset) {
    assert_eq!(ds.len(), 2);
    assert!(ds.has_column(PRIMARY_POSITION));

    let first = ds.record(0).unwrap();
    assert_eq!(first.text(NAME), Some("Lukas Brenner"));
    assert_eq!(first.number(AGE), Some(24.0));
    assert_eq!(first.text(COMPETITION), Some("1. Bundesliga"));
    assert_eq!(first.text(PRIMARY_POSITION), Some("MID"));
    assert_eq!(first.number(MINUTES_PLAYED), Some(1350.4));

    assert!(ds.record(1).unwrap().get(MINUTES_PLAYED).is_missing());
}

#[test]
fn loads_xlsx_workbooks() {
    let dir = scratch_dir("xlsx");
    let path = dir.join("stats.xlsx");
    fs::write(&path, workbook_bytes(&workbook_players()).unwrap()).unwrap();

    let ds = load_file(&path).expect("workbook should load");
    assert_workbook_players(&ds);
}

#[test]
fn extensionless_workbook_is_sniffed() {
    let dir = scratch_dir("xlsx_sniffed");
    let path = dir.join("download");
    fs::write(&path, workbook_bytes(&workbook_players()).unwrap()).unwrap();

    let ds = load_file(&path).expect("sniffed workbook should load");
    assert_workbook_players(&ds);
}

#[test]
fn corrupt_workbook_is_a_workbook_error() {
    let dir = scratch_dir("xlsx_corrupt");
    let path = dir.join("broken.xlsx");
    fs::write(&path, b"PK\x03\x04not really a zip").unwrap();
    assert!(matches!(load_file(&path), Err(LoadError::Workbook(_))));
}

#[test]
fn sniffing_recognizes_magic_bytes() {
    assert_eq!(sniff_format(b"PAR1"), Some(Format::Parquet));
    assert_eq!(sniff_format(b"PK\x03\x04"), Some(Format::Xlsx));
    assert_eq!(
        sniff_format(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1"),
        Some(Format::Xls)
    );
    assert_eq!(sniff_format(b"Name"), Some(Format::Csv));
    assert_eq!(sniff_format(b""), Some(Format::Csv));
    assert_eq!(sniff_format(b"\x1f\x8b\x08\x00"), None);
}

#[test]
fn unknown_binary_input_is_unsupported() {
    let dir = scratch_dir("binary");
    let path = dir.join("stats.gz");
    fs::write(&path, b"\x1f\x8b\x08\x00rest").unwrap();
    assert!(matches!(
        load_file(&path),
        Err(LoadError::UnsupportedFormat(_))
    ));
}

#[test]
fn loads_parquet_with_nulls_numbers_and_text() {
    let dir = scratch_dir("parquet");
    let path = dir.join("stats.parquet");
    let schema = Arc::new(
        parse_message_type(
            "message players {
                REQUIRED BINARY Name (UTF8);
                REQUIRED BINARY Team (UTF8);
                OPTIONAL INT32 Age;
                REQUIRED BINARY Competition (UTF8);
                OPTIONAL DOUBLE OBV;
            }",
        )
        .unwrap(),
    );
    let props = Arc::new(WriterProperties::builder().build());
    let mut writer =
        SerializedFileWriter::new(File::create(&path).unwrap(), schema, props).unwrap();
    let mut group = writer.next_row_group().unwrap();

    let text = |values: &[&str]| values.iter().map(|v| ByteArray::from(*v)).collect::<Vec<_>>();
    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<ByteArrayType>()
        .write_batch(&text(&["Ivan Horvat", "Marko Kovac"]), None, None)
        .unwrap();
    col.close().unwrap();
    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<ByteArrayType>()
        .write_batch(&text(&["Dinamo Zagreb", "Hajduk Split"]), None, None)
        .unwrap();
    col.close().unwrap();
    // second player's age is null
    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<Int32Type>()
        .write_batch(&[19], Some(&[1, 0][..]), None)
        .unwrap();
    col.close().unwrap();
    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<ByteArrayType>()
        .write_batch(&text(&["1. HNL", "1. HNL"]), None, None)
        .unwrap();
    col.close().unwrap();
    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<DoubleType>()
        .write_batch(&[0.65, 0.05], Some(&[1, 1][..]), None)
        .unwrap();
    col.close().unwrap();
    group.close().unwrap();
    writer.close().unwrap();

    let ds = load_file(&path).expect("parquet should load");
    assert_eq!(ds.columns(), &[NAME, TEAM, AGE, COMPETITION, OBV]);
    assert_eq!(ds.len(), 2);

    let first = ds.record(0).unwrap();
    assert_eq!(first.get(NAME), &Cell::Text("Ivan Horvat".to_string()));
    assert_eq!(first.get(AGE), &Cell::Number(19.0));
    assert_eq!(first.get(OBV), &Cell::Number(0.65));

    let second = ds.record(1).unwrap();
    assert!(second.get(AGE).is_missing());
    assert_eq!(second.text(TEAM), Some("Hajduk Split"));
    assert_eq!(second.number(OBV), Some(0.05));
}

#[test]
fn missing_file_is_an_io_error() {
    let path = fixture_path("does_not_exist.csv");
    assert!(matches!(load_file(&path), Err(LoadError::Io { .. })));
}
