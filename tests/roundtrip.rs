// Write-then-read coverage across dialects through the public API.
use std::fs;
use std::path::Path;

use tabio::api::{Cursor, Dialect, ErrorKind, EscapeStyle, Record, TableConfig, Writer, WriterOptions};

fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|value| value.to_string()).collect())
        .collect()
}

fn write_all(path: &Path, dialect: &Dialect, options: WriterOptions, data: &[Vec<String>]) -> u64 {
    let mut writer =
        Writer::create_with_options(path, dialect.clone(), options).expect("create writer");
    for row in data {
        writer
            .write_row(row.iter().map(|value| Some(value.as_str())))
            .expect("write row");
    }
    writer.close().expect("close")
}

fn read_all(path: &Path, dialect: &Dialect) -> Vec<Vec<String>> {
    let mut cursor = Cursor::open(path, dialect.clone()).expect("open cursor");
    cursor
        .records()
        .map(|record| record.expect("record").into_fields())
        .collect()
}

fn tricky_rows() -> Vec<Vec<String>> {
    rows(&[
        &["plain", "with,comma", "with \"quotes\""],
        &["", "trailing space ", "pipe|tab\tsemi;"],
        &["line\nbreak", "crlf\r\ninside", "back\\slash"],
        &["\"", "\"\"", "end\\"],
    ])
}

#[test]
fn round_trip_across_dialects() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dialects = [
        Dialect::csv(),
        Dialect::tsv(),
        Dialect::psv(),
        Dialect::csv().escape(EscapeStyle::Backslash),
        Dialect::psv().enclosure(Some('\'')),
    ];
    for (index, dialect) in dialects.iter().enumerate() {
        for lazy_wrap in [true, false] {
            let path = dir.path().join(format!("data-{index}-{lazy_wrap}.txt"));
            let options = WriterOptions {
                lazy_wrap,
                ..WriterOptions::default()
            };
            let data = tricky_rows();
            assert_eq!(write_all(&path, dialect, options, &data), data.len() as u64);
            assert_eq!(read_all(&path, dialect), data, "dialect {dialect:?}");
        }
    }
}

#[test]
fn multi_line_field_is_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.csv");
    let note = "first line\r\nsecond, with comma\n\nfourth \"quoted\"";
    let data = rows(&[&["1", note], &["2", "single"]]);
    write_all(&path, &Dialect::csv(), WriterOptions::default(), &data);

    let mut cursor = Cursor::open(&path, Dialect::csv()).expect("open");
    let record = cursor.current().expect("current").expect("record");
    assert_eq!(record.fields()[1].as_bytes(), note.as_bytes());
    cursor.next().expect("next");
    assert_eq!(cursor.key(), 2);
    assert_eq!(
        cursor.current().expect("current").map(|record| record.fields()[1].clone()),
        Some("single".to_string())
    );
}

#[test]
fn header_round_trip_with_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("people.csv");
    let dialect = Dialect::csv().header(true).keys(["id", "name"]);
    let data = rows(&[&["1", "ann"], &["2", "bob, jr"]]);
    write_all(&path, &dialect, WriterOptions::default(), &data);

    let mut cursor = Cursor::open(&path, dialect).expect("open");
    assert_eq!(cursor.keys().expect("keys"), &["id".to_string(), "name".to_string()]);
    let records: Vec<Record> = cursor.records().map(|record| record.expect("record")).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("name"), Some("bob, jr"));
}

#[test]
fn zero_rows_still_produce_header_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.csv");
    let dialect = Dialect::csv().header(true).keys(["a", "b", "c"]);
    let mut writer = Writer::create(&path, dialect.clone()).expect("create");
    assert_eq!(writer.close().expect("close"), 0);

    let content = fs::read_to_string(&path).expect("read");
    assert_eq!(content.lines().count(), 1);
    assert_eq!(content, "a,b,c");

    let mut cursor = Cursor::open(&path, dialect).expect("open");
    assert_eq!(cursor.keys().expect("keys").len(), 3);
    assert!(!cursor.valid().expect("valid"));
}

#[test]
fn null_cells_read_back_as_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nulls.csv");
    let options = WriterOptions {
        null_token: Some("\\N".to_string()),
        ..WriterOptions::default()
    };
    let mut writer = Writer::create_with_options(&path, Dialect::csv(), options).expect("create");
    writer.write_row([Some("x"), None]).expect("row");
    writer.close().expect("close");

    assert_eq!(read_all(&path, &Dialect::csv()), rows(&[&["x", "\\N"]]));
}

#[test]
fn cursor_output_feeds_writer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source.csv");
    let target = dir.path().join("target.tsv");
    fs::write(&source, "id,label\n1,\"a\tb\"\n2,plain\n").expect("seed");

    let input = Dialect::csv().header(true);
    let mut cursor = Cursor::open(&source, input).expect("open");
    let keys = cursor.keys().expect("keys").to_vec();
    let output = Dialect::tsv().header(true).keys(keys);
    let mut writer = Writer::create(&target, output.clone()).expect("create");
    for record in cursor.records() {
        writer.write_record(&record.expect("record")).expect("write");
    }
    assert_eq!(writer.close().expect("close"), 2);
    assert_eq!(
        fs::read_to_string(&target).expect("read"),
        "id\tlabel\n1\t\"a\tb\"\n2\tplain"
    );
    assert_eq!(read_all(&target, &output), rows(&[&["1", "a\tb"], &["2", "plain"]]));
}

#[test]
fn unenclosed_dialect_reads_single_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("legacy.txt");
    let dialect = Dialect::csv().escape(EscapeStyle::Unenclosed);
    let data = rows(&[&["a, \"raw\" value"], &["multi\nline"]]);
    write_all(&path, &dialect, WriterOptions::default(), &data);
    assert_eq!(read_all(&path, &dialect), data);
}

#[test]
fn no_quoting_splits_on_separator() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plain.psv");
    fs::write(&path, "a|\"b\"|c\r\nd|e|f").expect("seed");
    let dialect = Dialect::psv().enclosure(None);
    assert_eq!(
        read_all(&path, &dialect),
        rows(&[&["a", "\"b\"", "c"], &["d", "e", "f"]])
    );
}

#[test]
fn config_record_drives_cursor_and_writer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("configured.csv");
    let config = TableConfig::from_json(&format!(
        r#"{{"fileName": {}, "separator": ";", "header": true, "keys": ["k1", "k2"]}}"#,
        serde_json::to_string(&path).expect("path json")
    ))
    .expect("config");

    let mut writer = Writer::from_config(&config, WriterOptions::default()).expect("writer");
    writer.write_row([Some("v1"), Some("v;2")]).expect("row");
    writer.close().expect("close");
    assert_eq!(fs::read_to_string(&path).expect("read"), "k1;k2\nv1;\"v;2\"");

    let mut cursor = Cursor::from_config(&config).expect("cursor");
    let record = cursor.current().expect("current").expect("record");
    assert_eq!(record.get("k2"), Some("v;2"));
}

#[test]
fn seek_bounds_through_public_api() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rows.csv");
    let data = rows(&[&["one"], &["two"], &["three"]]);
    write_all(&path, &Dialect::csv(), WriterOptions::default(), &data);

    let mut cursor = Cursor::open(&path, Dialect::csv()).expect("open");
    for target in [0, -1] {
        assert_eq!(
            cursor.seek(target).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
    assert_eq!(cursor.seek(4).unwrap_err().kind(), ErrorKind::OutOfBounds);
    cursor.seek(3).expect("seek");
    assert_eq!(
        cursor.current().expect("current").map(|record| record.fields()[0].clone()),
        Some("three".to_string())
    );
}

#[test]
fn empty_last_row_survives_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dialects = [
        Dialect::csv(),
        Dialect::tsv(),
        Dialect::csv().escape(EscapeStyle::Backslash),
    ];
    for (index, dialect) in dialects.iter().enumerate() {
        let path = dir.path().join(format!("empty-tail-{index}.txt"));
        let data = rows(&[&["a"], &[""]]);
        write_all(&path, dialect, WriterOptions::default(), &data);
        assert_eq!(read_all(&path, dialect), data, "dialect {dialect:?}");
    }

    let path = dir.path().join("empty-only.csv");
    let dialect = Dialect::csv().header(true).keys(["id"]);
    let data = rows(&[&[""]]);
    write_all(&path, &dialect, WriterOptions::default(), &data);
    assert_eq!(fs::read_to_string(&path).expect("read"), "id\n\"\"");
    assert_eq!(read_all(&path, &dialect), data);
}

#[test]
fn nulls_round_trip_through_unenclosed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dialect = Dialect::csv().escape(EscapeStyle::Unenclosed);
    for (index, token) in [None, Some("NULL")].into_iter().enumerate() {
        let path = dir.path().join(format!("nulls-{index}.txt"));
        let options = WriterOptions {
            null_token: token.map(str::to_string),
            ..WriterOptions::default()
        };
        let mut writer =
            Writer::create_with_options(&path, dialect.clone(), options).expect("create");
        writer.write_row([Some("x")]).expect("row");
        writer.write_row([None]).expect("null row");
        writer.write_row([Some("")]).expect("empty row");
        writer.write_row([None]).expect("trailing null row");
        assert_eq!(writer.close().expect("close"), 4);

        let null = token.unwrap_or("");
        assert_eq!(
            read_all(&path, &dialect),
            rows(&[&["x"], &[null], &[""], &[null]])
        );
    }
}

#[test]
fn ignore_blank_lines_keeps_empty_enclosed_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gaps.csv");
    let data = rows(&[&["a"], &[""], &["b"], &[""]]);
    write_all(&path, &Dialect::csv(), WriterOptions::default(), &data);

    let dialect = Dialect::csv().ignore_blank_lines(true);
    assert_eq!(read_all(&path, &dialect), data);
}
