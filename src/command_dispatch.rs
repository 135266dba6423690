//! Purpose: Execute parsed `tabio` commands against the public API.
//! Exports: `dispatch_command`.
//! Role: Keeps command behavior out of `main.rs`, which only owns parsing and error output.
//! Invariants: Every command resolves its dialect the same way: preset, then config, then flags.
//! Invariants: Output is one JSON value per line on stdout.

use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Cat {
            file,
            dialect,
            seek,
            limit,
        } => {
            let mut cursor = open_cursor(file, &dialect)?;
            match seek {
                Some(row) => cursor.seek(row)?,
                None => cursor.rewind()?,
            }
            let limit = limit.unwrap_or(usize::MAX);
            let mut emitted = 0usize;
            while emitted < limit {
                let row = cursor.key();
                let Some(record) = cursor.read_record()? else {
                    break;
                };
                emit_json(&json!({ "row": row, "data": record }));
                emitted += 1;
            }
            Ok(RunOutcome::ok())
        }
        Command::Keys { file, dialect } => {
            let mut cursor = open_cursor(file, &dialect)?;
            let keys = cursor.keys()?;
            emit_json(&json!(keys));
            Ok(RunOutcome::ok())
        }
        Command::Count { file, dialect } => {
            let mut cursor = open_cursor(file, &dialect)?;
            let mut rows = 0u64;
            for record in cursor.records() {
                record?;
                rows += 1;
            }
            emit_json(&json!({
                "path": cursor.path().display().to_string(),
                "rows": rows,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Seek { file, row, dialect } => {
            let mut cursor = open_cursor(Some(file), &dialect)?;
            cursor.seek(row)?;
            let key = cursor.key();
            if let Some(record) = cursor.current()? {
                emit_json(&json!({ "row": key, "data": record }));
            }
            Ok(RunOutcome::ok())
        }
        Command::Convert {
            input,
            output,
            dialect,
            target,
        } => {
            let mut cursor = open_cursor(Some(input), &dialect)?;
            let keys = cursor.keys()?.to_vec();
            let (output_dialect, options) = output_dialect(cursor.dialect(), &target, keys)?;
            let mut writer = Writer::create_with_options(&output, output_dialect, options)?;
            for record in cursor.records() {
                writer.write_record(&record?)?;
            }
            let rows = writer.close()?;
            emit_json(&json!({
                "input": cursor.path().display().to_string(),
                "output": output.display().to_string(),
                "rows": rows,
            }));
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_json(value: &Value) {
    println!("{value}");
}

fn open_cursor(file: Option<PathBuf>, args: &DialectArgs) -> Result<Cursor, Error> {
    let (config, dialect) = resolve_dialect(args)?;
    let path = match file {
        Some(path) => path,
        None => config.file_name()?.to_path_buf(),
    };
    Cursor::open(path, dialect)
}

fn resolve_dialect(args: &DialectArgs) -> Result<(TableConfig, Dialect), Error> {
    let base = args.preset.map(Preset::dialect).unwrap_or_default();
    let config = match &args.config {
        Some(path) => TableConfig::load(path)?,
        None => TableConfig::default(),
    };
    let dialect = config.apply(base)?;
    let flags = TableConfig {
        file_name: None,
        separator: args.separator.as_deref().map(unescape_tab),
        enclosure: args.enclosure.clone(),
        escape_style: args.escape.map(EscapeStyle::from),
        header: args.header.then_some(true),
        skip_lines: args.skip_lines,
        ignore_whitespace: args.ignore_blank.then_some(true),
        keys: args.keys.clone(),
        override_keys: args.override_keys.then_some(true),
    };
    let dialect = flags.apply(dialect)?;
    Ok((config, dialect))
}

fn output_dialect(
    input: &Dialect,
    target: &OutputArgs,
    keys: Vec<String>,
) -> Result<(Dialect, WriterOptions), Error> {
    let base = match target.to_preset {
        Some(preset) => preset.dialect(),
        None => Dialect::default()
            .separator(input.separator)
            .enclosure(input.enclosure)
            .escape(input.escape),
    };
    let overrides = TableConfig {
        separator: target.to_separator.as_deref().map(unescape_tab),
        enclosure: target.to_enclosure.clone(),
        escape_style: target.to_escape.map(EscapeStyle::from),
        ..TableConfig::default()
    };
    let mut dialect = overrides.apply(base)?;
    if target.to_header {
        dialect = dialect.header(true).keys(keys);
    }

    let options = WriterOptions {
        line_break: if target.crlf { "\r\n" } else { "\n" }.to_string(),
        null_token: target.null_token.clone(),
        lazy_wrap: !target.no_lazy_wrap,
        wrap_whitespace: target.wrap_whitespace,
    };
    Ok((dialect, options))
}

fn unescape_tab(value: &str) -> String {
    if value == "\\t" {
        "\t".to_string()
    } else {
        value.to_string()
    }
}
