//! Spreadsheet ingestion with format, encoding and delimiter auto-detection.
//!
//! Turns an uploaded file into a [`Sheet`]: a header row plus data [`Row`]s
//! that keep their original sheet row numbers. No business rules here.
//!
//! - Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`): first worksheet via calamine
//! - Everything else: CSV, encoding via chardet, delimiter from the header line

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

use crate::error::{IngestError, IngestResult};
use crate::models::Row;

/// Title rows above the header line in the manufacturer export.
pub const DEFAULT_SKIP_ROWS: usize = 2;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Options for reading a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOptions {
    /// Rows to skip before the header row.
    pub skip_rows: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            skip_rows: DEFAULT_SKIP_ROWS,
        }
    }
}

/// Source format of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    Csv,
    Workbook,
}

/// A parsed sheet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub format: SheetFormat,
    /// Detected encoding (CSV only).
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only).
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Sheet metadata without the rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub format: SheetFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl Sheet {
    pub fn info(&self) -> SheetInfo {
        SheetInfo {
            format: self.format,
            encoding: self.encoding.clone(),
            delimiter: self.delimiter.map(format_delimiter),
            headers: self.headers.clone(),
            row_count: self.rows.len(),
        }
    }
}

/// Printable form of a delimiter.
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Pick the reader from the file extension, or from the magic bytes when the
/// name gives no hint (ZIP container or OLE compound file means workbook).
pub fn detect_format(bytes: &[u8], file_name: Option<&str>) -> SheetFormat {
    let extension = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => SheetFormat::Workbook,
        Some(_) => SheetFormat::Csv,
        None if bytes.starts_with(b"PK\x03\x04")
            || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) =>
        {
            SheetFormat::Workbook
        }
        None => SheetFormat::Csv,
    }
}

/// Detect the encoding of raw bytes. Valid UTF-8 wins, otherwise chardet decides.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> IngestResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                return Err(IngestError::Encoding {
                    encoding: encoding.to_string(),
                    message: e.to_string(),
                })
            }
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // Unknown charset: best effort
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences on the header line: the
/// first non-blank line after `skip_rows` source lines.
pub fn detect_delimiter(content: &str, skip_rows: usize) -> char {
    let non_blank = |l: &&str| !l.trim().is_empty();
    let header_line = content
        .lines()
        .skip(skip_rows)
        .find(non_blank)
        .or_else(|| content.lines().find(non_blank))
        .unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = header_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// Readers
// =============================================================================

/// One raw record with the source row it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// 1-based line (CSV) or row (workbook) number.
    pub line: usize,
    pub cells: Vec<String>,
}

impl SourceRecord {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Read CSV text into raw records.
///
/// Empty lines produce no record, and a quoted cell may span several lines,
/// so each record keeps the source line it starts on.
pub fn read_csv_records(content: &str, delimiter: char) -> IngestResult<Vec<SourceRecord>> {
    let delimiter = u8::try_from(delimiter).map_err(|_| IngestError::Csv {
        line: 0,
        message: format!("delimiter '{}' is not a single byte", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let bytes = content.as_bytes();
    let mut counted_to = 0usize;
    let mut line = 1usize;

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;

        // The reported offset may sit on line breaks skipped before the record
        let mut start = record
            .position()
            .map(|p| p.byte() as usize)
            .unwrap_or(counted_to)
            .clamp(counted_to, bytes.len());
        while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
            start += 1;
        }
        line += bytes[counted_to..start].iter().filter(|&&b| b == b'\n').count();
        counted_to = start;

        records.push(SourceRecord::new(
            line,
            record.iter().map(str::to_string).collect(),
        ));
    }
    Ok(records)
}

/// Read the first worksheet of a workbook into raw records.
///
/// Row numbers and column positions match what the user sees in the
/// spreadsheet application, including leading empty rows and columns.
pub fn read_workbook_records(bytes: &[u8]) -> IngestResult<Vec<SourceRecord>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::EmptyFile)??;

    let (first_row, first_col) = range.start().unwrap_or((0, 0));

    let records = range
        .rows()
        .enumerate()
        .map(|(offset, row)| {
            let mut cells = vec![String::new(); first_col as usize];
            cells.extend(row.iter().map(cell_text));
            SourceRecord::new(first_row as usize + offset + 1, cells)
        })
        .collect();
    Ok(records)
}

/// Text of a workbook cell. Integral floats lose their `.0`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Float(n) => n.to_string(),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        other => other.to_string(),
    }
}

/// Split raw records into header row and data rows.
///
/// The first `skip_rows` source rows are title rows. The first non-blank
/// record after them is the header; the rest become rows carrying their
/// source row number. Entirely blank rows are skipped.
pub fn build_sheet(
    records: Vec<SourceRecord>,
    options: IngestOptions,
    format: SheetFormat,
) -> IngestResult<Sheet> {
    if records.iter().all(SourceRecord::is_blank) {
        return Err(IngestError::EmptyFile);
    }

    let mut iter = records
        .into_iter()
        .skip_while(|r| r.line <= options.skip_rows || r.is_blank());
    let header_record = iter.next().ok_or(IngestError::NoHeaders {
        skipped: options.skip_rows,
    })?;
    let headers: Vec<String> = header_record
        .cells
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rows = iter
        .map(|r| Row::new(r.line, r.cells))
        .filter(|row| !row.is_blank())
        .collect();

    Ok(Sheet {
        format,
        encoding: None,
        delimiter: None,
        headers,
        rows,
    })
}

/// Parse CSV text with an explicit delimiter.
pub fn parse_csv_str(content: &str, delimiter: char, options: IngestOptions) -> IngestResult<Sheet> {
    let records = read_csv_records(content, delimiter)?;
    let mut sheet = build_sheet(records, options, SheetFormat::Csv)?;
    sheet.delimiter = Some(delimiter);
    Ok(sheet)
}

/// Parse bytes, auto-detecting format, encoding and delimiter.
///
/// # Example
/// ```ignore
/// let sheet = parse_bytes_auto(&bytes, Some("export.xlsx"), IngestOptions::default())?;
/// println!("{} rows, headers: {}", sheet.rows.len(), sheet.headers.join(", "));
/// ```
pub fn parse_bytes_auto(
    bytes: &[u8],
    file_name: Option<&str>,
    options: IngestOptions,
) -> IngestResult<Sheet> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    match detect_format(bytes, file_name) {
        SheetFormat::Workbook => {
            let records = read_workbook_records(bytes)?;
            build_sheet(records, options, SheetFormat::Workbook)
        }
        SheetFormat::Csv => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding)?;
            let delimiter = detect_delimiter(&content, options.skip_rows);
            let mut sheet = parse_csv_str(&content, delimiter, options)?;
            sheet.encoding = Some(encoding);
            Ok(sheet)
        }
    }
}

/// Parse a file, auto-detecting format, encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P, options: IngestOptions) -> IngestResult<Sheet> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    parse_bytes_auto(&bytes, file_name, options)
}
