//! CSV column readers shared by the annotation loaders.

use std::io::Read;
use std::str::FromStr;

use crate::error::LoadError;

/// Open a CSV reader over `reader`, expecting a header row.
pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Position of `column` in the header row, if present.
pub(crate) fn column_index<R: Read>(
    reader: &mut csv::Reader<R>,
    column: &str,
) -> Result<Option<usize>, LoadError> {
    Ok(reader.headers()?.iter().position(|h| h == column))
}

/// Position of `column` in the header row.
///
/// Fails with [`LoadError::MissingColumn`] if the header lacks it.
pub(crate) fn require_column<R: Read>(
    reader: &mut csv::Reader<R>,
    column: &str,
) -> Result<usize, LoadError> {
    column_index(reader, column)?.ok_or_else(|| LoadError::MissingColumn(column.to_string()))
}

/// Read every value of `column`, parsing each field with `parse`.
///
/// Fails with [`LoadError::MissingColumn`] if the header lacks `column` and
/// with [`LoadError::InvalidValue`] on the first field `parse` rejects.
pub(crate) fn read_column<R, T, F>(reader: R, column: &str, parse: F) -> Result<Vec<T>, LoadError>
where
    R: Read,
    F: Fn(&str) -> Option<T>,
{
    let mut reader = csv_reader(reader);
    let idx = require_column(&mut reader, column)?;

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = record.get(idx).unwrap_or("");
        let value = parse(field).ok_or_else(|| LoadError::InvalidValue {
            column: column.to_string(),
            row,
            value: field.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Parse field `idx` of `record`, reporting `column` and `row` on failure.
pub(crate) fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    row: usize,
) -> Result<T, LoadError> {
    let value = record.get(idx).unwrap_or("");
    value.parse().map_err(|_| LoadError::InvalidValue {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

#[inline]
pub(crate) fn parse_usize(field: &str) -> Option<usize> {
    field.trim().parse().ok()
}
