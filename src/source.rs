use std::{
    fs::File,
    path::{Path, PathBuf},
};

use arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::cast,
    datatypes::{DataType, TimeUnit, TimestampMicrosecondType},
    record_batch::RecordBatch,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;

use crate::{
    error::{Error, Result},
    event::SearchEvent,
    walker,
};

pub const USER_ID_COLUMN: &str = "user_id";
pub const KEYWORD_COLUMN: &str = "keyword";
pub const DATETIME_COLUMN: &str = "datetime";

/// All search events found under a root directory.
#[derive(Debug, Default)]
pub struct EventTable {
    pub events: Vec<SearchEvent>,
    /// Number of files that were read.
    pub files: usize,
    /// Rows skipped because `user_id` or `datetime` was unusable.
    pub malformed: usize,
}

#[derive(Debug, Default)]
struct FileEvents {
    events: Vec<SearchEvent>,
    malformed: usize,
}

/// Discover every file matching `pattern` under `root` and load them as one
/// table of search events.
///
/// Files are decoded in parallel and concatenated in discovery order. Rows are
/// never deduplicated across files.
pub fn read_events(root: &Path, pattern: &str) -> Result<EventTable> {
    let matcher = walker::file_matcher(pattern)?;
    let files = if root.is_dir() {
        walker::discover_files(root, &matcher)?
    } else {
        Vec::new()
    };

    if files.is_empty() {
        return Err(Error::SourceNotFound {
            root: root.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }

    tracing::info!(
        files = files.len(),
        root = %root.display(),
        "found search log files"
    );

    let decoded: Vec<FileEvents> = files
        .par_iter()
        .map(|file| read_file(&file.absolute_path))
        .collect::<Result<_>>()?;

    let mut table = EventTable {
        files: files.len(),
        ..EventTable::default()
    };
    for file in decoded {
        table.malformed += file.malformed;
        table.events.extend(file.events);
    }

    tracing::info!(
        events = table.events.len(),
        malformed = table.malformed,
        "loaded search events"
    );

    Ok(table)
}

fn read_file(path: &Path) -> Result<FileEvents> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| schema_error(path, format!("not a parquet file: {e}")))?;

    let mut out = FileEvents::default();
    for batch in reader {
        decode_batch(path, &batch?, &mut out)?;
    }

    if out.malformed > 0 {
        tracing::warn!(
            file = %path.display(),
            skipped = out.malformed,
            "skipped rows with missing or unparseable user_id/datetime"
        );
    }
    tracing::debug!(
        file = %path.display(),
        rows = out.events.len(),
        "decoded file"
    );

    Ok(out)
}

fn decode_batch(
    path: &Path,
    batch: &RecordBatch,
    out: &mut FileEvents,
) -> Result<()> {
    let user_ids = as_utf8(column(path, batch, USER_ID_COLUMN)?)?;
    let keywords = as_utf8(column(path, batch, KEYWORD_COLUMN)?)?;
    let datetimes = cast(
        column(path, batch, DATETIME_COLUMN)?,
        &DataType::Timestamp(TimeUnit::Microsecond, None),
    )?;

    let user_ids = user_ids.as_string::<i32>();
    let keywords = keywords.as_string::<i32>();
    let datetimes = datetimes.as_primitive::<TimestampMicrosecondType>();

    for row in 0..batch.num_rows() {
        let datetime = if datetimes.is_null(row) {
            None
        } else {
            datetimes.value_as_datetime(row)
        };
        let user_id = (!user_ids.is_null(row))
            .then(|| user_ids.value(row))
            .filter(|id| !id.trim().is_empty());

        let (Some(user_id), Some(datetime)) = (user_id, datetime) else {
            out.malformed += 1;
            continue;
        };

        let keyword = (!keywords.is_null(row)).then(|| keywords.value(row));
        out.events.push(SearchEvent::new(user_id, keyword, datetime));
    }

    Ok(())
}

fn column<'a>(
    path: &Path,
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| schema_error(path, format!("missing column '{name}'")))
}

/// Normalize string-like and integer identifier columns to UTF-8. Values that
/// cannot be represented become null.
fn as_utf8(array: &ArrayRef) -> Result<ArrayRef> {
    Ok(cast(array, &DataType::Utf8)?)
}

fn schema_error(path: &Path, message: String) -> Error {
    Error::Schema {
        path: PathBuf::from(path),
        message,
    }
}
