//! CSV output for ranked tables and classification results.
//!
//! Ranked tables are written Spark-style: a directory holding a single part
//! file with a header row. A directory is always replaced as a whole, so a
//! rerun never leaves stale rows behind.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    category::Category,
    error::Result,
    output_dir::PART_FILE,
    rank::{MonthlyPivot, RankedKeyword},
};

const RANKED_HEADER: [&str; 4] = ["user_id", "keyword", "search_count", "rank"];

/// A row of a ranked-keyword CSV as read back from disk. The keyword may be
/// empty in files produced elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankedKeywordRecord {
    pub user_id: String,
    pub keyword: Option<String>,
    pub search_count: u64,
    pub rank: u32,
}

/// Remove `dir` and everything in it, then recreate it empty.
pub fn replace_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Write `rows` to `<dir>/part-00000.csv`, replacing `dir`.
pub fn write_ranked(dir: &Path, rows: &[RankedKeyword]) -> Result<PathBuf> {
    replace_dir(dir)?;
    let path = dir.join(PART_FILE);

    // The header is written explicitly so an empty table still has one.
    let mut writer =
        csv::WriterBuilder::new().has_headers(false).from_path(&path)?;
    writer.write_record(RANKED_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::debug!(
        path = %path.display(),
        rows = rows.len(),
        "wrote ranked table"
    );
    Ok(path)
}

/// Write the monthly pivot to `<dir>/part-00000.csv`, replacing `dir`.
///
/// Months without a keyword for a user are written as empty cells.
pub fn write_monthly(dir: &Path, pivot: &MonthlyPivot) -> Result<PathBuf> {
    replace_dir(dir)?;
    let path = dir.join(PART_FILE);

    let mut writer = csv::Writer::from_path(&path)?;
    let mut header = vec!["user_id".to_string()];
    header.extend(pivot.column_names());
    writer.write_record(&header)?;

    for row in &pivot.rows {
        let mut record = Vec::with_capacity(pivot.months.len() + 1);
        record.push(row.user_id.as_str());
        record.extend(
            pivot
                .months
                .iter()
                .map(|&m| row.keyword_for(m).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;

    tracing::debug!(
        path = %path.display(),
        rows = pivot.rows.len(),
        months = pivot.months.len(),
        "wrote monthly pivot"
    );
    Ok(path)
}

/// Write `keyword,category` rows in keyword order to `path`.
pub fn write_categories(
    path: &Path,
    categories: &BTreeMap<String, Category>,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["keyword", "category"])?;
    for (keyword, category) in categories {
        writer.write_record([keyword.as_str(), category.label()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a ranked-keyword CSV. Rows that do not parse are skipped.
pub fn read_ranked(path: &Path) -> Result<Vec<RankedKeywordRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.deserialize::<RankedKeywordRecord>() {
        match record {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                tracing::debug!(error = %err, "skipping unreadable row");
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped,
            "skipped unreadable rows"
        );
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::rank::MonthlyPivotRow;

    fn ranked(user: &str, keyword: &str, count: u64, rank: u32) -> RankedKeyword {
        RankedKeyword {
            user_id: user.to_string(),
            keyword: keyword.to_string(),
            search_count: count,
            rank,
        }
    }

    #[test]
    fn ranked_table_has_header_and_rows() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("top3_keywords");
        let rows = vec![ranked("u1", "vtv3", 5, 1), ranked("u1", "a, b", 4, 2)];

        let path = write_ranked(&dir, &rows).unwrap();

        assert_eq!(path, dir.join("part-00000.csv"));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "user_id,keyword,search_count,rank\nu1,vtv3,5,1\nu1,\"a, b\",4,2\n"
        );
    }

    #[test]
    fn empty_ranked_table_still_has_header() {
        let tmp = tempdir().unwrap();
        let path = write_ranked(&tmp.path().join("t"), &[]).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "user_id,keyword,search_count,rank\n"
        );
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("top1_keywords");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("part-00001-stale.csv"), "old").unwrap();

        let rows = vec![ranked("u1", "vtv3", 5, 1)];
        let first = fs::read(write_ranked(&dir, &rows).unwrap()).unwrap();
        let second = fs::read(write_ranked(&dir, &rows).unwrap()).unwrap();

        assert_eq!(first, second);
        let entries: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn monthly_pivot_leaves_missing_months_empty() {
        let tmp = tempdir().unwrap();
        let pivot = MonthlyPivot {
            months: vec![6, 7],
            rows: vec![
                MonthlyPivotRow {
                    user_id: "u1".into(),
                    top_keywords: BTreeMap::from([
                        (6, "running man".into()),
                        (7, "vtv3".into()),
                    ]),
                },
                MonthlyPivotRow {
                    user_id: "u2".into(),
                    top_keywords: BTreeMap::from([(6, "capdoi".into())]),
                },
            ],
        };

        let path = write_monthly(&tmp.path().join("m"), &pivot).unwrap();

        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "user_id,most_search_t6,most_search_t7\n\
             u1,running man,vtv3\n\
             u2,capdoi,\n"
        );
    }

    #[test]
    fn categories_are_written_in_keyword_order() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("keyword_classified.csv");
        let categories = BTreeMap::from([
            ("vtv3".to_string(), Category::TvChannel),
            ("conan".to_string(), Category::Animation),
            ("nhật ký".to_string(), Category::Drama),
        ]);

        write_categories(&path, &categories).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "keyword,category\nconan,Animation\nnhật ký,Drama\nvtv3,TV Channel\n"
        );
    }

    #[test]
    fn read_ranked_skips_bad_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("part-00000.csv");
        fs::write(
            &path,
            "user_id,keyword,search_count,rank\n\
             u1,vtv3,5,1\n\
             u2,,3,1\n\
             u3,conan,many,1\n\
             u4\n\
             u5,bigfoot,1,1\n",
        )
        .unwrap();

        let rows = read_ranked(&path).unwrap();

        let keywords: Vec<_> = rows.iter().map(|r| r.keyword.as_deref()).collect();
        assert_eq!(keywords, vec![Some("vtv3"), None, Some("bigfoot")]);
        assert_eq!(rows[0].search_count, 5);
    }

    #[test]
    fn written_table_reads_back() {
        let tmp = tempdir().unwrap();
        let rows = vec![ranked("u1", "vtv3", 5, 1), ranked("u2", "capdoi", 2, 1)];
        let path = write_ranked(&tmp.path().join("t"), &rows).unwrap();

        let read = read_ranked(&path).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].user_id, "u2");
        assert_eq!(read[1].keyword.as_deref(), Some("capdoi"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = tempdir().unwrap();
        assert!(read_ranked(&tmp.path().join("nope.csv")).is_err());
    }
}
