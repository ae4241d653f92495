//! Per-partition keyword counting and ranking.
//!
//! Every ranking here follows the same rule: inside a partition, keywords are
//! ordered by `search_count` descending, then by keyword ascending (byte-wise),
//! and receive consecutive ranks starting at 1. Tied counts therefore still get
//! distinct ranks, and the order is reproducible across runs.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
    hash::Hash,
};

use serde::{Deserialize, Serialize};

use crate::event::SearchEvent;

/// Default number of keywords kept per user.
pub const DEFAULT_TOP_K: usize = 3;

/// A keyword with its count and position within one user's partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub user_id: String,
    pub keyword: String,
    pub search_count: u64,
    pub rank: u32,
}

/// A keyword ranked within one (user, month) partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRankedKeyword {
    pub user_id: String,
    pub month: u32,
    pub keyword: String,
    pub search_count: u64,
    pub rank: u32,
}

/// Which months become columns of the monthly pivot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MonthSelection {
    /// Every distinct month present in the data, ascending.
    #[default]
    Observed,
    /// Exactly these months, in this order. Other months are dropped.
    Fixed(Vec<u32>),
}

/// One user's top keyword per month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyPivotRow {
    pub user_id: String,
    pub top_keywords: BTreeMap<u32, String>,
}

impl MonthlyPivotRow {
    pub fn keyword_for(&self, month: u32) -> Option<&str> {
        self.top_keywords.get(&month).map(String::as_str)
    }
}

/// Wide table: one row per user, one `most_search_t<month>` column per month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyPivot {
    pub months: Vec<u32>,
    pub rows: Vec<MonthlyPivotRow>,
}

impl MonthlyPivot {
    pub fn column_names(&self) -> Vec<String> {
        self.months.iter().map(|&m| month_column(m)).collect()
    }

    pub fn row(&self, user_id: &str) -> Option<&MonthlyPivotRow> {
        self.rows.iter().find(|r| r.user_id == user_id)
    }
}

pub fn month_column(month: u32) -> String {
    format!("most_search_t{month}")
}

/// Rank every keyword of every user without any cut-off.
///
/// Output order: `search_count` descending, then `user_id`, then `rank`.
pub fn rank_keywords_per_user(events: &[SearchEvent]) -> Vec<RankedKeyword> {
    ranked_per_user(events, usize::MAX)
}

/// The `k` most searched keywords of each user.
///
/// Users with fewer than `k` distinct keywords get fewer rows. Output is
/// ordered for presentation only: `search_count` descending, then `user_id`,
/// then `rank`.
pub fn top_k_per_user(events: &[SearchEvent], k: usize) -> Vec<RankedKeyword> {
    ranked_per_user(events, k)
}

/// Rows holding each user's single most searched keyword, order preserved.
pub fn top1_view(ranked: &[RankedKeyword]) -> Vec<RankedKeyword> {
    ranked.iter().filter(|r| r.rank == 1).cloned().collect()
}

fn ranked_per_user(events: &[SearchEvent], k: usize) -> Vec<RankedKeyword> {
    let partitions = count_by(events, |e| e.user_id.as_str());

    let mut ranked: Vec<RankedKeyword> = partitions
        .into_iter()
        .flat_map(|(user_id, counts)| {
            order_partition(counts).into_iter().take(k).enumerate().map(
                move |(index, (keyword, search_count))| RankedKeyword {
                    user_id: user_id.to_string(),
                    keyword: keyword.to_string(),
                    search_count,
                    rank: row_number(index),
                },
            )
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.search_count
            .cmp(&a.search_count)
            .then_with(|| a.user_id.cmp(&b.user_id))
            .then_with(|| a.rank.cmp(&b.rank))
    });
    ranked
}

/// Rank every keyword within each (user, month) partition.
///
/// Output order: `user_id`, `month`, `rank`.
pub fn rank_keywords_per_user_month(
    events: &[SearchEvent],
) -> Vec<MonthlyRankedKeyword> {
    let partitions = count_by(events, |e| (e.user_id.as_str(), e.month()));

    let mut ranked: Vec<MonthlyRankedKeyword> = partitions
        .into_iter()
        .flat_map(|((user_id, month), counts)| {
            order_partition(counts).into_iter().enumerate().map(
                move |(index, (keyword, search_count))| MonthlyRankedKeyword {
                    user_id: user_id.to_string(),
                    month,
                    keyword: keyword.to_string(),
                    search_count,
                    rank: row_number(index),
                },
            )
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.user_id
            .cmp(&b.user_id)
            .then(a.month.cmp(&b.month))
            .then(a.rank.cmp(&b.rank))
    });
    ranked
}

/// The rank-1 keyword of every (user, month) partition.
pub fn monthly_top_keywords(
    events: &[SearchEvent],
) -> Vec<MonthlyRankedKeyword> {
    rank_keywords_per_user_month(events)
        .into_iter()
        .filter(|r| r.rank == 1)
        .collect()
}

/// Each user's top keyword per month, pivoted into one row per user.
///
/// Every user with at least one counted event gets a row, even when none of
/// their months is selected. Rows are ordered by `user_id`.
pub fn top_keyword_by_month(
    events: &[SearchEvent],
    selection: &MonthSelection,
) -> MonthlyPivot {
    let top = monthly_top_keywords(events);

    let months: Vec<u32> = match selection {
        MonthSelection::Observed => top
            .iter()
            .map(|r| r.month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        MonthSelection::Fixed(list) => {
            let mut seen = BTreeSet::new();
            list.iter().copied().filter(|m| seen.insert(*m)).collect()
        }
    };

    let mut cells: BTreeMap<&str, BTreeMap<u32, String>> = BTreeMap::new();
    for entry in &top {
        let row = cells.entry(entry.user_id.as_str()).or_default();
        if months.contains(&entry.month) {
            row.insert(entry.month, entry.keyword.clone());
        }
    }

    let rows = cells
        .into_iter()
        .map(|(user_id, top_keywords)| MonthlyPivotRow {
            user_id: user_id.to_string(),
            top_keywords,
        })
        .collect();

    MonthlyPivot { months, rows }
}

/// Count non-blank keywords per partition key.
fn count_by<'a, K, F>(
    events: &'a [SearchEvent],
    key: F,
) -> HashMap<K, HashMap<&'a str, u64>>
where
    K: Eq + Hash,
    F: Fn(&'a SearchEvent) -> K,
{
    let mut partitions: HashMap<K, HashMap<&'a str, u64>> = HashMap::new();
    for event in events {
        let Some(keyword) = event.search_keyword() else {
            continue;
        };
        *partitions
            .entry(key(event))
            .or_default()
            .entry(keyword)
            .or_insert(0) += 1;
    }
    partitions
}

fn order_partition(counts: HashMap<&str, u64>) -> Vec<(&str, u64)> {
    let mut ordered: Vec<(&str, u64)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| by_count_then_keyword(*a, *b));
    ordered
}

/// 1-based rank for a 0-based position, saturating at `u32::MAX`.
fn row_number(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
}

fn by_count_then_keyword(a: (&str, u64), b: (&str, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn on(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, month, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn searches(
        user: &str,
        keyword: Option<&str>,
        month: u32,
        times: usize,
    ) -> Vec<SearchEvent> {
        (0..times)
            .map(|i| SearchEvent::new(user, keyword, on(month, 1 + i as u32)))
            .collect()
    }

    fn sample_log() -> Vec<SearchEvent> {
        [
            searches("u1", Some("running man"), 6, 4),
            searches("u1", Some("vtv3"), 6, 2),
            searches("u1", Some("vtv3"), 7, 3),
            searches("u1", Some("conan"), 7, 1),
            searches("u1", Some("bigfoot"), 7, 1),
            searches("u1", None, 6, 5),
            searches("u1", Some("  "), 7, 5),
            searches("u2", Some("capdoi"), 6, 2),
            searches("u2", Some("nhat ky"), 6, 1),
            searches("u3", Some("argen"), 7, 1),
        ]
        .concat()
    }

    fn rows_for<'a>(
        ranked: &'a [RankedKeyword],
        user: &str,
    ) -> Vec<&'a RankedKeyword> {
        let mut rows: Vec<_> =
            ranked.iter().filter(|r| r.user_id == user).collect();
        rows.sort_by_key(|r| r.rank);
        rows
    }

    #[test]
    fn counts_sum_to_non_blank_events_per_user() {
        let log = sample_log();
        let ranked = rank_keywords_per_user(&log);

        for user in ["u1", "u2", "u3"] {
            let expected = log
                .iter()
                .filter(|e| e.user_id == user && e.search_keyword().is_some())
                .count() as u64;
            let total: u64 = rows_for(&ranked, user)
                .iter()
                .map(|r| r.search_count)
                .sum();
            assert_eq!(total, expected, "user {user}");
        }
    }

    #[test]
    fn counts_sum_to_non_blank_events_per_user_month() {
        let log = sample_log();
        let ranked = rank_keywords_per_user_month(&log);

        for (user, month) in [("u1", 6), ("u1", 7), ("u2", 6), ("u3", 7)] {
            let expected = log
                .iter()
                .filter(|e| {
                    e.user_id == user
                        && e.month() == month
                        && e.search_keyword().is_some()
                })
                .count() as u64;
            let total: u64 = ranked
                .iter()
                .filter(|r| r.user_id == user && r.month == month)
                .map(|r| r.search_count)
                .sum();
            assert_eq!(total, expected, "partition ({user}, {month})");
        }
    }

    #[test]
    fn ranks_are_consecutive_from_one() {
        let log = sample_log();
        let ranked = rank_keywords_per_user(&log);

        let u1: Vec<(&str, u32)> = rows_for(&ranked, "u1")
            .iter()
            .map(|r| (r.keyword.as_str(), r.rank))
            .collect();
        assert_eq!(
            u1,
            vec![("vtv3", 1), ("running man", 2), ("bigfoot", 3), ("conan", 4)]
        );

        let monthly = rank_keywords_per_user_month(&log);
        let u1_july: Vec<u32> = monthly
            .iter()
            .filter(|r| r.user_id == "u1" && r.month == 7)
            .map(|r| r.rank)
            .collect();
        assert_eq!(u1_july, vec![1, 2, 3]);
    }

    #[test]
    fn top_three_caps_rows_per_user() {
        let ranked = top_k_per_user(&sample_log(), 3);

        let u1 = rows_for(&ranked, "u1");
        assert_eq!(u1.len(), 3);
        assert_eq!(u1[0].keyword, "vtv3");
        assert_eq!(u1[0].search_count, 5);
        assert_eq!(u1[1].keyword, "running man");
        assert_eq!(u1[1].search_count, 4);
        assert_eq!(u1[2].keyword, "bigfoot");

        // Exactly two distinct keywords: two rows, no padding.
        assert_eq!(rows_for(&ranked, "u2").len(), 2);
        assert_eq!(rows_for(&ranked, "u3").len(), 1);
    }

    #[test]
    fn vtv3_outranks_running_man_on_total_count() {
        let ranked = top_k_per_user(&sample_log(), 1);
        let u1 = rows_for(&ranked, "u1");
        assert_eq!(u1.len(), 1);
        // vtv3 appears 5 times across both months, running man 4.
        assert_eq!(u1[0].keyword, "vtv3");
    }

    #[test]
    fn ties_break_on_keyword_ascending() {
        let log = [
            searches("u1", Some("zebra"), 6, 2),
            searches("u1", Some("apple"), 6, 2),
            searches("u1", Some("mango"), 6, 2),
        ]
        .concat();

        let ranked = top_k_per_user(&log, 3);
        let keywords: Vec<&str> =
            ranked.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["apple", "mango", "zebra"]);
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn presentation_order_is_count_descending() {
        let ranked = top_k_per_user(&sample_log(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].search_count >= pair[1].search_count);
        }
    }

    #[test]
    fn zero_k_yields_nothing() {
        assert!(top_k_per_user(&sample_log(), 0).is_empty());
    }

    #[test]
    fn only_blank_keywords_yield_no_rows() {
        let log = [searches("u9", None, 6, 3), searches("u9", Some(""), 6, 1)]
            .concat();
        assert!(top_k_per_user(&log, 3).is_empty());
        let pivot = top_keyword_by_month(&log, &MonthSelection::Observed);
        assert!(pivot.rows.is_empty());
        assert!(pivot.months.is_empty());
    }

    #[test]
    fn top1_view_keeps_rank_one_rows() {
        let top3 = top_k_per_user(&sample_log(), 3);
        let top1 = top1_view(&top3);

        assert_eq!(top1.len(), 3);
        assert!(top1.iter().all(|r| r.rank == 1));
        assert_eq!(top1, top_k_per_user(&sample_log(), 1));
    }

    #[test]
    fn pivot_leaves_inactive_months_empty() {
        let pivot =
            top_keyword_by_month(&sample_log(), &MonthSelection::Observed);

        assert_eq!(pivot.months, vec![6, 7]);
        assert_eq!(
            pivot.column_names(),
            vec!["most_search_t6", "most_search_t7"]
        );

        let u1 = pivot.row("u1").unwrap();
        assert_eq!(u1.keyword_for(6), Some("running man"));
        assert_eq!(u1.keyword_for(7), Some("vtv3"));

        let u2 = pivot.row("u2").unwrap();
        assert_eq!(u2.keyword_for(6), Some("capdoi"));
        assert_eq!(u2.keyword_for(7), None);

        let u3 = pivot.row("u3").unwrap();
        assert_eq!(u3.keyword_for(6), None);
        assert_eq!(u3.keyword_for(7), Some("argen"));

        let users: Vec<&str> =
            pivot.rows.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn fixed_months_restrict_columns() {
        let mut log = sample_log();
        log.extend(searches("u4", Some("euro"), 5, 2));

        let pivot =
            top_keyword_by_month(&log, &MonthSelection::Fixed(vec![7, 6, 7]));

        assert_eq!(pivot.months, vec![7, 6]);
        assert_eq!(
            pivot.column_names(),
            vec!["most_search_t7", "most_search_t6"]
        );
        // Active only in May: a row, but no cells.
        let u4 = pivot.row("u4").unwrap();
        assert!(u4.top_keywords.is_empty());
    }

    #[test]
    fn observed_months_include_every_month_found() {
        let mut log = sample_log();
        log.extend(searches("u4", Some("euro"), 5, 2));

        let pivot = top_keyword_by_month(&log, &MonthSelection::Observed);
        assert_eq!(pivot.months, vec![5, 6, 7]);
        assert_eq!(pivot.row("u4").unwrap().keyword_for(5), Some("euro"));
    }

    #[test]
    fn rankings_are_idempotent() {
        let log = sample_log();
        let mut reversed = log.clone();
        reversed.reverse();

        assert_eq!(top_k_per_user(&log, 3), top_k_per_user(&log, 3));
        assert_eq!(top_k_per_user(&log, 3), top_k_per_user(&reversed, 3));
        assert_eq!(
            top_keyword_by_month(&log, &MonthSelection::Observed),
            top_keyword_by_month(&reversed, &MonthSelection::Observed)
        );
    }

    #[test]
    fn rank_saturates_instead_of_wrapping() {
        assert_eq!(row_number(0), 1);
        assert_eq!(row_number(41), 42);
        assert_eq!(row_number(u32::MAX as usize - 1), u32::MAX);
        assert_eq!(row_number(u32::MAX as usize), u32::MAX);
        assert_eq!(row_number(usize::MAX), u32::MAX);
    }
}
