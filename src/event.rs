use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// One row of the search log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEvent {
    pub user_id: String,
    /// Raw keyword as logged. Null and blank keywords are kept here and
    /// excluded at aggregation time.
    pub keyword: Option<String>,
    pub datetime: NaiveDateTime,
}

impl SearchEvent {
    pub fn new(
        user_id: impl Into<String>,
        keyword: Option<&str>,
        datetime: NaiveDateTime,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            keyword: keyword.map(str::to_string),
            datetime,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    /// Calendar month of the event date, 1-12.
    pub fn month(&self) -> u32 {
        self.date().month()
    }

    /// The keyword if it counts toward rankings, i.e. is neither null nor
    /// blank.
    pub fn search_keyword(&self) -> Option<&str> {
        self.keyword.as_deref().filter(|k| !k.trim().is_empty())
    }
}
