//! Diary storage collaborator

use chrono::NaiveDate;
use tracing::debug;

use crate::db::Database;
use crate::error::CoreResult;
use crate::models::DailyDiary;

pub trait DiaryStore: Send + Sync {
    fn get_diary_for_date(&self, user_id: &str, date: NaiveDate) -> CoreResult<Option<DailyDiary>>;

    /// Create or replace the diary for its (user, date); returns what was stored
    fn upsert_diary(&self, diary: &DailyDiary) -> CoreResult<DailyDiary>;
}

impl DiaryStore for Database {
    fn get_diary_for_date(&self, user_id: &str, date: NaiveDate) -> CoreResult<Option<DailyDiary>> {
        Ok(self.with_conn(|conn| DailyDiary::get_for_date(conn, user_id, date))?)
    }

    fn upsert_diary(&self, diary: &DailyDiary) -> CoreResult<DailyDiary> {
        debug!(
            user_id = %diary.user_id,
            date = %diary.date,
            entries = diary.meals.entry_count(),
            "Writing diary"
        );
        Ok(self.with_conn_mut(|conn| DailyDiary::upsert(conn, diary))?)
    }
}
