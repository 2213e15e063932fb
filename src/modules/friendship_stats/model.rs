use std::time::Duration;

use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// How current a view result is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Consistency {
    /// Reflects every edge committed at query time.
    Live,
    /// Read from the refreshed projection; edges written after the last
    /// refresh are missing, for at most `max_staleness`.
    Snapshot { max_staleness: Duration },
}

#[derive(Debug, Clone, Serialize)]
pub struct Viewed<T: Serialize> {
    pub data: T,
    pub consistency: Consistency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct FriendSuggestion {
    pub user_id: Uuid,
    pub mutual_count: i64,
}
