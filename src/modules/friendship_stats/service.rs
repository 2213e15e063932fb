use log::debug;
use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    api::error,
    modules::friendship_stats::{
        model::{Consistency, FriendSuggestion, Viewed},
        repository::FriendshipStatsRepository,
    },
};

pub const MAX_SUGGESTIONS: i64 = 100;

/// Aggregate views. Every result carries the consistency it was read with:
/// live counts see all committed edges, snapshot queries see the projection
/// as of its last refresh. Engine writes never trigger a refresh.
#[derive(Clone)]
pub struct FriendshipStatsService<S>
where
    S: FriendshipStatsRepository,
{
    stats_repo: Arc<S>,
    refresh_interval: Duration,
}

impl<S> FriendshipStatsService<S>
where
    S: FriendshipStatsRepository,
{
    /// `refresh_interval` is the period of the external refresh job, usually
    /// `ENV.snapshot_refresh_interval`.
    pub fn with_dependencies(stats_repo: Arc<S>, refresh_interval: Duration) -> Self {
        FriendshipStatsService { stats_repo, refresh_interval }
    }

    fn live<T: serde::Serialize>(data: T) -> Viewed<T> {
        Viewed { data, consistency: Consistency::Live }
    }

    fn snapshot<T: serde::Serialize>(&self, data: T) -> Viewed<T> {
        Viewed { data, consistency: Consistency::Snapshot { max_staleness: self.refresh_interval } }
    }

    pub async fn count_friends(&self, user_id: Uuid) -> Result<Viewed<i64>, error::SystemError> {
        let count = self.stats_repo.count_friends(&user_id).await?;
        Ok(Self::live(count))
    }

    pub async fn count_pending_received(
        &self,
        user_id: Uuid,
    ) -> Result<Viewed<i64>, error::SystemError> {
        let count = self.stats_repo.count_pending_received(&user_id).await?;
        Ok(Self::live(count))
    }

    pub async fn count_mutual_friends(
        &self,
        user_id_a: Uuid,
        user_id_b: Uuid,
    ) -> Result<Viewed<i64>, error::SystemError> {
        let count = self.stats_repo.count_mutual_friends(&user_id_a, &user_id_b).await?;
        Ok(self.snapshot(count))
    }

    pub async fn list_mutual_friends(
        &self,
        user_id_a: Uuid,
        user_id_b: Uuid,
    ) -> Result<Viewed<Vec<Uuid>>, error::SystemError> {
        let mutuals = self.stats_repo.list_mutual_friends(&user_id_a, &user_id_b).await?;
        Ok(self.snapshot(mutuals))
    }

    pub async fn suggest_friends(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Viewed<Vec<FriendSuggestion>>, error::SystemError> {
        if !(1..=MAX_SUGGESTIONS).contains(&limit) {
            return Err(error::SystemError::bad_request(format!(
                "Limit must be between 1 and {MAX_SUGGESTIONS}"
            )));
        }

        let suggestions = self.stats_repo.suggest_friends(&user_id, limit).await?;
        Ok(self.snapshot(suggestions))
    }

    /// Entry point for the scheduled refresh job.
    pub async fn refresh_snapshot(&self) -> Result<(), error::SystemError> {
        self.stats_repo.refresh_snapshot().await?;
        debug!("Accepted friendships snapshot refreshed");
        Ok(())
    }
}
