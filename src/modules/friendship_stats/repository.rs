use uuid::Uuid;

use crate::api::error;
use crate::modules::friendship_stats::model::FriendSuggestion;

/// Count and summary queries. Reads here run outside engine transactions.
#[async_trait::async_trait]
pub trait FriendshipStatsRepository: Send + Sync {
    // Live, against the edge table

    async fn count_friends(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;

    async fn count_pending_received(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;

    // Snapshot, against the accepted-friendships projection

    async fn count_mutual_friends(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<i64, error::SystemError>;

    async fn list_mutual_friends(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    /// Friends of friends, excluding existing friends and blocked pairs.
    async fn suggest_friends(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<FriendSuggestion>, error::SystemError>;

    async fn refresh_snapshot(&self) -> Result<(), error::SystemError>;
}
