use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friendship::{repository_mem::FriendshipRepositoryMem, schema::FriendshipStatus},
        friendship_stats::{model::FriendSuggestion, repository::FriendshipStatsRepository},
    },
};

/// Views over a [`FriendshipRepositoryMem`]. The accepted-friendships
/// projection is captured only by [`refresh_snapshot`], so snapshot queries
/// lag the table the same way the Postgres materialized view does.
///
/// [`refresh_snapshot`]: FriendshipStatsRepository::refresh_snapshot
#[derive(Clone)]
pub struct FriendshipStatsRepositoryMem {
    edges: FriendshipRepositoryMem,
    // (user_id, friend_id), one entry per direction
    snapshot: Arc<RwLock<BTreeSet<(Uuid, Uuid)>>>,
}

impl FriendshipStatsRepositoryMem {
    pub fn new(edges: FriendshipRepositoryMem) -> Self {
        Self { edges, snapshot: Arc::default() }
    }

    async fn snapshot_friends(&self, user_id: &Uuid) -> BTreeSet<Uuid> {
        self.snapshot
            .read()
            .await
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, friend)| *friend)
            .collect()
    }
}

#[async_trait::async_trait]
impl FriendshipStatsRepository for FriendshipStatsRepositoryMem {
    async fn count_friends(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let friends: BTreeSet<Uuid> = self
            .edges
            .committed_rows()
            .await
            .iter()
            .filter(|f| f.status == FriendshipStatus::Friends && f.touches(user_id))
            .map(|f| f.counterpart(user_id))
            .collect();

        Ok(friends.len() as i64)
    }

    async fn count_pending_received(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let count = self
            .edges
            .committed_rows()
            .await
            .iter()
            .filter(|f| f.status == FriendshipStatus::Pending && f.to_user == *user_id)
            .count();

        Ok(count as i64)
    }

    async fn count_mutual_friends(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<i64, error::SystemError> {
        Ok(self.list_mutual_friends(user_id_a, user_id_b).await?.len() as i64)
    }

    async fn list_mutual_friends(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let friends_a = self.snapshot_friends(user_id_a).await;
        let friends_b = self.snapshot_friends(user_id_b).await;

        Ok(friends_a.intersection(&friends_b).copied().collect())
    }

    async fn suggest_friends(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<FriendSuggestion>, error::SystemError> {
        let friends = self.snapshot_friends(user_id).await;
        let blocked: BTreeSet<Uuid> = self
            .edges
            .committed_rows()
            .await
            .iter()
            .filter(|f| f.status == FriendshipStatus::Blocked && f.touches(user_id))
            .map(|f| f.counterpart(user_id))
            .collect();

        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for (user, candidate) in self.snapshot.read().await.iter() {
            if friends.contains(user)
                && candidate != user_id
                && !friends.contains(candidate)
                && !blocked.contains(candidate)
            {
                *counts.entry(*candidate).or_default() += 1;
            }
        }

        let mut suggestions: Vec<FriendSuggestion> = counts
            .into_iter()
            .map(|(user_id, mutual_count)| FriendSuggestion { user_id, mutual_count })
            .collect();
        suggestions.sort_by(|x, y| {
            y.mutual_count.cmp(&x.mutual_count).then_with(|| x.user_id.cmp(&y.user_id))
        });
        suggestions.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(suggestions)
    }

    async fn refresh_snapshot(&self) -> Result<(), error::SystemError> {
        let accepted: BTreeSet<(Uuid, Uuid)> = self
            .edges
            .committed_rows()
            .await
            .iter()
            .filter(|f| f.status == FriendshipStatus::Friends)
            .flat_map(|f| [(f.from_user, f.to_user), (f.to_user, f.from_user)])
            .collect();

        *self.snapshot.write().await = accepted;
        Ok(())
    }
}
