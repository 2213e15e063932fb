use uuid::Uuid;

use crate::{
    api::error,
    modules::friendship_stats::{model::FriendSuggestion, repository::FriendshipStatsRepository},
};

#[derive(Clone)]
pub struct FriendshipStatsRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendshipStatsRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendshipStatsRepository for FriendshipStatsRepositoryPg {
    async fn count_friends(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        // A friendship is two rows; count the counterpart once
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT CASE WHEN from_user = $1 THEN to_user ELSE from_user END)
            FROM friendships
            WHERE (from_user = $1 OR to_user = $1)
              AND status = 'friends'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_pending_received(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM friendships WHERE to_user = $1 AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_mutual_friends(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<i64, error::SystemError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM accepted_friendships_mv a
            JOIN accepted_friendships_mv b
                ON b.friend_id = a.friend_id
            WHERE a.user_id = $1
              AND b.user_id = $2
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_mutual_friends(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let mutuals = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT a.friend_id
            FROM accepted_friendships_mv a
            JOIN accepted_friendships_mv b
                ON b.friend_id = a.friend_id
            WHERE a.user_id = $1
              AND b.user_id = $2
            ORDER BY a.friend_id
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .fetch_all(&self.pool)
        .await?;

        Ok(mutuals)
    }

    async fn suggest_friends(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<FriendSuggestion>, error::SystemError> {
        let suggestions = sqlx::query_as::<_, FriendSuggestion>(
            r#"
            SELECT
                f2.friend_id AS user_id,
                COUNT(*) AS mutual_count
            FROM accepted_friendships_mv f1
            JOIN accepted_friendships_mv f2
                ON f2.user_id = f1.friend_id
            WHERE f1.user_id = $1
              AND f2.friend_id <> $1
              AND NOT EXISTS (
                SELECT 1
                FROM accepted_friendships_mv known
                WHERE known.user_id = $1
                  AND known.friend_id = f2.friend_id
              )
              AND NOT EXISTS (
                SELECT 1
                FROM friendships b
                WHERE b.status = 'blocked'
                  AND ((b.from_user = $1 AND b.to_user = f2.friend_id)
                    OR (b.from_user = f2.friend_id AND b.to_user = $1))
              )
            GROUP BY f2.friend_id
            ORDER BY mutual_count DESC, user_id
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(suggestions)
    }

    async fn refresh_snapshot(&self) -> Result<(), error::SystemError> {
        sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY accepted_friendships_mv")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
