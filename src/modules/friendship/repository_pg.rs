use uuid::Uuid;

use crate::{
    api::error,
    modules::friendship::{
        repository::FriendshipRepository,
        schema::{FriendshipEntity, FriendshipStatus},
    },
    utils::ordered_pair,
};

#[derive(Clone)]
pub struct FriendshipRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendshipRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for FriendshipRepositoryPg {
    type Tx = sqlx::Transaction<'static, sqlx::Postgres>;

    async fn begin(&self) -> Result<Self::Tx, error::SystemError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), error::SystemError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), error::SystemError> {
        tx.rollback().await?;
        Ok(())
    }

    async fn lock_pair(
        &self,
        tx: &mut Self::Tx,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError> {
        let (u1, u2) = ordered_pair(user_id_a, user_id_b);

        // Held by every writer on the pair before it reads the pair
        sqlx::query(
            "SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text || ':' || $2::uuid::text, 0))",
        )
        .bind(u1)
        .bind(u2)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert(
        &self,
        tx: &mut Self::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
        status: FriendshipStatus,
    ) -> Result<FriendshipEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let friendship = sqlx::query_as::<_, FriendshipEntity>(
            r#"
            INSERT INTO friendships (id, from_user, to_user, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from_user)
        .bind(to_user)
        .bind(status)
        .fetch_one(&mut **tx)
        .await?;

        Ok(friendship)
    }

    async fn get_by_id(
        &self,
        tx: &mut Self::Tx,
        id: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        sqlx::query_as::<_, FriendshipEntity>("SELECT * FROM friendships WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friendship not found"))
    }

    async fn get_by_pair(
        &self,
        tx: &mut Self::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        sqlx::query_as::<_, FriendshipEntity>(
            "SELECT * FROM friendships WHERE from_user = $1 AND to_user = $2",
        )
        .bind(from_user)
        .bind(to_user)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| error::SystemError::not_found("Friendship not found"))
    }

    async fn list_by_user(
        &self,
        tx: &mut Self::Tx,
        user_id: &Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        let friendships = sqlx::query_as::<_, FriendshipEntity>(
            r#"
            SELECT *
            FROM friendships
            WHERE from_user = $1
               OR to_user = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(friendships)
    }

    async fn update_status(
        &self,
        tx: &mut Self::Tx,
        id: &Uuid,
        status: FriendshipStatus,
    ) -> Result<FriendshipEntity, error::SystemError> {
        sqlx::query_as::<_, FriendshipEntity>(
            r#"
            UPDATE friendships
            SET status = $2, updated_at = GREATEST(NOW(), updated_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| error::SystemError::not_found("Friendship not found"))
    }

    async fn delete(&self, tx: &mut Self::Tx, id: &Uuid) -> Result<(), error::SystemError> {
        let rows = sqlx::query("DELETE FROM friendships WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(error::SystemError::not_found("Friendship not found"));
        }

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        log::info!("Friendship repository pool closed");
    }
}
