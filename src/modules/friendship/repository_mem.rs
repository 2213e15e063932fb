use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    api::error,
    modules::friendship::{
        repository::FriendshipRepository,
        schema::{FriendshipEntity, FriendshipStatus},
    },
};

const PAIR_CONSTRAINT: &str = "friendships_from_user_to_user_key";

#[derive(Debug, Clone, Default)]
struct FriendshipTable {
    // Keyed by id, which gives list scans their id ordering
    rows: BTreeMap<Uuid, FriendshipEntity>,
}

/// In-process edge store. Transactions are serialized: each one holds the
/// table lock and works on a staged copy that replaces the table on commit.
#[derive(Clone, Default)]
pub struct FriendshipRepositoryMem {
    table: Arc<Mutex<FriendshipTable>>,
}

pub struct MemTx {
    guard: OwnedMutexGuard<FriendshipTable>,
    staged: FriendshipTable,
}

impl FriendshipRepositoryMem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows, ordered by id.
    pub async fn committed_rows(&self) -> Vec<FriendshipEntity> {
        self.table.lock().await.rows.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for FriendshipRepositoryMem {
    type Tx = MemTx;

    async fn begin(&self) -> Result<Self::Tx, error::SystemError> {
        let guard = self.table.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(MemTx { guard, staged })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), error::SystemError> {
        let MemTx { mut guard, staged } = tx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), error::SystemError> {
        drop(tx);
        Ok(())
    }

    async fn lock_pair(
        &self,
        _tx: &mut Self::Tx,
        _user_id_a: &Uuid,
        _user_id_b: &Uuid,
    ) -> Result<(), error::SystemError> {
        // The transaction already owns the whole table
        Ok(())
    }

    async fn insert(
        &self,
        tx: &mut Self::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
        status: FriendshipStatus,
    ) -> Result<FriendshipEntity, error::SystemError> {
        let duplicate = tx
            .staged
            .rows
            .values()
            .any(|f| f.from_user == *from_user && f.to_user == *to_user);
        if duplicate {
            return Err(error::SystemError::ConstraintViolation(error::DbErrorMeta {
                code: Some("23505".to_string()),
                constraint: Some(PAIR_CONSTRAINT.to_string()),
                message: format!("duplicate key value violates unique constraint \"{PAIR_CONSTRAINT}\""),
            }));
        }

        let now = chrono::Utc::now();
        let friendship = FriendshipEntity {
            id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
            from_user: *from_user,
            to_user: *to_user,
            status,
            created_at: now,
            updated_at: now,
        };
        tx.staged.rows.insert(friendship.id, friendship.clone());

        Ok(friendship)
    }

    async fn get_by_id(
        &self,
        tx: &mut Self::Tx,
        id: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        tx.staged
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| error::SystemError::not_found("Friendship not found"))
    }

    async fn get_by_pair(
        &self,
        tx: &mut Self::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        tx.staged
            .rows
            .values()
            .find(|f| f.from_user == *from_user && f.to_user == *to_user)
            .cloned()
            .ok_or_else(|| error::SystemError::not_found("Friendship not found"))
    }

    async fn list_by_user(
        &self,
        tx: &mut Self::Tx,
        user_id: &Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        Ok(tx.staged.rows.values().filter(|f| f.touches(user_id)).cloned().collect())
    }

    async fn update_status(
        &self,
        tx: &mut Self::Tx,
        id: &Uuid,
        status: FriendshipStatus,
    ) -> Result<FriendshipEntity, error::SystemError> {
        let friendship = tx
            .staged
            .rows
            .get_mut(id)
            .ok_or_else(|| error::SystemError::not_found("Friendship not found"))?;

        friendship.status = status;
        friendship.updated_at = chrono::Utc::now().max(friendship.updated_at);

        Ok(friendship.clone())
    }

    async fn delete(&self, tx: &mut Self::Tx, id: &Uuid) -> Result<(), error::SystemError> {
        tx.staged
            .rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| error::SystemError::not_found("Friendship not found"))
    }

    async fn close(&self) {
        log::debug!("In-memory friendship repository closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::new_user;

    #[tokio::test]
    async fn insert_rejects_duplicate_ordered_pair() {
        let repo = FriendshipRepositoryMem::new();
        let (a, b) = (new_user(), new_user());

        let mut tx = repo.begin().await.unwrap();
        repo.insert(&mut tx, &a, &b, FriendshipStatus::Pending).await.unwrap();
        let err = repo.insert(&mut tx, &a, &b, FriendshipStatus::Blocked).await.unwrap_err();
        assert!(matches!(err, error::SystemError::ConstraintViolation(_)));

        // The reverse direction is a different row
        repo.insert(&mut tx, &b, &a, FriendshipStatus::Friends).await.unwrap();
        repo.commit(tx).await.unwrap();

        assert_eq!(repo.committed_rows().await.len(), 2);
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let repo = FriendshipRepositoryMem::new();
        let (a, b) = (new_user(), new_user());

        {
            let mut tx = repo.begin().await.unwrap();
            repo.insert(&mut tx, &a, &b, FriendshipStatus::Pending).await.unwrap();
        }
        let mut tx = repo.begin().await.unwrap();
        repo.insert(&mut tx, &b, &a, FriendshipStatus::Pending).await.unwrap();
        repo.rollback(tx).await.unwrap();

        assert!(repo.committed_rows().await.is_empty());
    }

    #[tokio::test]
    async fn point_operations_report_missing_rows() {
        let repo = FriendshipRepositoryMem::new();
        let (a, b) = (new_user(), new_user());
        let missing = new_user();

        let mut tx = repo.begin().await.unwrap();
        let edge = repo.insert(&mut tx, &a, &b, FriendshipStatus::Pending).await.unwrap();

        assert_eq!(repo.get_by_pair(&mut tx, &a, &b).await.unwrap().id, edge.id);
        assert!(matches!(
            repo.get_by_pair(&mut tx, &b, &a).await,
            Err(error::SystemError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_by_id(&mut tx, &missing).await,
            Err(error::SystemError::NotFound(_))
        ));
        assert!(matches!(
            repo.update_status(&mut tx, &missing, FriendshipStatus::Friends).await,
            Err(error::SystemError::NotFound(_))
        ));

        let updated = repo.update_status(&mut tx, &edge.id, FriendshipStatus::Friends).await.unwrap();
        assert_eq!(updated.status, FriendshipStatus::Friends);
        assert!(updated.updated_at >= edge.updated_at);
        assert_eq!(updated.created_at, edge.created_at);

        repo.delete(&mut tx, &edge.id).await.unwrap();
        assert!(matches!(
            repo.delete(&mut tx, &edge.id).await,
            Err(error::SystemError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_by_user_covers_both_directions_in_id_order() {
        let repo = FriendshipRepositoryMem::new();
        let (a, b, c, d) = (new_user(), new_user(), new_user(), new_user());

        let mut tx = repo.begin().await.unwrap();
        let first = repo.insert(&mut tx, &a, &b, FriendshipStatus::Pending).await.unwrap();
        let second = repo.insert(&mut tx, &c, &a, FriendshipStatus::Blocked).await.unwrap();
        repo.insert(&mut tx, &c, &d, FriendshipStatus::Friends).await.unwrap();

        let edges = repo.list_by_user(&mut tx, &a).await.unwrap();
        let ids: Vec<Uuid> = edges.iter().map(|f| f.id).collect();
        let mut sorted = vec![first.id, second.id];
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
