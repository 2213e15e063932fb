use uuid::Uuid;

use crate::api::error;
use crate::modules::friendship::schema::{FriendshipEntity, FriendshipStatus};

/// Transaction-aware CRUD over the friendships table. No business rules live here.
///
/// Every data operation runs inside a unit of work obtained from [`begin`].
/// A `Tx` dropped without [`commit`] discards its writes.
///
/// [`begin`]: FriendshipRepository::begin
/// [`commit`]: FriendshipRepository::commit
#[async_trait::async_trait]
pub trait FriendshipRepository: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, error::SystemError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), error::SystemError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), error::SystemError>;

    /// Serializes writers on the unordered pair until `tx` ends.
    async fn lock_pair(
        &self,
        tx: &mut Self::Tx,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError>;

    async fn insert(
        &self,
        tx: &mut Self::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
        status: FriendshipStatus,
    ) -> Result<FriendshipEntity, error::SystemError>;

    async fn get_by_id(
        &self,
        tx: &mut Self::Tx,
        id: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError>;

    /// Exact-direction lookup.
    async fn get_by_pair(
        &self,
        tx: &mut Self::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError>;

    /// All edges where the user is either participant, ordered by id.
    async fn list_by_user(
        &self,
        tx: &mut Self::Tx,
        user_id: &Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError>;

    async fn update_status(
        &self,
        tx: &mut Self::Tx,
        id: &Uuid,
        status: FriendshipStatus,
    ) -> Result<FriendshipEntity, error::SystemError>;

    async fn delete(&self, tx: &mut Self::Tx, id: &Uuid) -> Result<(), error::SystemError>;

    async fn close(&self);
}
