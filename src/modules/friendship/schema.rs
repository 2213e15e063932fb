use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "friendship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Friends,
    Blocked,
}

/// A directed relationship edge. `from_user` is the initiator.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct FriendshipEntity {
    pub id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub status: FriendshipStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl FriendshipEntity {
    pub fn connects(&self, user_a: &Uuid, user_b: &Uuid) -> bool {
        (self.from_user == *user_a && self.to_user == *user_b)
            || (self.from_user == *user_b && self.to_user == *user_a)
    }

    pub fn touches(&self, user_id: &Uuid) -> bool {
        self.from_user == *user_id || self.to_user == *user_id
    }

    /// The participant that is not `user_id`.
    pub fn counterpart(&self, user_id: &Uuid) -> Uuid {
        if self.from_user == *user_id {
            self.to_user
        } else {
            self.from_user
        }
    }
}
