use log::{debug, error, info};
use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    api::error,
    modules::friendship::{
        model::{PairState, UserPairBody},
        repository::FriendshipRepository,
        schema::{FriendshipEntity, FriendshipStatus},
    },
};

/// Relationship engine. Each public operation is one unit of work against the
/// store: begin, re-validate inside the transaction, write, commit. Any error
/// rolls the whole operation back and is returned unchanged.
#[derive(Clone)]
pub struct FriendshipService<R>
where
    R: FriendshipRepository,
{
    friendship_repo: Arc<R>,
}

impl<R> FriendshipService<R>
where
    R: FriendshipRepository,
{
    pub fn with_dependencies(friendship_repo: Arc<R>) -> Self {
        info!("FriendshipService initialized with dependencies");
        FriendshipService { friendship_repo }
    }

    async fn finish<T>(
        &self,
        tx: R::Tx,
        result: Result<T, error::SystemError>,
    ) -> Result<T, error::SystemError> {
        match result {
            Ok(value) => {
                self.friendship_repo.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rb_err) = self.friendship_repo.rollback(tx).await {
                    error!("Rollback failed: {:?} (original error: {:?})", rb_err, err);
                }
                Err(err)
            }
        }
    }

    async fn find_edge(
        &self,
        tx: &mut R::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<Option<FriendshipEntity>, error::SystemError> {
        match self.friendship_repo.get_by_pair(tx, from_user, to_user).await {
            Ok(friendship) => Ok(Some(friendship)),
            Err(error::SystemError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Reads an edge by id, then takes its pair lock and reads it again so the
    /// caller validates the row as it stands under the lock.
    async fn get_locked(
        &self,
        tx: &mut R::Tx,
        friendship_id: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        let friendship = self.friendship_repo.get_by_id(tx, friendship_id).await?;
        self.friendship_repo.lock_pair(tx, &friendship.from_user, &friendship.to_user).await?;
        self.friendship_repo.get_by_id(tx, friendship_id).await
    }

    async fn scan(&self, user_id: &Uuid) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = self.friendship_repo.list_by_user(&mut tx, user_id).await;
        self.finish(tx, result).await
    }

    pub async fn create_friend_request(
        &self,
        from_user: Uuid,
        to_user: Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        validate_pair(&from_user, &to_user)?;

        let mut tx = self.friendship_repo.begin().await?;
        let result = self.create_friend_request_tx(&mut tx, &from_user, &to_user).await;
        let friendship = self.finish(tx, result).await?;

        info!("Friend request {} created from {} to {}", friendship.id, from_user, to_user);
        Ok(friendship)
    }

    async fn create_friend_request_tx(
        &self,
        tx: &mut R::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        self.friendship_repo.lock_pair(tx, from_user, to_user).await?;

        let forward = self.find_edge(tx, from_user, to_user).await?;
        let reverse = self.find_edge(tx, to_user, from_user).await?;

        if reverse.as_ref().is_some_and(|f| f.status == FriendshipStatus::Blocked) {
            return Err(error::SystemError::forbidden(
                "Cannot send friend request, you are blocked by the user",
            ));
        }

        if forward.is_some() || reverse.is_some() {
            return Err(error::SystemError::conflict(
                "A relationship already exists between these users",
            ));
        }

        self.friendship_repo
            .insert(tx, from_user, to_user, FriendshipStatus::Pending)
            .await
            .map_err(|err| match err {
                error::SystemError::ConstraintViolation(_) => error::SystemError::conflict(
                    "A relationship already exists between these users",
                ),
                other => other,
            })
    }

    pub async fn accept_friend_request(&self, friendship_id: Uuid) -> Result<(), error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = self.accept_friend_request_tx(&mut tx, &friendship_id, None).await;
        self.finish(tx, result).await?;

        info!("Friend request {} accepted", friendship_id);
        Ok(())
    }

    /// Accepts on behalf of `recipient`, who must be the request's target.
    pub async fn accept_friend_request_as(
        &self,
        recipient: Uuid,
        friendship_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = self.accept_friend_request_tx(&mut tx, &friendship_id, Some(&recipient)).await;
        self.finish(tx, result).await?;

        info!("Friend request {} accepted by {}", friendship_id, recipient);
        Ok(())
    }

    async fn accept_friend_request_tx(
        &self,
        tx: &mut R::Tx,
        friendship_id: &Uuid,
        recipient: Option<&Uuid>,
    ) -> Result<(), error::SystemError> {
        let request = self.get_locked(tx, friendship_id).await?;

        if request.status != FriendshipStatus::Pending {
            return Err(error::SystemError::invalid_state("Friendship is not in pending state"));
        }

        if recipient.is_some_and(|r| *r != request.to_user) {
            return Err(error::SystemError::invalid_state(
                "Only the recipient can accept this friend request",
            ));
        }

        self.friendship_repo
            .insert(tx, &request.to_user, &request.from_user, FriendshipStatus::Friends)
            .await
            .map_err(|err| match err {
                error::SystemError::ConstraintViolation(_) => error::SystemError::conflict(
                    "A reverse relationship already exists between these users",
                ),
                other => other,
            })?;

        self.friendship_repo.update_status(tx, &request.id, FriendshipStatus::Friends).await?;

        Ok(())
    }

    pub async fn reject_friend_request(&self, friendship_id: Uuid) -> Result<(), error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = self.reject_friend_request_tx(&mut tx, &friendship_id).await;
        self.finish(tx, result).await?;

        info!("Friend request {} rejected", friendship_id);
        Ok(())
    }

    async fn reject_friend_request_tx(
        &self,
        tx: &mut R::Tx,
        friendship_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        let request = self.get_locked(tx, friendship_id).await?;

        if request.status != FriendshipStatus::Pending {
            return Err(error::SystemError::invalid_state("Friendship is not in pending state"));
        }

        self.friendship_repo.delete(tx, &request.id).await
    }

    /// Blocks `to_user` on behalf of `from_user`. The pair keeps exactly one
    /// `blocked` edge.
    ///
    /// An edge `from_user -> to_user` is overwritten in place, otherwise one is
    /// inserted, and a pending or friends edge in the other direction is
    /// deleted. If `to_user` has already blocked `from_user`, that block is the
    /// pair's blocked edge and stays as it is.
    pub async fn block_user(&self, from_user: Uuid, to_user: Uuid) -> Result<(), error::SystemError> {
        validate_pair(&from_user, &to_user)?;

        let mut tx = self.friendship_repo.begin().await?;
        let result = self.block_user_tx(&mut tx, &from_user, &to_user).await;
        self.finish(tx, result).await?;

        info!("User {} blocked {}", from_user, to_user);
        Ok(())
    }

    async fn block_user_tx(
        &self,
        tx: &mut R::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<(), error::SystemError> {
        self.friendship_repo.lock_pair(tx, from_user, to_user).await?;

        let forward = self.find_edge(tx, from_user, to_user).await?;
        let reverse = self.find_edge(tx, to_user, from_user).await?;

        if reverse.as_ref().is_some_and(|f| f.status == FriendshipStatus::Blocked) {
            debug!("User {} is already blocked by {}", from_user, to_user);
            if let Some(forward) = forward {
                self.friendship_repo.delete(tx, &forward.id).await?;
            }
            return Ok(());
        }

        match forward {
            Some(existing) if existing.status == FriendshipStatus::Blocked => {
                debug!("User {} has already blocked {}", from_user, to_user);
            }
            Some(existing) => {
                self.friendship_repo.update_status(tx, &existing.id, FriendshipStatus::Blocked).await?;
            }
            None => {
                self.friendship_repo.insert(tx, from_user, to_user, FriendshipStatus::Blocked).await?;
            }
        }

        if let Some(reverse) = reverse {
            self.friendship_repo.delete(tx, &reverse.id).await?;
        }

        Ok(())
    }

    pub async fn unblock_user(&self, from_user: Uuid, to_user: Uuid) -> Result<(), error::SystemError> {
        validate_pair(&from_user, &to_user)?;

        let mut tx = self.friendship_repo.begin().await?;
        let result = self.unblock_user_tx(&mut tx, &from_user, &to_user).await;
        self.finish(tx, result).await?;

        info!("User {} unblocked {}", from_user, to_user);
        Ok(())
    }

    async fn unblock_user_tx(
        &self,
        tx: &mut R::Tx,
        from_user: &Uuid,
        to_user: &Uuid,
    ) -> Result<(), error::SystemError> {
        self.friendship_repo.lock_pair(tx, from_user, to_user).await?;

        match self.find_edge(tx, from_user, to_user).await? {
            Some(existing) if existing.status == FriendshipStatus::Blocked => {
                self.friendship_repo.delete(tx, &existing.id).await
            }
            _ => Err(error::SystemError::invalid_state("No blocked relationship to unblock")),
        }
    }

    /// Unfriends the pair, removing both `friends` rows.
    pub async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<(), error::SystemError> {
        validate_pair(&user_id, &friend_id)?;

        let mut tx = self.friendship_repo.begin().await?;
        let result = self.remove_friend_tx(&mut tx, &user_id, &friend_id).await;
        self.finish(tx, result).await?;

        info!("User {} removed friend {}", user_id, friend_id);
        Ok(())
    }

    async fn remove_friend_tx(
        &self,
        tx: &mut R::Tx,
        user_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        self.friendship_repo.lock_pair(tx, user_id, friend_id).await?;

        let forward = self.find_edge(tx, user_id, friend_id).await?;
        let reverse = self.find_edge(tx, friend_id, user_id).await?;
        let friend_edges: Vec<FriendshipEntity> = forward
            .into_iter()
            .chain(reverse)
            .filter(|f| f.status == FriendshipStatus::Friends)
            .collect();

        if friend_edges.is_empty() {
            return Err(error::SystemError::not_found("Users are not friends"));
        }

        for edge in &friend_edges {
            self.friendship_repo.delete(tx, &edge.id).await?;
        }

        Ok(())
    }

    pub async fn delete_friendship(&self, friendship_id: Uuid) -> Result<(), error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = match self.get_locked(&mut tx, &friendship_id).await {
            Ok(friendship) => self.friendship_repo.delete(&mut tx, &friendship.id).await,
            Err(err) => Err(err),
        };
        self.finish(tx, result).await?;

        info!("Friendship {} deleted", friendship_id);
        Ok(())
    }

    pub async fn get_friendship(
        &self,
        friendship_id: Uuid,
    ) -> Result<FriendshipEntity, error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = self.friendship_repo.get_by_id(&mut tx, &friendship_id).await;
        self.finish(tx, result).await
    }

    /// True iff `from_user` has blocked `to_user`. The reverse is not checked.
    pub async fn is_blocked(&self, from_user: Uuid, to_user: Uuid) -> Result<bool, error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = self.find_edge(&mut tx, &from_user, &to_user).await;
        let edge = self.finish(tx, result).await?;

        Ok(edge.is_some_and(|f| f.status == FriendshipStatus::Blocked))
    }

    pub async fn is_friend(&self, user_id: Uuid, other_user_id: Uuid) -> Result<bool, error::SystemError> {
        let relationships = self.scan(&user_id).await?;

        Ok(relationships
            .iter()
            .any(|f| f.status == FriendshipStatus::Friends && f.connects(&user_id, &other_user_id)))
    }

    /// Accepted friendships of the user. Each mutual friendship contributes
    /// both of its rows.
    pub async fn list_friends(&self, user_id: Uuid) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        let relationships = self.scan(&user_id).await?;

        Ok(relationships.into_iter().filter(|f| f.status == FriendshipStatus::Friends).collect())
    }

    pub async fn list_pending_received(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        let relationships = self.scan(&user_id).await?;

        Ok(relationships
            .into_iter()
            .filter(|f| f.status == FriendshipStatus::Pending && f.to_user == user_id)
            .collect())
    }

    pub async fn list_pending_sent(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        let relationships = self.scan(&user_id).await?;

        Ok(relationships
            .into_iter()
            .filter(|f| f.status == FriendshipStatus::Pending && f.from_user == user_id)
            .collect())
    }

    pub async fn list_relationships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError> {
        self.scan(&user_id).await
    }

    /// State of the pair as seen by `user_id`. A block by `user_id` is
    /// reported ahead of a block by `other_user_id`.
    pub async fn get_relationship(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<PairState, error::SystemError> {
        let mut tx = self.friendship_repo.begin().await?;
        let result = match self.find_edge(&mut tx, &user_id, &other_user_id).await {
            Ok(forward) => self
                .find_edge(&mut tx, &other_user_id, &user_id)
                .await
                .map(|reverse| (forward, reverse)),
            Err(err) => Err(err),
        };
        let (forward, reverse) = self.finish(tx, result).await?;

        let has = |edge: &Option<FriendshipEntity>, status: FriendshipStatus| {
            edge.as_ref().is_some_and(|f| f.status == status)
        };

        let state = if has(&forward, FriendshipStatus::Blocked) {
            PairState::Blocked { blocker: user_id }
        } else if has(&reverse, FriendshipStatus::Blocked) {
            PairState::Blocked { blocker: other_user_id }
        } else if has(&forward, FriendshipStatus::Friends) || has(&reverse, FriendshipStatus::Friends) {
            PairState::Friends
        } else if has(&forward, FriendshipStatus::Pending) {
            PairState::Pending { initiator: user_id }
        } else if has(&reverse, FriendshipStatus::Pending) {
            PairState::Pending { initiator: other_user_id }
        } else {
            PairState::None
        };

        Ok(state)
    }
}

fn validate_pair(from_user: &Uuid, to_user: &Uuid) -> Result<(), error::SystemError> {
    UserPairBody { from_user_id: *from_user, to_user_id: *to_user }
        .validate()
        .map_err(|e| error::SystemError::bad_request(e.to_string()))
}
