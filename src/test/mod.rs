use std::sync::Arc;

use uuid::Uuid;

use crate::modules::friendship::{
    repository_mem::FriendshipRepositoryMem, schema::FriendshipEntity, service::FriendshipService,
};

pub fn new_user() -> Uuid {
    Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext))
}

pub fn engine() -> (Arc<FriendshipRepositoryMem>, FriendshipService<FriendshipRepositoryMem>) {
    let repo = Arc::new(FriendshipRepositoryMem::new());
    let service = FriendshipService::with_dependencies(repo.clone());
    (repo, service)
}

/// Committed edges between the two users, in either direction.
pub async fn pair_edges(repo: &FriendshipRepositoryMem, a: Uuid, b: Uuid) -> Vec<FriendshipEntity> {
    repo.committed_rows().await.into_iter().filter(|f| f.connects(&a, &b)).collect()
}

// Run with DATABASE_URL pointing at a disposable Postgres: cargo test -- --ignored
mod pg {
    use std::sync::Arc;

    use sqlx::PgPool;

    use super::new_user;
    use crate::api::error::SystemError;
    use crate::modules::friendship::{
        repository::FriendshipRepository, repository_pg::FriendshipRepositoryPg,
        schema::FriendshipStatus, service::FriendshipService,
    };
    use crate::modules::friendship_stats::{
        repository_pg::FriendshipStatsRepositoryPg, service::FriendshipStatsService,
    };

    fn pg_engine(pool: PgPool) -> FriendshipService<FriendshipRepositoryPg> {
        FriendshipService::with_dependencies(Arc::new(FriendshipRepositoryPg::new(pool)))
    }

    #[sqlx::test(migrator = "crate::configs::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn pg_store_round_trips_status_enum(pool: PgPool) {
        let repo = FriendshipRepositoryPg::new(pool.clone());
        let (a, b) = (new_user(), new_user());

        let mut tx = repo.begin().await.unwrap();
        let edge = repo.insert(&mut tx, &a, &b, FriendshipStatus::Pending).await.unwrap();
        repo.commit(tx).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        let err = repo.insert(&mut tx, &a, &b, FriendshipStatus::Pending).await.unwrap_err();
        assert!(matches!(err, SystemError::ConstraintViolation(_)));
        repo.rollback(tx).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        let fetched = repo.get_by_pair(&mut tx, &a, &b).await.unwrap();
        assert_eq!(fetched.id, edge.id);
        assert_eq!(fetched.status, FriendshipStatus::Pending);
        let updated = repo.update_status(&mut tx, &edge.id, FriendshipStatus::Blocked).await.unwrap();
        assert_eq!(updated.status, FriendshipStatus::Blocked);
        assert!(updated.updated_at >= updated.created_at);
        repo.delete(&mut tx, &edge.id).await.unwrap();
        assert!(matches!(repo.delete(&mut tx, &edge.id).await, Err(SystemError::NotFound(_))));
        assert!(matches!(repo.get_by_id(&mut tx, &edge.id).await, Err(SystemError::NotFound(_))));
        repo.commit(tx).await.unwrap();

        repo.close().await;
        assert!(pool.is_closed());
    }

    #[sqlx::test(migrator = "crate::configs::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn pg_friendship_lifecycle(pool: PgPool) {
        let service = pg_engine(pool);
        let (a, b) = (new_user(), new_user());

        let request = service.create_friend_request(a, b).await.unwrap();
        service.accept_friend_request(request.id).await.unwrap();
        assert!(service.is_friend(b, a).await.unwrap());
        assert_eq!(service.list_friends(a).await.unwrap().len(), 2);

        service.block_user(a, b).await.unwrap();
        assert!(service.is_blocked(a, b).await.unwrap());
        assert_eq!(service.list_relationships(a).await.unwrap().len(), 1);

        service.unblock_user(a, b).await.unwrap();
        assert!(service.list_relationships(a).await.unwrap().is_empty());
        assert!(service.list_friends(b).await.unwrap().is_empty());
    }

    #[sqlx::test(migrator = "crate::configs::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn pg_concurrent_requests_commit_exactly_once(pool: PgPool) {
        let service = pg_engine(pool);
        let (a, b) = (new_user(), new_user());

        let attempts = (0..8).map(|_| service.create_friend_request(a, b));
        let results = futures_util::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, SystemError::Conflict(_))));
        assert_eq!(service.list_pending_sent(a).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrator = "crate::configs::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn pg_opposite_direction_requests_leave_one_edge(pool: PgPool) {
        let service = pg_engine(pool);
        let (a, b) = (new_user(), new_user());

        let (forward, reverse) =
            tokio::join!(service.create_friend_request(a, b), service.create_friend_request(b, a));

        assert_ne!(forward.is_ok(), reverse.is_ok());
        assert_eq!(service.list_relationships(a).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrator = "crate::configs::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn pg_block_after_being_blocked_keeps_one_edge(pool: PgPool) {
        let service = pg_engine(pool);
        let (a, b) = (new_user(), new_user());

        service.block_user(b, a).await.unwrap();
        service.block_user(a, b).await.unwrap();

        let edges = service.list_relationships(a).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].from_user, edges[0].to_user), (b, a));
        assert_eq!(edges[0].status, FriendshipStatus::Blocked);
    }

    #[sqlx::test(migrator = "crate::configs::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn pg_snapshot_lags_until_refresh(pool: PgPool) {
        let service = pg_engine(pool.clone());
        let stats = FriendshipStatsService::with_dependencies(
            Arc::new(FriendshipStatsRepositoryPg::new(pool)),
            std::time::Duration::from_secs(60),
        );
        let (a, b, mutual) = (new_user(), new_user(), new_user());

        for user in [a, b] {
            let request = service.create_friend_request(user, mutual).await.unwrap();
            service.accept_friend_request(request.id).await.unwrap();
        }

        assert_eq!(stats.count_friends(mutual).await.unwrap().data, 2);
        assert_eq!(stats.count_mutual_friends(a, b).await.unwrap().data, 0);

        stats.refresh_snapshot().await.unwrap();
        assert_eq!(stats.count_mutual_friends(a, b).await.unwrap().data, 1);
        assert_eq!(stats.list_mutual_friends(a, b).await.unwrap().data, vec![mutual]);

        let suggestions = stats.suggest_friends(a, 10).await.unwrap().data;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].user_id, b);
        assert_eq!(suggestions[0].mutual_count, 1);
    }
}
