use std::time::Duration;

pub const DEFAULT_SNAPSHOT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct Env {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_slow_threshold: Duration,
    pub snapshot_refresh_interval: Duration,
}

impl Env {
    fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .expect("DB_MAX_CONNECTIONS must be a valid u32 integer");
        let db_min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<u32>()
            .expect("DB_MIN_CONNECTIONS must be a valid u32 integer");
        let db_acquire_slow_threshold = std::env::var("DB_ACQUIRE_SLOW_SECS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .map(Duration::from_secs)
            .expect("DB_ACQUIRE_SLOW_SECS must be a valid u64 integer");

        // Matches the cadence of the external refresh job
        let snapshot_refresh_interval = std::env::var("SNAPSHOT_REFRESH_INTERVAL_SECS")
            .ok()
            .map(|v| {
                v.parse::<u64>()
                    .map(Duration::from_secs)
                    .expect("SNAPSHOT_REFRESH_INTERVAL_SECS must be a valid u64 integer")
            })
            .unwrap_or(DEFAULT_SNAPSHOT_REFRESH_INTERVAL);

        Env {
            database_url,
            db_max_connections,
            db_min_connections,
            db_acquire_slow_threshold,
            snapshot_refresh_interval,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
