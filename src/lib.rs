//! Relationship management for the social graph: directed friendship edges,
//! the transactional engine that owns their invariants, and the aggregate
//! views read beside it.
use std::sync::LazyLock;

pub mod api;
pub mod configs;
pub mod constants;
pub mod modules;
#[cfg(test)]
mod test;
pub mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    // The embedding service may already own the logger
    if env_logger::try_init().is_ok() {
        log::info!("Logger initialized");
    }
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});
