pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod flight_repo;
pub mod memory;
pub mod redis_repo;

pub use database::{DbClient, PgInventoryStore};
pub use memory::{InMemoryLockService, InMemoryStore};
pub use redis_repo::RedisLockService;
