pub mod cache;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod storage;

pub use cache::{CacheEntry, CacheStatsSnapshot, ResponseCache};
pub use config::AppConfig;
pub use observability::{apply_logging_level, init_tracing};
pub use server::{AppState, ServerBuilder, SidraServer, build_app};
pub use storage::{LocalityStore, MemoryLocalityStore};
