//! Core library for ocstats.
//!
//! Parses the OpenCode on-disk storage tree, aggregates per-day usage
//! statistics (tokens, cost, line changes, model and agent breakdowns),
//! estimates costs against OpenRouter pricing, and keeps the aggregate
//! fresh through an incremental cache fed by a filesystem watcher.

pub mod cache;
pub mod format;
pub mod overview;
pub mod pricing;
pub mod stats;
pub mod storage;
pub mod watch;

pub use cache::{StatsCache, StatsUpdate};
pub use stats::{
    collect_stats, AgentInfo, ChatMessage, DayStat, FileDiff, MessageContent, ModelUsage,
    SessionStat, Stats, Tokens, ToolUsage, Totals,
};
pub use storage::{StorageError, StoragePaths};
pub use watch::LiveWatcher;
