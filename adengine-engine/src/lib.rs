//! Real-time ad-selection engine
//!
//! This crate implements a keyword-indexed campaign selector built around
//! the Ordered Multi-List (OML), a set of ordered linked lists that
//! physically share nodes across the master ranking and every per-keyword
//! ranking a campaign participates in, plus an activation scheduler that
//! admits and retires campaigns at their window boundaries without a
//! caller ever walking the full campaign set.
//!
//! - **Arena**: generation-checked node storage shared by every list.
//! - **OML**: the ranked, keyword-indexed list structure itself.
//! - **Scheduler**: tick-driven deferred insert/delete at campaign
//!   `start_instant`/`end_instant`.
//! - **Engine**: the façade a host embeds — `register`, `recommend`,
//!   `delete_by_url`, `start`, `stop`.
//!
//! # Example
//!
//! ```no_run
//! use adengine_engine::{Engine, EngineConfig, SystemClock};
//! use adengine_core::Campaign;
//! use std::sync::Arc;
//!
//! let engine = Engine::new(EngineConfig::default(), Arc::new(SystemClock));
//! engine.start().unwrap();
//!
//! let campaign = Campaign::new(
//!     1, 0, 4_102_444_800,
//!     vec!["shoes".to_string()], 1000, 4.50, "url-1".to_string(),
//! ).unwrap();
//! engine.register(campaign);
//!
//! let best = engine.recommend(&["shoes".to_string()]);
//! engine.stop();
//! ```

mod arena;
mod node;

pub(crate) mod oml;

pub mod clock;
pub mod config;
pub mod engine;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::Engine;
pub use scheduler::SchedulerAlreadyStarted;
