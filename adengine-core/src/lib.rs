//! Core types for the ad-selection engine
//!
//! This crate contains the campaign data model, its priority comparator,
//! and the error type surfaced at the crate's admission boundary. It has
//! no dependency on the Ordered Multi-List or the scheduler — those live in
//! `adengine-engine` and depend on this crate, not the other way around.
//!
//! # Example
//!
//! ```
//! use adengine_core::Campaign;
//!
//! let campaign = Campaign::new(1, 0, 3600, vec!["dog".into()], 100, 5.0, "url-1".into())?;
//! # Ok::<(), adengine_core::Error>(())
//! ```

pub mod campaign;
pub mod error;
pub mod types;

pub use campaign::Campaign;
pub use error::{Error, Result};
pub use types::*;
