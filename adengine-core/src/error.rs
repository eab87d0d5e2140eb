//! Error types for the ad-selection engine
//!
//! This module defines the error types surfaced at the crate's admission
//! boundary. Lookup misses (an absent list, an unknown impression URL) are
//! not errors — they are represented as `Option::None` at the call site.

use thiserror::Error;

/// The main error type for ad-engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// A campaign's activity window is degenerate (`start >= end`).
    #[error("invalid campaign window: start {start} must be strictly before end {end}")]
    InvalidWindow {
        /// Proposed start instant (unix seconds)
        start: i64,
        /// Proposed end instant (unix seconds)
        end: i64,
    },

    /// A campaign was admitted with no target keywords.
    #[error("campaign {id} has no target keywords")]
    EmptyKeywords {
        /// The offending campaign's id
        id: u64,
    },

    /// A campaign was admitted with a non-positive impression cap.
    #[error("campaign {id} has a non-positive impression cap: {max_impressions}")]
    NonPositiveImpressionCap {
        /// The offending campaign's id
        id: u64,
        /// The rejected cap value
        max_impressions: i64,
    },

    /// Two distinct campaigns compared equal on cpm, end instant, and id.
    ///
    /// IDs are globally unique by construction, so this indicates upstream
    /// id-allocation corruption. Per design, this is not meant to be
    /// recovered from — callers that choose to catch it should treat it as
    /// fatal rather than retry.
    #[error("duplicate campaign id {id}: two distinct campaigns share cpm, end instant, and id")]
    DuplicateCampaignId {
        /// The colliding id
        id: u64,
    },
}

/// A specialized Result type for ad-engine operations
pub type Result<T> = std::result::Result<T, Error>;
