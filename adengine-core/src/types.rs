//! Core types used throughout the ad-selection engine

/// A campaign's unique identifier, assigned by the host and never reused.
///
/// Also the final tiebreaker in the priority order (§4.A).
pub type CampaignId = u64;

/// An absolute instant, in whole seconds since the Unix epoch.
///
/// Activity windows and scheduler bucketing are both expressed in this
/// unit; sub-second precision is not part of the design (§4.C).
pub type UnixSeconds = i64;

/// A single targeting keyword.
pub type Keyword = String;

/// The opaque external handle used by impression tracking and retirement.
pub type ImpressionUrl = String;
