//! Campaign record and its priority comparator (§3, §4.A)

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::{CampaignId, ImpressionUrl, Keyword, UnixSeconds};

/// An ad placement record: targeting keywords, priority fields, an activity
/// window, and an impression cap.
///
/// A `Campaign` is immutable once admitted — every field here is fixed at
/// construction time. `impression_count` lives outside this struct (owned by
/// the external impression service, per §3) and is not tracked here.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    /// Unique id, assigned by the host. Also the final priority tiebreaker.
    pub id: CampaignId,
    /// Start of the activity window (inclusive).
    pub start_instant: UnixSeconds,
    /// End of the activity window (exclusive).
    pub end_instant: UnixSeconds,
    /// Non-empty set of keywords this campaign targets.
    pub target_keywords: Vec<Keyword>,
    /// Positive impression cap; the campaign retires once reached.
    pub max_impressions: i64,
    /// Non-negative cost-per-mille bid.
    pub cpm: f64,
    /// Opaque external handle, unique per campaign.
    pub impression_url: ImpressionUrl,
}

impl Campaign {
    /// Validates and constructs a new campaign.
    ///
    /// Rejects a degenerate window, an empty keyword set, or a non-positive
    /// impression cap at the boundary rather than letting malformed data
    /// reach the OML, where a bad comparator input could misorder every
    /// list it touches.
    pub fn new(
        id: CampaignId,
        start_instant: UnixSeconds,
        end_instant: UnixSeconds,
        target_keywords: Vec<Keyword>,
        max_impressions: i64,
        cpm: f64,
        impression_url: ImpressionUrl,
    ) -> Result<Self> {
        if start_instant >= end_instant {
            return Err(Error::InvalidWindow {
                start: start_instant,
                end: end_instant,
            });
        }
        if target_keywords.is_empty() {
            return Err(Error::EmptyKeywords { id });
        }
        if max_impressions <= 0 {
            return Err(Error::NonPositiveImpressionCap { id, max_impressions });
        }
        Ok(Self {
            id,
            start_instant,
            end_instant,
            target_keywords,
            max_impressions,
            cpm,
            impression_url,
        })
    }

    /// Structural equality, including element-wise keyword comparison.
    ///
    /// Used for tests and debugging only — the OML's own bookkeeping (e.g.
    /// pruning an empty list key) must use node identity, never this.
    pub fn equal(&self, other: &Campaign) -> bool {
        self == other
    }

    /// Three-way priority comparison per §4.A: higher cpm first, then
    /// earlier end instant, then lower id.
    ///
    /// `Ordering::Less` means `self` outranks `other` (higher priority).
    /// The original reference implementation compares *remaining time to
    /// expiration*, which reduces to comparing `end_instant` directly since
    /// the "now" offset cancels on both sides — we compare `end_instant`
    /// directly so priority never drifts with wall-clock time.
    pub fn compare(&self, other: &Campaign) -> Ordering {
        other
            .cpm
            .partial_cmp(&self.cpm)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.end_instant.cmp(&other.end_instant))
            .then_with(|| self.id.cmp(&other.id))
    }
}
