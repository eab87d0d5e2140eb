//! The engine façade (§4.D)
//!
//! Binds the OML, the activation scheduler, and the impression-URL lookup
//! together behind the public surface a host embeds: `register`,
//! `recommend`, `delete_by_url`, `start`, `stop`. A single lock guards the
//! OML, the URL map, and the scheduler's deferred-action table together —
//! [`EngineState`] — so every public operation and every scheduler tick
//! takes that lock exactly once for its entire body and observes and
//! mutates one consistent snapshot of engine state (§5).

use std::cmp::Ordering;
use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use adengine_core::Campaign;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::scheduler::{ActivationScheduler, DeferredAction, EngineState, SchedulerAlreadyStarted};

/// The real-time ad-selection engine.
///
/// Construct with [`Engine::new`], call [`Engine::start`] once the host is
/// ready to begin serving, and [`Engine::stop`] during shutdown. Between
/// those two calls `register`, `recommend`, and `delete_by_url` may be
/// called concurrently from any number of host threads.
pub struct Engine {
    shared: Arc<Mutex<EngineState>>,
    scheduler: Mutex<ActivationScheduler>,
    clock: Arc<dyn Clock>,
    tick_period: std::time::Duration,
}

impl Engine {
    /// Builds an engine with the given configuration, driven by `clock`.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(EngineState::new(config.initial_node_capacity))),
            scheduler: Mutex::new(ActivationScheduler::new()),
            clock,
            tick_period: config.tick_period,
        }
    }

    /// Starts the activation scheduler's background worker. Must be called
    /// before registrations with a future `start_instant` will ever
    /// activate. Fails if already started (§4.C).
    pub fn start(&self) -> Result<(), SchedulerAlreadyStarted> {
        self.scheduler
            .lock()
            .start(self.shared.clone(), self.clock.clone(), self.tick_period)
    }

    /// Stops the activation scheduler. Idempotent.
    pub fn stop(&self) {
        self.scheduler.lock().stop();
        info!("engine stopped");
    }

    /// Admits `campaign`. Always records the impression-URL binding, even
    /// for a campaign whose window has already elapsed — the host never
    /// sees a failure for a stale window, it just never gets linked into
    /// the OML (§10 supplemented behavior, matching the reference source).
    ///
    /// Takes the engine's single lock for this call's entire body, so the
    /// new node is linked (or scheduled) into the OML and bound to its
    /// impression URL as one atomic step — a concurrent `delete_by_url` for
    /// this campaign's URL can never observe a gap where the node is active
    /// but not yet reachable by URL (§5).
    pub fn register(&self, campaign: Campaign) {
        let now = self.clock.now();
        let url = campaign.impression_url.clone();
        let start = campaign.start_instant;
        let end = campaign.end_instant;

        let mut state = self.shared.lock();
        let handle = state.oml.create_node(campaign);

        if now < start {
            state.table.schedule(start, DeferredAction::Link(handle));
            state.table.schedule(end, DeferredAction::Delete(handle));
            info!("campaign registered for deferred activation at {start}");
        } else if now < end {
            state.oml.link(handle);
            state.table.schedule(end, DeferredAction::Delete(handle));
            info!("campaign registered and activated immediately");
        } else {
            info!("campaign registered past its window; never activated");
        }

        state.url_to_handle.insert(url, handle);
    }

    /// Returns the highest-priority campaign matching any of `keywords`, or
    /// `None` if every keyword misses. Duplicate keywords are benign.
    pub fn recommend(&self, keywords: &[String]) -> Option<Campaign> {
        let state = self.shared.lock();
        let mut best: Option<&Campaign> = None;
        for keyword in keywords {
            if let Some(candidate) = state.oml.get_first(keyword) {
                best = Some(match best {
                    None => candidate,
                    Some(current) => match candidate.compare(current) {
                        Ordering::Less => candidate,
                        _ => current,
                    },
                });
            }
        }
        best.cloned()
    }

    /// Deletes the campaign bound to `url`, if any. A no-op for an unknown
    /// URL (already deleted, or never registered).
    pub fn delete_by_url(&self, url: &str) {
        let mut state = self.shared.lock();
        if let Some(handle) = state.url_to_handle.remove(url) {
            state.oml.delete(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn campaign(id: u64, start: i64, end: i64, keywords: &[&str], cpm: f64) -> Campaign {
        Campaign::new(
            id,
            start,
            end,
            keywords.iter().map(|s| s.to_string()).collect(),
            10,
            cpm,
            format!("url-{id}"),
        )
        .unwrap()
    }

    #[test]
    fn register_within_window_activates_immediately() {
        let clock = Arc::new(ManualClock::new(500));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.register(campaign(1, 0, 1000, &["dog"], 5.0));

        let best = engine.recommend(&["dog".to_string()]);
        assert_eq!(best.unwrap().id, 1);
    }

    #[test]
    fn register_before_window_does_not_activate_until_scheduler_fires() {
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(EngineConfig::default(), clock.clone());
        engine.register(campaign(1, 500, 1000, &["dog"], 5.0));

        assert!(engine.recommend(&["dog".to_string()]).is_none());
    }

    /// Boundary scenario 3 (§8): a campaign whose `start_instant` is two
    /// ticks in the future activates only once the scheduler has drained
    /// past it, not before.
    #[test]
    fn future_campaign_activates_once_two_ticks_have_elapsed() {
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(EngineConfig::default(), clock.clone());
        engine.register(campaign(1, 2, 1000, &["dog"], 5.0));

        assert!(engine.recommend(&["dog".to_string()]).is_none());

        clock.advance(1); // tick 1: still before start_instant
        {
            let mut state = engine.shared.lock();
            crate::scheduler::drain_tick(&mut state.table, &mut state.oml, clock.now());
        }
        assert!(engine.recommend(&["dog".to_string()]).is_none());

        clock.advance(1); // tick 2: now == start_instant
        {
            let mut state = engine.shared.lock();
            crate::scheduler::drain_tick(&mut state.table, &mut state.oml, clock.now());
        }
        assert_eq!(engine.recommend(&["dog".to_string()]).unwrap().id, 1);
    }

    #[test]
    fn register_past_window_never_activates() {
        let clock = Arc::new(ManualClock::new(2000));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.register(campaign(1, 0, 1000, &["dog"], 5.0));

        assert!(engine.recommend(&["dog".to_string()]).is_none());
    }

    #[test]
    fn recommend_picks_the_highest_priority_match_across_keywords() {
        let clock = Arc::new(ManualClock::new(500));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.register(campaign(1, 0, 1000, &["dog"], 5.0));
        engine.register(campaign(2, 0, 1000, &["cat"], 7.0));
        engine.register(campaign(3, 0, 1000, &["dog", "cat"], 6.0));

        let best = engine.recommend(&["dog".to_string(), "cat".to_string()]);
        assert_eq!(best.unwrap().id, 2);
    }

    #[test]
    fn recommend_with_no_matching_keyword_is_none() {
        let clock = Arc::new(ManualClock::new(500));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.register(campaign(1, 0, 1000, &["dog"], 5.0));

        assert!(engine.recommend(&["bird".to_string()]).is_none());
    }

    #[test]
    fn delete_by_url_removes_the_campaign_from_recommendations() {
        let clock = Arc::new(ManualClock::new(500));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.register(campaign(1, 0, 1000, &["dog"], 5.0));
        assert!(engine.recommend(&["dog".to_string()]).is_some());

        engine.delete_by_url("url-1");
        assert!(engine.recommend(&["dog".to_string()]).is_none());
    }

    #[test]
    fn delete_by_url_on_unknown_url_is_a_no_op() {
        let clock = Arc::new(ManualClock::new(500));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.delete_by_url("does-not-exist");
    }

    #[test]
    fn delete_by_url_before_deferred_activation_cancels_it() {
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(EngineConfig::default(), clock);
        engine.register(campaign(1, 500, 1000, &["dog"], 5.0));

        engine.delete_by_url("url-1");

        let mut state = engine.shared.lock();
        let fired = crate::scheduler::drain_tick(&mut state.table, &mut state.oml, 500);
        assert_eq!(fired, 1);
        drop(state);
        assert!(engine.recommend(&["dog".to_string()]).is_none());
    }
}
