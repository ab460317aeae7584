//! View state shared between a poller and whatever displays it
//!
//! `FetchState` is the only data a panel owns. It mirrors whatever the backend
//! last returned and is mutated exclusively by fetch cycles beginning and settling.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Result of one fetch cycle as seen by the view: mapped data or a display message
pub type CycleOutcome<T> = Result<T, String>;

/// How a poller treats responses that settle out of send order
///
/// Polling cycles are allowed to overlap when a request takes longer than the
/// polling interval. The policy decides what happens when an older cycle
/// settles after a newer one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Whichever response settles last overwrites the state, regardless of
    /// when its request was sent
    LastSettledWins,
    /// Responses from cycles older than the one currently displayed are dropped
    #[default]
    DiscardStale,
}

/// Ephemeral view state for one panel
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last successfully fetched and mapped payload
    pub data: Option<T>,
    /// True from mount until the first settlement, then only while a cycle is in flight
    pub is_loading: bool,
    /// Human-readable message from the most recent applied failure
    pub error: Option<String>,
    /// When `data` was last replaced
    pub last_updated: Option<Timestamp>,
    /// Sequence number of the cycle whose outcome is currently applied (0 = none yet)
    pub cycle: u64,
    /// Number of cycles started but not yet settled
    pub in_flight: u32,
    /// Failures applied since the last success
    pub consecutive_failures: u32,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FetchState<T> {
    /// Fresh state as created at mount: no data, loading
    pub fn new() -> Self {
        Self {
            data: None,
            is_loading: true,
            error: None,
            last_updated: None,
            cycle: 0,
            in_flight: 0,
            consecutive_failures: 0,
        }
    }

    /// Record that a fetch cycle has been initiated
    pub fn begin_cycle(&mut self) {
        self.in_flight += 1;
        self.is_loading = true;
    }

    /// Apply the outcome of a fetch cycle
    ///
    /// # Arguments
    ///
    /// * `cycle` - Sequence number assigned when the cycle began (starting at 1)
    /// * `outcome` - Mapped payload on success, display message on failure
    /// * `policy` - How to treat a cycle older than the one currently applied
    /// * `now` - Settlement time, recorded as `last_updated` on success
    ///
    /// # Returns
    ///
    /// `true` if the outcome was applied, `false` if it was discarded as stale
    pub fn settle(
        &mut self,
        cycle: u64,
        outcome: CycleOutcome<T>,
        policy: OverlapPolicy,
        now: Timestamp,
    ) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.is_loading = self.in_flight > 0;

        if policy == OverlapPolicy::DiscardStale && cycle < self.cycle {
            debug!(
                "Discarding stale cycle {} (cycle {} already applied)",
                cycle, self.cycle
            );
            return false;
        }

        self.cycle = cycle;
        match outcome {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.last_updated = Some(now);
                self.consecutive_failures = 0;
            }
            Err(message) => {
                // Previous data stays visible
                self.error = Some(message);
                self.consecutive_failures += 1;
            }
        }
        true
    }

    /// Whether at least one fetch has settled successfully
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Whether the panel shows data from before its most recent failure
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }

    /// Whether any cycle outcome (success or failure) has been applied
    pub fn has_settled(&self) -> bool {
        self.cycle > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_loading_without_data() {
        let state: FetchState<u32> = FetchState::new();
        assert!(state.is_loading);
        assert!(state.data.is_none());
        assert!(state.error.is_none());
        assert!(state.last_updated.is_none());
        assert!(!state.has_settled());
    }

    #[test]
    fn test_success_clears_error() {
        let mut state = FetchState::new();
        state.begin_cycle();
        state.settle(1, Err("boom".to_string()), OverlapPolicy::DiscardStale, Utc::now());
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.consecutive_failures, 1);

        state.begin_cycle();
        let now = Utc::now();
        state.settle(2, Ok(7), OverlapPolicy::DiscardStale, now);
        assert_eq!(state.data, Some(7));
        assert!(state.error.is_none());
        assert_eq!(state.last_updated, Some(now));
        assert_eq!(state.consecutive_failures, 0);
        assert!(!state.is_loading);
    }

    #[test]
    fn test_failure_keeps_previous_data() {
        let mut state = FetchState::new();
        state.begin_cycle();
        let first = Utc::now();
        state.settle(1, Ok("fresh"), OverlapPolicy::LastSettledWins, first);

        state.begin_cycle();
        state.settle(2, Err("offline".to_string()), OverlapPolicy::LastSettledWins, Utc::now());

        assert_eq!(state.data, Some("fresh"));
        assert_eq!(state.last_updated, Some(first));
        assert!(state.is_stale());
    }

    #[test]
    fn test_loading_tracks_overlapping_cycles() {
        let mut state = FetchState::new();
        state.begin_cycle();
        state.begin_cycle();
        assert_eq!(state.in_flight, 2);

        state.settle(2, Ok(2), OverlapPolicy::LastSettledWins, Utc::now());
        assert!(state.is_loading, "cycle 1 is still in flight");

        state.settle(1, Ok(1), OverlapPolicy::LastSettledWins, Utc::now());
        assert!(!state.is_loading);
    }

    #[test]
    fn test_last_settled_wins_applies_older_cycle() {
        let mut state = FetchState::new();
        state.begin_cycle();
        state.begin_cycle();
        state.settle(2, Ok("newer"), OverlapPolicy::LastSettledWins, Utc::now());
        let applied = state.settle(1, Ok("older"), OverlapPolicy::LastSettledWins, Utc::now());

        assert!(applied);
        assert_eq!(state.data, Some("older"));
        assert_eq!(state.cycle, 1);
    }

    #[test]
    fn test_discard_stale_drops_older_cycle() {
        let mut state = FetchState::new();
        state.begin_cycle();
        state.begin_cycle();
        state.settle(2, Ok("newer"), OverlapPolicy::DiscardStale, Utc::now());
        let applied = state.settle(1, Ok("older"), OverlapPolicy::DiscardStale, Utc::now());

        assert!(!applied);
        assert_eq!(state.data, Some("newer"));
        assert_eq!(state.cycle, 2);
        assert_eq!(state.in_flight, 0);
    }

    #[test]
    fn test_overlap_policy_serialization() {
        assert_eq!(
            serde_json::to_string(&OverlapPolicy::LastSettledWins).unwrap(),
            "\"last-settled-wins\""
        );
        assert_eq!(
            serde_json::to_string(&OverlapPolicy::DiscardStale).unwrap(),
            "\"discard-stale\""
        );
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::DiscardStale);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    // Sequential cycles behave the same under either policy: the last outcome decides
    #[quickcheck]
    fn prop_sequential_cycles_follow_last_outcome(outcomes: Vec<Option<u8>>, discard: bool) -> bool {
        let policy = if discard {
            OverlapPolicy::DiscardStale
        } else {
            OverlapPolicy::LastSettledWins
        };
        let mut state = FetchState::new();

        for (index, outcome) in outcomes.iter().enumerate() {
            state.begin_cycle();
            let result = outcome.ok_or_else(|| format!("failure {}", index));
            state.settle(index as u64 + 1, result, policy, Utc::now());
        }

        let last_success = outcomes.iter().rev().find_map(|o| *o);
        let trailing_failures = outcomes.iter().rev().take_while(|o| o.is_none()).count();
        let error_expected = matches!(outcomes.last(), Some(None));

        let loading_ok = if outcomes.is_empty() {
            state.is_loading
        } else {
            !state.is_loading
        };

        state.data == last_success
            && state.error.is_some() == error_expected
            && state.consecutive_failures as usize == trailing_failures
            && loading_ok
    }

    // Under DiscardStale the newest cycle always ends up applied, whatever the settle order
    #[quickcheck]
    fn prop_discard_stale_never_regresses(keys: Vec<u8>) -> bool {
        if keys.is_empty() {
            return true;
        }

        let mut order: Vec<(u8, u64)> = keys
            .iter()
            .enumerate()
            .map(|(index, key)| (*key, index as u64 + 1))
            .collect();
        order.sort();

        let mut state = FetchState::new();
        for _ in 0..order.len() {
            state.begin_cycle();
        }

        let mut highest_seen = 0;
        for (_, cycle) in &order {
            state.settle(*cycle, Ok(*cycle), OverlapPolicy::DiscardStale, Utc::now());
            highest_seen = highest_seen.max(*cycle);
            if state.cycle != highest_seen || state.data != Some(highest_seen) {
                return false;
            }
        }

        state.in_flight == 0 && !state.is_loading
    }
}
