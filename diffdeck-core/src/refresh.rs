//! Single-flight admission for provider fetches.
//!
//! At most one fetch is outstanding per session. A request that arrives while
//! one is in flight is either coalesced into a single pending follow-up or
//! discarded, depending on the [`OverlapPolicy`].

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Remember that another refresh was asked for and run it once the
    /// current fetch completes. Any number of overlapping requests collapse
    /// into one.
    #[default]
    Queue,
    /// Discard requests that overlap a running fetch.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admit {
    /// Issue a fetch tagged with this generation.
    Begin(u64),
    Queued,
    Dropped,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    policy: OverlapPolicy,
    in_flight: Option<u64>,
    pending: bool,
    generation: u64,
}

impl RefreshGate {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: OverlapPolicy) {
        self.policy = policy;
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn admit(&mut self) -> Admit {
        if self.in_flight.is_some() {
            return match self.policy {
                OverlapPolicy::Queue => {
                    self.pending = true;
                    Admit::Queued
                }
                OverlapPolicy::Drop => Admit::Dropped,
            };
        }
        self.generation += 1;
        self.in_flight = Some(self.generation);
        Admit::Begin(self.generation)
    }

    /// Marks the fetch `generation` as finished.
    ///
    /// Returns `None` when `generation` is not the fetch in flight (a late
    /// answer from before a reset), otherwise whether a queued follow-up is
    /// owed. The pending flag is consumed.
    pub fn complete(&mut self, generation: u64) -> Option<bool> {
        if self.in_flight != Some(generation) {
            return None;
        }
        self.in_flight = None;
        Some(std::mem::take(&mut self.pending))
    }

    /// Forgets the in-flight fetch and any pending follow-up. The generation
    /// counter keeps counting so answers to forgotten fetches stay stale.
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_requests_coalesce_into_one_follow_up() {
        let mut gate = RefreshGate::new(OverlapPolicy::Queue);
        assert_eq!(gate.admit(), Admit::Begin(1));
        assert_eq!(gate.admit(), Admit::Queued);
        assert_eq!(gate.admit(), Admit::Queued);
        assert_eq!(gate.complete(1), Some(true));
        assert_eq!(gate.admit(), Admit::Begin(2));
        assert_eq!(gate.complete(2), Some(false));
    }

    #[test]
    fn drop_policy_discards_overlap() {
        let mut gate = RefreshGate::new(OverlapPolicy::Drop);
        assert_eq!(gate.admit(), Admit::Begin(1));
        assert_eq!(gate.admit(), Admit::Dropped);
        assert_eq!(gate.complete(1), Some(false));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let mut gate = RefreshGate::default();
        assert_eq!(gate.admit(), Admit::Begin(1));
        gate.reset();
        assert_eq!(gate.complete(1), None);
        assert_eq!(gate.admit(), Admit::Begin(2));
        assert_eq!(gate.complete(1), None);
        assert_eq!(gate.in_flight(), Some(2));
    }

    #[test]
    fn policy_parses_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: OverlapPolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"drop\"").unwrap();
        assert_eq!(w.policy, OverlapPolicy::Drop);
    }
}
