// Weakness snapshot cache: holds the baseline and current team weakness
// vectors, keyed by the player-id sets used to compute them. Identical key
// pairs never refetch, and a monotonically increasing request token makes
// the newest refresh win regardless of response arrival order.

use std::sync::Arc;

use futures_util::future::join;
use tracing::{debug, info};

use crate::gateway::Gateway;
use crate::player::{PlayerId, WeaknessVector};

pub const FALLBACK_WEAKNESS: &str = "Failed to compute team weakness";

/// The comma-joined, insertion-order cache key for an id set. The gateway is
/// keyed on the exact sequence it is given, so no sort is applied.
pub fn cache_key(ids: &[PlayerId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Fetch job and outcome
// ---------------------------------------------------------------------------

/// Both vectors of one refresh. An empty id set resolves to `None` without
/// a gateway call.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaknessPair {
    pub baseline: Option<WeaknessVector>,
    pub current: Option<WeaknessVector>,
}

#[derive(Debug)]
pub struct WeaknessFetch {
    token: u64,
    working: Vec<PlayerId>,
    baseline: Vec<PlayerId>,
}

impl WeaknessFetch {
    /// Issue the two vector fetches concurrently. Either failure fails the
    /// pair as a whole; the cache decides what to keep on screen.
    pub async fn run(self, gateway: Arc<dyn Gateway>) -> WeaknessOutcome {
        let fetch = |ids: Vec<PlayerId>| {
            let gateway = Arc::clone(&gateway);
            async move {
                if ids.is_empty() {
                    return Ok(None);
                }
                gateway
                    .get_team_weakness(&ids)
                    .await
                    .map(Some)
                    .map_err(|e| e.user_message(FALLBACK_WEAKNESS))
            }
        };

        let (baseline, current) = join(fetch(self.baseline), fetch(self.working)).await;
        let result = match (baseline, current) {
            (Ok(baseline), Ok(current)) => Ok(WeaknessPair { baseline, current }),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        WeaknessOutcome {
            token: self.token,
            result,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeaknessOutcome {
    pub token: u64,
    pub result: Result<WeaknessPair, String>,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct WeaknessCache {
    baseline: Option<WeaknessVector>,
    current: Option<WeaknessVector>,
    loading: bool,
    error: Option<String>,
    /// Key pair of the in-flight or last successful refresh. Cleared on
    /// failure so an unchanged composition can retry.
    last_keys: Option<(String, String)>,
    /// Token of the newest refresh; older outcomes are discarded wholesale.
    token: u64,
    /// Whether any refresh has succeeded yet. Until then a failure has no
    /// previous vectors to preserve.
    had_success: bool,
}

impl WeaknessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<&WeaknessVector> {
        self.baseline.as_ref()
    }

    pub fn current(&self) -> Option<&WeaknessVector> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Begin a refresh for the given working/baseline id sets.
    ///
    /// Returns `None` (no network round-trip) when both sets are empty, or
    /// when the key pair matches the in-flight or last successful refresh
    /// and `force` is not set. Otherwise returns the fetch job; the caller
    /// runs it and feeds the outcome back through [`apply`](Self::apply).
    pub fn begin_refresh(
        &mut self,
        working: &[PlayerId],
        baseline: &[PlayerId],
        force: bool,
    ) -> Option<WeaknessFetch> {
        let working_key = cache_key(working);
        let baseline_key = cache_key(baseline);

        if working.is_empty() && baseline.is_empty() {
            self.baseline = None;
            self.current = None;
            self.error = None;
            self.loading = false;
            self.last_keys = Some((working_key, baseline_key));
            return None;
        }

        let keys = (working_key, baseline_key);
        if !force && self.last_keys.as_ref() == Some(&keys) {
            debug!(working = %keys.0, baseline = %keys.1, "weakness refresh skipped (identical keys)");
            return None;
        }

        self.last_keys = Some(keys);
        self.token += 1;
        self.loading = true;
        self.error = None;
        info!(token = self.token, "weakness refresh issued");
        Some(WeaknessFetch {
            token: self.token,
            working: working.to_vec(),
            baseline: baseline.to_vec(),
        })
    }

    /// Apply a completed fetch. Outcomes from superseded refreshes are
    /// discarded so a stale pair can never clobber a newer one. Failures
    /// keep the previously displayed vectors once any refresh has succeeded.
    pub fn apply(&mut self, outcome: WeaknessOutcome) {
        if outcome.token != self.token {
            debug!(
                stale = outcome.token,
                latest = self.token,
                "discarding stale weakness outcome"
            );
            return;
        }
        self.loading = false;
        match outcome.result {
            Ok(pair) => {
                self.baseline = pair.baseline;
                self.current = pair.current;
                self.error = None;
                self.had_success = true;
            }
            Err(msg) => {
                self.error = Some(msg);
                // A failed pair is not a fetched pair; the same composition
                // stays eligible for a retry.
                self.last_keys = None;
                if !self.had_success {
                    self.baseline = None;
                    self.current = None;
                }
            }
        }
    }

    /// Freeze the current vector as the new baseline without a fetch.
    /// `working` is the roster the displayed current vector belongs to; its
    /// key is recorded for both sides so the next refresh with an unchanged
    /// roster is still a no-op. Nothing is recorded while the cache holds no
    /// cleanly fetched vector, so a freeze can never suppress a first fetch
    /// or a retry after a failure.
    pub fn freeze_baseline(&mut self, working: &[PlayerId]) {
        self.baseline = self.current;
        if self.current.is_some() && self.error.is_none() {
            let key = cache_key(working);
            self.last_keys = Some((key.clone(), key));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
