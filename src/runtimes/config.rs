//! Scheduler configuration.

use std::time::Duration;

/// How the router treats a delivery whose tag the target does not declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RouterMode {
    /// A tag mismatch is a routing fault that fails the run.
    #[default]
    Strict,
    /// A tag mismatch is logged and the delivery dropped. The run can still
    /// end in a stall error if dropping starves it of output.
    Lenient,
}

/// Tunables for one workflow's scheduler.
///
/// Attached to a workflow at build time via
/// [`GraphBuilder::with_config`](crate::graphs::GraphBuilder::with_config).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flowmesh::runtimes::{RouterMode, SchedulerConfig};
///
/// let config = SchedulerConfig::default()
///     .with_router_mode(RouterMode::Lenient)
///     .with_max_deliveries(500)
///     .with_quorum_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_deliveries, 500);
/// ```
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Tag-mismatch policy.
    pub router_mode: RouterMode,
    /// Hard cap on total deliveries per run; exceeding it fails the run.
    /// Backstop against cycles that carry no loop cap.
    pub max_deliveries: u64,
    /// Optional wall-clock bound on waiting for the next handler result while
    /// a fan-in round is incomplete.
    pub quorum_timeout: Option<Duration>,
    /// Bounded capacity of each node's mailbox.
    pub mailbox_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            router_mode: RouterMode::Strict,
            max_deliveries: 10_000,
            quorum_timeout: None,
            mailbox_capacity: 64,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_router_mode(mut self, mode: RouterMode) -> Self {
        self.router_mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_deliveries(mut self, limit: u64) -> Self {
        self.max_deliveries = limit;
        self
    }

    #[must_use]
    pub fn with_quorum_timeout(mut self, timeout: Duration) -> Self {
        self.quorum_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }
}
