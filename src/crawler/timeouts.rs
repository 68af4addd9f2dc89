//! Adaptive per-domain timeout policy
//!
//! Hosts that keep failing to connect for image and other binary assets are
//! probably down or blocking us. For those, the connect timeout is shortened so
//! the run converges faster, accepting that a slow but alive host may get cut
//! off. Pages, stylesheets and scripts always get the default timeouts.

use crate::config::TimeoutConfig;
use crate::state::DomainFailureCounters;
use crate::url::{domain_key, AssetClass};
use std::time::Duration;

/// Failure count above which the connect timeout is halved
const HALVE_AFTER_FAILURES: u32 = 5;

/// Failure count above which the connect timeout is quartered
const QUARTER_AFTER_FAILURES: u32 = 20;

/// Connect and read timeouts to use for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

/// Maps URLs to timeouts based on the connect-failure history of their domain
///
/// The scheduler owns the policy and is the only writer. Tasks work on an
/// immutable snapshot taken when they are dispatched.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    default_connect: Duration,
    default_read: Duration,
    connect_attempts: u32,
    failures: DomainFailureCounters,
}

impl TimeoutPolicy {
    /// Creates a policy with the given defaults and no recorded failures
    pub fn new(default_connect: Duration, default_read: Duration, connect_attempts: u32) -> Self {
        Self {
            default_connect,
            default_read,
            connect_attempts: connect_attempts.max(1),
            failures: DomainFailureCounters::new(),
        }
    }

    /// Creates a policy from the timeout section of the configuration
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(config.connect(), config.read(), config.connect_attempts)
    }

    /// Returns the timeouts to use when fetching `url`
    pub fn timeouts_for(&self, url: &str) -> UrlTimeouts {
        match AssetClass::of(url) {
            AssetClass::Page | AssetClass::NonImageAsset => self.defaults(),
            AssetClass::Binary => {
                self.binary_timeouts(self.failures.get(&domain_key(url)))
            }
        }
    }

    fn binary_timeouts(&self, failures: u32) -> UrlTimeouts {
        let connect = if failures > QUARTER_AFTER_FAILURES {
            self.default_connect / 4
        } else if failures > HALVE_AFTER_FAILURES {
            self.default_connect / 2
        } else {
            self.default_connect
        };

        UrlTimeouts {
            connect,
            read: self.default_read,
        }
    }

    /// The undegraded timeouts
    pub fn defaults(&self) -> UrlTimeouts {
        UrlTimeouts {
            connect: self.default_connect,
            read: self.default_read,
        }
    }

    /// Every connect timeout this policy can hand out
    pub fn connect_tiers(&self) -> [Duration; 3] {
        [
            self.default_connect,
            self.default_connect / 2,
            self.default_connect / 4,
        ]
    }

    /// Number of attempts made before a connection failure is final
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    /// Folds a finished task's connect failures into the history
    pub fn record_failures(&mut self, delta: &DomainFailureCounters) {
        self.failures.merge(delta);
    }

    /// Returns the recorded connect-failure count for a domain key
    pub fn failure_count(&self, domain: &str) -> u32 {
        self.failures.get(domain)
    }

    /// All recorded failures
    pub fn failures(&self) -> &DomainFailureCounters {
        &self.failures
    }
}
