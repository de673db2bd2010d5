//! Broker policy values.
//!
//! These are the knobs that change *behaviour* rather than addresses or
//! ports.  The relay binary builds a [`BrokerPolicy`] from its configuration
//! and hands it to the session table and the sweeper.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a `join` against an identifier with no session is treated.
///
/// Deployments differ on whether the controlled device must register its
/// identifier out of band (HTTP `POST /register`) before anyone can join,
/// or whether the first `join` both reserves and binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// A `join` on an unregistered identifier reserves it and binds the
    /// joining connection in one atomic step.
    #[default]
    ReserveOnJoin,
    /// A `join` on an unregistered identifier fails with `NotRegistered`.
    RequireReservation,
}

impl JoinPolicy {
    /// Returns the kebab-case name used in CLI flags and TOML files.
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinPolicy::ReserveOnJoin => "reserve-on-join",
            JoinPolicy::RequireReservation => "require-reservation",
        }
    }
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reserve-on-join" => Ok(JoinPolicy::ReserveOnJoin),
            "require-reservation" => Ok(JoinPolicy::RequireReservation),
            other => Err(format!(
                "unknown join policy '{other}' (expected 'reserve-on-join' or 'require-reservation')"
            )),
        }
    }
}

/// Behavioural policy for the session broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerPolicy {
    /// Sessions whose last activity is at least this old are evicted by the
    /// sweeper.  Also serves as the grace window during which an idle
    /// session keeps its reservation.
    pub idle_timeout: Duration,
    /// Whether `join` may create a session.
    pub join_policy: JoinPolicy,
}

impl Default for BrokerPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            join_policy: JoinPolicy::default(),
        }
    }
}
