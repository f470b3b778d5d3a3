//! Per-connection negotiated state.
//!
//! A [`Session`] is created when a transport is established and dropped when
//! it is lost, so nothing here survives a reconnect.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::caps::{Cap, CapState};
use crate::isupport::Isupport;
use crate::sasl::SaslState;

/// Capabilities tracked during negotiation, in the order the server offered
/// them.
#[derive(Clone, Debug, Default)]
pub struct CapTable {
    entries: Vec<(Cap, CapState)>,
}

impl CapTable {
    /// Track an offered capability as [`CapState::Pending`].
    ///
    /// Re-offering (e.g. `CAP NEW` after `CAP DEL`) refreshes the value and
    /// makes the capability pending again.
    pub fn offer(&mut self, cap: Cap) {
        match self.entries.iter_mut().find(|(c, _)| c.name == cap.name) {
            Some(entry) => *entry = (cap, CapState::Pending),
            None => self.entries.push((cap, CapState::Pending)),
        }
    }

    /// Update a tracked capability. Returns `false` if it is not tracked.
    pub fn set_state(&mut self, name: &str, state: CapState) -> bool {
        match self.entries.iter_mut().find(|(c, _)| c.name == name) {
            Some((_, s)) => {
                *s = state;
                true
            }
            None => false,
        }
    }

    pub fn state(&self, name: &str) -> Option<CapState> {
        self.entries
            .iter()
            .find(|(c, _)| c.name == name)
            .map(|(_, s)| *s)
    }

    /// The capability as offered, including its value.
    pub fn offered(&self, name: &str) -> Option<&Cap> {
        self.entries.iter().find(|(c, _)| c.name == name).map(|(c, _)| c)
    }

    /// Names still waiting for ACK or NAK.
    pub fn pending(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == CapState::Pending)
            .map(|(c, _)| c.name.clone())
            .collect()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Cap> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == CapState::Enabled)
            .map(|(c, _)| c)
    }

    pub fn all_decided(&self) -> bool {
        self.entries.iter().all(|(_, s)| s.is_decided())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of a liveness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// Lag is acceptable; send a fresh PING.
    SendPing,
    /// A PING is outstanding but not yet overdue.
    Waiting,
    /// Lag exceeded the threshold.
    Lagged(Duration),
}

/// State negotiated over one connection.
#[derive(Default)]
pub struct Session {
    pub isupport: Isupport,
    pub caps: CapTable,
    /// Mask of the server that sent 001.
    pub server_name: Option<String>,
    pub sasl: SaslState,
    cap_end_sent: bool,
    ping_stamp: Option<String>,
    last_ping_sent: Option<Instant>,
    last_pong_received: Option<Instant>,
    lag: Option<Duration>,
    data: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per session, for the caller that should
    /// send `CAP END`.
    pub fn take_cap_end(&mut self) -> bool {
        !std::mem::replace(&mut self.cap_end_sent, true)
    }

    pub fn cap_end_sent(&self) -> bool {
        self.cap_end_sent
    }

    /// Record a PING carrying `stamp`.
    pub fn ping_sent(&mut self, stamp: impl Into<String>, at: Instant) {
        self.ping_stamp = Some(stamp.into());
        self.last_ping_sent = Some(at);
    }

    /// Record a PONG. Stamps that do not match the outstanding PING are
    /// ignored. Returns the measured lag.
    pub fn pong_received(&mut self, stamp: &str, at: Instant) -> Option<Duration> {
        if self.ping_stamp.as_deref() != Some(stamp) {
            return None;
        }
        self.ping_stamp = None;
        let sent = self.last_ping_sent?;
        let lag = at.saturating_duration_since(sent);
        self.last_pong_received = Some(at);
        self.lag = Some(lag);
        Some(lag)
    }

    pub fn awaiting_pong(&self) -> bool {
        self.ping_stamp.is_some()
    }

    /// Most recent round trip time.
    pub fn lag(&self) -> Option<Duration> {
        self.lag
    }

    pub fn last_ping_sent(&self) -> Option<Instant> {
        self.last_ping_sent
    }

    pub fn last_pong_received(&self) -> Option<Instant> {
        self.last_pong_received
    }

    /// Decide what the pinger should do at `now`.
    pub fn liveness(&self, now: Instant, max_lag: Duration) -> Liveness {
        if self.awaiting_pong() {
            let pending = self
                .last_ping_sent
                .map_or(Duration::ZERO, |sent| now.saturating_duration_since(sent));
            return if pending > max_lag {
                Liveness::Lagged(pending)
            } else {
                Liveness::Waiting
            };
        }
        match self.lag {
            Some(lag) if lag > max_lag => Liveness::Lagged(lag),
            _ => Liveness::SendPing,
        }
    }

    /// Store hook-defined data, returning any previous value of that type.
    pub fn insert_data<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.data
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok())
            .map(|old| *old)
    }

    pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.data.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn data_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.data.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn remove_data<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast().ok())
            .map(|old| *old)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("isupport", &self.isupport)
            .field("caps", &self.caps)
            .field("server_name", &self.server_name)
            .field("sasl", &self.sasl)
            .field("cap_end_sent", &self.cap_end_sent)
            .field("lag", &self.lag)
            .field("data", &self.data.len())
            .finish_non_exhaustive()
    }
}
