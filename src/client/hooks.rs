//! Hook tables and one-shot waiters.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use super::Client;
use crate::caps::Cap;
use crate::error::Result;
use crate::message::Message;

/// The future a hook returns. It runs as its own task.
pub type HookFuture = BoxFuture<'static, Result<()>>;

/// Handler for inbound messages.
pub type Handler = Arc<dyn Fn(Client, Message) -> HookFuture + Send + Sync>;

/// Handler run when a capability is acknowledged. It receives the
/// capability as the server offered it.
pub type CapHandler = Arc<dyn Fn(Client, Cap) -> HookFuture + Send + Sync>;

/// Identifies a registered hook. Ids increase with registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a hook fires on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// One command or numeric.
    Command(String),
    /// Every message.
    Any,
}

impl Trigger {
    pub fn matches(&self, command: &str) -> bool {
        match self {
            Self::Command(c) => c.eq_ignore_ascii_case(command),
            Self::Any => true,
        }
    }
}

impl From<&str> for Trigger {
    /// `"*"` is the wildcard.
    fn from(s: &str) -> Self {
        match s {
            "*" => Self::Any,
            command => Self::Command(command.to_ascii_uppercase()),
        }
    }
}

impl From<String> for Trigger {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[derive(Default)]
pub(crate) struct HookTable {
    next_id: u64,
    hooks: BTreeMap<HookId, (Trigger, Handler)>,
    caps: HashMap<String, Vec<Option<CapHandler>>>,
}

impl HookTable {
    pub(crate) fn insert(&mut self, trigger: Trigger, handler: Handler) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.insert(id, (trigger, handler));
        id
    }

    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        self.hooks.remove(&id).is_some()
    }

    /// Snapshot of the handlers matching `command`, in registration order.
    pub(crate) fn matching(&self, command: &str) -> Vec<Handler> {
        self.hooks
            .values()
            .filter(|(trigger, _)| trigger.matches(command))
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    pub(crate) fn add_cap(&mut self, name: &str, handler: Option<CapHandler>) {
        self.caps.entry(name.to_owned()).or_default().push(handler);
    }

    pub(crate) fn has_cap(&self, name: &str) -> bool {
        self.caps.contains_key(name)
    }

    pub(crate) fn cap_handlers(&self, name: &str) -> Vec<CapHandler> {
        self.caps
            .get(name)
            .into_iter()
            .flatten()
            .flatten()
            .cloned()
            .collect()
    }
}

/// A pending wait for the next message matching one of several commands.
///
/// The hooks are registered when the waiter is created, so the request that
/// prompts the reply can be sent afterwards without racing it. They are
/// removed when the waiter is dropped.
#[must_use = "a waiter does nothing unless awaited"]
pub struct Waiter {
    client: Client,
    ids: Vec<HookId>,
    rx: mpsc::Receiver<Message>,
}

impl Waiter {
    pub(crate) fn new(client: &Client, commands: &[&str]) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let ids = commands
            .iter()
            .map(|command| {
                let tx = tx.clone();
                client.register(*command, move |_, message| {
                    // Only the first match is kept.
                    let _ = tx.try_send(message);
                    futures_util::future::ready(Ok(()))
                })
            })
            .collect();
        Self {
            client: client.clone(),
            ids,
            rx,
        }
    }

    /// Wait for the first matching message. Returns `None` on timeout, or
    /// immediately when no commands were given.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Option<Message> {
        if self.ids.is_empty() {
            return None;
        }
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.rx.recv())
                .await
                .ok()
                .flatten(),
            None => self.rx.recv().await,
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.client.unregister(id);
        }
    }
}
