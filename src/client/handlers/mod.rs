//! Built-in hooks.

mod cap;
mod sasl;

use futures_util::future::{ready, Ready};
use tokio::time::Instant;
use tracing::{debug, info};

use super::{Client, ConnectionState};
use crate::caps::Capability;
use crate::error::{Error, Result};
use crate::message::Message;

/// Marks the PING tokens sent by the liveness check.
pub(crate) const LAG_PREFIX: &str = "LAG";

pub(super) fn install(client: &Client) {
    client.register("PING", on_ping);
    client.register("PONG", on_pong);
    client.register("CAP", cap::on_cap);
    client.register("001", on_welcome);
    client.register("005", on_isupport);
    client.register_cap_handler(Capability::Sasl, sasl::authenticate);
}

fn on_ping(client: Client, message: Message) -> Ready<Result<()>> {
    client.send(Message::new("PONG", message.params().iter().cloned()));
    ready(Ok(()))
}

fn on_pong(client: Client, message: Message) -> Ready<Result<()>> {
    let Some(stamp) = message.params().last().filter(|p| p.starts_with(LAG_PREFIX)) else {
        return ready(Ok(()));
    };
    let now = Instant::now().into_std();
    ready(client.with_session(|session| {
        if let Some(lag) = session.pong_received(stamp, now) {
            debug!(?lag, "lag measured");
        }
    }))
}

fn on_welcome(client: Client, message: Message) -> Ready<Result<()>> {
    ready(welcome(&client, &message))
}

fn welcome(client: &Client, message: &Message) -> Result<()> {
    let prefix = message
        .prefix()
        .ok_or_else(|| Error::MissingPrefix(message.to_string()))?;
    let name = prefix.mask();
    client.with_session(|session| session.server_name = Some(name.clone()))?;
    client.set_state(ConnectionState::Registered);
    info!(server = %name, "registered");
    Ok(())
}

fn on_isupport(client: Client, message: Message) -> Ready<Result<()>> {
    ready(client.with_session(|session| session.isupport.apply_reply(message.params())))
}
