//! Connect to a network, join a channel and answer `!ping` for a while.
//!
//! ```text
//! cargo run --example connect -- irc.libera.chat '#slirc-test'
//! ```
//!
//! Set `IRC_SASL_USER` and `IRC_SASL_PASS` to authenticate with SASL PLAIN.

use std::env;
use std::time::Duration;

use anyhow::Context;
use slirc_engine::{Capability, Client, ClientConfig, ConnectionState, ServerDescriptor};
use tokio::time::timeout;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "irc.libera.chat".to_owned());
    let channel = args.next().unwrap_or_else(|| "#slirc-test".to_owned());

    let servers = vec![ServerDescriptor::tcp(&host, 6697).with_tls()];
    let mut config = ClientConfig::new("slirc-demo", servers).with_realname("slirc-engine demo");
    if let (Ok(user), Ok(pass)) = (env::var("IRC_SASL_USER"), env::var("IRC_SASL_PASS")) {
        config = config.with_sasl_plain(user, pass);
    }

    let client = Client::new(config).context("invalid configuration")?;
    client.register_cap(Capability::ServerTime);
    client.register_cap(Capability::MultiPrefix);

    client.register("PRIVMSG", |client, message| async move {
        let target = message.param(0).unwrap_or_default();
        if message.param(1) == Some("!ping") {
            client.send(format!("PRIVMSG {} :pong", target));
        }
        Ok(())
    });

    client.connect();
    timeout(Duration::from_secs(60), client.wait_for_state(ConnectionState::Registered))
        .await
        .context("registration timed out")?;

    let sasl = client.with_session(|session| session.sasl.clone())?;
    info!(?sasl, "registered");

    client.send(format!("JOIN {}", channel));
    tokio::time::sleep(Duration::from_secs(300)).await;

    client.quit(Some("demo finished")).await;
    Ok(())
}
