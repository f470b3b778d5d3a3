//! `CAP` negotiation.
//!
//! Only capabilities with a registered capability hook are requested. The
//! LS/NEW/DEL/NAK bookkeeping happens while the hook is called, in line
//! order; handlers for acknowledged capabilities run in the returned
//! future, and `CAP END` goes out once every tracked capability is decided.

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::caps::{Cap, CapList, CapState};
use crate::client::{CapHandler, Client, HookFuture};
use crate::error::Result;
use crate::message::Message;

/// An acknowledged capability whose handlers still have to run.
type Deferred = (Cap, Vec<CapHandler>);

pub(super) fn on_cap(client: Client, message: Message) -> HookFuture {
    let deferred = handle(&client, &message);
    Box::pin(async move {
        for (cap, handlers) in deferred? {
            enable(&client, cap, handlers).await?;
        }
        Ok(())
    })
}

fn handle(client: &Client, message: &Message) -> Result<Vec<Deferred>> {
    let params = message.params();
    let Some(subcommand) = params.get(1) else {
        return Ok(Vec::new());
    };
    let caps = match params.len() {
        n if n > 2 => CapList::parse(&params[n - 1]),
        _ => CapList::default(),
    };

    match subcommand.to_ascii_uppercase().as_str() {
        "LS" => {
            // `CAP * LS * :...` announces another page.
            let last_page = !(params.len() > 3 && params[2] == "*");
            offer(client, caps, last_page, true)?;
        }
        "NEW" => offer(client, caps, true, false)?,
        "ACK" => return acknowledge(client, caps),
        "NAK" => {
            for cap in caps {
                decide(client, &cap.name, CapState::Disabled)?;
            }
            finish(client)?;
        }
        "DEL" => {
            for cap in caps {
                decide(client, &cap.name, CapState::Disabled)?;
            }
        }
        "LIST" => info!(caps = %caps, "enabled capabilities"),
        other => debug!(subcommand = other, "ignoring CAP subcommand"),
    }
    Ok(Vec::new())
}

fn offer(client: &Client, caps: CapList, last_page: bool, is_ls: bool) -> Result<()> {
    let wanted: Vec<Cap> = caps
        .into_iter()
        .filter(|cap| client.has_cap_hook(&cap.name))
        .collect();
    let new_names: Vec<String> = wanted.iter().map(|cap| cap.name.clone()).collect();

    let lines = client.with_session(|session| {
        for cap in wanted {
            session.caps.offer(cap);
        }
        if !last_page {
            return Vec::new();
        }
        if !is_ls {
            return req_lines(new_names);
        }
        if session.caps.is_empty() {
            if session.take_cap_end() {
                return vec!["CAP END".to_owned()];
            }
            return Vec::new();
        }
        req_lines(session.caps.pending())
    })?;

    for line in lines {
        client.send(line);
    }
    Ok(())
}

fn req_lines(names: Vec<String>) -> Vec<String> {
    names.into_iter().map(|name| format!("CAP REQ :{}", name)).collect()
}

fn acknowledge(client: &Client, caps: CapList) -> Result<Vec<Deferred>> {
    let mut deferred = Vec::new();
    for cap in caps {
        if let Some(name) = cap.name.strip_prefix('-') {
            decide(client, name, CapState::Disabled)?;
            continue;
        }

        let offered = client.with_session(|session| session.caps.offered(&cap.name).cloned())?;
        let Some(offered) = offered else {
            debug!(cap = %cap.name, "ignoring ACK for untracked capability");
            continue;
        };
        let handlers = client.cap_handlers(&cap.name);
        if handlers.is_empty() {
            decide(client, &cap.name, CapState::Enabled)?;
        } else {
            deferred.push((offered, handlers));
        }
    }
    finish(client)?;
    Ok(deferred)
}

/// Run every handler of an acknowledged capability, then mark it enabled.
async fn enable(client: &Client, cap: Cap, handlers: Vec<CapHandler>) -> Result<()> {
    let runs = handlers.iter().map(|handler| handler(client.clone(), cap.clone()));
    let results = join_all(runs).await;
    for result in results {
        if let Err(e) = result {
            warn!(cap = %cap.name, "capability handler failed: {}", e);
        }
    }
    decide(client, &cap.name, CapState::Enabled)?;
    finish(client)
}

fn decide(client: &Client, name: &str, state: CapState) -> Result<()> {
    if client.with_session(|session| session.caps.set_state(name, state))? {
        debug!(cap = name, ?state, "capability decided");
    } else {
        debug!(cap = name, "ignoring untracked capability");
    }
    Ok(())
}

/// Send `CAP END` once every tracked capability is decided.
fn finish(client: &Client) -> Result<()> {
    let done = client.with_session(|session| {
        !session.caps.is_empty() && session.caps.all_decided() && session.take_cap_end()
    })?;
    if done {
        client.send("CAP END");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::client::ClientConfig;
    use crate::server::ServerDescriptor;
    use crate::session::Session;
    use crate::transport::{BoxedStream, Connector};

    struct NoConnector;

    impl Connector for NoConnector {
        fn connect<'a>(
            &'a self,
            _: &'a ServerDescriptor,
        ) -> futures_util::future::BoxFuture<'a, std::io::Result<BoxedStream>> {
            Box::pin(async { Err(std::io::ErrorKind::ConnectionRefused.into()) })
        }
    }

    fn client() -> Client {
        let config = ClientConfig::new("nick", vec![ServerDescriptor::tcp("localhost", 6667)]);
        let client = Client::with_connector(config, NoConnector).unwrap();
        *crate::client::lock(&client.inner.session) = Some(Session::new());
        client
    }

    /// Drain everything queued for sending.
    fn sent(client: &Client) -> Vec<String> {
        let mut rx = client.inner.outbound_rx.try_lock().unwrap();
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn cap(line: &str) -> Message {
        line.parse().unwrap()
    }

    #[tokio::test]
    async fn test_ls_without_tracked_caps_ends() {
        let client = client();
        on_cap(client.clone(), cap(":srv CAP * LS :foo bar")).await.unwrap();
        assert_eq!(sent(&client), ["CAP END"]);
    }

    #[tokio::test]
    async fn test_multi_page_ls() {
        let client = client();
        client.register_cap("foo");
        client.register_cap("bar");

        on_cap(client.clone(), cap(":srv CAP * LS * :foo baz")).await.unwrap();
        assert!(sent(&client).is_empty());

        on_cap(client.clone(), cap(":srv CAP * LS :bar")).await.unwrap();
        assert_eq!(sent(&client), ["CAP REQ :foo", "CAP REQ :bar"]);

        on_cap(client.clone(), cap(":srv CAP nick ACK :foo")).await.unwrap();
        assert!(sent(&client).is_empty());
        on_cap(client.clone(), cap(":srv CAP nick NAK :bar")).await.unwrap();
        assert_eq!(sent(&client), ["CAP END"]);

        let states = client
            .with_session(|s| (s.caps.state("foo"), s.caps.state("bar")))
            .unwrap();
        assert_eq!(states, (Some(CapState::Enabled), Some(CapState::Disabled)));
    }

    #[tokio::test]
    async fn test_ack_runs_handlers_with_offered_value() {
        let client = client();
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.register_cap_handler("draft/example", move |_, cap: Cap| {
            let _ = tx.send(cap);
            async { Ok(()) }
        });

        on_cap(client.clone(), cap(":srv CAP * LS :draft/example=a,b")).await.unwrap();
        assert_eq!(sent(&client), ["CAP REQ :draft/example"]);

        on_cap(client.clone(), cap(":srv CAP nick ACK :draft/example")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().value.as_deref(), Some("a,b"));
        assert_eq!(sent(&client), ["CAP END"]);
    }

    #[tokio::test]
    async fn test_cap_end_sent_once() {
        let client = client();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.register_cap_handler("foo", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        on_cap(client.clone(), cap(":srv CAP * LS :foo")).await.unwrap();
        on_cap(client.clone(), cap(":srv CAP nick ACK :foo")).await.unwrap();
        on_cap(client.clone(), cap(":srv CAP nick NEW :foo")).await.unwrap();
        on_cap(client.clone(), cap(":srv CAP nick ACK :foo")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sent(&client), ["CAP REQ :foo", "CAP END", "CAP REQ :foo"]);
    }

    #[tokio::test]
    async fn test_del_and_negated_ack() {
        let client = client();
        client.register_cap("foo");
        client.register_cap("bar");

        on_cap(client.clone(), cap(":srv CAP * LS :foo bar")).await.unwrap();
        on_cap(client.clone(), cap(":srv CAP nick ACK :foo -bar")).await.unwrap();
        assert_eq!(sent(&client), ["CAP REQ :foo", "CAP REQ :bar", "CAP END"]);

        on_cap(client.clone(), cap(":srv CAP nick DEL :foo")).await.unwrap();
        assert_eq!(
            client.with_session(|s| s.caps.state("foo")).unwrap(),
            Some(CapState::Disabled)
        );
        assert!(sent(&client).is_empty());
    }

    #[tokio::test]
    async fn test_without_session() {
        let client = client();
        client.with_session(|_| ()).unwrap();
        *crate::client::lock(&client.inner.session) = None;
        assert!(on_cap(client, cap(":srv CAP * LS :foo")).await.is_err());
    }
}
