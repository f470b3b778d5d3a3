//! The reconnecting connection core.
//!
//! A [`Client`] keeps one connection alive across a list of candidate
//! servers. Every inbound line is parsed and fanned out to the registered
//! hooks; outbound lines are queued and written in order whenever a
//! connection is up.
//!
//! Hooks are called in line order from the connection task. Whatever they
//! do before returning their future therefore happens in order; the future
//! itself runs as a separate task, and is cancelled when the connection
//! that delivered the message ends.
//!
//! ```no_run
//! use slirc_engine::{Client, ClientConfig, ConnectionState, ServerDescriptor};
//!
//! # async fn run() -> slirc_engine::Result<()> {
//! let servers = vec![ServerDescriptor::tcp("irc.libera.chat", 6697).with_tls()];
//! let config = ClientConfig::new("engine", servers);
//! let client = Client::new(config)?;
//!
//! client.register("PRIVMSG", |client, message| async move {
//!     if message.param(1) == Some("!ping") {
//!         client.send(format!("PRIVMSG {} :pong", message.param(0).unwrap_or_default()));
//!     }
//!     Ok(())
//! });
//!
//! client.connect();
//! client.wait_for_state(ConnectionState::Registered).await;
//! client.send("JOIN #slirc");
//! client.quit(Some("bye")).await;
//! # Ok(())
//! # }
//! ```

mod config;
mod handlers;
mod hooks;

pub use self::config::{
    ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_LAG, DEFAULT_PING_INTERVAL,
    DEFAULT_RECONNECT_BASE,
};
pub use self::hooks::{CapHandler, Handler, HookFuture, HookId, Trigger, Waiter};

use std::fmt::{self, Display};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use self::hooks::HookTable;
use crate::backoff::Delayer;
use crate::caps::{Cap, NegotiationVersion};
use crate::codec::LineCodec;
use crate::error::{ConfigError, Error, Result};
use crate::message::Message;
use crate::server::ServerDescriptor;
use crate::session::{Liveness, Session};
use crate::transport::{BoxedStream, Connector, NetConnector};

type Transport = Framed<BoxedStream, LineCodec>;

/// Where the client is in its connection life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport, and none being opened right now.
    Disconnected,
    Connecting,
    /// Transport open, handshake in progress.
    Connected,
    /// The server sent 001.
    Registered,
    /// Shut down by [`Client::quit`] or [`Client::close`].
    Quit,
}

struct Inner {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    hooks: Mutex<HookTable>,
    session: Mutex<Option<Session>>,
    /// Cancelled when the current connection ends. Hook tasks hold a clone.
    connection: Mutex<CancellationToken>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    state: watch::Sender<ConnectionState>,
    quitting: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a connection. Clones share the same connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_line(transport: &mut Transport, line: String) -> Result<()> {
    debug!(">> {}", line);
    transport.send(line).await?;
    Ok(())
}

impl Client {
    /// Create a client that connects with [`NetConnector`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        let connector = NetConnector::new().with_certpath(config.certpath.clone());
        Self::with_connector(config, connector)
    }

    /// Create a client that opens its byte streams with `connector`.
    pub fn with_connector(config: ClientConfig, connector: impl Connector) -> Result<Self> {
        config.validate()?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let client = Self {
            inner: Arc::new(Inner {
                config,
                connector: Box::new(connector),
                hooks: Mutex::new(HookTable::default()),
                session: Mutex::new(None),
                connection: Mutex::new(CancellationToken::new()),
                outbound_tx,
                outbound_rx: tokio::sync::Mutex::new(outbound_rx),
                state,
                quitting: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        };
        handlers::install(&client);
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Start the connection task. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut task = lock(&self.inner.task);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        self.inner.quitting.store(false, Ordering::SeqCst);
        *task = Some(tokio::spawn(self.clone().run()));
    }

    /// Send `QUIT` and wait until the server closes the connection.
    ///
    /// Without an open connection this is the same as [`Client::close`].
    pub async fn quit(&self, reason: Option<&str>) {
        self.inner.quitting.store(true, Ordering::SeqCst);
        match self.state() {
            ConnectionState::Connected | ConnectionState::Registered => {
                match reason {
                    Some(reason) => self.send(Message::new("QUIT", [reason]).with_trailing()),
                    None => self.send("QUIT"),
                }
                self.wait_for_state(ConnectionState::Quit).await;
            }
            ConnectionState::Quit => {}
            ConnectionState::Disconnected | ConnectionState::Connecting => self.close(),
        }
    }

    /// Drop the connection immediately and stop reconnecting.
    pub fn close(&self) {
        self.inner.quitting.store(true, Ordering::SeqCst);
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
        lock(&self.inner.connection).cancel();
        *lock(&self.inner.session) = None;
        self.set_state(ConnectionState::Quit);
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the client enters `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) {
        let mut rx = self.subscribe();
        loop {
            if *rx.borrow_and_update() == target {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let old = self.inner.state.send_replace(state);
        if old != state {
            debug!(?old, new = ?state, "state changed");
        }
    }

    fn is_quitting(&self) -> bool {
        self.inner.quitting.load(Ordering::SeqCst)
    }

    /// Queue a line for sending. Lines queued while disconnected go out
    /// after the next handshake.
    pub fn send(&self, line: impl Display) {
        // The receiver lives as long as `inner`, so this cannot fail.
        let _ = self.inner.outbound_tx.send(line.to_string());
    }

    /// Register a hook for a command, numeric, or `"*"` for every message.
    pub fn register<T, F, Fut>(&self, trigger: T, handler: F) -> HookId
    where
        T: Into<Trigger>,
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |client: Client, message: Message| -> HookFuture {
                Box::pin(handler(client, message))
            });
        lock(&self.inner.hooks).insert(trigger.into(), handler)
    }

    /// Remove a hook. Returns `false` if it was not registered.
    pub fn unregister(&self, id: HookId) -> bool {
        lock(&self.inner.hooks).remove(id)
    }

    /// Number of registered hooks, built-in ones included.
    pub fn hook_count(&self) -> usize {
        lock(&self.inner.hooks).len()
    }

    /// Request a capability whenever a server offers it.
    pub fn register_cap(&self, name: impl AsRef<str>) {
        lock(&self.inner.hooks).add_cap(name.as_ref(), None);
    }

    /// Request a capability and run `handler` once it is acknowledged.
    ///
    /// `CAP END` waits for every handler of every requested capability.
    pub fn register_cap_handler<F, Fut>(&self, name: impl AsRef<str>, handler: F)
    where
        F: Fn(Client, Cap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: CapHandler = Arc::new(move |client: Client, cap: Cap| -> HookFuture {
            Box::pin(handler(client, cap))
        });
        lock(&self.inner.hooks).add_cap(name.as_ref(), Some(handler));
    }

    pub(crate) fn has_cap_hook(&self, name: &str) -> bool {
        lock(&self.inner.hooks).has_cap(name)
    }

    pub(crate) fn cap_handlers(&self, name: &str) -> Vec<CapHandler> {
        lock(&self.inner.hooks).cap_handlers(name)
    }

    /// Start waiting for one of `commands`. Send the request after this
    /// returns, then await [`Waiter::wait`].
    pub fn waiter(&self, commands: &[&str]) -> Waiter {
        Waiter::new(self, commands)
    }

    /// Wait for the next message matching one of `commands`.
    pub async fn wait_for(&self, commands: &[&str], timeout: Option<Duration>) -> Option<Message> {
        self.waiter(commands).wait(timeout).await
    }

    /// Run `f` against the current session.
    ///
    /// Fails with [`ConfigError::MissingSession`] while no connection is up.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        let mut session = lock(&self.inner.session);
        let session = session.as_mut().ok_or(ConfigError::MissingSession)?;
        Ok(f(session))
    }

    async fn run(self) {
        while let Some((server, stream)) = self.establish().await {
            let span = info_span!("connection", server = %server);
            self.serve(&server, stream).instrument(span).await;
            if self.is_quitting() {
                break;
            }
            info!(%server, "connection lost, reconnecting");
            self.set_state(ConnectionState::Disconnected);
        }
        self.set_state(ConnectionState::Quit);
    }

    /// Cycle through the servers until one accepts a connection.
    async fn establish(&self) -> Option<(ServerDescriptor, BoxedStream)> {
        let config = &self.inner.config;
        let mut delayer = Delayer::new(config.reconnect_base);

        for server in config.servers.iter().cycle() {
            if self.is_quitting() {
                return None;
            }
            self.set_state(ConnectionState::Connecting);
            info!(%server, "connecting");

            let attempt = self.inner.connector.connect(server);
            match tokio::time::timeout(config.connect_timeout, attempt).await {
                Ok(Ok(stream)) => return Some((server.clone(), stream)),
                Ok(Err(e)) => warn!(%server, "connection failed: {}", e),
                Err(_) => warn!("{}", Error::Timeout(server.to_string())),
            }

            self.set_state(ConnectionState::Disconnected);
            delayer.delay().await;
        }
        None
    }

    async fn serve(&self, server: &ServerDescriptor, stream: BoxedStream) {
        let scope = CancellationToken::new();
        *lock(&self.inner.connection) = scope.clone();
        let _teardown = scope.clone().drop_guard();
        *lock(&self.inner.session) = Some(Session::new());
        self.set_state(ConnectionState::Connected);
        info!("connected");

        let mut transport = Framed::new(stream, LineCodec::new());
        let mut outbound = self.inner.outbound_rx.lock().await;

        let result = match self.handshake(server, &mut transport).await {
            Ok(()) => self.pump(&mut transport, &mut outbound).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("connection error: {}", e);
        }

        scope.cancel();
        *lock(&self.inner.session) = None;
        // Replies queued for this connection mean nothing to the next one.
        let stale = std::iter::from_fn(|| outbound.try_recv().ok()).count();
        if stale > 0 {
            debug!(stale, "dropped lines queued for the lost connection");
        }
    }

    async fn handshake(&self, server: &ServerDescriptor, transport: &mut Transport) -> Result<()> {
        let config = &self.inner.config;
        let mut lines = vec![format!("CAP LS {}", NegotiationVersion::V302.version())];
        if let Some(password) = server.password() {
            lines.push(format!("PASS {}", password));
        }
        lines.push(format!("NICK {}", config.nick));
        lines.push(format!("USER {} 0 * :{}", config.user(), config.realname()));

        for line in lines {
            write_line(transport, line).await?;
        }
        Ok(())
    }

    /// Move lines in both directions until the connection ends.
    async fn pump(
        &self,
        transport: &mut Transport,
        outbound: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<()> {
        let period = self.inner.config.ping_interval.max(Duration::from_millis(1));
        let mut pinger = tokio::time::interval_at(Instant::now() + period, period);
        pinger.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = transport.next() => match frame {
                    Some(line) => self.dispatch_line(&line?),
                    None => {
                        info!("connection closed");
                        return Ok(());
                    }
                },
                Some(line) = outbound.recv() => write_line(transport, line).await?,
                _ = pinger.tick() => {
                    if !self.check_liveness(transport).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns `false` when the connection should be dropped.
    async fn check_liveness(&self, transport: &mut Transport) -> Result<bool> {
        let now = Instant::now().into_std();
        let max_lag = self.inner.config.max_lag;

        match self.with_session(|session| session.liveness(now, max_lag))? {
            Liveness::Waiting => Ok(true),
            Liveness::Lagged(lag) => {
                warn!(?lag, ?max_lag, "lag threshold exceeded, dropping connection");
                Ok(false)
            }
            Liveness::SendPing => {
                let stamp = format!("{}{}", handlers::LAG_PREFIX, Utc::now().timestamp_millis());
                let line = format!("PING :{}", stamp);
                self.with_session(|session| session.ping_sent(stamp, now))?;
                write_line(transport, line).await?;
                Ok(true)
            }
        }
    }

    fn dispatch_line(&self, line: &str) {
        debug!("<< {}", line);
        match line.parse::<Message>() {
            Ok(message) => self.dispatch(message),
            Err(e) => warn!("skipping malformed line {:?}: {}", line, e),
        }
    }

    fn dispatch(&self, message: Message) {
        let handlers = lock(&self.inner.hooks).matching(message.command());
        let scope = lock(&self.inner.connection).clone();
        for handler in handlers {
            let future = handler(self.clone(), message.clone());
            let command = message.command().to_owned();
            let scope = scope.clone();
            tokio::spawn(
                async move {
                    tokio::select! {
                        biased;
                        _ = scope.cancelled() => {
                            debug!(%command, "hook cancelled with its connection");
                        }
                        result = future => {
                            if let Err(e) = result {
                                warn!(%command, "hook failed: {}", e);
                            }
                        }
                    }
                }
                .in_current_span(),
            );
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("nick", &self.inner.config.nick)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
