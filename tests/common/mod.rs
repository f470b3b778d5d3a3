//! In-memory servers for the connection tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use slirc_engine::{BoxedStream, Connector, LineCodec, Message, ServerDescriptor};
use tokio::io::DuplexStream;
use tokio::time::Instant;
use tokio_util::codec::Framed;

pub const SERVER: &str = "irc.example.com";

pub fn server() -> ServerDescriptor {
    ServerDescriptor::tcp(SERVER, 6667)
}

/// Hands out prepared streams in order and records every attempt.
#[derive(Clone, Default)]
pub struct MockConnector {
    streams: Arc<Mutex<VecDeque<Option<DuplexStream>>>>,
    attempts: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next attempt succeeds with `stream`.
    pub fn accept(&self, stream: DuplexStream) {
        self.streams.lock().unwrap().push_back(Some(stream));
    }

    /// The next attempt is refused.
    pub fn refuse(&self) {
        self.streams.lock().unwrap().push_back(None);
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().iter().map(|(server, _)| server.clone()).collect()
    }

    /// When each attempt was made.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|&(_, at)| at).collect()
    }
}

impl Connector for MockConnector {
    fn connect<'a>(
        &'a self,
        server: &'a ServerDescriptor,
    ) -> BoxFuture<'a, io::Result<BoxedStream>> {
        self.attempts.lock().unwrap().push((server.to_string(), Instant::now()));
        let stream = self.streams.lock().unwrap().pop_front().flatten();
        Box::pin(async move {
            match stream {
                Some(stream) => Ok(Box::new(stream) as BoxedStream),
                None => Err(io::ErrorKind::ConnectionRefused.into()),
            }
        })
    }
}

/// The server end of a connection, speaking lines.
pub struct Peer {
    framed: Framed<DuplexStream, LineCodec>,
}

impl Peer {
    pub fn new(stream: DuplexStream) -> Self {
        Self {
            framed: Framed::new(stream, LineCodec::new()),
        }
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.framed.next().await.map(|line| line.unwrap())
    }

    pub async fn send(&mut self, line: &str) {
        self.framed.send(line).await.unwrap();
    }

    /// Read lines until one starts with `prefix`, returning everything read.
    pub async fn recv_until(&mut self, prefix: &str) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv().await {
            let done = line.starts_with(prefix);
            lines.push(line);
            if done {
                break;
            }
        }
        lines
    }
}

/// A server that negotiates capabilities, accepts any SASL exchange and
/// registers the client once it has answered a PING. Returns every line the
/// client sent, ending with its QUIT.
pub async fn registration_server(stream: DuplexStream, caps: &'static str) -> Vec<String> {
    let mut peer = Peer::new(stream);
    let mut received = Vec::new();
    let (mut nick, mut user, mut cap_end, mut pinged) = (false, false, false, false);

    while let Some(line) = peer.recv().await {
        received.push(line.clone());
        let message: Message = line.parse().unwrap();
        let mut replies = Vec::new();

        match message.command() {
            "CAP" => match message.param(0) {
                Some("LS") => replies.push(format!(":{} CAP * LS :{}", SERVER, caps)),
                Some("REQ") => {
                    replies.push(format!(":{} CAP * ACK :{}", SERVER, message.param(1).unwrap()))
                }
                Some("END") => cap_end = true,
                _ => {}
            },
            "AUTHENTICATE" if message.param(0) == Some("PLAIN") => {
                replies.push("AUTHENTICATE +".to_owned())
            }
            "AUTHENTICATE" => {
                replies.push(format!(":{} 903 nick :SASL authentication successful", SERVER))
            }
            "NICK" => nick = true,
            "USER" => user = true,
            "PONG" => replies.push(format!(":{} 001 nick :Welcome to the network", SERVER)),
            "QUIT" => break,
            _ => {}
        }
        if nick && user && cap_end && !pinged {
            pinged = true;
            replies.push("PING foobar".to_owned());
        }
        for reply in replies {
            peer.send(&reply).await;
        }
    }
    received
}
