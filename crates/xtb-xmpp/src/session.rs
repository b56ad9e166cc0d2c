//! Client session: connection settings, stanza building, and the driver task
//! that owns the tokio-xmpp client.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use futures::StreamExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_xmpp::{AsyncClient, AsyncConfig, AsyncServerConfig, Event};
use xmpp_parsers::{
    iq::Iq,
    message::{Body, Message, MessageType},
    ping::Ping,
    presence::{Presence, Type as PresenceType},
    Element, Jid,
};

use xtb_core::{config::Config, liveness::ActivityClock, messaging::types::InboundMessage};

use crate::handlers;

pub const DEFAULT_CLIENT_PORT: u16 = 5222;

/// Work queued for the driver by `XmppMessenger`.
#[derive(Debug)]
pub enum Outbound {
    Chat { to: Jid, body: String },
    Ping { to: Jid, id: String },
}

impl Outbound {
    pub fn into_stanza(self) -> Element {
        match self {
            Outbound::Chat { to, body } => chat_message(to, body),
            Outbound::Ping { to, id } => ping_iq(to, id),
        }
    }
}

pub fn chat_message(to: Jid, body: String) -> Element {
    let mut message = Message::new(Some(to));
    message.type_ = MessageType::Chat;
    message.bodies.insert(String::new(), Body(body));
    message.into()
}

/// XEP-0199 ping.
pub fn ping_iq(to: Jid, id: String) -> Element {
    Iq::from_get(id, Ping).with_to(to).into()
}

fn initial_presence() -> Element {
    Presence::new(PresenceType::None).into()
}

/// Split `host[:port]`; the port defaults to 5222. Bracketed IPv6 hosts are
/// accepted (`[::1]:5222`).
pub fn parse_address(address: &str) -> anyhow::Result<(String, u16)> {
    let address = address.trim();
    if address.is_empty() {
        bail!("empty server address");
    }

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| anyhow!("unterminated IPv6 address: {address}"))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(p, address)?,
            None if tail.is_empty() => DEFAULT_CLIENT_PORT,
            None => bail!("invalid server address: {address}"),
        };
        return Ok((host.to_string(), port));
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            Ok((host.to_string(), parse_port(port, address)?))
        }
        _ => Ok((address.to_string(), DEFAULT_CLIENT_PORT)),
    }
}

fn parse_port(raw: &str, address: &str) -> anyhow::Result<u16> {
    raw.parse::<u16>()
        .map_err(|e| anyhow!("invalid port in server address {address}: {e}"))
}

/// The server component of the bot's JID, used as the ping target.
pub fn server_jid(bot_jid: &str) -> anyhow::Result<Jid> {
    let without_resource = bot_jid.split('/').next().unwrap_or(bot_jid);
    let domain = without_resource
        .rsplit_once('@')
        .map(|(_, d)| d)
        .unwrap_or(without_resource);
    domain
        .parse::<Jid>()
        .map_err(|e| anyhow!("invalid domain in BotJid {bot_jid}: {e}"))
}

/// Build a client for the configured account. Connecting starts when the
/// client is first polled.
pub fn client_for(cfg: &Config) -> anyhow::Result<AsyncClient> {
    let jid = cfg
        .bot_jid
        .parse::<Jid>()
        .map_err(|e| anyhow!("invalid BotJid {}: {e}", cfg.bot_jid))?;

    let server = match &cfg.address {
        Some(address) => {
            let (host, port) = parse_address(address)?;
            AsyncServerConfig::Manual { host, port }
        }
        None => AsyncServerConfig::UseSrv,
    };

    let mut client = AsyncClient::new_with_config(AsyncConfig {
        jid,
        password: cfg.password.clone(),
        server,
    });
    client.set_reconnect(false);
    Ok(client)
}

/// Outcome of handing an inbound message to the dispatch loop.
#[derive(Debug, PartialEq, Eq)]
pub enum Forwarded {
    Queued,
    /// Queue full; the message was dropped.
    Dropped,
    /// Dispatch loop is gone.
    Closed,
}

/// Queue a message for the dispatch loop without waiting.
///
/// The driver must keep draining outbound work while the dispatcher is busy,
/// otherwise a full inbound queue and a full outbound queue wait on each
/// other forever.
pub fn forward_inbound(inbound: &mpsc::Sender<InboundMessage>, msg: InboundMessage) -> Forwarded {
    match inbound.try_send(msg) {
        Ok(()) => Forwarded::Queued,
        Err(TrySendError::Full(msg)) => {
            tracing::warn!(from = %msg.from, "inbound queue full, dropping message");
            Forwarded::Dropped
        }
        Err(TrySendError::Closed(_)) => Forwarded::Closed,
    }
}

/// Own the client until the stream ends.
///
/// Every inbound stanza counts as activity. Chat messages are forwarded to the
/// dispatch loop; queued outbound work is written as it arrives. A disconnect
/// is fatal: there is no reconnect.
pub async fn drive(
    mut client: AsyncClient,
    mut outbound: mpsc::Receiver<Outbound>,
    inbound: mpsc::Sender<InboundMessage>,
    clock: Arc<ActivityClock>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            event = client.next() => {
                let Some(event) = event else {
                    bail!("xmpp stream ended");
                };
                match event {
                    Event::Online { bound_jid, resumed } => {
                        clock.touch();
                        tracing::info!(jid = %bound_jid, resumed, "Stream opened");
                        client
                            .send_stanza(initial_presence())
                            .await
                            .map_err(|e| anyhow!("failed to send presence: {e}"))?;
                    }
                    Event::Disconnected(e) => {
                        bail!("disconnected: {e}");
                    }
                    Event::Stanza(stanza) => {
                        clock.touch();
                        let Some(msg) = handlers::inbound_message(stanza) else {
                            continue;
                        };
                        if forward_inbound(&inbound, msg) == Forwarded::Closed {
                            // Nothing left to serve.
                            return Ok(());
                        }
                    }
                }
            }
            Some(out) = outbound.recv() => {
                client
                    .send_stanza(out.into_stanza())
                    .await
                    .map_err(|e| anyhow!("failed to send stanza: {e}"))?;
            }
        }
    }
}
