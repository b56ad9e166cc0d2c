//! XMPP adapter (tokio-xmpp).
//!
//! This crate implements the `xtb-core` MessagingPort over an XMPP client
//! session and runs the receive loop that feeds the command dispatcher.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;

use tokio::sync::mpsc;
use xmpp_parsers::Jid;

pub mod handlers;
pub mod router;
pub mod session;

use xtb_core::{domain::ContactId, errors::Error, messaging::port::MessagingPort, Result};

use crate::session::Outbound;

/// Handle for sending stanzas through the session driver.
///
/// The driver task owns the client; this handle only queues work for it, so
/// it can be shared between the dispatch loop and the liveness monitor.
#[derive(Clone, Debug)]
pub struct XmppMessenger {
    outbound: mpsc::Sender<Outbound>,
    server: Jid,
    probe_seq: Arc<AtomicU64>,
}

impl XmppMessenger {
    pub fn new(outbound: mpsc::Sender<Outbound>, server: Jid) -> Self {
        Self {
            outbound,
            server,
            probe_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    fn parse_jid(to: &ContactId) -> Result<Jid> {
        to.as_str()
            .parse::<Jid>()
            .map_err(|e| Error::Transport(format!("invalid recipient {to}: {e}")))
    }

    async fn enqueue(&self, out: Outbound) -> Result<()> {
        self.outbound
            .send(out)
            .await
            .map_err(|_| Error::Transport("xmpp session is closed".to_string()))
    }
}

#[async_trait]
impl MessagingPort for XmppMessenger {
    async fn send_text(&self, to: &ContactId, body: &str) -> Result<()> {
        let to = Self::parse_jid(to)?;
        self.enqueue(Outbound::Chat {
            to,
            body: body.to_string(),
        })
        .await
    }

    async fn send_probe(&self) -> Result<()> {
        let seq = self.probe_seq.fetch_add(1, Ordering::Relaxed);
        self.enqueue(Outbound::Ping {
            to: self.server.clone(),
            id: format!("xtb-ping-{seq}"),
        })
        .await
    }
}
