use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use xtb_core::{
    commands::Dispatcher,
    config::Config,
    liveness::{ActivityClock, LivenessMonitor},
    messaging::port::MessagingPort,
};

use crate::{handlers, session, XmppMessenger};

const OUTBOUND_QUEUE: usize = 32;
const INBOUND_QUEUE: usize = 64;

/// Connect, serve chat commands, and watch the connection.
///
/// The session driver runs on this task; the liveness monitor and the dispatch
/// loop are spawned beside it. Returns when any of them ends, which is always
/// an error: the bot has no clean shutdown path.
pub async fn run(cfg: Arc<Config>, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    let client = session::client_for(&cfg)?;
    let server = session::server_jid(&cfg.bot_jid)?;

    tracing::info!(
        jid = %cfg.bot_jid,
        server = cfg.address.as_deref().unwrap_or("(SRV lookup)"),
        controller = %cfg.control_jid,
        twtxt = %cfg.twtxt_path.display(),
        flavor = %cfg.twtxt_flavor,
        "xtb starting"
    );

    let clock = Arc::new(ActivityClock::new());
    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE);

    let messenger: Arc<dyn MessagingPort> = Arc::new(XmppMessenger::new(out_tx, server));

    let driver = session::drive(client, out_rx, in_tx, clock.clone());
    let mut monitor =
        tokio::spawn(LivenessMonitor::new(clock, messenger.clone()).run(CancellationToken::new()));
    let mut serve = tokio::spawn(handlers::serve(dispatcher, messenger, in_rx));

    tokio::select! {
        res = driver => {
            match res {
                Ok(()) => Err(anyhow!("xmpp session closed")),
                Err(e) => Err(e),
            }
        }
        res = &mut monitor => {
            match res {
                Ok(Ok(())) => Err(anyhow!("liveness monitor stopped")),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(anyhow!("liveness monitor task failed: {e}")),
            }
        }
        res = &mut serve => {
            match res {
                Ok(()) => Err(anyhow!("message loop ended")),
                Err(e) => Err(anyhow!("message loop task failed: {e}")),
            }
        }
    }
}
