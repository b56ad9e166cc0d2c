//! Inbound message handling.
//!
//! Messages are handled strictly one at a time: the twtxt invocation and the
//! reply finish before the next message is taken off the queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use xmpp_parsers::{
    message::{Message, MessageType},
    Element,
};

use xtb_core::{
    commands::Dispatcher, messaging::port::MessagingPort, messaging::types::InboundMessage,
};

/// Extract a chat message carrying a body from a stanza.
///
/// Anything else (presence, iq, chat-state notifications, errors, MUC
/// traffic) is ignored. A blank body is still forwarded so the sender check
/// runs on it.
pub fn inbound_message(stanza: Element) -> Option<InboundMessage> {
    if !stanza.is("message", "jabber:client") {
        return None;
    }
    let message = match Message::try_from(stanza) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed message stanza");
            return None;
        }
    };

    if !matches!(message.type_, MessageType::Chat | MessageType::Normal) {
        return None;
    }
    let from = message.from.as_ref()?.to_string();
    let body = message
        .bodies
        .get("")
        .or_else(|| message.bodies.values().next())?;

    Some(InboundMessage::new(from, body.0.clone()))
}

/// Dispatch one message and send the reply back to its sender.
pub async fn handle_message(
    dispatcher: &Dispatcher,
    messenger: &dyn MessagingPort,
    msg: &InboundMessage,
) {
    let Some(reply) = dispatcher.dispatch(msg).await else {
        return;
    };
    if let Err(e) = messenger.send_text(&msg.from, &reply).await {
        tracing::warn!(to = %msg.from, error = %e, "failed to send reply");
    }
}

/// Serve messages until the session driver closes the queue.
pub async fn serve(
    dispatcher: Arc<Dispatcher>,
    messenger: Arc<dyn MessagingPort>,
    mut inbound: mpsc::Receiver<InboundMessage>,
) {
    while let Some(msg) = inbound.recv().await {
        handle_message(&dispatcher, messenger.as_ref(), &msg).await;
    }
}
