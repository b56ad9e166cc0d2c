use crate::domain::ContactId;

/// A chat message as it reaches the dispatcher. Lives for one dispatch call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: ContactId,
    pub body: String,
}

impl InboundMessage {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: ContactId(from.into()),
            body: body.into(),
        }
    }
}
