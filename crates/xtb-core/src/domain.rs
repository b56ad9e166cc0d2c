use std::fmt;

/// Full XMPP address of a chat peer (`user@domain/resource`).
///
/// Kept as the raw string the server delivered: authorization is a prefix
/// match on it, so no normalization happens here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
