use crate::domain::ContactId;

// ============== Authorization ==============

/// A sender is authorized when its full address starts with the controller
/// prefix, so every resource of the controlling account is accepted.
///
/// An empty prefix authorizes nobody.
pub fn is_authorized(sender: &ContactId, control_prefix: &str) -> bool {
    if control_prefix.is_empty() {
        return false;
    }
    sender.as_str().starts_with(control_prefix)
}
