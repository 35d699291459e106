pub mod store;

pub use store::{SessionNonce, SessionNonceStore};

/// Session id attached to a request by the CSP middleware when a
/// [`SessionNonceStore`] is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl std::ops::Deref for SessionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
