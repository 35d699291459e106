use crate::core::mode::PolicyMode;
use crate::error::CspError;
use crate::security::nonce::RequestNonce;
use crate::session::{SessionId, SessionNonce};
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use std::sync::Arc;

/// Read access to what the CSP middleware attached to a request.
pub trait CspExtensions {
    /// The nonce emitted in this request's `script-src`.
    fn get_nonce(&self) -> Option<String>;

    /// The mode the middleware resolved for this request.
    fn policy_mode(&self) -> Option<PolicyMode>;

    fn session_id(&self) -> Option<String>;

    /// The nonce that was current when this request's session began.
    fn session_nonce(&self) -> Option<String>;
}

impl<T> CspExtensions for T
where
    T: HttpMessage,
{
    fn get_nonce(&self) -> Option<String> {
        self.extensions()
            .get::<RequestNonce>()
            .map(|nonce| nonce.0.clone())
    }

    fn policy_mode(&self) -> Option<PolicyMode> {
        self.extensions().get::<PolicyMode>().copied()
    }

    fn session_id(&self) -> Option<String> {
        self.extensions().get::<SessionId>().map(|id| id.0.clone())
    }

    fn session_nonce(&self) -> Option<String> {
        self.extensions()
            .get::<Arc<SessionNonce>>()
            .and_then(|holder| holder.get())
    }
}

impl FromRequest for RequestNonce {
    type Error = CspError;
    type Future = Ready<Result<Self, Self::Error>>;

    /// Fails when the route is not wrapped by the CSP middleware.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestNonce>()
                .cloned()
                .ok_or_else(|| {
                    CspError::HeaderError("no CSP nonce attached to this request".to_string())
                }),
        )
    }
}
