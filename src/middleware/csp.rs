use crate::constants::{
    HEADER_PERMISSIONS_POLICY, HEADER_REFERRER_POLICY, HEADER_X_CONTENT_TYPE_OPTIONS,
    HEADER_X_FRAME_OPTIONS, VALUE_FRAME_DENY, VALUE_NOSNIFF, VALUE_PERMISSIONS_POLICY,
    VALUE_REFERRER_POLICY,
};
use crate::core::config::CspConfig;
use crate::core::mode::PolicyMode;
use crate::error::CspError;
use crate::security::nonce::RequestNonce;
use crate::session::SessionId;
use actix_web::{
    body::EitherBody,
    cookie::{Cookie, SameSite},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap, HeaderName, HeaderValue},
    web::Data,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::{rc::Rc, sync::Arc};
use uuid::Uuid;

/// Emits the per-request Content-Security-Policy and the fixed companion
/// headers, and exposes the request's nonce to handlers.
///
/// Register it only on routes that should carry the headers. Static assets
/// served by an earlier scope never reach it.
#[derive(Clone)]
pub struct CspMiddleware {
    config: Arc<CspConfig>,
}

impl CspMiddleware {
    #[inline]
    pub fn new(config: CspConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[inline]
    pub fn config(&self) -> Arc<CspConfig> {
        self.config.clone()
    }
}

impl<S, B> Transform<S, ServiceRequest> for CspMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CspMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CspMiddlewareService {
            service: Rc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct CspMiddlewareService<S> {
    service: Rc<S>,
    config: Arc<CspConfig>,
}

struct NewSession {
    id: String,
    cookie_name: String,
}

impl<S, B> Service<ServiceRequest> for CspMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();

        Box::pin(async move {
            config.stats().increment_request_count();
            let mode = config.current_mode();

            let prepared = prepare(&config, mode, &req);
            let (nonce, header_value) = match prepared {
                Ok(prepared) => prepared,
                Err(err) => {
                    log::warn!(
                        "refusing {} {}: {}",
                        req.method(),
                        req.path(),
                        err
                    );
                    let mut res = req.error_response(err);
                    insert_auxiliary_headers(res.headers_mut());
                    return Ok(res.map_into_right_body());
                }
            };

            config.stats().increment_mode_count(mode);
            log::debug!("{} {} served with {} policy", req.method(), req.path(), mode);

            {
                let mut extensions = req.extensions_mut();
                extensions.insert(RequestNonce(nonce.clone()));
                extensions.insert(mode);
            }
            let new_session = propagate_to_session(&config, &req, &nonce);

            let mut res = service.call(req).await?;

            let headers = res.headers_mut();
            headers.insert(HeaderName::from_static(crate::constants::HEADER_CSP), header_value);
            insert_auxiliary_headers(headers);

            if let Some(session) = new_session {
                let cookie = Cookie::build(session.cookie_name, session.id)
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Strict)
                    .finish();
                res.response_mut()
                    .add_cookie(&cookie)
                    .map_err(|e| CspError::HeaderError(e.to_string()))?;
            }

            Ok(res.map_into_left_body())
        })
    }
}

/// Draws the nonce and serializes the policy before the handler runs, so a
/// failure here means the handler never runs.
fn prepare(
    config: &CspConfig,
    mode: PolicyMode,
    req: &ServiceRequest,
) -> Result<(String, HeaderValue), CspError> {
    let nonce = config.generate_nonce()?;
    // An absent host is left empty so Secure mode rejects it.
    let host = request_host(req).unwrap_or_default();
    let policy = config.policy_for(mode, &host, &nonce)?;
    let header_value = policy.header_value()?;
    Ok((nonce, header_value))
}

/// The literal `Host` header, or the URI authority when a request (HTTP/2)
/// carries no `Host`. `Forwarded` and `X-Forwarded-Host` are never read.
fn request_host(req: &ServiceRequest) -> Option<String> {
    match req.headers().get(header::HOST) {
        Some(value) => value.to_str().ok().map(str::to_owned),
        None => req.uri().authority().map(|authority| authority.as_str().to_owned()),
    }
}

/// Copies the nonce into the session holder, minting a session id when the
/// request carries none. Returns the new session when a cookie must be set.
fn propagate_to_session(config: &CspConfig, req: &ServiceRequest, nonce: &str) -> Option<NewSession> {
    let store = config.session_store()?;

    // Only ids the store still holds are honored. Unknown or evicted ids get
    // a fresh session rather than an entry under a client-chosen key.
    let existing = req
        .cookie(store.cookie_name())
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| Uuid::parse_str(value).is_ok())
        .and_then(|id| store.holder(&id).map(|holder| (id, holder)));
    let is_new = existing.is_none();

    let (id, holder) = match existing {
        Some(session) => session,
        None => {
            let id = Uuid::new_v4().hyphenated().to_string();
            let (holder, established) = store.establish(&id, nonce);
            if established {
                config.stats().increment_session_established_count();
            }
            (id, holder)
        }
    };

    {
        let mut extensions = req.extensions_mut();
        extensions.insert(SessionId(id.clone()));
        extensions.insert(holder);
    }

    is_new.then(|| NewSession {
        id,
        cookie_name: store.cookie_name().to_owned(),
    })
}

fn insert_auxiliary_headers(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static(HEADER_X_CONTENT_TYPE_OPTIONS),
        HeaderValue::from_static(VALUE_NOSNIFF),
    );
    headers.insert(
        HeaderName::from_static(HEADER_X_FRAME_OPTIONS),
        HeaderValue::from_static(VALUE_FRAME_DENY),
    );
    headers.insert(
        HeaderName::from_static(HEADER_REFERRER_POLICY),
        HeaderValue::from_static(VALUE_REFERRER_POLICY),
    );
    headers.insert(
        HeaderName::from_static(HEADER_PERMISSIONS_POLICY),
        HeaderValue::from_static(VALUE_PERMISSIONS_POLICY),
    );
}

#[inline]
pub fn csp_middleware(config: CspConfig) -> CspMiddleware {
    CspMiddleware::new(config)
}

/// Registers the config, its stats and its session store as app data so
/// handlers can reach them.
pub fn configure_csp(config: &CspConfig) -> impl FnOnce(&mut actix_web::web::ServiceConfig) {
    let config = config.clone();
    move |cfg| {
        cfg.app_data(Data::from(config.stats().clone()));
        if let Some(store) = config.session_store() {
            cfg.app_data(Data::from(store.clone()));
        }
        cfg.app_data(Data::new(config));
    }
}
