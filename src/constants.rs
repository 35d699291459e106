pub(crate) const HEADER_CSP: &str = "content-security-policy";
pub(crate) const HEADER_X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
pub(crate) const HEADER_X_FRAME_OPTIONS: &str = "x-frame-options";
pub(crate) const HEADER_REFERRER_POLICY: &str = "referrer-policy";
pub(crate) const HEADER_PERMISSIONS_POLICY: &str = "permissions-policy";

pub(crate) const VALUE_NOSNIFF: &str = "nosniff";
pub(crate) const VALUE_FRAME_DENY: &str = "DENY";
pub(crate) const VALUE_REFERRER_POLICY: &str = "strict-origin-when-cross-origin";
pub(crate) const VALUE_PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=()";

pub(crate) const DEFAULT_SRC: &str = "default-src";
pub(crate) const SCRIPT_SRC: &str = "script-src";
pub(crate) const STYLE_SRC: &str = "style-src";
pub(crate) const IMG_SRC: &str = "img-src";
pub(crate) const FONT_SRC: &str = "font-src";
pub(crate) const CONNECT_SRC: &str = "connect-src";
pub(crate) const FRAME_ANCESTORS: &str = "frame-ancestors";
pub(crate) const BASE_URI: &str = "base-uri";
pub(crate) const FORM_ACTION: &str = "form-action";

pub(crate) const NONE_SOURCE: &str = "'none'";
pub(crate) const SELF_SOURCE: &str = "'self'";
pub(crate) const UNSAFE_INLINE_SOURCE: &str = "'unsafe-inline'";
pub(crate) const UNSAFE_EVAL_SOURCE: &str = "'unsafe-eval'";
pub(crate) const NONCE_PREFIX: &str = "'nonce-";
pub(crate) const SUFFIX_QUOTE: &str = "'";

pub(crate) const SCHEME_DATA: &str = "data";
pub(crate) const SCHEME_WS: &str = "ws";
pub(crate) const SCHEME_WSS: &str = "wss";

/// Bytes drawn from the secure random source for every nonce.
pub const DEFAULT_NONCE_LENGTH: usize = 32;

pub(crate) const SEMICOLON_SPACE: &[u8] = b"; ";
pub(crate) const DEFAULT_BUFFER_CAPACITY: usize = 512;

pub const MODE_ENV_VAR: &str = "CSP_MODE";
pub const ENVIRONMENT_ENV_VAR: &str = "APP_ENVIRONMENT";

pub const DEFAULT_SESSION_COOKIE: &str = "csp_session";
/// Sessions kept before the least recently used one is evicted.
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;
pub const STATIC_PREFIX: &str = "/static";
