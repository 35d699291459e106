use crate::constants::{
    DEFAULT_BUFFER_CAPACITY, HEADER_CSP, SCHEME_DATA, SCHEME_WS, SCHEME_WSS, SEMICOLON_SPACE,
};
use crate::core::directives::{
    BaseUri, ConnectSrc, DefaultSrc, Directive, DirectiveSpec, FontSrc, FormAction,
    FrameAncestors, ImgSrc, ScriptSrc, StyleSrc,
};
use crate::core::mode::{Environment, PolicyMode};
use crate::core::source::Source;
use crate::error::CspError;
use crate::utils::{is_valid_authority, write_joined, BufferWriter};
use actix_web::http::header::{HeaderName, HeaderValue};
use bytes::BytesMut;
use indexmap::IndexMap;
use std::{borrow::Cow, fmt};

/// An ordered set of directives. Serialization follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspPolicy {
    directives: IndexMap<Cow<'static, str>, Directive>,
    estimated_size: usize,
}

impl CspPolicy {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `directive`. A directive with the same name keeps its original
    /// position and takes the new sources.
    pub fn add_directive(&mut self, directive: Directive) -> &mut Self {
        self.estimated_size += directive.estimated_size() + SEMICOLON_SPACE.len();
        let name = Cow::Owned(directive.name().to_owned());
        if let Some(previous) = self.directives.insert(name, directive) {
            self.estimated_size -= previous.estimated_size() + SEMICOLON_SPACE.len();
        }
        self
    }

    #[inline]
    pub fn get_directive(&self, name: &str) -> Option<&Directive> {
        self.directives.get(name)
    }

    #[inline]
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.directives.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    #[inline]
    pub fn contains_nonce(&self) -> bool {
        self.directives.values().any(Directive::contains_nonce)
    }

    /// The first nonce found in any directive.
    pub fn nonce(&self) -> Option<&str> {
        self.directives.values().find_map(Directive::nonce)
    }

    #[inline]
    pub fn header_name(&self) -> HeaderName {
        HeaderName::from_static(HEADER_CSP)
    }

    pub fn header_value(&self) -> Result<HeaderValue, CspError> {
        let mut buffer =
            BytesMut::with_capacity(self.estimated_size.max(DEFAULT_BUFFER_CAPACITY));
        self.write_to_buffer(&mut buffer);

        HeaderValue::from_maybe_shared(buffer.freeze()).map_err(|_| {
            CspError::HeaderError("policy contains bytes not allowed in a header".to_string())
        })
    }
}

impl BufferWriter for CspPolicy {
    fn write_to_buffer(&self, buffer: &mut BytesMut) {
        write_joined(buffer, self.directives.values(), SEMICOLON_SPACE);
    }
}

impl fmt::Display for CspPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for directive in self.directives.values() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}", directive)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CspPolicyBuilder {
    policy: CspPolicy,
}

impl CspPolicyBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directive<D: DirectiveSpec>(mut self, directive_builder: D) -> Self {
        self.policy.add_directive(directive_builder.build());
        self
    }

    pub fn default_src(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(DefaultSrc::new().add_sources(sources))
    }

    pub fn script_src(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(ScriptSrc::new().add_sources(sources))
    }

    pub fn style_src(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(StyleSrc::new().add_sources(sources))
    }

    pub fn img_src(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(ImgSrc::new().add_sources(sources))
    }

    pub fn font_src(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(FontSrc::new().add_sources(sources))
    }

    pub fn connect_src(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(ConnectSrc::new().add_sources(sources))
    }

    pub fn frame_ancestors(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(FrameAncestors::new().add_sources(sources))
    }

    pub fn base_uri(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(BaseUri::new().add_sources(sources))
    }

    pub fn form_action(self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.add_directive(FormAction::new().add_sources(sources))
    }

    #[inline]
    pub fn build(self) -> CspPolicy {
        self.policy
    }
}

/// Builds the per-request policy.
///
/// Output order is fixed: `default-src`, `script-src`, `style-src`,
/// `img-src`, `font-src`, `connect-src`, `frame-ancestors`, `base-uri`,
/// `form-action`.
///
/// `host` is only consulted in Secure mode, where it scopes `connect-src` to
/// the application's own WebSocket origin. It must be a bare `host[:port]`.
///
/// # Errors
///
/// Returns [`CspError::InvalidHost`] when Secure mode gets a host that is
/// empty or is not a plain authority.
pub fn build_policy(
    mode: PolicyMode,
    environment: Environment,
    host: &str,
    nonce: &str,
) -> Result<CspPolicy, CspError> {
    let (script, connect) = match mode {
        PolicyMode::Insecure => (
            vec![Source::Self_, Source::UnsafeInline, Source::UnsafeEval],
            vec![
                Source::Self_,
                Source::Scheme(Cow::Borrowed(SCHEME_WSS)),
                Source::Scheme(Cow::Borrowed(SCHEME_WS)),
            ],
        ),
        PolicyMode::Secure => {
            if !is_valid_authority(host) {
                return Err(CspError::InvalidHost(host.escape_debug().to_string()));
            }

            let mut script = vec![Source::Self_, Source::Nonce(Cow::Owned(nonce.to_owned()))];
            // Ignored by CSP2+ browsers when a nonce is present; lets older
            // dev tooling hot-reload.
            if environment.is_development() {
                script.push(Source::UnsafeInline);
            }

            let connect = vec![
                Source::Self_,
                Source::Host(Cow::Owned(format!("{}://{}", SCHEME_WSS, host))),
                Source::Host(Cow::Owned(format!("{}://{}", SCHEME_WS, host))),
            ];
            (script, connect)
        }
    };

    Ok(CspPolicyBuilder::new()
        .default_src([Source::Self_])
        .script_src(script)
        // Nonces cannot cover style="" attributes, so inline styles stay
        // allowed in both modes.
        .style_src([Source::Self_, Source::UnsafeInline])
        .img_src([Source::Self_, Source::Scheme(Cow::Borrowed(SCHEME_DATA))])
        .font_src([Source::Self_])
        .connect_src(connect)
        .frame_ancestors([Source::None])
        .base_uri([Source::Self_])
        .form_action([Source::Self_])
        .build())
}
