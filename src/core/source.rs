use crate::constants::{
    NONCE_PREFIX, NONE_SOURCE, SELF_SOURCE, SUFFIX_QUOTE, UNSAFE_EVAL_SOURCE,
    UNSAFE_INLINE_SOURCE,
};
use crate::utils::BufferWriter;
use bytes::BytesMut;
use std::{borrow::Cow, fmt};

/// A single entry in a directive's source list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    None,
    Self_,
    UnsafeInline,
    UnsafeEval,
    /// Written verbatim, e.g. `wss://example.com:5001`.
    Host(Cow<'static, str>),
    /// A bare scheme; written with its trailing colon (`data:`).
    Scheme(Cow<'static, str>),
    /// The base64 nonce value, without the `'nonce-` wrapper.
    Nonce(Cow<'static, str>),
}

impl Source {
    #[inline(always)]
    pub const fn is_none(&self) -> bool {
        matches!(self, Source::None)
    }

    #[inline(always)]
    pub const fn is_self(&self) -> bool {
        matches!(self, Source::Self_)
    }

    #[inline(always)]
    pub const fn is_unsafe_inline(&self) -> bool {
        matches!(self, Source::UnsafeInline)
    }

    #[inline(always)]
    pub const fn is_unsafe_eval(&self) -> bool {
        matches!(self, Source::UnsafeEval)
    }

    #[inline]
    pub const fn as_static_str(&self) -> Option<&'static str> {
        match self {
            Source::None => Some(NONE_SOURCE),
            Source::Self_ => Some(SELF_SOURCE),
            Source::UnsafeInline => Some(UNSAFE_INLINE_SOURCE),
            Source::UnsafeEval => Some(UNSAFE_EVAL_SOURCE),
            _ => None,
        }
    }

    #[inline]
    pub fn estimated_size(&self) -> usize {
        match self {
            Source::Host(host) => host.len(),
            Source::Scheme(scheme) => scheme.len() + 1,
            Source::Nonce(nonce) => NONCE_PREFIX.len() + nonce.len() + SUFFIX_QUOTE.len(),
            keyword => keyword.as_static_str().map_or(0, str::len),
        }
    }

    #[inline]
    pub fn contains_nonce(&self) -> bool {
        matches!(self, Source::Nonce(_))
    }

    #[inline]
    pub fn nonce(&self) -> Option<&str> {
        match self {
            Source::Nonce(nonce) => Some(nonce),
            _ => None,
        }
    }

    #[inline]
    pub fn scheme(&self) -> Option<&str> {
        match self {
            Source::Scheme(scheme) => Some(scheme),
            _ => None,
        }
    }

    #[inline]
    pub fn host(&self) -> Option<&str> {
        match self {
            Source::Host(host) => Some(host),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Host(host) => f.write_str(host),
            Source::Scheme(scheme) => write!(f, "{}:", scheme),
            Source::Nonce(nonce) => write!(f, "{}{}{}", NONCE_PREFIX, nonce, SUFFIX_QUOTE),
            keyword => f.write_str(keyword.as_static_str().unwrap_or_default()),
        }
    }
}

impl BufferWriter for Source {
    fn write_to_buffer(&self, buffer: &mut BytesMut) {
        match self {
            Source::Host(host) => buffer.extend_from_slice(host.as_bytes()),
            Source::Scheme(scheme) => {
                buffer.extend_from_slice(scheme.as_bytes());
                buffer.extend_from_slice(b":");
            }
            Source::Nonce(nonce) => {
                buffer.reserve(NONCE_PREFIX.len() + nonce.len() + SUFFIX_QUOTE.len());
                buffer.extend_from_slice(NONCE_PREFIX.as_bytes());
                buffer.extend_from_slice(nonce.as_bytes());
                buffer.extend_from_slice(SUFFIX_QUOTE.as_bytes());
            }
            keyword => {
                if let Some(value) = keyword.as_static_str() {
                    buffer.extend_from_slice(value.as_bytes());
                }
            }
        }
    }
}
