use crate::constants;
use crate::core::source::Source;
use crate::utils::{write_joined, BufferWriter};
use bytes::BytesMut;
use smallvec::SmallVec;
use std::{borrow::Cow, fmt};

/// One named restriction and its ordered source list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directive {
    name: Cow<'static, str>,
    sources: SmallVec<[Source; 4]>,
}

impl Directive {
    #[inline]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            sources: SmallVec::new(),
        }
    }

    /// Appends `source`, keeping insertion order. Duplicates are dropped and
    /// `'none'` never shares the list with anything else.
    pub fn add_source(&mut self, source: Source) -> &mut Self {
        if source.is_none() || self.sources.first().is_some_and(Source::is_none) {
            self.sources.clear();
            self.sources.push(source);
        } else if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self
    }

    pub fn add_sources<I>(&mut self, sources: I) -> &mut Self
    where
        I: IntoIterator<Item = Source>,
    {
        for source in sources {
            self.add_source(source);
        }
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    #[inline]
    pub fn estimated_size(&self) -> usize {
        let mut size = self.name.len();
        if !self.sources.is_empty() {
            size += self.sources.len();
            size += self.sources.iter().map(Source::estimated_size).sum::<usize>();
        }
        size
    }

    #[inline]
    pub fn contains_nonce(&self) -> bool {
        self.sources.iter().any(Source::contains_nonce)
    }

    #[inline]
    pub fn contains(&self, source: &Source) -> bool {
        self.sources.contains(source)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.sources.iter().find_map(Source::nonce)
    }

    /// The source list alone, space separated.
    pub fn value(&self) -> String {
        self.sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for source in &self.sources {
            write!(f, " {}", source)?;
        }
        Ok(())
    }
}

impl BufferWriter for Directive {
    fn write_to_buffer(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(self.name.as_bytes());

        if !self.sources.is_empty() {
            buffer.extend_from_slice(b" ");
            write_joined(buffer, self.sources.iter(), b" ");
        }
    }
}

pub trait DirectiveSpec: Sized {
    const NAME: &'static str;

    fn add_source(mut self, source: Source) -> Self {
        self.inner_mut().add_source(source);
        self
    }

    fn add_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Source>,
    {
        self.inner_mut().add_sources(sources);
        self
    }

    fn inner_mut(&mut self) -> &mut Directive;

    fn build(self) -> Directive;
}

macro_rules! define_directive {
    ($name:ident, $directive_name:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            directive: Directive,
        }

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self {
                    directive: Directive::new($directive_name),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl DirectiveSpec for $name {
            const NAME: &'static str = $directive_name;

            #[inline]
            fn inner_mut(&mut self) -> &mut Directive {
                &mut self.directive
            }

            #[inline]
            fn build(self) -> Directive {
                self.directive
            }
        }
    };
}

define_directive!(DefaultSrc, constants::DEFAULT_SRC);
define_directive!(ScriptSrc, constants::SCRIPT_SRC);
define_directive!(StyleSrc, constants::STYLE_SRC);
define_directive!(ImgSrc, constants::IMG_SRC);
define_directive!(FontSrc, constants::FONT_SRC);
define_directive!(ConnectSrc, constants::CONNECT_SRC);
define_directive!(FrameAncestors, constants::FRAME_ANCESTORS);
define_directive!(BaseUri, constants::BASE_URI);
define_directive!(FormAction, constants::FORM_ACTION);
