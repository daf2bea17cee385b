use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// The failure categories reported by [Error::kind].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed JSON, bad VLQ data, unknown references or an unsupported version.
    Parse,
    /// A memdb buffer is corrupt, truncated or from an unsupported format version.
    Format,
    /// A token, source or name id outside of a valid view.
    OutOfRange,
    /// An index could not be flattened.
    Flatten,
    /// Reading input from disk failed.
    Io,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unsupported source map format")]
    UnsupportedFormat,
    #[error("source map syntax error: {0}")]
    SyntaxError(#[from] simd_json::Error),
    #[error("a mapping is malformed: \"{0}\"")]
    MappingMalformed(String),
    #[error("a mapping references unknown source #{0}")]
    UnknownSourceReference(i64),
    #[error("a mapping references unknown name #{0}")]
    UnknownNameReference(i64),
    #[error("tokens are unordered or contain duplicate positions")]
    UnorderedTokens,
    #[error("token #{0} has a name but no source")]
    NameWithoutSource(usize),
    #[error(
        "source map has {} sources but {} sourcesContent entries",
        sources_len,
        sources_content_len
    )]
    InvalidSourcesContent {
        sources_len: u32,
        sources_content_len: u32,
    },
    #[error("source map is an indexed source map")]
    IndexedSourceMap,
    #[error("source map is not an indexed source map")]
    NotAnIndex,
    #[error("section #{0} has neither a map nor a url")]
    InvalidSection(u32),
    #[error("section #{section}: {source}")]
    Section {
        section: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("bad memdb magic")]
    BadMemDbMagic,
    #[error("unsupported memdb version {0}")]
    UnsupportedMemDbVersion(u32),
    #[error("memdb {region} at offset {offset} with length {len} exceeds buffer of {buffer_len} bytes")]
    MemDbOutOfBounds {
        region: &'static str,
        offset: u64,
        len: u64,
        buffer_len: usize,
    },
    #[error("bad memdb data: {0}")]
    BadMemDb(String),
    #[error("view is too large to be stored as memdb")]
    MemDbTooLarge,

    #[error("token #{index} out of range (token count {count})")]
    TokenOutOfRange { index: usize, count: usize },
    #[error("source #{index} out of range (source count {count})")]
    SourceOutOfRange { index: u32, count: u32 },
    #[error("name #{index} out of range (name count {count})")]
    NameOutOfRange { index: u32, count: u32 },

    #[error("section #{0} references an external map and cannot be flattened")]
    UnresolvedSection(u32),
    #[error("section #{0} starts before the previous section")]
    UnorderedSections(u32),
    #[error("section #{0} moves a token or id beyond the representable range")]
    PositionOverflow(u32),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    #[inline]
    pub(crate) fn section_error(section: u32, err: Error) -> Self {
        Self::Section {
            section,
            source: Box::new(err),
        }
    }

    #[inline]
    pub(crate) fn invalid_sources_content(sources_len: u32, sources_content_len: u32) -> Self {
        Self::InvalidSourcesContent {
            sources_len,
            sources_content_len,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat
            | Error::SyntaxError(..)
            | Error::MappingMalformed(..)
            | Error::UnknownSourceReference(..)
            | Error::UnknownNameReference(..)
            | Error::UnorderedTokens
            | Error::NameWithoutSource(..)
            | Error::InvalidSourcesContent { .. }
            | Error::IndexedSourceMap
            | Error::NotAnIndex
            | Error::InvalidSection(..) => ErrorKind::Parse,
            Error::Section { source, .. } => source.kind(),
            Error::BadMemDbMagic
            | Error::UnsupportedMemDbVersion(..)
            | Error::MemDbOutOfBounds { .. }
            | Error::BadMemDb(..)
            | Error::MemDbTooLarge => ErrorKind::Format,
            Error::TokenOutOfRange { .. }
            | Error::SourceOutOfRange { .. }
            | Error::NameOutOfRange { .. } => ErrorKind::OutOfRange,
            Error::UnresolvedSection(..)
            | Error::UnorderedSections(..)
            | Error::PositionOverflow(..) => ErrorKind::Flatten,
            Error::Io(..) => ErrorKind::Io,
        }
    }

    /// Stable integer code for callers on the other side of a language boundary.
    ///
    /// `2`, `3` and `4` single out the errors callers commonly branch on.
    pub fn code(&self) -> i32 {
        match self {
            Error::IndexedSourceMap => 2,
            Error::SyntaxError(..) => 3,
            Error::UnsupportedMemDbVersion(..) => 4,
            Error::Section { source, .. } => source.code(),
            _ => match self.kind() {
                ErrorKind::Parse => 1,
                ErrorKind::Format => 5,
                ErrorKind::OutOfRange => 6,
                ErrorKind::Flatten => 7,
                ErrorKind::Io => 8,
            },
        }
    }
}
