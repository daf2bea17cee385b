use crate::finder::TokenFinder;
use crate::memdb::{self, DumpOptions};
use crate::token::{Position, Token, TokenMatch};
use crate::tokens::{ItemsCount, Tokens};
use crate::view::raw::RawSourceMap;
use crate::{Error, Result};
use simd_json::Buffers;
use simd_json_derive::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::io;
use std::io::Write;

/// `BorrowedView` is an immutable, queryable source map containing borrowed or owned strings.
///
/// For a view that owns all its internal strings, see [View](crate::View).
/// This struct can be converted into it using [Into::into].
///
/// # Methods
///
/// ## Parsing
///
/// You can create a `BorrowedView` using the following methods:
/// - [`BorrowedView::from_slice`], [`BorrowedView::from_slice_with_buffers`]
///   and [`BorrowedView::from_str`] for JSON source maps
/// - [`BorrowedView::from_memdb`] for memdb buffers
///
/// JSON parsing takes mutable references because escape sequences are replaced in place.
/// Memdb decoding borrows every string straight from the buffer, so the buffer
/// must outlive the view; the lifetime `'a` enforces this.
///
/// Indexed source maps are rejected with [Error::IndexedSourceMap];
/// parse them with [Index](crate::Index) or [ViewOrIndex](crate::ViewOrIndex).
///
/// ## Finding Tokens
///
/// - [`lookup`](BorrowedView::lookup) and [`lookup_token`](BorrowedView::lookup_token)
/// - [`finder`](BorrowedView::finder) for sequential lookups
/// - [`get_token`](BorrowedView::get_token) for positional access
///
/// ## Output
///
/// - [`to_memdb`](BorrowedView::to_memdb)
/// - [`write`](BorrowedView::write), [`to_vec`](BorrowedView::to_vec)
///   and [`to_string`](BorrowedView::to_string) for JSON
#[derive(Clone)]
pub struct BorrowedView<'a> {
    pub(crate) file: Option<Cow<'a, str>>,
    pub(crate) tokens: Tokens,
    pub(crate) names: Vec<Cow<'a, str>>,
    pub(crate) sources: Vec<Cow<'a, str>>,
    pub(crate) sources_content: Vec<Option<Cow<'a, str>>>,
}

impl Debug for BorrowedView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("View\n")?;
        f.write_str("  sources:\n")?;
        for (idx, source) in self.sources.iter().enumerate() {
            writeln!(f, "    {idx}: {source}")?;
        }
        f.write_str("  names:\n")?;
        for (idx, name) in self.names.iter().enumerate() {
            writeln!(f, "    {idx}: {name}")?;
        }
        f.write_str("  tokens:\n")?;
        if !self.tokens.is_empty() {
            let mut last_token = &self.tokens[0];
            write!(f, "    {:?}", last_token)?;
            for token in self.tokens.iter().skip(1) {
                if token.dst_line() != last_token.dst_line() {
                    f.write_str("\n    ")?;
                } else {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}", token)?;
                last_token = token;
            }
        }
        Ok(())
    }
}

impl<'a> BorrowedView<'a> {
    /// Finds the token for a given generated position.
    ///
    /// If an exact match is not found, this method returns the closest preceding token
    /// on the same generated line.
    /// If there is no such token, it returns `None`.
    ///
    /// # Example
    /// ```
    /// # use smview::BorrowedView;
    /// # let mut buf = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA,CAAC"}"#.to_vec();
    /// let view = BorrowedView::from_slice(&mut buf).unwrap();
    /// assert_eq!(view.lookup((0, 5)).unwrap().dst_col(), 1);
    /// assert!(view.lookup((1, 0)).is_none());
    /// ```
    pub fn lookup<P>(&self, pos: P) -> Option<Token>
    where
        P: Into<Position>,
    {
        self.tokens.lookup(pos)
    }

    /// Like [lookup](Self::lookup), but resolves the source url and name of the token.
    pub fn lookup_token(&self, line: u32, col: u32) -> Option<TokenMatch<'_>> {
        self.lookup((line, col)).map(|token| self.resolve(token))
    }

    /// Creates a `TokenFinder` for the view.
    ///
    /// This stateful finder is highly efficient for frequent lookups,
    /// especially when traversing the view in small increments.
    ///
    /// # Example
    /// ```
    /// # use smview::BorrowedView;
    /// # let mut buf = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA,CAAC"}"#.to_vec();
    /// let view = BorrowedView::from_slice(&mut buf).unwrap();
    /// let finder = view.finder();
    /// finder.lookup((0, 0));
    /// finder.lookup((0, 6));
    /// ```
    pub fn finder(&self) -> TokenFinder {
        self.tokens.finder()
    }

    /// Resolves the source url and name a token refers to.
    pub fn resolve(&self, token: Token) -> TokenMatch<'_> {
        TokenMatch {
            token,
            source: token
                .source_id()
                .and_then(|id| self.sources.get(id as usize))
                .map(Cow::as_ref),
            name: token
                .name_id()
                .and_then(|id| self.names.get(id as usize))
                .map(Cow::as_ref),
        }
    }

    /// Validates the view.
    pub fn validate(&self) -> Result<()> {
        let sources_len = self.sources.len() as u32;
        let sources_content_len = self.sources_content.len() as u32;
        let names_len = self.names.len() as u32;

        if sources_content_len != sources_len {
            return Err(Error::invalid_sources_content(
                sources_len,
                sources_content_len,
            ));
        }
        self.tokens
            .validate(ItemsCount::new(sources_len, names_len))
    }
}

impl<'a> BorrowedView<'a> {
    #[inline]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    #[inline]
    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    #[inline]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Returns the token at `index` in generated-position order.
    pub fn get_token(&self, index: usize) -> Result<Token> {
        self.tokens
            .get(index)
            .copied()
            .ok_or(Error::TokenOutOfRange {
                index,
                count: self.tokens.len(),
            })
    }

    #[inline]
    pub fn names(&self) -> &[Cow<'a, str>] {
        &self.names
    }

    #[inline]
    pub fn name_count(&self) -> u32 {
        self.names.len() as u32
    }

    pub fn get_name(&self, name_id: u32) -> Result<&str> {
        self.names
            .get(name_id as usize)
            .map(Cow::as_ref)
            .ok_or(Error::NameOutOfRange {
                index: name_id,
                count: self.name_count(),
            })
    }

    #[inline]
    pub fn sources(&self) -> &[Cow<'a, str>] {
        &self.sources
    }

    #[inline]
    pub fn sources_content(&self) -> &[Option<Cow<'a, str>>] {
        &self.sources_content
    }

    #[inline]
    pub fn source_count(&self) -> u32 {
        self.sources.len() as u32
    }

    /// Returns the url of a source, with `sourceRoot` already applied.
    pub fn get_source_name(&self, source_id: u32) -> Result<&str> {
        self.sources
            .get(source_id as usize)
            .map(Cow::as_ref)
            .ok_or(self.source_out_of_range(source_id))
    }

    /// Returns the embedded contents of a source, or `None` if the source has none.
    ///
    /// [Cow::Borrowed] contents alias the buffer the view was parsed from,
    /// [Cow::Owned] contents are owned by the view.
    pub fn get_source_contents(&self, source_id: u32) -> Result<Option<&Cow<'a, str>>> {
        self.sources_content
            .get(source_id as usize)
            .map(Option::as_ref)
            .ok_or(self.source_out_of_range(source_id))
    }

    pub fn has_source_contents(&self, source_id: u32) -> Result<bool> {
        self.get_source_contents(source_id)
            .map(|contents| contents.is_some())
    }

    /// Iterates over all source ids and urls.
    pub fn iter_sources(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.sources
            .iter()
            .enumerate()
            .map(|(id, url)| (id as u32, url.as_ref()))
    }

    #[inline]
    fn source_out_of_range(&self, source_id: u32) -> Error {
        Error::SourceOutOfRange {
            index: source_id,
            count: self.source_count(),
        }
    }
}

impl<'a> BorrowedView<'a> {
    pub(crate) fn from_raw(raw: RawSourceMap<'a>) -> Result<Self> {
        if !matches!(raw.version, Some(3)) {
            return Err(Error::UnsupportedFormat);
        }
        if raw.sections.is_some() {
            return Err(Error::IndexedSourceMap);
        }

        let file = raw.file.map(Cow::Borrowed);

        let names = raw
            .names
            .unwrap_or_default()
            .into_iter()
            .map(Cow::Borrowed)
            .collect::<Vec<_>>();

        let raw_sources = raw.sources.unwrap_or_default();
        let sources_len = raw_sources.len();
        let sources = match raw.source_root.filter(|sr| !sr.is_empty()) {
            Some(source_root) => {
                let source_root = source_root.trim_end_matches('/');
                raw_sources
                    .into_iter()
                    .map(|source| match source {
                        None => Cow::Borrowed(""),
                        Some(source)
                            if source.is_empty()
                                || source.starts_with('/')
                                || source.starts_with("http:")
                                || source.starts_with("https:") =>
                        {
                            Cow::Borrowed(source)
                        }
                        Some(source) => Cow::Owned(format!("{}/{}", source_root, source)),
                    })
                    .collect::<Vec<_>>()
            }
            None => raw_sources
                .into_iter()
                .map(|source| Cow::Borrowed(source.unwrap_or_default()))
                .collect::<Vec<_>>(),
        };

        let sources_content = match raw.sources_content {
            Some(sources_content) => {
                if sources_content.len() != sources_len {
                    return Err(Error::invalid_sources_content(
                        sources_len as u32,
                        sources_content.len() as u32,
                    ));
                }
                sources_content
                    .into_iter()
                    .map(|s| s.map(Cow::Borrowed))
                    .collect::<Vec<_>>()
            }
            None => vec![None; sources_len],
        };

        let tokens = Tokens::decode(
            raw.mappings.unwrap_or_default(),
            ItemsCount::new(sources.len() as u32, names.len() as u32),
        )?;

        tracing::debug!(
            tokens = tokens.len(),
            sources = sources.len(),
            names = names.len(),
            "parsed source map"
        );

        Ok(Self {
            file,
            tokens,
            names,
            sources,
            sources_content,
        })
    }

    /// Creates a new `BorrowedView` from a JSON buffer slice.
    ///
    /// The slice is mutable to facilitate in-place replacement of escape characters
    /// in the JSON string, allowing maximum data borrowing.
    #[inline]
    pub fn from_slice(json: &'a mut [u8]) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_slice(json)?)
    }

    /// Similar to [Self::from_slice],
    /// but reuses `buffers` to avoid allocating the parser's scratch space.
    #[inline]
    pub fn from_slice_with_buffers(json: &'a mut [u8], buffers: &mut Buffers) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_slice_with_buffers(json, buffers)?)
    }

    /// Creates a new `BorrowedView` from a JSON string.
    ///
    /// see [Self::from_slice].
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &'a mut str) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_str(json)?)
    }

    /// Creates a new `BorrowedView` from a memdb buffer.
    ///
    /// Urls, names and contents are borrowed from `buffer`; token records are copied.
    #[inline]
    pub fn from_memdb(buffer: &'a [u8]) -> Result<Self> {
        memdb::decode(buffer)
    }

    /// Detaches the view from the buffer it was parsed from.
    pub fn into_owned(self) -> BorrowedView<'static> {
        fn into_owned(i: Cow<'_, str>) -> Cow<'static, str> {
            Cow::Owned(i.into_owned())
        }

        BorrowedView {
            file: self.file.map(into_owned),
            tokens: self.tokens,
            names: self.names.into_iter().map(into_owned).collect(),
            sources: self.sources.into_iter().map(into_owned).collect(),
            sources_content: self
                .sources_content
                .into_iter()
                .map(|c| c.map(into_owned))
                .collect(),
        }
    }
}

impl BorrowedView<'_> {
    /// Serializes the view into the memdb format.
    pub fn to_memdb(&self, options: DumpOptions) -> Result<Vec<u8>> {
        memdb::encode(self, options)
    }

    /// Writes the view as a JSON source map.
    pub fn write<W>(&self, w: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        w.write_all(br#"{"version":3"#)?;

        if let Some(file) = self.file.as_deref() {
            w.write_all(br#","file":"#)?;
            file.json_write(w)?;
        }

        w.write_all(br#","sources":"#)?;
        self.sources.json_write(w)?;
        if self.sources_content.iter().any(Option::is_some) {
            w.write_all(br#","sourcesContent":"#)?;
            self.sources_content.json_write(w)?;
        }
        w.write_all(br#","names":"#)?;
        self.names.json_write(w)?;

        w.write_all(br#","mappings":""#)?;
        self.tokens.encode(w)?;
        w.write_all(br#"""#)?;

        w.write_all(br#"}"#)
    }

    #[inline]
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut v = Vec::with_capacity(1024);
        self.write(&mut v)?;
        Ok(v)
    }

    #[inline]
    pub fn to_string(&self) -> io::Result<String> {
        String::from_utf8(self.to_vec()?).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::BorrowedView;
    use crate::{Error, ErrorKind, Token};
    use std::borrow::Cow;

    #[test]
    fn test_end_to_end() {
        let mut buf =
            br#"{"version":3,"sources":["a.js"],"names":["x"],"mappings":"AAAA,CAAC"}"#.to_vec();
        let view = BorrowedView::from_slice(&mut buf).unwrap();

        assert_eq!(view.token_count(), 2);
        assert_eq!(view.get_token(0).unwrap(), Token::new(0, 0).with_source(0, 0, 0));
        assert_eq!(view.get_token(1).unwrap(), Token::new(0, 1).with_source(0, 0, 1));

        assert_eq!(view.lookup((0, 1)), Some(view.get_token(1).unwrap()));
        assert_eq!(view.lookup((0, 5)), Some(view.get_token(1).unwrap()));
        assert_eq!(view.lookup((1, 0)), None);

        let found = view.lookup_token(0, 0).unwrap();
        assert_eq!(found.source, Some("a.js"));
        assert_eq!(found.name, None);
        assert_eq!(found.to_string(), "a.js:0:0");
    }

    #[test]
    fn test_accessors() {
        let mut buf = br#"{
            "version":3,
            "file":"out.js",
            "sourceRoot":"src/",
            "sources":["a.js","/abs/b.js",null],
            "sourcesContent":["let a = 1;\nlet b = 2;",null,null],
            "names":["a","b"],
            "mappings":"AAAAA,IAAIC"
        }"#
        .to_vec();
        let view = BorrowedView::from_slice(&mut buf).unwrap();

        assert_eq!(view.file(), Some("out.js"));
        assert_eq!(view.source_count(), 3);
        assert_eq!(view.get_source_name(0).unwrap(), "src/a.js");
        assert_eq!(view.get_source_name(1).unwrap(), "/abs/b.js");
        assert_eq!(view.get_source_name(2).unwrap(), "");
        assert_eq!(
            view.get_source_contents(0).unwrap().map(Cow::as_ref),
            Some("let a = 1;\nlet b = 2;")
        );
        assert!(view.has_source_contents(0).unwrap());
        assert_eq!(view.get_source_contents(1).unwrap(), None);
        assert!(!view.has_source_contents(2).unwrap());
        assert!(matches!(
            view.get_source_contents(3),
            Err(Error::SourceOutOfRange { index: 3, count: 3 })
        ));
        assert_eq!(view.get_source_name(7).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(view.get_name(1).unwrap(), "b");
        assert!(view.get_name(2).is_err());
        assert!(matches!(
            view.get_token(2),
            Err(Error::TokenOutOfRange { index: 2, count: 2 })
        ));

        let found = view.lookup_token(0, 4).unwrap();
        assert_eq!(found.name, Some("b"));
        assert_eq!(found.to_string(), "src/a.js:0:4 name=b");

        assert_eq!(
            view.iter_sources().collect::<Vec<_>>(),
            vec![(0, "src/a.js"), (1, "/abs/b.js"), (2, "")]
        );
    }

    #[test]
    fn test_parse_errors() {
        let mut buf = br#"{"version":2,"sources":[],"names":[],"mappings":""}"#.to_vec();
        assert!(matches!(
            BorrowedView::from_slice(&mut buf),
            Err(Error::UnsupportedFormat)
        ));

        let mut buf = br#"{"version":3,"sections":[]}"#.to_vec();
        assert!(matches!(
            BorrowedView::from_slice(&mut buf),
            Err(Error::IndexedSourceMap)
        ));

        let mut buf =
            br#"{"version":3,"sources":["a.js"],"sourcesContent":[],"names":[],"mappings":""}"#
                .to_vec();
        assert!(matches!(
            BorrowedView::from_slice(&mut buf),
            Err(Error::InvalidSourcesContent {
                sources_len: 1,
                sources_content_len: 0
            })
        ));

        let mut buf = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA,A!AA"}"#
            .to_vec();
        let err = BorrowedView::from_slice(&mut buf).unwrap_err();
        assert!(matches!(err, Error::MappingMalformed(..)));
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_write_json() {
        let mut buf = br#"{"version":3,"file":"out.js","sources":["a.js"],"names":["x"],"mappings":";AAAAA,CAAC"}"#.to_vec();
        let view = BorrowedView::from_slice(&mut buf).unwrap();
        insta::assert_snapshot!(view.to_string().unwrap(), @r###"{"version":3,"file":"out.js","sources":["a.js"],"names":["x"],"mappings":";AAAAA,CAAC"}"###);

        let mut again = view.to_vec().unwrap();
        let reparsed = BorrowedView::from_slice(&mut again).unwrap();
        assert_eq!(reparsed.tokens(), view.tokens());
    }

    #[test]
    fn test_into_owned() {
        let owned = {
            let mut buf =
                br#"{"version":3,"sources":["a.js"],"names":["x"],"mappings":"AAAAA"}"#.to_vec();
            BorrowedView::from_slice(&mut buf).unwrap().into_owned()
        };
        assert_eq!(owned.get_source_name(0).unwrap(), "a.js");
        assert_eq!(owned.lookup_token(0, 3).unwrap().name, Some("x"));
    }

    #[test]
    fn test_debug() {
        let mut buf =
            br#"{"version":3,"sources":["a.js"],"names":["x"],"mappings":"AAAAA,CAAC;CAAC"}"#
                .to_vec();
        let view = BorrowedView::from_slice(&mut buf).unwrap();
        insta::assert_snapshot!(format!("{:?}", view), @r###"
        View
          sources:
            0: a.js
          names:
            0: x
          tokens:
            0:0 -> 0:0:0 (0), 0:1 -> 0:0:1
            1:1 -> 0:0:2
        "###);
    }
}
