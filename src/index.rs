use crate::token::Position;
use crate::tokens::Tokens;
use crate::view::raw::{RawSection, RawSourceMap};
use crate::view::BorrowedView;
use crate::{Error, Result};
use simd_json_derive::Deserialize;
use std::borrow::Cow;

/// The map of one [Section]: either parsed inline or referenced by url.
#[derive(Debug, Clone)]
pub enum SectionMap<'a> {
    Resolved(BorrowedView<'a>),
    /// A url that was never fetched. Such a section cannot be flattened.
    Unresolved(Cow<'a, str>),
}

/// A sub-map placed at a generated offset.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub offset: Position,
    pub map: SectionMap<'a>,
}

impl<'a> Section<'a> {
    pub fn new(offset: Position, map: SectionMap<'a>) -> Self {
        Self { offset, map }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self.map, SectionMap::Resolved(..))
    }
}

/// `Index` is an indexed source map, i.e. an ordered list of [Section]s.
///
/// An index cannot be queried directly; consume it with [Index::into_view].
#[derive(Debug, Clone)]
pub struct Index<'a> {
    file: Option<Cow<'a, str>>,
    sections: Vec<Section<'a>>,
}

impl<'a> Index<'a> {
    pub fn new(sections: Vec<Section<'a>>) -> Self {
        Self {
            file: None,
            sections,
        }
    }

    pub(crate) fn from_raw(raw: RawSourceMap<'a>) -> Result<Self> {
        if !matches!(raw.version, Some(3)) {
            return Err(Error::UnsupportedFormat);
        }
        let raw_sections = raw.sections.ok_or(Error::NotAnIndex)?;

        let sections = raw_sections
            .into_iter()
            .enumerate()
            .map(|(idx, section)| Self::section_from_raw(idx as u32, section))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(sections = sections.len(), "parsed index");

        Ok(Self {
            file: raw.file.map(Cow::Borrowed),
            sections,
        })
    }

    fn section_from_raw(idx: u32, section: RawSection<'a>) -> Result<Section<'a>> {
        let offset = Position::new(section.offset.line, section.offset.column);
        let map = match (section.map, section.url) {
            (Some(map), _) => SectionMap::Resolved(
                BorrowedView::from_raw(map).map_err(|e| Error::section_error(idx, e))?,
            ),
            (None, Some(url)) => SectionMap::Unresolved(Cow::Borrowed(url)),
            (None, None) => return Err(Error::InvalidSection(idx)),
        };
        Ok(Section { offset, map })
    }

    /// Creates a new `Index` from a JSON buffer slice.
    ///
    /// see [BorrowedView::from_slice].
    #[inline]
    pub fn from_slice(json: &'a mut [u8]) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_slice(json)?)
    }

    /// see [Self::from_slice].
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &'a mut str) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_str(json)?)
    }

    /// Creates a new `Index` that owns all its strings from a JSON buffer.
    pub fn from_json(mut json: Vec<u8>) -> Result<Index<'static>> {
        Ok(Index::from_slice(&mut json)?.into_owned())
    }

    #[inline]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    #[inline]
    pub fn sections(&self) -> &[Section<'a>] {
        &self.sections
    }

    pub fn into_owned(self) -> Index<'static> {
        Index {
            file: self.file.map(|f| Cow::Owned(f.into_owned())),
            sections: self
                .sections
                .into_iter()
                .map(|section| Section {
                    offset: section.offset,
                    map: match section.map {
                        SectionMap::Resolved(view) => SectionMap::Resolved(view.into_owned()),
                        SectionMap::Unresolved(url) => {
                            SectionMap::Unresolved(Cow::Owned(url.into_owned()))
                        }
                    },
                })
                .collect(),
        }
    }

    /// Returns `true` if every section is resolved and the offsets never go backwards.
    pub fn can_flatten(&self) -> bool {
        self.sections.iter().all(Section::is_resolved)
            && self
                .sections
                .windows(2)
                .all(|pair| pair[0].offset <= pair[1].offset)
    }

    /// Flattens the index into one view.
    ///
    /// Tokens on the first line of a section are shifted by the column of its offset,
    /// every token by its line. Source and name ids are rebased onto the concatenated
    /// tables. When tokens of different sections land on the same position, the one
    /// from the earlier section wins.
    pub fn into_view(self) -> Result<BorrowedView<'a>> {
        let token_count = self
            .sections
            .iter()
            .map(|section| match &section.map {
                SectionMap::Resolved(view) => view.token_count(),
                SectionMap::Unresolved(..) => 0,
            })
            .sum();

        let mut tokens = Vec::with_capacity(token_count);
        let mut names = Vec::new();
        let mut sources = Vec::new();
        let mut sources_content = Vec::new();

        let mut last_offset = Position::min();
        for (idx, section) in self.sections.into_iter().enumerate() {
            let idx = idx as u32;
            if section.offset < last_offset {
                return Err(Error::UnorderedSections(idx));
            }
            last_offset = section.offset;

            let view = match section.map {
                SectionMap::Resolved(view) => view,
                SectionMap::Unresolved(..) => return Err(Error::UnresolvedSection(idx)),
            };

            let source_base =
                u32::try_from(sources.len()).map_err(|_| Error::PositionOverflow(idx))?;
            let name_base = u32::try_from(names.len()).map_err(|_| Error::PositionOverflow(idx))?;

            for token in view.tokens.iter() {
                tokens.push(
                    token
                        .relocate(section.offset, source_base, name_base)
                        .ok_or(Error::PositionOverflow(idx))?,
                );
            }
            names.extend(view.names);
            sources.extend(view.sources);
            sources_content.extend(view.sources_content);
        }

        let tokens = Tokens::from_unsorted(tokens);
        tracing::debug!(
            tokens = tokens.len(),
            sources = sources.len(),
            names = names.len(),
            "flattened index"
        );

        Ok(BorrowedView {
            file: self.file,
            tokens,
            names,
            sources,
            sources_content,
        })
    }
}

/// The result of parsing a JSON source map that may or may not be indexed.
#[derive(Debug, Clone)]
pub enum ViewOrIndex<'a> {
    View(BorrowedView<'a>),
    Index(Index<'a>),
}

impl<'a> ViewOrIndex<'a> {
    fn from_raw(raw: RawSourceMap<'a>) -> Result<Self> {
        if raw.sections.is_some() {
            Index::from_raw(raw).map(ViewOrIndex::Index)
        } else {
            BorrowedView::from_raw(raw).map(ViewOrIndex::View)
        }
    }

    /// Parses a plain or indexed source map from a JSON buffer slice.
    #[inline]
    pub fn from_slice(json: &'a mut [u8]) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_slice(json)?)
    }

    /// see [Self::from_slice].
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &'a mut str) -> Result<Self> {
        Self::from_raw(RawSourceMap::from_str(json)?)
    }

    pub fn from_json(mut json: Vec<u8>) -> Result<ViewOrIndex<'static>> {
        Ok(ViewOrIndex::from_slice(&mut json)?.into_owned())
    }

    /// Flattens an index that [can be flattened](Index::can_flatten), leaves anything else as is.
    pub fn auto_flatten(self) -> Result<Self> {
        match self {
            ViewOrIndex::Index(index) if index.can_flatten() => {
                index.into_view().map(ViewOrIndex::View)
            }
            other => Ok(other),
        }
    }

    /// Returns the view, flattening an index first.
    pub fn into_view(self) -> Result<BorrowedView<'a>> {
        match self {
            ViewOrIndex::View(view) => Ok(view),
            ViewOrIndex::Index(index) => index.into_view(),
        }
    }

    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, ViewOrIndex::Index(..))
    }

    #[inline]
    pub fn as_view(&self) -> Option<&BorrowedView<'a>> {
        match self {
            ViewOrIndex::View(view) => Some(view),
            ViewOrIndex::Index(..) => None,
        }
    }

    #[inline]
    pub fn as_index(&self) -> Option<&Index<'a>> {
        match self {
            ViewOrIndex::View(..) => None,
            ViewOrIndex::Index(index) => Some(index),
        }
    }

    pub fn into_owned(self) -> ViewOrIndex<'static> {
        match self {
            ViewOrIndex::View(view) => ViewOrIndex::View(view.into_owned()),
            ViewOrIndex::Index(index) => ViewOrIndex::Index(index.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Index, Section, SectionMap, ViewOrIndex};
    use crate::{BorrowedView, Error, ErrorKind, Position, Token};

    const TWO_SECTIONS: &[u8] = br#"{
        "version":3,
        "file":"bundle.js",
        "sections":[
            {"offset":{"line":0,"column":0},"map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}},
            {"offset":{"line":5,"column":0},"map":{"version":3,"sources":["b.js"],"names":["f"],"mappings":"EAAKA"}}
        ]
    }"#;

    #[test]
    fn test_flatten_offsets() {
        let mut json = TWO_SECTIONS.to_vec();
        let index = Index::from_slice(&mut json).unwrap();
        assert_eq!(index.file(), Some("bundle.js"));
        assert_eq!(index.sections().len(), 2);
        assert!(index.can_flatten());

        let view = index.into_view().unwrap();
        assert_eq!(view.file(), Some("bundle.js"));
        assert_eq!(
            &**view.tokens(),
            &[
                Token::new(0, 0).with_source(0, 0, 0),
                Token::new(5, 2).with_source(1, 0, 5).with_name(0),
            ]
        );
        assert_eq!(view.get_source_name(1).unwrap(), "b.js");
        assert_eq!(view.lookup_token(5, 9).unwrap().name, Some("f"));
    }

    #[test]
    fn test_flatten_column_offset_applies_to_first_line_only() {
        let mut json = br#"{"version":3,"sections":[
            {"offset":{"line":1,"column":10},"map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA;CAAC"}}
        ]}"#
        .to_vec();
        let view = Index::from_slice(&mut json).unwrap().into_view().unwrap();
        assert_eq!(view.get_token(0).unwrap().dst(), Position::new(1, 10));
        assert_eq!(view.get_token(1).unwrap().dst(), Position::new(2, 1));
    }

    #[test]
    fn test_flatten_same_offset_first_wins() {
        let mut json = br#"{"version":3,"sections":[
            {"offset":{"line":0,"column":0},"map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}},
            {"offset":{"line":0,"column":0},"map":{"version":3,"sources":["b.js"],"names":[],"mappings":"AAAA,CAAC"}}
        ]}"#
        .to_vec();
        let view = Index::from_slice(&mut json).unwrap().into_view().unwrap();
        assert_eq!(view.source_count(), 2);
        assert_eq!(view.token_count(), 2);
        assert_eq!(view.lookup_token(0, 0).unwrap().source, Some("a.js"));
        assert_eq!(view.lookup_token(0, 1).unwrap().source, Some("b.js"));
    }

    #[test]
    fn test_unresolved_section() {
        let mut json = br#"{"version":3,"sections":[
            {"offset":{"line":0,"column":0},"map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}},
            {"offset":{"line":3,"column":0},"url":"b.js.map"}
        ]}"#
        .to_vec();
        let index = Index::from_slice(&mut json).unwrap();
        assert!(!index.can_flatten());
        assert!(matches!(
            &index.sections()[1].map,
            SectionMap::Unresolved(url) if url == "b.js.map"
        ));

        let err = index.into_view().unwrap_err();
        assert!(matches!(err, Error::UnresolvedSection(1)));
        assert_eq!(err.kind(), ErrorKind::Flatten);
    }

    #[test]
    fn test_unordered_sections() {
        let view = |mappings: &str| {
            let mut json = format!(
                r#"{{"version":3,"sources":["a.js"],"names":[],"mappings":"{mappings}"}}"#
            );
            BorrowedView::from_str(&mut json).unwrap().into_owned()
        };
        let index = Index::new(vec![
            Section::new(Position::new(4, 0), SectionMap::Resolved(view("AAAA"))),
            Section::new(Position::new(1, 0), SectionMap::Resolved(view("AAAA"))),
        ]);
        assert!(!index.can_flatten());
        assert!(matches!(
            index.into_view(),
            Err(Error::UnorderedSections(1))
        ));
    }

    #[test]
    fn test_position_overflow() {
        let mut json =
            br#"{"version":3,"sources":["a.js"],"names":[],"mappings":";AAAA"}"#.to_vec();
        let view = BorrowedView::from_slice(&mut json).unwrap();
        let index = Index::new(vec![Section::new(
            Position::new(u32::MAX, 0),
            SectionMap::Resolved(view),
        )]);
        assert!(matches!(
            index.into_view(),
            Err(Error::PositionOverflow(0))
        ));
    }

    #[test]
    fn test_parse_errors() {
        let mut json = br#"{"version":3,"sources":[],"names":[],"mappings":""}"#.to_vec();
        assert!(matches!(Index::from_slice(&mut json), Err(Error::NotAnIndex)));

        let mut json = br#"{"version":3,"sections":[{"offset":{"line":0,"column":0}}]}"#.to_vec();
        assert!(matches!(
            Index::from_slice(&mut json),
            Err(Error::InvalidSection(0))
        ));

        let mut json = br#"{"version":3,"sections":[
            {"offset":{"line":0,"column":0},"map":{"version":3,"sources":[],"names":[],"mappings":""}},
            {"offset":{"line":1,"column":0},"map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAAC"}}
        ]}"#
        .to_vec();
        let err = Index::from_slice(&mut json).unwrap_err();
        insta::assert_snapshot!(err, @"section #1: a mapping references unknown name #1");

        let mut json = br#"{"version":3,"sections":[
            {"offset":{"line":0,"column":0},"map":{"version":3,"sections":[]}}
        ]}"#
        .to_vec();
        assert!(matches!(
            Index::from_slice(&mut json),
            Err(Error::Section { section: 0, .. })
        ));
    }

    #[test]
    fn test_view_or_index() {
        let plain = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}"#;
        let parsed = ViewOrIndex::from_json(plain.to_vec()).unwrap();
        assert!(parsed.as_view().is_some());
        assert!(!parsed.is_index());

        let parsed = ViewOrIndex::from_json(TWO_SECTIONS.to_vec()).unwrap();
        assert!(parsed.is_index());
        let flattened = parsed.auto_flatten().unwrap();
        assert_eq!(flattened.as_view().unwrap().token_count(), 2);

        let mut json = br#"{"version":3,"sections":[{"offset":{"line":0,"column":0},"url":"a.map"}]}"#.to_vec();
        let kept = ViewOrIndex::from_slice(&mut json)
            .unwrap()
            .auto_flatten()
            .unwrap();
        assert!(kept.as_index().is_some());
        assert!(matches!(kept.into_view(), Err(Error::UnresolvedSection(0))));
    }
}
