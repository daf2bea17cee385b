use crate::finder::{TokenFinder, TokenFinderImpl};
use crate::hint::likely;
use crate::splitter::Splitter;
use crate::token::{Position, Token};
use crate::vlq::{encode_delta, VlqDecoder};
use crate::{Error, Result};
use std::io;
use std::io::Write;
use std::ops::Deref;

/// `Tokens` is the sorted token table of a view.
///
/// Tokens are ordered by their generated position and no two tokens share one.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Tokens(pub(crate) Vec<Token>);

impl Deref for Tokens {
    type Target = [Token];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(feature = "builder")]
impl Tokens {
    /// Creates a new `Tokens` from a vec of [Token] entries.
    ///
    /// The entries will be sorted by their generated positions,
    /// keeping the first of any entries sharing a position.
    pub fn new(raw: Vec<Token>) -> Self {
        Self::from_unsorted(raw)
    }
}

impl Tokens {
    /// Stable sort by generated position, then drop later duplicates.
    pub(crate) fn from_unsorted(mut raw: Vec<Token>) -> Self {
        raw.sort_by_key(Token::dst);
        raw.dedup_by_key(|token| token.dst());
        Self(raw)
    }
}

impl Tokens {
    /// Finds the token for a given generated position.
    ///
    /// see [lookup](crate::BorrowedView::lookup).
    pub fn lookup<P>(&self, pos: P) -> Option<Token>
    where
        P: Into<Position>,
    {
        TokenFinderImpl::new(self).find(pos.into(), None)
    }

    /// see [finder](crate::BorrowedView::finder).
    pub fn finder(&self) -> TokenFinder {
        TokenFinder::new(self)
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct ItemsCount {
    pub(crate) sources: u32,
    pub(crate) names: u32,
}

impl ItemsCount {
    pub fn new(sources: u32, names: u32) -> Self {
        Self { sources, names }
    }
}

impl Tokens {
    pub(crate) fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        let mut prev_dst_line = 0;
        let mut prev_dst_col = 0;
        let mut prev_source_id = 0;
        let mut prev_src_line = 0;
        let mut prev_src_col = 0;
        let mut prev_name_id = 0;

        for (idx, token) in self.0.iter().enumerate() {
            let dst = token.dst();

            if dst.line != prev_dst_line {
                prev_dst_col = 0;
                while dst.line != prev_dst_line {
                    writer.write_all(&[b';'])?;
                    prev_dst_line += 1;
                }
            } else if idx != 0 {
                writer.write_all(&[b','])?;
            }

            encode_delta(writer, prev_dst_col, dst.column)?;
            prev_dst_col = dst.column;

            if let Some(source_id) = token.source_id() {
                encode_delta(writer, prev_source_id, source_id)?;
                prev_source_id = source_id;

                encode_delta(writer, prev_src_line, token.src_line())?;
                prev_src_line = token.src_line();

                encode_delta(writer, prev_src_col, token.src_col())?;
                prev_src_col = token.src_col();

                if let Some(name_id) = token.name_id() {
                    encode_delta(writer, prev_name_id, name_id)?;
                    prev_name_id = name_id;
                }
            }
        }

        Ok(())
    }

    /// Checks the table invariants:
    /// 1. generated positions strictly increase
    /// 2. source_id has corresponding source
    /// 3. name_id has corresponding name
    /// 4. only tokens with a source carry a name
    pub(crate) fn validate(&self, items_count: ItemsCount) -> Result<()> {
        let mut last: Option<Position> = None;

        for (index, token) in self.0.iter().enumerate() {
            let pos = token.dst();
            if last.is_some_and(|last| pos <= last) {
                return Err(Error::UnorderedTokens);
            }
            last = Some(pos);

            if let Some(source_id) = token.source_id() {
                if source_id >= items_count.sources {
                    return Err(Error::UnknownSourceReference(source_id as i64));
                }
            }
            if let Some(name_id) = token.name_id() {
                if token.source_id().is_none() {
                    return Err(Error::NameWithoutSource(index));
                }
                if name_id >= items_count.names {
                    return Err(Error::UnknownNameReference(name_id as i64));
                }
            }
        }

        Ok(())
    }
}

#[inline]
fn to_u32(value: i64, segment: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::MappingMalformed(segment.to_owned()))
}

impl Tokens {
    /// Decodes a `mappings` string into a sorted token table.
    ///
    /// Segments with a single field carry no source and produce no token.
    pub(crate) fn decode(source: &str, items_count: ItemsCount) -> Result<Self> {
        let mut generated_line = 0u32;
        let mut generated_col = 0i64;
        let mut source_id = 0i64;
        let mut source_line = 0i64;
        let mut source_col = 0i64;
        let mut name_id = 0i64;

        let mut decoder = VlqDecoder::new();

        // the ratio of source.len to mappings.len is generally between 5 and 7,
        // with most minified ones being > 6 and most unminified ones being < 6;
        // 6 is a conservative value here.
        let mut tokens = Vec::with_capacity(source.len() / 6);

        for line in Splitter::new(source, b';') {
            if !line.is_empty() {
                for segment in Splitter::new(line, b',') {
                    if segment.is_empty() {
                        continue;
                    }
                    let nums = decoder.decode(segment)?;

                    generated_col += nums[0];
                    let dst_col = to_u32(generated_col, segment)?;

                    if likely!(nums.len() > 1) {
                        source_id += nums[1];
                        if source_id < 0 || source_id >= items_count.sources as i64 {
                            return Err(Error::UnknownSourceReference(source_id));
                        }

                        source_line += nums[2];
                        source_col += nums[3];

                        let mut token = Token::new(generated_line, dst_col).with_source(
                            source_id as u32,
                            to_u32(source_line, segment)?,
                            to_u32(source_col, segment)?,
                        );

                        if nums.len() == 5 {
                            name_id += nums[4];
                            if name_id < 0 || name_id >= items_count.names as i64 {
                                return Err(Error::UnknownNameReference(name_id));
                            }
                            token = token.with_name(name_id as u32)
                        }

                        tokens.push(token);
                    } else {
                        tracing::trace!(line = generated_line, column = dst_col, "dropped unmapped segment");
                    }
                }
            }

            generated_line = generated_line
                .checked_add(1)
                .ok_or_else(|| Error::MappingMalformed(line.to_owned()))?;
            generated_col = 0;
        }

        Ok(Self::from_unsorted(tokens))
    }
}
