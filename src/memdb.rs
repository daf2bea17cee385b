//! The memdb format: a flat, little-endian binary encoding of a view.
//!
//! ```text
//! header     magic "SMDB" | version | section count
//! directory  (offset, len) for tokens, sources, names, blob
//! tokens     24-byte records: dst_line dst_col src_line src_col source_id name_id
//! sources    16-byte records: url_off url_len content_off content_len
//! names      8-byte records:  off len
//! blob       UTF-8 bytes, record offsets are relative to its start
//! ```
//!
//! Every integer is a `u32`. `u32::MAX` marks an absent id or absent contents.

use crate::token::{OptionId, Position, Token};
use crate::tokens::Tokens;
use crate::view::BorrowedView;
use crate::{Error, Result};
use std::borrow::Cow;

const MAGIC: &[u8; 4] = b"SMDB";
const VERSION: u32 = 1;
const SECTION_COUNT: u32 = 4;

const HEADER_LEN: usize = 12;
const DIRECTORY_LEN: usize = SECTION_COUNT as usize * 8;

const TOKEN_RECORD_LEN: usize = 24;
const SOURCE_RECORD_LEN: usize = 16;
const NAME_RECORD_LEN: usize = 8;

const NO_CONTENTS: u32 = OptionId::MISSING;

/// Controls which optional regions [BorrowedView::to_memdb] writes.
///
/// Both source contents and names are included by default.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DumpOptions {
    pub with_source_contents: bool,
    pub with_names: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            with_source_contents: true,
            with_names: true,
        }
    }
}

impl DumpOptions {
    #[inline(always)]
    pub fn with_source_contents(mut self, with_source_contents: bool) -> Self {
        self.with_source_contents = with_source_contents;
        self
    }

    #[inline(always)]
    pub fn with_names(mut self, with_names: bool) -> Self {
        self.with_names = with_names;
        self
    }
}

#[inline]
fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::MemDbTooLarge)
}

#[inline]
fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[derive(Default)]
struct Blob(Vec<u8>);

impl Blob {
    fn push(&mut self, s: &str) -> Result<(u32, u32)> {
        let off = to_u32(self.0.len())?;
        let len = to_u32(s.len())?;
        self.0.extend_from_slice(s.as_bytes());
        Ok((off, len))
    }
}

pub(crate) fn encode(view: &BorrowedView<'_>, options: DumpOptions) -> Result<Vec<u8>> {
    let mut blob = Blob::default();

    let mut tokens = Vec::with_capacity(view.tokens.len() * TOKEN_RECORD_LEN);
    for token in view.tokens.iter() {
        let token = if options.with_names {
            *token
        } else {
            token.without_name()
        };
        for value in [
            token.dst_line(),
            token.dst_col(),
            token.src_line(),
            token.src_col(),
            token.raw_source_id(),
            token.raw_name_id(),
        ] {
            put_u32(&mut tokens, value);
        }
    }

    let mut sources = Vec::with_capacity(view.sources.len() * SOURCE_RECORD_LEN);
    for (url, contents) in view.sources.iter().zip(&view.sources_content) {
        let (url_off, url_len) = blob.push(url)?;
        let (contents_off, contents_len) = match contents {
            Some(contents) if options.with_source_contents => blob.push(contents)?,
            _ => (NO_CONTENTS, 0),
        };
        for value in [url_off, url_len, contents_off, contents_len] {
            put_u32(&mut sources, value);
        }
    }

    let mut names = Vec::new();
    if options.with_names {
        names.reserve(view.names.len() * NAME_RECORD_LEN);
        for name in &view.names {
            let (off, len) = blob.push(name)?;
            put_u32(&mut names, off);
            put_u32(&mut names, len);
        }
    }

    let regions = [tokens, sources, names, blob.0];
    let total = HEADER_LEN + DIRECTORY_LEN + regions.iter().map(Vec::len).sum::<usize>();
    to_u32(total)?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(MAGIC);
    put_u32(&mut out, VERSION);
    put_u32(&mut out, SECTION_COUNT);

    let mut offset = HEADER_LEN + DIRECTORY_LEN;
    for region in &regions {
        put_u32(&mut out, to_u32(offset)?);
        put_u32(&mut out, to_u32(region.len())?);
        offset += region.len();
    }
    for region in &regions {
        out.extend_from_slice(region);
    }

    tracing::debug!(
        tokens = view.tokens.len(),
        sources = view.sources.len(),
        names = if options.with_names { view.names.len() } else { 0 },
        bytes = out.len(),
        "encoded memdb"
    );

    Ok(out)
}

fn out_of_bounds(region: &'static str, offset: usize, len: usize, buffer_len: usize) -> Error {
    Error::MemDbOutOfBounds {
        region,
        offset: offset as u64,
        len: len as u64,
        buffer_len,
    }
}

#[inline]
fn ensure_len(data: &[u8], pos: usize, need: usize, region: &'static str) -> Result<()> {
    match pos.checked_add(need) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(out_of_bounds(region, pos, need, data.len())),
    }
}

#[inline]
fn read_u32(data: &[u8], pos: &mut usize, region: &'static str) -> Result<u32> {
    ensure_len(data, *pos, 4, region)?;
    let v = word(&data[*pos..], 0);
    *pos += 4;
    Ok(v)
}

/// Reads the `idx`-th little-endian `u32` of a record whose length is already checked.
#[inline(always)]
fn word(record: &[u8], idx: usize) -> u32 {
    let i = idx * 4;
    u32::from_le_bytes([record[i], record[i + 1], record[i + 2], record[i + 3]])
}

fn region<'a>(
    data: &'a [u8],
    pos: &mut usize,
    region: &'static str,
    record_len: usize,
) -> Result<&'a [u8]> {
    let offset = read_u32(data, pos, "directory")? as usize;
    let len = read_u32(data, pos, "directory")? as usize;
    let bytes = offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| out_of_bounds(region, offset, len, data.len()))?;
    if bytes.len() % record_len != 0 {
        return Err(Error::BadMemDb(format!(
            "{region} region length {len} is not a multiple of {record_len}"
        )));
    }
    Ok(bytes)
}

fn blob_str<'a>(blob: &'a [u8], off: u32, len: u32, what: &str, idx: usize) -> Result<&'a str> {
    let (off, len) = (off as usize, len as usize);
    let bytes = off
        .checked_add(len)
        .and_then(|end| blob.get(off..end))
        .ok_or_else(|| out_of_bounds("blob", off, len, blob.len()))?;
    std::str::from_utf8(bytes)
        .map_err(|e| Error::BadMemDb(format!("invalid UTF-8 in {what} #{idx}: {e}")))
}

pub(crate) fn decode(data: &[u8]) -> Result<BorrowedView<'_>> {
    if data.get(..MAGIC.len()) != Some(&MAGIC[..]) {
        return Err(Error::BadMemDbMagic);
    }
    let mut pos = MAGIC.len();

    let version = read_u32(data, &mut pos, "header")?;
    if version != VERSION {
        return Err(Error::UnsupportedMemDbVersion(version));
    }
    let section_count = read_u32(data, &mut pos, "header")?;
    if section_count != SECTION_COUNT {
        return Err(Error::BadMemDb(format!(
            "expected {SECTION_COUNT} sections, found {section_count}"
        )));
    }

    let token_records = region(data, &mut pos, "tokens", TOKEN_RECORD_LEN)?;
    let source_records = region(data, &mut pos, "sources", SOURCE_RECORD_LEN)?;
    let name_records = region(data, &mut pos, "names", NAME_RECORD_LEN)?;
    let blob = region(data, &mut pos, "blob", 1)?;

    let mut sources = Vec::with_capacity(source_records.len() / SOURCE_RECORD_LEN);
    let mut sources_content = Vec::with_capacity(sources.capacity());
    for (idx, record) in source_records.chunks_exact(SOURCE_RECORD_LEN).enumerate() {
        let url = blob_str(blob, word(record, 0), word(record, 1), "source url", idx)?;
        sources.push(Cow::Borrowed(url));

        let contents_off = word(record, 2);
        let contents = if contents_off == NO_CONTENTS {
            None
        } else {
            let contents = blob_str(blob, contents_off, word(record, 3), "source contents", idx)?;
            Some(Cow::Borrowed(contents))
        };
        sources_content.push(contents);
    }

    let names = name_records
        .chunks_exact(NAME_RECORD_LEN)
        .enumerate()
        .map(|(idx, record)| {
            blob_str(blob, word(record, 0), word(record, 1), "name", idx).map(Cow::Borrowed)
        })
        .collect::<Result<Vec<_>>>()?;

    let tokens = token_records
        .chunks_exact(TOKEN_RECORD_LEN)
        .map(|record| {
            Token::from_raw_parts(
                Position::new(word(record, 0), word(record, 1)),
                Position::new(word(record, 2), word(record, 3)),
                word(record, 4),
                word(record, 5),
            )
        })
        .collect::<Vec<_>>();

    let view = BorrowedView {
        file: None,
        tokens: Tokens(tokens),
        names,
        sources,
        sources_content,
    };
    view.validate()
        .map_err(|e| Error::BadMemDb(format!("invalid token table: {e}")))?;

    tracing::debug!(
        tokens = view.tokens.len(),
        sources = view.sources.len(),
        names = view.names.len(),
        bytes = data.len(),
        "decoded memdb"
    );

    Ok(view)
}
