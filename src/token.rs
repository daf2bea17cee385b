use std::fmt::{Debug, Display, Formatter};

/// `Position` represents a zero-based line and zero-based column in a file.
///
/// # Note
///
/// The source map specification does not define whether generated lines start at 0 or 1.
/// In this crate, both the line and column are 0-based.
/// However, it's important to consider that different implementations use different bases, for example:
///
/// - In almost all engine implementations, `Error.prototype.stack` and the source panel in devtools
///   have 1-based line and column.
/// - NPM libraries such as `sourcemap`, `acorn`, and `babel`, produce 1-based line and 0-based column.
/// - Tools like `esbuild` use 0-based line and column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn max() -> Self {
        Self {
            line: u32::MAX,
            column: u32::MAX,
        }
    }

    pub const fn min() -> Self {
        Self { line: 0, column: 0 }
    }

    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl From<(u32, u32)> for Position {
    fn from((line, column): (u32, u32)) -> Self {
        Self::new(line, column)
    }
}

/// An id that may be missing, stored as `u32::MAX` when absent.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct OptionId(u32);

impl OptionId {
    pub(crate) const MISSING: u32 = u32::MAX;

    #[inline]
    pub const fn missing() -> Self {
        Self(Self::MISSING)
    }

    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(&self) -> Option<u32> {
        if self.is_missing() {
            None
        } else {
            Some(self.0)
        }
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_missing(&self) -> bool {
        self.0 == Self::MISSING
    }
}

#[inline]
fn rebase(id: u32, base: u32) -> Option<u32> {
    id.checked_add(base).filter(|&id| id != OptionId::MISSING)
}

/// One mapping from a generated position to an original position.
///
/// Lines and columns in `Token` start at 0. See [Position].
/// A token without a source keeps `0:0` as its original position.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Token {
    dst: Position,
    src: Position,
    source: OptionId,
    name: OptionId,
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dst.line, self.dst.column)?;
        if let Some(source_id) = self.source_id() {
            write!(
                f,
                " -> {}:{}:{}",
                source_id, self.src.line, self.src.column
            )?;
            if let Some(name_id) = self.name_id() {
                write!(f, " ({})", name_id)?;
            }
        }
        Ok(())
    }
}

impl Token {
    #[inline(always)]
    pub const fn new(dst_line: u32, dst_col: u32) -> Self {
        Self {
            dst: Position {
                line: dst_line,
                column: dst_col,
            },
            src: Position::min(),
            source: OptionId::missing(),
            name: OptionId::missing(),
        }
    }

    #[inline(always)]
    pub const fn with_source(self, source_id: u32, src_line: u32, src_col: u32) -> Self {
        Self {
            src: Position {
                line: src_line,
                column: src_col,
            },
            source: OptionId::new(source_id),
            ..self
        }
    }

    #[inline(always)]
    pub const fn with_name(self, name_id: u32) -> Self {
        Self {
            name: OptionId::new(name_id),
            ..self
        }
    }

    #[inline]
    pub(crate) const fn from_raw_parts(
        dst: Position,
        src: Position,
        source_id: u32,
        name_id: u32,
    ) -> Self {
        Self {
            dst,
            src,
            source: OptionId::new(source_id),
            name: OptionId::new(name_id),
        }
    }

    /// Moves the token into a parent map starting at `offset`, rebasing its ids.
    ///
    /// Only the first line of a section shares the column origin of its offset.
    /// Returns `None` when a position or id no longer fits in `u32`.
    #[inline]
    pub(crate) fn relocate(self, offset: Position, source_base: u32, name_base: u32) -> Option<Self> {
        let dst = Position {
            line: offset.line.checked_add(self.dst.line)?,
            column: if self.dst.line == 0 {
                offset.column.checked_add(self.dst.column)?
            } else {
                self.dst.column
            },
        };
        Some(Self {
            dst,
            source: match self.source.get() {
                Some(id) => OptionId::new(rebase(id, source_base)?),
                None => self.source,
            },
            name: match self.name.get() {
                Some(id) => OptionId::new(rebase(id, name_base)?),
                None => self.name,
            },
            ..self
        })
    }

    /// Returns a copy of the token with its name dropped.
    #[inline]
    pub(crate) const fn without_name(self) -> Self {
        Self {
            name: OptionId::missing(),
            ..self
        }
    }
}

impl Token {
    /// Returns the generated position of the token.
    #[inline]
    pub fn dst(&self) -> Position {
        self.dst
    }

    #[inline]
    pub fn dst_line(&self) -> u32 {
        self.dst.line
    }

    #[inline]
    pub fn dst_col(&self) -> u32 {
        self.dst.column
    }

    /// Returns the original position of the token.
    #[inline]
    pub fn src(&self) -> Position {
        self.src
    }

    #[inline]
    pub fn src_line(&self) -> u32 {
        self.src.line
    }

    #[inline]
    pub fn src_col(&self) -> u32 {
        self.src.column
    }

    #[inline]
    pub fn source_id(&self) -> Option<u32> {
        self.source.get()
    }

    #[inline]
    pub fn has_source(&self) -> bool {
        !self.source.is_missing()
    }

    /// Returns the name id if available.
    ///
    /// Tokens decoded from JSON only carry a name when they also carry a source.
    #[inline]
    pub fn name_id(&self) -> Option<u32> {
        self.name.get()
    }

    #[inline]
    pub fn has_name(&self) -> bool {
        !self.name.is_missing()
    }

    #[inline]
    pub(crate) fn raw_source_id(&self) -> u32 {
        self.source.raw()
    }

    #[inline]
    pub(crate) fn raw_name_id(&self) -> u32 {
        self.name.raw()
    }
}

/// A token resolved against the view it was found in.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TokenMatch<'v> {
    pub token: Token,
    pub source: Option<&'v str>,
    pub name: Option<&'v str>,
}

impl Display for TokenMatch<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source.unwrap_or(""),
            self.token.src_line(),
            self.token.src_col()
        )?;
        if let Some(name) = self.name {
            write!(f, " name={}", name)?;
        }
        Ok(())
    }
}
