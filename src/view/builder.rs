use crate::tokens::Tokens;
use crate::view::{BorrowedView, View};
use crate::Result;
use std::borrow::Cow;

impl View {
    pub fn builder() -> ViewBuilder<'static> {
        ViewBuilder::default()
    }
}

impl<'a> BorrowedView<'a> {
    pub fn builder() -> ViewBuilder<'a> {
        ViewBuilder::default()
    }
}

/// Assembles a view from parts, validating it on build.
///
/// Missing `sourcesContent` defaults to no contents for every source.
#[derive(Debug, Default)]
pub struct ViewBuilder<'a> {
    pub(crate) file: Option<Cow<'a, str>>,
    pub(crate) tokens: Option<Tokens>,
    pub(crate) names: Option<Vec<Cow<'a, str>>>,
    pub(crate) sources: Option<Vec<Cow<'a, str>>>,
    pub(crate) sources_content: Option<Vec<Option<Cow<'a, str>>>>,
}

impl<'a> ViewBuilder<'a> {
    #[inline(always)]
    pub fn with_file(mut self, file: Cow<'a, str>) -> Self {
        self.file = Some(file);
        self
    }

    #[inline(always)]
    pub fn with_tokens(mut self, tokens: Tokens) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[inline(always)]
    pub fn with_names(mut self, names: Vec<Cow<'a, str>>) -> Self {
        self.names = Some(names);
        self
    }

    #[inline(always)]
    pub fn with_sources(mut self, sources: Vec<Cow<'a, str>>) -> Self {
        self.sources = Some(sources);
        self
    }

    #[inline(always)]
    pub fn with_sources_content(mut self, sources_content: Vec<Option<Cow<'a, str>>>) -> Self {
        self.sources_content = Some(sources_content);
        self
    }

    pub fn build_borrowed(self) -> Result<BorrowedView<'a>> {
        let sources = self.sources.unwrap_or_default();
        let sources_content = self
            .sources_content
            .unwrap_or_else(|| vec![None; sources.len()]);
        let view = BorrowedView {
            file: self.file,
            tokens: self.tokens.unwrap_or_default(),
            names: self.names.unwrap_or_default(),
            sources,
            sources_content,
        };
        view.validate()?;
        Ok(view)
    }

    pub fn build(self) -> Result<View> {
        self.build_borrowed().map(Into::into)
    }
}
