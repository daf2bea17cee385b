use crate::token::{Position, Token};
use crate::tokens::Tokens;
use std::cell::Cell;
use std::cmp::Ordering;

type FinderState = (
    // generated pos of the last finding
    Position,
    // result index in tokens of the last finding
    usize,
);

/// `TokenFinder` is a helper struct for looking up tokens within a [BorrowedView](crate::BorrowedView).
///
/// It is highly efficient for frequent lookups,
/// especially when traversing the view in small increments (e.g., sequentially
/// resolving positions from start to finish in a minified file).
///
/// A finder keeps its own cursor, so every caller should create its own one.
#[derive(Debug)]
pub struct TokenFinder<'a> {
    // last token found
    state: Cell<FinderState>,
    finder: TokenFinderImpl<'a>,
}

impl<'a> TokenFinder<'a> {
    pub(crate) fn new(tokens: &'a Tokens) -> Self {
        Self {
            state: Cell::new((
                // set to the max position at first
                Position::max(),
                // no need to minus 1 because it will be the upper bound for the first searching
                tokens.len(),
            )),
            finder: TokenFinderImpl::new(tokens),
        }
    }

    /// Finds the token for a given generated position.
    ///
    /// Same semantics as [lookup](crate::BorrowedView::lookup).
    pub fn lookup<P>(&self, pos: P) -> Option<Token>
    where
        P: Into<Position>,
    {
        self.finder.find(pos.into(), Some(&self.state))
    }
}

#[derive(Debug)]
pub(crate) struct TokenFinderImpl<'a> {
    tokens: &'a Tokens,
}

impl<'a> TokenFinderImpl<'a> {
    pub(crate) fn new(tokens: &'a Tokens) -> Self {
        Self { tokens }
    }

    /// Returns the closest token at or before `pos` on the same generated line.
    #[inline]
    pub(crate) fn find(&self, pos: Position, state: Option<&Cell<FinderState>>) -> Option<Token> {
        let idx = match state {
            Some(state) => {
                let (last_pos, last_idx) = state.get();

                let should_use_linear_search =
                    pos.line == last_pos.line && pos.column.abs_diff(last_pos.column) <= 32;

                let found = match last_pos.cmp(&pos) {
                    Ordering::Less => {
                        if should_use_linear_search {
                            self.find_by_linear_search_down_to(pos, last_idx + 1)
                        } else {
                            self.find_by_binary_search_down_to(pos, last_idx + 1)
                        }
                    }
                    Ordering::Greater => {
                        if should_use_linear_search {
                            self.find_by_linear_search_up_to(pos, last_idx)
                        } else {
                            // this is the branch that initial state will enter
                            self.find_by_binary_search_up_to(pos, last_idx)
                        }
                    }
                    Ordering::Equal if last_idx < self.tokens.len() => Some(last_idx),
                    // only reachable by querying `Position::max()` on a fresh finder
                    Ordering::Equal => self.find_by_binary_search_up_to(pos, self.tokens.len()),
                };
                if let Some(idx) = found {
                    state.set((self.tokens[idx].dst(), idx));
                }
                found
            }
            None => self.find_by_binary_search_up_to(pos, self.tokens.len()),
        }?;

        let token = self.tokens[idx];
        // a token from an earlier line does not cover this one
        (token.dst_line() == pos.line).then_some(token)
    }

    fn find_by_linear_search_up_to(&self, pos: Position, max_idx: usize) -> Option<usize> {
        (0..max_idx)
            .rev()
            .find(|&idx| self.tokens[idx].dst() <= pos)
    }

    fn find_by_linear_search_down_to(&self, pos: Position, min_idx: usize) -> Option<usize> {
        // min_idx is always > 0: it follows a previous finding
        for idx in min_idx..self.tokens.len() {
            match self.tokens[idx].dst().cmp(&pos) {
                Ordering::Less => continue,
                Ordering::Equal => return Some(idx),
                Ordering::Greater => return Some(idx - 1),
            }
        }
        Some(self.tokens.len() - 1)
    }

    fn find_by_binary_search_up_to(&self, pos: Position, max_idx: usize) -> Option<usize> {
        match self.tokens[..max_idx].binary_search_by_key(&pos, Token::dst) {
            Ok(idx) => Some(idx),
            Err(0) => None,
            Err(idx) => Some(idx - 1),
        }
    }

    fn find_by_binary_search_down_to(&self, pos: Position, min_idx: usize) -> Option<usize> {
        Some(
            match self.tokens[min_idx..].binary_search_by_key(&pos, Token::dst) {
                Ok(idx) => min_idx + idx,
                Err(idx) => min_idx + idx - 1,
            },
        )
    }
}
