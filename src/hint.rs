#[inline]
#[cold]
pub(crate) fn cold_path() {}

/// Marks `$e` as usually true for the optimizer; evaluates to `$e`.
///
/// Calling a `#[cold]` function on the other branch is the stable way to
/// express this, see <https://github.com/rust-lang/hashbrown/pull/209>.
macro_rules! likely {
    ($e:expr) => {{
        let cond: bool = $e;
        if !cond {
            $crate::hint::cold_path();
        }
        cond
    }};
}

/// Marks `$e` as usually false; the counterpart of [likely].
macro_rules! unlikely {
    ($e:expr) => {{
        let cond: bool = $e;
        if cond {
            $crate::hint::cold_path();
        }
        cond
    }};
}

pub(crate) use likely;
pub(crate) use unlikely;
