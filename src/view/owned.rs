use crate::view::BorrowedView;
use crate::Result;
use simd_json::Buffers;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::path::Path;

/// `View` is a view that owns all its internal strings,
/// providing a more straightforward and safe API for
/// users who do not need to manage the lifetimes of the strings manually.
///
/// A `View` is immutable; all queries go through [Deref] to [BorrowedView].
#[derive(Clone)]
pub struct View(BorrowedView<'static>);

impl Debug for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl View {
    /// Creates a new `View` from a JSON buffer.
    #[inline]
    pub fn from_json(mut source: Vec<u8>) -> Result<Self> {
        Ok(BorrowedView::from_slice(&mut source)?.into())
    }

    /// Creates a new `View` from a JSON slice, leaving the input untouched.
    #[inline]
    pub fn from_json_slice(json: &[u8]) -> Result<Self> {
        Self::from_json(json.to_vec())
    }

    /// see [BorrowedView::from_slice_with_buffers].
    #[inline]
    pub fn from_slice_with_buffers(json: &mut [u8], buffers: &mut Buffers) -> Result<Self> {
        Ok(BorrowedView::from_slice_with_buffers(json, buffers)?.into())
    }

    /// see [BorrowedView::from_str].
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &mut str) -> Result<Self> {
        Ok(BorrowedView::from_str(json)?.into())
    }

    /// Creates a new `View` from a memdb buffer, copying every string out of it.
    #[inline]
    pub fn from_memdb(buffer: &[u8]) -> Result<Self> {
        Ok(BorrowedView::from_memdb(buffer)?.into())
    }

    /// Reads a memdb file into a new `View`.
    pub fn from_memdb_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let buffer = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), len = buffer.len(), "read memdb file");
        Self::from_memdb(&buffer)
    }
}

impl Deref for View {
    type Target = BorrowedView<'static>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<BorrowedView<'_>> for View {
    fn from(view: BorrowedView<'_>) -> Self {
        Self(view.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::View;
    use crate::{DumpOptions, ErrorKind};

    const JSON: &[u8] =
        br#"{"version":3,"sources":["a.js"],"sourcesContent":["a"],"names":["x"],"mappings":"AAAAA,CAAC"}"#;

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<View>();
    }

    #[test]
    fn test_from_json_slice() {
        let view = View::from_json_slice(JSON).unwrap();
        assert_eq!(view.token_count(), 2);
        assert_eq!(view.lookup_token(0, 0).unwrap().name, Some("x"));
    }

    #[test]
    fn test_from_memdb_outlives_buffer() {
        let view = {
            let memdb = View::from_json_slice(JSON)
                .unwrap()
                .to_memdb(DumpOptions::default())
                .unwrap();
            View::from_memdb(&memdb).unwrap()
        };
        assert_eq!(view.get_source_name(0).unwrap(), "a.js");
        assert_eq!(view.get_source_contents(0).unwrap().unwrap(), "a");
    }

    #[test]
    fn test_from_memdb_path() {
        let path = std::env::temp_dir().join(format!("smview-owned-{}.memdb", std::process::id()));
        let memdb = View::from_json_slice(JSON)
            .unwrap()
            .to_memdb(DumpOptions::default())
            .unwrap();
        std::fs::write(&path, memdb).unwrap();

        let view = View::from_memdb_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(view.lookup((0, 9)).unwrap().dst_col(), 1);

        let err = View::from_memdb_path(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.code(), 8);
    }
}
