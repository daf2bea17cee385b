use memchr::Memchr;

/// Splits a string on a single ASCII separator, yielding empty pieces too.
#[derive(Debug)]
pub(crate) struct Splitter<'a> {
    string: &'a str,
    cur_start: usize,
    memchr: Memchr<'a>,
}

impl<'a> Splitter<'a> {
    pub fn new(string: &'a str, sep: u8) -> Self {
        debug_assert!(sep.is_ascii());
        Self {
            string,
            memchr: memchr::memchr_iter(sep, string.as_bytes()),
            cur_start: 0,
        }
    }
}

impl<'a> Iterator for Splitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let cur_end = match self.memchr.next() {
            None => {
                if self.cur_start > self.string.len() {
                    return None;
                }
                self.string.len()
            }
            Some(end) => end,
        };
        // an ASCII separator always sits on a char boundary
        let s = &self.string[self.cur_start..cur_end];
        self.cur_start = cur_end + 1;
        Some(s)
    }
}
