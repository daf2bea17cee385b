#![allow(dead_code)]

use std::fs::File;
use std::io::Read;

pub fn read_file(path: &str) -> Vec<u8> {
    let mut file = File::open(path).unwrap();
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    buf
}

/// Repeats the generated lines of a small map so lookups have something to search.
pub fn large_view() -> smview::View {
    let mut mappings = String::new();
    for line in 0..5000u32 {
        if line > 0 {
            mappings.push(';');
        }
        // one segment per 8 columns, 40 per line, each one source line further down
        mappings.push_str(if line == 0 { "AAAA" } else { "AACA" });
        for _ in 1..40 {
            mappings.push_str(",QAAC");
        }
    }
    let json = format!(
        r#"{{"version":3,"sources":["a.js"],"names":[],"mappings":"{mappings}"}}"#
    );
    smview::View::from_json(json.into_bytes()).unwrap()
}
