#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub fn read_file(path: &str) -> Vec<u8> {
    fs::read(Path::new("tests").join(path)).unwrap()
}
