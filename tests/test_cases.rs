use paste::paste;
use serde::Deserialize;
use smview::{BorrowedView, Result, ViewOrIndex};
use std::collections::HashMap;
use std::fs;
use std::sync::OnceLock;

static TEST_CASES: OnceLock<HashMap<String, TestCase>> = OnceLock::new();

// since Rust doesn't support add tests dynamically...
macro_rules! test {
    ($name:ident) => {
        paste! {
            #[test]
            fn [<test_case_ $name>]() {
                get_test_case(stringify!($name)).test();
            }
        }
    };
}

test!(basic_mapping);
test!(mapping_with_name);
test!(empty_groups);
test!(unmapped_segments);
test!(trailing_comma);
test!(source_root);
test!(null_source);
test!(unrecognized_property);
test!(index_map);
test!(version_missing);
test!(version_too_high);
test!(sources_content_length_mismatch);
test!(invalid_vlq_non_base64);
test!(invalid_vlq_missing_continuation);
test!(segment_with_two_fields);
test!(source_index_out_of_bounds);
test!(name_index_out_of_bounds);
test!(negative_column);
test!(index_map_invalid_order);
test!(index_map_missing_offset);
test!(index_map_unresolved_section);
test!(index_map_nested);

fn get_test_case(name: &str) -> &'static TestCase {
    let tests = TEST_CASES.get_or_init(|| {
        let description = fs::read("tests/data/cases.json").unwrap();
        let description = serde_json::from_slice::<TestDescription>(&description).unwrap();
        description
            .cases
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect::<HashMap<_, _>>()
    });
    tests.get(name).unwrap()
}

#[derive(Deserialize)]
struct TestDescription {
    cases: Vec<TestCase>,
}

/// A lookup and the token it should resolve to; no `source` means a miss.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestAction {
    line: u32,
    column: u32,
    source: Option<String>,
    #[serde(default)]
    src_line: u32,
    #[serde(default)]
    src_column: u32,
    name: Option<String>,
}

#[derive(Deserialize)]
struct TestCase {
    name: String,
    description: String,
    map: serde_json::Value,
    valid: bool,
    #[serde(default)]
    actions: Vec<TestAction>,
}

impl TestCase {
    fn parse<'a>(&self, buf: &'a mut [u8]) -> Result<BorrowedView<'a>> {
        ViewOrIndex::from_slice(buf)?.into_view()
    }

    fn test(&self) {
        let msg = format!("[{}] {}", self.name, self.description);

        let mut buf = serde_json::to_vec(&self.map).unwrap();
        let parse_result = self.parse(&mut buf);

        if !self.valid {
            assert!(parse_result.is_err(), "{}", msg);
            return;
        }

        let view = parse_result.expect(&msg);
        assert!(
            view.tokens().windows(2).all(|w| w[0].dst() < w[1].dst()),
            "{}",
            msg
        );

        for action in &self.actions {
            let found = view.lookup_token(action.line, action.column);
            let at = format!("{} at {}:{}", msg, action.line, action.column);
            match &action.source {
                None => assert!(found.is_none(), "{}", at),
                Some(source) => {
                    let found = found.expect(&at);
                    assert_eq!(found.source, Some(source.as_str()), "{}", at);
                    assert_eq!(found.token.src_line(), action.src_line, "{}", at);
                    assert_eq!(found.token.src_col(), action.src_column, "{}", at);
                    assert_eq!(found.name, action.name.as_deref(), "{}", at);
                }
            }
        }
    }
}
