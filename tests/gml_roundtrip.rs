//! Property-based tests for the markup parser and preprocessor.
//!
//! Run with: cargo test gml_roundtrip

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use thane::gml::{parse, parse_config, preprocess, Attribute, Body, Node};

fn name_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z_][a-z0-9_]{0,8}").unwrap()
}

// printable ASCII without the double quote, which the writer cannot place
// inside a quoted segment
fn value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ -!#-~]{0,24}").unwrap()
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let attr = (name_strategy(), value_strategy())
        .prop_map(|(key, value)| Node::Attribute(Attribute::new(key, value)));
    attr.prop_recursive(3, 24, 4, |inner| {
        (name_strategy(), proptest::collection::vec(inner, 0..4))
            .prop_map(|(name, children)| Node::Body(Body { name, children }))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Printing a tree and reparsing it yields the same tree.
    #[test]
    fn prop_print_parse_roundtrip(children in proptest::collection::vec(node_strategy(), 0..6)) {
        let body = Body { name: "root".to_string(), children };
        let printed = body.to_string();
        let reparsed = parse(&printed).unwrap();
        prop_assert_eq!(reparsed, body);
    }

    /// Parsing is a pure function: same input, same output.
    #[test]
    fn prop_parse_is_deterministic(children in proptest::collection::vec(node_strategy(), 0..4)) {
        let body = Body { name: "root".to_string(), children };
        let printed = body.to_string();
        prop_assert_eq!(parse_config(&printed).unwrap(), parse_config(&printed).unwrap());
    }

    /// The preprocessor never changes the number of lines of accepted input.
    #[test]
    fn prop_preprocess_preserves_line_count(
        lines in proptest::collection::vec("[a-z=#{} ]{0,12}", 0..12)
    ) {
        let input = lines.join("\n");
        if let Ok(output) = preprocess(&input) {
            prop_assert_eq!(output.lines().count(), input.lines().count());
        }
    }

    /// Text without directives or braces passes through untouched.
    #[test]
    fn prop_preprocess_is_identity_on_plain_text(
        lines in proptest::collection::vec("[a-z0-9_=, ]{0,16}", 0..10)
    ) {
        let input = lines.join("\n");
        prop_assert_eq!(preprocess(&input).unwrap(), input);
    }

    /// Balanced define regions and braces are always accepted.
    #[test]
    fn prop_balanced_input_is_accepted(
        body in "[a-z =]{0,12}",
        depth in 1usize..4
    ) {
        let opens = "{".repeat(depth);
        let closes = "}".repeat(depth);
        let input = format!("#define X\n{body}\n#enddef\n{opens}{body}{closes}\n");
        prop_assert!(preprocess(&input).is_ok());
    }
}

#[test]
fn test_preprocess_then_parse_pipeline() {
    let input = concat!(
        "#define UNIT SIDE\n",
        "[unit]\n",
        "side={SIDE}\n",
        "[/unit]\n",
        "#enddef\n",
        "# the prologue scenario\n",
        "[scenario]\n",
        "id=prologue\n",
        "turns=20\n",
        "[/scenario]\n",
    );
    let stripped = preprocess(input).unwrap();
    let body = parse(&stripped).unwrap();
    assert_eq!(body.name, "scenario");
    assert_eq!(body.children.len(), 2);
}
