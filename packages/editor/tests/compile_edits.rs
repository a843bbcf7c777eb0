//! Compiler behaviour on realistic component files
//!
//! This tests:
//! - locality of attribute / class / text patches
//! - class merge, override and expression handling
//! - structural insert, remove, move, group and ungroup
//! - inverse diffs restoring byte-identical source

use onlook_common::{
    invert_diffs, AttributeValue, CodeDiff, CodeDiffRequest, GroupedElements, InsertedElement,
    MovedElement, NewElement, RemovedElement, TemplateNode, UngroupedElement,
};
use onlook_editor::{compile, CompileError};
use onlook_parser::{parse_for_path, LineIndex};
use std::path::Path;

const PAGE: &str = r#"export default function Page() {
    return (
        <div data-oid="p" className="a b">
            <h1 data-oid="c0">Title</h1>
            <p data-oid="c1">One</p>
            <p data-oid="c2">Two</p>
            <p data-oid="c3">Three</p>
        </div>
    );
}
"#;

fn node(path: &str, source: &str, oid: &str) -> TemplateNode {
    let doc = parse_for_path(Path::new(path), source).unwrap();
    let index = LineIndex::new(source);
    TemplateNode::from_element(oid, Path::new(path), source, &index, doc.find_by_oid(oid).unwrap())
}

fn run(path: &str, source: &str, request: &CodeDiffRequest) -> (Vec<CodeDiff>, String) {
    let diffs = compile(&node(path, source, &request.oid), source, request).unwrap();
    let result = diffs
        .iter()
        .fold(source.to_string(), |text, diff| diff.apply_to(&text).unwrap());
    (diffs, result)
}

fn undo(text: &str, diffs: &[CodeDiff]) -> String {
    invert_diffs(diffs)
        .iter()
        .fold(text.to_string(), |text, diff| diff.apply_to(&text).unwrap())
}

#[test]
fn test_class_merge_is_union_in_order() {
    let request = CodeDiffRequest::new("p").with_classes("b c", false);
    let (diffs, result) = run("/app/page.tsx", PAGE, &request);

    assert_eq!(diffs.len(), 1);
    assert!(result.contains(r#"<div data-oid="p" className="a b c">"#));
    assert_eq!(undo(&result, &diffs), PAGE);
}

#[test]
fn test_class_override_replaces_value() {
    let request = CodeDiffRequest::new("p").with_classes("c", true);
    let (_, result) = run("/app/page.tsx", PAGE, &request);
    assert!(result.contains(r#"<div data-oid="p" className="c">"#));
}

#[test]
fn test_attribute_patch_is_local() {
    let request = CodeDiffRequest::new("c1").with_attribute("id", Some("first".into()));
    let (diffs, _) = run("/app/page.tsx", PAGE, &request);

    let diff = &diffs[0];
    assert_eq!(diff.original, r#"<p data-oid="c1">"#);
    assert_eq!(diff.generated, r#"<p data-oid="c1" id="first">"#);
    assert!(!diff.original.contains("c0") && !diff.original.contains("c2"));
    assert!(diff.generated.len() <= diff.original.len() + r#" id="first""#.len());
}

#[test]
fn test_attribute_kinds_and_removal() {
    let source = r#"const Img = () => <img data-oid="i" alt="x" src="y" />;"#;
    let request = CodeDiffRequest::new("i")
        .with_attribute("alt", None)
        .with_attribute("width", Some(AttributeValue::Number(120.0)))
        .with_attribute("draggable", Some(AttributeValue::Bool(false)));
    let (_, result) = run("/img.tsx", source, &request);
    assert_eq!(
        result,
        r#"const Img = () => <img data-oid="i" src="y" draggable={false} width={120} />;"#
    );
}

#[test]
fn test_text_edit_expands_self_closing() {
    let source = "const T = () => (\n    <p data-oid=\"q\" />\n);";
    let (diffs, result) = run("/t.tsx", source, &CodeDiffRequest::new("q").with_text("Hello"));
    assert_eq!(result, "const T = () => (\n    <p data-oid=\"q\">Hello</p>\n);");
    assert_eq!(undo(&result, &diffs), source);
}

#[test]
fn test_text_edit_rejects_element_children() {
    let request = CodeDiffRequest::new("p").with_text("flat");
    let err = compile(&node("/app/page.tsx", PAGE, "p"), PAGE, &request).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedEdit(_)));
}

#[test]
fn test_expression_classes() {
    let source = "const E = ({ x }) => (\n    <div data-oid=\"t\" className={`a ${x}`}>\n        <span data-oid=\"u\" className={cn(\"a\")} />\n    </div>\n);";
    let (_, result) = run("/e.tsx", source, &CodeDiffRequest::new("t").with_classes("b", false));
    assert!(result.contains("className={`a ${x} b`}"));

    let (_, result) = run("/e.tsx", source, &CodeDiffRequest::new("u").with_classes("b", false));
    assert!(result.contains("className={`${cn(\"a\")} b`}"));
}

#[test]
fn test_markup_uses_class_attribute() {
    let source = "<body>\n  <div data-oid=\"d\" class=\"a\">x</div>\n  <p data-oid=\"e\">y</p>\n</body>\n";
    let (_, result) = run("/index.html", source, &CodeDiffRequest::new("d").with_classes("b", false));
    assert!(result.contains(r#"<div data-oid="d" class="a b">"#));

    let (_, result) = run("/index.html", source, &CodeDiffRequest::new("e").with_classes("c", false));
    assert!(result.contains(r#"<p data-oid="e" class="c">"#));
}

#[test]
fn test_group_siblings() {
    let mut request = CodeDiffRequest::new("p");
    request.structure_changes.grouped.push(GroupedElements {
        container: NewElement {
            oid: Some("g".into()),
            ..NewElement::new("div")
        },
        children: vec!["c3".into(), "c2".into()],
    });
    let (diffs, result) = run("/app/page.tsx", PAGE, &request);

    let expected = r#"            <p data-oid="c1">One</p>
            <div data-oid="g">
                <p data-oid="c2">Two</p>
                <p data-oid="c3">Three</p>
            </div>
        </div>"#;
    assert!(result.contains(expected), "{}", result);

    let doc = parse_for_path(Path::new("/app/page.tsx"), &result).unwrap();
    let parent = doc.find_by_oid("p").unwrap();
    assert_eq!(parent.child_index("g"), Some(2));
    assert_eq!(parent.element_children().count(), 3);
    assert_eq!(doc.parent_of("c2").and_then(|el| el.oid()), Some("g"));
    assert_eq!(doc.parent_of("c3").and_then(|el| el.oid()), Some("g"));

    assert_eq!(undo(&result, &diffs), PAGE);
}

#[test]
fn test_group_mints_container_oid() {
    let mut request = CodeDiffRequest::new("p");
    request.structure_changes.grouped.push(GroupedElements {
        container: NewElement::new("section"),
        children: vec!["c0".into()],
    });
    let (_, result) = run("/app/page.tsx", PAGE, &request);

    let doc = parse_for_path(Path::new("/app/page.tsx"), &result).unwrap();
    let wrapper = doc.parent_of("c0").unwrap();
    assert_eq!(wrapper.tag, "section");
    let oid = wrapper.oid().unwrap();
    assert_eq!(oid.len(), 7);
    assert_eq!(doc.count_oid(oid), 1);
}

#[test]
fn test_remove_then_undo_restores_source() {
    let mut request = CodeDiffRequest::new("p");
    request
        .structure_changes
        .removed
        .push(RemovedElement { oid: "c1".into() });
    let (diffs, result) = run("/app/page.tsx", PAGE, &request);

    assert!(!result.contains("c1"));
    assert!(result.contains("<h1 data-oid=\"c0\">Title</h1>\n            <p data-oid=\"c2\">"));
    assert_eq!(undo(&result, &diffs), PAGE);
}

#[test]
fn test_remove_root_is_unsupported() {
    let mut request = CodeDiffRequest::new("p");
    request
        .structure_changes
        .removed
        .push(RemovedElement { oid: "p".into() });
    let err = compile(&node("/app/page.tsx", PAGE, "p"), PAGE, &request).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedEdit(_)));
}

#[test]
fn test_move_to_front() {
    let mut request = CodeDiffRequest::new("p");
    request.structure_changes.moved.push(MovedElement {
        oid: "c3".into(),
        index: 0,
    });
    let (diffs, result) = run("/app/page.tsx", PAGE, &request);

    let doc = parse_for_path(Path::new("/app/page.tsx"), &result).unwrap();
    let order: Vec<_> = doc
        .find_by_oid("p")
        .unwrap()
        .element_children()
        .filter_map(|el| el.oid())
        .collect();
    assert_eq!(order, vec!["c3", "c0", "c1", "c2"]);
    assert!(result.contains("\n            <p data-oid=\"c3\">Three</p>\n            <h1"));
    assert_eq!(undo(&result, &diffs), PAGE);
}

#[test]
fn test_insert_at_index_and_into_self_closing() {
    let mut request = CodeDiffRequest::new("p");
    request.structure_changes.inserted.push(InsertedElement {
        index: 1,
        element: NewElement {
            oid: Some("n".into()),
            text_content: Some("New".into()),
            ..NewElement::new("span")
        },
    });
    let (_, result) = run("/app/page.tsx", PAGE, &request);
    assert!(result.contains(
        "<h1 data-oid=\"c0\">Title</h1>\n            <span data-oid=\"n\">New</span>\n            <p data-oid=\"c1\">"
    ));

    let source = "const Empty = () => (\n    <section data-oid=\"s\" />\n);";
    let mut request = CodeDiffRequest::new("s");
    request.structure_changes.inserted.push(InsertedElement {
        index: 0,
        element: NewElement {
            oid: Some("n".into()),
            text_content: Some("Hi".into()),
            ..NewElement::new("span")
        },
    });
    let (_, result) = run("/empty.tsx", source, &request);
    assert_eq!(
        result,
        "const Empty = () => (\n    <section data-oid=\"s\">\n        <span data-oid=\"n\">Hi</span>\n    </section>\n);"
    );
}

#[test]
fn test_ungroup_reattaches_children() {
    let source = r#"const G = () => (
    <main data-oid="m">
        <div data-oid="w">
            <a data-oid="x">x</a>
            <b data-oid="y">y</b>
        </div>
    </main>
);"#;
    let mut request = CodeDiffRequest::new("m");
    request
        .structure_changes
        .ungrouped
        .push(UngroupedElement { oid: "w".into() });
    let (diffs, result) = run("/g.tsx", source, &request);

    assert_eq!(
        result,
        r#"const G = () => (
    <main data-oid="m">
        <a data-oid="x">x</a>
        <b data-oid="y">y</b>
    </main>
);"#
    );
    assert_eq!(undo(&result, &diffs), source);
}

#[test]
fn test_duplicate_oid_is_ambiguous() {
    let source = r#"const D = () => <div data-oid="d"><i data-oid="d" /></div>;"#;
    let doc_node = TemplateNode {
        oid: "d".into(),
        ..node("/d.tsx", "const D = () => <div data-oid=\"d\" />;", "d")
    };
    let err = compile(&doc_node, source, &CodeDiffRequest::new("d").with_text("x")).unwrap_err();
    assert!(matches!(err, CompileError::AmbiguousSource { count: 2, .. }));
}
