//! Source text generation and layout helpers for the compiler

use onlook_common::{AttributeValue, NewElement};
use onlook_parser::{is_void_element, OidGenerator, SourceKind, OID_ATTRIBUTE};
use std::collections::HashSet;

pub const DEFAULT_INDENT: &str = "    ";

/// Mints oids for generated elements, avoiding every oid already in the file
pub struct OidMinter {
    generator: OidGenerator,
    taken: HashSet<String>,
}

impl OidMinter {
    pub fn new(path: &str, taken: impl IntoIterator<Item = String>) -> Self {
        Self {
            generator: OidGenerator::new(path),
            taken: taken.into_iter().collect(),
        }
    }

    pub fn mint(&mut self) -> String {
        let oid = self.generator.next_free(&self.taken);
        self.taken.insert(oid.clone());
        oid
    }
}

pub fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

pub fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map(|idx| pos + idx).unwrap_or(text.len())
}

/// Leading whitespace of the line containing `pos`
pub fn indent_at(text: &str, pos: usize) -> &str {
    let start = line_start(text, pos);
    let line = &text[start..line_end(text, start)];
    &line[..line.len() - line.trim_start().len()]
}

/// Only whitespace between the line start and `pos`
pub fn starts_line(text: &str, pos: usize) -> bool {
    text[line_start(text, pos)..pos].trim().is_empty()
}

pub fn ends_line(text: &str, pos: usize) -> bool {
    text[pos..line_end(text, pos)].trim().is_empty()
}

/// Indentation step used by the file: a tab, or the smallest run of leading
/// spaces (2 to 8) found on any line
pub fn detect_indent_unit(text: &str) -> String {
    let mut smallest: Option<usize> = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if (2..=8).contains(&spaces) {
            smallest = Some(smallest.map_or(spaces, |s| s.min(spaces)));
        }
    }
    smallest
        .map(|n| " ".repeat(n))
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

/// Moves a block written at indentation `from` to indentation `to`. The
/// first line is left alone: it is placed by the caller.
pub fn reindent(block: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(block.len());
    for (idx, line) in block.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
            if line.trim().is_empty() {
                continue;
            }
            match line.strip_prefix(from) {
                Some(rest) => {
                    out.push_str(to);
                    out.push_str(rest);
                }
                None => out.push_str(line),
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Inner content of a container, re-indented to `indent` and trimmed of the
/// blank lines around it
pub fn dedent_inner(inner: &str, indent: &str) -> String {
    if !inner.contains('\n') {
        return inner.trim().to_string();
    }
    let lines: Vec<&str> = inner.split('\n').collect();
    let first = lines.iter().position(|line| !line.trim().is_empty());
    let last = lines.iter().rposition(|line| !line.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let body = &lines[first..=last];
    let common = body
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    body.iter()
        .enumerate()
        .map(|(idx, line)| {
            if line.trim().is_empty() {
                String::new()
            } else if idx == 0 {
                line[common..].to_string()
            } else {
                format!("{}{}", indent, &line[common..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `name="value"` (or the expression form JSX needs); `None` when the
/// attribute should be absent
pub fn render_attribute(name: &str, value: &AttributeValue, kind: SourceKind) -> Option<String> {
    let rendered = match (value, kind) {
        (AttributeValue::Text(text), SourceKind::Markup) => {
            format!("{}=\"{}\"", name, text.replace('&', "&amp;").replace('"', "&quot;"))
        }
        (AttributeValue::Text(text), SourceKind::Jsx) if text.contains('"') => {
            format!("{}={{{}}}", name, js_string(text))
        }
        (AttributeValue::Text(text), SourceKind::Jsx) => format!("{}=\"{}\"", name, text),
        (AttributeValue::Number(n), SourceKind::Markup) => format!("{}=\"{}\"", name, format_number(*n)),
        (AttributeValue::Number(n), SourceKind::Jsx) => format!("{}={{{}}}", name, format_number(*n)),
        (AttributeValue::Bool(true), SourceKind::Markup) => name.to_string(),
        (AttributeValue::Bool(false), SourceKind::Markup) => return None,
        (AttributeValue::Bool(flag), SourceKind::Jsx) => format!("{}={{{}}}", name, flag),
    };
    Some(rendered)
}

pub fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.replace('"', "\\\"")))
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Element text content; line breaks become `<br />`
pub fn escape_text(text: &str, kind: SourceKind) -> String {
    let lines = text.split('\n').map(|line| match kind {
        SourceKind::Markup => line
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
        SourceKind::Jsx if line.contains(['{', '}', '<', '>']) => format!("{{{}}}", js_string(line)),
        SourceKind::Jsx => line.to_string(),
    });
    let separator = match kind {
        SourceKind::Markup => "<br>",
        SourceKind::Jsx => "<br />",
    };
    lines.collect::<Vec<_>>().join(separator)
}

/// Opening tag with the self-closing `/>` turned into `>`
pub fn open_tag_expanded(open_tag: &str) -> String {
    match open_tag.strip_suffix("/>") {
        Some(rest) => format!("{}>", rest.trim_end()),
        None => open_tag.to_string(),
    }
}

fn render_open(element: &NewElement, oid: &str, kind: SourceKind) -> String {
    let mut open = format!("<{} {}=\"{}\"", element.tag_name, OID_ATTRIBUTE, oid);
    for (name, value) in &element.attributes {
        if name == OID_ATTRIBUTE {
            continue;
        }
        if let Some(attr) = render_attribute(name, value, kind) {
            open.push(' ');
            open.push_str(&attr);
        }
    }
    open
}

/// Source for a new element whose first line sits at `indent`
pub fn render_element(
    element: &NewElement,
    indent: &str,
    unit: &str,
    kind: SourceKind,
    minter: &mut OidMinter,
) -> String {
    if let Some(code) = &element.code_block {
        let trimmed = code.trim();
        let from = trimmed
            .split('\n')
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| &line[..line.len() - line.trim_start().len()])
            .min_by_key(|prefix| prefix.len())
            .unwrap_or("");
        return reindent(trimmed, from, indent);
    }

    let oid = element.oid.clone().unwrap_or_else(|| minter.mint());
    let open = render_open(element, &oid, kind);
    let tag = &element.tag_name;
    let text = element
        .text_content
        .as_deref()
        .filter(|text| !text.is_empty());

    if element.children.is_empty() {
        return match (text, kind) {
            (Some(text), _) => format!("{}>{}</{}>", open, escape_text(text, kind), tag),
            (None, SourceKind::Markup) if is_void_element(tag) => format!("{}>", open),
            (None, SourceKind::Markup) => format!("{}></{}>", open, tag),
            (None, SourceKind::Jsx) => format!("{} />", open),
        };
    }

    let inner = format!("{}{}", indent, unit);
    let mut out = format!("{}>", open);
    if let Some(text) = text {
        out.push('\n');
        out.push_str(&inner);
        out.push_str(&escape_text(text, kind));
    }
    for child in &element.children {
        out.push('\n');
        out.push_str(&inner);
        out.push_str(&render_element(child, &inner, unit, kind, minter));
    }
    out.push('\n');
    out.push_str(indent);
    out.push_str(&format!("</{}>", tag));
    out
}

/// Wrapper element around already-written children. Each child is given with
/// the indentation it was captured at.
pub fn render_wrapper(
    container: &NewElement,
    children: &[(String, String)],
    indent: &str,
    unit: &str,
    kind: SourceKind,
    minter: &mut OidMinter,
) -> String {
    let oid = container.oid.clone().unwrap_or_else(|| minter.mint());
    let inner = format!("{}{}", indent, unit);
    let mut out = format!("{}>", render_open(container, &oid, kind));
    for (source, from) in children {
        out.push('\n');
        out.push_str(&inner);
        out.push_str(&reindent(source, from, &inner));
    }
    out.push('\n');
    out.push_str(indent);
    out.push_str(&format!("</{}>", container.tag_name));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_indent_detection() {
        assert_eq!(detect_indent_unit("a\n  b\n    c"), "  ");
        assert_eq!(detect_indent_unit("a\n\tb"), "\t");
        assert_eq!(detect_indent_unit("one line"), DEFAULT_INDENT);
    }

    #[test]
    fn test_line_helpers() {
        let text = "<a>\n    <b />\n</a>";
        let b = text.find("<b").unwrap();
        assert!(starts_line(text, b));
        assert!(ends_line(text, b + "<b />".len()));
        assert_eq!(indent_at(text, b), "    ");
        assert!(!starts_line(text, 1));
    }

    #[test]
    fn test_reindent_and_dedent() {
        let block = "<ul>\n    <li />\n</ul>";
        assert_eq!(reindent(block, "", "  "), "<ul>\n      <li />\n  </ul>");

        let inner = "\n        <p>a</p>\n        <p>b</p>\n    ";
        assert_eq!(dedent_inner(inner, "    "), "<p>a</p>\n    <p>b</p>");
        assert_eq!(dedent_inner(" hi ", "    "), "hi");
    }

    #[test]
    fn test_render_attribute_forms() {
        let jsx = SourceKind::Jsx;
        assert_eq!(render_attribute("id", &"main".into(), jsx).unwrap(), r#"id="main""#);
        assert_eq!(
            render_attribute("title", &"say \"hi\"".into(), jsx).unwrap(),
            r#"title={"say \"hi\""}"#
        );
        assert_eq!(
            render_attribute("tabIndex", &AttributeValue::Number(2.0), jsx).unwrap(),
            "tabIndex={2}"
        );
        assert_eq!(
            render_attribute("hidden", &AttributeValue::Bool(true), jsx).unwrap(),
            "hidden={true}"
        );
        assert_eq!(
            render_attribute("hidden", &AttributeValue::Bool(true), SourceKind::Markup).unwrap(),
            "hidden"
        );
        assert_eq!(render_attribute("hidden", &AttributeValue::Bool(false), SourceKind::Markup), None);
    }

    #[test]
    fn test_render_nested_element() {
        let mut minter = OidMinter::new("/a.tsx", Vec::new());
        let mut attributes = BTreeMap::new();
        attributes.insert("className".to_string(), AttributeValue::from("p-2"));
        let element = NewElement {
            tag_name: "div".into(),
            attributes,
            oid: Some("w".into()),
            children: vec![NewElement {
                tag_name: "span".into(),
                oid: Some("s".into()),
                text_content: Some("a {b}".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let out = render_element(&element, "  ", "  ", SourceKind::Jsx, &mut minter);
        assert_eq!(
            out,
            "<div data-oid=\"w\" className=\"p-2\">\n    <span data-oid=\"s\">{\"a {b}\"}</span>\n  </div>"
        );
    }

    #[test]
    fn test_minted_oids_avoid_taken() {
        let mut probe = OidMinter::new("/a.tsx", Vec::new());
        let first = probe.mint();
        let mut minter = OidMinter::new("/a.tsx", vec![first.clone()]);
        let oid = minter.mint();
        assert_ne!(oid, first);
        assert_ne!(minter.mint(), oid);
    }
}
