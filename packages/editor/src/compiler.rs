//! # Code Diff Compiler
//!
//! Turns [`CodeDiffRequest`]s into minimal [`CodeDiff`] text patches.
//!
//! ## Regions
//!
//! Every patch replaces the smallest region that holds the change:
//!
//! - attribute and class edits: the element's opening tag
//! - text edits: the element's full span
//! - structural edits: the full span of the smallest element containing
//!   every parent they touch
//!
//! Each region contains an oid attribute, so its `original` text occurs once
//! in the file and a patch applied against changed text is rejected instead
//! of landing somewhere else.
//!
//! ## Structural ordering
//!
//! Removals (including the removal half of a move) run against the pre-edit
//! tree. The text is then re-scanned and inserts, move targets, groups and
//! ungroups run in order, each against the tree the previous step produced.
//! Child indices count element children only.

use crate::classes::{merge_classes, tokenize};
use crate::codegen::{
    dedent_inner, detect_indent_unit, ends_line, escape_text, indent_at, line_end, line_start,
    open_tag_expanded, reindent, render_attribute, render_element, render_wrapper, starts_line,
    OidMinter,
};
use crate::errors::{CompileError, CompileResult};
use onlook_common::{is_class_attribute, CodeDiff, CodeDiffRequest, Edit, NewElement, TemplateNode};
use onlook_parser::{parse_for_path, AttrValue, Document, Element, SourceKind, Span};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Compiles one request against the current text of the node's file
pub fn compile(
    node: &TemplateNode,
    source: &str,
    request: &CodeDiffRequest,
) -> CompileResult<Vec<CodeDiff>> {
    Ok(FileCompiler::new(&node.path, source).compile(request)?.0)
}

/// Compiles a batch of requests, keeping a working copy of each file so later
/// requests see the text earlier ones produce.
#[derive(Debug, Clone, Default)]
pub struct DiffCompiler {
    sources: HashMap<PathBuf, String>,
    diffs: Vec<CodeDiff>,
}

impl DiffCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.sources.insert(path.into(), text.into());
    }

    pub fn has_source(&self, path: &Path) -> bool {
        self.sources.contains_key(path)
    }

    /// Working text of `path` after every request compiled so far
    pub fn source(&self, path: &Path) -> Option<&str> {
        self.sources.get(path).map(String::as_str)
    }

    pub fn compile(
        &mut self,
        node: &TemplateNode,
        request: &CodeDiffRequest,
    ) -> CompileResult<Vec<CodeDiff>> {
        let source = self
            .sources
            .get(&node.path)
            .ok_or_else(|| CompileError::NotFound(node.path.display().to_string()))?;
        let (diffs, text) = FileCompiler::new(&node.path, source).compile(request)?;
        tracing::debug!(oid = %request.oid, path = ?node.path, diffs = diffs.len(), "compiled request");
        self.sources.insert(node.path.clone(), text);
        self.diffs.extend(diffs.iter().cloned());
        Ok(diffs)
    }

    pub fn diffs(&self) -> &[CodeDiff] {
        &self.diffs
    }

    pub fn finish(self) -> Vec<CodeDiff> {
        self.diffs
    }
}

/// Already-written source being relocated
struct Captured {
    text: String,
    indent: String,
}

enum Block<'a> {
    New(&'a NewElement),
    Moved(Captured),
    Wrapper(&'a NewElement, Vec<Captured>),
}

struct FileCompiler<'a> {
    path: &'a Path,
    kind: SourceKind,
    source: &'a str,
    unit: String,
}

impl<'a> FileCompiler<'a> {
    fn new(path: &'a Path, source: &'a str) -> Self {
        Self {
            path,
            kind: SourceKind::from_path(path).unwrap_or(SourceKind::Jsx),
            source,
            unit: detect_indent_unit(source),
        }
    }

    fn compile(&self, request: &CodeDiffRequest) -> CompileResult<(Vec<CodeDiff>, String)> {
        let doc = self.parse(self.source)?;
        match doc.count_oid(&request.oid) {
            0 => {
                return Err(CompileError::StaleSource {
                    oid: request.oid.clone(),
                    path: self.path.to_path_buf(),
                })
            }
            1 => {}
            count => {
                return Err(CompileError::AmbiguousSource {
                    oid: request.oid.clone(),
                    path: self.path.to_path_buf(),
                    count,
                })
            }
        }

        let edits = request.edits();
        let mut text = self.source.to_string();
        let mut diffs = Vec::new();

        let tag_edits: Vec<&Edit> = edits
            .iter()
            .filter(|edit| matches!(edit, Edit::AttributeSet { .. } | Edit::ClassMerge { .. }))
            .collect();
        if !tag_edits.is_empty() {
            let (diff, next) = self.compile_tag_edits(&text, &request.oid, &tag_edits)?;
            push_diff(&mut diffs, diff);
            text = next;
        }

        for edit in &edits {
            if let Edit::TextSet { text: content } = edit {
                let (diff, next) = self.compile_text(&text, &request.oid, content)?;
                push_diff(&mut diffs, diff);
                text = next;
            }
        }

        let structural: Vec<&Edit> = edits.iter().filter(|edit| edit.is_structural()).collect();
        if !structural.is_empty() {
            let (diff, next) = self.compile_structure(&text, &request.oid, &structural)?;
            push_diff(&mut diffs, diff);
            text = next;
        }

        Ok((diffs, text))
    }

    fn parse(&self, text: &str) -> CompileResult<Document> {
        parse_for_path(self.path, text).map_err(|source| CompileError::Parse {
            path: self.path.to_path_buf(),
            source,
        })
    }

    fn locate<'d>(&self, doc: &'d Document, oid: &str) -> CompileResult<&'d Element> {
        match doc.count_oid(oid) {
            0 => Err(CompileError::NotFound(oid.to_string())),
            1 => doc
                .find_by_oid(oid)
                .ok_or_else(|| CompileError::NotFound(oid.to_string())),
            count => Err(CompileError::AmbiguousSource {
                oid: oid.to_string(),
                path: self.path.to_path_buf(),
                count,
            }),
        }
    }

    fn diff(&self, original: &str, generated: &str) -> CodeDiff {
        CodeDiff::new(self.path, original, generated)
    }

    // ---- opening tag ----

    fn compile_tag_edits(
        &self,
        text: &str,
        oid: &str,
        edits: &[&Edit],
    ) -> CompileResult<(CodeDiff, String)> {
        let doc = self.parse(text)?;
        let element = self.locate(&doc, oid)?;
        if element.is_fragment() {
            return Err(CompileError::unsupported("fragments cannot carry attributes"));
        }

        let open = element.open_tag;
        let insert_at = element
            .attributes
            .last()
            .map(|attr| attr.span.end)
            .unwrap_or_else(|| tag_name_end(text, element));

        // (span, replacement) pairs, all inside the opening tag
        let mut patches: Vec<(Span, String)> = Vec::new();
        for edit in edits {
            match edit {
                Edit::AttributeSet { name, value } => {
                    let existing = element.attribute(name);
                    let rendered = value
                        .as_ref()
                        .and_then(|value| render_attribute(name, value, self.kind));
                    match (existing, rendered) {
                        (Some(attr), Some(rendered)) => patches.push((attr.span, rendered)),
                        (Some(attr), None) => {
                            patches.push((removal_span(text, attr.span, open), String::new()))
                        }
                        (None, Some(rendered)) => {
                            patches.push((Span::new(insert_at, insert_at), format!(" {}", rendered)))
                        }
                        (None, None) => {}
                    }
                }
                Edit::ClassMerge {
                    classes,
                    override_classes,
                } => {
                    let existing = element
                        .attributes
                        .iter()
                        .find(|attr| is_class_attribute(&attr.name));
                    let name = existing.map(|attr| attr.name.as_str()).unwrap_or(match self.kind {
                        SourceKind::Markup => "class",
                        SourceKind::Jsx => "className",
                    });
                    let rendered = self.render_classes(
                        name,
                        existing.map(|attr| &attr.value),
                        classes,
                        *override_classes,
                    );
                    match existing {
                        Some(attr) => patches.push((attr.span, rendered)),
                        None => {
                            patches.push((Span::new(insert_at, insert_at), format!(" {}", rendered)))
                        }
                    }
                }
                _ => {}
            }
        }

        let next = apply_patches(text, patches);
        let grown = next.len() as isize - text.len() as isize;
        let new_end = (open.end as isize + grown) as usize;
        let diff = self.diff(open.slice(text), &next[open.start..new_end]);
        Ok((diff, next))
    }

    fn render_classes(
        &self,
        name: &str,
        existing: Option<&AttrValue>,
        classes: &str,
        override_classes: bool,
    ) -> String {
        let literal = |value: &str, quote: Option<char>| {
            let quote = quote.unwrap_or('"');
            format!("{}={}{}{}", name, quote, value, quote)
        };
        let fresh = merge_classes("", classes);
        match existing {
            None | Some(AttrValue::Bare) | Some(AttrValue::Spread { .. }) => literal(&fresh, None),
            Some(_) if override_classes => match existing {
                Some(AttrValue::Str { quote, .. }) => literal(&fresh, *quote),
                _ => literal(&fresh, None),
            },
            Some(AttrValue::Str { value, quote }) => literal(&merge_classes(value, classes), *quote),
            Some(AttrValue::Expr { source, .. }) => {
                let expr = source.trim();
                if let Some(inner) = string_literal(expr) {
                    return literal(&merge_classes(inner, classes), None);
                }
                if let Some(inner) = expr.strip_prefix('`').and_then(|e| e.strip_suffix('`')) {
                    let present = tokenize(inner);
                    let added: Vec<&str> = tokenize(&fresh)
                        .into_iter()
                        .filter(|class| !present.contains(class))
                        .collect();
                    if added.is_empty() {
                        return format!("{}={{{}}}", name, expr);
                    }
                    let separator = if inner.ends_with(char::is_whitespace) || inner.is_empty() {
                        ""
                    } else {
                        " "
                    };
                    return format!("{}={{`{}{}{}`}}", name, inner, separator, added.join(" "));
                }
                format!("{}={{`${{{}}} {}`}}", name, expr, fresh)
            }
        }
    }

    // ---- text ----

    fn compile_text(
        &self,
        text: &str,
        oid: &str,
        content: &str,
    ) -> CompileResult<(CodeDiff, String)> {
        let doc = self.parse(text)?;
        let element = self.locate(&doc, oid)?;
        if element.element_children().next().is_some() {
            return Err(CompileError::unsupported(format!(
                "text edit on {} would drop its child elements",
                oid
            )));
        }
        if self.kind == SourceKind::Markup && onlook_parser::is_void_element(&element.tag) {
            return Err(CompileError::unsupported(format!("<{}> cannot hold text", element.tag)));
        }

        let span = element.span();
        let replacement = format!(
            "{}{}</{}>",
            open_tag_expanded(element.open_tag.slice(text)),
            escape_text(content, self.kind),
            element.tag
        );
        let next = splice(text, span, &replacement);
        Ok((self.diff(span.slice(text), &replacement), next))
    }

    // ---- structure ----

    fn compile_structure(
        &self,
        text: &str,
        parent_oid: &str,
        edits: &[&Edit],
    ) -> CompileResult<(CodeDiff, String)> {
        let doc = self.parse(text)?;
        let parent = self.locate(&doc, parent_oid)?;
        let mut minter = OidMinter::new(
            &self.path.to_string_lossy(),
            doc.oids().into_iter().map(String::from),
        );

        let mut touched: Vec<Span> = Vec::new();
        let mut removals: Vec<Span> = Vec::new();
        let mut moved: HashMap<&str, Captured> = HashMap::new();

        for edit in edits {
            match edit {
                Edit::StructuralRemove { oid } => {
                    let element = self.locate(&doc, oid)?;
                    let owner = doc.parent_of(oid).ok_or_else(|| {
                        CompileError::unsupported(format!("{} has no parent to remove it from", oid))
                    })?;
                    touched.push(owner.span());
                    removals.push(element.span());
                }
                Edit::StructuralMove { oid, .. } => {
                    let element = self.locate(&doc, oid)?;
                    let owner = doc.parent_of(oid).ok_or_else(|| {
                        CompileError::unsupported(format!("{} has no parent to move it from", oid))
                    })?;
                    touched.push(owner.span());
                    touched.push(parent.span());
                    removals.push(element.span());
                    moved.insert(
                        oid.as_str(),
                        Captured {
                            text: element.span().slice(text).to_string(),
                            indent: indent_at(text, element.span().start).to_string(),
                        },
                    );
                }
                Edit::StructuralUngroup { oid } => {
                    self.locate(&doc, oid)?;
                    let owner = doc.parent_of(oid).ok_or_else(|| {
                        CompileError::unsupported(format!("{} has no parent to ungroup into", oid))
                    })?;
                    touched.push(owner.span());
                }
                Edit::StructuralGroup { children, .. } => {
                    if children.is_empty() {
                        return Err(CompileError::unsupported("group needs at least one child"));
                    }
                    for child in children {
                        if parent.child_index(child).is_none() {
                            return Err(CompileError::unsupported(format!(
                                "{} is not a child of {}",
                                child, parent_oid
                            )));
                        }
                    }
                    touched.push(parent.span());
                }
                Edit::StructuralInsert { .. } => touched.push(parent.span()),
                _ => {}
            }
        }

        let region = enclosing_region(&doc, &touched);

        // Phase 1: removals against the pre-edit tree
        let mut current = remove_spans(text, &removals);

        // Phase 2: placements against the tree phase 1 produced
        for edit in edits {
            current = match edit {
                Edit::StructuralMove { oid, index } => {
                    let captured = moved
                        .remove(oid.as_str())
                        .ok_or_else(|| CompileError::NotFound(oid.clone()))?;
                    self.insert_child(&current, parent_oid, *index, Block::Moved(captured), &mut minter)?
                }
                Edit::StructuralInsert { index, element } => {
                    self.insert_child(&current, parent_oid, *index, Block::New(element), &mut minter)?
                }
                Edit::StructuralGroup {
                    container,
                    children,
                } => self.group(&current, parent_oid, container, children, &mut minter)?,
                Edit::StructuralUngroup { oid } => self.ungroup(&current, oid)?,
                _ => current,
            };
        }

        let suffix_len = text.len() - region.end;
        let unchanged = current.len() >= region.start + suffix_len
            && current[..region.start] == text[..region.start]
            && current[current.len() - suffix_len..] == text[region.end..];
        if !unchanged {
            return Err(CompileError::unsupported(
                "structural edit reaches outside the elements it targets",
            ));
        }
        let generated = &current[region.start..current.len() - suffix_len];
        Ok((self.diff(region.slice(text), generated), current))
    }

    fn insert_child(
        &self,
        text: &str,
        parent_oid: &str,
        index: usize,
        block: Block<'_>,
        minter: &mut OidMinter,
    ) -> CompileResult<String> {
        let doc = self.parse(text)?;
        let parent = self.locate(&doc, parent_oid)?;
        if self.kind == SourceKind::Markup && onlook_parser::is_void_element(&parent.tag) {
            return Err(CompileError::unsupported(format!(
                "<{}> cannot hold children",
                parent.tag
            )));
        }

        let parent_indent = indent_at(text, parent.open_tag.start);
        let children: Vec<&Element> = parent.element_children().collect();
        let child_indent = children
            .iter()
            .map(|child| child.span().start)
            .find(|start| starts_line(text, *start))
            .map(|start| indent_at(text, start).to_string())
            .unwrap_or_else(|| format!("{}{}", parent_indent, self.unit));

        let content = match block {
            Block::New(element) => render_element(element, &child_indent, &self.unit, self.kind, minter),
            Block::Moved(captured) => reindent(&captured.text, &captured.indent, &child_indent),
            Block::Wrapper(container, captured) => {
                let children: Vec<(String, String)> = captured
                    .into_iter()
                    .map(|c| (c.text, c.indent))
                    .collect();
                render_wrapper(container, &children, &child_indent, &self.unit, self.kind, minter)
            }
        };

        let Some(close) = parent.close_tag else {
            let open = parent.open_tag;
            let replacement = format!(
                "{}\n{}{}\n{}</{}>",
                open_tag_expanded(open.slice(text)),
                child_indent,
                content,
                parent_indent,
                parent.tag
            );
            return Ok(splice(text, open, &replacement));
        };

        let next = if index < children.len() {
            let anchor = children[index].span().start;
            if starts_line(text, anchor) {
                insert(text, anchor, &format!("{}\n{}", content, child_indent))
            } else {
                insert(text, anchor, &content)
            }
        } else if let Some(last) = children.last() {
            let span = last.span();
            if starts_line(text, span.start) {
                insert(text, span.end, &format!("\n{}{}", child_indent, content))
            } else {
                insert(text, span.end, &content)
            }
        } else {
            let inner = Span::new(parent.open_tag.end, close.start);
            if inner.slice(text).trim().is_empty() {
                splice(
                    text,
                    inner,
                    &format!("\n{}{}\n{}", child_indent, content, parent_indent),
                )
            } else if starts_line(text, close.start) {
                insert(
                    text,
                    line_start(text, close.start),
                    &format!("{}{}\n", child_indent, content),
                )
            } else {
                insert(text, close.start, &content)
            }
        };
        Ok(next)
    }

    fn group(
        &self,
        text: &str,
        parent_oid: &str,
        container: &NewElement,
        child_oids: &[String],
        minter: &mut OidMinter,
    ) -> CompileResult<String> {
        let doc = self.parse(text)?;
        let parent = self.locate(&doc, parent_oid)?;

        let mut members: Vec<(usize, &Element)> = Vec::new();
        for oid in child_oids {
            let index = parent.child_index(oid).ok_or_else(|| {
                CompileError::unsupported(format!("{} is not a child of {}", oid, parent_oid))
            })?;
            let element = self.locate(&doc, oid)?;
            members.push((index, element));
        }
        members.sort_by_key(|(index, _)| *index);
        let first_index = members.first().map(|(index, _)| *index).unwrap_or(0);

        let captured: Vec<Captured> = members
            .iter()
            .map(|(_, element)| Captured {
                text: element.span().slice(text).to_string(),
                indent: indent_at(text, element.span().start).to_string(),
            })
            .collect();
        let spans: Vec<Span> = members.iter().map(|(_, element)| element.span()).collect();
        let removed = remove_spans(text, &spans);

        self.insert_child(
            &removed,
            parent_oid,
            first_index,
            Block::Wrapper(container, captured),
            minter,
        )
    }

    fn ungroup(&self, text: &str, oid: &str) -> CompileResult<String> {
        let doc = self.parse(text)?;
        let container = self.locate(&doc, oid)?;
        if doc.parent_of(oid).is_none() {
            return Err(CompileError::unsupported(format!(
                "{} has no parent to ungroup into",
                oid
            )));
        }

        let span = container.span();
        let content = container
            .inner_span()
            .map(|inner| dedent_inner(inner.slice(text), indent_at(text, span.start)))
            .unwrap_or_default();
        if content.is_empty() {
            return Ok(remove_spans(text, &[span]));
        }
        Ok(splice(text, span, &content))
    }
}

fn push_diff(diffs: &mut Vec<CodeDiff>, diff: CodeDiff) {
    if !diff.is_noop() {
        diffs.push(diff);
    }
}

fn splice(text: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement);
    out.push_str(&text[span.end..]);
    out
}

fn insert(text: &str, at: usize, content: &str) -> String {
    splice(text, Span::new(at, at), content)
}

/// Applies non-overlapping patches; patches at the same point keep their order
fn apply_patches(text: &str, patches: Vec<(Span, String)>) -> String {
    let mut ordered: Vec<(usize, (Span, String))> = patches.into_iter().enumerate().collect();
    ordered.sort_by(|(ia, (a, _)), (ib, (b, _))| b.start.cmp(&a.start).then(ib.cmp(ia)));
    let mut out = text.to_string();
    for (_, (span, replacement)) in ordered {
        out.replace_range(span.start..span.end, &replacement);
    }
    out
}

/// End of the tag name in an element's opening tag
fn tag_name_end(text: &str, element: &Element) -> usize {
    let after_lt = element.open_tag.start + 1;
    let rest = &text[after_lt..element.open_tag.end];
    after_lt + (rest.len() - rest.trim_start().len()) + element.tag.len()
}

/// Attribute span widened over the whitespace before it
fn removal_span(text: &str, attr: Span, open: Span) -> Span {
    let before = text[open.start..attr.start].trim_end().len();
    Span::new(open.start + before, attr.end)
}

/// Smallest element containing every span; their union when none does
fn enclosing_region(doc: &Document, spans: &[Span]) -> Span {
    let union = Span::new(
        spans.iter().map(|s| s.start).min().unwrap_or(0),
        spans.iter().map(|s| s.end).max().unwrap_or(0),
    );
    doc.flatten()
        .into_iter()
        .map(|entry| entry.element.span())
        .filter(|span| span.contains(&union))
        .min_by_key(|span| span.len())
        .unwrap_or(union)
}

/// Removes each span, taking its whole line when nothing else is on it
fn remove_spans(text: &str, spans: &[Span]) -> String {
    let mut sorted: Vec<Span> = spans.to_vec();
    sorted.sort_by_key(|span| std::cmp::Reverse(span.start));

    let mut out = text.to_string();
    let mut limit = text.len();
    let mut applied: Vec<Span> = Vec::new();
    for span in sorted {
        if applied.iter().any(|outer| outer.contains(&span)) {
            continue;
        }
        let (mut start, mut end) = (span.start, span.end);
        if starts_line(text, span.start) && ends_line(text, span.end) {
            start = line_start(text, span.start);
            end = line_end(text, span.end);
            if end < text.len() {
                end += 1;
            } else if start > 0 {
                start -= 1;
            }
        }
        let end = end.min(limit);
        out.replace_range(start..end, "");
        limit = start;
        applied.push(span);
    }
    out
}

fn string_literal(expr: &str) -> Option<&str> {
    let quote = expr.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = expr.strip_prefix(quote)?.strip_suffix(quote)?;
    (!inner.contains(quote)).then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onlook_parser::{LineIndex, Position};

    fn node_for(path: &str, source: &str, oid: &str) -> TemplateNode {
        let doc = onlook_parser::parse_jsx(source).unwrap();
        let index = LineIndex::new(source);
        TemplateNode::from_element(oid, Path::new(path), source, &index, doc.find_by_oid(oid).unwrap())
    }

    fn apply(source: &str, diffs: &[CodeDiff]) -> String {
        diffs
            .iter()
            .fold(source.to_string(), |text, diff| diff.apply_to(&text).unwrap())
    }

    #[test]
    fn test_remove_spans_whole_lines() {
        let text = "<a>\n    <b />\n    <c />\n</a>";
        let b = text.find("<b").unwrap();
        let c = text.find("<c").unwrap();
        let out = remove_spans(text, &[Span::new(b, b + 5), Span::new(c, c + 5)]);
        assert_eq!(out, "<a>\n</a>");

        let inline = "<a><b /> x</a>";
        assert_eq!(remove_spans(inline, &[Span::new(3, 8)]), "<a> x</a>");
    }

    #[test]
    fn test_attribute_added_after_last_attribute() {
        let source = "const A = () => <div data-oid=\"a\" className=\"x\">hi</div>;";
        let node = node_for("/a.tsx", source, "a");
        let request = CodeDiffRequest::new("a").with_attribute("id", Some("main".into()));
        let diffs = compile(&node, source, &request).unwrap();

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].original, "<div data-oid=\"a\" className=\"x\">");
        assert_eq!(diffs[0].generated, "<div data-oid=\"a\" className=\"x\" id=\"main\">");
    }

    #[test]
    fn test_stale_node_is_reported() {
        let source = "const A = () => <div data-oid=\"a\" />;";
        let node = node_for("/a.tsx", source, "a");
        let changed = "const A = () => <div data-oid=\"b\" />;";
        let err = compile(&node, changed, &CodeDiffRequest::new("a").with_text("x")).unwrap_err();
        assert!(matches!(err, CompileError::StaleSource { .. }));
    }

    #[test]
    fn test_batch_compiles_against_working_copy() {
        let source = "const A = () => (\n    <div data-oid=\"a\">\n        <p data-oid=\"p\">x</p>\n    </div>\n);";
        let mut compiler = DiffCompiler::new();
        compiler.add_source("/a.tsx", source);

        let a = node_for("/a.tsx", source, "a");
        let p = node_for("/a.tsx", source, "p");
        compiler
            .compile(&a, &CodeDiffRequest::new("a").with_classes("flex", false))
            .unwrap();
        compiler
            .compile(&p, &CodeDiffRequest::new("p").with_text("y"))
            .unwrap();

        let expected = compiler.source(Path::new("/a.tsx")).unwrap().to_string();
        assert_eq!(apply(source, compiler.diffs()), expected);
        assert!(expected.contains("<div data-oid=\"a\" className=\"flex\">"));
        assert!(expected.contains("<p data-oid=\"p\">y</p>"));
        assert_eq!(a.start_tag.start, Position::new(2, 4));
    }
}
