use serde::{Deserialize, Serialize};

/// Attribute carrying the stable per-element source identifier
pub const OID_ATTRIBUTE: &str = "data-oid";

/// Byte range into the scanned source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Root of a scanned file: every top-level element found in it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub roots: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Tag name as written (`div`, `Card`, `motion.div`); empty for fragments
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// `<tag ...>` or `<tag ... />`
    pub open_tag: Span,
    /// `</tag>`; `None` when the element is self-closing or void
    pub close_tag: Option<Span>,
    /// Nearest enclosing top-level component declaration
    pub component: Option<String>,
    pub dynamic_type: Option<DynamicType>,
    pub core_type: Option<CoreElementType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text {
        span: Span,
        content: String,
    },
    /// `{...}` child; any markup nested in the expression is kept in `elements`
    Expression {
        span: Span,
        elements: Vec<Element>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Empty for spread attributes
    pub name: String,
    pub value: AttrValue,
    /// Whole attribute, name through value
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Quoted or unquoted literal, without its quotes
    Str { value: String, quote: Option<char> },
    /// Source between the braces of `name={...}`
    Expr { source: String, elements: Vec<Element> },
    /// `{...props}`
    Spread { source: String },
    /// Boolean attribute with no value
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DynamicType {
    /// Rendered from an array `.map(...)` callback
    Array,
    /// Rendered under `? :`, `&&` or `||`
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoreElementType {
    /// Returned directly from a component
    ComponentRoot,
    BodyTag,
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(element) => element.span(),
            Node::Text { span, .. } | Node::Expression { span, .. } => *span,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl Element {
    /// Full source range of the element, opening through closing tag
    pub fn span(&self) -> Span {
        let end = self
            .close_tag
            .map(|close| close.end)
            .unwrap_or(self.open_tag.end);
        Span::new(self.open_tag.start, end)
    }

    /// Range between the opening and closing tag
    pub fn inner_span(&self) -> Option<Span> {
        self.close_tag
            .map(|close| Span::new(self.open_tag.end, close.start))
    }

    pub fn is_self_closing(&self) -> bool {
        self.close_tag.is_none()
    }

    pub fn is_fragment(&self) -> bool {
        self.tag.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Literal `data-oid` value, if instrumented
    pub fn oid(&self) -> Option<&str> {
        match self.attribute(OID_ATTRIBUTE).map(|attr| &attr.value) {
            Some(AttrValue::Str { value, .. }) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Direct element children, in source order (text and expressions skipped)
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Position of the child with `oid` among [`Element::element_children`]
    pub fn child_index(&self, oid: &str) -> Option<usize> {
        self.element_children()
            .position(|child| child.oid() == Some(oid))
    }

    /// Concatenated literal text directly under this element
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect::<String>()
    }

    fn nested(&self) -> Vec<&Element> {
        let mut nested = Vec::new();
        for attr in &self.attributes {
            if let AttrValue::Expr { elements, .. } = &attr.value {
                nested.extend(elements.iter());
            }
        }
        for child in &self.children {
            match child {
                Node::Element(element) => nested.push(element),
                Node::Expression { elements, .. } => nested.extend(elements.iter()),
                Node::Text { .. } => {}
            }
        }
        nested
    }
}

/// Element visited by [`Document::flatten`], with the element it is nested in
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    pub element: &'a Element,
    pub parent: Option<&'a Element>,
    pub depth: usize,
}

impl Document {
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// Every element in document order (pre-order), including markup nested
    /// inside attribute and child expressions.
    pub fn flatten(&self) -> Vec<ElementRef<'_>> {
        fn walk<'a>(
            element: &'a Element,
            parent: Option<&'a Element>,
            depth: usize,
            out: &mut Vec<ElementRef<'a>>,
        ) {
            out.push(ElementRef {
                element,
                parent,
                depth,
            });
            for child in element.nested() {
                walk(child, Some(element), depth + 1, out);
            }
        }

        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, None, 0, &mut out);
        }
        out
    }

    pub fn find_by_oid(&self, oid: &str) -> Option<&Element> {
        self.flatten()
            .into_iter()
            .find(|entry| entry.element.oid() == Some(oid))
            .map(|entry| entry.element)
    }

    pub fn count_oid(&self, oid: &str) -> usize {
        self.flatten()
            .iter()
            .filter(|entry| entry.element.oid() == Some(oid))
            .count()
    }

    /// Element `oid` is nested in, if any
    pub fn parent_of(&self, oid: &str) -> Option<&Element> {
        self.flatten()
            .into_iter()
            .find(|entry| entry.element.oid() == Some(oid))
            .and_then(|entry| entry.parent)
    }

    /// Enclosing elements of `oid`, nearest first
    pub fn ancestors_of(&self, oid: &str) -> Vec<&Element> {
        let flat = self.flatten();
        let Some(target) = flat.iter().find(|entry| entry.element.oid() == Some(oid)) else {
            return Vec::new();
        };
        let span = target.element.span();
        let mut ancestors: Vec<&Element> = flat
            .iter()
            .filter(|entry| {
                let candidate = entry.element.span();
                candidate.contains(&span) && candidate != span
            })
            .map(|entry| entry.element)
            .collect();
        ancestors.sort_by_key(|element| std::cmp::Reverse(element.span().start));
        ancestors
    }

    /// All literal oids in document order, duplicates included
    pub fn oids(&self) -> Vec<&str> {
        self.flatten()
            .iter()
            .filter_map(|entry| entry.element.oid())
            .collect()
    }
}
