//! # Element scanner
//!
//! Finds markup elements in JS/TS(X) modules and plain HTML documents and
//! records byte spans for tags, attributes and children. Everything outside
//! elements is skipped, not parsed: the scanner only needs to know enough
//! JavaScript to tell a `<` that opens an element from a comparison, a type
//! argument or a `<` inside a string, comment, template or regex literal.
//!
//! ## Classification
//!
//! Elements reached from code carry the context they were written in:
//! the enclosing top-level component, whether they render conditionally or
//! from an array `.map(...)`, and whether they are the element a component
//! returns.

use crate::ast::{
    AttrValue, Attribute, CoreElementType, Document, DynamicType, Element, Node, Span,
};
use crate::error::{ParseError, ParseResult};
use std::path::Path;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];
const JSX_PRECEDERS: &[u8] = b"(,=:?{}[;&|!>";
const EXPRESSION_KEYWORDS: &[&str] = &["yield", "default", "await", "case"];
const DECLARATION_KEYWORDS: &[&str] = &["function", "class", "const", "let", "var"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// JavaScript or TypeScript module, with or without JSX
    Jsx,
    /// Plain HTML document
    Markup,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jsx" | "tsx" | "js" | "ts" | "mjs" | "cjs" | "mts" | "cts" => Some(SourceKind::Jsx),
            "html" | "htm" => Some(SourceKind::Markup),
            _ => None,
        }
    }
}

pub fn parse_jsx(source: &str) -> ParseResult<Document> {
    let mut scanner = Scanner::new(source, false);
    let roots = scanner.scan_code(None, false)?;
    Ok(Document { roots })
}

pub fn parse_markup(source: &str) -> ParseResult<Document> {
    let mut scanner = Scanner::new(source, true);
    let roots = scanner.scan_markup()?;
    Ok(Document { roots })
}

/// Picks the scanner from the file extension; unknown extensions scan as JSX
pub fn parse_for_path(path: &Path, source: &str) -> ParseResult<Document> {
    match SourceKind::from_path(path) {
        Some(SourceKind::Markup) => parse_markup(source),
        _ => parse_jsx(source),
    }
}

/// Last significant token seen in code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Start,
    Punct(u8),
    Arrow,
    Return,
    Keyword,
    /// Identifier, literal or closing bracket: anything that ends an operand
    Value,
}

impl Token {
    fn admits_element(self) -> bool {
        match self {
            Token::Start | Token::Arrow | Token::Return | Token::Keyword => true,
            Token::Punct(byte) => JSX_PRECEDERS.contains(&byte),
            Token::Value => false,
        }
    }

    fn is_conditional(self) -> bool {
        matches!(self, Token::Punct(b'?' | b':' | b'&' | b'|'))
    }

    fn is_return(self) -> bool {
        matches!(self, Token::Return | Token::Arrow)
    }
}

struct Frame {
    map_call: bool,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    markup: bool,
    component: Option<String>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, markup: bool) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            markup,
            component: None,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn found(&self) -> String {
        self.src
            .get(self.pos..)
            .and_then(|rest| rest.chars().next())
            .map(|c| c.to_string())
            .unwrap_or_else(|| "end of file".to_string())
    }

    fn expect(&mut self, byte: u8) -> ParseResult<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(ParseError::expected(
                self.pos,
                format!("'{}'", byte as char),
                self.found(),
            )),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_past(&mut self, pattern: &str) {
        match self.src[self.pos..].find(pattern) {
            Some(idx) => self.pos += idx + pattern.len(),
            None => self.pos = self.bytes.len(),
        }
    }

    // ---- code ----

    /// Scans code until `closer` at nesting depth zero (left unconsumed) or
    /// end of input, returning the elements found at this level.
    fn scan_code(&mut self, closer: Option<u8>, nested: bool) -> ParseResult<Vec<Element>> {
        let start = self.pos;
        let mut elements = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut prev = Token::Start;
        // `prev`, ignoring opening parens
        let mut lead = Token::Start;

        while let Some(byte) = self.peek() {
            match byte {
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_past("\n"),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_past("*/"),
                b'/' if prev != Token::Value => {
                    self.skip_regex();
                    prev = Token::Value;
                    lead = prev;
                }
                b'"' | b'\'' => {
                    self.skip_string(byte);
                    prev = Token::Value;
                    lead = prev;
                }
                b'`' => {
                    elements.extend(self.skip_template()?);
                    prev = Token::Value;
                    lead = prev;
                }
                b'<' if prev.admits_element() && self.at_tag_start() => {
                    let start = self.pos;
                    match self.parse_element() {
                        Ok(mut element) => {
                            let in_map = frames.iter().any(|frame| frame.map_call);
                            if lead.is_conditional() {
                                element.dynamic_type = Some(DynamicType::Conditional);
                            } else if in_map {
                                element.dynamic_type = Some(DynamicType::Array);
                            }
                            if element.core_type.is_none()
                                && element.dynamic_type.is_none()
                                && !nested
                                && lead.is_return()
                            {
                                element.core_type = Some(CoreElementType::ComponentRoot);
                            }
                            elements.push(element);
                            prev = Token::Value;
                            lead = prev;
                        }
                        Err(err) if lead.is_return() => return Err(err),
                        Err(_) => {
                            self.pos = start + 1;
                            prev = Token::Punct(b'<');
                            lead = prev;
                        }
                    }
                }
                b'{' | b'(' | b'[' => {
                    let map_call =
                        byte == b'(' && self.src[..self.pos].trim_end().ends_with(".map");
                    frames.push(Frame { map_call });
                    self.pos += 1;
                    prev = Token::Punct(byte);
                    if byte != b'(' {
                        lead = prev;
                    }
                }
                b'}' | b')' | b']' => {
                    if frames.is_empty() && closer == Some(byte) {
                        return Ok(elements);
                    }
                    frames.pop();
                    self.pos += 1;
                    prev = if byte == b'}' {
                        Token::Punct(b'}')
                    } else {
                        Token::Value
                    };
                    lead = prev;
                }
                b'=' if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    prev = Token::Arrow;
                    lead = prev;
                }
                b if is_ident_start(b) => {
                    let word = self.read_while(is_ident_char);
                    prev = match word {
                        "return" => Token::Return,
                        w if EXPRESSION_KEYWORDS.contains(&w) => Token::Keyword,
                        _ => Token::Value,
                    };
                    lead = prev;
                    if !nested && frames.is_empty() && DECLARATION_KEYWORDS.contains(&word) {
                        self.note_declaration();
                    }
                }
                b if b.is_ascii_digit() => {
                    self.read_while(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_');
                    prev = Token::Value;
                    lead = prev;
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                b => {
                    self.pos += 1;
                    prev = if b.is_ascii() {
                        Token::Punct(b)
                    } else {
                        Token::Value
                    };
                    lead = prev;
                }
            }
        }

        match closer {
            Some(_) => Err(ParseError::unclosed(start, "expression")),
            None => Ok(elements),
        }
    }

    /// Records a capitalised top-level declaration as the current component
    fn note_declaration(&mut self) {
        let mut cursor = self.pos;
        while self
            .bytes
            .get(cursor)
            .is_some_and(|b| b.is_ascii_whitespace() || *b == b'*')
        {
            cursor += 1;
        }
        let start = cursor;
        while self.bytes.get(cursor).copied().is_some_and(is_ident_char) {
            cursor += 1;
        }
        let name = &self.src[start..cursor];
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            self.component = Some(name.to_string());
        }
    }

    fn at_tag_start(&self) -> bool {
        self.peek_at(1)
            .is_some_and(|b| b == b'>' || is_tag_name_start(b))
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(byte) = self.peek() {
            match byte {
                b'\\' => self.pos += 2,
                b'\n' => return,
                b if b == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    fn skip_regex(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'\\' => self.pos += 2,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    self.read_while(|b| b.is_ascii_alphabetic());
                    return;
                }
                b'\n' => {
                    // not a regex after all
                    self.pos = start + 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    fn skip_template(&mut self) -> ParseResult<Vec<Element>> {
        let start = self.pos;
        let mut elements = Vec::new();
        self.pos += 1;
        while let Some(byte) = self.peek() {
            match byte {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return Ok(elements);
                }
                b'$' if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    elements.extend(self.scan_code(Some(b'}'), true)?);
                    self.expect(b'}')?;
                }
                _ => self.pos += 1,
            }
        }
        Err(ParseError::unclosed(start, "template literal"))
    }

    // ---- elements ----

    fn parse_element(&mut self) -> ParseResult<Element> {
        let start = self.pos;
        self.expect(b'<')?;
        self.skip_whitespace();
        let tag = if self.peek() == Some(b'>') {
            String::new()
        } else {
            self.read_tag_name()?.to_string()
        };

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::unclosed(start, format!("<{}>", tag))),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break true;
                }
                Some(b'{') if !self.markup => attributes.push(self.parse_spread()?),
                Some(b) if is_attr_name_char(b) => attributes.push(self.parse_attribute()?),
                Some(_) => {
                    return Err(ParseError::expected(
                        self.pos,
                        "attribute or '>'",
                        self.found(),
                    ))
                }
            }
        };

        let mut element = Element {
            tag,
            attributes,
            children: Vec::new(),
            open_tag: Span::new(start, self.pos),
            close_tag: None,
            component: self.component.clone(),
            dynamic_type: None,
            core_type: None,
        };
        if element.tag.eq_ignore_ascii_case("body") {
            element.core_type = Some(CoreElementType::BodyTag);
        }
        if self_closing || (self.markup && is_void_element(&element.tag)) {
            return Ok(element);
        }

        if self.markup && is_raw_text(&element.tag) {
            let needle = format!("</{}", element.tag.to_ascii_lowercase());
            let text_start = self.pos;
            let offset = self.src[self.pos..]
                .to_ascii_lowercase()
                .find(&needle)
                .ok_or_else(|| ParseError::unclosed(start, format!("<{}>", element.tag)))?;
            self.pos += offset;
            if offset > 0 {
                element.children.push(Node::Text {
                    span: Span::new(text_start, self.pos),
                    content: self.src[text_start..self.pos].to_string(),
                });
            }
            element.close_tag = Some(self.parse_close_tag(&element.tag)?);
            return Ok(element);
        }

        loop {
            match self.peek() {
                None => return Err(ParseError::unclosed(start, format!("<{}>", element.tag))),
                Some(b'<') if self.peek_at(1) == Some(b'/') => {
                    element.close_tag = Some(self.parse_close_tag(&element.tag)?);
                    return Ok(element);
                }
                Some(b'<') if self.markup && self.src[self.pos..].starts_with("<!--") => {
                    self.skip_past("-->")
                }
                Some(b'<') if self.markup && self.peek_at(1) == Some(b'!') => self.skip_past(">"),
                Some(b'<') if !self.markup || self.at_tag_start() => {
                    let child = self.parse_element()?;
                    element.children.push(Node::Element(child));
                }
                Some(b'{') if !self.markup => {
                    let open = self.pos;
                    self.pos += 1;
                    let elements = self.scan_code(Some(b'}'), true)?;
                    self.expect(b'}')?;
                    element.children.push(Node::Expression {
                        span: Span::new(open, self.pos),
                        elements,
                    });
                }
                Some(_) => {
                    let text_start = self.pos;
                    self.pos += 1;
                    while let Some(byte) = self.peek() {
                        let boundary = match byte {
                            b'<' => !self.markup || self.at_tag_start() || self.peek_at(1) == Some(b'/') || self.peek_at(1) == Some(b'!'),
                            b'{' => !self.markup,
                            _ => false,
                        };
                        if boundary {
                            break;
                        }
                        self.pos += 1;
                    }
                    element.children.push(Node::Text {
                        span: Span::new(text_start, self.pos),
                        content: self.src[text_start..self.pos].to_string(),
                    });
                }
            }
        }
    }

    fn parse_close_tag(&mut self, tag: &str) -> ParseResult<Span> {
        let start = self.pos;
        self.expect(b'<')?;
        self.expect(b'/')?;
        self.skip_whitespace();
        let name = self.read_while(is_tag_name_char);
        self.skip_whitespace();
        self.expect(b'>')?;
        let matches = if self.markup {
            name.eq_ignore_ascii_case(tag)
        } else {
            name == tag
        };
        if !matches {
            return Err(ParseError::mismatched_close(start, tag, name));
        }
        Ok(Span::new(start, self.pos))
    }

    fn read_tag_name(&mut self) -> ParseResult<&'a str> {
        match self.peek() {
            Some(b) if is_tag_name_start(b) => Ok(self.read_while(is_tag_name_char)),
            _ => Err(ParseError::expected(self.pos, "tag name", self.found())),
        }
    }

    fn parse_attribute(&mut self) -> ParseResult<Attribute> {
        let start = self.pos;
        let name = self.read_while(is_attr_name_char).to_string();
        let name_end = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            self.pos = name_end;
            return Ok(Attribute {
                name,
                value: AttrValue::Bare,
                span: Span::new(start, name_end),
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let value = self.read_while(|b| b != quote).to_string();
                self.expect(quote)?;
                AttrValue::Str {
                    value,
                    quote: Some(quote as char),
                }
            }
            Some(b'{') if !self.markup => {
                self.pos += 1;
                let inner_start = self.pos;
                let elements = self.scan_code(Some(b'}'), true)?;
                let source = self.src[inner_start..self.pos].to_string();
                self.expect(b'}')?;
                AttrValue::Expr { source, elements }
            }
            Some(_) if self.markup => {
                let value = self
                    .read_while(|b| !b.is_ascii_whitespace() && b != b'>')
                    .to_string();
                AttrValue::Str { value, quote: None }
            }
            _ => {
                return Err(ParseError::expected(
                    self.pos,
                    "attribute value",
                    self.found(),
                ))
            }
        };

        Ok(Attribute {
            name,
            value,
            span: Span::new(start, self.pos),
        })
    }

    fn parse_spread(&mut self) -> ParseResult<Attribute> {
        let start = self.pos;
        self.pos += 1;
        let inner_start = self.pos;
        self.scan_code(Some(b'}'), true)?;
        let source = self.src[inner_start..self.pos].trim().to_string();
        self.expect(b'}')?;
        Ok(Attribute {
            name: String::new(),
            value: AttrValue::Spread { source },
            span: Span::new(start, self.pos),
        })
    }

    // ---- markup documents ----

    fn scan_markup(&mut self) -> ParseResult<Vec<Element>> {
        let mut roots = Vec::new();
        while let Some(byte) = self.peek() {
            if byte != b'<' {
                self.pos += 1;
                continue;
            }
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                self.skip_past("-->");
            } else if rest.starts_with("<!") || rest.starts_with("</") || rest.starts_with("<?") {
                self.skip_past(">");
            } else if self.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                roots.push(self.parse_element()?);
            } else {
                self.pos += 1;
            }
        }
        Ok(roots)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_tag_name_start(b: u8) -> bool {
    is_ident_start(b)
}

fn is_tag_name_char(b: u8) -> bool {
    is_ident_char(b) || matches!(b, b'.' | b':' | b'-')
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'{' | b'}' | b'<')
}

/// HTML elements that never take children or a closing tag
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_is_not_an_element() {
        let doc = parse_jsx("const ok = a < b && c > d;").unwrap();
        assert!(doc.roots.is_empty());
    }

    #[test]
    fn test_strings_and_comments_are_skipped() {
        let source = r#"
            // <div data-oid="x"></div>
            const s = "<span>";
            const t = `<b>${1}</b>`;
            /* <p/> */
            const re = /<i>/g;
        "#;
        let doc = parse_jsx(source).unwrap();
        assert!(doc.roots.is_empty());
    }

    #[test]
    fn test_generic_call_is_not_an_element() {
        let doc = parse_jsx("const [v, setV] = useState<string>('');").unwrap();
        assert!(doc.roots.is_empty());
    }

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(SourceKind::from_path(Path::new("a/page.tsx")), Some(SourceKind::Jsx));
        assert_eq!(SourceKind::from_path(Path::new("index.HTML")), Some(SourceKind::Markup));
        assert_eq!(SourceKind::from_path(Path::new("README.md")), None);
    }
}
