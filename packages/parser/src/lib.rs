pub mod ast;
pub mod error;
pub mod id_generator;
pub mod position;
pub mod scanner;

pub use ast::{
    AttrValue, Attribute, CoreElementType, Document, DynamicType, Element, ElementRef, Node, Span,
    OID_ATTRIBUTE,
};
pub use error::{ParseError, ParseResult};
pub use id_generator::{get_document_seed, OidGenerator};
pub use position::{LineIndex, Position};
pub use scanner::{is_void_element, parse_for_path, parse_jsx, parse_markup, SourceKind};
