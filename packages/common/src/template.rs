use onlook_parser::{CoreElementType, DynamicType, Element, LineIndex, Position, Span};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRange {
    pub start: Position,
    pub end: Position,
}

impl TagRange {
    pub fn from_span(index: &LineIndex, source: &str, span: Span) -> Self {
        Self {
            start: index.position(source, span.start),
            end: index.position(source, span.end),
        }
    }
}

/// Location of one element in one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub oid: String,
    pub path: PathBuf,
    pub start_tag: TagRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_tag: Option<TagRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_type: Option<DynamicType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_element_type: Option<CoreElementType>,
}

impl TemplateNode {
    pub fn from_element(
        oid: impl Into<String>,
        path: &Path,
        source: &str,
        index: &LineIndex,
        element: &Element,
    ) -> Self {
        Self {
            oid: oid.into(),
            path: path.to_path_buf(),
            start_tag: TagRange::from_span(index, source, element.open_tag),
            end_tag: element
                .close_tag
                .map(|span| TagRange::from_span(index, source, span)),
            component: element.component.clone(),
            dynamic_type: element.dynamic_type,
            core_element_type: element.core_type,
        }
    }

    /// Byte range of the whole element in `source`, if the positions still fit
    pub fn span(&self, source: &str, index: &LineIndex) -> Option<Span> {
        let start = index.offset(source, self.start_tag.start)?;
        let end_pos = self
            .end_tag
            .map(|range| range.end)
            .unwrap_or(self.start_tag.end);
        let end = index.offset(source, end_pos)?;
        (start <= end).then(|| Span::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onlook_parser::parse_jsx;

    #[test]
    fn test_template_node_positions() {
        let source = "const A = () => (\n  <div data-oid=\"a\">\n    <b data-oid=\"b\" />\n  </div>\n);";
        let doc = parse_jsx(source).unwrap();
        let index = LineIndex::new(source);
        let div = doc.find_by_oid("a").unwrap();
        let node = TemplateNode::from_element("a", Path::new("/a.tsx"), source, &index, div);

        assert_eq!(node.start_tag.start, Position::new(2, 2));
        assert_eq!(node.end_tag.unwrap().end, Position::new(4, 8));
        assert_eq!(node.component.as_deref(), Some("A"));
        assert_eq!(node.span(source, &index), Some(div.span()));

        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("startTag").is_some());
        assert_eq!(json["coreElementType"], "componentRoot");
    }
}
