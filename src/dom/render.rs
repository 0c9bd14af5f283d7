//! HTML serialization.

use super::{Document, NodeData, NodeId};
use crate::utils::html::{escape, escape_attr, is_raw_text_element, is_void_element};

impl Document {
    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag_name(id).is_some_and(is_raw_text_element);
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        match self.data(id) {
            NodeData::Root => return self.inner_html(id),
            _ => self.write_node(id, false, &mut out),
        }
        out
    }

    /// Serialize the whole document, doctype first.
    pub fn to_html(&self) -> String {
        match self.doctype() {
            Some(doctype) => format!("{doctype}\n{}", self.inner_html(self.root())),
            None => self.inner_html(self.root()),
        }
    }

    fn write_node(&self, id: NodeId, raw: bool, out: &mut String) {
        match self.data(id) {
            NodeData::Root => {
                for &child in self.children(id) {
                    self.write_node(child, false, out);
                }
            }
            NodeData::Text(text) if raw => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(key);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');

                if is_void_element(&element.name) {
                    return;
                }

                let raw_children = is_raw_text_element(&element.name);
                for &child in self.children(id) {
                    self.write_node(child, raw_children, out);
                }

                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}
