//! HTML parsing into the arena document.
//!
//! `html5ever` builds the tree the way a browser would (implied end tags,
//! raw-text `<script>`/`<style>` bodies, entity decoding) into an `RcDom`;
//! this module walks its handles and copies them into a `Document`.
//!
//! Input starting with `<!DOCTYPE` or `<html` is parsed as a full document.
//! Anything else is parsed as a fragment in the context of its future parent,
//! which is what `innerHTML` does.

use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::{Document, ElementData, NodeId};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Fragment context for nodes parsed at the top of a `Document`.
const DEFAULT_CONTEXT: &str = "body";

impl Document {
    /// Parse an HTML document or fragment. Every text node is kept,
    /// whitespace included.
    pub fn parse(html: &str) -> Self {
        let mut doc = Document::new();
        if is_full_document(html) {
            let dom = html5ever::parse_document(RcDom::default(), ParseOpts::default()).one(html);
            let root = doc.root();
            doc.convert_children(root, &dom.document);
        } else {
            let root = doc.root();
            doc.append_html(root, html);
        }
        doc
    }

    /// Parse `html` as a fragment and append the resulting nodes to `parent`.
    pub fn append_html(&mut self, parent: NodeId, html: &str) {
        if html.is_empty() {
            return;
        }

        let context = html_name(self.tag_name(parent).unwrap_or(DEFAULT_CONTEXT));
        let dom = html5ever::parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);

        // Fragment nodes hang off a synthetic `<html>` element.
        let wrappers = dom.document.children.borrow();
        for wrapper in wrappers.iter() {
            self.convert_children(parent, wrapper);
        }
    }

    /// Replace the children of `parent` with the parsed `html`.
    pub fn set_inner_html(&mut self, parent: NodeId, html: &str) {
        self.clear_children(parent);
        self.append_html(parent, html);
    }

    fn convert_children(&mut self, parent: NodeId, handle: &Handle) {
        for child in handle.children.borrow().iter() {
            self.convert(parent, child);
        }
    }

    fn convert(&mut self, parent: NodeId, handle: &Handle) {
        let id = match &handle.data {
            RcNodeData::Document => {
                self.convert_children(parent, handle);
                return;
            }
            RcNodeData::Doctype {
                name,
                public_id,
                system_id,
            } => {
                self.doctype = Some(doctype_declaration(name, public_id, system_id));
                return;
            }
            RcNodeData::ProcessingInstruction { .. } => return,
            RcNodeData::Text { contents } => self.create_text(String::from(&**contents.borrow())),
            RcNodeData::Comment { contents } => self.create_comment(String::from(&**contents)),
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let mut element = ElementData::new(&*name.local);
                for attr in attrs.borrow().iter() {
                    let local: &str = &attr.name.local;
                    let key = match &attr.name.prefix {
                        Some(prefix) => format!("{}:{local}", &**prefix),
                        None => local.to_string(),
                    };
                    element.set_attr(&key.to_ascii_lowercase(), String::from(&*attr.value));
                }
                let id = self.create_element(element);

                // `<template>` children live in a separate content fragment.
                match template_contents.borrow().as_ref() {
                    Some(contents) => self.convert_children(id, contents),
                    None => self.convert_children(id, handle),
                }
                id
            }
        };
        self.append_child(parent, id);
    }
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

fn is_full_document(html: &str) -> bool {
    let head = html.trim_start_matches('\u{feff}').trim_start();
    starts_with_ignore_case(head, "<!doctype") || starts_with_ignore_case(head, "<html")
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn doctype_declaration(name: &str, public_id: &str, system_id: &str) -> String {
    match (public_id.is_empty(), system_id.is_empty()) {
        (true, true) => format!("<!DOCTYPE {name}>"),
        (true, false) => format!(r#"<!DOCTYPE {name} SYSTEM "{system_id}">"#),
        (false, true) => format!(r#"<!DOCTYPE {name} PUBLIC "{public_id}">"#),
        (false, false) => format!(r#"<!DOCTYPE {name} PUBLIC "{public_id}" "{system_id}">"#),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeData, Selector};

    #[test]
    fn test_parse_attributes_and_text() {
        let doc = Document::parse(r#"<updates-for identifier="A" url="/x">Hi &amp; bye</updates-for>"#);
        let region = doc.children(doc.root())[0];
        assert_eq!(doc.tag_name(region), Some("updates-for"));
        assert_eq!(doc.attr(region, "identifier"), Some("A"));
        assert_eq!(doc.attr(region, "url"), Some("/x"));

        let text = doc.children(region)[0];
        assert_eq!(doc.data(text), &NodeData::Text("Hi & bye".to_string()));
    }

    #[test]
    fn test_parse_boolean_attribute() {
        let doc = Document::parse(r#"<div ignore-inner-updates performing-inner-update></div>"#);
        let div = doc.children(doc.root())[0];
        assert!(doc.has_attr(div, "ignore-inner-updates"));
        assert_eq!(doc.attr(div, "performing-inner-update"), Some(""));
    }

    #[test]
    fn test_parse_id_and_class_are_attributes() {
        let doc = Document::parse(r#"<turbo-frame id="f1" class="x y" src="/f"></turbo-frame>"#);
        let frame = doc
            .query_selector(doc.root(), &Selector::parse("turbo-frame#f1").unwrap())
            .unwrap();
        assert_eq!(doc.attr(frame, "src"), Some("/f"));
        assert_eq!(
            doc.element(frame).unwrap().attrs.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            ["id", "class", "src"]
        );
        assert!(doc.element(frame).unwrap().classes().any(|c| c == "y"));
    }

    #[test]
    fn test_parse_empty_input() {
        let doc = Document::parse("");
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_whitespace_text_kept() {
        let doc = Document::parse("<p><b>Hello</b> <i>world</i></p>\n<pre>  a\n   b</pre>");
        assert_eq!(doc.to_html(), "<p><b>Hello</b> <i>world</i></p>\n<pre>  a\n   b</pre>");

        let doc = Document::parse("  \n ");
        assert_eq!(doc.to_html(), "  \n ");
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let html = "<div><script>if (a < b && c > d) { x = '</p>' }</script><p>y</p></div>";
        let doc = Document::parse(html);
        let div = doc.children(doc.root())[0];

        assert_eq!(doc.children(div).len(), 2);
        assert_eq!(doc.to_html(), html);

        let doc = Document::parse("<style>a > b { color: red }</style>");
        assert_eq!(doc.to_html(), "<style>a > b { color: red }</style>");
    }

    #[test]
    fn test_implied_end_tags() {
        let doc = Document::parse(r#"<ul><li>a<li>b</ul><updates-for identifier="A">z</updates-for>"#);
        assert_eq!(
            doc.to_html(),
            r#"<ul><li>a</li><li>b</li></ul><updates-for identifier="A">z</updates-for>"#
        );
    }

    #[test]
    fn test_full_document_keeps_doctype() {
        let doc = Document::parse("<!DOCTYPE html>\n<html lang=\"en\"><head><title>t</title></head><body><p>x</p></body></html>");
        assert_eq!(doc.doctype(), Some("<!DOCTYPE html>"));
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html>\n<html lang=\"en\"><head><title>t</title></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_fragment_has_no_doctype() {
        let doc = Document::parse("<p>x</p>");
        assert_eq!(doc.doctype(), None);
        assert_eq!(doc.to_html(), "<p>x</p>");
    }

    #[test]
    fn test_nested_structure() {
        let doc = Document::parse("<ul><li>a</li><li><b>b</b></li></ul>");
        let ul = doc.children(doc.root())[0];
        assert_eq!(doc.children(ul).len(), 2);
        assert_eq!(doc.inner_html(ul), "<li>a</li><li><b>b</b></li>");
    }

    #[test]
    fn test_set_inner_html_uses_parent_context() {
        let mut doc = Document::parse("<table><tbody><tr><td>old</td></tr></tbody></table>");
        let tbody = doc
            .query_selector(doc.root(), &Selector::tag("tbody"))
            .unwrap();
        doc.set_inner_html(tbody, "<tr><td>new</td></tr>");
        assert_eq!(doc.inner_html(tbody), "<tr><td>new</td></tr>");
    }

    #[test]
    fn test_template_contents_kept() {
        let doc = Document::parse("<template><li>row</li></template>");
        assert_eq!(doc.to_html(), "<template><li>row</li></template>");
    }
}
