//! DOM patch primitive.
//!
//! The reconciliation engine only needs "make the children of this live node
//! look like the children of that fragment node, except for permanent nodes".
//! That capability is the `Patcher` trait; [`MorphPatcher`] is the default,
//! a keyed morph that reuses existing nodes so identity (and focus) survives.

use crate::dom::{Document, NodeData, NodeId};

/// Marks a descendant that a patch must leave exactly as it is.
pub const PERMANENT_ATTRIBUTE: &str = "data-ignore-updates";

#[derive(Debug, Clone, Copy)]
pub struct PatchOptions<'a> {
    /// Only the target's children change; the target itself is kept.
    pub children_only: bool,
    /// Live elements carrying this attribute are never morphed.
    pub permanent_attribute: &'a str,
}

impl Default for PatchOptions<'_> {
    fn default() -> Self {
        Self {
            children_only: true,
            permanent_attribute: PERMANENT_ATTRIBUTE,
        }
    }
}

/// What a patch did, for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MorphStats {
    pub updated: usize,
    pub inserted: usize,
    pub removed: usize,
    pub preserved: usize,
}

impl MorphStats {
    pub fn is_noop(&self) -> bool {
        self.updated == 0 && self.inserted == 0 && self.removed == 0
    }
}

/// Applies a source fragment onto a live node.
pub trait Patcher: Send + Sync {
    fn patch(
        &self,
        live: &mut Document,
        target: NodeId,
        source: &Document,
        source_node: NodeId,
        options: &PatchOptions<'_>,
    ) -> MorphStats;
}

/// Keyed morph.
///
/// Children are matched by `id` first, then by tag in order; text and
/// comment nodes match the next unused node of the same kind. Matched nodes
/// are updated in place, unmatched source nodes are imported, leftover live
/// nodes are removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MorphPatcher;

impl Patcher for MorphPatcher {
    fn patch(
        &self,
        live: &mut Document,
        target: NodeId,
        source: &Document,
        source_node: NodeId,
        options: &PatchOptions<'_>,
    ) -> MorphStats {
        let mut stats = MorphStats::default();
        if options.children_only {
            morph_children(live, target, source, source_node, options, &mut stats);
        } else {
            morph_node(live, target, source, source_node, options, &mut stats);
        }
        stats
    }
}

fn morph_children(
    live: &mut Document,
    parent: NodeId,
    source: &Document,
    source_parent: NodeId,
    options: &PatchOptions<'_>,
    stats: &mut MorphStats,
) {
    let old: Vec<NodeId> = live.children(parent).to_vec();
    let mut used = vec![false; old.len()];
    let mut next = Vec::with_capacity(source.children(source_parent).len());

    for &src in source.children(source_parent) {
        match find_match(live, &old, &used, source, src) {
            Some(i) => {
                used[i] = true;
                morph_node(live, old[i], source, src, options, stats);
                next.push(old[i]);
            }
            None => {
                next.push(live.import(source, src));
                stats.inserted += 1;
            }
        }
    }

    stats.removed += used.iter().filter(|u| !**u).count();
    live.set_children(parent, next);
}

fn find_match(
    live: &Document,
    old: &[NodeId],
    used: &[bool],
    source: &Document,
    src: NodeId,
) -> Option<usize> {
    let candidates = old
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(i, &node)| (i, live.data(node)));

    match source.data(src) {
        NodeData::Element(element) => {
            let key = element.attr("id").filter(|id| !id.is_empty());
            candidates
                .filter_map(|(i, data)| match data {
                    NodeData::Element(e) if e.name == element.name => Some((i, e)),
                    _ => None,
                })
                .find(|(_, e)| e.attr("id").filter(|id| !id.is_empty()) == key)
                .map(|(i, _)| i)
        }
        NodeData::Text(_) => candidates
            .filter(|(_, data)| matches!(data, NodeData::Text(_)))
            .map(|(i, _)| i)
            .next(),
        NodeData::Comment(_) => candidates
            .filter(|(_, data)| matches!(data, NodeData::Comment(_)))
            .map(|(i, _)| i)
            .next(),
        NodeData::Root => None,
    }
}

fn morph_node(
    live: &mut Document,
    node: NodeId,
    source: &Document,
    src: NodeId,
    options: &PatchOptions<'_>,
    stats: &mut MorphStats,
) {
    match source.data(src) {
        NodeData::Text(text) | NodeData::Comment(text) => {
            let changed = match live.data(node) {
                NodeData::Text(old) | NodeData::Comment(old) => old != text,
                _ => false,
            };
            if changed {
                live.set_text(node, text.clone());
                stats.updated += 1;
            }
        }
        NodeData::Element(element) => {
            if live.has_attr(node, options.permanent_attribute) {
                stats.preserved += 1;
                return;
            }
            if let Some(current) = live.element_mut(node)
                && current.attrs != element.attrs
            {
                current.attrs = element.attrs.clone();
                stats.updated += 1;
            }
            morph_children(live, node, source, src, options, stats);
        }
        NodeData::Root => morph_children(live, node, source, src, options, stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;

    fn first(doc: &Document, selector: &str) -> NodeId {
        doc.query_selector(doc.root(), &Selector::parse(selector).unwrap())
            .unwrap()
    }

    fn patch(live: &mut Document, target: NodeId, html: &str) -> MorphStats {
        let source = Document::parse(html);
        let src_root = source.children(source.root())[0];
        MorphPatcher.patch(live, target, &source, src_root, &PatchOptions::default())
    }

    #[test]
    fn test_children_replaced_host_kept() {
        let mut live = Document::parse(r#"<updates-for identifier="A" updating><p>old</p></updates-for>"#);
        let host = first(&live, "updates-for");

        patch(&mut live, host, r#"<updates-for identifier="A"><p>new</p><p>more</p></updates-for>"#);

        assert_eq!(live.inner_html(host), "<p>new</p><p>more</p>");
        assert!(live.has_attr(host, "updating"));
    }

    #[test]
    fn test_permanent_node_preserved() {
        let mut live = Document::parse(
            r#"<updates-for><div id="keep" data-ignore-updates>typed by user</div><p>old</p></updates-for>"#,
        );
        let host = first(&live, "updates-for");

        let stats = patch(
            &mut live,
            host,
            r#"<updates-for><div id="keep" data-ignore-updates>server copy</div><p>new</p></updates-for>"#,
        );

        assert_eq!(stats.preserved, 1);
        assert_eq!(live.inner_html(first(&live, "#keep")), "typed by user");
        assert_eq!(live.inner_html(first(&live, "p")), "new");
    }

    #[test]
    fn test_matched_nodes_keep_identity() {
        let mut live = Document::parse(
            r#"<updates-for><input id="q" value="a"><ul><li id="x">x</li></ul></updates-for>"#,
        );
        let host = first(&live, "updates-for");
        let input = first(&live, "#q");
        assert!(live.focus(input));

        patch(
            &mut live,
            host,
            r#"<updates-for><input id="q" value="b"><ul><li id="y">y</li><li id="x">x2</li></ul></updates-for>"#,
        );

        assert_eq!(first(&live, "#q"), input);
        assert_eq!(live.attr(input, "value"), Some("b"));
        assert_eq!(live.active_element(), Some(input));
        assert_eq!(live.inner_html(first(&live, "ul")), r#"<li id="y">y</li><li id="x">x2</li>"#);
    }

    #[test]
    fn test_identical_source_is_noop() {
        let html = r#"<updates-for><p class="a">same</p></updates-for>"#;
        let mut live = Document::parse(html);
        let host = first(&live, "updates-for");

        let stats = patch(&mut live, host, html);

        assert!(stats.is_noop());
    }

    #[test]
    fn test_leftover_children_removed() {
        let mut live = Document::parse("<updates-for><p>a</p><p>b</p><span>c</span></updates-for>");
        let host = first(&live, "updates-for");

        let stats = patch(&mut live, host, "<updates-for><p>a</p></updates-for>");

        assert_eq!(stats.removed, 2);
        assert_eq!(live.inner_html(host), "<p>a</p>");
    }
}
