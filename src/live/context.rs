use crate::diagnostics::PassId;
use crate::dom::{Document, NodeId, Selector};
use crate::fragment::{FragmentIndex, FragmentStore};

/// State owned by exactly one reconciliation pass.
///
/// Created when the leader decides to proceed, dropped when the pass ends;
/// nothing here outlives the pass.
#[derive(Debug)]
pub struct PassContext {
    pub pass: PassId,
    /// Focused element when the pass started.
    pub active_element: Option<NodeId>,
    pub store: FragmentStore,
    pub index: FragmentIndex,
}

impl PassContext {
    pub fn new(pass: PassId, active_element: Option<NodeId>) -> Self {
        Self {
            pass,
            active_element,
            store: FragmentStore::new(),
            index: FragmentIndex::new(),
        }
    }

    /// Move focus after a patch.
    ///
    /// `selector` wins when it matches; otherwise the element focused at pass
    /// start gets focus back if it is still in the document.
    pub fn restore_focus(&self, document: &mut Document, selector: Option<&str>) -> Option<NodeId> {
        let selected = selector.and_then(|s| match Selector::parse(s) {
            Ok(selector) => document.query_selector(document.root(), &selector),
            Err(e) => {
                crate::log!("warn"; "ignoring focus selector `{}`: {}", s, e);
                None
            }
        });

        let target = selected.or(self.active_element)?;
        document.focus(target).then_some(target)
    }
}
