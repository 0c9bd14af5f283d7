//! Eager turbo-frame resolution.
//!
//! Before a fragment is patched into the page, every nested
//! `<turbo-frame src>` that is not lazy-loaded is fetched, resolved
//! recursively, and its placeholder filled with the matching frame's content
//! from the response:
//!
//! ```text
//! fragment ──► turbo-frame#a[src=/a] ──fetch /a──► turbo-frame#a ──► turbo-frame#b[src=/b] ──► …
//!                       ▲                                   │
//!                       └──────── children copied ──────────┘
//! ```
//!
//! Sibling frames load concurrently; a frame's placeholder is only written
//! once all of its own nested frames are done.

use futures::future::{BoxFuture, join_all};

use crate::dom::{Document, NodeId, Selector};
use crate::fetch::{FetchRequest, Fetcher, graciously_fetch};

pub const FRAME_TAG: &str = "turbo-frame";

/// Depth at which nested frame loading stops.
pub const DEFAULT_MAX_FRAME_DEPTH: usize = 32;

/// `turbo-frame[src]:not([loading="lazy"])`
pub fn eager_frame_selector() -> Selector {
    Selector::tag(FRAME_TAG)
        .with_attr("src")
        .not(Selector::default().with_attr_eq("loading", "lazy"))
}

/// Recursive pre-fetcher for eager frames.
pub struct FrameResolver<'a> {
    fetcher: &'a dyn Fetcher,
    max_depth: usize,
}

/// A fetched frame document and the element whose children replace the
/// placeholder.
struct LoadedFrame {
    document: Document,
    content: NodeId,
}

impl<'a> FrameResolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            max_depth: DEFAULT_MAX_FRAME_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve all eager frames in `fragment`, in place.
    ///
    /// Returns the number of frame fetches issued, nested ones included.
    pub async fn resolve(&self, fragment: &mut Document) -> usize {
        self.resolve_at(fragment, 0).await
    }

    fn resolve_at<'s>(&'s self, fragment: &'s mut Document, depth: usize) -> BoxFuture<'s, usize> {
        Box::pin(async move {
            let frames: Vec<(NodeId, String, String)> = fragment
                .query_selector_all(fragment.root(), &eager_frame_selector())
                .into_iter()
                .filter_map(|node| {
                    let src = fragment.attr(node, "src")?.to_string();
                    let id = fragment.attr(node, "id").unwrap_or_default().to_string();
                    Some((node, id, src))
                })
                .collect();

            if frames.is_empty() {
                return 0;
            }

            if depth >= self.max_depth {
                crate::log!("warn"; "frame nesting deeper than {}, leaving {} frame(s) unresolved", self.max_depth, frames.len());
                return 0;
            }

            let loaded = join_all(
                frames
                    .iter()
                    .map(|(_, id, src)| self.load(id, src, depth + 1)),
            )
            .await;

            let mut fetched = 0;
            for ((placeholder, id, _), (frame, count)) in frames.iter().zip(loaded) {
                fetched += count;
                match frame {
                    Some(frame) => {
                        fragment.replace_children_from(*placeholder, &frame.document, frame.content)
                    }
                    None => {
                        crate::debug!("frame"; "no content for turbo-frame#{}", id);
                        fragment.clear_children(*placeholder);
                    }
                }
            }
            fetched
        })
    }

    /// Fetch one frame's source and resolve its own nested frames.
    async fn load(&self, id: &str, src: &str, depth: usize) -> (Option<LoadedFrame>, usize) {
        let body = graciously_fetch(self.fetcher, FetchRequest::frame(src, id))
            .await
            .unwrap_or_default();

        let mut document = Document::parse(&body);
        let nested = self.resolve_at(&mut document, depth).await;

        if id.is_empty() {
            return (None, nested + 1);
        }
        let selector = Selector::tag(FRAME_TAG).with_id(id);
        let frame = document
            .query_selector(document.root(), &selector)
            .map(|content| LoadedFrame { document, content });

        (frame, nested + 1)
    }
}
