use rustc_hash::FxHashMap;

/// Hands out the 0th, 1st, … fragment position for each URL.
///
/// When k regions share a URL, the Nth region processed consumes the Nth
/// matching fragment of that URL's response.
#[derive(Debug, Default)]
pub struct FragmentIndex {
    cursors: FxHashMap<String, usize>,
}

impl FragmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next position for `url`, starting at 0.
    pub fn next_index(&mut self, url: &str) -> usize {
        match self.cursors.get_mut(url) {
            Some(cursor) => {
                *cursor += 1;
                *cursor
            }
            None => {
                self.cursors.insert(url.to_string(), 0);
                0
            }
        }
    }

    /// Positions handed out so far for `url`.
    pub fn consumed(&self, url: &str) -> usize {
        self.cursors.get(url).map_or(0, |c| c + 1)
    }
}
