//! Crawl frontier and visited-set management
//!
//! This module handles:
//! - Layered breadth-first queueing (one layer per depth)
//! - First-discovery-wins deduplication of canonical URLs
//! - Admission limits on depth and total pages

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL admitted to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: Url,

    /// Link distance from the start URL (0 = start URL)
    pub depth: u32,

    /// Position in discovery order across the whole crawl
    pub order: usize,
}

/// Canonical URLs already enqueued or processed in one crawl
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL; returns false if it was already present
    pub fn insert(&mut self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Breadth-first frontier with depth and page admission limits
///
/// Entries of the current depth are handed out as a layer; links found
/// while processing it are offered for the next depth. A URL is admitted at
/// most once, at the depth where it was first offered, and never beyond
/// `max_depth` or after `max_pages` URLs have been admitted.
#[derive(Debug)]
pub struct Frontier {
    max_depth: u32,
    max_pages: usize,
    depth: u32,
    current: VecDeque<FrontierEntry>,
    next: Vec<FrontierEntry>,
    visited: VisitedSet,
    admitted: usize,
}

impl Frontier {
    /// Creates a frontier seeded with the start URL at depth 0
    ///
    /// # Arguments
    ///
    /// * `start` - Canonical start URL
    /// * `max_depth` - Deepest layer that may be admitted
    /// * `max_pages` - Upper bound on admitted URLs, start URL included
    pub fn new(start: Url, max_depth: u32, max_pages: usize) -> Self {
        let mut visited = VisitedSet::new();
        visited.insert(&start);

        let mut current = VecDeque::new();
        current.push_back(FrontierEntry {
            url: start,
            depth: 0,
            order: 0,
        });

        Self {
            max_depth,
            max_pages: max_pages.max(1),
            depth: 0,
            current,
            next: Vec::new(),
            visited,
            admitted: 1,
        }
    }

    /// Depth of the layer currently being handed out
    pub fn current_depth(&self) -> u32 {
        self.depth
    }

    /// Takes every pending entry of the current layer, in discovery order
    pub fn take_layer(&mut self) -> Vec<FrontierEntry> {
        self.current.drain(..).collect()
    }

    /// Offers a link discovered on a page at `depth - 1`
    ///
    /// # Returns
    ///
    /// `true` if the URL was admitted
    pub fn offer(&mut self, url: Url, depth: u32) -> bool {
        if depth > self.max_depth || self.admitted >= self.max_pages {
            return false;
        }
        if !self.visited.insert(&url) {
            return false;
        }

        self.next.push(FrontierEntry {
            url,
            depth,
            order: self.admitted,
        });
        self.admitted += 1;
        true
    }

    /// Marks a URL as seen without queueing it
    ///
    /// Used for redirect targets, which were already fetched under another
    /// URL. Does not count against `max_pages`.
    ///
    /// # Returns
    ///
    /// `true` if the URL was not seen before
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url)
    }

    /// Returns true when no more links can be admitted
    pub fn is_full(&self) -> bool {
        self.admitted >= self.max_pages
    }

    /// Whether links found at `depth` may still be followed
    pub fn can_expand_from(&self, depth: u32) -> bool {
        depth < self.max_depth && !self.is_full()
    }

    /// Moves to the next layer
    ///
    /// # Returns
    ///
    /// `false` if the next layer is empty and the crawl is done
    pub fn advance(&mut self) -> bool {
        if !self.current.is_empty() {
            return true;
        }
        if self.next.is_empty() {
            return false;
        }
        self.depth += 1;
        self.current.extend(self.next.drain(..));
        true
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Total URLs admitted so far, start URL included
    pub fn admitted(&self) -> usize {
        self.admitted
    }
}
