//! State module for page outcomes
//!
//! `PageState` records how the fetch of a single URL ended.

mod page_state;

pub use page_state::PageState;
