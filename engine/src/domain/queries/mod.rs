pub mod search_tabs;

pub use search_tabs::{SortField, SortOrder, TabSearchQuery, TabSearchResults};
