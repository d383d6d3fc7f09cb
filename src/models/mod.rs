pub mod deal;
pub mod filters;
pub mod selectors;

pub use deal::Deal;
pub use filters::{CategoryFilters, SortBy, TimeFrame};
pub use selectors::SiteSelectors;
