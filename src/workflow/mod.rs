pub mod category_scraper;

pub use category_scraper::{CategoryScraper, SessionSource};
