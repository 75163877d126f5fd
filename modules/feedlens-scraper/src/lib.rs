pub mod page;
pub mod spider;
pub mod webdriver;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use page::{ElementRef, FeedSelectors, Page, Selector};
pub use spider::{write_posts, Credentials, FeedSpider, ScrapeOutcome, SpiderConfig};
pub use webdriver::WebDriverPage;
