pub mod base;
pub mod extract;
pub mod http;
pub mod locators;
pub mod naver;

pub use base::{FetchRequest, PageFetcher};
pub use http::HttpFetcher;
pub use naver::NaverScraper;
