pub mod app;
pub mod crawl;
pub mod download;
pub mod ls;
