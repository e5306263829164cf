pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod locator;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod request_log;
pub mod resolver;
pub mod server;
pub mod syntax;
