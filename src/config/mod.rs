//! Configuration module for webscrape
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use webscrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("webscrape.toml")).unwrap();
//! println!("Resources expire after {}s", config.store.ttl_seconds);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, RendererConfig, StoreConfig, UserAgentConfig};

pub use parser::{
    compute_config_hash, hash_config_content, load_config, load_config_with_hash, parse_config,
};
pub use validation::MAX_WORKERS;
