#![allow(dead_code)]

use shovel_common::observability::{LogConfig, init_logging};
use shovel_config::ClientConfig;
use shovel_web::Fetcher;
use std::sync::Once;

static TRACING: Once = Once::new();

pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = init_logging(LogConfig {
            app_name: "shovel-web-tests".to_string(),
            log_dir: Some(std::env::temp_dir().join("shovel-web-tests")),
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        });
    });
}

/// A fetcher with its own transport and cache.
pub fn fetcher() -> Fetcher {
    init_test_tracing();
    Fetcher::from_config(&ClientConfig::default()).expect("fetcher")
}
