//! Structured logging setup
//!
//! Logs go to stderr so they never mix with report tables on stdout.
//! `RUST_LOG` overrides the level picked from the command line flags.

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "devmate=debug"
    } else {
        "warn"
    }
}

/// Initialize the global subscriber. Later calls are no-ops.
pub fn init(debug: bool, json: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

        let registry = tracing_subscriber::registry().with(filter);

        // try_init so an already installed subscriber (tests) is left alone
        let _ = if json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true), "devmate=debug");
        assert_eq!(default_filter(false), "warn");
    }

    #[test]
    fn test_init_twice() {
        init(false, false);
        init(true, true);
    }
}
