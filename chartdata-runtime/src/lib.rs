use env_logger::{Builder, Target};
use std::sync::Once;

pub mod config;
pub mod controller;
pub mod debug;

pub use config::DataControllerConfig;
pub use controller::{DataCache, DataController, DataRequestHandle, DataResult};

static INIT: Once = Once::new();

/// Install a `RUST_LOG` driven logger writing to stdout. Safe to call repeatedly.
pub fn initialize_logging() {
    INIT.call_once(|| {
        let mut builder = Builder::from_default_env();
        builder.target(Target::Stdout);
        if builder.try_init().is_err() {
            log::debug!("a logger was already installed");
        }
    });
}
