pub mod app_config;
pub mod helpers;
pub mod logging;
pub mod table;

pub use app_config::AppConfig;
pub use helpers::*;
pub use table::{Cell, Table};
