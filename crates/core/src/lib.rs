pub mod config;
pub mod location;
pub mod report;

pub use config::Config;
pub use location::*;
pub use report::*;
