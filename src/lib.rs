pub mod config;
pub mod display;
pub mod errors;
pub mod invoke;
pub mod progress;
pub mod results;
pub mod sweep;
pub mod timer;
pub mod types;
pub mod workdir;
