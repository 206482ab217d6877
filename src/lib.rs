// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds terminal setup and the CLI.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod counter;
pub mod crop;
pub mod cue;
pub mod error;
pub mod highlight;
pub mod intake;
pub mod keys;
pub mod logging;
pub mod navigation;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timer;
pub mod ui;
pub mod widget_pos;

pub use error::{Result, RowmarkError};
