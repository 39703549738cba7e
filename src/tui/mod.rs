//! TUI module: Terminal User Interface using Ratatui.
//!
//! Two screens:
//! - Patient form, pre-filled with the schema defaults
//! - Risk report: headline, indicator statuses, importance and waterfall

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::ClinicalTheme;
