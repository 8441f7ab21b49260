//! Styled terminal output for the `nodlite` binary

pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{error, info, section, success, summary_row, warn};
pub use theme::{theme, Theme};
