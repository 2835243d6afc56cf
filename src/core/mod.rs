pub mod config;
pub mod finder;

pub use config::{Config, FilterConfig, HighlightConfig, SelectorConfig};
pub use finder::ElementFinder;
