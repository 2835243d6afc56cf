pub mod path;
pub mod robust;

pub use path::{generate_css_path, generate_xpath, resolve_xpath};
pub use robust::{get_robust_selector, PathNode, SelectorSynthesizer};
