pub mod classifier;
pub mod core;
pub mod descriptor;
pub mod dom;
pub mod errors;
pub mod filter;
pub mod highlight;
pub mod resolve;
pub mod scroll;
pub mod selector;
pub mod session;
pub mod testing;
pub mod types;

pub use classifier::{Candidate, Classifier};
pub use crate::core::{Config, ElementFinder};
pub use descriptor::{get_element_info, ElementDescriptor, CROSS_ORIGIN_IFRAME};
pub use dom::{deserialize_node_from_json, get_parent_node, query_all_deep, serialize_node_to_json, NodeId, Page};
pub use errors::HighlightError;
pub use highlight::{Highlighter, PageReport};
pub use resolve::{find_element, match_interaction, InteractionMatch, MatchTier};
pub use scroll::{detect_scrollable_containers, ScrollableContainer};
pub use selector::{generate_css_path, generate_xpath, get_robust_selector};
pub use session::HighlightSession;
pub use types::*;
