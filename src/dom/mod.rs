pub mod html;
pub mod layout;
pub mod node;
pub mod query;
pub mod snapshot;
pub mod style;
pub mod traversal;

pub use node::{Frame, NodeId, NodeKind, Page, ShadowRootMode};
pub use query::{SelectorList, Uniqueness};
pub use snapshot::{deserialize_node_from_json, serialize_node_to_json, SerializedNode};
pub use style::ComputedStyle;
pub use traversal::{get_parent_node, query_all_deep};
