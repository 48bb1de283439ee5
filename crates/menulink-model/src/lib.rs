//! Menu item and tree model for the menulink remote menu API.
//!
//! A connected device exposes a hierarchical menu; this crate holds the
//! client-side picture of it: one typed variant per item kind, the tree
//! registry rooted at the reserved id `"0"`, and the per-kind conversion
//! rules between wire values, display text and user input.

mod format;
mod item;
mod tree;

pub use format::*;
pub use item::*;
pub use tree::*;
