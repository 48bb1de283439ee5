//! The menu tree registry.
//!
//! A [`MenuTree`] owns every item reachable from the reserved root submenu.
//! Child ordering lives inside each submenu as an ordered id list, so the
//! registry map and the hierarchy can never disagree: an id is in the map
//! exactly when it is reachable from the root.

use std::collections::HashMap;

use crate::item::{ItemData, MenuItem};

/// Id permanently reserved for the root submenu.
pub const ROOT_ID: &str = "0";

/// Callback invoked with the affected item id on every structural mutation.
pub type StructureChangeFn = Box<dyn FnMut(&str)>;

/// Registry of all menu items, rooted at [`ROOT_ID`].
pub struct MenuTree {
    items: HashMap<String, MenuItem>,
    on_structure_change: Option<StructureChangeFn>,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuTree {
    /// Create a tree holding only the root submenu.
    pub fn new() -> Self {
        let mut tree = MenuTree {
            items: HashMap::new(),
            on_structure_change: None,
        };
        tree.seed_root();
        tree
    }

    fn seed_root(&mut self) {
        let mut root = MenuItem::new(ROOT_ID, "ROOT", ItemData::SubMenu { children: Vec::new() });
        root.visible = true;
        self.items.insert(ROOT_ID.to_string(), root);
    }

    /// Register the structure-change callback. The last registration wins.
    pub fn set_structure_listener(&mut self, listener: StructureChangeFn) {
        self.on_structure_change = Some(listener);
    }

    /// The root submenu item.
    pub fn root(&self) -> &MenuItem {
        // The root is re-seeded by every clearing operation.
        &self.items[ROOT_ID]
    }

    /// Look up an item by id.
    pub fn item(&self, id: &str) -> Option<&MenuItem> {
        self.items.get(id)
    }

    /// Look up an item mutably by id.
    pub fn item_mut(&mut self, id: &str) -> Option<&mut MenuItem> {
        self.items.get_mut(id)
    }

    /// Number of items in the tree, including the root.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.items.len() == 1
    }

    /// Ordered child ids of a submenu, empty for any other kind or a
    /// missing id.
    pub fn children_of(&self, id: &str) -> &[String] {
        match self.items.get(id).map(|item| &item.data) {
            Some(ItemData::SubMenu { children }) => children,
            _ => &[],
        }
    }

    /// Add a new item beneath `parent_id`.
    ///
    /// Fails (returning `false`, structure untouched) when the id is already
    /// present. A parent that is missing or not a submenu falls back to the
    /// root, matching bootstrap streams that deliver children before their
    /// parent is known.
    pub fn add_item(&mut self, parent_id: &str, item: MenuItem) -> bool {
        if self.items.contains_key(&item.id) {
            return false;
        }
        let id = item.id.clone();
        let parent_key = match self.items.get(parent_id) {
            Some(MenuItem { data: ItemData::SubMenu { .. }, .. }) => parent_id,
            _ => ROOT_ID,
        };
        if let Some(MenuItem { data: ItemData::SubMenu { children }, .. }) =
            self.items.get_mut(parent_key)
        {
            children.push(id.clone());
        }
        self.items.insert(id.clone(), item);
        if let Some(cb) = self.on_structure_change.as_mut() {
            cb(&id);
        }
        true
    }

    /// Atomically discard every item and re-seed the root submenu.
    pub fn empty_tree(&mut self) {
        self.items.clear();
        self.seed_root();
        if let Some(cb) = self.on_structure_change.as_mut() {
            cb(ROOT_ID);
        }
    }

    /// Iterate over all item ids in the registry.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }
}
