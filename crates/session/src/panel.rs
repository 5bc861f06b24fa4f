//! Sidebar and layer-list helpers.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sidebar {
    Left,
    Right,
}

impl Sidebar {
    pub fn element_id(self) -> &'static str {
        match self {
            Sidebar::Left => "leftSidebar",
            Sidebar::Right => "rightSidebar",
        }
    }

    pub fn toggle_id(self) -> &'static str {
        match self {
            Sidebar::Left => "leftToggle",
            Sidebar::Right => "rightToggle",
        }
    }

    /// Arrow shown on the toggle; it points the way the sidebar will move.
    pub fn glyph(self, collapsed: bool) -> &'static str {
        match (self, collapsed) {
            (Sidebar::Left, true) | (Sidebar::Right, false) => "▶",
            (Sidebar::Left, false) | (Sidebar::Right, true) => "◀",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebarState {
    left_collapsed: bool,
    right_collapsed: bool,
}

impl SidebarState {
    pub fn is_collapsed(&self, side: Sidebar) -> bool {
        match side {
            Sidebar::Left => self.left_collapsed,
            Sidebar::Right => self.right_collapsed,
        }
    }

    /// Flips `side` and returns its new collapsed state.
    pub fn toggle(&mut self, side: Sidebar) -> bool {
        let slot = match side {
            Sidebar::Left => &mut self.left_collapsed,
            Sidebar::Right => &mut self.right_collapsed,
        };
        *slot = !*slot;
        *slot
    }
}

/// Where a dragged layer item lands relative to the hovered one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DropPlacement {
    Before,
    After,
}

impl DropPlacement {
    /// Upper half of the target inserts before it, lower half after.
    pub fn from_pointer(pointer_y: f64, target_top: f64, target_height: f64) -> Self {
        if pointer_y < target_top + target_height / 2.0 {
            DropPlacement::Before
        } else {
            DropPlacement::After
        }
    }

    /// Feedback class shown on the hovered item.
    pub fn marker_class(self) -> &'static str {
        match self {
            DropPlacement::Before => "drag-over-top",
            DropPlacement::After => "drag-over-bottom",
        }
    }
}
