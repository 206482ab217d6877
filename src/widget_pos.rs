//! Screen positions of the floating counter and timer panels.
//!
//! Each panel has its own [`WidgetTracker`]: its own storage key, its own
//! default anchor and its own drag session. Positions are terminal cells.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::storage::{load_json, save_json, KeyValueStore};

/// Gap kept between a default-placed panel and the viewport edge
pub const EDGE_MARGIN: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WidgetKind {
    Counter,
    Timer,
}

impl WidgetKind {
    pub fn storage_key(&self) -> &'static str {
        match self {
            WidgetKind::Counter => "widget-pos-counter",
            WidgetKind::Timer => "widget-pos-timer",
        }
    }

    /// Where the panel sits when nothing was stored: counter bottom-left,
    /// timer bottom-right, measured from the panel's own size.
    pub fn default_position(&self, size: Size, viewport: Size) -> Position {
        let bottom = viewport.height as i32 - size.height as i32 - EDGE_MARGIN as i32;
        let x = match self {
            WidgetKind::Counter => EDGE_MARGIN as i32,
            WidgetKind::Timer => viewport.width as i32 - size.width as i32 - EDGE_MARGIN as i32,
        };
        clamp_position(Position::new(x, bottom), size, viewport)
    }
}

/// Keep the whole `size` footprint inside the viewport. A panel larger than
/// the viewport is pinned to the top-left corner.
pub fn clamp_position(pos: Position, size: Size, viewport: Size) -> Position {
    let max_x = (viewport.width as i32 - size.width as i32).max(0);
    let max_y = (viewport.height as i32 - size.height as i32).max(0);
    Position {
        x: pos.x.clamp(0, max_x),
        y: pos.y.clamp(0, max_y),
    }
}

/// What the pointer landed on inside a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// A button or other control of the panel; never starts a drag
    Control,
    /// Frame or label area
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragSession {
    grab_dx: i32,
    grab_dy: i32,
}

#[derive(Debug, Clone)]
pub struct WidgetTracker {
    kind: WidgetKind,
    position: Option<Position>,
    size: Option<Size>,
    drag: Option<DragSession>,
}

impl WidgetTracker {
    /// Read the stored position. Nothing stored, or garbage stored, leaves the
    /// position to be derived once the panel has been measured.
    pub fn load(kind: WidgetKind, store: &dyn KeyValueStore) -> Self {
        Self {
            kind,
            position: load_json(store, kind.storage_key()),
            size: None,
            drag: None,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Record the panel's rendered size. The first measurement resolves the
    /// default position if none was stored.
    pub fn measure(&mut self, size: Size, viewport: Size) -> Position {
        self.size = Some(size);
        let pos = match self.position {
            Some(p) => p,
            None => self.kind.default_position(size, viewport),
        };
        self.position = Some(pos);
        pos
    }

    /// Position to draw at for the current viewport; never leaves the
    /// viewport even if the stored value predates a resize.
    pub fn placed(&self, viewport: Size) -> Option<Position> {
        Some(clamp_position(self.position?, self.size?, viewport))
    }

    pub fn contains(&self, col: u16, row: u16) -> bool {
        match (self.position, self.size) {
            (Some(p), Some(s)) => {
                let (c, r) = (col as i32, row as i32);
                c >= p.x && c < p.x + s.width as i32 && r >= p.y && r < p.y + s.height as i32
            }
            _ => false,
        }
    }

    /// Pointer pressed at `pointer` on `target`. Controls never start a drag.
    pub fn pointer_down(&mut self, target: HitTarget, pointer: (u16, u16)) -> bool {
        if target == HitTarget::Control {
            return false;
        }
        let Some(pos) = self.position else {
            return false;
        };
        self.drag = Some(DragSession {
            grab_dx: pointer.0 as i32 - pos.x,
            grab_dy: pointer.1 as i32 - pos.y,
        });
        true
    }

    /// Follow the pointer while a drag is in progress.
    pub fn pointer_move(&mut self, pointer: (u16, u16), viewport: Size) -> bool {
        let (Some(drag), Some(size)) = (self.drag, self.size) else {
            return false;
        };
        let wanted = Position::new(
            pointer.0 as i32 - drag.grab_dx,
            pointer.1 as i32 - drag.grab_dy,
        );
        let next = clamp_position(wanted, size, viewport);
        let moved = self.position != Some(next);
        self.position = Some(next);
        moved
    }

    /// End the drag and persist where the panel landed.
    pub fn pointer_up(&mut self, store: &mut dyn KeyValueStore) -> bool {
        if self.drag.take().is_none() {
            return false;
        }
        if let Some(pos) = self.position {
            save_json(store, self.kind.storage_key(), &pos);
        }
        true
    }

    /// Move programmatically (clamped when the size is known) and persist.
    pub fn set_position(&mut self, pos: Position, viewport: Size, store: &mut dyn KeyValueStore) {
        let pos = match self.size {
            Some(size) => clamp_position(pos, size, viewport),
            None => pos,
        };
        self.position = Some(pos);
        save_json(store, self.kind.storage_key(), &pos);
    }

    /// Pull the panel back inside a viewport that shrank.
    pub fn reclamp(&mut self, viewport: Size) {
        if let Some(p) = self.placed(viewport) {
            self.position = Some(p);
        }
    }
}
