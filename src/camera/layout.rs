//! Layout presenter: pure mapping from slot state to a rendering plan.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{SlotId, SlotView};

/// Stacking order of a maximized tile.
pub const Z_FOCUSED: u8 = 20;
/// Stacking order of every other tile.
pub const Z_DEFAULT: u8 = 10;

/// Size class of a camera tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub enum TileSize {
    /// 640x360, single view or focused tile.
    Large,
    /// 320x180, uniform grid tile.
    Medium,
    /// 160x90, corner thumbnail next to a focused tile.
    Small,
}

impl TileSize {
    /// Pixel box (width, height), 16:9.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            TileSize::Large => (640, 360),
            TileSize::Medium => (320, 180),
            TileSize::Small => (160, 90),
        }
    }
}

/// Placement of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub struct TilePlan {
    pub slot_id: SlotId,
    pub size: TileSize,
    pub width: u32,
    pub height: u32,
    pub z_index: u8,
}

/// Rendering plan for the whole camera strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub struct LayoutPlan {
    /// Tiles in display order.
    pub tiles: Vec<TilePlan>,
    /// Show the "add camera" control.
    pub can_add: bool,
    /// Show per-tile remove controls.
    pub can_remove: bool,
}

/// Size class for one slot given the whole slot list.
pub fn tile_size(view: &SlotView, views: &[SlotView]) -> TileSize {
    if view.is_maximized() {
        return TileSize::Large;
    }
    if views.iter().any(SlotView::is_maximized) {
        return TileSize::Small;
    }
    match views.len() {
        0 | 1 => TileSize::Large,
        _ => TileSize::Medium,
    }
}

/// Tile placements for `views`, in the same order.
pub fn plan_tiles(views: &[SlotView]) -> Vec<TilePlan> {
    views
        .iter()
        .map(|view| {
            let size = tile_size(view, views);
            let (width, height) = size.dimensions();
            TilePlan {
                slot_id: view.slot_id,
                size,
                width,
                height,
                z_index: if view.is_maximized() {
                    Z_FOCUSED
                } else {
                    Z_DEFAULT
                },
            }
        })
        .collect()
}

/// Full plan including control visibility.
///
/// `device_count` is the size of the current device snapshot; adding is
/// offered only while there are more devices than tiles and room left.
pub fn plan_layout(views: &[SlotView], device_count: usize, max_slots: usize) -> LayoutPlan {
    LayoutPlan {
        tiles: plan_tiles(views),
        can_add: views.len() < max_slots && device_count > views.len(),
        can_remove: views.len() > 1,
    }
}
