//! Snapping preferences: global switches, per-target toggles and tolerances.

use super::candidate::{SnapSourceCategory, SnapSourceType, SnapTargetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A tolerance of this many pixels means "always snap".
pub const ALWAYS_SNAP_TOLERANCE: f64 = 10000.0;

/// Preference loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for preference operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Snapping preferences, read on every snap call.
///
/// Tolerances are in screen pixels; snappers divide them by the zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapPreferences {
    pub snap_enabled: bool,
    /// Snapping is temporarily held back, e.g. while the pointer moves fast.
    pub snap_postponed: bool,
    /// Per-target toggles that differ from the factory defaults.
    pub targets: BTreeMap<SnapTargetType, bool>,
    pub object_tolerance: f64,
    pub grid_tolerance: f64,
    pub guide_tolerance: f64,
    pub alignment_tolerance: f64,
    pub distribution_tolerance: f64,
    pub visible_grid_lines_only: bool,
    /// Snap the pointer instead of the constrained point when dragging a single handle.
    pub snap_mouse_pointer: bool,
    pub visual_bbox: bool,
    /// Only the closest source point of a selection is snapped and displayed.
    pub snap_closest_only: bool,
    /// Bounding box sources only snap to bounding box targets, nodes only to nodes and paths.
    pub strict_snapping: bool,
    /// Angular increments for rotations, per half turn.
    pub rotation_snaps_per_pi: u32,
}

impl Default for SnapPreferences {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_postponed: false,
            targets: BTreeMap::new(),
            object_tolerance: 10.0,
            grid_tolerance: 10.0,
            guide_tolerance: 20.0,
            alignment_tolerance: 5.0,
            distribution_tolerance: 5.0,
            visible_grid_lines_only: true,
            snap_mouse_pointer: false,
            visual_bbox: true,
            snap_closest_only: false,
            strict_snapping: true,
            rotation_snaps_per_pi: 12,
        }
    }
}

/// Factory state of a target toggle.
fn default_target_enabled(target: SnapTargetType) -> bool {
    use SnapTargetType::*;
    !matches!(
        target,
        BBoxEdgeMidpoint
            | BBoxMidpoint
            | PathIntersection
            | PathTangential
            | PathPerpendicular
            | AlignmentHandle
            | ObjectMidpoint
            | RotationCenter
    )
}

impl SnapPreferences {
    /// Load preferences from a JSON string; missing fields take their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load preferences from a JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// State of a single toggle, ignoring its category.
    pub fn is_target_enabled(&self, target: SnapTargetType) -> bool {
        self.targets
            .get(&target)
            .copied()
            .unwrap_or_else(|| default_target_enabled(target))
    }

    pub fn set_target_snappable(&mut self, target: SnapTargetType, enabled: bool) {
        if enabled == default_target_enabled(target) {
            self.targets.remove(&target);
        } else {
            self.targets.insert(target, enabled);
        }
    }

    /// Whether snapping to `target` is on: its category switch and every toggle it depends on.
    pub fn is_target_snappable(&self, target: SnapTargetType) -> bool {
        let category_on = target
            .category()
            .and_then(|c| c.toggle())
            .is_none_or(|toggle| self.is_target_enabled(toggle));
        category_on && target.toggles().iter().all(|t| self.is_target_enabled(*t))
    }

    pub fn is_any_target_snappable(&self, targets: &[SnapTargetType]) -> bool {
        targets.iter().any(|t| self.is_target_snappable(*t))
    }

    /// Whether points of this kind may snap at all.
    pub fn is_source_snappable(&self, source: SnapSourceType) -> bool {
        match source.category() {
            Some(SnapSourceCategory::BBox) => self.is_target_snappable(SnapTargetType::BBoxCategory),
            Some(SnapSourceCategory::Node) => self.is_target_snappable(SnapTargetType::NodeCategory),
            Some(SnapSourceCategory::Others) => self.is_target_snappable(SnapTargetType::OthersCategory),
            Some(SnapSourceCategory::Datums) => true,
            None => false,
        }
    }

    /// Whether `source` may snap to `target` under strict snapping.
    pub fn is_source_compatible(&self, source: SnapSourceType, target: SnapTargetType) -> bool {
        use super::candidate::SnapTargetCategory as Target;
        if !self.strict_snapping {
            return true;
        }
        match (source.category(), target.category()) {
            (Some(SnapSourceCategory::BBox), Some(Target::Node)) => false,
            (Some(SnapSourceCategory::Node), Some(Target::BBox)) => false,
            _ => true,
        }
    }

    /// Whether snapping is on and not held back.
    pub fn is_active(&self) -> bool {
        self.snap_enabled && !self.snap_postponed
    }
}

/// Whether a tolerance preference is the "always snap" sentinel.
pub fn is_always_snap(tolerance_px: f64) -> bool {
    tolerance_px >= ALWAYS_SNAP_TOLERANCE
}
