//! Probe scenes: a document, a view and the snaps to try in it.

use drafftsnap_core::document::{Document, SceneError, SceneResult};
use drafftsnap_core::geom::SnapConstraint;
use drafftsnap_core::snap::{
    IgnoredObject, SetupOptions, SnapCandidatePoint, SnapManager, SnapPreferences, SnapSourceType, SnappedPoint,
};
use drafftsnap_core::Camera;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What the viewer sees; decides the tolerances and what counts as on screen.
#[derive(Debug, Clone, Deserialize)]
pub struct View {
    pub center: Point,
    #[serde(default = "default_viewport")]
    pub viewport: Size,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_viewport() -> Size {
    Size::new(1280.0, 800.0)
}

fn default_zoom() -> f64 {
    1.0
}

fn default_source() -> SnapSourceType {
    SnapSourceType::NodeCusp
}

/// One snap to try. Each probe is its own gesture.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Probe {
    Free {
        point: Point,
        #[serde(default = "default_source")]
        source: SnapSourceType,
    },
    Constrained {
        point: Point,
        #[serde(default = "default_source")]
        source: SnapSourceType,
        constraint: SnapConstraint,
    },
    Angular {
        point: Point,
        #[serde(default = "default_source")]
        source: SnapSourceType,
        origin: Point,
        #[serde(default)]
        reference: Option<Point>,
        #[serde(default)]
        snaps_per_half_rotation: Option<u32>,
    },
    GridPitch {
        translation: Vec2,
        origin: Point,
    },
}

/// Result of one probe.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProbeOutcome {
    Snap(SnappedPoint),
    Translation { translation: Vec2 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub document: Document,
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub preferences: SnapPreferences,
    #[serde(default)]
    pub ignore: Vec<IgnoredObject>,
    #[serde(default)]
    pub probes: Vec<Probe>,
}

impl Scene {
    pub fn from_json(json: &str) -> SceneResult<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> SceneResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| SceneError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn camera(&self) -> Camera {
        match &self.view {
            Some(view) => Camera::centered_on(view.center, view.viewport, view.zoom),
            None => Camera::new(),
        }
    }

    /// Run every probe, in order.
    pub fn run(&self, manager: &mut SnapManager) -> Vec<ProbeOutcome> {
        let camera = self.camera();
        self.probes
            .iter()
            .map(|probe| {
                let options = SetupOptions {
                    ignore: self.ignore.clone(),
                    ..Default::default()
                };
                let mut session = manager.setup(&self.document, &camera, options);
                match probe {
                    Probe::Free { point, source } => {
                        ProbeOutcome::Snap(session.free_snap(&SnapCandidatePoint::new(*point, *source), None, false))
                    }
                    Probe::Constrained {
                        point,
                        source,
                        constraint,
                    } => ProbeOutcome::Snap(session.constrained_snap(
                        &SnapCandidatePoint::new(*point, *source),
                        constraint,
                        None,
                    )),
                    Probe::Angular {
                        point,
                        source,
                        origin,
                        reference,
                        snaps_per_half_rotation,
                    } => ProbeOutcome::Snap(session.constrained_angular_snap(
                        &SnapCandidatePoint::new(*point, *source),
                        *reference,
                        *origin,
                        *snaps_per_half_rotation,
                    )),
                    Probe::GridPitch { translation, origin } => ProbeOutcome::Translation {
                        translation: session.multiple_of_grid_pitch(*translation, *origin),
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENE: &str = r#"{
        "document": {
            "root": { "type": "group", "children": [] },
            "page": { "width": 800.0, "height": 600.0 },
            "grids": [ { "origin": { "x": 0.0, "y": 0.0 }, "spacing": { "x": 10.0, "y": 10.0 } } ]
        },
        "preferences": { "grid_tolerance": 5.0 },
        "ignore": [ { "type": "page" } ],
        "probes": [
            { "kind": "free", "point": { "x": 7.0, "y": 2.0 } },
            { "kind": "grid_pitch", "translation": { "x": 12.0, "y": -7.0 }, "origin": { "x": 0.0, "y": 0.0 } }
        ]
    }"#;

    #[test]
    fn test_runs_probes_in_order() {
        let scene = Scene::from_json(SCENE).unwrap();
        let mut manager = SnapManager::new(scene.preferences.clone());
        let outcomes = scene.run(&mut manager);
        assert_eq!(outcomes.len(), 2);

        let ProbeOutcome::Snap(snapped) = &outcomes[0] else {
            panic!("expected a snap");
        };
        assert!(snapped.snapped);
        assert!(snapped.point.distance(Point::new(10.0, 0.0)) < 1e-9);

        let ProbeOutcome::Translation { translation } = &outcomes[1] else {
            panic!("expected a translation");
        };
        assert!((*translation - Vec2::new(10.0, -10.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENE.as_bytes()).unwrap();
        let scene = Scene::load(file.path()).unwrap();
        assert_eq!(scene.probes.len(), 2);
        assert_eq!(scene.preferences.grid_tolerance, 5.0);
    }

    #[test]
    fn test_unknown_probe_is_a_parse_error() {
        let json = r#"{
            "document": { "root": { "type": "group", "children": [] }, "page": { "width": 1.0, "height": 1.0 } },
            "probes": [ { "kind": "teleport" } ]
        }"#;
        assert!(matches!(Scene::from_json(json), Err(SceneError::Parse(_))));
    }

    #[test]
    fn test_view_sets_zoom() {
        let json = r#"{
            "document": { "root": { "type": "group", "children": [] }, "page": { "width": 1.0, "height": 1.0 } },
            "view": { "center": { "x": 50.0, "y": 50.0 }, "zoom": 4.0 }
        }"#;
        let scene = Scene::from_json(json).unwrap();
        assert_eq!(scene.camera().current_zoom(), 4.0);
    }
}
