//! Renderer collaborator interface.
//!
//! The terrain and imagery engine lives outside this crate. Pair generation
//! only needs it to accept a camera pose, draw a frame, and project a world
//! point to the screen.

use glam::DVec3;
use thiserror::Error;

use super::validator::{ScreenPoint, Viewport};
use crate::camera::CameraPose;
use crate::coord::EnuFrame;

/// Which of the two views an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    First,
    Second,
}

impl ViewId {
    pub const BOTH: [ViewId; 2] = [ViewId::First, ViewId::Second];
}

/// Failure reported by a renderer.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("renderer failed: {0}")]
pub struct RenderError(pub String);

/// The operations pair generation needs from a scene renderer.
pub trait SceneRenderer {
    /// Size of the view in pixels.
    fn viewport(&self, view: ViewId) -> Viewport;

    /// Moves the view's camera.
    fn set_camera_pose(&mut self, view: ViewId, pose: &CameraPose) -> Result<(), RenderError>;

    /// Draws the view with its current camera.
    fn render_frame(&mut self, view: ViewId) -> Result<(), RenderError>;

    /// Projects an ECEF point into the view, or `None` when it cannot be
    /// projected (behind the camera, occluded, not yet rendered).
    fn project_to_screen(&self, view: ViewId, point: DVec3) -> Option<ScreenPoint>;
}

/// Default horizontal field of view for [`PinholeRenderer`].
pub const DEFAULT_HORIZONTAL_FOV_DEG: f64 = 60.0;

/// Ideal pinhole camera pair with no scene content.
///
/// Projection is exact perspective through the pose's look direction with
/// the horizon kept level. Points behind the camera do not project.
#[derive(Debug, Clone)]
pub struct PinholeRenderer {
    viewport: Viewport,
    horizontal_fov_deg: f64,
    poses: [Option<CameraPose>; 2],
    frames_rendered: u64,
}

impl PinholeRenderer {
    pub fn new(viewport: Viewport, horizontal_fov_deg: f64) -> Self {
        Self {
            viewport,
            horizontal_fov_deg,
            poses: [None, None],
            frames_rendered: 0,
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    fn slot(view: ViewId) -> usize {
        match view {
            ViewId::First => 0,
            ViewId::Second => 1,
        }
    }

    fn focal_length(&self) -> f64 {
        let half = (self.horizontal_fov_deg.to_radians() / 2.0).tan();
        (self.viewport.width / 2.0) / half
    }
}

impl Default for PinholeRenderer {
    fn default() -> Self {
        Self::new(Viewport::new(800.0, 600.0), DEFAULT_HORIZONTAL_FOV_DEG)
    }
}

impl SceneRenderer for PinholeRenderer {
    fn viewport(&self, _view: ViewId) -> Viewport {
        self.viewport
    }

    fn set_camera_pose(&mut self, view: ViewId, pose: &CameraPose) -> Result<(), RenderError> {
        self.poses[Self::slot(view)] = Some(*pose);
        Ok(())
    }

    fn render_frame(&mut self, view: ViewId) -> Result<(), RenderError> {
        if self.poses[Self::slot(view)].is_none() {
            return Err(RenderError(format!("{:?} view has no camera pose", view)));
        }
        self.frames_rendered += 1;
        Ok(())
    }

    fn project_to_screen(&self, view: ViewId, point: DVec3) -> Option<ScreenPoint> {
        let pose = self.poses[Self::slot(view)]?;

        let forward = pose.forward();
        let up = EnuFrame::at(pose.coordinate).up;
        let right = forward.cross(up).try_normalize().unwrap_or_else(|| {
            // Looking straight down or up; use east as the screen x axis
            EnuFrame::at(pose.coordinate).east
        });
        let camera_up = right.cross(forward);

        let d = point - pose.position;
        let depth = d.dot(forward);
        if depth <= 0.0 {
            return None;
        }

        let f = self.focal_length();
        Some(ScreenPoint::new(
            self.viewport.width / 2.0 + f * d.dot(right) / depth,
            self.viewport.height / 2.0 - f * d.dot(camera_up) / depth,
        ))
    }
}
