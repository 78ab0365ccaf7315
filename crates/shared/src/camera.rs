use serde::{Deserialize, Serialize};

use crate::config::{check_world_size, CameraConfig, ConfigError};
use crate::models::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    pub fn sign(self) -> f64 {
        match self {
            ZoomDirection::In => 1.0,
            ZoomDirection::Out => -1.0,
        }
    }

    /// Wheel scrolling down (positive delta) zooms out.
    pub fn from_wheel(delta_y: f64) -> Option<Self> {
        if delta_y > 0.0 {
            Some(ZoomDirection::Out)
        } else if delta_y < 0.0 {
            Some(ZoomDirection::In)
        } else {
            None
        }
    }
}

/// Camera center in world coordinates plus zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub position: Position,
    pub zoom: f64,
}

/// Applies drag and zoom input to a [`Viewport`] within configured bounds.
/// Never mutates its input; every operation returns the next value.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    config: CameraConfig,
    world_size: f64,
}

impl ViewportController {
    pub fn new(config: CameraConfig, world_size: f64) -> Result<Self, ConfigError> {
        check_world_size(world_size)?;
        config.validate()?;
        Ok(ViewportController { config, world_size })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn pan_bound(&self) -> f64 {
        self.config.pan_limit * self.world_size
    }

    fn clamp_pan(&self, pos: Position) -> Position {
        let bound = self.pan_bound();
        Position {
            x: pos.x.clamp(-bound, bound),
            y: pos.y.clamp(-bound, bound),
        }
    }

    /// Screen-space drag delta to a new camera center. The delta is scaled by
    /// `drag_speed / zoom` so a drag covers the same screen distance at any zoom.
    ///
    /// A zoom that is not a positive finite number has no scale, so the
    /// position comes back unchanged.
    pub fn apply_drag(&self, position: Position, dx: f64, dy: f64, zoom: f64) -> Position {
        if !zoom.is_finite() || zoom <= 0.0 {
            return position;
        }
        let scale = self.config.drag_speed / zoom;
        let mut mx = dx * scale;
        let mut my = dy * scale;
        if self.config.invert_x {
            mx = -mx;
        }
        if self.config.invert_y {
            my = -my;
        }
        self.clamp_pan(Position {
            x: position.x + mx,
            y: position.y + my,
        })
    }

    pub fn apply_zoom_step(&self, direction: ZoomDirection, zoom: f64) -> f64 {
        (zoom + direction.sign() * self.config.zoom_step)
            .clamp(self.config.min_zoom, self.config.max_zoom)
    }

    pub fn reset_to_default(&self) -> Viewport {
        Viewport {
            position: Position::ORIGIN,
            zoom: self.config.default_zoom,
        }
    }

    pub fn drag(&self, viewport: Viewport, dx: f64, dy: f64) -> Viewport {
        Viewport {
            position: self.apply_drag(viewport.position, dx, dy, viewport.zoom),
            zoom: viewport.zoom,
        }
    }

    pub fn zoom(&self, viewport: Viewport, direction: ZoomDirection) -> Viewport {
        Viewport {
            position: viewport.position,
            zoom: self.apply_zoom_step(direction, viewport.zoom),
        }
    }

    /// Jump the camera to a world position, e.g. from a minimap click.
    pub fn center_on(&self, target: Position, viewport: Viewport) -> Viewport {
        Viewport {
            position: self.clamp_pan(target),
            zoom: viewport.zoom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_ZOOM, MIN_ZOOM};

    fn controller() -> ViewportController {
        ViewportController::new(CameraConfig::default(), 70.0).unwrap()
    }

    #[test]
    fn test_inverted_bounds_fail_at_construction() {
        let cfg = CameraConfig {
            min_zoom: 3.0,
            max_zoom: 1.0,
            default_zoom: 2.0,
            ..CameraConfig::default()
        };
        assert!(matches!(
            ViewportController::new(cfg, 70.0),
            Err(ConfigError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_bad_world_size_fails_at_construction() {
        assert!(ViewportController::new(CameraConfig::default(), -1.0).is_err());
    }

    #[test]
    fn test_drag_scaled_by_zoom_and_inverted_x() {
        let c = controller();
        let pos = c.apply_drag(Position::ORIGIN, 10.0, 0.0, 1.3);
        let expected = -(10.0 * 0.02 / 1.3);
        assert!((pos.x - expected).abs() < 1e-9);
        assert!((pos.x + 0.1538).abs() < 1e-4);
        assert_eq!(pos.y, 0.0);
    }

    #[test]
    fn test_drag_y_not_inverted_by_default() {
        let c = controller();
        let pos = c.apply_drag(Position::ORIGIN, 0.0, 50.0, 1.0);
        assert!((pos.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_respects_pan_limit() {
        let c = controller();
        let pos = c.apply_drag(Position::ORIGIN, -1e6, 1e6, 1.0);
        assert_eq!(pos, Position::new(35.0, 35.0));
    }

    #[test]
    fn test_drag_uses_caller_zoom_below_min() {
        let c = controller();
        let pos = c.apply_drag(Position::ORIGIN, 0.0, 5.0, 0.25);
        assert!((pos.y - 5.0 * 0.02 / 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_drag_with_unusable_zoom_keeps_position() {
        let c = controller();
        let start = Position::new(3.0, -2.0);
        for zoom in [f64::NAN, f64::INFINITY, 0.0, -1.0] {
            assert_eq!(c.apply_drag(start, 10.0, 10.0, zoom), start);
        }
    }

    #[test]
    fn test_drags_accumulate_in_order() {
        let c = controller();
        let mut vp = c.reset_to_default();
        for _ in 0..4 {
            vp = c.drag(vp, -13.0, 0.0);
        }
        let expected = 4.0 * 13.0 * 0.02 / 1.3;
        assert!((vp.position.x - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_stays_within_bounds() {
        let c = controller();
        let mut zoom = c.reset_to_default().zoom;
        let pattern = [
            ZoomDirection::In,
            ZoomDirection::In,
            ZoomDirection::Out,
            ZoomDirection::In,
        ];
        for _ in 0..50 {
            for dir in pattern {
                zoom = c.apply_zoom_step(dir, zoom);
                assert!((MIN_ZOOM..=MAX_ZOOM).contains(&zoom));
            }
        }
        assert!((zoom - MAX_ZOOM).abs() < 1e-9);
        for _ in 0..100 {
            zoom = c.apply_zoom_step(ZoomDirection::Out, zoom);
            assert!((MIN_ZOOM..=MAX_ZOOM).contains(&zoom));
        }
        assert!((zoom - MIN_ZOOM).abs() < 1e-9);
    }

    #[test]
    fn test_single_zoom_step() {
        let c = controller();
        let z = c.apply_zoom_step(ZoomDirection::In, 1.3);
        assert!((z - 1.4).abs() < 1e-9);
        let z = c.apply_zoom_step(ZoomDirection::Out, 1.3);
        assert!((z - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_reset_to_default() {
        let c = controller();
        let vp = c.reset_to_default();
        assert_eq!(vp.position, Position::ORIGIN);
        assert!((vp.zoom - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_center_on_clamps_and_keeps_zoom() {
        let c = controller();
        let vp = Viewport {
            position: Position::ORIGIN,
            zoom: 2.0,
        };
        let moved = c.center_on(Position::new(-100.0, 4.0), vp);
        assert_eq!(moved.position, Position::new(-35.0, 4.0));
        assert_eq!(moved.zoom, 2.0);
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(ZoomDirection::from_wheel(120.0), Some(ZoomDirection::Out));
        assert_eq!(ZoomDirection::from_wheel(-3.0), Some(ZoomDirection::In));
        assert_eq!(ZoomDirection::from_wheel(0.0), None);
    }
}
