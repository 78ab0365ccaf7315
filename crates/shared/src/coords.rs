use crate::config::{check_world_size, ConfigError, MinimapConfig};
use crate::models::Position;

fn check_display(display_size: f64, padding: f64) -> Result<(), ConfigError> {
    MinimapConfig {
        display_size,
        padding,
    }
    .validate()
}

/// Map a world coordinate in `[-world_size/2, world_size/2]` onto
/// `[padding, display_size - padding]`.
pub fn world_to_display(
    value: f64,
    world_size: f64,
    display_size: f64,
    padding: f64,
) -> Result<f64, ConfigError> {
    check_world_size(world_size)?;
    check_display(display_size, padding)?;
    let usable = display_size - 2.0 * padding;
    Ok((value + world_size / 2.0) / world_size * usable + padding)
}

/// Inverse of [`world_to_display`].
pub fn display_to_world(
    value: f64,
    world_size: f64,
    display_size: f64,
    padding: f64,
) -> Result<f64, ConfigError> {
    check_world_size(world_size)?;
    check_display(display_size, padding)?;
    let usable = display_size - 2.0 * padding;
    Ok((value - padding) / usable * world_size - world_size / 2.0)
}

/// Clamp each axis independently to the world bounds.
pub fn clamp_to_world(x: f64, y: f64, world_size: f64) -> (f64, f64) {
    // f64::clamp panics on inverted or NaN bounds
    let half = (world_size / 2.0).abs();
    if half.is_nan() {
        return (x, y);
    }
    (x.clamp(-half, half), y.clamp(-half, half))
}

pub fn clamp_position(pos: Position, world_size: f64) -> Position {
    let (x, y) = clamp_to_world(pos.x, pos.y, world_size);
    Position { x, y }
}

/// World <-> minimap projection with validated parameters.
///
/// Display space has +Y pointing down. With `invert_y` set (the usual case),
/// world "up" maps to the top of the minimap on both the forward and reverse path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapProjection {
    world_size: f64,
    display_size: f64,
    padding: f64,
    invert_y: bool,
}

impl MinimapProjection {
    pub fn new(
        world_size: f64,
        minimap: &MinimapConfig,
        invert_y: bool,
    ) -> Result<Self, ConfigError> {
        check_world_size(world_size)?;
        minimap.validate()?;
        Ok(MinimapProjection {
            world_size,
            display_size: minimap.display_size,
            padding: minimap.padding,
            invert_y,
        })
    }

    fn usable(&self) -> f64 {
        self.display_size - 2.0 * self.padding
    }

    fn to_display(&self, v: f64) -> f64 {
        (v + self.world_size / 2.0) / self.world_size * self.usable() + self.padding
    }

    fn to_world(&self, d: f64) -> f64 {
        (d - self.padding) / self.usable() * self.world_size - self.world_size / 2.0
    }

    /// World position to minimap pixels.
    pub fn project(&self, pos: Position) -> (f64, f64) {
        let y = if self.invert_y { -pos.y } else { pos.y };
        (self.to_display(pos.x), self.to_display(y))
    }

    /// Minimap pixels to a world position, clamped to the world.
    pub fn unproject(&self, px: f64, py: f64) -> Position {
        let x = self.to_world(px);
        let y = self.to_world(py);
        let y = if self.invert_y { -y } else { y };
        clamp_position(Position { x, y }, self.world_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_edges_map_to_padding() {
        let lo = world_to_display(-35.0, 70.0, 200.0, 10.0).unwrap();
        let hi = world_to_display(35.0, 70.0, 200.0, 10.0).unwrap();
        assert!((lo - 10.0).abs() < 1e-9);
        assert!((hi - 190.0).abs() < 1e-9);
    }

    #[test]
    fn test_world_center_maps_to_display_center() {
        let mid = world_to_display(0.0, 70.0, 200.0, 10.0).unwrap();
        assert!((mid - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip_within_epsilon() {
        let cases = [
            (-35.0, 70.0, 200.0, 10.0),
            (12.345, 70.0, 200.0, 10.0),
            (0.0, 1.0, 3.0, 1.0),
            (499.9, 1000.0, 150.0, 0.0),
            (-0.001, 0.5, 64.0, 31.0),
        ];
        for (v, w, d, p) in cases {
            let disp = world_to_display(v, w, d, p).unwrap();
            let back = display_to_world(disp, w, d, p).unwrap();
            assert!((back - v).abs() < 1e-9, "{v} -> {disp} -> {back}");
        }
    }

    #[test]
    fn test_display_not_larger_than_padding_is_error() {
        assert!(matches!(
            world_to_display(0.0, 70.0, 20.0, 10.0),
            Err(ConfigError::InvalidConfiguration(_))
        ));
        assert!(display_to_world(0.0, 70.0, 10.0, 10.0).is_err());
    }

    #[test]
    fn test_non_positive_world_is_error() {
        assert!(world_to_display(0.0, 0.0, 200.0, 10.0).is_err());
        assert!(display_to_world(0.0, -5.0, 200.0, 10.0).is_err());
    }

    #[test]
    fn test_clamp_each_axis() {
        assert_eq!(clamp_to_world(100.0, -3.0, 70.0), (35.0, -3.0));
        assert_eq!(clamp_to_world(-100.0, 40.0, 70.0), (-35.0, 35.0));
    }

    #[test]
    fn test_clamp_idempotent() {
        let samples = [
            (0.0, 0.0, 70.0),
            (99.0, -99.0, 70.0),
            (35.0, 35.0, 70.0),
            (-0.5, 0.49, 1.0),
            (1e9, -1e9, 3.0),
        ];
        for (x, y, s) in samples {
            let once = clamp_to_world(x, y, s);
            let twice = clamp_to_world(once.0, once.1, s);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_projection_inverts_y() {
        let proj = MinimapProjection::new(70.0, &MinimapConfig::default(), true).unwrap();
        let (_, top) = proj.project(Position::new(0.0, 35.0));
        let (_, bottom) = proj.project(Position::new(0.0, -35.0));
        assert!((top - 10.0).abs() < 1e-9);
        assert!((bottom - 190.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_roundtrip() {
        for invert_y in [true, false] {
            let proj =
                MinimapProjection::new(70.0, &MinimapConfig::default(), invert_y).unwrap();
            let p = Position::new(-12.25, 7.5);
            let (px, py) = proj.project(p);
            let back = proj.unproject(px, py);
            assert!((back.x - p.x).abs() < 1e-9);
            assert!((back.y - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unproject_clamps_outside_click() {
        let proj = MinimapProjection::new(70.0, &MinimapConfig::default(), true).unwrap();
        let p = proj.unproject(0.0, 200.0);
        assert_eq!(p, Position::new(-35.0, -35.0));
    }

    #[test]
    fn test_projection_rejects_bad_config() {
        let bad = MinimapConfig {
            display_size: 10.0,
            padding: 5.0,
        };
        assert!(MinimapProjection::new(70.0, &bad, true).is_err());
    }
}
