use rand::Rng;

use crate::config::{check_world_size, ConfigError, PlacementConfig};
use crate::coords::clamp_position;
use crate::models::Position;

/// Result of a placement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Every existing box is at least `min_box_distance` away.
    Spaced {
        position: Position,
        clearance: Option<f64>,
    },
    /// No sample met the spacing target; this is the best one found.
    /// Advisory only, the position is still usable.
    Degraded { position: Position, clearance: f64 },
}

impl Placement {
    pub fn position(&self) -> Position {
        match *self {
            Placement::Spaced { position, .. } | Placement::Degraded { position, .. } => position,
        }
    }

    /// Distance to the nearest existing box, `None` if there were none.
    pub fn clearance(&self) -> Option<f64> {
        match *self {
            Placement::Spaced { clearance, .. } => clearance,
            Placement::Degraded { clearance, .. } => Some(clearance),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Placement::Degraded { .. })
    }
}

/// Picks spawn points for new boxes by rejection sampling around a center.
#[derive(Debug, Clone, PartialEq)]
pub struct Placer {
    config: PlacementConfig,
    world_size: f64,
}

impl Placer {
    pub fn new(config: PlacementConfig, world_size: f64) -> Result<Self, ConfigError> {
        check_world_size(world_size)?;
        config.validate()?;
        Ok(Placer { config, world_size })
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Position {
        let radius = self.config.spawn_radius_for(self.world_size);
        // sqrt keeps the density uniform over the disk area
        let r = radius * rng.gen::<f64>().sqrt();
        let theta = rng.gen_range(0.0..std::f64::consts::TAU);
        let center = self.config.center;
        clamp_position(
            Position {
                x: center.x + r * theta.cos(),
                y: center.y + r * theta.sin(),
            },
            self.world_size,
        )
    }

    /// Bounded number of samples; first one that clears every existing box wins.
    pub fn place_new_entity<R: Rng>(
        &self,
        existing: &[Position],
        rng: &mut R,
    ) -> Placement {
        let mut best: Option<(Position, f64)> = None;

        for _ in 0..self.config.attempts {
            let candidate = self.sample(rng);
            let clearance = existing
                .iter()
                .map(|p| p.distance_to(candidate))
                .fold(f64::INFINITY, f64::min);

            if clearance >= self.config.min_box_distance {
                return Placement::Spaced {
                    position: candidate,
                    clearance: clearance.is_finite().then_some(clearance),
                };
            }
            if best.map_or(true, |(_, d)| clearance > d) {
                best = Some((candidate, clearance));
            }
        }

        // attempts >= 1 is checked in the constructor, so best is set
        let (position, clearance) = best.unwrap_or((self.config.center, 0.0));
        Placement::Degraded {
            position,
            clearance,
        }
    }
}
