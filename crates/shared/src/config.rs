//! Map configuration value object.
//!
//! Every component takes its section of [`MapConfig`] at construction and
//! validates it there, so a bad value fails once instead of on every call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Position;

pub const DEFAULT_WORLD_SIZE: f64 = 70.0;

pub const DEFAULT_MINIMAP_SIZE: f64 = 200.0;
pub const DEFAULT_MINIMAP_PADDING: f64 = 10.0;

pub const DEFAULT_ZOOM: f64 = 1.3;
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;
pub const DRAG_SPEED: f64 = 0.02;
pub const PAN_LIMIT: f64 = 0.5;

pub const MIN_BOX_DISTANCE: f64 = 2.0;
pub const PLACEMENT_ATTEMPTS: u32 = 20;

pub const ATTACK_ANIMATION_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidConfiguration(reason.into())
}

pub(crate) fn check_world_size(world_size: f64) -> Result<(), ConfigError> {
    if !world_size.is_finite() || world_size <= 0.0 {
        return Err(invalid(format!("world size must be positive, got {world_size}")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinimapConfig {
    pub display_size: f64,
    pub padding: f64,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        MinimapConfig {
            display_size: DEFAULT_MINIMAP_SIZE,
            padding: DEFAULT_MINIMAP_PADDING,
        }
    }
}

impl MinimapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(invalid(format!("padding must be non-negative, got {}", self.padding)));
        }
        if !self.display_size.is_finite() || self.display_size <= 2.0 * self.padding {
            return Err(invalid(format!(
                "display size {} leaves no room inside padding {}",
                self.display_size, self.padding
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub drag_speed: f64,
    pub invert_x: bool,
    pub invert_y: bool,
    /// Max distance of the camera center from origin, as a fraction of world size.
    pub pan_limit: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            default_zoom: DEFAULT_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_step: ZOOM_STEP,
            drag_speed: DRAG_SPEED,
            invert_x: true,
            invert_y: false,
            pan_limit: PAN_LIMIT,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom > 0.0) {
            return Err(invalid(format!("min zoom must be positive, got {}", self.min_zoom)));
        }
        if !(self.min_zoom <= self.max_zoom) {
            return Err(invalid(format!(
                "min zoom {} exceeds max zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.default_zoom >= self.min_zoom && self.default_zoom <= self.max_zoom) {
            return Err(invalid(format!(
                "default zoom {} outside [{}, {}]",
                self.default_zoom, self.min_zoom, self.max_zoom
            )));
        }
        if !(self.zoom_step > 0.0) {
            return Err(invalid("zoom step must be positive"));
        }
        if !(self.drag_speed > 0.0) {
            return Err(invalid("drag speed must be positive"));
        }
        if !(self.pan_limit > 0.0) {
            return Err(invalid("pan limit must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacementConfig {
    pub min_box_distance: f64,
    pub attempts: u32,
    /// Sampling disk radius. `None` means a quarter of the world size.
    pub spawn_radius: Option<f64>,
    pub center: Position,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig {
            min_box_distance: MIN_BOX_DISTANCE,
            attempts: PLACEMENT_ATTEMPTS,
            spawn_radius: None,
            center: Position::ORIGIN,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_box_distance >= 0.0) {
            return Err(invalid("min box distance must be non-negative"));
        }
        if self.attempts == 0 {
            return Err(invalid("placement needs at least one attempt"));
        }
        if let Some(r) = self.spawn_radius {
            if !(r > 0.0) || !r.is_finite() {
                return Err(invalid(format!("spawn radius must be positive, got {r}")));
            }
        }
        Ok(())
    }

    pub fn spawn_radius_for(&self, world_size: f64) -> f64 {
        self.spawn_radius.unwrap_or(world_size / 4.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttackConfig {
    pub animation_ms: u64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        AttackConfig {
            animation_ms: ATTACK_ANIMATION_MS,
        }
    }
}

impl AttackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.animation_ms == 0 {
            return Err(invalid("attack animation duration must be non-zero"));
        }
        Ok(())
    }
}

/// Everything the map session needs, passed explicitly to each component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub world_size: f64,
    pub minimap: MinimapConfig,
    pub camera: CameraConfig,
    pub placement: PlacementConfig,
    pub attack: AttackConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            world_size: DEFAULT_WORLD_SIZE,
            minimap: MinimapConfig::default(),
            camera: CameraConfig::default(),
            placement: PlacementConfig::default(),
            attack: AttackConfig::default(),
        }
    }
}

impl MapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_world_size(self.world_size)?;
        self.minimap.validate()?;
        self.camera.validate()?;
        self.placement.validate()?;
        self.attack.validate()
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}
