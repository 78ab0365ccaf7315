use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MapConfig;

/// Model family a box is backed by. Selects the visual style on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoxKind {
    #[default]
    Default,
    OpenAi,
    Gemini,
    Llama,
}

impl BoxKind {
    pub const ALL: [BoxKind; 4] = [
        BoxKind::Default,
        BoxKind::OpenAi,
        BoxKind::Gemini,
        BoxKind::Llama,
    ];
}

impl std::fmt::Display for BoxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxKind::Default => write!(f, "Default"),
            BoxKind::OpenAi => write!(f, "OpenAI"),
            BoxKind::Gemini => write!(f, "Gemini"),
            BoxKind::Llama => write!(f, "Llama"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// World-space coordinates. Origin is the map center, +Y is "up".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    /// Euclidean distance between two positions.
    pub fn distance_to(self, other: Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A placed AI persona. `secret` and `system_prompt` never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBox {
    pub id: Uuid,
    pub name: String,
    pub position: Position,
    pub kind: BoxKind,
    pub difficulty: Difficulty,
    pub secret: String,
    pub system_prompt: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A named snapshot of map settings that can be saved and restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfiguration {
    pub name: String,
    pub config: MapConfig,
    pub saved_at: String,
}
