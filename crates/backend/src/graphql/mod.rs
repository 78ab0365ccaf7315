use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Json, Object, SimpleObject, ID};
use replaiced_shared::{
    attack,
    config::MapConfig,
    coords,
    models::{self, BoxKind, Difficulty, MapConfiguration, Position},
    placement::{Placement, Placer},
};
use uuid::Uuid;

use crate::config::ActiveConfig;
use crate::storage::Storage;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlBoxKind {
    Default,
    OpenAi,
    Gemini,
    Llama,
}

impl From<BoxKind> for GqlBoxKind {
    fn from(k: BoxKind) -> Self {
        match k {
            BoxKind::Default => GqlBoxKind::Default,
            BoxKind::OpenAi => GqlBoxKind::OpenAi,
            BoxKind::Gemini => GqlBoxKind::Gemini,
            BoxKind::Llama => GqlBoxKind::Llama,
        }
    }
}

impl From<GqlBoxKind> for BoxKind {
    fn from(k: GqlBoxKind) -> Self {
        match k {
            GqlBoxKind::Default => BoxKind::Default,
            GqlBoxKind::OpenAi => BoxKind::OpenAi,
            GqlBoxKind::Gemini => BoxKind::Gemini,
            GqlBoxKind::Llama => BoxKind::Llama,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlDifficulty {
    Easy,
    Medium,
    Hard,
}

impl From<Difficulty> for GqlDifficulty {
    fn from(d: Difficulty) -> Self {
        match d {
            Difficulty::Easy => GqlDifficulty::Easy,
            Difficulty::Medium => GqlDifficulty::Medium,
            Difficulty::Hard => GqlDifficulty::Hard,
        }
    }
}

impl From<GqlDifficulty> for Difficulty {
    fn from(d: GqlDifficulty) -> Self {
        match d {
            GqlDifficulty::Easy => Difficulty::Easy,
            GqlDifficulty::Medium => Difficulty::Medium,
            GqlDifficulty::Hard => Difficulty::Hard,
        }
    }
}

// GraphQL output types

#[derive(SimpleObject, Clone)]
pub struct GqlPosition {
    pub x: f64,
    pub y: f64,
}

impl From<Position> for GqlPosition {
    fn from(p: Position) -> Self {
        GqlPosition { x: p.x, y: p.y }
    }
}

/// Public view of a box. The secret and system prompt are never exposed.
#[derive(SimpleObject)]
pub struct GqlBox {
    pub id: ID,
    pub name: String,
    pub position: GqlPosition,
    pub kind: GqlBoxKind,
    pub difficulty: GqlDifficulty,
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::AiBox> for GqlBox {
    fn from(b: models::AiBox) -> Self {
        GqlBox {
            id: ID(b.id.to_string()),
            name: b.name,
            position: b.position.into(),
            kind: b.kind.into(),
            difficulty: b.difficulty.into(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlPlacement {
    #[graphql(name = "box")]
    pub placed: GqlBox,
    /// True when the minimum spacing to other boxes could not be met.
    pub degraded: bool,
    pub clearance: Option<f64>,
}

#[derive(SimpleObject)]
pub struct GqlDifficultyCount {
    pub difficulty: GqlDifficulty,
    pub count: u64,
}

#[derive(SimpleObject)]
pub struct GqlKindCount {
    pub kind: GqlBoxKind,
    pub count: u64,
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub total_boxes: u64,
    pub db_size_bytes: u64,
    pub by_difficulty: Vec<GqlDifficultyCount>,
    pub by_kind: Vec<GqlKindCount>,
}

// Input types

#[derive(InputObject)]
pub struct PlaceBoxInput {
    pub name: String,
    pub kind: Option<GqlBoxKind>,
    pub difficulty: Option<GqlDifficulty>,
    pub secret: String,
    pub system_prompt: String,
}

/// Config edits replace every editable field at once.
#[derive(InputObject)]
pub struct UpdateBoxInput {
    pub id: ID,
    pub name: String,
    pub kind: GqlBoxKind,
    pub difficulty: GqlDifficulty,
    pub secret: String,
    pub system_prompt: String,
}

fn gql_err(e: impl std::fmt::Display) -> async_graphql::Error {
    async_graphql::Error::new(e.to_string())
}

fn parse_id(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str())
        .map_err(|_| async_graphql::Error::new(format!("Invalid box id: {}", id.as_str())))
}

fn checked_secret(secret: &str) -> async_graphql::Result<String> {
    let secret = attack::normalize_secret(secret);
    if secret.is_empty() {
        return Err(async_graphql::Error::new("Secret must not be empty"));
    }
    Ok(secret.to_string())
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn boxes(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlBox>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let boxes = storage.list_boxes().map_err(gql_err)?;
        Ok(boxes.into_iter().map(GqlBox::from).collect())
    }

    #[graphql(name = "box")]
    async fn find_box(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<GqlBox>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let found = storage
            .get_box(&parse_id(&id)?)
            .map_err(gql_err)?;
        Ok(found.map(GqlBox::from))
    }

    async fn map_config(&self, ctx: &Context<'_>) -> async_graphql::Result<Json<MapConfig>> {
        let active = ctx.data::<Arc<ActiveConfig>>()?;
        Ok(Json(active.get()))
    }

    async fn map_configurations(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<String>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        storage
            .map_configuration_names()
            .map_err(gql_err)
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let boxes = storage.list_boxes().map_err(gql_err)?;
        let db_size_bytes = storage
            .db_size_bytes()
            .map_err(gql_err)?;

        let by_difficulty = Difficulty::ALL
            .iter()
            .map(|d| GqlDifficultyCount {
                difficulty: (*d).into(),
                count: boxes.iter().filter(|b| b.difficulty == *d).count() as u64,
            })
            .collect();
        let by_kind = BoxKind::ALL
            .iter()
            .map(|k| GqlKindCount {
                kind: (*k).into(),
                count: boxes.iter().filter(|b| b.kind == *k).count() as u64,
            })
            .collect();

        Ok(GqlStats {
            total_boxes: boxes.len() as u64,
            db_size_bytes,
            by_difficulty,
            by_kind,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn place_box(
        &self,
        ctx: &Context<'_>,
        input: PlaceBoxInput,
    ) -> async_graphql::Result<GqlPlacement> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let config = ctx.data::<Arc<ActiveConfig>>()?.get();
        let secret = checked_secret(&input.secret)?;
        let placer = Placer::new(config.placement.clone(), config.world_size)
            .map_err(gql_err)?;

        let mut outcome: Option<Placement> = None;
        let created = storage
            .insert_box_with(|existing| {
                let positions: Vec<Position> = existing.iter().map(|b| b.position).collect();
                let placement = placer.place_new_entity(&positions, &mut rand::thread_rng());
                outcome = Some(placement);
                let now = chrono::Utc::now().to_rfc3339();
                models::AiBox {
                    id: Uuid::new_v4(),
                    name: input.name,
                    position: placement.position(),
                    kind: input.kind.map(Into::into).unwrap_or_default(),
                    difficulty: input.difficulty.map(Into::into).unwrap_or_default(),
                    secret,
                    system_prompt: input.system_prompt,
                    created_at: now.clone(),
                    updated_at: now,
                }
            })
            .map_err(gql_err)?;

        let degraded = outcome.is_some_and(|p| p.is_degraded());
        let clearance = outcome.and_then(|p| p.clearance());
        if degraded {
            tracing::warn!(
                id = %created.id,
                clearance = clearance.unwrap_or_default(),
                min_distance = config.placement.min_box_distance,
                "box placed without full spacing"
            );
        } else {
            tracing::info!(id = %created.id, x = created.position.x, y = created.position.y, "box placed");
        }

        Ok(GqlPlacement {
            placed: created.into(),
            degraded,
            clearance,
        })
    }

    async fn update_box(
        &self,
        ctx: &Context<'_>,
        input: UpdateBoxInput,
    ) -> async_graphql::Result<GqlBox> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let id = parse_id(&input.id)?;
        let secret = checked_secret(&input.secret)?;

        let record = storage
            .modify_box_with(&id, |record| {
                record.name = input.name;
                record.kind = input.kind.into();
                record.difficulty = input.difficulty.into();
                record.secret = secret;
                record.system_prompt = input.system_prompt;
                record.updated_at = chrono::Utc::now().to_rfc3339();
            })
            .map_err(gql_err)?
            .ok_or_else(|| async_graphql::Error::new("Box not found"))?;

        Ok(GqlBox::from(record))
    }

    async fn move_box(
        &self,
        ctx: &Context<'_>,
        id: ID,
        x: f64,
        y: f64,
    ) -> async_graphql::Result<GqlBox> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let world_size = ctx.data::<Arc<ActiveConfig>>()?.get().world_size;
        let id = parse_id(&id)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(async_graphql::Error::new("Position must be finite"));
        }
        let position = coords::clamp_position(Position::new(x, y), world_size);

        let record = storage
            .modify_box_with(&id, |record| {
                record.position = position;
                record.updated_at = chrono::Utc::now().to_rfc3339();
            })
            .map_err(gql_err)?
            .ok_or_else(|| async_graphql::Error::new("Box not found"))?;

        Ok(GqlBox::from(record))
    }

    async fn delete_box(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let id = parse_id(&id)?;
        let removed = storage
            .delete_box(&id)
            .map_err(gql_err)?;
        if removed {
            tracing::info!(id = %id, "box deleted");
        }
        Ok(removed)
    }

    async fn clear_boxes(&self, ctx: &Context<'_>) -> async_graphql::Result<u64> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let removed = storage
            .clear_boxes()
            .map_err(gql_err)?;
        tracing::info!(removed, "all boxes cleared");
        Ok(removed)
    }

    async fn save_map_configuration(
        &self,
        ctx: &Context<'_>,
        name: String,
        config: Json<MapConfig>,
    ) -> async_graphql::Result<String> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(async_graphql::Error::new("Configuration name must not be empty"));
        }
        let config = config.0;
        config
            .validate()
            .map_err(gql_err)?;

        storage
            .save_map_configuration(&MapConfiguration {
                name: name.clone(),
                config,
                saved_at: chrono::Utc::now().to_rfc3339(),
            })
            .map_err(gql_err)?;
        Ok(name)
    }

    async fn load_map_configuration(
        &self,
        ctx: &Context<'_>,
        name: String,
    ) -> async_graphql::Result<Json<MapConfig>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let active = ctx.data::<Arc<ActiveConfig>>()?;
        let saved = storage
            .get_map_configuration(&name)
            .map_err(gql_err)?
            .ok_or_else(|| async_graphql::Error::new(format!("Unknown map configuration: {name}")))?;

        // validation rules may have changed since the record was saved
        saved
            .config
            .validate()
            .map_err(gql_err)?;
        active.set(saved.config.clone());
        // boxes placed under a larger world must stay inside the new bounds
        let moved = storage
            .clamp_boxes_to_world(saved.config.world_size, &chrono::Utc::now().to_rfc3339())
            .map_err(gql_err)?;
        if moved > 0 {
            tracing::warn!(name = %saved.name, moved, "boxes clamped into smaller world");
        }
        tracing::info!(name = %saved.name, "map configuration loaded");
        Ok(Json(saved.config))
    }

    /// Check a model reply for the box's secret without revealing the secret.
    async fn check_attack(
        &self,
        ctx: &Context<'_>,
        box_id: ID,
        response: String,
    ) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let id = parse_id(&box_id)?;
        let record = storage
            .get_box(&id)
            .map_err(gql_err)?
            .ok_or_else(|| async_graphql::Error::new("Box not found"))?;

        let revealed = attack::secret_revealed(&response, &record.secret);
        if revealed {
            tracing::info!(id = %id, "secret revealed");
        }
        Ok(revealed)
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(storage: Arc<Storage>, active: Arc<ActiveConfig>) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(storage)
        .data(active)
        .finish()
}
