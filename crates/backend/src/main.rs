mod config;
mod graphql;
mod storage;

use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::ActiveConfig;
use graphql::Schema;

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full application router.
fn build_app(schema: Schema) -> Router {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .with_state(schema)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let map_config = config::load_map_config_from_env();
    let active = Arc::new(ActiveConfig::new(map_config));

    let db_path = config::db_path();
    let storage = storage::Storage::open(&db_path).inspect_err(|err| {
        tracing::error!(path = %db_path.display(), error = %err, "failed to open database");
    })?;

    let schema = graphql::build_schema(storage, active);
    let app = build_app(schema);

    let port = config::http_port();
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!(%addr, "server listening");
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
