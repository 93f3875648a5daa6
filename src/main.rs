use clap::Parser;
use recipe_recommender::{
    api::{routes, AppState},
    cli::{commands, Cli, Commands},
    config::{tables::RuleTables, Settings},
    recommender::RecommendationRequest,
    Error, Recommender, Result,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_recommender=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Recommend {
            query,
            restrictions,
            allergies,
            condition,
            cuisine,
            diversity,
        } => {
            let request = RecommendationRequest {
                query,
                restrictions,
                allergies,
                health_condition: condition,
                cuisine,
                diversity,
            };
            commands::recommend(&server_url(&settings), &request).await?;
        }
        Commands::Substitute {
            ingredient,
            allergies,
            cuisine,
        } => {
            let tables = RuleTables::load(settings.rules_path.as_deref())?;
            commands::substitute(&tables, &ingredient, &allergies, cuisine.as_deref())?;
        }
        Commands::Ingest { input } => {
            commands::ingest(&settings, &input).await?;
        }
        Commands::CheckRules { path } => {
            commands::check_rules(path.as_deref().or(settings.rules_path.as_deref()))?;
        }
    }

    Ok(())
}

fn server_url(settings: &Settings) -> String {
    settings
        .server
        .external_url
        .clone()
        .unwrap_or_else(|| format!("http://{}:{}", settings.server.host, settings.server.port))
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting recipe recommender");
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    let tables = Arc::new(RuleTables::load(settings.rules_path.as_deref())?);
    info!(
        "Rule tables loaded: {} health conditions, {} cuisines",
        tables.health_conditions.len(),
        tables.cuisines.len()
    );

    // Both services must be reachable before serving; failure here is fatal
    let recommender = Recommender::connect(&settings, tables).await?;
    info!(
        "Search services ready (index '{}', dimension {})",
        settings.vector.index_name,
        recommender.dimension()
    );

    let state = AppState {
        recommender: Arc::new(recommender),
        settings: settings.clone(),
    };

    let app = routes::create_router(state, &settings)?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Recipe Recommender");
    println!("========================================");
    println!("Status: Running");
    println!("Address: http://{addr}");
    println!("Vector Index: {}", settings.vector.index_name);
    println!("Embedding Model: {}", settings.embedding.model);
    println!("\nAPI Endpoints:");
    println!("  POST /api/recommend");
    println!("  GET  /api/substitutions");
    println!("  GET  /api/options");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}
