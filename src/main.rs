use std::sync::Arc;

use db8z::{
    create_router,
    message::{InMemoryMessageStore, MessageStore, PostgresMessageStore},
    room::{InMemoryRoomDirectory, PostgresRoomDirectory, RoomDirectory},
    AppState, JwtAuthVerifier, ServerConfig, TokenConfig,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TOKEN_EXPIRATION_DAYS: i64 = 365;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "db8z=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting debate server");

    let config = ServerConfig::from_env();

    let (room_directory, message_store): (Arc<dyn RoomDirectory>, Arc<dyn MessageStore>) =
        match &config.database_url {
            Some(database_url) => {
                let pool = sqlx::PgPool::connect(database_url).await?;
                info!("Using PostgreSQL room directory and message store");
                (
                    Arc::new(PostgresRoomDirectory::new(pool.clone())),
                    Arc::new(PostgresMessageStore::new(pool)),
                )
            }
            None => {
                info!(
                    seed_rooms = config.seed_rooms.len(),
                    "DATABASE_URL not set, using in-memory storage"
                );
                (
                    Arc::new(InMemoryRoomDirectory::with_rooms(config.seed_rooms.clone())),
                    Arc::new(InMemoryMessageStore::new()),
                )
            }
        };

    let verifier = Arc::new(JwtAuthVerifier::new(TokenConfig::new(
        config.jwt_secret.clone(),
        TOKEN_EXPIRATION_DAYS,
    )));

    let address = format!("0.0.0.0:{}", config.port);
    let app_state = AppState::new(config, verifier, room_directory, message_store);
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on {}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
