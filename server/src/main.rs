use pocket_server::config::ServerConfig;
use pocket_server::game_loop::{run_game_loop, GameCommand};
use pocket_server::ws::{router, AppState};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let app_state = AppState::new(game_tx, &config);

    // Spawn game loop
    tokio::spawn(async move {
        run_game_loop(game_rx, config).await;
    });

    let app = router(app_state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting pocket server on {}", listen_addr);
    println!("Pocket server listening on {}", listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server stopped");
    }
}
