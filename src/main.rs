use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse::{config::Config, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let identities = db::load_identities(&config.users_db_path)
        .await
        .with_context(|| format!("Failed to load {}", config.users_db_path.display()))?;

    let state = AppState::new(&config, identities).context("Failed to build app state")?;
    tracing::info!("✅ AppState initialized");

    let sweep_state = state.clone();
    let sweep_interval = config.sweep_interval;
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = sweep_state.auth.sweep_expired();
            if removed > 0 {
                tracing::info!("🧹 Swept {} expired sessions", removed);
            } else {
                tracing::debug!("🧹 Sweep found no expired sessions");
            }
        }
    });
    tracing::info!(
        "✅ Background session sweep started (every {}s)",
        sweep_interval.as_secs()
    );

    let app = gatehouse::router(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    finish(served, &config, &state).await
}

/// Saves the users file, whether or not the server stopped cleanly, then
/// reports how the server stopped.
async fn finish(served: std::io::Result<()>, config: &Config, state: &AppState) -> anyhow::Result<()> {
    match &served {
        Ok(()) => tracing::info!("👋 Shutting down, saving users..."),
        Err(e) => tracing::error!("❌ Server stopped with an error, saving users: {}", e),
    }

    db::save_identities(&config.users_db_path, &state.auth.credentials().snapshot())
        .await
        .with_context(|| format!("Failed to save {}", config.users_db_path.display()))?;

    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use gatehouse::config::HashingParams;
    use gatehouse::services::auth::NewAccount;

    use super::*;

    async fn state_with_ann(config: &Config) -> AppState {
        let state = AppState::new(config, HashMap::new()).unwrap();
        state
            .auth
            .signup(NewAccount {
                first: "Ann",
                last: "Lee",
                username: "ann",
                password: "p1",
                password_confirmation: "p1",
            })
            .await
            .unwrap();
        state
    }

    fn config_in(dir: &tempfile::TempDir) -> Config {
        Config {
            users_db_path: dir.path().join("users.json"),
            hashing: HashingParams {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn users_are_saved_when_the_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let state = state_with_ann(&config).await;

        let served = Err(std::io::Error::other("accept loop died"));
        let err = finish(served, &config, &state).await.unwrap_err();

        assert!(format!("{:#}", err).contains("accept loop died"));
        let saved = db::load_identities(&config.users_db_path).await.unwrap();
        assert!(saved.contains_key("ann"));
    }

    #[tokio::test]
    async fn clean_shutdown_saves_users() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let state = state_with_ann(&config).await;

        finish(Ok(()), &config, &state).await.unwrap();

        let saved = db::load_identities(&config.users_db_path).await.unwrap();
        assert_eq!(saved.len(), 1);
    }
}
