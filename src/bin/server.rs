use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    process::ExitCode,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use securebank::{
    AppState, SECRET_KEY_ENV, build_router, graceful_shutdown, load_secret_key, logging_middleware,
    mark_cookies_secure,
};

/// The web server for SecureBank.
///
/// The secret used to encrypt cookies is read from the environment variable `SECRET_KEY`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. It is created if it does not exist.
    #[arg(long, default_value = "banking.db")]
    db_path: String,

    /// The address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// The number of worker threads for handling requests.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Directory holding an SSL certificate `cert.pem` and key `key.pem`.
    ///
    /// When set, the app is served over HTTPS and cookies are marked `Secure`.
    /// Otherwise the app is served over plain HTTP.
    #[arg(long)]
    cert_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    setup_logging();

    let args = Args::parse();

    let secret = match load_secret_key(env::var(SECRET_KEY_ENV).ok()) {
        Ok(secret) => secret,
        Err(error) => {
            tracing::error!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let addr = match args.host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, args.port),
        Err(error) => {
            tracing::error!("Invalid host {}: {error}", args.host);
            return ExitCode::FAILURE;
        }
    };

    let state = match Connection::open(&args.db_path)
        .map_err(securebank::Error::from)
        .and_then(|connection| AppState::new(connection, &secret))
    {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not open the database {}: {error}", args.db_path);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.workers.max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("Could not start the async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(serve(addr, state, args.cert_path))
}

async fn serve(addr: SocketAddr, state: AppState, cert_path: Option<PathBuf>) -> ExitCode {
    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));

    let result = match cert_path {
        Some(cert_path) => {
            let tls_config = match RustlsConfig::from_pem_file(
                cert_path.join("cert.pem"),
                cert_path.join("key.pem"),
            )
            .await
            {
                Ok(tls_config) => tls_config,
                Err(error) => {
                    tracing::error!(
                        "Could not open TLS certificates in {}: {error}",
                        cert_path.display()
                    );
                    return ExitCode::FAILURE;
                }
            };

            let router = router.layer(middleware::map_response(mark_cookies_secure));
            let router = add_tracing_layer(router);

            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
        None => {
            let router = add_tracing_layer(router);

            tracing::info!("HTTP server listening on {}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("Server error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
