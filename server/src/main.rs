use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use server::config::ServerConfig;
use server::routes::{build_router, AppState};
use tts_core::{Device, ModelManager, MpegEncoder, PiperLoader, ResponseCache, SynthesisPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    let config = ServerConfig::from_env();
    info!(
        port = config.port,
        model_dir = %config.model_dir.display(),
        "starting speech synthesis server"
    );

    std::fs::create_dir_all(&config.model_dir)?;

    let cache = Arc::new(ResponseCache::new(
        NonZeroUsize::new(config.cache_capacity.max(1))
            .ok_or_else(|| anyhow::anyhow!("cache capacity must be nonzero"))?,
    ));
    let encoder = Arc::new(MpegEncoder::new(
        config.ffmpeg_path.clone(),
        config.mp3_bitrate.clone(),
        config.encoder_concurrency,
        config.encoder_timeout(),
    ));
    let manager = Arc::new(ModelManager::new(Arc::new(PiperLoader), cache.clone()));
    let pipeline = Arc::new(SynthesisPipeline::new(
        manager.clone(),
        cache,
        encoder,
        config.synthesis_timeout(),
    ));
    pipeline.set_verbose(config.verbose);

    let artifacts = config.artifacts();
    if artifacts.all_present() {
        if let Err(e) = manager
            .load(artifacts, Device::from_gpu_flag(config.use_gpu))
            .await
        {
            warn!("could not load model at startup: {e}, starting without a model");
        }
    } else {
        info!(
            "model artifacts not found under {}, starting without a model",
            config.model_dir.display()
        );
    }

    // CORS configuration - environment-aware
    let cors = if let Some(ref allowed_origins) = config.cors_allowed_origins {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse::<HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            warn!("CORS_ALLOWED_ORIGINS has no valid entries, falling back to permissive CORS");
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers(tower_http::cors::Any)
                .allow_credentials(false)
        } else {
            info!("CORS configured for {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(tower_http::cors::AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers(tower_http::cors::Any)
                .allow_credentials(false)
        }
    } else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
            .allow_credentials(false)
    };

    // Global rate limit shared by all clients; plays well behind proxies
    // where per-IP extraction is unreliable.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(((config.rate_limit_per_minute / 60).max(1)) as u64)
            .burst_size(config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("rate limiting: {} requests per minute", config.rate_limit_per_minute);

    async fn add_request_id(mut request: Request, next: Next) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            request.headers_mut().insert("x-request-id", value.clone());
            let mut response = next.run(request).await;
            response.headers_mut().insert("x-request-id", value);
            response
        } else {
            next.run(request).await
        }
    }

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors)
        .into_inner();

    let state = AppState {
        pipeline,
        manager,
        config: config.clone(),
    };
    let app = build_router(state)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
