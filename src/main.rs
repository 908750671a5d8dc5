// 服务入口：加载配置、初始化日志与 i18n，挂载文档 API。
use docportal::build_router;
use docportal::config::{load_config, Config};
use docportal::i18n;
use docportal::shutdown::shutdown_signal;
use docportal::state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config();
    init_tracing(&config);
    i18n::configure_i18n(
        Some(config.i18n.default_language.clone()),
        Some(config.i18n.supported_languages.clone()),
    );
    let state = Arc::new(AppState::new(config.clone()));

    let app = build_router(state)
        .layer(build_cors(&config))
        .layer(TraceLayer::new_for_http());

    let addr = bind_address(&config);
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!("docportal 服务已启动: http://{addr}");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        warn!("服务退出异常: {err}");
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let default_level = config.observability.log_level.trim();
    let default_level = if default_level.is_empty() {
        "info".to_string()
    } else {
        default_level.to_lowercase()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config
        .observability
        .log_format
        .trim()
        .eq_ignore_ascii_case("json")
    {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn bind_address(config: &Config) -> String {
    // 保留环境变量覆盖，便于容器化部署。
    let host = std::env::var("DOCPORTAL_HOST").unwrap_or_else(|_| config.server.host.clone());
    let port = std::env::var("DOCPORTAL_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(config.server.port);
    format!("{host}:{port}")
}

fn build_cors(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match config.server.allow_origins.as_ref() {
        Some(origins) if origins.iter().any(|value| value.trim() == "*") => cors.allow_origin(Any),
        Some(origins) => {
            let values = origins
                .iter()
                .filter_map(|value| value.trim().parse().ok())
                .collect::<Vec<_>>();
            if values.is_empty() {
                cors.allow_origin(Any)
            } else {
                cors.allow_origin(AllowOrigin::list(values))
            }
        }
        None => cors.allow_origin(Any),
    }
}
