//! HTTP server setup and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::config::AppConfig;
use crate::llm::providers::create_generator;
use crate::llm::{Provider, TextGenerator};
use crate::logging::OpTimer;
use crate::runtime::{Registry, Simulator, VmController};
use crate::{log_banner, log_init_step, log_init_warning, log_success, AppState};

/// Mirage API version (from Cargo.toml).
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create the application with all routes and middleware.
pub fn create_app(config: AppConfig) -> anyhow::Result<Router> {
    // [1/4] Text generator from config
    let step_timer = OpTimer::new("server", "text_generator");
    let llm_settings = config.llm_settings();
    let provider_info = format!(
        "{} ({}) {}",
        match llm_settings.provider {
            Provider::OpenAi => "⚙️ OpenAI",
            Provider::Anthropic => "⚙️ Anthropic",
            Provider::Google => "⚙️ Google",
            Provider::Groq => "⚙️ Groq",
            Provider::Custom => "⚙️ Custom",
        },
        llm_settings.model,
        if llm_settings.api_key.is_some() {
            "✓"
        } else {
            "✗ No API key"
        }
    );

    log_banner!(
        format!("🖥️  Mirage API v{}", VERSION),
        format!("Shell backend: {}", llm_settings.provider)
    );
    log_init_step!(1, 4, "Text Generator", provider_info);

    if llm_settings.api_key.is_none() {
        log_init_warning!(
            "No API key configured for provider: {}. Shell commands will fail.",
            llm_settings.provider
        );
    }

    let generator = create_generator(llm_settings)?;
    step_timer.finish();

    create_app_with_generator(config, generator)
}

/// Create the application around an existing text generator.
pub fn create_app_with_generator(
    config: AppConfig,
    generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<Router> {
    let overall_timer = OpTimer::new("server", "create_app");

    // [2/4] Machine catalog
    let step_timer = OpTimer::new("server", "registry");
    let registry = if config.simulation.seed_demo_machines {
        Registry::demo()
    } else {
        Registry::new()
    };
    log_init_step!(
        2,
        4,
        "Registry",
        format!("📦 {} machines", registry.len())
    );
    step_timer.finish();

    // [3/4] Simulator
    let step_timer = OpTimer::new("server", "simulator");
    let controller = VmController::new(registry, config.simulation.controller_options());
    let timing = config.simulation.timing();
    let simulator = Simulator::new(controller, generator, timing);
    log_init_step!(
        3,
        4,
        "Simulator",
        format!("⏱️  tick {}ms", timing.tick.as_millis())
    );
    step_timer.finish();

    let timeout = Duration::from_secs(config.server.timeout_secs);
    let state = AppState {
        config: Arc::new(config),
        simulator,
    };

    // [4/4] Router and middleware
    let step_timer = OpTimer::new("server", "router");
    let app = api::create_router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log_init_step!(4, 4, "Router", "🌐 Routes + middleware configured");
    step_timer.finish();

    overall_timer.finish();
    log_success!("Mirage API server created successfully");

    Ok(app)
}
