use serial_test::serial;

use mirage_api::config::AppConfig;
use mirage_api::llm::Provider;

const PROVIDER_KEYS: [&str; 4] = [
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GOOGLE_API_KEY",
    "GROQ_API_KEY",
];

fn clear_env() {
    for key in PROVIDER_KEYS {
        // SAFETY: tests touching the environment are serialized with #[serial].
        unsafe { std::env::remove_var(key) };
    }
    for key in [
        "MIRAGE__SIMULATION__TICK_MS",
        "MIRAGE__SERVER__PORT",
        "MIRAGE__LLM__PROVIDER",
        "MIRAGE__LLM__MODEL",
    ] {
        // SAFETY: as above.
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();

    let config = AppConfig::load().expect("Failed to load config");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.simulation.tick_ms, 200);
    assert!(config.simulation.seed_demo_machines);
}

#[test]
#[serial]
fn test_prefixed_environment_overrides() {
    clear_env();
    // SAFETY: serialized with #[serial].
    unsafe {
        std::env::set_var("MIRAGE__SIMULATION__TICK_MS", "50");
        std::env::set_var("MIRAGE__SERVER__PORT", "9100");
        std::env::set_var("MIRAGE__LLM__MODEL", "gpt-4o");
    }

    let config = AppConfig::load().expect("Failed to load config");
    assert_eq!(config.simulation.tick_ms, 50);
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.llm_settings().model, "gpt-4o");

    clear_env();
}

#[test]
#[serial]
fn test_provider_detected_from_api_key() {
    clear_env();
    // SAFETY: serialized with #[serial].
    unsafe { std::env::set_var("GROQ_API_KEY", "gsk-test") };

    let config = AppConfig::load().expect("Failed to load config");
    let settings = config.llm_settings();
    assert_eq!(settings.provider, Provider::Groq);
    assert_eq!(settings.api_key.as_deref(), Some("gsk-test"));
    assert_eq!(settings.model, "llama-3.1-8b-instant");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_value_fails_validation() {
    clear_env();
    // SAFETY: serialized with #[serial].
    unsafe { std::env::set_var("MIRAGE__SIMULATION__TICK_MS", "0") };

    let err = AppConfig::load().unwrap_err();
    assert!(err.to_string().contains("tick_ms"));

    clear_env();
}
