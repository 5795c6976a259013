use std::env;
use std::sync::{Mutex, OnceLock};

use lapak_cli::commands::{config, seed};
use serde_json::Value;

#[test]
fn seed_emits_the_full_catalog_as_json() {
    with_env(&[], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed to succeed");

        let payload: Value =
            serde_json::from_str(&result.output).expect("seed output should be valid JSON");
        let products = payload.as_array().expect("seed output should be a JSON array");
        assert_eq!(products.len(), 15);
        assert!(products.iter().any(|product| product["name"] == "Nasi Rendang"));
    });
}

#[test]
fn seed_is_deterministic_across_runs() {
    with_env(&[], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.output, second.output);
    });
}

#[test]
fn config_reports_effective_values_with_redacted_secrets() {
    with_env(
        &[
            ("LAPAK_PRIMARY_API_KEY", "super-secret"),
            ("LAPAK_PRIMARY_MODEL", "model-from-env"),
            ("LAPAK_CHAT_LOCALE", "id"),
        ],
        || {
            let result = config::run(None);
            assert_eq!(result.exit_code, 0, "expected config inspection to succeed");
            assert!(result.output.contains("model = model-from-env"));
            assert!(result.output.contains("locale = id"));
            assert!(result.output.contains("[redacted]"));
            assert!(!result.output.contains("super-secret"));
        },
    );
}

#[test]
fn config_fails_fast_on_invalid_env_override() {
    with_env(&[("LAPAK_CHAT_LOCALE", "klingon")], || {
        let result = config::run(None);
        assert_eq!(result.exit_code, 1, "expected invalid locale to fail");
        assert!(result.output.contains("configuration error"));
    });
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LAPAK_PRIMARY_ENDPOINT",
        "LAPAK_PRIMARY_API_KEY",
        "LAPAK_PRIMARY_MODEL",
        "LAPAK_PRIMARY_TIMEOUT_SECS",
        "LAPAK_SECONDARY_ENDPOINT",
        "LAPAK_SECONDARY_API_KEY",
        "LAPAK_SECONDARY_MODEL",
        "LAPAK_SECONDARY_TIMEOUT_SECS",
        "LAPAK_CHAT_LOCALE",
        "LAPAK_CHAT_HISTORY_CAP",
        "LAPAK_RELAY_DEBOUNCE_SECS",
        "LAPAK_LOGGING_LEVEL",
        "LAPAK_LOGGING_FORMAT",
        "LAPAK_LOG_LEVEL",
        "LAPAK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
