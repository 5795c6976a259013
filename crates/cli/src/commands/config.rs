use std::path::PathBuf;

use lapak_core::config::{AppConfig, LoadOptions, ProviderConfig};

use super::CommandResult;

fn describe_provider(section: &str, provider: &ProviderConfig) -> String {
    let api_key = if provider.api_key.is_some() { "[redacted]" } else { "(not set)" };
    format!(
        "[{section}]\n  endpoint = {}\n  model = {}\n  api_key = {api_key}\n  timeout_secs = {}",
        provider.endpoint, provider.model, provider.timeout_secs
    )
}

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => return CommandResult::failed(format!("configuration error: {error}")),
    };

    let output = [
        describe_provider("provider.primary", &config.primary),
        describe_provider("provider.secondary", &config.secondary),
        format!(
            "[chat]\n  temperature = {}\n  max_tokens = {}\n  history_cap = {}\n  catalog_prompt_limit = {}\n  locale = {}",
            config.chat.temperature,
            config.chat.max_tokens,
            config.chat.history_cap,
            config.chat.catalog_prompt_limit,
            config.chat.locale.code()
        ),
        format!(
            "[relay]\n  debounce_secs = {}\n  max_batch_delay_secs = {}\n  buffer_cap = {}",
            config.relay.debounce_secs, config.relay.max_batch_delay_secs, config.relay.buffer_cap
        ),
        format!(
            "[logging]\n  level = {}\n  format = {:?}",
            config.logging.level, config.logging.format
        ),
    ]
    .join("\n\n");

    CommandResult::ok(output)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn config_output_never_contains_key_material() {
        std::env::set_var("LAPAK_PRIMARY_API_KEY", "very-secret-key");
        let result = run(None);
        std::env::remove_var("LAPAK_PRIMARY_API_KEY");

        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("[redacted]"));
        assert!(!result.output.contains("very-secret-key"));
    }
}
