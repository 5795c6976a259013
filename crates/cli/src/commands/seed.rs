use lapak_core::catalog::sample_products;

use super::CommandResult;

/// Emit the built-in catalog as JSON, ready to load into a real store.
pub fn run() -> CommandResult {
    match serde_json::to_string_pretty(&sample_products()) {
        Ok(json) => CommandResult::ok(json),
        Err(error) => CommandResult::failed(format!("could not serialize catalog: {error}")),
    }
}
