use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    lapak_cli::run().await
}
