use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use lapak_agent::{
    HttpChatProvider, ProviderGateway, SessionController, SessionReply, SessionStores,
};
use lapak_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use lapak_core::domain::product::ProductId;
use lapak_core::locale::{format_rupiah, Locale};
use lapak_core::Product;
use lapak_store::{
    InMemoryCatalogRepository, InMemoryFeedbackRepository, InMemoryMessageRepository,
    InMemoryOrderRepository, InMemoryShopperMemoryRepository,
};

use super::CommandResult;

fn init_logging(config: &AppConfig) {
    use lapak_core::config::LogFormat::{Compact, Json, Pretty};
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub async fn run(config_path: Option<PathBuf>, locale: Option<String>) -> CommandResult {
    let locale_override = match locale.as_deref().map(Locale::parse) {
        Some(None) => return CommandResult::failed("unsupported locale (expected en|id)"),
        Some(parsed) => parsed,
        None => None,
    };

    let config = match AppConfig::load(LoadOptions {
        config_path,
        overrides: ConfigOverrides { locale: locale_override, ..ConfigOverrides::default() },
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return CommandResult::failed(format!("configuration error: {error}")),
    };
    init_logging(&config);

    let primary = match HttpChatProvider::from_config("primary", config.primary.clone()) {
        Ok(provider) => provider,
        Err(error) => return CommandResult::failed(format!("primary provider: {error}")),
    };
    let secondary = match HttpChatProvider::from_config("secondary", config.secondary.clone()) {
        Ok(provider) => provider,
        Err(error) => return CommandResult::failed(format!("secondary provider: {error}")),
    };
    let gateway = Arc::new(ProviderGateway::new(Arc::new(primary), Arc::new(secondary)));

    let stores = SessionStores {
        catalog: Arc::new(InMemoryCatalogRepository::default()),
        orders: Arc::new(InMemoryOrderRepository::default()),
        messages: Arc::new(InMemoryMessageRepository::default()),
        shopper_memory: Arc::new(InMemoryShopperMemoryRepository::default()),
        feedback: Arc::new(InMemoryFeedbackRepository::default()),
    };

    let (controller, mut notices) = SessionController::new(&config, gateway, stores);
    let controller = Arc::new(controller);
    let product_count = controller.refresh_catalog().await;

    // Seller summaries arrive asynchronously; print them as they land.
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("\n{}", notice.text);
        }
    });

    println!(
        "👋 Welcome to Lapak! {product_count} products loaded. Ask away — e.g. \
         \"I want nasi padang\" or \"something sweet and cheap\".\n\
         Commands: /lang en|id, /buy <product-id>, /feedback <text>, /quit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await.ok();
        stdout.flush().await.ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => return CommandResult::failed(format!("stdin error: {error}")),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !handle_command(&controller, command).await {
                break;
            }
            continue;
        }

        render(&controller, controller.handle_message(line).await);
    }

    CommandResult::ok("bye 👋")
}

/// Returns false when the REPL should exit.
async fn handle_command(controller: &Arc<SessionController>, command: &str) -> bool {
    let (name, rest) = match command.split_once(' ') {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return false,
        "lang" => match Locale::parse(rest) {
            Some(locale) => {
                controller.set_locale(locale);
                println!("language set to {}", locale.code());
            }
            None => println!("usage: /lang en|id"),
        },
        "buy" => {
            if rest.is_empty() {
                println!("usage: /buy <product-id>");
            } else {
                render(controller, controller.select_product(&ProductId(rest.to_string())).await);
            }
        }
        "feedback" => {
            if rest.is_empty() {
                println!("usage: /feedback <text>");
            } else {
                render(controller, controller.submit_feedback(rest).await);
            }
        }
        "products" => {
            for product in controller.catalog_snapshot() {
                print_product(&product);
            }
        }
        _ => println!("unknown command: /{name}"),
    }
    true
}

fn render(controller: &Arc<SessionController>, reply: SessionReply) {
    match reply {
        SessionReply::Busy => println!("{}", controller.locale().busy_reply()),
        SessionReply::Ignored => {}
        SessionReply::Text(text) | SessionReply::Failure(text) => println!("{text}"),
        SessionReply::RelaySent { notice, .. } => println!("{notice}"),
        SessionReply::Products { response_text, items, comment } => {
            if !response_text.is_empty() {
                println!("{response_text}");
            }
            if items.is_empty() {
                println!("{}", controller.locale().nothing_found_reply());
            }
            for product in &items {
                print_product(product);
            }
            if let Some(comment) = comment {
                println!("({comment})");
            }
        }
    }
}

fn print_product(product: &Product) {
    let price = if product.available {
        format!("Rp {}", format_rupiah(product.price))
    } else {
        "Sold Out".to_string()
    };
    println!("  [{}] {} — {} — {}", product.id.0, product.name, product.seller, price);
}
