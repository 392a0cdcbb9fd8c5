use anyhow::{Context, Result};
use clap::Parser;
use emt_bus::emt_api::EmtClient;
use emt_bus::emt_config::{Cli, Command, Settings};
use emt_bus::emt_controllers::EmtControllers;
use emt_bus::emt_credential::Credential;
use emt_bus::emt_gui;
use emt_bus::emt_models::EmtModels;
use emt_bus::emt_views::EmtViews;
use log::{error, info};

fn main() {
    // Set up panic hook for better error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(70));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(70));
        eprintln!("\nThe application encountered an unexpected error:");
        eprintln!("{}", panic_info);
        eprintln!("\n💡 Troubleshooting:");
        eprintln!("  • Please restart the application");
        eprintln!("  • Check your internet connection and token.txt");
        eprintln!("  • Report this issue if it persists");
        eprintln!("\n{}", "═".repeat(70));
    }));

    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match std::panic::catch_unwind(run) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("{:#}", e);
            eprintln!("\n✗ {:#}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("\n⚠️  Application terminated unexpectedly");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli).context("invalid configuration")?;

    let credential = Credential::load(&settings.token_file)
        .with_context(|| format!("cannot start without a token ({})", settings.token_file.display()))?;

    let client = EmtClient::connect(&settings, &credential).context("failed to build HTTP client")?;
    info!("using {} (timeout {:?})", settings.base_url, settings.timeout);
    let model = EmtModels::initialize(client, settings.timezone);

    match cli.command.unwrap_or(Command::Gui) {
        Command::Gui => emt_gui::run_gui(model).map_err(|e| anyhow::anyhow!("GUI error: {}", e)),
        command => {
            if let Err(e) = EmtControllers::run(&command, &model) {
                EmtViews::show_error(&e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
