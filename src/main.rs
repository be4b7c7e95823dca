use clap::Parser;
use texbook::Settings;
use texbook::cli::commands::{fingerprint, init, serve, sources, warm};
use texbook::cli::{Cli, Commands, SourceAction};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Init runs before any settings exist.
    if let Commands::Init { force } = cli.command {
        exit_on_error(init::run_init(force));
        return;
    }

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });

    texbook::logging::init_with_config(&config.logging);

    let result = match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => init::run_config(&config),
        Commands::Serve { bind, no_watch } => {
            serve::run(serve::ServeArgs { bind, no_watch }, config).await
        }
        Commands::Sources { action } => match action {
            SourceAction::List { json } => sources::run_list(&config, json),
            SourceAction::Add { name, path, kind } => {
                tokio::task::spawn_blocking(move || sources::run_add(config, &name, &path, &kind))
                    .await
                    .map_err(anyhow::Error::from)
                    .and_then(|result| result)
            }
        },
        Commands::Warm { source, timeout } => {
            tokio::task::spawn_blocking(move || warm::run(config, source.as_deref(), timeout))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|result| result)
        }
        Commands::Fingerprint { path, namespace } => {
            fingerprint::run(&config, &path, namespace.as_deref())
        }
    };

    exit_on_error(result);
}

fn exit_on_error(result: anyhow::Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
