use anyhow::Result;

use hymnbook::app::App;
use hymnbook::cli::{self, Command};
use hymnbook::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_help();
            std::process::exit(1);
        }
    };

    if cli.command == Command::Help {
        cli::print_help();
        return Ok(());
    }

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = hymnbook::logging::init(Some(Config::config_dir().join("logs")));

    // Load configuration
    let config = match &cli.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let app = App::open(config)?;
    let mut stdout = std::io::stdout();
    if let Err(e) = app.run(cli.command, &mut stdout).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
