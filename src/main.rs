//! Headless terminal client entry point for native builds.

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

/// Terminal client for browsing projects and annotating images
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser)]
#[command(name = "labelweb-native", version)]
struct Cli {
    /// Config file to use instead of the default location
    config: Option<std::path::PathBuf>,

    /// Override the persistence service base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use labelweb::config::AppConfig;

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_or_init_at(path),
        None => AppConfig::load_or_init(),
    };
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    labelweb::logging::init(config.log_level);

    if let Err(e) = labelweb::native::run_shell(&config) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
