//! `pharma-extract`: run the extraction pipeline over saved product pages.
//!
//! ```bash
//! pharma-extract https://benu.bg/some-product page1.html https://benu.bg/other page2.html
//! ```
//!
//! Exits 0 when the batch passes the quality gate, 1 when it fails.
//! `PHARMA_CONFIG_FILE` points at a config file other than the default one.

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use pharma_catalog_lib::application::{BatchRunner, PageInput, ProductExtractor};
use pharma_catalog_lib::infrastructure::ConfigManager;
use pharma_catalog_lib::infrastructure::logging::{init_logging_with_config, log_system_info};

/// Overrides the config file location under the user config directory
const CONFIG_FILE_VAR: &str = "PHARMA_CONFIG_FILE";

const USAGE: &str = "usage: pharma-extract <url> <html-file> [<url> <html-file> ...]";

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pharma-extract: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let manager = match std::env::var_os(CONFIG_FILE_VAR) {
        Some(path) => ConfigManager::with_path(PathBuf::from(path)),
        None => ConfigManager::new()?,
    };
    let config = manager.load_config()?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    let pages = read_pages(std::env::args().skip(1).collect())?;
    info!("Loaded {} pages", pages.len());

    let extractor = Arc::new(ProductExtractor::new(&config).context("Failed to build extractor")?);
    let runner = BatchRunner::new(extractor, config.quality.clone());

    let chunk_size = config.quality.summary_every.max(1);
    for chunk in pages.chunks(chunk_size) {
        let result = runner.run(chunk)?;
        for outcome in result.outcomes.iter().flatten() {
            for issue in outcome.issues.iter().filter(|i| i.is_blocking()) {
                error!("{}: {}", outcome.product.identifier(), issue);
            }
        }
    }

    let snapshot = runner.finalize();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(ExitCode::from(u8::try_from(snapshot.gate.exit_code()).unwrap_or(1)))
}

/// `<url> <file>` pairs from the command line
fn read_pages(args: Vec<String>) -> Result<Vec<PageInput>> {
    if args.is_empty() || args.len() % 2 != 0 {
        bail!(USAGE);
    }
    args.chunks(2)
        .map(|pair| {
            let (url, path) = (&pair[0], PathBuf::from(&pair[1]));
            let markup = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {} for {}", path.display(), url))?;
            Ok(PageInput::new(url.clone(), markup))
        })
        .collect()
}
