//! Init command implementation
//!
//! Writes a commented `via.toml`, an `.env.example` naming the credential
//! variables, and the data directory for the index.

use super::output::Output;
use crate::utils::toml_config::{CONFIG_TEMPLATE, DEFAULT_CONFIG_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// via.toml already exists and --force was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

const ENV_EXAMPLE: &str = "# Copy to .env and fill in the keys you have.\n\
# Providers without a valid key are left out of the failover chain.\n\
OPENAI_API_KEY=your_openai_api_key_here\n\
ANTHROPIC_API_KEY=your_anthropic_api_key_here\n\
GOOGLE_API_KEY=your_google_api_key_here\n";

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing VIA");

    let base_path = &config.path;
    let config_path = base_path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", DEFAULT_CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.error(&format!("Failed to create data/: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir("data");
    }

    if let Err(e) = write_file(&config_path, CONFIG_TEMPLATE, config.force) {
        output.error(&format!("Failed to create {}: {}", DEFAULT_CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", DEFAULT_CONFIG_FILE);

    let env_example_path = base_path.join(".env.example");
    match write_file(&env_example_path, ENV_EXAMPLE, config.force) {
        Ok(true) => output.created("env", ".env.example"),
        Ok(false) => output.skipped(".env.example", "already exists"),
        Err(e) => {
            output.error(&format!("Failed to create .env.example: {}", e));
            return InitResult::Error(e.to_string());
        }
    }

    output.complete("VIA initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Add your API keys:");
    output.command("cp .env.example .env");
    output.newline();
    output.info("2. Index your policy documents (plain text):");
    output.command("via ingest policies/");
    output.newline();
    output.info("3. Ask away:");
    output.command("via chat");

    InitResult::Success
}

/// Write `content` unless the file exists and `force` is off. Returns
/// whether the file was written.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}
