//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    uncurated_bus: String,
    curated_bus: String,
    store_path: String,
    bridge_count: usize,
    ingest_filter_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    uncurated_bus: format!(
                        "{}:{}",
                        config.bus.uncurated.host, config.bus.uncurated.port
                    ),
                    curated_bus: format!(
                        "{}:{}",
                        config.bus.curated.host, config.bus.curated.port
                    ),
                    store_path: config.store.path.clone(),
                    bridge_count: config.bridges.len(),
                    ingest_filter_count: config.ingest.subscribe_filters.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &contracts::CuratorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.bridges.is_empty() {
        warnings.push("No bridges configured - nothing will be republished".to_string());
    }

    if config.ingest.subscribe_filters.is_empty() && config.ingest.publisher_namespace.is_none() {
        warnings.push("No ingest subscriptions configured - nothing will be recorded".to_string());
    }

    if config.store.path == ":memory:" {
        warnings.push("Store is in-memory - records are lost on restart".to_string());
    }

    for bridge in &config.bridges {
        if bridge.backoff_secs == 0 {
            warnings.push(format!(
                "Bridge '{}' has zero reconnect backoff - reconnects will spin",
                bridge.name
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_minimal_config() {
        let file = temp_config(
            r#"
[bus.uncurated]
host = "localhost"

[bus.curated]
host = "localhost"

[[bridges]]
name = "main"
"#,
        );
        let result = validate_config(&crate::cli::ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.summary.unwrap().bridge_count, 1);
    }

    #[test]
    fn test_validate_reports_warning_without_bridges() {
        let file = temp_config(
            r#"
[bus.uncurated]
host = "localhost"

[bus.curated]
host = "localhost"
"#,
        );
        let result = validate_config(&crate::cli::ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("No bridges")));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&crate::cli::ValidateArgs {
            config: "/nonexistent/config.toml".into(),
            json: false,
        });
        assert!(!result.valid);
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let file = temp_config(
            r#"
[bus.uncurated]
host = "localhost"

[bus.curated]
host = "localhost"

[ingest]
batch_size = 0
"#,
        );
        let result = validate_config(&crate::cli::ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("batch size"));
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Uncurated bus: {}", summary.uncurated_bus);
            println!("  Curated bus: {}", summary.curated_bus);
            println!("  Store: {}", summary.store_path);
            println!("  Bridges: {}", summary.bridge_count);
            println!("  Ingest filters: {}", summary.ingest_filter_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
