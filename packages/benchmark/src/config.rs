//! Benchmark configuration: built-in defaults, an optional TOML file and
//! explicit overrides, in increasing order of precedence.
//!
//! ```toml
//! host = "trino.internal"
//! port = 8080
//! catalog = "postgres"
//! iterations = 10
//! query_dir = "queries"
//! ```

use std::path::{Path, PathBuf};

use crime_bench_benchmark_models::BenchmarkConfig;

use crate::BenchError;

/// Values given on the command line or through the environment.
///
/// `None` keeps the value from the file or the default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub warmup_runs: Option<u32>,
    pub iterations: Option<u32>,
    pub query_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Writes every set value into `config`.
    pub fn apply(self, config: &mut BenchmarkConfig) {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }
        set(&mut config.host, self.host);
        set(&mut config.port, self.port);
        set(&mut config.user, self.user);
        set(&mut config.catalog, self.catalog);
        set(&mut config.schema, self.schema);
        set(&mut config.table, self.table);
        set(&mut config.warmup_runs, self.warmup_runs);
        set(&mut config.iterations, self.iterations);
        set(&mut config.query_dir, self.query_dir);
        set(&mut config.output_dir, self.output_dir);
    }
}

/// Parses a TOML config document. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns [`BenchError::ConfigFile`] if the document is not valid TOML or
/// has a value of the wrong type.
pub fn parse_config(path: &Path, toml_str: &str) -> Result<BenchmarkConfig, BenchError> {
    toml::from_str(toml_str).map_err(|source| BenchError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the effective configuration.
///
/// # Errors
///
/// * [`BenchError::Io`] if `file` cannot be read
/// * [`BenchError::ConfigFile`] if it does not parse
/// * [`BenchError::Config`] if the table name is not a plain identifier
pub fn resolve(
    file: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<BenchmarkConfig, BenchError> {
    let mut config = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(BenchError::io(path))?;
            log::debug!("Loaded config from {}", path.display());
            parse_config(path, &text)?
        }
        None => BenchmarkConfig::default(),
    };
    overrides.apply(&mut config);
    validate_table_name(&config.table)?;
    Ok(config)
}

/// Accepts `name`, `schema.name` or `catalog.schema.name` made of ASCII
/// letters, digits and underscores, since the name is spliced into SQL.
fn validate_table_name(table: &str) -> Result<(), BenchError> {
    let valid = table.split('.').count() <= 3
        && table.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(BenchError::Config(format!("invalid table name {table:?}")))
    }
}
