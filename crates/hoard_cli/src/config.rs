//! Layered configuration loading for hoard.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `HOARD_`, sections split by `__`,
//!    e.g., `HOARD_GITHUB__API_KEY`, `HOARD_GENERAL__ROOT`)
//! 3. `--config <file>` (TOML, or JSON when the extension is `.json`)
//! 4. `./hoard.toml`
//! 5. `~/.config/hoard/config.toml` (or `$XDG_CONFIG_HOME/hoard/config.toml`)
//! 6. Built-in defaults
//!
//! The schema itself lives in [`hoard::config`]; this module only decides
//! where values come from.

use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;

/// A commented starting point printed by `hoard example-config`.
pub const EXAMPLE_CONFIG: &str = r#"# hoard configuration

[general]
# Mirrors are placed under <root>/<provider>/<owner>/<name>
root = "/srv/mirror"
# Full names ("owner/name") or whole namespaces ("owner") to skip
blacklist = []
# Concurrent git clone/pull operations
concurrency = 4
# Stop after this many failed updates (0 = never)
error_threshold = 0

[github]
# or set HOARD_GITHUB__API_KEY
api_key = "your API key"
skip_owned = false
skip_starred = false
skip_organisations = false
skip_collaborator = false

[gitlab]
# or set HOARD_GITLAB__API_KEY
api_key = "your API key"
# host = "gitlab.example.com"
skip_starred = false
skip_owned = false
skip_organisations = true
"#;

/// Default config file path in the user's config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hoard").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Guess the file format from the extension; TOML unless it says JSON.
fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

/// The `HOARD_` environment layer.
fn environment() -> Environment {
    Environment::with_prefix("HOARD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("general.blacklist")
}

/// Build a configuration from the given file layers and environment.
///
/// Missing optional files are skipped; `explicit` must exist.
fn build(
    optional: &[PathBuf],
    explicit: Option<&Path>,
    env: Environment,
) -> Result<hoard::Config, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    for path in optional {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(file_format(path))
                    .required(false),
            );
        }
    }

    if let Some(path) = explicit {
        tracing::debug!("Loading config from {:?}", path);
        builder = builder.add_source(
            File::from(path)
                .format(file_format(path))
                .required(true),
        );
    }

    builder
        .add_source(env)
        .build()?
        .try_deserialize::<hoard::Config>()
}

/// Load configuration from every layer.
///
/// Validation is left to the caller so `hoard validate` can report every
/// problem at once.
pub fn load(explicit: Option<&Path>) -> Result<hoard::Config, ConfigError> {
    let mut optional = Vec::with_capacity(2);
    if let Some(xdg) = default_config_path() {
        optional.push(xdg);
    }
    optional.push(PathBuf::from("hoard.toml"));

    build(&optional, explicit, environment())
}
