//! Run configuration loaded from a TOML file plus `DRIP__*` environment
//! overrides (for example `DRIP__LEAF_SCHEMA=1`).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use drip_distributor::RunConfig;

/// Prefix for environment overrides. Nested keys use `__` as separator.
pub const ENV_PREFIX: &str = "DRIP";

/// Load and validate the run configuration at `path`.
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    load_with_env(path, None)
}

/// As [`load_run_config`], reading overrides from `env` instead of the
/// process environment when given.
pub fn load_with_env(path: &Path, env: Option<HashMap<String, String>>) -> Result<RunConfig> {
    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    let run: RunConfig = settings
        .try_deserialize()
        .with_context(|| format!("Invalid run configuration: {}", path.display()))?;
    run.validate().context("Invalid run configuration")?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
leaf_schema = 1

[penalties]
excluded = ["0x0909090909090909090909090909090909090909"]

[[programs]]
id = "staking"
tracks = "authorization"
interval = { start = 1700000000, end = 1702592000 }
rate_ppm = 150000
predicates = ["uptime", "version"]

[[programs]]
id = "bonus"
kind = "instant_bonus"
tracks = "stake"
basis = "block"
interval = { start = 100, end = 200 }
period_secs = 2592000
rate_ppm = 30000
cap = "1000000000000000000000"
"#;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_programs_in_order() {
        let file = write_config(SAMPLE);
        let run = load_with_env(file.path(), Some(HashMap::new())).unwrap();
        assert_eq!(run.leaf_schema, 1);
        let ids: Vec<&str> = run.programs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["staking", "bonus"]);
        assert_eq!(run.programs[0].predicates.len(), 2);
        assert_eq!(run.programs[1].period_secs, Some(2_592_000));
        assert_eq!(run.programs[1].cap, Some(1_000_000_000_000_000_000_000));
        let excluded = "0x0909090909090909090909090909090909090909".parse().unwrap();
        assert!(run.penalties.is_excluded(&excluded));
    }

    #[test]
    fn env_override_applies() {
        let file = write_config(SAMPLE);
        let env: HashMap<String, String> =
            [("DRIP__LEAF_SCHEMA".to_string(), "7".to_string())].into_iter().collect();
        let err = load_with_env(file.path(), Some(env)).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported leaf schema version 7"));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_with_env(&dir.path().join("absent.toml"), Some(HashMap::new())).is_err());
    }

    #[test]
    fn block_program_without_period_is_rejected() {
        let file = write_config(
            r#"
[[programs]]
id = "blocks"
tracks = "stake"
basis = "block"
interval = { start = 1, end = 2 }
rate_ppm = 1
"#,
        );
        assert!(load_with_env(file.path(), Some(HashMap::new())).is_err());
    }
}
