//! Daemon settings
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. `<config dir>/scripthost/scripthost.toml`
//! 3. `./scripthost.toml`
//! 4. `SCRIPTHOST_*` environment variables (`__` for nesting, e.g.
//!    `SCRIPTHOST_SUPERVISOR__POLL_INTERVAL_MS=10`)

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, FileSourceFile};
use directories::ProjectDirs;
use scripthost_core::SupervisorConfig;
use serde::Deserialize;

const DEFAULT_OWNER_NAME: &str = "scripthost";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9537;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Name used in give-up reports
    pub owner_name: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// Demo scripts that honour the stop flag
    pub demo_workers: usize,
    /// Demo scripts that ignore the stop flag for `stubborn_linger_ms`
    pub demo_stubborn_workers: usize,
    pub stubborn_linger_ms: u64,
    pub supervisor: SupervisorConfig,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            owner_name: DEFAULT_OWNER_NAME.to_string(),
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            demo_workers: 2,
            demo_stubborn_workers: 0,
            stubborn_linger_ms: 10_000,
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl DaemonSettings {
    pub fn load() -> Result<Self> {
        let mut files = Vec::new();
        if let Some(dirs) = ProjectDirs::from("dev", "scripthost", "scripthost") {
            files.push(File::from(dirs.config_dir().join("scripthost.toml")).required(false));
        }
        files.push(File::with_name("scripthost").required(false));

        Self::load_from(files)
    }

    /// Layer `files` in order, then the `SCRIPTHOST_*` environment
    fn load_from(files: Vec<File<FileSourceFile, FileFormat>>) -> Result<Self> {
        let mut builder = Config::builder();
        for file in files {
            builder = builder.add_source(file);
        }

        let settings: DaemonSettings = builder
            .add_source(
                Environment::with_prefix("SCRIPTHOST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings
            .supervisor
            .validate()
            .context("Invalid supervisor configuration")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const OVERRIDDEN: [&str; 3] = [
        "SCRIPTHOST_OWNER_NAME",
        "SCRIPTHOST_RPC_PORT",
        "SCRIPTHOST_SUPERVISOR__POLL_INTERVAL_MS",
    ];

    fn clear_env() {
        for key in OVERRIDDEN {
            std::env::remove_var(key);
        }
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn source(file: &tempfile::NamedTempFile) -> File<FileSourceFile, FileFormat> {
        File::from(file.path()).required(true)
    }

    // Process environment is shared between test threads, so every
    // env-dependent case runs in this one test.
    #[test]
    fn test_load_layers_defaults_file_and_env() {
        clear_env();

        // Defaults only
        let settings = DaemonSettings::load_from(Vec::new()).unwrap();
        assert_eq!(settings.owner_name, DEFAULT_OWNER_NAME);
        assert_eq!(settings.rpc_port, DEFAULT_RPC_PORT);
        assert_eq!(settings.supervisor, SupervisorConfig::default());

        // File overrides defaults, nested tables included
        let file = toml_file(
            "owner_name = \"from-file\"\nrpc_port = 9600\n\n[supervisor]\npoll_interval_ms = 50\n",
        );
        let settings = DaemonSettings::load_from(vec![source(&file)]).unwrap();
        assert_eq!(settings.owner_name, "from-file");
        assert_eq!(settings.rpc_port, 9600);
        assert_eq!(settings.supervisor.poll_interval_ms, 50);
        assert_eq!(
            settings.supervisor.default_stop_wait_ms,
            SupervisorConfig::default().default_stop_wait_ms
        );

        // Env overrides the file; `__` reaches into `supervisor`
        std::env::set_var("SCRIPTHOST_OWNER_NAME", "from-env");
        std::env::set_var("SCRIPTHOST_SUPERVISOR__POLL_INTERVAL_MS", "10");
        let settings = DaemonSettings::load_from(vec![source(&file)]).unwrap();
        assert_eq!(settings.owner_name, "from-env");
        assert_eq!(settings.rpc_port, 9600);
        assert_eq!(settings.supervisor.poll_interval_ms, 10);

        // Zero poll interval is rejected
        std::env::set_var("SCRIPTHOST_SUPERVISOR__POLL_INTERVAL_MS", "0");
        let err = DaemonSettings::load_from(Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid supervisor configuration"));

        clear_env();
    }
}
