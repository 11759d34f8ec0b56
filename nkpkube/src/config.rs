use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConnectError, Result};
use crate::launcher::DEFAULT_SHELL;

pub const SETTINGS_FILE: &str = "nkp-connect.yaml";
pub const EXCLUDE_DEFAULT_NAMESPACE_ENV: &str = "NKP_EXCLUDE_DEFAULT_NAMESPACE";
pub const CREDENTIALS_DIR_ENV: &str = "NKP_CREDENTIALS_DIR";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SettingsFile {
    exclude_default_namespace: Option<bool>,
    credentials_dir: Option<PathBuf>,
    fallback_shell: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub kube_dir: PathBuf,
    /// Where management cluster kubeconfigs live, `~/.kube/nkp` by default.
    pub credentials_dir: PathBuf,
    pub exclude_default_namespace: bool,
    pub fallback_shell: PathBuf,
}

impl Settings {
    pub fn defaults(kube_dir: &Path) -> Self {
        Self {
            kube_dir: kube_dir.to_path_buf(),
            credentials_dir: kube_dir.join("nkp"),
            exclude_default_namespace: false,
            fallback_shell: PathBuf::from(DEFAULT_SHELL),
        }
    }

    /// Defaults, overlaid with `{kube_dir}/nkp-connect.yaml` and then the process environment.
    pub fn load(kube_dir: &Path) -> Result<Self> {
        let path = kube_dir.join(SETTINGS_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(path = %path.display(), "read settings file");
                Some(contents)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(ConnectError::io(format!("Reading {}", path.display()), err))
            }
        };

        Self::from_sources(kube_dir, contents.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        kube_dir: &Path,
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut settings = Self::defaults(kube_dir);

        if let Some(file) = file.filter(|file| !file.trim().is_empty()) {
            let parsed: SettingsFile = serde_yaml::from_str(file)
                .map_err(|err| ConnectError::Settings(format!("{SETTINGS_FILE}: {err}")))?;
            if let Some(exclude) = parsed.exclude_default_namespace {
                settings.exclude_default_namespace = exclude;
            }
            if let Some(dir) = parsed.credentials_dir {
                settings.credentials_dir = dir;
            }
            if let Some(shell) = parsed.fallback_shell {
                settings.fallback_shell = shell;
            }
        }

        if let Some(raw) = env(EXCLUDE_DEFAULT_NAMESPACE_ENV) {
            settings.exclude_default_namespace = parse_flag(&raw).ok_or_else(|| {
                ConnectError::Settings(format!(
                    "{EXCLUDE_DEFAULT_NAMESPACE_ENV} must be a boolean, got '{raw}'"
                ))
            })?;
        }
        if let Some(dir) = env(CREDENTIALS_DIR_ENV).filter(|dir| !dir.is_empty()) {
            settings.credentials_dir = PathBuf::from(dir);
        }

        Ok(settings)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
