use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{ConnectError, Result};
use crate::picker::{pick_one, Picker};

pub const MANAGEMENT_PROMPT: &str = "Select management kubeconfig > ";

/// A management cluster kubeconfig stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Every non-directory entry of `dir`, sorted by path.
pub fn list_credentials(dir: &Path) -> Result<Vec<CredentialFile>> {
    let context = || format!("Reading kubeconfig directory {}", dir.display());

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| ConnectError::io(context(), err))? {
        let entry = entry.map_err(|err| ConnectError::io(context(), err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| ConnectError::io(context(), err))?;
        if !file_type.is_dir() {
            files.push(CredentialFile::new(entry.path()));
        }
    }

    files.sort();
    Ok(files)
}

pub fn locate_credential(dir: &Path, picker: &mut dyn Picker) -> Result<CredentialFile> {
    let files = list_credentials(dir)?;
    debug!(count = files.len(), dir = %dir.display(), "found management kubeconfigs");

    let chosen = pick_one(
        picker,
        MANAGEMENT_PROMPT,
        files,
        CredentialFile::display_name,
        None,
        || ConnectError::NotFound(format!("No kubeconfig files found in {}", dir.display())),
    )?;

    println!("Using kubeconfig: {}", chosen.display_name());
    Ok(chosen)
}
