use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use console::style;
use tracing::{debug, info, warn};

use crate::error::{ConnectError, Result};
use crate::secret::AccessCredential;

pub const SHELL_ENV: &str = "SHELL";
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";
pub const DEFAULT_SHELL: &str = "/bin/bash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Overwrite `~/.kube/config`, keeping a backup of the previous one.
    Persist,
    /// Stage a temporary kubeconfig and open a subshell pointed at it.
    Transient,
}

impl SessionMode {
    pub fn from_permanent(permanent: bool) -> Self {
        if permanent {
            SessionMode::Persist
        } else {
            SessionMode::Transient
        }
    }
}

#[derive(Debug)]
pub enum SessionOutcome {
    Persisted {
        target: PathBuf,
        backup: Option<PathBuf>,
    },
    /// `None` when the shell could not be started at all.
    ShellExited { status: Option<ExitStatus> },
}

// region: Shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Shell {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `$SHELL` when set and non-empty, otherwise `fallback`.
    pub fn resolve(env_value: Option<OsString>, fallback: &Path) -> Self {
        match env_value {
            Some(shell) if !shell.is_empty() => Self::new(shell),
            _ => Self::new(fallback),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}
// endregion

pub struct SessionLauncher {
    kube_dir: PathBuf,
    shell: Shell,
    temp_dir: Option<PathBuf>,
}

impl SessionLauncher {
    pub fn new(kube_dir: impl Into<PathBuf>, shell: Shell) -> Self {
        Self {
            kube_dir: kube_dir.into(),
            shell,
            temp_dir: None,
        }
    }

    /// Stage transient kubeconfigs in `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn target(&self) -> PathBuf {
        self.kube_dir.join("config")
    }

    pub fn launch(
        &self,
        mode: SessionMode,
        cluster_name: &str,
        credential: &AccessCredential,
    ) -> Result<SessionOutcome> {
        match mode {
            SessionMode::Persist => {
                let (target, backup) = self.persist(credential)?;
                println!(
                    "{} Kubeconfig for cluster '{}' has been written to {}",
                    style("✅").green(),
                    cluster_name,
                    target.display()
                );
                println!("You can now use kubectl commands directly without any additional setup.");
                Ok(SessionOutcome::Persisted { target, backup })
            }
            SessionMode::Transient => {
                let status = self.run_transient(credential)?;
                Ok(SessionOutcome::ShellExited { status })
            }
        }
    }

    /// Write the credential to `~/.kube/config`, returning the target and any backup taken.
    pub fn persist(&self, credential: &AccessCredential) -> Result<(PathBuf, Option<PathBuf>)> {
        let target = self.target();

        fs::create_dir_all(&self.kube_dir).map_err(|err| {
            ConnectError::io(format!("Creating {}", self.kube_dir.display()), err)
        })?;

        let backup = match fs::metadata(&target) {
            Ok(_) => {
                let backup = backup_path(&target);
                fs::copy(&target, &backup).map_err(|err| {
                    ConnectError::io("Creating backup of existing kubeconfig", err)
                })?;
                println!("Existing kubeconfig backed up to: {}", backup.display());
                Some(backup)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(ConnectError::io(
                    format!("Inspecting {}", target.display()),
                    err,
                ))
            }
        };

        write_private(&target, credential.as_bytes())
            .map_err(|err| ConnectError::io(format!("Writing kubeconfig to {}", target.display()), err))?;
        info!(target = %target.display(), "persisted workload kubeconfig");

        Ok((target, backup))
    }

    /// Run the shell against a throwaway kubeconfig, removing it afterwards.
    pub fn run_transient(&self, credential: &AccessCredential) -> Result<Option<ExitStatus>> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("kubeconfig-").suffix(".yaml");
        let mut staged = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|err| ConnectError::io("Creating temporary file", err))?;

        staged
            .write_all(credential.as_bytes())
            .and_then(|()| staged.flush())
            .map_err(|err| ConnectError::io("Writing to temporary file", err))?;
        debug!(path = %staged.path().display(), "staged transient kubeconfig");

        println!("Launching temporary shell");
        let status = match Command::new(&self.shell.program)
            .args(&self.shell.args)
            .env(KUBECONFIG_ENV, staged.path())
            .status()
        {
            Ok(status) => {
                debug!(%status, "shell exited");
                Some(status)
            }
            Err(err) => {
                warn!(shell = %self.shell.program.display(), "failed to run shell: {err}");
                eprintln!("Error running shell: {err}");
                None
            }
        };

        println!("Shell session ended. Temporary kubeconfig will be cleaned up.");
        if let Err(err) = staged.close() {
            warn!("failed to remove temporary kubeconfig: {err}");
        }

        Ok(status)
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let mut backup = target.as_os_str().to_owned();
    backup.push(".backup");
    PathBuf::from(backup)
}

fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = open_private(path)?;
    file.write_all(bytes)
}

/// Open `path` for writing, restricted to the owner before anything is written.
fn open_private(path: &Path) -> io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(path)?;

    // `mode` only applies on creation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    Ok(file)
}
