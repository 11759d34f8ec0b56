pub mod config;
pub mod connect;
pub mod directory;
pub mod error;
pub mod launcher;
pub mod locator;
pub mod management;
pub mod picker;
pub mod secret;

use std::io;
use std::path::PathBuf;

pub use config::Settings;
pub use connect::{connect, Connector, KubeConnector};
pub use error::{ConnectError, Result};
pub use launcher::{SessionLauncher, SessionMode, SessionOutcome, Shell};
pub use picker::{FuzzyPicker, Picker};

pub fn kube_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConnectError::io(
            "Getting home directory",
            io::Error::new(io::ErrorKind::NotFound, "no home directory for the current user"),
        )
    })?;
    Ok(home.join(".kube"))
}
