use async_trait::async_trait;
use console::style;
use tracing::info;

use crate::config::Settings;
use crate::directory::{ClusterDirectory, ClusterSource};
use crate::error::Result;
use crate::launcher::{SessionLauncher, SessionMode, SessionOutcome};
use crate::locator::{locate_credential, CredentialFile};
use crate::management::ManagementHandle;
use crate::picker::Picker;
use crate::secret::{resolve_credential, SecretSource};

/// Turns a management kubeconfig on disk into something that can be queried.
#[async_trait]
pub trait Connector {
    type Handle: ClusterSource + SecretSource + Send + Sync;

    async fn connect(&self, file: &CredentialFile) -> Result<Self::Handle>;
}

pub struct KubeConnector;

#[async_trait]
impl Connector for KubeConnector {
    type Handle = ManagementHandle;

    async fn connect(&self, file: &CredentialFile) -> Result<ManagementHandle> {
        ManagementHandle::connect(file).await
    }
}

/// Pick a management cluster, pick one of its workload clusters, then hand
/// that cluster's kubeconfig to the launcher.
pub async fn connect<C: Connector + Sync>(
    settings: &Settings,
    connector: &C,
    picker: &mut dyn Picker,
    launcher: &SessionLauncher,
    mode: SessionMode,
) -> Result<SessionOutcome> {
    let file = locate_credential(&settings.credentials_dir, picker)?;
    let handle = connector.connect(&file).await?;

    let cluster = ClusterDirectory::new(&handle)
        .exclude_default_namespace(settings.exclude_default_namespace)
        .resolve(picker)
        .await?;
    println!(
        "Connecting on cluster {} (namespace: {})",
        style(&cluster.name).bold(),
        cluster.namespace
    );

    let credential = resolve_credential(&handle, &cluster).await?;
    info!(?mode, cluster = %cluster.name, "launching session");

    launcher.launch(mode, &cluster.name, &credential)
}
