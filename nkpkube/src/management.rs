//! Access to the management cluster selected on disk.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config, ResourceExt,
};
use tracing::debug;

use crate::directory::{
    ClusterRecord, ClusterSource, CLUSTER_GROUP, CLUSTER_KIND, CLUSTER_PLURAL, CLUSTER_VERSION,
};
use crate::error::{ConnectError, Result};
use crate::locator::CredentialFile;
use crate::secret::SecretSource;

/// Client for one management cluster, built from its kubeconfig's current context.
#[derive(Clone)]
pub struct ManagementHandle {
    client: Client,
}

impl ManagementHandle {
    pub async fn connect(file: &CredentialFile) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(file.path())
            .map_err(|err| ConnectError::kubeconfig(file.path(), err))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|err| ConnectError::kubeconfig(file.path(), err))?;
        debug!(server = %config.cluster_url, "connecting to management cluster");

        let client = Client::try_from(config)
            .map_err(|err| ConnectError::upstream("Creating kubernetes client", err))?;

        Ok(Self { client })
    }

    fn clusters(&self) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(CLUSTER_GROUP, CLUSTER_VERSION, CLUSTER_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, CLUSTER_PLURAL);
        Api::all_with(self.client.clone(), &resource)
    }
}

#[async_trait]
impl ClusterSource for ManagementHandle {
    async fn list_clusters(&self) -> Result<Vec<ClusterRecord>> {
        let list = self
            .clusters()
            .list(&ListParams::default())
            .await
            .map_err(|err| ConnectError::upstream("Listing Cluster API clusters", err))?;

        Ok(list.items.into_iter().map(ClusterRecord::from).collect())
    }
}

#[async_trait]
impl SecretSource for ManagementHandle {
    async fn secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets.get_opt(name).await.map_err(|err| {
            ConnectError::upstream(
                format!("Fetching secret '{name}' in namespace '{namespace}'"),
                err,
            )
        })?;

        Ok(secret.map(|secret| {
            secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect()
        }))
    }
}

impl From<DynamicObject> for ClusterRecord {
    fn from(obj: DynamicObject) -> Self {
        ClusterRecord {
            name: obj.name_any(),
            namespace: obj.namespace().unwrap_or_default(),
            created_at: obj.creation_timestamp().as_ref().and_then(to_utc),
            labels: obj.labels().clone(),
            annotations: obj.annotations().clone(),
        }
    }
}

// Goes through the wire format so this does not care which time crate k8s-openapi is built on.
fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let serde_json::Value::String(raw) = serde_json::to_value(time).ok()? else {
        return None;
    };
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
