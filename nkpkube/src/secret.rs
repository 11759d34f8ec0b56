use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use tracing::debug;

use crate::directory::ClusterRecord;
use crate::error::{ConnectError, Result};

pub const CREDENTIAL_FIELD: &str = "value";

/// Raw kubeconfig bytes for a workload cluster.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential(Vec<u8>);

impl AccessCredential {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Never print the payload, it carries client keys.
impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessCredential")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

#[async_trait]
pub trait SecretSource {
    /// Decoded data of secret `name` in `namespace`, or `None` if it does not exist.
    async fn secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>>;
}

pub fn secret_name(cluster_name: &str) -> String {
    format!("{cluster_name}-kubeconfig")
}

pub fn extract_credential(
    secret: &str,
    mut data: BTreeMap<String, Vec<u8>>,
) -> Result<AccessCredential> {
    match data.remove(CREDENTIAL_FIELD) {
        Some(bytes) if !bytes.is_empty() => Ok(AccessCredential(bytes)),
        _ => Err(ConnectError::MalformedCredential {
            secret: secret.to_string(),
            field: CREDENTIAL_FIELD,
        }),
    }
}

pub async fn resolve_credential<S>(source: &S, cluster: &ClusterRecord) -> Result<AccessCredential>
where
    S: SecretSource + Sync + ?Sized,
{
    let name = secret_name(&cluster.name);
    debug!(secret = %name, namespace = %cluster.namespace, "fetching kubeconfig secret");

    let data = source
        .secret_data(&cluster.namespace, &name)
        .await?
        .ok_or_else(|| {
            ConnectError::NotFound(format!(
                "Could not find secret '{name}' in namespace '{}'",
                cluster.namespace
            ))
        })?;

    extract_credential(&name, data)
}
