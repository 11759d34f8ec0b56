use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{ConnectError, Result};
use crate::picker::{pick_one, Picker};

// region: Cluster API resource
pub const CLUSTER_GROUP: &str = "cluster.x-k8s.io";
pub const CLUSTER_VERSION: &str = "v1beta1";
pub const CLUSTER_KIND: &str = "Cluster";
pub const CLUSTER_PLURAL: &str = "clusters";
// endregion

pub const CLUSTER_PROMPT: &str = "Select cluster > ";
pub const DEFAULT_NAMESPACE: &str = "default";

/// A workload cluster registered with the management cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRecord {
    pub name: String,
    pub namespace: String,
    pub created_at: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ClusterRecord {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            created_at: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn age(&self, now: DateTime<Utc>) -> String {
        match self.created_at {
            Some(created_at) => format_age((now - created_at).num_seconds()),
            None => "unknown".to_string(),
        }
    }

    pub fn preview(&self, now: DateTime<Utc>) -> String {
        format!(
            "Name: {}\nNamespace: {}\nCreated: {}\n",
            self.name,
            self.namespace,
            self.age(now)
        )
    }
}

/// Render an elapsed time the way kubectl's AGE column does.
///
/// Months are a flat 30 days. Negative input (clock skew) reads as `0s`.
pub fn format_age(seconds: i64) -> String {
    let seconds = seconds.max(0);
    match seconds {
        s if s < 60 => format!("{s}s"),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s if s < 2_592_000 => format!("{}d", s / 86_400),
        s => format!("{}M", s / 2_592_000),
    }
}

#[async_trait]
pub trait ClusterSource {
    /// All `clusters.cluster.x-k8s.io` objects, across every namespace.
    async fn list_clusters(&self) -> Result<Vec<ClusterRecord>>;
}

pub struct ClusterDirectory<'a, S: ?Sized> {
    source: &'a S,
    exclude_default_namespace: bool,
}

impl<'a, S: ClusterSource + Sync + ?Sized> ClusterDirectory<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            exclude_default_namespace: false,
        }
    }

    pub fn exclude_default_namespace(mut self, exclude: bool) -> Self {
        self.exclude_default_namespace = exclude;
        self
    }

    /// Clusters eligible for selection, ordered by namespace then name.
    pub async fn candidates(&self) -> Result<Vec<ClusterRecord>> {
        let mut clusters = self.source.list_clusters().await?;
        debug!(count = clusters.len(), "listed Cluster API clusters");

        if self.exclude_default_namespace {
            clusters.retain(|cluster| cluster.namespace != DEFAULT_NAMESPACE);
        }
        clusters.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

        Ok(clusters)
    }

    pub async fn resolve(&self, picker: &mut dyn Picker) -> Result<ClusterRecord> {
        let clusters = self.candidates().await?;
        let now = Utc::now();
        let preview = |cluster: &ClusterRecord| cluster.preview(now);

        let cluster = pick_one(
            picker,
            CLUSTER_PROMPT,
            clusters,
            |cluster| cluster.name.clone(),
            Some(&preview),
            || ConnectError::NotFound("no CAPI clusters found in the kubernetes cluster".into()),
        )?;

        info!(cluster = %cluster.name, namespace = %cluster.namespace, "selected workload cluster");
        Ok(cluster)
    }
}
