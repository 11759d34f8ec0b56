//! End-to-end connect runs against in-memory management clusters.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use nkpkube::{
    connect,
    directory::{ClusterRecord, ClusterSource},
    locator::CredentialFile,
    picker::Choice,
    secret::SecretSource,
    ConnectError, Connector, Picker, Result, SessionLauncher, SessionMode, SessionOutcome,
    Settings, Shell,
};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct FakeManagement {
    clusters: Vec<ClusterRecord>,
    secrets: BTreeMap<(String, String), BTreeMap<String, Vec<u8>>>,
}

impl FakeManagement {
    fn cluster(mut self, namespace: &str, name: &str) -> Self {
        self.clusters.push(ClusterRecord::new(namespace, name));
        self
    }

    fn secret(mut self, namespace: &str, name: &str, field: &str, value: &[u8]) -> Self {
        self.secrets.insert(
            (namespace.to_string(), name.to_string()),
            BTreeMap::from([(field.to_string(), value.to_vec())]),
        );
        self
    }
}

#[async_trait]
impl ClusterSource for FakeManagement {
    async fn list_clusters(&self) -> Result<Vec<ClusterRecord>> {
        Ok(self.clusters.clone())
    }
}

#[async_trait]
impl SecretSource for FakeManagement {
    async fn secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>> {
        Ok(self
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

struct FakeConnector(FakeManagement);

#[async_trait]
impl Connector for FakeConnector {
    type Handle = FakeManagement;

    async fn connect(&self, file: &CredentialFile) -> Result<FakeManagement> {
        assert!(file.path().is_file());
        Ok(self.0.clone())
    }
}

struct NeverAsked;

impl Picker for NeverAsked {
    fn select(&mut self, prompt: &str, _: &[Choice]) -> Result<usize> {
        panic!("picker invoked for {prompt:?}");
    }
}

struct Answers(Vec<Option<usize>>);

impl Picker for Answers {
    fn select(&mut self, _: &str, _: &[Choice]) -> Result<usize> {
        self.0.remove(0).ok_or(ConnectError::SelectionCancelled)
    }
}

struct Home {
    dir: TempDir,
}

impl Home {
    fn with_credentials(names: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".kube/nkp")).unwrap();
        fs::create_dir_all(dir.path().join("tmp")).unwrap();
        for name in names {
            fs::write(dir.path().join(".kube/nkp").join(name), "apiVersion: v1\n").unwrap();
        }
        Self { dir }
    }

    fn kube_dir(&self) -> PathBuf {
        self.dir.path().join(".kube")
    }

    fn settings(&self) -> Settings {
        Settings::defaults(&self.kube_dir())
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

#[cfg(unix)]
fn recording_shell(home: &Home) -> Shell {
    Shell::new("/bin/sh")
        .arg("-c")
        .arg(r#"printf '%s' "$KUBECONFIG" > "$0"; cat "$KUBECONFIG" > "$1""#)
        .arg(home.path("seen-path"))
        .arg(home.path("seen-content"))
}

#[cfg(unix)]
fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[cfg(unix)]
#[tokio::test]
async fn transient_session_end_to_end() {
    let home = Home::with_credentials(&["mgmt.conf"]);
    let management = FakeManagement::default()
        .cluster("fleet", "prod")
        .secret("fleet", "prod-kubeconfig", "value", b"workload-kubeconfig");
    let launcher =
        SessionLauncher::new(home.kube_dir(), recording_shell(&home)).with_temp_dir(home.path("tmp"));

    let outcome = connect(
        &home.settings(),
        &FakeConnector(management),
        &mut NeverAsked,
        &launcher,
        SessionMode::Transient,
    )
    .await
    .unwrap();

    assert!(matches!(
        outcome,
        SessionOutcome::ShellExited { status: Some(status) } if status.success()
    ));
    let staged = PathBuf::from(fs::read_to_string(home.path("seen-path")).unwrap());
    assert_eq!(staged.parent(), Some(home.path("tmp").as_path()));
    assert_eq!(fs::read(home.path("seen-content")).unwrap(), b"workload-kubeconfig");
    assert!(!staged.exists());
    assert_eq!(count_entries(&home.path("tmp")), 0);
    assert!(!home.path(".kube/config").exists());
}

#[tokio::test]
async fn persistent_session_backs_up_the_previous_config() {
    let home = Home::with_credentials(&["a.conf", "b.conf"]);
    fs::write(home.path(".kube/config"), "previous").unwrap();
    let management = FakeManagement::default()
        .cluster("fleet", "prod")
        .cluster("fleet", "staging")
        .secret("fleet", "staging-kubeconfig", "value", b"staging-kubeconfig");
    let launcher = SessionLauncher::new(home.kube_dir(), Shell::new("/nonexistent"));

    let outcome = connect(
        &home.settings(),
        &FakeConnector(management),
        &mut Answers(vec![Some(1), Some(1)]),
        &launcher,
        SessionMode::Persist,
    )
    .await
    .unwrap();

    let (target, backup) = match outcome {
        SessionOutcome::Persisted { target, backup } => (target, backup),
        other => panic!("expected a persisted session, got {other:?}"),
    };
    assert_eq!(target, home.path(".kube/config"));
    assert_eq!(fs::read(&target).unwrap(), b"staging-kubeconfig");
    assert_eq!(backup, Some(home.path(".kube/config.backup")));
    assert_eq!(fs::read(home.path(".kube/config.backup")).unwrap(), b"previous");
}

#[tokio::test]
async fn default_namespace_exclusion_is_honoured() {
    let home = Home::with_credentials(&["mgmt.conf"]);
    let management = FakeManagement::default()
        .cluster("default", "kommander")
        .cluster("fleet", "prod")
        .secret("fleet", "prod-kubeconfig", "value", b"prod");
    let launcher = SessionLauncher::new(home.kube_dir(), Shell::new("/nonexistent"));
    let settings = Settings {
        exclude_default_namespace: true,
        ..home.settings()
    };

    let outcome = connect(
        &settings,
        &FakeConnector(management),
        &mut NeverAsked,
        &launcher,
        SessionMode::Persist,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, SessionOutcome::Persisted { backup: None, .. }));
    assert_eq!(fs::read(home.path(".kube/config")).unwrap(), b"prod");
}

#[tokio::test]
async fn missing_secret_stops_before_launch() {
    let home = Home::with_credentials(&["mgmt.conf"]);
    let management = FakeManagement::default().cluster("fleet", "prod");
    let launcher = SessionLauncher::new(home.kube_dir(), Shell::new("/nonexistent"));

    let err = connect(
        &home.settings(),
        &FakeConnector(management),
        &mut NeverAsked,
        &launcher,
        SessionMode::Persist,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConnectError::NotFound(_)));
    assert!(!home.path(".kube/config").exists());
}

#[tokio::test]
async fn secret_without_value_is_malformed() {
    let home = Home::with_credentials(&["mgmt.conf"]);
    let management = FakeManagement::default()
        .cluster("fleet", "prod")
        .secret("fleet", "prod-kubeconfig", "kubeconfig", b"wrong-key");
    let launcher = SessionLauncher::new(home.kube_dir(), Shell::new("/nonexistent"));

    let err = connect(
        &home.settings(),
        &FakeConnector(management),
        &mut NeverAsked,
        &launcher,
        SessionMode::Persist,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConnectError::MalformedCredential { .. }));
}

#[tokio::test]
async fn cancelling_the_cluster_prompt_aborts() {
    let home = Home::with_credentials(&["mgmt.conf"]);
    let management = FakeManagement::default()
        .cluster("fleet", "prod")
        .cluster("fleet", "staging");
    let launcher = SessionLauncher::new(home.kube_dir(), Shell::new("/nonexistent"));

    let err = connect(
        &home.settings(),
        &FakeConnector(management),
        &mut Answers(vec![None]),
        &launcher,
        SessionMode::Transient,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConnectError::SelectionCancelled));
}

#[tokio::test]
async fn no_credentials_is_not_found() {
    let home = Home::with_credentials(&[]);
    let launcher = SessionLauncher::new(home.kube_dir(), Shell::new("/nonexistent"));

    let err = connect(
        &home.settings(),
        &FakeConnector(FakeManagement::default()),
        &mut NeverAsked,
        &launcher,
        SessionMode::Transient,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConnectError::NotFound(msg) if msg.contains(".kube/nkp")));
}
