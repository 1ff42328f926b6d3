//! Browser-extension packaging and store publishing
//!
//! Independent of the release flow: given a build directory and a version,
//! stamp the version into `manifest.json`, zip the directory and push it to
//! the Chrome Web Store. Only runs from the master branch.

pub mod archive;
pub mod credentials;
pub mod store;

pub use archive::{Archiver, ZipCommand};
pub use credentials::{Secret, StoreCredentials};
pub use store::{ChromeWebStore, StoreApi};

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ReleaseError, Result};
use crate::git::Vcs;
use crate::manifest::ManifestWriter;

/// Manifest file stamped inside the build directory
pub const EXTENSION_MANIFEST: &str = "manifest.json";

/// What to publish, and from which branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub branch: String,
    pub build_dir: PathBuf,
    pub version: String,
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub version: String,
    pub archive: PathBuf,
    pub extension_id: String,
}

/// Pick the branch a publish runs from: the CI override when set, else HEAD
pub fn resolve_branch<V: Vcs>(ci_value: Option<String>, vcs: &V) -> Result<String> {
    match ci_value.filter(|branch| !branch.trim().is_empty()) {
        Some(branch) => Ok(branch.trim().to_string()),
        None => Ok(vcs.status()?.current_branch),
    }
}

pub struct PackagePublisher<'a, S: StoreApi, A: Archiver, M: ManifestWriter> {
    store: &'a S,
    archiver: &'a A,
    manifests: &'a M,
    master: String,
    output_dir: PathBuf,
}

impl<'a, S: StoreApi, A: Archiver, M: ManifestWriter> PackagePublisher<'a, S, A, M> {
    pub fn new(store: &'a S, archiver: &'a A, manifests: &'a M) -> Self {
        PackagePublisher {
            store,
            archiver,
            manifests,
            master: "master".to_string(),
            output_dir: PathBuf::from("."),
        }
    }

    /// Branch publishing is restricted to
    pub fn with_master(mut self, master: impl Into<String>) -> Self {
        self.master = master.into();
        self
    }

    /// Directory the `v<version>.zip` archive is written to
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Fail with [ReleaseError::WrongBranch] unless `branch` is the master branch
    pub fn check_branch(&self, branch: &str) -> Result<()> {
        if branch != self.master {
            return Err(ReleaseError::WrongBranch {
                expected: self.master.clone(),
                actual: branch.to_string(),
            });
        }
        Ok(())
    }

    /// Archive path for a version
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.output_dir.join(format!("v{}.zip", version))
    }

    /// Stamp, archive, upload and publish one build.
    ///
    /// Branch and credentials are checked before anything is written. The
    /// publish call is never made when the upload fails.
    pub fn publish(
        &self,
        request: &PublishRequest,
        credentials: &StoreCredentials,
    ) -> Result<PublishReport> {
        self.check_branch(&request.branch)?;
        credentials.validate()?;

        let manifest = request.build_dir.join(EXTENSION_MANIFEST);
        info!("Updating version in {}", manifest.display());
        self.manifests.set_version(&manifest, &request.version)?;

        let archive = self.archive_path(&request.version);
        info!("Zipping {} into {}", request.build_dir.display(), archive.display());
        self.archiver.archive(&request.build_dir, &archive)?;

        info!("Fetching access token");
        let token = self.store.exchange_token(
            &credentials.client_id,
            &credentials.client_secret,
            &credentials.refresh_token,
        )?;

        info!(extension = %credentials.extension_id, "Uploading {}", archive.display());
        if let Err(e) = self
            .store
            .upload(&token, &archive, &credentials.extension_id)
        {
            warn!("upload failed; not publishing");
            return Err(e);
        }

        info!(extension = %credentials.extension_id, "Publishing");
        self.store.publish(&token, &credentials.extension_id)?;

        info!("Published v{}", request.version);
        Ok(PublishReport {
            version: request.version.clone(),
            archive,
            extension_id: credentials.extension_id.clone(),
        })
    }
}

/// Default build directory relative to a working directory
pub fn build_dir_in(workdir: &Path, build_dir: &str) -> PathBuf {
    let path = Path::new(build_dir);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockVcs;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeStore {
        calls: RefCell<Vec<String>>,
        fail_upload: bool,
        fail_publish: bool,
    }

    impl StoreApi for FakeStore {
        fn exchange_token(&self, client_id: &str, _: &Secret, _: &Secret) -> Result<Secret> {
            self.calls.borrow_mut().push(format!("token {}", client_id));
            Ok(Secret::new("access"))
        }

        fn upload(&self, token: &Secret, zip_path: &Path, extension_id: &str) -> Result<()> {
            assert_eq!(token.expose(), "access");
            self.calls
                .borrow_mut()
                .push(format!("upload {} {}", zip_path.display(), extension_id));
            if self.fail_upload {
                return Err(ReleaseError::UploadFailed("PKG_INVALID".into()));
            }
            Ok(())
        }

        fn publish(&self, _: &Secret, extension_id: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("publish {}", extension_id));
            if self.fail_publish {
                return Err(ReleaseError::PublishFailed("ITEM_NOT_UPDATABLE".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeArchiver {
        archives: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl Archiver for FakeArchiver {
        fn archive(&self, source_dir: &Path, destination: &Path) -> Result<()> {
            self.archives
                .borrow_mut()
                .push((source_dir.to_path_buf(), destination.to_path_buf()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeManifests {
        writes: RefCell<Vec<(PathBuf, String)>>,
    }

    impl ManifestWriter for FakeManifests {
        fn set_version(&self, path: &Path, version: &str) -> Result<()> {
            self.writes
                .borrow_mut()
                .push((path.to_path_buf(), version.to_string()));
            Ok(())
        }
    }

    fn credentials() -> StoreCredentials {
        StoreCredentials {
            client_id: "cid".into(),
            client_secret: Secret::new("secret"),
            refresh_token: Secret::new("refresh"),
            extension_id: "ext".into(),
        }
    }

    fn request(branch: &str) -> PublishRequest {
        PublishRequest {
            branch: branch.into(),
            build_dir: PathBuf::from("build"),
            version: "1.3.0".into(),
        }
    }

    #[test]
    fn test_publish_runs_all_steps_in_order() {
        let store = FakeStore::default();
        let archiver = FakeArchiver::default();
        let manifests = FakeManifests::default();
        let publisher = PackagePublisher::new(&store, &archiver, &manifests).with_output_dir("out");

        let report = publisher.publish(&request("master"), &credentials()).unwrap();

        assert_eq!(report.archive, PathBuf::from("out/v1.3.0.zip"));
        assert_eq!(
            manifests.writes.borrow().clone(),
            vec![(PathBuf::from("build/manifest.json"), "1.3.0".to_string())]
        );
        assert_eq!(
            archiver.archives.borrow().clone(),
            vec![(PathBuf::from("build"), PathBuf::from("out/v1.3.0.zip"))]
        );
        assert_eq!(
            store.calls.borrow().clone(),
            vec!["token cid", "upload out/v1.3.0.zip ext", "publish ext"]
        );
    }

    #[test]
    fn test_wrong_branch_has_no_side_effects() {
        let store = FakeStore::default();
        let archiver = FakeArchiver::default();
        let manifests = FakeManifests::default();
        let publisher = PackagePublisher::new(&store, &archiver, &manifests);

        let err = publisher.publish(&request("develop"), &credentials()).unwrap_err();

        assert!(matches!(err, ReleaseError::WrongBranch { ref actual, .. } if actual == "develop"));
        assert!(manifests.writes.borrow().is_empty());
        assert!(archiver.archives.borrow().is_empty());
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn test_blank_credentials_fail_before_side_effects() {
        let store = FakeStore::default();
        let archiver = FakeArchiver::default();
        let manifests = FakeManifests::default();
        let publisher = PackagePublisher::new(&store, &archiver, &manifests);
        let mut creds = credentials();
        creds.refresh_token = Secret::new("");

        let err = publisher.publish(&request("master"), &creds).unwrap_err();

        assert!(matches!(err, ReleaseError::MissingCredential(_)));
        assert!(manifests.writes.borrow().is_empty());
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn test_upload_failure_skips_publish() {
        let store = FakeStore {
            fail_upload: true,
            ..FakeStore::default()
        };
        let archiver = FakeArchiver::default();
        let manifests = FakeManifests::default();
        let publisher = PackagePublisher::new(&store, &archiver, &manifests);

        let err = publisher.publish(&request("master"), &credentials()).unwrap_err();

        assert!(matches!(err, ReleaseError::UploadFailed(_)));
        assert!(!store.calls.borrow().iter().any(|c| c.starts_with("publish")));
    }

    #[test]
    fn test_publish_failure_is_distinct() {
        let store = FakeStore {
            fail_publish: true,
            ..FakeStore::default()
        };
        let archiver = FakeArchiver::default();
        let manifests = FakeManifests::default();
        let publisher = PackagePublisher::new(&store, &archiver, &manifests).with_master("main");

        let err = publisher.publish(&request("main"), &credentials()).unwrap_err();

        assert!(matches!(err, ReleaseError::PublishFailed(_)));
    }

    #[test]
    fn test_resolve_branch_prefers_ci_value() {
        let vcs = MockVcs::new("develop");
        assert_eq!(resolve_branch(Some("master".into()), &vcs).unwrap(), "master");
        assert_eq!(resolve_branch(Some("  ".into()), &vcs).unwrap(), "develop");
        assert_eq!(resolve_branch(None, &vcs).unwrap(), "develop");
    }

    #[test]
    fn test_build_dir_in_workdir() {
        assert_eq!(
            build_dir_in(Path::new("/srv/ext"), "build"),
            PathBuf::from("/srv/ext/build")
        );
        assert_eq!(build_dir_in(Path::new("/srv/ext"), "/tmp/b"), PathBuf::from("/tmp/b"));
    }
}
