//! Artifact downloads into build contexts.
//!
//! Each artifact is checked on disk individually before fetching, so an
//! interrupted fetch set resumes where it stopped on the next invocation.
//! Downloads land in a `.part` file and are renamed only once complete.

use std::path::{Path, PathBuf};

use dbdeploy_catalog::resolver::{Artifact, ArtifactSet};
use dbdeploy_common::error::{DeployError, Result};

use crate::hash;

/// Downloads a URL to a local file.
pub trait ArtifactFetcher {
    /// Fetches `url` and writes it to `dest`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Build` if the download fails.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// [`ArtifactFetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a fresh HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("dbdeploy/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .map_err(|e| DeployError::Config {
                message: format!("failed to initialize HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let fail = |message: String| DeployError::Build {
            image: url.to_string(),
            stage: "fetch",
            message,
        };

        tracing::info!(url, dest = %dest.display(), "downloading artifact");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }

        let part = part_path(dest);
        let mut file = std::fs::File::create(&part)
            .map_err(|e| fail(format!("{}: {e}", part.display())))?;
        let copied = response.copy_to(&mut file);
        drop(file);
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = std::fs::remove_file(&part);
                return Err(fail(e.to_string()));
            }
        };

        std::fs::rename(&part, dest).map_err(|e| fail(format!("{}: {e}", dest.display())))?;

        #[allow(clippy::cast_precision_loss)]
        let mb = bytes as f64 / 1_048_576.0;
        tracing::info!(file = %dest.display(), "downloaded {mb:.1} MB");
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Outcome of realizing an artifact set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Files downloaded during this call.
    pub fetched: Vec<String>,
    /// Files already present and left untouched.
    pub present: Vec<String>,
}

/// Fetches every artifact of `set` that is not yet on disk.
///
/// The target directory is created if missing. A freshly fetched artifact
/// with a declared checksum is verified and removed again on mismatch.
///
/// # Errors
///
/// Returns `DeployError::Build` if the directory cannot be created, a
/// download fails, or a checksum does not match.
pub fn fetch_missing(fetcher: &dyn ArtifactFetcher, set: &ArtifactSet) -> Result<FetchReport> {
    std::fs::create_dir_all(&set.dir).map_err(|e| DeployError::Build {
        image: set.dir.display().to_string(),
        stage: "fetch",
        message: format!("cannot create artifact directory: {e}"),
    })?;

    let mut report = FetchReport::default();
    for artifact in &set.items {
        let path = set.dir.join(&artifact.file_name);
        if path.exists() {
            tracing::info!(file = %artifact.file_name, "already exists");
            report.present.push(artifact.file_name.clone());
            continue;
        }
        fetch_one(fetcher, artifact, &path)?;
        report.fetched.push(artifact.file_name.clone());
    }
    Ok(report)
}

fn fetch_one(fetcher: &dyn ArtifactFetcher, artifact: &Artifact, path: &Path) -> Result<()> {
    fetcher.fetch(&artifact.url, path)?;
    if let Some(expected) = &artifact.sha256 {
        if let Err(e) = hash::validate_hash(path, expected) {
            let _ = std::fs::remove_file(path);
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use dbdeploy_common::error::ErrorKind;
    use dbdeploy_common::types::Sha256Hash;

    use super::*;

    /// Writes a fixed payload and records every requested URL.
    #[derive(Default)]
    struct RecordingFetcher {
        calls: RefCell<Vec<String>>,
    }

    impl ArtifactFetcher for RecordingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            self.calls.borrow_mut().push(url.to_string());
            std::fs::write(dest, b"hello\n").map_err(|e| DeployError::Build {
                image: url.to_string(),
                stage: "fetch",
                message: e.to_string(),
            })
        }
    }

    fn artifact(name: &str, sha256: Option<&str>) -> Artifact {
        Artifact {
            file_name: name.to_string(),
            url: format!("https://dl.example.com/{name}"),
            sha256: sha256.map(|h| Sha256Hash::from_hex(h).expect("hex")),
        }
    }

    #[test]
    fn fetch_missing_creates_directory_and_fetches_all() {
        let dir = tempfile::tempdir().expect("tempdir");
        let set = ArtifactSet {
            dir: dir.path().join("mysql").join("5.0.15"),
            items: vec![artifact("a.tar.gz", None), artifact("b.tar.gz", None)],
        };
        let fetcher = RecordingFetcher::default();

        let report = fetch_missing(&fetcher, &set).expect("fetch");
        assert_eq!(report.fetched, vec!["a.tar.gz", "b.tar.gz"]);
        assert!(set.dir.join("a.tar.gz").exists());
        assert_eq!(fetcher.calls.borrow().len(), 2);
    }

    #[test]
    fn fetch_missing_skips_present_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.tar.gz"), b"cached").expect("write");
        let set = ArtifactSet {
            dir: dir.path().to_path_buf(),
            items: vec![artifact("a.tar.gz", None), artifact("b.tar.gz", None)],
        };
        let fetcher = RecordingFetcher::default();

        let report = fetch_missing(&fetcher, &set).expect("fetch");
        assert_eq!(report.present, vec!["a.tar.gz"]);
        assert_eq!(report.fetched, vec!["b.tar.gz"]);
        assert_eq!(
            *fetcher.calls.borrow(),
            vec!["https://dl.example.com/b.tar.gz".to_string()]
        );
    }

    #[test]
    fn fetch_missing_second_run_fetches_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let set = ArtifactSet {
            dir: dir.path().to_path_buf(),
            items: vec![artifact("a.tar.gz", None)],
        };
        let fetcher = RecordingFetcher::default();
        let _ = fetch_missing(&fetcher, &set).expect("first");
        let report = fetch_missing(&fetcher, &set).expect("second");
        assert!(report.fetched.is_empty());
        assert_eq!(fetcher.calls.borrow().len(), 1);
    }

    #[test]
    fn checksum_mismatch_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let set = ArtifactSet {
            dir: dir.path().to_path_buf(),
            items: vec![artifact("a.tar.gz", Some("0".repeat(64).as_str()))],
        };
        let err = fetch_missing(&RecordingFetcher::default(), &set).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "verify", .. }));
        assert!(!dir.path().join("a.tar.gz").exists());
    }

    #[test]
    fn checksum_match_keeps_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let set = ArtifactSet {
            dir: dir.path().to_path_buf(),
            items: vec![artifact(
                "a.tar.gz",
                Some("5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"),
            )],
        };
        let _ = fetch_missing(&RecordingFetcher::default(), &set).expect("fetch");
        assert!(dir.path().join("a.tar.gz").exists());
    }

    #[test]
    fn unwritable_artifact_directory_is_build_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("download");
        std::fs::write(&blocker, b"not a directory").expect("write");
        let set = ArtifactSet {
            dir: blocker.join("mysql").join("5.0.15"),
            items: vec![artifact("a.tar.gz", None)],
        };
        let fetcher = RecordingFetcher::default();

        let err = fetch_missing(&fetcher, &set).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "fetch", .. }));
        assert_eq!(err.kind(), ErrorKind::Build);
        assert!(fetcher.calls.borrow().is_empty());
    }

    // -- HttpFetcher against a local responder ------------------------------

    /// Answers a single HTTP request with `response`, then closes.
    fn serve_http(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let _ = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response);
            }
        });
        format!("http://{addr}/a.tar.gz")
    }

    fn local_fetcher() -> HttpFetcher {
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .build()
            .expect("client");
        HttpFetcher { client }
    }

    fn dir_listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn http_fetch_leaves_only_completed_file() {
        let url = serve_http(
            b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\nhello\n",
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("a.tar.gz");

        local_fetcher().fetch(&url, &dest).expect("fetch");
        assert_eq!(std::fs::read(&dest).expect("read"), b"hello\n");
        assert_eq!(dir_listing(dir.path()), vec!["a.tar.gz"]);
    }

    #[test]
    fn http_error_status_is_fetch_failure() {
        let url = serve_http(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("a.tar.gz");

        let err = local_fetcher().fetch(&url, &dest).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "fetch", .. }));
        assert!(err.to_string().contains("404"), "got: {err}");
        assert!(dir_listing(dir.path()).is_empty());
    }

    #[test]
    fn truncated_body_leaves_no_file_behind() {
        let url = serve_http(
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nhello\n",
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("a.tar.gz");

        let err = local_fetcher().fetch(&url, &dest).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "fetch", .. }));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/a.tar.gz")),
            PathBuf::from("/tmp/a.tar.gz.part")
        );
    }
}
