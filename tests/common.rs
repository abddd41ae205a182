// tests/common.rs
// Not every integration test uses every helper.
#![allow(dead_code)]

use anyhow::Result;
use bitbucket_sync::archive::ZipCompressor;
use bitbucket_sync::config::Credentials;
use bitbucket_sync::core_types::{ListingPage, RepositoryDescriptor};
use bitbucket_sync::errors::{RemoteError, TransportFailure};
use bitbucket_sync::fs_attrs::PlatformAttributeFixer;
use bitbucket_sync::git::VcsTransport;
use bitbucket_sync::remote::RemoteListing;
use bitbucket_sync::{CancellationToken, Collaborators};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

/// The compiled binary, for CLI-level tests.
pub fn bitbucket_sync_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bitbucket-sync"))
}

/// Shorthand for a descriptor with a fake HTTPS clone URL.
pub fn repo(slug: &str, project: Option<&str>) -> RepositoryDescriptor {
    let desc = RepositoryDescriptor::new(
        slug,
        format!("https://bitbucket.example/acme/{}.git", slug),
    );
    match project {
        Some(key) => desc.with_project(key),
        None => desc,
    }
}

// --- Remote listing fake ---

/// An in-memory workspace listing.
///
/// Pages are chained with tokens `p1`, `p2`, ... The page at `fail_at`, if
/// set, returns a network error instead of its items.
pub struct FakeListing {
    pages: Vec<Vec<RepositoryDescriptor>>,
    probe_reply: Result<(), RemoteError>,
    fail_at: Option<usize>,
    pub probe_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeListing {
    pub fn new(pages: Vec<Vec<RepositoryDescriptor>>) -> Self {
        Self {
            pages,
            probe_reply: Ok(()),
            fail_at: None,
            probe_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn single_page(items: Vec<RepositoryDescriptor>) -> Self {
        Self::new(vec![items])
    }

    pub fn with_probe_reply(mut self, reply: Result<(), RemoteError>) -> Self {
        self.probe_reply = reply;
        self
    }

    pub fn failing_at_page(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl RemoteListing for FakeListing {
    fn probe(&self, _workspace: &str) -> Result<(), RemoteError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probe_reply.clone()
    }

    fn fetch_page(
        &self,
        _workspace: &str,
        page_token: Option<&str>,
    ) -> Result<ListingPage, RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let index = match page_token {
            None => 0,
            Some(token) => token
                .trim_start_matches('p')
                .parse::<usize>()
                .map_err(|e| RemoteError::Decode(e.to_string()))?,
        };
        if self.fail_at == Some(index) {
            return Err(RemoteError::Network("connection reset by peer".into()));
        }
        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < self.pages.len()).then(|| format!("p{}", index + 1));
        Ok(ListingPage {
            items,
            next_page_token,
        })
    }
}

// --- Version control fake ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Clone { url: String, dest: PathBuf },
    Pull { path: PathBuf },
}

/// Records every call and materializes clones as real one-commit repositories,
/// so later runs classify them as working copies.
#[derive(Default)]
pub struct FakeVcs {
    calls: Mutex<Vec<VcsCall>>,
    fail_clone: HashSet<String>,
    fail_pull: HashSet<String>,
    cancel_on_clone: Option<CancellationToken>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones of any URL ending in `/<slug>.git` fail with a network error.
    pub fn failing_clone(mut self, slug: &str) -> Self {
        self.fail_clone.insert(slug.to_string());
        self
    }

    /// Pulls into any directory named `slug` fail with a network error.
    pub fn failing_pull(mut self, slug: &str) -> Self {
        self.fail_pull.insert(slug.to_string());
        self
    }

    /// Cancels `token` from inside the first clone, as a Ctrl+C would.
    pub fn cancelling_on_clone(mut self, token: CancellationToken) -> Self {
        self.cancel_on_clone = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: VcsCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl VcsTransport for FakeVcs {
    fn clone_into(
        &self,
        url: &str,
        _credentials: &Credentials,
        dest: &Path,
    ) -> Result<(), TransportFailure> {
        self.record(VcsCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        if let Some(token) = &self.cancel_on_clone {
            token.cancel();
        }
        let slug = url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .trim_end_matches(".git");
        if self.fail_clone.contains(slug) {
            fs::create_dir_all(dest).ok();
            return Err(TransportFailure::Network("could not resolve host".into()));
        }
        init_working_copy(dest, slug).map_err(|e| TransportFailure::Other(e.to_string()))
    }

    fn pull(&self, path: &Path, _credentials: &Credentials) -> Result<(), TransportFailure> {
        self.record(VcsCall::Pull {
            path: path.to_path_buf(),
        });
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.fail_pull.contains(name) {
            return Err(TransportFailure::Network("connection timed out".into()));
        }
        Ok(())
    }
}

/// A non-bare repository with one committed README.
pub fn init_working_copy(dest: &Path, slug: &str) -> Result<()> {
    let repo = git2::Repository::init(dest)?;
    fs::write(dest.join("README.md"), format!("# {}\n", slug))?;
    let mut index = repo.index()?;
    index.add_path(Path::new("README.md"))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = git2::Signature::now("Test User", "test@example.com")?;
    repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])?;
    Ok(())
}

// --- Wiring ---

/// Fakes for the remote and the transport; the real compressor and fixer.
pub fn collaborators(
    listing: Arc<FakeListing>,
    vcs: Arc<dyn VcsTransport>,
    scratch_root: &Path,
) -> Collaborators {
    Collaborators {
        listing,
        vcs,
        compressor: Arc::new(ZipCompressor),
        fixer: Arc::new(PlatformAttributeFixer),
        scratch_root: Some(scratch_root.to_path_buf()),
    }
}

/// Entries directly under `dir`, sorted.
pub fn entries(dir: &Path) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

// --- Real git remotes ---

/// A temporary BARE repository reachable over `file://`.
pub struct TestRemote {
    _temp_dir: TempDir,
    pub repo: git2::Repository,
    pub url: String,
}

impl TestRemote {
    /// An empty bare repository whose HEAD points at `main`.
    pub fn new() -> Result<Self> {
        let temp_dir = tempdir()?;
        let repo = git2::Repository::init_bare(temp_dir.path())?;
        repo.set_head("refs/heads/main")?;
        let url = file_url(temp_dir.path());
        Ok(Self {
            _temp_dir: temp_dir,
            repo,
            url,
        })
    }

    /// Commits `path` with `content` on top of `branch`, creating the branch if needed.
    pub fn commit_file(&self, branch: &str, path: &str, content: &str, msg: &str) -> Result<()> {
        let signature = git2::Signature::now("Test User", "test@example.com")?;
        let parent = self
            .repo
            .find_branch(branch, git2::BranchType::Local)
            .ok()
            .and_then(|b| b.get().peel_to_commit().ok());
        let parent_tree = parent.as_ref().and_then(|c| c.tree().ok());

        let mut builder = self.repo.treebuilder(parent_tree.as_ref())?;
        let blob = self.repo.blob(content.as_bytes())?;
        builder.insert(path, blob, 0o100644)?;
        let tree = self.repo.find_tree(builder.write()?)?;

        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(None, &signature, &signature, msg, &tree, &parents)?;
        let commit = self.repo.find_commit(oid)?;
        self.repo.branch(branch, &commit, true)?;
        Ok(())
    }
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy();
    if cfg!(windows) {
        format!("file:///{}", path.replace('\\', "/"))
    } else {
        format!("file://{}", path)
    }
}
