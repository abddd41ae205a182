// src/git/ops.rs
//! Low-level git operations using `git2`.

use super::VcsTransport;
use crate::config::Credentials;
use crate::errors::TransportFailure;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository,
};
use log::debug;
use std::path::Path;

/// [`VcsTransport`] backed by libgit2.
///
/// # Examples
///
/// ```no_run
/// use bitbucket_sync::config::Credentials;
/// use bitbucket_sync::git::{Git2Transport, VcsTransport};
/// use std::path::Path;
///
/// let creds = Credentials {
///     username: "alice".to_string(),
///     api_token: "token".to_string(),
/// };
/// let git = Git2Transport::new();
/// VcsTransport::clone_into(&git, "https://bitbucket.org/acme/alpha.git", &creds, Path::new("alpha"))
///     .unwrap();
/// git.pull(Path::new("alpha"), &creds).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Git2Transport {
    depth: Option<u32>,
}

impl Git2Transport {
    /// A transport that clones full history.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that clones only the last `depth` commits.
    pub fn shallow(depth: u32) -> Self {
        Self { depth: Some(depth) }
    }
}

/// Answers the first credential request with the username and token.
///
/// libgit2 asks again when the server rejects what it was given; the second
/// request is refused with an `Auth` error so a bad token fails fast instead
/// of looping.
fn create_remote_callbacks(credentials: &Credentials) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u32;

    callbacks.credentials(move |url, _username_from_url, allowed_types| {
        attempts += 1;
        if attempts > 1 {
            debug!("Credentials for {} were rejected", url);
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Callback,
                "credentials rejected by remote",
            ));
        }
        if !allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Callback,
                "remote does not accept username/token authentication",
            ));
        }
        debug!("Supplying HTTPS credentials for user '{}'", credentials.username);
        Cred::userpass_plaintext(&credentials.username, &credentials.api_token)
    });

    callbacks
}

fn create_fetch_options<'a>(credentials: &'a Credentials, depth: Option<u32>) -> FetchOptions<'a> {
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(create_remote_callbacks(credentials));
    fetch_options.prune(git2::FetchPrune::On);
    // Credentials must never follow a redirect past the first request.
    fetch_options.follow_redirects(git2::RemoteRedirect::Initial);
    if let Some(depth) = depth {
        fetch_options.depth(depth as i32);
        debug!("Set shallow clone depth to: {}", depth);
    }
    fetch_options
}

/// libgit2's local transport cannot serve shallow fetches.
fn supports_shallow(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("ssh://")
}

/// Sorts a libgit2 error into the categories the engine reports.
fn classify(err: git2::Error) -> TransportFailure {
    let message = err.message().to_string();
    match (err.code(), err.class()) {
        (ErrorCode::Auth, _) => TransportFailure::Auth(message),
        (ErrorCode::Certificate, _) => TransportFailure::Network(message),
        (_, ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssl | ErrorClass::Ssh) => {
            TransportFailure::Network(message)
        }
        _ => TransportFailure::Other(message),
    }
}

impl VcsTransport for Git2Transport {
    fn clone_into(
        &self,
        url: &str,
        credentials: &Credentials,
        dest: &Path,
    ) -> Result<(), TransportFailure> {
        let depth = self.depth.filter(|_| supports_shallow(url));
        let mut repo_builder = RepoBuilder::new();
        repo_builder.fetch_options(create_fetch_options(credentials, depth));

        debug!("Cloning '{}' into '{}'", url, dest.display());
        repo_builder.clone(url, dest).map_err(classify)?;
        Ok(())
    }

    fn pull(&self, path: &Path, credentials: &Credentials) -> Result<(), TransportFailure> {
        let repo = Repository::open(path).map_err(classify)?;

        let head_ref = repo
            .find_reference("HEAD")
            .map_err(classify)?
            .symbolic_target()
            .map(str::to_string)
            .ok_or_else(|| {
                TransportFailure::Other("HEAD is detached; nothing to pull into".to_string())
            })?;
        let branch = head_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&head_ref)
            .to_string();
        let upstream_ref = repo
            .branch_upstream_name(&head_ref)
            .ok()
            .and_then(|buf| buf.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("refs/remotes/origin/{}", branch));

        let mut remote = repo.find_remote("origin").map_err(classify)?;
        let mut fetch_options = create_fetch_options(credentials, None);
        remote
            .fetch(&[] as &[&str], Some(&mut fetch_options), None)
            .map_err(classify)?;

        let upstream = match repo.find_reference(&upstream_ref) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                if repo.head().is_err() {
                    debug!("Remote of '{}' is still empty", path.display());
                    return Ok(());
                }
                return Err(TransportFailure::Other(format!(
                    "upstream branch '{}' no longer exists",
                    upstream_ref
                )));
            }
            Err(e) => return Err(classify(e)),
        };
        let fetched = repo
            .reference_to_annotated_commit(&upstream)
            .map_err(classify)?;
        let (analysis, _) = repo.merge_analysis(&[&fetched]).map_err(classify)?;

        if analysis.is_up_to_date() {
            debug!("'{}' is already up to date", branch);
            return Ok(());
        }
        if !(analysis.is_fast_forward() || analysis.is_unborn()) {
            return Err(TransportFailure::Diverged { branch });
        }

        let target = fetched.id();
        let object = repo.find_object(target, None).map_err(classify)?;
        repo.checkout_tree(&object, Some(CheckoutBuilder::new().safe()))
            .map_err(classify)?;
        repo.reference(
            &head_ref,
            target,
            true,
            &format!("pull: fast-forward to {}", target),
        )
        .map_err(classify)?;
        repo.set_head(&head_ref).map_err(classify)?;
        debug!("Fast-forwarded '{}' to {}", branch, target);
        Ok(())
    }
}
