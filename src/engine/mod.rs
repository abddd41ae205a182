//! The Convergence Engine.
//!
//! For each descriptor the engine resolves the destination, classifies what
//! is there ([`state::classify`]), looks up the transition for the configured
//! output format ([`state::plan`]) and carries it out. Every per-repository
//! error is caught and recorded; nothing a single repository does can end
//! the run.

pub mod state;

use crate::archive::{Archiver, Compressor};
use crate::cancellation::CancellationToken;
use crate::config::Config;
use crate::core_types::{Action, OutcomeRecord, RepositoryDescriptor};
use crate::errors::{repo_io_error, Error, ListingError, RepoError, TransportOp};
use crate::fs_attrs::{remove_dir_with_retry, AttributeFixer};
use crate::git::VcsTransport;
use crate::paths::{self, is_safe_component};
use crate::progress::ProgressReporter;
use state::Transition;
use std::fs;
use std::path::Path;

/// What a batch of convergences produced.
#[derive(Debug, Default)]
pub struct EngineRun {
    /// One record per dispatched descriptor, in dispatch order.
    pub records: Vec<OutcomeRecord>,
    /// Set when the inventory failed part-way; no descriptor after it was dispatched.
    pub listing_error: Option<ListingError>,
    /// Set when cancellation stopped dispatch before the inventory was exhausted.
    pub interrupted: bool,
}

/// Drives each repository to its target local state.
pub struct Engine<'a> {
    config: &'a Config,
    vcs: &'a dyn VcsTransport,
    fixer: &'a dyn AttributeFixer,
    archiver: Archiver<'a>,
}

impl<'a> Engine<'a> {
    pub fn new(
        config: &'a Config,
        vcs: &'a dyn VcsTransport,
        compressor: &'a dyn Compressor,
        fixer: &'a dyn AttributeFixer,
        scratch_root: Option<&'a Path>,
    ) -> Self {
        Self {
            config,
            vcs,
            fixer,
            archiver: Archiver::new(vcs, compressor, fixer).with_scratch_root(scratch_root),
        }
    }

    /// Converges one repository and records the outcome. Never panics on
    /// repository errors and never returns an error.
    pub fn converge(&self, descriptor: &RepositoryDescriptor) -> OutcomeRecord {
        let span = tracing::info_span!("converge", slug = %descriptor.slug);
        let _guard = span.enter();

        if !is_safe_component(&descriptor.slug) {
            let err = RepoError::UnsafeSlug(descriptor.slug.clone());
            log::error!("[FAIL] {}", err);
            return OutcomeRecord::failed(descriptor, self.config.output_dir.clone(), err);
        }

        let dest = paths::resolve(descriptor, self.config);
        match self.converge_at(descriptor, &dest) {
            Ok((action, warning)) => {
                OutcomeRecord::succeeded(descriptor, dest, action, warning)
            }
            Err(err) => {
                log::error!("[FAIL] {}: {}", descriptor.slug, err);
                OutcomeRecord::failed(descriptor, dest, err)
            }
        }
    }

    fn converge_at(
        &self,
        descriptor: &RepositoryDescriptor,
        dest: &Path,
    ) -> Result<(Action, Option<String>), RepoError> {
        let found = state::classify(dest).map_err(|e| repo_io_error(e, dest))?;
        log::debug!("'{}' is {}", dest.display(), found);

        match state::plan(found, self.config.output_format) {
            Transition::Skip => {
                log::info!("[SKIP] Already archived: {}", descriptor.slug);
                Ok((Action::Skipped, None))
            }
            Transition::Conflict => Err(RepoError::PathConflict {
                path: dest.display().to_string(),
                found,
            }),
            Transition::Clone => {
                self.clone_fresh(descriptor, dest)?;
                log::info!("[OK] Cloned: {}", descriptor.slug);
                Ok((Action::Created, None))
            }
            Transition::Pull => {
                log::info!("[UPDATE] Pulling: {}", descriptor.slug);
                self.vcs
                    .pull(dest, &self.config.credentials)
                    .map_err(|source| RepoError::Transport {
                        op: TransportOp::Pull,
                        source,
                    })?;
                log::info!("[OK] Updated: {}", descriptor.slug);
                Ok((Action::Updated, None))
            }
            Transition::Archive => {
                ensure_parent(dest)?;
                log::info!("[CLONE] {}", descriptor.slug);
                let warning = self
                    .archiver
                    .archive(descriptor, &self.config.credentials, dest)?
                    .map(|cleanup| {
                        log::warn!("{}", cleanup);
                        cleanup.to_string()
                    });
                log::info!("[OK] {}", dest.display());
                Ok((Action::Created, warning))
            }
        }
    }

    /// Clones into an absent (missing or empty) destination.
    fn clone_fresh(&self, descriptor: &RepositoryDescriptor, dest: &Path) -> Result<(), RepoError> {
        ensure_parent(dest)?;
        let existed = dest.exists();
        log::info!("[CLONE] {}", descriptor.slug);

        let result = self
            .vcs
            .clone_into(&descriptor.clone_url, &self.config.credentials, dest);
        if let Err(source) = result {
            if !existed {
                if let Err(e) = remove_dir_with_retry(dest, self.fixer) {
                    log::warn!(
                        "Could not remove partial clone at '{}': {}",
                        dest.display(),
                        e
                    );
                }
            }
            return Err(RepoError::Transport {
                op: TransportOp::Clone,
                source,
            });
        }
        Ok(())
    }

    /// Converges every descriptor from `descriptors` on a pool of
    /// `config.jobs` workers.
    ///
    /// Descriptors are pulled from the iterator on the calling thread and
    /// dispatched one by one. Dispatch stops at the first listing error or
    /// once `token` is cancelled; repositories already dispatched still run
    /// to completion. Records come back in dispatch order.
    ///
    /// # Errors
    /// Only [`Error::WorkerPool`], if the pool cannot be started.
    pub fn converge_all<I>(
        &self,
        descriptors: I,
        token: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<EngineRun, Error>
    where
        I: Iterator<Item = Result<RepositoryDescriptor, ListingError>>,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .thread_name(|i| format!("sync-worker-{}", i))
            .build()?;
        let (tx, rx) = crossbeam_channel::unbounded::<(usize, OutcomeRecord)>();
        let mut run = EngineRun::default();

        pool.in_place_scope(|scope| {
            for (index, item) in descriptors.enumerate() {
                if token.is_cancelled() {
                    run.interrupted = true;
                    break;
                }
                let descriptor = match item {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        log::error!("{}", e);
                        run.listing_error = Some(e);
                        break;
                    }
                };

                progress.inc_length(1);
                let tx = tx.clone();
                scope.spawn(move |_| {
                    if token.is_cancelled() {
                        log::debug!("Not starting '{}': run cancelled", descriptor.slug);
                        progress.inc(1);
                        return;
                    }
                    progress.set_message(descriptor.slug.clone());
                    let record = self.converge(&descriptor);
                    progress.inc(1);
                    // The receiver outlives the scope.
                    let _ = tx.send((index, record));
                });
            }
        });
        drop(tx);

        if token.is_cancelled() {
            run.interrupted = true;
        }
        let mut indexed: Vec<(usize, OutcomeRecord)> = rx.try_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        run.records = indexed.into_iter().map(|(_, record)| record).collect();
        Ok(run)
    }
}

fn ensure_parent(dest: &Path) -> Result<(), RepoError> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| repo_io_error(e, parent))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ZipCompressor;
    use crate::config::{Credentials, Mode, OutputFormat};
    use crate::core_types::LocalState;
    use crate::errors::TransportFailure;
    use crate::fs_attrs::PlatformAttributeFixer;
    use crate::progress::NoOpProgress;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Records calls; clones create a git repository with one file.
    #[derive(Default)]
    struct RecordingVcs {
        calls: Mutex<Vec<String>>,
        fail_pull: bool,
    }

    impl VcsTransport for RecordingVcs {
        fn clone_into(
            &self,
            url: &str,
            _credentials: &Credentials,
            dest: &Path,
        ) -> Result<(), TransportFailure> {
            self.calls.lock().unwrap().push(format!("clone {}", url));
            git2::Repository::init(dest).map_err(|e| TransportFailure::Other(e.to_string()))?;
            fs::write(dest.join("README.md"), "hi").map_err(|e| TransportFailure::Other(e.to_string()))
        }

        fn pull(&self, path: &Path, _credentials: &Credentials) -> Result<(), TransportFailure> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("pull {}", path.display()));
            if self.fail_pull {
                return Err(TransportFailure::Diverged {
                    branch: "main".into(),
                });
            }
            Ok(())
        }
    }

    struct NoVcs;

    impl VcsTransport for NoVcs {
        fn clone_into(&self, _: &str, _: &Credentials, dest: &Path) -> Result<(), TransportFailure> {
            fs::create_dir_all(dest.join("half")).ok();
            Err(TransportFailure::Auth("denied".into()))
        }
        fn pull(&self, _: &Path, _: &Credentials) -> Result<(), TransportFailure> {
            Err(TransportFailure::Network("down".into()))
        }
    }

    fn repo(slug: &str) -> RepositoryDescriptor {
        RepositoryDescriptor::new(slug, format!("https://example.invalid/{}.git", slug))
            .with_project("PRAC")
    }

    fn config(out: &Path, format: OutputFormat) -> Config {
        let mut config = Config::new_for_test(out);
        config.output_format = format;
        config
    }

    #[test]
    fn test_clone_then_pull() -> anyhow::Result<()> {
        let out = tempdir()?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let vcs = RecordingVcs::default();
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let first = engine.converge(&repo("alpha"));
        assert_eq!(first.action, Action::Created);
        assert_eq!(first.destination, out.path().join("alpha"));

        let second = engine.converge(&repo("alpha"));
        assert_eq!(second.action, Action::Updated);
        assert_eq!(vcs.calls.lock().unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn test_pull_failure_is_recorded() -> anyhow::Result<()> {
        let out = tempdir()?;
        git2::Repository::init(out.path().join("alpha"))?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let vcs = RecordingVcs {
            fail_pull: true,
            ..Default::default()
        };
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let record = engine.converge(&repo("alpha"));
        assert_eq!(record.action, Action::Failed);
        assert!(matches!(
            record.error,
            Some(RepoError::Transport {
                op: TransportOp::Pull,
                source: TransportFailure::Diverged { .. }
            })
        ));
        Ok(())
    }

    #[test]
    fn test_foreign_content_is_never_touched() -> anyhow::Result<()> {
        let out = tempdir()?;
        let dest = out.path().join("alpha");
        fs::create_dir(&dest)?;
        fs::write(dest.join("notes.txt"), "mine")?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let vcs = RecordingVcs::default();
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let record = engine.converge(&repo("alpha"));
        assert!(matches!(
            record.error,
            Some(RepoError::PathConflict {
                found: LocalState::ExistingButForeign,
                ..
            })
        ));
        assert!(vcs.calls.lock().unwrap().is_empty());
        assert_eq!(fs::read_to_string(dest.join("notes.txt"))?, "mine");
        Ok(())
    }

    #[test]
    fn test_failed_clone_removes_created_directory() -> anyhow::Result<()> {
        let out = tempdir()?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let engine = Engine::new(&cfg, &NoVcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let record = engine.converge(&repo("alpha"));
        assert!(matches!(
            record.error,
            Some(RepoError::Transport {
                op: TransportOp::Clone,
                source: TransportFailure::Auth(_)
            })
        ));
        assert!(!out.path().join("alpha").exists());
        Ok(())
    }

    #[test]
    fn test_unsafe_slug_fails_without_io() -> anyhow::Result<()> {
        let out = tempdir()?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let vcs = RecordingVcs::default();
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let record = engine.converge(&repo(".."));
        assert!(matches!(record.error, Some(RepoError::UnsafeSlug(_))));
        assert!(vcs.calls.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn test_archive_then_skip() -> anyhow::Result<()> {
        let out = tempdir()?;
        let scratch = tempdir()?;
        let mut cfg = config(out.path(), OutputFormat::Zip);
        cfg.mode = Mode::Projects;
        cfg.project_keys.insert("PRAC".into());
        let vcs = RecordingVcs::default();
        let engine = Engine::new(
            &cfg,
            &vcs,
            &ZipCompressor,
            &PlatformAttributeFixer,
            Some(scratch.path()),
        );

        let first = engine.converge(&repo("alpha"));
        assert_eq!(first.action, Action::Created);
        assert!(out.path().join("PRAC/alpha.zip").is_file());

        let second = engine.converge(&repo("alpha"));
        assert_eq!(second.action, Action::Skipped);
        assert_eq!(vcs.calls.lock().unwrap().len(), 1);
        assert_eq!(fs::read_dir(scratch.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_converge_all_keeps_dispatch_order() -> anyhow::Result<()> {
        let out = tempdir()?;
        let mut cfg = config(out.path(), OutputFormat::Clone);
        cfg.jobs = 4;
        let vcs = RecordingVcs::default();
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let slugs: Vec<String> = (0..12).map(|i| format!("repo-{:02}", i)).collect();
        let items = slugs.iter().map(|s| Ok::<_, ListingError>(repo(s)));
        let run = engine.converge_all(items, &CancellationToken::new(), &NoOpProgress)?;

        let got: Vec<&str> = run.records.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(got, slugs.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(run.listing_error.is_none());
        assert!(!run.interrupted);
        Ok(())
    }

    #[test]
    fn test_converge_all_stops_at_listing_error() -> anyhow::Result<()> {
        let out = tempdir()?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let vcs = RecordingVcs::default();
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let items = vec![
            Ok(repo("alpha")),
            Err(ListingError {
                pages_fetched: 1,
                source: crate::errors::RemoteError::Network("reset".into()),
            }),
            Ok(repo("never")),
        ];
        let run = engine.converge_all(items.into_iter(), &CancellationToken::new(), &NoOpProgress)?;

        assert_eq!(run.records.len(), 1);
        assert_eq!(run.records[0].slug, "alpha");
        assert_eq!(run.listing_error.map(|e| e.pages_fetched), Some(1));
        Ok(())
    }

    #[test]
    fn test_cancelled_token_dispatches_nothing() -> anyhow::Result<()> {
        let out = tempdir()?;
        let cfg = config(out.path(), OutputFormat::Clone);
        let vcs = RecordingVcs::default();
        let engine = Engine::new(&cfg, &vcs, &ZipCompressor, &PlatformAttributeFixer, None);

        let token = CancellationToken::new();
        token.cancel();
        let items = vec![Ok::<_, ListingError>(repo("alpha"))];
        let run = engine.converge_all(items.into_iter(), &token, &NoOpProgress)?;

        assert!(run.interrupted);
        assert!(run.records.is_empty());
        assert!(vcs.calls.lock().unwrap().is_empty());
        Ok(())
    }
}
