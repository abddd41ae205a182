//! The Inventory Lister: a lazy, deduplicated, filtered view of the workspace.

use crate::config::Config;
use crate::core_types::RepositoryDescriptor;
use crate::errors::{ListingError, RemoteError};
use crate::remote::RemoteListing;
use std::collections::{HashSet, VecDeque};

/// Where pagination stands.
#[derive(Debug)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Iterator over the selected repositories of a workspace.
///
/// Pages are requested only as the previous one is consumed. Descriptors
/// follow the remote's page order, filtered by [`Config::selects_project`] and
/// deduplicated by slug. A failed page fetch yields one `Err` and ends the
/// iteration; the inventory is never silently truncated.
pub struct Inventory<'a> {
    config: &'a Config,
    listing: &'a dyn RemoteListing,
    cursor: Cursor,
    buffer: VecDeque<RepositoryDescriptor>,
    yielded: HashSet<String>,
    seen_tokens: HashSet<String>,
    pages_fetched: usize,
}

/// Starts listing `config.workspace`. No request is made until the first `next()`.
pub fn list<'a>(config: &'a Config, listing: &'a dyn RemoteListing) -> Inventory<'a> {
    Inventory {
        config,
        listing,
        cursor: Cursor::Start,
        buffer: VecDeque::new(),
        yielded: HashSet::new(),
        seen_tokens: HashSet::new(),
        pages_fetched: 0,
    }
}

impl Inventory<'_> {
    /// Pages successfully fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn fetch_next_page(&mut self) -> Result<(), ListingError> {
        let token = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(()),
        };

        let page = self
            .listing
            .fetch_page(&self.config.workspace, token.as_deref())
            .map_err(|source| self.listing_error(source))?;
        self.pages_fetched += 1;
        log::debug!(
            "Fetched page {} ({} repositories)",
            self.pages_fetched,
            page.items.len()
        );

        for descriptor in page.items {
            if !self.config.selects_project(descriptor.project_key.as_deref()) {
                continue;
            }
            if self.yielded.insert(descriptor.slug.clone()) {
                self.buffer.push_back(descriptor);
            } else {
                log::debug!("Skipping duplicate listing entry '{}'", descriptor.slug);
            }
        }

        if let Some(next) = page.next_page_token {
            if !self.seen_tokens.insert(next.clone()) {
                return Err(self.listing_error(RemoteError::Decode(format!(
                    "pagination returned '{}' twice",
                    next
                ))));
            }
            self.cursor = Cursor::Next(next);
        }
        Ok(())
    }

    fn listing_error(&self, source: RemoteError) -> ListingError {
        ListingError {
            pages_fetched: self.pages_fetched,
            source,
        }
    }
}

impl Iterator for Inventory<'_> {
    type Item = Result<RepositoryDescriptor, ListingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(descriptor) = self.buffer.pop_front() {
                return Some(Ok(descriptor));
            }
            if matches!(self.cursor, Cursor::Done) {
                return None;
            }
            if let Err(e) = self.fetch_next_page() {
                self.cursor = Cursor::Done;
                self.buffer.clear();
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::core_types::ListingPage;
    use std::sync::Mutex;

    /// Serves canned pages; page `n` is requested with token `"p{n}"`.
    struct Pages {
        pages: Vec<Result<ListingPage, RemoteError>>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl Pages {
        fn new(pages: Vec<Result<Vec<RepositoryDescriptor>, RemoteError>>) -> Self {
            let count = pages.len();
            let pages = pages
                .into_iter()
                .enumerate()
                .map(|(i, items)| {
                    items.map(|items| ListingPage {
                        items,
                        next_page_token: (i + 1 < count).then(|| format!("p{}", i + 1)),
                    })
                })
                .collect();
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl RemoteListing for Pages {
        fn probe(&self, _: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        fn fetch_page(&self, _: &str, token: Option<&str>) -> Result<ListingPage, RemoteError> {
            self.requested.lock().unwrap().push(token.map(str::to_string));
            let index = token
                .and_then(|t| t.strip_prefix('p'))
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(0);
            self.pages[index].clone()
        }
    }

    fn repo(slug: &str, key: &str) -> RepositoryDescriptor {
        RepositoryDescriptor::new(slug, format!("https://example.invalid/{}.git", slug))
            .with_project(key)
    }

    fn slugs(items: &[Result<RepositoryDescriptor, ListingError>]) -> Vec<&str> {
        items
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|d| d.slug.as_str())
            .collect()
    }

    #[test]
    fn test_follows_pages_in_order() {
        let remote = Pages::new(vec![
            Ok(vec![repo("alpha", "PRAC"), repo("beta", "OPS")]),
            Ok(vec![repo("gamma", "PRAC")]),
        ]);
        let config = Config::new_for_test("/out");
        let items: Vec<_> = list(&config, &remote).collect();
        assert_eq!(slugs(&items), vec!["alpha", "beta", "gamma"]);
        assert_eq!(
            *remote.requested.lock().unwrap(),
            vec![None, Some("p1".to_string())]
        );
    }

    #[test]
    fn test_is_lazy() {
        let remote = Pages::new(vec![Ok(vec![repo("alpha", "PRAC")]), Ok(vec![])]);
        let config = Config::new_for_test("/out");
        let mut inventory = list(&config, &remote);
        assert!(remote.requested.lock().unwrap().is_empty());
        assert!(inventory.next().is_some());
        assert_eq!(remote.requested.lock().unwrap().len(), 1);
        assert_eq!(inventory.pages_fetched(), 1);
    }

    #[test]
    fn test_duplicates_across_pages_are_dropped() {
        let remote = Pages::new(vec![
            Ok(vec![repo("alpha", "PRAC"), repo("beta", "PRAC")]),
            Ok(vec![repo("beta", "PRAC"), repo("gamma", "PRAC")]),
        ]);
        let config = Config::new_for_test("/out");
        let items: Vec<_> = list(&config, &remote).collect();
        assert_eq!(slugs(&items), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_projects_mode_filters_in_stream() {
        let remote = Pages::new(vec![Ok(vec![
            repo("alpha", "PRAC"),
            repo("beta", "OPS"),
            RepositoryDescriptor::new("loose", "https://example.invalid/loose.git"),
        ])]);
        let mut config = Config::new_for_test("/out");
        config.mode = Mode::Projects;
        config.project_keys.insert("PRAC".to_string());
        let items: Vec<_> = list(&config, &remote).collect();
        assert_eq!(slugs(&items), vec!["alpha"]);
    }

    #[test]
    fn test_page_failure_surfaces_and_ends_iteration() {
        let remote = Pages::new(vec![
            Ok(vec![repo("alpha", "PRAC")]),
            Err(RemoteError::Network("reset".into())),
            Ok(vec![repo("never", "PRAC")]),
        ]);
        let config = Config::new_for_test("/out");
        let items: Vec<_> = list(&config, &remote).collect();
        assert_eq!(items.len(), 2);
        match &items[1] {
            Err(e) => assert_eq!(e.pages_fetched, 1),
            Ok(d) => panic!("expected listing error, got {:?}", d),
        }
    }

    #[test]
    fn test_repeated_token_is_an_error() {
        struct Looping;
        impl RemoteListing for Looping {
            fn probe(&self, _: &str) -> Result<(), RemoteError> {
                Ok(())
            }
            fn fetch_page(&self, _: &str, _: Option<&str>) -> Result<ListingPage, RemoteError> {
                Ok(ListingPage {
                    items: vec![],
                    next_page_token: Some("again".to_string()),
                })
            }
        }
        let config = Config::new_for_test("/out");
        let items: Vec<_> = list(&config, &Looping).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(ListingError {
                source: RemoteError::Decode(_),
                ..
            })
        ));
    }
}
