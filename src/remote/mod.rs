//! The Remote Listing Transport: paged access to a workspace's repositories.
//!
//! The synchronization core only talks to the remote through
//! [`RemoteListing`]; [`BitbucketClient`] is the production implementation.

mod bitbucket;

pub use bitbucket::{parse_page, BitbucketClient};

use crate::core_types::ListingPage;
use crate::errors::RemoteError;

/// Paged, authenticated access to a workspace's repository inventory.
///
/// Implementations bind their credentials at construction time, so a call
/// only names the workspace and the continuation token.
pub trait RemoteListing: Send + Sync {
    /// Performs one lightweight authenticated request against `workspace`.
    fn probe(&self, workspace: &str) -> Result<(), RemoteError>;

    /// Fetches one page. `page_token` is `None` for the first page and the
    /// previous page's `next_page_token` afterwards.
    fn fetch_page(
        &self,
        workspace: &str,
        page_token: Option<&str>,
    ) -> Result<ListingPage, RemoteError>;
}
