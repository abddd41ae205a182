// src/remote/bitbucket.rs
//! Bitbucket Cloud implementation of the listing transport.

use super::RemoteListing;
use crate::config::Config;
use crate::constants::{
    DEFAULT_WEB_BASE_URL, LISTING_PAGE_LEN, PROBE_PAGE_LEN, REQUEST_TIMEOUT_SECS, USER_AGENT,
};
use crate::core_types::{ListingPage, RepositoryDescriptor};
use crate::errors::{Error, RemoteError};
use crate::git::strip_userinfo;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// A paginated response from `GET /repositories/{workspace}`.
#[derive(Deserialize, Debug)]
struct PageBody {
    #[serde(default)]
    values: Vec<RepoBody>,
    next: Option<String>,
}

/// The subset of a repository object that the sync needs.
#[derive(Deserialize, Debug)]
struct RepoBody {
    slug: Option<String>,
    name: Option<String>,
    full_name: Option<String>,
    #[serde(default)]
    links: Links,
    project: Option<ProjectBody>,
}

#[derive(Deserialize, Debug, Default)]
struct Links {
    #[serde(default, rename = "clone")]
    clone_links: Vec<CloneLink>,
}

#[derive(Deserialize, Debug)]
struct CloneLink {
    name: String,
    href: String,
}

#[derive(Deserialize, Debug)]
struct ProjectBody {
    key: String,
}

/// Lists repositories through the Bitbucket Cloud 2.0 REST API.
pub struct BitbucketClient {
    client: Client,
    api_base: Url,
}

impl BitbucketClient {
    /// Builds a client that authenticates every request with the configured token.
    ///
    /// # Errors
    /// Returns `Error::Client` if the base URL or token cannot be used in a request.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let api_base = Url::parse(&config.api_base_url)
            .map_err(|e| Error::Client(format!("invalid API base URL: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.credentials.api_token))
            .map_err(|_| Error::Client("API token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self { client, api_base })
    }

    /// `{api}/repositories/{workspace}?pagelen={page_len}`
    fn listing_url(&self, workspace: &str, page_len: u32) -> Result<Url, RemoteError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Decode("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("repositories")
            .push(workspace);
        url.query_pairs_mut()
            .append_pair("pagelen", &page_len.to_string());
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<String, RemoteError> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status, &body))
        }
    }
}

impl RemoteListing for BitbucketClient {
    fn probe(&self, workspace: &str) -> Result<(), RemoteError> {
        let url = self.listing_url(workspace, PROBE_PAGE_LEN)?;
        self.get(url).map(|_| ())
    }

    fn fetch_page(
        &self,
        workspace: &str,
        page_token: Option<&str>,
    ) -> Result<ListingPage, RemoteError> {
        let url = match page_token {
            Some(next) => check_next_link(next, &self.api_base)?,
            None => self.listing_url(workspace, LISTING_PAGE_LEN)?,
        };
        let body = self.get(url)?;
        parse_page(&body, workspace, DEFAULT_WEB_BASE_URL)
    }
}

/// Maps a non-success status to a [`RemoteError`], keeping a short body excerpt.
fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::FORBIDDEN => RemoteError::Forbidden,
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        other => RemoteError::Status {
            status: other.as_u16(),
            body: body.chars().take(200).collect(),
        },
    }
}

/// Parses a `next` link, refusing to follow it off the API host.
fn check_next_link(next: &str, api_base: &Url) -> Result<Url, RemoteError> {
    let url = Url::parse(next)
        .map_err(|e| RemoteError::Decode(format!("invalid next link '{}': {}", next, e)))?;
    let same_origin = url.scheme() == api_base.scheme()
        && url.host_str() == api_base.host_str()
        && url.port_or_known_default() == api_base.port_or_known_default();
    if !same_origin {
        return Err(RemoteError::Decode(format!(
            "next link '{}' points outside the API host",
            next
        )));
    }
    Ok(url)
}

/// Parses one listing page into descriptors.
///
/// The clone URL is the `https` entry of `links.clone` with any userinfo
/// removed. When the API omits it, `{web_base}/{full_name}.git` is used.
///
/// # Errors
/// Returns `RemoteError::Decode` for malformed JSON or a repository without
/// a slug or name.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::remote::parse_page;
///
/// let body = r#"{
///     "values": [{
///         "slug": "alpha",
///         "full_name": "acme/alpha",
///         "project": {"key": "PRAC"},
///         "links": {"clone": [
///             {"name": "https", "href": "https://alice@bitbucket.org/acme/alpha.git"},
///             {"name": "ssh", "href": "git@bitbucket.org:acme/alpha.git"}
///         ]}
///     }],
///     "next": "https://api.bitbucket.org/2.0/repositories/acme?page=2"
/// }"#;
/// let page = parse_page(body, "acme", "https://bitbucket.org").unwrap();
/// assert_eq!(page.items[0].slug, "alpha");
/// assert_eq!(page.items[0].clone_url, "https://bitbucket.org/acme/alpha.git");
/// assert_eq!(page.items[0].project_key.as_deref(), Some("PRAC"));
/// assert!(page.next_page_token.is_some());
/// ```
pub fn parse_page(body: &str, workspace: &str, web_base: &str) -> Result<ListingPage, RemoteError> {
    let page: PageBody =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;

    let items = page
        .values
        .into_iter()
        .map(|repo| into_descriptor(repo, workspace, web_base))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ListingPage {
        items,
        next_page_token: page.next.filter(|n| !n.is_empty()),
    })
}

fn into_descriptor(
    repo: RepoBody,
    workspace: &str,
    web_base: &str,
) -> Result<RepositoryDescriptor, RemoteError> {
    let slug = repo
        .slug
        .or(repo.name)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RemoteError::Decode("repository entry without slug or name".to_string()))?;

    let clone_url = match repo.links.clone_links.iter().find(|l| l.name == "https") {
        Some(link) => strip_userinfo(&link.href),
        None => {
            let full_name = repo
                .full_name
                .unwrap_or_else(|| format!("{}/{}", workspace, slug));
            log::debug!(
                "No HTTPS clone link for '{}'; using {}/{}.git",
                slug,
                web_base,
                full_name
            );
            format!("{}/{}.git", web_base.trim_end_matches('/'), full_name)
        }
    };

    Ok(RepositoryDescriptor {
        slug,
        clone_url,
        project_key: repo.project.map(|p| p.key),
    })
}
