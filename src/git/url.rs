//! URL helpers for clone links.

use url::Url;

/// Removes any `user[:password]@` part from a URL.
///
/// Bitbucket embeds the requesting username in its HTTPS clone links. The
/// username is supplied through the credential callback instead, so stored
/// URLs stay free of identity. Strings that do not parse as URLs are
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::git::strip_userinfo;
///
/// assert_eq!(
///     strip_userinfo("https://alice@bitbucket.org/acme/alpha.git"),
///     "https://bitbucket.org/acme/alpha.git"
/// );
/// assert_eq!(
///     strip_userinfo("git@bitbucket.org:acme/alpha.git"),
///     "git@bitbucket.org:acme/alpha.git"
/// );
/// ```
pub fn strip_userinfo(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.has_authority() => {
            if parsed.username().is_empty() && parsed.password().is_none() {
                return url.to_string();
            }
            // Both setters only fail for URLs without a host, excluded above.
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
