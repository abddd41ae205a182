//! The Credential Verifier.
//!
//! One authenticated probe against the workspace, run before anything on disk
//! is touched. Any failure here aborts the run.

use crate::config::Config;
use crate::errors::{AuthError, RemoteError};
use crate::remote::RemoteListing;

/// Confirms that the configured credentials can list `config.workspace`.
///
/// Performs exactly one remote call.
///
/// # Errors
///
/// | remote reply        | error                              |
/// |---------------------|------------------------------------|
/// | 401                 | [`AuthError::Unauthorized`]        |
/// | 403                 | [`AuthError::Forbidden`]           |
/// | 404                 | [`AuthError::WorkspaceNotFound`]   |
/// | no reply            | [`AuthError::NetworkUnreachable`]  |
/// | anything else       | [`AuthError::UnexpectedStatus`]    |
pub fn verify(config: &Config, listing: &dyn RemoteListing) -> Result<(), AuthError> {
    log::info!("Verifying authentication...");
    match listing.probe(&config.workspace) {
        Ok(()) => {
            log::info!("Authentication OK");
            Ok(())
        }
        Err(e) => {
            let err = into_auth_error(e, &config.workspace);
            log::error!("{}", err);
            Err(err)
        }
    }
}

fn into_auth_error(err: RemoteError, workspace: &str) -> AuthError {
    match err {
        RemoteError::Unauthorized => AuthError::Unauthorized,
        RemoteError::Forbidden => AuthError::Forbidden,
        RemoteError::NotFound => AuthError::WorkspaceNotFound(workspace.to_string()),
        RemoteError::Network(detail) => AuthError::NetworkUnreachable(detail),
        RemoteError::Status { status, body } => AuthError::UnexpectedStatus { status, body },
        RemoteError::Decode(detail) => AuthError::UnexpectedStatus {
            status: 200,
            body: detail,
        },
    }
}
