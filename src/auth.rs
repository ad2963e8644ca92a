//! OAuth2 bootstrap for the Gmail API hub

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::Path;

use crate::error::{ExporterError, Result};

/// Metadata-only scope: label listings and counts, never message bodies
pub const METADATA_SCOPE: &str = "https://www.googleapis.com/auth/gmail.metadata";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Reads the installed-app client secret, lets `yup-oauth2` run the
/// authorization flow (or reuse the cached token at `token_cache_path`), and
/// builds an HTTPS client for the hub.
///
/// # Arguments
/// * `credentials_path` - Path to the OAuth2 credentials JSON file
/// * `token_cache_path` - Path where access tokens will be cached
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    let secret = yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| ExporterError::AuthError(format!("Failed to read credentials: {}", e)))?;

    // HTTPRedirect opens a browser for user authorization
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| ExporterError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Obtain the token before serving so the first refresh doesn't block on the flow
    let _token = auth
        .token(&[METADATA_SCOPE])
        .await
        .map_err(|e| ExporterError::AuthError(format!("Failed to obtain token: {}", e)))?;

    // HTTP/1 works better with google-gmail1
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| {
                    ExporterError::AuthError(format!("Failed to load TLS roots: {}", e))
                })?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}
