//! HTTP client for the service's SmugMug-style API (§10.1).
//!
//! Grounded in `original_source/sync2smugmug/online/smugmug.py`
//! (`SmugmugCoreConnection`) for endpoints, headers, retry policy and
//! pagination, and in the teacher's `immich/client.rs` for the
//! `reqwest`-based client shape.

use std::path::Path;
use std::time::Duration;

use md5::{Digest, Md5};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::auth::AuthProvider;
use super::types::{Envelope, Pages, UploadResponse, UserResponse};
use crate::error::ServiceError;

const API_SERVER: &str = "https://api.smugmug.com";
const API_PREFIX: &str = "api/v2";
const UPLOAD_URI: &str = "https://upload.smugmug.com/";
const TIMEOUT: Duration = Duration::from_secs(10);
/// Initial attempt plus 3 retries (1s, 2s, 3s delays), per §4.7/§9.
const MAX_ATTEMPTS: u32 = 4;

pub struct ServiceClient {
    http: Client,
    auth: AuthProvider,
    root_folder_uri: String,
    test_root_folder_uri: String,
    test_upload: bool,
}

impl ServiceClient {
    /// Connect to the service: build the HTTP client, fetch the account's root folder URI
    /// and derive the test-upload root folder URI from it (§10.1).
    pub async fn connect(
        account: &str,
        consumer_key: &str,
        consumer_secret: &str,
        access_token: &str,
        access_token_secret: &str,
        test_upload: bool,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(TIMEOUT).build()?;
        let auth = AuthProvider::new(consumer_key, consumer_secret, access_token, access_token_secret);

        let mut client = Self {
            http,
            auth,
            root_folder_uri: String::new(),
            test_root_folder_uri: String::new(),
            test_upload,
        };

        let user: UserResponse = client.get(&format!("user/{account}")).await?;
        client.root_folder_uri = user.user.uris.folder.uri.clone();
        client.test_root_folder_uri = format!("{}/Test", client.root_folder_uri);

        Ok(client)
    }

    /// The root folder to sync against: the account root, unless running in test-upload
    /// mode, in which case everything is redirected under a dedicated `Test` folder.
    pub fn root_folder_uri(&self) -> &str {
        if self.test_upload {
            &self.test_root_folder_uri
        } else {
            &self.root_folder_uri
        }
    }

    pub fn is_test_root_folder_uri(&self, uri: &str) -> bool {
        uri == self.test_root_folder_uri
    }

    /// A client with no live connection, for tests that exercise pure diffing logic and
    /// never actually issue a request (guarded by `dry_run`).
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self {
            http: Client::builder().timeout(TIMEOUT).build().expect("client builds"),
            auth: AuthProvider::new("ck", "cs", "tok", "tsec"),
            root_folder_uri: "/api/v2/folder/user".into(),
            test_root_folder_uri: "/api/v2/folder/user/Test".into(),
            test_upload: false,
        }
    }

    fn format_url(relative_uri: &str) -> String {
        let mut uri = relative_uri.trim_start_matches('/');
        let prefix = format!("{API_PREFIX}/");
        if let Some(stripped) = uri.strip_prefix(prefix.as_str()) {
            uri = stripped;
        }
        format!("{API_SERVER}/{API_PREFIX}/{uri}")
    }

    /// `Name.replace(' ', '-').replace(',', '').capitalize()` — the service's rule for
    /// turning a folder/album name into the fragment that appears in its URI.
    pub fn encode_uri_name(name: &str) -> String {
        let cleaned = name.replace(' ', "-").replace(',', "");
        let mut chars = cleaned.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
            None => cleaned,
        }
    }

    async fn with_retry<F, Fut, T>(&self, description: &str, mut attempt: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let mut last_err = None;
        for fails in 0..MAX_ATTEMPTS {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if is_retryable(&err) && fails + 1 < MAX_ATTEMPTS => {
                    let wait = Duration::from_secs(u64::from(fails) + 1);
                    warn!("{description} failed ({err}), retrying in {wait:?}...");
                    tokio::time::sleep(wait).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.expect("loop always attempts at least once"))
    }

    pub async fn get<T: DeserializeOwned>(&self, relative_uri: &str) -> Result<T, ServiceError> {
        self.get_with_query(relative_uri, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        relative_uri: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = Self::format_url(relative_uri);
        self.with_retry("GET", || async {
            let authorization = self.auth.authorize_get(&url);
            let response = self
                .http
                .get(&url)
                .query(query)
                .header("Host", "www.smugmug.com")
                .header("Accept", "application/json")
                .header("Authorization", &authorization)
                .send()
                .await?;
            let response = check_status(response, &url).await?;
            let envelope: Envelope<T> = response.json().await.map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
            Ok(envelope.response)
        })
        .await
    }

    pub async fn post_json(&self, relative_uri: &str, body: &Value) -> Result<Value, ServiceError> {
        let url = Self::format_url(relative_uri);
        self.with_retry("POST", || async {
            let authorization = self.auth.authorize_post(&url);
            let response = self
                .http
                .post(&url)
                .header("Host", "www.smugmug.com")
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .header("Authorization", &authorization)
                .json(body)
                .send()
                .await?;
            let response = check_status(response, &url).await?;
            let envelope: Envelope<Value> = response.json().await.map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
            Ok(envelope.response)
        })
        .await
    }

    pub async fn delete(&self, relative_uri: &str) -> Result<(), ServiceError> {
        let url = Self::format_url(relative_uri);
        self.with_retry("DELETE", || async {
            let authorization = self.auth.authorize_delete(&url);
            let response = self
                .http
                .delete(&url)
                .header("Host", "www.smugmug.com")
                .header("Authorization", &authorization)
                .send()
                .await?;
            check_status(response, &url).await?;
            Ok(())
        })
        .await
    }

    /// Stream a full absolute `image_uri` to `local_path`, writing through a `.tmp`
    /// sibling and renaming into place so a crash mid-download never leaves a
    /// partial/corrupt file behind (§4.6a, §8).
    pub async fn download(&self, image_uri: &str, local_path: &Path) -> Result<(), ServiceError> {
        let url = format!("{API_SERVER}{image_uri}");
        self.with_retry("download", || async {
            let authorization = self.auth.authorize_get(&url);
            let response = self
                .http
                .get(&url)
                .header("Host", "www.smugmug.com")
                .header("Authorization", &authorization)
                .send()
                .await?;
            let mut response = check_status(response, &url).await?;

            let tmp_path = local_path.with_extension("tmp");
            if let Some(parent) = tmp_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            drop(file);

            let _ = tokio::fs::remove_file(local_path).await;
            tokio::fs::rename(&tmp_path, local_path).await?;
            Ok(())
        })
        .await
    }

    /// Upload `local_path` as `image_name` into the album at `album_uri`. `replace_uri`
    /// sets `X-Smug-ImageUri`, turning the upload into an in-place replace.
    pub async fn upload(
        &self,
        album_uri: &str,
        image_name: &str,
        local_path: &Path,
        replace_uri: Option<&str>,
    ) -> Result<(), ServiceError> {
        let data = tokio::fs::read(local_path).await?;
        let digest = format!("{:x}", Md5::digest(&data));

        self.with_retry("upload", || async {
            let authorization = self.auth.authorize_upload(UPLOAD_URI);

            let part = reqwest::multipart::Part::bytes(data.clone()).file_name(image_name.to_string());
            let form = reqwest::multipart::Form::new().part(image_name.to_string(), part);

            let mut request = self
                .http
                .post(UPLOAD_URI)
                .header("Authorization", &authorization)
                .header("X-Smug-AlbumUri", album_uri)
                .header("X-Smug-Title", image_name)
                .header("X-Smug-Caption", image_name)
                .header("X-Smug-ResponseType", "JSON")
                .header("X-Smug-Version", "v2")
                .header("Content-MD5", &digest);

            if let Some(replace_uri) = replace_uri {
                request = request.header("X-Smug-ImageUri", replace_uri);
            }

            let response = request.multipart(form).send().await?;
            let response = check_status(response, UPLOAD_URI).await?;

            let upload: UploadResponse = response.json().await.map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
            if upload.stat == "fail" {
                return Err(ServiceError::UploadFailed {
                    name: image_name.to_string(),
                    message: upload.message.unwrap_or_default(),
                });
            }
            Ok(())
        })
        .await
    }

    /// Page through `relative_uri`'s `object_name` array, returning every item across
    /// all pages. `Pages.Total` drives how many follow-up requests are issued (§10.1).
    pub async fn paginate(&self, relative_uri: &str, object_name: &str, page_size: u64) -> Result<Vec<Value>, ServiceError> {
        let first: Value = self.get(relative_uri).await?;
        let mut items: Vec<Value> = first
            .get(object_name)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let total = first
            .get("Pages")
            .and_then(|p| serde_json::from_value::<Pages>(p.clone()).ok())
            .map(|p| p.total)
            .unwrap_or(items.len() as u64);

        let mut found = items.len() as u64;
        while total > found {
            let query = [
                ("start", (found + 1).to_string()),
                ("count", page_size.to_string()),
            ];
            let page: Value = self.get_with_query(relative_uri, &query).await?;
            let page_items: Vec<Value> = page
                .get(object_name)
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            found += page_items.len() as u64;
            items.extend(page_items);

            if items.is_empty() {
                debug!("paginate({relative_uri}) returned no items on a follow-up page, stopping");
                break;
            }
        }

        Ok(items)
    }
}

async fn check_status(response: reqwest::Response, uri: &str) -> Result<reqwest::Response, ServiceError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ServiceError::Status {
            uri: uri.to_string(),
            status: response.status(),
        })
    }
}

fn is_retryable(err: &ServiceError) -> bool {
    match err {
        ServiceError::Transport(e) => e.is_timeout() || e.is_connect(),
        ServiceError::Status { status, .. } => *status == StatusCode::INTERNAL_SERVER_ERROR || status.is_server_error(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_uri_names_like_the_service() {
        assert_eq!(ServiceClient::encode_uri_name("my trip, 2024"), "My-trip-2024");
        assert_eq!(ServiceClient::encode_uri_name("Already-Good"), "Already-good");
    }

    #[test]
    fn format_url_handles_prefixed_and_bare_uris() {
        assert_eq!(ServiceClient::format_url("/api/v2/user/me"), "https://api.smugmug.com/api/v2/user/me");
        assert_eq!(ServiceClient::format_url("user/me"), "https://api.smugmug.com/api/v2/user/me");
    }
}
