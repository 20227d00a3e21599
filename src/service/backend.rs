//! The thin transport seam `online.rs` actually talks to (§10.1, §12).
//!
//! [`ServiceClient`] is the real implementation; tests substitute a fake
//! in-memory double so the engine, dispatcher and handlers can be driven
//! end to end without a live connection. The methods return
//! `serde_json::Value` rather than a generic `DeserializeOwned` type so
//! the trait stays object-safe, matching the `Pin<Box<dyn Future>>`
//! boxing `dispatcher.rs` already uses for recursive dispatch.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde_json::Value;

use crate::error::ServiceError;

use super::client::ServiceClient;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ServiceBackend: Send + Sync {
    fn root_folder_uri(&self) -> &str;
    fn is_test_root_folder_uri(&self, uri: &str) -> bool;

    fn get<'a>(&'a self, relative_uri: &'a str) -> BoxFuture<'a, Result<Value, ServiceError>>;
    fn post_json<'a>(&'a self, relative_uri: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value, ServiceError>>;
    fn delete<'a>(&'a self, relative_uri: &'a str) -> BoxFuture<'a, Result<(), ServiceError>>;
    fn download<'a>(&'a self, image_uri: &'a str, local_path: &'a Path) -> BoxFuture<'a, Result<(), ServiceError>>;
    fn upload<'a>(&'a self, album_uri: &'a str, image_name: &'a str, local_path: &'a Path) -> BoxFuture<'a, Result<(), ServiceError>>;
    fn paginate<'a>(&'a self, relative_uri: &'a str, object_name: &'a str, page_size: u64) -> BoxFuture<'a, Result<Vec<Value>, ServiceError>>;
}

impl ServiceBackend for ServiceClient {
    fn root_folder_uri(&self) -> &str {
        ServiceClient::root_folder_uri(self)
    }

    fn is_test_root_folder_uri(&self, uri: &str) -> bool {
        ServiceClient::is_test_root_folder_uri(self, uri)
    }

    fn get<'a>(&'a self, relative_uri: &'a str) -> BoxFuture<'a, Result<Value, ServiceError>> {
        Box::pin(async move { self.get_with_query(relative_uri, &[]).await })
    }

    fn post_json<'a>(&'a self, relative_uri: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value, ServiceError>> {
        Box::pin(async move { ServiceClient::post_json(self, relative_uri, body).await })
    }

    fn delete<'a>(&'a self, relative_uri: &'a str) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move { ServiceClient::delete(self, relative_uri).await })
    }

    fn download<'a>(&'a self, image_uri: &'a str, local_path: &'a Path) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move { ServiceClient::download(self, image_uri, local_path).await })
    }

    fn upload<'a>(&'a self, album_uri: &'a str, image_name: &'a str, local_path: &'a Path) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move { ServiceClient::upload(self, album_uri, image_name, local_path, None).await })
    }

    fn paginate<'a>(&'a self, relative_uri: &'a str, object_name: &'a str, page_size: u64) -> BoxFuture<'a, Result<Vec<Value>, ServiceError>> {
        Box::pin(async move { ServiceClient::paginate(self, relative_uri, object_name, page_size).await })
    }
}
