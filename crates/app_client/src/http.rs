//! reqwest-backed transport

use crate::{ClientError, FileManagerApi, Result, UploadFile};
use api_proto::{
    routes, ClientConfig, CreateDirectoryRequest, ErrorKind, ErrorResponse, ListQuery,
    ListResponse, MessageResponse, PathRequest, UploadResponse,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Talks to a file manager server over HTTP
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            tracing::warn!("Request timed out: {}", e);
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::from(e)
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if (200..300).contains(&status) {
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
        } else {
            Err(api_error(status, &body))
        }
    }
}

#[async_trait]
impl FileManagerApi for HttpApi {
    async fn list(&self, directory: &str) -> Result<ListResponse> {
        let query = ListQuery {
            directory: directory.to_string(),
        };
        self.send(self.client.get(self.url(routes::FILES)).query(&query))
            .await
    }

    async fn create_directory(&self, request: &CreateDirectoryRequest) -> Result<MessageResponse> {
        self.send(self.client.post(self.url(routes::DIRECTORY)).json(request))
            .await
    }

    async fn upload(&self, directory: &str, files: Vec<UploadFile>) -> Result<UploadResponse> {
        let mut form = Form::new();
        for file in files {
            form = form.part(
                routes::UPLOAD_FIELD,
                Part::bytes(file.bytes).file_name(file.name),
            );
        }
        form = form.text(routes::DIRECTORY_FIELD, directory.to_string());

        let response = self
            .client
            .post(self.url(routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        // All-failed uploads still carry per-file results
        match serde_json::from_slice::<UploadResponse>(&body) {
            Ok(outcome) => Ok(outcome),
            Err(_) => Err(api_error(status, &body)),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<MessageResponse> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.send(self.client.delete(self.url(routes::FILE)).json(&body))
            .await
    }

    async fn delete_directory(&self, path: &str) -> Result<MessageResponse> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.send(self.client.delete(self.url(routes::DIRECTORY)).json(&body))
            .await
    }
}

fn api_error(status: u16, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(error) => ClientError::Api {
            kind: error.kind,
            message: error.error,
            status,
        },
        Err(_) => ClientError::Api {
            kind: ErrorKind::Unknown,
            message: format!("request failed with status {}", status),
            status,
        },
    }
}
