//! HTTP client for the camera server API.
//!
//! Works in both native Rust and WASM environments: the transport is
//! `gloo-net` in the browser and `reqwest` everywhere else, behind one
//! surface. All endpoint interactions are consolidated here for consistent
//! error handling and type safety.
//!
//! The command endpoints (`update_camera`, `apply_preset`, `reset_camera`)
//! return validation failures as error HTTP statuses with a decodable
//! `{status: "error"}` body; the body is decoded regardless of HTTP status
//! and only a network failure or an undecodable body is a transport error.

use serde::{Deserialize, Serialize};

use crate::error::PanelError;

/// Settings snapshot as it rides the wire: raw key names, server units.
pub type WireSettings = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Response body of the command endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
}

impl ServerOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// User-facing texts, in server order. `messages` wins over `message`
    /// when both are present.
    pub fn texts(&self) -> Vec<String> {
        match (&self.messages, &self.message) {
            (Some(messages), _) if !messages.is_empty() => messages.clone(),
            (_, Some(message)) => vec![message.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct PresetRequest<'a> {
    preset: &'a str,
}

/// Client for the camera server HTTP API.
#[derive(Debug, Clone)]
pub struct CameraClient {
    base_url: String,
    #[cfg(not(target_arch = "wasm32"))]
    http: reqwest::Client,
}

impl CameraClient {
    /// Create a new client pointing to the given base URL.
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            #[cfg(not(target_arch = "wasm32"))]
            http: reqwest::Client::new(),
        }
    }

    /// Create a client for same-origin web requests.
    ///
    /// Uses relative URLs (empty base) which works in WASM when the frontend
    /// is served from the same origin as the API. Panics if called outside WASM.
    pub fn for_web() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            Self::new("")
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            unreachable!("for_web() is only available in WASM builds")
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // === Internal HTTP helpers ===

    #[cfg(target_arch = "wasm32")]
    async fn fetch_get(&self, path: &str) -> Result<(u16, String), PanelError> {
        let url = format!("{}{}", self.base_url, path);
        let response = gloo_net::http::Request::get(&url).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn fetch_get(&self, path: &str) -> Result<(u16, String), PanelError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    #[cfg(target_arch = "wasm32")]
    async fn fetch_post<T: Serialize>(
        &self,
        path: &str,
        body: Option<&T>,
    ) -> Result<(u16, String), PanelError> {
        let url = format!("{}{}", self.base_url, path);
        let request = gloo_net::http::Request::post(&url);
        let response = match body {
            Some(body) => {
                request
                    .json(body)
                    .map_err(|e| PanelError::Parse(e.to_string()))?
                    .send()
                    .await?
            }
            None => request.send().await?,
        };
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Ok((status, text))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn fetch_post<T: Serialize>(
        &self,
        path: &str,
        body: Option<&T>,
    ) -> Result<(u16, String), PanelError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Ok((status, text))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, PanelError> {
        let (status, body) = self.fetch_get(path).await?;
        if !(200..300).contains(&status) {
            return Err(PanelError::ServerError {
                status,
                message: body,
            });
        }
        serde_json::from_str(&body).map_err(|e| PanelError::Parse(e.to_string()))
    }

    /// POST and decode a command outcome, accepting error HTTP statuses as
    /// long as the body decodes.
    async fn post_outcome<T: Serialize>(
        &self,
        path: &str,
        body: Option<&T>,
    ) -> Result<ServerOutcome, PanelError> {
        let (status, text) = self.fetch_post(path, body).await?;
        match serde_json::from_str::<ServerOutcome>(&text) {
            Ok(outcome) => Ok(outcome),
            Err(_) if !(200..300).contains(&status) => Err(PanelError::ServerError {
                status,
                message: text,
            }),
            Err(e) => Err(PanelError::Parse(e.to_string())),
        }
    }

    // === Settings ===

    /// Fetch the current settings snapshot. Keys are restricted to what the
    /// connected camera supports; values are in server units.
    pub async fn get_camera_settings(&self) -> Result<WireSettings, PanelError> {
        self.get_json("/get_camera_settings").await
    }

    /// Submit a settings update. The payload carries server-unit values for
    /// every supported key, not a delta.
    pub async fn update_camera(&self, settings: &WireSettings) -> Result<ServerOutcome, PanelError> {
        self.post_outcome("/update_camera", Some(settings)).await
    }

    // === Presets ===

    /// Apply a named preset. The name is opaque to the client; the server
    /// decides what it changes.
    pub async fn apply_preset(&self, preset: &str) -> Result<ServerOutcome, PanelError> {
        self.post_outcome("/apply_preset", Some(&PresetRequest { preset }))
            .await
    }

    /// Reset every parameter to the server's defaults.
    pub async fn reset_camera(&self) -> Result<ServerOutcome, PanelError> {
        self.post_outcome::<()>("/reset_camera", None).await
    }

    // === Stream ===

    /// Poll whether the video source is currently delivering frames.
    pub async fn stream_status(&self) -> Result<crate::stream::StreamStatusResponse, PanelError> {
        self.get_json("/stream_status").await
    }

    /// URL of the continuous image stream, loaded directly by the browser.
    pub fn video_feed_url(&self) -> String {
        format!("{}/video_feed", self.base_url)
    }

    // === Shutdown ===

    /// Fire-and-forget server shutdown. The caller gates this behind an
    /// operator confirmation; the response body is ignored.
    pub async fn shutdown(&self) -> Result<(), PanelError> {
        let _ = self.fetch_get("/shutdown").await?;
        Ok(())
    }
}
