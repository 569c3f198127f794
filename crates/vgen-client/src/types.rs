//! Rendering service request/response types.

use serde::{Deserialize, Serialize};

/// Application-level code for a successful call.
pub const SUCCESS_CODE: i64 = 200;

/// How the job should be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationType {
    /// Prompt only
    #[serde(rename = "TEXT_2_VIDEO")]
    TextToVideo,
    /// Prompt plus reference image
    #[serde(rename = "REFERENCE_2_VIDEO")]
    ReferenceToVideo,
}

/// Job submission payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub enable_translation: bool,
    pub generation_type: GenerationType,
    /// Reference images as `data:` URIs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

/// Common response envelope: `{code, msg, data}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Service message, or a generic one naming the code.
    pub fn message(&self) -> String {
        self.msg
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("service returned code {}", self.code))
    }
}

/// Payload of a submission response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitData {
    #[serde(default, alias = "taskId")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Payload of a status response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    #[serde(default, alias = "taskId")]
    pub job_id: Option<String>,
    /// 0 running, 1 success, 2 creation failed, 3 generation failed
    #[serde(default)]
    pub success_flag: Option<i64>,
    #[serde(default)]
    pub response: Option<RecordResponse>,
    #[serde(default)]
    pub error_code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    #[serde(default)]
    pub result_urls: Option<Vec<String>>,
}

impl RecordInfo {
    /// Result locators, empty when none were returned.
    pub fn result_urls(&self) -> Vec<String> {
        self.response
            .as_ref()
            .and_then(|r| r.result_urls.clone())
            .unwrap_or_default()
    }
}
