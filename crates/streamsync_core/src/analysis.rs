//! Boundary to the external sync analysis service.
//!
//! The service receives the uploaded file and answers with a JSON report
//! giving the audio/video offset in frames. Reports are passed through
//! as-is; [`AnalysisReport::suggested_offset`] converts a successful one
//! into a [`SyncOffset`] for callers that want to seed their offset input.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::UploadSettings;
use crate::models::{OffsetError, SyncOffset, UploadCandidate};

/// Errors from talking to, or interpreting, the analysis service.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Analysis failed: {error}{}", details_suffix(.details))]
    Service {
        error: String,
        details: Option<String>,
    },

    #[error("Analysis report has no offset")]
    MissingOffset,

    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    #[error("Suggested offset is unusable: {0}")]
    Offset(#[from] OffsetError),

    #[error("Failed to parse analysis report: {0}")]
    Parse(#[from] serde_json::Error),
}

fn details_suffix(details: &Option<String>) -> String {
    match details {
        Some(d) => format!(" ({})", d),
        None => String::new(),
    }
}

/// JSON body returned by the analysis service.
///
/// Successful reports carry `filename`, `offset_frames`, `confidence` and
/// `status`; failures carry `error` plus optional `details` or `log`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Audio/video offset in frames; positive means the audio lags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_frames: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl AnalysisReport {
    pub fn from_json(body: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.as_deref() == Some("success")
    }

    /// The service's failure, if the report describes one.
    pub fn failure(&self) -> Option<AnalysisError> {
        self.error.as_ref().map(|error| AnalysisError::Service {
            error: error.clone(),
            details: self.details.clone().or_else(|| self.log.clone()),
        })
    }

    /// Convert the frame offset to milliseconds at `frame_rate`.
    ///
    /// Out-of-range results are reported rather than clamped.
    pub fn suggested_offset(&self, frame_rate: f64) -> Result<SyncOffset, AnalysisError> {
        if let Some(failure) = self.failure() {
            return Err(failure);
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(AnalysisError::InvalidFrameRate(frame_rate));
        }
        let frames = self.offset_frames.ok_or(AnalysisError::MissingOffset)?;
        let ms = (frames as f64 * 1000.0 / frame_rate).round() as i64;
        Ok(SyncOffset::new(ms)?)
    }

    /// [`suggested_offset`](Self::suggested_offset) at the configured
    /// `[upload].frame_rate`.
    pub fn suggested_offset_for(
        &self,
        settings: &UploadSettings,
    ) -> Result<SyncOffset, AnalysisError> {
        self.suggested_offset(settings.frame_rate)
    }
}

/// A service that estimates the audio/video offset of an upload.
pub trait AnalysisService: Send + Sync {
    /// Submit `bytes` (described by `upload`) for analysis.
    ///
    /// `advisory_offset` is the user's current guess; services may ignore it.
    fn analyze(
        &self,
        upload: &UploadCandidate,
        bytes: &[u8],
        advisory_offset: SyncOffset,
    ) -> impl Future<Output = Result<AnalysisReport, AnalysisError>> + Send;
}

/// Posts uploads to the analysis service over HTTP.
///
/// The file goes in a multipart `video` field; the advisory offset is sent
/// as an `offset_ms` text field.
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: reqwest::Client,
    url: String,
}

impl HttpAnalysisService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self::new(&settings.service_url)
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AnalysisService for HttpAnalysisService {
    async fn analyze(
        &self,
        upload: &UploadCandidate,
        bytes: &[u8],
        advisory_offset: SyncOffset,
    ) -> Result<AnalysisReport, AnalysisError> {
        let mut part =
            reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(upload.file_name.clone());
        if !upload.mime_type.is_empty() {
            part = part.mime_str(&upload.mime_type)?;
        }
        let form = reqwest::multipart::Form::new()
            .part("video", part)
            .text("offset_ms", advisory_offset.offset_ms().to_string());

        tracing::info!(url = %self.url, file = %upload.file_name, "Submitting upload for analysis");
        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let report = match AnalysisReport::from_json(&body) {
            Ok(report) => report,
            Err(_) if !status.is_success() => {
                return Err(AnalysisError::Service {
                    error: format!("HTTP {}", status),
                    details: None,
                })
            }
            Err(e) => return Err(e),
        };

        if !status.is_success() && report.error.is_none() {
            return Err(AnalysisError::Service {
                error: format!("HTTP {}", status),
                details: None,
            });
        }

        tracing::debug!(?report, "Analysis report received");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedService {
        body: &'static str,
    }

    impl AnalysisService for CannedService {
        async fn analyze(
            &self,
            _upload: &UploadCandidate,
            _bytes: &[u8],
            _advisory_offset: SyncOffset,
        ) -> Result<AnalysisReport, AnalysisError> {
            AnalysisReport::from_json(self.body)
        }
    }

    #[test]
    fn success_report_converts_to_offset() {
        let report = AnalysisReport::from_json(
            r#"{"filename": "clip.mp4", "offset_frames": 3, "confidence": 7.25, "status": "success"}"#,
        )
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.confidence, Some(7.25));
        assert_eq!(report.suggested_offset(25.0).unwrap().offset_ms(), 120);
        assert_eq!(report.suggested_offset(30.0).unwrap().offset_ms(), 100);
    }

    #[test]
    fn negative_frames_give_negative_offset() {
        let report = AnalysisReport {
            offset_frames: Some(-5),
            status: Some("success".into()),
            ..AnalysisReport::default()
        };
        assert_eq!(report.suggested_offset(25.0).unwrap().offset_ms(), -200);
    }

    #[test]
    fn failure_body_is_surfaced() {
        let report = AnalysisReport::from_json(
            r#"{"error": "Processing script failed", "details": "exit status 1"}"#,
        )
        .unwrap();

        assert!(!report.is_success());
        let err = report.suggested_offset(25.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Analysis failed: Processing script failed (exit status 1)"
        );
    }

    #[test]
    fn large_offsets_are_range_errors() {
        let report = AnalysisReport {
            offset_frames: Some(60),
            status: Some("success".into()),
            ..AnalysisReport::default()
        };
        assert!(matches!(
            report.suggested_offset(25.0),
            Err(AnalysisError::Offset(OffsetError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn bad_frame_rate_and_missing_offset() {
        let report = AnalysisReport::default();
        assert!(matches!(
            report.suggested_offset(0.0),
            Err(AnalysisError::InvalidFrameRate(_))
        ));
        assert!(matches!(
            report.suggested_offset(25.0),
            Err(AnalysisError::MissingOffset)
        ));
    }

    #[test]
    fn configured_frame_rate_scales_offset() {
        let report = AnalysisReport {
            offset_frames: Some(6),
            status: Some("success".into()),
            ..AnalysisReport::default()
        };
        let mut settings = UploadSettings::default();
        assert_eq!(report.suggested_offset_for(&settings).unwrap().offset_ms(), 240);

        settings.frame_rate = 60.0;
        assert_eq!(report.suggested_offset_for(&settings).unwrap().offset_ms(), 100);
    }

    #[test]
    fn http_service_uses_configured_url() {
        let service = HttpAnalysisService::from_settings(&UploadSettings::default());
        assert_eq!(service.url(), "http://localhost:5000/api/upload");
    }

    #[tokio::test]
    async fn http_service_reports_unreachable_host() {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let service = HttpAnalysisService::new("http://127.0.0.1:9/api/upload").with_client(client);
        let upload = UploadCandidate::new("clip.mp4", "video/mp4", 4);

        let err = service
            .analyze(&upload, b"data", SyncOffset::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Network(_)));
    }

    #[tokio::test]
    async fn service_trait_returns_report() {
        let service = CannedService {
            body: r#"{"offset_frames": -2, "status": "success"}"#,
        };
        let upload = UploadCandidate::new("clip.mp4", "video/mp4", 10);

        let report = service
            .analyze(&upload, b"data", SyncOffset::ZERO)
            .await
            .unwrap();

        assert_eq!(report.offset_frames, Some(-2));
        assert_eq!(report.suggested_offset(25.0).unwrap().offset_ms(), -80);
    }
}
