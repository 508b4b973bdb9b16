//! Client for the URL classification service.
//!
//! Contract:
//!   POST {api_base}/scan/url   body `{"url": ...}`
//!     2xx → [`Classification`]
//!     else → `{"error": ...}`
//!   GET  {api_base}/health, GET {api_base}/model/info: informational only.
//!
//! The service serializes boolean features as 0/1 and integer features as
//! floats, so feature fields are read leniently.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::ScannerConfig;
use crate::error::NetworkError;

/// Risk score above which an unsafe URL is banded `High`.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub url: String,
    pub prediction: String,
    pub is_safe: bool,
    /// 0..=100
    pub risk_score: f64,
    /// 0..=100
    pub confidence: f64,
    pub model_used: String,
    #[serde(default)]
    pub features: UrlFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Safe,
    Medium,
    High,
}

impl Classification {
    pub fn risk_band(&self) -> RiskBand {
        if self.is_safe {
            RiskBand::Safe
        } else if self.risk_score > HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else {
            RiskBand::Medium
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlFeatures {
    #[serde(rename = "Protocol", default, deserialize_with = "lenient_flag")]
    pub protocol: bool,
    #[serde(rename = "DomainLength", default, deserialize_with = "lenient_count")]
    pub domain_length: u64,
    #[serde(rename = "URLLength", default, deserialize_with = "lenient_count")]
    pub url_length: u64,
    #[serde(rename = "SpecialCharCount", default, deserialize_with = "lenient_count")]
    pub special_char_count: u64,
    #[serde(rename = "IsIP", default, deserialize_with = "lenient_flag")]
    pub is_ip: bool,
    #[serde(rename = "Entropy", default)]
    pub entropy: f64,
    /// Any further features the model reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u64))
            .unwrap_or(0),
        _ => 0,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthInfo {
    pub status: String,
    pub message: String,
    pub model_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub label_encoder_loaded: bool,
    pub model_files: Value,
    pub feature_names: Vec<String>,
}

/// Outcome of the startup probe. Failures are collected, never raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub health: Option<HealthInfo>,
    pub model: Option<ModelInfo>,
    pub errors: Vec<String>,
}

impl ServiceStatus {
    pub fn is_ready(&self) -> bool {
        self.health.is_some() && self.model.as_ref().is_some_and(|m| m.model_loaded)
    }
}

#[async_trait(?Send)]
pub trait Classifier {
    async fn classify(&self, url: &str) -> Result<Classification, NetworkError>;

    async fn service_status(&self) -> ServiceStatus {
        ServiceStatus::default()
    }
}

#[async_trait(?Send)]
impl<C: Classifier + ?Sized> Classifier for std::rc::Rc<C> {
    async fn classify(&self, url: &str) -> Result<Classification, NetworkError> {
        (**self).classify(url).await
    }

    async fn service_status(&self) -> ServiceStatus {
        (**self).service_status().await
    }
}

// ── HTTP implementation ────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Map a raw HTTP response onto the classifier contract.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<Classification, NetworkError> {
    if (200..300).contains(&status) {
        return serde_json::from_slice(body)
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()));
    }
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Scan failed".to_string());
    Err(NetworkError::NonSuccessStatus { status, message })
}

pub struct HttpClassifier {
    client: reqwest::Client,
    config: ScannerConfig,
}

impl HttpClassifier {
    pub fn new(config: &ScannerConfig) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NetworkError::TransportFailure(e.to_string()))?;
        Ok(Self { client, config: config.clone() })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let response = self
            .client
            .get(self.config.endpoint(path))
            .send()
            .await
            .map_err(|e| NetworkError::TransportFailure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::NonSuccessStatus {
                status: status.as_u16(),
                message: format!("GET {path} failed"),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))
    }
}

#[async_trait(?Send)]
impl Classifier for HttpClassifier {
    async fn classify(&self, url: &str) -> Result<Classification, NetworkError> {
        let endpoint = self.config.endpoint("/scan/url");
        tracing::debug!(%endpoint, url, "classifying");
        let response = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| NetworkError::TransportFailure(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::TransportFailure(e.to_string()))?;
        interpret_response(status, &body)
    }

    async fn service_status(&self) -> ServiceStatus {
        let (health, model) = tokio::join!(
            self.get_json::<HealthInfo>("/health"),
            self.get_json::<ModelInfo>("/model/info"),
        );
        let mut status = ServiceStatus::default();
        match health {
            Ok(h) => {
                tracing::info!(status = %h.status, model_status = %h.model_status, "classification service is up");
                status.health = Some(h);
            }
            Err(e) => status.errors.push(format!("health: {e}")),
        }
        match model {
            Ok(m) => {
                if !m.model_loaded {
                    tracing::warn!("classification model not loaded; train it before scanning");
                }
                status.model = Some(m);
            }
            Err(e) => status.errors.push(format!("model info: {e}")),
        }
        for err in &status.errors {
            tracing::warn!(error = %err, "service status check failed; is the classification service running?");
        }
        status
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warp::Filter;
    use warp::http::StatusCode;

    fn sample_body() -> Value {
        json!({
            "url": "http://198.51.100.7/login",
            "domain": "198.51.100.7",
            "prediction": "phishing",
            "confidence": 91.5,
            "risk_score": 88.25,
            "is_safe": false,
            "risk_level": "High",
            "features": {
                "Protocol": 0,
                "DomainLength": 12.0,
                "URLLength": 26,
                "SpecialCharCount": 5.0,
                "IsIP": 1,
                "Entropy": 3.912,
                "HasAt": 0
            },
            "model_used": "LogisticRegression"
        })
    }

    #[test]
    fn success_body_parses_leniently() {
        let body = serde_json::to_vec(&sample_body()).unwrap();
        let result = interpret_response(200, &body).unwrap();
        assert_eq!(result.prediction, "phishing");
        assert!(!result.features.protocol);
        assert!(result.features.is_ip);
        assert_eq!(result.features.domain_length, 12);
        assert_eq!(result.features.special_char_count, 5);
        assert_eq!(result.features.extra.get("HasAt"), Some(&json!(0)));
        assert_eq!(result.risk_band(), RiskBand::High);
        assert_eq!(result.domain.as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn error_body_message_is_kept() {
        let err = interpret_response(500, br#"{"error":"model not loaded"}"#).unwrap_err();
        assert_eq!(
            err,
            NetworkError::NonSuccessStatus { status: 500, message: "model not loaded".to_string() }
        );
    }

    #[test]
    fn error_without_body_falls_back() {
        let err = interpret_response(502, b"<html>bad gateway</html>").unwrap_err();
        assert!(err.to_string().contains("Scan failed"));
    }

    #[test]
    fn malformed_success_is_invalid_response() {
        assert!(matches!(
            interpret_response(200, b"{\"url\": 3}"),
            Err(NetworkError::InvalidResponse(_))
        ));
    }

    #[test]
    fn risk_bands() {
        let mut c: Classification =
            serde_json::from_value(sample_body()).unwrap();
        c.risk_score = 70.0;
        assert_eq!(c.risk_band(), RiskBand::Medium);
        c.is_safe = true;
        assert_eq!(c.risk_band(), RiskBand::Safe);
    }

    #[tokio::test]
    async fn http_500_surfaces_service_error() {
        let route = warp::path!("api" / "scan" / "url").and(warp::post()).map(|| {
            warp::reply::with_status(
                warp::reply::json(&json!({ "error": "model not loaded" })),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let mut config = ScannerConfig::default();
        config.set_api_base(&format!("http://{addr}/api"));
        let err = HttpClassifier::new(&config).unwrap().classify("https://example.com").await.unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn http_success_round_trip() {
        let route = warp::path!("api" / "scan" / "url")
            .and(warp::post())
            .and(warp::body::json())
            .map(|body: Value| {
                let mut reply = sample_body();
                reply["url"] = body["url"].clone();
                warp::reply::json(&reply)
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let mut config = ScannerConfig::default();
        config.set_api_base(&format!("http://{addr}/api"));
        let result = HttpClassifier::new(&config).unwrap().classify("https://echo.test").await.unwrap();
        assert_eq!(result.url, "https://echo.test");
        assert_eq!(result.model_used, "LogisticRegression");
    }

    #[tokio::test]
    async fn status_probe_collects_both_endpoints() {
        let health = warp::path!("api" / "health").map(|| {
            warp::reply::json(&json!({ "status": "ok", "message": "SafeLink API is running", "model_status": "loaded" }))
        });
        let model = warp::path!("api" / "model" / "info").map(|| {
            warp::reply::json(&json!({ "model_loaded": false, "feature_names": ["Protocol"] }))
        });
        let (addr, server) = warp::serve(health.or(model)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let mut config = ScannerConfig::default();
        config.set_api_base(&format!("http://{addr}/api"));
        let status = HttpClassifier::new(&config).unwrap().service_status().await;
        assert_eq!(status.health.as_ref().map(|h| h.status.as_str()), Some("ok"));
        assert_eq!(status.model.as_ref().map(|m| m.model_loaded), Some(false));
        assert!(status.errors.is_empty());
        assert!(!status.is_ready());
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_failure() {
        let mut config = ScannerConfig::default();
        config.set_api_base("http://127.0.0.1:1/api");
        let classifier = HttpClassifier::new(&config).unwrap();
        assert!(matches!(
            classifier.classify("https://example.com").await,
            Err(NetworkError::TransportFailure(_))
        ));
        let status = classifier.service_status().await;
        assert_eq!(status.errors.len(), 2);
    }
}
