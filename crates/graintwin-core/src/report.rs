//! Report desk - sends report prompts to an external text service
//!
//! Requests run on their own worker thread so neither the tick driver nor
//! the frame driver ever waits on the network. Finished requests are
//! collected with [`ReportDesk::drain`] from the engine's own thread.
//! Failures never escape: they are logged and replaced by the fixed
//! apology text.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use graintwin_logic::config::ReportConfig;
use graintwin_logic::report::{normalize_response, ReportTicket, REPORT_FAILURE_TEXT};
use serde::{Deserialize, Serialize};

/// External collaborator that turns a prompt into a report.
pub trait ReportService: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ReportError>;
}

/// Errors from the report service
#[derive(Debug)]
pub enum ReportError {
    /// The API key environment variable is unset or empty.
    MissingApiKey(String),
    Http(reqwest::Error),
    /// The service answered with a non-success status.
    Status { code: u16, body: String },
    /// The answer did not have the expected shape.
    Malformed(String),
}

impl From<reqwest::Error> for ReportError {
    fn from(e: reqwest::Error) -> Self {
        ReportError::Http(e)
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::MissingApiKey(var) => write!(f, "API key variable {} is not set", var),
            ReportError::Http(e) => write!(f, "HTTP error: {}", e),
            ReportError::Status { code, body } => {
                write!(f, "report service returned {}: {}", code, body)
            }
            ReportError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for ReportError {}

// ── Generative-text REST client ─────────────────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Extract the concatenated text of the first candidate.
fn response_text(body: &str) -> Result<String, ReportError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ReportError::Malformed(e.to_string()))?;
    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

/// Blocking client for a `generateContent`-style REST endpoint.
pub struct GenerativeTextClient {
    http: reqwest::blocking::Client,
    config: ReportConfig,
}

impl GenerativeTextClient {
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl ReportService for GenerativeTextClient {
    fn generate(&self, prompt: &str) -> Result<String, ReportError> {
        // Read on every call so a key exported after startup is picked up.
        let key = std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ReportError::MissingApiKey(self.config.api_key_env.clone()))?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ReportError::Status {
                code: status.as_u16(),
                body,
            });
        }
        response_text(&body)
    }
}

/// Service used when no HTTP client could be built; every request fails.
struct UnavailableService(String);

impl ReportService for UnavailableService {
    fn generate(&self, _prompt: &str) -> Result<String, ReportError> {
        Err(ReportError::Malformed(self.0.clone()))
    }
}

/// Build the default HTTP-backed service for `config`.
pub fn default_service(config: &ReportConfig) -> Arc<dyn ReportService> {
    match GenerativeTextClient::new(config.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::warn!("Report client unavailable: {}", e);
            Arc::new(UnavailableService(e.to_string()))
        }
    }
}

// ── Desk ────────────────────────────────────────────────────────────────

/// A finished request, ready for the report board.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub ticket: ReportTicket,
    pub text: String,
}

/// Runs report requests off the engine thread.
pub struct ReportDesk {
    service: Arc<dyn ReportService>,
    sender: Sender<ReportOutcome>,
    receiver: Mutex<Receiver<ReportOutcome>>,
}

impl ReportDesk {
    pub fn new(service: Arc<dyn ReportService>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            service,
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Start a request on a worker thread. Returns immediately.
    pub fn submit(&self, ticket: ReportTicket, prompt: String) {
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();
        log::debug!("Report request {} submitted", ticket.0);

        let spawned = std::thread::Builder::new()
            .name(format!("report-{}", ticket.0))
            .spawn(move || {
                let text = match service.generate(&prompt) {
                    Ok(text) => normalize_response(&text),
                    Err(e) => {
                        log::warn!("Report request {} failed: {}", ticket.0, e);
                        REPORT_FAILURE_TEXT.to_string()
                    }
                };
                // The engine may be gone by now; nothing left to deliver to.
                let _ = sender.send(ReportOutcome { ticket, text });
            });

        if let Err(e) = spawned {
            log::warn!("Could not start report request {}: {}", ticket.0, e);
            let _ = self.sender.send(ReportOutcome {
                ticket,
                text: REPORT_FAILURE_TEXT.to_string(),
            });
        }
    }

    /// Collect every request finished since the last call.
    pub fn drain(&self) -> Vec<ReportOutcome> {
        match self.receiver.lock() {
            Ok(receiver) => receiver.try_iter().collect(),
            Err(poisoned) => poisoned.into_inner().try_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Echo;

    impl ReportService for Echo {
        fn generate(&self, prompt: &str) -> Result<String, ReportError> {
            Ok(format!("echo:{}", prompt))
        }
    }

    struct Offline;

    impl ReportService for Offline {
        fn generate(&self, _prompt: &str) -> Result<String, ReportError> {
            Err(ReportError::Status {
                code: 503,
                body: "unavailable".into(),
            })
        }
    }

    fn wait_for(desk: &ReportDesk, n: usize) -> Vec<ReportOutcome> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.len() < n && Instant::now() < deadline {
            out.extend(desk.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn test_desk_delivers_outcome() {
        let desk = ReportDesk::new(Arc::new(Echo));
        desk.submit(ReportTicket(1), "hi".into());
        let out = wait_for(&desk, 1);
        assert_eq!(
            out,
            vec![ReportOutcome {
                ticket: ReportTicket(1),
                text: "echo:hi".into()
            }]
        );
    }

    #[test]
    fn test_failure_becomes_apology() {
        let desk = ReportDesk::new(Arc::new(Offline));
        desk.submit(ReportTicket(7), "hi".into());
        let out = wait_for(&desk, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, REPORT_FAILURE_TEXT);
    }

    #[test]
    fn test_parse_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"风险"},{"text":"低"}]}}]}"#;
        assert_eq!(response_text(body).unwrap(), "风险低");
    }

    #[test]
    fn test_parse_empty_candidates() {
        assert_eq!(response_text(r#"{"candidates":[]}"#).unwrap(), "");
        assert_eq!(response_text("{}").unwrap(), "");
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            response_text("not json"),
            Err(ReportError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let config = ReportConfig {
            api_key_env: "GRAINTWIN_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let client = GenerativeTextClient::new(config).unwrap();
        assert!(matches!(
            client.generate("prompt"),
            Err(ReportError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_url_joins_model() {
        let config = ReportConfig {
            endpoint: "http://localhost:9/v1/".into(),
            model: "m".into(),
            ..Default::default()
        };
        let client = GenerativeTextClient::new(config).unwrap();
        assert_eq!(client.url(), "http://localhost:9/v1/models/m:generateContent");
    }
}
