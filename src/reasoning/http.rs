use crate::config::ReasoningConfig;
use crate::domain::{BumpKind, Version};
use crate::error::{ReleaseError, Result};
use crate::reasoning::{
    BumpAssessment, ReasoningError, ReasoningIntent, ReasoningRequest, ReasoningService,
};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP reasoning client with a hard per-request timeout
pub struct HttpReasoningService {
    client: Client,
    endpoint: String,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct BumpReply {
    bump: Option<String>,
    rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotesReply {
    notes: Option<String>,
}

impl HttpReasoningService {
    pub fn new(config: &ReasoningConfig, api_key: Option<String>) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ReleaseError::config("reasoning.endpoint is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("git-release/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReleaseError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpReasoningService {
            client,
            endpoint,
            model: config.model.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    fn call(&self, request: &ReasoningRequest) -> std::result::Result<String, ReasoningError> {
        debug!(intent = %request.intent, endpoint = %self.endpoint, "calling reasoning service");

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                ReasoningError::Timeout(self.timeout_secs)
            } else {
                ReasoningError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                ReasoningError::Timeout(self.timeout_secs)
            } else {
                ReasoningError::Malformed(e.to_string())
            }
        })?;

        if status.is_server_error() {
            return Err(ReasoningError::Unavailable(format!(
                "{}: {}",
                status,
                truncate(&body, 200)
            )));
        }
        if !status.is_success() {
            return Err(ReasoningError::Refused(format!(
                "{}: {}",
                status,
                truncate(&body, 200)
            )));
        }

        Ok(body)
    }

    fn request(
        &self,
        intent: ReasoningIntent,
        summary: &str,
        current: String,
        target: Option<String>,
    ) -> ReasoningRequest {
        ReasoningRequest {
            intent,
            model: self.model.clone(),
            summary: summary.to_string(),
            current_version: current,
            target_version: target,
        }
    }
}

impl ReasoningService for HttpReasoningService {
    fn assess_bump(
        &self,
        summary: &str,
        current: &Version,
    ) -> std::result::Result<BumpAssessment, ReasoningError> {
        let request =
            self.request(ReasoningIntent::VersionBump, summary, current.to_string(), None);
        let body = self.call(&request)?;
        parse_bump_reply(&body)
    }

    fn compose_notes(
        &self,
        summary: &str,
        current: &Version,
        target: &Version,
    ) -> std::result::Result<String, ReasoningError> {
        let request = self.request(
            ReasoningIntent::ReleaseNotes,
            summary,
            current.to_string(),
            Some(target.to_string()),
        );
        let body = self.call(&request)?;
        parse_notes_reply(&body)
    }
}

/// Refusals may come back as `{"error": ...}` or `{"refused": true, "reason": ...}`
fn refusal(value: &Value) -> Option<String> {
    if let Some(error) = value.get("error") {
        return Some(match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }
    if value.get("refused").and_then(Value::as_bool) == Some(true) {
        return Some(
            value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("no reason given")
                .to_string(),
        );
    }
    None
}

/// Parse a `version-bump` reply: `{"bump": "minor", "rationale": "..."}`
pub fn parse_bump_reply(body: &str) -> std::result::Result<BumpAssessment, ReasoningError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ReasoningError::Malformed(e.to_string()))?;
    if let Some(reason) = refusal(&value) {
        return Err(ReasoningError::Refused(reason));
    }

    let reply: BumpReply =
        serde_json::from_value(value).map_err(|e| ReasoningError::Malformed(e.to_string()))?;
    let bump_text = reply
        .bump
        .ok_or_else(|| ReasoningError::Malformed("missing 'bump' field".to_string()))?;
    let bump: BumpKind = bump_text
        .parse()
        .map_err(|_| ReasoningError::Malformed(format!("unknown bump '{}'", bump_text)))?;

    Ok(BumpAssessment {
        bump,
        rationale: reply
            .rationale
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "no rationale given".to_string()),
    })
}

/// Parse a `release-notes` reply: `{"notes": "..."}`
pub fn parse_notes_reply(body: &str) -> std::result::Result<String, ReasoningError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ReasoningError::Malformed(e.to_string()))?;
    if let Some(reason) = refusal(&value) {
        return Err(ReasoningError::Refused(reason));
    }

    let reply: NotesReply =
        serde_json::from_value(value).map_err(|e| ReasoningError::Malformed(e.to_string()))?;
    match reply.notes {
        Some(notes) if !notes.trim().is_empty() => Ok(notes.trim().to_string()),
        _ => Err(ReasoningError::Malformed("missing or empty 'notes'".to_string())),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let cut: String = value.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
