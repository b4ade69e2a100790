use super::{FetchRequest, Page, Transport, is_text_content};
use crate::engine::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

/// Command sent to a FlareSolverr-compatible solver
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolverCommand<'a> {
    cmd: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SolverResponse {
    status: String,
    #[serde(default)]
    message: String,
    session: Option<String>,
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    url: String,
    status: u16,
    #[serde(default)]
    headers: HashMap<String, String>,
    response: String,
}

/// Fetches pages through a headless browser session held by a
/// challenge-solving proxy.
///
/// One browser session is opened lazily on the first fetch and shared by all
/// requests of a run. `release` destroys it; later calls are no-ops.
pub struct ChallengeTransport {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    session: OnceCell<String>,
    released: AtomicBool,
}

impl ChallengeTransport {
    /// Create a transport talking to the solver at `solver_url`
    pub fn new(solver_url: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: solver_url.join("v1")?,
            timeout,
            session: OnceCell::new(),
            released: AtomicBool::new(false),
        })
    }

    /// Whether the browser session has been torn down
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn call(&self, command: &SolverCommand<'_>) -> Result<SolverResponse> {
        let response: SolverResponse = self
            .client
            .post(self.endpoint.clone())
            .json(command)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| EngineError::Challenge(format!("Invalid solver response: {e}")))?;

        if response.status != "ok" {
            return Err(EngineError::Challenge(format!(
                "{} failed: {}",
                command.cmd, response.message
            )));
        }
        Ok(response)
    }

    async fn session(&self) -> Result<&str> {
        let session = self
            .session
            .get_or_try_init(|| async {
                let response = self
                    .call(&SolverCommand {
                        cmd: "sessions.create",
                        url: None,
                        session: None,
                        max_timeout: None,
                    })
                    .await?;
                let id = response.session.ok_or_else(|| {
                    EngineError::Challenge("Solver did not return a session".to_string())
                })?;
                info!("Opened challenge solver session {}", id);
                Ok::<_, EngineError>(id)
            })
            .await?;
        Ok(session.as_str())
    }
}

#[async_trait]
impl Transport for ChallengeTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<Page> {
        if self.is_released() {
            return Err(EngineError::Challenge(
                "Browser session already released".to_string(),
            ));
        }

        let session = self.session().await?;
        debug!("Solving challenge for {}", request.url);

        let response = self
            .call(&SolverCommand {
                cmd: "request.get",
                url: Some(request.url.as_str()),
                session: Some(session),
                max_timeout: Some(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)),
            })
            .await?;

        let solution = response
            .solution
            .ok_or_else(|| EngineError::Challenge("Solver returned no solution".to_string()))?;

        if !(200..300).contains(&solution.status) {
            return Err(EngineError::Transport(format!(
                "{} returned {}",
                request.url, solution.status
            )));
        }

        let content_type = solution
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.clone());

        if request.text_only && !is_text_content(content_type.as_deref()) {
            return Err(EngineError::NonTextContent {
                url: request.url.to_string(),
                content_type: content_type.unwrap_or_default(),
            });
        }

        Ok(Page {
            url: Url::parse(&solution.url).unwrap_or_else(|_| request.url.clone()),
            status: solution.status,
            content_type,
            body: solution.response,
        })
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(session) = self.session.get() else {
            return;
        };

        let result = self
            .call(&SolverCommand {
                cmd: "sessions.destroy",
                url: None,
                session: Some(session),
                max_timeout: None,
            })
            .await;

        match result {
            Ok(_) => info!("Closed challenge solver session {}", session),
            Err(e) => warn!("Failed to close challenge solver session {}: {}", session, e),
        }
    }
}
