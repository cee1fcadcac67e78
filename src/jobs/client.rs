use crate::config::JobsConfig;
use crate::error::{Result, ScrapeError};
use crate::models::RawJobItem;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::poll::{RunSnapshot, RunState};

/// Actor input for a job search.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    pub start_urls: Vec<StartUrl>,
    pub max_results: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    #[serde(default)]
    status: String,
    default_dataset_id: Option<String>,
}

/// Thin client over the actor platform's run and dataset endpoints.
///
/// Credentials are only checked when a request is about to be made.
pub struct ActorClient {
    http: reqwest::Client,
    api_base: Url,
    actor_id: Option<String>,
    token: Option<String>,
}

impl ActorClient {
    pub fn new(config: &JobsConfig) -> anyhow::Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .with_context(|| format!("Invalid api_base {:?}", config.api_base))?;
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_base,
            actor_id: config.actor_id.clone(),
            token: config.apify_token.clone(),
        })
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or(ScrapeError::MissingCredential("APIFY_TOKEN"))
    }

    fn actor_id(&self) -> Result<&str> {
        self.actor_id
            .as_deref()
            .ok_or(ScrapeError::MissingCredential("ACTOR_ID"))
    }

    /// `{api_base}/<segments..>?token=..`
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let token = self.token()?;
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ScrapeError::Protocol(format!("api_base {} cannot take a path", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// Send a request and decode the JSON body. Error messages carry the
    /// path only, never the token.
    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder, url: &Url) -> Result<T> {
        let path = url.path().to_string();
        debug!("{}", path);

        let resp = req
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScrapeError::transport(&path, e.without_url()))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| ScrapeError::transport(&path, e.without_url()))?;

        serde_json::from_slice(&body).map_err(|e| ScrapeError::Protocol(format!("{}: {}", path, e)))
    }

    pub async fn start_run(&self, input: &RunInput) -> Result<RunSnapshot> {
        let actor = self.actor_id()?;
        let url = self.endpoint(&["acts", actor, "runs"])?;
        let env: Envelope<RunData> = self
            .send_json(self.http.post(url.clone()).json(input), &url)
            .await?;

        let state = match RunState::from_actor_status(&env.data.status) {
            s if s.is_terminal() => s,
            _ => RunState::Submitted,
        };
        Ok(RunSnapshot {
            run_id: env.data.id,
            state,
            dataset_id: env.data.default_dataset_id,
        })
    }

    pub async fn run_status(&self, run_id: &str) -> Result<RunSnapshot> {
        let actor = self.actor_id()?;
        let url = self.endpoint(&["acts", actor, "runs", run_id])?;
        let env: Envelope<RunData> = self.send_json(self.http.get(url.clone()), &url).await?;

        Ok(RunSnapshot {
            run_id: env.data.id,
            state: RunState::from_actor_status(&env.data.status),
            dataset_id: env.data.default_dataset_id,
        })
    }

    pub async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<RawJobItem>> {
        let mut url = self.endpoint(&["datasets", dataset_id, "items"])?;
        url.query_pairs_mut().append_pair("format", "json");
        self.send_json(self.http.get(url.clone()), &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, token: Option<&str>) -> ActorClient {
        ActorClient::new(&JobsConfig {
            api_base: server.url("/v2"),
            actor_id: Some("acme~indeed".into()),
            apify_token: token.map(String::from),
            ..JobsConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_run_posts_input_with_token() {
        let server = MockServer::start();
        let input = RunInput {
            start_urls: vec![StartUrl {
                url: "https://www.indeed.com/jobs?q=rust".into(),
            }],
            max_results: 100,
        };
        let submit = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/acts/acme~indeed/runs")
                .query_param("token", "secret")
                .json_body(json!({
                    "startUrls": [{"url": "https://www.indeed.com/jobs?q=rust"}],
                    "maxResults": 100
                }));
            then.status(201).json_body(json!({
                "data": {"id": "run-7", "status": "READY", "defaultDatasetId": "ds-7"}
            }));
        });

        let snap = client(&server, Some("secret")).start_run(&input).await.unwrap();

        submit.assert();
        assert_eq!(snap.run_id, "run-7");
        assert_eq!(snap.state, RunState::Submitted);
        assert_eq!(snap.dataset_id.as_deref(), Some("ds-7"));
    }

    #[tokio::test]
    async fn test_missing_token_fails_at_request_time() {
        let server = MockServer::start();
        let err = client(&server, None).run_status("run-1").await.unwrap_err();
        assert!(matches!(err, ScrapeError::MissingCredential("APIFY_TOKEN")));
    }

    #[tokio::test]
    async fn test_dataset_items_requests_json_format() {
        let server = MockServer::start();
        let items = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/datasets/ds-7/items")
                .query_param("format", "json")
                .query_param("token", "secret");
            then.status(200)
                .json_body(json!([{"positionName": "Backend Engineer", "company": "Acme"}]));
        });

        let got = client(&server, Some("secret")).dataset_items("ds-7").await.unwrap();

        items.assert();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].company.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/acts/acme~indeed/runs/run-1");
            then.status(200).body("<html>maintenance</html>");
        });

        let err = client(&server, Some("secret")).run_status("run-1").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Protocol(_)));
    }
}
