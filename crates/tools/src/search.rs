//! `searchDuckduckgo`: web lookup through the DuckDuckGo Instant Answer API.

use std::time::Duration;

use async_trait::async_trait;
use runtime::tools::{ParamType, ParameterSpec, optional_u64, required_str};
use runtime::{Parameters, Tool, ToolError, ToolOutput, ToolResult, ToolSpec, ToolView};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";
const DEFAULT_MAX_RESULTS: usize = 5;
const MAX_RESULTS_CAP: usize = 10;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

// Instant Answer response, only the fields we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    answer: Value,
    #[serde(default)]
    results: Vec<Topic>,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Topic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<Topic>,
    },
    Other(Value),
}

pub struct SearchDuckduckgo {
    spec: ToolSpec,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SearchDuckduckgo {
    pub fn new(client: reqwest::Client) -> Self {
        let spec = ToolSpec::new("searchDuckduckgo", "Search the web with DuckDuckGo.")
            .param(ParameterSpec::required(
                "query",
                ParamType::String,
                "Search terms.",
            ))
            .param(ParameterSpec::optional(
                "limit",
                ParamType::Integer,
                "Maximum number of results (1-10, default 5).",
            ));
        Self {
            spec,
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the API endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, query: &str) -> Result<Value, String> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| format!("invalid search endpoint: {e}"))?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("search request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("search failed with status: {}", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| format!("invalid search response: {e}"))
    }

    /// Turn an Instant Answer payload into a `search_results` view.
    pub fn parse_response(query: &str, body: &Value, limit: usize) -> ToolView {
        let answer: InstantAnswer = serde_json::from_value(body.clone()).unwrap_or_default();

        let mut hits = Vec::new();
        if !answer.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: if answer.heading.is_empty() {
                    query.to_string()
                } else {
                    answer.heading.clone()
                },
                url: answer.abstract_url.clone(),
                snippet: answer.abstract_text.clone(),
            });
        }
        collect_hits(&answer.results, &mut hits);
        collect_hits(&answer.related_topics, &mut hits);
        hits.truncate(limit);

        let mut data = Map::new();
        data.insert("query".into(), json!(query));
        if let Some(text) = answer.answer.as_str().filter(|a| !a.is_empty()) {
            data.insert("answer".into(), json!(text));
        }
        data.insert("results".into(), json!(hits));
        ToolView::new("search_results", data).with_template("search_list")
    }
}

fn collect_hits(topics: &[Topic], hits: &mut Vec<SearchHit>) {
    for topic in topics {
        match topic {
            Topic::Entry { text, first_url } if !text.is_empty() => {
                // Entries read "Title - description".
                let (title, snippet) = match text.split_once(" - ") {
                    Some((title, rest)) => (title.trim(), rest.trim()),
                    None => (text.trim(), ""),
                };
                hits.push(SearchHit {
                    title: title.to_string(),
                    url: first_url.clone(),
                    snippet: snippet.to_string(),
                });
            }
            Topic::Group { topics } => collect_hits(topics, hits),
            _ => {}
        }
    }
}

#[async_trait]
impl Tool for SearchDuckduckgo {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: &Parameters) -> Result<ToolResult, ToolError> {
        let query = required_str(parameters, "query")?.trim();
        if query.is_empty() {
            return Err(ToolError::invalid("query", "must not be empty"));
        }
        let limit = optional_u64(parameters, "limit")?
            .map_or(DEFAULT_MAX_RESULTS, |n| n as usize)
            .clamp(1, MAX_RESULTS_CAP);

        debug!(query, limit, "searching");
        match self.fetch(query).await {
            Ok(body) => {
                let view = Self::parse_response(query, &body, limit);
                Ok(ToolResult::success(ToolOutput::RichView(view))
                    .with_metadata("source", json!("duckduckgo")))
            }
            Err(message) => {
                warn!(query, "{message}");
                Ok(ToolResult::failure(message))
            }
        }
    }
}
