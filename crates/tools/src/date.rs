//! `getTodayDate`: the local date, as a rich view or a sentence.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Local, TimeZone};
use runtime::tools::{ParamType, ParameterSpec, optional_str};
use runtime::{Parameters, Tool, ToolError, ToolOutput, ToolResult, ToolSpec, ToolView};
use serde_json::{Map, Value, json};

/// How the date should be returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayType {
    #[default]
    View,
    Text,
}

impl DisplayType {
    fn parse(value: Option<&str>) -> Result<Self, ToolError> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("view") => Ok(Self::View),
            Some("text") => Ok(Self::Text),
            Some(other) => Err(ToolError::invalid(
                "displayType",
                format!("expected view or text, got {other}"),
            )),
        }
    }
}

pub struct TodayDate {
    spec: ToolSpec,
}

impl TodayDate {
    pub fn new() -> Self {
        let spec = ToolSpec::new("getTodayDate", "Get today's date and day of the week.").param(
            ParameterSpec::optional(
                "displayType",
                ParamType::String,
                "Show the date as a card (view) or a sentence (text).",
            )
            .one_of(["view", "text"]),
        );
        Self { spec }
    }

    fn result_for<Tz: TimeZone>(now: &DateTime<Tz>, display: DisplayType) -> ToolResult
    where
        Tz::Offset: std::fmt::Display,
    {
        let formatted = now.format("%A, %B %-d, %Y").to_string();
        match display {
            DisplayType::Text => ToolResult::text(format!("Today is {formatted}.")),
            DisplayType::View => {
                let mut data = Map::new();
                data.insert("date".into(), json!(now.format("%Y-%m-%d").to_string()));
                data.insert("weekday".into(), json!(now.weekday().to_string()));
                data.insert("formatted".into(), Value::String(formatted));
                data.insert("iso".into(), json!(now.to_rfc3339()));
                ToolResult::success(ToolOutput::RichView(
                    ToolView::new("date", data).with_template("date_card"),
                ))
            }
        }
    }
}

impl Default for TodayDate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TodayDate {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: &Parameters) -> Result<ToolResult, ToolError> {
        let display = DisplayType::parse(optional_str(parameters, "displayType")?)?;
        Ok(Self::result_for(&Local::now(), display))
    }
}
