// Static JSON fixtures shared with the frontend and admin tooling.
//
// The files are embedded at compile time and can be overridden at runtime by
// pointing FIXTURES_DIR at a directory holding files with the same names.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::entities::gdpr::GdprRequestType;
use crate::entities::notification::{NotificationPriority, NotificationType};
use crate::entities::report::{ReportSection, ReportType};

const REPORTS_FILE: &str = "reports.json";
const INSIGHTS_FILE: &str = "insights.json";
const NOTIFICATION_TEMPLATES_FILE: &str = "notification_templates.json";
const GDPR_REQUESTS_FILE: &str = "gdpr_requests.json";

const EMBEDDED_REPORTS: &str = include_str!("../../fixtures/reports.json");
const EMBEDDED_INSIGHTS: &str = include_str!("../../fixtures/insights.json");
const EMBEDDED_NOTIFICATION_TEMPLATES: &str = include_str!("../../fixtures/notification_templates.json");
const EMBEDDED_GDPR_REQUESTS: &str = include_str!("../../fixtures/gdpr_requests.json");

/// Deadline used when a request type has no policy entry
pub const DEFAULT_GDPR_DEADLINE_DAYS: i64 = 30;

/// Fixture loading errors
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Cannot read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Title and section layout of a report type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportTemplate {
    pub report_type: ReportType,
    pub title: String,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightOperator {
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Rule that turns a metric value into a user-facing insight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightRule {
    pub id: String,
    pub metric: String,
    pub operator: InsightOperator,
    pub threshold: f64,
    pub title: String,
    /// May contain a `{value}` placeholder
    pub message: String,
}

impl InsightRule {
    pub fn matches(&self, value: f64) -> bool {
        match self.operator {
            InsightOperator::Lt => value < self.threshold,
            InsightOperator::Lte => value <= self.threshold,
            InsightOperator::Gt => value > self.threshold,
            InsightOperator::Gte => value >= self.threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationTemplate {
    pub key: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
}

impl NotificationTemplate {
    /// Render title and message
    pub fn render(&self, vars: &HashMap<String, String>) -> (String, String) {
        (fill_template(&self.title, vars), fill_template(&self.message, vars))
    }
}

/// Legal basis and response deadline of a GDPR request type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GdprPolicy {
    pub request_type: GdprRequestType,
    pub article: String,
    pub description: String,
    pub deadline_days: i64,
}

/// All fixtures, loaded once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixtures {
    pub reports: Vec<ReportTemplate>,
    pub insights: Vec<InsightRule>,
    pub notification_templates: Vec<NotificationTemplate>,
    pub gdpr_policies: Vec<GdprPolicy>,
}

static SHARED: Lazy<Arc<Fixtures>> = Lazy::new(|| Arc::new(Fixtures::from_env()));

fn parse<T: DeserializeOwned>(name: &str, text: &str) -> Result<T, FixtureError> {
    serde_json::from_str(text).map_err(|source| FixtureError::Parse {
        name: name.to_string(),
        source,
    })
}

fn read_file<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, FixtureError> {
    let path = dir.join(name);
    let text = std::fs::read_to_string(&path).map_err(|source| FixtureError::Io { path, source })?;
    parse(name, &text)
}

impl Fixtures {
    /// Fixtures compiled into the binary
    pub fn embedded() -> Result<Self, FixtureError> {
        Ok(Self {
            reports: parse(REPORTS_FILE, EMBEDDED_REPORTS)?,
            insights: parse(INSIGHTS_FILE, EMBEDDED_INSIGHTS)?,
            notification_templates: parse(NOTIFICATION_TEMPLATES_FILE, EMBEDDED_NOTIFICATION_TEMPLATES)?,
            gdpr_policies: parse(GDPR_REQUESTS_FILE, EMBEDDED_GDPR_REQUESTS)?,
        })
    }

    /// Fixtures read from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Self, FixtureError> {
        Ok(Self {
            reports: read_file(dir, REPORTS_FILE)?,
            insights: read_file(dir, INSIGHTS_FILE)?,
            notification_templates: read_file(dir, NOTIFICATION_TEMPLATES_FILE)?,
            gdpr_policies: read_file(dir, GDPR_REQUESTS_FILE)?,
        })
    }

    /// Load from FIXTURES_DIR when set, otherwise use the embedded copies.
    /// Never fails: broken fixtures degrade to empty tables.
    pub fn from_env() -> Self {
        if let Ok(dir) = env::var("FIXTURES_DIR") {
            match Self::load_from_dir(Path::new(&dir)) {
                Ok(fixtures) => {
                    info!("Loaded fixtures from {}", dir);
                    return fixtures;
                },
                Err(e) => warn!("Falling back to embedded fixtures: {}", e),
            }
        }

        match Self::embedded() {
            Ok(fixtures) => fixtures,
            Err(e) => {
                error!("Embedded fixtures are invalid: {}", e);
                Self::default()
            }
        }
    }

    /// Process-wide fixtures
    pub fn shared() -> Arc<Fixtures> {
        SHARED.clone()
    }

    pub fn report_template(&self, report_type: ReportType) -> Option<&ReportTemplate> {
        self.reports.iter().find(|t| t.report_type == report_type)
    }

    pub fn notification_template(&self, key: &str) -> Option<&NotificationTemplate> {
        self.notification_templates.iter().find(|t| t.key == key)
    }

    pub fn gdpr_policy(&self, request_type: GdprRequestType) -> Option<&GdprPolicy> {
        self.gdpr_policies.iter().find(|p| p.request_type == request_type)
    }

    pub fn gdpr_deadline_days(&self, request_type: GdprRequestType) -> i64 {
        self.gdpr_policy(request_type)
            .map(|p| p.deadline_days)
            .unwrap_or(DEFAULT_GDPR_DEADLINE_DAYS)
    }
}

/// Replace `{name}` placeholders. Unknown placeholders are kept verbatim.
pub fn fill_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.get(key) {
                    Some(value) => output.push_str(value),
                    None => {
                        output.push('{');
                        output.push_str(key);
                        output.push('}');
                    }
                }
                rest = &after[close + 1..];
            },
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

/// Build a placeholder map from pairs
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
