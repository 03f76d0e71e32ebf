use crate::config::cli::Args;
use crate::domain::Matrix;
use crate::error::{Result, WatchError};
use clap::Parser;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// One slicer on the dashboard, identified by the title rendered in its header.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSpec {
    pub title: String,
    /// Last-resort click positions keyed by option value. Only used after every
    /// text and attribute strategy failed.
    #[serde(default)]
    pub fallback_points: BTreeMap<String, Point>,
}

impl FilterSpec {
    fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            fallback_points: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Filters {
    pub period: FilterSpec,
    pub owner: FilterSpec,
    pub sub_period: FilterSpec,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            period: FilterSpec::titled("Mes"),
            owner: FilterSpec::titled("Propietario"),
            sub_period: FilterSpec::titled("Visita"),
        }
    }
}

/// CSS scopes the element queries run against.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub header: String,
    pub option: String,
    pub deselect_labels: Vec<String>,
    pub rows: Vec<String>,
    pub consent_scope: String,
    pub consent_labels: Vec<String>,
    pub consent_attributes: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            header: ".slicer-header, .slicer-dropdown-menu, [role='combobox'], .visualTitle"
                .to_string(),
            option: ".slicerItemContainer, [role='option'], [role='menuitemcheckbox'], .slicerText"
                .to_string(),
            deselect_labels: vec!["Seleccionar todo".to_string(), "Select all".to_string()],
            rows: vec![
                "[role='row']".to_string(),
                "tr".to_string(),
                "[role='listitem']".to_string(),
                ".row".to_string(),
            ],
            consent_scope: "button, a[role='button'], div[role='button']".to_string(),
            consent_labels: ["Accept", "Aceptar", "I accept", "Continue", "OK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            consent_attributes: vec!["accept".to_string(), "consent".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub timestamp: String,
    pub rate: Vec<String>,
    pub summary: Vec<String>,
    /// Characters scanned after a label when looking for its percentage.
    pub window: usize,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            timestamp: "RecordUpdate".to_string(),
            rate: vec!["Tasa de exito".to_string(), "Success rate".to_string()],
            summary: vec!["Resumen".to_string(), "Summary".to_string()],
            window: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub navigation_timeout_secs: u64,
    pub initial_render_secs: u64,
    pub settle_delay_ms: u64,
    pub element_timeout_ms: u64,
    pub frame_read_timeout_ms: u64,
    pub consent_pause_ms: u64,
    pub poll_step_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: 90,
            initial_render_secs: 45,
            settle_delay_ms: 4000,
            element_timeout_ms: 2000,
            frame_read_timeout_ms: 5000,
            consent_pause_ms: 2000,
            poll_step_ms: 250,
        }
    }
}

impl Timing {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn initial_render(&self) -> Duration {
        Duration::from_secs(self.initial_render_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn frame_read_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_read_timeout_ms)
    }

    pub fn consent_pause(&self) -> Duration {
        Duration::from_millis(self.consent_pause_ms)
    }

    pub fn poll_step(&self) -> Duration {
        Duration::from_millis(self.poll_step_ms.max(1))
    }
}

/// When the last seen timestamp gets written after a change was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Advance the state as soon as the decision is made, even if the message
    /// could not be delivered. Favours no duplicate alerts.
    #[default]
    AfterDecision,
    /// Only advance the state once the transport confirmed delivery. The next
    /// poll re-alerts after a failed send.
    AfterDelivery,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub url: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_utc_offset")]
    pub home_utc_offset_hours: i32,
    #[serde(default = "default_month_labels")]
    pub month_labels: Vec<String>,
    #[serde(default)]
    pub owner: Option<String>,
    pub categories: Vec<String>,
    pub sub_periods: Vec<String>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub neutral_click: Option<Point>,
    #[serde(default)]
    pub report_link: Option<String>,
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,
    #[serde(default)]
    pub persist_mode: PersistMode,
}

fn default_locale() -> String {
    "es-PE".to_string()
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

fn default_utc_offset() -> i32 {
    -5
}

fn default_month_labels() -> Vec<String> {
    [
        "Enero",
        "Febrero",
        "Marzo",
        "Abril",
        "Mayo",
        "Junio",
        "Julio",
        "Agosto",
        "Septiembre",
        "Octubre",
        "Noviembre",
        "Diciembre",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(WatchError::Config("url must not be empty".to_string()));
        }
        if self.categories.is_empty() || self.sub_periods.is_empty() {
            return Err(WatchError::Config(
                "categories and sub_periods must both be non-empty".to_string(),
            ));
        }
        if self.month_labels.len() != 12 {
            return Err(WatchError::Config(format!(
                "month_labels needs 12 entries, got {}",
                self.month_labels.len()
            )));
        }
        if !(-12..=14).contains(&self.home_utc_offset_hours) {
            return Err(WatchError::Config(format!(
                "home_utc_offset_hours out of range: {}",
                self.home_utc_offset_hours
            )));
        }
        Ok(())
    }

    pub fn matrix(&self) -> Matrix {
        Matrix::new(self.categories.clone(), self.sub_periods.clone())
    }

    /// Link appended to every message; the dashboard itself unless overridden.
    pub fn link(&self) -> &str {
        self.report_link.as_deref().unwrap_or(&self.url)
    }
}

pub struct Config {
    pub args: Args,
    pub dashboard: DashboardConfig,
    pub http_client: Client,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let dashboard = DashboardConfig::load(&args.config_file)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(dashboard.user_agent.as_str())
            .build()?;

        Ok(Self {
            args,
            dashboard,
            http_client,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.args.state_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if let Some(dir) = &self.dashboard.screenshot_dir {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        info!("State and screenshot dirs exist");
        Ok(())
    }
}

/// Minimal dashboard config with every delay zeroed.
#[cfg(test)]
pub(crate) fn test_dashboard() -> DashboardConfig {
    let mut config: DashboardConfig = serde_json::from_value(serde_json::json!({
        "url": "https://dashboard.example/view",
        "categories": ["Lima Norte", "Arequipa"],
        "sub_periods": ["Visita 1", "Visita 2"],
        "owner": "Grupo Sur",
        "selectors": {
            "header": "header",
            "option": "option",
            "deselect_labels": ["Select all"],
            "rows": ["row"],
            "consent_scope": "button",
            "consent_labels": ["Accept", "Aceptar"],
            "consent_attributes": ["consent"]
        },
        "labels": {
            "timestamp": "RecordUpdate",
            "rate": ["Success rate"],
            "summary": ["Summary"],
            "window": 300
        }
    }))
    .unwrap();
    config.timing = Timing {
        navigation_timeout_secs: 0,
        initial_render_secs: 0,
        settle_delay_ms: 0,
        element_timeout_ms: 0,
        frame_read_timeout_ms: 50,
        consent_pause_ms: 0,
        poll_step_ms: 1,
    };
    config.neutral_click = Some(Point { x: 5.0, y: 5.0 });
    config
}
