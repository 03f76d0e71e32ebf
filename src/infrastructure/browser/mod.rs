use crate::config::{DashboardConfig, Point};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub(crate) mod chromium;
#[cfg(test)]
pub(crate) mod fake;
mod scripts;

/// One document region of the page. Frames are read and searched independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    pub id: String,
    pub main: bool,
}

/// How an element is picked among the nodes matching a CSS scope.
///
/// Text comparisons are case and diacritic insensitive and ignore whitespace runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementQuery {
    ExactText {
        scope: String,
        text: String,
    },
    ContainsText {
        scope: String,
        text: String,
    },
    Attribute {
        scope: String,
        attributes: Vec<String>,
        value: String,
        partial: bool,
    },
}

impl ElementQuery {
    pub fn exact(scope: &str, text: &str) -> Self {
        Self::ExactText {
            scope: scope.to_string(),
            text: text.to_string(),
        }
    }

    pub fn contains(scope: &str, text: &str) -> Self {
        Self::ContainsText {
            scope: scope.to_string(),
            text: text.to_string(),
        }
    }

    pub fn labelled(scope: &str, value: &str) -> Self {
        Self::Attribute {
            scope: scope.to_string(),
            attributes: vec!["title".to_string(), "aria-label".to_string()],
            value: value.to_string(),
            partial: false,
        }
    }

    pub fn scope(&self) -> &str {
        match self {
            Self::ExactText { scope, .. }
            | Self::ContainsText { scope, .. }
            | Self::Attribute { scope, .. } => scope,
        }
    }
}

/// The automation surface the dashboard is driven through.
///
/// Every call is a single round trip; callers bound them with their own timeouts.
#[async_trait]
pub trait Surface: Send + Sync {
    async fn frames(&self) -> Result<Vec<FrameRef>>;

    async fn inner_text(&self, frame: &FrameRef) -> Result<String>;

    /// Clicks the first visible element matching `query`. `Ok(false)` when none matched.
    async fn click(&self, frame: &FrameRef, query: &ElementQuery) -> Result<bool>;

    /// Flattened text of every node matching `selector`, in document order.
    async fn candidate_texts(&self, frame: &FrameRef, selector: &str) -> Result<Vec<String>>;

    async fn click_candidate(&self, frame: &FrameRef, selector: &str, index: usize)
        -> Result<bool>;

    async fn click_at(&self, point: Point) -> Result<()>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn close(&self);
}

/// Opens a surface already navigated to the dashboard.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn open(&self, config: &DashboardConfig) -> Result<Box<dyn Surface>>;
}

/// Tries `query` in every frame until one click lands or `timeout` elapses.
/// At least one pass is always made. Lookup errors count as "not found".
pub async fn click_in_any_frame(
    surface: &dyn Surface,
    query: &ElementQuery,
    timeout: Duration,
    step: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;

    loop {
        let frames = match surface.frames().await {
            Ok(frames) => frames,
            Err(e) => {
                debug!("Listing frames failed: {}", e);
                Vec::new()
            }
        };

        for frame in &frames {
            match tokio::time::timeout(timeout.max(step), surface.click(frame, query)).await {
                Ok(Ok(true)) => return true,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => debug!("Click {:?} in frame {} failed: {}", query, frame.id, e),
                Err(_) => debug!("Click {:?} in frame {} timed out", query, frame.id),
            }
        }

        if Instant::now() >= deadline {
            return false;
        }
        sleep(step).await;
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeElement, FakeFrame, FakeSurface};
    use super::*;

    #[tokio::test]
    async fn click_searches_every_frame() {
        let surface = FakeSurface::new(vec![
            FakeFrame::new("main", "Landing"),
            FakeFrame::new("report", "Dashboard")
                .with(FakeElement::new("button", "Aceptar todo")),
        ]);

        let hit = click_in_any_frame(
            &surface,
            &ElementQuery::contains("button", "aceptar"),
            Duration::ZERO,
            Duration::from_millis(1),
        )
        .await;

        assert!(hit);
        assert_eq!(surface.clicks(), vec!["button:Aceptar todo".to_string()]);
    }

    #[tokio::test]
    async fn missing_element_is_not_an_error() {
        let surface = FakeSurface::new(vec![FakeFrame::new("main", "Landing")]);

        let hit = click_in_any_frame(
            &surface,
            &ElementQuery::exact("button", "Accept"),
            Duration::from_millis(5),
            Duration::from_millis(1),
        )
        .await;

        assert!(!hit);
        assert!(surface.clicks().is_empty());
    }
}
