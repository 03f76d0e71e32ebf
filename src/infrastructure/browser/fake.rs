//! Scripted in-memory surface for exercising navigation and extraction logic.

use super::{ElementQuery, FrameRef, Launcher, Surface};
use crate::config::{DashboardConfig, Point};
use crate::error::{Result, WatchError};
use crate::services::extraction::fold;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub kind: String,
    pub text: String,
    pub attributes: Vec<(String, String)>,
    /// Text appended to the main frame while this element is the active selection.
    pub reveals: Option<String>,
    pub hidden: bool,
}

impl FakeElement {
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
            attributes: Vec::new(),
            reveals: None,
            hidden: false,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn reveals(mut self, text: &str) -> Self {
        self.reveals = Some(text.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn in_scope(&self, scope: &str) -> bool {
        scope
            .split(',')
            .map(str::trim)
            .any(|s| s == "*" || s == self.kind)
    }

    fn matches(&self, query: &ElementQuery) -> bool {
        if self.hidden || !self.in_scope(query.scope()) {
            return false;
        }
        match query {
            ElementQuery::ExactText { text, .. } => fold(&self.text) == fold(text),
            ElementQuery::ContainsText { text, .. } => fold(&self.text).contains(&fold(text)),
            ElementQuery::Attribute {
                attributes,
                value,
                partial,
                ..
            } => self.attributes.iter().any(|(name, v)| {
                let v = fold(v);
                attributes.contains(name)
                    && !v.is_empty()
                    && if *partial {
                        v.contains(&fold(value))
                    } else {
                        v == fold(value)
                    }
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeFrame {
    pub id: String,
    pub text: String,
    pub elements: Vec<FakeElement>,
    pub unreadable: bool,
}

impl FakeFrame {
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            elements: Vec::new(),
            unreadable: false,
        }
    }

    pub fn with(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }
}

#[derive(Default)]
struct FakeState {
    frames: Vec<FakeFrame>,
    overlay: Option<String>,
    clicks: Vec<String>,
    points: Vec<Point>,
    broken_rows: Vec<String>,
    screenshots: usize,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct FakeSurface {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSurface {
    pub fn new(frames: Vec<FakeFrame>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                frames,
                ..FakeState::default()
            })),
        }
    }

    /// Candidate clicks on rows whose text contains `text` fail with an error.
    pub fn break_row(self, text: &str) -> Self {
        self.state.lock().unwrap().broken_rows.push(text.to_string());
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn points(&self) -> Vec<Point> {
        self.state.lock().unwrap().points.clone()
    }

    pub fn screenshots(&self) -> usize {
        self.state.lock().unwrap().screenshots
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn frame_index(state: &FakeState, frame: &FrameRef) -> Result<usize> {
        state
            .frames
            .iter()
            .position(|f| f.id == frame.id)
            .ok_or_else(|| WatchError::Browser(format!("frame {} detached", frame.id)))
    }
}

#[async_trait]
impl Surface for FakeSurface {
    async fn frames(&self) -> Result<Vec<FrameRef>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .frames
            .iter()
            .enumerate()
            .map(|(i, f)| FrameRef {
                id: f.id.clone(),
                main: i == 0,
            })
            .collect())
    }

    async fn inner_text(&self, frame: &FrameRef) -> Result<String> {
        let state = self.state.lock().unwrap();
        let index = Self::frame_index(&state, frame)?;
        let f = &state.frames[index];
        if f.unreadable {
            return Err(WatchError::Timeout(format!("frame {} did not answer", f.id)));
        }
        let mut text = f.text.clone();
        if index == 0 {
            if let Some(overlay) = &state.overlay {
                text.push('\n');
                text.push_str(overlay);
            }
        }
        Ok(text)
    }

    async fn click(&self, frame: &FrameRef, query: &ElementQuery) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let index = Self::frame_index(&state, frame)?;
        let hit = state.frames[index]
            .elements
            .iter()
            .find(|e| e.matches(query))
            .cloned();

        match hit {
            Some(element) => {
                state.clicks.push(format!("{}:{}", element.kind, element.text));
                if let Some(reveals) = element.reveals {
                    state.overlay = Some(reveals);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn candidate_texts(&self, frame: &FrameRef, selector: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let index = Self::frame_index(&state, frame)?;
        let f = &state.frames[index];
        if f.unreadable {
            return Err(WatchError::Timeout(format!("frame {} did not answer", f.id)));
        }
        Ok(f.elements
            .iter()
            .filter(|e| e.in_scope(selector))
            .map(|e| e.text.clone())
            .collect())
    }

    async fn click_candidate(
        &self,
        frame: &FrameRef,
        selector: &str,
        index: usize,
    ) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let frame_index = Self::frame_index(&state, frame)?;
        let element = state.frames[frame_index]
            .elements
            .iter()
            .filter(|e| e.in_scope(selector))
            .nth(index)
            .cloned();

        let Some(element) = element else {
            return Ok(false);
        };
        if state.broken_rows.iter().any(|b| element.text.contains(b)) {
            return Err(WatchError::Browser(format!(
                "element {:?} went stale",
                element.text
            )));
        }
        state.clicks.push(format!("{}:{}", element.kind, element.text));
        state.overlay = element.reveals;
        Ok(true)
    }

    async fn click_at(&self, point: Point) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.points.push(point);
        state.overlay = None;
        Ok(())
    }

    async fn screenshot(&self, _path: &Path) -> Result<()> {
        self.state.lock().unwrap().screenshots += 1;
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// Hands out the same fake surface on every open, or fails to launch.
pub struct FakeLauncher {
    pub surface: Option<FakeSurface>,
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn open(&self, _config: &DashboardConfig) -> Result<Box<dyn Surface>> {
        match &self.surface {
            Some(surface) => Ok(Box::new(surface.clone())),
            None => Err(WatchError::Browser("no browser binary".to_string())),
        }
    }
}
