use crate::infrastructure::Surface;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

const PREVIEW_CHARS: usize = 3000;

/// Collapses every whitespace run, line breaks included, to a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Lowercases, strips diacritics and normalizes whitespace so labels compare
/// the way a human reads them.
pub fn fold(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect();
    normalize_whitespace(&stripped.to_lowercase())
}

/// Visible text of every frame that answered, at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub text: String,
    pub frames_read: usize,
    pub frames_skipped: usize,
}

pub struct TextExtractor<'a> {
    surface: &'a dyn Surface,
    frame_timeout: Duration,
}

impl<'a> TextExtractor<'a> {
    pub fn new(surface: &'a dyn Surface, frame_timeout: Duration) -> Self {
        Self {
            surface,
            frame_timeout,
        }
    }

    /// Reads every frame body once. Frames that fail or time out are left out.
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let frames = match self.surface.frames().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Could not list frames: {}", e);
                return DashboardSnapshot::default();
            }
        };

        let mut raw = String::new();
        let mut snapshot = DashboardSnapshot::default();
        for frame in &frames {
            match timeout(self.frame_timeout, self.surface.inner_text(frame)).await {
                Ok(Ok(text)) => {
                    raw.push_str(&text);
                    raw.push('\n');
                    snapshot.frames_read += 1;
                }
                Ok(Err(e)) => {
                    debug!("Skipping frame {}: {}", frame.id, e);
                    snapshot.frames_skipped += 1;
                }
                Err(_) => {
                    debug!("Skipping frame {}: read timed out", frame.id);
                    snapshot.frames_skipped += 1;
                }
            }
        }

        snapshot.text = normalize_whitespace(&raw);
        debug!(
            "Extracted {} chars from {} frames ({} skipped): {}",
            snapshot.text.len(),
            snapshot.frames_read,
            snapshot.frames_skipped,
            snapshot.text.chars().take(PREVIEW_CHARS).collect::<String>()
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::fake::{FakeFrame, FakeSurface};

    #[test]
    fn whitespace_and_line_breaks_collapse() {
        assert_eq!(
            normalize_whitespace("RecordUpdate\n\n  5-Mar\t10:15 \r\n"),
            "RecordUpdate 5-Mar 10:15"
        );
    }

    #[test]
    fn fold_ignores_case_and_accents() {
        assert_eq!(fold("  Tasa de  ÉXITO\n"), "tasa de exito");
        assert_eq!(fold("Visita 1"), fold("visita\n1"));
    }

    #[tokio::test]
    async fn unreadable_frames_are_omitted() {
        let surface = FakeSurface::new(vec![
            FakeFrame::new("main", "Header\nRecordUpdate"),
            FakeFrame::new("ads", "ignored").unreadable(),
            FakeFrame::new("report", "5-Mar 10:15"),
        ]);

        let snapshot = TextExtractor::new(&surface, Duration::from_millis(50))
            .snapshot()
            .await;

        assert_eq!(snapshot.text, "Header RecordUpdate 5-Mar 10:15");
        assert_eq!(snapshot.frames_read, 2);
        assert_eq!(snapshot.frames_skipped, 1);
    }
}
