use crate::error::{Result, WatchError};
use crate::infrastructure::{FrameRef, Surface};
use crate::services::extraction::fold;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// The row that was clicked for a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHit {
    pub frame: FrameRef,
    pub selector: String,
    pub index: usize,
    pub text: String,
}

pub struct RowLocator<'a> {
    surface: &'a dyn Surface,
    selectors: &'a [String],
    timeout: Duration,
}

impl<'a> RowLocator<'a> {
    pub fn new(surface: &'a dyn Surface, selectors: &'a [String], timeout: Duration) -> Self {
        Self {
            surface,
            selectors,
            timeout,
        }
    }

    /// Finds and clicks the first row mentioning both labels.
    ///
    /// `Ok(None)` means the dashboard holds no row for the pair. An error means
    /// the lookup itself failed somewhere and the answer is unknown.
    pub async fn locate(&self, category: &str, sub_period: &str) -> Result<Option<RowHit>> {
        let category = fold(category);
        let sub_period = fold(sub_period);
        let frames = self.surface.frames().await?;
        let mut lookup_error = None;

        for frame in &frames {
            for selector in self.selectors {
                let texts = match timeout(
                    self.timeout,
                    self.surface.candidate_texts(frame, selector),
                )
                .await
                {
                    Ok(Ok(texts)) => texts,
                    Ok(Err(e)) => {
                        debug!("Reading {:?} in frame {} failed: {}", selector, frame.id, e);
                        lookup_error.get_or_insert(e);
                        continue;
                    }
                    Err(_) => {
                        lookup_error.get_or_insert(WatchError::Timeout(format!(
                            "reading {:?} in frame {}",
                            selector, frame.id
                        )));
                        continue;
                    }
                };

                let Some(index) = texts.iter().position(|text| {
                    let text = fold(text);
                    contains_phrase(&text, &category) && contains_phrase(&text, &sub_period)
                }) else {
                    continue;
                };

                let clicked = timeout(
                    self.timeout,
                    self.surface.click_candidate(frame, selector, index),
                )
                .await
                .map_err(|_| WatchError::Timeout(format!("clicking row {}", index)))??;
                if !clicked {
                    return Err(WatchError::Browser(format!(
                        "row {} vanished before it could be clicked",
                        index
                    )));
                }

                return Ok(Some(RowHit {
                    frame: frame.clone(),
                    selector: selector.clone(),
                    index,
                    text: texts[index].clone(),
                }));
            }
        }

        match lookup_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// Substring match that does not split words or numbers ("visita 1" is not in "visita 10").
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
