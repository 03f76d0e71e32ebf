use crate::config::{FilterSpec, Point, Selectors, Timing};
use crate::infrastructure::{click_in_any_frame, ElementQuery, Surface};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// The "select all" control may act as a toggle, so it is pressed twice.
const DESELECT_PASSES: usize = 2;

/// One option to pick in one slicer.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTarget {
    pub label: String,
    pub option: String,
    pub fallback: Option<Point>,
}

impl FilterTarget {
    pub fn new(spec: &FilterSpec, option: &str) -> Self {
        Self {
            label: spec.title.clone(),
            option: option.to_string(),
            fallback: spec.fallback_points.get(option).copied(),
        }
    }

    /// Resolution strategies, most robust first.
    pub fn strategies(&self) -> Vec<OptionStrategy> {
        let mut strategies = vec![
            OptionStrategy::ExactText,
            OptionStrategy::ContainsText,
            OptionStrategy::Attribute,
        ];
        if let Some(point) = self.fallback {
            strategies.push(OptionStrategy::Coordinates(point));
        }
        strategies
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionStrategy {
    ExactText,
    ContainsText,
    Attribute,
    /// Screen position of the option. Positions drift whenever the rendered
    /// content changes, so a hit here may be the wrong option.
    Coordinates(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    Closed,
    Open,
    Cleared,
    Selected,
}

pub struct FilterNavigator<'a> {
    surface: &'a dyn Surface,
    selectors: &'a Selectors,
    timing: &'a Timing,
}

impl<'a> FilterNavigator<'a> {
    pub fn new(surface: &'a dyn Surface, selectors: &'a Selectors, timing: &'a Timing) -> Self {
        Self {
            surface,
            selectors,
            timing,
        }
    }

    /// Drives the slicer through open, clear, select and close. Returns
    /// whether the option was picked; the page is left as-is otherwise.
    pub async fn select(&self, target: &FilterTarget) -> bool {
        self.select_with(target).await.is_some()
    }

    pub async fn select_with(&self, target: &FilterTarget) -> Option<OptionStrategy> {
        let mut state = FilterState::Closed;

        if !self.toggle(&target.label).await {
            warn!(
                "Filter {:?} not found, leaving it {:?}",
                target.label, state
            );
            return None;
        }
        state = FilterState::Open;

        for _ in 0..DESELECT_PASSES {
            if self.deselect_all().await {
                state = FilterState::Cleared;
            }
        }

        let chosen = self.choose(target).await;
        match chosen {
            Some(strategy) => {
                state = FilterState::Selected;
                info!(
                    "Selected {:?} in filter {:?} via {:?}",
                    target.option, target.label, strategy
                );
            }
            None => warn!(
                "Option {:?} not found in filter {:?} (state {:?})",
                target.option, target.label, state
            ),
        }

        if self.toggle(&target.label).await {
            debug!("Closed filter {:?} from {:?}", target.label, state);
        } else {
            warn!("Could not close filter {:?}", target.label);
        }

        // Nothing signals the end of the re-render.
        sleep(self.timing.settle_delay()).await;
        chosen
    }

    async fn toggle(&self, title: &str) -> bool {
        let scope = &self.selectors.header;
        self.click_first(&[
            ElementQuery::exact(scope, title),
            ElementQuery::contains(scope, title),
            ElementQuery::labelled(scope, title),
        ])
        .await
    }

    async fn deselect_all(&self) -> bool {
        let queries: Vec<ElementQuery> = self
            .selectors
            .deselect_labels
            .iter()
            .map(|label| ElementQuery::exact(&self.selectors.option, label))
            .collect();
        self.click_first(&queries).await
    }

    async fn choose(&self, target: &FilterTarget) -> Option<OptionStrategy> {
        let scope = &self.selectors.option;

        for strategy in target.strategies() {
            let hit = match strategy {
                OptionStrategy::ExactText => {
                    self.click_first(&[ElementQuery::exact(scope, &target.option)])
                        .await
                }
                OptionStrategy::ContainsText => {
                    self.click_first(&[ElementQuery::contains(scope, &target.option)])
                        .await
                }
                OptionStrategy::Attribute => {
                    self.click_first(&[ElementQuery::labelled(scope, &target.option)])
                        .await
                }
                OptionStrategy::Coordinates(point) => {
                    warn!(
                        "Falling back to fixed coordinates ({}, {}) for {:?}; the click may hit another option",
                        point.x, point.y, target.option
                    );
                    match self.surface.click_at(point).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Coordinate click failed: {}", e);
                            false
                        }
                    }
                }
            };
            if hit {
                return Some(strategy);
            }
        }
        None
    }

    async fn click_first(&self, queries: &[ElementQuery]) -> bool {
        for query in queries {
            if click_in_any_frame(
                self.surface,
                query,
                self.timing.element_timeout(),
                self.timing.poll_step(),
            )
            .await
            {
                return true;
            }
        }
        false
    }
}
