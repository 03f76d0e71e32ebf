use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of reading one (category, sub-period) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScoreResult {
    Percentage(u8),
    /// The cell was located but no score could be read from the page.
    NoData,
    /// The dashboard has no row for this combination.
    NotRecorded,
    ExtractionError,
}

impl ScoreResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Percentage(_))
    }
}

impl fmt::Display for ScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percentage(value) => write!(f, "{}%", value),
            Self::NoData => f.write_str("no data"),
            Self::NotRecorded => f.write_str("not recorded"),
            Self::ExtractionError => f.write_str("error"),
        }
    }
}

/// The fixed category × sub-period grid a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    categories: Vec<String>,
    sub_periods: Vec<String>,
}

impl Matrix {
    pub fn new(categories: Vec<String>, sub_periods: Vec<String>) -> Self {
        Self {
            categories,
            sub_periods,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn sub_periods(&self) -> &[String] {
        &self.sub_periods
    }

    pub fn len(&self) -> usize {
        self.categories.len() * self.sub_periods.len()
    }

    /// Cells in visiting order: sub-period first, then category.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sub_periods.iter().flat_map(move |sub_period| {
            self.categories
                .iter()
                .map(move |category| (category.as_str(), sub_period.as_str()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellResult {
    pub category: String,
    pub sub_period: String,
    pub result: ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub timestamp: Option<String>,
    pub period: String,
    cells: Vec<CellResult>,
}

impl ReportRecord {
    /// A report with every cell of the matrix present and marked as an
    /// extraction error until a real result is recorded.
    pub fn pending(period: impl Into<String>, matrix: &Matrix) -> Self {
        let cells = matrix
            .cells()
            .map(|(category, sub_period)| CellResult {
                category: category.to_string(),
                sub_period: sub_period.to_string(),
                result: ScoreResult::ExtractionError,
            })
            .collect();

        Self {
            timestamp: None,
            period: period.into(),
            cells,
        }
    }

    /// Stores the result of a cell. Returns false for a cell outside the matrix.
    pub fn record(&mut self, category: &str, sub_period: &str, result: ScoreResult) -> bool {
        match self
            .cells
            .iter_mut()
            .find(|cell| cell.category == category && cell.sub_period == sub_period)
        {
            Some(cell) => {
                cell.result = result;
                true
            }
            None => false,
        }
    }

    pub fn score(&self, category: &str, sub_period: &str) -> Option<ScoreResult> {
        self.cells
            .iter()
            .find(|cell| cell.category == category && cell.sub_period == sub_period)
            .map(|cell| cell.result)
    }

    pub fn cells(&self) -> &[CellResult] {
        &self.cells
    }

    pub fn successes(&self) -> usize {
        self.cells.iter().filter(|c| c.result.is_success()).count()
    }
}
