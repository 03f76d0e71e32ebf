pub(crate) mod notify;
mod report;
pub(crate) mod storage;

pub use report::{CellResult, Matrix, ReportRecord, ScoreResult};
