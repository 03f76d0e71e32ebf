use crate::error::Result;

/// Durable home of the last notified RecordUpdate value.
///
/// An empty string means nothing was ever recorded; implementations must not
/// treat a missing backing location as an error.
pub trait StateStore: Send + Sync {
    fn read_last(&self) -> Result<String>;
    fn write_last(&self, value: &str) -> Result<()>;
}
