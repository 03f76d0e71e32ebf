use crate::error::{Result, WatchError};
use chrono::{DateTime, Datelike, FixedOffset, Utc};

/// Month label of `now` as seen in the dashboard's home timezone.
pub fn current_period(now: DateTime<Utc>, utc_offset_hours: i32, months: &[String]) -> Result<String> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
        WatchError::Config(format!("invalid UTC offset: {}h", utc_offset_hours))
    })?;
    let local = now.with_timezone(&offset);

    months
        .get(local.month0() as usize)
        .cloned()
        .ok_or_else(|| WatchError::Config(format!("no label for month {}", local.month())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn months() -> Vec<String> {
        ["Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Set", "Oct", "Nov", "Dic"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn offset_moves_month_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 3, 0, 0).unwrap();

        assert_eq!(current_period(now, -5, &months()).unwrap(), "Mar");
        assert_eq!(current_period(now, 0, &months()).unwrap(), "Abr");
    }

    #[test]
    fn short_month_list_is_an_error() {
        let now = Utc.with_ymd_and_hms(2026, 12, 15, 12, 0, 0).unwrap();
        assert!(current_period(now, -5, &months()[..6]).is_err());
    }
}
