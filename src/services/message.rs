use crate::domain::ReportRecord;
use crate::services::policy::Decision;
use std::fmt::Write;

/// Inputs of one notification besides the decision itself.
pub struct MessageContext<'a> {
    pub label: &'a str,
    pub previous: &'a str,
    pub link: &'a str,
}

/// Renders the Markdown body for a decision. `Skip` renders nothing.
pub fn compose(decision: Decision, report: &ReportRecord, ctx: &MessageContext<'_>) -> Option<String> {
    let title = match decision {
        Decision::Skip => return None,
        Decision::NotifyExtractionFailure => "⚠️ *Dashboard check failed*",
        Decision::NotifyChange {
            is_first_observation: true,
        } => "🆕 *First record detected*",
        Decision::NotifyChange {
            is_first_observation: false,
        } => "🔴 *Dashboard scores changed!*",
        Decision::NotifyManualNoChange => "✅ *Manual dashboard check*",
    };

    let mut body = format!("{}\n\n", title);

    match (&report.timestamp, decision) {
        (None, _) => {
            let _ = writeln!(body, "Could not read {} this time.", ctx.label);
            let _ = writeln!(body, "The page may have been slow to load; retrying on the next poll.");
        }
        (Some(current), Decision::NotifyManualNoChange) => {
            let _ = writeln!(body, "📊 {}: `{}`", ctx.label, current);
            let _ = writeln!(body, "📌 No change since the last check.");
        }
        (Some(current), _) => {
            let _ = writeln!(body, "📊 {}: `{}`", ctx.label, current);
            if !ctx.previous.is_empty() {
                let _ = writeln!(body, "📌 Previous: `{}`", ctx.previous);
            }
        }
    }

    if report.timestamp.is_some() {
        let _ = writeln!(body, "\n*{}*", report.period);
        for cell in report.cells() {
            let _ = writeln!(body, "• {} / {}: {}", cell.category, cell.sub_period, cell.result);
        }
    }

    let _ = write!(body, "\n[Open dashboard]({})", ctx.link);
    Some(body)
}
