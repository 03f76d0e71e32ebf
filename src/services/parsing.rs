use crate::config::Labels;
use crate::error::{Result, WatchError};
use crate::services::extraction::fold;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// No leading word boundary: after a label the value may follow with no separator.
const DATE_TIME: &str = r"(\d{1,2})\s*-\s*(\p{L}{3})\.?\s*(\d{1,2})\s*:\s*(\d{2})\b";

static BARE_DATE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b{}", DATE_TIME)).unwrap());

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)([.,]\d+)?\s*%").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Found right after its label.
    Labelled,
    /// Found as a bare date-time somewhere in the text.
    Unlabelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMatch {
    pub value: String,
    pub confidence: Confidence,
}

/// Finds the dashboard's `D-MMM H:MM` last-update marker.
pub struct TimestampParser {
    label: String,
    repair: Option<Regex>,
    labelled: Regex,
}

impl TimestampParser {
    pub fn new(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Err(WatchError::Config("timestamp label is empty".to_string()));
        }

        // The renderer sometimes detaches the label's last character ("RecordUpdat e").
        let repair = match label.char_indices().last() {
            Some((split, _)) if split > 0 => Some(
                Regex::new(&format!(
                    r"(?i){}\s+{}",
                    regex::escape(&label[..split]),
                    regex::escape(&label[split..])
                ))
                .map_err(|e| WatchError::Config(e.to_string()))?,
            ),
            _ => None,
        };

        let labelled = Regex::new(&format!(
            r"(?i){}[\s:.\-–]*{}",
            regex::escape(label),
            DATE_TIME
        ))
        .map_err(|e| WatchError::Config(e.to_string()))?;

        Ok(Self {
            label: label.to_string(),
            repair,
            labelled,
        })
    }

    pub fn parse(&self, text: &str) -> Option<TimestampMatch> {
        let text = self.repair_label(text);

        if let Some(caps) = self.labelled.captures(&text) {
            return Some(TimestampMatch {
                value: canonical(&caps),
                confidence: Confidence::Labelled,
            });
        }

        BARE_DATE_TIME.captures(&text).map(|caps| TimestampMatch {
            value: canonical(&caps),
            confidence: Confidence::Unlabelled,
        })
    }

    fn repair_label<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.repair {
            Some(repair) => repair.replace_all(text, regex::NoExpand(&self.label)),
            None => Cow::Borrowed(text),
        }
    }
}

fn canonical(caps: &regex::Captures<'_>) -> String {
    format!("{}-{} {}:{}", &caps[1], &caps[2], &caps[3], &caps[4])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    RateLabel,
    SummaryLabel,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreMatch {
    pub value: u8,
    pub source: ScoreSource,
}

/// Reads the success-rate percentage of the currently selected cell.
pub struct ScoreParser {
    rate_labels: Vec<String>,
    summary_labels: Vec<String>,
    window: usize,
}

impl ScoreParser {
    pub fn new(labels: &Labels) -> Self {
        let folded = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|l| fold(l))
                .filter(|l| !l.is_empty())
                .collect()
        };

        Self {
            rate_labels: folded(&labels.rate),
            summary_labels: folded(&labels.summary),
            window: labels.window,
        }
    }

    pub fn parse(&self, text: &str) -> Option<ScoreMatch> {
        let text = fold(text);

        if let Some(value) = self.after_labels(&text, &self.rate_labels) {
            return Some(ScoreMatch {
                value,
                source: ScoreSource::RateLabel,
            });
        }
        if let Some(value) = self.after_labels(&text, &self.summary_labels) {
            return Some(ScoreMatch {
                value,
                source: ScoreSource::SummaryLabel,
            });
        }

        // Per-criterion widgets often read 100%, so a bare 100 is never trusted here.
        let fallback = percentages(&text)
            .find(|&value| value > 0 && value < 100)
            .map(|value| ScoreMatch {
                value,
                source: ScoreSource::Fallback,
            });
        fallback
    }

    fn after_labels(&self, text: &str, labels: &[String]) -> Option<u8> {
        labels.iter().find_map(|label| {
            text.match_indices(label.as_str()).find_map(|(start, _)| {
                let rest = &text[start + label.len()..];
                let end = rest
                    .char_indices()
                    .nth(self.window)
                    .map_or(rest.len(), |(i, _)| i);
                percentages(&rest[..end]).next()
            })
        })
    }
}

/// Percent-suffixed integers of at most three digits that fall in 0..=100.
/// Fractional values are not integer percentages and are skipped whole.
fn percentages(text: &str) -> impl Iterator<Item = u8> + '_ {
    PERCENT.captures_iter(text).filter_map(|caps| {
        let digits = caps.get(1)?.as_str();
        if digits.len() > 3 || caps.get(2).is_some() {
            return None;
        }
        digits.parse::<u8>().ok().filter(|value| *value <= 100)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extraction::normalize_whitespace;

    fn timestamps() -> TimestampParser {
        TimestampParser::new("RecordUpdate").unwrap()
    }

    fn scores() -> ScoreParser {
        ScoreParser::new(&Labels {
            timestamp: "RecordUpdate".to_string(),
            rate: vec!["Tasa de éxito".to_string(), "Success rate".to_string()],
            summary: vec!["Resumen".to_string()],
            window: 300,
        })
    }

    #[test]
    fn labelled_timestamp() {
        let found = timestamps()
            .parse("Mystery Client RecordUpdate 5-Mar 10:15 Ranking")
            .unwrap();
        assert_eq!(found.value, "5-Mar 10:15");
        assert_eq!(found.confidence, Confidence::Labelled);
    }

    #[test]
    fn timestamp_spacing_is_canonicalized() {
        let found = timestamps().parse("recordupdate: 12 - Abr 9 : 05").unwrap();
        assert_eq!(found.value, "12-Abr 9:05");
    }

    #[test]
    fn detached_label_character_is_repaired() {
        let split = normalize_whitespace("Ranking\nRecordUpdat\ne\n5-Mar 10:15");
        let joined = normalize_whitespace("Ranking\nRecordUpdate 5-Mar 10:15");

        let from_split = timestamps().parse(&split).unwrap();
        let from_joined = timestamps().parse(&joined).unwrap();

        assert_eq!(from_split, from_joined);
        assert_eq!(from_split.confidence, Confidence::Labelled);
    }

    #[test]
    fn value_glued_to_label() {
        let glued = timestamps()
            .parse("Mystery Client RecordUpdate5-Mar 10:15 Ranking")
            .unwrap();
        assert_eq!(glued.value, "5-Mar 10:15");
        assert_eq!(glued.confidence, Confidence::Labelled);

        let detached = timestamps().parse("RecordUpdat e5-Mar 10:15").unwrap();
        assert_eq!(detached, glued);
    }

    #[test]
    fn bare_timestamp_needs_word_boundary() {
        assert_eq!(timestamps().parse("Lote A15-Mar 10:15"), None);
    }

    #[test]
    fn bare_timestamp_is_low_confidence() {
        let found = timestamps().parse("Actualizado 7-Set 8:30 hrs").unwrap();
        assert_eq!(found.value, "7-Set 8:30");
        assert_eq!(found.confidence, Confidence::Unlabelled);
    }

    #[test]
    fn labelled_timestamp_wins_over_earlier_bare_one() {
        let found = timestamps()
            .parse("1-Ene 0:00 something RecordUpdate 5-Mar 10:15")
            .unwrap();
        assert_eq!(found.value, "5-Mar 10:15");
    }

    #[test]
    fn no_timestamp() {
        assert_eq!(timestamps().parse("Loading... please wait"), None);
        assert_eq!(timestamps().parse("2025-Mar 10:15"), None);
    }

    #[test]
    fn rate_label_within_window() {
        let text = "Tasa de exito Visitas 12 Criterios evaluados 87%";
        assert_eq!(
            scores().parse(text),
            Some(ScoreMatch {
                value: 87,
                source: ScoreSource::RateLabel
            })
        );
    }

    #[test]
    fn rate_label_accepts_full_score() {
        let text = "Criterio A 100% TASA DE ÉXITO\n100 %";
        assert_eq!(scores().parse(text).map(|m| m.value), Some(100));
    }

    #[test]
    fn out_of_range_candidate_is_skipped() {
        let text = "Success rate 250% of target, actual 75%";
        assert_eq!(scores().parse(text).map(|m| m.value), Some(75));
    }

    #[test]
    fn summary_label_when_rate_label_missing() {
        let text = "Criterio 100% Resumen general 64%";
        assert_eq!(
            scores().parse(text),
            Some(ScoreMatch {
                value: 64,
                source: ScoreSource::SummaryLabel
            })
        );
    }

    #[test]
    fn percentage_outside_window_falls_back() {
        let text = format!("Success rate {} 42%", "x".repeat(400));
        assert_eq!(
            scores().parse(&text),
            Some(ScoreMatch {
                value: 42,
                source: ScoreSource::Fallback
            })
        );
    }

    #[test]
    fn scattered_hundreds_are_not_a_score() {
        assert_eq!(scores().parse("Limpieza 100% Atencion 100% Orden 100%"), None);
    }

    #[test]
    fn fallback_skips_zero_and_hundred() {
        let text = "Avance 0% Limpieza 100% Atencion 93%";
        assert_eq!(scores().parse(text).map(|m| m.value), Some(93));
    }

    #[test]
    fn fractional_percentages_are_skipped() {
        assert_eq!(scores().parse("Success rate 100.5%"), None);
        assert_eq!(scores().parse("Success rate 99.6%"), None);
        assert_eq!(scores().parse("Success rate 99,6% then 88%").map(|m| m.value), Some(88));
    }

    #[test]
    fn long_numbers_are_not_percentages() {
        assert_eq!(scores().parse("Success rate 1234% later nothing"), None);
    }
}
