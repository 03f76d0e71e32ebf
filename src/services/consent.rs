use crate::config::{Selectors, Timing};
use crate::infrastructure::{click_in_any_frame, ElementQuery, Surface};
use tokio::time::sleep;
use tracing::{debug, info};

/// Consent predicates in the order they are tried: button labels first, then
/// elements whose id or class mentions the given keywords.
pub fn consent_queries(selectors: &Selectors) -> Vec<ElementQuery> {
    let labels = selectors
        .consent_labels
        .iter()
        .map(|label| ElementQuery::exact(&selectors.consent_scope, label));

    let attributes = selectors
        .consent_attributes
        .iter()
        .map(|keyword| ElementQuery::Attribute {
            scope: "*".to_string(),
            attributes: vec!["id".to_string(), "class".to_string()],
            value: keyword.clone(),
            partial: true,
        });

    labels.chain(attributes).collect()
}

/// Clicks away cookie and consent overlays. Never fails; returns how many
/// predicates produced a click.
pub async fn dismiss_consent(surface: &dyn Surface, selectors: &Selectors, timing: &Timing) -> usize {
    let mut clicked = 0;

    for query in consent_queries(selectors) {
        if click_in_any_frame(surface, &query, timing.element_timeout(), timing.poll_step()).await
        {
            info!("Dismissed overlay via {:?}", query);
            clicked += 1;
            sleep(timing.consent_pause()).await;
        }
    }

    if clicked == 0 {
        debug!("No consent overlay found");
    }
    clicked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_dashboard;
    use crate::infrastructure::browser::fake::{FakeElement, FakeFrame, FakeSurface};

    #[test]
    fn labels_are_tried_before_attributes() {
        let config = test_dashboard();
        let queries = consent_queries(&config.selectors);

        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], ElementQuery::exact("button", "Accept"));
        assert!(matches!(queries[2], ElementQuery::Attribute { partial: true, .. }));
    }

    #[tokio::test]
    async fn clicks_localized_button() {
        let config = test_dashboard();
        let surface = FakeSurface::new(vec![
            FakeFrame::new("main", "Cookies").with(FakeElement::new("button", "Aceptar"))
        ]);

        let clicked = dismiss_consent(&surface, &config.selectors, &config.timing).await;

        assert_eq!(clicked, 1);
        assert_eq!(surface.clicks(), vec!["button:Aceptar".to_string()]);
    }

    #[tokio::test]
    async fn attribute_predicate_matches_banner() {
        let config = test_dashboard();
        let surface = FakeSurface::new(vec![FakeFrame::new("main", "Cookies")
            .with(FakeElement::new("div", "Got it").attr("class", "cookie-consent-close"))]);

        assert_eq!(
            dismiss_consent(&surface, &config.selectors, &config.timing).await,
            1
        );
    }

    #[tokio::test]
    async fn hidden_buttons_are_ignored() {
        let config = test_dashboard();
        let surface = FakeSurface::new(vec![FakeFrame::new("main", "Cookies")
            .with(FakeElement::new("button", "Accept").hidden())
            .with(FakeElement::new("button", "Aceptar"))]);

        assert_eq!(
            dismiss_consent(&surface, &config.selectors, &config.timing).await,
            1
        );
        assert_eq!(surface.clicks(), vec!["button:Aceptar".to_string()]);
    }

    #[tokio::test]
    async fn nothing_to_dismiss() {
        let config = test_dashboard();
        let surface = FakeSurface::new(vec![FakeFrame::new("main", "Dashboard")]);

        assert_eq!(
            dismiss_consent(&surface, &config.selectors, &config.timing).await,
            0
        );
        assert!(surface.clicks().is_empty());
    }
}
