//! Menu-engine detection from the URL host and static HTML signals.

use serde::Serialize;

use crate::fetch::extract_domain;

/// The e-commerce platform backing a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Dutchie,
    Jane,
    Weedmaps,
    Dispense,
    Tymber,
    Generic,
}

impl Engine {
    /// Value for the `Engine` column. Blank when nothing was recognised.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Engine::Dutchie => "dutchie",
            Engine::Jane => "jane",
            Engine::Weedmaps => "weedmaps",
            Engine::Dispense => "dispense",
            Engine::Tymber => "tymber",
            Engine::Generic => "",
        }
    }

    /// Engines whose menus are rendered client-side.
    #[must_use]
    pub fn is_script_rendered(self) -> bool {
        matches!(
            self,
            Engine::Dutchie | Engine::Jane | Engine::Weedmaps | Engine::Dispense
        )
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Generic => write!(f, "generic"),
            other => write!(f, "{}", other.as_tag()),
        }
    }
}

const DUTCHIE_SIGNALS: &[&str] = &[
    "dutchie.com",
    "dtche[",
    "dtche%5b",
    "\"dtche\"",
    "window.dtche",
    "dutchie-embed",
    "dutchie_embed",
    "plus.dutchie",
    "src=\"https://dutchie",
    "src='https://dutchie",
    "dutchie/graphql",
    "menu.dutchie",
];

const JANE_SIGNALS: &[&str] = &["iheartjane.com", "jane-root", "data-jane-"];
const WEEDMAPS_SIGNALS: &[&str] = &["weedmaps.com", "wm-menu"];
const DISPENSE_SIGNALS: &[&str] = &["dispenseapp.com", "dispense.io", "\"dispenseapp\""];

/// Classifies the engine behind `url`.
///
/// Host hints win over page content. Within the HTML, Dutchie is checked
/// first because Dutchie embeds often sit on sites that also mention other
/// platforms.
#[must_use]
pub fn detect_engine(url: &str, html: &str) -> Engine {
    let host = extract_domain(url);
    if host.contains("dutchie") {
        return Engine::Dutchie;
    }
    if host.contains("iheartjane") || host.contains("jane.menu") {
        return Engine::Jane;
    }
    if host.contains("weedmaps") {
        return Engine::Weedmaps;
    }

    let lower = html.to_lowercase();
    let has_any = |signals: &[&str]| signals.iter().any(|s| lower.contains(s));

    if has_any(DUTCHIE_SIGNALS) {
        Engine::Dutchie
    } else if has_any(JANE_SIGNALS) {
        Engine::Jane
    } else if has_any(WEEDMAPS_SIGNALS) {
        Engine::Weedmaps
    } else if has_any(DISPENSE_SIGNALS) {
        Engine::Dispense
    } else if lower.contains("tymber") {
        Engine::Tymber
    } else {
        Engine::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_hint_beats_html() {
        assert_eq!(
            detect_engine("https://dutchie.com/dispensary/solar", "<div data-jane-x></div>"),
            Engine::Dutchie
        );
        assert_eq!(
            detect_engine("https://www.iheartjane.com/stores/1", ""),
            Engine::Jane
        );
        assert_eq!(
            detect_engine("https://weedmaps.com/dispensaries/nea", ""),
            Engine::Weedmaps
        );
    }

    #[test]
    fn dutchie_embed_on_marketing_site() {
        let html = r#"<script>window.dtche = {"chain":"solar"};</script>"#;
        assert_eq!(
            detect_engine("https://solarcannabis.com/menu", html),
            Engine::Dutchie
        );
    }

    #[test]
    fn dutchie_signals_win_over_dispense() {
        let html = r#"<iframe src="https://dutchie.com/embedded-menu/x"></iframe>
            <a href="https://dispenseapp.com">other</a>"#;
        assert_eq!(detect_engine("https://example.com", html), Engine::Dutchie);
    }

    #[test]
    fn dispense_and_tymber_signals() {
        assert_eq!(
            detect_engine("https://example.com", "<script src='https://dispenseapp.com/x.js'>"),
            Engine::Dispense
        );
        assert_eq!(
            detect_engine("https://example.com", "<meta name='generator' content='Tymber'>"),
            Engine::Tymber
        );
    }

    #[test]
    fn unknown_page_is_generic_with_blank_tag() {
        let engine = detect_engine("https://example.com/menu", "<html><body>menu</body></html>");
        assert_eq!(engine, Engine::Generic);
        assert_eq!(engine.as_tag(), "");
        assert_eq!(engine.to_string(), "generic");
    }
}
