//! Scan requests as issued by the front end.

use serde::{Deserialize, Serialize};
use url::Url;

/// Which menu a scan targets. Dispensaries frequently run separate medical and
/// adult-use menus with different prices for the same product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    Med,
    Rec,
    #[default]
    Unspecified,
}

impl MenuType {
    /// The value written to the `Menu_Type` column. Blank when unspecified.
    #[must_use]
    pub fn as_column(self) -> &'static str {
        match self {
            MenuType::Med => "med",
            MenuType::Rec => "rec",
            MenuType::Unspecified => "",
        }
    }

    /// Infers the menu type from the words of a URL's path.
    ///
    /// Path segments are split on non-alphanumeric characters. `med` or
    /// `medical` means medical; `rec`, `recreational` or `adult` means
    /// adult-use. The host and query never count, and a word only matches
    /// whole (`recommended` is not `rec`). Both kinds of word, or neither,
    /// yield [`MenuType::Unspecified`].
    #[must_use]
    pub fn infer_from_url(url: &str) -> MenuType {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return MenuType::Unspecified;
        };
        let path = parsed.path().to_lowercase();
        let words: Vec<&str> = path
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let med = words.iter().any(|w| matches!(*w, "med" | "medical"));
        let rec = words
            .iter()
            .any(|w| matches!(*w, "rec" | "recreational" | "adult"));
        match (med, rec) {
            (true, false) => MenuType::Med,
            (false, true) => MenuType::Rec,
            _ => MenuType::Unspecified,
        }
    }
}

impl std::fmt::Display for MenuType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuType::Med => write!(f, "med"),
            MenuType::Rec => write!(f, "rec"),
            MenuType::Unspecified => write!(f, "unspecified"),
        }
    }
}

impl std::str::FromStr for MenuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "med" | "medical" => Ok(MenuType::Med),
            "rec" | "recreational" | "adult-use" | "adult" => Ok(MenuType::Rec),
            "" | "unspecified" | "auto" => Ok(MenuType::Unspecified),
            other => Err(format!("unknown menu type \"{other}\"")),
        }
    }
}

/// One scan of one menu URL. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Label written to the `Dispensary` column.
    pub dispensary_label: String,
    pub url: String,
    pub menu_type: MenuType,
    /// Allows the GraphQL browser crawl stage.
    pub browser_mode_enabled: bool,
    /// Runs the browser crawl even when structured data already produced rows.
    #[serde(default)]
    pub force_browser: bool,
    pub debug_enabled: bool,
}

impl ScanRequest {
    /// Creates a request with browser mode on and debug off.
    ///
    /// An empty label falls back to the URL, matching what the table shows
    /// when the operator leaves the label blank.
    #[must_use]
    pub fn new(dispensary_label: &str, url: &str, menu_type: MenuType) -> Self {
        let url = url.trim().to_string();
        let label = dispensary_label.trim();
        Self {
            dispensary_label: if label.is_empty() {
                url.clone()
            } else {
                label.to_string()
            },
            url,
            menu_type,
            browser_mode_enabled: true,
            force_browser: false,
            debug_enabled: false,
        }
    }

    #[must_use]
    pub fn with_browser_mode(mut self, enabled: bool) -> Self {
        self.browser_mode_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_force_browser(mut self, forced: bool) -> Self {
        self.force_browser = forced;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    /// The menu type stamped on rows: the explicit one when given, otherwise
    /// whatever the URL implies.
    #[must_use]
    pub fn effective_menu_type(&self) -> MenuType {
        match self.menu_type {
            MenuType::Unspecified => MenuType::infer_from_url(&self.url),
            explicit => explicit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_med_from_medical_path() {
        assert_eq!(
            MenuType::infer_from_url("https://shop.example.com/stores/solar/medical/menu"),
            MenuType::Med
        );
        assert_eq!(
            MenuType::infer_from_url("https://dutchie.com/dispensary/nea/med"),
            MenuType::Med
        );
    }

    #[test]
    fn infers_rec_from_adult_use_tokens() {
        assert_eq!(
            MenuType::infer_from_url("https://example.com/menu/rec"),
            MenuType::Rec
        );
        assert_eq!(
            MenuType::infer_from_url("https://example.com/adult-use-menu"),
            MenuType::Rec
        );
    }

    #[test]
    fn ambiguous_url_stays_unspecified() {
        assert_eq!(
            MenuType::infer_from_url("https://example.com/medical-and-recreational"),
            MenuType::Unspecified
        );
        assert_eq!(
            MenuType::infer_from_url("https://example.com/menu"),
            MenuType::Unspecified
        );
    }

    #[test]
    fn host_and_partial_words_do_not_count() {
        assert_eq!(
            MenuType::infer_from_url("https://medicinemandenver.com/stores/menu"),
            MenuType::Unspecified
        );
        assert_eq!(
            MenuType::infer_from_url("https://adultcarecannabis.com/shop"),
            MenuType::Unspecified
        );
        assert_eq!(
            MenuType::infer_from_url("https://example.com/recommended/menu"),
            MenuType::Unspecified
        );
        assert_eq!(
            MenuType::infer_from_url("https://example.com/menu?type=medical"),
            MenuType::Unspecified
        );
    }

    #[test]
    fn unparseable_url_stays_unspecified() {
        assert_eq!(MenuType::infer_from_url("/medical/menu"), MenuType::Unspecified);
    }

    #[test]
    fn explicit_menu_type_wins_over_url() {
        let req = ScanRequest::new("Solar", "https://example.com/medical/menu", MenuType::Rec);
        assert_eq!(req.effective_menu_type(), MenuType::Rec);
    }

    #[test]
    fn unspecified_menu_type_is_inferred() {
        let req = ScanRequest::new(
            "Solar",
            "https://example.com/medical/menu",
            MenuType::Unspecified,
        );
        assert_eq!(req.effective_menu_type(), MenuType::Med);
    }

    #[test]
    fn blank_label_falls_back_to_url() {
        let req = ScanRequest::new("  ", " https://example.com/menu ", MenuType::Unspecified);
        assert_eq!(req.dispensary_label, "https://example.com/menu");
        assert_eq!(req.url, "https://example.com/menu");
    }

    #[test]
    fn menu_type_parses_cli_spellings() {
        assert_eq!("MED".parse::<MenuType>().unwrap(), MenuType::Med);
        assert_eq!("adult-use".parse::<MenuType>().unwrap(), MenuType::Rec);
        assert_eq!("auto".parse::<MenuType>().unwrap(), MenuType::Unspecified);
        assert!("wholesale".parse::<MenuType>().is_err());
    }

    #[test]
    fn menu_type_column_is_blank_when_unspecified() {
        assert_eq!(MenuType::Unspecified.as_column(), "");
        assert_eq!(MenuType::Med.as_column(), "med");
    }
}
