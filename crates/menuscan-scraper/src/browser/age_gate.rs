//! Best-effort 21+ age-gate dismissal.

/// Seeds the localStorage keys common age gates check. Registered to run
/// before any page script.
pub(super) const AGE_GATE_INIT_SCRIPT: &str = r"
try {
    localStorage.setItem('ageVerified', 'true');
    localStorage.setItem('age_verified', 'true');
    localStorage.setItem('isAgeVerified', 'true');
    localStorage.setItem('over21', 'true');
    localStorage.setItem('ageGatePassed', 'true');
} catch (e) {}
";

const AGE_GATE_SELECTORS: &[&str] = &[
    "[class*='age-gate'] button",
    "[class*='agegate'] button",
    "[class*='age_gate'] button",
    "[id*='age-gate'] button",
    "[id*='agegate'] button",
    "[class*='age-verification'] button",
    "[class*='ageVerification'] button",
    ".age-gate-button",
    "button[data-testid*='age']",
    "button[aria-label*='21']",
    "button[aria-label*='age']",
];

/// Tried in order; the generic ones come last.
const AGE_GATE_PHRASES: &[&str] = &[
    "i'm 21",
    "im 21",
    "i am 21",
    "i am 21+",
    "over 21",
    "21+",
    "yes, i'm 21",
    "yes i'm 21",
    "i agree",
    "enter site",
    "enter the site",
    "confirm age",
    "verify age",
    "i am of legal age",
    "yes, i am",
    "yes i am",
    "yes",
    "enter",
];

/// Script that clicks the first visible age-gate control and evaluates to
/// `true` if it clicked something. Selectors are tried before text phrases.
pub(super) fn dismiss_script() -> String {
    let selectors = serde_json::json!(AGE_GATE_SELECTORS);
    let phrases = serde_json::json!(AGE_GATE_PHRASES);
    format!(
        r"(() => {{
    const selectors = {selectors};
    const phrases = {phrases};
    const visible = (el) => !!(el && (el.offsetWidth || el.offsetHeight || el.getClientRects().length));
    for (const sel of selectors) {{
        let el = null;
        try {{ el = document.querySelector(sel); }} catch (e) {{ continue; }}
        if (visible(el)) {{ el.click(); return true; }}
    }}
    const controls = Array.from(document.querySelectorAll(`button, a, [role='button']`)).filter(visible);
    for (const phrase of phrases) {{
        const hit = controls.find((el) => (el.innerText || el.textContent || '').trim().toLowerCase().includes(phrase));
        if (hit) {{ hit.click(); return true; }}
    }}
    return false;
}})()"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismiss_script_embeds_selectors_and_phrases() {
        let script = dismiss_script();
        assert!(script.contains(r#""[class*='age-gate'] button""#));
        assert!(script.contains(r#""i am of legal age""#));
        assert!(script.starts_with("(() => {"));
        assert!(script.trim_end().ends_with("})()"));
    }

    #[test]
    fn generic_phrases_are_tried_last() {
        let yes = AGE_GATE_PHRASES.iter().position(|p| *p == "yes").unwrap();
        let legal = AGE_GATE_PHRASES
            .iter()
            .position(|p| *p == "i am of legal age")
            .unwrap();
        assert!(legal < yes);
        assert_eq!(AGE_GATE_PHRASES.last(), Some(&"enter"));
    }
}
