//! Dashboard page rendered from the current rate view.

use rate_sampler::RateView;
use std::time::Duration;

const TEMPLATE: &str = include_str!("../templates/index.html");

/// Fill the page template with `view`.
///
/// The view is embedded as a script literal, so `<`, `>` and `&` are escaped to
/// keep provider-controlled strings from closing the script element.
pub fn render(view: &RateView, refresh: Duration) -> Result<String, serde_json::Error> {
    let view_json = script_safe(&serde_json::to_string(view)?);

    Ok(TEMPLATE
        .replace("{{CURRENT_USD_TO_EUR}}", &escape_html(&view.current_fiat))
        .replace("{{CURRENT_BTC_TO_USD}}", &escape_html(&view.current_crypto))
        .replace("{{STATUS}}", &escape_html(&view.status))
        .replace("{{REFRESH_MS}}", &refresh.as_millis().to_string())
        .replace("{{VIEW_JSON}}", &view_json))
}

fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
