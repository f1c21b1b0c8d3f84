//! HTML rendering of workflow views
//!
//! Pages are assembled from embedded templates. Placeholders (`{{NAME}}`) are
//! substituted in a single pass, so substituted text is never rescanned, and
//! every piece of visitor-controlled text is escaped before substitution.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use facerate_common::{Progress, Score, Screen, View};

const PAGE_HTML: &str = include_str!("../ui/page.html");
const AUTH_HTML: &str = include_str!("../ui/auth.html");
const RATING_HTML: &str = include_str!("../ui/rating.html");
const COMPLETED_HTML: &str = include_str!("../ui/completed.html");
const UNAVAILABLE_HTML: &str = include_str!("../ui/unavailable.html");
const STYLE_CSS: &str = include_str!("../ui/style.css");

/// GET /static/style.css
pub async fn serve_style_css() -> Response {
    (StatusCode::OK, [("content-type", "text/css")], STYLE_CSS).into_response()
}

/// Full HTML document for `view`
pub fn page(view: &View) -> String {
    let (title, content) = match &view.screen {
        Screen::Auth => ("Welcome to Face Rating!".to_string(), AUTH_HTML.to_string()),
        Screen::Rating { image } => (rating_title(view), rating(image, view.progress, view.total_records)),
        Screen::Completed => (
            rating_title(view),
            fill(
                COMPLETED_HTML,
                &[
                    ("TOTAL", view.progress.map(|p| p.total).unwrap_or(0).to_string()),
                    ("PROGRESS", progress(view.progress, view.total_records)),
                ],
            ),
        ),
        Screen::Unavailable => (rating_title(view), UNAVAILABLE_HTML.to_string()),
    };

    fill(
        PAGE_HTML,
        &[
            ("TITLE", escape(&title)),
            ("BANNER", banner(view.persistent)),
            ("MESSAGES", messages(view)),
            ("CONTENT", content),
        ],
    )
}

fn rating_title(view: &View) -> String {
    format!(
        "Rate This Face ({}\u{2013}{}) - {}",
        Score::MIN,
        Score::MAX,
        view.user.as_deref().unwrap_or_default()
    )
}

fn rating(image: &str, p: Option<Progress>, total_records: Option<u64>) -> String {
    let buttons: String = Score::all()
        .map(|s| format!(r#"<button type="submit" name="score" value="{0}">{0}</button>"#, s))
        .collect();

    fill(
        RATING_HTML,
        &[
            ("IMAGE", escape(image)),
            ("IMAGE_URL", encode_path_segment(image)),
            ("SCORE_BUTTONS", buttons),
            ("PROGRESS", progress(p, total_records)),
        ],
    )
}

fn progress(p: Option<Progress>, total_records: Option<u64>) -> String {
    let Some(p) = p else {
        return String::new();
    };
    let mut html = format!(
        r#"<progress value="{0}" max="{1}">{2}%</progress><p>Progress: {0}/{1} images rated</p>"#,
        p.rated,
        p.total,
        p.percent()
    );
    if let Some(count) = total_records {
        html.push_str(&format!(r#"<p class="diagnostic">{} ratings recorded</p>"#, count));
    }
    html
}

fn banner(persistent: bool) -> String {
    if persistent {
        String::new()
    } else {
        r#"<p class="banner">Ratings are not being saved permanently: the rating store is unavailable and ratings will be lost when the server restarts.</p>"#
            .to_string()
    }
}

fn messages(view: &View) -> String {
    let mut html = String::new();
    if let Some(notice) = &view.notice {
        html.push_str(&format!(r#"<p class="notice">{}</p>"#, escape(notice)));
    }
    if let Some(error) = &view.error {
        html.push_str(&format!(r#"<p class="error">{}</p>"#, escape(error)));
    }
    html
}

/// Substitute `{{KEY}}` placeholders in one pass; unknown keys are left as-is
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Escape text for HTML element content and quoted attribute values
pub fn escape(text: &str) -> String {
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

/// Percent-encode a filename for use as one URL path segment
pub fn encode_path_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
