//! HTML fragments and Datastar server-sent events
//!
//! Datastar sends `datastar-request: true` with every `@post`/`@delete` and
//! applies `datastar-patch-elements` events by matching element ids.

use std::convert::Infallible;
use std::fmt::Write;

use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream};
use redact_core::protocol::delete_path;
use redact_core::Redaction;

pub const LIST_ID: &str = "redaction-list";
pub const ERROR_ID: &str = "redaction-error";

pub fn is_datastar(headers: &HeaderMap) -> bool {
    headers
        .get("datastar-request")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

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

/// The authoritative list, keyed by redaction id. Rendered on one line so it
/// fits a single SSE data line.
pub fn redaction_list(redactions: &[Redaction]) -> String {
    let mut html = format!(
        r#"<ul id="{}" data-count="{}">"#,
        LIST_ID,
        redactions.len()
    );
    for r in redactions {
        let _ = write!(
            html,
            r#"<li id="redaction-{id}" data-kind="{kind}" data-page="{page}" data-x="{x}" data-y="{y}" data-width="{w}" data-height="{h}">{label}: {coords} <button data-on-click="@delete('{delete}')">Remove</button></li>"#,
            id = r.id,
            kind = r.kind,
            page = r.page,
            x = r.rect.x,
            y = r.rect.y,
            w = r.rect.width,
            h = r.rect.height,
            label = r.kind.label(),
            coords = escape(&r.coordinates_display()),
            delete = delete_path(r.id),
        );
    }
    html.push_str("</ul>");
    html
}

pub fn error_notice(message: &str) -> String {
    format!(
        r#"<div id="{}" role="alert">{}</div>"#,
        ERROR_ID,
        escape(message).replace(['\r', '\n'], " ")
    )
}

/// Empty notice that clears a previous failure
pub fn cleared_notice() -> String {
    format!(r#"<div id="{}" role="alert"></div>"#, ERROR_ID)
}

pub fn patch_event(fragment: &str) -> Event {
    Event::default()
        .event("datastar-patch-elements")
        .data(format!("elements {}", fragment))
}

/// One event per fragment, then the stream ends
pub fn patch_elements(
    fragments: impl IntoIterator<Item = String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events: Vec<Result<Event, Infallible>> = fragments
        .into_iter()
        .map(|fragment| Ok(patch_event(&fragment)))
        .collect();
    Sse::new(stream::iter(events))
}
