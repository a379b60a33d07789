use axum::{
    debug_handler,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;

use crate::{AppResult, db::User, flash};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

const MODERATE_LINKS: &str = r#"<a href="/moderate/roles">Roles</a> <a href="/moderate/jokes">All jokes</a>"#;

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], include_res!(str, "/style.css"))
}

pub async fn not_found() -> Response {
    sorry("page")
}

pub fn sorry(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(fill(include_res!(str, "/pages/sorry.html"), &[("what", &escape(what))])),
    )
        .into_response()
}

/// Substitutes every `{name}` in `template` in a single pass. Substituted
/// values are never scanned again, and unknown names are left as they are.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let found = after.find('}').and_then(|end| {
            let name = &after[..end];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match found {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn escape(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

/// Renders a joke body. Raw HTML in the source is shown as text.
pub fn markdown(source: &str) -> String {
    use pulldown_cmark::{Event, Options, Parser};

    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        _ => event,
    });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

pub fn rating(avg_rating: f64) -> String {
    if avg_rating == 0.0 {
        "not rated".to_owned()
    } else {
        format!("{avg_rating:.1} / 5")
    }
}

/// Wraps `body` in the site layout, consuming any pending flash messages.
pub async fn page(
    session: &Session,
    user: Option<&User>,
    title: &str,
    body: &str,
) -> AppResult<Html<String>> {
    let flashes: String = flash::take(session)
        .await?
        .iter()
        .map(|flash| {
            fill(
                include_res!(str, "/pages/flash.html"),
                &[("level", flash.level.as_str()), ("message", &escape(&flash.message))],
            )
        })
        .collect();

    let nav = match user {
        Some(user) => fill(
            include_res!(str, "/pages/nav_user.html"),
            &[
                ("nickname", &escape(&user.nickname)),
                ("balance", &user.joke_balance.to_string()),
                ("moderate", if user.is_moderator() { MODERATE_LINKS } else { "" }),
            ],
        ),
        None => include_res!(str, "/pages/nav_guest.html").to_owned(),
    };

    Ok(Html(fill(
        include_res!(str, "/pages/layout.html"),
        &[
            ("title", &escape(title)),
            ("nav", &nav),
            ("flashes", &flashes),
            ("body", body),
        ],
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_substitutes_once() {
        let out = fill("<h1>{title}</h1><p>{body}</p>", &[("title", "{body}"), ("body", "text")]);
        assert_eq!(out, "<h1>{body}</h1><p>text</p>");
    }

    #[test]
    fn fill_keeps_unknown_braces() {
        let out = fill("p { margin: 0 } {x}", &[("x", "y")]);
        assert_eq!(out, "p { margin: 0 } y");
    }

    #[test]
    fn markdown_does_not_pass_html_through() {
        let out = markdown("**knock** <script>alert(1)</script>");
        assert!(out.contains("<strong>knock</strong>"));
        assert!(!out.contains("<script>"));
    }
}
