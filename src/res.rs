use std::ops::Deref;

use axum::{
    debug_handler,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};

use crate::{AppError, AppResult};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Escapes text for use inside HTML element content and quoted attributes.
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

/// Wraps a rendered fragment in the site layout.
pub fn page(title: &str, body: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/layout.html")
            .replace("{title}", &escape(title))
            .replace("{body}", body),
    )
}

pub fn sorry(what: &str) -> AppResult<Response> {
    let body = include_res!(str, "/pages/sorry.html").replace("{what}", &escape(what));
    Ok((StatusCode::NOT_FOUND, page("Not found", &body)).into_response())
}

#[debug_handler]
pub async fn not_found(uri: Uri) -> AppResult<Response> {
    if uri.path().starts_with("/api/") {
        return Err(AppError::not_found("endpoint"));
    }
    sorry("page")
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    ([("content-type", "text/css")], include_res!(str, "/style.css"))
}

/// Markdown source rendered to HTML on the way out.
///
/// Relative image sources are taken to be files uploaded alongside the guide.
pub struct Markdown<T>(pub T);

impl<T> Markdown<T>
where
    T: Deref<Target = str>,
{
    pub fn to_html(&self) -> String {
        let parser = Parser::new_ext(&*self.0, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
            .map(|event| match event {
                Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
                    link_type,
                    dest_url: guide_media(dest_url),
                    title,
                    id,
                }),
                // raw html is not trusted
                Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
                _ => event,
            });

        let mut html_output = String::new();
        pulldown_cmark::html::push_html(&mut html_output, parser);
        html_output
    }
}

impl<T> IntoResponse for Markdown<T>
where
    T: Deref<Target = str>,
{
    fn into_response(self) -> Response {
        Html(self.to_html()).into_response()
    }
}

fn guide_media(url: CowStr<'_>) -> CowStr<'_> {
    if url.starts_with('/') || url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
        url
    } else {
        format!("/media/guides/{url}").into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn relative_images_point_at_guide_media() {
        let html = Markdown("![shot](step1.png) ![abs](/media/a.png) ![web](https://x.io/b.png)").to_html();
        assert!(html.contains(r#"src="/media/guides/step1.png""#));
        assert!(html.contains(r#"src="/media/a.png""#));
        assert!(html.contains(r#"src="https://x.io/b.png""#));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = Markdown("hi <script>alert(1)</script>").to_html();
        assert!(!html.contains("<script>"));
    }
}
