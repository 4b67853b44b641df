//! Pulls the fields the classifier needs out of a fetched HTML page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Elements whose text never renders.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub page_title: Option<String>,
    pub meta_description: Option<String>,
    pub main_heading: Option<String>,
    /// Raw markup, lower-cased.
    pub markup: String,
    /// Visible body text, whitespace-collapsed and lower-cased.
    pub text: String,
}

#[must_use]
pub fn parse_page(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let page_title = document.select(&TITLE).next().and_then(element_text);
    let meta_description = document
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(|content| non_empty(collapse(content)));
    let main_heading = document.select(&H1).next().and_then(element_text);

    let text = document
        .select(&BODY)
        .next()
        .map(visible_text)
        .unwrap_or_default()
        .to_lowercase();

    PageContent {
        page_title,
        meta_description,
        main_heading,
        markup: html.to_lowercase(),
        text,
    }
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    non_empty(collapse(&element.text().collect::<String>()))
}

fn visible_text(body: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse(&out)
}

fn collapse(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <title>  Anna   Coaching </title>
    <meta name="description" content="1:1 Coaching for founders">
    <style>.blog { color: red }</style>
  </head>
  <body>
    <nav>Home &amp; About</nav>
    <h1>Grow your <em>practice</em></h1>
    <h1>Second heading</h1>
    <p>Book a call on <a href="https://calendly.com/anna">Calendly</a></p>
    <script>var pricing = "hidden";</script>
  </body>
</html>"#;

    #[test]
    fn extracts_title_meta_and_first_heading() {
        let page = parse_page(PAGE);
        assert_eq!(page.page_title.as_deref(), Some("Anna Coaching"));
        assert_eq!(
            page.meta_description.as_deref(),
            Some("1:1 Coaching for founders")
        );
        assert_eq!(page.main_heading.as_deref(), Some("Grow your practice"));
    }

    #[test]
    fn text_is_visible_body_only_and_lowercased() {
        let page = parse_page(PAGE);
        assert!(page.text.contains("home & about"));
        assert!(page.text.contains("grow your practice"));
        assert!(!page.text.contains("pricing"), "script text leaked");
        assert!(!page.text.contains("blog"), "style text leaked");
        assert!(!page.text.contains("anna coaching"), "head text leaked");
    }

    #[test]
    fn markup_keeps_attributes_for_domain_matching() {
        let page = parse_page(PAGE);
        assert!(page.markup.contains("calendly.com/anna"));
        assert!(page.markup.contains("<title>"));
    }

    #[test]
    fn missing_fields_are_none() {
        let page = parse_page("<html><body><p>just text</p></body></html>");
        assert!(page.page_title.is_none());
        assert!(page.meta_description.is_none());
        assert!(page.main_heading.is_none());
        assert_eq!(page.text, "just text");
    }

    #[test]
    fn blank_title_is_none() {
        let page = parse_page("<html><head><title>   </title></head><body></body></html>");
        assert!(page.page_title.is_none());
    }
}
