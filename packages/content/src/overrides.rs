//! Applying typed overrides to a document.
//!
//! Every mutation here replaces rather than appends, so applying the same
//! override twice leaves the same tree as applying it once.

use crate::descriptor::{CallToAction, Override, OverrideContent};
use crate::error::ApplyError;
use alliance_dom::parser::{is_raw_text_element, is_void_element};
use alliance_dom::{parse_fragment, Document, Selector, VNode};
use tracing::{debug, warn};

/// Marks the call-to-action anchor an override appended
pub const CTA_ATTRIBUTE: &str = "data-override-cta";

pub const BUTTON_CLASSES: &[&str] = &["btn", "btn-primary"];

/// Per-override result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub matched: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Totals for a batch of overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideSummary {
    pub overrides: usize,
    /// Overrides that changed at least one element
    pub applied: usize,
    /// Overrides whose selector matched nothing
    pub unmatched: usize,
    /// Overrides that failed outright (bad selector, bad markup)
    pub failed: usize,
    /// Elements changed across all overrides
    pub elements: usize,
}

/// Content ready to be placed into elements
enum Prepared<'a> {
    PlainText(&'a str),
    Nodes(Vec<VNode>),
    Image { src: &'a str, alt: Option<&'a str> },
    Link {
        href: &'a str,
        label: Option<&'a str>,
        is_button: bool,
    },
}

/// `<b>`, `</p>` and the like: text that must be treated as markup
pub fn has_formatting_marker(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || pair[1] == b'/'))
}

fn prepare(content: &OverrideContent) -> Result<Prepared<'_>, ApplyError> {
    Ok(match content {
        OverrideContent::Text { text, is_html } if *is_html || has_formatting_marker(text) => {
            let markup = text.replace("\r\n", "\n").replace('\n', "<br>");
            Prepared::Nodes(parse_fragment(&markup)?)
        }
        OverrideContent::Text { text, .. } => Prepared::PlainText(text),
        OverrideContent::Html { html } => Prepared::Nodes(parse_fragment(html)?),
        OverrideContent::Image { src, alt } => Prepared::Image {
            src,
            alt: alt.as_deref(),
        },
        OverrideContent::Link {
            href,
            label,
            is_button,
        } => Prepared::Link {
            href,
            label: label.as_deref(),
            is_button: *is_button,
        },
    })
}

fn apply_to_element(element: &mut VNode, prepared: &Prepared<'_>) -> Result<(), ApplyError> {
    match prepared {
        Prepared::PlainText(text) => {
            check_content_model(element, true)?;
            element.set_children(vec![VNode::text(*text)]);
        }
        Prepared::Nodes(nodes) => {
            check_content_model(element, false)?;
            element.set_children(nodes.clone());
        }
        Prepared::Image { src, alt } => {
            let image = if element.is_tag("img") {
                element
            } else {
                let path = element
                    .find_descendant(|node| node.is_tag("img"))
                    .ok_or(ApplyError::NoImage)?;
                element.descendant_mut(&path).ok_or(ApplyError::NoImage)?
            };
            image.set_attr("src", *src);
            if let Some(alt) = alt {
                image.set_attr("alt", *alt);
            }
        }
        Prepared::Link {
            href,
            label,
            is_button,
        } => {
            if !element.is_tag("a") {
                return Err(ApplyError::NotAnAnchor(
                    element.tag().unwrap_or_default().to_string(),
                ));
            }
            element.set_attr("href", *href);
            if let Some(label) = label {
                element.set_children(vec![VNode::text(*label)]);
            }
            if *is_button {
                for class in BUTTON_CLASSES {
                    element.add_class(class);
                }
            }
        }
    }
    Ok(())
}

/// Void elements hold no children, and script/style bodies are written raw.
/// `textarea` and `title` accept escaped text only.
fn check_content_model(element: &VNode, plain_text: bool) -> Result<(), ApplyError> {
    let tag = element.tag().unwrap_or_default();
    let escaped_text_only = matches!(tag, "textarea" | "title");
    if is_void_element(tag) || (is_raw_text_element(tag) && !(plain_text && escaped_text_only)) {
        return Err(ApplyError::NoContentModel(tag.to_string()));
    }
    Ok(())
}

/// Ensure exactly one call-to-action anchor is the last child of `element`
fn attach_call_to_action(element: &mut VNode, cta: &CallToAction) {
    if element.tag().is_some_and(is_void_element) {
        return;
    }
    let Some(children) = element.children_mut() else {
        return;
    };
    children.retain(|child| child.attr(CTA_ATTRIBUTE).is_none());

    let mut button = VNode::element("a")
        .with_attr("href", cta.url.as_str())
        .with_attr(CTA_ATTRIBUTE, "true")
        .with_child(VNode::text(cta.label.as_str()));
    for class in BUTTON_CLASSES {
        button.add_class(class);
    }
    children.push(button);
}

/// Apply one override to every element its selector matches
pub fn apply_override(
    document: &mut Document,
    item: &Override,
    managed_attribute: &str,
) -> Result<ApplyReport, ApplyError> {
    let selector = Selector::parse(&item.target_selector)?;
    let paths = selector.select_all(document);
    let mut report = ApplyReport {
        matched: paths.len(),
        ..ApplyReport::default()
    };
    if paths.is_empty() {
        return Ok(report);
    }

    let prepared = prepare(&item.content)?;

    // Later matches are never ancestors of earlier ones, so walking backwards
    // keeps every remaining path valid while earlier subtrees are rewritten
    for path in paths.iter().rev() {
        let Some(element) = document.node_at_mut(path) else {
            continue;
        };
        match apply_to_element(element, &prepared) {
            Ok(()) => {
                if let Some(cta) = &item.call_to_action {
                    attach_call_to_action(element, cta);
                }
                element.set_attr(managed_attribute, "true");
                report.applied += 1;
            }
            Err(e) => {
                warn!(
                    selector = %item.target_selector,
                    kind = item.content.kind(),
                    error = %e,
                    "Override not applicable to element"
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Apply a batch; one failing override never stops the rest
pub fn apply_overrides(
    document: &mut Document,
    overrides: &[Override],
    managed_attribute: &str,
) -> OverrideSummary {
    let mut summary = OverrideSummary {
        overrides: overrides.len(),
        ..OverrideSummary::default()
    };

    for item in overrides {
        match apply_override(document, item, managed_attribute) {
            Ok(report) if report.matched == 0 => {
                debug!(selector = %item.target_selector, "Override selector matched nothing");
                summary.unmatched += 1;
            }
            Ok(report) => {
                debug!(
                    selector = %item.target_selector,
                    kind = item.content.kind(),
                    matched = report.matched,
                    applied = report.applied,
                    "Override applied"
                );
                if report.applied > 0 {
                    summary.applied += 1;
                }
                summary.elements += report.applied;
            }
            Err(e) => {
                warn!(selector = %item.target_selector, error = %e, "Override failed");
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Whether an element was last written by an override
pub fn is_managed(element: &VNode, managed_attribute: &str) -> bool {
    element.attr(managed_attribute) == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alliance_dom::{node_to_html, parse_document, to_html};

    const MANAGED: &str = "data-content-managed";

    fn text(selector: &str, value: &str) -> Override {
        Override {
            target_selector: selector.to_string(),
            content: OverrideContent::Text {
                text: value.to_string(),
                is_html: false,
            },
            call_to_action: None,
        }
    }

    fn element_html(doc: &Document, selector: &str) -> String {
        let path = doc.query_selector(selector).unwrap().unwrap();
        node_to_html(doc.node_at(&path).unwrap())
    }

    #[test]
    fn test_plain_text_replaces_content() {
        let mut doc = parse_document(r#"<main><section id="hero"><h1>Old <em>Title</em></h1></section></main>"#).unwrap();
        let report = apply_override(&mut doc, &text("#hero h1", "Welcome!"), MANAGED).unwrap();
        assert_eq!(report, ApplyReport { matched: 1, applied: 1, failed: 0 });

        let h1 = doc.node_at(&doc.query_selector("#hero h1").unwrap().unwrap()).unwrap();
        assert_eq!(h1.children(), &[VNode::text("Welcome!")]);
        assert!(is_managed(h1, MANAGED));
    }

    #[test]
    fn test_plain_text_is_not_markup() {
        let mut doc = parse_document("<p id=x></p>").unwrap();
        apply_override(&mut doc, &text("#x", "1 < 2 & \"ok\""), MANAGED).unwrap();
        assert_eq!(
            element_html(&doc, "#x"),
            r#"<p id="x" data-content-managed="true">1 &lt; 2 &amp; "ok"</p>"#
        );
    }

    #[test]
    fn test_formatting_marker_enables_rich_text_with_line_breaks() {
        let mut doc = parse_document("<p id=x></p>").unwrap();
        apply_override(&mut doc, &text("#x", "<strong>Free</strong> tutoring\nfor all"), MANAGED).unwrap();
        assert_eq!(
            element_html(&doc, "#x"),
            r#"<p id="x" data-content-managed="true"><strong>Free</strong> tutoring<br>for all</p>"#
        );
    }

    #[test]
    fn test_is_html_flag_converts_newlines() {
        let mut doc = parse_document("<p id=x></p>").unwrap();
        let item = Override {
            content: OverrideContent::Text {
                text: "line one\nline two".to_string(),
                is_html: true,
            },
            ..text("#x", "")
        };
        apply_override(&mut doc, &item, MANAGED).unwrap();
        assert_eq!(
            element_html(&doc, "#x"),
            r#"<p id="x" data-content-managed="true">line one<br>line two</p>"#
        );
    }

    #[test]
    fn test_html_content_is_inserted_verbatim() {
        let mut doc = parse_document("<div id=x>old</div>").unwrap();
        let item = Override {
            content: OverrideContent::Html {
                html: r#"<ul><li>One</li><li class="b">Two</li></ul>"#.to_string(),
            },
            ..text("#x", "")
        };
        apply_override(&mut doc, &item, MANAGED).unwrap();
        assert_eq!(
            element_html(&doc, "#x"),
            r#"<div id="x" data-content-managed="true"><ul><li>One</li><li class="b">Two</li></ul></div>"#
        );
    }

    #[test]
    fn test_image_override_targets_first_descendant_image() {
        let mut doc = parse_document(
            r#"<figure class="team"><img src="old.png"><img src="second.png"></figure>"#,
        )
        .unwrap();
        let item = Override {
            content: OverrideContent::Image {
                src: "/uploads/team.jpg".to_string(),
                alt: Some("Our tutors".to_string()),
            },
            ..text(".team", "")
        };
        apply_override(&mut doc, &item, MANAGED).unwrap();
        assert_eq!(
            element_html(&doc, ".team"),
            r#"<figure class="team" data-content-managed="true"><img src="/uploads/team.jpg" alt="Our tutors"><img src="second.png"></figure>"#
        );
    }

    #[test]
    fn test_image_override_without_image_fails_per_element() {
        let mut doc = parse_document("<div class=logo></div>").unwrap();
        let item = Override {
            content: OverrideContent::Image {
                src: "/x.png".to_string(),
                alt: None,
            },
            ..text(".logo", "")
        };
        let report = apply_override(&mut doc, &item, MANAGED).unwrap();
        assert_eq!(report, ApplyReport { matched: 1, applied: 0, failed: 1 });
        assert_eq!(element_html(&doc, ".logo"), r#"<div class="logo"></div>"#);
    }

    #[test]
    fn test_text_on_void_element_fails_per_element() {
        let mut doc = parse_document(r#"<div><img class="pic" src="/a.png"><p class="pic">Old</p></div>"#).unwrap();
        let report = apply_override(&mut doc, &text(".pic", "Caption"), MANAGED).unwrap();
        assert_eq!(report, ApplyReport { matched: 2, applied: 1, failed: 1 });
        assert_eq!(element_html(&doc, "img"), r#"<img class="pic" src="/a.png">"#);
        assert_eq!(
            element_html(&doc, "p"),
            r#"<p class="pic" data-content-managed="true">Caption</p>"#
        );
    }

    #[test]
    fn test_text_cannot_enter_script_or_style_bodies() {
        let mut doc = parse_document("<head><title>Old</title><style>p { color: red; }</style></head>").unwrap();
        let escape = text("style", "</style><script>alert(1)</script>");
        let report = apply_override(&mut doc, &escape, MANAGED).unwrap();
        assert_eq!(report, ApplyReport { matched: 1, applied: 0, failed: 1 });
        assert_eq!(to_html(&doc), "<head><title>Old</title><style>p { color: red; }</style></head>");

        let report = apply_override(&mut doc, &text("script, style", "x < 1 && y"), MANAGED).unwrap();
        assert_eq!(report.failed, 1);

        let report = apply_override(&mut doc, &text("title", "Reading & Math <3"), MANAGED).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(
            element_html(&doc, "title"),
            r#"<title data-content-managed="true">Reading &amp; Math &lt;3</title>"#
        );
    }

    #[test]
    fn test_link_override_only_on_anchors() {
        let mut doc = parse_document(r#"<nav><a class="join" href="/old">Old</a><span class="join">x</span></nav>"#).unwrap();
        let item = Override {
            content: OverrideContent::Link {
                href: "/volunteer".to_string(),
                label: Some("Volunteer".to_string()),
                is_button: true,
            },
            ..text(".join", "")
        };
        let report = apply_override(&mut doc, &item, MANAGED).unwrap();
        assert_eq!(report, ApplyReport { matched: 2, applied: 1, failed: 1 });
        assert_eq!(
            element_html(&doc, "a.join"),
            r#"<a class="join btn btn-primary" href="/volunteer" data-content-managed="true">Volunteer</a>"#
        );
    }

    #[test]
    fn test_selector_fan_out() {
        let mut doc = parse_document(r#"<ul><li class="n">1</li><li class="n">2</li><li class="n">3</li></ul>"#).unwrap();
        let report = apply_override(&mut doc, &text("li.n", "same"), MANAGED).unwrap();
        assert_eq!(report.applied, 3);
        let paths = doc.query_selector_all("li.n").unwrap();
        for path in paths {
            assert_eq!(doc.node_at(&path).unwrap().text_content(), "same");
        }
    }

    #[test]
    fn test_nested_matches_are_all_visited() {
        let mut doc = parse_document(r#"<div class="c"><div class="c">inner</div></div>"#).unwrap();
        let report = apply_override(&mut doc, &text(".c", "flat"), MANAGED).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(
            to_html(&doc),
            r#"<div class="c" data-content-managed="true">flat</div>"#
        );
    }

    #[test]
    fn test_call_to_action_is_attached_once() {
        let mut doc = parse_document(r#"<div id="intro"><p>Old</p></div>"#).unwrap();
        let item = Override {
            call_to_action: Some(CallToAction {
                label: "Find a tutor".to_string(),
                url: "/tutors".to_string(),
            }),
            ..text("#intro", "We help students.")
        };

        apply_overrides(&mut doc, std::slice::from_ref(&item), MANAGED);
        let once = to_html(&doc);
        apply_overrides(&mut doc, std::slice::from_ref(&item), MANAGED);
        apply_overrides(&mut doc, std::slice::from_ref(&item), MANAGED);

        assert_eq!(to_html(&doc), once);
        let ctas = doc.query_selector_all("#intro a[data-override-cta]").unwrap();
        assert_eq!(ctas.len(), 1);
    }

    #[test]
    fn test_batch_continues_after_failures() {
        let mut doc = parse_document(r#"<h1 id="t">a</h1><p class="missing-not"></p>"#).unwrap();
        let overrides = vec![
            text("h1:hover", "bad selector"),
            text(".does-not-exist", "nothing"),
            text("#t", "ok"),
        ];
        let summary = apply_overrides(&mut doc, &overrides, MANAGED);
        assert_eq!(
            summary,
            OverrideSummary {
                overrides: 3,
                applied: 1,
                unmatched: 1,
                failed: 1,
                elements: 1
            }
        );
        assert_eq!(element_html(&doc, "#t"), r#"<h1 id="t" data-content-managed="true">ok</h1>"#);
    }

    #[test]
    fn test_formatting_marker_detection() {
        assert!(has_formatting_marker("a <b>c</b>"));
        assert!(has_formatting_marker("x</p>"));
        assert!(!has_formatting_marker("1 < 2"));
        assert!(!has_formatting_marker("plain"));
    }
}
