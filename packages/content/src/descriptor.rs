//! Override descriptors.
//!
//! The content API serves a flat record whose `image` field doubles as the
//! URL for both images and links. [`WireOverride`] mirrors that record;
//! [`Override`] is what the applier works with, decided once at the boundary.

use crate::error::DescriptorError;
use serde::{Deserialize, Serialize};

/// Override record exactly as the content API serves it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOverride {
    pub target_selector: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, rename = "isHTML", alias = "isHtml")]
    pub is_html: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_url: Option<String>,
    #[serde(default)]
    pub is_button: bool,
}

/// Button appended after the overridden content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallToAction {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideContent {
    /// Plain text, or rich text when `is_html` / the text carries markup
    Text { text: String, is_html: bool },
    /// Trusted admin-authored markup, inserted verbatim
    Html { html: String },
    Image { src: String, alt: Option<String> },
    Link {
        href: String,
        label: Option<String>,
        is_button: bool,
    },
}

impl OverrideContent {
    pub fn kind(&self) -> &'static str {
        match self {
            OverrideContent::Text { .. } => "text",
            OverrideContent::Html { .. } => "html",
            OverrideContent::Image { .. } => "image",
            OverrideContent::Link { .. } => "link",
        }
    }
}

/// Typed override addressed by CSS selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub target_selector: String,
    pub content: OverrideContent,
    pub call_to_action: Option<CallToAction>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<WireOverride> for Override {
    type Error = DescriptorError;

    fn try_from(wire: WireOverride) -> Result<Self, Self::Error> {
        let target_selector = wire.target_selector.trim().to_string();
        if target_selector.is_empty() {
            return Err(DescriptorError::EmptySelector);
        }

        let missing = |content_type: &'static str, field: &'static str| DescriptorError::MissingField {
            selector: target_selector.clone(),
            content_type,
            field,
        };

        let content = match wire.content_type.trim().to_ascii_lowercase().as_str() {
            "text" => OverrideContent::Text {
                text: wire.text.ok_or_else(|| missing("text", "text"))?,
                is_html: wire.is_html,
            },
            "html" => OverrideContent::Html {
                html: wire.text.ok_or_else(|| missing("html", "text"))?,
            },
            "image" => OverrideContent::Image {
                src: non_empty(wire.image).ok_or_else(|| missing("image", "image"))?,
                alt: non_empty(wire.text),
            },
            "link" => OverrideContent::Link {
                href: non_empty(wire.image).ok_or_else(|| missing("link", "image"))?,
                label: non_empty(wire.text),
                is_button: wire.is_button,
            },
            _ => return Err(DescriptorError::UnknownContentType(wire.content_type)),
        };

        let call_to_action = match (non_empty(wire.button_label), non_empty(wire.button_url)) {
            (Some(label), Some(url)) => Some(CallToAction { label, url }),
            _ => None,
        };

        Ok(Override {
            target_selector,
            content,
            call_to_action,
        })
    }
}
