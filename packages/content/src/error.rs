//! Error types for the content layer

use alliance_dom::{ParseError, SelectorError};
use thiserror::Error;

/// Failure talking to the content API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A wire descriptor that cannot become a typed override
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("Descriptor has an empty target selector")]
    EmptySelector,

    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    #[error("{content_type} override for {selector} is missing `{field}`")]
    MissingField {
        selector: String,
        content_type: &'static str,
        field: &'static str,
    },
}

/// Failure applying one override or one ordering pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("Invalid markup: {0}")]
    Markup(#[from] ParseError),

    #[error("No image element under target")]
    NoImage,

    #[error("Link override targets <{0}>, expected <a>")]
    NotAnAnchor(String),

    #[error("Content cannot be placed inside <{0}>")]
    NoContentModel(String),

    #[error("Content container `{0}` not found")]
    ContainerNotFound(String),

    #[error("Section id `{0}` appears more than once")]
    DuplicateSection(String),

    #[error("Order does not match the live sections")]
    InvalidOrder,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
