//! Request model
//!
//! A `Request` carries everything the network engine needs to answer
//! `match_all`: the URL (plus its lowercased form, computed once), the
//! hostname, the source context, and the resource category.

use crate::url::{extract_host, is_third_party};

// =============================================================================
// Request Types
// =============================================================================

/// Resource category of an outbound HTTP request, as supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Document,
    Subdocument,
    Stylesheet,
    Script,
    Image,
    Font,
    Object,
    Media,
    XmlHttpRequest,
    Websocket,
    Other,
}

impl RequestType {
    /// Parse from a browser request type string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "main_frame" | "document" => Self::Document,
            "sub_frame" | "subdocument" => Self::Subdocument,
            "stylesheet" => Self::Stylesheet,
            "script" => Self::Script,
            "image" => Self::Image,
            "font" => Self::Font,
            "object" => Self::Object,
            "media" => Self::Media,
            "xmlhttprequest" => Self::XmlHttpRequest,
            "websocket" => Self::Websocket,
            _ => Self::Other,
        }
    }

    /// The bit this type occupies in a [`RequestTypeMask`].
    pub fn mask(self) -> RequestTypeMask {
        match self {
            Self::Document => RequestTypeMask::DOCUMENT,
            Self::Subdocument => RequestTypeMask::SUBDOCUMENT,
            Self::Stylesheet => RequestTypeMask::STYLESHEET,
            Self::Script => RequestTypeMask::SCRIPT,
            Self::Image => RequestTypeMask::IMAGE,
            Self::Font => RequestTypeMask::FONT,
            Self::Object => RequestTypeMask::OBJECT,
            Self::Media => RequestTypeMask::MEDIA,
            Self::XmlHttpRequest => RequestTypeMask::XMLHTTPREQUEST,
            Self::Websocket => RequestTypeMask::WEBSOCKET,
            Self::Other => RequestTypeMask::OTHER,
        }
    }
}

bitflags::bitflags! {
    /// Request type bit mask. An empty mask on a rule means "all types".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestTypeMask: u32 {
        const DOCUMENT = 1 << 0;
        const SUBDOCUMENT = 1 << 1;
        const STYLESHEET = 1 << 2;
        const SCRIPT = 1 << 3;
        const IMAGE = 1 << 4;
        const FONT = 1 << 5;
        const OBJECT = 1 << 6;
        const MEDIA = 1 << 7;
        const XMLHTTPREQUEST = 1 << 8;
        const WEBSOCKET = 1 << 9;
        const OTHER = 1 << 10;
    }
}

// =============================================================================
// Request
// =============================================================================

/// A request being matched against the ruleset.
#[derive(Debug, Clone)]
pub struct Request {
    /// Full request URL.
    pub url: String,
    /// ASCII-lowercased URL, computed once at construction.
    pub url_lowercase: String,
    /// Hostname of `url`.
    pub hostname: String,
    /// URL of the frame that initiated the request.
    pub source_url: Option<String>,
    /// Hostname of `source_url`.
    pub source_hostname: Option<String>,
    /// Resource category.
    pub request_type: RequestType,
    /// Whether the request crosses registrable domains from its source.
    pub third_party: bool,
    /// Host-assigned transaction id, required for cookie filtering.
    pub request_id: Option<u64>,
}

impl Request {
    pub fn new(url: &str, source_url: Option<&str>, request_type: RequestType) -> Self {
        let url_lowercase = url.to_ascii_lowercase();
        // Hostnames are case-insensitive; keep them lowercased so domain
        // lookups and comparisons never have to re-normalise.
        let hostname = extract_host(&url_lowercase).unwrap_or("").to_string();
        let source_hostname = source_url
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
            .and_then(extract_host)
            .map(str::to_string);
        let third_party = match &source_hostname {
            Some(src) if !hostname.is_empty() => is_third_party(&hostname, src),
            _ => false,
        };

        Self {
            url: url.to_string(),
            url_lowercase,
            hostname,
            source_url: source_url.map(str::to_string),
            source_hostname,
            request_type,
            third_party,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }
}
