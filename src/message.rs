//! The message shapes exchanged with the extension.
//!
//! Inbound: `{"version": ...}` asks who we are, `{"url": "..."}` asks us to
//! open a link. Both may appear in one message.
//!
//! Outbound: an [`IdentityReply`] or an [`OpenResult`].

use serde::Serialize;
use serde_json::Value;

use crate::identity::IdentityInfo;

/// One thing the extension asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `version` key present (its value is ignored).
    Identity,
    /// `url` key holding a string.
    OpenUrl(String),
    /// `url` key holding something other than a string; carries its JSON text.
    InvalidUrl(String),
}

/// Splits a decoded message into requests, always `version` before `url`
/// regardless of key order in the document.
///
/// Anything that is not a JSON object, or an object with neither key,
/// yields no requests.
pub fn requests(message: &Value) -> Vec<Request> {
    let Some(obj) = message.as_object() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(2);
    if obj.contains_key("version") {
        out.push(Request::Identity);
    }
    match obj.get("url") {
        Some(Value::String(url)) => out.push(Request::OpenUrl(url.clone())),
        Some(other) => out.push(Request::InvalidUrl(other.to_string())),
        None => {}
    }
    out
}

/// Answer to a `version` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityReply {
    pub version: String,
    #[serde(rename = "ssbID")]
    pub ssb_id: String,
    #[serde(rename = "ssbName")]
    pub ssb_name: String,
    #[serde(rename = "ssbShortName")]
    pub ssb_short_name: String,
}

impl From<&IdentityInfo> for IdentityReply {
    fn from(info: &IdentityInfo) -> Self {
        IdentityReply {
            version: info.app_version.clone(),
            ssb_id: info.app_id.clone(),
            ssb_name: info.app_display_name.clone(),
            ssb_short_name: info.app_short_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// Answer to a `url` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenResult {
    pub result: Outcome,
    pub url: String,
}

impl OpenResult {
    pub fn success(url: impl Into<String>) -> Self {
        OpenResult {
            result: Outcome::Success,
            url: url.into(),
        }
    }

    pub fn error(url: impl Into<String>) -> Self {
        OpenResult {
            result: Outcome::Error,
            url: url.into(),
        }
    }
}

/// Anything the host writes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Identity(IdentityReply),
    Open(OpenResult),
}
