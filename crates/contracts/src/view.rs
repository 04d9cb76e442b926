//! View job wire model
//!
//! Shapes exchanged with clients and with render servers. Field names match the
//! JSON wire format exactly.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ContractError;

/// Client-chosen job identifier, unique within one batch
pub type JobId = String;

/// Render server address resolved from a view name
pub type Destination = String;

/// Incoming batch: job identifier -> job
pub type BatchRequest = HashMap<JobId, ViewJob>;

/// A single view render job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewJob {
    /// Registered view name, used to resolve the destination
    pub name: String,

    /// Opaque props, forwarded to the destination unmodified
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ViewJob {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Structured error attached to a failed view result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewJobError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Result of rendering one view
///
/// `success == false` implies `error` is populated. On success `error` is the
/// zero value and is still serialized, matching what render servers emit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewJobResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub html: String,

    /// Render time reported by the destination (milliseconds)
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: f64,

    #[serde(default)]
    pub success: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub error: ViewJobError,
}

impl ViewJobResult {
    /// Successful render
    pub fn rendered(view: impl Into<String>, html: impl Into<String>, duration: f64) -> Self {
        Self {
            name: view.into(),
            html: html.into(),
            duration,
            success: true,
            error: ViewJobError::default(),
        }
    }

    /// Failed render synthesized locally
    pub fn failure(view: impl Into<String>, kind: ViewErrorKind, message: impl Into<String>) -> Self {
        Self {
            name: view.into(),
            html: String::new(),
            duration: 0.0,
            success: false,
            error: ViewJobError {
                name: kind.as_str().to_string(),
                message: message.into(),
            },
        }
    }

    /// View has no registered destination
    pub fn reference_error(view: &str) -> Self {
        Self::failure(
            view,
            ViewErrorKind::ReferenceError,
            format!("Component \"{view}\" not registered in cluster"),
        )
    }

    /// Destination call failed with `err`
    pub fn from_error(view: impl Into<String>, err: &ContractError) -> Self {
        Self::failure(view, err.view_error_kind(), err.to_string())
    }

    /// Destination returned no entry for a job it was sent
    pub fn missing(view: impl Into<String>, destination: &str) -> Self {
        Self::failure(
            view,
            ViewErrorKind::MissingResult,
            format!("render server {destination} returned no result for this job"),
        )
    }

    /// Error name as a typed kind, if it is one this crate knows
    pub fn error_kind(&self) -> Option<ViewErrorKind> {
        ViewErrorKind::parse(&self.error.name)
    }
}

/// Taxonomy of `error.name` values synthesized by the multiplexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewErrorKind {
    /// View name has no registry entry
    ReferenceError,
    /// Destination unreachable, timed out, or answered with an error status
    ConnectionRefused,
    /// Destination answered with a body that is not a batch response
    DecodeError,
    /// Destination omitted a job it was sent
    MissingResult,
}

impl ViewErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReferenceError => "ReferenceError",
            Self::ConnectionRefused => "ConnectionRefused",
            Self::DecodeError => "DecodeError",
            Self::MissingResult => "MissingResult",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ReferenceError" => Some(Self::ReferenceError),
            "ConnectionRefused" => Some(Self::ConnectionRefused),
            "DecodeError" => Some(Self::DecodeError),
            "MissingResult" => Some(Self::MissingResult),
            _ => None,
        }
    }
}

impl fmt::Display for ViewErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated response: job identifier -> result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: HashMap<JobId, ViewJobResult>,
}

impl BatchResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ViewJobResult> {
        self.results.get(id)
    }

    /// Number of results with `success == true`
    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
