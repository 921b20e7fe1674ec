//! Field validators
//!
//! Pure predicates over a single attribute value. A validator returns a
//! human-readable message on rejection; the schema turns that message into a
//! configuration diagnostic carrying the attribute path.
//!
//! Null and unknown values are never rejected here: presence is the schema's
//! concern, and unknown values are validated once they become known.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A single-value validation rule
pub trait Validator: Send + Sync {
    /// Short description shown in schemas
    fn description(&self) -> String;

    /// Check a value, returning the rejection message on failure
    fn validate(&self, value: &Value) -> Result<(), String>;
}

impl fmt::Debug for dyn Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Shared handle to a validator
pub type ValidatorRef = Arc<dyn Validator>;

fn skip(value: &Value) -> bool {
    value.is_null() || value.is_unknown()
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", value.type_label()))
}

/// Accept only absolute URLs whose scheme is `http` or `https`
#[derive(Debug, Clone, Copy)]
pub struct UrlWithHttpOrHttps;

impl Validator for UrlWithHttpOrHttps {
    fn description(&self) -> String {
        "value must be a valid URL with http or https scheme".to_string()
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if skip(value) {
            return Ok(());
        }
        let raw = expect_str(value)?;
        let parsed = url::Url::parse(raw).map_err(|e| format!("{raw:?} is not a valid URL: {e}"))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(format!(
                    "{raw:?} has scheme {other:?}; expected \"http\" or \"https\""
                ));
            }
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(format!("{raw:?} has no host"));
        }
        Ok(())
    }
}

/// Mackerel service and role names
///
/// 2 to 63 characters of `[A-Za-z0-9_-]`, starting with an alphanumeric.
#[derive(Debug, Clone, Copy)]
pub struct MackerelName {
    kind: &'static str,
}

impl MackerelName {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 63;
}

impl Validator for MackerelName {
    fn description(&self) -> String {
        format!(
            "{} name must be {}-{} characters of alphanumerics, '-' or '_', starting with an alphanumeric",
            self.kind,
            Self::MIN_LEN,
            Self::MAX_LEN
        )
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if skip(value) {
            return Ok(());
        }
        let name = expect_str(value)?;
        let len = name.chars().count();
        let mut chars = name.chars();
        let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if (Self::MIN_LEN..=Self::MAX_LEN).contains(&len) && first_ok && rest_ok {
            Ok(())
        } else {
            Err(format!("{name:?} is not a valid {} name: {}", self.kind, self.description()))
        }
    }
}

/// Accept one of a fixed set of strings
#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<String>,
}

impl Validator for OneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", quoted_list(&self.allowed))
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if skip(value) {
            return Ok(());
        }
        let s = expect_str(value)?;
        if self.allowed.iter().any(|a| a == s) {
            Ok(())
        } else {
            Err(format!("{s:?} is not allowed; {}", self.description()))
        }
    }
}

/// Accept strings whose length (in characters) lies in a closed range
#[derive(Debug, Clone, Copy)]
pub struct LengthBetween {
    min: usize,
    max: usize,
}

impl Validator for LengthBetween {
    fn description(&self) -> String {
        format!("string length must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if skip(value) {
            return Ok(());
        }
        let len = expect_str(value)?.chars().count();
        if (self.min..=self.max).contains(&len) {
            Ok(())
        } else {
            Err(format!("{}, got {len}", self.description()))
        }
    }
}

/// Accept collections with at least `min` elements
#[derive(Debug, Clone, Copy)]
pub struct SizeAtLeast {
    min: usize,
}

impl Validator for SizeAtLeast {
    fn description(&self) -> String {
        format!("set must contain at least {} elements", self.min)
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if skip(value) {
            return Ok(());
        }
        let items = value
            .as_list()
            .ok_or_else(|| format!("expected a set, got {}", value.type_label()))?;
        if items.len() >= self.min {
            Ok(())
        } else {
            Err(format!("{}, got {}", self.description(), items.len()))
        }
    }
}

/// Apply a validator to every element of a collection
#[derive(Debug, Clone)]
pub struct EachValue {
    inner: ValidatorRef,
}

impl Validator for EachValue {
    fn description(&self) -> String {
        format!("each element: {}", self.inner.description())
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if skip(value) {
            return Ok(());
        }
        let items = value
            .as_list()
            .ok_or_else(|| format!("expected a set, got {}", value.type_label()))?;
        items.iter().try_for_each(|item| self.inner.validate(item))
    }
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("{s:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn is_url_with_http_or_https() -> ValidatorRef {
    Arc::new(UrlWithHttpOrHttps)
}

pub fn service_name() -> ValidatorRef {
    Arc::new(MackerelName { kind: "service" })
}

pub fn role_name() -> ValidatorRef {
    Arc::new(MackerelName { kind: "role" })
}

pub fn one_of<I, S>(allowed: I) -> ValidatorRef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(OneOf {
        allowed: allowed.into_iter().map(Into::into).collect(),
    })
}

pub fn length_between(min: usize, max: usize) -> ValidatorRef {
    Arc::new(LengthBetween { min, max })
}

pub fn size_at_least(min: usize) -> ValidatorRef {
    Arc::new(SizeAtLeast { min })
}

pub fn each_value(inner: ValidatorRef) -> ValidatorRef {
    Arc::new(EachValue { inner })
}

/// Notification levels accepted by notification groups
pub const NOTIFICATION_LEVELS: [&str; 2] = ["all", "critical"];

/// Event kinds a channel can subscribe to
pub const CHANNEL_EVENTS: [&str; 6] = [
    "alert",
    "alertGroup",
    "hostStatus",
    "hostRegister",
    "hostRetire",
    "monitor",
];
