#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{error::ErrorKind, provider::ProviderKind};

/// A single classification rule: a case-insensitive substring to look for in
/// the vendor diagnostic, and the kind to classify the failure as.
struct Rule {
    /// Substring matched case-insensitively against the diagnostic message.
    needle: &'static str,
    /// Kind assigned when the substring is present.
    kind:   ErrorKind,
}

/// Shorthand for building a rule table entry.
const fn rule(needle: &'static str, kind: ErrorKind) -> Rule {
    Rule { needle, kind }
}

/// Message signatures emitted by the Gemini API. Entries are checked in order,
/// so quota signatures come first.
const GEMINI_RULES: &[Rule] = &[
    rule("RESOURCE_EXHAUSTED", ErrorKind::QuotaExceeded),
    rule("quota", ErrorKind::QuotaExceeded),
    rule("rate limit", ErrorKind::QuotaExceeded),
    rule("API key not valid", ErrorKind::AuthFailure),
    rule("API_KEY_INVALID", ErrorKind::AuthFailure),
    rule("PERMISSION_DENIED", ErrorKind::AuthFailure),
    rule("UNAVAILABLE", ErrorKind::TransientNetwork),
    rule("DEADLINE_EXCEEDED", ErrorKind::TransientNetwork),
    rule("INTERNAL", ErrorKind::TransientNetwork),
];

/// Message signatures emitted by the Anthropic API.
const ANTHROPIC_RULES: &[Rule] = &[
    rule("rate_limit_error", ErrorKind::QuotaExceeded),
    rule("rate limit", ErrorKind::QuotaExceeded),
    rule("credit balance", ErrorKind::QuotaExceeded),
    rule("quota", ErrorKind::QuotaExceeded),
    rule("authentication_error", ErrorKind::AuthFailure),
    rule("permission_error", ErrorKind::AuthFailure),
    rule("invalid x-api-key", ErrorKind::AuthFailure),
    rule("overloaded_error", ErrorKind::TransientNetwork),
    rule("api_error", ErrorKind::TransientNetwork),
];

/// Message signatures emitted by the OpenAI API.
const OPENAI_RULES: &[Rule] = &[
    rule("insufficient_quota", ErrorKind::QuotaExceeded),
    rule("rate_limit_exceeded", ErrorKind::QuotaExceeded),
    rule("rate limit", ErrorKind::QuotaExceeded),
    rule("quota", ErrorKind::QuotaExceeded),
    rule("invalid_api_key", ErrorKind::AuthFailure),
    rule("incorrect api key", ErrorKind::AuthFailure),
    rule("invalid_request_error: unauthorized", ErrorKind::AuthFailure),
    rule("server_error", ErrorKind::TransientNetwork),
    rule("overloaded", ErrorKind::TransientNetwork),
];

/// Returns the rule table for the given vendor.
fn rules_for(provider: ProviderKind) -> &'static [Rule] {
    match provider {
        ProviderKind::Gemini => GEMINI_RULES,
        ProviderKind::Anthropic => ANTHROPIC_RULES,
        ProviderKind::OpenAi => OPENAI_RULES,
    }
}

/// Maps an HTTP status code to an error kind, independent of vendor.
fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        429 => Some(ErrorKind::QuotaExceeded),
        401 | 403 => Some(ErrorKind::AuthFailure),
        500..=599 => Some(ErrorKind::TransientNetwork),
        _ => None,
    }
}

/// Classifies a failed provider call from its HTTP status (when one was
/// received) and the vendor diagnostic message.
///
/// The HTTP status is authoritative when it maps to a kind; the per-vendor
/// message rules cover failures that arrive without a usable status (SDK
/// errors, bodies wrapped in 200s, transport-level messages). Quota rules are
/// listed first in every table: an exhausted provider must never come back as
/// `Unclassified`, or the orchestrator would keep probing it.
pub fn classify(provider: ProviderKind, status: Option<u16>, message: &str) -> ErrorKind {
    if let Some(kind) = status.and_then(classify_status) {
        return kind;
    }

    let haystack = message.to_ascii_lowercase();
    for rule in rules_for(provider) {
        if haystack.contains(&rule.needle.to_ascii_lowercase()) {
            return rule.kind;
        }
    }

    ErrorKind::Unclassified
}

/// Classifies a transport-level `reqwest` failure (no HTTP response was
/// received, or the body could not be read).
pub fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::TransientNetwork
    } else {
        ErrorKind::Unclassified
    }
}
