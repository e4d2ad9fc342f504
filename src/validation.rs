//! Caller-side input policy.
//!
//! The store accepts any strings. These checks run in the tool adapter
//! before a store call, so a rejected request never touches the database.

use std::sync::OnceLock;

use regex::Regex;

use crate::protocol::McpErrorResponse;

pub const MAX_AGENT_LEN: usize = 100;
pub const MAX_FEATURE_LEN: usize = 100;
pub const MAX_BRANCH_LEN: usize = 200;
pub const MIN_SUMMARY_LEN: usize = 10;
pub const MAX_SUMMARY_LEN: usize = 10_000;

fn slug_pattern() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug regex is valid"))
}

/// True for lowercase, alphanumeric, hyphen-separated names like `user-auth`.
pub fn is_slug(value: &str) -> bool {
    slug_pattern().is_match(value)
}

pub fn feature(value: &str) -> Result<(), McpErrorResponse> {
    if value.chars().count() > MAX_FEATURE_LEN {
        return Err(McpErrorResponse::invalid_params(format!(
            "feature must be at most {MAX_FEATURE_LEN} characters"
        )));
    }
    if !is_slug(value) {
        return Err(McpErrorResponse::invalid_params(format!(
            "feature '{value}' must be a lowercase hyphenated slug such as 'user-auth'"
        )));
    }
    Ok(())
}

pub fn agent(value: &str) -> Result<(), McpErrorResponse> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(McpErrorResponse::invalid_params("agent must not be blank"));
    }
    if trimmed.chars().count() > MAX_AGENT_LEN {
        return Err(McpErrorResponse::invalid_params(format!(
            "agent must be at most {MAX_AGENT_LEN} characters"
        )));
    }
    Ok(())
}

pub fn summary(value: &str) -> Result<(), McpErrorResponse> {
    let len = value.trim().chars().count();
    if len < MIN_SUMMARY_LEN {
        return Err(McpErrorResponse::invalid_params(format!(
            "summary must be at least {MIN_SUMMARY_LEN} characters; describe what was done, e.g. 'CREATED POST /login - returns {{token}}'"
        )));
    }
    if len > MAX_SUMMARY_LEN {
        return Err(McpErrorResponse::invalid_params(format!(
            "summary must be at most {MAX_SUMMARY_LEN} characters"
        )));
    }
    Ok(())
}

pub fn branch(value: Option<&str>) -> Result<(), McpErrorResponse> {
    match value {
        Some(b) if b.trim().is_empty() => {
            Err(McpErrorResponse::invalid_params("branch must not be blank when given"))
        }
        Some(b) if b.chars().count() > MAX_BRANCH_LEN => Err(McpErrorResponse::invalid_params(
            format!("branch must be at most {MAX_BRANCH_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

pub fn id(value: &str) -> Result<(), McpErrorResponse> {
    if value.trim().is_empty() {
        return Err(McpErrorResponse::invalid_params("id must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::McpErrorCode;

    #[test]
    fn slugs() {
        for ok in ["user-auth", "payment-api", "v2", "a-b-c-1"] {
            assert!(is_slug(ok), "{ok} should be a slug");
        }
        for bad in ["User-Auth", "user_auth", "-auth", "auth-", "user--auth", "user auth", ""] {
            assert!(!is_slug(bad), "{bad:?} should not be a slug");
        }
    }

    #[test]
    fn short_summary_is_rejected_with_invalid_params() {
        let err = summary("   too  ").unwrap_err();
        assert_eq!(err.error.code, McpErrorCode::InvalidParams);
        assert!(summary("CREATED POST /login").is_ok());
    }

    #[test]
    fn blank_agent_and_branch_are_rejected() {
        assert!(agent("  ").is_err());
        assert!(agent("backend-agent").is_ok());
        assert!(branch(Some(" ")).is_err());
        assert!(branch(None).is_ok());
        assert!(branch(Some("feature/user-auth")).is_ok());
    }
}
