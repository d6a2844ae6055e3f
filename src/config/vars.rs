//! Environment variable interpolation for config files.
//!
//! Supported syntax:
//! - `${VAR}` - substitute with the env var value, error if unset
//! - `${VAR:-default}` - use the default if VAR is unset or empty
//! - `$$` - escape sequence for a literal `$`

use std::env;
use std::sync::LazyLock;

use regex::Regex;

/// Matches `$$`, `${VAR}` and `${VAR:-default}`.
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # escape sequence
        |
        \$\{
            ([A-Za-z_][A-Za-z0-9_]*)   # variable name (group 1)
            (?:
                :-
                ([^}]*)                # default value (group 2)
            )?
        \}
        ",
    )
    .expect("Invalid regex pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Errors encountered, accumulated so the user sees all missing
    /// variables at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in the given text.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap().as_str();
            if full_match == "$$" {
                return "$".to_string();
            }

            let var_name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let default_value = caps.get(2).map(|m| m.as_str());

            match env::var(var_name) {
                Ok(value) if value.is_empty() && default_value.is_some() => {
                    default_value.unwrap_or("").to_string()
                }
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(format!("environment variable '{var_name}' is not set"));
                        full_match.to_string()
                    }
                },
            }
        })
        .to_string();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braced_variable() {
        // SAFETY: tests in this module use distinct variable names
        unsafe { env::set_var("BIGSITEMAP_TEST_BASE", "https://example.com") };
        let result = interpolate("base_url: ${BIGSITEMAP_TEST_BASE}");
        assert!(result.is_ok());
        assert_eq!(result.text, "base_url: https://example.com");
    }

    #[test]
    fn test_default_applies_when_unset() {
        let result = interpolate("path: ${BIGSITEMAP_TEST_UNSET:-sitemaps}");
        assert!(result.is_ok());
        assert_eq!(result.text, "path: sitemaps");
    }

    #[test]
    fn test_missing_variable_is_error() {
        let result = interpolate("base_url: ${BIGSITEMAP_TEST_MISSING}");
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("BIGSITEMAP_TEST_MISSING"));
    }

    #[test]
    fn test_escape_sequence() {
        let result = interpolate("literal $$ dollar");
        assert!(result.is_ok());
        assert_eq!(result.text, "literal $ dollar");
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        let result = interpolate("${BIGSITEMAP_TEST_A} and ${BIGSITEMAP_TEST_B}");
        assert_eq!(result.errors.len(), 2);
    }
}
