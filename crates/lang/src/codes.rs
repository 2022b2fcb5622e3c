//! Supported language codes and their display names.

use crate::error::{ErrorKind, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Map of supported language codes to English display names.
static LANGUAGES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("auto", "Auto Detect"),
        ("ko", "Korean"),
        ("en", "English"),
        ("zh", "Chinese"),
        ("zh-cn", "Chinese (Simplified)"),
        ("zh-tw", "Chinese (Traditional)"),
        ("ja", "Japanese"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("ru", "Russian"),
        ("pt", "Portuguese"),
        ("it", "Italian"),
        ("vi", "Vietnamese"),
        ("th", "Thai"),
        ("ar", "Arabic"),
        ("hi", "Hindi"),
        ("id", "Indonesian"),
        ("nl", "Dutch"),
        ("pl", "Polish"),
        ("tr", "Turkish"),
        ("uk", "Ukrainian"),
        ("sv", "Swedish"),
        ("cs", "Czech"),
        ("da", "Danish"),
        ("fi", "Finnish"),
        ("el", "Greek"),
        ("hu", "Hungarian"),
        ("no", "Norwegian"),
        ("ro", "Romanian"),
        ("bg", "Bulgarian"),
        ("hr", "Croatian"),
        ("sk", "Slovak"),
        ("sl", "Slovenian"),
        ("lt", "Lithuanian"),
        ("lv", "Latvian"),
        ("et", "Estonian"),
        ("ms", "Malay"),
        ("tl", "Filipino"),
        ("bn", "Bengali"),
        ("ta", "Tamil"),
        ("te", "Telugu"),
        ("mr", "Marathi"),
        ("ur", "Urdu"),
        ("fa", "Persian"),
        ("he", "Hebrew"),
        ("sw", "Swahili"),
        ("af", "Afrikaans"),
    ])
});

/// Country codes that people commonly type in place of a language code.
static CORRECTIONS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("kr", "ko"),
        ("jp", "ja"),
        ("cn", "zh"),
        ("tw", "zh-tw"),
        ("gb", "en"),
        ("us", "en"),
        ("br", "pt"),
        ("mx", "es"),
    ])
});

/// Languages rendered with CJK typography.
pub const CJK_LANGUAGES: [&str; 5] = ["ko", "ja", "zh", "zh-cn", "zh-tw"];

/// Returns the English display name for a supported language code.
///
/// # Examples
///
/// ```
/// use verso_lang::codes;
/// assert_eq!(codes::name("ko"), Some("Korean"));
/// assert_eq!(codes::name("xx"), None);
/// ```
pub fn name(code: &str) -> Option<&'static str> {
    LANGUAGES.get(code).copied()
}

/// Human-readable label, `code (Name)` when the code is known.
pub fn label(code: &str) -> String {
    match name(code) {
        Some(name) => format!("{code} ({name})"),
        None => code.to_string(),
    }
}

/// Returns `true` if `code` is typeset as CJK.
pub fn is_cjk(code: &str) -> bool {
    CJK_LANGUAGES.contains(&code.to_ascii_lowercase().as_str())
}

/// Validate and normalize (lowercase) a language code.
///
/// `auto` is accepted as-is; use [`validate_target`] for target languages.
pub fn validate(code: &str) -> Result<String> {
    if code == "auto" {
        return Ok(code.to_string());
    }
    let lower = code.to_ascii_lowercase();
    if LANGUAGES.contains_key(lower.as_str()) {
        return Ok(lower);
    }
    if let Some(&suggestion) = CORRECTIONS.get(lower.as_str()) {
        exn::bail!(ErrorKind::CountryCode {
            given: code.to_string(),
            suggestion,
            name: name(suggestion).unwrap_or(suggestion),
        });
    }
    exn::bail!(ErrorKind::Unsupported(code.to_string()))
}

/// Validate a target language code, which may not be `auto`.
pub fn validate_target(code: &str) -> Result<String> {
    let code = validate(code)?;
    if code == "auto" {
        exn::bail!(ErrorKind::AutoTarget);
    }
    Ok(code)
}
