//! User-Agent classification.
//!
//! Parsing is delegated to woothee; its detailed names are then folded into
//! the small fixed label sets the click log stores.

use woothee::parser::Parser;

/// Label used when no known browser or OS matches.
pub const OTHER: &str = "Other";

fn browser_label(name: &str, ua: &str) -> &'static str {
    match name {
        // Older woothee data reports Chromium-based Edge as plain Chrome.
        "Chrome" if ["Edg/", "EdgA/", "EdgiOS/"].iter().any(|t| ua.contains(t)) => "Edge",
        "Chrome" => "Chrome",
        "Firefox" => "Firefox",
        "Safari" => "Safari",
        "Edge" => "Edge",
        "Opera" => "Opera",
        _ => OTHER,
    }
}

fn os_label(os: &str) -> &'static str {
    match os {
        os if os.starts_with("Windows") => "Windows",
        "Mac OSX" | "Mac OS X" | "macOS" => "macOS",
        "iPhone" | "iPad" | "iPod" | "iOS" => "iOS",
        "Android" => "Android",
        "Linux" => "Linux",
        _ => OTHER,
    }
}

/// Classifies a raw User-Agent into `(browser, os)`.
///
/// Never fails: missing, empty or unrecognized input yields `Other`.
pub fn parse_user_agent(user_agent: Option<&str>) -> (&'static str, &'static str) {
    let ua = match user_agent.map(str::trim) {
        Some(ua) if !ua.is_empty() => ua,
        _ => return (OTHER, OTHER),
    };

    match Parser::new().parse(ua) {
        Some(result) => (browser_label(&*result.name, ua), os_label(&*result.os)),
        None => (OTHER, OTHER),
    }
}
