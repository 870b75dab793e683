//! Pulls submission source out of a rendered detail page
//!
//! The source is not served by the query API. The detail page injects it
//! with client-side script as a string literal assigned to `submissionCode`,
//! with non-ASCII characters written as `\uXXXX` escapes.

use crate::browser::{render_and_get_markup, Browser, BrowserResult};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

// Hard-coded and known-valid, so compilation cannot fail.
static SUBMISSION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(
        || match Regex::new(r"(?s)submissionCode: '(?P<code>.*)',\n  editCodeUrl") {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern"),
        },
    );

/// Outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceExtraction {
    /// Unescaped source bytes
    Found(Vec<u8>),
    /// The page rendered but did not carry a source literal
    NotFound,
    /// The readiness marker never appeared
    TimedOut,
}

/// Renders `detail_url` and extracts the submission source from it
///
/// Neither a timeout nor a missing literal is an error; only browser
/// failures are.
pub async fn extract_source<B: Browser + ?Sized>(
    browser: &mut B,
    detail_url: &str,
    ready_selector: &str,
    timeout: Duration,
) -> BrowserResult<SourceExtraction> {
    let page = render_and_get_markup(browser, detail_url, ready_selector, timeout).await?;
    if !page.ready {
        return Ok(SourceExtraction::TimedOut);
    }

    match extract_submission_code(&page.markup) {
        Some(code) => Ok(SourceExtraction::Found(unescape_unicode(code).into_bytes())),
        None => Ok(SourceExtraction::NotFound),
    }
}

/// Finds the escaped source literal in page markup
///
/// An empty literal counts as absent.
pub fn extract_submission_code(markup: &str) -> Option<&str> {
    SUBMISSION_CODE_RE
        .captures(markup)
        .and_then(|caps| caps.name("code"))
        .map(|m| m.as_str())
        .filter(|code| !code.is_empty())
}

/// Decodes `\uXXXX` escapes, leaving everything else untouched
///
/// Surrogate pairs combine into one character. Lone surrogates and
/// malformed escapes stay in the output as written.
pub fn unescape_unicode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let escape = &rest[pos..];
        match decode_escape(escape) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &escape[consumed..];
            }
            None => {
                out.push_str("\\u");
                rest = &escape[2..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decodes the escape at the start of `s`, returning the character and the
/// number of bytes it spans
fn decode_escape(s: &str) -> Option<(char, usize)> {
    let unit = code_unit(s)?;
    match unit {
        0xD800..=0xDBFF => {
            let low = code_unit(s.get(6..)?)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return None;
            }
            let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            char::from_u32(combined).map(|ch| (ch, 12))
        }
        0xDC00..=0xDFFF => None,
        _ => char::from_u32(unit).map(|ch| (ch, 6)),
    }
}

/// Reads one `\uXXXX` code unit
fn code_unit(s: &str) -> Option<u32> {
    let digits = s.strip_prefix("\\u")?.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
