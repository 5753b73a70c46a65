//! Filename templating for backup archives.
//!
//! A template is a filename pattern with `{{...}}` placeholders resolved at
//! archive-creation time. The same template also compiles into a regex that
//! recognizes filenames this tool produced earlier, which is how retention
//! and listing tell our archives apart from other files in the folder.

use crate::backup::result_error::result::Result;
use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::fmt::Display;
use std::fmt::Write as _;

/// Characters that are invalid in filenames on at least one supported OS.
static ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
static DEFAULT_TIME_FORMAT: &str = "%H%M%S";
static DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// One piece of a parsed template. Unrecognized placeholders are kept as
/// literals, they are never an error.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Vault,
    /// A date/time placeholder. `raw` spans the whole `{{...}}` so render
    /// can fall back to the verbatim text when the format cannot be applied.
    Stamp { format: &'a str, raw: &'a str },
}

fn classify<'a>(inner: &'a str, raw: &'a str) -> Option<Segment<'a>> {
    match inner {
        "vault" => return Some(Segment::Vault),
        "date" => {
            return Some(Segment::Stamp {
                format: DEFAULT_DATE_FORMAT,
                raw,
            })
        }
        "time" => {
            return Some(Segment::Stamp {
                format: DEFAULT_TIME_FORMAT,
                raw,
            })
        }
        "datetime" => {
            return Some(Segment::Stamp {
                format: DEFAULT_DATETIME_FORMAT,
                raw,
            })
        }
        _ => {}
    }

    for prefix in ["datetime:", "date:", "time:"] {
        if let Some(format) = inner.strip_prefix(prefix) {
            if !format.is_empty() {
                return Some(Segment::Stamp { format, raw });
            }
        }
    }

    None
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut segs = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}").map(|i| start + i) else {
            break;
        };
        let raw = &rest[start..end + 2];
        let inner = &rest[start + 2..end];
        match classify(inner, raw) {
            Some(seg) => {
                if start > 0 {
                    segs.push(Segment::Literal(&rest[..start]));
                }
                segs.push(seg);
            }
            None => segs.push(Segment::Literal(&rest[..end + 2])),
        }
        rest = &rest[end + 2..];
    }
    if !rest.is_empty() {
        segs.push(Segment::Literal(rest));
    }
    segs
}

/// Replaces characters that are invalid in filenames with `_`.
fn sanitize_filename(name: &str) -> String {
    name.replace(ILLEGAL_FILENAME_CHARS, "_")
}

/// Formats `now` with a strftime string. Returns None when the format string
/// itself is invalid, so the caller can leave the placeholder untouched.
fn format_instant<Tz: TimeZone>(now: &DateTime<Tz>, format: &str) -> Option<String>
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    match write!(out, "{}", now.format(format)) {
        Ok(()) => Some(out),
        Err(_) => None,
    }
}

/// Renders a backup filename (without the `.zip` extension) from a template.
///
/// Supported placeholders: `{{vault}}`, `{{date}}`, `{{time}}`,
/// `{{datetime}}`, and `{{date:FORMAT}}` / `{{time:FORMAT}}` /
/// `{{datetime:FORMAT}}` where FORMAT is a chrono strftime string.
/// Placeholders are replaced independently and may appear any number of
/// times; anything unrecognized is passed through verbatim.
pub fn render<Tz: TimeZone>(template: &str, vault_name: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::with_capacity(template.len());
    for seg in segments(template) {
        match seg {
            Segment::Literal(text) => out.push_str(text),
            Segment::Vault => out.push_str(&sanitize_filename(vault_name)),
            Segment::Stamp { format, raw } => match format_instant(now, format) {
                Some(formatted) => out.push_str(&formatted),
                None => {
                    tracing::warn!("Cannot apply date format in {raw:?}, keeping it verbatim");
                    out.push_str(raw);
                }
            },
        }
    }
    out
}

/// Compiles a template into a matcher for filenames previously produced by
/// [`render`] under the same template.
///
/// Date placeholders become generic wildcards rather than being parsed back
/// into dates: retention only needs to recognize "is this one of ours",
/// timestamps come from file metadata. The matcher is anchored and requires
/// the literal `.zip` extension, partial matches and trailing content fail.
pub fn compile(template: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    for seg in segments(template) {
        match seg {
            Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
            Segment::Vault => pattern.push_str(r#"[^<>:"/\\|?*]+"#),
            Segment::Stamp { .. } => pattern.push_str(".+?"),
        }
    }
    pattern.push_str(r"\.zip$");
    Ok(Regex::new(&pattern)?)
}
