//! Writing DJ library interchange documents.

use super::models::OriginalMetadata;
use crate::tagging::CategorizedTags;
use std::borrow::Cow;
use std::fmt::Write;

const GROUPING_SEPARATOR: &str = " | ";
const COMMENTS_PREFIX: &str = "Generated Tags: ";

/// Overlay generated tags onto a snapshot.
///
/// Grouping gets the flat tag list appended (or set, when it was empty) and
/// Comments independently gets `Generated Tags: <list>`. No tags means the
/// snapshot comes back unchanged.
pub fn merge_generated_tags(original: &OriginalMetadata, tags: &CategorizedTags) -> OriginalMetadata {
    let mut merged = original.clone();
    let tag_list = tags.flat_list();
    if tag_list.is_empty() {
        return merged;
    }

    merged.grouping = Some(append_or_set(original.grouping.as_deref(), &tag_list));
    merged.comments = Some(append_or_set(
        original.comments.as_deref(),
        &format!("{}{}", COMMENTS_PREFIX, tag_list),
    ));
    merged
}

fn append_or_set(original: Option<&str>, addition: &str) -> String {
    match original {
        Some(existing) if !existing.is_empty() => {
            format!("{}{}{}", existing, GROUPING_SEPARATOR, addition)
        }
        _ => addition.to_string(),
    }
}

/// Escape a value for use inside a double-quoted attribute.
///
/// Whitespace control characters are written as character references since
/// XML parsers normalize literal ones to spaces.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\n' | '\r' | '\t'))
    {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 16);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Render a complete library document holding `tracks` in the given order.
pub fn write_library<'a, I>(tracks: I) -> String
where
    I: IntoIterator<Item = &'a OriginalMetadata>,
{
    let tracks: Vec<&OriginalMetadata> = tracks.into_iter().collect();

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<DJ_PLAYLISTS Version=\"1.0.0\">\n");
    let _ = writeln!(
        out,
        "  <PRODUCT Name=\"{}\" Version=\"{}\" Company=\"\"/>",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out, "  <COLLECTION Entries=\"{}\">", tracks.len());
    for track in tracks {
        out.push_str("    <TRACK");
        for (key, value) in track.attributes() {
            let _ = write!(out, " {}=\"{}\"", key, escape_attribute(value));
        }
        out.push_str("/>\n");
    }
    out.push_str("  </COLLECTION>\n");
    out.push_str("</DJ_PLAYLISTS>\n");
    out
}
