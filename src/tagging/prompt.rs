//! Prompt and response schema for tag generation.

use super::categories::{quota_for, TagCategory, TaggingConfig};
use crate::enrichment::Enrichment;
use crate::library_xml::TrackAttributes;
use serde_json::{json, Value};
use std::fmt::Write;

/// Recognized attributes offered to the service, with their prompt labels.
const CONTEXT_FIELDS: &[(&str, &str)] = &[
    ("Name", "Title"),
    ("Artist", "Artist"),
    ("Genre", "Genre"),
    ("Label", "Label"),
    ("Year", "Year"),
    ("AverageBpm", "BPM"),
    ("Tonality", "Key"),
    ("Grouping", "Grouping"),
    ("Comments", "Comments"),
    ("TrackID", "Track ID"),
    ("Location", "Location"),
];

fn describe(category: TagCategory) -> &'static str {
    match category {
        TagCategory::PrimaryGenre => "the single main genre",
        TagCategory::SubGenre => "more specific sub-genres or styles",
        TagCategory::EnergyVibe => "energy level, mood and vibe",
        TagCategory::SituationEnvironment => "where or when in a set the track works",
        TagCategory::Components => "notable musical components such as vocals or instruments",
        TagCategory::TimePeriod => "the era the track sounds like",
    }
}

/// Build the single user prompt for one track.
pub fn build_prompt(
    track: &TrackAttributes,
    enrichment: &Enrichment,
    config: &TaggingConfig,
) -> String {
    let mut prompt = String::from(
        "You are an expert DJ and music librarian. Generate descriptive tags for the track below.\n\n",
    );

    prompt.push_str("Track:\n");
    for (attribute, label) in CONTEXT_FIELDS {
        if let Some(value) = track.metadata.get(attribute).filter(|v| !v.trim().is_empty()) {
            let _ = writeln!(prompt, "- {}: {}", label, value);
        }
    }
    if let Some(legacy) = track.legacy_tags.as_deref().filter(|t| !t.is_empty()) {
        let _ = writeln!(prompt, "- Existing tags: {}", legacy);
    }

    if !enrichment.is_empty() {
        let context = serde_json::to_string_pretty(enrichment).unwrap_or_default();
        let _ = write!(
            prompt,
            "\nAdditional metadata from the lookup service (JSON):\n{}\n",
            context
        );
    }

    prompt.push_str(
        "\nRespond with a single JSON object with exactly these keys, each mapping to an array of strings:\n",
    );
    for category in TagCategory::ALL {
        let quota = quota_for(category, config);
        let _ = writeln!(
            prompt,
            "- \"{}\": at most {} {} ({})",
            category.key(),
            quota,
            if quota == 1 { "tag" } else { "tags" },
            describe(category)
        );
    }

    let optional: Vec<String> = TagCategory::ALL
        .iter()
        .filter(|c| c.is_optional())
        .map(|c| format!("\"{}\"", c.key()))
        .collect();
    let _ = write!(
        prompt,
        "\nProvide fewer tags than the maximum when there is not enough relevant content. \
         Keep every tag concise and lowercase. \
         Leave {} as empty arrays unless they are genuinely relevant. \
         Do not add any other keys or any text outside the JSON object.\n",
        optional.join(" and ")
    );

    prompt
}

/// JSON schema bounding every category array by its quota.
pub fn response_schema(config: &TaggingConfig) -> Value {
    let properties: serde_json::Map<String, Value> = TagCategory::ALL
        .iter()
        .map(|category| {
            (
                category.key().to_string(),
                json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "maxItems": quota_for(*category, config),
                }),
            )
        })
        .collect();
    let required: Vec<&str> = TagCategory::ALL.iter().map(|c| c.key()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}
