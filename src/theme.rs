//! Prompt theme tagging.
//!
//! Derives a coarse theme tag from a prompt with keyword heuristics, feeding
//! the "popular themes" analytics. First matching bucket wins; prompts that
//! match nothing tag as "general".

/// Theme buckets in priority order.
const THEMES: &[(&str, &[&str])] = &[
    (
        "fantasy",
        &["wizard", "magic", "dragon", "spell", "castle", "quest", "sword"],
    ),
    (
        "sci-fi",
        &["android", "robot", "space", "alien", "galaxy", "starship", "cyber"],
    ),
    (
        "adventure",
        &["pirate", "treasure", "voyage", "captain", "explore", "journey"],
    ),
    ("romance", &["love", "romance", "heart", "kiss"]),
    (
        "portrait",
        &["portrait", "face", "selfie", "appearance", "look like"],
    ),
    (
        "landscape",
        &["landscape", "sunset", "mountain", "forest", "ocean", "city"],
    ),
];

/// Tag used when no bucket matches.
pub const GENERAL: &str = "general";

/// Derive a theme tag from a prompt.
pub fn tag_prompt(prompt: &str) -> String {
    let lowered = prompt.to_lowercase();

    for (tag, keywords) in THEMES {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            return (*tag).to_string();
        }
    }

    GENERAL.to_string()
}
