use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "in", "a", "an", "and", "or", "of", "to",
];

/// Lowercased claim words with punctuation and stop words removed.
pub fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Score how strongly `haystack` covers the claim keywords.
///
/// More than half of the keywords present scores 1.0; otherwise at least three
/// present scores 0.8; anything else scores 0.
pub fn keyword_overlap_score(keywords: &HashSet<String>, haystack: &str) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = haystack.to_lowercase();
    let matches = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
    if matches as f32 / keywords.len() as f32 > 0.5 {
        1.0
    } else if matches >= 3 {
        0.8
    } else {
        0.0
    }
}

/// Jaccard similarity of the lowercase whitespace-separated word sets.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let a: HashSet<String> = a.to_lowercase().split_whitespace().map(str::to_string).collect();
    let b: HashSet<String> = b.to_lowercase().split_whitespace().map(str::to_string).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f32 / union as f32
}

/// "Andheri Bridge Collapse" -> "Andheri AND Bridge AND Collapse".
/// Words with any non-alphanumeric character are dropped.
pub fn boolean_and_query(claim: &str) -> String {
    claim
        .split_whitespace()
        .filter(|w| w.chars().all(char::is_alphanumeric))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// `"{query} site:a OR site:b"`.
pub fn site_restricted(query: &str, domains: &[String]) -> String {
    let sites = domains
        .iter()
        .map(|d| format!("site:{d}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{query} {sites}")
}
