//! Ranking prompt assembly.
//!
//! The field names in the closing schema line are what
//! [`parse_ranked`](super::recovery::parse_ranked) deserializes, so the two
//! change together.

use crate::models::JobRecord;

/// Characters of each description included in the prompt.
pub const DESCRIPTION_EXCERPT_CHARS: usize = 800;

pub const RESPONSE_SCHEMA: &str =
    r#"[{"job_index": <0-based index>, "match_score": <0-100>, "summary": "<explanation>"}, ...]"#;

/// Serialize the profile and the job batch into a single instruction.
///
/// Jobs and descriptions are paired by position.
pub fn build_prompt(
    cv: &str,
    cover_letter: Option<&str>,
    jobs: &[JobRecord],
    descriptions: &[String],
) -> String {
    let mut lines: Vec<String> = vec![
        "Here is my CV:".to_string(),
        "---".to_string(),
        cv.to_string(),
        "---".to_string(),
        String::new(),
    ];

    if let Some(cover_letter) = cover_letter.filter(|c| !c.is_empty()) {
        lines.extend([
            "Here is my cover letter (context on what I am looking for):".to_string(),
            "---".to_string(),
            cover_letter.to_string(),
            "---".to_string(),
            String::new(),
        ]);
    }

    lines.extend([
        format!(
            "Analyze the following {} job postings and rank them by how well they fit my profile.",
            jobs.len()
        ),
        "For each posting, give:".to_string(),
        "  1. A match score from 0 to 100".to_string(),
        "  2. A short explanation of at most 1 sentence on why the posting fits (or does not fit)"
            .to_string(),
        String::new(),
        "Postings:".to_string(),
    ]);

    for (i, (job, description)) in jobs.iter().zip(descriptions).enumerate() {
        lines.push(format!(
            "\n[{i}] {} – {} ({})",
            job.title, job.employer, job.location
        ));
        if !description.is_empty() {
            lines.push(excerpt(description, DESCRIPTION_EXCERPT_CHARS).to_string());
        }
        lines.push("---".to_string());
    }

    lines.extend([
        String::new(),
        "Return ONLY a JSON array sorted from best to worst match, with no other text:".to_string(),
        RESPONSE_SCHEMA.to_string(),
    ]);

    lines.join("\n")
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
