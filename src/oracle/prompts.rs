//! Prompt templates and answer parsing for the three oracle requests

use crate::error::LadderError;

/// Ask for the title of a freshly reached level
pub fn level_title_prompt(topic_title: &str, level: u32) -> String {
    format!(
        "Provide a suitable name for level {} of the topic \"{}\". \
         Answer with the name only, without quotes or explanation.",
        level, topic_title
    )
}

/// Ask for the subtopics of a level, excluding anything already supplied
pub fn related_topics_prompt(
    topic_title: &str,
    level: u32,
    level_title: &str,
    count: usize,
    already_supplied: &[String],
) -> String {
    let mut prompt = format!(
        "Provide {} topics related to level {} (\"{}\") of {}, distinct from topics already supplied.",
        count, level, level_title, topic_title
    );
    if !already_supplied.is_empty() {
        prompt.push_str(&format!(" Already supplied: {}.", already_supplied.join("; ")));
    }
    prompt.push_str(" Answer with a single comma-separated list and nothing else.");
    prompt
}

/// Ask for the teaching content of one subtopic
pub fn content_prompt(
    subtopic: &str,
    topic_title: &str,
    min_chars: usize,
    covered: &[String],
) -> String {
    let mut prompt = format!(
        "Produce detailed educational content of at least {} characters about {} (part of {}). \
         Tie it to the material of the official certifications for this field and format it as \
         HTML ready for direct display.",
        min_chars, subtopic, topic_title
    );
    if !covered.is_empty() {
        prompt.push_str(&format!(
            " Do not repeat these previously covered subtopics: {}.",
            covered.join("; ")
        ));
    }
    prompt
}

/// Split a related-topics answer into subtopic names.
///
/// Entries are separated by commas and trimmed; empty entries are dropped.
/// Everything else is kept verbatim, duplicates included.
pub fn parse_subtopic_list(answer: &str) -> Result<Vec<String>, LadderError> {
    let entries: Vec<String> = answer
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        return Err(LadderError::MalformedList {
            answer: crate::truncate_safe(answer, 200),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_comma_list() {
        let list = parse_subtopic_list("X, Y, Z, W, V").unwrap();
        assert_eq!(list, vec!["X", "Y", "Z", "W", "V"]);
    }

    #[test]
    fn test_parse_drops_empty_entries() {
        let list = parse_subtopic_list(" Recon ,, ,Exploitation,").unwrap();
        assert_eq!(list, vec!["Recon", "Exploitation"]);
    }

    #[test]
    fn test_parse_keeps_duplicates() {
        let list = parse_subtopic_list("Nmap, Nmap, Burp").unwrap();
        assert_eq!(list, vec!["Nmap", "Nmap", "Burp"]);
    }

    #[test]
    fn test_parse_keeps_punctuation_verbatim() {
        let answer = "Kerberos 'Golden Ticket', \"Pass-the-Hash\" attacks, Node.js.";
        let list = parse_subtopic_list(answer).unwrap();
        assert_eq!(list, vec!["Kerberos 'Golden Ticket'", "\"Pass-the-Hash\" attacks", "Node.js."]);
    }

    #[test]
    fn test_parse_does_not_strip_list_markers() {
        let list = parse_subtopic_list("- Recon, 1. Scanning").unwrap();
        assert_eq!(list, vec!["- Recon", "1. Scanning"]);
    }

    #[test]
    fn test_parse_leaves_leading_numbers_in_names() {
        let list = parse_subtopic_list("3D printing risks, 802.1X").unwrap();
        assert_eq!(list, vec!["3D printing risks", "802.1X"]);
    }

    #[test]
    fn test_parse_empty_is_malformed() {
        for answer in ["", "   ", ", ,\n,"] {
            let err = parse_subtopic_list(answer).unwrap_err();
            assert_eq!(err.kind(), "MalformedList", "answer {answer:?}");
        }
    }

    #[test]
    fn test_prompts_mention_subjects() {
        let p = level_title_prompt("Pentesting", 3);
        assert!(p.contains("level 3") && p.contains("Pentesting"));

        let p = related_topics_prompt("Pentesting", 1, "Fundamentals", 5, &["Nmap".to_string()]);
        assert!(p.contains("Provide 5 topics"));
        assert!(p.contains("Already supplied: Nmap"));

        let p = content_prompt("Nmap", "Pentesting", 300, &[]);
        assert!(p.contains("at least 300 characters about Nmap"));
        assert!(!p.contains("previously covered"));
    }
}
