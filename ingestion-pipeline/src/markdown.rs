//! Heading structure extraction for markdown book sources. Chapter is the
//! first H1, section the first H2; the heading path is the deepest
//! H1/H2/H3 hierarchy seen in the document.

/// Strips a leading YAML frontmatter block (`--- ... ---`).
pub fn strip_frontmatter(content: &str) -> &str {
    let trimmed = content.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed.strip_prefix("---") else {
        return content;
    };

    match rest.find("\n---") {
        Some(end) => {
            let after = &rest[end + 4..];
            after.strip_prefix('\n').unwrap_or(after)
        }
        None => content,
    }
}

fn heading_line(line: &str) -> Option<(usize, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    let text = rest.strip_prefix(' ')?.trim();
    (!text.is_empty()).then_some((hashes, text))
}

/// First H1 and first H2 of the document.
pub fn extract_chapter_and_section(content: &str) -> (Option<String>, Option<String>) {
    let mut chapter = None;
    let mut section = None;

    for line in content.lines() {
        match heading_line(line) {
            Some((1, text)) if chapter.is_none() => chapter = Some(text.to_string()),
            Some((2, text)) if section.is_none() => section = Some(text.to_string()),
            _ => {}
        }
        if chapter.is_some() && section.is_some() {
            break;
        }
    }

    (chapter, section)
}

/// Final H1 → H2 → H3 hierarchy of the document, lower levels resetting
/// whenever a higher one appears.
pub fn heading_path(content: &str) -> Vec<String> {
    let mut h1 = None;
    let mut h2 = None;
    let mut h3 = None;

    for line in content.lines() {
        match heading_line(line) {
            Some((1, text)) => {
                h1 = Some(text.to_string());
                h2 = None;
                h3 = None;
            }
            Some((2, text)) => {
                h2 = Some(text.to_string());
                h3 = None;
            }
            Some((3, text)) => h3 = Some(text.to_string()),
            _ => {}
        }
    }

    [h1, h2, h3].into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntitle: Chapter 1\nsidebar_position: 1\n---\n\
                       # Chapter 1: Foundations\n\nIntro text.\n\n\
                       ## Getting Started\n\nBody.\n\n### Installing\n\nMore.\n";

    #[test]
    fn test_strip_frontmatter() {
        let stripped = strip_frontmatter(DOC);
        assert!(stripped.starts_with("# Chapter 1: Foundations"));

        // Documents without frontmatter pass through untouched.
        let plain = "# Title\n\nBody.";
        assert_eq!(strip_frontmatter(plain), plain);
    }

    #[test]
    fn test_extract_chapter_and_section() {
        let (chapter, section) = extract_chapter_and_section(strip_frontmatter(DOC));
        assert_eq!(chapter.as_deref(), Some("Chapter 1: Foundations"));
        assert_eq!(section.as_deref(), Some("Getting Started"));
    }

    #[test]
    fn test_missing_headings() {
        let (chapter, section) = extract_chapter_and_section("plain prose, no headings");
        assert!(chapter.is_none());
        assert!(section.is_none());
    }

    #[test]
    fn test_heading_path_resets_lower_levels() {
        let content = "# One\n## A\n### deep\n## B\n";
        assert_eq!(heading_path(content), vec!["One", "B"]);
    }

    #[test]
    fn test_hash_without_space_is_not_heading() {
        let (chapter, _) = extract_chapter_and_section("#hashtag\n# Real Heading\n");
        assert_eq!(chapter.as_deref(), Some("Real Heading"));
    }
}
