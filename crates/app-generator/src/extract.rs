//! Splitting raw model output into `index.html` and `README.md`.
//!
//! The HTML runs from the first document-start marker to the last
//! `</html>`. A README is only taken from text after that last `</html>`,
//! and only if it opens with a heading.

use crate::error::{GeneratorError, Result};

const DOCTYPE: &str = "<!doctype html";
const HTML_OPEN: &str = "<html";
const HTML_CLOSE: &str = "</html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub html: String,
    pub readme: String,
}

pub fn default_readme() -> String {
    "# Auto-Generated App\n\n\
     This project was generated automatically using an AI-based builder.\n\n\
     ## Features\n\n\
     - Responsive design\n\
     - Built with HTML, CSS, and JavaScript\n\n\
     ## License\n\n\
     MIT License\n"
        .to_string()
}

pub fn extract(raw: &str) -> Result<Extracted> {
    // ASCII lowering keeps byte offsets aligned with `raw`.
    let lower = raw.to_ascii_lowercase();
    let start = lower
        .find(DOCTYPE)
        .or_else(|| lower.find(HTML_OPEN))
        .ok_or_else(|| GeneratorError::Extract("no <!DOCTYPE html> or <html> marker".into()))?;

    let end = lower
        .rfind(HTML_CLOSE)
        .filter(|&i| i >= start)
        .map(|i| i + HTML_CLOSE.len());

    let (html, tail) = match end {
        Some(end) => (raw[start..end].trim().to_string(), &raw[end..]),
        None => (format!("{}\n{HTML_CLOSE}", raw[start..].trim()), ""),
    };

    let candidate = strip_fences(tail);
    let readme = if candidate.starts_with('#') {
        candidate
    } else {
        default_readme()
    };

    Ok(Extracted {
        html,
        readme: ensure_license(readme),
    })
}

fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn ensure_license(readme: String) -> String {
    if readme.to_ascii_lowercase().contains("license") {
        readme
    } else {
        format!("{}\n\n## License\n\nMIT License\n", readme.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_html_and_trailing_readme() {
        let raw = "Sure! Here you go:\n<!DOCTYPE html>\n<html><body>hi</body></html>\n\n# Quiz\n\nA quiz.\n\n## License\nMIT";
        let out = extract(raw).unwrap();
        assert_eq!(out.html, "<!DOCTYPE html>\n<html><body>hi</body></html>");
        assert!(out.readme.starts_with("# Quiz"));
        assert!(!out.readme.contains("MIT License\n"));
    }

    #[test]
    fn strips_code_fences() {
        let raw = "```html\n<!DOCTYPE html><html></html>\n```\n\n```markdown\n# Counter\n\nCounts.\n```";
        let out = extract(raw).unwrap();
        assert_eq!(out.html, "<!DOCTYPE html><html></html>");
        assert!(out.readme.starts_with("# Counter\n\nCounts."));
        assert!(out.readme.ends_with("## License\n\nMIT License\n"));
        assert!(!out.readme.contains("```"));
    }

    #[test]
    fn heading_inside_html_is_not_a_readme() {
        let raw = "<html><body><script>// # not a heading</script></body></html>\nThanks!";
        let out = extract(raw).unwrap();
        assert_eq!(out.readme, default_readme());
    }

    #[test]
    fn last_close_tag_wins() {
        let raw = "<html><body><pre>&lt;/html&gt; </html> inline</pre></body></html>";
        let out = extract(raw).unwrap();
        assert!(out.html.ends_with("</pre></body></html>"));
    }

    #[test]
    fn missing_close_tag_is_appended() {
        let out = extract("<!DOCTYPE html>\n<html><body>cut off").unwrap();
        assert!(out.html.ends_with("cut off\n</html>"));
        assert_eq!(out.readme, default_readme());
    }

    #[test]
    fn bare_html_open_marker() {
        let out = extract("<html lang=\"en\"></html>").unwrap();
        assert_eq!(out.html, "<html lang=\"en\"></html>");
    }

    #[test]
    fn no_start_marker_is_an_error() {
        assert!(matches!(
            extract("I cannot help with that."),
            Err(GeneratorError::Extract(_))
        ));
    }
}
