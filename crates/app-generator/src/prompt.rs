use crate::types::Attachment;

pub const SYSTEM_PROMPT: &str = "You are a professional front-end engineer. \
Generate ONLY the final code outputs, with no reasoning, markdown wrappers or commentary. \
Produce exactly two files:\n\
1. index.html (fully functional, responsive, inline CSS/JS, no external imports)\n\
2. README.md (concise project summary + MIT License)";

const OUTPUT_RULES: &str = "Return ONLY the valid index.html and README.md file contents. \
Start index.html with <!DOCTYPE html> and end with </html>. \
Start README.md with # ProjectName and include an MIT License section.";

/// User-facing prompt for one brief. With `inline`, data-URL attachments
/// travel as separate request parts and are only named here.
pub fn user_prompt(brief: &str, attachments: &[Attachment], inline: bool) -> String {
    let mut out = format!("Brief: {}", brief.trim());
    if !attachments.is_empty() {
        out.push_str("\n\nAttachments to consider:\n");
        for att in attachments {
            if att.data_url().is_none() {
                out.push_str(&format!("- {}: {}\n", att.label(), att.url()));
            } else if inline {
                out.push_str(&format!("- {} (provided inline)\n", att.label()));
            } else {
                out.push_str(&format!("- {} (content not available)\n", att.label()));
            }
        }
    }
    out.push_str("\n\n");
    out.push_str(OUTPUT_RULES);
    out
}

/// Single-message form for providers without a system role.
pub fn combined_prompt(brief: &str, attachments: &[Attachment], inline: bool) -> String {
    format!("{SYSTEM_PROMPT}\n\n{}", user_prompt(brief, attachments, inline))
}
