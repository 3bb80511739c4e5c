//! Marker-delimited rule blocks inside a shared rules file.
//!
//! A block is `START` marker line, the rule content without trailing
//! newlines, `END` marker line. Deploying then undeploying a rule leaves the
//! surrounding text byte-identical, whatever its trailing whitespace.

use regex::Regex;

const MARKER_PREFIX: &str = "<!-- SKILLS_MANAGER_RULE_";

pub fn start_marker(rule_id: &str) -> String {
    format!("{MARKER_PREFIX}START:{rule_id} -->")
}

pub fn end_marker(rule_id: &str) -> String {
    format!("{MARKER_PREFIX}END:{rule_id} -->")
}

fn block_pattern(rule_id: &str) -> Regex {
    let pattern = format!(
        "(?s){}.*?{}",
        regex::escape(&start_marker(rule_id)),
        regex::escape(&end_marker(rule_id))
    );
    Regex::new(&pattern).expect("escaped marker pattern is valid")
}

pub fn render_block(rule_id: &str, content: &str) -> String {
    format!(
        "{}\n{}\n{}",
        start_marker(rule_id),
        content.trim_end_matches(['\n', '\r']),
        end_marker(rule_id)
    )
}

pub fn contains_block(text: &str, rule_id: &str) -> bool {
    block_pattern(rule_id).is_match(text)
}

/// Removes every block for `rule_id` together with the line breaks
/// [`merge_block`] put around it.
///
/// Exactly one line break before and one after the block are consumed, so
/// text outside the block is left byte-identical.
pub fn strip_block(text: &str, rule_id: &str) -> String {
    let pattern = block_pattern(rule_id);
    let mut out = text.to_string();
    while let Some(found) = pattern.find(&out) {
        let mut start = found.start();
        let mut end = found.end();
        let crlf = out[end..].starts_with("\r\n");
        if crlf {
            end += 2;
        } else if out[end..].starts_with('\n') {
            end += 1;
        }
        if crlf && out[..start].ends_with("\r\n") {
            start -= 2;
        } else if out[..start].ends_with('\n') {
            start -= 1;
        }
        out.replace_range(start..end, "");

        // a leading block hands its position to the next managed block
        if start == 0 && out.starts_with(&format!("\n{MARKER_PREFIX}START:")) {
            out.remove(0);
        }
    }
    out
}

/// Inserts or replaces the block for `rule_id`, appending it at the end.
///
/// The block goes on its own line after one line break; a file that already
/// ends with a newline therefore gets a blank separator line.
pub fn merge_block(text: &str, rule_id: &str, content: &str) -> String {
    let mut out = strip_block(text, rule_id);
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&render_block(rule_id, content));
    out.push('\n');
    out
}
