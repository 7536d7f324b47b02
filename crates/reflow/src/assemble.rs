//! Joining lines into page text with line and paragraph breaks.

use crate::cluster::Line;
use crate::config::ReflowConfig;

/// Separator between lines of the same paragraph.
pub const LINE_BREAK: &str = "\n";

/// Separator between paragraphs, and between pages.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Pick the separator placed before `current`.
///
/// A paragraph break needs the vertical gap to be strictly larger than
/// `paragraph_factor` times the previous line's height; a gap exactly at the
/// threshold stays within the paragraph.
pub fn separator(previous: &Line<'_>, current: &Line<'_>, config: &ReflowConfig) -> &'static str {
    let gap = previous.y() - current.y();
    let ref_height = config.resolve_font_height(Some(previous.font_height()));

    if gap > ref_height * config.paragraph_factor {
        PARAGRAPH_BREAK
    } else {
        LINE_BREAK
    }
}

/// Render the lines of one page. Returns an empty string when there are none.
pub fn assemble_page(lines: &[Line<'_>], config: &ReflowConfig) -> String {
    let mut page = String::new();

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            page.push_str(separator(&lines[i - 1], line, config));
        }
        page.push_str(&line.text());
    }

    page
}
