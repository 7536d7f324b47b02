//! Grouping of normalised fragments into visual lines.

use crate::config::ReflowConfig;
use crate::fragment::PositionedFragment;

/// Fragments judged to share a baseline, ordered left to right.
///
/// The representative `y` and `font_height` belong to the fragment that opened
/// the line, not to whichever ends up leftmost after the final X sort.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    fragments: Vec<PositionedFragment<'a>>,
    y: f64,
    font_height: f64,
}

impl<'a> Line<'a> {
    fn open(first: PositionedFragment<'a>) -> Self {
        Self {
            y: first.y,
            font_height: first.font_height,
            fragments: vec![first],
        }
    }

    fn close(mut self) -> Self {
        self.fragments.sort_by(|a, b| a.x.total_cmp(&b.x));
        self
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn font_height(&self) -> f64 {
        self.font_height
    }

    pub fn fragments(&self) -> &[PositionedFragment<'a>] {
        &self.fragments
    }

    /// Fragment contents joined with a single space.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.content)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Sort fragments top-to-bottom, left-to-right.
///
/// Fragments are first ordered by Y descending. Each run of fragments lying
/// less than `y_line_epsilon` below the run's first (highest) fragment is then
/// treated as tied and re-ordered by X ascending. Splitting the tie-break into
/// runs keeps every comparison a total order.
pub fn reading_order(fragments: &mut [PositionedFragment<'_>], y_line_epsilon: f64) {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut start = 0;
    while start < fragments.len() {
        let anchor = fragments[start].y;
        let end = start
            + 1
            + fragments[start + 1..]
                .iter()
                .take_while(|f| (anchor - f.y).abs() < y_line_epsilon)
                .count();
        fragments[start..end].sort_by(|a, b| a.x.total_cmp(&b.x));
        start = end;
    }
}

/// Group fragments into lines ordered top to bottom.
///
/// A fragment joins the open line when its Y is strictly within
/// `line_group_epsilon` of the line's representative Y. Membership is checked
/// against that anchor only, so 100, 95, 90 yields `{100, 95}` then `{90}`.
pub fn cluster_lines<'a>(
    mut fragments: Vec<PositionedFragment<'a>>,
    config: &ReflowConfig,
) -> Vec<Line<'a>> {
    reading_order(&mut fragments, config.y_line_epsilon);

    let mut lines: Vec<Line<'a>> = Vec::new();
    let mut current: Option<Line<'a>> = None;

    for fragment in fragments {
        if let Some(line) = current.as_mut() {
            if (fragment.y - line.y).abs() < config.line_group_epsilon {
                line.fragments.push(fragment);
                continue;
            }
        }

        if let Some(line) = current.replace(Line::open(fragment)) {
            lines.push(line.close());
        }
    }

    if let Some(line) = current {
        lines.push(line.close());
    }

    lines
}
