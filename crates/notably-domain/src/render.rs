//! Line classification for displaying a generated summary.

/// One display line of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLine<'a> {
    /// `#`-prefixed heading; level is the number of `#`.
    Heading { level: usize, text: &'a str },
    /// Top-level `-`, `*`, `•`, or `1.` item.
    Bullet { text: &'a str },
    /// Item indented by two or more whitespace characters.
    NestedBullet { text: &'a str },
    Paragraph { text: &'a str },
    /// Blank line.
    Spacer,
}

/// Classify each line of `text`.
pub fn parse_summary(text: &str) -> Vec<SummaryLine<'_>> {
    text.split('\n').map(parse_line).collect()
}

fn parse_line(line: &str) -> SummaryLine<'_> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return SummaryLine::Spacer;
    }

    if let Some((level, text)) = heading(line) {
        return SummaryLine::Heading { level, text };
    }
    if let Some(text) = list_item(line) {
        return SummaryLine::Bullet { text };
    }

    let indent = line.len() - line.trim_start().len();
    if indent >= 2
        && let Some(text) = list_item(&line[indent..])
    {
        return SummaryLine::NestedBullet {
            text: text.trim_end(),
        };
    }

    SummaryLine::Paragraph { text: line }
}

/// `#+` followed by whitespace.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.len() - line.trim_start_matches('#').len();
    if level == 0 {
        return None;
    }
    let rest = &line[level..];
    let after = rest.strip_prefix(|c: char| c.is_whitespace())?;
    Some((level, after))
}

/// `-`, `*`, `•`, or `N.` followed by whitespace.
fn list_item(line: &str) -> Option<&str> {
    for marker in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.strip_prefix(|c: char| c.is_whitespace());
        }
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    line[digits..]
        .strip_prefix('.')?
        .strip_prefix(|c: char| c.is_whitespace())
}
