//! Answer text normalisation for display and for speech.

/// Bullet used for every list item.
pub const BULLET: char = '•';

#[derive(Debug, Default)]
struct Line<'a> {
    bullet: bool,
    words: Vec<&'a str>,
}

impl Line<'_> {
    fn render(&self) -> Option<String> {
        if self.words.is_empty() {
            return None;
        }
        let text = self.words.join(" ");
        Some(if self.bullet {
            format!("{} {}", BULLET, text)
        } else {
            text
        })
    }
}

/// Split a token that opens a numbered item (`1.`, `12)`, `3.Word`).
/// Returns the text glued to the marker, possibly empty.
fn numbered_marker(token: &str) -> Option<&str> {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 2 {
        return None;
    }
    let rest = &token[digits..];
    let mut chars = rest.chars();
    match chars.next() {
        Some('.') | Some(')') => {}
        _ => return None,
    }
    let tail = chars.as_str();
    // "3.5" or "1.2.3" is a number, not a list marker.
    match tail.chars().next() {
        None => Some(tail),
        Some(c) if c.is_alphabetic() => Some(tail),
        Some(_) => None,
    }
}

fn bullet_marker(token: &str) -> Option<&str> {
    token.strip_prefix(BULLET)
}

/// Normalise list formatting: numbered, dashed and starred items become
/// `• ` lines, inline bullets move onto their own line, lines are trimmed
/// and blank lines dropped.
pub fn format_answer(raw: &str) -> String {
    let mut lines: Vec<Line<'_>> = Vec::new();

    for source_line in raw.lines() {
        let mut current = Line::default();
        for (position, token) in source_line.split_whitespace().enumerate() {
            let opener = if let Some(tail) = numbered_marker(token) {
                Some(tail)
            } else if let Some(tail) = bullet_marker(token) {
                Some(tail)
            } else if position == 0 && (token == "-" || token == "*") {
                Some("")
            } else {
                None
            };

            match opener {
                Some(tail) => {
                    lines.push(std::mem::take(&mut current));
                    current.bullet = true;
                    if !tail.is_empty() {
                        current.words.push(tail);
                    }
                }
                None => current.words.push(token),
            }
        }
        lines.push(current);
    }

    lines
        .iter()
        .filter_map(Line::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip list markers and turn line breaks into sentence breaks.
pub fn speech_text(formatted: &str) -> String {
    let mut spoken = String::new();
    for line in formatted.lines() {
        let mut text = line.trim();
        if let Some(rest) = text.strip_prefix(BULLET) {
            text = rest.trim_start();
        } else if let Some((first, rest)) = text.split_once(char::is_whitespace)
            && numbered_marker(first).is_some_and(str::is_empty)
        {
            text = rest.trim_start();
        }
        if text.is_empty() {
            continue;
        }
        if !spoken.is_empty() {
            if spoken.ends_with(['.', '!', '?', ':', ';']) {
                spoken.push(' ');
            } else {
                spoken.push_str(". ");
            }
        }
        spoken.push_str(text);
    }
    spoken
}
