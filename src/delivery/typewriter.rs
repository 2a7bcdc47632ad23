/// Character-by-character reveal of a formatted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typewriter {
    chars: Vec<char>,
    position: usize,
}

impl Typewriter {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            position: 0,
        }
    }

    /// Reveal the next character, or `None` once everything is shown.
    pub fn advance(&mut self) -> Option<char> {
        let next = self.chars.get(self.position).copied()?;
        self.position += 1;
        Some(next)
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.chars.len()
    }

    /// Text revealed so far.
    pub fn revealed(&self) -> String {
        self.chars[..self.position].iter().collect()
    }

    /// Reveal everything at once, returning what was still hidden.
    pub fn finish(&mut self) -> String {
        let rest: String = self.chars[self.position..].iter().collect();
        self.position = self.chars.len();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_one_char_at_a_time() {
        let mut tw = Typewriter::new("• ok");
        assert_eq!(tw.advance(), Some('•'));
        assert_eq!(tw.revealed(), "•");
        assert_eq!(tw.advance(), Some(' '));
        assert!(!tw.is_done());
        assert_eq!(tw.finish(), "ok");
        assert!(tw.is_done());
        assert_eq!(tw.advance(), None);
        assert_eq!(tw.revealed(), "• ok");
    }

    #[test]
    fn empty_text_is_done_immediately() {
        let mut tw = Typewriter::new("");
        assert!(tw.is_done());
        assert_eq!(tw.advance(), None);
    }
}
