//! Question detection: decides whether a transcript fragment is a complete
//! interview question worth answering, and suppresses repeats of the same
//! utterance.

use crate::config::DetectionConfig;
use crate::recognition::TranscriptFragment;
use std::fmt;
use std::time::Instant;

/// Lead words and phrases that mark a question or request.
const INTERROGATIVE_PREFIXES: &[&str] = &[
    "what", "how", "why", "when", "where", "which", "who", "tell", "describe", "explain",
    "can you", "would you", "have you", "do you",
];

/// Question starters that count anywhere in the fragment, as whole words.
const QUESTION_STARTERS: &[&str] = &[
    "what",
    "how",
    "why",
    "when",
    "where",
    "which",
    "who",
    "tell me",
    "describe",
    "explain",
    "share",
    "discuss",
    "walk me through",
    "talk about",
    "give me an example",
];

/// Interview vocabulary. Each entry must start a word but may run on, so
/// "projects" and "teamwork" count while "network" does not.
const INTERVIEW_TERMS: &[&str] = &[
    "experience",
    "project",
    "challenge",
    "strength",
    "weakness",
    "salary",
    "team",
    "work",
    "company",
    "role",
    "position",
    "skills",
    "background",
    "qualifications",
    "achievement",
    "responsibility",
    "accomplishment",
    "goal",
    "motivation",
    "leadership",
    "conflict",
    "problem",
    "solution",
    "decision",
    // phrases
    "previous job",
    "current role",
    "time when",
    "situation where",
    "example of",
    "instance where",
    "tell us about",
    "can you",
    "would you",
    "have you",
    "do you have",
];

/// Which kind of fragment produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentSource {
    Final,
    Interim,
}

impl From<&TranscriptFragment> for FragmentSource {
    fn from(fragment: &TranscriptFragment) -> Self {
        if fragment.is_final {
            FragmentSource::Final
        } else {
            FragmentSource::Interim
        }
    }
}

/// A fragment accepted as a question. Replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedQuestion {
    pub text: String,
    pub detected_at: Instant,
    pub source: FragmentSource,
}

/// Why a fragment was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooShort,
    NotAQuestion,
    ExactDuplicate,
    /// A shorter piece of the last accepted question.
    TruncatedEcho,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::Empty => "empty",
            Rejection::TooShort => "too short",
            Rejection::NotAQuestion => "not a question",
            Rejection::ExactDuplicate => "exact duplicate",
            Rejection::TruncatedEcho => "truncated echo of the last question",
        };
        f.write_str(reason)
    }
}

/// Space-padded lowercase word sequence, so that `" work "` matches the
/// word and not "network".
fn word_line(text: &str) -> String {
    let mut line = String::from(" ");
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
    {
        line.push_str(&word.to_lowercase());
        line.push(' ');
    }
    line
}

fn contains_phrase(line: &str, phrase: &str) -> bool {
    line.contains(&format!(" {} ", phrase))
}

fn contains_word_prefix(line: &str, prefix: &str) -> bool {
    line.contains(&format!(" {}", prefix))
}

fn starts_with_phrase(line: &str, phrase: &str) -> bool {
    line.starts_with(&format!(" {} ", phrase))
}

/// Whether `text` reads like an interview question, ignoring length.
pub fn looks_like_question(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }
    let line = word_line(text);
    INTERROGATIVE_PREFIXES
        .iter()
        .any(|prefix| starts_with_phrase(&line, prefix))
        || QUESTION_STARTERS
            .iter()
            .any(|starter| contains_phrase(&line, starter))
        || INTERVIEW_TERMS
            .iter()
            .any(|term| contains_word_prefix(&line, term))
}

/// Classify `text` against the last accepted question. Returns the trimmed
/// question text when accepted.
pub fn classify(
    text: &str,
    last_accepted: Option<&str>,
    config: &DetectionConfig,
) -> Result<String, Rejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }
    let length = trimmed.chars().count();
    if length <= config.min_chars {
        return Err(Rejection::TooShort);
    }
    if !looks_like_question(trimmed) {
        return Err(Rejection::NotAQuestion);
    }

    if let Some(last) = last_accepted {
        let candidate = trimmed.to_lowercase();
        let last = last.trim().to_lowercase();
        if candidate == last {
            return Err(Rejection::ExactDuplicate);
        }
        let last_length = last.chars().count();
        if last.contains(&candidate)
            && (length as f32) < last_length as f32 * config.duplicate_ratio
        {
            return Err(Rejection::TruncatedEcho);
        }
    }

    Ok(trimmed.to_string())
}

/// Stateful detector remembering the last accepted question.
#[derive(Debug, Clone)]
pub struct QuestionDetector {
    config: DetectionConfig,
    last_accepted: Option<String>,
}

impl QuestionDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            last_accepted: None,
        }
    }

    pub fn detect(&mut self, fragment: &TranscriptFragment) -> Result<DetectedQuestion, Rejection> {
        let text = classify(&fragment.text, self.last_accepted.as_deref(), &self.config)?;
        self.last_accepted = Some(text.clone());
        Ok(DetectedQuestion {
            text,
            detected_at: fragment.captured_at,
            source: FragmentSource::from(fragment),
        })
    }

    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_deref()
    }

    /// Forget the last accepted question so the same words may be asked again.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DetectionConfig {
        DetectionConfig::default()
    }

    #[test]
    fn accepts_question_mark() {
        assert_eq!(
            classify("  Is this going well?  ", None, &config()),
            Ok("Is this going well?".to_string())
        );
    }

    #[test]
    fn accepts_interrogative_prefix() {
        assert!(classify("Describe yourself briefly", None, &config()).is_ok());
        assert!(classify("can you walk in there", None, &config()).is_ok());
    }

    #[test]
    fn accepts_interview_keyword_anywhere() {
        assert!(classify("so your biggest weakness then", None, &config()).is_ok());
        assert!(classify("okay give me an example please", None, &config()).is_ok());
    }

    #[test]
    fn rejects_short_fragments() {
        assert_eq!(classify("what", None, &config()), Err(Rejection::TooShort));
        assert_eq!(classify("what is it", None, &config()), Err(Rejection::TooShort));
        assert_eq!(classify("   ", None, &config()), Err(Rejection::Empty));
    }

    #[test]
    fn rejects_small_talk() {
        assert_eq!(
            classify("the weather is lovely today", None, &config()),
            Err(Rejection::NotAQuestion)
        );
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "network" must not match "work", "whatever" must not match "what"
        assert_eq!(
            classify("whatever network outage", None, &config()),
            Err(Rejection::NotAQuestion)
        );
    }

    #[test]
    fn inflected_interview_terms_count() {
        for text in [
            "your greatest strengths and weaknesses",
            "so your previous projects and challenges",
            "okay about teamwork and conflicts",
            "the roles and responsibilities here",
        ] {
            assert_eq!(classify(text, None, &config()), Ok(text.to_string()), "{text}");
        }
    }

    #[test]
    fn terms_must_start_a_word() {
        // "homework" and "fireworks" do not start with "work"
        assert_eq!(
            classify("homework and fireworks tonight", None, &config()),
            Err(Rejection::NotAQuestion)
        );
    }

    #[test]
    fn rejects_exact_duplicate_ignoring_case() {
        assert_eq!(
            classify(
                "What is your greatest strength ",
                Some("what is your greatest strength"),
                &config()
            ),
            Err(Rejection::ExactDuplicate)
        );
    }

    #[test]
    fn rejects_truncated_echo() {
        let last = Some("what is your greatest strength");
        assert_eq!(
            classify("what is your", last, &config()),
            Err(Rejection::TruncatedEcho)
        );
    }

    #[test]
    fn accepts_longer_continuation() {
        let last = Some("what is your greatest strength");
        assert_eq!(
            classify("what is your greatest strength and weakness", last, &config()),
            Ok("what is your greatest strength and weakness".to_string())
        );
    }

    #[test]
    fn accepts_contained_fragment_above_ratio() {
        // 26 of 30 chars is above the 0.7 ratio, so it counts as new
        let last = Some("what is your greatest strength");
        assert!(classify("what is your greatest stre", last, &config()).is_ok());
    }

    #[test]
    fn ratio_is_tunable() {
        let strict = DetectionConfig {
            duplicate_ratio: 1.0,
            ..config()
        };
        let last = Some("what is your greatest strength");
        assert_eq!(
            classify("what is your greatest stre", last, &strict),
            Err(Rejection::TruncatedEcho)
        );
    }

    #[test]
    fn detector_tracks_and_resets_last_accepted() {
        let now = Instant::now();
        let mut detector = QuestionDetector::new(config());

        let detected = detector
            .detect(&TranscriptFragment::final_at("what is your biggest weakness", now))
            .unwrap();
        assert_eq!(detected.source, FragmentSource::Final);
        assert_eq!(detector.last_accepted(), Some("what is your biggest weakness"));

        assert_eq!(
            detector.detect(&TranscriptFragment::final_at("what is your biggest weakness", now)),
            Err(Rejection::ExactDuplicate)
        );

        detector.reset();
        assert!(
            detector
                .detect(&TranscriptFragment::interim_at("what is your biggest weakness", now))
                .is_ok()
        );
    }
}
