use thiserror::Error;

use super::{ChoiceQuestion, DEFAULT_PASSING_SCORE, Question, QuestionKind, Quiz, TextQuestion};

const PASSING_SCORE_TAG: &str = "[passing_score]";
const ANSWER_SEPARATOR: &str = "R:=";
const CORRECT_MARKER: &str = "x";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Malformed quiz markup. Line numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizParseError {
    #[error("line {line}: passing score must be an integer between 0 and 100")]
    InvalidPassingScore { line: usize },
    #[error("line {line}: passing score is already set")]
    DuplicatePassingScore { line: usize },
    #[error("line {line}: unexpected text outside a question")]
    UnexpectedLine { line: usize },
    #[error("line {line}: {kind} question has no prompt")]
    EmptyPrompt { line: usize, kind: QuestionKind },
    #[error("line {line}: {kind} question has no options")]
    NoOptions { line: usize, kind: QuestionKind },
    #[error("line {line}: option style does not match a {kind} question")]
    MismatchedOption { line: usize, kind: QuestionKind },
    #[error("line {line}: option marker is not closed")]
    MalformedOption { line: usize },
    #[error("line {line}: option has no text")]
    EmptyOption { line: usize },
    #[error("line {line}: single question needs exactly one correct option, found {count}")]
    SingleCorrectCount { line: usize, count: usize },
    #[error("line {line}: text question needs an answer after `R:=`")]
    MissingAnswer { line: usize },
    #[error("quiz has no questions")]
    NoQuestions,
}

impl QuizParseError {
    /// Line the error points at, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            QuizParseError::InvalidPassingScore { line }
            | QuizParseError::DuplicatePassingScore { line }
            | QuizParseError::UnexpectedLine { line }
            | QuizParseError::EmptyPrompt { line, .. }
            | QuizParseError::NoOptions { line, .. }
            | QuizParseError::MismatchedOption { line, .. }
            | QuizParseError::MalformedOption { line }
            | QuizParseError::EmptyOption { line }
            | QuizParseError::SingleCorrectCount { line, .. }
            | QuizParseError::MissingAnswer { line } => Some(*line),
            QuizParseError::NoQuestions => None,
        }
    }
}

//
// ─── PARSER ────────────────────────────────────────────────────────────────────
//

/// Parse quiz markup into its passing score and questions, in order.
///
/// # Errors
///
/// Returns the first malformed directive or block found, scanning top to bottom.
pub fn parse(raw: &str) -> Result<Quiz, QuizParseError> {
    let mut passing_score: Option<u8> = None;
    let mut questions = Vec::new();
    let mut block: Option<Block<'_>> = None;

    let mut lines = raw.lines().enumerate().map(|(i, line)| (i + 1, line));
    while let Some((number, line)) = lines.next() {
        let trimmed = line.trim();

        if trimmed == PASSING_SCORE_TAG {
            if let Some(done) = block.take() {
                questions.push(done.finish()?);
            }
            if passing_score.is_some() {
                return Err(QuizParseError::DuplicatePassingScore { line: number });
            }
            let (value_line, value) = lines
                .by_ref()
                .find(|(_, l)| !l.trim().is_empty())
                .ok_or(QuizParseError::InvalidPassingScore { line: number })?;
            passing_score = Some(parse_passing_score(value_line, value)?);
            continue;
        }

        if let Some(kind) = question_tag(trimmed) {
            if let Some(done) = block.take() {
                questions.push(done.finish()?);
            }
            block = Some(Block::new(kind, number));
            continue;
        }

        match block.as_mut() {
            Some(open) => open.lines.push((number, line)),
            None if trimmed.is_empty() => {}
            None => return Err(QuizParseError::UnexpectedLine { line: number }),
        }
    }

    if let Some(done) = block.take() {
        questions.push(done.finish()?);
    }
    if questions.is_empty() {
        return Err(QuizParseError::NoQuestions);
    }

    Ok(Quiz {
        passing_score: passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
        questions,
    })
}

fn parse_passing_score(line: usize, value: &str) -> Result<u8, QuizParseError> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|score| *score <= 100)
        .ok_or(QuizParseError::InvalidPassingScore { line })
}

fn question_tag(trimmed: &str) -> Option<QuestionKind> {
    match trimmed {
        "[single]" => Some(QuestionKind::Single),
        "[multiple]" => Some(QuestionKind::Multiple),
        "[text]" => Some(QuestionKind::Text),
        _ => None,
    }
}

/// Lines of one question block, tag line excluded.
struct Block<'a> {
    kind: QuestionKind,
    tag_line: usize,
    lines: Vec<(usize, &'a str)>,
}

impl<'a> Block<'a> {
    fn new(kind: QuestionKind, tag_line: usize) -> Self {
        Self {
            kind,
            tag_line,
            lines: Vec::new(),
        }
    }

    fn finish(self) -> Result<Question, QuizParseError> {
        match self.kind {
            QuestionKind::Single => Ok(Question::Single(self.choice()?)),
            QuestionKind::Multiple => Ok(Question::Multiple(self.choice()?)),
            QuestionKind::Text => Ok(Question::Text(self.text()?)),
        }
    }

    fn text(&self) -> Result<TextQuestion, QuizParseError> {
        let body = self
            .lines
            .iter()
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n");
        let (prompt, answer) = body
            .split_once(ANSWER_SEPARATOR)
            .ok_or(QuizParseError::MissingAnswer { line: self.tag_line })?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(QuizParseError::EmptyPrompt {
                line: self.tag_line,
                kind: self.kind,
            });
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(QuizParseError::MissingAnswer { line: self.tag_line });
        }

        Ok(TextQuestion {
            prompt: prompt.to_owned(),
            answer: answer.to_owned(),
        })
    }

    fn choice(&self) -> Result<ChoiceQuestion, QuizParseError> {
        let (own, other) = match self.kind {
            QuestionKind::Single => (OptionStyle::ROUND, OptionStyle::SQUARE),
            _ => (OptionStyle::SQUARE, OptionStyle::ROUND),
        };

        let mut prompt_lines = Vec::new();
        let mut options = Vec::new();
        let mut correct = Vec::new();

        for &(number, line) in &self.lines {
            let trimmed = line.trim();
            if other.matches(trimmed) {
                return Err(QuizParseError::MismatchedOption {
                    line: number,
                    kind: self.kind,
                });
            }
            if own.matches(trimmed) {
                let (is_correct, text) = own.split(trimmed, number)?;
                if is_correct {
                    correct.push(options.len());
                }
                options.push(text.to_owned());
                continue;
            }
            if options.is_empty() {
                prompt_lines.push(line);
            } else if !trimmed.is_empty() {
                return Err(QuizParseError::UnexpectedLine { line: number });
            }
        }

        let prompt = prompt_lines.join("\n").trim().to_owned();
        if prompt.is_empty() {
            return Err(QuizParseError::EmptyPrompt {
                line: self.tag_line,
                kind: self.kind,
            });
        }
        if options.is_empty() {
            return Err(QuizParseError::NoOptions {
                line: self.tag_line,
                kind: self.kind,
            });
        }
        if self.kind == QuestionKind::Single && correct.len() != 1 {
            return Err(QuizParseError::SingleCorrectCount {
                line: self.tag_line,
                count: correct.len(),
            });
        }

        Ok(ChoiceQuestion {
            prompt,
            options,
            correct,
        })
    }
}

/// `- ( )` for single questions, `- [ ]` for multiple ones.
#[derive(Clone, Copy)]
struct OptionStyle {
    open: &'static str,
    close: char,
}

impl OptionStyle {
    const ROUND: Self = Self {
        open: "- (",
        close: ')',
    };
    const SQUARE: Self = Self {
        open: "- [",
        close: ']',
    };

    fn matches(self, trimmed: &str) -> bool {
        trimmed.starts_with(self.open)
    }

    /// Split an option line into its correctness flag and display text.
    fn split(self, trimmed: &str, line: usize) -> Result<(bool, &str), QuizParseError> {
        let rest = &trimmed[self.open.len()..];
        let (marker, text) = rest
            .split_once(self.close)
            .ok_or(QuizParseError::MalformedOption { line })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(QuizParseError::EmptyOption { line });
        }
        Ok((marker.trim() == CORRECT_MARKER, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAVITY_QUIZ: &str = "[passing_score]
70

[single]
What happens to objects of different masses in a vacuum?

Watch this video to understand Galileo's famous experiment:

https://www.youtube.com/watch?v=E43-CfukEgs

- (x) They fall at the same rate
- ( ) Heavy objects fall faster
- ( ) Light objects fall faster
- ( ) Objects don't fall in a vacuum

[multiple]
Which factors affect an object's fall on Earth? Select all that apply.

- [x] Air resistance
- [x] Object's shape
- [x] Surface area
- [ ] Color of the object
- [ ] Time of day

[text]
What is the value of Gravity.

Key points to consider:
- Gravitational force
- Mass vs Weight

R:= 9.8";

    #[test]
    fn parses_minimal_single_question() {
        let quiz = parse("[passing_score]\n70\n[single]\nQ?\n- (x) A\n- ( ) B\n").unwrap();
        assert_eq!(quiz.passing_score, 70);
        assert_eq!(quiz.question_count(), 1);
        let Question::Single(q) = &quiz.questions[0] else {
            panic!("expected a single question");
        };
        assert_eq!(q.prompt, "Q?");
        assert_eq!(q.options, vec!["A".to_owned(), "B".to_owned()]);
        assert_eq!(q.correct, vec![0]);
    }

    #[test]
    fn parses_text_question() {
        let quiz = parse("[text]\nWhat is g?\nR:= 9.8").unwrap();
        assert_eq!(quiz.passing_score, DEFAULT_PASSING_SCORE);
        assert_eq!(
            quiz.questions[0],
            Question::Text(TextQuestion {
                prompt: "What is g?".into(),
                answer: "9.8".into(),
            })
        );
    }

    #[test]
    fn parses_full_lesson_quiz_in_order() {
        let quiz: Quiz = GRAVITY_QUIZ.parse().unwrap();
        let kinds: Vec<_> = quiz.questions.iter().map(Question::kind).collect();
        assert_eq!(
            kinds,
            vec![QuestionKind::Single, QuestionKind::Multiple, QuestionKind::Text]
        );

        let first = &quiz.questions[0];
        assert!(first.prompt().starts_with("What happens"));
        assert!(first.prompt().ends_with("E43-CfukEgs"));
        assert_eq!(first.options().len(), 4);

        let Question::Multiple(multi) = &quiz.questions[1] else {
            panic!("expected a multiple question");
        };
        assert_eq!(multi.correct, vec![0, 1, 2]);

        let Question::Text(text) = &quiz.questions[2] else {
            panic!("expected a text question");
        };
        assert!(text.prompt.contains("- Mass vs Weight"));
        assert_eq!(text.answer, "9.8");
    }

    #[test]
    fn multiple_question_may_have_no_correct_option() {
        let quiz = parse("[multiple]\nNone of these?\n- [ ] A\n- [ ] B").unwrap();
        let Question::Multiple(q) = &quiz.questions[0] else {
            panic!("expected a multiple question");
        };
        assert!(q.correct.is_empty());
    }

    #[test]
    fn rejects_bad_passing_scores() {
        assert_eq!(
            parse("[passing_score]\nseventy\n[text]\nQ\nR:= a"),
            Err(QuizParseError::InvalidPassingScore { line: 2 })
        );
        assert_eq!(
            parse("[passing_score]\n101\n[text]\nQ\nR:= a"),
            Err(QuizParseError::InvalidPassingScore { line: 2 })
        );
        assert_eq!(
            parse("[passing_score]\n"),
            Err(QuizParseError::InvalidPassingScore { line: 1 })
        );
        assert_eq!(
            parse("[passing_score]\n50\n[passing_score]\n60\n"),
            Err(QuizParseError::DuplicatePassingScore { line: 3 })
        );
    }

    #[test]
    fn rejects_malformed_blocks_with_line_numbers() {
        let cases = [
            ("intro\n[text]\nQ\nR:= a", QuizParseError::UnexpectedLine { line: 1 }),
            (
                "[single]\n- (x) A",
                QuizParseError::EmptyPrompt {
                    line: 1,
                    kind: QuestionKind::Single,
                },
            ),
            (
                "[multiple]\nQ?",
                QuizParseError::NoOptions {
                    line: 1,
                    kind: QuestionKind::Multiple,
                },
            ),
            (
                "[single]\nQ?\n- (x) A\n- [ ] B",
                QuizParseError::MismatchedOption {
                    line: 4,
                    kind: QuestionKind::Single,
                },
            ),
            ("[single]\nQ?\n- (x A", QuizParseError::MalformedOption { line: 3 }),
            ("[single]\nQ?\n- (x) A\n- ( )  ", QuizParseError::EmptyOption { line: 4 }),
            (
                "[single]\nQ?\n- (x) A\nstray\n- ( ) B",
                QuizParseError::UnexpectedLine { line: 4 },
            ),
            (
                "[single]\nQ?\n- (x) A\n- (x) B",
                QuizParseError::SingleCorrectCount { line: 1, count: 2 },
            ),
            ("[text]\nQ?", QuizParseError::MissingAnswer { line: 1 }),
            ("[text]\nQ?\nR:=   ", QuizParseError::MissingAnswer { line: 1 }),
            (
                "[text]\nR:= 1",
                QuizParseError::EmptyPrompt {
                    line: 1,
                    kind: QuestionKind::Text,
                },
            ),
            ("\n\n", QuizParseError::NoQuestions),
        ];

        for (raw, expected) in cases {
            assert_eq!(parse(raw), Err(expected), "input: {raw:?}");
        }
    }

    #[test]
    fn only_lowercase_x_marks_a_correct_option() {
        let quiz = parse("[multiple]\nQ?\n- [X] A\n- [ ] B").unwrap();
        let Question::Multiple(q) = &quiz.questions[0] else {
            panic!("expected a multiple question");
        };
        assert!(q.correct.is_empty());
        assert_eq!(q.options, vec!["A", "B"]);

        assert_eq!(
            parse("[single]\nQ?\n- (X) A\n- ( ) B"),
            Err(QuizParseError::SingleCorrectCount { line: 1, count: 0 })
        );
    }

    #[test]
    fn errors_report_their_line() {
        assert_eq!(QuizParseError::EmptyOption { line: 7 }.line(), Some(7));
        assert_eq!(QuizParseError::NoQuestions.line(), None);
    }
}
