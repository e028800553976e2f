use std::collections::BTreeSet;

use thiserror::Error;

use super::{Question, QuestionKind};

/// A learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// One option index, for `single` questions.
    Choice(usize),
    /// A set of option indexes, for `multiple` questions.
    Choices(BTreeSet<usize>),
    Text(String),
}

impl Response {
    fn kind(&self) -> QuestionKind {
        match self {
            Response::Choice(_) => QuestionKind::Single,
            Response::Choices(_) => QuestionKind::Multiple,
            Response::Text(_) => QuestionKind::Text,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("a {question} question cannot take a {response} response")]
    WrongResponseKind {
        question: QuestionKind,
        response: QuestionKind,
    },
    #[error("option {index} does not exist; the question has {options} options")]
    OptionOutOfRange { index: usize, options: usize },
}

impl Question {
    /// Whether `response` answers this question correctly.
    ///
    /// `single` checks that the selected index is a correct one, `multiple` requires
    /// the selection to equal the correct set exactly, and `text` compares the trimmed
    /// response to the answer ignoring case.
    ///
    /// # Errors
    ///
    /// `WrongResponseKind` when the response shape does not fit the question, and
    /// `OptionOutOfRange` when a selected index has no option.
    pub fn grade(&self, response: &Response) -> Result<bool, GradeError> {
        match (self, response) {
            (Question::Single(q), Response::Choice(index)) => {
                check_range(*index, q.options.len())?;
                Ok(q.correct.contains(index))
            }
            (Question::Multiple(q), Response::Choices(selected)) => {
                if let Some(index) = selected.iter().find(|i| **i >= q.options.len()) {
                    return Err(GradeError::OptionOutOfRange {
                        index: *index,
                        options: q.options.len(),
                    });
                }
                let correct: BTreeSet<usize> = q.correct.iter().copied().collect();
                Ok(*selected == correct)
            }
            (Question::Text(q), Response::Text(answer)) => {
                Ok(answer.trim().to_lowercase() == q.answer.to_lowercase())
            }
            (question, response) => Err(GradeError::WrongResponseKind {
                question: question.kind(),
                response: response.kind(),
            }),
        }
    }
}

fn check_range(index: usize, options: usize) -> Result<(), GradeError> {
    if index < options {
        Ok(())
    } else {
        Err(GradeError::OptionOutOfRange { index, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::parse;

    fn question(raw: &str) -> Question {
        parse(raw).unwrap().questions.remove(0)
    }

    fn choices(indexes: &[usize]) -> Response {
        Response::Choices(indexes.iter().copied().collect())
    }

    #[test]
    fn single_checks_membership() {
        let q = question("[single]\nQ?\n- ( ) A\n- (x) B\n- ( ) C");
        assert!(q.grade(&Response::Choice(1)).unwrap());
        assert!(!q.grade(&Response::Choice(0)).unwrap());
        assert_eq!(
            q.grade(&Response::Choice(3)),
            Err(GradeError::OptionOutOfRange {
                index: 3,
                options: 3
            })
        );
    }

    #[test]
    fn multiple_requires_exact_set() {
        let q = question("[multiple]\nQ?\n- [x] A\n- [ ] B\n- [x] C");
        assert!(!q.grade(&choices(&[0])).unwrap());
        assert!(q.grade(&choices(&[0, 2])).unwrap());
        assert!(!q.grade(&choices(&[0, 1, 2])).unwrap());
    }

    #[test]
    fn multiple_without_correct_options_accepts_only_empty_selection() {
        let q = question("[multiple]\nQ?\n- [ ] A\n- [ ] B");
        assert!(q.grade(&choices(&[])).unwrap());
        assert!(!q.grade(&choices(&[1])).unwrap());
    }

    #[test]
    fn text_compares_trimmed_and_case_insensitive() {
        let q = question("[text]\nWhat is g?\nR:= 9.8");
        assert!(!q.grade(&Response::Text(" 9.80 ".into())).unwrap());
        assert!(q.grade(&Response::Text("9.8".into())).unwrap());

        let named = question("[text]\nWho?\nR:= Bhaskaracharya");
        assert!(named.grade(&Response::Text("  bhaskaracharya ".into())).unwrap());
    }

    #[test]
    fn wrong_response_kind_is_an_error() {
        let q = question("[single]\nQ?\n- (x) A");
        assert_eq!(
            q.grade(&choices(&[0])),
            Err(GradeError::WrongResponseKind {
                question: QuestionKind::Single,
                response: QuestionKind::Multiple,
            })
        );
    }
}
