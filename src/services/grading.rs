/// Quiz scoring: percent of correct answers, rounded to two decimals.
use crate::repos::progress_repo::round2;
use crate::repos::quiz_repo::Question;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub correct_count: usize,
    pub total: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeError {
    NoQuestions,
    AnswerCount { expected: usize, got: usize },
}

impl std::fmt::Display for GradeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeError::NoQuestions => f.write_str("quiz has no questions"),
            GradeError::AnswerCount { expected, got } => {
                write!(f, "expected {} answers, got {}", expected, got)
            }
        }
    }
}

pub fn grade(questions: &[Question], answers: &[usize]) -> Result<Grade, GradeError> {
    if questions.is_empty() {
        return Err(GradeError::NoQuestions);
    }
    if answers.len() != questions.len() {
        return Err(GradeError::AnswerCount {
            expected: questions.len(),
            got: answers.len(),
        });
    }

    let correct_count = questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct == **a)
        .count();
    let total = questions.len();

    Ok(Grade {
        correct_count,
        total,
        score: round2(correct_count as f64 / total as f64 * 100.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(keys: &[usize]) -> Vec<Question> {
        keys.iter()
            .map(|k| Question {
                prompt: "?".to_string(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct: *k,
            })
            .collect()
    }

    #[test]
    fn two_of_three_is_66_67() {
        let grade = grade(&quiz(&[0, 1, 3]), &[0, 1, 2]).unwrap();
        assert_eq!(grade.correct_count, 2);
        assert_eq!(grade.total, 3);
        assert_eq!(grade.score, 66.67);
    }

    #[test]
    fn perfect_and_empty_scores() {
        assert_eq!(grade(&quiz(&[2, 2]), &[2, 2]).unwrap().score, 100.0);
        assert_eq!(grade(&quiz(&[2, 2]), &[0, 0]).unwrap().score, 0.0);
    }

    #[test]
    fn rejects_mismatched_answer_counts() {
        assert_eq!(
            grade(&quiz(&[0, 1]), &[0]),
            Err(GradeError::AnswerCount {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(grade(&[], &[]), Err(GradeError::NoQuestions));
    }
}
