//! Result tallying.
//!
//! Tallying itself is a pure function over questions, options, and responses;
//! `TallyService` wraps it with data loading and the visibility gate.

use std::collections::HashMap;

use pollboard_common::{AppError, AppResult};
use pollboard_db::{
    entities::{question, question_option, response, user},
    repositories::{FormRepository, QuestionOptionRepository, QuestionRepository, ResponseRepository},
};
use serde::Serialize;

use crate::services::access::AccessService;

/// Tally for a single option.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: String,
    pub text: String,
    pub count: u64,
    /// Rounded independently per option; the column may not sum to 100.
    pub percentage: u32,
    /// True for every option sharing the maximum non-zero count.
    pub is_winner: bool,
}

/// Tally for a single question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTally {
    pub question_id: String,
    pub title: String,
    pub total_votes: u64,
    pub options: Vec<OptionTally>,
}

/// Full tallied results for a form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResults {
    pub form_id: String,
    pub questions: Vec<QuestionTally>,
}

/// Tally one question from its options and the responses to it.
///
/// Every option appears in the output even with zero votes. Options keep
/// their display order. With zero total votes there is no winner and every
/// percentage is zero.
#[must_use]
pub fn tally_question(
    question: &question::Model,
    options: &[question_option::Model],
    responses: &[response::Model],
) -> QuestionTally {
    let mut counts: HashMap<&str, u64> = options.iter().map(|o| (o.id.as_str(), 0)).collect();
    let mut total: u64 = 0;
    for r in responses {
        if r.question_id == question.id {
            if let Some(count) = counts.get_mut(r.option_id.as_str()) {
                *count += 1;
                total += 1;
            }
        }
    }

    let max = counts.values().copied().max().unwrap_or(0);

    let options = options
        .iter()
        .map(|o| {
            let count = counts.get(o.id.as_str()).copied().unwrap_or(0);
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percentage = if total == 0 {
                0
            } else {
                ((count as f64 / total as f64) * 100.0).round() as u32
            };
            OptionTally {
                option_id: o.id.clone(),
                text: o.text.clone(),
                count,
                percentage,
                is_winner: max > 0 && count == max,
            }
        })
        .collect();

    QuestionTally {
        question_id: question.id.clone(),
        title: question.title.clone(),
        total_votes: total,
        options,
    }
}

/// Service computing gated form results.
#[derive(Clone)]
pub struct TallyService {
    form_repo: FormRepository,
    question_repo: QuestionRepository,
    option_repo: QuestionOptionRepository,
    response_repo: ResponseRepository,
    access: AccessService,
}

impl TallyService {
    /// Create a new tally service.
    #[must_use]
    pub const fn new(
        form_repo: FormRepository,
        question_repo: QuestionRepository,
        option_repo: QuestionOptionRepository,
        response_repo: ResponseRepository,
        access: AccessService,
    ) -> Self {
        Self {
            form_repo,
            question_repo,
            option_repo,
            response_repo,
            access,
        }
    }

    /// Compute results for a form, enforcing the visibility gate.
    ///
    /// Editors always see results; voters only once the form is published,
    /// results are revealed, and they have voted themselves.
    pub async fn compute(
        &self,
        form_id: &str,
        user: Option<&user::Model>,
    ) -> AppResult<FormResults> {
        let form = self.form_repo.get_by_id(form_id).await?;

        let questions = self.question_repo.find_by_form(&form.id).await?;
        let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();

        let has_voted = match user {
            Some(u) => self.response_repo.has_voted(&u.id, &question_ids).await?,
            None => false,
        };
        if !self.access.can_view_results(&form, user, has_voted).await? {
            return Err(AppError::Forbidden(
                "Results are not visible yet".to_string(),
            ));
        }

        let options = self.option_repo.find_by_questions(&question_ids).await?;
        let responses = self.response_repo.find_by_questions(&question_ids).await?;

        let mut options_by_question: HashMap<&str, Vec<&question_option::Model>> = HashMap::new();
        for o in &options {
            options_by_question
                .entry(o.question_id.as_str())
                .or_default()
                .push(o);
        }

        let questions = questions
            .iter()
            .map(|q| {
                let opts: Vec<question_option::Model> = options_by_question
                    .get(q.id.as_str())
                    .map(|v| v.iter().map(|o| (*o).clone()).collect())
                    .unwrap_or_default();
                tally_question(q, &opts, &responses)
            })
            .collect();

        Ok(FormResults {
            form_id: form.id,
            questions,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(id: &str, order: i32) -> question::Model {
        question::Model {
            id: id.to_string(),
            form_id: "f1".to_string(),
            title: format!("Q{order}"),
            question_order: order,
            created_at: Utc::now().into(),
        }
    }

    fn option(id: &str, question_id: &str, text: &str, order: i32) -> question_option::Model {
        question_option::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            text: text.to_string(),
            option_order: order,
            created_at: Utc::now().into(),
        }
    }

    fn response(id: &str, question_id: &str, option_id: &str, voter_id: &str) -> response::Model {
        response::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            option_id: option_id.to_string(),
            voter_id: voter_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn unanimous_winner() {
        let q = question("q1", 0);
        let opts = vec![option("o1", "q1", "X", 0), option("o2", "q1", "Y", 1)];
        let resps = vec![
            response("r1", "q1", "o1", "u1"),
            response("r2", "q1", "o1", "u2"),
        ];

        let tally = tally_question(&q, &opts, &resps);

        assert_eq!(tally.total_votes, 2);
        assert_eq!(tally.options[0].count, 2);
        assert_eq!(tally.options[0].percentage, 100);
        assert!(tally.options[0].is_winner);
        assert_eq!(tally.options[1].count, 0);
        assert_eq!(tally.options[1].percentage, 0);
        assert!(!tally.options[1].is_winner);
    }

    #[test]
    fn tie_yields_multiple_winners() {
        let q = question("q1", 0);
        let opts = vec![option("o1", "q1", "X", 0), option("o2", "q1", "Y", 1)];
        let resps = vec![
            response("r1", "q1", "o1", "u1"),
            response("r2", "q1", "o2", "u2"),
        ];

        let tally = tally_question(&q, &opts, &resps);

        assert_eq!(tally.total_votes, 2);
        assert!(tally.options.iter().all(|o| o.is_winner));
        assert!(tally.options.iter().all(|o| o.percentage == 50));
    }

    #[test]
    fn zero_votes_means_no_winner() {
        let q = question("q1", 0);
        let opts = vec![option("o1", "q1", "X", 0), option("o2", "q1", "Y", 1)];

        let tally = tally_question(&q, &opts, &[]);

        assert_eq!(tally.total_votes, 0);
        assert!(tally.options.iter().all(|o| !o.is_winner));
        assert!(tally.options.iter().all(|o| o.percentage == 0));
    }

    #[test]
    fn percentages_round_independently() {
        let q = question("q1", 0);
        let opts = vec![
            option("o1", "q1", "A", 0),
            option("o2", "q1", "B", 1),
            option("o3", "q1", "C", 2),
        ];
        let resps = vec![
            response("r1", "q1", "o1", "u1"),
            response("r2", "q1", "o2", "u2"),
            response("r3", "q1", "o3", "u3"),
        ];

        let tally = tally_question(&q, &opts, &resps);

        // 1/3 rounds to 33 each; the column sums to 99, not 100.
        assert!(tally.options.iter().all(|o| o.percentage == 33));
        assert!(tally.options.iter().all(|o| o.is_winner));
    }

    #[test]
    fn responses_to_other_questions_are_ignored() {
        let q = question("q1", 0);
        let opts = vec![option("o1", "q1", "X", 0)];
        let resps = vec![
            response("r1", "q1", "o1", "u1"),
            response("r2", "q2", "o9", "u1"),
        ];

        let tally = tally_question(&q, &opts, &resps);

        assert_eq!(tally.total_votes, 1);
        assert_eq!(tally.options[0].count, 1);
    }
}
