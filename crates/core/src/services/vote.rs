//! Ballot submission.
//!
//! A ballot covers every question of the form exactly once and is inserted
//! atomically. The unique `(question_id, voter_id)` index is the final
//! arbiter against double voting; the pre-check here only gives a friendlier
//! error for the common case.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use pollboard_common::{AppError, AppResult, IdGenerator};
use pollboard_db::{
    entities::{response, user},
    repositories::{FormRepository, QuestionOptionRepository, QuestionRepository, ResponseRepository},
};
use sea_orm::Set;
use serde::Deserialize;

use crate::services::access::AccessService;

/// One (question, option) pick inside a ballot.
#[derive(Debug, Clone, Deserialize)]
pub struct BallotSelection {
    pub question_id: String,
    pub option_id: String,
}

/// Service handling ballot submission and retrieval.
#[derive(Clone)]
pub struct VoteService {
    form_repo: FormRepository,
    question_repo: QuestionRepository,
    option_repo: QuestionOptionRepository,
    response_repo: ResponseRepository,
    access: AccessService,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub fn new(
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
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit a complete ballot for a form.
    ///
    /// Validates that the form is published, every question is answered
    /// exactly once, every picked option belongs to its question, and the
    /// voter has not voted before. All rows land in one transaction.
    pub async fn submit_ballot(
        &self,
        form_id: &str,
        voter: &user::Model,
        selections: &[BallotSelection],
    ) -> AppResult<()> {
        let form = self.form_repo.get_by_id(form_id).await?;

        if !form.is_published {
            return Err(AppError::Forbidden(
                "This form is not accepting ballots".to_string(),
            ));
        }

        let questions = self.question_repo.find_by_form(&form.id).await?;
        if questions.is_empty() {
            return Err(AppError::Unprocessable(
                "This form has no questions".to_string(),
            ));
        }
        let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();

        // Exactly one selection per question, no extras, no repeats.
        let mut picked: HashMap<&str, &str> = HashMap::new();
        for sel in selections {
            if picked
                .insert(sel.question_id.as_str(), sel.option_id.as_str())
                .is_some()
            {
                return Err(AppError::Unprocessable(format!(
                    "Duplicate answer for question {}",
                    sel.question_id
                )));
            }
        }
        let expected: HashSet<&str> = question_ids.iter().map(String::as_str).collect();
        let answered: HashSet<&str> = picked.keys().copied().collect();
        if answered != expected {
            return Err(AppError::Unprocessable(
                "A ballot must answer every question exactly once".to_string(),
            ));
        }

        // Every picked option must belong to the question it answers.
        let options = self.option_repo.find_by_questions(&question_ids).await?;
        let option_owner: HashMap<&str, &str> = options
            .iter()
            .map(|o| (o.id.as_str(), o.question_id.as_str()))
            .collect();
        for (question_id, option_id) in &picked {
            match option_owner.get(option_id) {
                Some(owner) if owner == question_id => {}
                _ => {
                    return Err(AppError::Unprocessable(format!(
                        "Option {option_id} does not belong to question {question_id}"
                    )));
                }
            }
        }

        if self.response_repo.has_voted(&voter.id, &question_ids).await? {
            return Err(AppError::Conflict("Ballot already submitted".to_string()));
        }

        let now = Utc::now();
        let models: Vec<response::ActiveModel> = picked
            .into_iter()
            .map(|(question_id, option_id)| response::ActiveModel {
                id: Set(self.id_gen.generate()),
                question_id: Set(question_id.to_string()),
                option_id: Set(option_id.to_string()),
                voter_id: Set(voter.id.clone()),
                created_at: Set(now.into()),
            })
            .collect();

        self.response_repo.create_ballot(models).await?;

        tracing::debug!(form_id = %form.id, voter_id = %voter.id, "ballot recorded");
        Ok(())
    }

    /// Whether `voter` has already submitted a ballot for `form_id`.
    pub async fn has_voted(&self, form_id: &str, voter: &user::Model) -> AppResult<bool> {
        let questions = self.question_repo.find_by_form(form_id).await?;
        let ids: Vec<String> = questions.into_iter().map(|q| q.id).collect();
        self.response_repo.has_voted(&voter.id, &ids).await
    }

    /// The voter's own ballot, as a map of question ID to option ID.
    pub async fn my_ballot(
        &self,
        form_id: &str,
        voter: &user::Model,
    ) -> AppResult<HashMap<String, String>> {
        let form = self.form_repo.get_by_id(form_id).await?;
        if !self.access.can_read(&form, Some(voter)).await? {
            return Err(AppError::FormNotFound(form.id));
        }

        let questions = self.question_repo.find_by_form(&form.id).await?;
        let ids: Vec<String> = questions.into_iter().map(|q| q.id).collect();
        let responses = self
            .response_repo
            .find_by_voter_and_questions(&voter.id, &ids)
            .await?;

        Ok(responses
            .into_iter()
            .map(|r| (r.question_id, r.option_id))
            .collect())
    }
}
