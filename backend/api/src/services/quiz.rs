//! Quiz assembly and grading.
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    constants::{
        llm::GENERATION_RETRIES,
        progress::COMPLETION_THRESHOLD,
        quiz::{DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT},
    },
    db::{
        self,
        errors::DatabaseError,
        models::{
            answer::{Answer, AnswerInsert},
            appuser::AppUser,
            content::Content,
            knowledge_gap::KnowledgeGapInsert,
            question::{DifficultyLevel, Question, QuestionInsert, QuestionType},
            quiz_attempt::QuizAttemptInsert,
            topic::Topic,
            user_answer::UserAnswerInsert,
            user_progress::UserProgressInsert,
        },
    },
    utils::timestamp,
};

use super::{
    llm::{self, GeneratedQuestion, GenerationRequest, LlmClient},
    progress::{self, QuizResult},
};

#[derive(Deserialize)]
pub struct QuizRequest {
    pub topic_id: i64,
    #[serde(default)]
    pub difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    pub question_count: Option<u32>,
}

/// A question as served in a quiz, with its options and topic.
#[derive(Serialize, Debug)]
pub struct QuestionView {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
    pub topic: Topic,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_answer_id: i64,
    #[serde(default)]
    pub time_taken: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct QuizSubmission {
    pub user_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}

/// Persist generated questions and their options in one transaction.
async fn store_generated(
    topic_id: i64,
    generated: Vec<GeneratedQuestion>,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Question>, DatabaseError> {
    let mut tx = db_conn.begin().await?;
    let mut stored = Vec::with_capacity(generated.len());
    for item in generated {
        let question = QuestionInsert {
            text: item.text,
            latex_content: item.latex_content,
            question_type: item.question_type,
            difficulty: item.difficulty,
            topic_id,
        }
        .store(&mut *tx)
        .await?;
        for answer in item.answers {
            AnswerInsert {
                text: answer.text,
                latex_content: answer.latex_content,
                is_correct: answer.is_correct,
                explanation: answer.explanation,
                question_id: question.id(),
            }
            .store(&mut *tx)
            .await?;
        }
        stored.push(question);
    }
    tx.commit().await?;
    Ok(stored)
}

/// Ask the model to cover a shortfall of stored questions. Failures are logged
/// and yield no questions.
async fn generate_shortfall(
    client: &dyn LlmClient,
    topic: &Topic,
    difficulty: Option<DifficultyLevel>,
    shortfall: u32,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Question>, DatabaseError> {
    let contents = Content::select_by_topic(topic.id(), db_conn).await?;
    let request = GenerationRequest {
        topic,
        contents: &contents,
        difficulty,
        question_count: shortfall,
        question_type: QuestionType::MultipleChoice,
    };
    let generated = match llm::generate_questions(client, &request, GENERATION_RETRIES).await {
        Ok(generated) => generated,
        Err(err) => {
            tracing::error!("Giving up on question generation for topic {}: {err}", topic.id());
            return Ok(Vec::new());
        }
    };
    let wanted = usize::try_from(shortfall).unwrap_or(usize::MAX);
    let accepted: Vec<GeneratedQuestion> = generated
        .into_iter()
        .filter(|question| difficulty.is_none_or(|level| level == question.difficulty))
        .take(wanted)
        .collect();
    tracing::info!(
        "Generated {} new questions for topic {}",
        accepted.len(),
        topic.id()
    );
    store_generated(topic.id(), accepted, db_conn).await
}

/// Assemble a quiz for a topic. Stored questions come first; any shortfall is
/// generated when a language model is available.
pub async fn generate_quiz(
    request: QuizRequest,
    llm_client: Option<&dyn LlmClient>,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<QuestionView>, errors::QuizGenerationError> {
    let count = request.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
    if count == 0 || count > MAX_QUESTION_COUNT {
        return Err(errors::QuizGenerationError::InvalidQuestionCount(count));
    }
    let topic = Topic::select_one(request.topic_id, db_conn)
        .await?
        .ok_or(errors::QuizGenerationError::TopicNonExistent(request.topic_id))?;
    let mut questions =
        Question::select_for_topic(topic.id(), request.difficulty, count, db_conn).await?;
    let shortfall = count.saturating_sub(u32::try_from(questions.len()).unwrap_or(u32::MAX));
    if shortfall > 0 {
        if let Some(client) = llm_client {
            questions.extend(
                generate_shortfall(client, &topic, request.difficulty, shortfall, db_conn).await?,
            );
        }
    }
    if questions.is_empty() {
        return Err(errors::QuizGenerationError::NoQuestions {
            topic_id: topic.id(),
            difficulty: errors::DifficultyFilter(request.difficulty),
        });
    }
    let mut views = Vec::with_capacity(questions.len());
    for question in questions {
        let answers = Answer::select_by_question(question.id(), db_conn).await?;
        views.push(QuestionView {
            question,
            answers,
            topic: topic.clone(),
        });
    }
    Ok(views)
}

/// Running totals for one topic of a submission.
struct TopicTally {
    topic_id: i64,
    topic_name: String,
    answered: usize,
    correct: usize,
    time_spent: Option<i64>,
    missed_question_ids: Vec<i64>,
}

/// A submitted answer checked against its question.
struct GradedAnswer {
    answer: SubmittedAnswer,
    is_correct: bool,
}

/// Grade a submission and record it. Answers naming an unknown question, or
/// an option from a different question, are not recorded but still count
/// against the score.
pub async fn submit_quiz(
    submission: QuizSubmission,
    db_conn: &db::ConnectionPool,
) -> Result<QuizResult, errors::QuizSubmissionError> {
    if submission.answers.is_empty() {
        return Err(errors::QuizSubmissionError::EmptySubmission);
    }
    let user_id = submission.user_id;
    if AppUser::select_one(user_id, db_conn).await?.is_none() {
        return Err(errors::QuizSubmissionError::UserNonExistent(user_id));
    }
    let submitted = submission.answers.len();

    let mut graded: Vec<GradedAnswer> = Vec::with_capacity(submitted);
    let mut tallies: Vec<TopicTally> = Vec::new();
    for answer in submission.answers {
        let Some(question) = Question::select_one(answer.question_id, db_conn).await? else {
            tracing::warn!(
                "User {user_id} submitted an answer to unknown question {}",
                answer.question_id
            );
            continue;
        };
        let options = Answer::select_by_question(question.id(), db_conn).await?;
        let Some(selected) = options
            .iter()
            .find(|option| option.id() == answer.selected_answer_id)
        else {
            tracing::warn!(
                "User {user_id} selected answer {} which does not belong to question {}",
                answer.selected_answer_id,
                question.id()
            );
            continue;
        };
        let is_correct = selected.is_correct;
        let index = if let Some(index) = tallies
            .iter()
            .position(|tally| tally.topic_id == question.topic_id)
        {
            index
        } else {
            let topic_name = Topic::select_one(question.topic_id, db_conn)
                .await?
                .map_or_else(String::new, |topic| topic.name);
            tallies.push(TopicTally {
                topic_id: question.topic_id,
                topic_name,
                answered: 0,
                correct: 0,
                time_spent: None,
                missed_question_ids: Vec::new(),
            });
            tallies.len().saturating_sub(1)
        };
        if let Some(tally) = tallies.get_mut(index) {
            tally.answered = tally.answered.saturating_add(1);
            if is_correct {
                tally.correct = tally.correct.saturating_add(1);
            } else {
                tally.missed_question_ids.push(question.id());
            }
            tally.time_spent = match (tally.time_spent, answer.time_taken) {
                (Some(spent), Some(taken)) => Some(spent.saturating_add(taken)),
                (spent, taken) => spent.or(taken),
            };
        }
        graded.push(GradedAnswer { answer, is_correct });
    }
    let correct = graded.iter().filter(|graded| graded.is_correct).count();
    let score = progress::ratio(correct, submitted);

    let now = timestamp::now();
    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    let mut attempt = QuizAttemptInsert {
        user_id,
        started_at: now,
        completed_at: Some(now),
    }
    .store(&mut *tx)
    .await?;
    for graded in graded {
        UserAnswerInsert {
            quiz_attempt_id: attempt.id(),
            question_id: graded.answer.question_id,
            selected_answer_id: graded.answer.selected_answer_id,
            is_correct: graded.is_correct,
            time_taken: graded.answer.time_taken,
        }
        .store(&mut *tx)
        .await?;
    }
    attempt.score = Some(score);
    attempt.update(&mut *tx).await?;
    for tally in tallies {
        let topic_score = progress::ratio(tally.correct, tally.answered);
        UserProgressInsert {
            user_id,
            topic_id: tally.topic_id,
            score: topic_score,
            time_spent: tally.time_spent,
            completed_at: now,
            topic_name: Some(tally.topic_name),
            difficulty: None,
        }
        .store(&mut *tx)
        .await?;
        if topic_score < COMPLETION_THRESHOLD {
            KnowledgeGapInsert {
                user_id,
                topic_id: tally.topic_id,
                confidence_level: topic_score,
                meta_data: Some(json!({
                    "quiz_attempt_id": attempt.id(),
                    "missed_question_ids": tally.missed_question_ids,
                })),
                identified_at: now,
            }
            .store(&mut *tx)
            .await?;
        }
    }
    tx.commit().await.map_err(DatabaseError::from)?;
    tracing::info!(
        "User {user_id} completed quiz attempt {} scoring {correct}/{submitted}",
        attempt.id()
    );
    Ok(progress::build_quiz_result(attempt, db_conn).await?)
}

pub mod errors {
    use core::fmt;

    use thiserror::Error;

    use crate::{
        constants::quiz::MAX_QUESTION_COUNT,
        db::{errors::DatabaseError, models::question::DifficultyLevel},
    };

    /// Renders a difficulty filter, or "any" when there is none.
    #[derive(Debug, Clone, Copy)]
    pub struct DifficultyFilter(pub Option<DifficultyLevel>);

    impl fmt::Display for DifficultyFilter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.0 {
                Some(level) => write!(f, "{level}"),
                None => f.write_str("any"),
            }
        }
    }

    #[derive(Debug, Error)]
    pub enum QuizGenerationError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Question count must be between 1 and {MAX_QUESTION_COUNT}, got {0}")]
        InvalidQuestionCount(u32),
        #[error("Topic {0} not found")]
        TopicNonExistent(i64),
        #[error("No questions found for topic ID {topic_id} with difficulty {difficulty}")]
        NoQuestions {
            topic_id: i64,
            difficulty: DifficultyFilter,
        },
    }

    #[derive(Debug, Error)]
    pub enum QuizSubmissionError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("User {0} not found")]
        UserNonExistent(i64),
        #[error("A quiz submission needs at least one answer")]
        EmptySubmission,
    }
}

#[cfg(test)]
pub mod testing {
    //! Question bank fixtures.
    use crate::db::{
        models::{
            answer::AnswerInsert,
            question::{DifficultyLevel, Question, QuestionInsert, QuestionType},
        },
        ConnectionPool,
    };

    /// Store a multiple choice question whose first option is correct.
    /// Returns the question and its option IDs in insertion order.
    pub async fn question(
        text: &str,
        topic_id: i64,
        difficulty: DifficultyLevel,
        pool: &ConnectionPool,
    ) -> (Question, Vec<i64>) {
        let question = QuestionInsert {
            text: text.to_owned(),
            latex_content: None,
            question_type: QuestionType::MultipleChoice,
            difficulty,
            topic_id,
        }
        .store(pool)
        .await
        .unwrap();
        let mut options = Vec::new();
        for (index, option) in ["right", "wrong", "also wrong", "still wrong"].iter().enumerate() {
            let answer = AnswerInsert {
                text: (*option).to_owned(),
                latex_content: None,
                is_correct: index == 0,
                explanation: Some(format!("Because it is {option}")),
                question_id: question.id(),
            }
            .store(pool)
            .await
            .unwrap();
            options.push(answer.id());
        }
        (question, options)
    }
}
