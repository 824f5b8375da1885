//! Learner progress: recorded scores, knowledge gaps, quiz results and the
//! summaries and recommendations derived from them.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    constants::progress::{
        COMPLETION_THRESHOLD, KNOWLEDGE_GAPS_LIMIT, NEXT_TOPICS_LIMIT, REVIEW_THRESHOLD,
        REVIEW_TOPICS_LIMIT,
    },
    db::{
        self,
        models::{
            answer::Answer,
            appuser::AppUser,
            chapter::Chapter,
            content::Content,
            knowledge_gap::{KnowledgeGap, KnowledgeGapInsert},
            question::{DifficultyLevel, Question},
            quiz_attempt::QuizAttempt,
            topic::Topic,
            user_answer::UserAnswer,
            user_progress::{UserProgress, UserProgressInsert},
        },
    },
    utils::timestamp,
};

const UNKNOWN_TOPIC_NAME: &str = "Unknown";
const NO_CORRECT_ANSWER: &str = "No correct answer found";

/// `part / whole`, or 0 for an empty whole.
#[expect(
    clippy::as_conversions,
    clippy::cast_precision_loss,
    reason = "Answer and topic counts stay far below 2^52"
)]
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Deserialize)]
pub struct ProgressCreate {
    pub user_id: i64,
    pub topic_id: i64,
    pub score: f64,
    #[serde(default)]
    pub time_spent: Option<i64>,
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub difficulty: Option<DifficultyLevel>,
}

#[derive(Deserialize)]
pub struct KnowledgeGapCreate {
    pub user_id: i64,
    pub topic_id: i64,
    pub confidence_level: f64,
    #[serde(default)]
    pub meta_data: Option<Value>,
}

/// One recorded answer within a quiz result.
#[derive(Serialize, Debug)]
pub struct AnsweredQuestion {
    pub question_id: i64,
    pub selected_answer_id: i64,
    pub time_taken: Option<i64>,
    pub is_correct: bool,
    /// Explanation attached to the option the learner picked.
    pub explanation: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub answers: Vec<AnsweredQuestion>,
    pub user: Option<AppUser>,
}

/// A question the learner got wrong.
#[derive(Serialize, Debug)]
pub struct MissedQuestion {
    pub topic_id: i64,
    pub topic_name: String,
    pub question_id: i64,
    pub question_text: String,
    pub correct_answer: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Review,
}

/// Material to revisit for a topic with missed questions.
#[derive(Serialize, Debug)]
pub struct Recommendation {
    pub topic_id: i64,
    pub topic_name: String,
    pub recommendation_type: RecommendationType,
    pub content_ids: Vec<i64>,
    pub content_titles: Vec<String>,
}

/// A graded quiz attempt with the gaps it revealed.
#[derive(Serialize, Debug)]
pub struct QuizResult {
    pub quiz_attempt: AttemptDetail,
    pub knowledge_gaps: Vec<MissedQuestion>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize, Debug, Clone)]
pub struct TopicProgress {
    pub topic_id: i64,
    pub topic_name: String,
    pub completed: bool,
    pub score: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ChapterProgress {
    pub chapter_id: i64,
    pub chapter_title: String,
    pub progress: f64,
    pub topics: Vec<TopicProgress>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CurriculumProgress {
    pub overall_progress: f64,
    pub chapters: Vec<ChapterProgress>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct NextTopic {
    pub chapter_id: i64,
    pub chapter_title: String,
    pub topic_id: i64,
    pub topic_name: String,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ReviewTopic {
    pub chapter_id: i64,
    pub chapter_title: String,
    pub topic_id: i64,
    pub topic_name: String,
    pub score: f64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct GapSummary {
    pub topic_id: i64,
    pub topic_name: String,
    pub confidence_level: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Completed,
    InProgress,
    NotStarted,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct LearningPathStep {
    pub chapter_id: i64,
    pub chapter_title: String,
    pub topic_id: i64,
    pub topic_name: String,
    pub status: TopicStatus,
    pub score: f64,
}

#[derive(Serialize, Debug)]
pub struct Recommendations {
    pub next_topics: Vec<NextTopic>,
    pub review_topics: Vec<ReviewTopic>,
    pub knowledge_gaps: Vec<GapSummary>,
    pub learning_path: Vec<LearningPathStep>,
}

async fn ensure_user_exists(
    user_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<(), errors::ProgressError> {
    if AppUser::select_one(user_id, db_conn).await?.is_none() {
        return Err(errors::ProgressError::UserNonExistent(user_id));
    }
    Ok(())
}

async fn topic_name(topic_id: i64, db_conn: &db::ConnectionPool) -> Result<String, db::errors::DatabaseError> {
    Ok(Topic::select_one(topic_id, db_conn)
        .await?
        .map_or_else(|| UNKNOWN_TOPIC_NAME.to_owned(), |topic| topic.name))
}

pub async fn list_progress(
    user_id: i64,
    topic_id: Option<i64>,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<UserProgress>, errors::ProgressError> {
    ensure_user_exists(user_id, db_conn).await?;
    Ok(UserProgress::select_for_user(user_id, topic_id, db_conn).await?)
}

/// Record a progress entry for `user_id`. The entry's topic name defaults to
/// the topic's current name.
pub async fn record_progress(
    user_id: i64,
    data: ProgressCreate,
    db_conn: &db::ConnectionPool,
) -> Result<UserProgress, errors::ProgressError> {
    if data.user_id != user_id {
        return Err(errors::ProgressError::UserMismatch);
    }
    if !(0.0..=1.0).contains(&data.score) {
        return Err(errors::ProgressError::ScoreOutOfRange(data.score));
    }
    ensure_user_exists(user_id, db_conn).await?;
    let topic = Topic::select_one(data.topic_id, db_conn)
        .await?
        .ok_or(errors::ProgressError::TopicNonExistent(data.topic_id))?;
    Ok(UserProgressInsert {
        user_id,
        topic_id: topic.id(),
        score: data.score,
        time_spent: data.time_spent,
        completed_at: timestamp::now(),
        topic_name: Some(data.topic_name.unwrap_or(topic.name)),
        difficulty: data.difficulty.map(|level| level.to_string()),
    }
    .store(db_conn)
    .await?)
}

pub async fn list_knowledge_gaps(
    user_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<KnowledgeGap>, errors::ProgressError> {
    ensure_user_exists(user_id, db_conn).await?;
    Ok(KnowledgeGap::select_for_user(user_id, db_conn).await?)
}

pub async fn record_knowledge_gap(
    user_id: i64,
    data: KnowledgeGapCreate,
    db_conn: &db::ConnectionPool,
) -> Result<KnowledgeGap, errors::ProgressError> {
    if data.user_id != user_id {
        return Err(errors::ProgressError::UserMismatch);
    }
    if !(0.0..=1.0).contains(&data.confidence_level) {
        return Err(errors::ProgressError::ConfidenceOutOfRange(
            data.confidence_level,
        ));
    }
    ensure_user_exists(user_id, db_conn).await?;
    if Topic::select_one(data.topic_id, db_conn).await?.is_none() {
        return Err(errors::ProgressError::TopicNonExistent(data.topic_id));
    }
    Ok(KnowledgeGapInsert {
        user_id,
        topic_id: data.topic_id,
        confidence_level: data.confidence_level,
        meta_data: data.meta_data,
        identified_at: timestamp::now(),
    }
    .store(db_conn)
    .await?)
}

pub async fn list_quiz_attempts(
    user_id: i64,
    topic_id: Option<i64>,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<QuizAttempt>, errors::ProgressError> {
    ensure_user_exists(user_id, db_conn).await?;
    Ok(QuizAttempt::select_for_user(user_id, topic_id, db_conn).await?)
}

/// Assemble the detailed result of an attempt: every recorded answer, one
/// entry per missed question, and review material for each topic missed.
pub async fn build_quiz_result(
    attempt: QuizAttempt,
    db_conn: &db::ConnectionPool,
) -> Result<QuizResult, db::errors::DatabaseError> {
    let user = AppUser::select_one(attempt.user_id, db_conn).await?;
    let mut answers = Vec::new();
    let mut knowledge_gaps = Vec::new();
    let mut gap_topics: Vec<i64> = Vec::new();
    for recorded in UserAnswer::select_for_attempt(attempt.id(), db_conn).await? {
        let explanation = Answer::select_one(recorded.selected_answer_id, db_conn)
            .await?
            .and_then(|selected| selected.explanation);
        if !recorded.is_correct {
            if let Some(question) = Question::select_one(recorded.question_id, db_conn).await? {
                let correct_answer = Answer::select_correct(question.id(), db_conn)
                    .await?
                    .map_or_else(|| NO_CORRECT_ANSWER.to_owned(), |answer| answer.text);
                if !gap_topics.contains(&question.topic_id) {
                    gap_topics.push(question.topic_id);
                }
                knowledge_gaps.push(MissedQuestion {
                    topic_id: question.topic_id,
                    topic_name: topic_name(question.topic_id, db_conn).await?,
                    question_id: question.id(),
                    question_text: question.text,
                    correct_answer,
                });
            }
        }
        answers.push(AnsweredQuestion {
            question_id: recorded.question_id,
            selected_answer_id: recorded.selected_answer_id,
            time_taken: recorded.time_taken,
            is_correct: recorded.is_correct,
            explanation,
        });
    }
    let mut recommendations = Vec::new();
    for topic_id in gap_topics {
        let Some(topic) = Topic::select_one(topic_id, db_conn).await? else {
            continue;
        };
        let contents = Content::select_by_topic(topic_id, db_conn).await?;
        recommendations.push(Recommendation {
            topic_id,
            topic_name: topic.name,
            recommendation_type: RecommendationType::Review,
            content_ids: contents.iter().map(Content::id).collect(),
            content_titles: contents.into_iter().map(|content| content.title).collect(),
        });
    }
    Ok(QuizResult {
        quiz_attempt: AttemptDetail {
            attempt,
            answers,
            user,
        },
        knowledge_gaps,
        recommendations,
    })
}

/// The result of one of `user_id`'s attempts.
pub async fn retrieve_quiz_result(
    user_id: i64,
    attempt_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<QuizResult, errors::ProgressError> {
    let attempt = QuizAttempt::select_one(attempt_id, db_conn)
        .await?
        .ok_or(errors::ProgressError::AttemptNonExistent(attempt_id))?;
    if attempt.user_id != user_id {
        return Err(errors::ProgressError::AttemptNotOwned {
            attempt_id,
            user_id,
        });
    }
    Ok(build_quiz_result(attempt, db_conn).await?)
}

/// Completion of every chapter, judged on each topic's most recent entry.
pub async fn curriculum_progress(
    user_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<CurriculumProgress, errors::ProgressError> {
    ensure_user_exists(user_id, db_conn).await?;
    let mut latest: HashMap<i64, UserProgress> = HashMap::new();
    // Newest first, so the first entry seen per topic is its latest.
    for entry in UserProgress::select_for_user(user_id, None, db_conn).await? {
        latest.entry(entry.topic_id).or_insert(entry);
    }
    let mut chapters = Vec::new();
    let (mut total, mut completed) = (0_usize, 0_usize);
    for chapter in Chapter::select_all(db_conn).await? {
        let topics: Vec<TopicProgress> = Topic::select_by_chapter(chapter.id(), db_conn)
            .await?
            .into_iter()
            .map(|topic| {
                let entry = latest.get(&topic.id());
                let score = entry.map_or(0.0, |progress| progress.score);
                TopicProgress {
                    topic_id: topic.id(),
                    topic_name: topic.name,
                    completed: entry.is_some() && score >= COMPLETION_THRESHOLD,
                    score,
                    completed_at: entry.map(|progress| progress.completed_at),
                }
            })
            .collect();
        let chapter_completed = topics.iter().filter(|topic| topic.completed).count();
        total = total.saturating_add(topics.len());
        completed = completed.saturating_add(chapter_completed);
        chapters.push(ChapterProgress {
            chapter_id: chapter.id(),
            chapter_title: chapter.title,
            progress: ratio(chapter_completed, topics.len()),
            topics,
        });
    }
    Ok(CurriculumProgress {
        overall_progress: ratio(completed, total),
        chapters,
    })
}

/// What to study next, what to revisit, and the full path through the
/// curriculum with each topic's status.
pub async fn recommendations(
    user_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<Recommendations, errors::ProgressError> {
    let summary = curriculum_progress(user_id, db_conn).await?;
    let mut next_topics = Vec::new();
    let mut review_topics = Vec::new();
    let mut learning_path = Vec::new();
    for chapter in &summary.chapters {
        if let Some(topic) = chapter.topics.iter().find(|topic| !topic.completed) {
            next_topics.push(NextTopic {
                chapter_id: chapter.chapter_id,
                chapter_title: chapter.chapter_title.clone(),
                topic_id: topic.topic_id,
                topic_name: topic.topic_name.clone(),
            });
        }
        for topic in &chapter.topics {
            if topic.completed && topic.score < REVIEW_THRESHOLD {
                review_topics.push(ReviewTopic {
                    chapter_id: chapter.chapter_id,
                    chapter_title: chapter.chapter_title.clone(),
                    topic_id: topic.topic_id,
                    topic_name: topic.topic_name.clone(),
                    score: topic.score,
                });
            }
            let status = if topic.completed {
                TopicStatus::Completed
            } else if topic.score > 0.0 {
                TopicStatus::InProgress
            } else {
                TopicStatus::NotStarted
            };
            learning_path.push(LearningPathStep {
                chapter_id: chapter.chapter_id,
                chapter_title: chapter.chapter_title.clone(),
                topic_id: topic.topic_id,
                topic_name: topic.topic_name.clone(),
                status,
                score: topic.score,
            });
        }
    }
    next_topics.truncate(NEXT_TOPICS_LIMIT);
    review_topics.truncate(REVIEW_TOPICS_LIMIT);
    let mut knowledge_gaps = Vec::new();
    for gap in KnowledgeGap::select_for_user(user_id, db_conn)
        .await?
        .into_iter()
        .take(KNOWLEDGE_GAPS_LIMIT)
    {
        knowledge_gaps.push(GapSummary {
            topic_id: gap.topic_id,
            topic_name: topic_name(gap.topic_id, db_conn).await?,
            confidence_level: gap.confidence_level,
        });
    }
    Ok(Recommendations {
        next_topics,
        review_topics,
        knowledge_gaps,
        learning_path,
    })
}

pub mod errors {
    use thiserror::Error;

    use crate::db::errors::DatabaseError;

    #[derive(Debug, Error)]
    pub enum ProgressError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("User {0} not found")]
        UserNonExistent(i64),
        #[error("Topic {0} not found")]
        TopicNonExistent(i64),
        #[error("User ID in path must match user ID in request body")]
        UserMismatch,
        #[error("Score {0} is outside the range 0 to 1")]
        ScoreOutOfRange(f64),
        #[error("Confidence level {0} is outside the range 0 to 1")]
        ConfidenceOutOfRange(f64),
        #[error("Quiz attempt {0} not found")]
        AttemptNonExistent(i64),
        #[error("Quiz attempt {attempt_id} does not belong to user {user_id}")]
        AttemptNotOwned { attempt_id: i64, user_id: i64 },
    }
}
