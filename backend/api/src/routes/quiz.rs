//! Routes under /quiz for taking quizzes.
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::post,
    Extension, Json, Router,
};

use crate::{
    middleware::auth::{bearer_middleware, AuthenticatedUser},
    services::{
        progress::QuizResult,
        quiz::{self, QuestionView, QuizRequest, QuizSubmission},
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Create a router for the /quiz route.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/quizzes/submit", post(submit_quiz))
        .layer(from_fn_with_state(state.clone(), bearer_middleware))
        .route("/quizzes/generate", post(generate_quiz))
}

async fn generate_quiz(
    State(state): State<AppState>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Result<Json<Vec<QuestionView>>, HttpError> {
    let Json(body) = payload?;
    Ok(Json(
        quiz::generate_quiz(body, state.llm.as_deref(), &state.db).await?,
    ))
}

async fn submit_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    payload: Result<Json<QuizSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<QuizResult>), HttpError> {
    let Json(body) = payload?;
    caller.ensure_is(body.user_id, "submit a quiz")?;
    let result = quiz::submit_quiz(body, &state.db).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

impl From<quiz::errors::QuizGenerationError> for HttpError {
    fn from(error: quiz::errors::QuizGenerationError) -> Self {
        let status = match error {
            quiz::errors::QuizGenerationError::DatabaseError(err) => return err.into(),
            quiz::errors::QuizGenerationError::InvalidQuestionCount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            quiz::errors::QuizGenerationError::TopicNonExistent(_)
            | quiz::errors::QuizGenerationError::NoQuestions { .. } => StatusCode::NOT_FOUND,
        };
        Self::with_message(status, error.to_string())
    }
}

impl From<quiz::errors::QuizSubmissionError> for HttpError {
    fn from(error: quiz::errors::QuizSubmissionError) -> Self {
        let status = match error {
            quiz::errors::QuizSubmissionError::DatabaseError(err) => return err.into(),
            quiz::errors::QuizSubmissionError::UserNonExistent(_) => StatusCode::NOT_FOUND,
            quiz::errors::QuizSubmissionError::EmptySubmission => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::with_message(status, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{
        db::models::question::DifficultyLevel,
        routes::{create_router, testing},
        services::{
            content::testing as curriculum,
            llm::testing::{multiple_choice_reply, ScriptedLlmClient},
            quiz::testing as bank,
        },
    };

    #[tokio::test]
    async fn generate_serves_full_question_views() {
        let state = testing::test_state().await;
        let chapter = curriculum::chapter("Eigen", &state.db).await;
        let topic = curriculum::topic("Diagonalisation", chapter.id(), 1, &state.db).await;
        bank::question("When is A diagonalisable?", topic.id(), DifficultyLevel::Medium, &state.db)
            .await;
        let app = create_router(state);

        let (status, body) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/generate",
                Some(&json!({"topic_id": topic.id(), "question_count": 1})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body[0]["text"], "When is A diagonalisable?");
        assert_eq!(body[0]["difficulty"], "medium");
        assert_eq!(body[0]["topic"]["name"], "Diagonalisation");
        assert_eq!(body[0]["answers"][0]["is_correct"], true);
        assert_eq!(body[0]["answers"][0]["explanation"], "Because it is right");
    }

    #[tokio::test]
    async fn generate_reports_missing_questions() {
        let state = testing::test_state().await;
        let chapter = curriculum::chapter("Eigen", &state.db).await;
        let topic = curriculum::topic("Diagonalisation", chapter.id(), 1, &state.db).await;
        let app = create_router(state);

        let (status, body) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/generate",
                Some(&json!({"topic_id": topic.id(), "difficulty": "easy"})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["message"],
            format!(
                "No questions found for topic ID {} with difficulty easy",
                topic.id()
            )
        );

        let (status, _) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/generate",
                Some(&json!({"topic_id": topic.id(), "question_count": 21})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn generate_tops_up_from_the_language_model() {
        let mut state = testing::test_state().await;
        let chapter = curriculum::chapter("Eigen", &state.db).await;
        let topic = curriculum::topic("Determinants", chapter.id(), 1, &state.db).await;
        let reply = multiple_choice_reply("determinant");
        state.llm = Some(Arc::new(ScriptedLlmClient::new(&[reply.as_str()])));
        let app = create_router(state);

        let (status, body) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/generate",
                Some(&json!({"topic_id": topic.id(), "question_count": 2})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(
            body[0]["text"],
            "What is the determinant of the identity matrix?"
        );
    }

    #[tokio::test]
    async fn submit_is_authenticated_and_scored() {
        let state = testing::test_state().await;
        let chapter = curriculum::chapter("Eigen", &state.db).await;
        let topic = curriculum::topic("Eigenvectors", chapter.id(), 1, &state.db).await;
        let (question, options) =
            bank::question("Av = λv defines?", topic.id(), DifficultyLevel::Easy, &state.db).await;
        let app = create_router(state);
        let (user_id, token) = testing::register_and_login(&app, "alice").await;
        let (other_id, _) = testing::register_and_login(&app, "bob").await;
        let submission = |user_id: i64, answer: i64| {
            json!({
                "user_id": user_id,
                "answers": [{"question_id": question.id(), "selected_answer_id": answer, "time_taken": 12}]
            })
        };

        let (status, _) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/submit",
                Some(&submission(user_id, options[0])),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/submit",
                Some(&submission(other_id, options[0])),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, result) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/quiz/quizzes/submit",
                Some(&submission(user_id, options[1])),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{result}");
        assert_eq!(result["quiz_attempt"]["score"], 0.0);
        assert_eq!(result["quiz_attempt"]["user"]["username"], "alice");
        assert_eq!(result["knowledge_gaps"][0]["correct_answer"], "right");
        assert_eq!(result["recommendations"][0]["recommendation_type"], "review");
        let attempt_id = result["quiz_attempt"]["id"].as_i64().unwrap();

        let (status, attempts) = testing::send(
            &app,
            testing::request(
                Method::GET,
                &format!("/api/users/{user_id}/quiz-attempts?topic_id={}", topic.id()),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(attempts[0]["id"], attempt_id);

        let (status, fetched) = testing::send(
            &app,
            testing::request(
                Method::GET,
                &format!("/api/users/{user_id}/quiz-attempts/{attempt_id}"),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["quiz_attempt"]["answers"][0]["time_taken"], 12);

        let (status, _) = testing::send(
            &app,
            testing::request(
                Method::GET,
                &format!("/api/users/{other_id}/quiz-attempts/{attempt_id}"),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
