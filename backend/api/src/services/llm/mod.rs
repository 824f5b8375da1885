//! Quiz question generation with a language model.
pub mod anthropic;

use std::sync::LazyLock;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::db::models::{
    content::Content,
    question::{DifficultyLevel, QuestionType},
    topic::Topic,
};

static FENCED_JSON_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)```(?:json)?\s*(\[\s*\{.*?\}\s*\])\s*```")
        .expect("Fenced JSON regex invalid")
});

static TRAILING_COMMA_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r",(\s*[\]}])").expect("Trailing comma regex invalid"));

/// A text completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single user prompt and return the model's text reply.
    async fn complete(&self, prompt: &str) -> Result<String, errors::LlmError>;
}

/// An answer option proposed by the model.
#[derive(Deserialize, Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    #[serde(default)]
    pub latex_content: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A question proposed by the model, before it is stored.
#[derive(Deserialize, Debug, Clone)]
pub struct GeneratedQuestion {
    pub text: String,
    #[serde(default)]
    pub latex_content: Option<String>,
    pub question_type: QuestionType,
    pub difficulty: DifficultyLevel,
    pub answers: Vec<GeneratedAnswer>,
}

impl GeneratedQuestion {
    /// Whether the question is complete enough to put in front of a learner.
    /// Multiple choice questions need at least four options, exactly one of
    /// them correct.
    pub fn is_valid(&self) -> bool {
        if self.text.trim().is_empty() || self.answers.is_empty() {
            return false;
        }
        match self.question_type {
            QuestionType::MultipleChoice => {
                self.answers.len() >= 4
                    && self.answers.iter().filter(|answer| answer.is_correct).count() == 1
            }
            QuestionType::OpenEnded => true,
        }
    }
}

/// What to ask the model for.
pub struct GenerationRequest<'a> {
    pub topic: &'a Topic,
    pub contents: &'a [Content],
    pub difficulty: Option<DifficultyLevel>,
    pub question_count: u32,
    pub question_type: QuestionType,
}

impl GenerationRequest<'_> {
    /// Render the instruction prompt for this request.
    pub fn prompt(&self) -> String {
        let material: String = self
            .contents
            .iter()
            .map(|content| {
                let latex = content
                    .latex_content
                    .as_deref()
                    .filter(|latex| !latex.is_empty())
                    .map(|latex| format!("LaTeX: {latex}\n"))
                    .unwrap_or_default();
                format!(
                    "--- {}: {} ---\n{}\n{latex}\n",
                    content.content_type.as_str().to_uppercase(),
                    content.title,
                    content.text_content
                )
            })
            .collect();
        let difficulty = self
            .difficulty
            .map(|level| format!(" at {level} difficulty level"))
            .unwrap_or_default();
        format!(
            r#"You are an expert linear algebra instructor.
Create {count}{difficulty} {question_type} questions on the topic: "{name}".
Topic description: {description}

Here is the content material for this topic:

{material}
For each question:
1. Create a clear, concise question text.
2. For multiple choice questions, provide exactly 4 answer options with ONE correct answer and THREE plausible distractors.
3. Include LaTeX where appropriate for mathematical notation.
4. Explain why the correct answer is correct and why each incorrect answer is wrong.
5. Assign the appropriate difficulty level (easy, medium, or hard).

Format your response as a JSON array of question objects, where each object has the following structure:
{{
  "text": "Question text",
  "latex_content": "LaTeX representation (if needed)",
  "question_type": "{question_type}",
  "difficulty": "easy|medium|hard",
  "answers": [
    {{
      "text": "Answer option text",
      "latex_content": "LaTeX representation (if needed)",
      "is_correct": true|false,
      "explanation": "Explanation why this answer is correct/incorrect"
    }}
  ]
}}

IMPORTANT: Make sure the JSON is valid and properly formatted.
"#,
            count = self.question_count,
            question_type = self.question_type,
            name = self.topic.name,
            description = self.topic.description,
        )
    }
}

/// Locate the JSON array in a model reply. The outermost brackets win; a
/// fenced code block is the fallback.
fn extract_json(response: &str) -> Option<&str> {
    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) {
        if end > start {
            return response.get(start..=end);
        }
    }
    FENCED_JSON_REGEX
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
}

/// Parse a JSON array, retrying once with trailing commas removed.
fn parse_json_array(json: &str) -> Result<Vec<Value>, serde_json::Error> {
    serde_json::from_str(json).or_else(|err| {
        let repaired = TRAILING_COMMA_REGEX.replace_all(json, "$1");
        serde_json::from_str(&repaired).map_err(|_| err)
    })
}

/// Turn a model reply into the valid questions it contains. Malformed entries
/// are dropped; a reply with no parseable array is an error.
pub fn parse_response(response: &str) -> Result<Vec<GeneratedQuestion>, errors::LlmError> {
    let json = extract_json(response).ok_or(errors::LlmError::NoJson)?;
    Ok(parse_json_array(json)?
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GeneratedQuestion>(item).ok())
        .filter(GeneratedQuestion::is_valid)
        .collect())
}

/// Ask the model for questions, making up to `retries` further attempts when a
/// call or parse fails.
pub async fn generate_questions(
    client: &dyn LlmClient,
    request: &GenerationRequest<'_>,
    retries: u32,
) -> Result<Vec<GeneratedQuestion>, errors::LlmError> {
    let prompt = request.prompt();
    let mut attempt = 0;
    loop {
        let outcome = match client.complete(&prompt).await {
            Ok(reply) => parse_response(&reply),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(questions) => return Ok(questions),
            Err(err) if attempt < retries => {
                attempt += 1;
                tracing::warn!(
                    "Question generation for topic {} failed ({err}), retrying ({attempt}/{retries})",
                    request.topic.id()
                );
            }
            Err(err) => return Err(err),
        }
    }
}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum LlmError {
        #[error("Request to language model failed: {0}")]
        Request(#[from] reqwest::Error),
        #[error("Language model returned status {status}: {body}")]
        Api { status: u16, body: String },
        #[error("Language model reply contained no text")]
        EmptyReply,
        #[error("Could not extract JSON from language model reply")]
        NoJson,
        #[error("Failed to parse JSON from language model reply: {0}")]
        Json(#[from] serde_json::Error),
    }
}

#[cfg(test)]
pub mod testing {
    //! A scripted `LlmClient` for tests.
    use std::{collections::VecDeque, sync::Mutex};

    use async_trait::async_trait;

    use super::{errors::LlmError, LlmClient};

    /// Replays canned replies in order. Once exhausted every call fails.
    pub struct ScriptedLlmClient {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<u32>,
    }

    impl ScriptedLlmClient {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|reply| (*reply).to_owned()).collect()),
                calls: Mutex::new(0),
            }
        }

        pub fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlmClient {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(LlmError::EmptyReply)
        }
    }

    /// A reply holding one valid multiple choice question about `subject`.
    pub fn multiple_choice_reply(subject: &str) -> String {
        format!(
            r#"Here are your questions:
```json
[
  {{
    "text": "What is the {subject} of the identity matrix?",
    "question_type": "multiple_choice",
    "difficulty": "easy",
    "answers": [
      {{"text": "1", "is_correct": true, "explanation": "Product of the diagonal."}},
      {{"text": "0", "is_correct": false}},
      {{"text": "-1", "is_correct": false}},
      {{"text": "n", "is_correct": false}},
    ]
  }}
]
```"#
        )
    }
}
