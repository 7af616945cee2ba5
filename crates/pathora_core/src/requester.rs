//! crates/pathora_core/src/requester.rs
//!
//! The content requester: builds the generation instructions, calls the language
//! model once in JSON mode, and decodes the answer against a strict schema.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{
    GeneratedCurriculum, GeneratedLesson, GeneratedModule, GenerationRequest, LessonContentPackage,
    LessonIdentity, Quiz, QuizQuestion, QuizRequest, RawResource,
};
use crate::ports::{CompletionRequest, LanguageModelService, PortError, PortResult};

//=========================================================================================
// Prompts
//=========================================================================================

const JSON_ONLY_SYSTEM: &str = "You are a world-class educator and curriculum designer. \
You always answer with a single valid JSON object and nothing else: no prose before or after it, \
no markdown, no code fences.";

const CURRICULUM_TEMPLATE: &str = r#"Create a comprehensive, professional learning path for "{topic}" at a "{difficulty}" level.
The path is designed for {weeks} weeks with approximately {hours} hours of study per week.
Start from the foundations and build up; each module should depend only on earlier modules.

Return a JSON object with exactly this structure:
{
  "title": "A catchy title for the path",
  "description": "A brief overview of the learning journey",
  "difficulty": "{difficulty}",
  "modules": [
    {
      "title": "Module name (e.g. Week 1: Fundamentals)",
      "order": 1,
      "lessons": [
        {
          "title": "Lesson name",
          "content": "Specific learning objectives and topics covered",
          "estimated_time": "Estimated hours (e.g. 2 hours)",
          "difficulty": "{difficulty}"
        }
      ]
    }
  ]
}

Return ONLY the JSON object. Do not wrap it in triple backticks."#;

const LESSON_TEMPLATE: &str = r#"Write a detailed study guide for the following lesson.
Title: {title}
Context: part of the "{path_title}" curriculum.
Difficulty: {difficulty}

The "content" field is GitHub-flavoured markdown of roughly 800-1200 words with:
1. A thorough explanation of the concepts.
2. Code examples in fenced code blocks where applicable.
3. Practical use cases.
4. A summary with key takeaways.

Also suggest 3 to 6 external learning resources. For each resource:
- "type" is one of: video, article, practice, doc.
- "url" is a direct link you are certain exists. If you are not certain, write "SEARCH: " followed by a search query instead of a link. Never invent placeholder links.
- "duration" is a rough time hint such as "15 min".

Return a JSON object with exactly this structure:
{
  "content": "markdown study guide",
  "why_it_matters": "One or two sentences on why this lesson matters",
  "what_you_learn": ["Outcome 1", "Outcome 2", "Outcome 3"],
  "resources": [
    { "title": "Resource title", "type": "video", "url": "https://... or SEARCH: query", "duration": "15 min" }
  ]
}

Return ONLY the JSON object. Do not wrap it in triple backticks."#;

const QUIZ_TEMPLATE: &str = r#"Write a multiple-choice quiz with {count} questions about "{topic}" at a "{difficulty}" level.
Each question has exactly four options and exactly one correct answer.

Return a JSON object with exactly this structure:
{
  "title": "Quiz title",
  "questions": [
    {
      "id": 1,
      "question": "Question text",
      "options": ["A", "B", "C", "D"],
      "correct_index": 0,
      "explanation": "Why the correct option is right"
    }
  ]
}

Return ONLY the JSON object. Do not wrap it in triple backticks."#;

/// Upper bound on the number of quiz questions a caller may request.
pub const MAX_QUIZ_QUESTIONS: u32 = 20;

//=========================================================================================
// The Requester
//=========================================================================================

/// Issues generation requests against the configured language models.
#[derive(Clone)]
pub struct ContentRequester {
    curriculum_llm: Arc<dyn LanguageModelService>,
    lesson_llm: Arc<dyn LanguageModelService>,
}

impl ContentRequester {
    /// Creates a new `ContentRequester`. Quizzes share the lesson model.
    pub fn new(
        curriculum_llm: Arc<dyn LanguageModelService>,
        lesson_llm: Arc<dyn LanguageModelService>,
    ) -> Self {
        Self {
            curriculum_llm,
            lesson_llm,
        }
    }

    /// Generates a curriculum tree for a topic.
    pub async fn generate_curriculum(
        &self,
        request: &GenerationRequest,
    ) -> PortResult<GeneratedCurriculum> {
        validate_generation_request(request)?;

        let user = fill(
            CURRICULUM_TEMPLATE,
            &[
                ("topic", request.topic.trim()),
                ("difficulty", request.difficulty.trim()),
                ("weeks", &request.duration_weeks.to_string()),
                ("hours", &request.hours_per_week.to_string()),
            ],
        );

        info!(
            "Requesting curriculum for '{}' ({}, {} weeks)",
            request.topic.trim(),
            request.difficulty.trim(),
            request.duration_weeks
        );
        let raw = self
            .curriculum_llm
            .complete(json_request(user))
            .await?;
        debug!("Curriculum model returned {} bytes", raw.len());

        decode_curriculum(&raw, request.difficulty.trim())
    }

    /// Generates the study package for an existing lesson.
    pub async fn generate_lesson_package(
        &self,
        lesson: &LessonIdentity,
    ) -> PortResult<LessonContentPackage> {
        let user = fill(
            LESSON_TEMPLATE,
            &[
                ("title", &lesson.title),
                ("path_title", &lesson.path_title),
                ("difficulty", &lesson.difficulty),
            ],
        );

        info!("Requesting content package for lesson {}", lesson.lesson_id);
        let raw = self.lesson_llm.complete(json_request(user)).await?;
        debug!("Lesson model returned {} bytes", raw.len());

        decode_lesson_package(&raw)
    }

    /// Generates a multiple-choice quiz.
    pub async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<Quiz> {
        if request.topic.trim().is_empty() {
            return Err(PortError::InvalidInput("topic must not be empty".to_string()));
        }
        if request.question_count == 0 || request.question_count > MAX_QUIZ_QUESTIONS {
            return Err(PortError::InvalidInput(format!(
                "question_count must be between 1 and {}",
                MAX_QUIZ_QUESTIONS
            )));
        }

        let user = fill(
            QUIZ_TEMPLATE,
            &[
                ("count", &request.question_count.to_string()),
                ("topic", request.topic.trim()),
                ("difficulty", request.difficulty.trim()),
            ],
        );

        info!(
            "Requesting {} question quiz for '{}'",
            request.question_count,
            request.topic.trim()
        );
        let raw = self.lesson_llm.complete(json_request(user)).await?;

        decode_quiz(&raw)
    }
}

/// Substitutes `{name}` placeholders in one pass, so braces inside the
/// substituted values are never expanded again.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values
            .iter()
            .find(|&&(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match hit {
            Some(&(name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn json_request(user: String) -> CompletionRequest {
    CompletionRequest {
        system: JSON_ONLY_SYSTEM.to_string(),
        user,
        json_mode: true,
    }
}

fn validate_generation_request(request: &GenerationRequest) -> PortResult<()> {
    if request.topic.trim().is_empty() {
        return Err(PortError::InvalidInput("topic must not be empty".to_string()));
    }
    if request.difficulty.trim().is_empty() {
        return Err(PortError::InvalidInput("difficulty must not be empty".to_string()));
    }
    if request.duration_weeks == 0 {
        return Err(PortError::InvalidInput("weeks must be at least 1".to_string()));
    }
    if request.hours_per_week == 0 {
        return Err(PortError::InvalidInput("hours_per_week must be at least 1".to_string()));
    }
    Ok(())
}

//=========================================================================================
// Wire Formats
//=========================================================================================

#[derive(Deserialize)]
struct CurriculumWire {
    title: String,
    description: String,
    #[serde(default)]
    difficulty: Option<String>,
    modules: Vec<ModuleWire>,
}

#[derive(Deserialize)]
struct ModuleWire {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    order: Option<Value>,
    #[serde(default)]
    lessons: Option<Vec<LessonWire>>,
}

#[derive(Deserialize)]
struct LessonWire {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    estimated_time: Option<Value>,
}

#[derive(Deserialize)]
struct PackageWire {
    content: String,
    #[serde(default)]
    why_it_matters: Option<Value>,
    #[serde(default)]
    what_you_learn: Option<Value>,
    #[serde(default)]
    resources: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct QuizWire {
    title: String,
    questions: Vec<QuizQuestionWire>,
}

#[derive(Deserialize)]
struct QuizQuestionWire {
    #[serde(default)]
    id: Option<u32>,
    question: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: Option<String>,
}

//=========================================================================================
// Decoding
//=========================================================================================

fn parse<T: for<'de> Deserialize<'de>>(raw: &str) -> PortResult<T> {
    serde_json::from_str(raw.trim()).map_err(|e| PortError::GenerationFormat(e.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_text(field: &str, value: String) -> PortResult<String> {
    non_blank(Some(value))
        .ok_or_else(|| PortError::GenerationFormat(format!("required field `{}` is empty", field)))
}

/// Models sometimes answer `"order": "2"` or `"estimated_time": 2`.
fn value_as_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_order(value: Option<Value>) -> Option<i32> {
    let order = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(order).ok().filter(|o| *o >= 1)
}

/// Decodes a curriculum answer. `fallback_difficulty` fills in missing
/// per-lesson and top-level difficulties.
pub fn decode_curriculum(raw: &str, fallback_difficulty: &str) -> PortResult<GeneratedCurriculum> {
    let wire: CurriculumWire = parse(raw)?;

    let title = require_text("title", wire.title)?;
    let description = require_text("description", wire.description)?;
    if wire.modules.is_empty() {
        return Err(PortError::GenerationFormat(
            "curriculum contained no modules".to_string(),
        ));
    }
    let difficulty = non_blank(wire.difficulty).unwrap_or_else(|| fallback_difficulty.to_string());

    let modules = wire
        .modules
        .into_iter()
        .map(|m| GeneratedModule {
            title: non_blank(m.title),
            order: value_as_order(m.order),
            lessons: m.lessons.map(|lessons| {
                lessons
                    .into_iter()
                    .map(|l| GeneratedLesson {
                        title: non_blank(l.title),
                        content: non_blank(l.content),
                        difficulty: non_blank(l.difficulty)
                            .unwrap_or_else(|| fallback_difficulty.to_string()),
                        estimated_time: value_as_text(l.estimated_time),
                    })
                    .collect()
            }),
        })
        .collect();

    Ok(GeneratedCurriculum {
        title,
        description,
        difficulty,
        modules,
    })
}

/// Decodes a lesson-content answer.
///
/// Resource entries that are not JSON objects, or that carry neither a title nor a
/// URL, are dropped; they cannot be resolved into anything useful.
pub fn decode_lesson_package(raw: &str) -> PortResult<LessonContentPackage> {
    let wire: PackageWire = parse(raw)?;
    let content = require_text("content", wire.content)?;

    let what_you_learn = match wire.what_you_learn {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| value_as_text(Some(item)))
            .collect(),
        Some(Value::String(s)) => non_blank(Some(s)).into_iter().collect(),
        _ => Vec::new(),
    };

    let suggested = wire.resources.unwrap_or_default();
    let mut resources = Vec::with_capacity(suggested.len());
    for (index, item) in suggested.into_iter().enumerate() {
        match serde_json::from_value::<RawResource>(item) {
            Ok(resource) if resource.title.trim().is_empty() && resource.url.trim().is_empty() => {
                warn!("Dropping suggested resource #{} with no title and no url", index);
            }
            Ok(resource) => resources.push(resource),
            Err(e) => warn!("Dropping malformed suggested resource #{}: {}", index, e),
        }
    }

    Ok(LessonContentPackage {
        content,
        why_it_matters: value_as_text(wire.why_it_matters).unwrap_or_default(),
        what_you_learn,
        resources,
    })
}

/// Decodes a quiz answer; every question must be answerable.
pub fn decode_quiz(raw: &str) -> PortResult<Quiz> {
    let wire: QuizWire = parse(raw)?;
    let title = require_text("title", wire.title)?;
    if wire.questions.is_empty() {
        return Err(PortError::GenerationFormat("quiz contained no questions".to_string()));
    }

    let questions = wire
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            let position = index + 1;
            let question = require_text("question", q.question)?;
            if q.options.len() < 2 {
                return Err(PortError::GenerationFormat(format!(
                    "question {} has fewer than two options",
                    position
                )));
            }
            if q.correct_index >= q.options.len() {
                return Err(PortError::GenerationFormat(format!(
                    "question {} has correct_index {} but only {} options",
                    position,
                    q.correct_index,
                    q.options.len()
                )));
            }
            Ok(QuizQuestion {
                id: q.id.unwrap_or(position as u32),
                question,
                options: q.options,
                correct_index: q.correct_index,
                explanation: non_blank(q.explanation).unwrap_or_default(),
            })
        })
        .collect::<PortResult<Vec<_>>>()?;

    Ok(Quiz { title, questions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    fn request() -> GenerationRequest {
        GenerationRequest {
            topic: "Rust async".to_string(),
            difficulty: "intermediate".to_string(),
            duration_weeks: 4,
            hours_per_week: 5,
            requester_id: 7,
        }
    }

    const CURRICULUM: &str = r#"{
        "title": "Async Rust From Scratch",
        "description": "Futures, executors and tokio.",
        "modules": [
            { "title": "Week 1: Futures", "order": 1, "lessons": [
                { "title": "Poll", "content": "How poll works", "estimated_time": "2 hours" },
                { "title": "Wakers", "content": "Wakeups", "estimated_time": 3, "difficulty": "advanced" }
            ]},
            { "title": "Week 2: Tokio", "order": "4", "lessons": [] }
        ]
    }"#;

    #[tokio::test]
    async fn generate_curriculum_sends_json_mode_prompt_with_request_values() {
        let model = Arc::new(ScriptedModel::with_responses(vec![Ok(CURRICULUM.to_string())]));
        let requester = ContentRequester::new(model.clone(), model.clone());

        let curriculum = requester.generate_curriculum(&request()).await.unwrap();

        assert_eq!(curriculum.title, "Async Rust From Scratch");
        let sent = model.requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].json_mode);
        assert!(sent[0].user.contains("\"Rust async\""));
        assert!(sent[0].user.contains("4 weeks"));
        assert!(sent[0].user.contains("5 hours"));
    }

    #[test]
    fn missing_optional_fields_fall_back_to_caller_difficulty() {
        let curriculum = decode_curriculum(CURRICULUM, "intermediate").unwrap();

        assert_eq!(curriculum.difficulty, "intermediate");
        let lessons = curriculum.modules[0].lessons.as_ref().unwrap();
        assert_eq!(lessons[0].difficulty, "intermediate");
        assert_eq!(lessons[1].difficulty, "advanced");
        assert_eq!(lessons[1].estimated_time.as_deref(), Some("3"));
        assert_eq!(curriculum.modules[1].order, Some(4));
    }

    #[test]
    fn missing_top_level_field_is_a_format_error() {
        let raw = r#"{ "title": "No description", "modules": [] }"#;
        let err = decode_curriculum(raw, "beginner").unwrap_err();
        assert!(matches!(err, PortError::GenerationFormat(ref m) if m.contains("description")));
    }

    #[test]
    fn prose_around_json_is_a_format_error() {
        let raw = "Sure! Here is your path:\n```json\n{\"title\":\"x\"}\n```";
        assert!(matches!(
            decode_curriculum(raw, "beginner"),
            Err(PortError::GenerationFormat(_))
        ));
    }

    #[test]
    fn non_positive_order_is_discarded() {
        let raw = r#"{ "title": "t", "description": "d", "modules": [
            { "title": "m", "order": 0, "lessons": [] }
        ]}"#;
        let curriculum = decode_curriculum(raw, "beginner").unwrap();
        assert_eq!(curriculum.modules[0].order, None);
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_without_retry() {
        let model = Arc::new(ScriptedModel::with_responses(vec![
            Err(PortError::GenerationProvider("503 from upstream".to_string())),
            Ok(CURRICULUM.to_string()),
        ]));
        let requester = ContentRequester::new(model.clone(), model.clone());

        let err = requester.generate_curriculum(&request()).await.unwrap_err();

        assert!(matches!(err, PortError::GenerationProvider(_)));
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_model() {
        let model = Arc::new(ScriptedModel::with_responses(vec![]));
        let requester = ContentRequester::new(model.clone(), model.clone());
        let mut bad = request();
        bad.duration_weeks = 0;

        let err = requester.generate_curriculum(&bad).await.unwrap_err();

        assert!(matches!(err, PortError::InvalidInput(_)));
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn quiz_size_is_bounded_before_calling_the_model() {
        let model = Arc::new(ScriptedModel::with_responses(vec![]));
        let requester = ContentRequester::new(model.clone(), model.clone());

        for count in [0, MAX_QUIZ_QUESTIONS + 1] {
            let err = requester
                .generate_quiz(&QuizRequest {
                    topic: "SQL".to_string(),
                    difficulty: "beginner".to_string(),
                    question_count: count,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, PortError::InvalidInput(_)));
        }
        assert!(model.requests().is_empty());
    }

    #[test]
    fn lesson_package_keeps_resources_and_drops_unusable_ones() {
        let raw = r#"{
            "content": "Markdown body",
            "why_it_matters": "Because.",
            "what_you_learn": ["one", "two"],
            "resources": [
                { "title": "Hooks in 10 minutes", "type": "video", "url": "SEARCH: react hooks", "duration": "10 min" },
                "not an object",
                { "type": "article" },
                { "title": "Docs", "type": "doc", "url": "react.dev/reference" }
            ]
        }"#;

        let package = decode_lesson_package(raw).unwrap();

        assert_eq!(package.what_you_learn, vec!["one", "two"]);
        assert_eq!(package.resources.len(), 2);
        assert_eq!(package.resources[0].kind, "video");
        assert_eq!(package.resources[0].duration.as_deref(), Some("10 min"));
        assert_eq!(package.resources[1].title, "Docs");
    }

    #[tokio::test]
    async fn braces_in_the_topic_are_not_expanded() {
        let model = Arc::new(ScriptedModel::with_responses(vec![Ok(CURRICULUM.to_string())]));
        let requester = ContentRequester::new(model.clone(), model.clone());
        let mut req = request();
        req.topic = "Templates {difficulty} and {weeks}".to_string();

        requester.generate_curriculum(&req).await.unwrap();

        let prompt = &model.requests()[0].user;
        assert!(prompt.contains("\"Templates {difficulty} and {weeks}\""));
        assert!(prompt.contains("\"intermediate\" level"));
    }

    #[test]
    fn fill_leaves_unknown_placeholders_and_json_braces_alone() {
        let filled = fill("{a} {\"k\": 1} {b} {a}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(filled, "{b} {\"k\": 1} x {b}");
    }

    #[test]
    fn empty_description_is_a_format_error() {
        let raw = r#"{ "title": "t", "description": "  ", "modules": [
            { "title": "m", "order": 1, "lessons": [] }
        ]}"#;
        let err = decode_curriculum(raw, "beginner").unwrap_err();
        assert!(matches!(err, PortError::GenerationFormat(ref m) if m.contains("description")));
    }

    #[test]
    fn null_resources_and_numeric_durations_are_tolerated() {
        let package =
            decode_lesson_package(r#"{ "content": "body", "resources": null }"#).unwrap();
        assert!(package.resources.is_empty());

        let raw = r#"{
            "content": "body",
            "why_it_matters": null,
            "resources": [
                { "title": "Ownership talk", "type": "video", "url": null, "duration": 15 }
            ]
        }"#;
        let package = decode_lesson_package(raw).unwrap();
        assert_eq!(package.why_it_matters, "");
        assert_eq!(package.resources.len(), 1);
        assert_eq!(package.resources[0].duration.as_deref(), Some("15"));
        assert_eq!(package.resources[0].url, "");
    }

    #[test]
    fn lesson_package_without_content_is_a_format_error() {
        let raw = r#"{ "why_it_matters": "x", "resources": [] }"#;
        assert!(matches!(
            decode_lesson_package(raw),
            Err(PortError::GenerationFormat(_))
        ));
    }

    #[test]
    fn quiz_with_out_of_range_answer_is_rejected() {
        let raw = r#"{ "title": "Q", "questions": [
            { "question": "2+2?", "options": ["3", "4"], "correct_index": 2 }
        ]}"#;
        let err = decode_quiz(raw).unwrap_err();
        assert!(matches!(err, PortError::GenerationFormat(ref m) if m.contains("correct_index")));
    }

    #[test]
    fn quiz_ids_default_to_position() {
        let raw = r#"{ "title": "Q", "questions": [
            { "question": "a?", "options": ["x", "y"], "correct_index": 1, "explanation": "y" },
            { "question": "b?", "options": ["x", "y"], "correct_index": 0 }
        ]}"#;
        let quiz = decode_quiz(raw).unwrap();
        assert_eq!(quiz.questions[1].id, 2);
        assert_eq!(quiz.questions[1].explanation, "");
    }
}
