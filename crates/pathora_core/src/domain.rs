//! crates/pathora_core/src/domain.rs
//!
//! Defines the core data structures for the content pipeline.
//! These structs are independent of any database; the serde derives describe
//! the JSON payloads exchanged with callers and stored in lesson blobs.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

pub type UserId = i64;
pub type PathId = i64;
pub type ModuleId = i64;
pub type LessonId = i64;

//=========================================================================================
// Generation Requests
//=========================================================================================

/// A request to synthesize a curriculum for a topic. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub difficulty: String,
    pub duration_weeks: u32,
    pub hours_per_week: u32,
    pub requester_id: UserId,
}

/// Everything the lesson-content prompt needs to know about an existing lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonIdentity {
    pub lesson_id: LessonId,
    pub title: String,
    pub difficulty: String,
    pub path_title: String,
    /// Creator of the path the lesson belongs to, if any.
    pub owner_id: Option<UserId>,
}

/// A request for a multiple-choice quiz on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub topic: String,
    pub difficulty: String,
    pub question_count: u32,
}

//=========================================================================================
// Generated Curriculum
//=========================================================================================

/// The decoded title/description/modules tree produced by the model.
///
/// Per-item fields stay optional here; the materializer enforces the required
/// ones inside its write transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedCurriculum {
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub modules: Vec<GeneratedModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedModule {
    pub title: Option<String>,
    pub order: Option<i32>,
    pub lessons: Option<Vec<GeneratedLesson>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedLesson {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Already defaulted to the caller-supplied difficulty when the model omitted it.
    pub difficulty: String,
    pub estimated_time: Option<String>,
}

/// The success signal of a materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedPath {
    pub path_id: PathId,
    pub title: String,
}

//=========================================================================================
// Lesson Content and Resources
//=========================================================================================

/// Detailed study content generated for one lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonContentPackage {
    pub content: String,
    pub why_it_matters: String,
    pub what_you_learn: Vec<String>,
    pub resources: Vec<RawResource>,
}

/// A resource as suggested by the model, or as stored in `lessons.ai_resources`.
///
/// Every field is lenient on decode: a suggestion with a missing URL is still
/// resolvable through its title, and numeric durations are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawResource {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: String,
    #[serde(
        default,
        alias = "duration_hint",
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<String>,
}

/// Accepts a string or a number; anything else, `null` included, is absent.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_or_number(deserializer)?.unwrap_or_default())
}

/// The closed set of resource categories shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceCategory {
    #[serde(rename = "Video Courses")]
    VideoCourses,
    #[serde(rename = "Articles & Tutorials")]
    ArticlesAndTutorials,
    #[serde(rename = "Practice Platforms")]
    PracticePlatforms,
}

impl ResourceCategory {
    pub fn label(self) -> &'static str {
        match self {
            ResourceCategory::VideoCourses => "Video Courses",
            ResourceCategory::ArticlesAndTutorials => "Articles & Tutorials",
            ResourceCategory::PracticePlatforms => "Practice Platforms",
        }
    }

    pub fn icon(self) -> IconTag {
        match self {
            ResourceCategory::VideoCourses => IconTag::Video,
            ResourceCategory::ArticlesAndTutorials => IconTag::FileText,
            ResourceCategory::PracticePlatforms => IconTag::Code,
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Icon names understood by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IconTag {
    Video,
    Code,
    FileText,
}

/// A validated, categorized resource. Derived per response, never stored as a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResource {
    /// Negative and unique within a single response; not a durable key.
    #[serde(rename = "id")]
    pub synthetic_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub category: ResourceCategory,
    #[serde(rename = "url")]
    pub final_url: String,
    pub suggested_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(rename = "icon_name")]
    pub icon: IconTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<LessonId>,
}

impl ResolvedResource {
    /// The form written back into `lessons.ai_resources`: the suggestion with its
    /// URL replaced by the resolved one.
    pub fn to_stored(&self) -> RawResource {
        RawResource {
            title: self.title.clone(),
            kind: self.kind.clone(),
            url: self.final_url.clone(),
            duration: self.duration.clone(),
        }
    }
}

/// A curated row from the shared `resources` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualResource {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: Option<String>,
    pub url: String,
    pub icon_name: Option<String>,
}

/// One entry of an aggregated resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResourceEntry {
    Manual(ManualResource),
    Generated(ResolvedResource),
}

impl ResourceEntry {
    pub fn title(&self) -> &str {
        match self {
            ResourceEntry::Manual(r) => &r.title,
            ResourceEntry::Generated(r) => &r.title,
        }
    }
}

/// The raw `ai_resources` column of one owner-visible lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonResourceBlob {
    pub lesson_id: LessonId,
    pub ai_resources: String,
}

/// The lesson columns rewritten by content generation, assembled in full before
/// the single update that stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonContentUpdate {
    pub content: String,
    pub why_it_matters: String,
    /// JSON array of strings.
    pub what_you_learn: String,
    /// JSON array of `RawResource`.
    pub ai_resources: String,
}

/// What a caller gets back after generating content for a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedLessonContent {
    pub lesson_id: LessonId,
    pub content: String,
    pub why_it_matters: String,
    pub what_you_learn: Vec<String>,
    pub resources: Vec<ResolvedResource>,
}

//=========================================================================================
// Quizzes
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}
