pub mod aggregator;
pub mod domain;
pub mod materializer;
pub mod pipeline;
pub mod ports;
pub mod requester;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use domain::{
    GeneratedCurriculum, GeneratedLessonContent, GenerationRequest, LessonContentPackage,
    LessonIdentity, ManualResource, PersistedPath, Quiz, QuizRequest, RawResource,
    ResolvedResource, ResourceCategory, ResourceEntry, UserId,
};
pub use pipeline::ContentPipeline;
pub use ports::{
    CompletionRequest, CurriculumTransaction, DatabaseService, LanguageModelService, PortError,
    PortResult, SearchHit, SearchService,
};
pub use requester::ContentRequester;
pub use resolver::ResourceResolver;
