pub mod db;
pub mod llm;
pub mod search;

pub use db::DbAdapter;
pub use llm::{openai_client, OpenAiJsonAdapter};
pub use search::{GoogleSearchAdapter, YouTubeSearchAdapter};
