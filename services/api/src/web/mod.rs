pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{
    generate_lesson_content_handler, generate_path_handler, generate_quiz_handler,
    list_resources_by_category_handler, list_resources_handler, resource_stats_handler,
};
