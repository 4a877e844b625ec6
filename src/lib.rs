// Library exports for the binary and integration tests
pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod models;
pub mod schema;
pub mod service;
pub mod validation;
pub mod visual;

pub use config::ThinkingConfig;
pub use error::{ErrorKind, Result, ThinkingError};
pub use handlers::ToolHandlers;
pub use history::{HistoryView, ThoughtTracker};
pub use models::*;
pub use service::SequentialThinkingService;
pub use validation::{InputValidator, ValidationError};
pub use visual::{DisplaySink, DisplayStyle, NullSink, StderrSink, VisualOutput};
