/// Core client state shared by the library API and the CLI
///
/// This module contains the UI-independent pieces every front end needs:
/// - Configuration loading
/// - Session persistence (token pair and current user)
/// - Task spawning helpers
pub mod config;
pub mod session;
pub mod task_manager;

pub use config::ClientConfig;
pub use session::{Session, SessionStore};
