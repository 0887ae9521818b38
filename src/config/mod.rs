//! Runtime configuration.
//!
//! [`Settings`] is built once at startup and shared as `Arc<Settings>`.
//! See [`loading`] for the precedence rules.

pub mod loading;
pub mod settings;

pub use loading::{default_config_path, load_dotenv, FileSettings};
pub use settings::{
    GitLabSettings, GitSettings, Settings, SnykSettings, DEFAULT_CLONE_DEPTH, DEFAULT_GIT_BINARY,
    DEFAULT_SNYK_BINARY,
};
