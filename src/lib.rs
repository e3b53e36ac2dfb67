#![allow(clippy::doc_markdown)] // Allow technical terms like fetchAndLock in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # External Task Dispatcher
//!
//! Worker process bridging a workflow engine's external-task pattern to downstream
//! HTTP services.
//!
//! ## Overview
//!
//! The engine publishes external tasks tagged with a topic name. The dispatcher
//! long-polls for them, locks one at a time, invokes the downstream API behind the
//! topic and reports completion or failure back so the engine can resume or retry
//! the workflow.
//!
//! ```text
//! Dispatcher ──> TopicRegistry (refresh)
//!     │
//!     ├──> engine fetch-and-lock
//!     │
//!     └──> TaskRouter ──> TaskHandler ──> TaskMapper ──> downstream API
//!              │
//!              └──> engine complete | report-failure
//! ```
//!
//! ## Module Organization
//!
//! - [`models`] - Locked task, variables, completion and failure reports
//! - [`engine`] - Engine contract and its REST client
//! - [`registry`] - Topic and mapper registries
//! - [`mappers`] - Request/response mappers
//! - [`handlers`] - Service and message task handlers
//! - [`router`] - Task classification and retry budget
//! - [`dispatcher`] - The dispatch loop
//! - [`secrets`] - Credential resolution from a secret store
//! - [`bootstrap`] - Startup wiring
//! - [`config`] - Configuration model and layered loading
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use external_task_dispatcher::bootstrap::DispatcherBootstrap;
//! use external_task_dispatcher::config::ConfigManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?.into_config();
//! let system = DispatcherBootstrap::bootstrap(config).await?;
//!
//! let handle = system.spawn();
//! system.stop();
//! handle.await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod mappers;
pub mod models;
pub mod registry;
pub mod router;
pub mod secrets;

pub use bootstrap::{DispatcherBootstrap, DispatcherSystem};
pub use config::{ConfigManager, DispatcherConfig};
pub use dispatcher::{DispatchState, Dispatcher, DispatcherSettings, IterationOutcome};
pub use engine::ExternalTaskEngine;
pub use error::{DispatcherError, DispatcherResult, HandlerError};
pub use models::{CompletionResult, FailureReport, LockedTask, TaskType, VariableValue, Variables};
pub use router::{RetryPolicy, TaskOutcome, TaskRouter};
