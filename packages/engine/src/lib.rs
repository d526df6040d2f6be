//! wordcat engine
//!
//! Session state machines and their collaborators around `wordcat-algo`:
//!
//! - [`session::SessionController`] - fixed-length assessment with review phase
//! - [`session::PracticeController`] - continuous adaptive practice
//! - [`catalog`] / [`store`] - read-only word catalog and learner persistence
//! - [`terminal`] - countdown-driven terminal front-end used by the binary

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod store;
pub mod terminal;

pub use catalog::{Catalog, JsonCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use session::{
    Advance, AnswerFeedback, AnswerResult, PracticeController, Question, SessionController,
    SessionError, SessionPhase,
};
pub use store::{MemoryStore, ProgressStore, SqliteStore, StoreError, StoreResult};
