//! Study-material generation and the services around it.
//!
//! - `pipeline`: documents in, one persisted `Material` out
//! - `sequencer`, `title`, `synthesizer`: the AI-backed steps it runs
//! - `library`: browsing, sharing, voting and notifications
//! - `store`: persistence behind the `MaterialStore` trait
//! - `video`: YouTube lookups

pub mod error;
pub mod library;
pub mod pipeline;
pub mod sequencer;
pub mod store;
pub mod synthesizer;
pub mod title;
pub mod video;

pub use error::{ErrorKind, StudyError};
pub use library::{Library, MaterialView, ShareReport, UploadedFile};
pub use pipeline::{IngestionRequest, Pipeline};
pub use sequencer::{ChapterInfo, Sequencer};
pub use store::{MaterialStore, MemoryStore, PgStore, StoreError};
pub use synthesizer::{Features, Synthesis, Synthesizer};
pub use title::TitleResolver;
pub use video::{VideoResult, VideoSearch};
