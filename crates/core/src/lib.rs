pub mod account;
pub mod config;
pub mod document;
pub mod error;
pub mod filename;
pub mod material;

pub use account::*;
pub use config::Config;
pub use document::*;
pub use error::*;
pub use filename::humanize_filename;
pub use material::*;
