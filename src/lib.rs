pub mod cli;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod report;
pub mod upload;

pub use cli::{parse_from, run, Cli, Command, Configuration, UploadRequest};
pub use error::CliError;
