pub mod client;
pub mod command;
pub mod daytona;
pub mod error;
pub mod files;
pub mod outcome;
pub mod provision;
pub mod report;
pub mod resolver;
pub mod service;
pub mod session;
pub mod shell;
pub mod teardown;
pub mod types;

#[cfg(test)]
mod fake;

pub use client::{ClientSettings, SandboxClient};
pub use error::SandboxError;
pub use outcome::Outcome;
pub use report::OpResult;
pub use service::SandboxService;
