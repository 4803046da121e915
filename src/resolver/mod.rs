// Resolver module - yt-dlp subprocess plumbing behind a host-facing trait

pub mod config;
pub mod errors;
pub mod format_selector;
pub mod hosts;
pub mod install;
pub mod models;
pub mod pipeline;
pub mod process;
pub mod tools;
pub mod traits;

pub use config::{ConfigStore, ConfigUpdate, ResolverConfig};
pub use errors::{ErrorKind, ResolveError};
pub use format_selector::FormatSelector;
pub use install::GithubReleaseInstaller;
pub use models::{
    Capability, Priority, ProbeInfo, Quality, ResolveOptions, ResolvedStream, ResolverInfo,
};
pub use pipeline::ResolutionPipeline;
pub use process::{ProcessInvocation, ProcessOutcome};
pub use tools::{ToolInfo, ToolLocator, ToolVersion};
pub use traits::{ProgressEmitter, ProgressFn, ToolInstaller, UrlResolver};
