pub mod logging;
pub mod resolver;
pub mod ytdlp;

pub use resolver::{
    ConfigUpdate, ErrorKind, ProbeInfo, Quality, ResolveError, ResolveOptions, ResolvedStream,
    ResolverConfig, ResolverInfo, ToolInstaller, ToolVersion, UrlResolver,
};
pub use ytdlp::{shared, YtDlpResolver};
