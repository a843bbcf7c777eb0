pub mod config;
pub mod error;
pub mod mirror;
pub mod opener;
pub mod readiness;
pub mod registry;
pub mod surface;
pub mod watcher;
pub mod workspace;
pub mod writer;

pub use config::{RetryPolicy, WorkspaceConfig, DEFAULT_CONFIG_NAME};
pub use error::{
    ConfigError, DiffFailure, FailedDiff, RegistryError, RegistryResult, SurfaceError,
    WatcherError, WorkspaceError, WorkspaceResult,
};
pub use mirror::ElementMirror;
pub use opener::{CommandOpener, LoggingOpener, SourceOpener};
pub use readiness::{
    LifecycleEvent, Observer, ObserverId, ReadinessMachine, StateChange, WebviewState,
};
pub use registry::{ClassList, SourceLocation, TemplateRegistry};
pub use surface::{RenderSurface, SurfaceHub};
pub use watcher::{FileWatcher, WatcherResult};
pub use workspace::Workspace;
pub use writer::{ApplyReport, DiffWriter, FileGuards, FileLocks};
