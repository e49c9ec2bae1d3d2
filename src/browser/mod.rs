//! Default-browser lookup and URL opening.

pub mod opener;
pub mod platform;
pub mod resolver;

pub use opener::{CommandRunner, Invocation, OpenStrategy, Opener, SystemRunner, UrlOpener};
pub use resolver::{CachedResolver, HandlerResolver, LaunchServicesResolver};
