//! Opening a URL in the user's browser.
//!
//! The opener walks an ordered list of [`OpenStrategy`] entries and uses the
//! first one that applies. New platform quirks go in as new entries.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

use super::platform;
use super::resolver::{CachedResolver, HandlerResolver};
use crate::config::BrowserConfig;
use crate::error::OpenError;

/// Anything that can open a URL. The dispatcher only sees this.
pub trait Opener {
    fn open(&self, url: &str) -> Result<(), OpenError>;
}

/// A concrete external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Invocation {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// Runs an [`Invocation`] to completion.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), OpenError>;
}

/// Runs commands with `std::process`, waiting for exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), OpenError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|source| OpenError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(OpenError::Status {
                program: invocation.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// What the strategies get to look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenContext<'a> {
    pub handler: Option<&'a str>,
    pub os_version: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenStrategy {
    /// The default handler is one of `handlers`: name it explicitly with
    /// `open -b`, since a generic open from inside an app that shares its
    /// identity can land in the wrong app.
    ExplicitHandler { open: PathBuf, handlers: Vec<String> },
    /// The OS version has a broken generic open routine: call `open` directly.
    VersionWorkaround { open: PathBuf, versions: Vec<String> },
    /// The platform's generic "open URL in default app".
    SystemDefault,
}

impl OpenStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            OpenStrategy::ExplicitHandler { .. } => "explicit-handler",
            OpenStrategy::VersionWorkaround { .. } => "version-workaround",
            OpenStrategy::SystemDefault => "system-default",
        }
    }

    /// The command this strategy would run for `url`, or `None` when the
    /// strategy does not apply. `SystemDefault` yields `Err` on platforms
    /// without a known opener.
    pub fn invocation(
        &self,
        url: &str,
        ctx: &OpenContext<'_>,
    ) -> Option<Result<Invocation, OpenError>> {
        match self {
            OpenStrategy::ExplicitHandler { open, handlers } => {
                let handler = ctx.handler?;
                handlers
                    .iter()
                    .any(|h| h.eq_ignore_ascii_case(handler))
                    .then(|| Ok(Invocation::new(open, ["-b", handler, url])))
            }
            OpenStrategy::VersionWorkaround { open, versions } => {
                let version = ctx.os_version?;
                versions
                    .iter()
                    .any(|v| v == version)
                    .then(|| Ok(Invocation::new(open, [url])))
            }
            OpenStrategy::SystemDefault => Some(platform::default_open(url)),
        }
    }
}

/// Build the strategy list from config, in priority order.
pub fn strategies(config: &BrowserConfig) -> Vec<OpenStrategy> {
    vec![
        OpenStrategy::ExplicitHandler {
            open: config.open.clone(),
            handlers: config.explicit_handlers.clone(),
        },
        OpenStrategy::VersionWorkaround {
            open: config.open.clone(),
            versions: config.defective_os_versions.clone(),
        },
        OpenStrategy::SystemDefault,
    ]
}

/// Opens URLs using the first applicable strategy.
pub struct UrlOpener<R, C = SystemRunner> {
    resolver: CachedResolver<R>,
    strategies: Vec<OpenStrategy>,
    os_version: Option<String>,
    runner: C,
}

impl<R: HandlerResolver> UrlOpener<R, SystemRunner> {
    /// Opener for the running system; queries the OS version once.
    pub fn system(resolver: R, config: &BrowserConfig) -> Self {
        let os_version = platform::os_version();
        debug!(os_version = ?os_version, "detected OS version");
        UrlOpener::new(resolver, strategies(config), os_version, SystemRunner)
    }
}

impl<R: HandlerResolver, C: CommandRunner> UrlOpener<R, C> {
    pub fn new(
        resolver: R,
        strategies: Vec<OpenStrategy>,
        os_version: Option<String>,
        runner: C,
    ) -> Self {
        UrlOpener {
            resolver: CachedResolver::new(resolver),
            strategies,
            os_version,
            runner,
        }
    }

    pub fn resolver(&self) -> &CachedResolver<R> {
        &self.resolver
    }

    pub fn runner(&self) -> &C {
        &self.runner
    }

    /// Pick the command for `url` without running it.
    pub fn plan(&self, url: &str) -> Result<(&'static str, Invocation), OpenError> {
        let ctx = OpenContext {
            handler: self.resolver.handler(),
            os_version: self.os_version.as_deref(),
        };
        for strategy in &self.strategies {
            if let Some(inv) = strategy.invocation(url, &ctx) {
                return inv.map(|inv| (strategy.name(), inv));
            }
        }
        Err(OpenError::Unsupported)
    }
}

impl<R: HandlerResolver, C: CommandRunner> Opener for UrlOpener<R, C> {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        let (strategy, invocation) = self.plan(url)?;
        debug!(strategy, command = %invocation, "opening url");
        match self.runner.run(&invocation) {
            Ok(()) => {
                info!(strategy, url, "opened url");
                Ok(())
            }
            Err(e) => {
                warn!(strategy, url, error = %e, "failed to open url");
                Err(e)
            }
        }
    }
}

impl<R, C> fmt::Debug for UrlOpener<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlOpener")
            .field("strategies", &self.strategies)
            .field("os_version", &self.os_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Fixed(Option<&'static str>);

    impl HandlerResolver for Fixed {
        fn resolve(&self) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Invocation>>,
        fail: bool,
    }

    impl CommandRunner for Recorder {
        fn run(&self, invocation: &Invocation) -> Result<(), OpenError> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.fail {
                Err(OpenError::Status {
                    program: invocation.program.clone(),
                    status: "exit status: 1".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn opener(handler: Option<&'static str>, os: Option<&str>) -> UrlOpener<Fixed, Recorder> {
        UrlOpener::new(
            Fixed(handler),
            strategies(&BrowserConfig::default()),
            os.map(str::to_owned),
            Recorder::default(),
        )
    }

    #[test]
    fn chrome_default_is_named_explicitly_in_original_case() {
        let o = opener(Some("com.google.Chrome"), Some("10.12.5"));
        o.open("https://example.com").unwrap();
        assert_eq!(
            o.runner().calls.borrow()[0],
            Invocation::new("/usr/bin/open", ["-b", "com.google.Chrome", "https://example.com"])
        );
    }

    #[test]
    fn defective_os_version_uses_open_directly() {
        let o = opener(Some("org.mozilla.firefox"), Some("10.12.5"));
        let (name, inv) = o.plan("https://example.com").unwrap();
        assert_eq!(name, "version-workaround");
        assert_eq!(inv, Invocation::new("/usr/bin/open", ["https://example.com"]));
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn otherwise_falls_through_to_system_default() {
        let o = opener(Some("org.mozilla.firefox"), Some("14.4"));
        o.open("https://example.com/?a=1&b=2").unwrap();

        let (name, inv) = o.plan("https://example.com/?a=1&b=2").unwrap();
        assert_eq!(name, "system-default");

        let expected = if cfg!(target_os = "macos") {
            Invocation::new(
                "/usr/bin/osascript",
                ["-e", "open location \"https://example.com/?a=1&b=2\""],
            )
        } else if cfg!(windows) {
            Invocation::new(
                "rundll32.exe",
                ["url.dll,FileProtocolHandler", "https://example.com/?a=1&b=2"],
            )
        } else {
            Invocation::new("xdg-open", ["https://example.com/?a=1&b=2"])
        };
        assert_eq!(inv, expected);
        assert_eq!(o.runner().calls.borrow()[0], expected);
    }

    #[test]
    fn runner_failure_is_returned() {
        let o = UrlOpener::new(
            Fixed(Some("com.google.chrome")),
            strategies(&BrowserConfig::default()),
            None,
            Recorder {
                fail: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            o.open("https://example.com"),
            Err(OpenError::Status { .. })
        ));
    }

    #[test]
    fn empty_strategy_list_is_unsupported() {
        let o = UrlOpener::new(Fixed(None), Vec::new(), None, Recorder::default());
        assert!(matches!(o.open("x"), Err(OpenError::Unsupported)));
        assert!(o.runner().calls.borrow().is_empty());
    }
}
