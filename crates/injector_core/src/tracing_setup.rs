//! Tracing and observability singleton.
//!
//! Provides [`TracingSetup`], a [`Singleton`] that installs a `tracing`
//! subscriber when it is attached to a [`Scene`]. Registry reports
//! (duplicate providers, missing services, missing callbacks) are emitted
//! through `tracing`, so attaching this first makes them visible.
//!
//! # Example
//!
//! ```
//! use injector_system::scene::Scene;
//! use injector_core::{TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! let mut scene = Scene::new();
//! scene.attach(
//!     TracingSetup::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact),
//! );
//!
//! let config = scene.instance::<TracingSetup>().unwrap().config();
//! assert_eq!(config.level, Level::DEBUG);
//! ```

use injector_system::scene::{Scene, Singleton};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The effective tracing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSetup
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and logging singleton.
///
/// Configures the `tracing` subscriber from its `init` hook. If another
/// subscriber is already set, the existing one is kept and
/// [`is_installed()`](Self::is_installed) stays `false`.
///
/// Without an explicit filter, `RUST_LOG` is honored. Failing that,
/// `injector_system` and `injector_core` log at the configured level and
/// every other target at WARN.
///
/// # Configuration Options
///
/// ```
/// use injector_core::{TracingFormat, TracingSetup};
/// use tracing::Level;
///
/// // Development: pretty output with span events
/// let dev = TracingSetup::default()
///     .with_level(Level::DEBUG)
///     .with_span_events(true);
///
/// // Production: JSON output, registry reports only
/// let prod = TracingSetup::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("injector_system=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingSetup {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "`injector_system=debug`").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
    /// Whether `init` installed the global subscriber.
    installed: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            installed: false,
        }
    }
}

impl TracingSetup {
    /// Creates a new `TracingSetup` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An invalid filter is ignored
    /// with a warning.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the effective configuration.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    /// Returns `true` if this setup's `init` installed the global subscriber.
    ///
    /// `false` before `init`, and when another subscriber was already set.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Picks the filter: the explicit one, then `RUST_LOG`, then the default
    /// directives for this library's own targets.
    fn env_filter(&self) -> EnvFilter {
        if let Some(filter) = &self.env_filter {
            if let Ok(filter) = EnvFilter::try_new(filter) {
                return filter;
            }
            tracing::warn!(filter = %filter, "invalid tracing filter, using defaults");
        }

        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }

    /// Registry and scene reports at the configured level, everything else at WARN.
    fn default_directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        format!("warn,injector_system={level},injector_core={level}")
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let layer = tracing_subscriber::fmt::layer().with_span_events(span_events);
        match self.format {
            TracingFormat::Pretty => layer.pretty().boxed(),
            TracingFormat::Compact => layer.compact().boxed(),
            TracingFormat::Json => layer.json().boxed(),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns `false` if another subscriber was already installed; that one
    /// is kept.
    fn install(&self) -> bool {
        tracing_subscriber::registry()
            .with(self.fmt_layer())
            .with(self.env_filter())
            .try_init()
            .is_ok()
    }
}

impl Singleton for TracingSetup {
    fn init(&mut self, _scene: &Scene) {
        self.installed = self.install();

        if self.installed {
            tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        } else {
            tracing::debug!("a tracing subscriber is already installed, keeping it");
        }
    }

    fn on_destroy(&mut self) {
        tracing::info!("tracing shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn default_level_is_info() {
        let setup = TracingSetup::default();
        assert_eq!(setup.level, Level::INFO);
        assert!(!setup.is_installed());
    }

    #[test]
    fn builders_set_fields() {
        let setup = TracingSetup::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("injector_system=debug")
            .with_span_events(true);

        assert_eq!(
            setup.config(),
            TracingConfig {
                level: Level::DEBUG,
                format: TracingFormat::Json,
            }
        );
        assert_eq!(setup.env_filter, Some("injector_system=debug".to_string()));
        assert!(setup.span_events);
    }

    #[test]
    fn default_directives_target_this_library() {
        let setup = TracingSetup::default().with_level(Level::DEBUG);
        assert_eq!(
            setup.default_directives(),
            "warn,injector_system=debug,injector_core=debug"
        );
    }

    #[test]
    fn only_one_subscriber_is_installed() {
        let mut scene = Scene::new();
        scene.attach(TracingSetup::default().with_format(TracingFormat::Compact));

        // Whoever installed first, a global subscriber is now set
        let late = TracingSetup::default().with_format(TracingFormat::Json);
        assert!(!late.install());

        let mut other = Scene::new();
        other.attach(late);
        assert!(!other.instance::<TracingSetup>().unwrap().is_installed());
        assert_eq!(
            scene.instance::<TracingSetup>().unwrap().config().format,
            TracingFormat::Compact
        );
    }
}
