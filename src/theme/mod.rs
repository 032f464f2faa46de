// Display theme preference
//
// The user's declared theme (light/dark/system) is persisted in the
// preference store; the resolved theme is always concrete. While the
// preference is `system`, changes of the host appearance signal flow
// through to the resolved theme. The signal subscription lives exactly
// as long as the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::storage::{PreferenceStore, THEME_KEY};

/// Declared theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!("unknown theme '{}' (expected light, dark or system)", other)),
        }
    }
}

/// Concrete appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeState {
    pub theme: Theme,
    pub resolved_theme: ColorScheme,
}

impl ThemeState {
    fn resolve(theme: Theme, system: ColorScheme) -> Self {
        let resolved_theme = match theme {
            Theme::Light => ColorScheme::Light,
            Theme::Dark => ColorScheme::Dark,
            Theme::System => system,
        };
        Self {
            theme,
            resolved_theme,
        }
    }
}

/// Host-level light/dark preference signal
pub trait AppearanceSource: Send + Sync {
    fn current(&self) -> ColorScheme;

    /// Change stream; the current value is already marked as seen
    fn watch(&self) -> watch::Receiver<ColorScheme>;
}

/// Appearance driven by the embedding code (GUI glue, tests)
#[derive(Debug)]
pub struct ManualAppearance {
    tx: watch::Sender<ColorScheme>,
}

impl ManualAppearance {
    pub fn new(initial: ColorScheme) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, scheme: ColorScheme) {
        self.tx.send_replace(scheme);
    }

    /// Live subscriptions to this signal
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl AppearanceSource for ManualAppearance {
    fn current(&self) -> ColorScheme {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<ColorScheme> {
        self.tx.subscribe()
    }
}

/// Appearance read once from the terminal environment
///
/// `PULSEWATCH_COLOR_SCHEME=dark|light` wins; otherwise the background
/// index in `COLORFGBG` ("fg;bg") decides. Defaults to light.
#[derive(Debug)]
pub struct TerminalAppearance {
    tx: watch::Sender<ColorScheme>,
}

impl TerminalAppearance {
    pub fn detect() -> Self {
        let scheme = Self::from_env(|name| std::env::var(name).ok());
        let (tx, _rx) = watch::channel(scheme);
        Self { tx }
    }

    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> ColorScheme {
        if let Some(value) = lookup("PULSEWATCH_COLOR_SCHEME") {
            match value.trim().to_lowercase().as_str() {
                "dark" => return ColorScheme::Dark,
                "light" => return ColorScheme::Light,
                _ => {}
            }
        }

        lookup("COLORFGBG")
            .and_then(|v| v.rsplit(';').next().and_then(|bg| bg.trim().parse::<u8>().ok()))
            .map(|bg| match bg {
                0..=6 | 8 => ColorScheme::Dark,
                _ => ColorScheme::Light,
            })
            .unwrap_or_default()
    }
}

impl AppearanceSource for TerminalAppearance {
    fn current(&self) -> ColorScheme {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<ColorScheme> {
        self.tx.subscribe()
    }
}

/// Persisted theme preference reconciled against the appearance signal
pub struct ThemeResolver {
    store: Arc<dyn PreferenceStore>,
    appearance: Arc<dyn AppearanceSource>,
    state: Arc<watch::Sender<ThemeState>>,
    listener: JoinHandle<()>,
}

impl ThemeResolver {
    /// Load the persisted preference and start following the signal
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(store: Arc<dyn PreferenceStore>, appearance: Arc<dyn AppearanceSource>) -> Self {
        let theme = match store.get(THEME_KEY) {
            Some(saved) => saved.parse().unwrap_or_else(|e| {
                tracing::warn!("Ignoring persisted theme: {}", e);
                Theme::System
            }),
            None => Theme::System,
        };

        let initial = ThemeState::resolve(theme, appearance.current());
        let (tx, _rx) = watch::channel(initial);
        let state = Arc::new(tx);

        let mut signal = appearance.watch();
        let follower = Arc::clone(&state);
        let listener = tokio::spawn(async move {
            while signal.changed().await.is_ok() {
                let scheme = *signal.borrow_and_update();
                let updated = follower.send_if_modified(|current| {
                    if current.theme == Theme::System && current.resolved_theme != scheme {
                        current.resolved_theme = scheme;
                        true
                    } else {
                        false
                    }
                });
                if updated {
                    tracing::debug!(resolved = %scheme, "System appearance changed");
                }
            }
        });

        Self {
            store,
            appearance,
            state,
            listener,
        }
    }

    pub fn get(&self) -> ThemeState {
        *self.state.borrow()
    }

    /// Persist a new preference and recompute the resolved theme
    pub fn set(&self, theme: Theme) {
        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            tracing::warn!(theme = %theme, "Failed to persist theme: {}", e);
        }

        let system = self.appearance.current();
        self.state.send_modify(|current| *current = ThemeState::resolve(theme, system));
        tracing::debug!(theme = %theme, "Theme updated");
    }

    /// Observe theme state changes
    pub fn watch(&self) -> watch::Receiver<ThemeState> {
        self.state.subscribe()
    }
}

impl Drop for ThemeResolver {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
