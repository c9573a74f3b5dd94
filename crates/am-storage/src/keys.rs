//! Well-known storage keys and the small values stored under them.

use std::fmt;
use std::str::FromStr;

/// JWT access token, stored as a JSON string.
pub const TOKEN: &str = "token";
/// Signed-in user record, stored as JSON.
pub const USER: &str = "user";
/// Refresh token, when the backend issued one.
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Theme name, stored as plain text.
pub const THEME: &str = "theme";
/// Whether the navigation sidebar is expanded.
pub const SIDEBAR_OPEN: &str = "sidebar_open";
/// User preference map.
pub const USER_PREFERENCES: &str = "user_preferences";

/// Color theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    /// Light colors.
    Light,
    /// Dark colors.
    Dark,
    /// Follow the system setting.
    #[default]
    Auto,
}

impl Theme {
    /// Returns the stored name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Auto => "auto",
        }
    }

    /// Resolves `Auto` against the system preference.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_storage::keys::Theme;
    ///
    /// assert_eq!(Theme::Auto.resolve(Theme::Dark), Theme::Dark);
    /// assert_eq!(Theme::Light.resolve(Theme::Dark), Theme::Light);
    /// ```
    #[inline]
    #[must_use]
    pub const fn resolve(self, system: Self) -> Self {
        match self {
            Self::Auto => match system {
                Self::Dark => Self::Dark,
                Self::Light | Self::Auto => Self::Light,
            },
            other => other,
        }
    }

    /// Returns the explicit opposite of the resolved theme.
    #[inline]
    #[must_use]
    pub const fn toggled(self, system: Self) -> Self {
        match self.resolve(system) {
            Self::Light => Self::Dark,
            Self::Dark | Self::Auto => Self::Light,
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
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Store, StoredValue, TextCodec};

    #[test]
    fn test_toggle_from_auto() {
        assert_eq!(Theme::Auto.toggled(Theme::Light), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(Theme::Light), Theme::Light);
    }

    #[test]
    fn test_theme_stored_as_text() {
        let store = Arc::new(Store::in_memory());
        let theme = StoredValue::with_codec(Arc::clone(&store), THEME, Theme::default(), TextCodec::new());
        theme.set(Theme::Dark).unwrap();
        assert_eq!(store.get(THEME).as_deref(), Some("dark"));

        store.set(THEME, "purple").unwrap();
        theme.refresh();
        assert_eq!(theme.get(), Theme::Auto);
    }
}
