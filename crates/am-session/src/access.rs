//! Role-based access gating for navigation and routes.

use std::fmt;

use am_core::Role;
use smallvec::SmallVec;

use crate::auth::AuthState;

/// Roles a check accepts: a single [`Role`] or a collection of them.
pub trait RoleSet {
    /// Returns `true` if `role` is accepted.
    fn accepts(&self, role: Role) -> bool;
}

impl RoleSet for Role {
    fn accepts(&self, role: Role) -> bool {
        *self == role
    }
}

impl RoleSet for [Role] {
    fn accepts(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl<const N: usize> RoleSet for [Role; N] {
    fn accepts(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl RoleSet for Vec<Role> {
    fn accepts(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl<T: RoleSet + ?Sized> RoleSet for &T {
    fn accepts(&self, role: Role) -> bool {
        (**self).accepts(role)
    }
}

/// Top-level navigation sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Overview with statistics.
    Dashboard,
    /// Asset register.
    Assets,
    /// Inventory operations journal.
    Operations,
    /// Warehouses.
    Warehouses,
    /// Company branches.
    Branches,
    /// User accounts.
    Users,
    /// Asset and operation reports.
    Reports,
    /// Company settings.
    Settings,
}

const ALL_ROLES: &[Role] = &Role::ALL;
const STAFF: &[Role] = &[Role::Admin, Role::Accountant, Role::WarehouseKeeper];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const REPORT_READERS: &[Role] = &[Role::Admin, Role::Accountant, Role::Observer];

impl Section {
    /// Every section, in menu order.
    pub const ALL: [Self; 8] = [
        Self::Dashboard,
        Self::Assets,
        Self::Operations,
        Self::Warehouses,
        Self::Branches,
        Self::Users,
        Self::Reports,
        Self::Settings,
    ];

    /// Returns the stable identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Assets => "assets",
            Self::Operations => "operations",
            Self::Warehouses => "warehouses",
            Self::Branches => "branches",
            Self::Users => "users",
            Self::Reports => "reports",
            Self::Settings => "settings",
        }
    }

    /// Returns the localized menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Панель управления",
            Self::Assets => "Активы",
            Self::Operations => "Операции",
            Self::Warehouses => "Склады",
            Self::Branches => "Филиалы",
            Self::Users => "Пользователи",
            Self::Reports => "Отчеты",
            Self::Settings => "Настройки",
        }
    }

    /// Returns the route path.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::Assets => "/assets",
            Self::Operations => "/operations",
            Self::Warehouses => "/warehouses",
            Self::Branches => "/branches",
            Self::Users => "/users",
            Self::Reports => "/reports",
            Self::Settings => "/settings",
        }
    }

    /// Returns the roles allowed to open the section.
    #[must_use]
    pub const fn roles(self) -> &'static [Role] {
        match self {
            Self::Dashboard | Self::Assets => ALL_ROLES,
            Self::Operations | Self::Warehouses => STAFF,
            Self::Branches | Self::Users | Self::Settings => ADMIN_ONLY,
            Self::Reports => REPORT_READERS,
        }
    }

    /// Returns `true` if `role` may open the section.
    #[must_use]
    pub fn allows(self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    /// Finds the section for a route path.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|s| s.path() == trimmed)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns the sections visible to `role`, in menu order.
///
/// # Examples
///
/// ```
/// use am_core::Role;
/// use am_session::access::{Section, navigation_for};
///
/// let observer = navigation_for(Role::Observer);
/// assert_eq!(observer.as_slice(), &[Section::Dashboard, Section::Assets, Section::Reports]);
/// ```
#[must_use]
pub fn navigation_for(role: Role) -> SmallVec<[Section; 8]> {
    Section::ALL.into_iter().filter(|s| s.allows(role)).collect()
}

/// Outcome of guarding a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// An authentication check is still running.
    Pending,
    /// Nobody is signed in.
    RedirectToLogin,
    /// The user's role is not among the required ones.
    Forbidden {
        /// Roles the route accepts.
        required: SmallVec<[Role; 4]>,
        /// The user's role.
        actual: Role,
    },
    /// The route may be shown.
    Granted,
}

impl Access {
    /// Returns `true` for [`Access::Granted`].
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Guards a route by authentication and, optionally, role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    required: SmallVec<[Role; 4]>,
}

impl RouteGuard {
    /// Guard that only requires a signed-in user.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Guard that also requires one of `roles`.
    #[must_use]
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self { required: roles.into_iter().collect() }
    }

    /// Guard matching a navigation section.
    #[must_use]
    pub fn section(section: Section) -> Self {
        Self::roles(section.roles().iter().copied())
    }

    /// Decides access for the given session state.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::Role;
    /// use am_session::access::{Access, RouteGuard};
    /// use am_session::auth::AuthState;
    ///
    /// let guard = RouteGuard::roles([Role::Admin]);
    /// assert_eq!(guard.check(&AuthState::default()), Access::RedirectToLogin);
    /// ```
    #[must_use]
    pub fn check(&self, state: &AuthState) -> Access {
        if state.loading {
            return Access::Pending;
        }
        let Some(user) = state.user.as_ref().filter(|_| state.is_authenticated()) else {
            return Access::RedirectToLogin;
        };
        if self.required.is_empty() || self.required.as_slice().accepts(user.role) {
            Access::Granted
        } else {
            Access::Forbidden { required: self.required.clone(), actual: user.role }
        }
    }
}

#[cfg(test)]
mod tests {
    use am_core::User;

    use super::*;
    use crate::auth::AuthAction;

    fn state_for(role: Role) -> AuthState {
        let user = User {
            id: 7,
            username: "Тест".to_owned(),
            email: "t@example.ru".to_owned(),
            role,
            company_id: Some(1),
            is_active: Some(true),
            created_at: None,
            last_login: None,
        };
        AuthState::default().reduce(AuthAction::Success { user, token: "t".to_owned() })
    }

    #[test]
    fn test_navigation_per_role() {
        assert_eq!(navigation_for(Role::Admin).len(), 8);
        let keeper = navigation_for(Role::WarehouseKeeper);
        assert!(keeper.contains(&Section::Operations));
        assert!(!keeper.contains(&Section::Reports));
        assert!(!keeper.contains(&Section::Users));
        let accountant = navigation_for(Role::Accountant);
        assert!(accountant.contains(&Section::Reports));
        assert!(!accountant.contains(&Section::Settings));
    }

    #[test]
    fn test_guard_outcomes() {
        let guard = RouteGuard::section(Section::Users);
        assert_eq!(guard.check(&state_for(Role::Admin)), Access::Granted);
        assert_eq!(
            guard.check(&state_for(Role::Observer)),
            Access::Forbidden { required: SmallVec::from_slice(&[Role::Admin]), actual: Role::Observer }
        );

        let loading = AuthState::default().reduce(AuthAction::Start);
        assert_eq!(guard.check(&loading), Access::Pending);
        assert!(RouteGuard::authenticated().check(&state_for(Role::Observer)).is_granted());
    }

    #[test]
    fn test_section_from_path() {
        assert_eq!(Section::from_path("/"), Some(Section::Dashboard));
        assert_eq!(Section::from_path("/reports/"), Some(Section::Reports));
        assert_eq!(Section::from_path("/unknown"), None);
    }

    #[test]
    fn test_role_sets() {
        assert!(Role::Admin.accepts(Role::Admin));
        assert!([Role::Admin, Role::Observer].accepts(Role::Observer));
        assert!(!vec![Role::Accountant].accepts(Role::Admin));
    }
}
