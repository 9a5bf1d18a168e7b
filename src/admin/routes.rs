use std::fmt;

use crate::auth::SessionGuard;

/// Pages the application knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminRoute {
    Home,
    Login,
    Dashboard,
    Services,
    Doctors,
    Blog,
    Faqs,
    Appointments,
    Messages,
    Settings,
}

impl AdminRoute {
    /// Sidebar entries, in display order
    pub const MENU: [AdminRoute; 8] = [
        AdminRoute::Dashboard,
        AdminRoute::Services,
        AdminRoute::Doctors,
        AdminRoute::Blog,
        AdminRoute::Faqs,
        AdminRoute::Appointments,
        AdminRoute::Messages,
        AdminRoute::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            AdminRoute::Home => "/",
            AdminRoute::Login => "/admin/login",
            AdminRoute::Dashboard => "/admin",
            AdminRoute::Services => "/admin/services",
            AdminRoute::Doctors => "/admin/doctors",
            AdminRoute::Blog => "/admin/blog",
            AdminRoute::Faqs => "/admin/faqs",
            AdminRoute::Appointments => "/admin/appointments",
            AdminRoute::Messages => "/admin/messages",
            AdminRoute::Settings => "/admin/settings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminRoute::Home => "Home",
            AdminRoute::Login => "Sign in",
            AdminRoute::Dashboard => "Dashboard",
            AdminRoute::Services => "Services",
            AdminRoute::Doctors => "Doctors",
            AdminRoute::Blog => "Blog Posts",
            AdminRoute::Faqs => "FAQs",
            AdminRoute::Appointments => "Appointments",
            AdminRoute::Messages => "Messages",
            AdminRoute::Settings => "Settings",
        }
    }

    /// Needs a signed-in administrator
    pub fn is_protected(&self) -> bool {
        !matches!(self, AdminRoute::Home | AdminRoute::Login)
    }

    /// Exact match after dropping a trailing slash
    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim() {
            "" | "/" => "/",
            p => p.trim_end_matches('/'),
        };
        [AdminRoute::Home, AdminRoute::Login]
            .into_iter()
            .chain(Self::MENU)
            .find(|r| r.path() == path)
    }
}

impl fmt::Display for AdminRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// What to do with a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Show(AdminRoute),
    Redirect(AdminRoute),
}

/// Gates the admin area behind `guard`. Unknown paths go home.
pub fn resolve_route(path: &str, guard: &dyn SessionGuard) -> RouteDecision {
    match AdminRoute::from_path(path) {
        None => RouteDecision::Redirect(AdminRoute::Home),
        Some(route) if route.is_protected() && !guard.is_authenticated() => {
            RouteDecision::Redirect(AdminRoute::Login)
        }
        Some(route) => RouteDecision::Show(route),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_map_back_to_routes() {
        for route in AdminRoute::MENU {
            assert_eq!(AdminRoute::from_path(route.path()), Some(route));
            assert!(route.is_protected());
        }
        assert_eq!(AdminRoute::from_path("/admin/blog/"), Some(AdminRoute::Blog));
        assert_eq!(AdminRoute::from_path(""), Some(AdminRoute::Home));
        assert_eq!(AdminRoute::from_path("/admin/blogs"), None);
        assert!(!AdminRoute::Login.is_protected());
        assert_eq!(AdminRoute::Faqs.label(), "FAQs");
    }
}
