//! The admin area: sign-in gate, dashboard and one screen per table

mod dashboard;
mod routes;
mod screens;

use log::{info, warn};
use std::sync::Arc;

use crate::auth::{AdminIdentity, SessionGuard};
use crate::config::ClientOptions;
use crate::gateway::Gateway;

pub use dashboard::*;
pub use routes::*;
pub use screens::{
    AppointmentsScreen, BlogScreen, DoctorsScreen, FaqsScreen, MessagesScreen, ServicesScreen,
    SettingsScreen,
};

/// Everything behind `/admin`
pub struct AdminPanel {
    guard: Arc<dyn SessionGuard>,
    pub dashboard: Dashboard,
    pub services: ServicesScreen,
    pub doctors: DoctorsScreen,
    pub blog: BlogScreen,
    pub faqs: FaqsScreen,
    pub appointments: AppointmentsScreen,
    pub messages: MessagesScreen,
    pub settings: SettingsScreen,
}

impl AdminPanel {
    pub fn new(gateway: Arc<dyn Gateway>, guard: Arc<dyn SessionGuard>) -> Self {
        Self::with_options(gateway, guard, &ClientOptions::default())
    }

    /// Every screen and dashboard call is bounded by `options.request_timeout`
    pub fn with_options(
        gateway: Arc<dyn Gateway>,
        guard: Arc<dyn SessionGuard>,
        options: &ClientOptions,
    ) -> Self {
        let screens = screens::build(&gateway, options.request_timeout);
        Self {
            guard,
            dashboard: Dashboard::new(gateway).with_timeout(options.request_timeout),
            services: screens.services,
            doctors: screens.doctors,
            blog: screens.blog,
            faqs: screens.faqs,
            appointments: screens.appointments,
            messages: screens.messages,
            settings: screens.settings,
        }
    }

    pub fn route(&self, path: &str) -> RouteDecision {
        resolve_route(path, self.guard.as_ref())
    }

    pub fn menu(&self) -> &'static [AdminRoute] {
        &AdminRoute::MENU
    }

    pub fn current_admin(&self) -> Option<AdminIdentity> {
        self.guard.current_admin()
    }

    /// Ends the session and returns where to send the browser.
    /// A failed server call is logged; the local session is gone either way.
    /// The panel stays usable for the next sign-in.
    pub async fn sign_out(&self) -> AdminRoute {
        self.cancel_pending();
        if let Err(e) = self.guard.sign_out().await {
            warn!("sign out: {}", e);
        }
        info!("admin signed out");
        AdminRoute::Login
    }

    /// Fails in-flight screen requests without closing the screens
    pub fn cancel_pending(&self) {
        self.services.binding.cancel_pending();
        self.doctors.binding.cancel_pending();
        self.blog.binding.cancel_pending();
        self.faqs.binding.cancel_pending();
        self.appointments.binding.cancel_pending();
        self.messages.binding.cancel_pending();
        self.settings.binding.cancel_pending();
    }

    /// Cancels in-flight screen requests and refuses later ones
    pub fn close(&self) {
        self.services.binding.close();
        self.doctors.binding.close();
        self.blog.binding.close();
        self.faqs.binding.close();
        self.appointments.binding.close();
        self.messages.binding.close();
        self.settings.binding.close();
    }
}
