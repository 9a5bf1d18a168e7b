use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use super::routes::AdminRoute;
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::models::{
    Appointment, BlogPost, ContactMessage, Doctor, Faq, Resource, Service,
};

/// One tile on the admin dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardCard {
    pub title: &'static str,
    pub table: &'static str,
    pub link: AdminRoute,
    /// Row count, or why it could not be fetched
    pub count: std::result::Result<u64, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub cards: Vec<DashboardCard>,
}

impl DashboardSummary {
    /// All six counts resolved
    pub fn is_complete(&self) -> bool {
        self.cards.iter().all(|c| c.count.is_ok())
    }

    pub fn card(&self, table: &str) -> Option<&DashboardCard> {
        self.cards.iter().find(|c| c.table == table)
    }

    pub fn count(&self, table: &str) -> Option<u64> {
        self.card(table).and_then(|c| c.count.as_ref().ok().copied())
    }
}

/// Per-table row counts for the admin landing page
pub struct Dashboard {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
}

impl Dashboard {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            timeout: ClientOptions::default().request_timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn count(&self, table: &'static str) -> Result<u64> {
        match tokio::time::timeout(self.timeout, self.gateway.count(table)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    /// Issues the six counts concurrently; each card fails on its own
    pub async fn load(&self) -> DashboardSummary {
        let (appointments, messages, services, doctors, posts, faqs) = tokio::join!(
            self.count(Appointment::TABLE),
            self.count(ContactMessage::TABLE),
            self.count(Service::TABLE),
            self.count(Doctor::TABLE),
            self.count(BlogPost::TABLE),
            self.count(Faq::TABLE),
        );

        let cards = vec![
            card("Appointments", Appointment::TABLE, AdminRoute::Appointments, appointments),
            card("Messages", ContactMessage::TABLE, AdminRoute::Messages, messages),
            card("Services", Service::TABLE, AdminRoute::Services, services),
            card("Doctors", Doctor::TABLE, AdminRoute::Doctors, doctors),
            card("Blog Posts", BlogPost::TABLE, AdminRoute::Blog, posts),
            card("FAQs", Faq::TABLE, AdminRoute::Faqs, faqs),
        ];
        let summary = DashboardSummary { cards };
        if summary.is_complete() {
            info!("dashboard counts loaded");
        }
        summary
    }
}

fn card(
    title: &'static str,
    table: &'static str,
    link: AdminRoute,
    count: Result<u64>,
) -> DashboardCard {
    let count = count.map_err(|e| {
        error!("count for {} failed: {}", table, e);
        e.to_string()
    });
    DashboardCard {
        title,
        table,
        link,
        count,
    }
}
