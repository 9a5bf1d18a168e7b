//! Read side of the public website

use log::{info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::binding::{LiveUpdates, ResourceBinding};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::forms::{BookingForm, ContactForm};
use crate::gateway::{Gateway, RowId};
use crate::models::{
    fetch_post_content, settings_map, BlogPostSummary, ClinicSetting, Doctor, Faq, Resource,
    Service,
};

/// A part of the public site that loads on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteSection {
    Services,
    Doctors,
    Faqs,
    Posts,
    Settings,
}

impl fmt::Display for SiteSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteSection::Services => "services",
            SiteSection::Doctors => "doctors",
            SiteSection::Faqs => "faqs",
            SiteSection::Posts => "blog posts",
            SiteSection::Settings => "clinic info",
        };
        f.write_str(name)
    }
}

/// Outcome of [`PublicSite::load_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteLoadReport {
    pub failures: Vec<(SiteSection, String)>,
}

impl SiteLoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, section: SiteSection) -> bool {
        self.failures.iter().any(|(s, _)| *s == section)
    }
}

/// Everything the public pages show, each section backed by its own binding
pub struct PublicSite {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
    pub services: ResourceBinding<Service>,
    pub doctors: ResourceBinding<Doctor>,
    /// Active FAQs only, in display order
    pub faqs: ResourceBinding<Faq>,
    pub posts: ResourceBinding<BlogPostSummary>,
    pub settings: ResourceBinding<ClinicSetting>,
    revision: Arc<watch::Sender<u64>>,
    live: Vec<LiveUpdates>,
}

impl PublicSite {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_options(gateway, &ClientOptions::default())
    }

    /// Section loads, article bodies and form submits are bounded by `options.request_timeout`
    pub fn with_options(gateway: Arc<dyn Gateway>, options: &ClientOptions) -> Self {
        fn bind<R: Resource>(gateway: &Arc<dyn Gateway>, timeout: Duration) -> ResourceBinding<R> {
            ResourceBinding::new(gateway.clone()).with_timeout(timeout)
        }

        let timeout = options.request_timeout;
        let (revision, _) = watch::channel(0);
        Self {
            services: bind(&gateway, timeout).with_filter("is_active", true),
            doctors: bind(&gateway, timeout).with_filter("is_active", true),
            faqs: bind(&gateway, timeout).with_filter("is_active", true),
            posts: bind(&gateway, timeout).with_filter("is_published", true),
            settings: bind(&gateway, timeout),
            timeout,
            gateway,
            revision: Arc::new(revision),
            live: Vec::new(),
        }
    }

    /// Loads every section. One failing section does not stop the others.
    pub async fn load_all(&self) -> SiteLoadReport {
        let (services, doctors, faqs, posts, settings) = tokio::join!(
            self.services.load(),
            self.doctors.load(),
            self.faqs.load(),
            self.posts.load(),
            self.settings.load(),
        );

        let mut report = SiteLoadReport::default();
        let outcomes = [
            (SiteSection::Services, services.err()),
            (SiteSection::Doctors, doctors.err()),
            (SiteSection::Faqs, faqs.err()),
            (SiteSection::Posts, posts.err()),
            (SiteSection::Settings, settings.err()),
        ];
        for (section, err) in outcomes {
            if let Some(err) = err {
                warn!("could not load {}: {}", section, err);
                report.failures.push((section, err.to_string()));
            }
        }
        report
    }

    /// Clinic settings as key -> value
    pub async fn clinic_info(&self) -> BTreeMap<String, String> {
        settings_map(&self.settings.items().await)
    }

    /// Body of a published article, fetched on demand
    pub async fn post_content(&self, id: &RowId) -> Result<Option<String>> {
        match tokio::time::timeout(self.timeout, fetch_post_content(self.gateway.as_ref(), id)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    /// Keeps services, doctors and clinic info current. Each change bumps [`PublicSite::changes`].
    pub async fn open_live_updates(&mut self) -> Result<()> {
        if !self.live.is_empty() {
            return Ok(());
        }
        let services = self.services.subscribe(self.bump(Service::TABLE)).await;
        let services = services.map_err(|e| self.abandon(e))?;
        self.live.push(services);

        let doctors = self.doctors.subscribe(self.bump(Doctor::TABLE)).await;
        let doctors = doctors.map_err(|e| self.abandon(e))?;
        self.live.push(doctors);

        let settings = self.settings.subscribe(self.bump(ClinicSetting::TABLE)).await;
        let settings = settings.map_err(|e| self.abandon(e))?;
        self.live.push(settings);

        info!("public site live updates open");
        Ok(())
    }

    fn abandon(&mut self, err: Error) -> Error {
        warn!("live updates unavailable: {}", err);
        self.live.clear();
        err
    }

    fn bump<T: 'static>(&self, table: &'static str) -> impl Fn(Vec<T>) + Send + Sync + 'static {
        let revision = self.revision.clone();
        move |items: Vec<T>| {
            log::debug!("{} now has {} visible row(s)", table, items.len());
            revision.send_modify(|r| *r += 1);
        }
    }

    /// Counter bumped after every live reload
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn live_update_count(&self) -> usize {
        self.live.len()
    }

    pub fn booking_form(&self) -> BookingForm {
        BookingForm::new(self.gateway.clone()).with_timeout(self.timeout)
    }

    pub fn contact_form(&self) -> ContactForm {
        ContactForm::new(self.gateway.clone()).with_timeout(self.timeout)
    }

    /// Stops live updates and cancels anything in flight
    pub fn close(&mut self) {
        self.live.clear();
        self.services.close();
        self.doctors.close();
        self.faqs.close();
        self.posts.close();
        self.settings.close();
    }
}
