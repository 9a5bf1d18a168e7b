//! One screen per managed table, each a thin layer over a binding

use chrono::Utc;
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::binding::{Direction, LiveUpdates, ResourceBinding};
use crate::error::Result;
use crate::gateway::{Gateway, RowId};
use crate::models::{
    fetch_post_content, settings_map, Appointment, AppointmentStatus, BlogPostDraft,
    BlogPostSummary, ClinicSetting, ContactMessage, Doctor, DoctorDraft, Faq, FaqDraft, FaqEdit,
    Resource, Service, ServiceDraft, SettingDraft, SettingValuePatch, StatusPatch,
};

pub struct ServicesScreen {
    pub binding: ResourceBinding<Service>,
}

impl ServicesScreen {
    pub async fn load(&self) -> Result<Vec<Service>> {
        self.binding.load().await
    }

    pub async fn add(&self, draft: &ServiceDraft) -> Result<()> {
        self.binding.create(draft).await
    }

    pub async fn save(&self, id: &RowId, draft: &ServiceDraft) -> Result<()> {
        self.binding.update(id, draft).await
    }

    pub async fn toggle_active(&self, id: &RowId) -> Result<bool> {
        self.binding.toggle_active(id).await
    }

    pub async fn reorder(&self, id: &RowId, direction: Direction) -> Result<bool> {
        self.binding.reorder(id, direction).await
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }
}

pub struct DoctorsScreen {
    pub binding: ResourceBinding<Doctor>,
}

impl DoctorsScreen {
    pub async fn load(&self) -> Result<Vec<Doctor>> {
        self.binding.load().await
    }

    pub async fn add(&self, draft: &DoctorDraft) -> Result<()> {
        self.binding.create(draft).await
    }

    /// Saves an edited doctor, stamping `updated_at`
    pub async fn save(&self, doctor: &Doctor) -> Result<()> {
        self.binding
            .update(&doctor.id, &DoctorDraft::edit_of(doctor))
            .await
    }

    pub async fn toggle_active(&self, id: &RowId) -> Result<bool> {
        self.binding.toggle_active(id).await
    }

    pub async fn reorder(&self, id: &RowId, direction: Direction) -> Result<bool> {
        self.binding.reorder(id, direction).await
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }
}

/// Article list without bodies; bodies are fetched when a post is opened
pub struct BlogScreen {
    gateway: Arc<dyn Gateway>,
    pub binding: ResourceBinding<BlogPostSummary>,
}

impl BlogScreen {
    pub async fn load(&self) -> Result<Vec<BlogPostSummary>> {
        self.binding.load().await
    }

    /// Body of one post, under the binding's timeout and cancellation
    pub async fn content(&self, id: &RowId) -> Result<Option<String>> {
        self.binding
            .call(fetch_post_content(self.gateway.as_ref(), id))
            .await
    }

    /// Opens a stored post for editing
    pub async fn edit(&self, id: &RowId) -> Result<Option<BlogPostDraft>> {
        let Some(post) = self.binding.get(id).await else {
            return Ok(None);
        };
        let content = self.content(id).await?.unwrap_or_default();
        Ok(Some(BlogPostDraft::edit_of(&post, content)))
    }

    /// Inserts (`id == None`) or updates a post. The publication date is set
    /// only when the post goes from unpublished to published.
    pub async fn save(&self, id: Option<&RowId>, mut draft: BlogPostDraft) -> Result<()> {
        let was_published = match id {
            Some(id) => self
                .binding
                .get(id)
                .await
                .map_or(false, |p| p.is_published),
            None => false,
        };
        draft.stamp_publication(was_published, Utc::now());
        match id {
            Some(id) => self.binding.update(id, &draft).await,
            None => self.binding.create(&draft).await,
        }
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }
}

pub struct FaqsScreen {
    pub binding: ResourceBinding<Faq>,
}

impl FaqsScreen {
    pub async fn load(&self) -> Result<Vec<Faq>> {
        self.binding.load().await
    }

    /// Appends a new active question after the current last one
    pub async fn add(&self, question: &str, answer: &str) -> Result<()> {
        let order = self.binding.next_display_order().await;
        self.binding
            .create(&FaqDraft::new(question, answer, order))
            .await
    }

    pub async fn edit(&self, id: &RowId, question: &str, answer: &str) -> Result<()> {
        let edit = FaqEdit {
            question: question.to_string(),
            answer: answer.to_string(),
            updated_at: Utc::now(),
        };
        self.binding.update(id, &edit).await
    }

    pub async fn toggle_active(&self, id: &RowId) -> Result<bool> {
        self.binding.toggle_active(id).await
    }

    pub async fn reorder(&self, id: &RowId, direction: Direction) -> Result<bool> {
        self.binding.reorder(id, direction).await
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }
}

/// Status changes are applied to the local list without a reload
pub struct AppointmentsScreen {
    pub binding: ResourceBinding<Appointment>,
}

impl AppointmentsScreen {
    pub async fn load(&self) -> Result<Vec<Appointment>> {
        self.binding.load().await
    }

    pub async fn set_status(&self, id: &RowId, status: AppointmentStatus) -> Result<()> {
        self.binding.update(id, &StatusPatch { status }).await?;
        info!("appointment {} marked {}", id, status);
        Ok(())
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }

    pub async fn pending(&self) -> Vec<Appointment> {
        self.binding
            .items()
            .await
            .into_iter()
            .filter(|a| a.status == AppointmentStatus::Pending)
            .collect()
    }
}

/// Inbox of contact messages; new messages arrive through live updates
pub struct MessagesScreen {
    pub binding: ResourceBinding<ContactMessage>,
}

impl MessagesScreen {
    pub async fn load(&self) -> Result<Vec<ContactMessage>> {
        self.binding.load().await
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }

    pub async fn live<F>(&self, on_change: F) -> Result<LiveUpdates>
    where
        F: Fn(Vec<ContactMessage>) + Send + Sync + 'static,
    {
        self.binding.subscribe(on_change).await
    }
}

pub struct SettingsScreen {
    pub binding: ResourceBinding<ClinicSetting>,
}

impl SettingsScreen {
    pub async fn load(&self) -> Result<Vec<ClinicSetting>> {
        self.binding.load().await
    }

    /// Adds a trimmed key/value pair
    pub async fn add(&self, key: &str, value: &str) -> Result<()> {
        self.binding.create(&SettingDraft::new(key, value)).await
    }

    pub async fn set_value(&self, id: &RowId, value: &str) -> Result<()> {
        let patch = SettingValuePatch {
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        self.binding.update(id, &patch).await
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        self.binding.remove(id).await
    }

    pub async fn find(&self, key: &str) -> Option<ClinicSetting> {
        self.binding
            .items()
            .await
            .into_iter()
            .find(|s| s.key == key)
    }

    pub async fn as_map(&self) -> BTreeMap<String, String> {
        settings_map(&self.binding.items().await)
    }
}

pub(crate) fn build(gateway: &Arc<dyn Gateway>, timeout: Duration) -> Screens {
    fn bind<R: Resource>(gateway: &Arc<dyn Gateway>, timeout: Duration) -> ResourceBinding<R> {
        ResourceBinding::new(gateway.clone()).with_timeout(timeout)
    }

    Screens {
        services: ServicesScreen {
            binding: bind(gateway, timeout),
        },
        doctors: DoctorsScreen {
            binding: bind(gateway, timeout),
        },
        blog: BlogScreen {
            gateway: gateway.clone(),
            binding: bind(gateway, timeout),
        },
        faqs: FaqsScreen {
            binding: bind(gateway, timeout),
        },
        appointments: AppointmentsScreen {
            binding: bind(gateway, timeout),
        },
        messages: MessagesScreen {
            binding: bind(gateway, timeout),
        },
        settings: SettingsScreen {
            binding: bind(gateway, timeout),
        },
    }
}

pub(crate) struct Screens {
    pub services: ServicesScreen,
    pub doctors: DoctorsScreen,
    pub blog: BlogScreen,
    pub faqs: FaqsScreen,
    pub appointments: AppointmentsScreen,
    pub messages: MessagesScreen,
    pub settings: SettingsScreen,
}
