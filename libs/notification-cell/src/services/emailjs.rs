use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{Notification, NotificationTemplate};
use crate::services::dispatcher::NotificationDispatcher;

/// Template ids registered with the e-mail service.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    pub new_booking: String,
    pub confirmation: String,
    pub prescription: String,
}

impl EmailTemplates {
    fn id_for(&self, template: NotificationTemplate) -> &str {
        match template {
            NotificationTemplate::NewBooking => &self.new_booking,
            NotificationTemplate::Confirmation => &self.confirmation,
            NotificationTemplate::Prescription => &self.prescription,
        }
    }
}

pub struct EmailJsDispatcher {
    client: Client,
    base_url: String,
    service_id: String,
    public_key: String,
    private_key: String,
    templates: EmailTemplates,
}

impl EmailJsDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.emailjs_base_url.trim_end_matches('/').to_string(),
            service_id: config.emailjs_service_id.clone(),
            public_key: config.emailjs_public_key.clone(),
            private_key: config.emailjs_private_key.clone(),
            templates: EmailTemplates {
                new_booking: config.emailjs_template_new_booking.clone(),
                confirmation: config.emailjs_template_confirmation.clone(),
                prescription: config.emailjs_template_prescription.clone(),
            },
        }
    }
}

#[async_trait]
impl NotificationDispatcher for EmailJsDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let template_id = self.templates.id_for(notification.template);
        if self.service_id.is_empty() || self.public_key.is_empty() || template_id.is_empty() {
            return Err(NotificationError::NotConfigured);
        }

        let url = format!("{}/email/send", self.base_url);
        debug!("Sending '{}' notification via {}", notification.template, url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "service_id": self.service_id,
                "template_id": template_id,
                "user_id": self.public_key,
                "accessToken": self.private_key,
                "template_params": notification.variables,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("E-mail service error ({}): {}", status, body);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
