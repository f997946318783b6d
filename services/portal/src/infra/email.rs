use anyhow::Context as _;
use serde::Serialize;
use tracing::info;

use egram_domain::email::Email;
use egram_domain::otp::OneTimeCode;

use crate::domain::repository::EmailSender;
use crate::domain::types::OTP_TTL_SECS;
use crate::error::PortalError;

pub const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Sends codes through the EmailJS REST API using a pre-configured template.
///
/// The template receives `to_email`, `to_name`, `passcode` and `valid_minutes`.
#[derive(Clone)]
pub struct EmailJsSender {
    pub client: reqwest::Client,
    pub api_url: String,
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    to_name: &'a str,
    passcode: &'a str,
    valid_minutes: i64,
}

impl EmailJsSender {
    fn request<'a>(
        &'a self,
        to: &'a Email,
        recipient_name: &'a str,
        code: &'a OneTimeCode,
    ) -> SendRequest<'a> {
        SendRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: TemplateParams {
                to_email: to.as_str(),
                to_name: recipient_name,
                passcode: code.as_str(),
                valid_minutes: OTP_TTL_SECS / 60,
            },
        }
    }
}

impl EmailSender for EmailJsSender {
    async fn send(
        &self,
        to: &Email,
        recipient_name: &str,
        code: &OneTimeCode,
    ) -> Result<(), PortalError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&self.request(to, recipient_name, code))
            .send()
            .await
            .context("emailjs request")
            .map_err(PortalError::EmailDispatch)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::EmailDispatch(anyhow::anyhow!(
                "emailjs returned {status}: {body}"
            )));
        }
        info!(to = %to, "verification email sent");
        Ok(())
    }
}

/// Development sender: writes the code to the log instead of mailing it.
#[derive(Clone, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    async fn send(
        &self,
        to: &Email,
        recipient_name: &str,
        code: &OneTimeCode,
    ) -> Result<(), PortalError> {
        info!(
            to = %to,
            name = recipient_name,
            code = code.as_str(),
            "email delivery disabled; logging one-time code"
        );
        Ok(())
    }
}
