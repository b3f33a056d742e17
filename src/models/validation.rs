use crate::{
    error::ValidationError,
    models::{channel::Channel, message::NotificationRequest},
};

/// Checks the fields every request on `channel` must carry. Stops at the
/// first violated rule.
pub fn validate_request(
    request: &NotificationRequest,
    channel: Channel,
) -> Result<(), ValidationError> {
    if request.notification_id.is_empty() {
        return Err(ValidationError::InvalidNotificationId);
    }

    if request.to.is_empty() {
        return Err(ValidationError::InvalidRecipient);
    }

    let has_body = !request.template_body.is_empty();

    let has_content = match channel {
        Channel::WhatsApp => has_body || request.template_name().is_some(),
        Channel::Email | Channel::Sms => has_body,
    };

    if !has_content {
        return Err(ValidationError::MissingContent);
    }

    Ok(())
}
