//! Newsletter API endpoints.

use axum::extract::{Path, State};
use chrono::Utc;

use super::{created, success, ApiResult, Deleted, JsonBody};
use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::mailer::{render_newsletter, OutgoingEmail};
use crate::models::{
    timestamp, Campaign, NewsletterOverview, SendNewsletterRequest, SubscribeRequest, Subscriber,
};
use crate::AppState;

/// POST /api/newsletter - Subscribe an email address.
pub async fn subscribe(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SubscribeRequest>,
) -> ApiResult<Subscriber> {
    let email = request.normalized_email()?;
    let subscriber = state.repo.add_subscriber(&email).await?;
    tracing::info!("New newsletter subscriber {}", subscriber.id);
    created(subscriber)
}

/// GET /api/admin/newsletter - Subscribers and past campaigns.
pub async fn newsletter_overview(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> ApiResult<NewsletterOverview> {
    let subscribers = state.repo.list_subscribers().await?;
    let campaigns = state.repo.list_campaigns().await?;
    success(NewsletterOverview {
        subscribers,
        campaigns,
    })
}

/// DELETE /api/admin/newsletter/{id} - Remove a subscriber.
pub async fn delete_subscriber(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    state.repo.delete_subscriber(&id).await?;
    tracing::info!("Removed newsletter subscriber {} ({})", id, admin.email);
    success(Deleted { id })
}

/// POST /api/admin/newsletter/send - Send now, or record a scheduled campaign.
///
/// Sending makes a single mailer call with every subscriber. The campaign is
/// recorded only after the mailer accepted the message.
pub async fn send_newsletter(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SendNewsletterRequest>,
) -> ApiResult<Campaign> {
    let now = Utc::now();
    let request = request.validate(now)?;

    if let Some(at) = request.scheduled_at {
        let campaign = state
            .repo
            .create_campaign(&request.title, &request.message, Some(timestamp(at)), None, 0)
            .await?;
        tracing::info!("Scheduled newsletter {} for {}", campaign.id, timestamp(at));
        return created(campaign);
    }

    let recipients = state.repo.subscriber_emails().await?;
    let recipient_count = recipients.len() as i64;

    if recipients.is_empty() {
        tracing::info!("No subscribers, skipping newsletter delivery");
    } else {
        let email = OutgoingEmail {
            html: render_newsletter(&request.title, &request.message, &state.config.site_url),
            subject: request.title.clone(),
            recipients,
        };
        state.mailer.send(&email).await?;
        tracing::info!(
            "Newsletter sent to {} subscribers by {}",
            recipient_count,
            admin.email
        );
    }

    let campaign = state
        .repo
        .create_campaign(
            &request.title,
            &request.message,
            None,
            Some(timestamp(now)),
            recipient_count,
        )
        .await
        .map_err(|e| {
            tracing::error!("Newsletter sent but campaign not recorded: {}", e);
            AppError::Internal(format!(
                "Newsletter was sent to {} subscribers but could not be recorded",
                recipient_count
            ))
        })?;

    created(campaign)
}
