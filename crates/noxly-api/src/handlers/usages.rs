//! Usage handlers
//!
//! Usage status, withdrawal of a pending code and the live streams a
//! consumer device keeps open while a code is on screen.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use noxly_cache::FeedSubscription;
use noxly_core::entities::ExpiryState;
use noxly_service::dto::{UsageFeedEvent, UsageStatusResponse};
use noxly_service::{RedemptionService, RedemptionWatch};
use tokio::sync::watch;
use tracing::debug;

use crate::extractors::{AuthUser, CouponIdPath, UsageIdPath};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// Pending and finalized usage of a coupon for the current user
///
/// GET /coupons/{coupon_id}/usage
pub async fn get_usage_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<CouponIdPath>,
) -> ApiResult<Json<UsageStatusResponse>> {
    let coupon_id = path.coupon_id()?;

    let service = RedemptionService::new(state.service_context());
    let status = service.usage_status(auth.user_id, coupon_id).await?;
    Ok(Json(status))
}

/// Withdraw a pending usage and refund any reserved points
///
/// DELETE /usages/{usage_id}
pub async fn cancel_usage(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<UsageIdPath>,
) -> ApiResult<NoContent> {
    let usage_id = path.usage_id()?;

    let service = RedemptionService::new(state.service_context());
    service.cancel_pending(auth.user_id, usage_id).await?;
    Ok(NoContent)
}

/// Stream of the caller's usage changes
///
/// GET /users/@me/usages/feed
pub async fn usage_feed(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.service_context().usage_feed().subscribe(auth.user_id);
    debug!(user_id = %auth.user_id, "Usage feed stream opened");

    Sse::new(feed_events(subscription)).keep_alive(KeepAlive::default())
}

fn feed_events(subscription: FeedSubscription) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.recv().await?;
        let event = Event::default()
            .event(change.event_type())
            .json_data(UsageFeedEvent::from(&change));
        Some((event, subscription))
    })
}

/// Countdown and finalization state of one pending usage
///
/// GET /usages/{usage_id}/watch
///
/// The stream ends after the first terminal state. Disconnecting stops the
/// watch without withdrawing the usage.
pub async fn watch_usage(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<UsageIdPath>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let usage_id = path.usage_id()?;

    let watch = RedemptionWatch::start(state.service_context(), auth.user_id, usage_id).await?;
    let states = watch.subscribe();

    Ok(Sse::new(watch_events(watch, states)).keep_alive(KeepAlive::default()))
}

struct WatchStream {
    // held so the countdown and listener live as long as the stream
    _watch: RedemptionWatch,
    states: watch::Receiver<ExpiryState>,
    started: bool,
}

fn watch_events(
    watch: RedemptionWatch,
    states: watch::Receiver<ExpiryState>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let initial = WatchStream {
        _watch: watch,
        states,
        started: false,
    };

    stream::unfold(Some(initial), |current| async move {
        let mut current = current?;
        if current.started && current.states.changed().await.is_err() {
            return None;
        }
        current.started = true;

        let state = *current.states.borrow_and_update();
        let event = state_event(state);
        let next = if state.is_terminal() { None } else { Some(current) };
        Some((Ok(event), next))
    })
}

fn state_event(state: ExpiryState) -> Event {
    let name = match state {
        ExpiryState::Active { .. } => "active",
        ExpiryState::ExpiredClientSide => "expired",
        ExpiryState::FinalizedExternally => "finalized",
    };
    match Event::default().event(name).json_data(state) {
        Ok(event) => event,
        Err(_) => Event::default().event(name),
    }
}
