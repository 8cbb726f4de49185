//! Client-side view of one pending redemption.
//!
//! A `RedemptionWatch` runs two tasks: a 1-second countdown over the code's
//! validity window and a listener on the owner's usage feed. Their combined
//! result is published through a `tokio::sync::watch` channel. The countdown
//! is advisory; the finalizer enforces expiry on its own.

use std::sync::Arc;
use std::time::Duration;

use noxly_cache::FeedSubscription;
use noxly_core::entities::{ExpiryState, UsageRecord};
use noxly_core::{DomainError, Snowflake};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::redemption::RedemptionService;

const TICK: Duration = Duration::from_secs(1);

type StateSender = Arc<watch::Sender<ExpiryState>>;

/// Live countdown and finalization tracking for a pending usage
pub struct RedemptionWatch {
    ctx: ServiceContext,
    user_id: Snowflake,
    usage_id: Snowflake,
    state: watch::Receiver<ExpiryState>,
    countdown: JoinHandle<()>,
    listener: JoinHandle<()>,
}

impl RedemptionWatch {
    /// Start watching `usage_id`, which must belong to `user_id`
    pub async fn start(
        ctx: &ServiceContext,
        user_id: Snowflake,
        usage_id: Snowflake,
    ) -> ServiceResult<Self> {
        let record = ctx
            .usage_repo()
            .find_by_id(usage_id)
            .await?
            .ok_or(DomainError::UsageNotFound(usage_id))?;
        if record.user_id != user_id {
            return Err(DomainError::NotUsageOwner.into());
        }

        // subscribe before reading the state so no change slips between
        let subscription = ctx.usage_feed().subscribe(user_id);

        let initial = ExpiryState::evaluate(
            &record,
            ctx.clock().now(),
            ctx.settings().validity_window,
        );
        if initial == ExpiryState::ExpiredClientSide {
            request_cleanup(ctx, &record).await;
        }

        let (tx, rx) = watch::channel(initial);
        let tx = Arc::new(tx);

        let countdown = tokio::spawn(run_countdown(ctx.clone(), record, tx.clone()));
        let listener = tokio::spawn(run_listener(subscription, usage_id, tx));

        Ok(Self {
            ctx: ctx.clone(),
            user_id,
            usage_id,
            state: rx,
            countdown,
            listener,
        })
    }

    pub fn usage_id(&self) -> Snowflake {
        self.usage_id
    }

    /// Current state
    pub fn state(&self) -> ExpiryState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<ExpiryState> {
        self.state.clone()
    }

    /// Stop both tasks; a still-active usage is withdrawn with a refund
    pub async fn close(self) -> ServiceResult<()> {
        self.countdown.abort();
        self.listener.abort();

        if !self.state().is_terminal() {
            match RedemptionService::new(&self.ctx)
                .cancel_pending(self.user_id, self.usage_id)
                .await
            {
                Ok(()) => {}
                Err(e) if matches!(
                    e.as_domain(),
                    Some(DomainError::UsageNotFound(_) | DomainError::UsageAlreadyFinalized)
                ) =>
                {
                    debug!(usage_id = %self.usage_id, "Usage settled before close");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

impl Drop for RedemptionWatch {
    fn drop(&mut self) {
        self.countdown.abort();
        self.listener.abort();
    }
}

/// Move to `next` unless a terminal state was already reached
fn advance(state: &watch::Sender<ExpiryState>, next: ExpiryState) -> bool {
    state.send_if_modified(|current| {
        if current.is_terminal() || *current == next {
            return false;
        }
        *current = next;
        true
    })
}

async fn run_countdown(ctx: ServiceContext, record: UsageRecord, state: StateSender) {
    let window = ctx.settings().validity_window;
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if state.borrow().is_terminal() {
            return;
        }

        let next = ExpiryState::evaluate(&record, ctx.clock().now(), window);
        let moved = advance(&state, next);

        if next == ExpiryState::ExpiredClientSide {
            if moved {
                info!(usage_id = %record.id, "Redemption code expired on client");
                request_cleanup(&ctx, &record).await;
            }
            return;
        }
    }
}

async fn run_listener(mut subscription: FeedSubscription, usage_id: Snowflake, state: StateSender) {
    while let Some(change) = subscription.recv().await {
        if change.usage_id != usage_id {
            continue;
        }
        if change.deleted {
            // withdrawn elsewhere or swept
            advance(&state, ExpiryState::ExpiredClientSide);
            return;
        }
        if change.is_used {
            advance(&state, ExpiryState::FinalizedExternally);
            return;
        }
    }
}

async fn request_cleanup(ctx: &ServiceContext, record: &UsageRecord) {
    match RedemptionService::new(ctx)
        .cancel_pending(record.user_id, record.id)
        .await
    {
        Ok(()) => {}
        Err(e) => match e.as_domain() {
            Some(DomainError::UsageNotFound(_)) => {
                debug!(usage_id = %record.id, "Expired usage already removed");
            }
            Some(DomainError::UsageAlreadyFinalized) => {
                debug!(usage_id = %record.id, "Usage finalized at the window edge");
            }
            _ => warn!(usage_id = %record.id, error = %e, "Expired usage cleanup failed"),
        },
    }
}
