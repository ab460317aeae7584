use crate::api::{ApiClient, ServiceUrls};
use crate::error::{ApiError, PollerError};
use crate::panels::Panel;
use crate::session::{Credentials, SessionSource};
use crate::state::{CycleOutcome, FetchState, OverlapPolicy, Timestamp};
use chrono::Utc;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Everything a poller needs besides its panel
///
/// Shared by all panels of a dashboard. The session is injected here rather
/// than looked up globally, so pollers never depend on how it is stored.
#[derive(Clone)]
pub struct PollContext {
    pub client: ApiClient,
    pub session: Arc<dyn SessionSource>,
    pub services: ServiceUrls,
    pub overlap: OverlapPolicy,
}

impl PollContext {
    pub fn new(client: ApiClient, session: Arc<dyn SessionSource>, services: ServiceUrls) -> Self {
        Self {
            client,
            session,
            services,
            overlap: OverlapPolicy::default(),
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }
}

/// State shared between the handle, the timer task and in-flight cycles
struct Shared<V> {
    state: watch::Sender<FetchState<V>>,
    mounted: AtomicBool,
    overlap: OverlapPolicy,
}

impl<V> Shared<V> {
    /// Record a new cycle; `false` once the poller has been unmounted
    fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if !self.mounted.load(Ordering::Acquire) {
                return false;
            }
            state.begin_cycle();
            true
        })
    }

    /// Apply a cycle outcome unless the poller has been unmounted
    ///
    /// The mounted check and the write happen under the channel lock, which
    /// `stop` also takes, so nothing lands once `stop` has returned. The same
    /// holds for `begin`.
    ///
    /// # Returns
    ///
    /// `None` if unmounted, otherwise whether the outcome was applied
    fn settle(&self, cycle: u64, outcome: CycleOutcome<V>, now: Timestamp) -> Option<bool> {
        let overlap = self.overlap;
        let mut applied = None;
        self.state.send_if_modified(|state| {
            if !self.mounted.load(Ordering::Acquire) {
                return false;
            }
            applied = Some(state.settle(cycle, outcome, overlap, now));
            true
        });
        applied
    }

    fn stop(&self) {
        self.state.send_if_modified(|_| {
            self.mounted.store(false, Ordering::Release);
            false
        });
    }
}

/// Keeps one panel's view state synchronised with its backend resource
///
/// Mounting fetches once immediately and then once per interval. Cycles run as
/// independent tasks, so a slow request does not delay the next tick and two
/// cycles may be in flight at once. Failures are recorded in the state and never
/// stop the timer. Unmounting (or dropping the poller) stops the timer; replies
/// that arrive afterwards are ignored.
pub struct DataPoller<V> {
    name: String,
    interval: Duration,
    shared: Arc<Shared<V>>,
    timer: Option<JoinHandle<()>>,
}

impl<V> DataPoller<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Mount a panel and start polling
    ///
    /// # Arguments
    ///
    /// * `panel` - The panel to keep up to date
    /// * `context` - Client, session and service URLs shared across panels
    ///
    /// # Errors
    ///
    /// Returns `PollerError::InvalidInterval` if the panel's interval is zero.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount<P>(panel: P, context: PollContext) -> Result<Self, PollerError>
    where
        P: Panel<View = V>,
    {
        let name = panel.name().to_string();
        let interval = panel.interval();
        if interval.is_zero() {
            return Err(PollerError::InvalidInterval(name));
        }

        let (state, _) = watch::channel(FetchState::new());
        let shared = Arc::new(Shared {
            state,
            mounted: AtomicBool::new(true),
            overlap: context.overlap,
        });

        info!("Mounting panel '{}' (interval {:?})", name, interval);
        let timer = tokio::spawn(run_timer(
            Arc::new(panel),
            Arc::new(context),
            Arc::clone(&shared),
            interval,
        ));

        Ok(Self {
            name,
            interval,
            shared,
            timer: Some(timer),
        })
    }

    /// Snapshot of the current view state
    pub fn state(&self) -> FetchState<V> {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified whenever a cycle begins or settles
    pub fn subscribe(&self) -> watch::Receiver<FetchState<V>> {
        self.shared.state.subscribe()
    }
}

impl<V> DataPoller<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the interval timer is still live
    pub fn is_polling(&self) -> bool {
        self.timer.is_some()
    }

    /// Stop polling
    ///
    /// Clears the interval timer. Requests already in flight are not aborted,
    /// but their replies are no longer applied. Calling this twice is harmless.
    pub fn unmount(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.shared.stop();
            timer.abort();
            info!("Unmounted panel '{}'", self.name);
        }
    }
}

impl<V> Drop for DataPoller<V> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Fetch a panel's resource once and map the reply
///
/// Credentials are read fresh from the session for every call.
pub async fn fetch_once<P: Panel>(panel: &P, context: &PollContext) -> CycleOutcome<P::View> {
    let credentials = context.session.credentials();
    let token = credentials.as_ref().and_then(Credentials::bearer);

    let describe = |e: ApiError| format!("Failed to fetch {} data: {}", panel.name(), e);

    let url = panel
        .endpoint(credentials.as_ref())
        .url(&context.services)
        .map_err(describe)?;
    let payload = context.client.get(&url, token).await.map_err(describe)?;

    Ok(panel.map(&payload))
}

async fn run_timer<P: Panel>(
    panel: Arc<P>,
    context: Arc<PollContext>,
    shared: Arc<Shared<P::View>>,
    interval: Duration,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle: u64 = 0;

    loop {
        // The first tick completes immediately: that is the fetch on mount
        ticker.tick().await;
        if !shared.begin() {
            break;
        }

        cycle += 1;
        debug!("Panel '{}' starting cycle {}", panel.name(), cycle);

        tokio::spawn(run_cycle(
            Arc::clone(&panel),
            Arc::clone(&context),
            Arc::clone(&shared),
            cycle,
        ));
    }
}

async fn run_cycle<P: Panel>(
    panel: Arc<P>,
    context: Arc<PollContext>,
    shared: Arc<Shared<P::View>>,
    cycle: u64,
) {
    let outcome = fetch_once(panel.as_ref(), &context).await;

    if let Err(message) = &outcome {
        debug!("{} (cycle {})", message, cycle);
    }

    match shared.settle(cycle, outcome, Utc::now()) {
        Some(true) => debug!("Panel '{}' settled cycle {}", panel.name(), cycle),
        Some(false) => {}
        None => debug!(
            "Panel '{}' unmounted, dropping reply of cycle {}",
            panel.name(),
            cycle
        ),
    }
}
