use {
    crate::player::{
        roster, sort_leaderboard, PlayerAggregator, PlayerDetailRecord, PlayerPresence,
        PlayerSummaryRecord, SortKey,
    },
    crate::status::OnlinePlayers,
    std::sync::Arc,
    tokio::{
        sync::{mpsc, RwLock},
        task::JoinHandle,
        time::{interval, Duration, MissedTickBehavior},
    },
};

/// Which table the dashboard shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Leaderboard,
    Roster,
}

impl View {
    pub fn toggle(self) -> Self {
        match self {
            View::Leaderboard => View::Roster,
            View::Roster => View::Leaderboard,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Leaderboard => "Leaderboard",
            View::Roster => "Players",
        }
    }
}

/// Requests from the UI to the background refresh task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshCommand {
    /// Reload summaries and online players now
    Refresh,
    /// Load the detail record of one player
    Detail(String),
}

/// Everything the dashboard renders.
///
/// Written by the refresh task, read by the UI loop each frame.
#[derive(Debug, Default)]
pub struct DashboardState {
    /// Summaries in listing order; views sort copies
    summaries: Vec<PlayerSummaryRecord>,
    online: OnlinePlayers,
    detail: Option<PlayerDetailRecord>,
    sort: SortKey,
    view: View,
    selected: usize,
    last_error: Option<String>,
    /// Unix seconds of the last successful refresh
    last_refresh: Option<i64>,
    refreshing: bool,
}

impl DashboardState {
    pub fn new(sort: SortKey) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn apply_refresh(&mut self, summaries: Vec<PlayerSummaryRecord>, online: OnlinePlayers, now: i64) {
        self.summaries = summaries;
        self.online = online;
        self.last_refresh = Some(now);
        self.last_error = None;
        self.refreshing = false;
        self.clamp_selection();
    }

    pub fn apply_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.refreshing = false;
    }

    pub fn set_refreshing(&mut self) {
        self.refreshing = true;
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Summaries ordered by the current sort key
    pub fn leaderboard(&self) -> Vec<PlayerSummaryRecord> {
        let mut rows = self.summaries.clone();
        sort_leaderboard(&mut rows, self.sort);
        rows
    }

    pub fn roster(&self) -> Vec<PlayerPresence> {
        roster(&self.summaries, &self.online)
    }

    pub fn player_count(&self) -> usize {
        self.summaries.len()
    }

    pub fn online(&self) -> &OnlinePlayers {
        &self.online
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.selected = 0;
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn toggle_view(&mut self) {
        self.view = self.view.toggle();
        self.selected = 0;
        self.detail = None;
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.summaries.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Identifier of the highlighted row in the current view
    pub fn selected_uuid(&self) -> Option<String> {
        match self.view {
            View::Leaderboard => self
                .leaderboard()
                .get(self.selected)
                .map(|r| r.identity.uuid.clone()),
            View::Roster => self
                .roster()
                .get(self.selected)
                .map(|r| r.summary.identity.uuid.clone()),
        }
    }

    pub fn detail(&self) -> Option<&PlayerDetailRecord> {
        self.detail.as_ref()
    }

    pub fn set_detail(&mut self, detail: Option<PlayerDetailRecord>) {
        self.detail = detail;
    }

    pub fn clear_detail(&mut self) {
        self.detail = None;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_refresh(&self) -> Option<i64> {
        self.last_refresh
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.summaries.len() {
            self.selected = self.summaries.len().saturating_sub(1);
        }
    }
}

/// Reload summaries and online players into the shared state
pub async fn refresh_once(aggregator: &PlayerAggregator, state: &Arc<RwLock<DashboardState>>) {
    state.write().await.set_refreshing();

    let (summaries, online) = tokio::join!(
        aggregator.fetch_summary_for_all(),
        aggregator.fetch_online_players()
    );

    match summaries {
        Ok(summaries) => {
            log::debug!("🔄 Refreshed {} players ({} online)", summaries.len(), online.count);
            let now = chrono::Utc::now().timestamp();
            state.write().await.apply_refresh(summaries, online, now);
        }
        Err(e) => {
            log::error!("❌ Refresh failed: {}", e);
            state.write().await.apply_error(e.to_string());
        }
    }
}

async fn load_detail(aggregator: &PlayerAggregator, state: &Arc<RwLock<DashboardState>>, uuid: &str) {
    match aggregator.fetch_details_for(uuid).await {
        Ok(Some(detail)) => state.write().await.set_detail(Some(detail)),
        Ok(None) => {
            log::debug!("No statistics for {}", uuid);
            state.write().await.apply_error(format!("no statistics for {}", uuid));
        }
        Err(e) => {
            log::error!("❌ Detail load for {} failed: {}", uuid, e);
            state.write().await.apply_error(e.to_string());
        }
    }
}

/// Background task: refresh every `period` and serve UI commands until the
/// command channel closes.
pub fn spawn_refresh_task(
    aggregator: PlayerAggregator,
    state: Arc<RwLock<DashboardState>>,
    period: Duration,
    mut commands: mpsc::Receiver<RefreshCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!("⏰ Starting refresh task (interval: {}s)", period.as_secs());

        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => refresh_once(&aggregator, &state).await,
                command = commands.recv() => match command {
                    Some(RefreshCommand::Refresh) => {
                        refresh_once(&aggregator, &state).await;
                        timer.reset();
                    }
                    Some(RefreshCommand::Detail(uuid)) => load_detail(&aggregator, &state, &uuid).await,
                    None => break,
                },
            }
        }

        log::debug!("Refresh task stopped");
    })
}
