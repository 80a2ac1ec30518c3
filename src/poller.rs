// file: src/poller.rs
// description: REST refresh cycle used for the initial load and the polling fallback

use crate::{
    config::Config,
    error::DashboardError,
    events::{ChannelEvent, EventSender},
    monitoring,
    types::{
        DashboardSnapshot, ModerationLogList, PersonaPayload, ScheduledTaskList, ServerList,
        StatsUpdate,
    },
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, warn};
use url::Url;

/// Performs one full dashboard refresh against the backend REST surface:
/// stats, servers, moderation log tail, scheduled tasks, personas.
/// Sections are fetched concurrently and independently; a failed request
/// leaves its section empty instead of aborting the cycle.
#[derive(Clone)]
pub struct DashboardPoller {
    http: reqwest::Client,
    api_base: Url,
    interval: Duration,
    event_sender: EventSender,
}

impl DashboardPoller {
    pub fn new(config: Arc<Config>, event_sender: EventSender) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.polling.api_base.clone(),
            interval: config.polling.interval,
            event_sender,
        }
    }

    /// Recurring fallback loop. The first refresh happens immediately;
    /// the loop ends only on shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_and_publish().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("polling loop stopped by shutdown");
                        break;
                    }
                }
            }
        }
    }

    /// One refresh cycle, published to the renderer as a snapshot event.
    pub async fn refresh_and_publish(&self) {
        let snapshot = self.refresh().await;
        monitoring::POLL_CYCLES_COUNTER.increment(1);
        let _ = self
            .event_sender
            .send(ChannelEvent::SnapshotRefreshed(Arc::new(snapshot)))
            .await;
    }

    pub async fn refresh(&self) -> DashboardSnapshot {
        let (stats, servers, logs, tasks, personas) = tokio::join!(
            self.fetch_json::<StatsUpdate>("stats"),
            self.fetch_json::<ServerList>("servers"),
            self.fetch_json::<ModerationLogList>("moderation/logs"),
            self.fetch_json::<ScheduledTaskList>("tasks"),
            self.fetch_json::<PersonaPayload>("personas"),
        );

        let mut snapshot = DashboardSnapshot {
            fetched_at: Utc::now(),
            ..Default::default()
        };
        match stats {
            Ok(stats) => snapshot.stats = Some(stats),
            Err(e) => warn!("stats refresh failed: {e}"),
        }
        match servers {
            Ok(servers) => snapshot.servers = servers.into_servers(),
            Err(e) => warn!("server list refresh failed: {e}"),
        }
        match logs {
            Ok(logs) => snapshot.moderation_logs = logs.logs,
            Err(e) => warn!("moderation log refresh failed: {e}"),
        }
        match tasks {
            Ok(tasks) => snapshot.scheduled_tasks = tasks.tasks,
            Err(e) => warn!("scheduled task refresh failed: {e}"),
        }
        match personas {
            Ok(personas) => snapshot.personas = Some(personas.into_inventory()),
            Err(e) => warn!("persona refresh failed: {e}"),
        }
        snapshot
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DashboardError> {
        let url = self.api_base.join(path)?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}
