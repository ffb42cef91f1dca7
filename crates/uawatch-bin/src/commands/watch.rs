// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `watch` command.
//!
//! Subscribes to a variable through a client, then writes a temperature
//! sweep followed by one high, one low and one normal reading. Each write is
//! paired with the acknowledgement of its notification, so the run needs no
//! fixed sleeps.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;
use uawatch_config::UawatchConfig;
use uawatch_core::{ChannelListener, NotificationRouter, RouterStatsSnapshot, Value};
use uawatch_opcua::{LocalTransport, UaClient};

use super::connect_local;
use crate::cli::WatchArgs;
use crate::error::{BinError, BinResult};
use crate::listeners::{ThresholdCounts, ThresholdListener};
use crate::settings;

/// Readings written after the sweep.
const ALERT_READINGS: [f32; 3] = [35.0, 5.0, 22.5];

/// Number of sweep steps.
const SWEEP_STEPS: u16 = 10;

/// Outcome of the subscription demo.
#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    /// Values written.
    pub writes: usize,
    /// Notifications acknowledged, including the initial value.
    pub notifications: usize,
    /// Threshold classification counters.
    pub counts: ThresholdCounts,
    /// Router counters.
    pub stats: RouterStatsSnapshot,
}

/// Executes the `watch` command.
pub async fn watch(config: &UawatchConfig, args: WatchArgs) -> BinResult<()> {
    let report = run_watch(config, &args).await?;
    info!(
        writes = report.writes,
        notifications = report.notifications,
        high = report.counts.high,
        low = report.counts.low,
        normal = report.counts.normal,
        "Subscription demo complete"
    );
    Ok(())
}

/// Runs the subscription demo against an in-process server.
pub async fn run_watch(config: &UawatchConfig, args: &WatchArgs) -> BinResult<WatchReport> {
    let (server, mut client, ns) = connect_local(config, None).await?;

    let threshold = Arc::new(ThresholdListener::new(args.high, args.low));
    let (ack, acks) = ChannelListener::with_channel("ack", 16);
    let router = Arc::new(
        NotificationRouter::builder()
            .watched_key(args.variable.as_str())
            .policy(settings::dispatch_policy(config))
            .listener(threshold.clone())
            .listener(Arc::new(ack))
            .build(),
    );

    let period = args
        .period_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.server.subscription_period());
    let mut driver = Driver {
        client: &client,
        acks,
        ns,
        variable: &args.variable,
        ack_timeout: period * 4 + config.client.request_timeout(),
        writes: 0,
        notifications: 0,
    };

    let result = driver.run(router.clone(), period).await;
    let (writes, notifications) = (driver.writes, driver.notifications);
    drop(driver);

    client.disconnect().await?;
    server.stop();
    result?;

    Ok(WatchReport {
        writes,
        notifications,
        counts: threshold.counts(),
        stats: router.stats().snapshot(),
    })
}

struct Driver<'a> {
    client: &'a UaClient<LocalTransport>,
    acks: mpsc::Receiver<(String, Value)>,
    ns: u16,
    variable: &'a str,
    ack_timeout: Duration,
    writes: usize,
    notifications: usize,
}

impl Driver<'_> {
    async fn run(&mut self, router: Arc<NotificationRouter>, period: Duration) -> BinResult<()> {
        let mut current = self.client.read_variable(self.variable, self.ns).await?;

        let mut handle = self
            .client
            .subscribe(period, router, &[self.variable], self.ns)
            .await?;
        self.await_ack().await?;

        for i in 0..SWEEP_STEPS {
            let reading = 15.0 + f32::from(i) * 2.0;
            current = self.write(&current, reading).await?;
            info!("Changed {} to {}", self.variable, current);
        }

        info!("Testing alert conditions...");
        for reading in ALERT_READINGS {
            current = self.write(&current, reading).await?;
        }

        handle.unsubscribe(self.client, self.variable).await?;
        handle.delete(self.client).await?;
        Ok(())
    }

    /// Writes `reading` shaped like `current` and waits for its notification.
    async fn write(&mut self, current: &Value, reading: f32) -> BinResult<Value> {
        let value = match current {
            Value::Float(_) => Value::Float(reading),
            Value::Int32(_) => Value::Int32(reading.round() as i32),
            other => {
                return Err(BinError::config(format!(
                    "variable '{}' is not numeric ({})",
                    self.variable,
                    other.data_type()
                )))
            }
        };

        self.client
            .write_variable(self.variable, self.ns, value.clone())
            .await?;
        self.writes += 1;

        // Unchanged values produce no notification.
        if &value != current {
            self.await_ack().await?;
        }
        Ok(value)
    }

    async fn await_ack(&mut self) -> BinResult<()> {
        match tokio::time::timeout(self.ack_timeout, self.acks.recv()).await {
            Ok(Some(_)) => {
                self.notifications += 1;
                Ok(())
            }
            Ok(None) => Err(BinError::demo("watch", "notification channel closed")),
            Err(_) => Err(BinError::demo(
                "watch",
                format!("no notification for '{}' within {:?}", self.variable, self.ack_timeout),
            )),
        }
    }
}
