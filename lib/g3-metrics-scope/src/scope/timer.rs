/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Weak;
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{ScopeInner, StatsScope};

/// Periodic flush trigger of one scope, cancelled on drop.
pub(super) struct FlushTimer {
    handle: JoinHandle<()>,
}

impl FlushTimer {
    /// Spawn on the current tokio runtime, if there is one.
    pub(super) fn spawn(scope: Weak<ScopeInner>, period: Duration) -> Option<Self> {
        let rt = match Handle::try_current() {
            Ok(rt) => rt,
            Err(e) => {
                warn!("periodic metrics flush not started: {e}");
                return None;
            }
        };

        let handle = rt.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(inner) = scope.upgrade() else {
                    debug!("metrics scope dropped, quit periodic flush");
                    break;
                };
                let scope = StatsScope { inner };
                if let Err(e) = scope.flush() {
                    warn!("periodic metrics flush failed: {e:?}");
                }
            }
        });
        Some(FlushTimer { handle })
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
