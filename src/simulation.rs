use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::{RunLimit, SimConfig};
use crate::error::SimError;
use crate::philosopher::{MealQuota, Philosopher, PhilosopherId};
use crate::report::{Event, PhilosopherReport, Report};
use crate::stop::StopSignal;
use crate::table::Table;

/// 円卓を組み立て、哲学者を並行に走らせ、止めて結果をまとめる
pub struct Simulation {
    config: SimConfig,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl Simulation {
    /// 設定エラーはここで返り、哲学者は 1 人も起動しない
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Simulation {
            config,
            events: None,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// 全員の状態遷移を tx に流す
    pub fn observe(mut self, tx: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(tx);
        self
    }

    pub async fn run(&self) -> Result<Report, SimError> {
        self.run_until(future::pending::<()>()).await
    }

    /// interrupt が先に完了したら、その時点で停止シグナルを出す
    pub async fn run_until(&self, interrupt: impl Future<Output = ()>) -> Result<Report, SimError> {
        let table = Arc::new(Table::new(self.config.philosophers)?);
        let stop = StopSignal::new();
        let quota = match self.config.run {
            RunLimit::Meals { per_philosopher } => {
                Some(Arc::new(MealQuota::new(per_philosopher, table.len())))
            }
            RunLimit::Duration { .. } => None,
        };

        let started = Instant::now();
        let mut handles = Vec::with_capacity(table.len());
        for seat in table.seats() {
            let rng = match self.config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(seat.philosopher.0 as u64)),
                None => StdRng::from_entropy(),
            };
            let mut p = Philosopher::new(
                *seat,
                table.clone(),
                stop.clone(),
                self.config.think,
                self.config.eat,
                rng,
            );
            if let Some(tx) = &self.events {
                p = p.with_events(tx.clone());
            }
            if let Some(quota) = &quota {
                p = p.with_quota(quota.clone());
            }
            handles.push((seat.philosopher, tokio::spawn(p.dine())));
        }
        info!(philosophers = table.len(), "dinner started");

        let limit = async {
            match &quota {
                Some(quota) => quota.wait().await,
                None => {
                    if let RunLimit::Duration { ms } = self.config.run {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                }
            }
        };

        let interrupted = tokio::select! {
            _ = limit => false,
            _ = interrupt => true,
        };
        if interrupted {
            warn!("interrupted, asking philosophers to stop");
        }

        stop.raise();
        info!("stop signal raised");

        let philosophers = join_stopped(handles, self.config.shutdown_grace()).await?;
        let elapsed = started.elapsed();

        check_forks(&table)?;

        Ok(Report {
            philosophers,
            fork_acquisitions: table.forks().iter().map(|f| f.acquisitions()).collect(),
            elapsed,
            interrupted,
        })
    }
}

/// 全員が止まるのを待つ。猶予を過ぎたら残りを abort して、止まらなかった哲学者を返す
async fn join_stopped(
    mut handles: Vec<(PhilosopherId, JoinHandle<PhilosopherReport>)>,
    grace: Duration,
) -> Result<Vec<PhilosopherReport>, SimError> {
    let joined = tokio::time::timeout(grace, join_all(handles.iter_mut().map(|(_, h)| h))).await;

    match joined {
        Ok(results) => {
            let mut reports = Vec::with_capacity(results.len());
            for r in results {
                reports.push(r?);
            }
            Ok(reports)
        }
        Err(_) => {
            let stuck: Vec<_> = handles
                .iter()
                .filter(|(_, h)| !h.is_finished())
                .map(|(id, _)| *id)
                .collect();
            for (_, h) in &handles {
                h.abort();
            }
            error!(?stuck, ?grace, "philosophers did not stop, possible deadlock");
            Err(SimError::ShutdownTimedOut { grace, stuck })
        }
    }
}

// 全員止まった後はフォークが全部空いていて、重複保持も一度もなかったはず
fn check_forks(table: &Table) -> Result<(), SimError> {
    if let Some(fork) = table.first_held() {
        error!(fork = %fork, "fork left on the table");
        return Err(SimError::ForkStillHeld(fork));
    }
    for fork in table.forks() {
        let overlaps = fork.overlaps();
        if overlaps > 0 {
            return Err(SimError::ExclusionViolated {
                fork: fork.id(),
                overlaps,
            });
        }
    }
    Ok(())
}
