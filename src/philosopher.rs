use std::cmp;
use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use rand::{rngs::StdRng, Rng};
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::Pacing;
use crate::fork::ForkId;
use crate::report::{Event, EventKind, PhilosopherReport};
use crate::stop::StopSignal;
use crate::table::{Seat, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhilosopherId(pub usize);

impl PhilosopherId {
    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }
}

impl fmt::Display for PhilosopherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "philosopher {}", self.0)
    }
}

// Thinking -> Acquiring -> Eating -> Releasing -> Thinking ... -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Thinking,
    Acquiring,
    Eating,
    Releasing,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Thinking => "thinking",
            Phase::Acquiring => "hungry",
            Phase::Eating => "eating",
            Phase::Releasing => "putting down forks",
            Phase::Stopped => "done dining",
        };
        f.write_str(s)
    }
}

/// フォークを取る順番
///
/// 偶数番は左から、奇数番は右から取る。
/// 奇数番 i の左フォーク (= 偶数番 i - 1 の右フォーク) はどちらにとっても 2 本目になるので、
/// 輪の中に「1 本持って次を待つ」の連鎖が一周することはない。
pub fn acquisition_order(seat: &Seat) -> [ForkId; 2] {
    if seat.philosopher.is_even() {
        [seat.left, seat.right]
    } else {
        [seat.right, seat.left]
    }
}

/// 全員が目標回数食べ終えたらコントローラを起こす
pub struct MealQuota {
    target: u64,
    remaining: AtomicUsize,
    done: Notify,
}

impl MealQuota {
    pub fn new(target: u64, philosophers: usize) -> Self {
        MealQuota {
            target,
            remaining: AtomicUsize::new(philosophers),
            done: Notify::new(),
        }
    }

    fn record(&self, meals: u64) {
        if meals == self.target && self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            // 待っている側がまだいなくても permit が残る
            self.done.notify_one();
        }
    }

    pub async fn wait(&self) {
        self.done.notified().await;
    }
}

pub struct Philosopher {
    seat: Seat,
    table: Arc<Table>,
    stop: StopSignal,
    thinking: Pacing,
    eating: Pacing,
    rng: StdRng,
    phase: Phase,
    events: Option<mpsc::UnboundedSender<Event>>,
    quota: Option<Arc<MealQuota>>,
    meals: u64,
    longest_wait: Duration,
}

impl Philosopher {
    pub fn new(
        seat: Seat,
        table: Arc<Table>,
        stop: StopSignal,
        think: Pacing,
        eat: Pacing,
        rng: StdRng,
    ) -> Self {
        Philosopher {
            seat,
            table,
            stop,
            thinking: think,
            eating: eat,
            rng,
            phase: Phase::Thinking,
            events: None,
            quota: None,
            meals: 0,
            longest_wait: Duration::ZERO,
        }
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_quota(mut self, quota: Arc<MealQuota>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn id(&self) -> PhilosopherId {
        self.seat.philosopher
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 停止シグナルを見るまで考えて食べるを繰り返す
    pub async fn dine(mut self) -> PhilosopherReport {
        loop {
            self.enter(Phase::Thinking);
            let d = pause(&mut self.rng, self.thinking);
            tokio::time::sleep(d).await;

            // 停止を見るのはここだけ。フォークは 1 本も持っていない
            if self.stop.is_raised() {
                break;
            }

            self.eat().await;
        }

        self.enter(Phase::Stopped);
        PhilosopherReport {
            id: self.id(),
            meals: self.meals,
            longest_wait: self.longest_wait,
        }
    }

    async fn eat(&mut self) {
        let table = self.table.clone();
        let [first, second] = acquisition_order(&self.seat);

        self.enter(Phase::Acquiring);
        let hungry_at = Instant::now();

        let first = table.fork(first).acquire().await;
        self.picked_up(first.id());
        let second = table.fork(second).acquire().await;
        self.picked_up(second.id());

        self.longest_wait = cmp::max(self.longest_wait, hungry_at.elapsed());

        self.enter(Phase::Eating);
        let d = pause(&mut self.rng, self.eating);
        tokio::time::sleep(d).await;
        self.meals += 1;

        self.enter(Phase::Releasing);
        for guard in [first, second] {
            let id = guard.id();
            guard.release();
            debug!(philosopher = %self.id(), fork = %id, "put down");
            self.emit(EventKind::PutDown(id));
        }

        if let Some(quota) = &self.quota {
            quota.record(self.meals);
        }
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        info!(philosopher = %self.id(), meals = self.meals, "{} is {}", self.id(), phase);
        self.emit(EventKind::Entered(phase));
    }

    fn picked_up(&self, fork: ForkId) {
        debug!(philosopher = %self.id(), fork = %fork, "picked up");
        self.emit(EventKind::PickedUp(fork));
    }

    fn emit(&self, kind: EventKind) {
        if let Some(tx) = &self.events {
            // 受信側が先に drop されていても食事は続ける
            let _ = tx.send(Event {
                philosopher: self.id(),
                kind,
            });
        }
    }
}

fn pause(rng: &mut StdRng, pacing: Pacing) -> Duration {
    Duration::from_millis(rng.gen_range(pacing.min_ms..=pacing.max_ms))
}
