use std::fmt;
use std::time::Duration;

use crate::fork::ForkId;
use crate::philosopher::{Phase, PhilosopherId};

/// 観測用に送られる状態遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub philosopher: PhilosopherId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Entered(Phase),
    PickedUp(ForkId),
    PutDown(ForkId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhilosopherReport {
    pub id: PhilosopherId,
    pub meals: u64,
    /// 空腹になってから 2 本目のフォークを取るまでの最長時間
    pub longest_wait: Duration,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub philosophers: Vec<PhilosopherReport>,
    /// フォークごとの取得回数 (ForkId 順)
    pub fork_acquisitions: Vec<u64>,
    pub elapsed: Duration,
    /// Ctrl-C などで途中で止めたか
    pub interrupted: bool,
}

impl Report {
    pub fn total_meals(&self) -> u64 {
        self.philosophers.iter().map(|p| p.meals).sum()
    }

    /// 一番食べられなかった哲学者
    pub fn hungriest(&self) -> Option<&PhilosopherReport> {
        self.philosophers.iter().min_by_key(|p| p.meals)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.philosophers {
            writeln!(
                f,
                "{}: {} meals, longest wait {:?}",
                p.id, p.meals, p.longest_wait
            )?;
        }
        for (i, n) in self.fork_acquisitions.iter().enumerate() {
            writeln!(f, "{}: picked up {} times", ForkId(i), n)?;
        }
        write!(
            f,
            "all {} philosophers finished dining: {} meals in {:?}{}",
            self.philosophers.len(),
            self.total_meals(),
            self.elapsed,
            if self.interrupted { " (interrupted)" } else { "" }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn report() -> Report {
        Report {
            philosophers: vec![
                PhilosopherReport {
                    id: PhilosopherId(0),
                    meals: 4,
                    longest_wait: Duration::from_millis(30),
                },
                PhilosopherReport {
                    id: PhilosopherId(1),
                    meals: 2,
                    longest_wait: Duration::from_millis(120),
                },
            ],
            fork_acquisitions: vec![6, 6],
            elapsed: Duration::from_secs(5),
            interrupted: false,
        }
    }

    #[test]
    fn test_totals() {
        let r = report();
        assert_eq!(r.total_meals(), 6);
        assert_eq!(r.hungriest().unwrap().id, PhilosopherId(1));
    }

    #[test]
    fn test_summary_line() {
        let s = report().to_string();
        assert!(s.contains("philosopher 1: 2 meals"));
        assert!(s.contains("fork 0: picked up 6 times"));
        assert!(s.ends_with("all 2 philosophers finished dining: 6 meals in 5s"));
    }
}
