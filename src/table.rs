use crate::error::SimError;
use crate::fork::{Fork, ForkId};
use crate::philosopher::PhilosopherId;

/// 哲学者 1 人分の席。どのフォークを使うかだけを持つ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub philosopher: PhilosopherId,
    pub left: ForkId,
    pub right: ForkId,
}

/// 円卓
///
/// 席 i の左はフォーク i、右はフォーク (i + 1) % n。
/// したがってフォーク i は哲学者 i と哲学者 (i - 1) % n に共有される。
pub struct Table {
    forks: Vec<Fork>,
    seats: Vec<Seat>,
}

impl Table {
    pub fn new(n: usize) -> Result<Self, SimError> {
        // 1 人だと 2 本目のフォークが存在しない
        if n < 2 {
            return Err(SimError::TooFewPhilosophers { count: n });
        }

        let forks = (0..n).map(|i| Fork::new(ForkId(i))).collect();
        let seats = (0..n)
            .map(|i| Seat {
                philosopher: PhilosopherId(i),
                left: ForkId(i),
                right: ForkId((i + 1) % n),
            })
            .collect();

        Ok(Table { forks, seats })
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn forks(&self) -> &[Fork] {
        &self.forks
    }

    /// 席から引いた番号専用。範囲外なら panic する
    pub(crate) fn fork(&self, id: ForkId) -> &Fork {
        &self.forks[id.0]
    }

    pub fn get_fork(&self, id: ForkId) -> Option<&Fork> {
        self.forks.get(id.0)
    }

    /// フォークを使う 2 人 (右側として使う人, 左側として使う人)
    pub(crate) fn users_of(&self, fork: ForkId) -> [PhilosopherId; 2] {
        let n = self.len();
        [PhilosopherId((fork.0 + n - 1) % n), PhilosopherId(fork.0)]
    }

    /// まだ保持されているフォークがあればその番号
    pub fn first_held(&self) -> Option<ForkId> {
        self.forks.iter().find(|f| !f.is_free()).map(Fork::id)
    }

    pub fn all_free(&self) -> bool {
        self.first_held().is_none()
    }
}
