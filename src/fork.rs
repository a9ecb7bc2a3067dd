use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard};

/// 円卓上のフォーク番号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForkId(pub usize);

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fork {}", self.0)
    }
}

/// 隣り合う 2 人の哲学者が共有するフォーク
///
/// 食事中 (= await 中) もロックを保持し続けるので、std ではなく tokio の Mutex を使う。
pub struct Fork {
    id: ForkId,
    lock: Mutex<()>,
    holders: AtomicUsize,      // 計測用: 同時に保持している哲学者の数
    overlaps: AtomicUsize,     // holders が 1 を超えた回数
    acquisitions: AtomicU64,
}

/// フォークを保持している間だけ生きる型
///
/// drop されるとフォークが解放されるので、タスクが abort されても置きっぱなしにはならない。
pub struct ForkGuard<'a> {
    fork: &'a Fork,
    _lock: MutexGuard<'a, ()>,
}

impl Fork {
    pub fn new(id: ForkId) -> Self {
        Fork {
            id,
            lock: Mutex::new(()),
            holders: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
            acquisitions: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ForkId {
        self.id
    }

    /// フォークが空くまで待って取る。失敗はせず、待たされるだけ
    pub async fn acquire(&self) -> ForkGuard<'_> {
        let lock = self.lock.lock().await;

        let prev = self.holders.fetch_add(1, Ordering::AcqRel);
        if prev != 0 {
            self.overlaps.fetch_add(1, Ordering::Relaxed);
            tracing::error!(fork = %self.id, holders = prev + 1, "fork held by two philosophers");
        }
        self.acquisitions.fetch_add(1, Ordering::Relaxed);

        ForkGuard {
            fork: self,
            _lock: lock,
        }
    }

    /// 誰も保持していなければ true
    pub fn is_free(&self) -> bool {
        self.holders.load(Ordering::Acquire) == 0 && self.lock.try_lock().is_ok()
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::Relaxed)
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

impl<'a> ForkGuard<'a> {
    pub fn id(&self) -> ForkId {
        self.fork.id
    }

    /// フォークを置く。drop と同じだが、呼び出し側で解放の位置を明示したいとき用
    pub fn release(self) {}
}

// holders を先に戻してから、フィールドの MutexGuard が drop されてロックが外れる
impl<'a> Drop for ForkGuard<'a> {
    fn drop(&mut self) {
        self.fork.holders.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    const NUM_TASKS: usize = 4;
    const NUM_LOOP: usize = 200;

    #[tokio::test]
    async fn test_guard_release_frees_fork() {
        let fork = Fork::new(ForkId(3));
        assert!(fork.is_free());

        let guard = fork.acquire().await;
        assert_eq!(guard.id(), ForkId(3));
        assert!(!fork.is_free());

        guard.release();
        assert!(fork.is_free());
        assert_eq!(fork.acquisitions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquirer_waits() {
        let fork = Arc::new(Fork::new(ForkId(0)));
        let guard = fork.acquire().await;

        let fork0 = fork.clone();
        let waiter = tokio::spawn(async move {
            let _g = fork0.acquire().await;
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(fork.is_free());
        assert_eq!(fork.acquisitions(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_two_holders() {
        let fork = Arc::new(Fork::new(ForkId(1)));
        let mut v = Vec::new();

        for _ in 0..NUM_TASKS {
            let fork0 = fork.clone();
            let t = tokio::spawn(async move {
                for _ in 0..NUM_LOOP {
                    let _g = fork0.acquire().await;
                    tokio::task::yield_now().await;
                }
            });
            v.push(t);
        }

        for t in v {
            t.await.unwrap();
        }

        assert_eq!(fork.overlaps(), 0);
        assert_eq!(fork.acquisitions(), (NUM_TASKS * NUM_LOOP) as u64);
        assert!(fork.is_free());
    }

    #[tokio::test]
    async fn test_abort_releases_fork() {
        let fork = Arc::new(Fork::new(ForkId(2)));

        let fork0 = fork.clone();
        let t = tokio::spawn(async move {
            let _g = fork0.acquire().await;
            std::future::pending::<()>().await;
        });

        while fork.is_free() {
            tokio::task::yield_now().await;
        }

        t.abort();
        assert!(t.await.unwrap_err().is_cancelled());
        assert!(fork.is_free());
    }
}
