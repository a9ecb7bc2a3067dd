use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// 一度だけ立てられる停止フラグ
///
/// コントローラが raise し、各哲学者は考え終わるたびに is_raised を見る。
/// clone しても同じフラグを共有する。
#[derive(Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        StopSignal::default()
    }

    /// フラグを立てる。最初の呼び出しだけが true を返す
    pub fn raise(&self) -> bool {
        self.raised
            .compare_exchange(false, true, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
