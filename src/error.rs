use std::time::Duration;

use thiserror::Error;

use crate::fork::ForkId;
use crate::philosopher::PhilosopherId;

/// シミュレーションで起こりうるエラー
///
/// 設定エラーはどの哲学者も起動する前に返る。
/// それ以外は実行後に検出した不変条件違反で、回復不能として扱う。
#[derive(Error, Debug)]
pub enum SimError {
    /// 円卓には最低 2 本のフォークが必要
    #[error("a ring needs at least 2 philosophers, got {count}")]
    TooFewPhilosophers { count: usize },

    #[error("invalid {phase} pacing: min {min_ms} ms is greater than max {max_ms} ms")]
    InvalidPacing {
        phase: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("meal quota must be at least 1")]
    ZeroMealQuota,

    #[error("shutdown grace must be greater than zero")]
    ZeroGrace,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    /// 停止シグナル後、猶予時間内に止まらなかった哲学者がいる (デッドロックか飢餓)
    #[error("philosophers {stuck:?} did not stop within {grace:?} after the stop signal")]
    ShutdownTimedOut {
        grace: Duration,
        stuck: Vec<PhilosopherId>,
    },

    #[error("{0} is still held after every philosopher stopped")]
    ForkStillHeld(ForkId),

    #[error("{fork} was held by two philosophers at once ({overlaps} times)")]
    ExclusionViolated { fork: ForkId, overlaps: usize },

    #[error("philosopher task panicked: {0}")]
    PhilosopherPanicked(#[from] tokio::task::JoinError),
}
