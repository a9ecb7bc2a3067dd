//! シミュレーションの設定
//!
//! TOML から読み込み、CLI の引数で上書きする。

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::SimError;

/// 考える / 食べる時間の範囲 (ミリ秒, 両端を含む)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pacing {
    #[serde(default)]
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Pacing {
    pub fn up_to(max_ms: u64) -> Self {
        Pacing { min_ms: 0, max_ms }
    }

    fn validate(&self, phase: &'static str) -> Result<(), SimError> {
        if self.min_ms > self.max_ms {
            return Err(SimError::InvalidPacing {
                phase,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

/// いつ停止シグナルを出すか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunLimit {
    /// 指定時間だけ食事させる
    Duration { ms: u64 },
    /// 全員が per_philosopher 回食べ終えたら止める
    Meals { per_philosopher: u64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub philosophers: usize,
    pub run: RunLimit,
    pub think: Pacing,
    pub eat: Pacing,
    /// 停止シグナル後、1 サイクル (考える + 食べる) に加えて待つ時間
    pub shutdown_grace_ms: u64,
    /// 指定すると哲学者 i の乱数列は seed + i から決まる
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            run: RunLimit::Duration { ms: 5_000 },
            think: Pacing::up_to(1_000),
            eat: Pacing::up_to(1_000),
            shutdown_grace_ms: 10_000,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// 停止シグナルから全員が止まるまで待つ上限
    ///
    /// 考え中・食事中の哲学者はそのサイクルを終えてから止まるので、
    /// 最長の思考と食事の時間を猶予に足す。
    pub fn shutdown_grace(&self) -> Duration {
        let cycle_ms = self.think.max_ms.saturating_add(self.eat.max_ms);
        Duration::from_millis(cycle_ms.saturating_add(self.shutdown_grace_ms))
    }

    /// 哲学者を起動する前に呼ぶ
    pub fn validate(&self) -> Result<(), SimError> {
        if self.philosophers < 2 {
            return Err(SimError::TooFewPhilosophers {
                count: self.philosophers,
            });
        }
        self.think.validate("think")?;
        self.eat.validate("eat")?;
        if let RunLimit::Meals { per_philosopher: 0 } = self.run {
            return Err(SimError::ZeroMealQuota);
        }
        if self.shutdown_grace_ms == 0 {
            return Err(SimError::ZeroGrace);
        }
        Ok(())
    }
}
