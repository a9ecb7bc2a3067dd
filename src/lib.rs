//! 食事する哲学者の問題
//!
//! 円卓に並んだ N 人の哲学者が、隣と共有するフォーク 2 本を取って食べる。
//! 偶数番は左から、奇数番は右からフォークを取ることで、調停役なしに循環待ちを防ぐ。

pub mod config;
pub mod error;
pub mod fork;
pub mod philosopher;
pub mod report;
pub mod simulation;
pub mod stop;
pub mod table;

pub use config::{Pacing, RunLimit, SimConfig};
pub use error::SimError;
pub use report::{Event, EventKind, Report};
pub use simulation::Simulation;
