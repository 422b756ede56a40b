//! PersistenceBlueprint - Config Loader 输出
//!
//! 描述完整的持久化配置：工作池参数、远端存储 (sink) 路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的持久化配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PersistenceBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 工作池配置
    #[serde(default)]
    #[validate(nested)]
    pub pool: PoolConfig,

    /// 远端存储配置
    #[validate(nested)]
    pub sink: SinkConfig,
}

/// 工作池配置
///
/// Core workers stay alive for the dispatcher lifetime; workers above the
/// core size are retired after `keep_alive_ms` of idleness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PoolConfig {
    /// 常驻 worker 数量
    #[serde(default = "default_core_workers")]
    #[validate(range(min = 1))]
    pub core_workers: usize,

    /// worker 上限
    #[serde(default = "default_max_workers")]
    #[validate(range(min = 1))]
    pub max_workers: usize,

    /// 空闲 worker 回收时间 (毫秒)
    #[serde(default = "default_keep_alive_ms")]
    #[validate(range(min = 1))]
    pub keep_alive_ms: u64,
}

impl PoolConfig {
    /// Idle timeout for workers above the core size
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_workers: default_core_workers(),
            max_workers: default_max_workers(),
            keep_alive_ms: default_keep_alive_ms(),
        }
    }
}

fn default_core_workers() -> usize {
    5
}

fn default_max_workers() -> usize {
    9
}

fn default_keep_alive_ms() -> u64 {
    3_000
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink 名称
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// HTTP 远端存储
    Http,
}
