//! 页面持久化指标模块
//!
//! 通过 `metrics` facade 记录指标；未安装 recorder 时全部为空操作。

use metrics::{counter, gauge, histogram};

/// 记录一次 submit 调用
pub fn record_page_submitted() {
    counter!("page_persist_submitted_total").increment(1);
}

/// 记录关闭后被拒绝的页面
pub fn record_page_rejected() {
    counter!("page_persist_rejected_total").increment(1);
}

/// 记录页面持久化结果
pub fn record_page_persisted(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "page_persist_pages_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录单个页面写入+附件上传的耗时
pub fn record_persist_latency_ms(latency_ms: f64) {
    histogram!("page_persist_latency_ms").record(latency_ms);
}

/// 记录存活 worker 数量
pub fn record_live_workers(live: usize) {
    gauge!("page_persist_live_workers").set(live as f64);
}

/// 记录待处理队列深度
pub fn record_backlog_depth(depth: usize) {
    gauge!("page_persist_backlog_depth").set(depth as f64);
}

/// 在线统计计算器 (Welford's algorithm)
///
/// 供生产者侧汇总提交耗时等数据使用。
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl std::fmt::Display for RunningStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min,
                self.max,
                self.mean(),
                self.std_dev(),
                self.count
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_display() {
        let mut stats = RunningStats::default();
        assert_eq!(stats.to_string(), "N/A");

        stats.push(2.0);
        assert!(stats.to_string().contains("n=1"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_page_submitted();
        record_page_rejected();
        record_page_persisted("log", true);
        record_persist_latency_ms(1.5);
        record_live_workers(3);
        record_backlog_depth(0);
    }
}
