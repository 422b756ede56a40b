//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> Dispatcher 组装测试
//! - 基于可编程 stub sink 的端到端测试 (成功 / 失败 / 隔离 / 并发上限 / 关闭)

#[cfg(test)]
mod support {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::NaiveDate;
    use contracts::{
        Attachment, ContractError, NormalizedPage, PageRecord, RemoteSink, ResourceId,
        SinkResponse,
    };
    use tracing_subscriber::fmt::MakeWriter;

    /// A call observed by [`StubSink`]
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Write(NormalizedPage),
        Attach(ResourceId, Vec<Attachment>),
    }

    #[derive(Default)]
    struct StubState {
        calls: Mutex<Vec<Call>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    /// Programmable remote store
    ///
    /// Answers writes with `write_response` unless a per-url override
    /// exists, records every call, and tracks concurrent writes. Clones
    /// share the recorded state.
    #[derive(Clone)]
    pub struct StubSink {
        write_response: SinkResponse<ResourceId>,
        overrides: HashMap<String, SinkResponse<ResourceId>>,
        delay: Duration,
        state: Arc<StubState>,
    }

    impl StubSink {
        pub fn answering(write_response: SinkResponse<ResourceId>) -> Self {
            Self {
                write_response,
                overrides: HashMap::new(),
                delay: Duration::ZERO,
                state: Arc::default(),
            }
        }

        pub fn with_override(mut self, url: &str, response: SinkResponse<ResourceId>) -> Self {
            self.overrides.insert(url.to_string(), response);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.state.calls.lock().unwrap().clone()
        }

        pub fn writes(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Write(_)))
                .count()
        }

        pub fn attaches(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Attach(..)))
                .count()
        }

        pub fn peak(&self) -> usize {
            self.state.peak.load(Ordering::SeqCst)
        }
    }

    impl RemoteSink for StubSink {
        fn name(&self) -> &str {
            "stub"
        }

        async fn write(
            &self,
            page: &NormalizedPage,
        ) -> Result<SinkResponse<ResourceId>, ContractError> {
            let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.peak.fetch_max(now, Ordering::SeqCst);
            self.state.calls.lock().unwrap().push(Call::Write(page.clone()));

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self
                .overrides
                .get(&page.url)
                .unwrap_or(&self.write_response)
                .clone())
        }

        async fn attach(
            &self,
            resource_id: &ResourceId,
            attachments: &[Attachment],
        ) -> Result<SinkResponse<String>, ContractError> {
            self.state
                .calls
                .lock()
                .unwrap()
                .push(Call::Attach(resource_id.clone(), attachments.to_vec()));
            Ok(SinkResponse::ok("attached".to_string()))
        }
    }

    pub fn page(url: &str) -> PageRecord {
        let created_at = NaiveDate::from_ymd_opt(2017, 3, 9)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        PageRecord::new("news", url, "Title", created_at)
    }

    /// In-memory log sink for `tracing_subscriber::fmt`
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn lines(&self) -> Vec<String> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .map(str::to_string)
                .collect()
        }

        /// ERROR lines mentioning `needle`
        pub fn errors_mentioning(&self, needle: &str) -> usize {
            self.lines()
                .iter()
                .filter(|line| line.contains("ERROR") && line.contains(needle))
                .count()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Capture logs on the current thread until the guard drops
    ///
    /// Only reliable on a current-thread runtime, where workers run on the
    /// test thread.
    pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::create_dispatcher;

    use crate::support::page;

    #[tokio::test]
    async fn test_config_to_dispatcher() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[pool]
core_workers = 1
max_workers = 2
keep_alive_ms = 50

[sink]
name = "dry"
sink_type = "log"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let dispatcher = create_dispatcher(&blueprint).await.unwrap();
        assert_eq!(dispatcher.sink_name(), "dry");

        for i in 0..20 {
            dispatcher.submit(page(&format!("http://a/{i}"))).unwrap();
        }
        dispatcher.exit().await;

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.submitted, 20);
        assert_eq!(metrics.written, 20);
        assert!(metrics.peak_active <= 2);
    }

    #[tokio::test]
    async fn test_json_config_with_http_sink() {
        let blueprint = ConfigLoader::load_from_str(
            r#"{
                "sink": {
                    "name": "remote",
                    "sink_type": "http",
                    "params": { "base_url": "http://127.0.0.1:1", "timeout_ms": "200" }
                }
            }"#,
            ConfigFormat::Json,
        )
        .unwrap();

        let dispatcher = create_dispatcher(&blueprint).await.unwrap();
        // nothing listens on port 1: the page fails and is dropped
        dispatcher.submit(page("http://a")).unwrap();
        dispatcher.exit().await;

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.written, 0);
        assert_eq!(metrics.failed, 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{Attachment, PoolConfig, SinkResponse, EMPTY_CONTENT_PLACEHOLDER};
    use dispatcher::Dispatcher;

    use crate::support::{capture_logs, page, Call, StubSink};

    fn dispatcher_for(sink: &StubSink) -> Dispatcher {
        Dispatcher::spawn(sink.clone(), PoolConfig::default()).unwrap()
    }

    /// 成功路径：写入 -> 附件上传，无错误日志
    #[tokio::test]
    async fn test_e2e_success() {
        let (logs, _guard) = capture_logs();
        let sink = StubSink::answering(SinkResponse::ok("id1".to_string()));
        let dispatcher = dispatcher_for(&sink);

        let attachments = vec![Attachment::new("a.pdf", "http://a/a.pdf")];
        dispatcher
            .submit(page("http://a").with_attachments(attachments.clone()))
            .unwrap();
        dispatcher.exit().await;

        let calls = sink.calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            Call::Write(written) => {
                assert_eq!(written.url, "http://a");
                assert_eq!(written.thumbnail, "");
                assert_eq!(written.content, EMPTY_CONTENT_PLACEHOLDER);
                assert_eq!(written.created_at, "2017-03-09 08:00:00");
            }
            other => panic!("expected write first, got {:?}", other),
        }
        assert_eq!(calls[1], Call::Attach("id1".to_string(), attachments));

        assert_eq!(logs.errors_mentioning("http://a"), 0);
        assert_eq!(dispatcher.count(), 1);
        assert_eq!(dispatcher.metrics().written, 1);
    }

    /// 失败路径：写入返回 500，不上传附件，仅一条错误日志
    #[tokio::test]
    async fn test_e2e_write_failure() {
        let (logs, _guard) = capture_logs();
        let sink = StubSink::answering(SinkResponse::failed(500, "db down"));
        let dispatcher = dispatcher_for(&sink);

        dispatcher.submit(page("http://a")).unwrap();
        dispatcher.exit().await;

        assert_eq!(sink.writes(), 1);
        assert_eq!(sink.attaches(), 0);
        assert_eq!(logs.errors_mentioning("http://a"), 1);
        assert!(logs
            .lines()
            .iter()
            .any(|line| line.contains("ERROR") && line.contains("db down")));
        assert_eq!(dispatcher.metrics().failed, 1);
    }

    /// 单个页面持续失败不影响其他页面，也不阻塞关闭
    #[tokio::test]
    async fn test_e2e_failure_isolation() {
        let (logs, _guard) = capture_logs();
        let sink = StubSink::answering(SinkResponse::ok("id".to_string()))
            .with_override("http://bad", SinkResponse::failed(500, "boom"));
        let dispatcher = dispatcher_for(&sink);

        dispatcher.submit(page("http://bad")).unwrap();
        for i in 0..10 {
            dispatcher.submit(page(&format!("http://ok/{i}"))).unwrap();
        }
        dispatcher.exit().await;

        assert!(dispatcher.is_terminated());
        assert_eq!(sink.writes(), 11);
        assert_eq!(sink.attaches(), 10);
        assert_eq!(logs.errors_mentioning("http://bad"), 1);
        assert_eq!(logs.errors_mentioning("http://ok"), 0);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.written, 10);
        assert_eq!(metrics.failed, 1);
    }

    /// 并发写入不超过 max_workers
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_concurrency_ceiling() {
        let sink = StubSink::answering(SinkResponse::ok("id".to_string()))
            .with_delay(Duration::from_millis(30));
        let dispatcher = dispatcher_for(&sink);

        for i in 0..60 {
            dispatcher.submit(page(&format!("http://a/{i}"))).unwrap();
        }
        assert_eq!(dispatcher.count(), 60);
        dispatcher.exit().await;

        assert_eq!(sink.writes(), 60);
        assert!(sink.peak() <= 9, "peak {} above max workers", sink.peak());
        assert!(sink.peak() > 5, "pool never grew past core: {}", sink.peak());
        assert_eq!(dispatcher.live_workers(), 0);
    }

    /// exit_async 立即返回，已排队页面仍会完成
    #[tokio::test]
    async fn test_e2e_exit_async_drains() {
        let sink = StubSink::answering(SinkResponse::ok("id".to_string()))
            .with_delay(Duration::from_millis(20));
        let dispatcher = dispatcher_for(&sink);

        for i in 0..20 {
            dispatcher.submit(page(&format!("http://a/{i}"))).unwrap();
        }
        dispatcher.exit_async();
        assert!(dispatcher.is_shutting_down());
        assert!(dispatcher.submit(page("http://late")).is_err());

        dispatcher.exit().await;
        assert_eq!(sink.writes(), 20);
        assert_eq!(dispatcher.metrics().written, 20);
        assert_eq!(dispatcher.count(), 21);
        assert!(sink
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::Write(p) if p.url == "http://late")));
    }
}
