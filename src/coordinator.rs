// Owns the view state of one client and routes every user action to the
// fetch it needs.
//
// Handlers lock the state only to issue a ticket or to apply a result; the
// lock is never held across a backend call, so fetches for different regions
// (and successive fetches for the same region) overlap freely. Whatever
// resolves last, a region only ever shows the response to its most recently
// issued request under the live session.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::CaptureBackend;
use crate::config::ClientConfig;
use crate::detail::DetailView;
use crate::error::ClientError;
use crate::export::write_csv;
use crate::flows::FlowsPane;
use crate::model::{StatsPayload, UploadResult};
use crate::notify::{Notifications, Toast};
use crate::packets::{PacketRow, PacketTable};
use crate::query::build_packet_query;
use crate::session::{Session, SessionContext};
use crate::stats::{build_facets, ChartSeries, ChartSurfaces, Facet};
use crate::store::{LatestWins, Ticket};
use crate::unanswered::UnansweredPane;
use crate::view_state::{ActiveView, ViewState};

struct Inner {
    view: ViewState,
    session: SessionContext,
    upload: LatestWins<()>,
    page: LatestWins<PacketTable>,
    detail: LatestWins<DetailView>,
    flows: LatestWins<FlowsPane>,
    unanswered: LatestWins<UnansweredPane>,
    stats: LatestWins<StatsPayload>,
    facets: Vec<Facet>,
    charts: ChartSurfaces,
    notifications: Notifications,
}

impl Inner {
    /// Forget everything derived from the current session.
    fn reset_derived(&mut self) {
        self.page.clear();
        self.detail.clear();
        self.flows.clear();
        self.unanswered.clear();
        self.stats.clear();
        self.facets.clear();
        self.charts.release_all();
        self.view.reset();
    }
}

/// Store `value` if `ticket` is the latest for its region and was issued
/// under the live session.
fn apply<T>(
    slot: &mut LatestWins<T>,
    live: Option<Uuid>,
    ticket: Ticket,
    value: T,
    region: &str,
) -> bool {
    if ticket.session() != live {
        debug!("Dropped {} response from a previous session", region);
        return false;
    }
    let applied = slot.accept(ticket, value);
    if !applied {
        debug!("Dropped stale {} response (seq {})", region, ticket.seq());
    }
    applied
}

/// Settle a failed fetch. Returns whether the failure is worth reporting.
fn fail<T>(slot: &mut LatestWins<T>, live: Option<Uuid>, ticket: Ticket, region: &str) -> bool {
    if ticket.session() != live || !slot.settle_failed(ticket) {
        debug!("Ignored failure of superseded {} request", region);
        return false;
    }
    true
}

/// Everything the viewer needs to draw one frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub view: ViewState,
    pub session: Option<Session>,
    pub uploading: bool,
    pub table: Option<PacketTable>,
    pub page_loading: bool,
    pub detail: Option<DetailView>,
    pub detail_loading: bool,
    pub flows: FlowsPane,
    pub unanswered: UnansweredPane,
    pub stats_loading: bool,
    pub facets: Vec<Facet>,
    pub charts: Vec<ChartSeries>,
    pub toast: Option<Toast>,
}

pub struct ViewCoordinator<B> {
    backend: B,
    page_size: u64,
    inner: Mutex<Inner>,
}

impl<B: CaptureBackend> ViewCoordinator<B> {
    pub fn new(backend: B, config: &ClientConfig) -> Self {
        Self {
            backend,
            page_size: config.page_size,
            inner: Mutex::new(Inner {
                view: ViewState::new(),
                session: SessionContext::new(),
                upload: LatestWins::new(),
                page: LatestWins::new(),
                detail: LatestWins::new(),
                flows: LatestWins::new(),
                unanswered: LatestWins::new(),
                stats: LatestWins::new(),
                facets: Vec::new(),
                charts: ChartSurfaces::new(),
                notifications: Notifications::new(config.toast_ttl),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notify(&self, toast: Toast) {
        self.lock().notifications.push(toast);
    }

    fn report(&self, inner: &mut Inner, region: &str, err: &ClientError) {
        warn!("Failed to load {}: {}", region, err);
        inner.notifications.push(err.to_toast());
    }

    /// Upload a capture and, once the backend accepts it, make it the live
    /// session and load its first page and stats. A rejected upload leaves
    /// the current session and everything on screen as it was.
    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<(), ClientError> {
        let ticket = self.lock().upload.issue(None);
        info!("Uploading {} ({} bytes)", filename, data.len());

        let result = self.backend.upload(filename, data).await;

        {
            let mut inner = self.lock();
            match result {
                Ok(upload) => {
                    if !inner.upload.accept(ticket, ()) {
                        debug!("Dropped result of superseded upload {}", filename);
                        return Ok(());
                    }
                    Self::begin(&mut inner, upload, filename);
                }
                Err(err) => {
                    inner.upload.settle_failed(ticket);
                    self.report(&mut inner, "upload", &err);
                    return Err(err);
                }
            }
        }

        tokio::join!(self.load_page(0), self.load_stats());
        Ok(())
    }

    /// Make `upload` the live session without fetching anything.
    pub fn start_session(&self, upload: UploadResult, filename: &str) {
        let mut inner = self.lock();
        Self::begin(&mut inner, upload, filename);
    }

    fn begin(inner: &mut Inner, upload: UploadResult, filename: &str) {
        inner.reset_derived();
        let caption = inner.session.start(upload, filename).caption();
        inner.notifications.push(Toast::info(format!("Loaded {}", caption)));
    }

    /// Back to the "no file loaded" state.
    pub fn end_session(&self) {
        let mut inner = self.lock();
        inner.reset_derived();
        inner.session.end();
    }

    pub async fn load_page(&self, page: u64) {
        let (ticket, query) = {
            let mut inner = self.lock();
            // The page only becomes current once its rows arrive
            let mut target = inner.view.clone();
            target.set_page(page);
            let query = build_packet_query(&target, inner.session.key(), self.page_size);
            let live = inner.session.instance();
            let ticket = inner.page.issue(live);
            (ticket, query)
        };
        debug!("Loading packets: {}", query.to_query_string());

        let result = self.backend.packets(&query).await;

        let mut inner = self.lock();
        let live = inner.session.instance();
        match result {
            Ok(rows) => {
                let table = PacketTable::build(&rows, page, self.page_size);
                if apply(&mut inner.page, live, ticket, table, "packets") {
                    inner.view.set_page(page);
                }
            }
            Err(err) => {
                if fail(&mut inner.page, live, ticket, "packets") {
                    self.report(&mut inner, "packets", &err);
                }
            }
        }
    }

    /// Filter by protocol (`""` for all packets) and reload from page 0.
    pub async fn set_filter(&self, proto: &str) {
        {
            let mut inner = self.lock();
            inner.view.set_proto(proto);
            inner.detail.clear();
        }
        self.load_page(0).await;
    }

    /// Apply a settled search string and reload from page 0.
    pub async fn apply_search(&self, text: &str) {
        {
            let mut inner = self.lock();
            inner.view.set_search(text);
            inner.detail.clear();
        }
        self.load_page(0).await;
    }

    /// Open the detail panel for a frame. On failure the panel keeps
    /// whatever it showed before.
    pub async fn select_frame(&self, frame_num: u64) {
        let (ticket, key) = {
            let mut inner = self.lock();
            inner.view.select(frame_num);
            let live = inner.session.instance();
            let ticket = inner.detail.issue(live);
            (ticket, inner.session.key().to_string())
        };

        let result = self.backend.packet(frame_num, &key).await;

        let mut inner = self.lock();
        let live = inner.session.instance();
        match result {
            Ok(pkt) => {
                apply(&mut inner.detail, live, ticket, DetailView::build(&pkt), "detail");
            }
            Err(err) => {
                if fail(&mut inner.detail, live, ticket, "detail") {
                    self.report(&mut inner, "packet detail", &err);
                }
            }
        }
    }

    pub fn close_detail(&self) {
        let mut inner = self.lock();
        inner.view.clear_selection();
        inner.detail.clear();
    }

    /// Show a frame from another view in the packets view. The frame does
    /// not need to be on the loaded page.
    pub async fn jump_to_frame(&self, frame_num: u64) {
        self.lock().view.set_view(ActiveView::Packets);
        self.select_frame(frame_num).await;
    }

    /// Activate a view. Flows and unanswered requests are fetched again on
    /// every activation; the stats view remounts its charts.
    pub async fn switch_view(&self, view: ActiveView) {
        {
            let mut inner = self.lock();
            inner.view.set_view(view);
            if view == ActiveView::Stats {
                let Inner { stats, charts, .. } = &mut *inner;
                if let Some(stats) = stats.current() {
                    charts.mount_all(stats);
                }
            }
        }

        match view {
            ActiveView::Flows => self.load_flows().await,
            ActiveView::Unanswered => self.load_unanswered().await,
            ActiveView::Packets | ActiveView::Stats => {}
        }
    }

    pub async fn load_flows(&self) {
        let (ticket, key) = {
            let mut inner = self.lock();
            let live = inner.session.instance();
            let ticket = inner.flows.issue(live);
            (ticket, inner.session.key().to_string())
        };

        let result = self.backend.flows(&key).await;

        let mut inner = self.lock();
        let live = inner.session.instance();
        match result {
            Ok(flows) => {
                apply(&mut inner.flows, live, ticket, FlowsPane::from_records(flows), "flows");
            }
            Err(err) => {
                let pane = FlowsPane::Failed(err.to_string());
                if apply(&mut inner.flows, live, ticket, pane, "flows") {
                    self.report(&mut inner, "flows", &err);
                }
            }
        }
    }

    pub async fn load_unanswered(&self) {
        let (ticket, key) = {
            let mut inner = self.lock();
            let live = inner.session.instance();
            let ticket = inner.unanswered.issue(live);
            (ticket, inner.session.key().to_string())
        };

        let result = self.backend.unanswered(&key).await;

        let mut inner = self.lock();
        let live = inner.session.instance();
        match result {
            Ok(requests) => {
                let pane = UnansweredPane::from_requests(&requests);
                apply(&mut inner.unanswered, live, ticket, pane, "unanswered");
            }
            Err(err) => {
                let pane = UnansweredPane::Failed(err.to_string());
                if apply(&mut inner.unanswered, live, ticket, pane, "unanswered") {
                    self.report(&mut inner, "unanswered requests", &err);
                }
            }
        }
    }

    /// Fetch stats, rebuild the filter facets and, if the stats view is
    /// showing, its charts.
    pub async fn load_stats(&self) {
        let (ticket, key) = {
            let mut inner = self.lock();
            let live = inner.session.instance();
            let ticket = inner.stats.issue(live);
            (ticket, inner.session.key().to_string())
        };

        let result = self.backend.stats(&key).await;

        let mut inner = self.lock();
        let live = inner.session.instance();
        match result {
            Ok(stats) => {
                let facets = build_facets(&stats.all_protocols_dist);
                if apply(&mut inner.stats, live, ticket, stats, "stats") {
                    inner.facets = facets;
                    if inner.view.view() == ActiveView::Stats {
                        let Inner { stats, charts, .. } = &mut *inner;
                        if let Some(stats) = stats.current() {
                            charts.mount_all(stats);
                        }
                    }
                }
            }
            Err(err) => {
                if fail(&mut inner.stats, live, ticket, "stats") {
                    self.report(&mut inner, "stats", &err);
                }
            }
        }
    }

    pub fn facets(&self) -> Vec<Facet> {
        self.lock().facets.clone()
    }

    /// Rows of the page currently on screen.
    pub fn page_rows(&self) -> Vec<PacketRow> {
        self.lock()
            .page
            .current()
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Write the rows on screen to `path` as CSV. Returns the row count.
    pub fn export_page(&self, path: &Path) -> Result<usize, ClientError> {
        let rows = self.page_rows();
        match write_csv(path, &rows) {
            Ok(()) => {
                self.notify(Toast::info(format!(
                    "Exported {} rows to {}",
                    rows.len(),
                    path.display()
                )));
                Ok(rows.len())
            }
            Err(err) => {
                let mut inner = self.lock();
                self.report(&mut inner, "export", &err);
                Err(err)
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot with toasts older than their TTL at `now` dismissed.
    pub fn snapshot_at(&self, now: Instant) -> Snapshot {
        let mut inner = self.lock();
        inner.notifications.prune(now);

        let flows = if inner.flows.pending() {
            FlowsPane::Loading
        } else {
            inner.flows.current().cloned().unwrap_or(FlowsPane::Loading)
        };
        let unanswered = if inner.unanswered.pending() {
            UnansweredPane::Loading
        } else {
            inner
                .unanswered
                .current()
                .cloned()
                .unwrap_or(UnansweredPane::Loading)
        };

        Snapshot {
            view: inner.view.clone(),
            session: inner.session.current().cloned(),
            uploading: inner.upload.pending(),
            table: inner.page.current().cloned(),
            page_loading: inner.page.pending(),
            detail: inner.detail.current().cloned(),
            detail_loading: inner.detail.pending(),
            flows,
            unanswered,
            stats_loading: inner.stats.pending(),
            facets: inner.facets.clone(),
            charts: inner.charts.mounted().cloned().collect(),
            toast: inner.notifications.visible().cloned(),
        }
    }

    /// Chart surfaces torn down so far.
    pub fn charts_released(&self) -> u64 {
        self.lock().charts.released()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::model::{
        FlowRecord, PacketDetail, PacketPage, PacketRecord, UnansweredRequest,
    };
    use crate::notify::ToastLevel;
    use crate::query::PacketQuery;

    #[derive(Default)]
    struct FakeBackend {
        // Packet requests whose search text has a gate wait for it
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        calls: AtomicUsize,
        fail_reads: AtomicBool,
        upload_error: Mutex<Option<String>>,
        queries: Mutex<Vec<PacketQuery>>,
        flows: Mutex<Vec<FlowRecord>>,
        unanswered: Mutex<Vec<UnansweredRequest>>,
        stats: Mutex<StatsPayload>,
    }

    impl FakeBackend {
        fn gate(&self, search: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates
                .lock()
                .unwrap()
                .insert(search.to_string(), gate.clone());
            gate
        }

        fn check(&self) -> Result<(), ClientError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(ClientError::Transport("connection refused".into()));
            }
            Ok(())
        }

        fn last_query(&self) -> PacketQuery {
            self.queries.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CaptureBackend for FakeBackend {
        async fn upload(&self, filename: &str, _data: Vec<u8>) -> Result<UploadResult, ClientError> {
            if let Some(body) = self.upload_error.lock().unwrap().clone() {
                return Err(ClientError::from_response(500, &body));
            }
            Ok(upload(&format!("key-{}", filename), 42))
        }

        async fn packets(&self, query: &PacketQuery) -> Result<PacketPage, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            let search = query.search.clone().unwrap_or_default();
            let gate = self.gates.lock().unwrap().get(&search).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.check()?;
            Ok(PacketPage {
                packets: vec![PacketRecord {
                    frame_num: query.offset + 1,
                    info: Some(format!("{}:{}", query.session, search)),
                    ..Default::default()
                }],
                total: 450,
                offset: query.offset,
                limit: query.limit,
            })
        }

        async fn packet(&self, frame_num: u64, _session: &str) -> Result<PacketDetail, ClientError> {
            self.check()?;
            Ok(serde_json::from_value(json!({"frame_num": frame_num, "protocol": "gsm_map"}))
                .unwrap())
        }

        async fn flows(&self, _session: &str) -> Result<Vec<FlowRecord>, ClientError> {
            self.check()?;
            Ok(self.flows.lock().unwrap().clone())
        }

        async fn unanswered(&self, _session: &str) -> Result<Vec<UnansweredRequest>, ClientError> {
            self.check()?;
            Ok(self.unanswered.lock().unwrap().clone())
        }

        async fn stats(&self, _session: &str) -> Result<StatsPayload, ClientError> {
            self.check()?;
            Ok(self.stats.lock().unwrap().clone())
        }
    }

    fn upload(key: &str, packets: u64) -> UploadResult {
        UploadResult {
            session_key: key.to_string(),
            packet_count: packets,
            filename: "trace.pcap".to_string(),
            ..Default::default()
        }
    }

    fn coordinator() -> Arc<ViewCoordinator<FakeBackend>> {
        Arc::new(ViewCoordinator::new(
            FakeBackend::default(),
            &ClientConfig::default(),
        ))
    }

    async fn wait_for_calls(coord: &ViewCoordinator<FakeBackend>, n: usize) {
        while coord.backend().calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    fn first_info(coord: &ViewCoordinator<FakeBackend>) -> String {
        coord.snapshot().table.unwrap().rows[0].info.clone()
    }

    #[tokio::test]
    async fn test_later_search_wins_when_earlier_resolves_last() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        let gate_a = coord.backend().gate("A");
        let gate_b = coord.backend().gate("B");

        let c = coord.clone();
        let a = tokio::spawn(async move { c.apply_search("A").await });
        wait_for_calls(&coord, 1).await;
        let c = coord.clone();
        let b = tokio::spawn(async move { c.apply_search("B").await });
        wait_for_calls(&coord, 2).await;

        gate_b.notify_one();
        b.await.unwrap();
        assert_eq!(first_info(&coord), "s1:B");

        gate_a.notify_one();
        a.await.unwrap();
        assert_eq!(first_info(&coord), "s1:B");
        assert_eq!(coord.snapshot().view.search(), "B");
        assert!(!coord.snapshot().page_loading);
    }

    #[tokio::test]
    async fn test_pending_until_latest_resolves() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        let gate_a = coord.backend().gate("A");
        let gate_b = coord.backend().gate("B");

        let c = coord.clone();
        let a = tokio::spawn(async move { c.apply_search("A").await });
        wait_for_calls(&coord, 1).await;
        let c = coord.clone();
        let b = tokio::spawn(async move { c.apply_search("B").await });
        wait_for_calls(&coord, 2).await;

        gate_a.notify_one();
        a.await.unwrap();
        let snap = coord.snapshot();
        assert!(snap.table.is_none());
        assert!(snap.page_loading);

        gate_b.notify_one();
        b.await.unwrap();
        assert_eq!(first_info(&coord), "s1:B");
    }

    #[tokio::test]
    async fn test_response_from_previous_session_is_dropped() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "one.pcap");
        let gate = coord.backend().gate("A");

        let c = coord.clone();
        let a = tokio::spawn(async move { c.apply_search("A").await });
        wait_for_calls(&coord, 1).await;

        coord.start_session(upload("s2", 20), "two.pcap");
        gate.notify_one();
        a.await.unwrap();

        let snap = coord.snapshot();
        assert!(snap.table.is_none());
        assert_eq!(snap.session.unwrap().key(), "s2");
    }

    #[tokio::test]
    async fn test_filter_resets_page_and_detail() {
        let coord = coordinator();
        coord.start_session(upload("s1", 450), "trace.pcap");
        coord.load_page(2).await;
        coord.select_frame(401).await;
        assert!(coord.snapshot().detail.is_some());

        coord.set_filter("GSM_MAP").await;

        let snap = coord.snapshot();
        assert_eq!(snap.view.page(), 0);
        assert_eq!(snap.view.selected_frame(), None);
        assert!(snap.detail.is_none());
        let query = coord.backend().last_query();
        assert_eq!(query.offset, 0);
        assert_eq!(query.proto.as_deref(), Some("gsm_map"));
        assert_eq!(query.session, "s1");
    }

    #[tokio::test]
    async fn test_search_is_trimmed_and_sent() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.apply_search("  262011234567890 ").await;
        let query = coord.backend().last_query();
        assert_eq!(query.search.as_deref(), Some("262011234567890"));
        assert_eq!(query.limit, 200);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_previous_rows() {
        let coord = coordinator();
        coord.start_session(upload("s1", 450), "trace.pcap");
        coord.load_page(0).await;
        let before = coord.snapshot().table.unwrap();

        coord.backend().fail_reads.store(true, Ordering::SeqCst);
        coord.load_page(1).await;

        let snap = coord.snapshot();
        assert_eq!(snap.table.unwrap(), before);
        assert!(!snap.page_loading);
        let toast = snap.toast.unwrap();
        assert_eq!(toast.level, ToastLevel::Error);
        assert!(toast.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_failed_page_keeps_current_page_index() {
        let coord = coordinator();
        coord.start_session(upload("s1", 450), "trace.pcap");
        coord.load_page(0).await;

        coord.backend().fail_reads.store(true, Ordering::SeqCst);
        coord.load_page(3).await;

        let snap = coord.snapshot();
        assert_eq!(snap.view.page(), 0);
        assert_eq!(snap.table.unwrap().pagination.page, 0);
        assert_eq!(coord.backend().last_query().offset, 600);

        coord.backend().fail_reads.store(false, Ordering::SeqCst);
        coord.load_page(2).await;
        let snap = coord.snapshot();
        assert_eq!(snap.view.page(), 2);
        assert_eq!(snap.table.unwrap().pagination.page, 2);
    }

    #[tokio::test]
    async fn test_failed_detail_keeps_open_panel() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.select_frame(7).await;

        coord.backend().fail_reads.store(true, Ordering::SeqCst);
        coord.select_frame(8).await;

        let snap = coord.snapshot();
        assert_eq!(snap.detail.unwrap().frame_num, 7);
        assert!(snap.toast.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_jump_to_frame_off_page() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.load_page(0).await;
        coord.switch_view(ActiveView::Unanswered).await;

        coord.jump_to_frame(9000).await;

        let snap = coord.snapshot();
        assert_eq!(snap.view.view(), ActiveView::Packets);
        assert_eq!(snap.view.selected_frame(), Some(9000));
        assert_eq!(snap.detail.unwrap().frame_num, 9000);
        assert_eq!(snap.table.unwrap().position_of(9000), None);
    }

    #[tokio::test]
    async fn test_close_detail() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.select_frame(3).await;
        coord.close_detail();
        let snap = coord.snapshot();
        assert!(snap.detail.is_none());
        assert_eq!(snap.view.selected_frame(), None);
    }

    #[tokio::test]
    async fn test_upload_loads_page_stats_and_facets() {
        let coord = coordinator();
        *coord.backend().stats.lock().unwrap() = serde_json::from_str(
            r#"{"total_packets": 42,
                "protocol_dist": {"gsm_map": 30, "cap": 12},
                "all_protocols_dist": {"sctp": 42, "gsm_map": 30, "cap": 12}}"#,
        )
        .unwrap();

        coord.upload("trace.pcap", vec![0; 16]).await.unwrap();

        let snap = coord.snapshot();
        assert_eq!(snap.session.unwrap().key(), "key-trace.pcap");
        assert_eq!(first_info(&coord), "key-trace.pcap:");
        let protos: Vec<&str> = snap.facets.iter().map(|f| f.proto.as_str()).collect();
        assert_eq!(protos, vec!["sctp", "gsm_map", "cap"]);
        assert!(!snap.uploading);
        // Charts only mount once the stats view is shown
        assert!(snap.charts.is_empty());

        coord.switch_view(ActiveView::Stats).await;
        assert_eq!(coord.snapshot().charts.len(), 1);
    }

    #[tokio::test]
    async fn test_decoder_missing_upload_keeps_session() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.load_page(0).await;
        *coord.backend().upload_error.lock().unwrap() =
            Some(r#"{"error": "tshark not found in PATH"}"#.to_string());

        let err = coord.upload("capture.pcapng", vec![1, 2, 3]).await.unwrap_err();
        assert!(err.is_decoder_missing());

        let snap = coord.snapshot();
        assert_eq!(snap.session.unwrap().key(), "s1");
        assert!(snap.table.is_some());
        assert_eq!(snap.toast.unwrap().level, ToastLevel::Actionable);
    }

    #[tokio::test]
    async fn test_end_session_clears_everything() {
        let coord = coordinator();
        *coord.backend().stats.lock().unwrap() = serde_json::from_str(
            r#"{"protocol_dist": {"tcap": 3}, "tcap_message_types": {"begin": 3},
                "all_protocols_dist": {"tcap": 3}}"#,
        )
        .unwrap();
        coord.upload("trace.pcap", Vec::new()).await.unwrap();
        coord.switch_view(ActiveView::Stats).await;
        coord.select_frame(1).await;
        assert_eq!(coord.snapshot().charts.len(), 2);

        coord.end_session();

        let snap = coord.snapshot();
        assert!(snap.session.is_none());
        assert!(snap.table.is_none());
        assert!(snap.detail.is_none());
        assert!(snap.facets.is_empty());
        assert!(snap.charts.is_empty());
        assert_eq!(snap.view.view(), ActiveView::Packets);
        assert_eq!(coord.charts_released(), 2);
    }

    #[tokio::test]
    async fn test_empty_flows_and_unanswered() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");

        coord.switch_view(ActiveView::Flows).await;
        assert_eq!(coord.snapshot().flows, FlowsPane::Empty);

        coord.switch_view(ActiveView::Unanswered).await;
        assert_eq!(coord.snapshot().unanswered, UnansweredPane::AllAnswered);
    }

    #[tokio::test]
    async fn test_flows_refetched_on_activation() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.switch_view(ActiveView::Flows).await;
        assert_eq!(coord.snapshot().flows, FlowsPane::Empty);

        *coord.backend().flows.lock().unwrap() = serde_json::from_value(json!([
            {"otid": "0a1b", "messages": [{"frame_num": 1, "time_rel": "0.5", "tcap_type": "begin"}]}
        ]))
        .unwrap();
        coord.switch_view(ActiveView::Packets).await;
        coord.switch_view(ActiveView::Flows).await;
        assert_eq!(coord.snapshot().flows.flow_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_flows_shows_error_pane() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.backend().fail_reads.store(true, Ordering::SeqCst);
        coord.switch_view(ActiveView::Flows).await;
        assert!(matches!(coord.snapshot().flows, FlowsPane::Failed(_)));
    }

    #[tokio::test]
    async fn test_toasts_expire() {
        let coord = coordinator();
        coord.notify(Toast::info("Exported"));
        let now = Instant::now();
        assert!(coord.snapshot_at(now).toast.is_some());
        assert!(coord
            .snapshot_at(now + Duration::from_secs(4))
            .toast
            .is_none());
    }

    #[tokio::test]
    async fn test_export_page() {
        let coord = coordinator();
        coord.start_session(upload("s1", 10), "trace.pcap");
        coord.load_page(0).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packets.csv");

        assert_eq!(coord.export_page(&path).unwrap(), 1);
        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with(
            r#""Frame","Time","Source","Destination","Protocol","Length","Info""#
        ));
        assert!(csv.contains("\"s1:\""));
    }
}
