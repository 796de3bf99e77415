// The single UI state object. Only the coordinator's transition handlers
// mutate it; everything else reads it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Packets,
    Flows,
    Unanswered,
    Stats,
}

impl ActiveView {
    pub const ALL: [ActiveView; 4] = [
        ActiveView::Packets,
        ActiveView::Flows,
        ActiveView::Unanswered,
        ActiveView::Stats,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ActiveView::Packets => "Packets",
            ActiveView::Flows => "Flows",
            ActiveView::Unanswered => "Unanswered",
            ActiveView::Stats => "Stats",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ActiveView::Packets => ActiveView::Flows,
            ActiveView::Flows => ActiveView::Unanswered,
            ActiveView::Unanswered => ActiveView::Stats,
            ActiveView::Stats => ActiveView::Packets,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    proto: String,
    search: String,
    page: u64,
    view: ActiveView,
    selected_frame: Option<u64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proto(&self) -> &str {
        &self.proto
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn view(&self) -> ActiveView {
        self.view
    }

    pub fn selected_frame(&self) -> Option<u64> {
        self.selected_frame
    }

    /// Changing the filter changes the result set, so the page and the
    /// detail selection no longer apply.
    pub fn set_proto(&mut self, proto: &str) {
        self.proto = proto.trim().to_lowercase();
        self.reset_result_position();
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.trim().to_string();
        self.reset_result_position();
    }

    pub fn set_page(&mut self, page: u64) {
        self.page = page;
    }

    pub fn set_view(&mut self, view: ActiveView) {
        self.view = view;
    }

    pub fn select(&mut self, frame_num: u64) {
        self.selected_frame = Some(frame_num);
    }

    pub fn clear_selection(&mut self) {
        self.selected_frame = None;
    }

    /// Back to the initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn reset_result_position(&mut self) {
        self.page = 0;
        self.selected_frame = None;
    }
}
