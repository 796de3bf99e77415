// Builds `GET /api/packets` requests from the view state and owns the
// pagination arithmetic around them.

use crate::view_state::ViewState;

pub const PAGE_SIZE: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PacketQuery {
    pub limit: u64,
    pub offset: u64,
    pub session: String,
    pub proto: Option<String>,
    pub search: Option<String>,
}

/// Pure: the same state, session and page size always give the same query.
///
/// The page index is not clamped; asking past the end is a legal query that
/// the server answers with an empty page.
pub fn build_packet_query(state: &ViewState, session: &str, page_size: u64) -> PacketQuery {
    let proto = Some(state.proto().trim()).filter(|p| !p.is_empty());
    let search = Some(state.search().trim()).filter(|s| !s.is_empty());

    PacketQuery {
        limit: page_size,
        offset: state.page().saturating_mul(page_size),
        session: session.to_string(),
        proto: proto.map(str::to_string),
        search: search.map(str::to_string),
    }
}

impl PacketQuery {
    /// Parameters in canonical order: limit, offset, session, proto, search.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("session", self.session.clone()),
        ];
        if let Some(ref proto) = self.proto {
            pairs.push(("proto", proto.clone()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn page(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.offset / self.limit
        }
    }
}

/// Pagination controls for a result set of `total` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, page_size: u64) -> Self {
        Self {
            total,
            page,
            page_size: page_size.max(1),
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size)
    }

    /// Controls are only shown when there is more than one page.
    pub fn visible(&self) -> bool {
        self.total_pages() > 1
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages()
    }

    pub fn prev(&self) -> Option<u64> {
        self.has_prev().then(|| self.clamp(self.page - 1))
    }

    pub fn next(&self) -> Option<u64> {
        self.has_next().then(|| self.page + 1)
    }

    pub fn last(&self) -> u64 {
        self.total_pages().saturating_sub(1)
    }

    pub fn clamp(&self, page: u64) -> u64 {
        page.min(self.last())
    }

    pub fn label(&self) -> String {
        format!(
            "Page {} / {}",
            self.page.saturating_add(1),
            self.total_pages().max(1)
        )
    }
}
