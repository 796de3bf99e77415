// Requests that never received a successful reply.

use crate::model::{RequestStatus, UnansweredRequest};
use crate::packets::{format_time, or_placeholder, PLACEHOLDER};

impl RequestStatus {
    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::ErrorResponse => "Error",
            RequestStatus::MissingResponse => "No Response",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnansweredRow {
    pub frame_num: u64,
    pub time: String,
    pub src: String,
    pub dst: String,
    pub operation: String,
    pub status: RequestStatus,
    pub status_label: &'static str,
    pub imsi: String,
    pub msisdn: String,
    pub response_frame: String,
}

impl From<&UnansweredRequest> for UnansweredRow {
    fn from(req: &UnansweredRequest) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
        Self {
            frame_num: req.frame_num,
            time: format_time(req.time_rel),
            src: or_placeholder(&req.src),
            dst: or_placeholder(&req.dst),
            operation: text(&req.operation),
            status: req.status,
            status_label: req.status.label(),
            imsi: text(&req.imsi),
            msisdn: text(&req.msisdn),
            response_frame: req
                .response_frame()
                .map(|f| f.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnansweredPane {
    Loading,
    Failed(String),
    /// Every request in the capture got a reply.
    AllAnswered,
    Ready {
        rows: Vec<UnansweredRow>,
        summary: String,
    },
}

impl UnansweredPane {
    pub fn from_requests(requests: &[UnansweredRequest]) -> Self {
        if requests.is_empty() {
            return UnansweredPane::AllAnswered;
        }
        UnansweredPane::Ready {
            rows: requests.iter().map(UnansweredRow::from).collect(),
            summary: summary(requests.len()),
        }
    }
}

pub fn summary(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{} unanswered request{}", count, plural)
}
