// TCAP transaction flows rendered as sequence diagrams.

use std::cmp::Ordering;

use crate::model::{FlowMessage, FlowRecord};
use crate::packets::{format_time, PLACEHOLDER};

pub const LABEL_SEPARATOR: &str = " · ";

#[derive(Debug, Clone, PartialEq)]
pub struct FlowArrow {
    pub frame_num: u64,
    pub from: String,
    pub to: String,
    pub label: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowView {
    pub otid: String,
    pub dtid: Option<String>,
    pub message_count: usize,
    pub arrows: Vec<FlowArrow>,
}

/// What the flows view shows. `Empty` is a valid capture with no TCAP
/// transactions and is drawn differently from a failed or pending load.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowsPane {
    Loading,
    Failed(String),
    Empty,
    Ready(Vec<FlowView>),
}

impl FlowsPane {
    pub fn from_records(flows: Vec<FlowRecord>) -> Self {
        if flows.is_empty() {
            return FlowsPane::Empty;
        }
        FlowsPane::Ready(sort_flows(flows).iter().map(FlowView::from).collect())
    }

    pub fn flow_count(&self) -> usize {
        match self {
            FlowsPane::Ready(flows) => flows.len(),
            _ => 0,
        }
    }
}

fn start_time(flow: &FlowRecord) -> f64 {
    flow.messages
        .first()
        .and_then(|m| m.time_rel)
        .unwrap_or(0.0)
}

/// Order flows by the time of their first message; flows without one sort
/// as time 0. Messages inside a flow keep the server's order.
pub fn sort_flows(mut flows: Vec<FlowRecord>) -> Vec<FlowRecord> {
    flows.sort_by(|a, b| {
        start_time(a)
            .partial_cmp(&start_time(b))
            .unwrap_or(Ordering::Equal)
    });
    flows
}

pub fn message_label(msg: &FlowMessage) -> String {
    let parts: Vec<&str> = [&msg.tcap_type, &msg.map_op, &msg.cap_op]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
    if parts.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        parts.join(LABEL_SEPARATOR)
    }
}

/// Compact endpoint name for the diagram columns.
pub fn short_host(addr: &str) -> String {
    if addr.is_empty() {
        return "?".to_string();
    }
    let octets: Vec<&str> = addr.split('.').collect();
    if octets.len() == 4 {
        return octets[2..].join(".");
    }
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() > 15 {
        chars[chars.len() - 15..].iter().collect()
    } else {
        addr.to_string()
    }
}

impl From<&FlowMessage> for FlowArrow {
    fn from(msg: &FlowMessage) -> Self {
        Self {
            frame_num: msg.frame_num,
            from: short_host(&msg.src),
            to: short_host(&msg.dst),
            label: message_label(msg),
            time: format_time(msg.time_rel),
        }
    }
}

impl From<&FlowRecord> for FlowView {
    fn from(flow: &FlowRecord) -> Self {
        Self {
            otid: flow.otid.clone(),
            dtid: flow.dtid.clone(),
            message_count: flow.messages.len(),
            arrows: flow.messages.iter().map(FlowArrow::from).collect(),
        }
    }
}
