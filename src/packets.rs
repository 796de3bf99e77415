// Display rows for the packet table.

use serde::Serialize;

use crate::model::{PacketPage, PacketRecord};
use crate::query::Pagination;
use crate::session::group_thousands;

pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketRow {
    pub frame_num: u64,
    pub time: String,
    pub src: String,
    pub dst: String,
    pub protocol: String,
    pub length: String,
    pub info: String,
}

impl From<&PacketRecord> for PacketRow {
    fn from(pkt: &PacketRecord) -> Self {
        let info = pkt.info.clone().unwrap_or_else(|| build_info(pkt));
        let time = format_time(pkt.time_rel.or(pkt.time_epoch));
        let length = if pkt.length == 0 {
            String::new()
        } else {
            pkt.length.to_string()
        };

        Self {
            frame_num: pkt.frame_num,
            time,
            src: or_placeholder(&pkt.src),
            dst: or_placeholder(&pkt.dst),
            protocol: pkt.protocol.to_uppercase(),
            length,
            info,
        }
    }
}

/// `TCAP: Begin | MAP: updateLocation` from whichever operations are known.
pub fn build_info(pkt: &PacketRecord) -> String {
    let parts: Vec<String> = [
        ("TCAP", &pkt.tcap_type),
        ("MAP", &pkt.map_op),
        ("CAP", &pkt.cap_op),
    ]
    .into_iter()
    .filter_map(|(tag, value)| value.as_ref().map(|v| format!("{}: {}", tag, v)))
    .collect();
    parts.join(" | ")
}

/// Seconds with microsecond precision; empty when unknown.
pub fn format_time(t: Option<f64>) -> String {
    match t {
        Some(t) => format!("{:.6}", t),
        None => String::new(),
    }
}

pub fn or_placeholder(s: &str) -> String {
    if s.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        s.to_string()
    }
}

/// The page of rows currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketTable {
    pub rows: Vec<PacketRow>,
    pub total: u64,
    pub pagination: Pagination,
}

impl PacketTable {
    pub fn build(page: &PacketPage, page_index: u64, page_size: u64) -> Self {
        Self {
            rows: page.packets.iter().map(PacketRow::from).collect(),
            total: page.total,
            pagination: Pagination::new(page.total, page_index, page_size),
        }
    }

    /// Row position of a frame on this page, if it is loaded.
    pub fn position_of(&self, frame_num: u64) -> Option<usize> {
        self.rows.iter().position(|r| r.frame_num == frame_num)
    }
}

/// `1,234 packets [GSM_MAP]`
pub fn count_caption(total: u64, proto: &str) -> String {
    let suffix = if proto.is_empty() {
        String::new()
    } else {
        format!(" [{}]", proto.to_uppercase())
    };
    format!("{} packets{}", group_thousands(total), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PacketRecord {
        PacketRecord {
            frame_num: 42,
            time_rel: Some(1.5),
            src: "10.1.2.3".to_string(),
            protocol: "gsm_map".to_string(),
            length: 0,
            tcap_type: Some("Begin".to_string()),
            map_op: Some("updateLocation".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_row_fallbacks() {
        let row = PacketRow::from(&record());
        assert_eq!(row.time, "1.500000");
        assert_eq!(row.dst, PLACEHOLDER);
        assert_eq!(row.protocol, "GSM_MAP");
        assert_eq!(row.length, "");
        assert_eq!(row.info, "TCAP: Begin | MAP: updateLocation");
    }

    #[test]
    fn test_server_info_wins() {
        let mut pkt = record();
        pkt.info = Some("TCAP:Begin | MAP:updateLocation".to_string());
        pkt.length = 96;
        let row = PacketRow::from(&pkt);
        assert_eq!(row.info, "TCAP:Begin | MAP:updateLocation");
        assert_eq!(row.length, "96");
    }

    #[test]
    fn test_time_falls_back_to_epoch() {
        let pkt = PacketRecord {
            time_epoch: Some(1700000000.25),
            ..Default::default()
        };
        assert_eq!(PacketRow::from(&pkt).time, "1700000000.250000");
        assert_eq!(format_time(None), "");
        assert_eq!(format_time(Some(0.0)), "0.000000");
    }

    #[test]
    fn test_empty_record_renders() {
        let row = PacketRow::from(&PacketRecord::default());
        assert_eq!(row.info, "");
        assert_eq!(row.src, PLACEHOLDER);
        assert_eq!(row.protocol, "");
    }

    #[test]
    fn test_table_and_caption() {
        let page = PacketPage {
            packets: vec![record()],
            total: 1200,
            offset: 200,
            limit: 200,
        };
        let table = PacketTable::build(&page, 1, 200);
        assert_eq!(table.position_of(42), Some(0));
        assert_eq!(table.position_of(7), None);
        assert_eq!(table.pagination.label(), "Page 2 / 6");
        assert_eq!(count_caption(1200, "tcap"), "1,200 packets [TCAP]");
        assert_eq!(count_caption(3, ""), "3 packets");
    }
}
