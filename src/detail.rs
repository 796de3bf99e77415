//! Display model for the packet detail panel.
//!
//! A detail view has a fixed shape: a title, a handful of labelled
//! sections (frame metadata, then one per decoded summary that the backend
//! supplied) and the two-level layer/field tree. Rows whose value is absent
//! are dropped instead of rendered blank.

use crate::model::{PacketDetail, Summary};

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub frame_num: u64,
    pub title: String,
    pub sections: Vec<DetailSection>,
    pub layers: Vec<LayerView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailSection {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
}

impl DetailSection {
    fn new(title: &'static str, rows: Vec<(&'static str, Option<String>)>) -> Self {
        Self {
            title,
            rows: rows
                .into_iter()
                .filter_map(|(label, value)| value.map(|v| (label, v)))
                .collect(),
        }
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerView {
    pub name: String,
    pub fields: Vec<(String, String)>,
}

impl DetailView {
    pub fn build(pkt: &PacketDetail) -> Self {
        let rec = &pkt.record;
        let mut sections = vec![DetailSection::new(
            "Frame",
            vec![
                ("Number", Some(rec.frame_num.to_string())),
                ("Time (rel)", rec.time_rel.map(|t| t.to_string())),
                ("Time (epoch)", rec.time_epoch.map(|t| t.to_string())),
                ("Length", Some(format!("{} bytes", rec.length))),
                ("Source", non_empty(&rec.src)),
                ("Destination", non_empty(&rec.dst)),
                ("Protocol", non_empty(&rec.protocol)),
            ],
        )];

        if let Some(ref tcap) = pkt.tcap {
            sections.push(DetailSection::new(
                "TCAP",
                vec![
                    ("Message Type", tcap.display("message_type")),
                    ("OTID", tcap.display("otid")),
                    ("DTID", tcap.display("dtid")),
                    ("App Context", tcap.display("app_context")),
                ],
            ));
        }

        if let Some(ref map) = pkt.gsm_map {
            // error_code is shown as sent; there is no agreed code -> text table
            sections.push(DetailSection::new(
                "GSM_MAP",
                vec![
                    ("Operation", map_operation(map)),
                    ("Component", map.display("component")),
                    ("Invoke ID", map.display("invoke_id")),
                    ("IMSI", map.display("imsi")),
                    ("MSISDN", map.display("msisdn")),
                    ("Called GT", map.display("called_gt")),
                    ("Calling GT", map.display("calling_gt")),
                    ("Error Code", map.display("error_code")),
                ],
            ));
        }

        if let Some(ref cap) = pkt.cap {
            sections.push(DetailSection::new(
                "CAP / SCP",
                vec![
                    ("Operation", cap.display("operation")),
                    ("Service Key", cap.display("service_key")),
                    ("IMSI", cap.display("imsi")),
                    ("Called Number", cap.display("called_number")),
                    ("Calling Number", cap.display("calling_number")),
                    ("Event Type", cap.display("event_type")),
                ],
            ));
        }

        let layers = pkt
            .layers
            .layers()
            .iter()
            .map(|layer| LayerView {
                name: layer.name.clone(),
                fields: layer
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.value.clone()))
                    .collect(),
            })
            .collect();

        Self {
            frame_num: rec.frame_num,
            title: format!("Frame #{} — {}", rec.frame_num, rec.protocol.to_uppercase()),
            sections,
            layers,
        }
    }

    pub fn section(&self, title: &str) -> Option<&DetailSection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

/// `updateLocation (2)`, or whichever half is known.
fn map_operation(map: &Summary) -> Option<String> {
    match (map.display("op_name"), map.display("op_code")) {
        (Some(name), Some(code)) => Some(format!("{} ({})", name, code)),
        (Some(name), None) => Some(name),
        (None, Some(code)) => Some(format!("({})", code)),
        (None, None) => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(value: serde_json::Value) -> PacketDetail {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_partial_gsm_map_section() {
        let view = DetailView::build(&detail(json!({
            "frame_num": 17,
            "protocol": "gsm_map",
            "length": 120,
            "gsm_map": {"error_code": "27", "component": "ReturnError"}
        })));

        let map = view.section("GSM_MAP").unwrap();
        assert_eq!(map.value("Error Code"), Some("27"));
        assert_eq!(map.value("Component"), Some("ReturnError"));
        assert_eq!(map.value("IMSI"), None);
        assert_eq!(map.value("Operation"), None);
        assert_eq!(map.rows.len(), 2);
        assert_eq!(view.title, "Frame #17 — GSM_MAP");
    }

    #[test]
    fn test_zero_is_rendered_empty_is_not() {
        let view = DetailView::build(&detail(json!({
            "frame_num": 1,
            "cap": {"service_key": 0, "imsi": "", "operation": null, "event_type": "oAnswer"}
        })));
        let cap = view.section("CAP / SCP").unwrap();
        assert_eq!(cap.value("Service Key"), Some("0"));
        assert_eq!(cap.value("IMSI"), None);
        assert_eq!(cap.value("Operation"), None);
        assert_eq!(cap.value("Event Type"), Some("oAnswer"));
    }

    #[test]
    fn test_absent_summaries_have_no_section() {
        let view = DetailView::build(&detail(json!({"frame_num": 2, "protocol": "sctp"})));
        assert_eq!(view.sections.len(), 1);
        let frame = view.section("Frame").unwrap();
        assert_eq!(frame.value("Number"), Some("2"));
        assert_eq!(frame.value("Length"), Some("0 bytes"));
        assert_eq!(frame.value("Source"), None);
        assert!(view.layers.is_empty());
    }

    #[test]
    fn test_map_operation_combinations() {
        let view = DetailView::build(&detail(json!({
            "frame_num": 3,
            "gsm_map": {"op_name": "updateLocation", "op_code": "2"},
            "tcap": {"message_type": "Begin", "otid": "0a1b", "dtid": ""}
        })));
        let map = view.section("GSM_MAP").unwrap();
        assert_eq!(map.value("Operation"), Some("updateLocation (2)"));
        let tcap = view.section("TCAP").unwrap();
        assert_eq!(tcap.value("OTID"), Some("0a1b"));
        assert_eq!(tcap.value("DTID"), None);

        let view = DetailView::build(&detail(json!({
            "frame_num": 3,
            "gsm_map": {"op_code": "56"}
        })));
        assert_eq!(view.section("GSM_MAP").unwrap().value("Operation"), Some("(56)"));
    }

    #[test]
    fn test_layer_tree_shape() {
        let view = DetailView::build(&detail(json!({
            "frame_num": 4,
            "layers": {"sccp": {"fields": [{"name": "sccp.message_type", "show": "0x09"}]}}
        })));
        assert_eq!(view.layers.len(), 1);
        assert_eq!(view.layers[0].name, "sccp");
        assert_eq!(
            view.layers[0].fields,
            vec![("sccp.message_type".to_string(), "0x09".to_string())]
        );
    }
}
