// CSV export of the rendered packet page.

use std::path::Path;

use tracing::info;

use crate::error::ClientError;
use crate::packets::PacketRow;

pub const CSV_HEADER: [&str; 7] = [
    "Frame",
    "Time",
    "Source",
    "Destination",
    "Protocol",
    "Length",
    "Info",
];

/// Every cell is quoted and embedded quotes are doubled (RFC 4180).
pub fn quote_cell(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

pub fn export_csv(rows: &[PacketRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(join_cells(CSV_HEADER.iter().copied()));
    for row in rows {
        let frame = row.frame_num.to_string();
        lines.push(join_cells(
            [
                frame.as_str(),
                row.time.as_str(),
                row.src.as_str(),
                row.dst.as_str(),
                row.protocol.as_str(),
                row.length.as_str(),
                row.info.as_str(),
            ]
            .into_iter(),
        ));
    }
    lines.join("\n")
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(quote_cell).collect::<Vec<_>>().join(",")
}

pub fn write_csv(path: &Path, rows: &[PacketRow]) -> Result<(), ClientError> {
    std::fs::write(path, export_csv(rows))?;
    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(info: &str) -> PacketRow {
        PacketRow {
            frame_num: 5,
            time: "0.125000".to_string(),
            src: "10.0.0.1".to_string(),
            dst: "10.0.0.2".to_string(),
            protocol: "TCAP".to_string(),
            length: "88".to_string(),
            info: info.to_string(),
        }
    }

    #[test]
    fn test_quote_escaping() {
        assert_eq!(quote_cell(r#"TCAP: a, "b""#), r#""TCAP: a, ""b""""#);
        assert_eq!(quote_cell(""), r#""""#);
    }

    #[test]
    fn test_export_layout() {
        let csv = export_csv(&[row(r#"TCAP: a, "b""#)]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            r#""Frame","Time","Source","Destination","Protocol","Length","Info""#
        );
        assert_eq!(
            lines[1],
            r#""5","0.125000","10.0.0.1","10.0.0.2","TCAP","88","TCAP: a, ""b""""#
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_empty_page_is_header_only() {
        assert_eq!(export_csv(&[]).lines().count(), 1);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packets.csv");
        write_csv(&path, &[row("x")]).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with(r#""x""#));
    }
}
