// Protocol filter facets and chart series derived from `/api/stats`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{Distribution, StatsPayload};

pub const OPERATION_TOP_N: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolCategory {
    GsmMap,
    Cap,
    Tcap,
    Sccp,
    M3ua,
    Other,
}

impl ProtocolCategory {
    pub fn of(proto: &str) -> Self {
        match proto.to_lowercase().as_str() {
            "gsm_map" => ProtocolCategory::GsmMap,
            "cap" => ProtocolCategory::Cap,
            "tcap" => ProtocolCategory::Tcap,
            "sccp" => ProtocolCategory::Sccp,
            "m3ua" => ProtocolCategory::M3ua,
            _ => ProtocolCategory::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub proto: String,
    pub label: String,
    pub count: u64,
    pub category: ProtocolCategory,
}

/// One facet per protocol, busiest first. Equal counts keep the order the
/// backend sent them in.
pub fn build_facets(dist: &Distribution) -> Vec<Facet> {
    top_n(dist, usize::MAX)
        .into_iter()
        .map(|(proto, count)| Facet {
            label: proto.to_uppercase(),
            category: ProtocolCategory::of(&proto),
            proto,
            count,
        })
        .collect()
}

/// The `n` largest entries, descending, ties in original key order.
pub fn top_n(dist: &Distribution, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = dist.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    // sort_by is stable
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChartId {
    Protocols,
    TcapTypes,
    MapOperations,
    CapOperations,
}

impl ChartId {
    pub fn title(self) -> &'static str {
        match self {
            ChartId::Protocols => "Protocol Distribution",
            ChartId::TcapTypes => "TCAP Types",
            ChartId::MapOperations => "GSM_MAP Operations",
            ChartId::CapOperations => "CAP Operations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Doughnut,
    Bar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub id: ChartId,
    pub kind: ChartKind,
    pub points: Vec<(String, u64)>,
}

impl ChartSeries {
    pub fn max(&self) -> u64 {
        self.points.iter().map(|(_, v)| *v).max().unwrap_or(0)
    }
}

/// Series for the stats view. Empty distributions get no chart at all.
pub fn chart_set(stats: &StatsPayload) -> Vec<ChartSeries> {
    let sources = [
        (ChartId::Protocols, ChartKind::Doughnut, &stats.protocol_dist, usize::MAX),
        (ChartId::TcapTypes, ChartKind::Doughnut, &stats.tcap_message_types, usize::MAX),
        (ChartId::MapOperations, ChartKind::Bar, &stats.gsm_map_operations, OPERATION_TOP_N),
        (ChartId::CapOperations, ChartKind::Bar, &stats.cap_operations, OPERATION_TOP_N),
    ];

    sources
        .into_iter()
        .filter(|(_, _, dist, _)| !dist.is_empty())
        .map(|(id, kind, dist, n)| ChartSeries {
            id,
            kind,
            points: if kind == ChartKind::Bar {
                top_n(dist, n)
            } else {
                // Doughnuts keep the backend's key order
                dist.iter().map(|(k, v)| (k.to_string(), *v)).collect()
            },
        })
        .collect()
}

/// Chart surfaces tied to the current session.
///
/// A surface is the rendered state of one chart. Mounting over an existing
/// surface releases it first, and every surface is released when the
/// session ends so nothing from the old capture shows up in the next one.
#[derive(Debug, Default)]
pub struct ChartSurfaces {
    mounted: BTreeMap<ChartId, ChartSeries>,
    released: u64,
}

impl ChartSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, series: ChartSeries) {
        if self.mounted.insert(series.id, series).is_some() {
            self.released += 1;
        }
    }

    /// Replace every surface with the charts for `stats`.
    pub fn mount_all(&mut self, stats: &StatsPayload) {
        let fresh = chart_set(stats);
        // Charts with no data this time are torn down too
        let stale: Vec<ChartId> = self
            .mounted
            .keys()
            .filter(|id| !fresh.iter().any(|s| s.id == **id))
            .copied()
            .collect();
        for id in stale {
            self.release(id);
        }
        for series in fresh {
            self.mount(series);
        }
    }

    pub fn release(&mut self, id: ChartId) {
        if self.mounted.remove(&id).is_some() {
            self.released += 1;
        }
    }

    pub fn release_all(&mut self) {
        let count = self.mounted.len() as u64;
        self.mounted.clear();
        self.released += count;
        debug!("Released {} chart surfaces", count);
    }

    pub fn mounted(&self) -> impl Iterator<Item = &ChartSeries> {
        self.mounted.values()
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Surfaces torn down so far.
    pub fn released(&self) -> u64 {
        self.released
    }
}
