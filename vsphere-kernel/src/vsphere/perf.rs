use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use vsphere_vim::{ManagedObjectReference, PerfCounterInfo, PerfEntityMetric, PerfMetricId, PerfQuerySpec};

use crate::models::PerformanceSeries;

/// Intervalle temps réel du serveur (secondes)
pub const INTERVAL_SECS: i32 = 20;
pub const MAX_SAMPLES: i32 = 60;
pub const WINDOW: Duration = Duration::hours(1);

/// Motifs de compteurs par famille, comparés par sous-chaîne au nom
/// catalogue `groupe.nom.rollup`
pub fn family_patterns(metric_type: &str) -> Option<&'static [&'static str]> {
    match metric_type {
        "cpu" => Some(&["cpu.usage.average"]),
        "memory" => Some(&["mem.usage.average"]),
        "disk" => Some(&["disk.usage.average", "disk.read.average", "disk.write.average"]),
        "network" => Some(&["net.received.average", "net.transmitted.average"]),
        _ => None,
    }
}

/// Clés des compteurs du catalogue qui matchent, dans l'ordre du catalogue
pub fn select_counters(catalog: &[PerfCounterInfo], patterns: &[&str]) -> Vec<i32> {
    catalog
        .iter()
        .filter(|c| {
            let name = c.catalog_name();
            patterns.iter().any(|p| name.contains(p))
        })
        .map(|c| c.key)
        .collect()
}

pub fn build_query(entity: ManagedObjectReference, counter_ids: &[i32], end: OffsetDateTime) -> PerfQuerySpec {
    PerfQuerySpec {
        entity,
        start_time: end - WINDOW,
        end_time: end,
        max_sample: MAX_SAMPLES,
        metric_ids: counter_ids.iter().copied().map(PerfMetricId::aggregate).collect(),
        interval_id: INTERVAL_SECS,
    }
}

/// Aplatit le premier résultat : valeurs concaténées compteur par compteur,
/// horodatage `start + 20s * i` recommençant à chaque série.
/// `None` quand aucune valeur n'est revenue.
pub fn flatten(metrics: &[PerfEntityMetric], counter_ids: &[i32], start: OffsetDateTime) -> Option<PerformanceSeries> {
    let first = metrics.first()?;
    let mut series = PerformanceSeries::default();
    for metric in first.value.iter().filter(|m| counter_ids.contains(&m.id.counter_id)) {
        for (i, value) in metric.value.iter().enumerate() {
            let at = start + Duration::seconds(i as i64 * INTERVAL_SECS as i64);
            series.timestamps.push(at.format(&Rfc3339).unwrap_or_default());
            series.values.push(*value as f64);
        }
    }
    (!series.is_empty()).then_some(series)
}
