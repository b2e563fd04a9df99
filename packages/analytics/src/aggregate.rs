//! The three summaries drawn by the dashboard.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crime_dash_incident_models::{MapPoint, NormalizedIncident, Ranking, TimeSeries};

/// Counts incidents per day. Labels are `YYYY-MM-DD`, so lexical order is
/// chronological.
#[must_use]
pub fn time_series(incidents: &[&NormalizedIncident]) -> TimeSeries {
    let mut buckets: BTreeMap<&str, u64> = BTreeMap::new();
    for incident in incidents {
        *buckets.entry(incident.date.as_str()).or_default() += 1;
    }

    let (labels, counts): (Vec<String>, Vec<u64>) = buckets
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .unzip();
    TimeSeries { labels, counts }
}

/// Counts incidents per offense group and keeps the `top_n` largest.
///
/// Groups with equal counts keep the order in which they were first seen.
#[must_use]
pub fn offense_ranking(incidents: &[&NormalizedIncident], top_n: usize) -> Ranking {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, u64)> = Vec::new();

    for incident in incidents {
        let group = incident.offense_group.as_str();
        if let Some(&i) = index.get(group) {
            groups[i].1 += 1;
        } else {
            index.insert(group, groups.len());
            groups.push((group, 1));
        }
    }

    // Stable sort: ties stay in first-seen order.
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups.truncate(top_n);

    let (labels, counts): (Vec<String>, Vec<u64>) = groups
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .unzip();
    Ranking { labels, counts }
}

/// Map points plus how they were selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSample {
    /// Points to draw, in incident order.
    pub points: Vec<MapPoint>,
    /// Incidents that had a valid coordinate before sampling.
    pub mappable: u64,
    /// Every `stride`-th mappable incident was kept.
    pub stride: u64,
}

/// Keeps incidents with a valid coordinate and, if there are more than
/// `cap`, every k-th one with `k = ceil(count / cap)`, starting from the
/// first.
#[must_use]
pub fn sample_map_points(incidents: &[&NormalizedIncident], cap: usize) -> MapSample {
    let mappable: Vec<(&NormalizedIncident, f64, f64)> = incidents
        .iter()
        .filter(|incident| incident.has_valid_coordinate)
        .filter_map(|incident| Some((*incident, incident.latitude?, incident.longitude?)))
        .collect();

    let count = mappable.len();
    let stride = if cap == 0 || count <= cap {
        1
    } else {
        count.div_ceil(cap)
    };

    let points = if cap == 0 {
        Vec::new()
    } else {
        mappable
            .into_iter()
            .step_by(stride)
            .map(|(incident, latitude, longitude)| MapPoint {
                latitude,
                longitude,
                offense_group: incident.offense_group.clone(),
                date: incident.date.clone(),
                precinct: incident.precinct.clone(),
                neighborhood: incident.neighborhood.clone(),
            })
            .collect()
    };

    MapSample {
        points,
        mappable: count as u64,
        stride: stride as u64,
    }
}

/// Distinct values in ascending order.
#[must_use]
pub fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;
    use crime_dash_incident_models::UNKNOWN;

    use super::*;

    pub fn incident(
        date: &str,
        precinct: &str,
        crime_against: &str,
        offense_group: &str,
        mappable: bool,
    ) -> NormalizedIncident {
        let timestamp = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        NormalizedIncident {
            timestamp,
            date: date.to_string(),
            precinct: precinct.to_string(),
            offense_group: offense_group.to_string(),
            crime_against: crime_against.to_string(),
            neighborhood: UNKNOWN.to_string(),
            latitude: mappable.then_some(47.6),
            longitude: mappable.then_some(-122.33),
            has_valid_coordinate: mappable,
        }
    }

    fn grouped(groups: &[&str]) -> Vec<NormalizedIncident> {
        groups
            .iter()
            .map(|g| incident("2024-01-01", "North", "PERSON", g, true))
            .collect()
    }

    #[test]
    fn series_is_sorted_by_date() {
        let incidents = vec![
            incident("2024-01-03", "North", "PERSON", "ASSAULT", true),
            incident("2024-01-01", "North", "PERSON", "ASSAULT", true),
            incident("2024-01-03", "North", "PERSON", "ASSAULT", true),
        ];
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let series = time_series(&refs);
        assert_eq!(series.labels, vec!["2024-01-01", "2024-01-03"]);
        assert_eq!(series.counts, vec![1, 2]);
    }

    #[test]
    fn ranking_sorts_descending() {
        let incidents = grouped(&["THEFT", "ASSAULT", "ASSAULT", "FRAUD", "ASSAULT", "THEFT"]);
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let ranking = offense_ranking(&refs, 12);
        assert_eq!(ranking.labels, vec!["ASSAULT", "THEFT", "FRAUD"]);
        assert_eq!(ranking.counts, vec![3, 2, 1]);
    }

    #[test]
    fn ranking_ties_keep_first_seen_order() {
        let incidents = grouped(&["FRAUD", "ARSON", "THEFT", "ARSON", "FRAUD", "THEFT"]);
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let ranking = offense_ranking(&refs, 12);
        assert_eq!(ranking.labels, vec!["FRAUD", "ARSON", "THEFT"]);
    }

    #[test]
    fn ranking_truncates_to_top_n() {
        let names: Vec<String> = (0..20).map(|i| format!("GROUP {i:02}")).collect();
        let mut groups: Vec<&str> = names.iter().map(String::as_str).collect();
        groups.extend(["GROUP 19", "GROUP 19", "GROUP 05"]);
        let incidents = grouped(&groups);
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let ranking = offense_ranking(&refs, 12);
        assert_eq!(ranking.labels.len(), 12);
        assert_eq!(ranking.labels[0], "GROUP 19");
        assert_eq!(ranking.labels[1], "GROUP 05");
        assert!(ranking.counts.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn sample_below_cap_is_unchanged() {
        let incidents: Vec<NormalizedIncident> = (0..2_000_u32)
            .map(|i| {
                let group = format!("G{i}");
                incident("2024-01-01", "North", "PERSON", &group, true)
            })
            .collect();
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let sample = sample_map_points(&refs, 2_000);
        assert_eq!(sample.stride, 1);
        let groups: Vec<&str> = sample
            .points
            .iter()
            .map(|p| p.offense_group.as_str())
            .collect();
        let expected: Vec<&str> = incidents.iter().map(|i| i.offense_group.as_str()).collect();
        assert_eq!(groups, expected);
    }

    #[test]
    fn sample_above_cap_uses_stride() {
        let incidents: Vec<NormalizedIncident> = (0..5_001_u32)
            .map(|i| {
                let group = format!("G{i}");
                incident("2024-01-01", "North", "PERSON", &group, true)
            })
            .collect();
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let sample = sample_map_points(&refs, 2_000);
        assert_eq!(sample.stride, 3);
        assert_eq!(sample.mappable, 5_001);
        assert_eq!(sample.points.len(), 1_667);
        assert!(sample.points.len() <= 2_000);
        assert_eq!(sample.points[0].offense_group, "G0");
        assert_eq!(sample.points[1].offense_group, "G3");
    }

    #[test]
    fn sample_skips_invalid_coordinates() {
        let incidents = vec![
            incident("2024-01-01", "North", "PERSON", "A", true),
            incident("2024-01-01", "North", "PERSON", "B", false),
            incident("2024-01-01", "North", "PERSON", "C", true),
        ];
        let refs: Vec<&NormalizedIncident> = incidents.iter().collect();
        let sample = sample_map_points(&refs, 2_000);
        let groups: Vec<&str> = sample
            .points
            .iter()
            .map(|p| p.offense_group.as_str())
            .collect();
        assert_eq!(groups, vec!["A", "C"]);
        assert_eq!(sample.mappable, 2);
    }
}
