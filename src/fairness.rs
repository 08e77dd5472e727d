/// Group-level allocation statistics computed from impression records
///
/// Shares are the fraction of a group's records won by a bidder; unfilled slots are
/// counted under NO_WINNER so shares within a group always sum to 1.

use std::collections::{BTreeMap, BTreeSet};

use crate::records::ImpressionRecord;

/// Key used for unfilled slots in the count and share tables
pub const NO_WINNER: &str = "none";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAllocationStats {
    /// group -> bidder (or NO_WINNER) -> slots won
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
    /// group -> bidder (or NO_WINNER) -> share of the group's slots
    pub shares: BTreeMap<String, BTreeMap<String, f64>>,
    /// group -> bidder -> summed slot weight of the slots won
    pub exposure: BTreeMap<String, BTreeMap<String, f64>>,
    pub total_spend: BTreeMap<String, f64>,
    pub avg_price: f64,
    pub n_records: usize,
}

impl GroupAllocationStats {
    /// Every group in `groups` appears in the tables even when it has no records
    pub fn from_records(records: &[ImpressionRecord], groups: &[String]) -> Self {
        let mut stats = Self {
            n_records: records.len(),
            ..Self::default()
        };
        for group in groups {
            stats.counts.entry(group.clone()).or_default();
            stats.exposure.entry(group.clone()).or_default();
        }

        let mut total_price = 0.0;
        for record in records {
            total_price += record.price;
            let name = record.winner.as_deref().unwrap_or(NO_WINNER);
            *stats.counts.entry(record.group.clone()).or_default()
                .entry(name.to_string()).or_default() += 1;
            if let Some(winner) = &record.winner {
                *stats.total_spend.entry(winner.clone()).or_default() += record.price;
                *stats.exposure.entry(record.group.clone()).or_default()
                    .entry(winner.clone()).or_default() += record.slot_weight;
            }
        }
        stats.avg_price = if records.is_empty() { 0.0 } else { total_price / records.len() as f64 };

        for (group, group_counts) in &stats.counts {
            let total: usize = group_counts.values().sum();
            let shares = group_counts.iter()
                .map(|(name, &count)| {
                    let share = if total > 0 { count as f64 / total as f64 } else { 0.0 };
                    (name.clone(), share)
                })
                .collect();
            stats.shares.insert(group.clone(), shares);
        }
        stats
    }

    pub fn share(&self, group: &str, bidder: &str) -> f64 {
        self.shares.get(group)
            .and_then(|shares| shares.get(bidder))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn count(&self, group: &str, bidder: &str) -> usize {
        self.counts.get(group)
            .and_then(|counts| counts.get(bidder))
            .copied()
            .unwrap_or(0)
    }

    pub fn group_total(&self, group: &str) -> usize {
        self.counts.get(group).map(|counts| counts.values().sum()).unwrap_or(0)
    }

    /// Every bidder that won at least one slot, plus NO_WINNER when some slot went unfilled
    pub fn bidder_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.counts.values().flat_map(|counts| counts.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// Largest minus smallest share of `bidder` across groups (0 for a single group)
    pub fn statistical_parity_gap(&self, bidder: &str) -> f64 {
        let shares: Vec<f64> = self.shares.keys().map(|group| self.share(group, bidder)).collect();
        if shares.is_empty() {
            return 0.0;
        }
        let max = shares.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let min = shares.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        max - min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(group: &str, winner: Option<&str>, price: f64) -> ImpressionRecord {
        ImpressionRecord {
            group: group.to_string(),
            winner: winner.map(|w| w.to_string()),
            price,
            quality_scores: vec![1.0, 1.0],
            slot_weight: 1.0,
        }
    }

    fn groups() -> Vec<String> {
        vec!["female".to_string(), "male".to_string()]
    }

    #[test]
    fn test_counts_shares_and_spend() {
        let records = vec![
            record("female", Some("STEM"), 10.0),
            record("female", Some("Makeup"), 5.0),
            record("female", Some("STEM"), 10.0),
            record("female", None, 0.0),
            record("male", Some("Makeup"), 0.2),
        ];
        let stats = GroupAllocationStats::from_records(&records, &groups());
        assert_eq!(stats.n_records, 5);
        assert_eq!(stats.count("female", "STEM"), 2);
        assert_eq!(stats.count("female", NO_WINNER), 1);
        assert_eq!(stats.group_total("female"), 4);
        assert_eq!(stats.share("female", "STEM"), 0.5);
        assert_eq!(stats.share("male", "Makeup"), 1.0);
        assert_eq!(stats.share("male", "STEM"), 0.0);
        assert_eq!(stats.total_spend.get("STEM"), Some(&20.0));
        assert!((stats.avg_price - 25.2 / 5.0).abs() < 1e-12);
        assert_eq!(stats.exposure["female"]["STEM"], 2.0);
        assert_eq!(stats.bidder_names(), vec!["Makeup".to_string(), "STEM".to_string(), NO_WINNER.to_string()]);
    }

    #[test]
    fn test_statistical_parity_gap() {
        let records = vec![
            record("female", Some("STEM"), 1.0),
            record("female", Some("Makeup"), 1.0),
            record("male", Some("Makeup"), 1.0),
            record("male", Some("Makeup"), 1.0),
        ];
        let stats = GroupAllocationStats::from_records(&records, &groups());
        assert_eq!(stats.statistical_parity_gap("STEM"), 0.5);
        assert_eq!(stats.statistical_parity_gap("Makeup"), 0.5);
        assert_eq!(stats.statistical_parity_gap("Nobody"), 0.0);
    }

    #[test]
    fn test_empty_records() {
        let stats = GroupAllocationStats::from_records(&[], &groups());
        assert_eq!(stats.avg_price, 0.0);
        assert_eq!(stats.group_total("male"), 0);
        assert_eq!(stats.share("male", "STEM"), 0.0);
        assert!(stats.bidder_names().is_empty());
    }
}
