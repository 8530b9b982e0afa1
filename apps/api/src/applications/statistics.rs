use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::application::ApplicationStatus;

/// Pipeline counts over all of a user's applications.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationStatistics {
    pub oa: i64,
    pub rejected: i64,
    pub vo: i64,
    pub offer: i64,
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
}

impl ApplicationStatistics {
    /// Folds `(status, count)` rows. Unrecognised statuses count toward the total only.
    pub fn from_counts(counts: &[(String, i64)]) -> Self {
        let mut stats = ApplicationStatistics::default();
        for status in ApplicationStatus::ALL {
            stats.by_status.insert(status.as_str().to_string(), 0);
        }

        for (raw, count) in counts {
            stats.total += count;
            let Ok(status) = raw.parse::<ApplicationStatus>() else {
                continue;
            };
            *stats.by_status.entry(status.as_str().to_string()).or_default() += count;
            match status {
                ApplicationStatus::Oa => stats.oa += count,
                ApplicationStatus::Rejected => stats.rejected += count,
                ApplicationStatus::Vo => stats.vo += count,
                ApplicationStatus::Offer => stats.offer += count,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_fold_into_headline_numbers() {
        let stats = ApplicationStatistics::from_counts(&[
            ("APPLIED".into(), 12),
            ("OA".into(), 4),
            ("VO".into(), 2),
            ("OFFER".into(), 1),
            ("REJECTED".into(), 5),
        ]);
        assert_eq!(stats.oa, 4);
        assert_eq!(stats.vo, 2);
        assert_eq!(stats.offer, 1);
        assert_eq!(stats.rejected, 5);
        assert_eq!(stats.total, 24);
        assert_eq!(stats.by_status["APPLIED"], 12);
        assert_eq!(stats.by_status["DECLINED"], 0);
    }

    #[test]
    fn test_empty_counts() {
        let stats = ApplicationStatistics::from_counts(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_status.len(), ApplicationStatus::ALL.len());
    }

    #[test]
    fn test_unknown_status_counts_toward_total_only() {
        let stats = ApplicationStatistics::from_counts(&[("GHOSTED".into(), 3)]);
        assert_eq!(stats.total, 3);
        assert!(!stats.by_status.contains_key("GHOSTED"));
    }
}
