//! Summary statistics over the interaction log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::log::{ErrorEvent, InteractionEvent};

/// Quick statistics about the logs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogStats {
    pub total_interactions: usize,
    pub unique_users: usize,
    pub total_errors: usize,
    pub avg_question_length: f64,
    pub avg_answer_length: f64,
    pub avg_latency_ms: f64,
    /// User with the most interactions; ties go to the smallest id
    pub most_active_user: Option<String>,
    pub last_interaction: Option<DateTime<Utc>>,
}

impl LogStats {
    /// Compute statistics from recorded events
    pub fn compute(interactions: &[InteractionEvent], errors: &[ErrorEvent]) -> Self {
        let mut stats = LogStats {
            total_interactions: interactions.len(),
            total_errors: errors.len(),
            ..Default::default()
        };
        if interactions.is_empty() {
            return stats;
        }

        let n = interactions.len() as f64;
        stats.avg_question_length =
            interactions.iter().map(|e| e.question_length as f64).sum::<f64>() / n;
        stats.avg_answer_length =
            interactions.iter().map(|e| e.answer_length as f64).sum::<f64>() / n;
        stats.avg_latency_ms = interactions.iter().map(|e| e.latency_ms as f64).sum::<f64>() / n;

        let users: HashSet<&str> = interactions.iter().map(|e| e.user_id.as_str()).collect();
        stats.unique_users = users.len();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for event in interactions {
            *counts.entry(event.user_id.as_str()).or_default() += 1;
        }
        // max_by_key keeps the last maximum; iterate in reverse so the smallest id wins
        stats.most_active_user = counts
            .iter()
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(user, _)| user.to_string());

        stats.last_interaction = interactions.iter().map(|e| e.timestamp).max();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn event(user: &str, q_len: usize, a_len: usize, minute: u32) -> InteractionEvent {
        InteractionEvent {
            id: Uuid::new_v4(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            user_id: user.into(),
            question: "q".repeat(q_len),
            answer: "a".repeat(a_len),
            sources: Vec::new(),
            question_length: q_len,
            answer_length: a_len,
            top_similarity: None,
            latency_ms: 100,
        }
    }

    #[test]
    fn test_empty_log() {
        let stats = LogStats::compute(&[], &[]);
        assert_eq!(stats, LogStats::default());
    }

    #[test]
    fn test_stats() {
        let events = vec![
            event("bob", 10, 100, 1),
            event("alice", 20, 200, 5),
            event("bob", 30, 300, 3),
            event("alice", 40, 400, 2),
        ];
        let stats = LogStats::compute(&events, &[]);
        assert_eq!(stats.total_interactions, 4);
        assert_eq!(stats.unique_users, 2);
        assert_eq!(stats.avg_question_length, 25.0);
        assert_eq!(stats.avg_answer_length, 250.0);
        assert_eq!(stats.avg_latency_ms, 100.0);
        assert_eq!(stats.most_active_user.as_deref(), Some("alice"));
        assert_eq!(
            stats.last_interaction,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 5, 0).unwrap())
        );
    }
}
