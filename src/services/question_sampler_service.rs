use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::AppResult;
use crate::models::domain::{QuestionRecord, QuestionRequest};
use crate::repositories::QuestionBankRepository;
use crate::services::subject_weights::{TopicWeightTable, DEFAULT_TOPIC_WEIGHTS};

/// Builds practice question sets by spreading a requested count across
/// a subject's topics proportionally to their historical weights.
pub struct QuestionSamplerService {
    repository: Arc<dyn QuestionBankRepository>,
    weights: TopicWeightTable,
}

impl QuestionSamplerService {
    pub fn new(repository: Arc<dyn QuestionBankRepository>) -> Self {
        Self {
            repository,
            weights: DEFAULT_TOPIC_WEIGHTS.clone(),
        }
    }

    pub fn with_weights(repository: Arc<dyn QuestionBankRepository>, weights: TopicWeightTable) -> Self {
        Self { repository, weights }
    }

    /// Allocate `count` across a subject's topics. Every nonzero-weight
    /// topic gets at least one question before rounding drift is
    /// reconciled, and the allocations always sum to exactly `count`.
    pub fn build_weighted_requests(
        subject: &str,
        count: u32,
        weights: &TopicWeightTable,
    ) -> Vec<QuestionRequest> {
        let Some(topic_weights) = weights.weights_for(subject) else {
            return vec![QuestionRequest {
                subject: subject.to_string(),
                topic: None,
                count,
            }];
        };

        if topic_weights.is_empty() || count == 0 {
            return vec![QuestionRequest {
                subject: subject.to_string(),
                topic: None,
                count,
            }];
        }

        // Heaviest topics first; name as tie-break keeps this stable.
        let mut entries: Vec<(&String, u32)> = topic_weights.iter().map(|(t, w)| (t, *w)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let total_weight: u32 = entries.iter().map(|(_, w)| w).sum();

        let mut allocations: Vec<(String, u32)> = entries
            .iter()
            .map(|(topic, weight)| {
                let share = (*weight as f64 / total_weight as f64 * count as f64).round() as u32;
                ((*topic).clone(), share.max(1))
            })
            .collect();

        Self::reconcile(&mut allocations, count);

        allocations
            .into_iter()
            .filter(|(_, allocated)| *allocated > 0)
            .map(|(topic, allocated)| QuestionRequest {
                subject: subject.to_string(),
                topic: Some(topic),
                count: allocated,
            })
            .collect()
    }

    /// Walk the rounding drift back to the desired total: while over,
    /// shrink the largest allocation still above 1; while under, grow
    /// the largest.
    fn reconcile(allocations: &mut [(String, u32)], desired_total: u32) {
        let mut current: u32 = allocations.iter().map(|(_, count)| *count).sum();

        while current > desired_total {
            match Self::largest_allocation(allocations, 2) {
                Some(index) => {
                    allocations[index].1 -= 1;
                    current -= 1;
                }
                None => break,
            }
        }

        while current < desired_total {
            match Self::largest_allocation(allocations, 0) {
                Some(index) => {
                    allocations[index].1 += 1;
                    current += 1;
                }
                None => break,
            }
        }
    }

    fn largest_allocation(allocations: &[(String, u32)], min_count: u32) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (index, (_, count)) in allocations.iter().enumerate() {
            if *count >= min_count && best.map_or(true, |b| *count > allocations[b].1) {
                best = Some(index);
            }
        }
        best
    }

    /// Fetch a weighted question set: one bank query per topic
    /// allocation, deduplicated by question id, topped up with an
    /// unfiltered subject query when topic batches come back short.
    pub async fn fetch_weighted_subject_questions(
        &self,
        subject: &str,
        count: u32,
    ) -> AppResult<Vec<QuestionRecord>> {
        let requests = Self::build_weighted_requests(subject, count, &self.weights);

        let mut collected: Vec<QuestionRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for request in &requests {
            if collected.len() >= count as usize {
                break;
            }

            let batch = self.repository.fetch(request).await?;
            let mut added = 0;
            for question in batch {
                if added >= request.count || collected.len() >= count as usize {
                    break;
                }
                if seen.insert(question.id.clone()) {
                    collected.push(question);
                    added += 1;
                }
            }
        }

        if collected.len() < count as usize {
            let remaining = count - collected.len() as u32;
            let fallback = self
                .repository
                .fetch(&QuestionRequest {
                    subject: subject.to_string(),
                    topic: None,
                    count: remaining,
                })
                .await?;

            for question in fallback {
                if collected.len() >= count as usize {
                    break;
                }
                if seen.insert(question.id.clone()) {
                    collected.push(question);
                }
            }
        }

        collected.truncate(count as usize);
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, u32)]) -> TopicWeightTable {
        TopicWeightTable::from_entries(&[("Matematik", entries)])
    }

    fn total(requests: &[QuestionRequest]) -> u32 {
        requests.iter().map(|r| r.count).sum()
    }

    #[test]
    fn allocations_follow_proportions() {
        let weights = table(&[("Sayılar", 10), ("Cebir", 30), ("Geometri", 60)]);
        let requests =
            QuestionSamplerService::build_weighted_requests("Matematik", 10, &weights);

        assert_eq!(total(&requests), 10);

        let count_for = |topic: &str| {
            requests
                .iter()
                .find(|r| r.topic.as_deref() == Some(topic))
                .map(|r| r.count)
                .unwrap_or(0)
        };
        assert_eq!(count_for("Geometri"), 6);
        assert_eq!(count_for("Cebir"), 3);
        assert_eq!(count_for("Sayılar"), 1);
    }

    #[test]
    fn allocations_always_sum_to_count() {
        let weights = table(&[("A", 7), ("B", 13), ("C", 29), ("D", 3), ("E", 48)]);

        for count in [5u32, 8, 10, 17, 40, 100] {
            let requests =
                QuestionSamplerService::build_weighted_requests("Matematik", count, &weights);
            assert_eq!(total(&requests), count, "count={}", count);
        }
    }

    #[test]
    fn every_weighted_topic_gets_at_least_one_before_reconciliation() {
        // A tiny topic still lands one question when the count allows.
        let weights = table(&[("Büyük", 95), ("Küçük", 5)]);
        let requests =
            QuestionSamplerService::build_weighted_requests("Matematik", 10, &weights);

        assert_eq!(total(&requests), 10);
        assert!(requests.iter().all(|r| r.count >= 1));
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn over_allocation_shrinks_largest_topics() {
        // Rounding gives 2+2 for count 3; the largest is walked back.
        let weights = table(&[("A", 1), ("B", 1)]);
        let requests =
            QuestionSamplerService::build_weighted_requests("Matematik", 3, &weights);

        assert_eq!(total(&requests), 3);
        assert!(requests.iter().all(|r| r.count >= 1));
    }

    #[test]
    fn unknown_subject_falls_back_to_single_unfiltered_request() {
        let weights = table(&[("Sayılar", 10)]);
        let requests =
            QuestionSamplerService::build_weighted_requests("Astronomi", 12, &weights);

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].topic, None);
        assert_eq!(requests[0].count, 12);
        assert_eq!(requests[0].subject, "Astronomi");
    }

    #[test]
    fn prefixed_subject_uses_same_weights() {
        let weights = table(&[("Sayılar", 10), ("Cebir", 30)]);
        let direct = QuestionSamplerService::build_weighted_requests("Matematik", 8, &weights);
        let prefixed =
            QuestionSamplerService::build_weighted_requests("TYT Matematik", 8, &weights);

        assert_eq!(total(&direct), total(&prefixed));
        assert_eq!(direct.len(), prefixed.len());
    }
}
