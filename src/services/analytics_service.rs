use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::errors::{AppError, AppResult};
use crate::models::domain::{ExamResult, ExamTemplate};
use crate::models::dto::response::{
    AnalyticsSummary, ClassComparison, ExamReport, PerformanceTrend, StudentAnalytics,
    SubjectPerformance, TopicPerformance, Trend,
};
use crate::repositories::{ResultFilter, ResultRepository, StudentRepository, TemplateRepository};

/// Topics below this success rate are flagged weak. Fixed by design,
/// not configurable.
const WEAK_TOPIC_THRESHOLD: f64 = 60.0;

/// Trend classification needs this many samples; the mean of the last
/// three is compared against the mean of the three before them.
const TREND_WINDOW: usize = 3;
const TREND_MIN_SAMPLES: usize = 6;
const TREND_DELTA: f64 = 5.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct AnalyticsService {
    results: Arc<dyn ResultRepository>,
    templates: Arc<dyn TemplateRepository>,
    students: Arc<dyn StudentRepository>,
}

impl AnalyticsService {
    pub fn new(
        results: Arc<dyn ResultRepository>,
        templates: Arc<dyn TemplateRepository>,
        students: Arc<dyn StudentRepository>,
    ) -> Self {
        Self {
            results,
            templates,
            students,
        }
    }

    /// Per-topic tally for a single sitting, joined against the
    /// template's question mapping. Unmapped question numbers are
    /// skipped. Sorted worst-first so weak topics lead.
    pub fn topic_breakdown(
        result: &ExamResult,
        template: &ExamTemplate,
    ) -> Vec<TopicPerformance> {
        let mut stats: BTreeMap<(String, String), (u32, u32, u32)> = BTreeMap::new();

        for (number, record) in &result.answers {
            let Some(mapping) = template.mapping_for(*number) else {
                continue;
            };

            let entry = stats
                .entry((mapping.subject.clone(), mapping.topic.clone()))
                .or_default();

            if record.answer.is_empty() {
                entry.2 += 1;
            } else if record.is_correct {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        let mut performances: Vec<TopicPerformance> = stats
            .into_iter()
            .map(|((subject, topic), (correct, wrong, empty))| {
                let total = correct + wrong + empty;
                let success_rate = if total > 0 {
                    round2(correct as f64 / total as f64 * 100.0)
                } else {
                    0.0
                };
                TopicPerformance {
                    subject,
                    topic,
                    total_questions: total,
                    correct_count: correct,
                    wrong_count: wrong,
                    empty_count: empty,
                    success_rate,
                }
            })
            .collect();

        performances.sort_by(|a, b| {
            a.success_rate
                .partial_cmp(&b.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
                .then_with(|| a.topic.cmp(&b.topic))
        });

        performances
    }

    pub fn weak_topics(performances: &[TopicPerformance]) -> Vec<TopicPerformance> {
        performances
            .iter()
            .filter(|p| p.success_rate < WEAK_TOPIC_THRESHOLD)
            .cloned()
            .collect()
    }

    /// Class mean and the submitting student's 1-based rank by net
    /// score descending. Ties break on user id ascending so ranking is
    /// deterministic.
    pub fn class_comparison(results: &[ExamResult], user_id: &str) -> ClassComparison {
        if results.is_empty() {
            return ClassComparison {
                class_average: 0.0,
                rank: 0,
                class_size: 0,
            };
        }

        let class_average =
            round2(results.iter().map(|r| r.net_score).sum::<f64>() / results.len() as f64);

        let mut ranked: Vec<(&str, f64)> = results
            .iter()
            .map(|r| (r.user_id.as_str(), r.net_score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let rank = ranked
            .iter()
            .position(|(id, _)| *id == user_id)
            .map(|position| position + 1)
            .unwrap_or(0);

        ClassComparison {
            class_average,
            rank,
            class_size: results.len(),
        }
    }

    /// Longitudinal classification over scores sorted oldest-first.
    /// Fewer than six samples is stable by definition.
    pub fn classify_trend(scores: &[f64]) -> Trend {
        if scores.len() < TREND_MIN_SAMPLES {
            return Trend::Stable;
        }

        let recent: f64 =
            scores[scores.len() - TREND_WINDOW..].iter().sum::<f64>() / TREND_WINDOW as f64;
        let previous: f64 = scores[scores.len() - 2 * TREND_WINDOW..scores.len() - TREND_WINDOW]
            .iter()
            .sum::<f64>()
            / TREND_WINDOW as f64;

        let diff = recent - previous;
        if diff > TREND_DELTA {
            Trend::Improving
        } else if diff < -TREND_DELTA {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Per-subject tallies across many sittings, joined through each
    /// result's template mapping. Sorted by net descending.
    pub fn subject_performance(
        results: &[ExamResult],
        templates: &HashMap<String, ExamTemplate>,
    ) -> Vec<SubjectPerformance> {
        let mut stats: BTreeMap<String, (u32, u32, u32)> = BTreeMap::new();

        for result in results {
            let Some(template) = templates.get(&result.template_id) else {
                continue;
            };

            for (number, record) in &result.answers {
                let Some(mapping) = template.mapping_for(*number) else {
                    continue;
                };

                let entry = stats.entry(mapping.subject.clone()).or_default();
                if record.answer.is_empty() {
                    entry.2 += 1;
                } else if record.is_correct {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }

        let mut performances: Vec<SubjectPerformance> = stats
            .into_iter()
            .map(|(subject, (correct, wrong, empty))| {
                let total = correct + wrong + empty;
                let correct_rate = if total > 0 {
                    round2(correct as f64 / total as f64 * 100.0)
                } else {
                    0.0
                };
                SubjectPerformance {
                    subject,
                    total_questions: total,
                    correct_count: correct,
                    wrong_count: wrong,
                    empty_count: empty,
                    net_score: round2(correct as f64 - wrong as f64 / 4.0),
                    correct_rate,
                }
            })
            .collect();

        performances.sort_by(|a, b| {
            b.net_score
                .partial_cmp(&a.net_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
        });

        performances
    }

    /// Daily mean net score, exam count, and distinct student count,
    /// oldest day first.
    pub fn performance_trends(results: &[ExamResult]) -> Vec<PerformanceTrend> {
        let mut grouped: BTreeMap<NaiveDate, (f64, usize, HashSet<&str>)> = BTreeMap::new();

        for result in results {
            let entry = grouped.entry(result.exam_date).or_insert((0.0, 0, HashSet::new()));
            entry.0 += result.net_score;
            entry.1 += 1;
            entry.2.insert(result.user_id.as_str());
        }

        grouped
            .into_iter()
            .map(|(date, (net_sum, count, students))| PerformanceTrend {
                date,
                average_net: round2(net_sum / count as f64),
                total_exams: count,
                students_count: students.len(),
            })
            .collect()
    }

    /// Full report for one sitting: breakdown, weak topics, class
    /// placement, and the student's trend across past sittings of the
    /// same exam type.
    pub async fn exam_report(&self, result_id: &str) -> AppResult<ExamReport> {
        let result = self
            .results
            .find_by_id(result_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Result with id '{}' not found", result_id)))?;

        let template = self
            .templates
            .find_by_id(&result.template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Template with id '{}' not found",
                    result.template_id
                ))
            })?;

        let topic_performances = Self::topic_breakdown(&result, &template);
        let weak = Self::weak_topics(&topic_performances);

        let class_results = self
            .results
            .list(&ResultFilter {
                institution_id: result.institution_id.clone(),
                template_id: Some(result.template_id.clone()),
                exam_date: Some(result.exam_date),
                ..Default::default()
            })
            .await?;
        let class_comparison = Self::class_comparison(&class_results, &result.user_id);

        // History of the same exam type, oldest first, up to and
        // including this sitting.
        let student_results = self
            .results
            .list(&ResultFilter {
                institution_id: result.institution_id.clone(),
                user_id: Some(result.user_id.clone()),
                ..Default::default()
            })
            .await?;

        let template_map = self.load_templates(&student_results).await?;
        let mut history: Vec<&ExamResult> = student_results
            .iter()
            .filter(|r| r.exam_date <= result.exam_date)
            .filter(|r| {
                template_map
                    .get(&r.template_id)
                    .is_some_and(|t| t.exam_type == template.exam_type)
            })
            .collect();
        history.sort_by(|a, b| a.exam_date.cmp(&b.exam_date));

        let net_scores: Vec<f64> = history.iter().map(|r| r.net_score).collect();
        let trend = Self::classify_trend(&net_scores);

        Ok(ExamReport {
            result_id: result.id.clone(),
            template_id: result.template_id.clone(),
            exam_date: result.exam_date,
            correct_count: result.correct_count,
            wrong_count: result.wrong_count,
            empty_count: result.empty_count,
            net_score: result.net_score,
            topic_performances,
            weak_topics: weak,
            class_comparison,
            trend,
            previous_net_scores: net_scores,
        })
    }

    pub async fn institution_summary(
        &self,
        institution_id: &str,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
    ) -> AppResult<AnalyticsSummary> {
        let total_students = self.students.count_approved(institution_id).await?;

        let results = self
            .results
            .list(&ResultFilter {
                institution_id: institution_id.to_string(),
                date_start,
                date_end,
                ..Default::default()
            })
            .await?;

        let total_exams_completed = results.len();
        let average_net = if results.is_empty() {
            0.0
        } else {
            round2(results.iter().map(|r| r.net_score).sum::<f64>() / results.len() as f64)
        };

        let week_ago = Utc::now() - Duration::days(7);
        let active_students_this_week = results
            .iter()
            .filter(|r| r.created_at.is_some_and(|at| at >= week_ago))
            .map(|r| r.student_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let students_with_exams = results
            .iter()
            .map(|r| r.student_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let completion_rate = if total_students > 0 {
            round2(students_with_exams as f64 / total_students as f64 * 100.0)
        } else {
            0.0
        };

        Ok(AnalyticsSummary {
            total_students,
            total_exams_completed,
            average_net,
            active_students_this_week,
            completion_rate,
        })
    }

    pub async fn subject_performance_report(
        &self,
        institution_id: &str,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
    ) -> AppResult<Vec<SubjectPerformance>> {
        let results = self
            .results
            .list(&ResultFilter {
                institution_id: institution_id.to_string(),
                date_start,
                date_end,
                ..Default::default()
            })
            .await?;

        let templates = self.load_templates(&results).await?;
        Ok(Self::subject_performance(&results, &templates))
    }

    pub async fn performance_trends_report(
        &self,
        institution_id: &str,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
    ) -> AppResult<Vec<PerformanceTrend>> {
        let results = self
            .results
            .list(&ResultFilter {
                institution_id: institution_id.to_string(),
                date_start,
                date_end,
                ..Default::default()
            })
            .await?;

        Ok(Self::performance_trends(&results))
    }

    /// Per-student roll-up for the institution dashboard, best average
    /// first.
    pub async fn student_analytics(
        &self,
        institution_id: &str,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
        limit: usize,
    ) -> AppResult<Vec<StudentAnalytics>> {
        let mut students = self.students.list_approved(institution_id).await?;
        students.truncate(limit);

        let mut results = self
            .results
            .list(&ResultFilter {
                institution_id: institution_id.to_string(),
                date_start,
                date_end,
                ..Default::default()
            })
            .await?;
        results.sort_by(|a, b| a.exam_date.cmp(&b.exam_date));

        let mut analytics: Vec<StudentAnalytics> = students
            .into_iter()
            .map(|student| {
                let own: Vec<&ExamResult> = results
                    .iter()
                    .filter(|r| r.user_id == student.user_id)
                    .collect();

                let total_exams = own.len();
                let average_net = if own.is_empty() {
                    0.0
                } else {
                    round2(own.iter().map(|r| r.net_score).sum::<f64>() / own.len() as f64)
                };

                let total_correct: u32 = own.iter().map(|r| r.correct_count).sum();
                let total_questions: u32 = own.iter().map(|r| r.total_questions()).sum();
                let correct_rate = if total_questions > 0 {
                    round2(total_correct as f64 / total_questions as f64 * 100.0)
                } else {
                    0.0
                };

                let net_scores: Vec<f64> = own.iter().map(|r| r.net_score).collect();
                let trend = Self::classify_trend(&net_scores);

                StudentAnalytics {
                    user_id: student.user_id,
                    full_name: student.full_name,
                    total_exams,
                    average_net,
                    correct_rate,
                    last_exam_date: own.last().map(|r| r.exam_date),
                    trend,
                }
            })
            .collect();

        analytics.sort_by(|a, b| {
            b.average_net
                .partial_cmp(&a.average_net)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(analytics)
    }

    async fn load_templates(
        &self,
        results: &[ExamResult],
    ) -> AppResult<HashMap<String, ExamTemplate>> {
        let ids: HashSet<&str> = results.iter().map(|r| r.template_id.as_str()).collect();

        let mut templates = HashMap::new();
        for id in ids {
            if let Some(template) = self.templates.find_by_id(id).await? {
                templates.insert(template.id.clone(), template);
            }
        }
        Ok(templates)
    }
}
