//! Symptom journal: discrete symptom entries, aggregate statistics, and
//! LLM-assisted pattern analysis.
//!
//! Entries live independently of conversations (an optional link is kept
//! when a symptom was raised mid-consultation). Statistics are pure
//! aggregation; pattern analysis has the same parse-or-fallback duality as
//! report generation.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::classify;
use crate::db::repository::{diagnosis as diagnosis_repo, now, symptom as symptom_repo};
use crate::db::DatabaseError;
use crate::llm::prompt::{analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
use crate::llm::{extract_json_object, GenerationOutcome, GenerationRequest, LlmClient};
use crate::models::enums::{SeverityLevel, SymptomCategory, UrgencyLevel};
use crate::models::{DiagnosisResult, SymptomRecord};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Symptom not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Input for recording or updating a symptom entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SymptomEntry {
    pub name: String,
    pub description: Option<String>,
    pub severity: u8,
    pub location: Option<String>,
    pub duration_hours: Option<i64>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub alleviating_factors: Vec<String>,
    #[serde(default)]
    pub associated_symptoms: Vec<String>,
    pub conversation_id: Option<Uuid>,
}

/// Listing filters. Defaults mirror the API query defaults.
#[derive(Debug, Clone)]
pub struct SymptomQuery {
    pub days_back: i64,
    pub category: Option<SymptomCategory>,
    pub min_severity: Option<u8>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SymptomQuery {
    fn default() -> Self {
        Self {
            days_back: 30,
            category: None,
            min_severity: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Aggregate statistics over a time window. Zero symptoms yields the
/// all-zero value, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomStats {
    pub total_symptoms: usize,
    pub average_severity: f64,
    pub most_common_category: Option<SymptomCategory>,
    pub category_distribution: BTreeMap<String, u32>,
    pub severity_distribution: BTreeMap<u8, u32>,
    pub trending_symptoms: Vec<TrendingSymptom>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingSymptom {
    pub name: String,
    pub count: u32,
}

/// Advisory condition linked from a pattern analysis.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedCondition {
    pub name: String,
    pub icd10_code: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct PatternAnalysis {
    pub pattern_id: String,
    pub symptoms: Vec<SymptomRecord>,
    pub analysis: String,
    pub urgency_level: UrgencyLevel,
    pub recommendations: Vec<String>,
    pub medical_specialties: Vec<String>,
    pub red_flags: Vec<String>,
    pub related_conditions: Vec<RelatedCondition>,
}

// ─── Recording ────────────────────────────────────────────────────────────────

/// Record a new symptom. Severity must be within 1-10; onset is derived
/// from the reported duration; the category comes from the classifier.
pub async fn record_symptom(
    state: &AppState,
    user_id: Uuid,
    entry: SymptomEntry,
) -> Result<SymptomRecord, JournalError> {
    validate_entry(&entry)?;

    let category =
        classify::categorize_symptom(state.llm.as_ref(), &entry.name, entry.description.as_deref())
            .await;

    let recorded_at = now();
    let symptom = SymptomRecord {
        id: Uuid::new_v4(),
        user_id,
        conversation_id: entry.conversation_id,
        name: entry.name.trim().to_string(),
        description: entry.description,
        severity: entry.severity,
        severity_level: SeverityLevel::from_severity(entry.severity),
        location: entry.location,
        category,
        duration_hours: entry.duration_hours,
        onset_date: onset_from_duration(recorded_at, entry.duration_hours),
        recorded_at,
        triggers: entry.triggers,
        alleviating_factors: entry.alleviating_factors,
        associated_symptoms: entry.associated_symptoms,
    };

    let conn = state.open_db()?;
    symptom_repo::insert_symptom(&conn, &symptom)?;
    Ok(symptom)
}

/// Replace an entry's fields, recomputing severity level, onset, and
/// category the same way recording does.
pub async fn update_symptom(
    state: &AppState,
    user_id: Uuid,
    symptom_id: Uuid,
    entry: SymptomEntry,
) -> Result<SymptomRecord, JournalError> {
    validate_entry(&entry)?;

    let existing = {
        let conn = state.open_db()?;
        symptom_repo::get_symptom_owned(&conn, &symptom_id, &user_id)?
            .ok_or(JournalError::NotFound)?
    };

    let category =
        classify::categorize_symptom(state.llm.as_ref(), &entry.name, entry.description.as_deref())
            .await;

    let symptom = SymptomRecord {
        id: existing.id,
        user_id,
        conversation_id: entry.conversation_id.or(existing.conversation_id),
        name: entry.name.trim().to_string(),
        description: entry.description,
        severity: entry.severity,
        severity_level: SeverityLevel::from_severity(entry.severity),
        location: entry.location,
        category,
        duration_hours: entry.duration_hours,
        onset_date: onset_from_duration(now(), entry.duration_hours),
        recorded_at: existing.recorded_at,
        triggers: entry.triggers,
        alleviating_factors: entry.alleviating_factors,
        associated_symptoms: entry.associated_symptoms,
    };

    let conn = state.open_db()?;
    symptom_repo::update_symptom(&conn, &symptom)?;
    Ok(symptom)
}

pub fn delete_symptom(
    state: &AppState,
    user_id: Uuid,
    symptom_id: Uuid,
) -> Result<(), JournalError> {
    let conn = state.open_db()?;
    symptom_repo::delete_symptom(&conn, &symptom_id, &user_id).map_err(|e| match e {
        DatabaseError::NotFound { .. } => JournalError::NotFound,
        other => JournalError::Database(other),
    })
}

pub fn list_symptoms(
    state: &AppState,
    user_id: Uuid,
    query: &SymptomQuery,
) -> Result<Vec<SymptomRecord>, JournalError> {
    let since = now() - Duration::days(query.days_back);
    let conn = state.open_db()?;
    Ok(symptom_repo::list_symptoms(
        &conn,
        &user_id,
        since,
        query.category,
        query.min_severity,
        query.limit,
        query.offset,
    )?)
}

// ─── Statistics ───────────────────────────────────────────────────────────────

pub fn compute_statistics(
    state: &AppState,
    user_id: Uuid,
    days_back: i64,
) -> Result<SymptomStats, JournalError> {
    let since = now() - Duration::days(days_back);
    let symptoms = {
        let conn = state.open_db()?;
        symptom_repo::list_symptoms(&conn, &user_id, since, None, None, u32::MAX, 0)?
    };

    if symptoms.is_empty() {
        return Ok(SymptomStats {
            total_symptoms: 0,
            average_severity: 0.0,
            most_common_category: None,
            category_distribution: BTreeMap::new(),
            severity_distribution: BTreeMap::new(),
            trending_symptoms: vec![],
        });
    }

    let total = symptoms.len();
    let severity_sum: u32 = symptoms.iter().map(|s| s.severity as u32).sum();
    let average_severity = (severity_sum as f64 / total as f64 * 100.0).round() / 100.0;

    let mut category_distribution: BTreeMap<String, u32> = BTreeMap::new();
    let mut severity_distribution: BTreeMap<u8, u32> = BTreeMap::new();
    let mut name_counts: BTreeMap<String, u32> = BTreeMap::new();

    for symptom in &symptoms {
        *category_distribution
            .entry(symptom.category.as_str().to_string())
            .or_insert(0) += 1;
        *severity_distribution.entry(symptom.severity).or_insert(0) += 1;
        *name_counts.entry(symptom.name.to_lowercase()).or_insert(0) += 1;
    }

    let most_common_category = category_distribution
        .iter()
        .max_by_key(|(_, count)| **count)
        .and_then(|(name, _)| SymptomCategory::from_str(name).ok());

    let mut trending: Vec<TrendingSymptom> = name_counts
        .into_iter()
        .map(|(name, count)| TrendingSymptom { name, count })
        .collect();
    // BTreeMap iteration is alphabetical, so equal counts tie-break by name
    trending.sort_by(|a, b| b.count.cmp(&a.count));
    trending.truncate(5);

    Ok(SymptomStats {
        total_symptoms: total,
        average_severity,
        most_common_category,
        category_distribution,
        severity_distribution,
        trending_symptoms: trending,
    })
}

// ─── Pattern analysis ─────────────────────────────────────────────────────────

/// Analyze a set of symptoms. All ids must resolve and belong to the user.
/// The LLM answer is parsed as structured JSON; failure of either the call
/// or the parse produces the deterministic fallback analysis.
pub async fn analyze_pattern(
    state: &AppState,
    user_id: Uuid,
    symptom_ids: &[Uuid],
    additional_context: Option<&str>,
) -> Result<PatternAnalysis, JournalError> {
    if symptom_ids.is_empty() {
        return Err(JournalError::Validation(
            "At least one symptom ID is required".into(),
        ));
    }

    let symptoms = {
        let conn = state.open_db()?;
        symptom_repo::get_symptoms_owned(&conn, symptom_ids, &user_id).map_err(|e| match e {
            DatabaseError::NotFound { .. } => JournalError::NotFound,
            other => JournalError::Database(other),
        })?
    };

    let request = GenerationRequest::new(analysis_prompt(&symptoms, additional_context))
        .with_system(ANALYSIS_SYSTEM_PROMPT)
        .with_temperature(0.3);
    let outcome = state.llm.generate(request).await;

    let stamp = now().format("%Y%m%d_%H%M%S");
    let (analysis, prefix) = match outcome {
        GenerationOutcome::Success { ref text, .. } => match parse_analysis(text) {
            Some(parsed) => (parsed, "pattern"),
            None => {
                tracing::warn!("Pattern analysis response was unparseable, using fallback");
                (fallback_analysis(&symptoms), "fallback")
            }
        },
        GenerationOutcome::Failure { reason, .. } => {
            tracing::warn!(%reason, "Pattern analysis generation failed, using fallback");
            (fallback_analysis(&symptoms), "fallback")
        }
    };
    let pattern_id = format!("{prefix}_{user_id}_{stamp}");

    let related_conditions = link_reference_conditions(state, user_id, &pattern_id, &analysis)?;

    Ok(PatternAnalysis {
        pattern_id,
        symptoms,
        analysis: analysis.analysis,
        urgency_level: analysis.urgency_level,
        recommendations: analysis.recommendations,
        medical_specialties: analysis.medical_specialties,
        red_flags: analysis.red_flags,
        related_conditions,
    })
}

/// Parsed analysis fields, before reference-condition linking.
struct AnalysisFields {
    analysis: String,
    urgency_level: UrgencyLevel,
    recommendations: Vec<String>,
    medical_specialties: Vec<String>,
    red_flags: Vec<String>,
    potential_conditions: Vec<(String, f64)>,
}

fn parse_analysis(text: &str) -> Option<AnalysisFields> {
    #[derive(Deserialize)]
    struct RawAnalysis {
        analysis: Option<String>,
        urgency_level: Option<String>,
        recommendations: Option<Vec<serde_json::Value>>,
        medical_specialties: Option<Vec<serde_json::Value>>,
        potential_conditions: Option<Vec<serde_json::Value>>,
        red_flags: Option<Vec<serde_json::Value>>,
    }

    let json = extract_json_object(text)?;
    let raw: RawAnalysis = serde_json::from_str(json).ok()?;

    let analysis = raw.analysis.filter(|a| !a.trim().is_empty())?;

    Some(AnalysisFields {
        analysis,
        urgency_level: UrgencyLevel::coerce(raw.urgency_level.as_deref().unwrap_or("")),
        recommendations: string_items(raw.recommendations),
        medical_specialties: string_items(raw.medical_specialties),
        red_flags: string_items(raw.red_flags),
        potential_conditions: condition_items(raw.potential_conditions),
    })
}

/// Collect the string members of a lenient JSON array.
fn string_items(items: Option<Vec<serde_json::Value>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Conditions arrive as strings or as {name, confidence} objects.
fn condition_items(items: Option<Vec<serde_json::Value>>) -> Vec<(String, f64)> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| {
            if let Some(name) = v.as_str() {
                return Some((name.to_string(), 0.5));
            }
            let name = v.get("name")?.as_str()?.to_string();
            let confidence = v
                .get("confidence")
                .and_then(|c| c.as_f64())
                .unwrap_or(0.5)
                .clamp(0.0, 1.0);
            Some((name, confidence))
        })
        .collect()
}

fn fallback_analysis(symptoms: &[SymptomRecord]) -> AnalysisFields {
    let urgency = if symptoms.iter().any(|s| s.severity >= 8) {
        UrgencyLevel::High
    } else {
        UrgencyLevel::Medium
    };

    AnalysisFields {
        analysis: "Symptom analysis is temporarily unavailable. \
                   Please consult with a healthcare provider."
            .into(),
        urgency_level: urgency,
        recommendations: vec![
            "Consult with a healthcare provider for proper evaluation".into(),
        ],
        medical_specialties: vec!["General Practice".into()],
        red_flags: vec![],
        potential_conditions: vec![],
    }
}

/// Persist advisory links for conditions matching the reference table.
fn link_reference_conditions(
    state: &AppState,
    user_id: Uuid,
    pattern_id: &str,
    analysis: &AnalysisFields,
) -> Result<Vec<RelatedCondition>, JournalError> {
    if analysis.potential_conditions.is_empty() {
        return Ok(vec![]);
    }

    let conn = state.open_db()?;
    let mut related = Vec::new();

    for (name, confidence) in &analysis.potential_conditions {
        let Some(diagnosis) = diagnosis_repo::find_diagnosis_by_name(&conn, name)? else {
            continue;
        };
        diagnosis_repo::insert_diagnosis_result(
            &conn,
            &DiagnosisResult {
                id: Uuid::new_v4(),
                pattern_id: pattern_id.to_string(),
                user_id,
                diagnosis_id: diagnosis.id,
                confidence: *confidence,
                created_at: now(),
            },
        )?;
        related.push(RelatedCondition {
            name: diagnosis.name,
            icd10_code: diagnosis.icd10_code,
            confidence: *confidence,
        });
    }
    Ok(related)
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn validate_entry(entry: &SymptomEntry) -> Result<(), JournalError> {
    if entry.name.trim().is_empty() {
        return Err(JournalError::Validation("Symptom name is required".into()));
    }
    if entry.name.len() > 200 {
        return Err(JournalError::Validation(
            "Symptom name too long (max 200 chars)".into(),
        ));
    }
    if !(1..=10).contains(&entry.severity) {
        return Err(JournalError::Validation(
            "Severity must be between 1 and 10".into(),
        ));
    }
    if entry.duration_hours.is_some_and(|h| h < 0) {
        return Err(JournalError::Validation(
            "Duration cannot be negative".into(),
        ));
    }
    Ok(())
}

fn onset_from_duration(
    recorded_at: chrono::NaiveDateTime,
    duration_hours: Option<i64>,
) -> chrono::NaiveDateTime {
    match duration_hours {
        Some(hours) => recorded_at - Duration::hours(hours),
        None => recorded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::user::insert_user;
    use crate::db::repository::user::tests::sample_user;
    use crate::llm::ollama::MockLlmClient;
    use crate::state::tests::test_state;

    fn seeded_state(llm: MockLlmClient) -> (AppState, Uuid, tempfile::TempDir) {
        let (state, tmp) = test_state(llm);
        let user = sample_user();
        {
            let conn = state.open_db().unwrap();
            insert_user(&conn, &user).unwrap();
        }
        (state, user.id, tmp)
    }

    fn entry(name: &str, severity: u8, duration_hours: Option<i64>) -> SymptomEntry {
        SymptomEntry {
            name: name.into(),
            description: None,
            severity,
            location: None,
            duration_hours,
            triggers: vec![],
            alleviating_factors: vec![],
            associated_symptoms: vec![],
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn severity_bounds_are_enforced() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));

        for bad in [0u8, 11, 200] {
            let result = record_symptom(&state, user_id, entry("headache", bad, None)).await;
            assert!(
                matches!(result, Err(JournalError::Validation(_))),
                "severity {bad} should be rejected"
            );
        }

        for good in [1u8, 5, 10] {
            let result = record_symptom(&state, user_id, entry("headache", good, None)).await;
            assert!(result.is_ok(), "severity {good} should be accepted");
        }
    }

    #[tokio::test]
    async fn onset_derived_from_duration() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));

        let symptom = record_symptom(&state, user_id, entry("back pain", 4, Some(48)))
            .await
            .unwrap();

        let expected = symptom.recorded_at - Duration::hours(48);
        let delta = (symptom.onset_date - expected).num_seconds().abs();
        assert!(delta <= 1, "onset should be recorded_at - 48h, off by {delta}s");

        let instant = record_symptom(&state, user_id, entry("back pain", 4, None))
            .await
            .unwrap();
        assert_eq!(instant.onset_date, instant.recorded_at);
    }

    #[tokio::test]
    async fn category_comes_from_llm_with_keyword_fallback() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::failing("down"));
        let symptom = record_symptom(&state, user_id, entry("cough", 3, None))
            .await
            .unwrap();
        assert_eq!(symptom.category, SymptomCategory::Respiratory);

        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("neurological"));
        let symptom = record_symptom(&state, user_id, entry("vertigo", 3, None))
            .await
            .unwrap();
        assert_eq!(symptom.category, SymptomCategory::Neurological);
    }

    #[tokio::test]
    async fn statistics_on_empty_window_are_zeroed() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));

        let stats = compute_statistics(&state, user_id, 30).unwrap();
        assert_eq!(stats.total_symptoms, 0);
        assert_eq!(stats.average_severity, 0.0);
        assert!(stats.most_common_category.is_none());
        assert!(stats.category_distribution.is_empty());
        assert!(stats.severity_distribution.is_empty());
        assert!(stats.trending_symptoms.is_empty());
    }

    #[tokio::test]
    async fn statistics_aggregate_correctly() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));

        for (name, severity) in [("headache", 4), ("headache", 6), ("back pain", 8)] {
            record_symptom(&state, user_id, entry(name, severity, None))
                .await
                .unwrap();
        }

        let stats = compute_statistics(&state, user_id, 30).unwrap();
        assert_eq!(stats.total_symptoms, 3);
        assert_eq!(stats.average_severity, 6.0);
        assert_eq!(stats.most_common_category, Some(SymptomCategory::Pain));
        assert_eq!(stats.category_distribution.get("pain"), Some(&3));
        assert_eq!(stats.severity_distribution.get(&4), Some(&1));
        assert_eq!(stats.trending_symptoms[0].name, "headache");
        assert_eq!(stats.trending_symptoms[0].count, 2);
    }

    #[tokio::test]
    async fn update_recomputes_derived_fields() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));
        let symptom = record_symptom(&state, user_id, entry("headache", 3, None))
            .await
            .unwrap();

        let updated = update_symptom(&state, user_id, symptom.id, entry("headache", 9, Some(24)))
            .await
            .unwrap();
        assert_eq!(updated.severity, 9);
        assert_eq!(updated.severity_level, SeverityLevel::Critical);
        assert_eq!(updated.duration_hours, Some(24));
        assert_eq!(updated.recorded_at, symptom.recorded_at);
    }

    #[tokio::test]
    async fn update_unknown_symptom_is_not_found() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));
        let result = update_symptom(&state, user_id, Uuid::new_v4(), entry("x", 5, None)).await;
        assert!(matches!(result, Err(JournalError::NotFound)));
    }

    #[tokio::test]
    async fn analyze_requires_owned_ids() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::succeeding("pain"));
        let symptom = record_symptom(&state, user_id, entry("headache", 5, None))
            .await
            .unwrap();

        let result = analyze_pattern(&state, user_id, &[symptom.id, Uuid::new_v4()], None).await;
        assert!(matches!(result, Err(JournalError::NotFound)));

        let result = analyze_pattern(&state, user_id, &[], None).await;
        assert!(matches!(result, Err(JournalError::Validation(_))));
    }

    #[tokio::test]
    async fn analyze_parses_structured_response() {
        let response = r#"Here is my analysis:
{
  "analysis": "The pattern suggests recurring tension-type headaches.",
  "urgency_level": "medium",
  "recommendations": ["Track sleep patterns", "Stay hydrated"],
  "medical_specialties": ["Neurology"],
  "potential_conditions": [{"name": "tension headache", "confidence": 0.7}],
  "red_flags": []
}"#;
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::with_script(vec![
            Ok("pain".into()),
            Ok(response.into()),
        ]));

        let symptom = record_symptom(&state, user_id, entry("headache", 5, None))
            .await
            .unwrap();
        let pattern = analyze_pattern(&state, user_id, &[symptom.id], None)
            .await
            .unwrap();

        assert!(pattern.pattern_id.starts_with("pattern_"));
        assert_eq!(pattern.urgency_level, UrgencyLevel::Medium);
        assert_eq!(pattern.recommendations.len(), 2);
        assert_eq!(pattern.related_conditions.len(), 1);
        assert_eq!(pattern.related_conditions[0].name, "tension headache");
        assert_eq!(pattern.related_conditions[0].icd10_code.as_deref(), Some("G44.2"));

        // The advisory link was persisted
        let conn = state.open_db().unwrap();
        let results =
            diagnosis_repo::list_results_for_pattern(&conn, &pattern.pattern_id).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].confidence - 0.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn analyze_falls_back_with_severity_urgency() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::with_script(vec![
            Ok("pain".into()),
            Ok("pain".into()),
            Err("down".into()),
        ]));

        let mild = record_symptom(&state, user_id, entry("headache", 5, None))
            .await
            .unwrap();
        let severe = record_symptom(&state, user_id, entry("chest pain", 9, None))
            .await
            .unwrap();

        let pattern = analyze_pattern(&state, user_id, &[mild.id, severe.id], None)
            .await
            .unwrap();

        assert!(pattern.pattern_id.starts_with("fallback_"));
        assert_eq!(pattern.urgency_level, UrgencyLevel::High);
        assert!(!pattern.recommendations.is_empty());
        assert_eq!(pattern.medical_specialties, vec!["General Practice"]);
    }

    #[tokio::test]
    async fn analyze_unparseable_output_falls_back_medium() {
        let (state, user_id, _tmp) = seeded_state(MockLlmClient::with_script(vec![
            Ok("pain".into()),
            Ok("I think you should see a doctor, no JSON from me today.".into()),
        ]));

        let symptom = record_symptom(&state, user_id, entry("headache", 5, None))
            .await
            .unwrap();
        let pattern = analyze_pattern(&state, user_id, &[symptom.id], None)
            .await
            .unwrap();

        assert!(pattern.pattern_id.starts_with("fallback_"));
        assert_eq!(pattern.urgency_level, UrgencyLevel::Medium);
    }
}
