//! Keyword heuristics over message and symptom text.
//!
//! These are intentionally imprecise signals — fixed case-insensitive
//! substring matches, not medical logic. They annotate messages at creation
//! time and back the category classifier when the LLM is unavailable.

use std::str::FromStr;

use crate::llm::prompt::{categorize_prompt, CATEGORIZE_SYSTEM_PROMPT};
use crate::llm::{GenerationOutcome, GenerationRequest, LlmClient};
use crate::models::enums::SymptomCategory;

const SYMPTOM_KEYWORDS: &[&str] = &[
    "pain", "ache", "hurt", "sore", "fever", "headache", "nausea", "vomit", "cough", "sneeze",
    "tired", "fatigue", "dizzy", "swollen", "rash", "itch", "bleeding", "shortness", "breath",
    "chest",
];

const ADVICE_KEYWORDS: &[&str] = &[
    "recommend",
    "suggest",
    "should take",
    "prescription",
    "medication",
    "treatment",
    "see a doctor",
    "emergency",
    "urgent care",
];

const FOLLOWUP_INDICATORS: &[&str] = &[
    "?",
    "tell me more",
    "can you describe",
    "how long",
    "when did",
    "have you tried",
    "any other symptoms",
];

/// Keyword table for the fallback categorizer. First match wins, so the
/// more specific categories come before the broad ones.
const CATEGORY_KEYWORDS: &[(SymptomCategory, &[&str])] = &[
    (
        SymptomCategory::Respiratory,
        &["cough", "breath", "wheez", "lung", "congestion", "sneez"],
    ),
    (
        SymptomCategory::Gastrointestinal,
        &["nausea", "vomit", "stomach", "diarrhea", "constipation", "digestive", "heartburn"],
    ),
    (
        SymptomCategory::Cardiovascular,
        &["chest pain", "palpitation", "heart", "blood pressure"],
    ),
    (
        SymptomCategory::Neurological,
        &["headache", "dizzy", "dizziness", "numbness", "tingling", "seizure", "migraine"],
    ),
    (
        SymptomCategory::Skin,
        &["rash", "skin", "itch", "hives", "bruis"],
    ),
    (
        SymptomCategory::Constitutional,
        &["fever", "temperature", "chills", "fatigue", "weight loss", "night sweat"],
    ),
    (
        SymptomCategory::Genitourinary,
        &["urinat", "urine", "bladder", "kidney"],
    ),
    (
        SymptomCategory::Musculoskeletal,
        &["joint", "muscle", "back pain", "stiff", "sprain"],
    ),
    (
        SymptomCategory::Pain,
        &["pain", "ache", "hurt", "sore"],
    ),
];

/// Whether free text appears to describe symptoms.
pub fn contains_symptom_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    SYMPTOM_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Whether free text appears to contain medical advice.
pub fn contains_advice_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    ADVICE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Whether a reply invites a follow-up from the patient.
pub fn requires_followup(text: &str) -> bool {
    let lower = text.to_lowercase();
    FOLLOWUP_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Deterministic keyword categorization, used directly as the LLM fallback.
pub fn keyword_category(name: &str, description: Option<&str>) -> SymptomCategory {
    let combined = format!(
        "{} {}",
        name.to_lowercase(),
        description.unwrap_or("").to_lowercase()
    );

    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|keyword| combined.contains(keyword)) {
            return *category;
        }
    }
    SymptomCategory::Other
}

/// Categorize a symptom: one LLM classification attempt (single lowercase
/// word expected back), keyword matching when the call fails or the answer
/// is not a known category.
pub async fn categorize_symptom(
    llm: &dyn LlmClient,
    name: &str,
    description: Option<&str>,
) -> SymptomCategory {
    let request = GenerationRequest::new(categorize_prompt(name, description))
        .with_system(CATEGORIZE_SYSTEM_PROMPT)
        .with_temperature(0.1);

    match llm.generate(request).await {
        GenerationOutcome::Success { text, .. } => {
            match SymptomCategory::from_str(text.trim().to_lowercase().as_str()) {
                Ok(category) => category,
                Err(_) => keyword_category(name, description),
            }
        }
        GenerationOutcome::Failure { reason, .. } => {
            tracing::warn!(%reason, "Symptom categorization fell back to keywords");
            keyword_category(name, description)
        }
    }
}
