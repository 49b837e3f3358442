//! Prompt templates for every LLM call the service makes.
//!
//! Keeping all of them in one place makes the wire contract reviewable:
//! each generation path states its system prompt, its expected output
//! shape, and (in the structured cases) the JSON schema it asks for.

use crate::models::enums::ReportType;
use crate::models::{SymptomRecord, User};

/// System prompt for ongoing consultation turns.
pub const CHAT_SYSTEM_PROMPT: &str = "\
You are a compassionate medical assistant chatbot helping patients describe their symptoms.

Your approach should be:
- Empathetic and reassuring
- Professional but approachable
- Focused on gathering relevant medical information
- Always emphasize that you're not replacing professional medical care

Guidelines:
- Ask one main question at a time
- Show understanding of patient concerns
- Gather specific details about symptoms
- Recognize when immediate medical care might be needed
- Provide appropriate disclaimers about your limitations";

/// System prompt for the first assistant turn of a new consultation.
pub const WELCOME_SYSTEM_PROMPT: &str = "\
A new patient has started a medical consultation. Provide a warm, professional welcome that:
1. Acknowledges their concern
2. Explains your role as a medical assistant (not a doctor)
3. Asks a relevant follow-up question about their symptoms
4. Reassures them about privacy and the process

Keep it concise but empathetic.";

/// System prompt for single-word symptom categorization.
pub const CATEGORIZE_SYSTEM_PROMPT: &str = "\
You are a medical classification system. Categorize symptoms into one of these specific categories:

Categories:
- pain
- respiratory
- gastrointestinal
- neurological
- cardiovascular
- skin
- constitutional
- genitourinary
- musculoskeletal
- other

Respond with ONLY the category name (lowercase). No explanation needed.";

/// System prompt for structured symptom-pattern analysis.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a medical analysis AI assistant. Analyze the provided symptoms and return a structured JSON response.

IMPORTANT:
- You are NOT diagnosing - only providing analysis for healthcare providers
- Always recommend professional medical evaluation
- Be thorough but appropriately cautious

Return your response as valid JSON with this structure:
{
  \"analysis\": \"Detailed analysis of the symptom pattern\",
  \"urgency_level\": \"low|medium|high|emergency\",
  \"recommendations\": [\"recommendation1\", \"recommendation2\"],
  \"medical_specialties\": [\"specialty1\", \"specialty2\"],
  \"potential_conditions\": [{\"name\": \"condition\", \"confidence\": 0.0}],
  \"red_flags\": [\"flag1\", \"flag2\"]
}";

/// User prompt for a new consultation's welcome turn.
pub fn welcome_prompt(initial_message: &str) -> String {
    format!(
        "The patient's opening message is:\n\"{initial_message}\"\n\n\
         Please respond with your welcome."
    )
}

/// User prompt for an ongoing consultation turn.
pub fn chat_prompt(history: &str, new_message: &str) -> String {
    format!(
        "Recent conversation:\n{history}\n\n\
         New patient message: {new_message}\n\n\
         Please respond appropriately to continue gathering symptom information \
         or provide helpful guidance."
    )
}

/// User prompt for symptom categorization.
pub fn categorize_prompt(name: &str, description: Option<&str>) -> String {
    let mut text = format!("Symptom: {name}");
    if let Some(description) = description {
        text.push_str(&format!("\nDescription: {description}"));
    }
    text
}

/// User prompt for symptom-pattern analysis.
pub fn analysis_prompt(symptoms: &[SymptomRecord], additional_context: Option<&str>) -> String {
    let mut text = String::from("SYMPTOMS ANALYSIS REQUEST:\n\n");

    for (i, symptom) in symptoms.iter().enumerate() {
        text.push_str(&format!("Symptom {}:\n", i + 1));
        text.push_str(&format!("  Name: {}\n", symptom.name));
        text.push_str(&format!("  Severity: {}/10\n", symptom.severity));
        text.push_str(&format!("  Category: {}\n", symptom.category.as_str()));
        text.push_str(&format!(
            "  Location: {}\n",
            symptom.location.as_deref().unwrap_or("Not specified")
        ));
        text.push_str(&format!("  Onset: {}\n", symptom.onset_date));
        if let Some(hours) = symptom.duration_hours {
            text.push_str(&format!("  Duration: {hours} hours\n"));
        }
        if let Some(ref description) = symptom.description {
            text.push_str(&format!("  Description: {description}\n"));
        }
        if !symptom.triggers.is_empty() {
            text.push_str(&format!("  Triggers: {}\n", symptom.triggers.join(", ")));
        }
        if !symptom.alleviating_factors.is_empty() {
            text.push_str(&format!(
                "  Relieving factors: {}\n",
                symptom.alleviating_factors.join(", ")
            ));
        }
        if !symptom.associated_symptoms.is_empty() {
            text.push_str(&format!(
                "  Associated symptoms: {}\n",
                symptom.associated_symptoms.join(", ")
            ));
        }
        text.push('\n');
    }

    if let Some(context) = additional_context {
        text.push_str(&format!("Additional Context: {context}\n\n"));
    }

    text.push_str("Please analyze these symptoms and provide structured insights in JSON format.");
    text
}

/// System prompt for report generation, parameterized on report type.
pub fn report_system_prompt(report_type: ReportType) -> String {
    format!(
        "You are a medical report generation system creating a {} report.\n\n\
         Generate a structured medical report with appropriate sections. Return as JSON:\n\
         {{\n\
           \"title\": \"Report title\",\n\
           \"summary\": \"Executive summary for healthcare providers\",\n\
           \"key_findings\": [\"finding1\", \"finding2\"],\n\
           \"recommendations\": [\"recommendation1\", \"recommendation2\"],\n\
           \"urgency_level\": \"low|medium|high|emergency\"\n\
         }}\n\n\
         Focus on:\n\
         - Professional medical language\n\
         - Objective symptom documentation\n\
         - Appropriate urgency assessment\n\
         - Clear recommendations for healthcare providers",
        report_type.as_str()
    )
}

/// Patient information block embedded in report prompts.
pub fn patient_block(user: &User) -> String {
    let mut text = String::from("PATIENT INFORMATION:\n");
    if let Some(ref name) = user.full_name {
        text.push_str(&format!("Name: {name}\n"));
    }
    if let Some(age) = user.age {
        text.push_str(&format!("Age: {age}\n"));
    }
    if let Some(ref gender) = user.gender {
        text.push_str(&format!("Gender: {gender}\n"));
    }
    if let Some(ref history) = user.medical_history {
        text.push_str(&format!("Medical History: {history}\n"));
    }
    if let Some(ref medications) = user.current_medications {
        text.push_str(&format!("Current Medications: {medications}\n"));
    }
    if let Some(ref allergies) = user.allergies {
        text.push_str(&format!("Known Allergies: {allergies}\n"));
    }
    text
}

/// User prompt for a single-conversation report.
pub fn report_prompt(
    report_type: ReportType,
    user: &User,
    chief_complaint: Option<&str>,
    started_at: &str,
    transcript: &str,
) -> String {
    format!(
        "MEDICAL REPORT GENERATION - {}\n\n\
         {}\n\
         CONSULTATION CONTEXT:\n\
         Chief Complaint: {}\n\
         Consultation Date: {}\n\n\
         CONSULTATION TRANSCRIPT:\n{}\n\n\
         Please generate a comprehensive {} report in JSON format.",
        report_type.as_str().to_uppercase(),
        patient_block(user),
        chief_complaint.unwrap_or("Not specified"),
        started_at,
        transcript,
        report_type.as_str()
    )
}

/// User prompt for the consolidated all-conversations summary report.
pub fn summary_prompt(user: &User, excerpts: &str) -> String {
    format!(
        "MEDICAL REPORT GENERATION - SUMMARY\n\n\
         {}\n\
         CONSULTATION HISTORY (most recent first, excerpts capped per conversation):\n{}\n\n\
         Please generate one consolidated summary report covering all consultations, \
         in JSON format.",
        patient_block(user),
        excerpts
    )
}
