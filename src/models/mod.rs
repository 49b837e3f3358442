pub mod conversation;
pub mod diagnosis;
pub mod enums;
pub mod report;
pub mod symptom;
pub mod user;

pub use conversation::{Conversation, Message};
pub use diagnosis::{Diagnosis, DiagnosisResult};
pub use report::MedicalReport;
pub use symptom::SymptomRecord;
pub use user::User;
