use serde::{Deserialize, Serialize};

/// Response envelope returned by `GET /api/medical-data`.
///
/// Every field is optional: the backend omits or nulls anything the record
/// does not carry, and unknown fields (`user_id`, timestamps, ...) are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MedicalDataEnvelope {
    pub data: Option<MedicalRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MedicalRecord {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub medical_info: Option<MedicalInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MedicalInfo {
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub chronic_conditions: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub additional_notes: Option<String>,
}

/// Default for identity fields (name is special-cased to "Unknown").
const SCALAR_DEFAULT: &str = "N/A";
/// Default for list-like medical fields.
const LIST_DEFAULT: &str = "None";

impl MedicalDataEnvelope {
    /// Render the record as the fixed one-sentence summary spoken to the
    /// user. Missing fields fall back to `"N/A"` (identity fields) or
    /// `"None"` (list-like fields); this never fails.
    #[must_use]
    pub fn summarize(&self) -> String {
        let record = self.data.as_ref();
        let info = record.and_then(|r| r.medical_info.as_ref());

        let field = |value: Option<&String>, default: &str| -> String {
            value.map_or_else(|| default.to_string(), Clone::clone)
        };

        format!(
            "The medical data for {name} is: \
             Date of birth: {dob}, \
             Blood type: {blood_type}, \
             Allergies: {allergies}, \
             Medications: {medications}, \
             Conditions: {conditions}, \
             Emergency contact: {contact} at {phone}.",
            name = field(record.and_then(|r| r.name.as_ref()), "Unknown"),
            dob = field(record.and_then(|r| r.date_of_birth.as_ref()), SCALAR_DEFAULT),
            blood_type = field(info.and_then(|i| i.blood_type.as_ref()), SCALAR_DEFAULT),
            allergies = field(info.and_then(|i| i.allergies.as_ref()), LIST_DEFAULT),
            medications = field(info.and_then(|i| i.medications.as_ref()), LIST_DEFAULT),
            conditions = field(info.and_then(|i| i.chronic_conditions.as_ref()), LIST_DEFAULT),
            contact = field(info.and_then(|i| i.emergency_contact.as_ref()), SCALAR_DEFAULT),
            phone = field(info.and_then(|i| i.emergency_phone.as_ref()), SCALAR_DEFAULT),
        )
    }
}
