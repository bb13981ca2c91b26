use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Teacher record as the transfer core needs to see it. The full CRUD
/// surface for teachers and citizens lives outside this crate; the core
/// only reads the fields that drive eligibility, matching, and citizen
/// routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub teacher_id: String,
    pub citizen_id: String,
    pub teacher_name: String,
    pub current_district: String,
    pub subjects: Vec<String>,
    pub years_in_service_district: u32,
    pub phone: Option<String>,
}

impl TeacherProfile {
    /// Limited view shared with a matched counterpart. The teacher_id is
    /// deliberately withheld.
    pub fn public_view(&self) -> TeacherPublicProfile {
        TeacherPublicProfile {
            teacher_name: self.teacher_name.clone(),
            current_district: self.current_district.clone(),
            years_in_service_district: self.years_in_service_district,
            phone: self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherPublicProfile {
    pub teacher_name: String,
    pub current_district: String,
    pub years_in_service_district: u32,
    pub phone: Option<String>,
}

/// Contact details used for the best-effort email hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenContact {
    pub citizen_id: String,
    pub full_name: String,
    pub email: Option<String>,
}

/// Read-only lookup seam over the citizen/teacher records owned by the
/// surrounding CRUD layer.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn teacher(&self, teacher_id: &str) -> Result<Option<TeacherProfile>, StoreError>;
    async fn contact(&self, citizen_id: &str) -> Result<Option<CitizenContact>, StoreError>;
}

/// Process-local directory used by the api service and the test suites.
#[derive(Default)]
pub struct InMemoryDirectory {
    teachers: Mutex<HashMap<String, TeacherProfile>>,
    contacts: Mutex<HashMap<String, CitizenContact>>,
}

impl InMemoryDirectory {
    pub fn upsert_teacher(&self, profile: TeacherProfile) {
        let mut teachers = self.teachers.lock().expect("directory mutex poisoned");
        teachers.insert(profile.teacher_id.clone(), profile);
    }

    pub fn upsert_contact(&self, contact: CitizenContact) {
        let mut contacts = self.contacts.lock().expect("directory mutex poisoned");
        contacts.insert(contact.citizen_id.clone(), contact);
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn teacher(&self, teacher_id: &str) -> Result<Option<TeacherProfile>, StoreError> {
        let teachers = self
            .teachers
            .lock()
            .map_err(|_| StoreError::Unavailable("teacher directory poisoned".to_string()))?;
        Ok(teachers.get(teacher_id).cloned())
    }

    async fn contact(&self, citizen_id: &str) -> Result<Option<CitizenContact>, StoreError> {
        let contacts = self
            .contacts
            .lock()
            .map_err(|_| StoreError::Unavailable("contact directory poisoned".to_string()))?;
        Ok(contacts.get(citizen_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn public_view_withholds_teacher_id() {
        let directory = InMemoryDirectory::default();
        directory.upsert_teacher(TeacherProfile {
            teacher_id: "TEA00001".to_string(),
            citizen_id: "CIT00001".to_string(),
            teacher_name: "N. Perera".to_string(),
            current_district: "Colombo".to_string(),
            subjects: vec!["Mathematics".to_string()],
            years_in_service_district: 7,
            phone: Some("0712345678".to_string()),
        });

        let profile = directory
            .teacher("TEA00001")
            .await
            .expect("lookup succeeds")
            .expect("teacher present");
        let view = profile.public_view();
        assert_eq!(view.teacher_name, "N. Perera");
        assert_eq!(view.current_district, "Colombo");
        let serialized = serde_json::to_value(&view).expect("serializes");
        assert!(serialized.get("teacher_id").is_none());
    }
}
