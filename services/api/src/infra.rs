use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use govease_transfers::directory::{CitizenContact, InMemoryDirectory, TeacherProfile};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Teacher and citizen CRUD lives in the surrounding platform; this service
/// runs against a seeded in-memory directory so the matching workflow can
/// be exercised end to end.
pub(crate) fn demo_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::default();
    let roster = [
        ("TEA00001", "CIT00001", "Nimal Perera", "Colombo", vec!["Mathematics"], 7u32),
        ("TEA00002", "CIT00002", "Kumari Silva", "Kandy", vec!["Mathematics"], 9),
        ("TEA00003", "CIT00003", "Ruwan Fernando", "Galle", vec!["Science", "Chemistry"], 11),
        ("TEA00004", "CIT00004", "Anusha Jayawardena", "Matara", vec!["Science", "Chemistry"], 6),
        ("TEA00005", "CIT00005", "Sunil Bandara", "Kurunegala", vec!["English"], 3),
    ];
    for (teacher_id, citizen_id, name, district, subjects, years) in roster {
        directory.upsert_teacher(TeacherProfile {
            teacher_id: teacher_id.to_string(),
            citizen_id: citizen_id.to_string(),
            teacher_name: name.to_string(),
            current_district: district.to_string(),
            subjects: subjects.into_iter().map(str::to_string).collect(),
            years_in_service_district: years,
            phone: None,
        });
        directory.upsert_contact(CitizenContact {
            citizen_id: citizen_id.to_string(),
            full_name: name.to_string(),
            email: Some(format!("{}@example.lk", citizen_id.to_lowercase())),
        });
    }
    directory
}
