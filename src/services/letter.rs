// src/services/letter.rs
//! Letter content and numbering. Everything here is pure: callers pass
//! the clock reading in.

use crate::models::{
    document::{LetterOverrides, LetterPreview},
    lor_request::LorRequest,
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use uuid::Uuid;

pub const PAPER_CODE: &str = "DSE4A";
pub const DEFAULT_DESIGNATION: &str = "Assistant Professor";

/// Academic years run July to June: 2025-01-15 is in "2024-25",
/// 2025-08-01 is in "2025-26".
pub fn academic_year(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= 7 {
        format!("{}-{:02}", year, (year + 1).rem_euclid(100))
    } else {
        format!("{}-{:02}", year - 1, year.rem_euclid(100))
    }
}

/// Display number printed on the letter. Deterministic for a given day
/// and roll number; not unique.
pub fn institutional_reference(date: NaiveDate, class_roll_number: &str) -> String {
    format!(
        "SXC/BCA/Internship/{}/{}/{}.{}.{}",
        academic_year(date),
        class_roll_number,
        date.day(),
        date.month(),
        date.year()
    )
}

/// Storage key for an issued document: "LOR" + yyyyMMddHHmmss + 8 uppercase
/// random characters.
pub fn opaque_reference<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let token: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("LOR{}{}", now.format("%Y%m%d%H%M%S"), token)
}

/// `LOR_{examinationNumber}_{professorUserId}_{opaqueRef}.html`
pub fn document_file_name(examination_number: &str, professor_user_id: &str, reference: &str) -> String {
    format!("LOR_{}_{}_{}.html", examination_number, professor_user_id, reference)
}

/// Default letter body built from the request snapshot.
pub fn default_body(request: &LorRequest) -> String {
    format!(
        "With reference to the above, this is to inform you that Mr. {name} bearing \
Class Roll Number {roll}, Registration Number {reg} and Examination Roll Number \
{exam} is a bonafide student of {course}, \
Department of Computer Science, St. Xavier's College, Ranchi. He is currently studying in {sem} \
semester. In {sem} semester he has to undertake an internship to meet the credit requirement as per \
paper BCA{paper}.\n\n\
He is keenly interested in undertaking internship in your esteemed organization.\n\n\
We request you kindly to grant him permission to undertake the internship. It is required to be \
ensured that the time slot allotted to him to undergo the internship is not matching with his class \
timings. After successful completion of the internship, he has to submit a project report duly signed \
/ verified by your organization along with attendance report to the Department of Computer \
Science, St. Xavier's College, Ranchi.\n\n\
His character and conduct is good to the best of our knowledge.\n\n\
Thank you in advance.\n\
With regards,",
        name = request.student_name,
        roll = request.class_roll_number,
        reg = request.registration_number,
        exam = request.examination_number,
        course = request.course,
        sem = request.semester,
        paper = PAPER_CODE,
    )
}

/// The letter as it would be issued with no professor edits.
pub fn default_preview(
    request: &LorRequest,
    professor_name: &str,
    professor_department: &str,
    today: NaiveDate,
) -> LetterPreview {
    LetterPreview {
        student_name: request.student_name.clone(),
        class_roll_number: request.class_roll_number.clone(),
        registration_number: request.registration_number.clone(),
        examination_number: request.examination_number.clone(),
        course: request.course.clone(),
        semester: request.semester.clone(),
        session: request.session.clone(),
        institute_company: request.institute_company.clone(),

        recipient_title: "The General Manager".into(),
        recipient_department: "Human Resource Department".into(),
        recipient_company: request.institute_company.clone(),
        recipient_location: "Ranchi".into(),

        subject: "Permission regarding internship in your esteemed organization.".into(),
        salutation: "Dear Sir / Madam,".into(),
        main_content: default_body(request),
        paper_code: PAPER_CODE.into(),

        professor_name: professor_name.to_string(),
        professor_department: professor_department.to_string(),
        professor_designation: DEFAULT_DESIGNATION.into(),

        reference_number: institutional_reference(today, &request.class_roll_number),
        current_date: today.format("%d %B %Y").to_string(),
    }
}

impl LetterPreview {
    /// Replaces fields the professor supplied; blank overrides are ignored.
    pub fn apply(mut self, overrides: LetterOverrides) -> Self {
        fn set(field: &mut String, value: Option<String>) {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *field = v;
            }
        }
        set(&mut self.recipient_title, overrides.recipient_title);
        set(&mut self.recipient_department, overrides.recipient_department);
        set(&mut self.recipient_company, overrides.recipient_company);
        set(&mut self.recipient_location, overrides.recipient_location);
        set(&mut self.subject, overrides.subject);
        set(&mut self.salutation, overrides.salutation);
        set(&mut self.main_content, overrides.main_content);
        set(&mut self.professor_designation, overrides.professor_designation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lor_request::RequestStatus;
    use chrono::{Local, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> LorRequest {
        LorRequest {
            id: 1,
            student_id: 10,
            professor_id: 20,
            student_name: "Ankit Lakra".into(),
            registration_number: "22SXC051718".into(),
            examination_number: "22VBCA051718".into(),
            course: "BCA".into(),
            semester: "VI".into(),
            session: "2022-25".into(),
            class_roll_number: "42".into(),
            institute_company: "Acme Systems".into(),
            status: RequestStatus::Approved,
            professor_comments: Some(String::new()),
            requested_at: Utc::now(),
            processed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn academic_year_turns_over_in_july() {
        assert_eq!(academic_year(date(2025, 1, 15)), "2024-25");
        assert_eq!(academic_year(date(2025, 6, 30)), "2024-25");
        assert_eq!(academic_year(date(2025, 7, 1)), "2025-26");
        assert_eq!(academic_year(date(2025, 8, 1)), "2025-26");
        assert_eq!(academic_year(date(2099, 9, 1)), "2099-00");
        assert_eq!(academic_year(date(2010, 3, 1)), "2009-10");
    }

    #[test]
    fn institutional_reference_format() {
        assert_eq!(
            institutional_reference(date(2025, 3, 5), "42"),
            "SXC/BCA/Internship/2024-25/42/5.3.2025"
        );
        assert_eq!(
            institutional_reference(date(2025, 11, 21), "7"),
            "SXC/BCA/Internship/2025-26/7/21.11.2025"
        );
    }

    #[test]
    fn opaque_reference_shape() {
        let now = Local::now();
        let a = opaque_reference(&now);
        let b = opaque_reference(&now);
        assert_eq!(a.len(), 3 + 14 + 8);
        assert!(a.starts_with(&format!("LOR{}", now.format("%Y%m%d%H%M%S"))));
        let token = &a[17..];
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn default_body_uses_snapshot_fields() {
        let body = default_body(&request());
        assert!(body.contains("Mr. Ankit Lakra bearing Class Roll Number 42"));
        assert!(body.contains("Examination Roll Number 22VBCA051718"));
        assert!(body.contains("paper BCADSE4A"));
        assert_eq!(body.matches("VI semester").count(), 2);
    }

    #[test]
    fn overrides_apply_field_by_field() {
        let preview = default_preview(&request(), "Dr. Roy", "Computer Science", date(2025, 8, 1));
        assert_eq!(preview.reference_number, "SXC/BCA/Internship/2025-26/42/1.8.2025");
        assert_eq!(preview.current_date, "01 August 2025");

        let edited = preview.clone().apply(LetterOverrides {
            subject: Some("Internship permission".into()),
            recipient_title: Some("   ".into()),
            professor_designation: Some("Associate Professor".into()),
            ..Default::default()
        });
        assert_eq!(edited.subject, "Internship permission");
        assert_eq!(edited.recipient_title, preview.recipient_title);
        assert_eq!(edited.professor_designation, "Associate Professor");
        assert_eq!(edited.main_content, preview.main_content);
    }
}
