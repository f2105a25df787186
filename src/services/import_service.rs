// src/services/import_service.rs
use crate::{
    error::{AppError, AppResult},
    models::roster::{
        is_known_department, ImportReport, ProfessorRoster, ProfessorRosterInput, StudentRoster,
        StudentRosterInput, DEPARTMENTS,
    },
    services::roster_service,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use sqlx::SqlitePool;

const STUDENT_COLUMNS: usize = 4;
const PROFESSOR_COLUMNS: usize = 3;

pub fn student_csv_template() -> String {
    [
        "name,registrationNumber,examinationNumber,course",
        "John Doe,22SXC051718,22VBCA051718,Computer Science",
        "Jane Smith,22SXC051719,22VBCA051719,BCA",
        "# Instructions:",
        "# - name: Full name of the student",
        "# - registrationNumber: University registration number (e.g., 22SXC051718)",
        "# - examinationNumber: University examination number (e.g., 22VBCA051718)",
        "# - course: Course name (e.g., Computer Science, BCA, Mathematics)",
        "# - Remove the example rows and instruction lines before uploading",
        "",
    ]
    .join("\n")
}

pub fn professor_csv_template() -> String {
    let mut lines = vec![
        "name,userId,department".to_string(),
        "Dr. John Smith,PROF001,Computer Science".to_string(),
        "Dr. Jane Doe,PROF002,Mathematics".to_string(),
        "# Instructions:".to_string(),
        "# - name: Full name of the professor".to_string(),
        "# - userId: Unique user ID for login (e.g., PROF001, PROF026)".to_string(),
        "# - department: Department name from the following list:".to_string(),
    ];
    lines.push(format!("#   {}", DEPARTMENTS.join(", ")));
    lines.push("# - Remove the example rows and instruction lines before uploading".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Accumulates per-line outcomes.
struct Tally<T> {
    total_rows: usize,
    errors: Vec<String>,
    imported: Vec<T>,
}

impl<T> Tally<T> {
    fn new() -> Self {
        Self { total_rows: 0, errors: Vec::new(), imported: Vec::new() }
    }

    fn fail(&mut self, line: u64, message: impl AsRef<str>) {
        tracing::debug!("Import line {} rejected: {}", line, message.as_ref());
        self.errors.push(format!("Line {}: {}", line, message.as_ref()));
    }

    fn finish(self) -> ImportReport<T> {
        let success_count = self.imported.len();
        let error_count = self.errors.len();
        ImportReport {
            success: error_count == 0,
            total_rows: self.total_rows,
            success_count,
            error_count,
            message: format!(
                "Import completed: {} successful, {} errors out of {} total rows",
                success_count, error_count, self.total_rows
            ),
            errors: self.errors,
            imported_records: self.imported,
        }
    }
}

/// One data line: its physical line number and fields, or a parse failure.
enum Line {
    Record(u64, StringRecord),
    Unreadable(u64, String),
}

/// Splits the file into data lines after the header. `#` comments and blank
/// lines are skipped; only a file that is not text aborts the import.
fn read_lines(bytes: &[u8]) -> AppResult<Vec<Line>> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        tracing::error!("Roster file is not valid UTF-8: {}", e);
        AppError::ValidationFailed("roster file must be UTF-8 text".into())
    })?;

    let mut lines = Vec::new();
    let mut seen_header = false;
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !seen_header {
            seen_header = true;
            continue;
        }
        lines.push(match parse_fields(raw) {
            Ok(record) => Line::Record(line_no, record),
            Err(e) => Line::Unreadable(line_no, e.to_string()),
        });
    }
    Ok(lines)
}

/// Parses one line into trimmed fields, honouring CSV quoting.
fn parse_fields(raw: &str) -> Result<StringRecord, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());
    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

/// Imports student roster rows line by line. Each accepted row is stored
/// before the next line is checked, so in-file duplicates are caught.
pub async fn import_students(db_pool: &SqlitePool, bytes: &[u8]) -> AppResult<ImportReport<StudentRoster>> {
    let mut tally = Tally::new();

    for line in read_lines(bytes)? {
        tally.total_rows += 1;
        let (line_no, record) = match line {
            Line::Record(n, r) => (n, r),
            Line::Unreadable(n, msg) => {
                tally.fail(n, msg);
                continue;
            }
        };

        if record.len() != STUDENT_COLUMNS {
            tally.fail(line_no, format!("Expected {} fields, found {}", STUDENT_COLUMNS, record.len()));
            continue;
        }
        let input = StudentRosterInput {
            name: record[0].to_string(),
            registration_number: record[1].to_string(),
            examination_number: record[2].to_string(),
            course: record[3].to_string(),
        };
        if record.iter().any(str::is_empty) {
            tally.fail(line_no, "All fields are required");
            continue;
        }

        if roster_service::student_registration_exists(db_pool, &input.registration_number).await? {
            tally.fail(
                line_no,
                format!("Student with registration number {} already exists", input.registration_number),
            );
            continue;
        }
        if roster_service::student_examination_exists(db_pool, &input.examination_number).await? {
            tally.fail(
                line_no,
                format!("Student with examination number {} already exists", input.examination_number),
            );
            continue;
        }

        match roster_service::add_student(db_pool, input).await {
            Ok(saved) => tally.imported.push(saved),
            Err(e @ (AppError::Conflict(_) | AppError::ValidationFailed(_))) => tally.fail(line_no, e.to_string()),
            Err(e) => return Err(e),
        }
    }

    let report = tally.finish();
    tracing::info!("Student roster import: {}", report.message);
    Ok(report)
}

pub async fn import_professors(db_pool: &SqlitePool, bytes: &[u8]) -> AppResult<ImportReport<ProfessorRoster>> {
    let mut tally = Tally::new();

    for line in read_lines(bytes)? {
        tally.total_rows += 1;
        let (line_no, record) = match line {
            Line::Record(n, r) => (n, r),
            Line::Unreadable(n, msg) => {
                tally.fail(n, msg);
                continue;
            }
        };

        if record.len() != PROFESSOR_COLUMNS {
            tally.fail(line_no, format!("Expected {} fields, found {}", PROFESSOR_COLUMNS, record.len()));
            continue;
        }
        if record.iter().any(str::is_empty) {
            tally.fail(line_no, "All fields are required");
            continue;
        }
        let input = ProfessorRosterInput {
            name: record[0].to_string(),
            user_id: record[1].to_string(),
            department: record[2].to_string(),
        };

        if !is_known_department(&input.department) {
            tally.fail(
                line_no,
                format!(
                    "Invalid department '{}'. Valid departments: {}",
                    input.department,
                    DEPARTMENTS.join(", ")
                ),
            );
            continue;
        }
        if roster_service::professor_user_id_exists(db_pool, &input.user_id).await? {
            tally.fail(line_no, format!("Professor with user ID {} already exists", input.user_id));
            continue;
        }

        match roster_service::add_professor(db_pool, input).await {
            Ok(saved) => tally.imported.push(saved),
            Err(e @ (AppError::Conflict(_) | AppError::ValidationFailed(_))) => tally.fail(line_no, e.to_string()),
            Err(e) => return Err(e),
        }
    }

    let report = tally.finish();
    tracing::info!("Professor roster import: {}", report.message);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn in_file_duplicate_is_skipped_not_fatal() {
        let pool = test_pool().await;
        let file = "\
name,registrationNumber,examinationNumber,course
Asha Toppo,R1,E1,BCA
Binu Minz,R2,E1,BCA
Chetan Oraon,R3,E3,BCA
Divya Ekka,R4,E4,BCA
Esha Lakra,R5,E5,BCA
";
        let report = import_students(&pool, file.as_bytes()).await.unwrap();

        assert_eq!(report.total_rows, 5);
        assert_eq!(report.success_count, 4);
        assert_eq!(report.error_count, 1);
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Line 3:"), "{}", report.errors[0]);
        assert!(report.errors[0].contains("E1"));
        assert_eq!(roster_service::list_students(&pool).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn comments_blank_lines_and_bad_rows() {
        let pool = test_pool().await;
        let file = "\
# roster for 2025
name,registrationNumber,examinationNumber,course

Asha Toppo,R1,E1,BCA
only,three,fields
# trailing note
Binu Minz,,E2,BCA
";
        let report = import_students(&pool, file.as_bytes()).await.unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.success_count, 1);
        assert_eq!(
            report.errors,
            vec![
                "Line 5: Expected 4 fields, found 3".to_string(),
                "Line 7: All fields are required".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn professor_departments_are_checked_per_line() {
        let pool = test_pool().await;
        let file = "\
name,userId,department
Dr. Roy,PROF001,Computer Science
Dr. Sen,PROF002,Astrology
Dr. Das,PROF001,Physics
";
        let report = import_professors(&pool, file.as_bytes()).await.unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.imported_records[0].user_id, "PROF001");
        assert!(report.errors[0].starts_with("Line 3: Invalid department 'Astrology'"));
        assert!(report.errors[0].contains("Electronics and Communication"));
        assert_eq!(report.errors[1], "Line 4: Professor with user ID PROF001 already exists");
    }

    #[test]
    fn templates_parse_with_their_own_reader() {
        let lines = read_lines(student_csv_template().as_bytes()).unwrap();
        assert_eq!(lines.len(), 2);
        let lines = read_lines(professor_csv_template().as_bytes()).unwrap();
        assert_eq!(lines.len(), 2);
    }
}
