// src/services/roster_service.rs
use crate::{
    db::is_unique_violation,
    error::{AppError, AppResult},
    models::roster::{
        is_known_department, Page, ProfessorRoster, ProfessorRosterInput, RosterSearchParams,
        StudentRoster, StudentRosterInput, DEPARTMENTS,
    },
};
use chrono::Utc;
use sqlx::SqlitePool;

const DEFAULT_PAGE_SIZE: usize = 20;

// --- Claim validation (registration gate) ---

/// Every field must match one roster row exactly; anything less is a mismatch.
pub async fn validate_student_claim(
    db_pool: &SqlitePool,
    name: &str,
    registration_number: &str,
    examination_number: &str,
    course: &str,
) -> AppResult<StudentRoster> {
    let row = sqlx::query_as::<_, StudentRoster>(
        r#"
        SELECT id, name, registration_number, examination_number, course, created_at
        FROM roster_students
        WHERE name = ? AND registration_number = ? AND examination_number = ? AND course = ?
        "#,
    )
    .bind(name)
    .bind(registration_number)
    .bind(examination_number)
    .bind(course)
    .fetch_optional(db_pool)
    .await?;

    row.ok_or_else(|| {
        tracing::warn!("Student claim did not match roster: {} / {}", name, examination_number);
        AppError::RosterMismatch
    })
}

pub async fn validate_professor_claim(
    db_pool: &SqlitePool,
    name: &str,
    user_id: &str,
    department: &str,
) -> AppResult<ProfessorRoster> {
    let row = sqlx::query_as::<_, ProfessorRoster>(
        r#"
        SELECT id, name, user_id, department, created_at
        FROM roster_professors
        WHERE name = ? AND user_id = ? AND department = ?
        "#,
    )
    .bind(name)
    .bind(user_id)
    .bind(department)
    .fetch_optional(db_pool)
    .await?;

    row.ok_or_else(|| {
        tracing::warn!("Professor claim did not match roster: {} / {}", name, user_id);
        AppError::RosterMismatch
    })
}

// --- Lookups used by the importer and the admin CRUD ---

pub async fn student_registration_exists(db_pool: &SqlitePool, registration_number: &str) -> AppResult<bool> {
    Ok(sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roster_students WHERE registration_number = ?)")
        .bind(registration_number)
        .fetch_one(db_pool)
        .await?)
}

pub async fn student_examination_exists(db_pool: &SqlitePool, examination_number: &str) -> AppResult<bool> {
    Ok(sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roster_students WHERE examination_number = ?)")
        .bind(examination_number)
        .fetch_one(db_pool)
        .await?)
}

pub async fn professor_user_id_exists(db_pool: &SqlitePool, user_id: &str) -> AppResult<bool> {
    Ok(sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roster_professors WHERE user_id = ?)")
        .bind(user_id)
        .fetch_one(db_pool)
        .await?)
}

fn require_fields(fields: &[&str]) -> AppResult<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::ValidationFailed("all fields are required".into()));
    }
    Ok(())
}

fn trim_student(input: StudentRosterInput) -> StudentRosterInput {
    StudentRosterInput {
        name: input.name.trim().to_string(),
        registration_number: input.registration_number.trim().to_string(),
        examination_number: input.examination_number.trim().to_string(),
        course: input.course.trim().to_string(),
    }
}

fn trim_professor(input: ProfessorRosterInput) -> ProfessorRosterInput {
    ProfessorRosterInput {
        name: input.name.trim().to_string(),
        user_id: input.user_id.trim().to_string(),
        department: input.department.trim().to_string(),
    }
}

fn check_department(department: &str) -> AppResult<()> {
    if !is_known_department(department) {
        return Err(AppError::ValidationFailed(format!(
            "invalid department '{}'. Valid departments: {}",
            department,
            DEPARTMENTS.join(", ")
        )));
    }
    Ok(())
}

// --- Students ---

pub async fn list_students(db_pool: &SqlitePool) -> AppResult<Vec<StudentRoster>> {
    Ok(sqlx::query_as::<_, StudentRoster>(
        "SELECT id, name, registration_number, examination_number, course, created_at FROM roster_students ORDER BY id ASC",
    )
    .fetch_all(db_pool)
    .await?)
}

pub async fn find_student(db_pool: &SqlitePool, id: i64) -> AppResult<StudentRoster> {
    sqlx::query_as::<_, StudentRoster>(
        "SELECT id, name, registration_number, examination_number, course, created_at FROM roster_students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("roster student".into()))
}

/// Inserts a student roster row, trimming fields. Duplicates are `Conflict`.
pub async fn add_student(db_pool: &SqlitePool, input: StudentRosterInput) -> AppResult<StudentRoster> {
    let input = trim_student(input);
    require_fields(&[&input.name, &input.registration_number, &input.examination_number, &input.course])?;

    if student_registration_exists(db_pool, &input.registration_number).await? {
        return Err(AppError::Conflict(format!(
            "student with registration number {} already exists",
            input.registration_number
        )));
    }
    if student_examination_exists(db_pool, &input.examination_number).await? {
        return Err(AppError::Conflict(format!(
            "student with examination number {} already exists",
            input.examination_number
        )));
    }

    let result = sqlx::query(
        "INSERT INTO roster_students (name, registration_number, examination_number, course, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(&input.registration_number)
    .bind(&input.examination_number)
    .bind(&input.course)
    .bind(Utc::now())
    .execute(db_pool)
    .await;

    match result {
        Ok(done) => {
            tracing::info!("Roster student added: {}", input.name);
            find_student(db_pool, done.last_insert_rowid()).await
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict("student roster row already exists".into())),
        Err(e) => Err(e.into()),
    }
}

/// Updates a student roster row. Already-registered accounts are unaffected.
pub async fn update_student(db_pool: &SqlitePool, id: i64, input: StudentRosterInput) -> AppResult<StudentRoster> {
    let existing = find_student(db_pool, id).await?;
    let input = trim_student(input);
    require_fields(&[&input.name, &input.registration_number, &input.examination_number, &input.course])?;

    if existing.registration_number != input.registration_number
        && student_registration_exists(db_pool, &input.registration_number).await?
    {
        return Err(AppError::Conflict("registration number already exists".into()));
    }
    if existing.examination_number != input.examination_number
        && student_examination_exists(db_pool, &input.examination_number).await?
    {
        return Err(AppError::Conflict("examination number already exists".into()));
    }

    let result = sqlx::query(
        "UPDATE roster_students SET name = ?, registration_number = ?, examination_number = ?, course = ? WHERE id = ?",
    )
    .bind(&input.name)
    .bind(&input.registration_number)
    .bind(&input.examination_number)
    .bind(&input.course)
    .bind(id)
    .execute(db_pool)
    .await;

    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("student roster row already exists".into()))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!("Roster student {} updated", id);
    find_student(db_pool, id).await
}

pub async fn delete_student(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let rows = sqlx::query("DELETE FROM roster_students WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(AppError::NotFound("roster student".into()));
    }
    tracing::info!("Roster student {} deleted", id);
    Ok(())
}

pub async fn search_students(db_pool: &SqlitePool, params: &RosterSearchParams) -> AppResult<Page<StudentRoster>> {
    let term = params.q.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(str::to_lowercase);
    let course = params
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase);

    let matching: Vec<StudentRoster> = list_students(db_pool)
        .await?
        .into_iter()
        .filter(|s| {
            term.as_ref().map_or(true, |t| {
                s.name.to_lowercase().contains(t)
                    || s.registration_number.to_lowercase().contains(t)
                    || s.examination_number.to_lowercase().contains(t)
            })
        })
        .filter(|s| course.as_ref().map_or(true, |c| s.course.to_lowercase().contains(c)))
        .collect();

    Ok(Page::from_vec(matching, params.page.unwrap_or(0), params.size.unwrap_or(DEFAULT_PAGE_SIZE)))
}

/// Distinct courses present in the student roster, for filter pickers.
pub async fn list_student_courses(db_pool: &SqlitePool) -> AppResult<Vec<String>> {
    Ok(sqlx::query_scalar("SELECT DISTINCT course FROM roster_students ORDER BY course ASC")
        .fetch_all(db_pool)
        .await?)
}

// --- Professors ---

pub async fn list_professors(db_pool: &SqlitePool) -> AppResult<Vec<ProfessorRoster>> {
    Ok(sqlx::query_as::<_, ProfessorRoster>(
        "SELECT id, name, user_id, department, created_at FROM roster_professors ORDER BY id ASC",
    )
    .fetch_all(db_pool)
    .await?)
}

pub async fn find_professor(db_pool: &SqlitePool, id: i64) -> AppResult<ProfessorRoster> {
    sqlx::query_as::<_, ProfessorRoster>(
        "SELECT id, name, user_id, department, created_at FROM roster_professors WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("roster professor".into()))
}

pub async fn add_professor(db_pool: &SqlitePool, input: ProfessorRosterInput) -> AppResult<ProfessorRoster> {
    let input = trim_professor(input);
    require_fields(&[&input.name, &input.user_id, &input.department])?;
    check_department(&input.department)?;

    if professor_user_id_exists(db_pool, &input.user_id).await? {
        return Err(AppError::Conflict(format!(
            "professor with user ID {} already exists",
            input.user_id
        )));
    }

    let result = sqlx::query(
        "INSERT INTO roster_professors (name, user_id, department, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(&input.user_id)
    .bind(&input.department)
    .bind(Utc::now())
    .execute(db_pool)
    .await;

    match result {
        Ok(done) => {
            tracing::info!("Roster professor added: {}", input.name);
            find_professor(db_pool, done.last_insert_rowid()).await
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict("professor roster row already exists".into())),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_professor(
    db_pool: &SqlitePool,
    id: i64,
    input: ProfessorRosterInput,
) -> AppResult<ProfessorRoster> {
    let existing = find_professor(db_pool, id).await?;
    let input = trim_professor(input);
    require_fields(&[&input.name, &input.user_id, &input.department])?;
    check_department(&input.department)?;

    if existing.user_id != input.user_id && professor_user_id_exists(db_pool, &input.user_id).await? {
        return Err(AppError::Conflict("user ID already exists".into()));
    }

    let result = sqlx::query("UPDATE roster_professors SET name = ?, user_id = ?, department = ? WHERE id = ?")
        .bind(&input.name)
        .bind(&input.user_id)
        .bind(&input.department)
        .bind(id)
        .execute(db_pool)
        .await;

    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("professor roster row already exists".into()))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!("Roster professor {} updated", id);
    find_professor(db_pool, id).await
}

pub async fn delete_professor(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let rows = sqlx::query("DELETE FROM roster_professors WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(AppError::NotFound("roster professor".into()));
    }
    tracing::info!("Roster professor {} deleted", id);
    Ok(())
}

pub async fn search_professors(
    db_pool: &SqlitePool,
    params: &RosterSearchParams,
) -> AppResult<Page<ProfessorRoster>> {
    let term = params.q.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(str::to_lowercase);
    let department = params
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("all"));

    let matching: Vec<ProfessorRoster> = list_professors(db_pool)
        .await?
        .into_iter()
        .filter(|p| {
            term.as_ref().map_or(true, |t| {
                p.name.to_lowercase().contains(t) || p.user_id.to_lowercase().contains(t)
            })
        })
        .filter(|p| department.map_or(true, |d| p.department == d))
        .collect();

    Ok(Page::from_vec(matching, params.page.unwrap_or(0), params.size.unwrap_or(DEFAULT_PAGE_SIZE)))
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterCounts {
    pub total_roster_students: i64,
    pub total_roster_professors: i64,
}

pub async fn count_roster(db_pool: &SqlitePool) -> AppResult<RosterCounts> {
    let students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roster_students").fetch_one(db_pool).await?;
    let professors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roster_professors").fetch_one(db_pool).await?;
    Ok(RosterCounts { total_roster_students: students, total_roster_professors: professors })
}
