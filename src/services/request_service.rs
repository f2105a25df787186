// src/services/request_service.rs
use crate::{
    db::is_unique_violation,
    error::{AppError, AppResult},
    models::{
        account::{Account, Profile, Role},
        lor_request::{
            Decision, LorRequest, LorRequestRow, LorRequestView, LorRequestViewRow, RequestCounts,
            RequestForm, RequestStatus,
        },
    },
    services::{account_service, document_service},
    storage::FileStorage,
};
use chrono::Utc;
use sqlx::SqlitePool;

const REQUEST_COLUMNS: &str = r#"
    r.id, r.student_id, r.professor_id, r.student_name, r.registration_number,
    r.examination_number, r.course, r.semester, r.session, r.class_roll_number,
    r.institute_company, r.status, r.professor_comments, r.requested_at, r.processed_at
"#;

/// Base query for listings: request + professor + document, if any.
fn view_query(filter: &str, order: &str) -> String {
    format!(
        r#"
        SELECT {cols},
            p.name AS professor_name,
            p.department AS professor_department,
            d.reference_number AS document_reference,
            d.file_name AS document_file_name
        FROM lor_requests r
        JOIN accounts p ON p.id = r.professor_id
        LEFT JOIN issued_documents d ON d.request_id = r.id
        WHERE {filter}
        ORDER BY {order}
        "#,
        cols = REQUEST_COLUMNS,
        filter = filter,
        order = order,
    )
}

const NEWEST_FIRST: &str = "r.requested_at DESC, r.id DESC";
const OLDEST_FIRST: &str = "r.requested_at ASC, r.id ASC";

pub async fn find_by_id(db_pool: &SqlitePool, request_id: i64) -> AppResult<Option<LorRequest>> {
    let sql = format!("SELECT {} FROM lor_requests r WHERE r.id = ?", REQUEST_COLUMNS);
    sqlx::query_as::<_, LorRequestRow>(&sql)
        .bind(request_id)
        .fetch_optional(db_pool)
        .await?
        .map(LorRequest::try_from)
        .transpose()
}

async fn load(db_pool: &SqlitePool, request_id: i64) -> AppResult<LorRequest> {
    find_by_id(db_pool, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("LOR request".into()))
}

async fn fetch_views(
    db_pool: &SqlitePool,
    filter: &str,
    order: &str,
    binds: &[i64],
) -> AppResult<Vec<LorRequestView>> {
    let sql = view_query(filter, order);
    let mut query = sqlx::query_as::<_, LorRequestViewRow>(&sql);
    for value in binds {
        query = query.bind(*value);
    }
    query
        .fetch_all(db_pool)
        .await?
        .into_iter()
        .map(LorRequestView::try_from)
        .collect()
}

/// Creates a PENDING request from a student to an active professor.
/// The duplicate check and insert share one transaction, backed by the
/// partial unique index on pending (student, professor) pairs.
pub async fn create(db_pool: &SqlitePool, student: &Account, form: RequestForm) -> AppResult<LorRequest> {
    tracing::info!("Student {} requesting LOR from professor {}", student.id, form.professor_id);

    let Profile::Student { registration_number, examination_number, course } = &student.profile else {
        return Err(AppError::Forbidden("only students can create LOR requests".into()));
    };

    for (label, value) in [
        ("semester", &form.semester),
        ("session", &form.session),
        ("class roll number", &form.class_roll_number),
        ("institute/company", &form.institute_company),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::ValidationFailed(format!("{} is required", label)));
        }
    }

    let professor = account_service::find_by_id(db_pool, form.professor_id).await?;
    match &professor {
        Some(p) if p.role() == Role::Professor && p.is_active => {}
        _ => {
            tracing::warn!("Invalid professor {} selected by student {}", form.professor_id, student.id);
            return Err(AppError::InvalidProfessor);
        }
    }

    let mut tx = db_pool.begin().await?;

    let pending: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM lor_requests WHERE student_id = ? AND professor_id = ? AND status = 'PENDING')",
    )
    .bind(student.id)
    .bind(form.professor_id)
    .fetch_one(&mut *tx)
    .await?;
    if pending {
        tracing::warn!("Student {} already has a pending request with {}", student.id, form.professor_id);
        return Err(AppError::DuplicatePendingRequest);
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO lor_requests (
            student_id, professor_id, student_name, registration_number, examination_number,
            course, semester, session, class_roll_number, institute_company, status, requested_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(student.id)
    .bind(form.professor_id)
    .bind(&student.name)
    .bind(registration_number)
    .bind(examination_number)
    .bind(course)
    .bind(form.semester.trim())
    .bind(form.session.trim())
    .bind(form.class_roll_number.trim())
    .bind(form.institute_company.trim())
    .bind(Utc::now())
    .execute(&mut *tx)
    .await;

    let id = match inserted {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => return Err(AppError::DuplicatePendingRequest),
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    tracing::info!("✅ LOR request {} created", id);
    load(db_pool, id).await
}

/// Moves a PENDING request to APPROVED or REJECTED. Only the assigned
/// professor may decide, and only once.
pub async fn decide(
    db_pool: &SqlitePool,
    request_id: i64,
    professor: &Account,
    decision: Decision,
    comments: Option<String>,
) -> AppResult<LorRequest> {
    tracing::info!("Professor {} -> {:?} request {}", professor.id, decision, request_id);

    let request = load(db_pool, request_id).await?;
    if request.professor_id != professor.id {
        tracing::warn!("Professor {} is not the owner of request {}", professor.id, request_id);
        return Err(AppError::NotOwner);
    }
    if !request.is_pending() {
        return Err(AppError::AlreadyProcessed);
    }

    // Approval comments may be empty; stored verbatim otherwise.
    let comments = comments.unwrap_or_default();
    let target = decision.target();

    // Guarded on status so a concurrent decision cannot overwrite this one.
    let rows = sqlx::query(
        "UPDATE lor_requests SET status = ?, professor_comments = ?, processed_at = ? WHERE id = ? AND status = 'PENDING'",
    )
    .bind(target.as_str())
    .bind(&comments)
    .bind(Utc::now())
    .bind(request_id)
    .execute(db_pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(AppError::AlreadyProcessed);
    }

    tracing::info!("✅ LOR request {} is now {}", request_id, target);
    load(db_pool, request_id).await
}

pub async fn approve(
    db_pool: &SqlitePool,
    request_id: i64,
    professor: &Account,
    comments: Option<String>,
) -> AppResult<LorRequest> {
    decide(db_pool, request_id, professor, Decision::Approve, comments).await
}

pub async fn reject(
    db_pool: &SqlitePool,
    request_id: i64,
    professor: &Account,
    comments: Option<String>,
) -> AppResult<LorRequest> {
    decide(db_pool, request_id, professor, Decision::Reject, comments).await
}

/// Visible to the owning student, the assigned professor and admins.
pub async fn get(db_pool: &SqlitePool, request_id: i64, actor: &Account) -> AppResult<LorRequestView> {
    let views = fetch_views(db_pool, "r.id = ?", NEWEST_FIRST, &[request_id]).await?;
    let view = views.into_iter().next().ok_or_else(|| AppError::NotFound("LOR request".into()))?;

    let allowed = match actor.role() {
        Role::Admin => true,
        Role::Student => view.request.student_id == actor.id,
        Role::Professor => view.request.professor_id == actor.id,
    };
    if !allowed {
        tracing::warn!("Account {} may not view request {}", actor.id, request_id);
        return Err(AppError::Forbidden("you can only view your own requests".into()));
    }
    Ok(view)
}

/// Deletes a request. Students: own requests, professors: assigned requests,
/// admins: any. An issued document is removed first; if that fails the
/// request is still deleted.
pub async fn delete(
    db_pool: &SqlitePool,
    storage: &FileStorage,
    request_id: i64,
    actor: &Account,
) -> AppResult<()> {
    tracing::info!("Account {} deleting request {}", actor.id, request_id);
    let request = load(db_pool, request_id).await?;
    let document = document_service::find_by_request(db_pool, request_id).await?;

    match actor.role() {
        Role::Student => {
            if request.student_id != actor.id {
                return Err(AppError::Forbidden("you can only delete your own requests".into()));
            }
            if !request.is_pending() {
                tracing::warn!(
                    "Student {} deleting {} request {}",
                    actor.id,
                    request.status,
                    request_id
                );
            }
        }
        Role::Professor => {
            if request.professor_id != actor.id {
                return Err(AppError::Forbidden("you can only delete requests assigned to you".into()));
            }
            if request.status == RequestStatus::Approved {
                tracing::warn!("Professor {} deleting approved request {}", actor.id, request_id);
            }
        }
        Role::Admin => {
            if request.status == RequestStatus::Approved {
                tracing::warn!("Admin deleting approved request {}", request_id);
            }
        }
    }

    if let Some(doc) = document {
        tracing::warn!("Request {} has issued document {}, removing it first", request_id, doc.reference_number);
        if let Err(e) = document_service::remove_document(db_pool, storage, &doc).await {
            tracing::error!("Failed to delete document for request {}: {:?}", request_id, e);
        }
    }

    sqlx::query("DELETE FROM lor_requests WHERE id = ?")
        .bind(request_id)
        .execute(db_pool)
        .await?;

    tracing::info!("✅ LOR request {} deleted", request_id);
    Ok(())
}

// --- Read views ---

/// A student's requests, newest first.
pub async fn list_for_student(db_pool: &SqlitePool, student: &Account) -> AppResult<Vec<LorRequestView>> {
    fetch_views(db_pool, "r.student_id = ?", NEWEST_FIRST, &[student.id]).await
}

pub async fn list_approved_for_student(db_pool: &SqlitePool, student: &Account) -> AppResult<Vec<LorRequestView>> {
    fetch_views(db_pool, "r.student_id = ? AND r.status = 'APPROVED'", NEWEST_FIRST, &[student.id]).await
}

/// A professor's assigned requests, newest first.
pub async fn list_for_professor(db_pool: &SqlitePool, professor: &Account) -> AppResult<Vec<LorRequestView>> {
    fetch_views(db_pool, "r.professor_id = ?", NEWEST_FIRST, &[professor.id]).await
}

/// Pending queue, oldest first.
pub async fn list_pending_for_professor(db_pool: &SqlitePool, professor: &Account) -> AppResult<Vec<LorRequestView>> {
    fetch_views(db_pool, "r.professor_id = ? AND r.status = 'PENDING'", OLDEST_FIRST, &[professor.id]).await
}

pub async fn list_all(db_pool: &SqlitePool) -> AppResult<Vec<LorRequestView>> {
    fetch_views(db_pool, "1 = 1", NEWEST_FIRST, &[]).await
}

/// Counts by status, scoped to what the actor can see.
pub async fn counts_for(db_pool: &SqlitePool, actor: &Account) -> AppResult<RequestCounts> {
    let (filter, bind) = match actor.role() {
        Role::Student => ("WHERE student_id = ?", Some(actor.id)),
        Role::Professor => ("WHERE professor_id = ?", Some(actor.id)),
        Role::Admin => ("", None),
    };
    let sql = format!("SELECT status, COUNT(*) FROM lor_requests {} GROUP BY status", filter);
    let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
    if let Some(id) = bind {
        query = query.bind(id);
    }

    let mut counts = RequestCounts::default();
    for (status, n) in query.fetch_all(db_pool).await? {
        counts.total += n;
        match status.parse::<RequestStatus>()? {
            RequestStatus::Pending => counts.pending += n,
            RequestStatus::Approved => counts.approved += n,
            RequestStatus::Rejected => counts.rejected += n,
        }
    }
    Ok(counts)
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    pub fn form(professor_id: i64) -> RequestForm {
        RequestForm {
            professor_id,
            semester: "VI".into(),
            session: "2022-25".into(),
            class_roll_number: "42".into(),
            institute_company: "Acme Systems".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, services::account_service::fixtures as accounts};

    #[tokio::test]
    async fn one_pending_request_per_pair() {
        let pool = test_pool().await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;

        let first = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        assert_eq!(first.status, RequestStatus::Pending);
        assert!(first.processed_at.is_none());

        let dup = create(&pool, &s, fixtures::form(p.id)).await.unwrap_err();
        assert!(matches!(dup, AppError::DuplicatePendingRequest));

        reject(&pool, first.id, &p, Some("Not this term".into())).await.unwrap();
        let second = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        approve(&pool, second.id, &p, None).await.unwrap();
        create(&pool, &s, fixtures::form(p.id)).await.unwrap();
    }

    #[tokio::test]
    async fn pending_index_rejects_a_second_pending_row() {
        let pool = test_pool().await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let first = create(&pool, &s, fixtures::form(p.id)).await.unwrap();

        let raw_insert = |status: &'static str| {
            sqlx::query(
                r#"
                INSERT INTO lor_requests (
                    student_id, professor_id, student_name, registration_number, examination_number,
                    course, semester, session, class_roll_number, institute_company, status, requested_at
                )
                VALUES (?, ?, 'Asha', 'REG-EX1', 'EX1', 'BCA', 'VI', '2022-25', '42', 'Acme', ?, ?)
                "#,
            )
            .bind(s.id)
            .bind(p.id)
            .bind(status)
            .bind(Utc::now())
        };

        let err = raw_insert("PENDING").execute(&pool).await.unwrap_err();
        assert!(is_unique_violation(&err), "{:?}", err);

        // Only pending rows are constrained.
        raw_insert("REJECTED").execute(&pool).await.unwrap();
        reject(&pool, first.id, &p, None).await.unwrap();
        raw_insert("PENDING").execute(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn only_active_professors_are_valid_targets() {
        let pool = test_pool().await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let other = accounts::student(&pool, "Binu", "EX2").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;

        assert!(matches!(create(&pool, &s, fixtures::form(other.id)).await, Err(AppError::InvalidProfessor)));
        assert!(matches!(create(&pool, &s, fixtures::form(9999)).await, Err(AppError::InvalidProfessor)));

        account_service::toggle_account_status(&pool, p.id).await.unwrap();
        assert!(matches!(create(&pool, &s, fixtures::form(p.id)).await, Err(AppError::InvalidProfessor)));
    }

    #[tokio::test]
    async fn decisions_are_owner_only_and_one_way() {
        let pool = test_pool().await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let q = accounts::professor(&pool, "Dr. Sen", "PROF002").await;
        let r = create(&pool, &s, fixtures::form(p.id)).await.unwrap();

        assert!(matches!(approve(&pool, r.id, &q, None).await, Err(AppError::NotOwner)));

        let approved = approve(&pool, r.id, &p, None).await.unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.professor_comments.as_deref(), Some(""));
        assert!(approved.processed_at.is_some());

        assert!(matches!(approve(&pool, r.id, &p, None).await, Err(AppError::AlreadyProcessed)));
        assert!(matches!(reject(&pool, r.id, &p, Some("no".into())).await, Err(AppError::AlreadyProcessed)));
    }

    #[tokio::test]
    async fn snapshot_is_frozen_at_creation() {
        let pool = test_pool().await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let r = create(&pool, &s, fixtures::form(p.id)).await.unwrap();

        sqlx::query("UPDATE accounts SET name = 'Renamed', course = 'MCA' WHERE id = ?")
            .bind(s.id)
            .execute(&pool)
            .await
            .unwrap();

        let reloaded = find_by_id(&pool, r.id).await.unwrap().unwrap();
        assert_eq!(reloaded.student_name, "Asha");
        assert_eq!(reloaded.course, "BCA");
        assert_eq!(reloaded.examination_number, "EX1");
    }

    #[tokio::test]
    async fn delete_permissions_by_role() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let s2 = accounts::student(&pool, "Binu", "EX2").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let q = accounts::professor(&pool, "Dr. Sen", "PROF002").await;
        let admin = accounts::admin(&pool).await;

        let r1 = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        assert!(matches!(delete(&pool, &storage, r1.id, &s2).await, Err(AppError::Forbidden(_))));
        assert!(matches!(delete(&pool, &storage, r1.id, &q).await, Err(AppError::Forbidden(_))));
        delete(&pool, &storage, r1.id, &s).await.unwrap();
        assert!(find_by_id(&pool, r1.id).await.unwrap().is_none());

        let r2 = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        delete(&pool, &storage, r2.id, &admin).await.unwrap();

        let r3 = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        approve(&pool, r3.id, &p, None).await.unwrap();
        delete(&pool, &storage, r3.id, &s).await.unwrap();

        let r4 = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        delete(&pool, &storage, r4.id, &p).await.unwrap();
        assert!(matches!(delete(&pool, &storage, r4.id, &admin).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn visibility_and_listing_order() {
        let pool = test_pool().await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let s2 = accounts::student(&pool, "Binu", "EX2").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let q = accounts::professor(&pool, "Dr. Sen", "PROF002").await;
        let admin = accounts::admin(&pool).await;

        let older = create(&pool, &s, fixtures::form(p.id)).await.unwrap();
        let newer = create(&pool, &s2, fixtures::form(p.id)).await.unwrap();
        let to_q = create(&pool, &s, fixtures::form(q.id)).await.unwrap();

        assert!(get(&pool, older.id, &s).await.is_ok());
        assert!(get(&pool, older.id, &p).await.is_ok());
        assert!(get(&pool, older.id, &admin).await.is_ok());
        assert!(matches!(get(&pool, older.id, &s2).await, Err(AppError::Forbidden(_))));
        assert!(matches!(get(&pool, older.id, &q).await, Err(AppError::Forbidden(_))));

        let queue: Vec<i64> = list_pending_for_professor(&pool, &p).await.unwrap().iter().map(|v| v.request.id).collect();
        assert_eq!(queue, vec![older.id, newer.id]);
        let listing: Vec<i64> = list_for_professor(&pool, &p).await.unwrap().iter().map(|v| v.request.id).collect();
        assert_eq!(listing, vec![newer.id, older.id]);

        let mine: Vec<i64> = list_for_student(&pool, &s).await.unwrap().iter().map(|v| v.request.id).collect();
        assert_eq!(mine, vec![to_q.id, older.id]);

        approve(&pool, older.id, &p, None).await.unwrap();
        let approved = list_approved_for_student(&pool, &s).await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].professor_name, "Dr. Roy");
        assert!(!approved[0].has_document);

        let counts = counts_for(&pool, &p).await.unwrap();
        assert_eq!(counts, RequestCounts { total: 2, pending: 1, approved: 1, rejected: 0 });
        assert_eq!(counts_for(&pool, &admin).await.unwrap().total, 3);
    }
}
