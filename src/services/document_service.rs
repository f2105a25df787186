// src/services/document_service.rs
use crate::{
    db::is_unique_violation,
    error::{AppError, AppResult},
    models::{
        account::{Account, Profile, Role},
        document::{DocumentAccessRow, DocumentStats, IssuedDocument, LetterOverrides, LetterPreview},
        lor_request::{LorRequest, RequestStatus},
    },
    services::{letter, request_service},
    storage::FileStorage,
    templates::LetterDocument,
};
use askama::Template;
use chrono::{DateTime, Local, Utc};
use sqlx::SqlitePool;

const DOCUMENT_COLUMNS: &str = r#"
    d.id, d.request_id, d.reference_number, d.file_name, d.file_path,
    d.file_size, d.generated_by, d.generated_at
"#;

/// Directory under the storage root that holds rendered letters.
const LETTERS_DIR: &str = "letters";

pub async fn find_by_request(db_pool: &SqlitePool, request_id: i64) -> AppResult<Option<IssuedDocument>> {
    let sql = format!("SELECT {} FROM issued_documents d WHERE d.request_id = ?", DOCUMENT_COLUMNS);
    Ok(sqlx::query_as::<_, IssuedDocument>(&sql)
        .bind(request_id)
        .fetch_optional(db_pool)
        .await?)
}

async fn find_by_reference(db_pool: &SqlitePool, reference: &str) -> AppResult<DocumentAccessRow> {
    let sql = format!(
        r#"
        SELECT {}, r.student_id
        FROM issued_documents d
        JOIN lor_requests r ON r.id = d.request_id
        WHERE d.reference_number = ?
        "#,
        DOCUMENT_COLUMNS
    );
    sqlx::query_as::<_, DocumentAccessRow>(&sql)
        .bind(reference)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("document".into()))
}

/// Issuance and preview both require the assigned professor and an
/// approved request. Returns the professor's user id and department.
fn check_issuer<'a>(request: &LorRequest, professor: &'a Account) -> AppResult<(&'a str, &'a str)> {
    let Profile::Professor { user_id, department } = &professor.profile else {
        return Err(AppError::NotOwner);
    };
    if request.professor_id != professor.id {
        tracing::warn!("Professor {} does not own request {}", professor.id, request.id);
        return Err(AppError::NotOwner);
    }
    if request.status != RequestStatus::Approved {
        return Err(AppError::InvalidState(format!(
            "request is {}, a letter needs an approved request",
            request.status
        )));
    }
    Ok((user_id.as_str(), department.as_str()))
}

async fn load_request(db_pool: &SqlitePool, request_id: i64) -> AppResult<LorRequest> {
    request_service::find_by_id(db_pool, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("LOR request".into()))
}

/// The default letter for an approved request, for the professor to edit.
pub async fn preview(db_pool: &SqlitePool, request_id: i64, professor: &Account) -> AppResult<LetterPreview> {
    let request = load_request(db_pool, request_id).await?;
    let (_, department) = check_issuer(&request, professor)?;
    Ok(letter::default_preview(&request, &professor.name, department, Local::now().date_naive()))
}

/// Renders and stores the letter for an approved request. Issuing twice
/// returns the first document unchanged.
pub async fn issue(
    db_pool: &SqlitePool,
    storage: &FileStorage,
    request_id: i64,
    professor: &Account,
    overrides: Option<LetterOverrides>,
) -> AppResult<IssuedDocument> {
    tracing::info!("Professor {} issuing letter for request {}", professor.id, request_id);

    let request = load_request(db_pool, request_id).await?;
    let (user_id, department) = check_issuer(&request, professor)?;

    if let Some(existing) = find_by_request(db_pool, request_id).await? {
        tracing::info!("Request {} already has document {}", request_id, existing.reference_number);
        return Ok(existing);
    }

    let now = Local::now();
    let mut content = letter::default_preview(&request, &professor.name, department, now.date_naive());
    if let Some(overrides) = overrides {
        content = content.apply(overrides);
    }
    let html = LetterDocument::new(&content).render()?;

    let reference = letter::opaque_reference(&now);
    let file_name = letter::document_file_name(&request.examination_number, user_id, &reference);
    let file_path = format!("{}/{}", LETTERS_DIR, file_name);

    // Write first, record second: a failed write leaves nothing behind.
    let file_size = storage.write(&file_path, html.as_bytes()).await.map_err(|e| {
        tracing::error!("Failed to store letter for request {}: {:?}", request_id, e);
        AppError::IssuanceFailed(e.to_string())
    })?;

    let document = record_written(
        db_pool,
        storage,
        WrittenLetter {
            request_id,
            reference: &reference,
            file_name: &file_name,
            file_path: &file_path,
            file_size: file_size as i64,
            generated_by: professor.id,
            generated_at: now.with_timezone(&Utc),
        },
    )
    .await?;
    tracing::info!("✅ Document {} issued for request {}", document.reference_number, request_id);
    Ok(document)
}

/// A letter already in storage, waiting for its record.
struct WrittenLetter<'a> {
    request_id: i64,
    reference: &'a str,
    file_name: &'a str,
    file_path: &'a str,
    file_size: i64,
    generated_by: i64,
    generated_at: DateTime<Utc>,
}

/// Records a stored letter. If another issuance recorded one for the same
/// request first, this file is removed and that document returned.
async fn record_written(
    db_pool: &SqlitePool,
    storage: &FileStorage,
    letter: WrittenLetter<'_>,
) -> AppResult<IssuedDocument> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO issued_documents
            (request_id, reference_number, file_name, file_path, file_size, generated_by, generated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(letter.request_id)
    .bind(letter.reference)
    .bind(letter.file_name)
    .bind(letter.file_path)
    .bind(letter.file_size)
    .bind(letter.generated_by)
    .bind(letter.generated_at)
    .execute(db_pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            discard_file(storage, letter.file_path).await;
            tracing::warn!(
                "Concurrent issuance for request {}, returning the recorded document",
                letter.request_id
            );
            return find_by_request(db_pool, letter.request_id)
                .await?
                .ok_or_else(|| AppError::IssuanceFailed("reference number collision".into()));
        }
        Err(e) => {
            discard_file(storage, letter.file_path).await;
            return Err(e.into());
        }
    }

    find_by_request(db_pool, letter.request_id)
        .await?
        .ok_or(AppError::InternalServerError)
}

async fn discard_file(storage: &FileStorage, file_path: &str) {
    if let Err(e) = storage.delete(file_path).await {
        tracing::warn!("Could not remove unrecorded file {}: {:?}", file_path, e);
    }
}

/// Owning student, issuing professor or admin.
fn can_access(row: &DocumentAccessRow, actor: &Account) -> bool {
    match actor.role() {
        Role::Admin => true,
        Role::Student => row.student_id == actor.id,
        Role::Professor => row.document.generated_by == actor.id,
    }
}

async fn accessible(db_pool: &SqlitePool, reference: &str, actor: &Account) -> AppResult<IssuedDocument> {
    let row = find_by_reference(db_pool, reference).await?;
    if !can_access(&row, actor) {
        tracing::warn!("Account {} refused access to document {}", actor.id, reference);
        return Err(AppError::Forbidden("you do not have access to this document".into()));
    }
    Ok(row.document)
}

pub async fn document_info(db_pool: &SqlitePool, reference: &str, actor: &Account) -> AppResult<IssuedDocument> {
    accessible(db_pool, reference, actor).await
}

/// Metadata and bytes of an issued document.
pub async fn download(
    db_pool: &SqlitePool,
    storage: &FileStorage,
    reference: &str,
    actor: &Account,
) -> AppResult<(IssuedDocument, Vec<u8>)> {
    let document = accessible(db_pool, reference, actor).await?;
    let bytes = storage.read(&document.file_path).await.map_err(|e| match e {
        AppError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!("Document {} is recorded but its file is missing", reference);
            AppError::NotFound("document file".into())
        }
        other => other,
    })?;
    tracing::info!("Account {} downloaded document {}", actor.id, reference);
    Ok((document, bytes))
}

/// Admin removal of a document by reference.
pub async fn delete_document(
    db_pool: &SqlitePool,
    storage: &FileStorage,
    reference: &str,
    actor: &Account,
) -> AppResult<()> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden("only admins can delete documents".into()));
    }
    let row = find_by_reference(db_pool, reference).await?;
    remove_document(db_pool, storage, &row.document).await
}

/// Removes the file, then the record. A missing or undeletable file does
/// not stop the record from going.
pub async fn remove_document(db_pool: &SqlitePool, storage: &FileStorage, document: &IssuedDocument) -> AppResult<()> {
    if storage.exists(&document.file_path).await {
        if let Err(e) = storage.delete(&document.file_path).await {
            tracing::warn!("Failed to delete file {}: {:?}", document.file_path, e);
        }
    } else {
        tracing::warn!("File for document {} already missing", document.reference_number);
    }

    sqlx::query("DELETE FROM issued_documents WHERE id = ?")
        .bind(document.id)
        .execute(db_pool)
        .await?;
    tracing::info!("Document {} deleted", document.reference_number);
    Ok(())
}

pub async fn document_stats(db_pool: &SqlitePool) -> AppResult<DocumentStats> {
    let (total_documents, total_file_size): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(file_size), 0) FROM issued_documents")
            .fetch_one(db_pool)
            .await?;
    Ok(DocumentStats { total_documents, total_file_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        services::{account_service::fixtures as accounts, request_service::fixtures as requests},
    };

    struct Setup {
        pool: SqlitePool,
        student: Account,
        professor: Account,
        request_id: i64,
    }

    async fn approved_request() -> Setup {
        let pool = test_pool().await;
        let student = accounts::student(&pool, "Asha Toppo", "EX1").await;
        let professor = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let request = request_service::create(&pool, &student, requests::form(professor.id)).await.unwrap();
        request_service::approve(&pool, request.id, &professor, None).await.unwrap();
        Setup { pool, student, professor, request_id: request.id }
    }

    async fn document_rows(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM issued_documents").fetch_one(pool).await.unwrap()
    }

    #[tokio::test]
    async fn issuing_twice_returns_the_same_document() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let first = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();
        let second = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(document_rows(&s.pool).await, 1);
        assert!(first.reference_number.starts_with("LOR"));
        assert_eq!(first.file_name, format!("LOR_EX1_PROF001_{}.html", first.reference_number));
        assert!(storage.exists(&first.file_path).await);
        assert_eq!(first.generated_by, s.professor.id);
    }

    #[tokio::test]
    async fn issuance_requires_approval_and_ownership() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let student = accounts::student(&pool, "Asha Toppo", "EX1").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        let q = accounts::professor(&pool, "Dr. Sen", "PROF002").await;
        let r = request_service::create(&pool, &student, requests::form(p.id)).await.unwrap();

        assert!(matches!(issue(&pool, &storage, r.id, &p, None).await, Err(AppError::InvalidState(_))));
        assert!(matches!(preview(&pool, r.id, &p).await, Err(AppError::InvalidState(_))));

        request_service::reject(&pool, r.id, &p, Some("no".into())).await.unwrap();
        assert!(matches!(issue(&pool, &storage, r.id, &p, None).await, Err(AppError::InvalidState(_))));

        let r2 = request_service::create(&pool, &student, requests::form(p.id)).await.unwrap();
        request_service::approve(&pool, r2.id, &p, None).await.unwrap();
        assert!(matches!(issue(&pool, &storage, r2.id, &q, None).await, Err(AppError::NotOwner)));
        assert!(matches!(issue(&pool, &storage, r2.id, &student, None).await, Err(AppError::NotOwner)));
        assert_eq!(document_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn overrides_reach_the_rendered_letter() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let default = preview(&s.pool, s.request_id, &s.professor).await.unwrap();
        assert_eq!(default.professor_department, "Computer Science");
        assert_eq!(default.recipient_company, "Acme Systems");

        let overrides = LetterOverrides {
            subject: Some("Summer internship at Contoso".into()),
            professor_designation: Some("Head of Department".into()),
            ..Default::default()
        };
        let doc = issue(&s.pool, &storage, s.request_id, &s.professor, Some(overrides)).await.unwrap();

        let html = String::from_utf8(storage.read(&doc.file_path).await.unwrap()).unwrap();
        assert!(html.contains("Summer internship at Contoso"));
        assert!(html.contains("Head of Department"));
        assert!(html.contains("Dr. Roy"));
        assert!(html.contains("Asha Toppo"));
        assert_eq!(doc.file_size as usize, html.len());
    }

    #[tokio::test]
    async fn storage_failure_leaves_no_record() {
        let s = approved_request().await;
        // A regular file as the storage root makes every write fail.
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let storage = FileStorage::new(blocker.path());

        let err = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap_err();
        assert!(matches!(err, AppError::IssuanceFailed(_)));
        assert_eq!(document_rows(&s.pool).await, 0);
    }

    #[tokio::test]
    async fn losing_a_concurrent_issuance_returns_the_winner() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let winner = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();

        let late_path = "letters/LOR_EX1_PROF001_LATE.html";
        storage.write(late_path, b"<html></html>").await.unwrap();
        let recorded = record_written(
            &s.pool,
            &storage,
            WrittenLetter {
                request_id: s.request_id,
                reference: "LATE",
                file_name: "LOR_EX1_PROF001_LATE.html",
                file_path: late_path,
                file_size: 13,
                generated_by: s.professor.id,
                generated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        assert_eq!(recorded, winner);
        assert!(!storage.exists(late_path).await);
        assert!(storage.exists(&winner.file_path).await);
        assert_eq!(document_rows(&s.pool).await, 1);
    }

    #[tokio::test]
    async fn download_is_limited_to_owner_issuer_and_admin() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let other_student = accounts::student(&s.pool, "Binu Minz", "EX2").await;
        let other_professor = accounts::professor(&s.pool, "Dr. Sen", "PROF002").await;
        let admin = accounts::admin(&s.pool).await;
        let doc = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();
        let reference = doc.reference_number.as_str();

        for actor in [&s.student, &s.professor, &admin] {
            let (meta, bytes) = download(&s.pool, &storage, reference, actor).await.unwrap();
            assert_eq!(meta.id, doc.id);
            assert_eq!(bytes.len() as i64, doc.file_size);
        }
        for actor in [&other_student, &other_professor] {
            assert!(matches!(
                download(&s.pool, &storage, reference, actor).await,
                Err(AppError::Forbidden(_))
            ));
            assert!(matches!(document_info(&s.pool, reference, actor).await, Err(AppError::Forbidden(_))));
        }
        assert!(matches!(
            download(&s.pool, &storage, "LOR00000000000000MISSING", &admin).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_proceeds_when_file_is_already_gone() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let admin = accounts::admin(&s.pool).await;
        let doc = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();

        assert!(matches!(
            delete_document(&s.pool, &storage, &doc.reference_number, &s.professor).await,
            Err(AppError::Forbidden(_))
        ));

        storage.delete(&doc.file_path).await.unwrap();
        delete_document(&s.pool, &storage, &doc.reference_number, &admin).await.unwrap();
        assert_eq!(document_rows(&s.pool).await, 0);
        assert_eq!(document_stats(&s.pool).await.unwrap(), DocumentStats::default());
    }

    #[tokio::test]
    async fn deleting_the_request_removes_its_document() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let doc = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();

        request_service::delete(&s.pool, &storage, s.request_id, &s.student).await.unwrap();
        assert_eq!(document_rows(&s.pool).await, 0);
        assert!(!storage.exists(&doc.file_path).await);
    }

    #[tokio::test]
    async fn request_delete_survives_an_undeletable_file() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let doc = issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();

        // A directory where the letter should be cannot be removed as a file.
        storage.delete(&doc.file_path).await.unwrap();
        std::fs::create_dir_all(dir.path().join(&doc.file_path)).unwrap();
        std::fs::write(dir.path().join(&doc.file_path).join("keep"), b"x").unwrap();

        request_service::delete(&s.pool, &storage, s.request_id, &s.student).await.unwrap();
        assert!(request_service::find_by_id(&s.pool, s.request_id).await.unwrap().is_none());
        assert_eq!(document_rows(&s.pool).await, 0);
    }

    #[tokio::test]
    async fn document_rows_cascade_with_their_request() {
        let s = approved_request().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        issue(&s.pool, &storage, s.request_id, &s.professor, None).await.unwrap();

        sqlx::query("DELETE FROM lor_requests WHERE id = ?")
            .bind(s.request_id)
            .execute(&s.pool)
            .await
            .unwrap();
        assert_eq!(document_rows(&s.pool).await, 0);
    }
}
