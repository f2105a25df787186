// src/web/routes.rs
use crate::{
    state::AppState,
    web::{admin_handlers, auth_handlers, document_handlers, mw_admin, mw_auth, request_handlers},
};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Public routes ---
    let public_routes = Router::new()
        .route("/auth/login", post(auth_handlers::handle_login))
        .route("/auth/logout", post(auth_handlers::handle_logout))
        .route("/auth/register/student", post(auth_handlers::handle_register_student))
        .route("/auth/register/professor", post(auth_handlers::handle_register_professor))
        .route("/auth/check-email", get(auth_handlers::check_email))
        .route("/auth/check-examination-number", get(auth_handlers::check_examination_number))
        .route("/auth/check-user-id", get(auth_handlers::check_user_id))
        .route("/health", get(auth_handlers::health));

    // --- Admin routes ---
    // Login is checked by the parent router; this layer only checks the role.
    let admin_routes = Router::new()
        .route(
            "/roster/students",
            get(admin_handlers::list_roster_students).post(admin_handlers::add_roster_student),
        )
        .route("/roster/students/search", get(admin_handlers::search_roster_students))
        .route(
            "/roster/students/{id}",
            get(admin_handlers::get_roster_student)
                .put(admin_handlers::update_roster_student)
                .delete(admin_handlers::delete_roster_student),
        )
        .route(
            "/roster/professors",
            get(admin_handlers::list_roster_professors).post(admin_handlers::add_roster_professor),
        )
        .route("/roster/professors/search", get(admin_handlers::search_roster_professors))
        .route(
            "/roster/professors/{id}",
            get(admin_handlers::get_roster_professor)
                .put(admin_handlers::update_roster_professor)
                .delete(admin_handlers::delete_roster_professor),
        )
        .route("/students/courses", get(admin_handlers::list_courses))
        .route("/departments", get(admin_handlers::list_departments))
        .route("/import/students", post(admin_handlers::import_students))
        .route("/import/students/template", get(admin_handlers::student_template))
        .route("/import/professors", post(admin_handlers::import_professors))
        .route("/import/professors/template", get(admin_handlers::professor_template))
        .route("/accounts", get(admin_handlers::list_accounts))
        .route("/accounts/{id}/toggle", post(admin_handlers::toggle_account))
        .route("/requests", get(admin_handlers::list_requests))
        .route("/stats", get(admin_handlers::dashboard))
        .route("/documents/{reference}", delete(admin_handlers::delete_document))
        .route_layer(middleware::from_fn(mw_admin::require_admin));

    // --- Authenticated routes ---
    let authenticated_routes = Router::new()
        .route("/auth/me", get(auth_handlers::current_account))
        .route("/professors", get(auth_handlers::list_professors))
        .route("/requests", post(request_handlers::create_request))
        .route("/requests/student", get(request_handlers::student_requests))
        .route("/requests/student/approved", get(request_handlers::student_approved_requests))
        .route("/requests/professor", get(request_handlers::professor_requests))
        .route("/requests/professor/pending", get(request_handlers::professor_pending_requests))
        .route("/requests/stats", get(request_handlers::request_stats))
        .route(
            "/requests/{id}",
            get(request_handlers::get_request).delete(request_handlers::delete_request),
        )
        .route("/requests/{id}/approve", post(request_handlers::approve_request))
        .route("/requests/{id}/reject", post(request_handlers::reject_request))
        .route("/requests/{id}/preview", get(request_handlers::preview_letter))
        .route("/requests/{id}/document", post(request_handlers::issue_document))
        .route("/documents/{reference}", get(document_handlers::document_info))
        .route("/documents/{reference}/download", get(document_handlers::download_document))
        .nest("/admin", admin_routes)
        // Applies to every route above, nested /admin/* included
        .route_layer(middleware::from_fn_with_state(app_state.clone(), mw_auth::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
