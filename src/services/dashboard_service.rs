// src/services/dashboard_service.rs
use crate::{
    error::AppResult,
    models::{account::Account, document::DocumentStats, lor_request::RequestCounts},
    services::{
        account_service::{self, AccountCounts},
        document_service,
        request_service,
        roster_service::{self, RosterCounts},
    },
};
use serde::Serialize;
use sqlx::SqlitePool;

/// Admin dashboard figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub accounts: AccountCounts,
    #[serde(flatten)]
    pub roster: RosterCounts,
    pub requests: RequestCounts,
    pub documents: DocumentStats,
}

pub async fn dashboard(db_pool: &SqlitePool, admin: &Account) -> AppResult<DashboardStats> {
    tracing::debug!("Building dashboard for admin {}", admin.id);
    Ok(DashboardStats {
        accounts: account_service::count_accounts(db_pool).await?,
        roster: roster_service::count_roster(db_pool).await?,
        requests: request_service::counts_for(db_pool, admin).await?,
        documents: document_service::document_stats(db_pool).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        models::roster::ProfessorRosterInput,
        services::{account_service::fixtures as accounts, request_service::fixtures as requests},
    };

    #[tokio::test]
    async fn dashboard_counts_every_store() {
        let pool = test_pool().await;
        let admin = accounts::admin(&pool).await;
        let s = accounts::student(&pool, "Asha", "EX1").await;
        let p = accounts::professor(&pool, "Dr. Roy", "PROF001").await;
        roster_service::add_professor(
            &pool,
            ProfessorRosterInput { name: "Dr. Roy".into(), user_id: "PROF001".into(), department: "Physics".into() },
        )
        .await
        .unwrap();
        let r = request_service::create(&pool, &s, requests::form(p.id)).await.unwrap();
        request_service::reject(&pool, r.id, &p, Some("Not now".into())).await.unwrap();
        request_service::create(&pool, &s, requests::form(p.id)).await.unwrap();

        let stats = dashboard(&pool, &admin).await.unwrap();
        assert_eq!(stats.accounts.total_students, 1);
        assert_eq!(stats.accounts.total_admins, 1);
        assert_eq!(stats.roster.total_roster_professors, 1);
        assert_eq!(stats.roster.total_roster_students, 0);
        assert_eq!(stats.requests, RequestCounts { total: 2, pending: 1, approved: 0, rejected: 1 });
        assert_eq!(stats.documents.total_documents, 0);
    }
}
