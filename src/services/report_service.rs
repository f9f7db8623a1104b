// src/services/report_service.rs

use chrono::{Local, NaiveDate};
use sqlx::PgConnection;

use crate::{
    common::{
        db_utils::{begin_scoped_transaction, TenantScope},
        error::AppError,
    },
    db::ReportRepository,
    models::{
        catalog::status_codes,
        report::{ReportRunSummary, ReportScope},
    },
    services::catalog_service::CatalogService,
};

#[derive(Clone)]
pub struct ReportService {
    repo: ReportRepository,
    catalog: CatalogService,
}

impl ReportService {
    pub fn new(repo: ReportRepository, catalog: CatalogService) -> Self {
        Self { repo, catalog }
    }

    /// Regera os agregados diários de um tenant.
    /// Tudo numa transação: se algo falhar, os relatórios antigos continuam intactos.
    pub async fn generate_for_tenant(
        &self,
        scope: &TenantScope,
        report_scope: ReportScope,
    ) -> Result<ReportRunSummary, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let dates = match report_scope {
            ReportScope::AllHistory => {
                self.repo.delete_all(&mut *tx, scope.tenant_id).await?;
                let today = Local::now().date_naive();
                self.repo
                    .distinct_reservation_dates(&mut *tx, scope.tenant_id, today)
                    .await?
            }
            ReportScope::Day(date) => {
                self.repo
                    .delete_reservation_reports_on(&mut *tx, scope.tenant_id, date)
                    .await?;
                self.repo
                    .delete_package_reports_on(&mut *tx, scope.tenant_id, date)
                    .await?;
                vec![date]
            }
        };

        // Sem status do tipo reserva não há o que contar por status
        let has_reservation_statuses = !self
            .catalog
            .find_statuses_by_type(&mut *tx, status_codes::RESERVATION_TYPE)
            .await?
            .is_empty();

        for date in &dates {
            self.build_day(&mut tx, scope, *date, has_reservation_statuses).await?;
        }

        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, ?report_scope, days = dates.len(), "📊 Relatórios gerados");
        Ok(ReportRunSummary { dates_processed: dates.len() })
    }

    /// Tarefa noturna: percorre os tenants em sequência. A falha de um não interrompe os outros.
    pub async fn generate_reports_for_all_tenants(&self) -> Result<usize, AppError> {
        let tenants = self.catalog.list_tenant_ids(self.repo.get_pool()).await?;
        let mut succeeded = 0;

        for tenant_id in tenants {
            let scope = TenantScope::system(tenant_id);
            match self.generate_for_tenant(&scope, ReportScope::AllHistory).await {
                Ok(_) => succeeded += 1,
                Err(e) => tracing::error!(tenant = %tenant_id, "❌ Falha ao gerar relatórios: {:?}", e),
            }
        }

        Ok(succeeded)
    }

    async fn build_day(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        date: NaiveDate,
        with_reservation_counts: bool,
    ) -> Result<(), AppError> {
        self.repo
            .insert_package_usage(&mut *conn, scope.tenant_id, date)
            .await?;
        if with_reservation_counts {
            self.repo
                .insert_reservation_counts(&mut *conn, scope.tenant_id, date, status_codes::RESERVATION_TYPE)
                .await?;
        }
        Ok(())
    }
}
