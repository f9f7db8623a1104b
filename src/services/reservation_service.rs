// src/services/reservation_service.rs

use std::cmp::Ordering;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{begin_scoped_transaction, complete_date_range, PageRequest, TenantScope},
        error::AppError,
    },
    db::{ArrangementRepository, ReservationRepository},
    models::{
        arrangement::Page,
        catalog::{status_codes, Status},
        reservation::{
            CreateReservationPayload, Reservation, ReservationFilter, ReservationHistoryEntry,
            ReservationShortInfo, ReservationTableView, ReservationView, UpdateReservationPayload,
        },
    },
    services::{arrangement_service::ArrangementService, catalog_service::CatalogService},
};

const ENTITY: &str = "Reserva";

// =============================================================================
//  REGRAS PURAS
// =============================================================================

/// Efeito de uma mudança de status sobre os termos restantes do arranjo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermAdjustment {
    Unchanged,
    Increase,
    Decrease,
}

pub fn term_adjustment(from_code: &str, to_code: &str, remaining_term: i32) -> Result<TermAdjustment, AppError> {
    let was_canceled = from_code == status_codes::TERM_CANCELED;
    let is_canceled = to_code == status_codes::TERM_CANCELED;

    match (was_canceled, is_canceled) {
        (false, true) => Ok(TermAdjustment::Increase),
        (true, false) if remaining_term == 0 => Err(AppError::business(
            "Não é possível reativar a reserva: o arranjo ficaria com termos negativos!",
        )),
        (true, false) => Ok(TermAdjustment::Decrease),
        _ => Ok(TermAdjustment::Unchanged),
    }
}

/// Último instante válido para iniciar uma reserva do pacote.
pub fn validity_deadline(
    first_start: NaiveDateTime,
    duration_days: i32,
    extend_duration_days: Option<i32>,
) -> NaiveDateTime {
    first_start + Duration::days(i64::from(duration_days) + i64::from(extend_duration_days.unwrap_or(0)))
}

pub fn ensure_within_validity(
    first_start: Option<NaiveDateTime>,
    new_start: NaiveDateTime,
    duration_days: i32,
    extend_duration_days: Option<i32>,
) -> Result<(), AppError> {
    let Some(first_start) = first_start else {
        return Ok(());
    };

    if validity_deadline(first_start, duration_days, extend_duration_days) < new_start {
        return Err(AppError::business(
            "Não é possível reservar: o período de validade do pacote expirou!",
        ));
    }
    Ok(())
}

/// Ordem do dashboard: hoje primeiro (crescente), depois futuras (crescente),
/// depois passadas (mais recentes primeiro).
pub fn dashboard_order(a: NaiveDateTime, b: NaiveDateTime, now: NaiveDateTime) -> Ordering {
    let tier = |start: NaiveDateTime| {
        if start.date() == now.date() {
            0
        } else if start > now {
            1
        } else {
            2
        }
    };

    let (tier_a, tier_b) = (tier(a), tier(b));
    tier_a.cmp(&tier_b).then_with(|| match tier_a {
        2 => b.cmp(&a),
        _ => a.cmp(&b),
    })
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct ReservationService {
    repo: ReservationRepository,
    arrangement_repo: ArrangementRepository,
    arrangements: ArrangementService,
    catalog: CatalogService,
}

impl ReservationService {
    pub fn new(
        repo: ReservationRepository,
        arrangement_repo: ArrangementRepository,
        arrangements: ArrangementService,
        catalog: CatalogService,
    ) -> Self {
        Self { repo, arrangement_repo, arrangements, catalog }
    }

    // --- ESCRITA ---

    pub async fn create(
        &self,
        scope: &TenantScope,
        payload: CreateReservationPayload,
    ) -> Result<ReservationView, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        // Trava o arranjo: termos e primeira reserva não mudam até o commit.
        let arrangement = self
            .arrangement_repo
            .find_by_id_for_update(&mut *tx, scope.tenant_id, payload.arrangement_id)
            .await?;
        let arrangement = scope.require(arrangement, "Arranjo", payload.arrangement_id)?;
        let reserved = self
            .catalog
            .find_status_by_code(&mut *tx, status_codes::TERM_RESERVED)
            .await?;

        if arrangement.remaining_term == 0 {
            tracing::warn!(tenant = %scope.tenant_id, arrangement = %arrangement.id, "Reserva recusada: sem termos");
            return Err(AppError::business(
                "Não é possível reservar: todos os termos do arranjo já foram utilizados!",
            ));
        }

        let package = self
            .catalog
            .find_service_package(&mut *tx, scope, arrangement.service_package_id)
            .await?;
        let first = self
            .repo
            .first_by_arrangement(&mut *tx, scope.tenant_id, arrangement.id)
            .await?;
        ensure_within_validity(
            first.map(|r| r.start_date),
            payload.start_date,
            package.duration_days,
            arrangement.extend_duration_days,
        )?;

        let end_date = payload.start_date + Duration::minutes(i64::from(payload.duration_minutes));
        let reservation = self
            .repo
            .insert(
                &mut *tx,
                scope.tenant_id,
                arrangement.id,
                reserved.id,
                payload.start_date,
                end_date,
                payload.note.as_deref(),
                scope.user_id,
            )
            .await?;

        self.arrangements
            .decrease_remaining_term(&mut *tx, scope, arrangement.id)
            .await?;

        let view = self.build_view(&mut tx, scope, reservation).await?;
        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, reservation = %view.reservation_id, "📅 Reserva criada");
        Ok(view)
    }

    pub async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        payload: UpdateReservationPayload,
    ) -> Result<ReservationView, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let new_status = self.catalog.find_status(&mut *tx, payload.status_id).await?;
        ensure_reservation_status(&new_status)?;

        let current = self.load_locked(&mut tx, scope, id).await?;
        self.transition(&mut tx, scope, &current, &new_status).await?;

        let updated = self
            .repo
            .update_status_and_note(
                &mut *tx,
                scope.tenant_id,
                id,
                new_status.id,
                payload.note.as_deref(),
                scope.user_id,
            )
            .await?;
        let updated = scope.require(updated, ENTITY, id)?;

        let view = self.build_view(&mut tx, scope, updated).await?;
        tx.commit().await?;

        tracing::info!(
            tenant = %scope.tenant_id,
            reservation = %id,
            "🔁 Reserva atualizada: {} -> {}", current.status_code, new_status.code
        );
        Ok(view)
    }

    pub async fn cancel(&self, scope: &TenantScope, id: Uuid) -> Result<Uuid, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let canceled = self
            .catalog
            .find_status_by_code(&mut *tx, status_codes::TERM_CANCELED)
            .await?;
        let current = self.load_locked(&mut tx, scope, id).await?;

        self.transition(&mut tx, scope, &current, &canceled).await?;
        self.repo
            .update_status(&mut *tx, scope.tenant_id, id, canceled.id, scope.user_id)
            .await?;

        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, reservation = %id, "🚫 Reserva cancelada");
        Ok(id)
    }

    pub async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<Uuid, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let current = self.load_locked(&mut tx, scope, id).await?;

        // Compensa o termo que a reserva consumia
        if current.status_code != status_codes::TERM_CANCELED {
            self.arrangements
                .increase_remaining_term(&mut *tx, scope, current.arrangement_id)
                .await?;
        }

        let deleted = self.repo.soft_delete(&mut *tx, scope.tenant_id, id, scope.user_id).await?;
        if !deleted {
            return Err(AppError::not_found(ENTITY, id));
        }

        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, reservation = %id, "🗑️ Reserva excluída");
        Ok(id)
    }

    /// Tarefa noturna: reservas ainda "reservadas" com início em `day` passam a "utilizadas".
    pub async fn transition_expired(&self, scope: &TenantScope, day: NaiveDate) -> Result<usize, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let reserved = self
            .catalog
            .find_status_by_code(&mut *tx, status_codes::TERM_RESERVED)
            .await?;
        let used = self
            .catalog
            .find_status_by_code(&mut *tx, status_codes::TERM_USED)
            .await?;

        let pending = self
            .repo
            .find_by_status_on_date(&mut *tx, scope.tenant_id, reserved.id, day)
            .await?;

        for reservation in &pending {
            self.repo
                .update_status(&mut *tx, scope.tenant_id, reservation.id, used.id, scope.user_id)
                .await?;
            self.repo
                .insert_history(&mut *tx, scope.tenant_id, reservation.id, reservation.status_id, scope.user_id)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, %day, count = pending.len(), "⏱️ Reservas marcadas como utilizadas");
        Ok(pending.len())
    }

    /// Roda a transição em cada tenant, em sequência. A falha de um não interrompe os outros.
    pub async fn transition_expired_for_all_tenants(&self, day: NaiveDate) -> Result<usize, AppError> {
        let tenants = self.catalog.list_tenant_ids(self.repo.get_pool()).await?;
        let mut transitioned = 0;

        for tenant_id in tenants {
            match self.transition_expired(&TenantScope::system(tenant_id), day).await {
                Ok(count) => transitioned += count,
                Err(e) => tracing::error!(tenant = %tenant_id, "❌ Falha na transição de reservas: {:?}", e),
            }
        }

        Ok(transitioned)
    }

    // --- LEITURA ---

    pub async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<ReservationView, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let reservation = self.repo.find_by_id(&mut *tx, scope.tenant_id, id).await?;
        let reservation = scope.require(reservation, ENTITY, id)?;
        let view = self.build_view(&mut tx, scope, reservation).await?;
        tx.commit().await?;
        Ok(view)
    }

    pub async fn find_by_arrangement_id(
        &self,
        scope: &TenantScope,
        arrangement_id: Uuid,
    ) -> Result<Vec<ReservationShortInfo>, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        self.ensure_arrangement(&mut tx, scope, arrangement_id).await?;
        let rows = self
            .repo
            .short_info_by_arrangement(&mut *tx, scope.tenant_id, arrangement_id)
            .await?;
        tx.commit().await?;
        Ok(rows)
    }

    pub async fn exists_by_arrangement(&self, scope: &TenantScope, arrangement_id: Uuid) -> Result<bool, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        self.ensure_arrangement(&mut tx, scope, arrangement_id).await?;
        let exists = self
            .repo
            .exists_by_arrangement(&mut *tx, scope.tenant_id, arrangement_id)
            .await?;
        tx.commit().await?;
        Ok(exists)
    }

    pub async fn find_all(
        &self,
        scope: &TenantScope,
        filter: ReservationFilter,
        page: PageRequest,
    ) -> Result<Page<ReservationTableView>, AppError> {
        let now = Local::now().naive_local();
        let (start_date, end_date) = complete_date_range(filter.start_date, filter.end_date, now);
        let filter = ReservationFilter { start_date, end_date, ..filter };

        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let rows = self.repo.find_table_rows(&mut *tx, scope.tenant_id, &filter).await?;
        tx.commit().await?;

        let mut views = rows
            .into_iter()
            .map(|row| {
                let row_id = row.id;
                scope.ensure_owned(row, ENTITY, row_id).map(ReservationTableView::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        views.sort_by(|a, b| dashboard_order(a.start_date, b.start_date, now));

        let total = views.len() as i64;
        Ok(Page {
            content: page.slice(views),
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }

    pub async fn history(&self, scope: &TenantScope, id: Uuid) -> Result<Vec<ReservationHistoryEntry>, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let reservation = self.repo.find_by_id(&mut *tx, scope.tenant_id, id).await?;
        scope.require(reservation, ENTITY, id)?;
        let entries = self.repo.list_history(&mut *tx, scope.tenant_id, id).await?;
        tx.commit().await?;
        Ok(entries)
    }

    // --- AUXILIARES ---

    /// Carrega a reserva e trava o arranjo dela.
    async fn load_locked(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Reservation, AppError> {
        let reservation = self.repo.find_by_id(&mut *conn, scope.tenant_id, id).await?;
        let reservation = scope.require(reservation, ENTITY, id)?;

        let arrangement = self
            .arrangement_repo
            .find_by_id_for_update(&mut *conn, scope.tenant_id, reservation.arrangement_id)
            .await?;
        scope.require(arrangement, "Arranjo", reservation.arrangement_id)?;

        Ok(reservation)
    }

    /// Aplica a contabilidade de termos e grava o histórico (status anterior).
    async fn transition(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        current: &Reservation,
        new_status: &Status,
    ) -> Result<(), AppError> {
        if current.status_id == new_status.id {
            return Ok(());
        }

        let arrangement = self
            .arrangement_repo
            .find_by_id(&mut *conn, scope.tenant_id, current.arrangement_id)
            .await?;
        let arrangement = scope.require(arrangement, "Arranjo", current.arrangement_id)?;

        match term_adjustment(&current.status_code, &new_status.code, arrangement.remaining_term)? {
            TermAdjustment::Increase => {
                self.arrangements
                    .increase_remaining_term(&mut *conn, scope, arrangement.id)
                    .await?;
            }
            TermAdjustment::Decrease => {
                self.arrangements
                    .decrease_remaining_term(&mut *conn, scope, arrangement.id)
                    .await?;
            }
            TermAdjustment::Unchanged => {}
        }

        self.repo
            .insert_history(&mut *conn, scope.tenant_id, current.id, current.status_id, scope.user_id)
            .await
    }

    async fn ensure_arrangement(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        arrangement_id: Uuid,
    ) -> Result<(), AppError> {
        let arrangement = self
            .arrangement_repo
            .find_by_id(&mut *conn, scope.tenant_id, arrangement_id)
            .await?;
        scope.require(arrangement, "Arranjo", arrangement_id).map(|_| ())
    }

    async fn build_view(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        reservation: Reservation,
    ) -> Result<ReservationView, AppError> {
        let arrangement = self
            .arrangements
            .load_view(&mut *conn, scope, reservation.arrangement_id)
            .await?;
        let status = self.catalog.find_status(&mut *conn, reservation.status_id).await?;

        Ok(ReservationView {
            reservation_id: reservation.id,
            arrangement,
            status,
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            created_at: reservation.created_at,
            note: reservation.note,
        })
    }
}

fn ensure_reservation_status(status: &Status) -> Result<(), AppError> {
    if status.type_code != status_codes::RESERVATION_TYPE {
        return Err(AppError::business("Status inválido para reserva!"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use sqlx::PgPool;
    use testresult::TestResult;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|day| day.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    /// Simula os termos de um arranjo ao longo de várias transições.
    fn apply(remaining: i32, from: &str, to: &str) -> Result<i32, AppError> {
        Ok(match term_adjustment(from, to, remaining)? {
            TermAdjustment::Increase => remaining + 1,
            TermAdjustment::Decrease => remaining - 1,
            TermAdjustment::Unchanged => remaining,
        })
    }

    #[test]
    fn cancel_then_restore_is_net_zero() {
        let start = 4;
        let after_cancel = apply(start, status_codes::TERM_RESERVED, status_codes::TERM_CANCELED).unwrap();
        assert_eq!(after_cancel, 5);

        let restored = apply(after_cancel, status_codes::TERM_CANCELED, status_codes::TERM_RESERVED).unwrap();
        assert_eq!(restored, start);
    }

    #[test]
    fn leaving_canceled_with_zero_terms_is_rejected() {
        let err = term_adjustment(status_codes::TERM_CANCELED, status_codes::TERM_USED, 0).unwrap_err();
        assert!(matches!(err, AppError::BusinessError(_)));
    }

    #[test]
    fn moves_outside_canceled_do_not_touch_terms() {
        assert_eq!(
            term_adjustment(status_codes::TERM_RESERVED, status_codes::TERM_USED, 0).unwrap(),
            TermAdjustment::Unchanged
        );
        assert_eq!(
            term_adjustment(status_codes::TERM_CANCELED, status_codes::TERM_CANCELED, 0).unwrap(),
            TermAdjustment::Unchanged
        );
    }

    #[test]
    fn first_reservation_has_no_window() {
        assert!(ensure_within_validity(None, at(2030, 1, 1, 9), 30, None).is_ok());
    }

    #[test]
    fn validity_window_includes_extension() {
        let first = at(2024, 1, 1, 9);

        // 30 dias: até 31/01 09:00
        assert!(ensure_within_validity(Some(first), at(2024, 1, 31, 9), 30, None).is_ok());
        assert!(ensure_within_validity(Some(first), at(2024, 1, 31, 10), 30, None).is_err());

        // +5 dias de extensão
        assert!(ensure_within_validity(Some(first), at(2024, 2, 5, 9), 30, Some(5)).is_ok());
        assert!(ensure_within_validity(Some(first), at(2024, 2, 6, 9), 30, Some(5)).is_err());
    }

    #[test]
    fn dashboard_puts_today_then_future_then_past() {
        let now = at(2024, 5, 10, 12);
        let mut starts = vec![
            at(2024, 5, 8, 9),   // passado
            at(2024, 5, 12, 9),  // futuro
            at(2024, 5, 10, 15), // hoje, depois de agora
            at(2024, 5, 9, 9),   // passado mais recente
            at(2024, 5, 11, 9),  // futuro mais próximo
            at(2024, 5, 10, 8),  // hoje, antes de agora
        ];

        starts.sort_by(|a, b| dashboard_order(*a, *b, now));

        assert_eq!(
            starts,
            vec![
                at(2024, 5, 10, 8),
                at(2024, 5, 10, 15),
                at(2024, 5, 11, 9),
                at(2024, 5, 12, 9),
                at(2024, 5, 9, 9),
                at(2024, 5, 8, 9),
            ]
        );
    }

    #[test]
    fn only_reservation_statuses_are_accepted() {
        let arrangement_status = Status {
            id: Uuid::new_v4(),
            code: status_codes::ARRANGEMENT_CREATED.into(),
            name: "Criado".into(),
            type_code: "arrangement".into(),
        };
        assert!(ensure_reservation_status(&arrangement_status).is_err());

        let reserved = Status {
            type_code: status_codes::RESERVATION_TYPE.into(),
            code: status_codes::TERM_RESERVED.into(),
            ..arrangement_status
        };
        assert!(ensure_reservation_status(&reserved).is_ok());
    }

    // --- Contra o banco ---

    // Hora cheia: o TIMESTAMP do banco guarda só microssegundos
    fn today_at(hour: u32) -> NaiveDateTime {
        Local::now().date_naive().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn reserve(arrangement_id: Uuid, start_date: NaiveDateTime) -> CreateReservationPayload {
        CreateReservationPayload { arrangement_id, start_date, duration_minutes: 45, note: None }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn exhausted_arrangement_rejects_reservation_without_decrementing(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let scope = test_support::tenant(&pool, "Spa A").await?;
        let catalog = test_support::catalog(&pool, &scope, 1).await?;
        let arrangement = state.arrangement_service.create(&scope, catalog.arrangement(None)).await?;
        let id = arrangement.arrangement_id;
        let start = today_at(9);

        let first = state.reservation_service.create(&scope, reserve(id, start)).await?;
        assert_eq!(first.arrangement.remaining_term, 0);
        assert_eq!(first.end_date, start + Duration::minutes(45));

        let rejected = state
            .reservation_service
            .create(&scope, reserve(id, start + Duration::days(1)))
            .await;
        assert!(matches!(rejected, Err(AppError::BusinessError(_))));

        assert_eq!(state.arrangement_service.find_by_id(&scope, id).await?.remaining_term, 0);
        let live = test_support::count(
            &pool,
            &scope,
            "SELECT COUNT(*) FROM reservations WHERE arrangement_id = $1 AND deleted_at IS NULL",
            id,
        )
        .await?;
        assert_eq!(live, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cancel_and_restore_leave_the_term_count_unchanged(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let scope = test_support::tenant(&pool, "Spa A").await?;
        let catalog = test_support::catalog(&pool, &scope, 2).await?;
        let arrangement = state.arrangement_service.create(&scope, catalog.arrangement(None)).await?;
        let arrangement_id = arrangement.arrangement_id;
        let reserved = state
            .catalog_service
            .find_status_by_code(&pool, status_codes::TERM_RESERVED)
            .await?;

        let reservation = state
            .reservation_service
            .create(&scope, reserve(arrangement_id, today_at(10)))
            .await?;
        let id = reservation.reservation_id;
        assert_eq!(reservation.arrangement.remaining_term, 1);

        state.reservation_service.cancel(&scope, id).await?;
        assert_eq!(state.arrangement_service.find_by_id(&scope, arrangement_id).await?.remaining_term, 2);

        // Cancelar de novo não devolve outro termo
        state.reservation_service.cancel(&scope, id).await?;
        assert_eq!(state.arrangement_service.find_by_id(&scope, arrangement_id).await?.remaining_term, 2);

        let restored = state
            .reservation_service
            .update(&scope, id, UpdateReservationPayload { status_id: reserved.id, note: None })
            .await?;
        assert_eq!(restored.arrangement.remaining_term, 1);
        assert_eq!(restored.status.code, status_codes::TERM_RESERVED);

        let history = state.reservation_service.history(&scope, id).await?;
        assert_eq!(history.len(), 2);
        Ok(())
    }
}
