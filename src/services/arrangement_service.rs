// src/services/arrangement_service.rs

use chrono::{Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{begin_scoped_transaction, complete_date_range, PageRequest, TenantScope},
        error::AppError,
    },
    db::{ArrangementRepository, ReservationRepository},
    models::{
        arrangement::{
            Arrangement, ArrangementDetails, ArrangementFilter, ArrangementValues, ArrangementView,
            CreateArrangementPayload, Page, ShortDetails, UpdateArrangementPayload, UserActionType,
        },
        catalog::{status_codes, Discount, GiftCard},
    },
    services::{audit_service::AuditService, catalog_service::CatalogService},
};

const ENTITY: &str = "Arranjo";

// =============================================================================
//  REGRAS PURAS (preço, desconto, cartão-presente)
// =============================================================================

/// Preço do arranjo: preço do pacote menos o efeito do desconto.
/// Percentual arredonda a parte descontada em 2 casas (meio para cima).
pub fn compute_price(package_price: Decimal, discount: Option<&Discount>) -> Result<Decimal, AppError> {
    let Some(discount) = discount else {
        return Ok(package_price);
    };

    let reduction = if discount.is_percentage {
        (package_price * discount.value / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        discount.value
    };

    if reduction > package_price {
        tracing::warn!("Desconto {} maior que o preço {}", discount.label(), package_price);
        return Err(AppError::business("O desconto é maior que o preço do pacote!"));
    }

    Ok(package_price - reduction)
}

/// O que fazer com os cartões-presente numa criação/edição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GiftCardPlan {
    pub release: Option<Uuid>,
    pub attach: Option<Uuid>,
}

pub fn plan_gift_card(
    current: Option<Uuid>,
    requested: Option<Uuid>,
    has_discount: bool,
) -> Result<GiftCardPlan, AppError> {
    match requested {
        None => Ok(GiftCardPlan { release: current, attach: None }),
        Some(_) if !has_discount => Err(AppError::business(
            "É preciso escolher um desconto para aplicar o cartão-presente!",
        )),
        Some(new_card) => Ok(GiftCardPlan {
            release: current.filter(|old| *old != new_card),
            attach: Some(new_card),
        }),
    }
}

/// Vencimento comparado por data de calendário: vence no fim do dia de expiração.
pub fn validate_gift_card(card: &GiftCard, current: Option<Uuid>, today: NaiveDate) -> Result<(), AppError> {
    if let Some(expiration) = card.expiration_date {
        if today > expiration.date() {
            return Err(AppError::business("O cartão-presente expirou!"));
        }
    }

    // Um cartão só pode estar em um arranjo ativo.
    if card.used && current != Some(card.id) {
        return Err(AppError::business("O cartão-presente já está em uso!"));
    }

    Ok(())
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct ArrangementService {
    repo: ArrangementRepository,
    reservation_repo: ReservationRepository,
    catalog: CatalogService,
    audit: AuditService,
}

impl ArrangementService {
    pub fn new(
        repo: ArrangementRepository,
        reservation_repo: ReservationRepository,
        catalog: CatalogService,
        audit: AuditService,
    ) -> Self {
        Self { repo, reservation_repo, catalog, audit }
    }

    // --- ESCRITA ---

    pub async fn create(
        &self,
        scope: &TenantScope,
        payload: CreateArrangementPayload,
    ) -> Result<ArrangementView, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        // 1. Resolve as entidades
        let baby = self.catalog.find_baby(&mut *tx, scope, payload.baby_id).await?;
        let service_package = self
            .catalog
            .find_service_package(&mut *tx, scope, payload.service_package_id)
            .await?;
        let status = self
            .catalog
            .find_status_by_code(&mut *tx, status_codes::ARRANGEMENT_CREATED)
            .await?;
        let discount = match payload.discount_id {
            Some(id) => Some(self.catalog.find_discount(&mut *tx, scope, id).await?),
            None => None,
        };

        // 2. Regras
        let price = compute_price(service_package.price, discount.as_ref())?;
        let plan = plan_gift_card(None, payload.gift_card_id, discount.is_some())?;
        let gift_card = self.apply_gift_card_plan(&mut tx, scope, plan, None).await?;

        // 3. Grava
        let values = ArrangementValues {
            baby_id: baby.id,
            service_package_id: service_package.id,
            discount_id: discount.as_ref().map(|d| d.id),
            gift_card_id: gift_card.as_ref().map(|g| g.id),
            payment_type_id: None,
            status_id: status.id,
            price,
            remaining_term: service_package.term_number,
            extend_duration_days: None,
            note: payload.note,
        };
        let arrangement = self.repo.insert(&mut *tx, scope.tenant_id, &values, scope.user_id).await?;

        // 4. Audita na mesma transação
        let details = ArrangementDetails {
            arrangement,
            baby,
            service_package,
            status,
            discount,
            payment_type: None,
            gift_card,
        };
        self.audit.record(&mut tx, scope, &details, UserActionType::Create).await?;

        let view = self.load_view(&mut tx, scope, details.arrangement.id).await?;
        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, arrangement = %view.arrangement_id, "✅ Arranjo criado");
        Ok(view)
    }

    pub async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        payload: UpdateArrangementPayload,
    ) -> Result<ArrangementView, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let current = self.repo.find_by_id_for_update(&mut *tx, scope.tenant_id, id).await?;
        let current = scope.require(current, ENTITY, id)?;

        // Estado anterior, usado no snapshot da auditoria
        let before = self.load_details(&mut tx, scope, current).await?;

        // Com reservas, bebê / pacote / termos restantes ficam congelados.
        let frozen = self
            .reservation_repo
            .exists_by_arrangement(&mut *tx, scope.tenant_id, id)
            .await?;

        let (baby_id, service_package, remaining_term) = if frozen {
            (before.baby.id, before.service_package.clone(), before.arrangement.remaining_term)
        } else {
            let baby = self.catalog.find_baby(&mut *tx, scope, payload.baby_id).await?;
            let package = self
                .catalog
                .find_service_package(&mut *tx, scope, payload.service_package_id)
                .await?;
            let term_number = package.term_number;
            (baby.id, package, term_number)
        };

        let status = self.catalog.find_status(&mut *tx, payload.status_id).await?;
        let payment_type = match payload.payment_type_id {
            Some(pid) => Some(self.catalog.find_payment_type(&mut *tx, scope, pid).await?),
            None => None,
        };
        let discount = match payload.discount_id {
            Some(did) => Some(self.catalog.find_discount(&mut *tx, scope, did).await?),
            None => None,
        };

        let price = compute_price(service_package.price, discount.as_ref())?;
        let current_card = before.arrangement.gift_card_id;
        let plan = plan_gift_card(current_card, payload.gift_card_id, discount.is_some())?;
        let gift_card = self.apply_gift_card_plan(&mut tx, scope, plan, current_card).await?;

        let values = ArrangementValues {
            baby_id,
            service_package_id: service_package.id,
            discount_id: discount.as_ref().map(|d| d.id),
            gift_card_id: gift_card.as_ref().map(|g| g.id),
            payment_type_id: payment_type.as_ref().map(|p| p.id),
            status_id: status.id,
            price,
            remaining_term,
            extend_duration_days: payload.extend_duration_days,
            note: payload.note,
        };
        let updated = self
            .repo
            .update(&mut *tx, scope.tenant_id, id, &values, scope.user_id)
            .await?;
        scope.require(updated, ENTITY, id)?;

        self.audit.record(&mut tx, scope, &before, UserActionType::Update).await?;

        let view = self.load_view(&mut tx, scope, id).await?;
        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, arrangement = %id, frozen, "✏️ Arranjo atualizado");
        Ok(view)
    }

    pub async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<Uuid, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let current = self.repo.find_by_id_for_update(&mut *tx, scope.tenant_id, id).await?;
        let current = scope.require(current, ENTITY, id)?;

        if self
            .reservation_repo
            .exists_by_arrangement(&mut *tx, scope.tenant_id, id)
            .await?
        {
            tracing::warn!(tenant = %scope.tenant_id, arrangement = %id, "Exclusão bloqueada: há reservas");
            return Err(AppError::business(
                "Não é possível excluir um arranjo com reservas vinculadas!",
            ));
        }

        let deleted = self.repo.soft_delete(&mut *tx, scope.tenant_id, id, scope.user_id).await?;
        let deleted = scope.require(deleted, ENTITY, id)?;

        // O cartão volta a ficar disponível
        if let Some(card_id) = current.gift_card_id {
            self.catalog.update_gift_card_used(&mut *tx, scope, card_id, false).await?;
        }

        let details = self.load_details(&mut tx, scope, deleted).await?;
        self.audit.record(&mut tx, scope, &details, UserActionType::Delete).await?;

        tx.commit().await?;

        tracing::info!(tenant = %scope.tenant_id, arrangement = %id, "🗑️ Arranjo excluído");
        Ok(id)
    }

    // --- CONTABILIDADE DE TERMOS (usada só pelo motor de reservas) ---

    pub async fn increase_remaining_term<'e, E>(
        &self,
        executor: E,
        scope: &TenantScope,
        arrangement_id: Uuid,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let remaining = self
            .repo
            .adjust_remaining_term(executor, scope.tenant_id, arrangement_id, 1)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, arrangement_id))?;

        tracing::info!(tenant = %scope.tenant_id, arrangement = %arrangement_id, remaining, "➕ Termo devolvido");
        Ok(remaining)
    }

    pub async fn decrease_remaining_term<'e, E>(
        &self,
        executor: E,
        scope: &TenantScope,
        arrangement_id: Uuid,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let remaining = self
            .repo
            .adjust_remaining_term(executor, scope.tenant_id, arrangement_id, -1)
            .await?
            .ok_or_else(|| {
                tracing::warn!(tenant = %scope.tenant_id, arrangement = %arrangement_id, "Sem termos restantes");
                AppError::business("O arranjo não possui termos restantes!")
            })?;

        tracing::info!(tenant = %scope.tenant_id, arrangement = %arrangement_id, remaining, "➖ Termo consumido");
        Ok(remaining)
    }

    // --- LEITURA ---

    pub async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<ArrangementView, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let view = self.load_view(&mut tx, scope, id).await?;
        tx.commit().await?;
        Ok(view)
    }

    pub async fn find_all(
        &self,
        scope: &TenantScope,
        filter: ArrangementFilter,
        page: PageRequest,
    ) -> Result<Page<ArrangementView>, AppError> {
        let filter = with_completed_dates(filter);
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        let total = self.repo.count(&mut *tx, scope.tenant_id, &filter).await?;
        let rows = self.repo.find_views(&mut *tx, scope.tenant_id, &filter, page).await?;
        tx.commit().await?;

        let content = rows
            .into_iter()
            .map(|row| {
                let row_id = row.id;
                scope.ensure_owned(row, ENTITY, row_id).map(ArrangementView::from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { content, page: page.page, size: page.size, total_elements: total })
    }

    pub async fn find_total_price_sum(
        &self,
        scope: &TenantScope,
        filter: ArrangementFilter,
    ) -> Result<Decimal, AppError> {
        let filter = with_completed_dates(filter);
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let total = self.repo.total_price_sum(&mut *tx, scope.tenant_id, &filter).await?;
        tx.commit().await?;
        Ok(total)
    }

    pub async fn find_all_short_list(&self, scope: &TenantScope) -> Result<Vec<ShortDetails>, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let rows = self.repo.short_list(&mut *tx, scope.tenant_id).await?;
        tx.commit().await?;
        Ok(rows.into_iter().map(ShortDetails::from).collect())
    }

    pub async fn exists_by_service_package(
        &self,
        scope: &TenantScope,
        service_package_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;
        let package = self
            .catalog
            .find_service_package(&mut *tx, scope, service_package_id)
            .await?;
        let exists = self
            .repo
            .exists_by_service_package(&mut *tx, scope.tenant_id, package.id)
            .await?;
        tx.commit().await?;
        Ok(exists)
    }

    // --- AUXILIARES ---

    /// Libera o cartão anterior e marca o novo como usado. Valida antes de qualquer escrita.
    async fn apply_gift_card_plan(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        plan: GiftCardPlan,
        current: Option<Uuid>,
    ) -> Result<Option<GiftCard>, AppError> {
        let new_card = match plan.attach {
            Some(card_id) => {
                let card = self.catalog.lock_gift_card(&mut *conn, scope, card_id).await?;
                validate_gift_card(&card, current, Local::now().date_naive())?;
                Some(card)
            }
            None => None,
        };

        if let Some(old_id) = plan.release {
            self.catalog.update_gift_card_used(&mut *conn, scope, old_id, false).await?;
        }

        match new_card {
            Some(card) => Ok(Some(
                self.catalog.update_gift_card_used(&mut *conn, scope, card.id, true).await?,
            )),
            None => Ok(None),
        }
    }

    /// Resolve todas as entidades ligadas ao arranjo (para snapshot).
    async fn load_details(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        arrangement: Arrangement,
    ) -> Result<ArrangementDetails, AppError> {
        let baby = self.catalog.find_baby(&mut *conn, scope, arrangement.baby_id).await?;
        let service_package = self
            .catalog
            .find_service_package(&mut *conn, scope, arrangement.service_package_id)
            .await?;
        let status = self.catalog.find_status(&mut *conn, arrangement.status_id).await?;
        let discount = match arrangement.discount_id {
            Some(id) => Some(self.catalog.find_discount(&mut *conn, scope, id).await?),
            None => None,
        };
        let payment_type = match arrangement.payment_type_id {
            Some(id) => Some(self.catalog.find_payment_type(&mut *conn, scope, id).await?),
            None => None,
        };
        let gift_card = match arrangement.gift_card_id {
            Some(id) => Some(self.catalog.find_gift_card(&mut *conn, scope, id).await?),
            None => None,
        };

        Ok(ArrangementDetails {
            arrangement,
            baby,
            service_package,
            status,
            discount,
            payment_type,
            gift_card,
        })
    }

    pub(crate) async fn load_view(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<ArrangementView, AppError> {
        let row = self.repo.find_view(&mut *conn, scope.tenant_id, id).await?;
        scope.require(row, ENTITY, id).map(ArrangementView::from)
    }
}

fn with_completed_dates(mut filter: ArrangementFilter) -> ArrangementFilter {
    let (start, end) = complete_date_range(filter.start_date, filter.end_date, Local::now().naive_local());
    filter.start_date = start;
    filter.end_date = end;
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::NaiveDateTime;
    use sqlx::PgPool;
    use testresult::TestResult;

    fn discount(value: Decimal, is_percentage: bool) -> Discount {
        Discount {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Desconto".into(),
            value,
            is_percentage,
        }
    }

    fn card(expiration: Option<NaiveDateTime>, used: bool) -> GiftCard {
        GiftCard {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            serial_number: "GC-0001".into(),
            expiration_date: expiration,
            used,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // --- Preço ---

    #[test]
    fn no_discount_keeps_package_price() {
        let price = compute_price(Decimal::new(50000, 2), None).unwrap();
        assert_eq!(price, Decimal::new(50000, 2));
    }

    #[test]
    fn percentage_discount_of_ten_percent() {
        let d = discount(Decimal::new(10, 0), true);
        let price = compute_price(Decimal::new(50000, 2), Some(&d)).unwrap();
        assert_eq!(price, Decimal::new(45000, 2));
    }

    #[test]
    fn fixed_discount_is_subtracted() {
        let d = discount(Decimal::new(8000, 2), false);
        let price = compute_price(Decimal::new(50000, 2), Some(&d)).unwrap();
        assert_eq!(price, Decimal::new(42000, 2));
    }

    #[test]
    fn fixed_discount_above_price_is_rejected() {
        let d = discount(Decimal::new(60000, 2), false);
        let err = compute_price(Decimal::new(50000, 2), Some(&d)).unwrap_err();
        assert!(matches!(err, AppError::BusinessError(_)));
    }

    #[test]
    fn zero_percent_leaves_price_unchanged() {
        let d = discount(Decimal::ZERO, true);
        let price = compute_price(Decimal::new(50000, 2), Some(&d)).unwrap();
        assert_eq!(price, Decimal::new(50000, 2));
    }

    #[test]
    fn percentage_reduction_rounds_half_up() {
        // 10.05 * 50% = 5.025 -> 5.03
        let d = discount(Decimal::new(50, 0), true);
        let price = compute_price(Decimal::new(1005, 2), Some(&d)).unwrap();
        assert_eq!(price, Decimal::new(502, 2));
    }

    #[test]
    fn price_is_identical_for_create_and_update_paths() {
        let d = discount(Decimal::new(125, 1), true);
        let first = compute_price(Decimal::new(19990, 2), Some(&d)).unwrap();
        let second = compute_price(Decimal::new(19990, 2), Some(&d)).unwrap();
        assert_eq!(first, second);
    }

    // --- Cartão-presente ---

    #[test]
    fn gift_card_requires_a_discount() {
        let err = plan_gift_card(None, Some(Uuid::new_v4()), false).unwrap_err();
        assert!(matches!(err, AppError::BusinessError(_)));
    }

    #[test]
    fn removing_gift_card_releases_current_one() {
        let old = Uuid::new_v4();
        let plan = plan_gift_card(Some(old), None, true).unwrap();
        assert_eq!(plan, GiftCardPlan { release: Some(old), attach: None });

        // sem desconto também é permitido remover
        let plan = plan_gift_card(Some(old), None, false).unwrap();
        assert_eq!(plan.release, Some(old));
    }

    #[test]
    fn swapping_gift_card_releases_previous() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        let plan = plan_gift_card(Some(old), Some(new), true).unwrap();
        assert_eq!(plan, GiftCardPlan { release: Some(old), attach: Some(new) });
    }

    #[test]
    fn keeping_same_gift_card_releases_nothing() {
        let same = Uuid::new_v4();
        let plan = plan_gift_card(Some(same), Some(same), true).unwrap();
        assert_eq!(plan, GiftCardPlan { release: None, attach: Some(same) });
    }

    #[test]
    fn expired_gift_card_is_rejected_by_calendar_date() {
        let expires = day(2024, 5, 10).and_hms_opt(8, 0, 0);
        let c = card(expires, false);

        // Mesmo dia, depois do horário: ainda válido
        assert!(validate_gift_card(&c, None, day(2024, 5, 10)).is_ok());
        // Dia seguinte: expirado
        let err = validate_gift_card(&c, None, day(2024, 5, 11)).unwrap_err();
        assert!(matches!(err, AppError::BusinessError(_)));
    }

    #[test]
    fn gift_card_without_expiration_never_expires() {
        assert!(validate_gift_card(&card(None, false), None, day(2099, 1, 1)).is_ok());
    }

    #[test]
    fn used_gift_card_only_accepted_by_its_own_arrangement() {
        let c = card(None, true);
        assert!(validate_gift_card(&c, None, day(2024, 1, 1)).is_err());
        assert!(validate_gift_card(&c, Some(c.id), day(2024, 1, 1)).is_ok());
    }

    #[test]
    fn open_created_at_range_is_completed() {
        let end = day(2024, 2, 1).and_hms_opt(0, 0, 0);
        let filter = with_completed_dates(ArrangementFilter { end_date: end, ..Default::default() });
        assert_eq!(filter.start_date.map(|d| d.date()), Some(day(1999, 1, 1)));
        assert_eq!(filter.end_date, end);
    }

    // --- Contra o banco ---

    fn update_payload(
        catalog: &test_support::Catalog,
        status_id: Uuid,
        gift_card_id: Option<Uuid>,
    ) -> UpdateArrangementPayload {
        UpdateArrangementPayload {
            baby_id: catalog.baby_id,
            service_package_id: catalog.package_id,
            status_id,
            payment_type_id: None,
            discount_id: Some(catalog.discount_id),
            gift_card_id,
            extend_duration_days: Some(5),
            note: Some("renovação".into()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_attaches_leave_a_single_gift_card_holder(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let scope = test_support::tenant(&pool, "Spa A").await?;
        let catalog = test_support::catalog(&pool, &scope, 10).await?;
        let card = test_support::gift_card(&pool, &scope, "GC-0001").await?;

        let service = &state.arrangement_service;
        let (first, second) = tokio::join!(
            service.create(&scope, catalog.arrangement(Some(card))),
            service.create(&scope, catalog.arrangement(Some(card))),
        );

        assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);
        assert!(matches!(first.err().or(second.err()), Some(AppError::BusinessError(_))));

        let holders = test_support::count(
            &pool,
            &scope,
            "SELECT COUNT(*) FROM arrangements WHERE gift_card_id = $1 AND deleted_at IS NULL",
            card,
        )
        .await?;
        assert_eq!(holders, 1);
        assert!(test_support::gift_card_used(&pool, &scope, card).await?);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn every_mutation_appends_one_audit_with_its_snapshot(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let scope = test_support::tenant(&pool, "Spa A").await?;
        let catalog = test_support::catalog(&pool, &scope, 10).await?;
        let created_status = state
            .catalog_service
            .find_status_by_code(&pool, status_codes::ARRANGEMENT_CREATED)
            .await?;

        let audits = "SELECT COUNT(*) FROM arrangement_audits WHERE arrangement_id = $1";
        let snapshots = "SELECT COUNT(*) FROM arrangement_snapshots WHERE tenant_id = $1";

        let view = state.arrangement_service.create(&scope, catalog.arrangement(None)).await?;
        let id = view.arrangement_id;
        assert_eq!(view.price, Decimal::new(45000, 2));
        assert_eq!(view.remaining_term, 10);
        assert_eq!(test_support::count(&pool, &scope, audits, id).await?, 1);
        assert_eq!(test_support::count(&pool, &scope, snapshots, scope.tenant_id).await?, 1);

        state
            .arrangement_service
            .update(&scope, id, update_payload(&catalog, created_status.id, None))
            .await?;
        assert_eq!(test_support::count(&pool, &scope, audits, id).await?, 2);
        assert_eq!(test_support::count(&pool, &scope, snapshots, scope.tenant_id).await?, 2);

        state.arrangement_service.delete(&scope, id).await?;
        assert_eq!(test_support::count(&pool, &scope, audits, id).await?, 3);
        assert_eq!(test_support::count(&pool, &scope, snapshots, scope.tenant_id).await?, 3);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn swapping_or_removing_the_gift_card_releases_the_previous_one(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let scope = test_support::tenant(&pool, "Spa A").await?;
        let catalog = test_support::catalog(&pool, &scope, 10).await?;
        let first_card = test_support::gift_card(&pool, &scope, "GC-0001").await?;
        let second_card = test_support::gift_card(&pool, &scope, "GC-0002").await?;
        let status = state
            .catalog_service
            .find_status_by_code(&pool, status_codes::ARRANGEMENT_CREATED)
            .await?;

        let view = state
            .arrangement_service
            .create(&scope, catalog.arrangement(Some(first_card)))
            .await?;
        assert!(test_support::gift_card_used(&pool, &scope, first_card).await?);

        state
            .arrangement_service
            .update(&scope, view.arrangement_id, update_payload(&catalog, status.id, Some(second_card)))
            .await?;
        assert!(!test_support::gift_card_used(&pool, &scope, first_card).await?);
        assert!(test_support::gift_card_used(&pool, &scope, second_card).await?);

        state
            .arrangement_service
            .update(&scope, view.arrangement_id, update_payload(&catalog, status.id, None))
            .await?;
        assert!(!test_support::gift_card_used(&pool, &scope, second_card).await?);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn tenants_with_the_same_baby_never_reach_each_other(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let tenant_a = test_support::tenant(&pool, "Spa A").await?;
        let tenant_b = test_support::tenant(&pool, "Spa B").await?;
        let catalog_a = test_support::catalog(&pool, &tenant_a, 10).await?;
        let catalog_b = test_support::catalog(&pool, &tenant_b, 10).await?;
        let status = state
            .catalog_service
            .find_status_by_code(&pool, status_codes::ARRANGEMENT_CREATED)
            .await?;

        let view = state.arrangement_service.create(&tenant_a, catalog_a.arrangement(None)).await?;
        let id = view.arrangement_id;
        let service = &state.arrangement_service;

        assert!(matches!(service.find_by_id(&tenant_b, id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.update(&tenant_b, id, update_payload(&catalog_b, status.id, None)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(service.delete(&tenant_b, id).await, Err(AppError::NotFound(_))));

        // O bebê de A não serve para um arranjo de B
        assert!(matches!(
            service.create(&tenant_b, catalog_a.arrangement(None)).await,
            Err(AppError::NotFound(_))
        ));

        let page = PageRequest::new(None, None);
        let seen_by_b = service.find_all(&tenant_b, ArrangementFilter::default(), page).await?;
        assert_eq!(seen_by_b.total_elements, 0);

        let seen_by_a = service.find_all(&tenant_a, ArrangementFilter::default(), page).await?;
        assert_eq!(seen_by_a.total_elements, 1);
        assert_eq!(service.find_by_id(&tenant_a, id).await?.arrangement_id, id);
        Ok(())
    }
}
