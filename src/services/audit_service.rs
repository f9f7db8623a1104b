// src/services/audit_service.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{begin_scoped_transaction, TenantScope},
        error::AppError,
    },
    db::{ArrangementRepository, AuditRepository},
    models::arrangement::{
        ArrangementAuditEntry, ArrangementDetails, ArrangementSnapshot, BabySnapshot, DiscountSnapshot,
        GiftCardSnapshot, LabelSnapshot, ServicePackageSnapshot, UserActionType,
    },
};

/// Congela o estado do arranjo e das entidades ligadas.
/// Cada bloco guarda os campos estruturados e o texto legível do momento da ação.
pub fn build_snapshot(details: &ArrangementDetails) -> ArrangementSnapshot {
    let arrangement = &details.arrangement;

    ArrangementSnapshot {
        price: arrangement.price,
        remaining_term: arrangement.remaining_term,
        extend_duration_days: arrangement.extend_duration_days,
        note: arrangement.note.clone(),
        baby: BabySnapshot {
            id: details.baby.id,
            name: details.baby.name.clone(),
            surname: details.baby.surname.clone(),
            mother_name: details.baby.mother_name.clone(),
            phone_number: details.baby.phone_number.clone(),
            number_of_months: details.baby.number_of_months,
            text: details.baby.to_string(),
        },
        service_package: ServicePackageSnapshot {
            id: details.service_package.id,
            name: details.service_package.name.clone(),
            term_number: details.service_package.term_number,
            duration_days: details.service_package.duration_days,
            price: details.service_package.price,
            text: details.service_package.to_string(),
        },
        status: LabelSnapshot {
            id: details.status.id,
            code: details.status.code.clone(),
            name: details.status.name.clone(),
            text: details.status.to_string(),
        },
        discount: details.discount.as_ref().map(|d| DiscountSnapshot {
            id: d.id,
            name: d.name.clone(),
            value: d.value,
            is_percentage: d.is_percentage,
            text: d.to_string(),
        }),
        payment_type: details.payment_type.as_ref().map(|p| LabelSnapshot {
            id: p.id,
            code: p.code.clone(),
            name: p.name.clone(),
            text: p.to_string(),
        }),
        gift_card: details.gift_card.as_ref().map(|g| GiftCardSnapshot {
            id: g.id,
            serial_number: g.serial_number.clone(),
            expiration_date: g.expiration_date,
            used: g.used,
            text: g.to_string(),
        }),
    }
}

#[derive(Clone)]
pub struct AuditService {
    repo: AuditRepository,
    arrangement_repo: ArrangementRepository,
}

impl AuditService {
    pub fn new(repo: AuditRepository, arrangement_repo: ArrangementRepository) -> Self {
        Self { repo, arrangement_repo }
    }

    /// Grava snapshot + auditoria na MESMA conexão/transação da mutação.
    /// Se falhar, o chamador propaga o erro e toda a operação é desfeita.
    pub async fn record(
        &self,
        conn: &mut PgConnection,
        scope: &TenantScope,
        details: &ArrangementDetails,
        action: UserActionType,
    ) -> Result<Uuid, AppError> {
        let snapshot = build_snapshot(details);

        let snapshot_id = self.repo.insert_snapshot(&mut *conn, scope.tenant_id, &snapshot).await?;
        let audit_id = self
            .repo
            .insert_audit(
                &mut *conn,
                scope.tenant_id,
                details.arrangement.id,
                snapshot_id,
                action,
                scope.user_id,
            )
            .await?;

        tracing::info!(
            tenant = %scope.tenant_id,
            arrangement = %details.arrangement.id,
            "📝 Auditoria registrada: {}", action
        );
        Ok(audit_id)
    }

    pub async fn list_for_arrangement(
        &self,
        scope: &TenantScope,
        arrangement_id: Uuid,
    ) -> Result<Vec<ArrangementAuditEntry>, AppError> {
        let mut tx = begin_scoped_transaction(self.repo.get_pool(), scope).await?;

        // O arranjo precisa ser do tenant. Excluído também vale.
        let arrangement = self
            .arrangement_repo
            .find_by_id_with_deleted(&mut *tx, scope.tenant_id, arrangement_id)
            .await?;
        scope.require(arrangement, "Arranjo", arrangement_id)?;

        let entries = self
            .repo
            .list_for_arrangement(&mut *tx, scope.tenant_id, arrangement_id)
            .await?;

        tx.commit().await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        arrangement::Arrangement,
        catalog::{Baby, Discount, Lifecycle, ServicePackage, Status},
    };
    use crate::{models::catalog::status_codes, test_support};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use testresult::TestResult;

    fn sample_details() -> ArrangementDetails {
        let tenant = Uuid::new_v4();
        let baby = Baby {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: "Lara".into(),
            surname: Some("Silva".into()),
            mother_name: Some("Ana".into()),
            phone_number: "061222333".into(),
            birth_date: None,
            number_of_months: 7,
            note: None,
            created_at: Utc::now(),
            lifecycle: Lifecycle::default(),
        };
        let package = ServicePackage {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: "Pacote 10".into(),
            term_number: 10,
            duration_days: 60,
            price: Decimal::new(50000, 2),
            note: None,
            lifecycle: Lifecycle::default(),
        };
        let discount = Discount {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: "Irmãos".into(),
            value: Decimal::new(10, 0),
            is_percentage: true,
        };
        let status = Status {
            id: Uuid::new_v4(),
            code: "created".into(),
            name: "Criado".into(),
            type_code: "arrangement".into(),
        };
        let arrangement = Arrangement {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            baby_id: baby.id,
            service_package_id: package.id,
            discount_id: Some(discount.id),
            gift_card_id: None,
            payment_type_id: None,
            status_id: status.id,
            price: Decimal::new(45000, 2),
            remaining_term: 10,
            extend_duration_days: None,
            note: Some("primeira compra".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by_user_id: None,
            updated_by_user_id: None,
            lifecycle: Lifecycle::default(),
        };

        ArrangementDetails {
            arrangement,
            baby,
            service_package: package,
            status,
            discount: Some(discount),
            payment_type: None,
            gift_card: None,
        }
    }

    #[test]
    fn snapshot_freezes_values_and_text() {
        let details = sample_details();
        let snapshot = build_snapshot(&details);

        assert_eq!(snapshot.price, Decimal::new(45000, 2));
        assert_eq!(snapshot.remaining_term, 10);
        assert_eq!(snapshot.baby.id, details.baby.id);
        assert!(snapshot.baby.text.contains("Lara Silva"));
        assert!(snapshot.service_package.text.contains("Pacote 10"));
        assert_eq!(snapshot.discount.as_ref().map(|d| d.is_percentage), Some(true));
        assert!(snapshot.payment_type.is_none());
        assert!(snapshot.gift_card.is_none());
    }

    #[test]
    fn snapshot_is_independent_of_later_catalog_edits() {
        let mut details = sample_details();
        let snapshot = build_snapshot(&details);

        if let Some(discount) = details.discount.as_mut() {
            discount.value = Decimal::new(50, 0);
            discount.name = "Outro".into();
        }

        let frozen = snapshot.discount.expect("desconto no snapshot");
        assert_eq!(frozen.value, Decimal::new(10, 0));
        assert_eq!(frozen.name, "Irmãos");
    }

    #[test]
    fn snapshot_survives_json_storage() {
        let snapshot = build_snapshot(&sample_details());
        let stored = serde_json::to_value(&snapshot).expect("serializa");
        let restored: ArrangementSnapshot = serde_json::from_value(stored).expect("desserializa");

        assert_eq!(restored, snapshot);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleted_arrangement_keeps_a_readable_audit_trail(pool: PgPool) -> TestResult {
        let state = test_support::state(&pool);
        let scope = test_support::tenant(&pool, "Spa A").await?;
        let other = test_support::tenant(&pool, "Spa B").await?;
        let catalog = test_support::catalog(&pool, &scope, 10).await?;
        let status = state
            .catalog_service
            .find_status_by_code(&pool, status_codes::ARRANGEMENT_CREATED)
            .await?;

        let view = state.arrangement_service.create(&scope, catalog.arrangement(None)).await?;
        let id = view.arrangement_id;
        let update = crate::models::arrangement::UpdateArrangementPayload {
            baby_id: catalog.baby_id,
            service_package_id: catalog.package_id,
            status_id: status.id,
            payment_type_id: None,
            discount_id: None,
            gift_card_id: None,
            extend_duration_days: None,
            note: None,
        };
        state.arrangement_service.update(&scope, id, update).await?;
        state.arrangement_service.delete(&scope, id).await?;

        let trail = state.audit_service.list_for_arrangement(&scope, id).await?;
        let actions: Vec<_> = trail.iter().map(|entry| entry.action_type).collect();
        assert_eq!(actions, vec![UserActionType::Delete, UserActionType::Update, UserActionType::Create]);

        // O snapshot do update guarda o estado anterior (com desconto)
        assert_eq!(trail[1].snapshot.price, Decimal::new(45000, 2));

        assert!(matches!(
            state.audit_service.list_for_arrangement(&other, id).await,
            Err(AppError::NotFound(_))
        ));
        Ok(())
    }
}
