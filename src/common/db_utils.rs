use chrono::{NaiveDateTime, NaiveTime};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// TenantScope: o contexto explícito que desce por toda a cadeia de chamadas.
// ---
/// Quem está agindo e em qual tenant. Não existe estado global de tenant:
/// todo serviço recebe este valor como parâmetro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    pub tenant_id: Uuid,
    // None para tarefas do agendador (sistema)
    pub user_id: Option<Uuid>,
}

impl TenantScope {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self { tenant_id, user_id: Some(user_id) }
    }

    /// Escopo usado pelas tarefas agendadas, que iteram os tenants explicitamente.
    pub fn system(tenant_id: Uuid) -> Self {
        Self { tenant_id, user_id: None }
    }

    /// Segunda barreira: mesmo que uma consulta escape do filtro,
    /// um registro de outro tenant é tratado como inexistente.
    pub fn ensure_owned<T: TenantOwned>(&self, record: T, entity: &str, id: Uuid) -> Result<T, AppError> {
        if record.tenant_id() == self.tenant_id {
            Ok(record)
        } else {
            tracing::warn!(
                tenant = %self.tenant_id,
                owner = %record.tenant_id(),
                "Registro de outro tenant bloqueado: {} {}", entity, id
            );
            Err(AppError::not_found(entity, id))
        }
    }

    /// Versão para Option vinda do repositório.
    pub fn require<T: TenantOwned>(&self, record: Option<T>, entity: &str, id: Uuid) -> Result<T, AppError> {
        match record {
            Some(r) => self.ensure_owned(r, entity, id),
            None => Err(AppError::not_found(entity, id)),
        }
    }
}

/// Todo registro pertencente a um tenant.
pub trait TenantOwned {
    fn tenant_id(&self) -> Uuid;
}

impl<T: TenantOwned> TenantOwned for &T {
    fn tenant_id(&self) -> Uuid {
        (**self).tenant_id()
    }
}

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis RLS (locais à transação).
/// Se não for possível definir o tenant, a operação falha: nunca seguimos sem escopo.
pub(crate) async fn begin_scoped_transaction(
    pool: &PgPool,
    scope: &TenantScope,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    // 1. Define Tenant ID
    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(scope.tenant_id.to_string())
        .execute(&mut *tx)
        .await?;

    // 2. Define User ID (vazio para o agendador)
    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(scope.user_id.map(|id| id.to_string()).unwrap_or_default())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

// ---
// Paginação e intervalo de datas
// ---

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 200;

    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(10).clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// Fatia uma lista já ordenada em memória.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items.into_iter().skip(start).take(self.size as usize).collect()
    }
}

/// Completa um intervalo aberto: só o fim -> começa em 1999-01-01, só o início -> termina em agora + 15 min.
pub fn complete_date_range(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    match (start, end) {
        (None, Some(end)) => {
            let floor = chrono::NaiveDate::from_ymd_opt(1999, 1, 1)
                .map(|d| d.and_time(NaiveTime::MIN));
            (floor, Some(end))
        }
        (Some(start), None) => (Some(start), Some(now + chrono::Duration::minutes(15))),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Row {
        tenant: Uuid,
    }

    impl TenantOwned for Row {
        fn tenant_id(&self) -> Uuid {
            self.tenant
        }
    }

    #[test]
    fn foreign_tenant_rows_look_like_missing_rows() {
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        let scope_a = TenantScope::new(tenant_a, Uuid::new_v4());
        let id = Uuid::new_v4();

        let own = scope_a.ensure_owned(Row { tenant: tenant_a }, "Bebê", id);
        assert!(own.is_ok());

        let foreign = scope_a.ensure_owned(Row { tenant: tenant_b }, "Bebê", id);
        assert!(matches!(foreign, Err(AppError::NotFound(_))));

        let missing = scope_a.require::<Row>(None, "Bebê", id);
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn system_scope_has_no_user() {
        let tenant = Uuid::new_v4();
        let scope = TenantScope::system(tenant);
        assert_eq!(scope.tenant_id, tenant);
        assert!(scope.user_id.is_none());
    }

    #[test]
    fn page_request_clamps_size_and_slices() {
        let page = PageRequest::new(Some(1), Some(2));
        assert_eq!(page.offset(), 2);
        assert_eq!(page.slice(vec![1, 2, 3, 4, 5]), vec![3, 4]);

        let huge = PageRequest::new(None, Some(10_000));
        assert_eq!(huge.size, PageRequest::MAX_SIZE);

        let beyond = PageRequest::new(Some(9), Some(5));
        assert!(beyond.slice(vec![1, 2, 3]).is_empty());
    }

    #[test]
    fn open_date_ranges_are_completed() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 10)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let end = now - chrono::Duration::days(1);

        let (start, completed_end) = complete_date_range(None, Some(end), now);
        assert_eq!(start.map(|s| s.date()), NaiveDate::from_ymd_opt(1999, 1, 1));
        assert_eq!(completed_end, Some(end));

        let (start, completed_end) = complete_date_range(Some(end), None, now);
        assert_eq!(start, Some(end));
        assert_eq!(completed_end, Some(now + chrono::Duration::minutes(15)));

        assert_eq!(complete_date_range(None, None, now), (None, None));
    }
}
