// src/models/catalog.rs

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::db_utils::TenantOwned;

// ---
// Códigos de status (dados de referência, mas o motor depende deles)
// ---
pub mod status_codes {
    pub const ARRANGEMENT_CREATED: &str = "created";
    pub const TERM_RESERVED: &str = "term_reserved";
    pub const TERM_USED: &str = "term_used";
    pub const TERM_CANCELED: &str = "term_canceled";

    pub const RESERVATION_TYPE: &str = "reservation";
}

// ---
// Exclusão lógica
// ---
/// Marca de exclusão lógica. Ativo enquanto `deleted_at` for nulo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Active,
    Deleted {
        at: DateTime<Utc>,
        by: Option<Uuid>,
    },
}

impl Lifecycle {
    pub fn state(&self) -> RecordState {
        match self.deleted_at {
            None => RecordState::Active,
            Some(at) => RecordState::Deleted { at, by: self.deleted_by_user_id },
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), RecordState::Active)
    }
}

// ---
// 1. Bebê (o cliente)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Baby {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Lara")]
    pub name: String,
    pub surname: Option<String>,
    pub mother_name: Option<String>,
    #[schema(example = "061222333")]
    pub phone_number: String,
    pub birth_date: Option<NaiveDateTime>,
    pub number_of_months: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Baby {
    /// "Nome Sobrenome"
    pub fn full_name(&self) -> String {
        match &self.surname {
            Some(surname) => format!("{} {}", self.name, surname),
            None => self.name.clone(),
        }
    }
}

// ---
// 2. Pacote de Serviço
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackage {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Pacote 10 termos")]
    pub name: String,
    #[schema(example = 10)]
    pub term_number: i32,
    #[schema(example = 60)]
    pub duration_days: i32,
    #[schema(example = "500.00")]
    pub price: Decimal,
    pub note: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

// ---
// 3. Desconto
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Desconto de irmãos")]
    pub name: String,
    #[schema(example = "10.00")]
    pub value: Decimal,
    pub is_percentage: bool,
}

impl Discount {
    /// Rótulo curto: "10%" ou "80.00KM".
    pub fn label(&self) -> String {
        discount_label(self.value, self.is_percentage)
    }
}

pub fn discount_label(value: Decimal, is_percentage: bool) -> String {
    if is_percentage {
        format!("{}%", value)
    } else {
        format!("{}KM", value)
    }
}

// ---
// 4. Cartão-presente
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftCard {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "GC-0001")]
    pub serial_number: String,
    pub expiration_date: Option<NaiveDateTime>,
    pub used: bool,
}

// ---
// 5. Tipo de Pagamento
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentType {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "cash")]
    pub code: String,
    #[schema(example = "Dinheiro")]
    pub name: String,
}

// ---
// 6. Status (global, sem tenant)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: Uuid,
    #[schema(example = "term_reserved")]
    pub code: String,
    #[schema(example = "Reservado")]
    pub name: String,
    #[schema(example = "reservation")]
    pub type_code: String,
}

// ---
// Representação textual (usada nos snapshots de auditoria)
// ---

impl fmt::Display for Baby {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {}, Nome: {}, Mãe: {}, Telefone: {}, Meses: {}, Nota: {}",
            self.id,
            self.full_name(),
            self.mother_name.as_deref().unwrap_or(""),
            self.phone_number,
            self.number_of_months,
            self.note.as_deref().unwrap_or("")
        )
    }
}

impl fmt::Display for ServicePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {}, Pacote: {}, Termos: {}, Duração em dias: {}, Preço: {}",
            self.id, self.name, self.term_number, self.duration_days, self.price
        )
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {}, Valor: {}, Nome: {}, Percentual: {}",
            self.id,
            self.value,
            self.name,
            if self.is_percentage { "SIM" } else { "NÃO" }
        )
    }
}

impl fmt::Display for GiftCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {}, Número de série: {}, Validade: {}, Usado: {}",
            self.id,
            self.serial_number,
            self.expiration_date
                .map(|d| d.format("%d.%m.%Y.").to_string())
                .unwrap_or_default(),
            if self.used { "SIM" } else { "NÃO" }
        )
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id: {}, Código: {}, Nome: {}", self.id, self.code, self.name)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id: {}, Código: {}, Nome: {}", self.id, self.code, self.name)
    }
}

// ---
// Posse por tenant
// ---

impl TenantOwned for Baby {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TenantOwned for ServicePackage {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TenantOwned for Discount {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TenantOwned for GiftCard {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TenantOwned for PaymentType {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_state_follows_deleted_at() {
        let active = Lifecycle::default();
        assert_eq!(active.state(), RecordState::Active);

        let at = Utc::now();
        let by = Uuid::new_v4();
        let deleted = Lifecycle { deleted_at: Some(at), deleted_by_user_id: Some(by) };
        assert_eq!(deleted.state(), RecordState::Deleted { at, by: Some(by) });
        assert!(!deleted.is_active());
    }

    #[test]
    fn discount_labels() {
        assert_eq!(discount_label(Decimal::new(10, 0), true), "10%");
        assert_eq!(discount_label(Decimal::new(8000, 2), false), "80.00KM");
    }
}
