// src/models/arrangement.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;
use uuid::Uuid;

use crate::{
    common::db_utils::{PageRequest, TenantOwned},
    models::catalog::{
        discount_label, Baby, Discount, GiftCard, Lifecycle, PaymentType, ServicePackage, Status,
    },
};

// ---
// 1. Arranjo (pacote comprado por um bebê)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Arrangement {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub baby_id: Uuid,
    pub service_package_id: Uuid,
    pub discount_id: Option<Uuid>,
    pub gift_card_id: Option<Uuid>,
    pub payment_type_id: Option<Uuid>,
    pub status_id: Uuid,
    #[schema(example = "450.00")]
    pub price: Decimal,
    #[schema(example = 10)]
    pub remaining_term: i32,
    pub extend_duration_days: Option<i32>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_user_id: Option<Uuid>,
    pub updated_by_user_id: Option<Uuid>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl TenantOwned for Arrangement {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

/// Valores já calculados e prontos para gravar (criação ou edição).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangementValues {
    pub baby_id: Uuid,
    pub service_package_id: Uuid,
    pub discount_id: Option<Uuid>,
    pub gift_card_id: Option<Uuid>,
    pub payment_type_id: Option<Uuid>,
    pub status_id: Uuid,
    pub price: Decimal,
    pub remaining_term: i32,
    pub extend_duration_days: Option<i32>,
    pub note: Option<String>,
}

/// O arranjo com todas as entidades relacionadas já resolvidas.
#[derive(Debug, Clone)]
pub struct ArrangementDetails {
    pub arrangement: Arrangement,
    pub baby: Baby,
    pub service_package: ServicePackage,
    pub status: Status,
    pub discount: Option<Discount>,
    pub payment_type: Option<PaymentType>,
    pub gift_card: Option<GiftCard>,
}

// ---
// Payloads de entrada
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateArrangementPayload {
    pub baby_id: Uuid,
    pub service_package_id: Uuid,
    pub discount_id: Option<Uuid>,
    pub gift_card_id: Option<Uuid>,
    #[validate(length(max = 500, message = "A nota deve ter no máximo 500 caracteres."))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArrangementPayload {
    pub baby_id: Uuid,
    pub service_package_id: Uuid,
    pub status_id: Uuid,
    pub payment_type_id: Option<Uuid>,
    pub discount_id: Option<Uuid>,
    pub gift_card_id: Option<Uuid>,
    #[validate(range(min = 0, max = 3650, message = "Dias de extensão inválidos."))]
    pub extend_duration_days: Option<i32>,
    #[validate(length(max = 500, message = "A nota deve ter no máximo 500 caracteres."))]
    pub note: Option<String>,
}

// ---
// 2. Visões de leitura
// ---

/// Par (id, texto) para combos e tabelas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShortDetails {
    pub id: Uuid,
    pub value: String,
}

impl ShortDetails {
    pub fn new(id: Uuid, value: impl Into<String>) -> Self {
        Self { id, value: value.into() }
    }
}

/// "Nome Sobrenome (telefone)"
pub fn baby_label(name: &str, surname: Option<&str>, phone: &str) -> String {
    match surname {
        Some(s) => format!("{} {} ({})", name, s, phone),
        None => format!("{} ({})", name, phone),
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArrangementView {
    pub arrangement_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub note: Option<String>,
    #[schema(example = "450.00")]
    pub price: Decimal,
    pub remaining_term: i32,
    pub extend_duration_days: Option<i32>,
    pub baby_details: ShortDetails,
    pub service_package: ShortDetails,
    pub status: ShortDetails,
    pub discount: Option<ShortDetails>,
    pub payment_type: Option<ShortDetails>,
    pub gift_card: Option<ShortDetails>,
}

/// Linha do SELECT com JOINs que alimenta a ArrangementView.
#[derive(Debug, Clone, FromRow)]
pub struct ArrangementViewRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub note: Option<String>,
    pub price: Decimal,
    pub remaining_term: i32,
    pub extend_duration_days: Option<i32>,
    pub baby_id: Uuid,
    pub baby_name: String,
    pub baby_surname: Option<String>,
    pub baby_phone: String,
    pub service_package_id: Uuid,
    pub service_package_name: String,
    pub status_id: Uuid,
    pub status_code: String,
    pub discount_id: Option<Uuid>,
    pub discount_value: Option<Decimal>,
    pub discount_is_percentage: Option<bool>,
    pub payment_type_id: Option<Uuid>,
    pub payment_type_name: Option<String>,
    pub gift_card_id: Option<Uuid>,
    pub gift_card_serial_number: Option<String>,
}

impl TenantOwned for ArrangementViewRow {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl From<ArrangementViewRow> for ArrangementView {
    fn from(row: ArrangementViewRow) -> Self {
        let discount = match (row.discount_id, row.discount_value, row.discount_is_percentage) {
            (Some(id), Some(value), Some(is_percentage)) => {
                Some(ShortDetails::new(id, discount_label(value, is_percentage)))
            }
            _ => None,
        };

        ArrangementView {
            arrangement_id: row.id,
            created_at: row.created_at,
            note: row.note,
            price: row.price,
            remaining_term: row.remaining_term,
            extend_duration_days: row.extend_duration_days,
            baby_details: ShortDetails::new(
                row.baby_id,
                baby_label(&row.baby_name, row.baby_surname.as_deref(), &row.baby_phone),
            ),
            service_package: ShortDetails::new(row.service_package_id, row.service_package_name),
            status: ShortDetails::new(row.status_id, row.status_code),
            discount,
            payment_type: row
                .payment_type_id
                .zip(row.payment_type_name)
                .map(|(id, name)| ShortDetails::new(id, name)),
            gift_card: row
                .gift_card_id
                .zip(row.gift_card_serial_number)
                .map(|(id, serial)| ShortDetails::new(id, serial)),
        }
    }
}

/// Item da lista curta: "(id) Nome Sobrenome(telefone) - Pacote"
#[derive(Debug, Clone, FromRow)]
pub struct ArrangementShortRow {
    pub id: Uuid,
    pub baby_name: String,
    pub baby_surname: Option<String>,
    pub baby_phone: String,
    pub service_package_name: String,
}

impl From<ArrangementShortRow> for ShortDetails {
    fn from(row: ArrangementShortRow) -> Self {
        let name = match row.baby_surname {
            Some(surname) => format!("{} {}", row.baby_name, surname),
            None => row.baby_name,
        };
        ShortDetails::new(
            row.id,
            format!("({}) {}({}) - {}", row.id, name, row.baby_phone, row.service_package_name),
        )
    }
}

// ---
// 3. Filtros de listagem
// ---
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ArrangementFilter {
    pub baby_id: Option<Uuid>,
    pub status_id: Option<Uuid>,
    pub service_package_id: Option<Uuid>,
    pub payment_type_id: Option<Uuid>,
    pub gift_card_id: Option<Uuid>,
    pub remaining_term: Option<i32>,
    pub start_price: Option<Decimal>,
    pub end_price: Option<Decimal>,
    pub arrangement_id: Option<Uuid>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
}

/// `?page=0&size=10` nas listagens.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page, params.size)
    }
}

// ---
// 4. Auditoria
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserActionType {
    Create,
    Update,
    Delete,
}

impl UserActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserActionType::Create => "create",
            UserActionType::Update => "update",
            UserActionType::Delete => "delete",
        }
    }
}

impl fmt::Display for UserActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(UserActionType::Create),
            "update" => Ok(UserActionType::Update),
            "delete" => Ok(UserActionType::Delete),
            other => Err(format!("tipo de ação desconhecido: {}", other)),
        }
    }
}

// Os blocos congelados do snapshot. Independem do estado atual do catálogo.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BabySnapshot {
    pub id: Uuid,
    pub name: String,
    pub surname: Option<String>,
    pub mother_name: Option<String>,
    pub phone_number: String,
    pub number_of_months: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackageSnapshot {
    pub id: Uuid,
    pub name: String,
    pub term_number: i32,
    pub duration_days: i32,
    pub price: Decimal,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSnapshot {
    pub id: Uuid,
    pub name: String,
    pub value: Decimal,
    pub is_percentage: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftCardSnapshot {
    pub id: Uuid,
    pub serial_number: String,
    pub expiration_date: Option<NaiveDateTime>,
    pub used: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelSnapshot {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub text: String,
}

/// Estado congelado do arranjo no momento da ação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArrangementSnapshot {
    pub price: Decimal,
    pub remaining_term: i32,
    pub extend_duration_days: Option<i32>,
    pub note: Option<String>,
    pub baby: BabySnapshot,
    pub service_package: ServicePackageSnapshot,
    pub status: LabelSnapshot,
    pub discount: Option<DiscountSnapshot>,
    pub payment_type: Option<LabelSnapshot>,
    pub gift_card: Option<GiftCardSnapshot>,
}

/// Registro de auditoria devolvido pela API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArrangementAuditEntry {
    pub audit_id: Uuid,
    pub arrangement_id: Uuid,
    pub action_type: UserActionType,
    pub action_by_user_id: Option<Uuid>,
    pub action_at: DateTime<Utc>,
    pub snapshot: ArrangementSnapshot,
}
