// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- ARRANGEMENTS ---
        handlers::arrangements::create_arrangement,
        handlers::arrangements::update_arrangement,
        handlers::arrangements::delete_arrangement,
        handlers::arrangements::get_arrangement,
        handlers::arrangements::list_arrangements,
        handlers::arrangements::total_price,
        handlers::arrangements::short_list,
        handlers::arrangements::exists_by_service_package,
        handlers::arrangements::arrangement_audit,

        // --- RESERVATIONS ---
        handlers::reservations::create_reservation,
        handlers::reservations::update_reservation,
        handlers::reservations::cancel_reservation,
        handlers::reservations::delete_reservation,
        handlers::reservations::get_reservation,
        handlers::reservations::list_reservations,
        handlers::reservations::reservations_by_arrangement,
        handlers::reservations::exists_by_arrangement,
        handlers::reservations::reservation_history,

        // --- Admin ---
        handlers::admin::generate_reports,
        handlers::admin::transition_expired,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::Status,

            // --- Arranjos ---
            models::arrangement::ShortDetails,
            models::arrangement::ArrangementView,
            models::arrangement::CreateArrangementPayload,
            models::arrangement::UpdateArrangementPayload,
            models::arrangement::UserActionType,
            models::arrangement::ArrangementSnapshot,
            models::arrangement::ArrangementAuditEntry,
            handlers::arrangements::TotalPriceResponse,

            // --- Reservas ---
            models::reservation::ReservationView,
            models::reservation::ReservationTableView,
            models::reservation::ReservationShortInfo,
            models::reservation::ReservationHistoryEntry,
            models::reservation::CreateReservationPayload,
            models::reservation::UpdateReservationPayload,

            // --- Admin ---
            models::report::GenerateReportsPayload,
            models::report::ReportRunSummary,
            models::report::TransitionSummary,
        )
    ),
    tags(
        (name = "Health", description = "Disponibilidade do serviço"),
        (name = "Arrangements", description = "Arranjos: pacotes comprados, preço, descontos e cartões-presente"),
        (name = "Reservations", description = "Reservas: agendamentos e contabilidade de termos"),
        (name = "Admin", description = "Execução sob demanda das tarefas noturnas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
