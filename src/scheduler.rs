// src/scheduler.rs

use std::{sync::Arc, time::Duration};

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, AppState};

// =============================================================================
//  TAREFAS NOTURNAS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Reports,
    ReservationTransition,
    BabyMonths,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::Reports => "relatórios diários",
            Job::ReservationTransition => "reservas reservadas -> utilizadas",
            Job::BabyMonths => "idade dos bebês",
        }
    }
}

/// Tempo até a próxima ocorrência de `at` (hoje, se ainda não passou; senão amanhã).
pub fn duration_until(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today = now.date().and_time(at);
    let next = if today > now { today } else { today + TimeDelta::days(1) };

    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}

/// Horário de cada tarefa. Idade dos bebês roda junto com os relatórios.
pub fn timetable(config: &AppConfig) -> [(Job, NaiveTime); 3] {
    [
        (Job::Reports, config.report_job_at),
        (Job::ReservationTransition, config.transition_job_at),
        (Job::BabyMonths, config.report_job_at),
    ]
}

/// Agenda as três tarefas. O mutex garante que nunca rodam ao mesmo tempo.
pub fn spawn(state: AppState, config: &AppConfig, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
    let lock = Arc::new(Mutex::new(()));

    timetable(config)
        .into_iter()
        .map(|(job, at)| {
            let state = state.clone();
            let lock = lock.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { run_daily(job, at, state, lock, shutdown).await })
        })
        .collect()
}

async fn run_daily(job: Job, at: NaiveTime, state: AppState, lock: Arc<Mutex<()>>, shutdown: CancellationToken) {
    tracing::info!("⏰ Tarefa agendada: {} às {}", job.name(), at.format("%H:%M"));

    loop {
        let wait = duration_until(Local::now().naive_local(), at);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.cancelled() => {
                tracing::info!("Tarefa {} encerrada", job.name());
                return;
            }
        }

        let _guard = lock.lock().await;
        run_job(job, &state).await;
    }
}

pub async fn run_job(job: Job, state: &AppState) {
    tracing::info!("▶️ Iniciando tarefa: {}", job.name());

    let outcome = match job {
        Job::Reports => state
            .report_service
            .generate_reports_for_all_tenants()
            .await
            .map(|tenants| format!("{} tenant(s)", tenants)),
        Job::ReservationTransition => {
            let yesterday = Local::now().date_naive() - TimeDelta::days(1);
            state
                .reservation_service
                .transition_expired_for_all_tenants(yesterday)
                .await
                .map(|count| format!("{} reserva(s)", count))
        }
        Job::BabyMonths => state
            .catalog_service
            .refresh_all_baby_months()
            .await
            .map(|rows| format!("{} bebê(s)", rows)),
    };

    match outcome {
        Ok(summary) => tracing::info!("✅ Tarefa concluída: {} ({})", job.name(), summary),
        Err(e) => tracing::error!("❌ Tarefa falhou: {}: {:?}", job.name(), e),
    }
}
