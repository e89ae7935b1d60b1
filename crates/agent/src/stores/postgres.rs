use super::{IncidentPatch, IncidentStore, ProfileStore, ResponderDirectory, ResponderFilter};
use anyhow::Context;
use models::{Responder, UserProfile};
use sqlx::types::Json;

/// Primary store, directory, and profiles, backed by Postgres.
/// See `migrations/` for the schema and its change trigger.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

impl IncidentStore for PgStore {
    async fn update_incident<'s>(
        &'s self,
        incident_id: &'s str,
        patch: IncidentPatch,
    ) -> anyhow::Result<()> {
        update_incident(incident_id, patch, &self.pool).await
    }
}

impl ResponderDirectory for PgStore {
    async fn find_responders<'s>(
        &'s self,
        filter: &'s ResponderFilter,
    ) -> anyhow::Result<Vec<Responder>> {
        find_responders(filter, &self.pool).await
    }
}

impl ProfileStore for PgStore {
    async fn fetch_profile<'s>(&'s self, phone_number: &'s str) -> anyhow::Result<Option<UserProfile>> {
        fetch_profile(phone_number, &self.pool).await
    }
}

async fn update_incident(
    incident_id: &str,
    patch: IncidentPatch,
    db: impl sqlx::PgExecutor<'_>,
) -> anyhow::Result<()> {
    let result = match patch {
        IncidentPatch::SmsOutcome {
            sent,
            status,
            successful_numbers,
            failed_numbers,
        } => sqlx::query(
            r#"update incidents set
                sms_sent = $2,
                sms_status = $3,
                sms_details = jsonb_build_object(
                    'successful_numbers', $4::jsonb,
                    'failed_numbers', $5::jsonb,
                    'timestamp', now()
                )
            where id = $1"#,
        )
        .bind(incident_id)
        .bind(sent)
        .bind(status.as_str())
        .bind(Json(successful_numbers))
        .bind(Json(failed_numbers))
        .execute(db)
        .await
        .context("updating incident SMS outcome")?,

        IncidentPatch::Notified { status } => sqlx::query(
            r#"update incidents set
                notification_sent = true,
                last_notification = jsonb_build_object(
                    'status', $2::text,
                    'timestamp', now()
                )
            where id = $1"#,
        )
        .bind(incident_id)
        .bind(status.as_str())
        .execute(db)
        .await
        .context("updating incident notification state")?,
    };

    if result.rows_affected() == 0 {
        anyhow::bail!("incident {incident_id} does not exist");
    }
    Ok(())
}

async fn find_responders(
    filter: &ResponderFilter,
    db: impl sqlx::PgExecutor<'_>,
) -> anyhow::Result<Vec<Responder>> {
    let rows: Vec<(String, Vec<String>, Option<String>, Option<String>)> = sqlx::query_as(
        r#"select id, services, state, fcm_token
        from responders
        where ($1::text is null or $1 = any(services))
        and ($2::text is null or state = $2)
        order by id asc"#,
    )
    .bind(filter.service.as_deref())
    .bind(filter.state.as_deref())
    .fetch_all(db)
    .await
    .context("querying responders")?;

    Ok(rows
        .into_iter()
        .map(|(id, services, state, fcm_token)| Responder {
            id,
            services: services.into_iter().collect(),
            state,
            fcm_token,
        })
        .collect())
}

async fn fetch_profile(
    phone_number: &str,
    db: impl sqlx::PgExecutor<'_>,
) -> anyhow::Result<Option<UserProfile>> {
    let row: Option<(String, Option<String>)> = sqlx::query_as(
        "select phone_number, fcm_token from user_profiles where phone_number = $1",
    )
    .bind(phone_number)
    .fetch_optional(db)
    .await
    .context("fetching user profile")?;

    Ok(row.map(|(phone_number, fcm_token)| UserProfile {
        phone_number,
        fcm_token,
    }))
}
