use super::{ACTIVE_NAMESPACE, ARCHIVED_NAMESPACE, MirrorEntry, MirrorStore};
use anyhow::Context;
use models::IncidentStatus;

/// Mirror store backed by the Firebase Realtime Database REST API.
#[derive(derivative::Derivative, Clone)]
#[derivative(Debug)]
pub struct RealtimeMirror {
    base_url: url::Url,
    #[derivative(Debug = "ignore")]
    auth: Option<String>,
    #[derivative(Debug = "ignore")]
    http_client: reqwest::Client,
}

impl RealtimeMirror {
    pub fn new(base_url: url::Url, auth: Option<String>, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            auth,
            http_client,
        }
    }

    fn url(&self, namespace: &str, incident_id: &str, child: Option<&str>) -> anyhow::Result<url::Url> {
        // Keys of the realtime database may not contain these characters.
        if incident_id.is_empty()
            || incident_id.contains(['.', '$', '#', '[', ']', '/'])
        {
            anyhow::bail!("incident id {incident_id:?} is not a valid mirror key");
        }
        let mut url = self.base_url.clone();

        // Pushed segments are percent-encoded, so an id can't address a query or another path.
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                anyhow::anyhow!("realtime database URL {} cannot be a base", self.base_url)
            })?;
            segments.pop_if_empty().push(namespace);
            match child {
                Some(child) => segments.push(incident_id).push(&format!("{child}.json")),
                None => segments.push(&format!("{incident_id}.json")),
            };
        }

        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }
}

async fn check(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!(
        "realtime database responded with {status}: {}",
        notifications::truncate_detail(&body)
    )
}

impl MirrorStore for RealtimeMirror {
    async fn set_active_status<'s>(
        &'s self,
        incident_id: &'s str,
        status: &'s IncidentStatus,
    ) -> anyhow::Result<()> {
        let url = self.url(ACTIVE_NAMESPACE, incident_id, Some("status"))?;
        let response = self
            .http_client
            .put(url)
            .json(status)
            .send()
            .await
            .context("writing active status")?;
        check(response).await?;
        Ok(())
    }

    async fn read_active<'s>(&'s self, incident_id: &'s str) -> anyhow::Result<Option<MirrorEntry>> {
        let url = self.url(ACTIVE_NAMESPACE, incident_id, None)?;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("reading active entry")?;

        match check(response).await?.json().await.context("decoding active entry")? {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(entry) => Ok(Some(entry)),
            other => anyhow::bail!("active entry of {incident_id} is not an object: {other}"),
        }
    }

    async fn put_archived<'s>(
        &'s self,
        incident_id: &'s str,
        mut entry: MirrorEntry,
    ) -> anyhow::Result<()> {
        entry.insert(
            "resolvedAt".to_string(),
            serde_json::json!({".sv": "timestamp"}),
        );
        let url = self.url(ARCHIVED_NAMESPACE, incident_id, None)?;
        let response = self
            .http_client
            .put(url)
            .json(&entry)
            .send()
            .await
            .context("writing archived entry")?;
        check(response).await?;
        Ok(())
    }

    async fn remove_active<'s>(&'s self, incident_id: &'s str) -> anyhow::Result<()> {
        let url = self.url(ACTIVE_NAMESPACE, incident_id, None)?;
        let response = self
            .http_client
            .delete(url)
            .send()
            .await
            .context("removing active entry")?;
        check(response).await?;
        Ok(())
    }
}
