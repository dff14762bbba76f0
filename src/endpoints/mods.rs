use std::collections::BTreeSet;

use bytes::Bytes;

use crate::integration::index::transport::IndexRequest;
use crate::task::Task;
use crate::types::api::{parse_payload, ServerError};
use crate::types::models::mod_entity::{ModListResult, ModRecord};
use crate::types::models::mod_update::UpdateRecord;
use crate::types::models::mod_version::ModVersionRecord;
use crate::types::query::ModsQuery;

use super::{send, ServerClient};

fn parse_mod_list(body: Bytes) -> Result<ModListResult, ServerError> {
    ModListResult::parse(&parse_payload(&body)?).map_err(|e| e.within("payload"))
}

fn parse_mod(body: Bytes) -> Result<ModRecord, ServerError> {
    ModRecord::parse(&parse_payload(&body)?).map_err(|e| e.within("payload"))
}

fn parse_updates(body: Bytes) -> Result<Vec<UpdateRecord>, ServerError> {
    UpdateRecord::parse_list(&parse_payload(&body)?).map_err(|e| e.within("payload"))
}

fn raw_body(body: Bytes) -> Result<Bytes, ServerError> {
    Ok(body)
}

fn invalid_id(id: &str) -> Option<ServerError> {
    if id.is_empty() || id.contains('/') {
        Some(ServerError::Transport(format!("Invalid mod id '{}'", id)))
    } else {
        None
    }
}

impl ServerClient {
    /// `GET /v1/mods`: one page of mods matching `query`.
    pub fn get_mods(&self, query: &ModsQuery, use_cache: bool) -> Task<ModListResult> {
        let request =
            IndexRequest::get("v1/mods").params(query.to_params(self.config.game_version()));
        self.fetch(
            &self.caches.mods,
            &self.in_flight.mods,
            query.clone(),
            use_cache,
            request,
            parse_mod_list,
        )
    }

    /// `GET /v1/mods/{id}`
    pub fn get_mod(&self, id: &str, use_cache: bool) -> Task<ModRecord> {
        let id = id.trim();
        if let Some(e) = invalid_id(id) {
            return Task::resolved(Err(e));
        }
        self.fetch(
            &self.caches.mod_by_id,
            &self.in_flight.mod_by_id,
            id.to_string(),
            use_cache,
            IndexRequest::get(format!("v1/mods/{}", id)),
            parse_mod,
        )
    }

    /// `GET /v1/mods/{id}/logo`. The image is returned as-is.
    pub fn get_mod_logo(&self, id: &str, use_cache: bool) -> Task<Bytes> {
        let id = id.trim();
        if let Some(e) = invalid_id(id) {
            return Task::resolved(Err(e));
        }
        self.fetch(
            &self.caches.logos,
            &self.in_flight.logos,
            id.to_string(),
            use_cache,
            IndexRequest::get(format!("v1/mods/{}/logo", id)),
            raw_body,
        )
    }

    /// `GET /v1/mods/updates`: the newest version of each mod in `ids` that
    /// supports the configured platform.
    pub fn check_updates<I, S>(&self, ids: I, use_cache: bool) -> Task<Vec<UpdateRecord>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Task::resolved(Ok(vec![]));
        }

        let mut request = IndexRequest::get("v1/mods/updates")
            .param("ids", ids.iter().cloned().collect::<Vec<_>>().join(";"))
            .param("platform", self.config.platform().as_str());
        if let Some(gd) = self.config.game_version() {
            request = request.param("gd", gd);
        }

        self.fetch(
            &self.caches.updates,
            &self.in_flight.updates,
            ids,
            use_cache,
            request,
            parse_updates,
        )
    }

    /// Downloads the package of `version` and checks it against the
    /// published hash. Downloads are never cached.
    pub fn download_version(&self, version: &ModVersionRecord) -> Task<Bytes> {
        let version = version.clone();
        let transport = self.transport.clone();
        let _guard = self.runtime.enter();
        Task::run(move |handle| async move {
            log::info!(
                "Downloading {} {} from {}",
                version.metadata.id,
                version.version(),
                version.download_url
            );
            let request = IndexRequest::get_absolute(version.download_url.clone());
            let result = send(transport.as_ref(), request, &handle)
                .await
                .and_then(|data| version.verify(&data).map(|_| data));
            if let Err(e) = &result {
                log::error!("Download of {} failed: {}", version.metadata.id, e);
            }
            handle.finish(result);
        })
    }
}
