use std::collections::BTreeSet;

use bytes::Bytes;

use crate::integration::index::transport::IndexRequest;
use crate::task::Task;
use crate::types::api::{parse_payload, ServerError};
use crate::types::json::as_array;
use crate::types::models::tag::parse_tags;

use super::ServerClient;

fn parse_tag_list(body: Bytes) -> Result<BTreeSet<String>, ServerError> {
    let payload = parse_payload(&body)?;
    let tags = as_array(&payload).map_err(|e| e.within("payload"))?;
    parse_tags("payload", tags)
}

impl ServerClient {
    /// `GET /v1/tags`. Tags are global and survive a non-global cache
    /// clear.
    pub fn get_tags(&self, use_cache: bool) -> Task<BTreeSet<String>> {
        self.fetch(
            &self.caches.tags,
            &self.in_flight.tags,
            (),
            use_cache,
            IndexRequest::get("v1/tags"),
            parse_tag_list,
        )
    }
}
