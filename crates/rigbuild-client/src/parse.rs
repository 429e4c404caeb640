use rigbuild_core::{BuildId, GeneralResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{ApiError, Reply};

/// Decode an envelope whose `data` the caller needs.
pub(crate) fn envelope<T: DeserializeOwned>(raw: &str) -> Result<Reply<T>, ApiError> {
    let resp: GeneralResponse<T> =
        serde_json::from_str(raw).map_err(|e| ApiError::Decode(format!("response body: {e}")))?;
    if !resp.success {
        return Ok(Reply::Rejected {
            message: resp.message,
        });
    }
    match resp.data {
        Some(data) => Ok(Reply::Ok {
            message: resp.message,
            data,
        }),
        None => Err(ApiError::Decode("successful response without data".to_string())),
    }
}

/// Decode an envelope for a call that only acknowledges. An empty body
/// (some DELETE handlers answer 204) counts as success.
pub(crate) fn ack(raw: &str) -> Result<Reply<()>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(Reply::ok(()));
    }
    let resp: GeneralResponse<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| ApiError::Decode(format!("response body: {e}")))?;
    if resp.success {
        Ok(Reply::Ok {
            message: resp.message,
            data: (),
        })
    } else {
        Ok(Reply::Rejected {
            message: resp.message,
        })
    }
}

/// `data` of the create call: either the new id or the created record.
#[derive(Deserialize)]
#[serde(untagged)]
enum Created {
    Id(BuildId),
    Record { id: BuildId },
}

pub(crate) fn created_build(raw: &str) -> Result<Reply<BuildId>, ApiError> {
    Ok(match envelope::<Created>(raw)? {
        Reply::Ok { message, data } => {
            let id = match data {
                Created::Id(id) | Created::Record { id } => id,
            };
            if id.as_str().is_empty() {
                return Err(ApiError::Decode("created build has an empty id".to_string()));
            }
            Reply::Ok { message, data: id }
        }
        Reply::Rejected { message } => Reply::Rejected { message },
    })
}

/// Pull a human-readable message out of an error response body, falling
/// back to the raw text.
pub(crate) fn error_message(raw: &str) -> String {
    serde_json::from_str::<GeneralResponse<serde_json::Value>>(raw)
        .ok()
        .map(|r| r.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| raw.trim().to_string())
}
