//! Audio streaming with byte-range support
//!
//! One file handle is opened per request. Its metadata supplies the size,
//! and the same handle backs the response body, so the handle is closed
//! when the body finishes, fails, or is dropped on client disconnect.

use crate::catalog::resolve_completed_asset;
use crate::error::{MediaError, Result};
use crate::range::{ByteRange, RangeRequest};
use crate::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use mlib_common::config::resolve_path;
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Bytes read from disk per body chunk
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
const CACHE_POLICY: &str = "public, max-age=31536000";

/// GET /audio/:song_id
///
/// 200 with the whole file, or 206 with the requested range. Unknown song,
/// no completed asset and unreachable file are 404; a bad range is 416.
pub async fn stream_audio(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let asset = resolve_completed_asset(state.catalog.as_ref(), &song_id).await?;
    let path = resolve_path(&state.root_folder, &asset.file_path);

    let inaccessible = |e: std::io::Error| MediaError::FileInaccessible {
        song_id: song_id.clone(),
        reason: format!("{}: {}", path.display(), e),
    };

    let mut file = File::open(&path).await.map_err(inaccessible)?;
    let metadata = file.metadata().await.map_err(inaccessible)?;
    if !metadata.is_file() {
        return Err(MediaError::FileInaccessible {
            song_id,
            reason: format!("{} is not a regular file", path.display()),
        });
    }
    let file_size = metadata.len();

    let range = match headers.get(header::RANGE) {
        None => None,
        Some(value) => {
            let raw = value.to_str().map_err(|_| MediaError::RangeInvalid {
                file_size,
                reason: "non-ASCII range header".to_string(),
            })?;
            let range = RangeRequest::parse(raw)
                .and_then(|request| request.resolve(file_size))
                .map_err(|e| MediaError::RangeInvalid {
                    file_size,
                    reason: e.to_string(),
                })?;
            Some(range)
        }
    };

    match range {
        None => {
            debug!("Serving {} in full ({} bytes)", song_id, file_size);
            let body = body_from_reader(file, song_id);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
                .header(header::CONTENT_LENGTH, file_size)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CACHE_CONTROL, CACHE_POLICY)
                .body(body)
                .map_err(|e| MediaError::Internal(e.to_string()))
        }
        Some(range) => {
            debug!(
                "Serving {} range {}-{} of {} bytes",
                song_id, range.start, range.end, file_size
            );
            file.seek(SeekFrom::Start(range.start)).await?;
            partial_response(file, range, file_size, song_id)
        }
    }
}

fn partial_response(file: File, range: ByteRange, file_size: u64, song_id: String) -> Result<Response> {
    let body = body_from_reader(file.take(range.len()), song_id);
    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, range.len())
        .header(header::CONTENT_RANGE, range.content_range(file_size))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, CACHE_POLICY)
        .body(body)
        .map_err(|e| MediaError::Internal(e.to_string()))
}

/// Stream a reader as the response body
///
/// Headers are already committed when a read fails, so the error is
/// logged and passed to hyper, which aborts the connection.
fn body_from_reader<R>(reader: R, song_id: String) -> Body
where
    R: AsyncRead + Send + 'static,
{
    let stream = ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE).inspect_err(move |e| {
        error!("Read failed while streaming {}: {}", song_id, e);
    });
    Body::from_stream(stream)
}
