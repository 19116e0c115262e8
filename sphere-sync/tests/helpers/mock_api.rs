//! In-process mock of the upstream music API
//!
//! Serves the library, playlist, profile and audio-feature endpoints from
//! in-memory fixtures on an ephemeral port. Responses can be scripted per
//! path (forced statuses, delays, 403s) and every request is counted.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "test-token";

/// Forced response served before the normal fixture; a 200 entry lets
/// that request through to the fixture
#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u16,
    pub retry_after: Option<String>,
}

impl Scripted {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
        }
    }

    pub fn pass() -> Self {
        Self::status(200)
    }

    pub fn rate_limited(retry_after: &str) -> Self {
        Self {
            status: 429,
            retry_after: Some(retry_after.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub tracks: Vec<Value>,
}

#[derive(Default)]
pub struct MockData {
    pub liked: Vec<Value>,
    pub recent: Vec<Value>,
    pub playlists: Vec<Playlist>,
    /// Audio features by track id; unknown ids come back as null
    pub features: HashMap<String, Value>,
    /// Paths answered with 403
    pub forbidden: HashSet<String>,
    /// Per-path queue of forced responses
    pub scripted: HashMap<String, VecDeque<Scripted>>,
    /// Per-path response delay
    pub delays: HashMap<String, Duration>,
    /// Requests seen per path
    pub hits: HashMap<String, usize>,
}

#[derive(Clone)]
struct MockState {
    base_url: String,
    data: Arc<Mutex<MockData>>,
}

pub struct MockApi {
    pub base_url: String,
    data: Arc<Mutex<MockData>>,
}

impl MockApi {
    pub async fn start(data: MockData) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let data = Arc::new(Mutex::new(data));

        let state = MockState {
            base_url: base_url.clone(),
            data: data.clone(),
        };
        let app = Router::new().fallback(handle).with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, data }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.data.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn script(&self, path: &str, responses: Vec<Scripted>) {
        self.data
            .lock()
            .unwrap()
            .scripted
            .insert(path.to_string(), responses.into());
    }

    pub fn forbid(&self, path: &str) {
        self.data.lock().unwrap().forbidden.insert(path.to_string());
    }

    pub fn delay(&self, path: &str, delay: Duration) {
        self.data
            .lock()
            .unwrap()
            .delays
            .insert(path.to_string(), delay);
    }
}

/// Address nothing listens on
pub async fn closed_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn track_json(id: &str, name: &str, artists: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "uri": format!("spotify:track:{}", id),
        "artists": artists.iter().map(|a| json!({"name": a})).collect::<Vec<_>>(),
        "album": {"name": format!("{} album", name), "images": [{"url": format!("https://img.example/{}", id)}]},
        "external_urls": {"spotify": format!("https://open.example/track/{}", id)},
        "preview_url": null
    })
}

pub fn tracks(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| track_json(&format!("{}{}", prefix, i), &format!("Song {}", i), &["Artist"]))
        .collect()
}

pub fn features_json(id: &str, energy: f64, tempo: f64) -> Value {
    json!({
        "id": id,
        "energy": energy,
        "tempo": tempo,
        "valence": 0.5,
        "danceability": 0.6,
        "acousticness": 1.0 - energy,
        "instrumentalness": 0.1,
        "speechiness": 0.05,
        "liveness": 0.2,
        "key": 5,
        "loudness": -8.0,
        "mode": 1,
        "time_signature": 4
    })
}

fn page(items: Vec<Value>, path: &str, base_url: &str, query: &HashMap<String, String>) -> Value {
    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let total = items.len();
    let slice: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    let next = (offset + limit < total)
        .then(|| format!("{}{}?limit={}&offset={}", base_url, path, limit, offset + limit));
    json!({ "items": slice, "next": next, "total": total })
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = uri.path().to_string();

    let (delay, scripted) = {
        let mut data = state.data.lock().unwrap();
        *data.hits.entry(path.clone()).or_insert(0) += 1;
        let delay = data.delays.get(&path).copied();
        let scripted = data.scripted.get_mut(&path).and_then(|q| q.pop_front());
        (delay, scripted)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", TEST_TOKEN).as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"status": 401}}))).into_response();
    }

    if let Some(scripted) = scripted.filter(|s| s.status != 200) {
        let status = StatusCode::from_u16(scripted.status).unwrap();
        let mut response = (status, Json(json!({"error": {"status": scripted.status}}))).into_response();
        if let Some(retry_after) = scripted.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, retry_after.parse().unwrap());
        }
        return response;
    }

    let data = state.data.lock().unwrap();
    if data.forbidden.contains(&path) {
        return (StatusCode::FORBIDDEN, Json(json!({"error": {"status": 403}}))).into_response();
    }

    let wrap = |tracks: &[Value]| -> Vec<Value> {
        tracks.iter().map(|t| json!({"track": t})).collect()
    };

    let body = match path.as_str() {
        "/me" => json!({"id": "user-1", "display_name": "Test User"}),
        "/me/tracks" => page(wrap(&data.liked), &path, &state.base_url, &query),
        "/me/player/recently-played" => page(wrap(&data.recent), &path, &state.base_url, &query),
        "/me/playlists" => {
            let items: Vec<Value> = data
                .playlists
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "tracks": {
                            "href": format!("{}/playlists/{}/tracks", state.base_url, p.id),
                            "total": p.tracks.len()
                        }
                    })
                })
                .collect();
            page(items, &path, &state.base_url, &query)
        }
        "/audio-features" => {
            let ids = query.get("ids").cloned().unwrap_or_default();
            let features: Vec<Value> = ids
                .split(',')
                .filter(|id| !id.is_empty())
                .map(|id| data.features.get(id).cloned().unwrap_or(Value::Null))
                .collect();
            json!({ "audio_features": features })
        }
        other => {
            let playlist = other
                .strip_prefix("/playlists/")
                .and_then(|rest| rest.strip_suffix("/tracks"))
                .and_then(|id| data.playlists.iter().find(|p| p.id == id));
            match playlist {
                Some(p) => page(wrap(&p.tracks), &path, &state.base_url, &query),
                None => return StatusCode::NOT_FOUND.into_response(),
            }
        }
    };

    Json(body).into_response()
}
