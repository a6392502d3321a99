//! HTTP API over the dashboard read models
//!
//! `smartspoon serve` → binds 127.0.0.1, answers JSON on every route.
//!
//! | Route | Body | Returns |
//! |-------|------|---------|
//! | `GET /` | | tabs and routes |
//! | `GET /api/market?bin_width=N` | | `SurveyAggregate` |
//! | `GET /api/market/view` | | rows of the age-group SQL view |
//! | `POST /api/food` | raw image | `FoodAnalysis` |
//! | `POST /api/sentiment` | `{"text": ..}` or raw text | `SentimentResult` |
//! | `POST /api/view?tab=T` | the tab's input | `ViewModel` |

use crate::dashboard::{self, NavigationState, Tab, ViewInput, ViewSettings};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::food;
use crate::sentiment;
use crate::survey::SurveyAggregate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self { ok: false, data: None, error: Some(message) }
    }
}

#[derive(Deserialize, Debug)]
struct MarketParams {
    bin_width: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct ViewParams {
    tab: String,
}

#[derive(Deserialize, Debug)]
struct SentimentRequest {
    text: String,
}

#[derive(Serialize)]
struct RouteInfo {
    method: &'static str,
    path: &'static str,
}

#[derive(Serialize)]
struct TabInfo {
    slug: &'static str,
    title: &'static str,
}

#[derive(Serialize)]
struct Index {
    name: &'static str,
    version: &'static str,
    tabs: Vec<TabInfo>,
    routes: Vec<RouteInfo>,
}

const ROUTES: [(&str, &str); 6] = [
    ("GET", "/"),
    ("GET", "/api/market"),
    ("GET", "/api/market/view"),
    ("POST", "/api/food"),
    ("POST", "/api/sentiment"),
    ("POST", "/api/view"),
];

/// Status code and JSON body for one request
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    fn ok<T: Serialize>(data: T) -> Self {
        match serde_json::to_string(&ApiResponse::success(data)) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(500, e.to_string()),
        }
    }

    fn error(status: u16, message: String) -> Self {
        let body = serde_json::to_string(&ApiResponse::failure(message))
            .unwrap_or_else(|_| r#"{"ok":false,"data":null,"error":"internal error"}"#.to_string());
        Self { status, body }
    }

    fn from_error(e: &Error) -> Self {
        Self::error(status_for(e), e.to_string())
    }
}

fn status_for(e: &Error) -> u16 {
    match e {
        Error::ImageTooLarge { .. } | Error::ImageDimensions { .. } => 413,
        Error::InvalidImage(_)
        | Error::UnknownTab(_)
        | Error::ViewInput { .. }
        | Error::InvalidParameter(_)
        | Error::Json(_)
        | Error::Coercion { .. }
        | Error::RowLength { .. }
        | Error::DuplicateColumn { .. } => 400,
        _ => 500,
    }
}

/// Shared by every request
pub struct ServerState {
    pub db: Database,
    pub settings: ViewSettings,
}

/// Bind, optionally open the browser, and serve until the process exits
pub fn start(port: u16, state: ServerState, open_browser: bool) -> Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| std::io::Error::other(e.to_string()))?;

    let url = format!("http://localhost:{}", port);
    eprintln!("\n\x1b[1;32m🥄 Smart Spoon Analytics\x1b[0m");
    eprintln!("   {}\n", url);
    info!(%addr, "listening");

    if open_browser {
        let _ = open::that(&url);
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &state) {
            warn!(error = %e, "failed to answer request");
        }
    }

    Ok(())
}

fn handle_request(mut request: Request, state: &ServerState) -> std::io::Result<()> {
    let method = request.method().clone();
    let url = request.url().to_string();
    debug!(%method, %url, "request");

    let reply = match read_limited(request.as_reader(), state.settings.max_upload_bytes)? {
        Some(body) => dispatch(state, &method, &url, &body),
        None => Reply::from_error(&Error::ImageTooLarge {
            size: request.body_length().map(|n| n as u64).unwrap_or(state.settings.max_upload_bytes + 1),
            limit: state.settings.max_upload_bytes,
        }),
    };

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    request.respond(response)
}

/// Read at most `limit` bytes; `None` when the body is longer
fn read_limited<R: Read>(reader: R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        Ok(None)
    } else {
        Ok(Some(body))
    }
}

/// Route one request to its handler
pub fn dispatch(state: &ServerState, method: &Method, url: &str, body: &[u8]) -> Reply {
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("/");
    let query = parts.next().unwrap_or("");

    let result = match (method, path) {
        (&Method::Get, "/") => Ok(Reply::ok(index())),
        (&Method::Get, "/api/market") => market(state, query),
        (&Method::Get, "/api/market/view") => state
            .db
            .purchase_by_age_group()
            .map(Reply::ok)
            .map_err(Error::from),
        (&Method::Post, "/api/food") => {
            food::analyze_bytes(body, &state.settings.image_limits()).map(Reply::ok)
        }
        (&Method::Post, "/api/sentiment") => {
            feedback_text(body).map(|text| Reply::ok(sentiment::score(&text)))
        }
        (&Method::Post, "/api/view") => view(state, query, body),
        _ => return Reply::error(404, format!("no route for {} {}", method, path)),
    };

    result.unwrap_or_else(|e| Reply::from_error(&e))
}

fn index() -> Index {
    Index {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        tabs: Tab::ALL
            .iter()
            .map(|t| TabInfo { slug: t.slug(), title: t.title() })
            .collect(),
        routes: ROUTES
            .iter()
            .map(|&(method, path)| RouteInfo { method, path })
            .collect(),
    }
}

fn market(state: &ServerState, query: &str) -> Result<Reply> {
    let params: MarketParams = serde_urlencoded::from_str(query)
        .map_err(|e| Error::InvalidParameter(format!("bin_width: {}", e)))?;
    let bin_width = match params.bin_width {
        Some(0) => return Err(Error::InvalidParameter("bin_width must be at least 1".to_string())),
        Some(width) => width,
        None => state.settings.age_bin_width,
    };
    let records = state.db.load_survey()?;
    Ok(Reply::ok(SurveyAggregate::from_records(&records, bin_width)))
}

fn view(state: &ServerState, query: &str, body: &[u8]) -> Result<Reply> {
    let params: ViewParams = serde_urlencoded::from_str(query)
        .map_err(|_| Error::UnknownTab(query.to_string()))?;

    let mut nav = NavigationState::new();
    nav.select(params.tab.parse()?);

    let model = match nav.active {
        Tab::FoodRecognition if body.is_empty() => dashboard::select_view(&nav, ViewInput::Empty, &state.settings)?,
        Tab::FoodRecognition => dashboard::select_view(&nav, ViewInput::Image(body), &state.settings)?,
        Tab::MarketResearch => {
            let records = state.db.load_survey()?;
            dashboard::select_view(&nav, ViewInput::Survey(&records), &state.settings)?
        }
        Tab::SentimentAnalysis if body.is_empty() => {
            dashboard::select_view(&nav, ViewInput::Empty, &state.settings)?
        }
        Tab::SentimentAnalysis => {
            let text = feedback_text(body)?;
            dashboard::select_view(&nav, ViewInput::Feedback(&text), &state.settings)?
        }
    };

    Ok(Reply::ok(model))
}

/// `{"text": ...}` when the body is that JSON object, otherwise the body as text
fn feedback_text(body: &[u8]) -> Result<String> {
    if let Ok(req) = serde_json::from_slice::<SentimentRequest>(body) {
        return Ok(req.text);
    }
    String::from_utf8(body.to_vec())
        .map_err(|_| Error::ViewInput {
            tab: Tab::SentimentAnalysis.title().to_string(),
            input: "non UTF-8 text".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SurveyRow;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn test_state(max_upload_bytes: u64) -> (TempDir, ServerState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("api.db")).unwrap();
        let state = ServerState {
            db,
            settings: ViewSettings {
                max_upload_bytes,
                ..ViewSettings::default()
            },
        };
        (dir, state)
    }

    fn seed(db: &Database, ages: &[(i32, &str)]) {
        let purchase_idx = crate::db::SURVEY_COLUMNS
            .iter()
            .position(|c| *c == "purchase_consideration")
            .unwrap()
            - 1;
        let rows: Vec<SurveyRow> = ages
            .iter()
            .map(|&(age, answer)| {
                let mut values = vec![None; crate::db::SURVEY_TEXT_COLUMNS];
                values[purchase_idx] = Some(answer.to_string());
                SurveyRow { age: Some(age), values }
            })
            .collect();
        db.replace_survey(&[], &rows).unwrap();
    }

    fn png(color: [u8; 3]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 6, Rgb(color)))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn json(reply: &Reply) -> serde_json::Value {
        serde_json::from_str(&reply.body).unwrap()
    }

    // ==========================================================================
    // ROUTING
    // ==========================================================================

    #[test]
    fn test_index_lists_tabs_and_routes() {
        let (_dir, state) = test_state(1024);
        let reply = dispatch(&state, &Method::Get, "/", &[]);
        assert_eq!(reply.status, 200);

        let body = json(&reply);
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"]["tabs"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["routes"].as_array().unwrap().len(), ROUTES.len());
    }

    #[test]
    fn test_unknown_route_is_404() {
        let (_dir, state) = test_state(1024);
        let reply = dispatch(&state, &Method::Get, "/nope", &[]);
        assert_eq!(reply.status, 404);
        assert_eq!(json(&reply)["ok"], false);

        let reply = dispatch(&state, &Method::Get, "/api/food", &[]);
        assert_eq!(reply.status, 404);
    }

    // ==========================================================================
    // MARKET
    // ==========================================================================

    #[test]
    fn test_market_aggregate_and_bin_width() {
        let (_dir, state) = test_state(1024);
        seed(&state.db, &[(25, "Yes"), (27, "No"), (45, "Maybe")]);

        let body = json(&dispatch(&state, &Method::Get, "/api/market", &[]));
        assert_eq!(body["data"]["total_respondents"], 3);
        assert_eq!(body["data"]["age_bin_width"], 10);
        assert_eq!(body["data"]["age_histogram"].as_array().unwrap().len(), 2);

        let body = json(&dispatch(&state, &Method::Get, "/api/market?bin_width=50", &[]));
        assert_eq!(body["data"]["age_bin_width"], 50);
        assert_eq!(body["data"]["age_histogram"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_market_rejects_bad_bin_width() {
        let (_dir, state) = test_state(1024);
        seed(&state.db, &[(25, "Yes")]);

        for url in ["/api/market?bin_width=abc", "/api/market?bin_width=0", "/api/market?bin_width=-5"] {
            let reply = dispatch(&state, &Method::Get, url, &[]);
            assert_eq!(reply.status, 400, "{}", url);
            assert_eq!(json(&reply)["ok"], false);
        }
    }

    #[test]
    fn test_market_view_reads_sql_view() {
        let (_dir, state) = test_state(1024);
        seed(&state.db, &[(25, "Yes"), (30, "Maybe")]);

        let body = json(&dispatch(&state, &Method::Get, "/api/market/view", &[]));
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["age_group"], "18-30");
        assert_eq!(rows[0]["avg_consideration"], 0.75);
    }

    // ==========================================================================
    // FOOD
    // ==========================================================================

    #[test]
    fn test_food_upload() {
        let (_dir, state) = test_state(1 << 20);
        let reply = dispatch(&state, &Method::Post, "/api/food", &png([200, 40, 40]));
        assert_eq!(reply.status, 200);
        assert_eq!(json(&reply)["data"]["salt_estimate"], "High");
    }

    #[test]
    fn test_food_garbage_is_400() {
        let (_dir, state) = test_state(1 << 20);
        let reply = dispatch(&state, &Method::Post, "/api/food", b"not an image");
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn test_food_too_large_is_413() {
        let (_dir, state) = test_state(16);
        let reply = dispatch(&state, &Method::Post, "/api/food", &png([1, 2, 3]));
        assert_eq!(reply.status, 413);
    }

    #[test]
    fn test_food_dimensions_over_limit_is_413() {
        let (_dir, mut state) = test_state(1 << 20);
        state.settings.max_image_dimension = 4;
        let reply = dispatch(&state, &Method::Post, "/api/food", &png([1, 2, 3]));
        assert_eq!(reply.status, 413);
        assert_eq!(json(&reply)["ok"], false);
    }

    #[test]
    fn test_read_limited() {
        let body = read_limited(Cursor::new(vec![7u8; 10]), 10).unwrap();
        assert_eq!(body.map(|b| b.len()), Some(10));

        let body = read_limited(Cursor::new(vec![7u8; 11]), 10).unwrap();
        assert!(body.is_none());
    }

    // ==========================================================================
    // SENTIMENT AND VIEWS
    // ==========================================================================

    #[test]
    fn test_sentiment_json_and_raw_bodies_agree() {
        let (_dir, state) = test_state(1024);
        let from_json = json(&dispatch(
            &state,
            &Method::Post,
            "/api/sentiment",
            br#"{"text": "great help, bad issue"}"#,
        ));
        let from_raw = json(&dispatch(&state, &Method::Post, "/api/sentiment", b"great help, bad issue"));

        assert_eq!(from_json["data"], from_raw["data"]);
        assert_eq!(from_json["data"]["positive_keyword_count"], 2);
        assert_eq!(from_json["data"]["negative_keyword_count"], 2);
    }

    #[test]
    fn test_view_by_tab() {
        let (_dir, state) = test_state(1 << 20);
        seed(&state.db, &[(60, "Yes")]);

        let body = json(&dispatch(&state, &Method::Post, "/api/view?tab=market", &[]));
        assert_eq!(body["data"]["tab"], "market-research");
        assert_eq!(body["data"]["data"]["total_respondents"], 1);

        let body = json(&dispatch(&state, &Method::Post, "/api/view?tab=food", &[]));
        assert_eq!(body["data"]["tab"], "food-recognition");
        assert!(body["data"]["data"].is_null());

        let body = json(&dispatch(&state, &Method::Post, "/api/view?tab=sentiment", b"I love it"));
        assert_eq!(body["data"]["tab"], "sentiment-analysis");
    }

    #[test]
    fn test_view_unknown_tab_is_400() {
        let (_dir, state) = test_state(1024);
        let reply = dispatch(&state, &Method::Post, "/api/view?tab=settings", &[]);
        assert_eq!(reply.status, 400);

        let reply = dispatch(&state, &Method::Post, "/api/view", &[]);
        assert_eq!(reply.status, 400);
    }
}
