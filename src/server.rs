use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use chrono::{Datelike, Local};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::api_client::{ApiConfig, DutyApiClient, ReportOutcome};
use crate::calendar::{build_month_grid, edit_prefill, parse_year_month, year_month_key};
use crate::duty_data::{build_holiday_status_map, GeneratedFile, HolidayStatusMap};
use crate::filter::{filter_duties, page_slice, person_options, DutyFilter};
use crate::form::{submit_all, DutyFormState};
use crate::html::{
    render_calendar_page, render_duty_page, render_report_page, CalendarPageView, DutyPageView,
    Notification, ReportPageView,
};

/// アプリケーション状態（バックエンドAPIクライアントを共有）
#[derive(Clone)]
pub struct AppState {
    pub api: DutyApiClient,
}

/// HTTPサーバーを起動
pub async fn run(port: u16, config: ApiConfig) {
    let state = AppState {
        api: DutyApiClient::new(&config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/", get(index))
        .route("/duties", get(duty_page).post(create_duties))
        .route("/duties/:id/delete", post(delete_duty))
        .route("/calendar", get(calendar_page))
        .route("/calendar/:date", post(update_holiday))
        .route("/report", get(report_page).post(generate_report))
        .route("/download/:filename", get(download_file))
        .layer(cors)
        .with_state(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("duty roster web listening on port {}", port);
    axum::serve(listener, app).await.expect("Server failed");
}

/// ヘルスチェック
async fn health_check() -> &'static str {
    "OK"
}

async fn index() -> Redirect {
    Redirect::to("/duties")
}

/// 月パラメータを解決する。不正・未指定は当月
fn resolve_month(input: Option<&str>) -> (i32, u32) {
    input.and_then(parse_year_month).unwrap_or_else(|| {
        let today = Local::now().date_naive();
        (today.year(), today.month())
    })
}

/// クエリ付きリダイレクト（通知メッセージはURLエンコードされる）
fn redirect_with(path: &str, params: &[(&str, &str)]) -> Redirect {
    let query = serde_urlencoded::to_string(params).unwrap_or_default();
    Redirect::to(&format!("{}?{}", path, query))
}

fn default_person() -> String {
    "all".to_string()
}

fn default_page_size() -> usize {
    10
}

/// 値班列表ページのクエリ状態
/// 絞り込みフォームの送信はpageを含まない＝ページリセット
#[derive(Debug, Deserialize)]
struct DutyListQuery {
    month: Option<String>,
    #[serde(default = "default_person")]
    person: String,
    #[serde(default)]
    q: String,
    #[serde(default)]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
    msg: Option<String>,
    kind: Option<String>,
}

/// 値班列表ページ（取得 → 絞り込み → ページ切り出し → 描画）
async fn duty_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DutyListQuery>,
) -> Html<String> {
    let (year, month) = resolve_month(query.month.as_deref());
    let year_month = format!("{:04}{:02}", year, month);

    let filter = DutyFilter::default()
        .with_person(&query.person)
        .with_search(&query.q)
        .with_page_size(query.page_size)
        .with_page(query.page);

    let (duties, fetch_error) = match state.api.get_duties_for_month(&year_month) {
        Ok(duties) => (duties, None),
        Err(error) => {
            tracing::warn!("failed to fetch duties for {}: {}", year_month, error);
            (Vec::new(), Some("載入值班記錄失敗，請稍後再試"))
        }
    };

    let persons = person_options(&duties);
    let filtered = filter_duties(&duties, &filter);
    let total = filtered.len();
    let rows = page_slice(&filtered, filter.page, filter.page_size);

    let notification = match fetch_error {
        Some(message) => Some(Notification {
            message,
            kind: "error",
        }),
        None => query.msg.as_deref().map(|message| Notification {
            message,
            kind: query.kind.as_deref().unwrap_or("success"),
        }),
    };

    Html(render_duty_page(&DutyPageView {
        year,
        month,
        year_month: &year_month,
        filter: &filter,
        persons: &persons,
        rows,
        total,
        notification,
    }))
}

/// 加班記録フォームの送信内容（personsはチェックボックスの複数値）
#[derive(Debug, Deserialize)]
struct DutyFormPayload {
    #[serde(default)]
    month: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    hours: f64,
    #[serde(default)]
    persons: Vec<String>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    additional_reason: String,
}

/// 加班記録の新規作成
/// 選択人員ごとのリクエストを逐次送信し、失敗は1つの通知にまとめる
/// 成功済み分の取り消しはしない。リダイレクト後の再取得が実際の状態を映す
async fn create_duties(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<DutyFormPayload>,
) -> Redirect {
    let month_key = parse_year_month(&payload.month)
        .map(|(year, month)| format!("{:04}{:02}", year, month))
        .unwrap_or_else(|| year_month_key(Local::now().date_naive()));

    let mut form_state = DutyFormState {
        // input type="date" は "YYYY-MM-DD" を送るのでトークン化する
        date: payload.date.replace('-', ""),
        time: payload.time,
        hours: payload.hours,
        selected_persons: Vec::new(),
        reason_code: payload.reason,
        additional_reason: payload.additional_reason,
    };
    for person in &payload.persons {
        form_state.toggle_person(person);
    }

    if !form_state.can_submit() {
        return redirect_with(
            "/duties",
            &[
                ("month", month_key.as_str()),
                ("msg", "請完整填寫表單後再送出"),
                ("kind", "error"),
            ],
        );
    }

    let requests = form_state.build_requests();
    match submit_all(&requests, |request| state.api.add_duty(request)) {
        Ok(count) => {
            tracing::info!("created {} duty records for {}", count, month_key);
            redirect_with(
                "/duties",
                &[
                    ("month", month_key.as_str()),
                    ("msg", "成功新增加班記錄"),
                    ("kind", "success"),
                ],
            )
        }
        Err(failure) => {
            tracing::warn!(
                "duty creation aborted after {} records: {}",
                failure.succeeded,
                failure.error
            );
            let message = format!(
                "新增加班記錄失敗（已成功 {} 筆），請稍後再試",
                failure.succeeded
            );
            redirect_with(
                "/duties",
                &[
                    ("month", month_key.as_str()),
                    ("msg", message.as_str()),
                    ("kind", "error"),
                ],
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct MonthField {
    #[serde(default)]
    month: String,
}

/// 加班記録の削除
async fn delete_duty(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(payload): Form<MonthField>,
) -> Redirect {
    let month_key = parse_year_month(&payload.month)
        .map(|(year, month)| format!("{:04}{:02}", year, month))
        .unwrap_or_else(|| year_month_key(Local::now().date_naive()));

    match state.api.remove_duty(&id) {
        Ok(()) => redirect_with(
            "/duties",
            &[
                ("month", month_key.as_str()),
                ("msg", "成功刪除加班記錄"),
                ("kind", "success"),
            ],
        ),
        Err(error) => {
            tracing::warn!("failed to delete duty {}: {}", id, error);
            redirect_with(
                "/duties",
                &[
                    ("month", month_key.as_str()),
                    ("msg", "刪除加班記錄失敗，請稍後再試"),
                    ("kind", "error"),
                ],
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    month: Option<String>,
    edit: Option<String>,
    msg: Option<String>,
    kind: Option<String>,
}

/// 假日日曆ページ
async fn calendar_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Html<String> {
    let (year, month) = resolve_month(query.month.as_deref());
    let year_month = format!("{:04}{:02}", year, month);

    let (status_map, fetch_error) = match state.api.get_holidays_for_month(&year_month) {
        Ok(holidays) => (build_holiday_status_map(&holidays), None),
        Err(error) => {
            tracing::warn!("failed to fetch holidays for {}: {}", year_month, error);
            (HolidayStatusMap::new(), Some("載入假日資料失敗"))
        }
    };

    let grid = build_month_grid(year, month, &status_map);

    // 編集対象は表示月内の8桁トークンのみ受け付ける
    let edit_token = query
        .edit
        .as_deref()
        .filter(|token| {
            token.len() == 8
                && token.starts_with(&year_month)
                && token.chars().all(|c| c.is_ascii_digit())
        });
    let prefill = edit_token.map(|token| {
        let (status_code, description) = edit_prefill(token, &status_map);
        (token, status_code, description)
    });

    let notification = match fetch_error {
        Some(message) => Some(Notification {
            message,
            kind: "error",
        }),
        None => query.msg.as_deref().map(|message| Notification {
            message,
            kind: query.kind.as_deref().unwrap_or("success"),
        }),
    };

    Html(render_calendar_page(&CalendarPageView {
        year,
        month,
        year_month: &year_month,
        grid: &grid,
        edit: prefill
            .as_ref()
            .map(|(token, code, desc)| (*token, code.as_str(), desc.as_str())),
        notification,
    }))
}

#[derive(Debug, Deserialize)]
struct HolidayUpdateForm {
    #[serde(default)]
    month: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    description: String,
}

/// 休日ステータスの更新
async fn update_holiday(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Form(payload): Form<HolidayUpdateForm>,
) -> Redirect {
    let month_key = parse_year_month(&payload.month)
        .map(|(year, month)| format!("{:04}{:02}", year, month))
        .unwrap_or_else(|| year_month_key(Local::now().date_naive()));

    let valid_date = date.len() == 8 && date.chars().all(|c| c.is_ascii_digit());
    let valid_status = matches!(payload.status.as_str(), "0" | "2" | "3");
    if !valid_date || !valid_status {
        return redirect_with(
            "/calendar",
            &[
                ("month", month_key.as_str()),
                ("msg", "無效的假日狀態"),
                ("kind", "error"),
            ],
        );
    }

    match state
        .api
        .update_holiday_status(&date, &payload.status, &payload.description)
    {
        Ok(()) => redirect_with(
            "/calendar",
            &[
                ("month", month_key.as_str()),
                ("msg", "假日狀態更新成功"),
                ("kind", "success"),
            ],
        ),
        Err(error) => {
            tracing::warn!("failed to update holiday {}: {}", date, error);
            redirect_with(
                "/calendar",
                &[
                    ("month", month_key.as_str()),
                    ("msg", "更新假日狀態失敗"),
                    ("kind", "error"),
                ],
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    month: Option<String>,
    msg: Option<String>,
    kind: Option<String>,
}

/// 產生報表ページ
async fn report_page(Query(query): Query<ReportQuery>) -> Html<String> {
    let (year, month) = resolve_month(query.month.as_deref());
    let notification = query.msg.as_deref().map(|message| Notification {
        message,
        kind: query.kind.as_deref().unwrap_or("success"),
    });
    Html(render_report_page(&ReportPageView {
        year,
        month,
        selected_member: "",
        message: None,
        files: &[],
        notification,
    }))
}

#[derive(Debug, Deserialize)]
struct ReportForm {
    #[serde(default)]
    month: String,
    #[serde(default)]
    member_id: String,
}

/// 報表産生のトリガー
/// JSON応答はファイル一覧ページとして描画し、アーカイブ応答はそのまま
/// ダウンロードとして返す
async fn generate_report(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<ReportForm>,
) -> Response {
    let (year, month) = resolve_month(Some(&payload.month));
    let year_month = format!("{:04}{:02}", year, month);
    let member = payload.member_id.trim();
    let member_id = if member.is_empty() { None } else { Some(member) };

    match state.api.generate_report(&year_month, member_id) {
        Ok(ReportOutcome::Archive {
            content_type,
            bytes,
        }) => {
            let filename = format!("overtime_report_{}.zip", year_month);
            attachment_response(&content_type, &filename, bytes)
        }
        Ok(ReportOutcome::Generated(response)) => {
            let mut files = response.generated_files.clone().unwrap_or_default();
            // ファイル一覧が無くdownload_urlだけの応答も1件の成果物として扱う
            if files.is_empty() {
                if let Some(url) = &response.download_url {
                    files.push(GeneratedFile {
                        path: url.clone(),
                        url: url.clone(),
                    });
                }
            }

            let summary;
            let notification = if !files.is_empty() {
                summary = format!("成功產生 {} 個報表", files.len());
                Notification {
                    message: &summary,
                    kind: "success",
                }
            } else {
                // ファイルなしはエラーではない
                Notification {
                    message: "未產生任何新的報表檔案",
                    kind: "info",
                }
            };

            Html(render_report_page(&ReportPageView {
                year,
                month,
                selected_member: member,
                message: Some(&response.message),
                files: &files,
                notification: Some(notification),
            }))
            .into_response()
        }
        Err(error) => {
            tracing::warn!("report generation failed for {}: {}", year_month, error);
            let message = format!("報表產生失敗: {}", error);
            Html(render_report_page(&ReportPageView {
                year,
                month,
                selected_member: member,
                message: Some(&message),
                files: &[],
                notification: Some(Notification {
                    message: "報表產生失敗，請稍後再試",
                    kind: "error",
                }),
            }))
            .into_response()
        }
    }
}

/// 生成済み報表ファイルのダウンロード（バックエンドへの中継）
async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    match state.api.download_report(&filename) {
        Ok((content_type, bytes)) => attachment_response(&content_type, &filename, bytes),
        Err(error) => {
            tracing::warn!("failed to download {}: {}", filename, error);
            redirect_with(
                "/report",
                &[("msg", "下載報表失敗，請稍後再試"), ("kind", "error")],
            )
            .into_response()
        }
    }
}

/// 添付ファイルとしてバイト列を返す
fn attachment_response(content_type: &str, filename: &str, bytes: Vec<u8>) -> Response {
    // ヘッダに入れられない文字は除去する
    let safe_name: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", safe_name),
            ),
        ],
        bytes,
    )
        .into_response()
}
