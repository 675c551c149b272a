use std::env;
use std::io::Read;

use thiserror::Error;

use crate::duty_data::{DutyCreate, DutyRecord, Holiday, ReportGenerationResponse};

/// バックエンドAPI呼び出しの失敗分類
/// (a)通信断 (b)非2xx応答 (c)想定外のレスポンス形式 をそれぞれ区別する
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend returned HTTP {0} {1}")]
    Status(u16, String),
    #[error("unexpected response body ({0})")]
    UnexpectedBody(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] std::io::Error),
}

impl ApiError {
    fn from_ureq(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(code, response) => {
                ApiError::Status(code, response.status_text().to_string())
            }
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}

/// バックエンドAPIの接続設定
/// 環境変数: DUTY_API_BASE（例: http://localhost:8088）
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("DUTY_API_BASE")
                .unwrap_or_else(|_| "http://localhost:8088".to_string()),
        }
    }
}

/// 報表産生の結果
/// バックエンドはJSON応答（ファイル一覧つき）とZIPアーカイブ直接応答の両方を返しうる
#[derive(Debug)]
pub enum ReportOutcome {
    Generated(ReportGenerationResponse),
    Archive { content_type: String, bytes: Vec<u8> },
}

/// 値班バックエンドへのRESTクライアント
/// 呼び出しはすべてブロッキングで、1操作=1リクエスト
#[derive(Clone)]
pub struct DutyApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl DutyApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            agent: ureq::agent(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// 指定月の加班記録一覧を取得
    pub fn get_duties_for_month(&self, year_month: &str) -> Result<Vec<DutyRecord>, ApiError> {
        let response = self
            .agent
            .get(&self.url(&format!("/duties/month/{}", year_month)))
            .call()
            .map_err(ApiError::from_ureq)?;
        Ok(response.into_json()?)
    }

    /// 加班記録を1件作成
    pub fn add_duty(&self, duty: &DutyCreate) -> Result<DutyRecord, ApiError> {
        let response = self
            .agent
            .post(&self.url("/duties"))
            .send_json(duty)
            .map_err(ApiError::from_ureq)?;
        Ok(response.into_json()?)
    }

    /// 加班記録をIDで削除
    pub fn remove_duty(&self, id: &str) -> Result<(), ApiError> {
        self.agent
            .delete(&self.url(&format!("/duties/{}", id)))
            .call()
            .map_err(ApiError::from_ureq)?;
        Ok(())
    }

    /// 指定月の祝日一覧を取得
    pub fn get_holidays_for_month(&self, year_month: &str) -> Result<Vec<Holiday>, ApiError> {
        let response = self
            .agent
            .get(&self.url(&format!("/holidays/month/{}", year_month)))
            .call()
            .map_err(ApiError::from_ureq)?;
        Ok(response.into_json()?)
    }

    /// 指定日の休日ステータスを更新
    /// 応答本体の形式には依存せず、2xxであれば成功とみなす
    pub fn update_holiday_status(
        &self,
        date: &str,
        status: &str,
        description: &str,
    ) -> Result<(), ApiError> {
        self.agent
            .put(&self.url(&format!("/holidays/{}", date)))
            .query("status", status)
            .query("description", description)
            .call()
            .map_err(ApiError::from_ureq)?;
        Ok(())
    }

    /// 指定月の報表産生をトリガーする
    /// member_id指定時は単一メンバーのみ処理される
    pub fn generate_report(
        &self,
        year_month: &str,
        member_id: Option<&str>,
    ) -> Result<ReportOutcome, ApiError> {
        let mut request = self
            .agent
            .post(&self.url(&format!("/generate_report/{}", year_month)));
        if let Some(id) = member_id {
            request = request.query("member_id", id);
        }
        let response = request.call().map_err(ApiError::from_ureq)?;

        let content_type = response.content_type().to_string();
        if content_type.contains("json") {
            Ok(ReportOutcome::Generated(response.into_json()?))
        } else if content_type.contains("zip") || content_type.contains("octet-stream") {
            let mut bytes = Vec::new();
            response.into_reader().read_to_end(&mut bytes)?;
            Ok(ReportOutcome::Archive {
                content_type,
                bytes,
            })
        } else {
            // バイナリを期待した応答がバイナリでもJSONでもない
            Err(ApiError::UnexpectedBody(content_type))
        }
    }

    /// 生成済み報表ファイルをダウンロードする
    pub fn download_report(&self, filename: &str) -> Result<(String, Vec<u8>), ApiError> {
        let response = self
            .agent
            .get(&self.url(&format!("/download/{}", filename)))
            .call()
            .map_err(ApiError::from_ureq)?;
        let content_type = response.content_type().to_string();
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        Ok((content_type, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_trims_trailing_slash() {
        let client = DutyApiClient::new(&ApiConfig {
            base_url: "http://localhost:8088/".to_string(),
        });
        assert_eq!(
            client.url("/duties/month/202401"),
            "http://localhost:8088/api/duties/month/202401"
        );
    }
}
