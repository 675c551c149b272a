use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 加班記録（バックエンドの /api/duties が返す形式）
/// dateTimeは区切りなしの14桁トークン YYYYMMDDHHMM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyRecord {
    pub id: String,
    #[serde(rename = "dateTime")]
    pub date_time: String,
    pub hours: f64,
    pub person: String,
    pub reason: String,
}

/// 加班記録の新規作成リクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyCreate {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    pub hours: f64,
    pub person: String,
    pub reason: String,
}

/// 祝日レコード（バックエンドの /api/holidays が返す形式）
/// フィールド名は台湾政府オープンデータ由来の中国語キー
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    /// 8桁日付トークン YYYYMMDD
    #[serde(rename = "西元日期")]
    pub date: String,
    #[serde(rename = "星期")]
    pub weekday: String,
    /// "0"=勤務日, "2"=休日, "3"=特殊日（休日扱い）
    #[serde(rename = "是否放假")]
    pub holiday_flag: String,
    #[serde(rename = "備註")]
    pub description: String,
}

/// 日付ごとの休日ステータス
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolidayStatus {
    pub is_holiday: bool,
    pub is_special: bool,
    pub description: String,
}

impl HolidayStatus {
    /// 生フラグから変換（"2"/"3"→休日, "3"→特殊日）
    pub fn from_flag(flag: &str, description: &str) -> Self {
        Self {
            is_holiday: flag == "2" || flag == "3",
            is_special: flag == "3",
            description: description.to_string(),
        }
    }

    /// 編集フォーム用の逆変換
    pub fn status_code(&self) -> &'static str {
        if self.is_special {
            "3"
        } else if self.is_holiday {
            "2"
        } else {
            "0"
        }
    }
}

/// 日付トークン → 休日ステータスのマップ
pub type HolidayStatusMap = HashMap<String, HolidayStatus>;

/// 祝日レコード一覧からステータスマップを構築する
pub fn build_holiday_status_map(holidays: &[Holiday]) -> HolidayStatusMap {
    holidays
        .iter()
        .map(|h| {
            (
                h.date.clone(),
                HolidayStatus::from_flag(&h.holiday_flag, &h.description),
            )
        })
        .collect()
}

/// 報表産生レスポンス
/// download_url / generated_files の欠落は「ファイル未生成」を意味し、エラーではない
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGenerationResponse {
    pub message: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub generated_files: Option<Vec<GeneratedFile>>,
}

/// 生成済み報表ファイル
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub url: String,
}

impl GeneratedFile {
    /// パス末尾のファイル名
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

// 加班原因の選択肢。コード"10"（其他）のみ自由記述が必須
pub const REASON_OPTIONS: [(&str, &str); 10] = [
    ("1", "1. 查巡病房"),
    ("2", "2. 醫療會議"),
    ("3", "3. 夜間門診"),
    ("4", "4. 緊急開刀"),
    ("5", "5. 受院緊急召回"),
    ("6", "6. 當班執行醫療業務超時"),
    ("7", "7. 病房值班"),
    ("8", "8. ICU值班"),
    ("9", "9. 急診值班"),
    ("10", "10. 其他(請敘明原因)"),
];

/// 原因コードから表示ラベルを取得。未知のコードはそのまま返す
pub fn reason_label(code: &str) -> &str {
    REASON_OPTIONS
        .iter()
        .find(|(value, _)| *value == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}

/// 値班メンバー
#[derive(Debug, Clone, Copy)]
pub struct DutyMember {
    /// 報表生成APIの member_id
    pub member_id: &'static str,
    pub staff_no: &'static str,
    pub name: &'static str,
}

impl DutyMember {
    /// チェックボックス用ラベル（職員番号 + 氏名）
    pub fn label(&self) -> String {
        format!("{} {}", self.staff_no, self.name)
    }
}

// 値班メンバー一覧。member_idはバックエンド報表生成側の割当と対応する
pub const DUTY_MEMBERS: [DutyMember; 8] = [
    DutyMember { member_id: "A", staff_no: "00412", name: "林承翰" },
    DutyMember { member_id: "B", staff_no: "01583", name: "陳雅婷" },
    DutyMember { member_id: "C", staff_no: "01726", name: "黃冠霖" },
    DutyMember { member_id: "D", staff_no: "01834", name: "張惠雯" },
    DutyMember { member_id: "E", staff_no: "01952", name: "吳宗翰" },
    DutyMember { member_id: "F", staff_no: "02041", name: "李佩珊" },
    DutyMember { member_id: "G", staff_no: "02155", name: "許文昌" },
    DutyMember { member_id: "H", staff_no: "02278", name: "蔡孟儒" },
];

/// 14桁トークンを "YYYY/MM/DD HH:MM" 形式に整形する
/// トークンは固定幅であり、分解は必ず固定オフセットのスライスで行う
pub fn format_date_time(date_time: &str) -> String {
    if date_time.len() < 12 || !date_time.is_ascii() {
        return date_time.to_string();
    }
    format!(
        "{}/{}/{} {}:{}",
        &date_time[0..4],
        &date_time[4..6],
        &date_time[6..8],
        &date_time[8..10],
        &date_time[10..12],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_time() {
        assert_eq!(format_date_time("202410080730"), "2024/10/08 07:30");
        // 短すぎるトークンはそのまま返す
        assert_eq!(format_date_time("20241008"), "20241008");
    }

    #[test]
    fn test_holiday_status_from_flag() {
        let workday = HolidayStatus::from_flag("0", "");
        assert!(!workday.is_holiday);
        assert!(!workday.is_special);

        let holiday = HolidayStatus::from_flag("2", "春節");
        assert!(holiday.is_holiday);
        assert!(!holiday.is_special);

        // "3" は特殊日かつ休日扱い
        let special = HolidayStatus::from_flag("3", "補假");
        assert!(special.is_holiday);
        assert!(special.is_special);
    }

    #[test]
    fn test_status_code_roundtrip() {
        for flag in ["0", "2", "3"] {
            assert_eq!(HolidayStatus::from_flag(flag, "").status_code(), flag);
        }
    }

    #[test]
    fn test_build_holiday_status_map() {
        let holidays = vec![
            Holiday {
                date: "20240101".to_string(),
                weekday: "一".to_string(),
                holiday_flag: "2".to_string(),
                description: "開國紀念日".to_string(),
            },
            Holiday {
                date: "20240102".to_string(),
                weekday: "二".to_string(),
                holiday_flag: "0".to_string(),
                description: String::new(),
            },
        ];
        let map = build_holiday_status_map(&holidays);
        assert_eq!(map.len(), 2);
        assert!(map["20240101"].is_holiday);
        assert_eq!(map["20240101"].description, "開國紀念日");
        assert!(!map["20240102"].is_holiday);
    }

    #[test]
    fn test_reason_label() {
        assert_eq!(reason_label("1"), "1. 查巡病房");
        assert_eq!(reason_label("10"), "10. 其他(請敘明原因)");
        // 未知コードはフォールバック
        assert_eq!(reason_label("99"), "99");
    }

    #[test]
    fn test_duty_record_wire_format() {
        // バックエンドはcamelCaseのdateTimeを使う
        let json = r#"{"id":"7","dateTime":"202410080730","hours":0.5,"person":"林承翰","reason":"2. 醫療會議"}"#;
        let record: DutyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.date_time, "202410080730");
        let back = serde_json::to_string(&record).unwrap();
        assert!(back.contains("\"dateTime\""));
    }

    #[test]
    fn test_holiday_wire_format() {
        let json = r#"{"西元日期":"20240101","星期":"一","是否放假":"2","備註":"開國紀念日"}"#;
        let holiday: Holiday = serde_json::from_str(json).unwrap();
        assert_eq!(holiday.date, "20240101");
        assert_eq!(holiday.holiday_flag, "2");
    }

    #[test]
    fn test_report_response_without_files() {
        // generated_filesの欠落は有効なレスポンス
        let json = r#"{"message":"已完成處理"}"#;
        let resp: ReportGenerationResponse = serde_json::from_str(json).unwrap();
        assert!(resp.download_url.is_none());
        assert!(resp.generated_files.is_none());
    }

    #[test]
    fn test_generated_file_name() {
        let file = GeneratedFile {
            path: "output/202401/overtime_report_202401_A.xlsx".to_string(),
            url: "/api/download/overtime_report_202401_A.xlsx".to_string(),
        };
        assert_eq!(file.file_name(), "overtime_report_202401_A.xlsx");
    }
}
