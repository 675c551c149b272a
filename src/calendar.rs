use chrono::{Datelike, NaiveDate};

use crate::duty_data::{HolidayStatus, HolidayStatusMap};

/// カレンダーの1マス。月初前の空白は `None` で表現する
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarCell {
    pub day_of_month: u32,
    /// 8桁日付トークン YYYYMMDD
    pub date_token: String,
    /// マップに無い日は勤務日（ステータスなし）
    pub status: Option<HolidayStatus>,
}

/// 月の日数を取得
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    next_month.unwrap().pred_opt().unwrap().day()
}

/// 基準日にnヶ月加算する。月末日の溢れは月末にクランプする
/// 例: 2024-01-31 に +1 → 2024-02-29
pub fn advance_month(pivot: NaiveDate, delta_months: i32) -> NaiveDate {
    let total = pivot.year() * 12 + pivot.month0() as i32 + delta_months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = pivot.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// 月キー "YYYYMM" を生成
pub fn year_month_key(pivot: NaiveDate) -> String {
    format!("{:04}{:02}", pivot.year(), pivot.month())
}

/// "YYYYMM" または "YYYY-MM" を (年, 月) に分解する
pub fn parse_year_month(input: &str) -> Option<(i32, u32)> {
    let token: String = input.chars().filter(|c| *c != '-').collect();
    if token.len() != 6 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = token[0..4].parse().ok()?;
    let month: u32 = token[4..6].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

/// 月表示ラベル "YYYY 年 MM 月"
pub fn month_label(year: i32, month: u32) -> String {
    format!("{} 年 {:02} 月", year, month)
}

/// 指定月の7列カレンダー用セル列を構築する
/// 月初の曜日（0=日曜）ぶんだけ先頭に空白を置き、以降1日1セルを並べる
/// 末尾の詰め物は出力しない（レンダラ側の責務）
pub fn build_month_grid(
    year: i32,
    month: u32,
    status_map: &HolidayStatusMap,
) -> Vec<Option<CalendarCell>> {
    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let starting_day_of_week = first_of_month.weekday().num_days_from_sunday();

    let mut cells: Vec<Option<CalendarCell>> = Vec::new();
    for _ in 0..starting_day_of_week {
        cells.push(None);
    }
    for day in 1..=days_in_month(year, month) {
        let date_token = format!("{:04}{:02}{:02}", year, month, day);
        let status = status_map.get(&date_token).cloned();
        cells.push(Some(CalendarCell {
            day_of_month: day,
            date_token,
            status,
        }));
    }
    cells
}

/// 編集フォームの初期値 (状態コード, 備考)
/// マップに無い日は勤務日・備考なしとして扱う
pub fn edit_prefill(date_token: &str, status_map: &HolidayStatusMap) -> (String, String) {
    match status_map.get(date_token) {
        Some(status) => (status.status_code().to_string(), status.description.clone()),
        None => ("0".to_string(), String::new()),
    }
}
