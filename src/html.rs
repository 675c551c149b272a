use crate::calendar::{month_label, CalendarCell};
use crate::duty_data::{
    format_date_time, DutyRecord, GeneratedFile, DUTY_MEMBERS, REASON_OPTIONS,
};
use crate::filter::{page_count, DutyFilter};
use crate::form::{hour_options, time_options, DutyFormState};

/// 画面上部に表示する通知。kindは "success" / "error" / "info"
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    pub message: &'a str,
    pub kind: &'a str,
}

/// HTML属性・本文用のエスケープ
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// クエリ文字列を組み立てる（値はURLエンコード済みになる）
pub fn query_string(pairs: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

const STYLE: &str = r#"
body { font-family: "Microsoft JhengHei", Arial, sans-serif; margin: 0; background: #f5f5f5; color: #212121; }
header { background: #4caf50; color: white; padding: 12px 24px; }
header h1 { margin: 0 0 8px; font-size: 1.3em; }
nav a { color: white; text-decoration: none; margin-right: 16px; padding: 4px 0; }
nav a.active { border-bottom: 2px solid #ffc107; }
main { max-width: 960px; margin: 16px auto; padding: 0 16px; }
section { background: white; border-radius: 6px; padding: 16px 20px; margin-bottom: 16px; box-shadow: 0 1px 3px rgba(0,0,0,0.15); }
.notice { max-width: 928px; margin: 12px auto 0; padding: 10px 16px; border-radius: 4px; }
.notice.success { background: #e8f5e9; border: 1px solid #4caf50; }
.notice.error { background: #ffebee; border: 1px solid #e53935; }
.notice.info { background: #e3f2fd; border: 1px solid #1e88e5; }
.field { margin: 8px 0; }
.field label { display: inline-block; min-width: 110px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
th { background: #fafafa; }
.month-nav { display: flex; align-items: center; gap: 12px; margin-bottom: 12px; }
.month-nav a { text-decoration: none; font-size: 1.1em; }
.calendar td { width: 14%; height: 64px; vertical-align: top; padding: 4px; }
.calendar td.empty { background: #fafafa; }
.calendar a { display: block; height: 100%; text-decoration: none; color: inherit; }
.calendar .day-no { font-weight: bold; }
.calendar .desc { display: block; font-size: 0.75em; overflow: hidden; white-space: nowrap; }
.calendar td.holiday { background: #ffcdd2; }
.calendar td.special { background: #bbdefb; }
button { background: #4caf50; color: white; border: none; border-radius: 4px; padding: 6px 14px; cursor: pointer; }
button:disabled { background: #bdbdbd; }
button.danger { background: #e53935; }
.pager { margin-top: 10px; }
.pager a { margin: 0 6px; }
.hint { color: #616161; font-size: 0.85em; }
"#;

// 通知の自動クローズと、送信中の二重送信防止（ボタン無効化）
const SCRIPT: &str = r#"
setTimeout(function () {
  var n = document.querySelector('.notice');
  if (n) { n.style.display = 'none'; }
}, 6000);
document.querySelectorAll('form[method=post]').forEach(function (f) {
  f.addEventListener('submit', function () {
    var b = f.querySelector('button[type=submit]');
    if (b) { b.disabled = true; }
  });
});
"#;

/// 共通レイアウト
pub fn layout(title: &str, active: &str, notification: Option<Notification>, body: &str) -> String {
    let tabs = [
        ("/duties", "值班列表"),
        ("/report", "產生報表"),
        ("/calendar", "假日日曆"),
    ];
    let nav: String = tabs
        .iter()
        .map(|(href, label)| {
            let class = if *href == active { " class=\"active\"" } else { "" };
            format!("<a href=\"{}\"{}>{}</a>", href, class, label)
        })
        .collect();

    let banner = match notification {
        Some(n) => format!(
            "<div class=\"notice {}\">{}</div>",
            escape(n.kind),
            escape(n.message)
        ),
        None => String::new(),
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"zh-Hant\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} - 值班管理系統</title>\n<style>{}</style>\n</head>\n<body>\n\
         <header><h1>值班管理系統</h1><nav>{}</nav></header>\n{}\n<main>\n{}\n</main>\n\
         <script>{}</script>\n</body>\n</html>",
        escape(title),
        STYLE,
        nav,
        banner,
        body,
        SCRIPT,
    )
}

/// 値班列表ページの表示データ
pub struct DutyPageView<'a> {
    pub year: i32,
    pub month: u32,
    pub year_month: &'a str,
    pub filter: &'a DutyFilter,
    pub persons: &'a [String],
    pub rows: &'a [&'a DutyRecord],
    pub total: usize,
    pub notification: Option<Notification<'a>>,
}

/// 値班列表ページ（入力フォーム + 月送りつき一覧）
pub fn render_duty_page(view: &DutyPageView) -> String {
    let form = render_duty_form(view.year_month);
    let list = render_duty_list(view);
    layout(
        "值班列表",
        "/duties",
        view.notification,
        &format!("{}{}", form, list),
    )
}

fn render_duty_form(year_month: &str) -> String {
    let defaults = DutyFormState::default();

    let time_select: String = time_options()
        .iter()
        .map(|t| {
            let selected = if *t == defaults.time { " selected" } else { "" };
            format!("<option value=\"{0}\"{1}>{0}</option>", t, selected)
        })
        .collect();

    let hour_select: String = hour_options()
        .iter()
        .map(|h| {
            let selected = if *h == defaults.hours { " selected" } else { "" };
            format!("<option value=\"{0}\"{1}>{0} 小時</option>", h, selected)
        })
        .collect();

    let reason_select: String = REASON_OPTIONS
        .iter()
        .map(|(value, label)| format!("<option value=\"{}\">{}</option>", value, label))
        .collect();

    let person_checkboxes: String = DUTY_MEMBERS
        .iter()
        .map(|member| {
            format!(
                "<label><input type=\"checkbox\" name=\"persons\" value=\"{}\"> {}</label> ",
                escape(member.name),
                escape(&member.label())
            )
        })
        .collect();

    format!(
        "<section>\n<h2>新增加班記錄</h2>\n\
         <form method=\"post\" action=\"/duties\">\n\
         <input type=\"hidden\" name=\"month\" value=\"{year_month}\">\n\
         <div class=\"field\"><label>選擇日期</label><input type=\"date\" name=\"date\" required></div>\n\
         <div class=\"field\"><label>選擇時間</label><select name=\"time\">{time_select}</select></div>\n\
         <div class=\"field\"><label>時數</label><select name=\"hours\">{hour_select}</select></div>\n\
         <div class=\"field\"><label>加班原因</label><select name=\"reason\" required>\
         <option value=\"\">請選擇</option>{reason_select}</select></div>\n\
         <div class=\"field\"><label>原因補充（選填）</label>\
         <input type=\"text\" name=\"additional_reason\" size=\"40\"></div>\n\
         <div class=\"field\"><label>選擇人員</label>{person_checkboxes}</div>\n\
         <button type=\"submit\">新增加班記錄</button>\n\
         </form>\n</section>"
    )
}

fn render_duty_list(view: &DutyPageView) -> String {
    let prev_month = month_link_key(view.year, view.month, -1);
    let next_month = month_link_key(view.year, view.month, 1);
    let prev_qs = query_string(&[
        ("month", prev_month.as_str()),
        ("person", view.filter.person.as_str()),
        ("q", view.filter.search.as_str()),
    ]);
    let next_qs = query_string(&[
        ("month", next_month.as_str()),
        ("person", view.filter.person.as_str()),
        ("q", view.filter.search.as_str()),
    ]);

    let person_select: String = std::iter::once("all".to_string())
        .chain(view.persons.iter().cloned())
        .map(|p| {
            let selected = if p == view.filter.person { " selected" } else { "" };
            let label = if p == "all" { "全部" } else { p.as_str() };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                escape(&p),
                selected,
                escape(label)
            )
        })
        .collect();

    let page_size_select: String = [10usize, 25, 50]
        .iter()
        .map(|n| {
            let selected = if *n == view.filter.page_size { " selected" } else { "" };
            format!("<option value=\"{0}\"{1}>{0} 筆/頁</option>", n, selected)
        })
        .collect();

    let body = if view.rows.is_empty() {
        format!(
            "<p>{}沒有加班記錄</p>",
            month_label(view.year, view.month)
        )
    } else {
        let rows: String = view
            .rows
            .iter()
            .map(|duty| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                     <td><form method=\"post\" action=\"/duties/{}/delete\" \
                     onsubmit=\"return confirm('確定刪除此筆加班記錄？');\">\
                     <input type=\"hidden\" name=\"month\" value=\"{}\">\
                     <button type=\"submit\" class=\"danger\">刪除</button></form></td></tr>",
                    escape(&format_date_time(&duty.date_time)),
                    duty.hours,
                    escape(&duty.person),
                    escape(&duty.reason),
                    escape(&duty.id),
                    view.year_month,
                )
            })
            .collect();
        format!(
            "<table><thead><tr><th>日期時間</th><th>時數</th><th>人員</th><th>原因</th>\
             <th>操作</th></tr></thead><tbody>{}</tbody></table>{}",
            rows,
            render_pager(view),
        )
    };

    format!(
        "<section>\n<h2>加班記錄列表</h2>\n\
         <div class=\"month-nav\">\
         <a href=\"/duties?{prev_qs}\">&#8592;</a>\
         <strong>{label}</strong>\
         <a href=\"/duties?{next_qs}\">&#8594;</a>\
         </div>\n\
         <form method=\"get\" action=\"/duties\">\n\
         <input type=\"hidden\" name=\"month\" value=\"{ym}\">\n\
         人員 <select name=\"person\">{person_select}</select>\n\
         <input type=\"text\" name=\"q\" value=\"{q}\" placeholder=\"搜尋...\">\n\
         <select name=\"page_size\">{page_size_select}</select>\n\
         <button type=\"submit\">套用</button>\n\
         </form>\n{body}\n</section>",
        prev_qs = prev_qs,
        next_qs = next_qs,
        label = month_label(view.year, view.month),
        ym = view.year_month,
        person_select = person_select,
        q = escape(&view.filter.search),
        page_size_select = page_size_select,
        body = body,
    )
}

fn render_pager(view: &DutyPageView) -> String {
    let pages = page_count(view.total, view.filter.page_size);
    let mut nav = String::new();
    if view.filter.page > 0 {
        let qs = pager_query(view, view.filter.page - 1);
        nav.push_str(&format!("<a href=\"/duties?{}\">上一頁</a>", qs));
    }
    if view.filter.page + 1 < pages {
        let qs = pager_query(view, view.filter.page + 1);
        nav.push_str(&format!("<a href=\"/duties?{}\">下一頁</a>", qs));
    }
    format!(
        "<div class=\"pager\">共 {} 筆 · 第 {} / {} 頁 {}</div>",
        view.total,
        view.filter.page + 1,
        pages.max(1),
        nav,
    )
}

fn pager_query(view: &DutyPageView, page: usize) -> String {
    let page_param = page.to_string();
    let page_size_param = view.filter.page_size.to_string();
    query_string(&[
        ("month", view.year_month),
        ("person", view.filter.person.as_str()),
        ("q", view.filter.search.as_str()),
        ("page", page_param.as_str()),
        ("page_size", page_size_param.as_str()),
    ])
}

fn month_link_key(year: i32, month: u32, delta: i32) -> String {
    use crate::calendar::{advance_month, year_month_key};
    use chrono::NaiveDate;
    let pivot = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    year_month_key(advance_month(pivot, delta))
}

/// 假日日曆ページの表示データ
pub struct CalendarPageView<'a> {
    pub year: i32,
    pub month: u32,
    pub year_month: &'a str,
    pub grid: &'a [Option<CalendarCell>],
    /// 編集中の日 (日付トークン, 状態コード, 備考)
    pub edit: Option<(&'a str, &'a str, &'a str)>,
    pub notification: Option<Notification<'a>>,
}

/// 假日日曆ページ（7列グリッド + 状態編集パネル）
pub fn render_calendar_page(view: &CalendarPageView) -> String {
    let prev_month = month_link_key(view.year, view.month, -1);
    let next_month = month_link_key(view.year, view.month, 1);
    let prev_qs = query_string(&[("month", prev_month.as_str())]);
    let next_qs = query_string(&[("month", next_month.as_str())]);

    let header_row: String = ["日", "一", "二", "三", "四", "五", "六"]
        .iter()
        .map(|d| format!("<th>{}</th>", d))
        .collect();

    // 7マスごとに行へ分割し、末尾の行は空セルで埋める
    let mut body_rows = String::new();
    for week in view.grid.chunks(7) {
        body_rows.push_str("<tr>");
        for cell in week {
            body_rows.push_str(&render_calendar_cell(view.year_month, cell));
        }
        for _ in week.len()..7 {
            body_rows.push_str("<td class=\"empty\"></td>");
        }
        body_rows.push_str("</tr>");
    }

    let edit_panel = match view.edit {
        Some((date_token, status_code, description)) => {
            render_edit_panel(view.year_month, date_token, status_code, description)
        }
        None => String::new(),
    };

    let body = format!(
        "<section>\n<h2>假日日曆管理</h2>\n\
         <div class=\"month-nav\">\
         <a href=\"/calendar?{prev_qs}\">&#8592;</a>\
         <strong>{label}</strong>\
         <a href=\"/calendar?{next_qs}\">&#8594;</a>\
         </div>\n\
         <table class=\"calendar\"><thead><tr>{header_row}</tr></thead>\
         <tbody>{body_rows}</tbody></table>\n\
         <p class=\"hint\">點選日期即可編輯該日的假日狀態。</p>\n</section>\n{edit_panel}",
        prev_qs = prev_qs,
        next_qs = next_qs,
        label = month_label(view.year, view.month),
        header_row = header_row,
        body_rows = body_rows,
        edit_panel = edit_panel,
    );

    layout("假日日曆", "/calendar", view.notification, &body)
}

fn render_calendar_cell(year_month: &str, cell: &Option<CalendarCell>) -> String {
    match cell {
        None => "<td class=\"empty\"></td>".to_string(),
        Some(cell) => {
            let class = match &cell.status {
                Some(s) if s.is_special => " class=\"special\"",
                Some(s) if s.is_holiday => " class=\"holiday\"",
                _ => "",
            };
            let desc = cell
                .status
                .as_ref()
                .filter(|s| !s.description.is_empty())
                .map(|s| format!("<span class=\"desc\">{}</span>", escape(&s.description)))
                .unwrap_or_default();
            let qs = query_string(&[("month", year_month), ("edit", cell.date_token.as_str())]);
            format!(
                "<td{}><a href=\"/calendar?{}\"><span class=\"day-no\">{}</span>{}</a></td>",
                class, qs, cell.day_of_month, desc,
            )
        }
    }
}

fn render_edit_panel(
    year_month: &str,
    date_token: &str,
    status_code: &str,
    description: &str,
) -> String {
    let date_label = if date_token.len() == 8 {
        format!(
            "{}/{}/{}",
            &date_token[0..4],
            &date_token[4..6],
            &date_token[6..8]
        )
    } else {
        date_token.to_string()
    };

    let status_select: String = [("0", "工作日"), ("2", "假日"), ("3", "特殊日 (視為假日)")]
        .iter()
        .map(|(value, label)| {
            let selected = if *value == status_code { " selected" } else { "" };
            format!("<option value=\"{}\"{}>{}</option>", value, selected, label)
        })
        .collect();

    let cancel_qs = query_string(&[("month", year_month)]);
    format!(
        "<section>\n<h2>編輯假日狀態</h2>\n<p>日期: {date_label}</p>\n\
         <form method=\"post\" action=\"/calendar/{date_token}\">\n\
         <input type=\"hidden\" name=\"month\" value=\"{year_month}\">\n\
         <div class=\"field\"><label>狀態</label><select name=\"status\">{status_select}</select></div>\n\
         <div class=\"field\"><label>備註</label>\
         <input type=\"text\" name=\"description\" value=\"{description}\" size=\"40\"></div>\n\
         <button type=\"submit\">儲存</button>\n\
         <a href=\"/calendar?{cancel_qs}\">取消</a>\n\
         </form>\n</section>",
        date_label = date_label,
        date_token = escape(date_token),
        year_month = year_month,
        status_select = status_select,
        description = escape(description),
        cancel_qs = cancel_qs,
    )
}

/// 產生報表ページの表示データ
pub struct ReportPageView<'a> {
    pub year: i32,
    pub month: u32,
    pub selected_member: &'a str,
    pub message: Option<&'a str>,
    pub files: &'a [GeneratedFile],
    pub notification: Option<Notification<'a>>,
}

/// 產生報表ページ
pub fn render_report_page(view: &ReportPageView) -> String {
    let member_select: String = std::iter::once(String::from(
        "<option value=\"\">所有成員</option>",
    ))
    .chain(DUTY_MEMBERS.iter().map(|member| {
        let selected = if member.member_id == view.selected_member {
            " selected"
        } else {
            ""
        };
        format!(
            "<option value=\"{}\"{}>{} ({})</option>",
            member.member_id,
            selected,
            escape(member.name),
            member.member_id,
        )
    }))
    .collect();

    let message_block = view
        .message
        .map(|m| format!("<div class=\"notice info\">{}</div>", escape(m)))
        .unwrap_or_default();

    let files_block = if view.files.is_empty() {
        String::new()
    } else {
        let items: String = view
            .files
            .iter()
            .map(|file| {
                format!(
                    "<li><a href=\"/download/{}\">{}</a></li>",
                    escape(file.file_name()),
                    escape(file.file_name()),
                )
            })
            .collect();
        format!(
            "<section><h3>已產生的報表檔案:</h3><ul>{}</ul></section>",
            items
        )
    };

    let body = format!(
        "<section>\n<h2>產生加班時數報表</h2>\n\
         <form method=\"post\" action=\"/report\">\n\
         <div class=\"field\"><label>選擇年月</label>\
         <input type=\"month\" name=\"month\" value=\"{year}-{month:02}\" required></div>\n\
         <div class=\"field\"><label>選擇成員</label><select name=\"member_id\">{member_select}</select></div>\n\
         <button type=\"submit\">產生報表</button>\n\
         </form>\n</section>\n{message_block}\n{files_block}\n\
         <p class=\"hint\">💡 報表產生需要獲取 Google Calendar 事件和手動值班資料。\
         產生的 Excel 檔案將包含選定月份的所有值班記錄和計算好的工時。\
         可以選擇產生單一成員或所有成員的報表。</p>",
        year = view.year,
        month = view.month,
        member_select = member_select,
        message_block = message_block,
        files_block = files_block,
    );

    layout("產生報表", "/report", view.notification, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape("急診值班"), "急診值班");
    }

    #[test]
    fn test_query_string_encodes_values() {
        let qs = query_string(&[("month", "202401"), ("q", "急診 值班")]);
        assert!(qs.starts_with("month=202401&q="));
        // 値はエンコードされ、生のマルチバイト文字は残らない
        assert!(!qs.contains('急'));
    }

    #[test]
    fn test_month_link_key() {
        assert_eq!(month_link_key(2024, 1, 1), "202402");
        assert_eq!(month_link_key(2024, 1, -1), "202312");
        assert_eq!(month_link_key(2024, 12, 1), "202501");
    }
}
