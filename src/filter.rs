use crate::duty_data::DutyRecord;

/// 一覧の絞り込み状態
/// 人員・検索語を変更する遷移は必ずページを0に戻す
#[derive(Debug, Clone, PartialEq)]
pub struct DutyFilter {
    /// "all" は全員
    pub person: String,
    pub search: String,
    pub page: usize,
    pub page_size: usize,
}

impl Default for DutyFilter {
    fn default() -> Self {
        Self {
            person: "all".to_string(),
            search: String::new(),
            page: 0,
            page_size: 10,
        }
    }
}

impl DutyFilter {
    pub fn with_person(mut self, person: &str) -> Self {
        self.person = person.to_string();
        self.page = 0;
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.to_string();
        self.page = 0;
        self
    }

    /// ページ番号のみの移動。絞り込み条件は変えない
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// 1ページ件数の変更もページを0に戻す
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self.page = 0;
        self
    }
}

/// 絞り込みを適用する。入力順は保持する
/// 人員は完全一致、検索語は小文字化した部分一致
/// （person / reason / 生のdateTimeトークンのいずれか）で、両条件はANDで合成する
pub fn filter_duties<'a>(duties: &'a [DutyRecord], filter: &DutyFilter) -> Vec<&'a DutyRecord> {
    let search = filter.search.trim().to_lowercase();
    duties
        .iter()
        .filter(|duty| filter.person == "all" || duty.person == filter.person)
        .filter(|duty| {
            if search.is_empty() {
                return true;
            }
            duty.person.to_lowercase().contains(&search)
                || duty.reason.to_lowercase().contains(&search)
                || duty.date_time.contains(&search)
        })
        .collect()
}

/// 絞り込み結果の1ページぶんを切り出す純粋なスライス
pub fn page_slice<'a, T>(items: &'a [T], page: usize, page_size: usize) -> &'a [T] {
    if page_size == 0 {
        return &items[..0];
    }
    let start = page * page_size;
    if start >= items.len() {
        return &items[..0];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// 総ページ数
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// 絞り込みドロップダウン用の人員一覧（初出順・重複なし）
pub fn person_options(duties: &[DutyRecord]) -> Vec<String> {
    let mut persons: Vec<String> = Vec::new();
    for duty in duties {
        if !persons.contains(&duty.person) {
            persons.push(duty.person.clone());
        }
    }
    persons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duty(id: &str, date_time: &str, person: &str, reason: &str) -> DutyRecord {
        DutyRecord {
            id: id.to_string(),
            date_time: date_time.to_string(),
            hours: 0.5,
            person: person.to_string(),
            reason: reason.to_string(),
        }
    }

    fn sample_duties() -> Vec<DutyRecord> {
        vec![
            duty("1", "202410080730", "林承翰", "7. 病房值班"),
            duty("2", "202410081900", "陳雅婷", "8. ICU值班"),
            duty("3", "202410120800", "林承翰", "2. 醫療會議"),
            duty("4", "202410150730", "黃冠霖", "9. 急診值班"),
        ]
    }

    #[test]
    fn test_filter_by_person_exact() {
        let duties = sample_duties();
        let filter = DutyFilter::default().with_person("林承翰");
        let result = filter_duties(&duties, &filter);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|d| d.person == "林承翰"));
    }

    #[test]
    fn test_filter_all_returns_everything() {
        let duties = sample_duties();
        let result = filter_duties(&duties, &DutyFilter::default());
        assert_eq!(result.len(), duties.len());
    }

    #[test]
    fn test_search_matches_person_reason_or_token() {
        let duties = sample_duties();

        // 人員名に一致
        let by_person = filter_duties(&duties, &DutyFilter::default().with_search("陳雅婷"));
        assert_eq!(by_person.len(), 1);
        assert_eq!(by_person[0].id, "2");

        // 原因に一致（大文字小文字は無視）
        let by_reason = filter_duties(&duties, &DutyFilter::default().with_search("icu"));
        assert_eq!(by_reason.len(), 1);
        assert_eq!(by_reason[0].id, "2");

        // 生のdateTimeトークンに一致
        let by_token = filter_duties(&duties, &DutyFilter::default().with_search("20241012"));
        assert_eq!(by_token.len(), 1);
        assert_eq!(by_token[0].id, "3");

        // 前後の空白は無視
        let trimmed = filter_duties(&duties, &DutyFilter::default().with_search("  icu  "));
        assert_eq!(trimmed.len(), 1);
    }

    #[test]
    fn test_filters_compose_with_and() {
        let duties = sample_duties();
        let filter = DutyFilter::default()
            .with_person("林承翰")
            .with_search("醫療會議");
        let result = filter_duties(&duties, &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "3");

        // 人員が合わなければ検索語が一致しても空
        let filter = DutyFilter::default()
            .with_person("陳雅婷")
            .with_search("醫療會議");
        assert!(filter_duties(&duties, &filter).is_empty());
    }

    #[test]
    fn test_result_is_subset_and_preserves_order() {
        let duties = sample_duties();
        let result = filter_duties(&duties, &DutyFilter::default().with_search("值班"));
        // 出力は入力の部分集合で、並べ替えをしない
        let ids: Vec<&str> = result.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let filter = DutyFilter::default().with_page(3);
        assert_eq!(filter.page, 3);
        assert_eq!(filter.clone().with_person("林承翰").page, 0);
        assert_eq!(filter.clone().with_search("icu").page, 0);
        assert_eq!(filter.with_page_size(25).page, 0);
    }

    #[test]
    fn test_page_slice() {
        let items: Vec<u32> = (0..25).collect();
        assert_eq!(page_slice(&items, 0, 10), &items[0..10]);
        assert_eq!(page_slice(&items, 2, 10), &items[20..25]);
        // 範囲外のページは空
        assert!(page_slice(&items, 3, 10).is_empty());
        assert!(page_slice(&items, 0, 0).is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(25, 10), 3);
        assert_eq!(page_count(30, 10), 3);
        assert_eq!(page_count(0, 10), 0);
    }

    #[test]
    fn test_person_options_unique_in_order() {
        let duties = sample_duties();
        assert_eq!(person_options(&duties), vec!["林承翰", "陳雅婷", "黃冠霖"]);
    }
}
