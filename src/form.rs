use crate::duty_data::{reason_label, DutyCreate};

/// 加班記録入力フォームの状態
#[derive(Debug, Clone, PartialEq)]
pub struct DutyFormState {
    /// 8桁日付トークン YYYYMMDD。未選択は空
    pub date: String,
    /// "HH:MM"
    pub time: String,
    pub hours: f64,
    /// 選択順を保持する（送信順に意味がある）
    pub selected_persons: Vec<String>,
    pub reason_code: String,
    pub additional_reason: String,
}

impl Default for DutyFormState {
    fn default() -> Self {
        Self {
            date: String::new(),
            time: "00:00".to_string(),
            hours: 0.5,
            selected_persons: Vec::new(),
            reason_code: String::new(),
            additional_reason: String::new(),
        }
    }
}

impl DutyFormState {
    /// 人員の選択/解除。選択順を保ち、重複は追加しない
    pub fn toggle_person(&mut self, person: &str) {
        if let Some(pos) = self.selected_persons.iter().position(|p| p == person) {
            self.selected_persons.remove(pos);
        } else {
            self.selected_persons.push(person.to_string());
        }
    }

    /// 送信可能か
    /// 日付・時刻・人員・原因がすべて揃い、原因"10"（其他）は自由記述必須
    pub fn can_submit(&self) -> bool {
        !self.date.is_empty()
            && !self.time.is_empty()
            && !self.selected_persons.is_empty()
            && !self.reason_code.is_empty()
            && (self.reason_code != "10" || !self.additional_reason.is_empty())
    }

    /// 日付トークンと時刻を連結した14桁のdateTimeトークン
    fn duty_date_time(&self) -> String {
        format!("{}{}", self.date, self.time.replace(':', ""))
    }

    /// 選択人員ごとに1件の作成リクエストを組み立てる（選択順）
    /// dateTime・時数・原因は全件同一で、人員のみ異なる
    pub fn build_requests(&self) -> Vec<DutyCreate> {
        let date_time = self.duty_date_time();
        let label = reason_label(&self.reason_code);
        let reason = if self.additional_reason.is_empty() {
            label.to_string()
        } else {
            format!("{} - {}", label, self.additional_reason)
        };

        self.selected_persons
            .iter()
            .map(|person| DutyCreate {
                date_time: date_time.clone(),
                hours: self.hours,
                person: person.clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    /// 送信成功後は初期状態に戻す
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 時刻の選択肢（00:00〜23:30、30分刻み）
pub fn time_options() -> Vec<String> {
    let mut times = Vec::with_capacity(48);
    for hour in 0..24 {
        for minute in [0, 30] {
            times.push(format!("{:02}:{:02}", hour, minute));
        }
    }
    times
}

/// 時数の選択肢（0.5〜16.0時間、0.5刻み）
pub fn hour_options() -> Vec<f64> {
    (1..=32).map(|i| i as f64 * 0.5).collect()
}

/// 逐次実行バッチの失敗報告
/// 成功済み件数と最初の失敗要因を1つの通知にまとめる
#[derive(Debug)]
pub struct BatchFailure<E> {
    pub succeeded: usize,
    pub error: E,
}

/// リクエスト列を順番に実行し、最初の失敗で打ち切る
/// 成功済みリクエストの取り消しは行わない。再取得で実際の状態を反映させる
pub fn submit_all<T, E, F>(requests: &[DutyCreate], mut op: F) -> Result<usize, BatchFailure<E>>
where
    F: FnMut(&DutyCreate) -> Result<T, E>,
{
    for (index, request) in requests.iter().enumerate() {
        if let Err(error) = op(request) {
            return Err(BatchFailure {
                succeeded: index,
                error,
            });
        }
    }
    Ok(requests.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> DutyFormState {
        let mut form = DutyFormState {
            date: "20240115".to_string(),
            time: "07:30".to_string(),
            hours: 1.5,
            selected_persons: Vec::new(),
            reason_code: "2".to_string(),
            additional_reason: String::new(),
        };
        form.toggle_person("林承翰");
        form.toggle_person("陳雅婷");
        form.toggle_person("黃冠霖");
        form
    }

    #[test]
    fn test_can_submit_requires_all_fields() {
        let form = filled_form();
        assert!(form.can_submit());

        let mut missing_date = form.clone();
        missing_date.date.clear();
        assert!(!missing_date.can_submit());

        let mut missing_time = form.clone();
        missing_time.time.clear();
        assert!(!missing_time.can_submit());

        let mut nobody = form.clone();
        nobody.selected_persons.clear();
        assert!(!nobody.can_submit());

        let mut no_reason = form.clone();
        no_reason.reason_code.clear();
        assert!(!no_reason.can_submit());
    }

    #[test]
    fn test_reason_10_requires_additional_text() {
        let mut form = filled_form();
        form.reason_code = "10".to_string();
        form.additional_reason.clear();
        assert!(!form.can_submit());

        // 自由記述を入れると送信可能になる
        form.additional_reason = "支援轉院".to_string();
        assert!(form.can_submit());
    }

    #[test]
    fn test_toggle_person_keeps_selection_order() {
        let mut form = DutyFormState::default();
        form.toggle_person("陳雅婷");
        form.toggle_person("林承翰");
        form.toggle_person("陳雅婷"); // 解除
        form.toggle_person("黃冠霖");
        assert_eq!(form.selected_persons, vec!["林承翰", "黃冠霖"]);
    }

    #[test]
    fn test_build_requests_one_per_person() {
        let form = filled_form();
        let requests = form.build_requests();
        assert_eq!(requests.len(), 3);

        // dateTime・時数・原因は全件同一
        for request in &requests {
            assert_eq!(request.date_time, "202401150730");
            assert_eq!(request.hours, 1.5);
            assert_eq!(request.reason, "2. 醫療會議");
        }
        // 人員は選択順
        let persons: Vec<&str> = requests.iter().map(|r| r.person.as_str()).collect();
        assert_eq!(persons, vec!["林承翰", "陳雅婷", "黃冠霖"]);
    }

    #[test]
    fn test_build_requests_appends_additional_reason() {
        let mut form = filled_form();
        form.reason_code = "10".to_string();
        form.additional_reason = "支援轉院".to_string();
        let requests = form.build_requests();
        assert_eq!(requests[0].reason, "10. 其他(請敘明原因) - 支援轉院");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut form = filled_form();
        form.reset();
        assert_eq!(form, DutyFormState::default());
    }

    #[test]
    fn test_submit_all_sequential_success() {
        let form = filled_form();
        let requests = form.build_requests();
        let mut seen: Vec<String> = Vec::new();
        let result = submit_all(&requests, |request| {
            seen.push(request.person.clone());
            Ok::<(), &str>(())
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(seen, vec!["林承翰", "陳雅婷", "黃冠霖"]);
    }

    #[test]
    fn test_submit_all_stops_at_first_failure() {
        let form = filled_form();
        let requests = form.build_requests();
        let mut calls = 0;
        let result = submit_all(&requests, |_| {
            calls += 1;
            if calls == 2 {
                Err("boom")
            } else {
                Ok(())
            }
        });
        let failure = result.unwrap_err();
        // 2件目で失敗 → 成功1件、3件目は実行されない
        assert_eq!(failure.succeeded, 1);
        assert_eq!(failure.error, "boom");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_option_tables() {
        let times = time_options();
        assert_eq!(times.len(), 48);
        assert_eq!(times[0], "00:00");
        assert_eq!(times[1], "00:30");
        assert_eq!(times[47], "23:30");

        let hours = hour_options();
        assert_eq!(hours.len(), 32);
        assert_eq!(hours[0], 0.5);
        assert_eq!(hours[31], 16.0);
    }
}
