use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Attendance,
    Task,
    Weekly,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Attendance => "attendance",
            ReportType::Task => "task",
            ReportType::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attendance" => Ok(ReportType::Attendance),
            "task" | "tasks" => Ok(ReportType::Task),
            "weekly" => Ok(ReportType::Weekly),
            other => Err(format!("Unknown report type: {}", other)),
        }
    }
}

/// Report generation form. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub filters: Map<String, Value>,
}

impl ReportRequest {
    pub fn new(report_type: ReportType, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            report_type,
            start_date: start_date.into(),
            end_date: end_date.into(),
            filters: Map::new(),
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// Response of the generate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GeneratedReport {
    pub message: String,
    #[serde(default)]
    pub report_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Report {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub report_type: String,
    #[serde(default)]
    pub content: Value,
    pub generated_by_id: i64,
    pub date_from: String,
    pub date_to: String,
    pub created_at: String,
}

impl Report {
    /// Report body as display text. String content is returned as is,
    /// structured content is pretty-printed.
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("report").or_else(|| map.get("output")) {
                Some(Value::String(s)) => s.clone(),
                _ => serde_json::to_string_pretty(&self.content).unwrap_or_default(),
            },
            other => serde_json::to_string_pretty(other).unwrap_or_default(),
        }
    }
}

/// Query filters and paging for the report list
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub report_type: Option<ReportType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_request_shape() {
        let request = ReportRequest::new(ReportType::Weekly, "2024-03-04", "2024-03-10").filter("user_id", 4);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "report_type": "weekly",
                "start_date": "2024-03-04",
                "end_date": "2024-03-10",
                "filters": {"user_id": 4}
            })
        );
    }

    #[test]
    fn test_report_parses_type_field() {
        let json = r#"{
            "id": 2, "title": "Attendance Mar", "type": "attendance",
            "content": {"report": "All present"}, "generated_by_id": 1,
            "date_from": "2024-03-01T00:00:00", "date_to": "2024-03-31T00:00:00",
            "created_at": "2024-04-01T08:00:00"
        }"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.report_type, "attendance");
        assert_eq!(report.content_text(), "All present");
    }

    #[test]
    fn test_content_text_pretty_prints_structures() {
        let report = Report {
            id: 1,
            title: "t".into(),
            report_type: "task".into(),
            content: serde_json::json!({"completed": 3}),
            generated_by_id: 1,
            date_from: String::new(),
            date_to: String::new(),
            created_at: String::new(),
        };
        assert!(report.content_text().contains("\"completed\": 3"));
    }

    #[test]
    fn test_report_type_from_str() {
        assert_eq!("tasks".parse::<ReportType>().unwrap(), ReportType::Task);
        assert!("monthly".parse::<ReportType>().is_err());
    }
}
