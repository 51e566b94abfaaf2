use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::user::Role;
use crate::utils::parse_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Employee {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Query filters for the employee list
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub role: Option<Role>,
    /// `None` keeps the backend default (active only)
    pub active_only: Option<bool>,
}

/// Partial update; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EmployeeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl EmployeeUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.department.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    ClockedIn,
    ClockedOut,
    Break,
    Lunch,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::ClockedIn => write!(f, "Clocked In"),
            AttendanceStatus::ClockedOut => write!(f, "Clocked Out"),
            AttendanceStatus::Break => write!(f, "On Break"),
            AttendanceStatus::Lunch => write!(f, "At Lunch"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceRecord {
    pub id: i64,
    pub clock_in: String,
    #[serde(default)]
    pub clock_out: Option<String>,
    #[serde(default)]
    pub total_hours: Option<f64>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub location: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// Still open: clocked in without a clock-out
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }

    /// Hours for this record. Uses the backend's figure when present,
    /// otherwise derives it from the clock-in/out pair.
    pub fn hours(&self) -> Option<f64> {
        if let Some(hours) = self.total_hours {
            return Some(hours);
        }
        let clock_in = parse_timestamp(&self.clock_in)?;
        let clock_out = parse_timestamp(self.clock_out.as_deref()?)?;
        let minutes = (clock_out - clock_in).num_minutes();
        (minutes >= 0).then(|| minutes as f64 / 60.0)
    }

    /// Calendar day of the clock-in, `YYYY-MM-DD`
    pub fn day(&self) -> Option<String> {
        parse_timestamp(&self.clock_in).map(|dt| dt.format("%Y-%m-%d").to_string())
    }

    /// Human-readable location, if the record has an `address` field
    pub fn location_label(&self) -> Option<String> {
        self.location
            .as_ref()?
            .get("address")?
            .as_str()
            .map(str::to_string)
    }
}

/// Totals computed over fetched attendance records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceSummary {
    pub records: usize,
    pub total_hours: f64,
    pub days_worked: usize,
    pub open_records: usize,
    pub by_status: BTreeMap<AttendanceStatus, usize>,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let mut summary = AttendanceSummary {
            records: records.len(),
            ..Default::default()
        };
        let mut days = std::collections::BTreeSet::new();

        for record in records {
            summary.total_hours += record.hours().unwrap_or(0.0);
            if record.is_open() {
                summary.open_records += 1;
            }
            if let Some(day) = record.day() {
                days.insert(day);
            }
            *summary.by_status.entry(record.status).or_insert(0) += 1;
        }

        summary.days_worked = days.len();
        summary
    }

    /// Average hours per worked day
    pub fn average_hours_per_day(&self) -> Option<f64> {
        (self.days_worked > 0).then(|| self.total_hours / self.days_worked as f64)
    }
}

/// Group employees by department; employees without one go under `"Unassigned"`
pub fn group_by_department(employees: &[Employee]) -> BTreeMap<String, Vec<&Employee>> {
    let mut groups: BTreeMap<String, Vec<&Employee>> = BTreeMap::new();
    for employee in employees {
        let key = employee
            .department
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Unassigned".to_string());
        groups.entry(key).or_default().push(employee);
    }
    groups
}
