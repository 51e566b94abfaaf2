//! Plain-text rendering of backend records for the terminal.

use chrono::Utc;
use opsdesk_core::api::HealthStatus;
use opsdesk_core::models::{
    group_by_department, AgentActionDetail, AgentCatalog, AgentHistory, AttendanceRecord,
    AttendanceSummary, Employee, Report, Task, TaskStatus, TaskSummary, User,
};
use opsdesk_core::utils::{
    format_date, format_hours, format_optional, format_percent, format_timestamp,
    truncate_string,
};

const TITLE_WIDTH: usize = 40;
const NAME_WIDTH: usize = 24;
const MESSAGE_WIDTH: usize = 50;

pub fn user(user: &User) {
    println!("{}", user.display_name());
    println!("  Email:    {}", user.email);
    println!("  Username: {}", format_optional(&user.username, "-"));
    println!("  Role:     {}", user.role);
    if !user.is_active {
        println!("  (inactive)");
    }
}

pub fn health(health: &HealthStatus) {
    println!(
        "Backend {} (agents: {}, knowledge base: {})",
        health.status,
        if health.agents_active { "on" } else { "off" },
        if health.rag_active { "on" } else { "off" },
    );
}

// ===== Employees =====

fn employee_row(employee: &Employee) -> String {
    format!(
        "{:>5}  {:<width$}  {:<9}  {:<16}  {}",
        employee.id,
        truncate_string(&employee.full_name, NAME_WIDTH),
        employee.role.as_str(),
        truncate_string(employee.department.as_deref().unwrap_or("-"), 16),
        employee.email,
        width = NAME_WIDTH,
    )
}

pub fn employees(employees: &[Employee], grouped: bool) {
    if employees.is_empty() {
        println!("No employees found.");
        return;
    }

    if grouped {
        for (department, members) in group_by_department(employees) {
            println!("{} ({})", department, members.len());
            for employee in members {
                println!("  {}", employee_row(employee));
            }
        }
        return;
    }

    println!(
        "{:>5}  {:<width$}  {:<9}  {:<16}  {}",
        "ID",
        "NAME",
        "ROLE",
        "DEPARTMENT",
        "EMAIL",
        width = NAME_WIDTH
    );
    for employee in employees {
        println!("{}", employee_row(employee));
    }
}

pub fn employee(employee: &Employee) {
    println!("{} (#{})", employee.full_name, employee.id);
    println!("  Email:      {}", employee.email);
    println!("  Username:   {}", format_optional(&employee.username, "-"));
    println!("  Role:       {}", employee.role);
    println!("  Department: {}", format_optional(&employee.department, "-"));
    println!("  Active:     {}", if employee.is_active { "yes" } else { "no" });
    if let Some(created) = &employee.created_at {
        println!("  Since:      {}", format_date(created));
    }
}

pub fn attendance(records: &[AttendanceRecord]) {
    if records.is_empty() {
        println!("No attendance records.");
        return;
    }

    for record in records {
        let clock_out = record
            .clock_out
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "open".to_string());
        println!(
            "{:<20}  {:<20}  {:>8}  {:<12}  {}",
            format_timestamp(&record.clock_in),
            clock_out,
            record.hours().map(format_hours).unwrap_or_else(|| "-".to_string()),
            record.status.to_string(),
            record.location_label().unwrap_or_default(),
        );
    }

    let summary = AttendanceSummary::from_records(records);
    println!();
    println!(
        "{} records over {} days, {} total, {} per day",
        summary.records,
        summary.days_worked,
        format_hours(summary.total_hours),
        summary
            .average_hours_per_day()
            .map(format_hours)
            .unwrap_or_else(|| "-".to_string()),
    );
    if summary.open_records > 0 {
        println!("{} record(s) still open", summary.open_records);
    }
}

// ===== Tasks =====

pub fn tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let now = Utc::now();
    println!(
        "{:>5}  {:<width$}  {:<11}  {:<8}  {:<12}  {}",
        "ID",
        "TITLE",
        "STATUS",
        "PRIORITY",
        "DUE",
        "ASSIGNEE",
        width = TITLE_WIDTH
    );
    for task in tasks {
        let due = match &task.due_date {
            Some(due) if task.is_overdue(now) => format!("{} !", format_date(due)),
            Some(due) => format_date(due),
            None => "-".to_string(),
        };
        println!(
            "{:>5}  {:<width$}  {:<11}  {:<8}  {:<12}  {}",
            task.id,
            truncate_string(&task.title, TITLE_WIDTH),
            task.status.to_string(),
            task.priority.as_str(),
            due,
            task.assignee_id
                .map(|id| format!("#{}", id))
                .unwrap_or_else(|| "-".to_string()),
            width = TITLE_WIDTH
        );
    }
}

pub fn task(task: &Task) {
    println!("{} (#{})", task.title, task.id);
    println!("  Status:   {}", task.status);
    println!("  Priority: {}", task.priority);
    if let Some(due) = &task.due_date {
        let overdue = if task.is_overdue(Utc::now()) { " (overdue)" } else { "" };
        println!("  Due:      {}{}", format_date(due), overdue);
    }
    if let Some(assignee) = task.assignee_id {
        println!("  Assignee: #{}", assignee);
    }
    println!("  Created:  {} by #{}", format_timestamp(&task.created_at), task.created_by_id);
    if let Some(done) = &task.completed_at {
        println!("  Done:     {}", format_timestamp(done));
    }
    let tags = task.tag_list();
    if !tags.is_empty() {
        println!("  Tags:     {}", tags);
    }
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{}", description);
    }
}

pub fn task_summary(summary: &TaskSummary) {
    println!("{} tasks", summary.total);
    for status in TaskStatus::ALL {
        println!("  {:<12} {}", status.to_string(), summary.count(status));
    }
    let priorities: Vec<String> = summary
        .by_priority
        .iter()
        .map(|(priority, count)| format!("{} {}", count, priority))
        .collect();
    if !priorities.is_empty() {
        println!("  Priority:    {}", priorities.join(", "));
    }
    println!("  Overdue:     {}", summary.overdue);
    println!("  Completion:  {}", format_percent(summary.completion_rate()));
}

// ===== Agents =====

pub fn agent_catalog(catalog: &AgentCatalog) {
    for (key, info) in catalog {
        let state = if info.available { "" } else { " (unavailable)" };
        println!("{:<8} {}{}", key, info.name, state);
        println!("         {}", info.description);
    }
}

pub fn agent_history(history: &AgentHistory) {
    if history.actions.is_empty() {
        for line in history_footer(history) {
            println!("{}", line);
        }
        return;
    }

    for action in &history.actions {
        let outcome = match (action.success, action.overridden) {
            (_, true) => "overridden",
            (true, false) => "ok",
            (false, false) => "failed",
        };
        println!(
            "{:>5}  {:<20}  {:<7}  {:<10}  {:>7}  {}",
            action.id,
            format_timestamp(&action.timestamp),
            action.agent_name,
            outcome,
            action
                .execution_time_ms
                .map(|ms| format!("{}ms", ms))
                .unwrap_or_default(),
            truncate_string(action.error_message.as_deref().unwrap_or(""), MESSAGE_WIDTH),
        );
    }

    println!();
    for line in history_footer(history) {
        println!("{}", line);
    }
}

/// Paging lines under the history table
fn history_footer(history: &AgentHistory) -> Vec<String> {
    if history.actions.is_empty() {
        if history.total == 0 {
            return vec!["No agent actions recorded.".to_string()];
        }
        return vec![format!("No actions past offset {} of {}", history.offset, history.total)];
    }

    let first = u64::from(history.offset).saturating_add(1);
    let last = u64::from(history.offset).saturating_add(history.actions.len() as u64);
    let mut lines = vec![format!(
        "Showing {}-{} of {} ({} successful)",
        first,
        last,
        history.total,
        format_percent(history.success_rate()),
    )];
    if history.has_more() {
        lines.push(format!("Use --offset {} for more", last));
    }
    lines
}

pub fn agent_action(action: &AgentActionDetail) {
    println!("Action #{} by {} agent", action.id, action.agent_name);
    println!("  When:    {}", format_timestamp(&action.timestamp));
    println!("  Result:  {}", if action.success { "success" } else { "failed" });
    if let Some(user) = &action.user {
        println!("  User:    {} (#{})", user.name, user.id);
    }
    if let Some(error) = &action.error_message {
        println!("  Error:   {}", error);
    }
    if action.overridden {
        let by = action
            .overridden_by
            .as_ref()
            .map(|u| u.name.as_str())
            .unwrap_or("unknown");
        println!(
            "  Overridden by {}: {}",
            by,
            format_optional(&action.override_reason, "no reason given")
        );
    }
    println!("  Input:   {}", action.input_data);
    println!("  Output:  {}", action.output_data);
}

// ===== Reports =====

pub fn reports(reports: &[Report]) {
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }
    for report in reports {
        println!(
            "{:>5}  {:<10}  {:<width$}  {} - {}",
            report.id,
            report.report_type,
            truncate_string(&report.title, TITLE_WIDTH),
            format_date(&report.date_from),
            format_date(&report.date_to),
            width = TITLE_WIDTH
        );
    }
}

pub fn report(report: &Report) {
    println!("{} (#{})", report.title, report.id);
    println!(
        "{} - {}, generated {}",
        format_date(&report.date_from),
        format_date(&report.date_to),
        format_timestamp(&report.created_at)
    );
    println!();
    println!("{}", report.content_text());
}
