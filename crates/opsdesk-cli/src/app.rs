//! Command handlers.
//!
//! `App` owns the loaded configuration and the authenticated API client.
//! Each command records the view it belongs to on the session, so a
//! session that ends mid-command knows whether to send the user to login.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use opsdesk_core::api::{ApiClient, ApiError};
use opsdesk_core::auth::{Session, SessionEvent, LOGIN_PAGE, REGISTER_PAGE};
use opsdesk_core::config::Config;
use opsdesk_core::models::{
    AgentKind, AgentOverride, EmployeeFilter, EmployeeUpdate, HistoryQuery, NewTask, NewUser,
    ReportQuery, ReportRequest, TaskFilter, TaskSummary, TaskUpdate,
};
use opsdesk_core::utils::{
    is_valid_email, parse_date, sanitize_input, validate_password, validate_username,
};

use crate::cli::{
    AgentCommands, Cli, Commands, EmployeeCommands, RegisterArgs, ReportCommands, TaskCommands,
};
use crate::render;

/// Environment variable holding the password for non-interactive login
const PASSWORD_ENV: &str = "OPSDESK_PASSWORD";

/// Page size used when a command aggregates over every task
const SUMMARY_TASK_LIMIT: u32 = 1000;

/// Agent actions shown on the dashboard
const DASHBOARD_HISTORY_LIMIT: u32 = 5;

pub struct App {
    /// Configuration as stored on disk, without command-line overrides
    config: Config,
    config_path: PathBuf,
    client: ApiClient,
    events: broadcast::Receiver<SessionEvent>,
    json: bool,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config_path = Config::config_path()?;
        let config = Config::load_from(&config_path)?;
        Self::with_config(config, config_path, cli)
    }

    fn with_config(config: Config, config_path: PathBuf, cli: &Cli) -> Result<Self> {
        let effective = config.with_overrides(cli.api_url.as_deref(), cli.token_backend);

        let session = Arc::new(Session::new(effective.token_store()?));
        let events = session.subscribe();
        let client = ApiClient::from_config(&effective, session)?;
        info!(base_url = client.base_url(), "Client ready");

        Ok(Self {
            config,
            config_path,
            client,
            events,
            json: cli.json,
        })
    }

    pub async fn run(&mut self, command: Commands) -> Result<()> {
        let result = self.dispatch(command).await;
        self.report_session_events();
        result
    }

    async fn dispatch(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login { username } => self.login(username).await,
            Commands::Logout => self.logout(),
            Commands::Whoami => {
                self.enter("/profile");
                let user = self.client.current_user().await?;
                self.emit(&user, render::user)
            }
            Commands::Register(args) => self.register(args).await,
            Commands::Health => {
                let health = self.client.health().await?;
                self.emit(&health, render::health)
            }
            Commands::Dashboard => self.dashboard().await,
            Commands::Employees { command } => self.employees(command).await,
            Commands::Tasks { command } => self.tasks(command).await,
            Commands::Agents { command } => self.agents(command).await,
            Commands::Reports { command } => self.reports(command).await,
        }
    }

    fn enter(&self, location: &str) {
        self.client.session().set_location(location);
    }

    /// Print JSON when `--json` was given, otherwise the table view
    fn emit<T: Serialize + ?Sized>(&self, value: &T, view: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            view(value);
        }
        Ok(())
    }

    /// Tell the user about session changes that happened during the command
    fn report_session_events(&mut self) {
        for notice in self.session_notices() {
            eprintln!("{}", notice);
        }
    }

    /// Drain pending session events into messages for the user
    fn session_notices(&mut self) -> Vec<String> {
        let mut notices = Vec::new();
        loop {
            match self.events.try_recv() {
                // Without a redirect the user is already in the login flow,
                // which reports its own failure.
                Ok(SessionEvent::Invalidated {
                    reason,
                    redirect_to: Some(_),
                }) => {
                    notices.push(format!(
                        "Signed out ({}). Run `opsdesk login` to continue.",
                        reason
                    ));
                }
                Ok(SessionEvent::TokenRefreshed) => info!("Session renewed"),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed session events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        notices
    }

    // ===== Authentication =====

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        self.enter(LOGIN_PAGE);

        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => Self::prompt("Username: ")?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ => rpassword::prompt_password("Password: ")?,
        };

        self.sign_in(&username, &password).await?;
        println!("Signed in as {}", username);
        Ok(())
    }

    /// Log in and remember the username for next time
    async fn sign_in(&mut self, username: &str, password: &str) -> Result<()> {
        match self.client.login(username, password).await {
            Ok(_) => {}
            Err(ApiError::Unauthorized(_)) => bail!("Invalid username or password"),
            Err(e) => return Err(e.into()),
        }

        // Only the username is persisted. `self.config` never holds the
        // --api-url or --token-backend overrides.
        self.config.last_username = Some(username.to_string());
        if let Err(e) = self.config.save_to(&self.config_path) {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.client.logout()?;
        println!("Signed out");
        Ok(())
    }

    async fn register(&mut self, args: RegisterArgs) -> Result<()> {
        self.enter(REGISTER_PAGE);

        let email = args.email.trim().to_string();
        if !is_valid_email(&email) {
            bail!("Invalid email address: {}", email);
        }
        let username = args.username.trim().to_string();
        validate_username(&username).map_err(|e| anyhow!(e))?;

        let password = rpassword::prompt_password("Password: ")?;
        validate_password(&password).map_err(|e| anyhow!(e))?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let user = self
            .client
            .register(&NewUser {
                email,
                username,
                full_name: sanitize_input(&args.full_name),
                password,
                department: args.department.map(|d| sanitize_input(&d)),
            })
            .await?;

        println!("Account created for {}. Run `opsdesk login` to sign in.", user.full_name);
        Ok(())
    }

    // ===== Dashboard =====

    async fn dashboard(&mut self) -> Result<()> {
        self.enter("/");

        let user = self.client.current_user().await?;
        let filter = TaskFilter {
            assignee_id: Some(user.id),
            limit: Some(SUMMARY_TASK_LIMIT),
            ..Default::default()
        };
        let history = HistoryQuery {
            limit: Some(DASHBOARD_HISTORY_LIMIT),
            ..Default::default()
        };

        let (tasks, actions) = futures::join!(
            self.client.list_tasks(&filter),
            self.client.agent_history(&history)
        );
        let tasks = tasks?;
        let summary = TaskSummary::from_tasks(&tasks, Utc::now());

        if self.json {
            let value = serde_json::json!({
                "user": &user,
                "tasks": &summary,
                "recent_actions": actions.as_ref().ok(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("Welcome, {}", user.display_name());
        println!();
        render::task_summary(&summary);
        println!();
        match actions {
            Ok(history) => render::agent_history(&history),
            // Agent history is restricted for some roles
            Err(e) => warn!(error = %e, "Agent history unavailable"),
        }
        Ok(())
    }

    // ===== Employees =====

    async fn employees(&mut self, command: EmployeeCommands) -> Result<()> {
        self.enter("/employees");

        match command {
            EmployeeCommands::List {
                department,
                role,
                all,
                grouped,
            } => {
                let filter = EmployeeFilter {
                    department,
                    role,
                    active_only: all.then_some(false),
                };
                let employees = self.client.list_employees(&filter).await?;
                self.emit(&employees, |e| render::employees(e, grouped))
            }
            EmployeeCommands::Show { id } => {
                let employee = self.client.get_employee(id).await?;
                self.emit(&employee, render::employee)
            }
            EmployeeCommands::Update {
                id,
                full_name,
                department,
                role,
                active,
            } => {
                let update = EmployeeUpdate {
                    full_name: full_name.map(|n| sanitize_input(&n)),
                    department: department.map(|d| sanitize_input(&d)),
                    role,
                    is_active: active,
                };
                let result = self.client.update_employee(id, &update).await?;
                println!("{}", result.message);
                Ok(())
            }
            EmployeeCommands::Attendance { id, from, to } => {
                let records = self
                    .client
                    .employee_attendance(id, from.as_deref(), to.as_deref())
                    .await?;
                self.emit(&records, |r| render::attendance(r))
            }
        }
    }

    // ===== Tasks =====

    async fn tasks(&mut self, command: TaskCommands) -> Result<()> {
        self.enter("/tasks");

        match command {
            TaskCommands::List {
                status,
                priority,
                assignee,
                limit,
                offset,
            } => {
                let filter = TaskFilter {
                    status,
                    priority,
                    assignee_id: assignee,
                    limit: Some(limit),
                    offset: Some(offset),
                    ..Default::default()
                };
                let tasks = self.client.list_tasks(&filter).await?;
                self.emit(&tasks, |t| render::tasks(t))
            }
            TaskCommands::Create {
                title,
                description,
                assignee,
                due,
                priority,
                tags,
            } => {
                if let Some(due) = &due {
                    parse_date(due)?;
                }
                let task = NewTask {
                    title: sanitize_input(&title),
                    description: description.trim().to_string(),
                    assignee_id: assignee,
                    due_date: due,
                    priority,
                    tags: (!tags.is_empty()).then_some(tags),
                };
                let created = self.client.create_task(&task).await?;
                println!("Created task #{}", created.id);
                Ok(())
            }
            TaskCommands::Show { id } => {
                let task = self.client.get_task(id).await?;
                self.emit(&task, render::task)
            }
            TaskCommands::Update {
                id,
                title,
                description,
                status,
                priority,
                due,
            } => {
                if let Some(due) = &due {
                    parse_date(due)?;
                }
                let update = TaskUpdate {
                    title: title.map(|t| sanitize_input(&t)),
                    description,
                    status,
                    priority,
                    due_date: due,
                    tags: None,
                };
                let task = self.client.update_task(id, &update).await?;
                self.emit(&task, render::task)
            }
            TaskCommands::Assign { id, assignee } => {
                let result = self.client.assign_task(id, assignee).await?;
                println!("{}", result.message);
                Ok(())
            }
            TaskCommands::Comment { id, comment } => {
                let result = self.client.comment_on_task(id, &comment).await?;
                println!("{}", result.message);
                Ok(())
            }
            TaskCommands::Summary { assignee } => {
                let filter = TaskFilter {
                    assignee_id: assignee,
                    limit: Some(SUMMARY_TASK_LIMIT),
                    ..Default::default()
                };
                let tasks = self.client.list_tasks(&filter).await?;
                let summary = TaskSummary::from_tasks(&tasks, Utc::now());
                self.emit(&summary, render::task_summary)
            }
        }
    }

    // ===== Agents =====

    async fn agents(&mut self, command: AgentCommands) -> Result<()> {
        self.enter("/agents");

        match command {
            AgentCommands::Info => {
                let catalog = self.client.agent_info().await?;
                self.emit(&catalog, render::agent_catalog)
            }
            AgentCommands::Ask { agent, message } => {
                let response = self.client.chat(agent, &message).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                } else {
                    println!("{}", response.reply());
                }
                Ok(())
            }
            AgentCommands::Chat { agent } => {
                let stdin = io::stdin();
                self.chat_loop(agent, &mut stdin.lock()).await
            }
            AgentCommands::History {
                agent,
                success_only,
                limit,
                offset,
            } => {
                let query = HistoryQuery {
                    limit: Some(limit),
                    offset: Some(offset),
                    agent_type: agent,
                    success_only,
                };
                let history = self.client.agent_history(&query).await?;
                self.emit(&history, render::agent_history)
            }
            AgentCommands::Show { id } => {
                let action = self.client.agent_action(id).await?;
                self.emit(&action, render::agent_action)
            }
            AgentCommands::Override { id, reason, action } => {
                let corrective_action = match action {
                    Some(raw) => serde_json::from_str(&raw)
                        .context("Corrective action must be a JSON object")?,
                    None => serde_json::Map::new(),
                };
                let override_data = AgentOverride {
                    reason: reason.trim().to_string(),
                    corrective_action,
                };
                let result = self.client.override_agent_action(id, &override_data).await?;
                println!("{}", result.message);
                Ok(())
            }
        }
    }

    /// Read messages until `exit` or end of input.
    /// Stops with an error once the session can no longer be used.
    async fn chat_loop(&mut self, agent: AgentKind, input: &mut impl BufRead) -> Result<()> {
        println!("Chatting with the {} agent. Type `exit` to leave.", agent);

        loop {
            let message = match Self::read_line(input, "> ")? {
                Some(line) => line,
                None => break,
            };
            if message.is_empty() {
                continue;
            }
            if matches!(message.as_str(), "exit" | "quit") {
                break;
            }

            match self.client.chat(agent, &message).await {
                Ok(response) => println!("{}\n", response.reply()),
                Err(e @ ApiError::RefreshFailed(_)) | Err(e @ ApiError::Unauthorized(_)) => {
                    return Err(e.into());
                }
                Err(e) => eprintln!("Error: {}\n", e),
            }
        }
        Ok(())
    }

    // ===== Reports =====

    async fn reports(&mut self, command: ReportCommands) -> Result<()> {
        self.enter("/reports");

        match command {
            ReportCommands::Generate {
                report_type,
                from,
                to,
                user,
            } => {
                let mut request = ReportRequest::new(report_type, from, to);
                if let Some(user_id) = user {
                    request = request.filter("user_id", user_id);
                }
                let generated = self.client.generate_report(&request).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&generated)?);
                    return Ok(());
                }
                println!("{}", generated.message);
                if let Some(id) = generated.report_id {
                    println!("Saved as report #{}", id);
                }
                if let Some(content) = generated.content {
                    println!();
                    println!("{}", content);
                }
                Ok(())
            }
            ReportCommands::List { report_type, limit } => {
                let query = ReportQuery {
                    report_type,
                    limit: Some(limit),
                    offset: None,
                };
                let reports = self.client.list_reports(&query).await?;
                self.emit(&reports, |r| render::reports(r))
            }
            ReportCommands::Show { id } => {
                let report = self.client.get_report(id).await?;
                self.emit(&report, render::report)
            }
        }
    }

    // ===== Prompts =====

    fn prompt(label: &str) -> Result<String> {
        Self::prompt_line(label)?.ok_or_else(|| anyhow!("No input"))
    }

    fn prompt_line(label: &str) -> Result<Option<String>> {
        let stdin = io::stdin();
        Self::read_line(&mut stdin.lock(), label)
    }

    /// One trimmed line from `input`, `None` at end of input
    fn read_line(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use opsdesk_core::auth::InvalidationReason;
    use opsdesk_core::config::TokenBackend;
    use serde_json::json;
    use std::io::Cursor;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(server_uri: &str, config: Config, config_path: PathBuf, command: &[&str]) -> App {
        let mut args = vec![
            "opsdesk",
            "--api-url",
            server_uri,
            "--token-backend",
            "memory",
        ];
        args.extend_from_slice(command);
        let cli = Cli::parse_from(args);
        App::with_config(config, config_path, &cli).unwrap()
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/auth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok", "token_type": "bearer"})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn unauthorized() -> ResponseTemplate {
        ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"}))
    }

    #[tokio::test]
    async fn test_login_does_not_persist_command_line_overrides() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let mut app = app_for(
            &server.uri(),
            Config::default(),
            config_path.clone(),
            &["login", "-u", "ada"],
        );
        assert_eq!(app.client.base_url(), server.uri());

        app.sign_in("ada", "Secret123!").await.unwrap();

        let saved = Config::load_from(&config_path).unwrap();
        assert_eq!(saved.last_username.as_deref(), Some("ada"));
        assert_eq!(saved.api_base_url, None);
        assert_eq!(saved.token_backend, TokenBackend::File);

        let raw = std::fs::read_to_string(&config_path).unwrap();
        assert!(!raw.contains(&server.uri()));
        assert!(!raw.contains("memory"));
    }

    #[tokio::test]
    async fn test_login_saves_last_username_and_keeps_stored_settings() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let stored = Config {
            last_username: Some("grace".to_string()),
            token_backend: TokenBackend::Keyring,
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        stored.save_to(&config_path).unwrap();

        let mut app = app_for(&server.uri(), stored, config_path.clone(), &["login"]);
        app.sign_in("ada", "Secret123!").await.unwrap();

        assert!(app.client.session().is_authenticated());
        let saved = Config::load_from(&config_path).unwrap();
        assert_eq!(saved.last_username.as_deref(), Some("ada"));
        assert_eq!(saved.token_backend, TokenBackend::Keyring);
        assert_eq!(saved.request_timeout_secs, Some(5));
        assert_eq!(saved.api_base_url, None);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_config_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token"))
            .respond_with(unauthorized())
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let mut app = app_for(&server.uri(), Config::default(), config_path.clone(), &["login"]);
        let err = app.sign_in("ada", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(!config_path.exists());
    }

    #[tokio::test]
    async fn test_invalidation_with_redirect_tells_user_to_log_in() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(
            "http://127.0.0.1:9",
            Config::default(),
            dir.path().join("config.json"),
            &["health"],
        );

        app.enter("/tasks");
        app.client
            .session()
            .invalidate(InvalidationReason::RefreshFailed)
            .unwrap();

        assert_eq!(
            app.session_notices(),
            vec!["Signed out (session expired). Run `opsdesk login` to continue.".to_string()]
        );
        assert!(app.session_notices().is_empty());
    }

    #[tokio::test]
    async fn test_invalidation_on_login_page_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(
            "http://127.0.0.1:9",
            Config::default(),
            dir.path().join("config.json"),
            &["health"],
        );

        app.enter(LOGIN_PAGE);
        app.client
            .session()
            .invalidate(InvalidationReason::AuthEndpointRejected)
            .unwrap();
        app.client.session().sign_in("tok").unwrap();

        assert!(app.session_notices().is_empty());
    }

    #[tokio::test]
    async fn test_chat_stops_when_refresh_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/execute"))
            .and(header("Authorization", "Bearer old"))
            .respond_with(unauthorized())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(unauthorized())
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(
            &server.uri(),
            Config::default(),
            dir.path().join("config.json"),
            &["agents", "chat"],
        );
        app.client.session().sign_in("old").unwrap();
        app.enter("/agents");

        let mut input = Cursor::new("clock me in\nand again\n");
        let err = app.chat_loop(AgentKind::Clock, &mut input).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::RefreshFailed(_))
        ));
        assert!(!app.client.session().is_authenticated());
        assert_eq!(app.session_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_stops_when_not_signed_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/execute"))
            .respond_with(unauthorized())
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(
            &server.uri(),
            Config::default(),
            dir.path().join("config.json"),
            &["agents", "chat"],
        );

        let mut input = Cursor::new("list my tasks\nstill there?\n");
        let err = app.chat_loop(AgentKind::Task, &mut input).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_continues_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/execute"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .expect(2)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(
            &server.uri(),
            Config::default(),
            dir.path().join("config.json"),
            &["agents", "chat"],
        );
        app.client.session().sign_in("tok").unwrap();

        let mut input = Cursor::new("first\n\nsecond\nexit\nnever sent\n");
        app.chat_loop(AgentKind::Report, &mut input).await.unwrap();
    }
}
