use clap::{Args, Parser, Subcommand};
use opsdesk_core::config::TokenBackend;
use opsdesk_core::models::{AgentKind, ReportType, Role, TaskPriority, TaskStatus};

#[derive(Parser)]
#[command(name = "opsdesk")]
#[command(version, about = "Terminal client for the operations backend")]
pub struct Cli {
    /// Backend address (overrides the config file)
    #[arg(long, global = true, env = "OPSDESK_API_URL")]
    pub api_url: Option<String>,

    /// Where to keep the access token
    #[arg(long, global = true)]
    pub token_backend: Option<TokenBackend>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store an access token
    Login {
        #[arg(short, long, env = "OPSDESK_USERNAME")]
        username: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account
    Register(RegisterArgs),
    /// Check that the backend is reachable
    Health,
    /// Overview of your tasks and recent agent activity
    Dashboard,
    Employees {
        #[command(subcommand)]
        command: EmployeeCommands,
    },
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub full_name: String,
    #[arg(long)]
    pub department: Option<String>,
}

#[derive(Subcommand)]
pub enum EmployeeCommands {
    /// List employees
    List {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        /// Include deactivated employees
        #[arg(long)]
        all: bool,
        /// Group the listing by department
        #[arg(long)]
        grouped: bool,
    },
    Show {
        id: i64,
    },
    /// Update an employee (managers only)
    Update {
        id: i64,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Attendance records and totals
    Attendance {
        id: i64,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        assignee: Option<i64>,
        #[arg(long, default_value = "50")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    Create {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        assignee: Option<i64>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        due: Option<String>,
    },
    Assign {
        id: i64,
        assignee: i64,
    },
    Comment {
        id: i64,
        comment: String,
    },
    /// Counts by status and priority, overdue tasks, completion rate
    Summary {
        #[arg(long)]
        assignee: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List available agents
    Info,
    /// Send one message to an agent
    Ask {
        agent: AgentKind,
        message: String,
    },
    /// Interactive conversation with an agent
    Chat {
        #[arg(default_value = "task")]
        agent: AgentKind,
    },
    /// Recent agent actions
    History {
        #[arg(long)]
        agent: Option<AgentKind>,
        #[arg(long)]
        success_only: bool,
        #[arg(long, default_value = "20")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    Show {
        id: i64,
    },
    /// Override a recorded action (managers only)
    Override {
        id: i64,
        #[arg(long)]
        reason: String,
        /// Corrective action as a JSON object
        #[arg(long)]
        action: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    Generate {
        report_type: ReportType,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: String,
        /// Restrict to one employee
        #[arg(long)]
        user: Option<i64>,
    },
    List {
        #[arg(long = "type")]
        report_type: Option<ReportType>,
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    Show {
        id: i64,
    },
}
