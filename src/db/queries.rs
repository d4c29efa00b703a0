pub const CREATE_HABITS: &str = r#"
CREATE TABLE IF NOT EXISTS habits (
  id                       INTEGER PRIMARY KEY AUTOINCREMENT,
  owner_id                 TEXT NOT NULL,
  name                     TEXT NOT NULL,
  description              TEXT,
  color                    TEXT NOT NULL,
  icon                     TEXT,
  frequency                TEXT NOT NULL DEFAULT 'daily',
  target_days_per_week     INTEGER,
  target_count             INTEGER NOT NULL DEFAULT 1,
  is_tracked               INTEGER NOT NULL DEFAULT 1,
  default_duration_minutes INTEGER NOT NULL DEFAULT 60,
  is_archived              INTEGER NOT NULL DEFAULT 0,
  sort_order               INTEGER,
  created_at               INTEGER NOT NULL
);
"#;

pub const CREATE_HABIT_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS habit_logs (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  habit_id     INTEGER NOT NULL,
  owner_id     TEXT NOT NULL,
  date         TEXT NOT NULL,
  count        INTEGER NOT NULL,
  completed_at INTEGER NOT NULL,
  UNIQUE (habit_id, date)
);
"#;

pub const CREATE_SCHEDULE_CARDS: &str = r#"
CREATE TABLE IF NOT EXISTS schedule_cards (
  id               INTEGER PRIMARY KEY AUTOINCREMENT,
  habit_id         INTEGER NOT NULL,
  owner_id         TEXT NOT NULL,
  day              INTEGER NOT NULL,
  start_hour       INTEGER NOT NULL,
  start_minute     INTEGER NOT NULL,
  duration_minutes INTEGER NOT NULL
);
"#;

pub const CREATE_TASKS: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  owner_id       TEXT NOT NULL,
  title          TEXT NOT NULL,
  description    TEXT,
  status         TEXT NOT NULL DEFAULT 'active',
  recurrence     TEXT,
  due_date       INTEGER,
  completed_at   INTEGER,
  is_terminated  INTEGER NOT NULL DEFAULT 0,
  created_at     INTEGER NOT NULL,
  tags           TEXT NOT NULL DEFAULT '[]',
  priority       TEXT,
  master_task_id INTEGER
);
"#;

pub const CREATE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
  owner_id              TEXT PRIMARY KEY,
  retention_period_days INTEGER NOT NULL
);
"#;

pub const INDEX_HABITS_OWNER_ACTIVE: &str =
    "CREATE INDEX IF NOT EXISTS idx_habits_owner_active ON habits(owner_id, is_archived);";

pub const INDEX_HABIT_LOGS_OWNER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_habit_logs_owner_date ON habit_logs(owner_id, date);";

pub const INDEX_SCHEDULE_CARDS_OWNER_DAY: &str =
    "CREATE INDEX IF NOT EXISTS idx_schedule_cards_owner_day ON schedule_cards(owner_id, day);";

pub const INDEX_SCHEDULE_CARDS_HABIT: &str =
    "CREATE INDEX IF NOT EXISTS idx_schedule_cards_habit ON schedule_cards(habit_id);";

pub const INDEX_TASKS_OWNER_STATUS: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_owner_status ON tasks(owner_id, status);";

pub const INDEX_TASKS_DUE_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);";

pub const HABIT_COLUMNS: &str = "id, owner_id, name, description, color, icon, frequency, target_days_per_week, target_count, is_tracked, default_duration_minutes, is_archived, sort_order, created_at";

pub const HABIT_LOG_COLUMNS: &str = "id, habit_id, date, count, completed_at";

pub const SCHEDULE_CARD_COLUMNS: &str =
    "id, habit_id, day, start_hour, start_minute, duration_minutes";

pub const TASK_COLUMNS: &str = "id, owner_id, title, description, status, recurrence, due_date, completed_at, is_terminated, created_at, tags, priority, master_task_id";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_HABITS,
        CREATE_HABIT_LOGS,
        CREATE_SCHEDULE_CARDS,
        CREATE_TASKS,
        CREATE_SETTINGS,
        INDEX_HABITS_OWNER_ACTIVE,
        INDEX_HABIT_LOGS_OWNER_DATE,
        INDEX_SCHEDULE_CARDS_OWNER_DAY,
        INDEX_SCHEDULE_CARDS_HABIT,
        INDEX_TASKS_OWNER_STATUS,
        INDEX_TASKS_DUE_DATE,
    ]
}
