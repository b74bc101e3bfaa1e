use rusqlite::Connection;
use tracing::info;

/// Table definitions, in dependency order
const TABLES: &[(&str, &str)] = &[
    ("users", "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        is_active INTEGER NOT NULL DEFAULT 1,
        daily_goal_ml INTEGER NOT NULL DEFAULT 2000,
        current_streak INTEGER NOT NULL DEFAULT 0,
        longest_streak INTEGER NOT NULL DEFAULT 0,
        last_log_date TEXT,
        xp INTEGER NOT NULL DEFAULT 0,
        points INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"),
    ("water_products", "CREATE TABLE IF NOT EXISTS water_products (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        brand_name TEXT,
        score REAL NOT NULL,
        description TEXT,
        image TEXT,
        packaging TEXT,
        ph_level REAL,
        tds REAL,
        ingredients TEXT NOT NULL DEFAULT '[]',
        sources TEXT NOT NULL DEFAULT '[]',
        score_breakdown TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("water_logs", "CREATE TABLE IF NOT EXISTS water_logs (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        water_id INTEGER REFERENCES water_products (id) ON DELETE SET NULL,
        volume_ml INTEGER NOT NULL CHECK (volume_ml > 0),
        drink_type TEXT,
        caffeine_mg INTEGER,
        logged_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"),
    ("health_goals", "CREATE TABLE IF NOT EXISTS health_goals (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        name TEXT NOT NULL,
        description TEXT,
        goal_type TEXT NOT NULL,
        target_value REAL NOT NULL,
        current_value REAL NOT NULL DEFAULT 0,
        unit TEXT NOT NULL,
        frequency TEXT NOT NULL,
        priority TEXT NOT NULL,
        difficulty INTEGER NOT NULL,
        status TEXT NOT NULL,
        start_date TEXT NOT NULL,
        target_date TEXT NOT NULL,
        motivation TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        milestones TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        completed_at TEXT,
        deleted_at TEXT
    )"),
    ("goal_progress", "CREATE TABLE IF NOT EXISTS goal_progress (
        id TEXT PRIMARY KEY,
        goal_id TEXT NOT NULL REFERENCES health_goals (id),
        user_id TEXT NOT NULL REFERENCES users (id),
        value REAL NOT NULL,
        notes TEXT,
        recorded_at TEXT NOT NULL
    )"),
    ("goal_achievements", "CREATE TABLE IF NOT EXISTS goal_achievements (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        goal_id TEXT NOT NULL REFERENCES health_goals (id),
        milestone_name TEXT NOT NULL,
        points INTEGER NOT NULL,
        message TEXT NOT NULL,
        earned_at TEXT NOT NULL
    )"),
    ("achievement_definitions", "CREATE TABLE IF NOT EXISTS achievement_definitions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        criteria_type TEXT NOT NULL,
        criteria_values TEXT NOT NULL
    )"),
    ("user_achievements", "CREATE TABLE IF NOT EXISTS user_achievements (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        achievement_id TEXT NOT NULL REFERENCES achievement_definitions (id),
        stage INTEGER NOT NULL,
        earned_at TEXT NOT NULL,
        UNIQUE (user_id, achievement_id)
    )"),
    ("notifications", "CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        notification_type TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        priority TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'unread',
        created_at TEXT NOT NULL,
        read_at TEXT,
        related_entity_id TEXT,
        related_entity_type TEXT,
        payload TEXT NOT NULL DEFAULT '{}',
        action_url TEXT
    )"),
    ("notification_settings", "CREATE TABLE IF NOT EXISTS notification_settings (
        user_id TEXT PRIMARY KEY REFERENCES users (id),
        master_enabled INTEGER NOT NULL DEFAULT 1,
        type_preferences TEXT NOT NULL DEFAULT '{}',
        quiet_hours_enabled INTEGER NOT NULL DEFAULT 0,
        quiet_hours_start TEXT,
        quiet_hours_end TEXT,
        updated_at TEXT NOT NULL
    )"),
    ("reminders", "CREATE TABLE IF NOT EXISTS reminders (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        message TEXT NOT NULL,
        time_of_day TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        last_sent_on TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("friendships", "CREATE TABLE IF NOT EXISTS friendships (
        id TEXT PRIMARY KEY,
        requester_id TEXT NOT NULL REFERENCES users (id),
        addressee_id TEXT NOT NULL REFERENCES users (id),
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (requester_id, addressee_id)
    )"),
    ("activities", "CREATE TABLE IF NOT EXISTS activities (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        activity_type TEXT NOT NULL,
        data TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )"),
    ("reports", "CREATE TABLE IF NOT EXISTS reports (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        report_type TEXT NOT NULL,
        title TEXT NOT NULL,
        period_start TEXT NOT NULL,
        period_end TEXT NOT NULL,
        status TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )"),
    ("gdpr_requests", "CREATE TABLE IF NOT EXISTS gdpr_requests (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        request_type TEXT NOT NULL,
        data_categories TEXT NOT NULL DEFAULT '[]',
        reason TEXT,
        status TEXT NOT NULL,
        deadline TEXT NOT NULL,
        submitted_at TEXT NOT NULL,
        processed_at TEXT,
        completed_at TEXT,
        response_data TEXT,
        notes TEXT NOT NULL DEFAULT '[]'
    )"),
];

const INDEXES: &[(&str, &str)] = &[
    ("idx_users_username", "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users (username COLLATE NOCASE)"),
    ("idx_users_email", "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email COLLATE NOCASE)"),
    ("idx_water_logs_user_logged_at", "CREATE INDEX IF NOT EXISTS idx_water_logs_user_logged_at ON water_logs (user_id, logged_at DESC)"),
    ("idx_health_goals_user", "CREATE INDEX IF NOT EXISTS idx_health_goals_user ON health_goals (user_id, status)"),
    ("idx_goal_progress_goal", "CREATE INDEX IF NOT EXISTS idx_goal_progress_goal ON goal_progress (goal_id, recorded_at)"),
    ("idx_notifications_user", "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id, created_at DESC)"),
    ("idx_activities_user", "CREATE INDEX IF NOT EXISTS idx_activities_user ON activities (user_id, created_at DESC)"),
    ("idx_reminders_time", "CREATE INDEX IF NOT EXISTS idx_reminders_time ON reminders (time_of_day, is_active)"),
];

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    for (name, sql) in TABLES {
        info!("Creating {} table if not exists", name);
        conn.execute(sql, [])
            .map_err(|e| format!("Failed to create table {}: {}", name, e))?;
    }

    for (name, sql) in INDEXES {
        conn.execute(sql, [])
            .map_err(|e| format!("Failed to create index {}: {}", name, e))?;
    }

    info!("SQLite migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(tables as usize, TABLES.len());
    }
}
