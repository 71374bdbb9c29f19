use rusqlite::Connection;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

/// Applies pending schema migrations.
///
/// refinery wraps each migration in its own transaction; concurrent starters
/// wait on the busy timeout instead of failing.
pub fn run_migrations(conn: &mut Connection) -> AppResult<()> {
    conn.busy_timeout(Duration::from_secs(30))?;

    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| AppError::Migration(e.to_string()))?;

    for migration in report.applied_migrations() {
        log::info!("Applied migration {}", migration);
    }
    Ok(())
}
