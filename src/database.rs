use crate::analysis::{AnalysisRecord, AnalysisType};
use crate::contact::ContactMessage;
use crate::draw::{Draw, DrawSchema, DrawUpdate};
use crate::error::{StoreError, StoreResult};
use crate::simulation::SimulationRecord;
use crate::user::{Requester, User};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const DRAW_COLUMNS: &str =
    "date, draw_day, numbers, super_number, spiel77, super6, created_at, updated_at";

const SIMULATION_COLUMNS: &str = "id, user_clerk_id, simulation_type, simulation_name, parameters, \
     results_json, execution_metadata, is_admin_simulation, is_public, created_at, updated_at";

const ANALYSIS_COLUMNS: &str = "id, user_clerk_id, analysis_type, analysis_name, parameters, \
     results_json, chart_data, is_admin_analysis, is_public, created_at, updated_at";

/// A stored draw with its audit timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRow {
    #[serde(flatten)]
    pub draw: Draw,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMessageRow {
    pub id: i64,
    #[serde(flatten)]
    pub message: ContactMessage,
    pub created_at: NaiveDateTime,
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Open (creating if needed) the database file and its tables.
pub fn create_database(path: &str) -> StoreResult<Connection> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    create_database_with_connection(&conn)?;
    info!(path, "database ready");
    Ok(conn)
}

pub fn create_database_with_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lotto6aus49_draw (
            date TEXT PRIMARY KEY,
            draw_day TEXT NOT NULL,
            numbers TEXT NOT NULL,
            super_number INTEGER NOT NULL CHECK (super_number BETWEEN 0 AND 9),
            spiel77 TEXT NOT NULL,
            super6 TEXT NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS users (
            clerk_user_id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            image_url TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_sign_in_at DATETIME,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users (email);

        CREATE TABLE IF NOT EXISTS contact_form_message (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            message TEXT NOT NULL,
            user_id TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_contact_user ON contact_form_message (user_id);

        CREATE TABLE IF NOT EXISTS simulation_model (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_clerk_id TEXT NOT NULL,
            simulation_type TEXT NOT NULL,
            simulation_name TEXT NOT NULL,
            parameters TEXT NOT NULL,
            results_json TEXT NOT NULL,
            execution_metadata TEXT NOT NULL,
            is_admin_simulation INTEGER NOT NULL DEFAULT 0,
            is_public INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            updated_at DATETIME
        );
        CREATE INDEX IF NOT EXISTS idx_simulation_user ON simulation_model (user_clerk_id);

        CREATE TABLE IF NOT EXISTS analysis_model (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_clerk_id TEXT NOT NULL,
            analysis_type TEXT NOT NULL,
            analysis_name TEXT NOT NULL,
            parameters TEXT NOT NULL,
            results_json TEXT NOT NULL,
            chart_data TEXT NOT NULL,
            is_admin_analysis INTEGER NOT NULL DEFAULT 0,
            is_public INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_analysis_user ON analysis_model (user_clerk_id);
        CREATE INDEX IF NOT EXISTS idx_analysis_public ON analysis_model (is_public);",
    )
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

// ---------------------------------------------------------------------------
// Draws
// ---------------------------------------------------------------------------

/// Stored rows are re-checked with the same rules used on input.
fn draw_from_row(row: &Row) -> rusqlite::Result<DrawRow> {
    let date: NaiveDate = row.get(0)?;
    let draw_day: String = row.get(1)?;
    let numbers: String = row.get(2)?;
    let super_number: i64 = row.get(3)?;
    let spiel77: String = row.get(4)?;
    let super6: String = row.get(5)?;

    let mut fields = crate::Fields::new();
    fields.insert("date".into(), json!(date.format("%Y-%m-%d").to_string()));
    fields.insert("draw_day".into(), json!(draw_day));
    fields.insert("numbers".into(), json!(numbers));
    fields.insert("super_number".into(), json!(super_number));
    fields.insert("spiel77".into(), json!(spiel77));
    fields.insert("super6".into(), json!(super6));

    let draw = DrawSchema::create(&fields)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(DrawRow {
        draw,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> StoreResult<DrawRow> {
    let stamp = now();
    conn.execute(
        "INSERT INTO lotto6aus49_draw (
            date, draw_day, numbers, super_number, spiel77, super6, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            draw.date,
            draw.draw_day.as_str(),
            draw.numbers_text(),
            draw.super_number,
            draw.spiel77_text(),
            draw.super6_text(),
            stamp,
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            StoreError::AlreadyExists {
                entity: "draw",
                id: draw.date.to_string(),
            }
        } else {
            StoreError::Sqlite(e)
        }
    })?;

    info!(date = %draw.date, numbers = %draw.numbers_text(), "draw stored");
    Ok(DrawRow {
        draw: draw.clone(),
        created_at: stamp,
        updated_at: stamp,
    })
}

pub fn insert_draws(conn: &Connection, draws: &[Draw]) -> StoreResult<Vec<DrawRow>> {
    let tx = conn.unchecked_transaction()?;
    let mut rows = Vec::with_capacity(draws.len());
    for draw in draws {
        rows.push(insert_draw(&tx, draw)?);
    }
    tx.commit()?;
    Ok(rows)
}

/// Apply a validated partial update to the draw stored under `date`.
pub fn update_draw(conn: &Connection, date: NaiveDate, update: &DrawUpdate) -> StoreResult<DrawRow> {
    let mut row = get_draw_by_date(conn, date)?.ok_or_else(|| StoreError::NotFound {
        entity: "draw",
        id: date.to_string(),
    })?;

    if update.is_empty() {
        debug!(%date, "empty draw update");
        return Ok(row);
    }

    update.apply_to(&mut row.draw);
    row.updated_at = now();

    conn.execute(
        "UPDATE lotto6aus49_draw
         SET draw_day = ?1, numbers = ?2, super_number = ?3, spiel77 = ?4, super6 = ?5,
             updated_at = ?6
         WHERE date = ?7",
        params![
            row.draw.draw_day.as_str(),
            row.draw.numbers_text(),
            row.draw.super_number,
            row.draw.spiel77_text(),
            row.draw.super6_text(),
            row.updated_at,
            date,
        ],
    )?;

    info!(%date, "draw updated");
    Ok(row)
}

pub fn get_draw_by_date(conn: &Connection, date: NaiveDate) -> rusqlite::Result<Option<DrawRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM lotto6aus49_draw WHERE date = ?1"
    ))?;
    stmt.query_row([date], draw_from_row).optional()
}

pub fn get_latest_draws(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<DrawRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM lotto6aus49_draw ORDER BY date DESC LIMIT ?1"
    ))?;
    let draw_iter = stmt.query_map([limit], draw_from_row)?;

    let mut results = Vec::new();
    for draw in draw_iter {
        results.push(draw?);
    }
    Ok(results)
}

/// Draws between `start` and `end`, both inclusive, oldest first.
pub fn get_draws_by_date_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> rusqlite::Result<Vec<DrawRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM lotto6aus49_draw
         WHERE date BETWEEN ?1 AND ?2
         ORDER BY date ASC"
    ))?;
    let draw_iter = stmt.query_map([start, end], draw_from_row)?;

    let mut results = Vec::new();
    for draw in draw_iter {
        results.push(draw?);
    }
    Ok(results)
}

pub fn get_draw_dates(conn: &Connection) -> rusqlite::Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT date FROM lotto6aus49_draw ORDER BY date ASC")?;
    let date_iter = stmt.query_map([], |row| row.get::<_, NaiveDate>(0))?;

    let mut dates = Vec::new();
    for date in date_iter {
        dates.push(date?);
    }
    Ok(dates)
}

pub fn draw_exists_for_date(conn: &Connection, date: NaiveDate) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM lotto6aus49_draw WHERE date = ?1")?;
    let count: i64 = stmt.query_row([date], |row| row.get(0))?;
    Ok(count > 0)
}

// ---------------------------------------------------------------------------
// Contact messages and users
// ---------------------------------------------------------------------------

pub fn insert_contact_message(
    conn: &Connection,
    message: &ContactMessage,
) -> StoreResult<ContactMessageRow> {
    let created_at = now();
    conn.execute(
        "INSERT INTO contact_form_message (
            first_name, last_name, email, phone, message, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message.first_name,
            message.last_name,
            message.email,
            message.phone,
            message.message,
            message.user_id,
            created_at,
        ],
    )?;

    let id = conn.last_insert_rowid();
    info!(id, linked = message.user_id.is_some(), "contact message stored");
    Ok(ContactMessageRow {
        id,
        message: message.clone(),
        created_at,
    })
}

fn contact_from_row(row: &Row) -> rusqlite::Result<ContactMessageRow> {
    Ok(ContactMessageRow {
        id: row.get(0)?,
        message: ContactMessage {
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            message: row.get(5)?,
            user_id: row.get(6)?,
        },
        created_at: row.get(7)?,
    })
}

pub fn get_contact_messages_by_user(
    conn: &Connection,
    user_id: &str,
) -> rusqlite::Result<Vec<ContactMessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, email, phone, message, user_id, created_at
         FROM contact_form_message WHERE user_id = ?1 ORDER BY id DESC",
    )?;
    let message_iter = stmt.query_map([user_id], contact_from_row)?;

    let mut results = Vec::new();
    for message in message_iter {
        results.push(message?);
    }
    Ok(results)
}

pub fn upsert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (
            clerk_user_id, email, first_name, last_name, image_url, is_active, last_sign_in_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (clerk_user_id) DO UPDATE SET
            email = excluded.email,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            image_url = excluded.image_url,
            is_active = excluded.is_active,
            last_sign_in_at = excluded.last_sign_in_at,
            updated_at = CURRENT_TIMESTAMP",
        params![
            user.clerk_user_id,
            user.email,
            user.first_name,
            user.last_name,
            user.image_url,
            user.is_active,
            user.last_sign_in_at,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, clerk_user_id: &str) -> rusqlite::Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT clerk_user_id, email, first_name, last_name, image_url, is_active, last_sign_in_at
         FROM users WHERE clerk_user_id = ?1",
    )?;
    stmt.query_row([clerk_user_id], |row| {
        Ok(User {
            clerk_user_id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            image_url: row.get(4)?,
            is_active: row.get(5)?,
            last_sign_in_at: row.get(6)?,
        })
    })
    .optional()
}

// ---------------------------------------------------------------------------
// Saved simulations and analyses
// ---------------------------------------------------------------------------

/// Owner id for a save, or `NotPermitted` for anonymous callers.
fn saving_owner(requester: &Requester, what: &str) -> StoreResult<String> {
    requester
        .user_id()
        .map(str::to_string)
        .ok_or_else(|| StoreError::NotPermitted(format!("anonymous users cannot save {what}")))
}

/// Drop a regular user's older items so the new save fits their quota.
fn make_room(
    conn: &Connection,
    table: &str,
    requester: &Requester,
    owner: &str,
) -> rusqlite::Result<usize> {
    match requester.save_quota() {
        None => Ok(0),
        Some(_) => conn.execute(
            &format!("DELETE FROM {table} WHERE user_clerk_id = ?1"),
            [owner],
        ),
    }
}

/// Save a simulation for `requester`.
///
/// Regular users keep one saved simulation; a new save replaces it. Admins
/// keep any number. Anonymous callers are refused.
pub fn save_simulation(
    conn: &Connection,
    requester: &Requester,
    mut record: SimulationRecord,
) -> StoreResult<SimulationRecord> {
    let owner = saving_owner(requester, "simulations")?;
    record.user_clerk_id = owner.clone();
    record.is_admin_simulation = requester.is_admin();
    record.update_metadata_on_save(now());

    let tx = conn.unchecked_transaction()?;
    let replaced = make_room(&tx, "simulation_model", requester, &owner)?;
    tx.execute(
        "INSERT INTO simulation_model (
            user_clerk_id, simulation_type, simulation_name, parameters, results_json,
            execution_metadata, is_admin_simulation, is_public, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.user_clerk_id,
            record.simulation_type,
            record.simulation_name,
            record.parameters,
            record.results_json,
            record.execution_metadata,
            record.is_admin_simulation,
            record.is_public,
            record.created_at,
            record.updated_at,
        ],
    )?;
    record.id = Some(tx.last_insert_rowid());
    tx.commit()?;

    info!(
        id = record.id,
        owner = %owner,
        simulation_type = %record.simulation_type,
        replaced,
        "simulation saved"
    );
    Ok(record)
}

fn simulation_from_row(row: &Row) -> rusqlite::Result<SimulationRecord> {
    Ok(SimulationRecord {
        id: row.get(0)?,
        user_clerk_id: row.get(1)?,
        simulation_type: row.get(2)?,
        simulation_name: row.get(3)?,
        parameters: row.get::<_, Value>(4)?,
        results_json: row.get::<_, Value>(5)?,
        execution_metadata: row.get::<_, Value>(6)?,
        is_admin_simulation: row.get(7)?,
        is_public: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Every simulation `requester` may see, newest first.
pub fn list_simulations(
    conn: &Connection,
    requester: &Requester,
) -> rusqlite::Result<Vec<SimulationRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SIMULATION_COLUMNS} FROM simulation_model ORDER BY created_at DESC, id DESC"
    ))?;
    let sim_iter = stmt.query_map([], simulation_from_row)?;

    let mut results = Vec::new();
    for sim in sim_iter {
        let sim = sim?;
        if sim.can_user_access(requester) {
            results.push(sim);
        }
    }
    Ok(results)
}

pub fn get_simulation(
    conn: &Connection,
    id: i64,
    requester: &Requester,
) -> StoreResult<SimulationRecord> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SIMULATION_COLUMNS} FROM simulation_model WHERE id = ?1"
    ))?;
    let sim = stmt
        .query_row([id], simulation_from_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            entity: "simulation",
            id: id.to_string(),
        })?;

    if !sim.can_user_access(requester) {
        return Err(StoreError::NotPermitted(format!(
            "simulation {id} belongs to another user"
        )));
    }
    Ok(sim)
}

/// Save an analysis under the same quota rules as simulations.
pub fn save_analysis(
    conn: &Connection,
    requester: &Requester,
    mut record: AnalysisRecord,
) -> StoreResult<AnalysisRecord> {
    let owner = saving_owner(requester, "analyses")?;
    record.user_clerk_id = owner.clone();
    record.is_admin_analysis = requester.is_admin();
    record.touch(now());

    let tx = conn.unchecked_transaction()?;
    let replaced = make_room(&tx, "analysis_model", requester, &owner)?;
    tx.execute(
        "INSERT INTO analysis_model (
            user_clerk_id, analysis_type, analysis_name, parameters, results_json, chart_data,
            is_admin_analysis, is_public, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.user_clerk_id,
            record.analysis_type.as_str(),
            record.analysis_name,
            record.parameters,
            record.results_json,
            record.chart_data,
            record.is_admin_analysis,
            record.is_public,
            record.created_at,
            record.updated_at,
        ],
    )?;
    record.id = Some(tx.last_insert_rowid());
    tx.commit()?;

    info!(id = record.id, owner = %owner, replaced, "analysis saved");
    Ok(record)
}

fn analysis_from_row(row: &Row) -> rusqlite::Result<AnalysisRecord> {
    let kind: String = row.get(2)?;
    let analysis_type = kind
        .parse::<AnalysisType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(AnalysisRecord {
        id: row.get(0)?,
        user_clerk_id: row.get(1)?,
        analysis_type,
        analysis_name: row.get(3)?,
        parameters: row.get::<_, Value>(4)?,
        results_json: row.get::<_, Value>(5)?,
        chart_data: row.get::<_, Value>(6)?,
        is_admin_analysis: row.get(7)?,
        is_public: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub fn list_analyses(
    conn: &Connection,
    requester: &Requester,
) -> rusqlite::Result<Vec<AnalysisRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analysis_model ORDER BY created_at DESC, id DESC"
    ))?;
    let analysis_iter = stmt.query_map([], analysis_from_row)?;

    let mut results = Vec::new();
    for analysis in analysis_iter {
        let analysis = analysis?;
        if analysis.can_user_access(requester) {
            results.push(analysis);
        }
    }
    Ok(results)
}

pub fn get_analysis(
    conn: &Connection,
    id: i64,
    requester: &Requester,
) -> StoreResult<AnalysisRecord> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analysis_model WHERE id = ?1"
    ))?;
    let analysis = stmt
        .query_row([id], analysis_from_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            entity: "analysis",
            id: id.to_string(),
        })?;

    if !analysis.can_user_access(requester) {
        return Err(StoreError::NotPermitted(format!(
            "analysis {id} belongs to another user"
        )));
    }
    Ok(analysis)
}
