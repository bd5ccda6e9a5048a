use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Account, AccountKind, Company, Customer, EntryStatus, Queue, QueueEntry, QueueEvent, Session,
};

pub fn now_ts() -> String {
    Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Accounts ──

pub fn create_account(conn: &Connection, account: &Account) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, email, password_hash, kind) VALUES (?1, ?2, ?3, ?4)",
        params![
            account.id,
            account.email,
            account.password_hash,
            account.kind.as_str()
        ],
    )?;
    Ok(())
}

pub fn get_account(conn: &Connection, id: &str) -> anyhow::Result<Option<Account>> {
    let result = conn.query_row(
        "SELECT id, email, password_hash, kind FROM accounts WHERE id = ?1",
        params![id],
        |row| {
            Ok(Account {
                id: row.get(0)?,
                email: row.get(1)?,
                password_hash: row.get(2)?,
                kind: AccountKind::parse(&row.get::<_, String>(3)?),
            })
        },
    );

    match result {
        Ok(account) => Ok(Some(account)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_account_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Account>> {
    let result = conn.query_row(
        "SELECT id, email, password_hash, kind FROM accounts WHERE email = ?1",
        params![email],
        |row| {
            Ok(Account {
                id: row.get(0)?,
                email: row.get(1)?,
                password_hash: row.get(2)?,
                kind: AccountKind::parse(&row.get::<_, String>(3)?),
            })
        },
    );

    match result {
        Ok(account) => Ok(Some(account)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Sessions ──

pub fn create_session(conn: &Connection, session: &Session) -> anyhow::Result<()> {
    let expires_at = session.expires_at.format("%Y-%m-%d %H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO sessions (token, account_id, expires_at) VALUES (?1, ?2, ?3)",
        params![session.token, session.account_id, expires_at],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, token: &str) -> anyhow::Result<Option<Session>> {
    let now = now_ts();
    let result = conn.query_row(
        "SELECT token, account_id, expires_at FROM sessions WHERE token = ?1 AND expires_at > ?2",
        params![token, now],
        |row| {
            let expires_at_str: String = row.get(2)?;
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, expires_at_str))
        },
    );

    match result {
        Ok((token, account_id, expires_at_str)) => {
            let expires_at = NaiveDateTime::parse_from_str(&expires_at_str, "%Y-%m-%d %H:%M:%S")
                .unwrap_or_else(|_| Utc::now().naive_utc());
            Ok(Some(Session {
                token,
                account_id,
                expires_at,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

pub fn delete_expired_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let now = now_ts();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    Ok(count)
}

// ── Companies ──

pub fn create_company(conn: &Connection, company: &Company) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO companies (id, name, email, phone, address, logo_url, avatar_type, qr_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            company.id,
            company.name,
            company.email,
            company.phone,
            company.address,
            company.logo_url,
            company.avatar_type,
            company.qr_code,
            company.created_at,
            company.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_company(conn: &Connection, id: &str) -> anyhow::Result<Option<Company>> {
    let result = conn.query_row(
        "SELECT id, name, email, phone, address, logo_url, avatar_type, qr_code, created_at, updated_at
         FROM companies WHERE id = ?1",
        params![id],
        |row| Ok(parse_company_row(row)),
    );

    match result {
        Ok(company) => Ok(Some(company?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_company_by_qr(conn: &Connection, qr_code: &str) -> anyhow::Result<Option<Company>> {
    let result = conn.query_row(
        "SELECT id, name, email, phone, address, logo_url, avatar_type, qr_code, created_at, updated_at
         FROM companies WHERE qr_code = ?1",
        params![qr_code],
        |row| Ok(parse_company_row(row)),
    );

    match result {
        Ok(company) => Ok(Some(company?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_company(conn: &Connection, company: &Company) -> anyhow::Result<bool> {
    let now = now_ts();
    let count = conn.execute(
        "UPDATE companies SET name = ?1, phone = ?2, address = ?3, logo_url = ?4, avatar_type = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            company.name,
            company.phone,
            company.address,
            company.logo_url,
            company.avatar_type,
            now,
            company.id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_company_row(row: &rusqlite::Row) -> anyhow::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        logo_url: row.get(5)?,
        avatar_type: row.get(6)?,
        qr_code: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

// ── Customers ──

pub fn create_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, first_name, last_name, email, phone, avatar_type, qr_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            customer.id,
            customer.first_name,
            customer.last_name,
            customer.email,
            customer.phone,
            customer.avatar_type,
            customer.qr_code,
            customer.created_at,
            customer.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_customer(conn: &Connection, id: &str) -> anyhow::Result<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, first_name, last_name, email, phone, avatar_type, qr_code, created_at, updated_at
         FROM customers WHERE id = ?1",
        params![id],
        |row| Ok(parse_customer_row(row)),
    );

    match result {
        Ok(customer) => Ok(Some(customer?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_customer_by_qr(conn: &Connection, qr_code: &str) -> anyhow::Result<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, first_name, last_name, email, phone, avatar_type, qr_code, created_at, updated_at
         FROM customers WHERE qr_code = ?1",
        params![qr_code],
        |row| Ok(parse_customer_row(row)),
    );

    match result {
        Ok(customer) => Ok(Some(customer?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<bool> {
    let now = now_ts();
    let count = conn.execute(
        "UPDATE customers SET first_name = ?1, last_name = ?2, phone = ?3, avatar_type = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            customer.first_name,
            customer.last_name,
            customer.phone,
            customer.avatar_type,
            now,
            customer.id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_customer_row(row: &rusqlite::Row) -> anyhow::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        avatar_type: row.get(5)?,
        qr_code: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ── Queues ──

const QUEUE_COLUMNS: &str = "id, company_id, name, description, average_wait_time, is_active, is_paused, max_capacity, created_at, updated_at";

pub fn create_queue(conn: &Connection, queue: &Queue) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO queues (id, company_id, name, description, average_wait_time, is_active, is_paused, max_capacity, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            queue.id,
            queue.company_id,
            queue.name,
            queue.description,
            queue.average_wait_time,
            queue.is_active as i32,
            queue.is_paused as i32,
            queue.max_capacity,
            queue.created_at,
            queue.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_queue(conn: &Connection, id: &str) -> anyhow::Result<Option<Queue>> {
    let sql = format!("SELECT {QUEUE_COLUMNS} FROM queues WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_queue_row(row)));

    match result {
        Ok(queue) => Ok(Some(queue?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_queues_for_company(conn: &Connection, company_id: &str) -> anyhow::Result<Vec<Queue>> {
    let sql = format!(
        "SELECT {QUEUE_COLUMNS} FROM queues WHERE company_id = ?1 ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![company_id], |row| Ok(parse_queue_row(row)))?;

    let mut queues = vec![];
    for row in rows {
        queues.push(row??);
    }
    Ok(queues)
}

pub fn get_active_queues_for_company(
    conn: &Connection,
    company_id: &str,
) -> anyhow::Result<Vec<Queue>> {
    let sql = format!(
        "SELECT {QUEUE_COLUMNS} FROM queues WHERE company_id = ?1 AND is_active = 1 ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![company_id], |row| Ok(parse_queue_row(row)))?;

    let mut queues = vec![];
    for row in rows {
        queues.push(row??);
    }
    Ok(queues)
}

pub fn update_queue(conn: &Connection, queue: &Queue) -> anyhow::Result<bool> {
    let now = now_ts();
    let count = conn.execute(
        "UPDATE queues SET name = ?1, description = ?2, average_wait_time = ?3, is_active = ?4, is_paused = ?5, max_capacity = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            queue.name,
            queue.description,
            queue.average_wait_time,
            queue.is_active as i32,
            queue.is_paused as i32,
            queue.max_capacity,
            now,
            queue.id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_queue_row(row: &rusqlite::Row) -> anyhow::Result<Queue> {
    Ok(Queue {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        average_wait_time: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
        is_paused: row.get::<_, i32>(6)? != 0,
        max_capacity: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub struct QueueStats {
    pub waiting_count: i64,
    pub called_count: i64,
    pub served_today: i64,
}

pub fn get_queue_stats(conn: &Connection, queue_id: &str) -> anyhow::Result<QueueStats> {
    let today = Utc::now().format("%Y-%m-%d").to_string();

    let waiting_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries WHERE queue_id = ?1 AND status = 'waiting'",
        params![queue_id],
        |row| row.get(0),
    )?;

    let called_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries WHERE queue_id = ?1 AND status = 'called'",
        params![queue_id],
        |row| row.get(0),
    )?;

    let served_today: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries WHERE queue_id = ?1 AND status = 'served' AND served_at >= ?2",
        params![queue_id, format!("{today} 00:00:00")],
        |row| row.get(0),
    )?;

    Ok(QueueStats {
        waiting_count,
        called_count,
        served_today,
    })
}

// ── Queue Entries ──

const ENTRY_COLUMNS: &str = "id, queue_id, customer_id, guest_name, guest_email, guest_phone, position, status, estimated_wait_time, joined_at, called_at, served_at";

pub fn insert_entry(conn: &Connection, entry: &QueueEntry) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO queue_entries (id, queue_id, customer_id, guest_name, guest_email, guest_phone, position, status, estimated_wait_time, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.id,
            entry.queue_id,
            entry.customer_id,
            entry.guest_name,
            entry.guest_email,
            entry.guest_phone,
            entry.position,
            entry.status.as_str(),
            entry.estimated_wait_time,
            entry.joined_at,
        ],
    )?;
    Ok(())
}

pub fn get_entry(conn: &Connection, id: &str) -> anyhow::Result<Option<QueueEntry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_entry_row(row)));

    match result {
        Ok(entry) => Ok(Some(entry?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Positions are never reused within a queue, so join order equals
/// position order for the lifetime of the queue.
pub fn next_position(conn: &Connection, queue_id: &str) -> anyhow::Result<i64> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), 0) FROM queue_entries WHERE queue_id = ?1",
        params![queue_id],
        |row| row.get(0),
    )?;
    Ok(max + 1)
}

pub fn active_entry_count(conn: &Connection, queue_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries WHERE queue_id = ?1 AND status IN ('waiting', 'called')",
        params![queue_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_customer_active_entry(
    conn: &Connection,
    queue_id: &str,
    customer_id: &str,
) -> anyhow::Result<Option<QueueEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entries
         WHERE queue_id = ?1 AND customer_id = ?2 AND status IN ('waiting', 'called')"
    );
    let result = conn.query_row(&sql, params![queue_id, customer_id], |row| {
        Ok(parse_entry_row(row))
    });

    match result {
        Ok(entry) => Ok(Some(entry?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_first_waiting_entry(
    conn: &Connection,
    queue_id: &str,
) -> anyhow::Result<Option<QueueEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM queue_entries
         WHERE queue_id = ?1 AND status = 'waiting' ORDER BY position ASC LIMIT 1"
    );
    let result = conn.query_row(&sql, params![queue_id], |row| Ok(parse_entry_row(row)));

    match result {
        Ok(entry) => Ok(Some(entry?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_entry_status(
    conn: &Connection,
    id: &str,
    status: EntryStatus,
) -> anyhow::Result<bool> {
    let now = now_ts();
    let count = match status {
        EntryStatus::Called => conn.execute(
            "UPDATE queue_entries SET status = ?1, called_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?,
        EntryStatus::Served => conn.execute(
            "UPDATE queue_entries SET status = ?1, served_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?,
        _ => conn.execute(
            "UPDATE queue_entries SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?,
    };
    Ok(count > 0)
}

pub fn people_ahead(conn: &Connection, queue_id: &str, position: i64) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries
         WHERE queue_id = ?1 AND status = 'waiting' AND position < ?2",
        params![queue_id, position],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_entries_for_queue(
    conn: &Connection,
    queue_id: &str,
    active_only: bool,
) -> anyhow::Result<Vec<QueueEntry>> {
    let sql = if active_only {
        format!(
            "SELECT {ENTRY_COLUMNS} FROM queue_entries
             WHERE queue_id = ?1 AND status IN ('waiting', 'called') ORDER BY position ASC"
        )
    } else {
        format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE queue_id = ?1 ORDER BY position ASC")
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![queue_id], |row| Ok(parse_entry_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

/// Average called-to-served interval in minutes over the most recent
/// served entries, if any service history exists.
pub fn avg_service_minutes(
    conn: &Connection,
    queue_id: &str,
    sample: i64,
) -> anyhow::Result<Option<f64>> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG((julianday(served_at) - julianday(called_at)) * 1440.0)
         FROM (
             SELECT called_at, served_at FROM queue_entries
             WHERE queue_id = ?1 AND status = 'served'
               AND called_at IS NOT NULL AND served_at IS NOT NULL
             ORDER BY served_at DESC LIMIT ?2
         )",
        params![queue_id, sample],
        |row| row.get(0),
    )?;
    Ok(avg)
}

fn parse_entry_row(row: &rusqlite::Row) -> anyhow::Result<QueueEntry> {
    let status_str: String = row.get(7)?;
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_id: row.get(1)?,
        customer_id: row.get(2)?,
        guest_name: row.get(3)?,
        guest_email: row.get(4)?,
        guest_phone: row.get(5)?,
        position: row.get(6)?,
        status: EntryStatus::parse(&status_str),
        estimated_wait_time: row.get(8)?,
        joined_at: row.get(9)?,
        called_at: row.get(10)?,
        served_at: row.get(11)?,
    })
}

// ── Customer Views ──

pub struct EntryWithContext {
    pub entry: QueueEntry,
    pub queue: Queue,
    pub company: Company,
}

fn entry_context_sql(filter: &str) -> String {
    format!(
        "SELECT e.id, e.queue_id, e.customer_id, e.guest_name, e.guest_email, e.guest_phone,
                e.position, e.status, e.estimated_wait_time, e.joined_at, e.called_at, e.served_at,
                q.id, q.company_id, q.name, q.description, q.average_wait_time, q.is_active, q.is_paused, q.max_capacity, q.created_at, q.updated_at,
                c.id, c.name, c.email, c.phone, c.address, c.logo_url, c.avatar_type, c.qr_code, c.created_at, c.updated_at
         FROM queue_entries e
         INNER JOIN queues q ON q.id = e.queue_id
         INNER JOIN companies c ON c.id = q.company_id
         {filter}"
    )
}

fn parse_entry_context_row(row: &rusqlite::Row) -> anyhow::Result<EntryWithContext> {
    let status_str: String = row.get(7)?;
    Ok(EntryWithContext {
        entry: QueueEntry {
            id: row.get(0)?,
            queue_id: row.get(1)?,
            customer_id: row.get(2)?,
            guest_name: row.get(3)?,
            guest_email: row.get(4)?,
            guest_phone: row.get(5)?,
            position: row.get(6)?,
            status: EntryStatus::parse(&status_str),
            estimated_wait_time: row.get(8)?,
            joined_at: row.get(9)?,
            called_at: row.get(10)?,
            served_at: row.get(11)?,
        },
        queue: Queue {
            id: row.get(12)?,
            company_id: row.get(13)?,
            name: row.get(14)?,
            description: row.get(15)?,
            average_wait_time: row.get(16)?,
            is_active: row.get::<_, i32>(17)? != 0,
            is_paused: row.get::<_, i32>(18)? != 0,
            max_capacity: row.get(19)?,
            created_at: row.get(20)?,
            updated_at: row.get(21)?,
        },
        company: Company {
            id: row.get(22)?,
            name: row.get(23)?,
            email: row.get(24)?,
            phone: row.get(25)?,
            address: row.get(26)?,
            logo_url: row.get(27)?,
            avatar_type: row.get(28)?,
            qr_code: row.get(29)?,
            created_at: row.get(30)?,
            updated_at: row.get(31)?,
        },
    })
}

pub fn get_current_entries_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> anyhow::Result<Vec<EntryWithContext>> {
    let sql = entry_context_sql(
        "WHERE e.customer_id = ?1 AND e.status IN ('waiting', 'called') ORDER BY e.joined_at DESC",
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_entry_context_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub fn get_history_for_customer(
    conn: &Connection,
    customer_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<EntryWithContext>> {
    let sql = entry_context_sql(
        "WHERE e.customer_id = ?1 AND e.status IN ('served', 'cancelled')
         ORDER BY COALESCE(e.served_at, e.joined_at) DESC LIMIT ?2",
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![customer_id, limit], |row| {
        Ok(parse_entry_context_row(row))
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub struct CustomerStats {
    pub total_visits: i64,
    pub average_wait_time: i64,
    pub companies_visited: i64,
}

pub fn get_customer_stats(conn: &Connection, customer_id: &str) -> anyhow::Result<CustomerStats> {
    let total_visits: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_entries WHERE customer_id = ?1",
        params![customer_id],
        |row| row.get(0),
    )?;

    let average_wait_time: f64 = conn
        .query_row(
            "SELECT COALESCE(AVG(estimated_wait_time), 0) FROM queue_entries
             WHERE customer_id = ?1 AND estimated_wait_time IS NOT NULL",
            params![customer_id],
            |row| row.get(0),
        )
        .unwrap_or(0.0);

    let companies_visited: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT q.company_id)
         FROM queue_entries e INNER JOIN queues q ON q.id = e.queue_id
         WHERE e.customer_id = ?1",
        params![customer_id],
        |row| row.get(0),
    )?;

    Ok(CustomerStats {
        total_visits,
        average_wait_time: average_wait_time.round() as i64,
        companies_visited,
    })
}

// ── Queue Events ──

pub fn insert_event(
    conn: &Connection,
    queue_id: &str,
    company_id: &str,
    customer_id: Option<&str>,
    entry_id: Option<&str>,
    kind: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO queue_events (queue_id, company_id, customer_id, entry_id, kind)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![queue_id, company_id, customer_id, entry_id, kind],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_events_since(conn: &Connection, since_id: i64) -> anyhow::Result<Vec<QueueEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, queue_id, company_id, customer_id, entry_id, kind, created_at
         FROM queue_events WHERE id > ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![since_id], |row| {
        Ok(QueueEvent {
            id: row.get(0)?,
            queue_id: row.get(1)?,
            company_id: row.get(2)?,
            customer_id: row.get(3)?,
            entry_id: row.get(4)?,
            kind: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}
