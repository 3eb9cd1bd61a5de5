//! SQL functions registered on every connection

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Unicode-aware lowercase, `NULL` in and `NULL` out
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Register the custom SQL functions on `conn`
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}
