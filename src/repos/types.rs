use diesel::pg::PgConnection;
use r2d2;
use r2d2_diesel::ConnectionManager;

use repos::Error as RepoError;

pub type RepoResult<T> = Result<T, RepoError>;
pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// `ilike` pattern matching `term` anywhere. Wildcards typed by the user match literally,
/// backslash being the default escape character of postgres patterns.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if c == '\\' || c == '%' || c == '_' {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
