use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::employee::Employee;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

const EMPLOYEE_COLUMNS: &str =
    "employee_id, full_name, email, phone, designation, gender, course, profile_photo, created_at, updated_at";

/// Fields sortable through the listing endpoint. Anything else falls back to
/// creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    FullName,
    Email,
    Phone,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "fullName" => Some(SortField::FullName),
            "email" => Some(SortField::Email),
            "phone" => Some(SortField::Phone),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortField::FullName => "full_name",
            SortField::Email => "email",
            SortField::Phone => "phone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListParams {
    pub page: i64,
    pub limit: i64,
    pub search: String,
    pub sort: Option<SortField>,
    pub direction: SortDirection,
}

/// The mutable portion of a record, already validated by the caller.
#[derive(Debug, Clone)]
pub struct EmployeeFields {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub gender: String,
    pub course: Vec<String>,
    pub profile_photo: Option<String>,
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    employee_id: String,
    full_name: String,
    email: String,
    phone: String,
    designation: String,
    gender: String,
    course: String,
    profile_photo: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = AppError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let course = serde_json::from_str(&row.course)
            .map_err(|e| AppError::Database(format!("corrupt course column: {}", e)))?;
        Ok(Employee {
            employee_id: row.employee_id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            designation: row.designation,
            gender: row.gender,
            course,
            profile_photo: row.profile_photo,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// The only component that assigns identifiers and timestamps. All operations
/// are atomic per record; nothing here spans multiple records.
#[derive(Clone)]
pub struct EmployeeStore {
    pool: SqlitePool,
}

impl EmployeeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, fields: EmployeeFields) -> Result<Employee, AppError> {
        let now = Utc::now();
        let employee = Employee {
            employee_id: Uuid::new_v4().to_string(),
            full_name: fields.full_name,
            email: fields.email,
            phone: fields.phone,
            designation: fields.designation,
            gender: fields.gender,
            course: fields.course,
            profile_photo: fields.profile_photo,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO employees (employee_id, full_name, email, phone, designation, gender, course, profile_photo, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&employee.employee_id)
        .bind(&employee.full_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.designation)
        .bind(&employee.gender)
        .bind(encode_course(&employee.course)?)
        .bind(&employee.profile_photo)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(employee)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {} FROM employees WHERE employee_id = ?1",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Employee::try_from).transpose()
    }

    /// Filter, sort, and paginate in one pass, returning the requested page
    /// together with the total count of records matching the filter. `rowid`
    /// is always the final sort key, which makes creation order the natural
    /// order and keeps ties stable in both directions.
    pub async fn query(&self, params: &ListParams) -> Result<(Vec<Employee>, i64), AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM employees");
        push_search_filter(&mut count, &params.search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM employees", EMPLOYEE_COLUMNS));
        push_search_filter(&mut query, &params.search);
        query.push(" ORDER BY ");
        if let Some(field) = params.sort {
            query.push(field.column());
            query.push(" ");
            query.push(params.direction.keyword());
            query.push(", ");
        }
        query.push("rowid ASC LIMIT ");
        query.push_bind(params.limit);
        query.push(" OFFSET ");
        query.push_bind(page_offset(params.page, params.limit));

        let rows: Vec<EmployeeRow> = query.build_query_as().fetch_all(&self.pool).await?;
        let employees = rows
            .into_iter()
            .map(Employee::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((employees, total))
    }

    /// Replaces every mutable field and refreshes `updated_at`. Returns `None`
    /// when the identifier does not resolve to a record.
    pub async fn update(&self, id: &str, fields: EmployeeFields) -> Result<Option<Employee>, AppError> {
        let result = sqlx::query(
            "UPDATE employees SET full_name = ?1, email = ?2, phone = ?3, designation = ?4, \
             gender = ?5, course = ?6, profile_photo = ?7, updated_at = ?8 WHERE employee_id = ?9",
        )
        .bind(&fields.full_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.designation)
        .bind(&fields.gender)
        .bind(encode_course(&fields.course)?)
        .bind(&fields.profile_photo)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Removes the record, returning it so the caller can account for the
    /// orphaned photo file. Returns `None` when the identifier does not
    /// exist.
    pub async fn delete(&self, id: &str) -> Result<Option<Employee>, AppError> {
        let existing = match self.get_by_id(id).await? {
            Some(employee) => employee,
            None => return Ok(None),
        };

        sqlx::query("DELETE FROM employees WHERE employee_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(existing))
    }
}

/// Skip `(page - 1) * limit` rows. Saturates instead of overflowing so an
/// absurdly large page number stays a page past the end (an empty page),
/// never a wrapped-around negative offset.
fn page_offset(page: i64, limit: i64) -> i64 {
    page.checked_sub(1)
        .and_then(|p| p.checked_mul(limit))
        .unwrap_or(i64::MAX)
}

fn encode_course(course: &[String]) -> Result<String, AppError> {
    serde_json::to_string(course)
        .map_err(|e| AppError::Database(format!("failed to encode course list: {}", e)))
}

/// Case-insensitive substring match on full name OR email. The search text is
/// escaped so LIKE metacharacters are matched literally.
fn push_search_filter(query: &mut QueryBuilder<'_, Sqlite>, search: &str) {
    if search.is_empty() {
        return;
    }
    let pattern = format!("%{}%", escape_like(search));
    query.push(" WHERE (full_name LIKE ");
    query.push_bind(pattern.clone());
    query.push(" ESCAPE '\\' OR email LIKE ");
    query.push_bind(pattern);
    query.push(" ESCAPE '\\')");
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_allow_list() {
        assert_eq!(SortField::parse("fullName"), Some(SortField::FullName));
        assert_eq!(SortField::parse("email"), Some(SortField::Email));
        assert_eq!(SortField::parse("phone"), Some(SortField::Phone));
        assert_eq!(SortField::parse("designation"), None);
        assert_eq!(SortField::parse(""), None);
    }

    #[test]
    fn sort_direction_defaults_to_asc() {
        assert_eq!(SortDirection::parse("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Asc);
    }

    #[test]
    fn page_offset_saturates_instead_of_overflowing() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(i64::MAX, 10), i64::MAX);
        assert_eq!(page_offset(i64::MAX, i64::MAX), i64::MAX);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_done\\"), "50\\%\\_done\\\\");
        assert_eq!(escape_like("jane"), "jane");
    }
}
