use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::store::{
    EmployeeFields, EmployeeStore, ListParams, SortDirection, SortField, DEFAULT_LIMIT,
    DEFAULT_PAGE,
};
use crate::utils::upload::UploadedPhoto;
use crate::utils::{auth, validation::validate_payload};
use crate::AppConfig;

const DESIGNATIONS: [&str; 3] = ["HR", "Manager", "Sales"];
const GENDERS: [&str; 2] = ["Male", "Female"];
const COURSES: [&str; 3] = ["MCA", "BCA", "BSC"];

// Text parts are small form values; anything bigger is a malformed request.
const MAX_TEXT_FIELD_BYTES: usize = 4096;

/// Raw listing parameters as they arrive on the wire. Public because the
/// listing handler is public; everything stays stringly typed until
/// `into_list_params` applies the defaults.
#[derive(Deserialize)]
pub struct DirectoryQueryParams {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    #[serde(rename = "sortDirection")]
    sort_direction: Option<String>,
}

impl DirectoryQueryParams {
    /// Missing, non-numeric, or non-positive `page`/`limit` substitute the
    /// defaults instead of erroring, and `limit` has no upper bound; both are
    /// deliberate permissive policies. A page past the end comes back as an
    /// empty page.
    fn into_list_params(self) -> ListParams {
        let page = self
            .page
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_PAGE);
        let limit = self
            .limit
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LIMIT);
        let search = self.search.unwrap_or_default();
        let sort = self.sort.as_deref().and_then(SortField::parse);
        let direction = self
            .sort_direction
            .as_deref()
            .map(SortDirection::parse)
            .unwrap_or(SortDirection::Asc);

        ListParams {
            page,
            limit,
            search,
            sort,
            direction,
        }
    }
}

/// The whole submitted form, built from the multipart stream before any
/// validation or persistence runs. Validated as one immutable object so every
/// violation is reported together.
#[derive(Debug, Validate)]
struct EmployeeForm {
    #[validate(length(min = 1, message = "Full name is required"))]
    full_name: String,
    #[validate(email(message = "Email must be a valid address"))]
    email: String,
    #[validate(custom = "validate_phone")]
    phone: String,
    #[validate(custom = "validate_designation")]
    designation: String,
    #[validate(custom = "validate_gender")]
    gender: String,
    #[validate(custom = "validate_course")]
    course: Vec<String>,
}

impl EmployeeForm {
    fn into_fields(self, profile_photo: Option<String>) -> EmployeeFields {
        EmployeeFields {
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            designation: self.designation,
            gender: self.gender,
            course: self.course,
            profile_photo,
        }
    }
}

struct EmployeeSubmission {
    form: EmployeeForm,
    photo: Option<UploadedPhoto>,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(field_error("phone", "Phone must be exactly 10 digits"))
    }
}

fn validate_designation(designation: &str) -> Result<(), ValidationError> {
    if DESIGNATIONS.contains(&designation) {
        Ok(())
    } else {
        Err(field_error(
            "designation",
            "Designation must be one of HR, Manager, Sales",
        ))
    }
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err(field_error("gender", "Gender must be either Male or Female"))
    }
}

fn validate_course(course: &[String]) -> Result<(), ValidationError> {
    if course.is_empty() {
        return Err(field_error("course", "At least one course is required"));
    }
    if course.iter().any(|c| !COURSES.contains(&c.as_str())) {
        return Err(field_error(
            "course",
            "Courses must be drawn from MCA, BCA, BSC",
        ));
    }
    Ok(())
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk
            .map_err(|e| AppError::BadRequest(format!("malformed multipart payload: {}", e)))?;
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest("Form field too large".to_string()));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf)
        .map_err(|_| AppError::BadRequest("Form field is not valid UTF-8".to_string()))
}

async fn drain(field: &mut Field) -> Result<(), AppError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::BadRequest(format!("malformed multipart payload: {}", e)))?;
    }
    Ok(())
}

/// Drains the multipart stream into an immutable submission. Repeated
/// `course` fields accumulate with duplicates collapsed (first occurrence
/// wins); unknown parts are ignored.
async fn read_submission(mut payload: Multipart) -> Result<EmployeeSubmission, AppError> {
    let mut full_name = String::new();
    let mut email = String::new();
    let mut phone = String::new();
    let mut designation = String::new();
    let mut gender = String::new();
    let mut course: Vec<String> = Vec::new();
    let mut photo: Option<UploadedPhoto> = None;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| AppError::BadRequest(format!("malformed multipart payload: {}", e)))?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or("")
            .to_string();

        match name.as_str() {
            "fullName" => full_name = read_text(&mut field).await?,
            "email" => email = read_text(&mut field).await?,
            "phone" => phone = read_text(&mut field).await?,
            "designation" => designation = read_text(&mut field).await?,
            "gender" => gender = read_text(&mut field).await?,
            "course" => {
                let value = read_text(&mut field).await?;
                if !value.is_empty() && !course.contains(&value) {
                    course.push(value);
                }
            }
            "profilePhoto" => photo = Some(UploadedPhoto::read(&mut field).await?),
            _ => drain(&mut field).await?,
        }
    }

    Ok(EmployeeSubmission {
        form: EmployeeForm {
            full_name,
            email,
            phone,
            designation,
            gender,
            course,
        },
        photo,
    })
}

pub async fn list_employees(
    req: HttpRequest,
    store: web::Data<EmployeeStore>,
    query: web::Query<DirectoryQueryParams>,
) -> Result<HttpResponse, AppError> {
    auth::authenticate(&req)?;

    let params = query.into_inner().into_list_params();
    let (employees, total) = store.query(&params).await?;

    Ok(HttpResponse::Ok().json(json!({
        "employees": employees,
        "totalEmployees": total,
    })))
}

pub async fn create_employee(
    req: HttpRequest,
    store: web::Data<EmployeeStore>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    auth::authenticate(&req)?;

    let submission = read_submission(payload).await?;
    validate_payload(&submission.form)?;

    let profile_photo = match submission.photo {
        Some(photo) => Some(photo.save(&config.uploads_dir).await?),
        None => None,
    };

    let employee = store
        .create(submission.form.into_fields(profile_photo))
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

pub async fn get_employee(
    req: HttpRequest,
    store: web::Data<EmployeeStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth::authenticate(&req)?;

    match store.get_by_id(&id).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(AppError::NotFound("Employee not found".to_string())),
    }
}

/// Full-record replacement, not a partial patch: every field is re-validated
/// even if unchanged. A new `profilePhoto` part replaces the stored
/// reference; absence keeps it.
pub async fn update_employee(
    req: HttpRequest,
    store: web::Data<EmployeeStore>,
    config: web::Data<AppConfig>,
    id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    auth::authenticate(&req)?;
    let id = id.into_inner();

    let existing = store
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

    let submission = read_submission(payload).await?;
    validate_payload(&submission.form)?;

    let profile_photo = match submission.photo {
        Some(photo) => {
            let stored = photo.save(&config.uploads_dir).await?;
            if let Some(old) = &existing.profile_photo {
                // Replaced photos are not cleaned up; see the delete path.
                debug!("photo {} for employee {} replaced, file left in place", old, id);
            }
            Some(stored)
        }
        None => existing.profile_photo,
    };

    let updated = store
        .update(&id, submission.form.into_fields(profile_photo))
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn delete_employee(
    req: HttpRequest,
    store: web::Data<EmployeeStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth::authenticate(&req)?;
    let id = id.into_inner();

    match store.delete(&id).await? {
        None => Err(AppError::NotFound("Employee not found".to_string())),
        Some(deleted) => {
            if let Some(photo) = &deleted.profile_photo {
                // Stored photos are not removed with the record.
                debug!("photo {} for deleted employee {} left in place", photo, id);
            }
            Ok(HttpResponse::Ok().json(json!({
                "message": "Employee deleted successfully",
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        page: Option<&str>,
        limit: Option<&str>,
        sort: Option<&str>,
        direction: Option<&str>,
    ) -> DirectoryQueryParams {
        DirectoryQueryParams {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
            search: None,
            sort: sort.map(str::to_string),
            sort_direction: direction.map(str::to_string),
        }
    }

    #[test]
    fn pagination_defaults_apply_when_absent() {
        let list = params(None, None, None, None).into_list_params();
        assert_eq!(list.page, DEFAULT_PAGE);
        assert_eq!(list.limit, DEFAULT_LIMIT);
        assert_eq!(list.search, "");
        assert_eq!(list.sort, None);
        assert_eq!(list.direction, SortDirection::Asc);
    }

    #[test]
    fn malformed_pagination_falls_back_to_defaults() {
        let list = params(Some("abc"), Some("-3"), None, None).into_list_params();
        assert_eq!(list.page, DEFAULT_PAGE);
        assert_eq!(list.limit, DEFAULT_LIMIT);

        let list = params(Some("0"), Some("ten"), None, None).into_list_params();
        assert_eq!(list.page, DEFAULT_PAGE);
        assert_eq!(list.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn valid_pagination_and_sort_are_honored() {
        let list = params(Some("3"), Some("25"), Some("email"), Some("desc")).into_list_params();
        assert_eq!(list.page, 3);
        assert_eq!(list.limit, 25);
        assert_eq!(list.sort, Some(SortField::Email));
        assert_eq!(list.direction, SortDirection::Desc);
    }

    #[test]
    fn unknown_sort_field_is_ignored() {
        let list = params(None, None, Some("designation"), None).into_list_params();
        assert_eq!(list.sort, None);
    }

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("987654321").is_err());
        assert!(validate_phone("98765432100").is_err());
        assert!(validate_phone("98765abc10").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn enumerated_sets_are_enforced() {
        assert!(validate_designation("HR").is_ok());
        assert!(validate_designation("Boss").is_err());
        assert!(validate_gender("Female").is_ok());
        assert!(validate_gender("female").is_err());
        assert!(validate_course(&["BCA".to_string()]).is_ok());
        assert!(validate_course(&[]).is_err());
        assert!(validate_course(&["BCA".to_string(), "PhD".to_string()]).is_err());
    }

    #[test]
    fn form_validation_reports_every_failing_field() {
        let form = EmployeeForm {
            full_name: String::new(),
            email: "not-an-email".to_string(),
            phone: "12ab".to_string(),
            designation: "Boss".to_string(),
            gender: String::new(),
            course: Vec::new(),
        };
        let errs = form.validate().unwrap_err();
        let fields = errs.field_errors();
        for field in ["full_name", "email", "phone", "designation", "gender", "course"] {
            assert!(fields.contains_key(field), "missing {}", field);
        }
    }
}
