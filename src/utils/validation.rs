use std::str::FromStr;

use strum::VariantNames;

use crate::error::{ApiError, FieldError};
use crate::models::{CheckAction, CheckReq, LoginReq, RegisterReq};

pub const MIN_PASSWORD_LEN: usize = 6;
const MAX_EMAIL_LEN: usize = 254;

/// A registration that passed validation, email already normalized.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check only: one `@`, a non-empty local part, a dotted domain and no
/// whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !is_valid_email(email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, ApiError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn validate_register(req: &RegisterReq) -> Result<NewUser, ApiError> {
    let mut errors = Vec::new();
    let email = normalize_email(&req.email);
    check_email(&email, &mut errors);

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        errors.push(FieldError::new("fullName", "Full name is required"));
    }

    finish(
        NewUser {
            email,
            password: req.password.clone(),
            full_name,
        },
        errors,
    )
}

pub fn validate_login(req: &LoginReq) -> Result<Credentials, ApiError> {
    let mut errors = Vec::new();
    let email = normalize_email(&req.email);
    check_email(&email, &mut errors);

    if req.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    finish(
        Credentials {
            email,
            password: req.password.clone(),
        },
        errors,
    )
}

pub fn parse_check_action(req: &CheckReq) -> Result<CheckAction, ApiError> {
    CheckAction::from_str(req.action.trim()).map_err(|_| {
        ApiError::Validation(vec![FieldError::new(
            "action",
            format!("Action must be one of: {}", CheckAction::VARIANTS.join(", ")),
        )])
    })
}
