//! Bodies for the data-store routes. Records themselves stay untyped JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Value,
}

/// Drop credential columns before a user row leaves the service.
pub fn without_password(mut user: Value) -> Value {
    if let Some(fields) = user.as_object_mut() {
        fields.remove("password");
    }
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_password_column() {
        let user = without_password(json!({"id": 1, "email": "a@b.co", "password": "x"}));
        assert_eq!(user, json!({"id": 1, "email": "a@b.co"}));
    }

    #[test]
    fn login_request_validates_email() {
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            password: "pw".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
