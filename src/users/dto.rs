use std::collections::HashMap;

use axum::extract::Multipart;
use serde::Serialize;

use super::repo_types::{NewUser, PublicUser, UserChanges};
use crate::{error::AppError, images::services::UploadItem};

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub status: bool,
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub status: bool,
    pub total: i64,
    pub data: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub status: bool,
    pub message: &'static str,
    pub deleted: usize,
}

/// Text fields and optional `image` file of a multipart profile form.
#[derive(Default)]
pub struct ProfileForm {
    fields: HashMap<&'static str, String>,
    image: Option<UploadItem>,
}

/// Maps form field names, including the legacy capitalised ones, to the
/// canonical snake_case names.
fn canonical(name: &str) -> Option<&'static str> {
    Some(match name {
        "user_id" | "UserId" => "user_id",
        "first_name" | "First_Name" => "first_name",
        "last_name" | "Last_Name" => "last_name",
        "age" | "Age" => "age",
        "email" | "Email" => "email",
        "password" | "Password" => "password",
        "is_admin" | "IsAdmin" => "is_admin",
        "image" | "Image" => "image",
        _ => return None,
    })
}

impl ProfileForm {
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = ProfileForm::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::validation("form", e.body_text()))?
        {
            let Some(name) = field.name().and_then(canonical) else {
                continue;
            };
            if name == "image" {
                // A plain text `image` value is ignored; only uploads count.
                if field.file_name().is_none() {
                    continue;
                }
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation("image", e.body_text()))?;
                form.image = Some(UploadItem { body, content_type });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(name, e.body_text()))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    #[cfg(test)]
    pub fn from_parts(fields: &[(&'static str, &str)], image: Option<UploadItem>) -> Self {
        Self {
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            image,
        }
    }

    fn required(&mut self, name: &'static str) -> Result<String, AppError> {
        self.fields
            .remove(name)
            .ok_or_else(|| AppError::validation(name, format!("{name} is required")))
    }

    fn parse_age(raw: &str) -> Result<i32, AppError> {
        raw.trim()
            .parse::<i32>()
            .map_err(|_| AppError::validation("age", "Age should be a number without spaces"))
    }

    fn parse_flag(raw: &str) -> Result<bool, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(AppError::validation("is_admin", "is_admin should be true or false")),
        }
    }

    pub fn into_new_user(mut self) -> Result<(NewUser, Option<UploadItem>), AppError> {
        let fields = NewUser {
            user_id: self.required("user_id")?,
            first_name: self.required("first_name")?,
            last_name: self.required("last_name")?,
            age: Self::parse_age(&self.required("age")?)?,
            email: self.required("email")?,
            password: self.required("password")?,
            is_admin: match self.fields.remove("is_admin") {
                Some(v) => Self::parse_flag(&v)?,
                None => false,
            },
        };
        Ok((fields, self.image))
    }

    pub fn into_changes(mut self) -> Result<(UserChanges, Option<UploadItem>), AppError> {
        let changes = UserChanges {
            user_id: self.fields.remove("user_id"),
            first_name: self.fields.remove("first_name"),
            last_name: self.fields.remove("last_name"),
            age: self
                .fields
                .remove("age")
                .map(|v| Self::parse_age(&v))
                .transpose()?,
            email: self.fields.remove("email"),
            password: self.fields.remove("password"),
            image: None,
            is_admin: self
                .fields
                .remove("is_admin")
                .map(|v| Self::parse_flag(&v))
                .transpose()?,
        };
        Ok((changes, self.image))
    }
}
