// Core data models for parcelprobe
// Endpoints of the logistics API and the requests sent to them

use std::fmt;

use serde_json::Value;

use crate::auth::HeaderProfile;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
            Method::PATCH => reqwest::Method::PATCH,
        }
    }
}

/// An endpoint of the target API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub profile: HeaderProfile,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>, profile: HeaderProfile) -> Self {
        Self { method, path: path.into(), profile }
    }

    /// `POST /pickups`
    pub fn create_pickup() -> Self {
        Self::new(Method::POST, "/pickups", HeaderProfile::Pickups)
    }

    /// `GET /pickups/{id}`
    pub fn get_pickup(id: &str) -> Self {
        Self::new(Method::GET, format!("/pickups/{}", id), HeaderProfile::Pickups)
    }

    /// `POST /businesses/add-bank-info`
    pub fn add_bank_info() -> Self {
        Self::new(Method::POST, "/businesses/add-bank-info", HeaderProfile::BankInfo)
    }

    /// `POST /users/forget-password`
    pub fn forget_password() -> Self {
        Self::new(Method::POST, "/users/forget-password", HeaderProfile::ForgetPassword)
    }

    /// Build a request against this endpoint, with or without a JSON body.
    pub fn request(&self, body: Option<Value>) -> ProbeRequest {
        ProbeRequest {
            method: self.method,
            path: self.path.clone(),
            profile: self.profile,
            body,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A single outbound request. `path` may also be an absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: Method,
    pub path: String,
    pub profile: HeaderProfile,
    pub body: Option<Value>,
}
