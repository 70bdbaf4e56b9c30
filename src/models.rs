use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::permission::Service;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "sara")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SignupReq {
    #[schema(example = "omar")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[schema(example = "sara")]
    pub username: String,
    #[schema(example = false)]
    pub is_superadmin: bool,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// super-admin flag
    pub admin: bool,
    /// granted services
    pub srv: Vec<Service>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}
