use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{
    AuthError, AuthResponse, JwtService, LoginRequest, MessageResponse, RefreshTokenRequest,
    RegisterRequest, TokenResponse, TokenType, UserInfo, UserRole, UserSession,
};
use crate::models::validation::{validate_adult_age, validate_email, validate_name};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, password_hash, role, first_name, last_name, date_of_birth, \
                            phone, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    db: PgPool,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_secret: &str) -> Self {
        Self {
            jwt_service: JwtService::new(jwt_secret),
            db,
        }
    }

    /// Register a new athlete or trainer account
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        validate_email(&email).map_err(|e| AuthError::Registration(e.to_string()))?;
        validate_name(&request.first_name, "first_name")
            .and_then(|_| validate_name(&request.last_name, "last_name"))
            .map_err(|e| AuthError::Registration(e.to_string()))?;
        validate_adult_age(request.date_of_birth, Utc::now().date_naive())
            .map_err(|e| AuthError::Registration(e.to_string()))?;

        let role = request.role.unwrap_or(UserRole::Athlete);
        if !role.is_self_assignable() {
            return Err(AuthError::Registration(format!(
                "role '{}' cannot be chosen at sign-up",
                role.as_str()
            )));
        }

        if self.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&request.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, role, first_name, last_name, date_of_birth, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(role)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.date_of_birth)
        .bind(request.phone.as_deref())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, role = role.as_str(), "user registered");

        self.issue_tokens(user).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        self.issue_tokens(user).await
    }

    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> Result<TokenResponse, AuthError> {
        let claims = self
            .jwt_service
            .validate_token_of_type(&request.refresh_token, TokenType::Refresh)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        if !self.is_refresh_token_valid(user_id, &request.refresh_token).await? {
            return Err(AuthError::InvalidToken);
        }

        let user = self.get_user_by_id(user_id).await?.ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let access_token = self
            .jwt_service
            .create_access_token(user.id, &user.email, user.role)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
        })
    }

    /// Blacklist the access token and revoke every refresh token of its owner
    pub async fn logout(&self, token: &str) -> Result<MessageResponse, AuthError> {
        let claims = self.jwt_service.validate_token_of_type(token, TokenType::Access)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        self.blacklist_token(&claims.jti, claims.exp as i64).await?;
        self.revoke_user_refresh_tokens(user_id).await?;

        tracing::info!(user_id = %user_id, "user logged out");

        Ok(MessageResponse {
            message: "Successfully logged out".to_string(),
        })
    }

    /// Validate user session from token
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt_service.extract_user_session(token)?;

        let row = sqlx::query(
            "SELECT u.is_active,
                    EXISTS (SELECT 1 FROM token_blacklist b WHERE b.jti = $2 AND b.expires_at > NOW()) AS revoked
             FROM users u WHERE u.id = $1",
        )
        .bind(session.user_id)
        .bind(&session.jti)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AuthError::InvalidToken)?;

        if row.get::<bool, _>("revoked") {
            return Err(AuthError::InvalidToken);
        }
        if !row.get::<bool, _>("is_active") {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(session)
    }

    pub async fn current_user(&self, session: &UserSession) -> Result<UserInfo, AuthError> {
        let user = self
            .get_user_by_id(session.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(user_info(user))
    }

    /// Drop blacklist rows whose tokens would have expired anyway
    pub async fn purge_expired_tokens(&self) -> Result<u64, AuthError> {
        let blacklisted = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?
            .rows_affected();
        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW() OR revoked")
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(blacklisted + refresh)
    }

    async fn issue_tokens(&self, user: User) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) = self
            .jwt_service
            .create_token_pair(user.id, &user.email, user.role)?;

        self.store_refresh_token(user.id, &refresh_token).await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: user_info(user),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn store_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self
            .jwt_service
            .validate_token_of_type(refresh_token, TokenType::Refresh)?;
        let expires_at = chrono::DateTime::from_timestamp(claims.exp as i64, 0)
            .ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(format!("{:x}", md5::compute(refresh_token)))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn is_refresh_token_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
        let token_hash = format!("{:x}", md5::compute(refresh_token));

        let result = sqlx::query(
            "SELECT 1 FROM refresh_tokens
             WHERE user_id = $1 AND token_hash = $2 AND expires_at > NOW() AND NOT revoked",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(result.is_some())
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn blacklist_token(&self, jti: &str, exp: i64) -> Result<(), AuthError> {
        let expires_at = chrono::DateTime::from_timestamp(exp, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

fn user_info(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email,
        role: user.role,
        first_name: user.first_name,
        last_name: user.last_name,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}
