//! Account records, login, and profile changes.
//!
//! This is the collaborator that hashes credentials on write, checks them
//! on login, and issues tokens. It also serves as the in-memory
//! [`UserStore`] the identity resolver reads principals from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::auth::{
    AuthError, Claim, Credential, CredentialHasher, Principal, Role, StoreFuture, TokenService,
    UserStore,
};
use crate::types::{AuthToken, UserId, VerificationCode};

/// Input for [`AccountService::create_account`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountInput {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Input for [`AccountService::login`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for [`AccountService::edit_profile`]. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditProfileInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Result of a successful account creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAccount {
    pub id: UserId,
    pub verification_code: VerificationCode,
}

/// Account flow errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Email is already registered
    EmailTaken,
    /// No account for the email used at login
    UnknownEmail,
    /// Password did not match
    WrongPassword,
    /// No account with the given id
    UnknownUser,
    /// Verification code does not exist or was already used
    UnknownVerificationCode,
    /// Hashing or signing failed
    Auth(AuthError),
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailTaken => write!(f, "There is a user with that email already"),
            Self::UnknownEmail => write!(f, "No user with that email"),
            Self::WrongPassword => write!(f, "Wrong password"),
            Self::UnknownUser => write!(f, "User not found"),
            Self::UnknownVerificationCode => write!(f, "Verification code not found"),
            Self::Auth(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<AuthError> for AccountError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

/// Stored user.
#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    email: String,
    credential: Credential,
    role: Role,
    verified: bool,
}

impl UserRecord {
    fn principal(&self) -> Principal {
        Principal::new(self.id, self.email.clone(), self.role, self.verified)
    }
}

#[derive(Default)]
struct AccountBook {
    users: BTreeMap<UserId, UserRecord>,
    verifications: HashMap<VerificationCode, UserId>,
    last_id: i64,
}

impl AccountBook {
    fn find_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| u.email == email)
    }

    /// Replace any outstanding code for `user_id` with a fresh one.
    fn issue_verification(&mut self, user_id: UserId) -> VerificationCode {
        self.verifications.retain(|_, owner| *owner != user_id);
        let code = VerificationCode::new(uuid::Uuid::new_v4().to_string());
        self.verifications.insert(code.clone(), user_id);
        code
    }
}

/// In-memory account service.
pub struct AccountService {
    book: RwLock<AccountBook>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(hasher: Arc<dyn CredentialHasher>, tokens: Arc<TokenService>) -> Self {
        Self {
            book: RwLock::new(AccountBook::default()),
            hasher,
            tokens,
        }
    }

    /// Hash a secret on the blocking pool.
    async fn hash_secret(&self, secret: String) -> Result<Credential, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || Credential::new(hasher.as_ref(), &secret))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Register a new user.
    ///
    /// The password is hashed before the record is stored; if hashing fails
    /// nothing is stored.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<CreatedAccount, AccountError> {
        if self.book.read().await.find_by_email(&input.email).is_some() {
            return Err(AccountError::EmailTaken);
        }

        let credential = self.hash_secret(input.password).await?;

        let mut book = self.book.write().await;
        // Re-check under the write lock; another request may have won.
        if book.find_by_email(&input.email).is_some() {
            return Err(AccountError::EmailTaken);
        }

        book.last_id += 1;
        let id = UserId::new(book.last_id);
        book.users.insert(
            id,
            UserRecord {
                id,
                email: input.email,
                credential,
                role: input.role,
                verified: false,
            },
        );
        let verification_code = book.issue_verification(id);

        info!(user_id = %id, role = %input.role, "Account created");
        Ok(CreatedAccount {
            id,
            verification_code,
        })
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, input: LoginInput) -> Result<AuthToken, AccountError> {
        let (id, credential) = {
            let book = self.book.read().await;
            let user = book
                .find_by_email(&input.email)
                .ok_or(AccountError::UnknownEmail)?;
            (user.id, user.credential.clone())
        };

        let hasher = self.hasher.clone();
        let password = input.password;
        let matches =
            tokio::task::spawn_blocking(move || credential.matches(hasher.as_ref(), &password))
                .await
                .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !matches {
            debug!(user_id = %id, "Login rejected: wrong password");
            return Err(AccountError::WrongPassword);
        }

        Ok(self.tokens.issue(Claim::new(id))?)
    }

    /// Update email and/or password.
    ///
    /// A new email resets verification and returns a fresh code. A new
    /// password is re-hashed; an email-only change keeps the stored hash.
    pub async fn edit_profile(
        &self,
        user_id: UserId,
        input: EditProfileInput,
    ) -> Result<Option<VerificationCode>, AccountError> {
        if !self.book.read().await.users.contains_key(&user_id) {
            return Err(AccountError::UnknownUser);
        }

        let credential = match input.password {
            Some(password) => Some(self.hash_secret(password).await?),
            None => None,
        };

        let mut book = self.book.write().await;
        if let Some(email) = &input.email
            && book
                .find_by_email(email)
                .is_some_and(|other| other.id != user_id)
        {
            return Err(AccountError::EmailTaken);
        }

        let user = book
            .users
            .get_mut(&user_id)
            .ok_or(AccountError::UnknownUser)?;
        let mut email_changed = false;
        if let Some(email) = input.email
            && email != user.email
        {
            user.email = email;
            user.verified = false;
            email_changed = true;
        }
        if let Some(credential) = credential {
            user.credential = credential;
        }

        let code = email_changed.then(|| book.issue_verification(user_id));
        Ok(code)
    }

    /// Confirm an email address with its one-time code.
    pub async fn verify_email(&self, code: &str) -> Result<UserId, AccountError> {
        let mut book = self.book.write().await;
        let user_id = book
            .verifications
            .remove(code)
            .ok_or(AccountError::UnknownVerificationCode)?;
        let user = book
            .users
            .get_mut(&user_id)
            .ok_or(AccountError::UnknownUser)?;
        user.verified = true;
        Ok(user_id)
    }

    /// Load a user's current principal.
    pub async fn principal(&self, id: UserId) -> Option<Principal> {
        self.book.read().await.users.get(&id).map(UserRecord::principal)
    }

    /// Number of registered users.
    pub async fn user_count(&self) -> usize {
        self.book.read().await.users.len()
    }
}

impl UserStore for AccountService {
    fn find_by_id(&self, id: UserId) -> StoreFuture<'_, Option<Principal>> {
        Box::pin(async move { Ok(self.principal(id).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{FailingHasher, fast_hasher};

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new("testKey", None))
    }

    fn service() -> AccountService {
        AccountService::new(Arc::new(fast_hasher()), tokens())
    }

    fn owner_input() -> CreateAccountInput {
        CreateAccountInput {
            email: "test@test.com".to_string(),
            password: "test123!@#".to_string(),
            role: Role::Owner,
        }
    }

    async fn digest_of(service: &AccountService, id: UserId) -> String {
        let book = service.book.read().await;
        book.users[&id].credential.digest().as_str().to_string()
    }

    #[tokio::test]
    async fn test_create_account_hashes_password() {
        let service = service();
        let created = service.create_account(owner_input()).await.unwrap();

        let digest = digest_of(&service, created.id).await;
        assert_ne!(digest, "test123!@#");
        assert!(digest.starts_with("$argon2id$"));

        let principal = service.principal(created.id).await.unwrap();
        assert_eq!(principal.email(), "test@test.com");
        assert_eq!(principal.role(), Role::Owner);
        assert!(!principal.is_verified());
    }

    #[tokio::test]
    async fn test_create_account_rejects_duplicate_email() {
        let service = service();
        service.create_account(owner_input()).await.unwrap();

        let err = service.create_account(owner_input()).await.unwrap_err();
        assert_eq!(err, AccountError::EmailTaken);
        assert_eq!(err.to_string(), "There is a user with that email already");
        assert_eq!(service.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_hashing_failure_stores_nothing() {
        let service = AccountService::new(Arc::new(FailingHasher), tokens());

        let err = service.create_account(owner_input()).await.unwrap_err();
        assert!(matches!(err, AccountError::Auth(AuthError::Hashing(_))));
        assert_eq!(service.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_login_issues_token_for_user() {
        let tokens = tokens();
        let service = AccountService::new(Arc::new(fast_hasher()), tokens.clone());
        let created = service.create_account(owner_input()).await.unwrap();

        let token = service
            .login(LoginInput {
                email: "test@test.com".to_string(),
                password: "test123!@#".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(tokens.verify(token.as_str()).unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = service();
        service.create_account(owner_input()).await.unwrap();

        let unknown = service
            .login(LoginInput {
                email: "nobody@test.com".to_string(),
                password: "test123!@#".to_string(),
            })
            .await;
        assert_eq!(unknown.unwrap_err(), AccountError::UnknownEmail);

        let wrong = service
            .login(LoginInput {
                email: "test@test.com".to_string(),
                password: "wrong".to_string(),
            })
            .await;
        assert_eq!(wrong.unwrap_err(), AccountError::WrongPassword);
    }

    #[tokio::test]
    async fn test_edit_email_keeps_hash_and_resets_verification() {
        let service = service();
        let created = service.create_account(owner_input()).await.unwrap();
        service
            .verify_email(created.verification_code.as_str())
            .await
            .unwrap();
        let before = digest_of(&service, created.id).await;

        let code = service
            .edit_profile(
                created.id,
                EditProfileInput {
                    email: Some("new@test.com".to_string()),
                    password: None,
                },
            )
            .await
            .unwrap();

        assert!(code.is_some());
        assert_eq!(digest_of(&service, created.id).await, before);
        let principal = service.principal(created.id).await.unwrap();
        assert_eq!(principal.email(), "new@test.com");
        assert!(!principal.is_verified());
    }

    #[tokio::test]
    async fn test_edit_password_rehashes() {
        let service = service();
        let created = service.create_account(owner_input()).await.unwrap();
        let before = digest_of(&service, created.id).await;

        let code = service
            .edit_profile(
                created.id,
                EditProfileInput {
                    email: None,
                    password: Some("n3w-password".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(code.is_none());
        assert_ne!(digest_of(&service, created.id).await, before);

        let login = service
            .login(LoginInput {
                email: "test@test.com".to_string(),
                password: "n3w-password".to_string(),
            })
            .await;
        assert!(login.is_ok());
    }

    #[tokio::test]
    async fn test_edit_profile_rejects_taken_email_and_unknown_user() {
        let service = service();
        let owner = service.create_account(owner_input()).await.unwrap();
        service
            .create_account(CreateAccountInput {
                email: "client@test.com".to_string(),
                password: "pw".to_string(),
                role: Role::Client,
            })
            .await
            .unwrap();

        let taken = service
            .edit_profile(
                owner.id,
                EditProfileInput {
                    email: Some("client@test.com".to_string()),
                    password: None,
                },
            )
            .await;
        assert_eq!(taken.unwrap_err(), AccountError::EmailTaken);

        let missing = service
            .edit_profile(UserId::new(404), EditProfileInput::default())
            .await;
        assert_eq!(missing.unwrap_err(), AccountError::UnknownUser);
    }

    #[tokio::test]
    async fn test_verify_email_consumes_code() {
        let service = service();
        let created = service.create_account(owner_input()).await.unwrap();
        let code = created.verification_code.as_str();

        assert_eq!(service.verify_email(code).await.unwrap(), created.id);
        assert!(service.principal(created.id).await.unwrap().is_verified());
        assert_eq!(
            service.verify_email(code).await.unwrap_err(),
            AccountError::UnknownVerificationCode
        );
    }

    #[tokio::test]
    async fn test_email_change_invalidates_old_code() {
        let service = service();
        let created = service.create_account(owner_input()).await.unwrap();

        service
            .edit_profile(
                created.id,
                EditProfileInput {
                    email: Some("new@test.com".to_string()),
                    password: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            service
                .verify_email(created.verification_code.as_str())
                .await
                .unwrap_err(),
            AccountError::UnknownVerificationCode
        );
    }

    #[tokio::test]
    async fn test_find_by_id_reads_current_state() {
        let service = service();
        let created = service.create_account(owner_input()).await.unwrap();

        let loaded = service.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.id(), created.id);
        assert!(service.find_by_id(UserId::new(404)).await.unwrap().is_none());
    }
}
