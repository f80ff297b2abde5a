/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and registration rules
/// - [`jwt`]: JWT access/refresh token generation and validation
/// - [`middleware`]: Axum middleware and the `AuthContext` extractor
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::auth::password::{hash_password, verify_password};
/// use taskhub_shared::auth::jwt::{create_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(1, "alice", TokenType::Access), "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
