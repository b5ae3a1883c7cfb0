//! Client for the internal AWS Single Sign-On console control-plane API.
//!
//! This crate models the undocumented JSON API the AWS console itself uses to
//! administer SSO: listing the organization's accounts, users, groups, and
//! permission sets, and wiring groups or users to accounts through
//! application profiles. Authentication is delegated to an [`Authenticator`]
//! collaborator; the library consumes only the console region and the
//! authenticated session it produces.
//!
//! All calls are synchronous and blocking. List operations paginate lazily:
//! one page is fetched per advance, and nothing is cached between calls.
//!
//! # Quick Start
//!
//! ```no_run
//! use rs_aws_sso::{Sso, StaticAuthenticator};
//!
//! fn main() -> rs_aws_sso::Result<()> {
//!     let authenticator = StaticAuthenticator::new("eu-west-1")
//!         .with_header("Cookie", "aws-userInfo=...; aws-creds=...")?;
//!     let sso = Sso::new(&authenticator)?;
//!
//!     for account in sso.accounts() {
//!         let account = account?;
//!         println!("{} {}", account.id(), account.name());
//!     }
//!
//!     if sso.associate_group_to_account("developers", "workloads-prod", "ReadOnly")? {
//!         println!("group associated");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod entities;
pub mod error;
pub mod payload;
pub mod session;

mod endpoints;
mod pagination;

pub use client::{CreatePermissionSetRequest, Sso};
pub use config::{ClientConfig, DEFAULT_RELAY_STATE, DEFAULT_SESSION_DURATION};
pub use entities::{
    Account, AccountData, Group, GroupData, PermissionSet, PermissionSetData, ProfileData, User,
    UserData, UserMeta,
};
pub use error::{Result, SsoError};
pub use payload::{ApiPayload, PayloadBuilder};
pub use session::{Authenticator, Session, StaticAuthenticator};

// Compile-time assertions: the client and error types must be Send + Sync so
// the facade can be shared across threads even though each call blocks.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<Sso>;
    let _ = assert_send_sync::<SsoError>;
    let _ = assert_send_sync::<Session>;
};
