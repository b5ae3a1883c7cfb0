//! The [`Sso`] facade over the console control-plane API.

use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::config::{ClientConfig, DEFAULT_RELAY_STATE, DEFAULT_SESSION_DURATION};
use crate::endpoints::ApiUrls;
use crate::entities::{Account, Group, PermissionSet, ProfileData, User};
use crate::error::{Result, SsoError};
use crate::pagination::{PageSpec, Paginator};
use crate::payload::{
    ApiPayload, IDENTITY_STORE_SERVICE, PayloadHeaders, SWB_SERVICE, SWBUP_SERVICE,
};
use crate::session::{Authenticator, Session};

/// Parameters for creating a permission set.
#[derive(Debug, Clone)]
pub struct CreatePermissionSetRequest {
    pub name: String,
    pub description: String,
    pub relay_state: String,
    pub ttl: String,
}

impl CreatePermissionSetRequest {
    /// Creates a request with the service defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: " ".to_string(),
            relay_state: DEFAULT_RELAY_STATE.to_string(),
            ttl: DEFAULT_SESSION_DURATION.to_string(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = relay_state.into();
        self
    }

    pub fn ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }
}

/// Client for the SSO console control-plane.
///
/// Owns the authenticated session and the regional endpoint table. All calls
/// are synchronous and block until their HTTP round trip(s) complete; there
/// is no caching, so repeated collection access repeats the network calls.
#[derive(Debug)]
pub struct Sso {
    session: Session,
    region: String,
    urls: ApiUrls,
}

impl Sso {
    /// Creates a client from an authenticator.
    pub fn new(authenticator: &dyn Authenticator) -> Result<Self> {
        Self::with_config(authenticator, ClientConfig::default())
    }

    /// Creates a client from an authenticator and custom configuration.
    pub fn with_config(authenticator: &dyn Authenticator, config: ClientConfig) -> Result<Self> {
        let region = authenticator.region()?;
        let session = authenticator.authenticated_session()?;
        let urls = match &config.console_url {
            Some(base) => ApiUrls::with_base(base),
            None => ApiUrls::for_region(&region),
        };
        Ok(Self {
            session,
            region,
            urls,
        })
    }

    /// Console region the session is bound to.
    pub fn region(&self) -> &str {
        &self.region
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    /// POSTs an envelope and parses the JSON body, failing on a non-success
    /// status.
    pub(crate) fn post_checked(&self, url: &str, payload: &ApiPayload) -> Result<Value> {
        let response = self.session.post(url, payload)?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(SsoError::api(status, &text));
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Id of the external/internal directory backing the user pool.
    ///
    /// Resolved with a fresh call on every invocation.
    pub fn directory_id(&self) -> Result<String> {
        let target = "GetUserPoolInfo";
        let payload = ApiPayload::builder(target)
            .path("/userpool/")
            .x_amz_target(format!("{SWBUP_SERVICE}.{target}"))
            .region(&self.region)
            .build()?;
        debug!("fetching user pool directory id");
        let body = self.post_checked(&self.urls.userpool(), &payload)?;
        Ok(body
            .get("DirectoryId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// The accounts of the organization, one page at a time.
    pub fn accounts<'a>(&'a self) -> impl Iterator<Item = Result<Account<'a>>> + 'a {
        let paginator = Paginator::new(
            &self.session,
            self.urls.organizations(),
            PageSpec {
                items_key: "Accounts",
                cursor_key: "NextToken",
            },
            Box::new(list_accounts_payload),
        );
        paginator.map(move |item| item.map(|data| Account::new(self, data)))
    }

    /// The users configured in the user pool, one page at a time.
    pub fn users<'a>(&'a self) -> impl Iterator<Item = Result<User<'a>>> + 'a {
        let paginator = Paginator::new(
            &self.session,
            self.urls.identitystore(),
            PageSpec {
                items_key: "Users",
                cursor_key: "NextToken",
            },
            Box::new(move |next_token: Option<&str>| {
                let directory_id = self.directory_id()?;
                let mut content = json!({"IdentityStoreId": directory_id, "MaxResults": 25});
                if let Some(token) = next_token {
                    content["NextToken"] = json!(token);
                }
                ApiPayload::builder("SearchUsers")
                    .content(content)
                    .path("/identitystore/")
                    .x_amz_target(format!("{IDENTITY_STORE_SERVICE}.SearchUsers"))
                    .region(&self.region)
                    .build()
            }),
        );
        paginator.map(move |item| item.map(|data| User::new(self, data)))
    }

    /// The groups configured in the user pool, one page at a time.
    pub fn groups<'a>(&'a self) -> impl Iterator<Item = Result<Group<'a>>> + 'a {
        let paginator = Paginator::new(
            &self.session,
            self.urls.userpool(),
            PageSpec {
                items_key: "Groups",
                cursor_key: "NextToken",
            },
            Box::new(move |next_token: Option<&str>| {
                let mut content = json!({
                    "SearchString": "*",
                    "SearchAttributes": ["GroupName"],
                    "MaxResults": 100,
                });
                if let Some(token) = next_token {
                    content["NextToken"] = json!(token);
                }
                ApiPayload::builder("SearchGroups")
                    .content(content)
                    .path("/userpool/")
                    .x_amz_target(format!("{SWBUP_SERVICE}.SearchGroups"))
                    .region(&self.region)
                    .build()
            }),
        );
        paginator.map(move |item| item.map(|data| Group::new(self, data)))
    }

    /// The permission sets configured in SSO.
    pub fn permission_sets(&self) -> Result<Vec<PermissionSet<'_>>> {
        let target = "ListPermissionSets";
        let payload = ApiPayload::builder(target)
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(&self.region)
            .build()?;
        debug!("listing permission sets");
        let body = self.post_checked(&self.urls.peregrine(), &payload)?;
        Ok(body
            .get("permissionSets")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .cloned()
                    .map(|data| PermissionSet::new(self, data))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Pages through the account ids a permission set is provisioned on.
    pub(crate) fn provisioned_account_ids<'a>(&'a self, permission_set_id: String) -> Paginator<'a> {
        Paginator::new(
            &self.session,
            self.urls.peregrine(),
            PageSpec {
                items_key: "accountIds",
                cursor_key: "marker",
            },
            Box::new(move |marker: Option<&str>| {
                let mut content = json!({
                    "permissionSetId": permission_set_id,
                    "onlyOutOfSync": "false",
                });
                if let Some(marker) = marker {
                    content["marker"] = json!(marker);
                }
                ApiPayload::builder("ListAccountsWithProvisionedPermissionSet")
                    .content(content)
                    .path("/control/")
                    .x_amz_target(format!(
                        "{SWB_SERVICE}.ListAccountsWithProvisionedPermissionSet"
                    ))
                    .region(&self.region)
                    .build()
            }),
        )
    }

    /// Looks up an account by name. `Ok(None)` when no account matches.
    pub fn get_account_by_name(&self, account_name: &str) -> Result<Option<Account<'_>>> {
        for account in self.accounts() {
            let account = account?;
            if account.name() == account_name {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }

    /// Looks up an account by id. `Ok(None)` when no account matches.
    pub fn get_account_by_id(&self, account_id: &str) -> Result<Option<Account<'_>>> {
        for account in self.accounts() {
            let account = account?;
            if account.id() == account_id {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }

    /// Looks up a user by user name. `Ok(None)` when no user matches.
    pub fn get_user_by_name(&self, user_name: &str) -> Result<Option<User<'_>>> {
        for user in self.users() {
            let user = user?;
            if user.name() == user_name {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    /// Looks up a user by id. `Ok(None)` when no user matches.
    pub fn get_user_by_id(&self, user_id: &str) -> Result<Option<User<'_>>> {
        for user in self.users() {
            let user = user?;
            if user.id() == user_id {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    /// Looks up a group by name. `Ok(None)` when no group matches.
    pub fn get_group_by_name(&self, group_name: &str) -> Result<Option<Group<'_>>> {
        for group in self.groups() {
            let group = group?;
            if group.name() == group_name {
                return Ok(Some(group));
            }
        }
        Ok(None)
    }

    /// Looks up a group by id. `Ok(None)` when no group matches.
    pub fn get_group_by_id(&self, group_id: &str) -> Result<Option<Group<'_>>> {
        for group in self.groups() {
            let group = group?;
            if group.id() == group_id {
                return Ok(Some(group));
            }
        }
        Ok(None)
    }

    /// Looks up a permission set by name. `Ok(None)` when none matches.
    pub fn get_permission_set_by_name(
        &self,
        permission_set_name: &str,
    ) -> Result<Option<PermissionSet<'_>>> {
        Ok(self
            .permission_sets()?
            .into_iter()
            .find(|permission_set| permission_set.name() == permission_set_name))
    }

    /// Creates a permission set and returns a view over the created record.
    pub fn create_permission_set(
        &self,
        request: CreatePermissionSetRequest,
    ) -> Result<PermissionSet<'_>> {
        let target = "CreatePermissionSet";
        let payload = ApiPayload::builder(target)
            .content(json!({
                "permissionSetName": request.name,
                "description": request.description,
                "relayState": request.relay_state,
                "ttl": request.ttl,
            }))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(&self.region)
            .build()?;
        debug!(name = %request.name, "creating permission set");
        let body = self.post_checked(&self.urls.peregrine(), &payload)?;
        let record = body.get("permissionSet").cloned().unwrap_or(Value::Null);
        Ok(PermissionSet::new(self, record))
    }

    /// Associates a group with an account under a permission set.
    ///
    /// Straight-line workflow: resolve the group and account, provision an
    /// application profile for the permission set on the account instance,
    /// resolve the directory, then issue the association call. There is no
    /// compensation: a profile provisioned before a failing association call
    /// is left in place. Returns whether the association call was accepted.
    pub fn associate_group_to_account(
        &self,
        group_name: &str,
        account_name: &str,
        permission_set_name: &str,
    ) -> Result<bool> {
        let group = self
            .get_group_by_name(group_name)?
            .ok_or_else(|| SsoError::NotFound {
                entity: "group",
                name: group_name.to_string(),
            })?;
        let account = self.account_by_name_required(account_name)?;
        let instance_id = account.instance_id()?.to_string();
        let profile_id = self.provision_application_profile(permission_set_name, &account)?;
        let directory_id = self.directory_id()?;
        let content = json!({
            "accessorId": group.id(),
            "accessorType": "GROUP",
            "accessorDisplay": {"groupName": group_name},
            "instanceId": instance_id,
            "profileId": profile_id,
            "directoryType": "UserPool",
            "directoryId": directory_id,
        });
        self.post_association("AssociateProfile", content)
    }

    /// Disassociates a group from an account for a permission set.
    ///
    /// Looks up the existing application profile by permission set name
    /// instead of provisioning one. Returns whether the call was accepted.
    pub fn disassociate_group_from_account(
        &self,
        group_name: &str,
        account_name: &str,
        permission_set_name: &str,
    ) -> Result<bool> {
        let group = self
            .get_group_by_name(group_name)?
            .ok_or_else(|| SsoError::NotFound {
                entity: "group",
                name: group_name.to_string(),
            })?;
        let account = self.account_by_name_required(account_name)?;
        let instance_id = account.instance_id()?.to_string();
        let directory_id = self.directory_id()?;
        let profile_id = self
            .account_profile_for_permission_set(&account, permission_set_name)?
            .and_then(|profile| profile.profile_id);
        let content = json!({
            "accessorId": group.id(),
            "accessorType": "GROUP",
            "accessorDisplay": {"groupName": group_name},
            "instanceId": instance_id,
            "profileId": profile_id,
            "directoryType": "UserPool",
            "directoryId": directory_id,
        });
        self.post_association("DisassociateProfile", content)
    }

    /// Associates a user with an account under a permission set.
    ///
    /// Same workflow as [`Sso::associate_group_to_account`] with a user
    /// accessor.
    pub fn associate_user_to_account(
        &self,
        user_name: &str,
        account_name: &str,
        permission_set_name: &str,
    ) -> Result<bool> {
        let user = self
            .get_user_by_name(user_name)?
            .ok_or_else(|| SsoError::NotFound {
                entity: "user",
                name: user_name.to_string(),
            })?;
        let user_id = user.id().to_string();
        let first_name = user.first_name().to_string();
        let last_name = user.last_name().to_string();
        let account = self.account_by_name_required(account_name)?;
        let instance_id = account.instance_id()?.to_string();
        let profile_id = self.provision_application_profile(permission_set_name, &account)?;
        let directory_id = self.directory_id()?;
        let content = json!({
            "accessorId": user_id,
            "accessorType": "USER",
            "accessorDisplay": {
                "userName": user_name,
                "firstName": first_name,
                "last_name": last_name,
                "windowsUpn": user_name,
            },
            "instanceId": instance_id,
            "profileId": profile_id,
            "directoryType": "UserPool",
            "directoryId": directory_id,
        });
        self.post_association("AssociateProfile", content)
    }

    /// Disassociates a user from an account for a permission set.
    pub fn disassociate_user_from_account(
        &self,
        user_name: &str,
        account_name: &str,
        permission_set_name: &str,
    ) -> Result<bool> {
        let user = self
            .get_user_by_name(user_name)?
            .ok_or_else(|| SsoError::NotFound {
                entity: "user",
                name: user_name.to_string(),
            })?;
        let user_id = user.id().to_string();
        let first_name = user.first_name().to_string();
        let last_name = user.last_name().to_string();
        let account = self.account_by_name_required(account_name)?;
        let instance_id = account.instance_id()?.to_string();
        let directory_id = self.directory_id()?;
        let profile_id = self
            .account_profile_for_permission_set(&account, permission_set_name)?
            .and_then(|profile| profile.profile_id);
        let content = json!({
            "accessorId": user_id,
            "accessorType": "USER",
            "accessorDisplay": {
                "userName": user_name,
                "firstName": first_name,
                "last_name": last_name,
                "windowsUpn": user_name,
            },
            "instanceId": instance_id,
            "profileId": profile_id,
            "directoryType": "UserPool",
            "directoryId": directory_id,
        });
        self.post_association("DisassociateProfile", content)
    }

    fn account_by_name_required(&self, account_name: &str) -> Result<Account<'_>> {
        self.get_account_by_name(account_name)?
            .ok_or_else(|| SsoError::NotFound {
                entity: "account",
                name: account_name.to_string(),
            })
    }

    /// Provisions an application profile binding a permission set to an
    /// account instance and returns the profile id.
    fn provision_application_profile(
        &self,
        permission_set_name: &str,
        account: &Account<'_>,
    ) -> Result<String> {
        let permission_set = self
            .get_permission_set_by_name(permission_set_name)?
            .ok_or_else(|| SsoError::NotFound {
                entity: "permission set",
                name: permission_set_name.to_string(),
            })?;
        let target = "ProvisionApplicationProfileForAWSAccountInstance";
        let payload = ApiPayload::builder(target)
            .content(json!({
                "permissionSetId": permission_set.id(),
                "instanceId": account.instance_id()?,
            }))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(&self.region)
            .build()?;
        debug!(
            permission_set = permission_set_name,
            account = account.name(),
            "provisioning application profile"
        );
        let body = self.post_checked(&self.urls.peregrine(), &payload)?;
        Ok(body
            .pointer("/applicationProfile/profileId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Finds the application profile on an account matching a permission set
    /// name.
    fn account_profile_for_permission_set(
        &self,
        account: &Account<'_>,
        permission_set_name: &str,
    ) -> Result<Option<ProfileData>> {
        Ok(account
            .associated_profiles()?
            .into_iter()
            .find(|profile| profile.name.as_deref() == Some(permission_set_name)))
    }

    fn post_association(&self, target: &'static str, content: Value) -> Result<bool> {
        let payload = ApiPayload::builder(target)
            .content(content)
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(&self.region)
            .build()?;
        debug!(operation = target, "posting profile association change");
        let response = self.session.post(&self.urls.peregrine(), &payload)?;
        let status = response.status();
        if !status.is_success() {
            error!("{target} failed: {}", response.text()?);
        }
        Ok(status.is_success())
    }
}

/// Envelope for the account listing.
///
/// This operation is not part of the supported target list and bypasses the
/// validated builder: it rides the organizations endpoint with its own
/// content type, a pinned region, and an extra user-agent envelope header.
fn list_accounts_payload(next_token: Option<&str>) -> Result<ApiPayload> {
    let mut content = Map::new();
    if let Some(token) = next_token {
        content.insert("NextToken".to_string(), json!(token));
    }
    Ok(ApiPayload {
        content_string: serde_json::to_string(&Value::Object(content))?,
        headers: PayloadHeaders {
            content_type: "application/x-amz-json-1.1".to_string(),
            content_encoding: "amz-1.0".to_string(),
            x_amz_target: "AWSOrganizationsV20161128.ListAccounts".to_string(),
            x_amz_user_agent: Some("aws-sdk-js/2.152.0 promise".to_string()),
        },
        method: "POST".to_string(),
        operation: "listAccounts".to_string(),
        params: Map::new(),
        path: "/".to_string(),
        region: "us-east-1".to_string(),
    })
}
