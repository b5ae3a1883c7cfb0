//! Read-only views over the control-plane's entity records.
//!
//! Each view wraps one page-item decoded into a typed record and borrows the
//! [`Sso`] facade for the accessors that need further network calls. Views
//! are owned by the call site that constructed them; two views of the same
//! remote entity are never reconciled.

use std::cell::OnceCell;
use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::client::Sso;
use crate::error::Result;
use crate::payload::{ApiPayload, SWB_SERVICE, SWBUP_SERVICE};

/// Decodes a raw page item into a typed record.
///
/// A malformed item is logged and replaced with the record's default, so one
/// bad row degrades to empty fields instead of poisoning a whole listing.
pub(crate) fn decode<T: DeserializeOwned + Default>(data: Value) -> T {
    match serde_json::from_value(data) {
        Ok(decoded) => decoded,
        Err(err) => {
            error!("invalid entity record received: {err}");
            T::default()
        }
    }
}

/// Raw account record as returned by the account listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccountData {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub arn: Option<String>,
    pub status: Option<String>,
}

/// Raw group record as returned by the group search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GroupData {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub description: Option<String>,
}

/// Raw user record as returned by the user search.
///
/// The attribute bag is kept as raw JSON: the user pool mixes object-shaped
/// attribute values with plain scalars, and an unexpected shape in one
/// attribute must not cost the record its identity fields. The accessors
/// walk the nested paths they need.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserData {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub active: Option<bool>,
    pub meta: Option<UserMeta>,
    pub user_attributes: HashMap<String, Value>,
}

/// Creation/update timestamps attached to a user record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserMeta {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Raw permission-set record. Field casing is mixed on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PermissionSetData {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "ttl")]
    pub ttl: Option<String>,
    #[serde(rename = "relayState")]
    pub relay_state: Option<String>,
    // The service is not consistent about the numeric type of the timestamp.
    #[serde(rename = "CreationDate")]
    pub creation_date: Option<Value>,
}

/// An application profile binding a permission set to an account instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileData {
    pub profile_id: Option<String>,
    pub name: Option<String>,
}

/// View over one account of the organization.
#[derive(Debug)]
pub struct Account<'a> {
    sso: &'a Sso,
    data: AccountData,
    instance_id: OnceCell<String>,
}

impl<'a> Account<'a> {
    pub(crate) fn new(sso: &'a Sso, data: Value) -> Self {
        Self {
            sso,
            data: decode(data),
            instance_id: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.data.id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.data.name.as_deref().unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.data.email.as_deref().unwrap_or_default()
    }

    pub fn arn(&self) -> &str {
        self.data.arn.as_deref().unwrap_or_default()
    }

    pub fn status(&self) -> &str {
        self.data.status.as_deref().unwrap_or_default()
    }

    /// Id of the application instance backing this account.
    ///
    /// Resolved with one call on first access and memoized on this view;
    /// other views of the same account resolve it independently.
    pub fn instance_id(&self) -> Result<&str> {
        if let Some(id) = self.instance_id.get() {
            return Ok(id);
        }
        let id = self.fetch_instance_id()?;
        Ok(self.instance_id.get_or_init(|| id))
    }

    fn fetch_instance_id(&self) -> Result<String> {
        let target = "GetApplicationInstanceForAWSAccount";
        let payload = ApiPayload::builder(target)
            .content(json!({"awsAccountId": self.id()}))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(account = self.id(), "fetching application instance id");
        let body = self.sso.post_checked(&self.sso.urls().peregrine(), &payload)?;
        Ok(body
            .pointer("/applicationInstance/instanceId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Application profiles associated with this account.
    ///
    /// A rejected call is logged and yields an empty list.
    pub fn associated_profiles(&self) -> Result<Vec<ProfileData>> {
        let target = "ListAWSAccountProfiles";
        let instance_id = self.instance_id()?.to_string();
        let payload = ApiPayload::builder(target)
            .content(json!({"instanceId": instance_id}))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(account = self.id(), "listing account profiles");
        let response = self
            .sso
            .session()
            .post(&self.sso.urls().peregrine(), &payload)?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            error!("listing account profiles failed: {text}");
            return Ok(Vec::new());
        }
        let body: Value = serde_json::from_str(&text)?;
        Ok(collect_records(&body, "profileList"))
    }
}

/// View over one user-pool group.
#[derive(Debug)]
pub struct Group<'a> {
    sso: &'a Sso,
    data: GroupData,
}

impl<'a> Group<'a> {
    pub(crate) fn new(sso: &'a Sso, data: Value) -> Self {
        Self {
            sso,
            data: decode(data),
        }
    }

    pub fn id(&self) -> &str {
        self.data.group_id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.data.group_name.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.data.description.as_deref().unwrap_or_default()
    }

    /// Member users of the group.
    ///
    /// A rejected call is logged and yields an empty list.
    pub fn users(&self) -> Result<Vec<UserData>> {
        let target = "ListMembersInGroup";
        let payload = ApiPayload::builder(target)
            .content(json!({"GroupId": self.id(), "MaxResults": 100}))
            .path("/userpool/")
            .x_amz_target(format!("{SWBUP_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(group = self.id(), "listing group members");
        let response = self
            .sso
            .session()
            .post(&self.sso.urls().userpool(), &payload)?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            error!("listing group members failed: {text}");
            return Ok(Vec::new());
        }
        let body: Value = serde_json::from_str(&text)?;
        Ok(collect_records(&body, "Members"))
    }
}

/// View over one user-pool user.
#[derive(Debug)]
pub struct User<'a> {
    sso: &'a Sso,
    data: UserData,
}

impl<'a> User<'a> {
    pub(crate) fn new(sso: &'a Sso, data: Value) -> Self {
        Self {
            sso,
            data: decode(data),
        }
    }

    pub fn id(&self) -> &str {
        self.data.user_id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.data.user_name.as_deref().unwrap_or_default()
    }

    /// Whether the user is active.
    pub fn status(&self) -> Option<bool> {
        self.data.active
    }

    pub fn created_at(&self) -> Option<&str> {
        self.data.meta.as_ref()?.created_at.as_deref()
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.data.meta.as_ref()?.updated_at.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.data
            .user_attributes
            .get("displayName")?
            .get("StringValue")?
            .as_str()
    }

    /// Email attribute values attached to the user.
    pub fn emails(&self) -> &[Value] {
        self.data
            .user_attributes
            .get("emails")
            .and_then(|attribute| attribute.get("ComplexListValue"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn first_name(&self) -> &str {
        self.name_attribute("givenName")
    }

    pub fn last_name(&self) -> &str {
        self.name_attribute("familyName")
    }

    fn name_attribute(&self, key: &str) -> &str {
        self.data
            .user_attributes
            .get("name")
            .and_then(|name| name.get("ComplexValue"))
            .and_then(|complex| complex.get(key))
            .and_then(|part| part.get("StringValue"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Groups the user is a member of.
    ///
    /// A rejected call is logged and yields an empty list.
    pub fn groups(&self) -> Result<Vec<GroupData>> {
        let target = "ListGroupsForUser";
        let payload = ApiPayload::builder(target)
            .content(json!({"UserId": self.id(), "MaxResults": 100}))
            .path("/userpool/")
            .x_amz_target(format!("{SWBUP_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(user = self.id(), "listing groups for user");
        let response = self
            .sso
            .session()
            .post(&self.sso.urls().userpool(), &payload)?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            error!("listing groups for user failed: {text}");
            return Ok(Vec::new());
        }
        let body: Value = serde_json::from_str(&text)?;
        Ok(collect_records(&body, "Groups"))
    }
}

/// View over one permission set.
#[derive(Debug)]
pub struct PermissionSet<'a> {
    sso: &'a Sso,
    data: PermissionSetData,
}

impl<'a> PermissionSet<'a> {
    pub(crate) fn new(sso: &'a Sso, data: Value) -> Self {
        Self {
            sso,
            data: decode(data),
        }
    }

    pub fn id(&self) -> &str {
        self.data.id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.data.name.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.data.description.as_deref().unwrap_or_default()
    }

    pub fn ttl(&self) -> &str {
        self.data.ttl.as_deref().unwrap_or_default()
    }

    pub fn relay_state(&self) -> &str {
        self.data.relay_state.as_deref().unwrap_or_default()
    }

    /// Creation time as epoch milliseconds.
    ///
    /// `None` when the record carries no timestamp or a non-numeric one.
    pub fn creation_date(&self) -> Option<u64> {
        let value = self.data.creation_date.as_ref()?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|millis| millis as u64))
    }

    /// The IAM policy document attached to this permission set.
    ///
    /// A rejected call is logged and yields `None`.
    pub fn permission_policy(&self) -> Result<Option<Value>> {
        let target = "GetPermissionsPolicy";
        let payload = ApiPayload::builder(target)
            .content(json!({"permissionSetId": self.id()}))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(permission_set = self.id(), "fetching permissions policy");
        let response = self
            .sso
            .session()
            .post(&self.sso.urls().peregrine(), &payload)?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            error!("fetching permissions policy failed: {text}");
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Accounts the permission set is provisioned on.
    ///
    /// Pages through the provisioned account ids, then resolves each id to an
    /// [`Account`] view with a lookup scan. Unlike the log-and-default
    /// accessors, a rejected page fails the whole call.
    pub fn provisioned_accounts(&self) -> Result<Vec<Account<'a>>> {
        let sso = self.sso;
        let permission_set_id = self.id().to_string();
        let paginator = sso.provisioned_account_ids(permission_set_id);
        let mut accounts = Vec::new();
        for item in paginator {
            let item = item?;
            let Some(account_id) = item.as_str() else {
                continue;
            };
            if let Some(account) = sso.get_account_by_id(account_id)? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// Attaches a custom IAM policy document to the permission set.
    ///
    /// Returns whether the remote service accepted the call; a rejection is
    /// logged.
    pub fn assign_custom_policy(&self, policy_document: &Value) -> Result<bool> {
        let target = "PutPermissionsPolicy";
        let payload = ApiPayload::builder(target)
            .content(json!({
                "permissionSetId": self.id(),
                "policyDocument": serde_json::to_string(policy_document)?,
            }))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(permission_set = self.id(), "putting permissions policy");
        let response = self
            .sso
            .session()
            .post(&self.sso.urls().peregrine(), &payload)?;
        let status = response.status();
        if !status.is_success() {
            error!("putting permissions policy failed: {}", response.text()?);
        }
        Ok(status.is_success())
    }

    /// Updates description, relay state and/or session duration.
    ///
    /// Any field passed as `None` keeps its current value from this view.
    /// Returns whether the remote service accepted the call; a rejection is
    /// logged.
    pub fn update(
        &self,
        description: Option<&str>,
        relay_state: Option<&str>,
        ttl: Option<&str>,
    ) -> Result<bool> {
        let target = "UpdatePermissionSet";
        let payload = ApiPayload::builder(target)
            .content(json!({
                "permissionSetId": self.id(),
                "description": description.unwrap_or(self.description()),
                "ttl": ttl.unwrap_or(self.ttl()),
                "relayState": relay_state.unwrap_or(self.relay_state()),
            }))
            .path("/control/")
            .x_amz_target(format!("{SWB_SERVICE}.{target}"))
            .region(self.sso.region())
            .build()?;
        debug!(permission_set = self.id(), "updating permission set");
        let response = self
            .sso
            .session()
            .post(&self.sso.urls().peregrine(), &payload)?;
        let status = response.status();
        if !status.is_success() {
            error!("updating permission set failed: {}", response.text()?);
        }
        Ok(status.is_success())
    }
}

/// Decodes every element of an array field into typed records.
fn collect_records<T: DeserializeOwned + Default>(body: &Value, key: &str) -> Vec<T> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().cloned().map(decode).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::Sso;
    use crate::config::ClientConfig;
    use crate::session::StaticAuthenticator;

    fn offline_sso() -> Sso {
        let authenticator = StaticAuthenticator::new("eu-west-1");
        Sso::with_config(&authenticator, ClientConfig::default()).unwrap()
    }

    #[test]
    fn account_fields_decode_from_pascal_case() {
        let sso = offline_sso();
        let account = Account::new(
            &sso,
            json!({
                "Id": "111122223333",
                "Name": "workloads-prod",
                "Email": "root@example.com",
                "Arn": "arn:aws:organizations::111122223333:account",
                "Status": "ACTIVE"
            }),
        );
        assert_eq!(account.id(), "111122223333");
        assert_eq!(account.name(), "workloads-prod");
        assert_eq!(account.email(), "root@example.com");
        assert_eq!(account.arn(), "arn:aws:organizations::111122223333:account");
        assert_eq!(account.status(), "ACTIVE");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let sso = offline_sso();
        let account = Account::new(&sso, json!({"Id": "1"}));
        assert_eq!(account.name(), "");
        assert_eq!(account.email(), "");

        let group = Group::new(&sso, json!({}));
        assert_eq!(group.id(), "");
        assert_eq!(group.name(), "");
        assert_eq!(group.description(), "");
    }

    #[test]
    fn invalid_record_degrades_to_defaults() {
        let sso = offline_sso();
        let account = Account::new(&sso, json!("not an object"));
        assert_eq!(account.id(), "");
        let group = Group::new(&sso, json!(42));
        assert_eq!(group.name(), "");
    }

    #[test]
    fn user_name_attributes_resolve_through_complex_values() {
        let sso = offline_sso();
        let user = User::new(
            &sso,
            json!({
                "UserId": "u-1",
                "UserName": "jdoe",
                "Active": true,
                "Meta": {"CreatedAt": "2020-05-18T10:00:00Z", "UpdatedAt": "2020-06-01T10:00:00Z"},
                "UserAttributes": {
                    "displayName": {"StringValue": "Jay Doe"},
                    "name": {
                        "ComplexValue": {
                            "givenName": {"StringValue": "Jay"},
                            "familyName": {"StringValue": "Doe"}
                        }
                    },
                    "emails": {"ComplexListValue": [{"Value": {"StringValue": "jdoe@example.com"}}]}
                }
            }),
        );
        assert_eq!(user.id(), "u-1");
        assert_eq!(user.name(), "jdoe");
        assert_eq!(user.status(), Some(true));
        assert_eq!(user.created_at(), Some("2020-05-18T10:00:00Z"));
        assert_eq!(user.updated_at(), Some("2020-06-01T10:00:00Z"));
        assert_eq!(user.display_name(), Some("Jay Doe"));
        assert_eq!(user.first_name(), "Jay");
        assert_eq!(user.last_name(), "Doe");
        assert_eq!(user.emails().len(), 1);
    }

    #[test]
    fn user_without_attributes_defaults() {
        let sso = offline_sso();
        let user = User::new(&sso, json!({"UserId": "u-2"}));
        assert_eq!(user.first_name(), "");
        assert_eq!(user.last_name(), "");
        assert!(user.display_name().is_none());
        assert!(user.emails().is_empty());
        assert!(user.status().is_none());
        assert!(user.created_at().is_none());
    }

    #[test]
    fn scalar_attribute_does_not_erase_user_identity() {
        let sso = offline_sso();
        let user = User::new(
            &sso,
            json!({
                "UserId": "u-3",
                "UserName": "jdoe",
                "UserAttributes": {
                    "custom:department": "sales",
                    "custom:legacyId": 42,
                    "displayName": null,
                    "name": {
                        "ComplexValue": {"givenName": {"StringValue": "Jay"}}
                    }
                }
            }),
        );
        assert_eq!(user.id(), "u-3");
        assert_eq!(user.name(), "jdoe");
        assert_eq!(user.first_name(), "Jay");
        assert_eq!(user.last_name(), "");
        assert!(user.display_name().is_none());
        assert!(user.emails().is_empty());
    }

    #[test]
    fn permission_set_mixed_casing_decodes() {
        let sso = offline_sso();
        let permission_set = PermissionSet::new(
            &sso,
            json!({
                "Id": "ps-0123",
                "Name": "AdministratorAccess",
                "Description": "Full access",
                "ttl": "PT2H",
                "relayState": "https://console.aws.amazon.com/",
                "CreationDate": 1589794800000u64
            }),
        );
        assert_eq!(permission_set.id(), "ps-0123");
        assert_eq!(permission_set.name(), "AdministratorAccess");
        assert_eq!(permission_set.description(), "Full access");
        assert_eq!(permission_set.ttl(), "PT2H");
        assert_eq!(permission_set.relay_state(), "https://console.aws.amazon.com/");
        assert_eq!(permission_set.creation_date(), Some(1589794800000));
    }

    #[test]
    fn float_creation_date_keeps_record_identity() {
        let sso = offline_sso();
        let permission_set = PermissionSet::new(
            &sso,
            json!({"Id": "ps-0123", "Name": "ReadOnly", "CreationDate": 1589794800000.0}),
        );
        assert_eq!(permission_set.id(), "ps-0123");
        assert_eq!(permission_set.name(), "ReadOnly");
        assert_eq!(permission_set.creation_date(), Some(1589794800000));
    }

    #[test]
    fn non_numeric_creation_date_keeps_record_identity() {
        let sso = offline_sso();
        let permission_set = PermissionSet::new(
            &sso,
            json!({"Id": "ps-0123", "Name": "ReadOnly", "CreationDate": "2020-05-18"}),
        );
        assert_eq!(permission_set.id(), "ps-0123");
        assert!(permission_set.creation_date().is_none());
    }

    #[test]
    fn profile_data_decodes_camel_case() {
        let profile: ProfileData = decode(json!({"profileId": "p-1", "name": "AdministratorAccess"}));
        assert_eq!(profile.profile_id.as_deref(), Some("p-1"));
        assert_eq!(profile.name.as_deref(), Some("AdministratorAccess"));
    }
}
