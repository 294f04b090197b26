//! Typed operations over the users directory.

// self
use crate::{
	_prelude::*,
	client::{ApiRequest, Client},
	session::Secret,
};

/// Users collection endpoint path.
pub const USERS_ENDPOINT: &str = "users";
/// Permission catalog endpoint path.
pub const PERMISSIONS_ENDPOINT: &str = "permissions";
/// Page size used by the console's tables.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Directory row for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
	/// Backend identifier.
	pub user_id: u64,
	/// Account name.
	pub username: String,
	/// Account email.
	pub email: String,
	/// Creation instant as reported by the backend; formatting is left to the caller.
	pub created_at: String,
}

/// One page of the users directory.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
	/// Users on this page.
	#[serde(rename = "content")]
	pub users: Vec<UserSummary>,
	/// Total user count across all pages.
	pub total_elements: u64,
	/// Page size the backend applied.
	pub size: u32,
}

/// One role, as granted to a user or referenced by the permission catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrant {
	/// Backend identifier.
	pub role_id: u64,
	/// Display name, when the backend provides one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// One permission, carrying the roles it implies by default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
	/// Backend identifier.
	pub permission_id: u64,
	/// Display name, when the backend provides one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Roles granted alongside this permission.
	#[serde(default)]
	pub default_roles: Vec<RoleGrant>,
}

/// Full record for one user, including granted access.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
	/// Backend identifier.
	pub user_id: u64,
	/// Account name.
	pub username: String,
	/// Account email.
	pub email: String,
	/// Creation instant as reported by the backend.
	pub created_at: String,
	/// Permissions granted to the user.
	#[serde(default)]
	pub permissions: Vec<PermissionGrant>,
	/// Roles granted to the user.
	#[serde(default)]
	pub roles: Vec<RoleGrant>,
}

/// Payload for creating one user.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
	/// Account name.
	pub username: String,
	/// Account email.
	pub email: String,
	/// Initial password; redacted in debug output.
	pub password: Secret,
	/// Confirmation copy the backend validates against `password`.
	pub password_confirmation: Secret,
}
impl CreateUser {
	/// Builds a creation payload, filling the confirmation from the password.
	pub fn new(
		username: impl Into<String>,
		email: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		let password = Secret::new(password);

		Self {
			username: username.into(),
			email: email.into(),
			password_confirmation: password.clone(),
			password,
		}
	}
}

/// Replacement grant set for one user.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAssignment {
	/// Permissions the user should hold afterwards.
	pub permissions: Vec<PermissionGrant>,
	/// Roles the user should hold afterwards.
	pub roles: Vec<RoleGrant>,
}

#[derive(Deserialize)]
struct CreatedEnvelope {
	user: UserSummary,
}

/// Fetches one page of the directory (`page` is zero-based).
pub async fn list(client: &Client, page: u32, size: u32) -> Result<UserPage> {
	let request = ApiRequest::get(USERS_ENDPOINT)
		.query("page", page.to_string())
		.query("size", size.to_string());

	client.execute(&request).await?.json()
}

/// Fetches one user with granted permissions and roles.
pub async fn fetch(client: &Client, user_id: u64) -> Result<UserDetail> {
	client.execute(&ApiRequest::get(format!("{USERS_ENDPOINT}/{user_id}"))).await?.json()
}

/// Creates one user and returns the stored record.
pub async fn create(client: &Client, user: &CreateUser) -> Result<UserSummary> {
	let request = ApiRequest::post(USERS_ENDPOINT).json(user)?;
	let envelope: CreatedEnvelope = client.execute(&request).await?.json()?;

	Ok(envelope.user)
}

/// Fetches the catalog of assignable permissions with their default roles.
pub async fn permission_catalog(client: &Client) -> Result<Vec<PermissionGrant>> {
	client.execute(&ApiRequest::get(PERMISSIONS_ENDPOINT)).await?.json()
}

/// Replaces the permissions and roles granted to one user.
pub async fn assign_access(
	client: &Client,
	user_id: u64,
	assignment: &AccessAssignment,
) -> Result<()> {
	let request =
		ApiRequest::put(format!("{USERS_ENDPOINT}/{user_id}/permissions")).json(assignment)?;

	client.execute(&request).await?;

	Ok(())
}
