//! OpenStack provider for rallyguard
//!
//! Implements the CloudProvider trait on top of the `openstack` CLI
//! (python-openstackclient), so rallyguard can list and delete Nova,
//! Cinder, Neutron, Glance and Keystone resources.
//!
//! # Requirements
//!
//! - `openstack` CLI must be installed
//! - Credentials come from `clouds.yaml` (selected with `--os-cloud`) or
//!   the usual `OS_*` environment variables
//! - Admin credentials are needed for `--all-projects` listings
//!
//! # Example
//!
//! ```ignore
//! use rallyguard_cloud::{CloudProvider, ResourceType};
//! use rallyguard_cloud_openstack::OpenStackProvider;
//!
//! let provider = OpenStackProvider::new(Some("devstack-admin".to_string()));
//! let servers = provider.list(ResourceType::Server, true).await?;
//! ```

pub mod cli;
pub mod error;
pub mod provider;

pub use cli::{ListRow, OpenStackCli, RouterInfo};
pub use error::{OpenStackError, Result};
pub use provider::OpenStackProvider;
