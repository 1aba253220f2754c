//! EC2 image catalog for hardway
//!
//! Implements [`ImageCatalog`](hardway_cloud::ImageCatalog) on top of the
//! EC2 `DescribeImages` API.
//!
//! # Requirements
//!
//! - AWS credentials resolvable by the default provider chain
//!   (environment, profile, SSO, instance role)
//!
//! # Example
//!
//! ```ignore
//! use hardway_cloud::{ImageFilter, resolve_latest_image};
//! use hardway_cloud_aws::Ec2ImageCatalog;
//!
//! let catalog = Ec2ImageCatalog::new("us-west-2").await;
//! let ami = resolve_latest_image(&catalog, &ImageFilter::default()).await?;
//! ```

pub mod catalog;
pub mod error;

pub use catalog::Ec2ImageCatalog;
pub use error::classify_error;
